use dioxus::prelude::*;
use grader_core::model::SaveStatus;

use crate::vm::banner_for;

#[component]
pub fn StatusBanner(status: SaveStatus) -> Element {
    let Some(vm) = banner_for(status) else {
        return rsx! {};
    };
    let tone = vm.tone.class();

    rsx! {
        div { class: "session-banner {tone}", role: "status",
            "{vm.text}"
        }
    }
}
