use dioxus::prelude::*;

use crate::vm::ClearState;

#[component]
pub fn ClearSessionDialog(
    state: ClearState,
    on_request: Callback<()>,
    on_cancel: Callback<()>,
    on_confirm: Callback<()>,
) -> Element {
    let message = state.message();

    rsx! {
        div { class: "session-clear",
            button {
                class: "btn session-clear-button",
                r#type: "button",
                disabled: state.is_busy(),
                onclick: move |_| on_request.call(()),
                "Clear session"
            }
            {message.map(|message| rsx! {
                p { class: "session-clear-note", "{message}" }
            })}
        }
        if state.show_confirm() {
            div {
                class: "session-modal-overlay",
                onclick: move |_| on_cancel.call(()),
                div {
                    class: "session-modal",
                    onclick: move |evt| evt.stop_propagation(),
                    h3 { class: "session-modal-title", "Clear session?" }
                    p { class: "session-modal-body",
                        "This removes every graded item, override and highlight from this page and from the saved copy."
                    }
                    div { class: "session-modal-actions",
                        button {
                            class: "btn session-modal-cancel",
                            r#type: "button",
                            onclick: move |_| on_cancel.call(()),
                            "Keep Session"
                        }
                        button {
                            class: "btn session-modal-confirm",
                            r#type: "button",
                            disabled: state.is_busy(),
                            onclick: move |_| on_confirm.call(()),
                            "Clear"
                        }
                    }
                }
            }
        }
    }
}
