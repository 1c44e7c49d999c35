use dioxus::prelude::*;
use grader_core::model::SaveStatus;

use crate::context::PersistenceContext;
use crate::views::{ClearSessionDialog, StatusBanner};
use crate::vm::ClearState;

/// Signals and callbacks behind the session panel.
#[derive(Clone, Copy, PartialEq)]
pub struct SessionPanelState {
    pub status: Signal<SaveStatus>,
    pub clear_state: Signal<ClearState>,
    pub on_request: Callback<()>,
    pub on_cancel: Callback<()>,
    pub on_confirm: Callback<()>,
}

pub fn use_session_panel(ctx: &PersistenceContext) -> SessionPanelState {
    let persistence = ctx.persistence();
    let status = use_signal(|| persistence.status());
    let mut clear_state = use_signal(ClearState::default);

    let watched = persistence.clone();
    use_future(move || {
        let persistence = watched.clone();
        let mut status = status;
        async move {
            let mut rx = persistence.subscribe_status();
            loop {
                let next = *rx.borrow_and_update();
                status.set(next);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    });

    let restore_ctx = ctx.clone();
    use_hook(move || {
        if restore_ctx.take_restore_on_mount() {
            let persistence = restore_ctx.persistence();
            spawn(async move {
                let restored = persistence.load_and_restore().await;
                tracing::debug!(restored, "initial restore finished");
            });
        }
    });

    let on_request = use_callback(move |()| clear_state.set(clear_state().request()));
    let on_cancel = use_callback(move |()| clear_state.set(clear_state().cancel()));
    let on_confirm = use_callback(move |()| {
        let Some(next) = clear_state().begin() else {
            return;
        };
        clear_state.set(next);
        let persistence = persistence.clone();
        let mut clear_state = clear_state;
        spawn(async move {
            let report = persistence.clear_session().await;
            clear_state.set(ClearState::finished(&report));
        });
    });

    SessionPanelState {
        status,
        clear_state,
        on_request,
        on_cancel,
        on_confirm,
    }
}

#[component]
pub fn SessionPanel() -> Element {
    let ctx = use_context::<PersistenceContext>();
    let state = use_session_panel(&ctx);
    rsx! { SessionPanelView { state } }
}

#[component]
pub fn SessionPanelView(state: SessionPanelState) -> Element {
    rsx! {
        section { class: "session-panel",
            StatusBanner { status: (state.status)() }
            ClearSessionDialog {
                state: (state.clear_state)(),
                on_request: state.on_request,
                on_cancel: state.on_cancel,
                on_confirm: state.on_confirm,
            }
        }
    }
}
