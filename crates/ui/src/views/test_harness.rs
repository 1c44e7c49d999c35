use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use grader_core::model::GradingSession;
use grader_core::time::fixed_clock;
use services::{Collaborators, HeadlessSurface, PersistenceConfig, SessionPersistence};
use storage::InMemorySessionStore;

use crate::context::PersistenceContext;

use super::{SessionPanelState, SessionPanelView, use_session_panel};

#[derive(Clone, Default)]
struct PanelHandles {
    state: Rc<RefCell<Option<SessionPanelState>>>,
}

#[derive(Props, Clone)]
struct HarnessProps {
    ctx: PersistenceContext,
    handles: PanelHandles,
}

impl PartialEq for HarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[component]
fn PanelHarnessRoot(props: HarnessProps) -> Element {
    use_context_provider(|| props.ctx.clone());
    let state = use_session_panel(&props.ctx);
    let mut registered = use_signal(|| false);
    if !registered() {
        registered.set(true);
        *props.handles.state.borrow_mut() = Some(state);
    }
    rsx! { SessionPanelView { state } }
}

pub struct PanelHarness {
    pub dom: VirtualDom,
    pub store: InMemorySessionStore,
    pub surface: Arc<HeadlessSurface>,
    pub persistence: SessionPersistence,
    handles: PanelHandles,
}

impl PanelHarness {
    pub fn state(&self) -> SessionPanelState {
        (*self.handles.state.borrow()).expect("panel state registered")
    }

    /// Invoke a panel callback inside the dom's runtime.
    pub fn call(&self, callback: Callback<()>) {
        self.dom.in_runtime(|| callback.call(()));
    }

    pub async fn drive_async(&mut self) {
        for _ in 0..4 {
            let _ = tokio::time::timeout(
                std::time::Duration::from_millis(50),
                self.dom.wait_for_work(),
            )
            .await;
            self.dom.render_immediate(&mut NoOpMutations);
            self.dom.process_events();
        }
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn setup_panel_harness(saved: Option<GradingSession>, restore_on_mount: bool) -> PanelHarness {
    let store = saved.map_or_else(InMemorySessionStore::new, InMemorySessionStore::with_session);
    let surface = Arc::new(HeadlessSurface::new());
    let persistence = SessionPersistence::new(
        Arc::new(store.clone()),
        Collaborators::from_single(Arc::clone(&surface)),
        PersistenceConfig::default(),
        fixed_clock(),
    );
    let handles = PanelHandles::default();
    let mut dom = VirtualDom::new_with_props(
        PanelHarnessRoot,
        HarnessProps {
            ctx: PersistenceContext::new(persistence.clone(), restore_on_mount),
            handles: handles.clone(),
        },
    );
    dom.rebuild_in_place();

    PanelHarness {
        dom,
        store,
        surface,
        persistence,
        handles,
    }
}
