use dioxus::prelude::*;
use grader_core::model::{BatchEntry, BatchRecord, GradingSession, SaveStatus, SessionData, TabId};
use serde_json::json;

use crate::views::{ClearSessionDialog, StatusBanner};
use crate::vm::{ClearOutcome, ClearState};

use super::test_harness::setup_panel_harness;

#[derive(Props, Clone, PartialEq)]
struct BannerHarnessProps {
    status: SaveStatus,
}

#[component]
fn BannerHarness(props: BannerHarnessProps) -> Element {
    rsx! { StatusBanner { status: props.status } }
}

#[derive(Props, Clone, PartialEq)]
struct DialogHarnessProps {
    state: ClearState,
}

#[component]
fn DialogHarness(props: DialogHarnessProps) -> Element {
    let noop = use_callback(|()| {});
    rsx! {
        ClearSessionDialog {
            state: props.state,
            on_request: noop,
            on_cancel: noop,
            on_confirm: noop,
        }
    }
}

fn render_banner(status: SaveStatus) -> String {
    let mut dom = VirtualDom::new_with_props(BannerHarness, BannerHarnessProps { status });
    dom.rebuild_in_place();
    dioxus_ssr::render(&dom)
}

fn render_dialog(state: ClearState) -> String {
    let mut dom = VirtualDom::new_with_props(DialogHarness, DialogHarnessProps { state });
    dom.rebuild_in_place();
    dioxus_ssr::render(&dom)
}

fn one_item_session() -> GradingSession {
    GradingSession {
        active_tab: TabId::new("grader"),
        session_data: SessionData {
            batch_record: Some(BatchRecord::new(vec![BatchEntry {
                original_input: "essay".into(),
                result: json!({ "score": 4 }),
            }])),
            ..SessionData::default()
        },
    }
}

#[test]
fn banner_renders_tone_and_text() {
    let html = render_banner(SaveStatus::FailedWillRetry);
    assert!(html.contains("session-banner--warning"), "missing tone in {html}");
    assert!(html.contains("Retrying shortly"), "missing text in {html}");

    let html = render_banner(SaveStatus::Idle);
    assert!(!html.contains("session-banner"), "idle should render nothing: {html}");
}

#[test]
fn dialog_only_shows_modal_while_confirming() {
    let html = render_dialog(ClearState::Idle);
    assert!(html.contains("Clear session"));
    assert!(!html.contains("Clear session?"));

    let html = render_dialog(ClearState::Confirming);
    assert!(html.contains("Clear session?"), "missing modal in {html}");

    let html = render_dialog(ClearState::Done(ClearOutcome::LocalOnly));
    assert!(html.contains("could not be deleted"), "missing note in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn panel_restores_on_mount() {
    let mut harness = setup_panel_harness(Some(one_item_session()), true);
    harness.drive_async().await;

    let html = harness.render();
    assert!(html.contains("Previous session restored"), "missing banner in {html}");
    assert_eq!(harness.store.fetch_count(), 1);
    assert_eq!(harness.persistence.records().count(), 1);
    assert_eq!(harness.surface.skeleton_renders(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn panel_without_restore_flag_stays_blank() {
    let mut harness = setup_panel_harness(Some(one_item_session()), false);
    harness.drive_async().await;

    assert_eq!(harness.store.fetch_count(), 0);
    assert!(!harness.render().contains("session-banner"));
}

#[tokio::test(flavor = "current_thread")]
async fn panel_clears_after_confirmation() {
    let mut harness = setup_panel_harness(Some(one_item_session()), true);
    harness.drive_async().await;

    let state = harness.state();
    harness.call(state.on_confirm);
    harness.drive_async().await;
    assert_eq!(harness.store.delete_count(), 0);

    harness.call(state.on_request);
    harness.drive_async().await;
    assert!(harness.render().contains("Clear session?"));

    harness.call(state.on_confirm);
    harness.drive_async().await;

    let html = harness.render();
    assert!(html.contains("Session cleared."), "missing note in {html}");
    assert!(!html.contains("Clear session?"));
    assert!(!html.contains("Previous session restored"));
    assert_eq!(harness.store.delete_count(), 1);
    assert_eq!(harness.store.current(), None);
    assert!(harness.persistence.records().is_empty());
}
