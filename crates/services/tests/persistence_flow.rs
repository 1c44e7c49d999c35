use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grader_core::model::{
    BatchEntry, BatchRecord, Category, ContentId, GradingSession, HighlightsView, ItemIndex,
    ItemMarkup, ItemSnapshot, SaveStatus, ScoreOverride, SessionData, TabId,
};
use grader_core::time::fixed_clock;
use serde_json::json;
use services::ports::{Binding, WiringScope};
use services::{
    BehaviorBinder, Collaborators, ContentEvent, Control, DropReason, HeadlessSurface,
    MarkupFragment, MarkupSlot, PersistenceConfig, SaveOutcome, ScoreRegistry, SessionPersistence,
    SkeletonRenderer, SurfaceError, UiSurface,
};
use storage::InMemorySessionStore;
use tokio::sync::{Notify, broadcast};

fn persistence(store: &InMemorySessionStore) -> (Arc<HeadlessSurface>, SessionPersistence) {
    let surface = Arc::new(HeadlessSurface::new());
    let persistence = SessionPersistence::new(
        Arc::new(store.clone()),
        Collaborators::from_single(Arc::clone(&surface)),
        PersistenceConfig::default(),
        fixed_clock(),
    );
    (surface, persistence)
}

/// Headless page whose `settled()` blocks until the test releases it.
struct GatedSurface {
    inner: Arc<HeadlessSurface>,
    reached: Notify,
    release: Notify,
}

impl GatedSurface {
    fn new(inner: Arc<HeadlessSurface>) -> Self {
        Self {
            inner,
            reached: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl UiSurface for GatedSurface {
    fn active_tab(&self) -> Option<TabId> {
        self.inner.active_tab()
    }

    fn switch_tab(&self, tab: &TabId) -> Result<(), SurfaceError> {
        self.inner.switch_tab(tab)
    }

    fn markup(&self, item: ItemIndex, slot: MarkupSlot) -> Option<MarkupFragment> {
        self.inner.markup(item, slot)
    }

    fn inject_markup(
        &self,
        item: ItemIndex,
        slot: MarkupSlot,
        html: &str,
    ) -> Result<(), SurfaceError> {
        self.inner.inject_markup(item, slot, html)
    }

    fn mark_populated(&self, item: ItemIndex, view: HighlightsView) -> Result<(), SurfaceError> {
        self.inner.mark_populated(item, view)
    }

    fn is_checked(&self, control: Control) -> bool {
        self.inner.is_checked(control)
    }

    fn set_checked(&self, control: Control, checked: bool) -> Result<(), SurfaceError> {
        self.inner.set_checked(control, checked)
    }

    fn apply_score_input(
        &self,
        item: ItemIndex,
        category: &Category,
        value: &ScoreOverride,
    ) -> Result<(), SurfaceError> {
        self.inner.apply_score_input(item, category, value)
    }

    fn fit_text_areas(&self, scope: Option<ItemIndex>) {
        self.inner.fit_text_areas(scope);
    }

    fn clear_output(&self) {
        self.inner.clear_output();
    }

    async fn settled(&self) {
        self.reached.notify_one();
        self.release.notified().await;
    }
}

fn entry(n: usize) -> BatchEntry {
    BatchEntry {
        original_input: format!("essay {n}"),
        result: json!({ "score": n }),
    }
}

/// Three items; the standalone highlights of item 1 were excluded from export.
fn three_item_session() -> GradingSession {
    let batch = BatchRecord::new((0..3).map(entry).collect());
    let item_snapshots = (0..3)
        .map(|n| (ItemIndex::new(n), ItemSnapshot::from(&entry(n))))
        .collect();
    let markup = (0..3)
        .map(|n| {
            (
                ItemIndex::new(n),
                ItemMarkup {
                    body: Some(format!("<p>essay {n}</p>")),
                    standalone_highlights: Some(format!("<ul><li>{n}</li></ul>")),
                    inline_highlights: None,
                },
            )
        })
        .collect();
    let mut remove_all_flags = BTreeMap::new();
    remove_all_flags.insert(ContentId::standalone(ItemIndex::new(1)), true);

    GradingSession {
        active_tab: TabId::new("highlights"),
        session_data: SessionData {
            batch_record: Some(batch),
            item_snapshots,
            markup,
            remove_all_flags,
            ..SessionData::default()
        },
    }
}

#[tokio::test]
async fn empty_store_leaves_page_blank() {
    let store = InMemorySessionStore::new();
    let (surface, persistence) = persistence(&store);

    assert!(!persistence.load_and_restore().await);
    assert_eq!(store.fetch_count(), 1);
    assert_eq!(surface.skeleton_renders(), 0);
    assert!(persistence.records().is_empty());
    assert_eq!(persistence.status(), SaveStatus::Idle);
}

#[tokio::test]
async fn fetch_failure_leaves_page_blank() {
    let store = InMemorySessionStore::with_session(three_item_session());
    store.fail_fetches(true);
    let (surface, persistence) = persistence(&store);

    assert!(!persistence.load_and_restore().await);
    assert_eq!(surface.rendered_items(), 0);
}

#[tokio::test]
async fn remove_all_flag_is_restored_for_its_view_only() {
    let store = InMemorySessionStore::with_session(three_item_session());
    let (surface, persistence) = persistence(&store);

    assert!(persistence.load_and_restore().await);
    assert_eq!(persistence.status(), SaveStatus::Restored);
    assert_eq!(surface.active_tab(), Some(TabId::new("highlights")));
    assert_eq!(persistence.records().count(), 3);

    let excluded = ContentId::standalone(ItemIndex::new(1));
    assert!(surface.is_checked(Control::RemoveAll(excluded)));
    assert_eq!(surface.excluded(excluded), Some(true));
    for n in [0, 2] {
        let content = ContentId::standalone(ItemIndex::new(n));
        assert!(!surface.is_checked(Control::RemoveAll(content)));
        assert_eq!(surface.excluded(content), Some(false));
    }

    assert_eq!(
        surface.markup_html(ItemIndex::new(2), MarkupSlot::Body).as_deref(),
        Some("<p>essay 2</p>")
    );
    let fragment = surface
        .markup(ItemIndex::new(0), MarkupSlot::Highlights(HighlightsView::Standalone))
        .unwrap();
    assert!(fragment.populated);
    assert!(
        persistence
            .registry()
            .wired_count(WiringScope::Item(ItemIndex::new(0)))
            > 0
    );
}

#[tokio::test(start_paused = true)]
async fn edits_survive_a_reload() {
    let store = InMemorySessionStore::new();
    let (surface, first) = persistence(&store);
    for n in 0..3 {
        let outcome = first
            .record_result(ItemIndex::new(n), &format!("essay {n}"), json!({ "score": n }))
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
    }
    surface.put_markup(
        ItemIndex::new(1),
        MarkupSlot::Highlights(HighlightsView::Inline),
        MarkupFragment::populated("<ul><li>comma splice</li></ul>"),
    );
    let grammar = Category::new("grammar");
    first
        .override_score(ItemIndex::new(2), &grammar, ScoreOverride::new(4.5, "generous"))
        .unwrap();
    first.mark_complete(ItemIndex::new(0), true).unwrap();
    first
        .set_remove_all(ContentId::inline(ItemIndex::new(1)), true)
        .unwrap();
    assert_eq!(first.save_now().await, SaveOutcome::Saved);

    let (restored, second) = persistence(&store);
    assert!(second.load_and_restore().await);

    assert_eq!(
        restored.markup_html(ItemIndex::new(1), MarkupSlot::Body),
        surface.markup_html(ItemIndex::new(1), MarkupSlot::Body)
    );
    assert_eq!(
        restored.score_input(ItemIndex::new(2), &grammar),
        Some(ScoreOverride::new(4.5, "generous"))
    );
    assert_eq!(restored.score_changes(), vec![(ItemIndex::new(2), grammar)]);
    assert!(restored.is_checked(Control::MarkComplete(ItemIndex::new(0))));
    assert!(!restored.is_checked(Control::MarkComplete(ItemIndex::new(1))));
    assert_eq!(
        restored.excluded(ContentId::inline(ItemIndex::new(1))),
        Some(true)
    );
    assert_eq!(
        second.records().get(ItemIndex::new(2)),
        Some(ItemSnapshot::new("essay 2", json!({ "score": 2 })))
    );
}

#[tokio::test(start_paused = true)]
async fn saving_works_once_restore_has_finished() {
    let store = InMemorySessionStore::with_session(three_item_session());
    let (_, persistence) = persistence(&store);

    assert!(persistence.load_and_restore().await);
    assert_eq!(persistence.save_now().await, SaveOutcome::Saved);
    assert_eq!(store.post_count(), 1);

    let saved = store.current().unwrap();
    assert_eq!(saved.session_data.batch_record.unwrap().count(), 3);
    assert_eq!(
        saved.session_data.remove_all_flags,
        three_item_session().session_data.remove_all_flags
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_snapshot_is_discarded() {
    let store = InMemorySessionStore::with_session(three_item_session());
    let (surface, persistence) = persistence(&store);
    surface.fail_tab_switches(true);

    assert!(!persistence.load_and_restore().await);
    assert_eq!(surface.skeleton_renders(), 0);
    assert_eq!(surface.output_cleared(), 1);
    assert!(persistence.records().is_empty());
    assert_eq!(persistence.status(), SaveStatus::Idle);

    assert_eq!(persistence.save_now().await, SaveOutcome::NothingToSave);
    assert_eq!(store.post_count(), 0);
}

#[tokio::test]
async fn snapshot_without_items_is_not_restored() {
    let store = InMemorySessionStore::with_session(GradingSession {
        active_tab: TabId::new("grader"),
        session_data: SessionData::default(),
    });
    let (surface, persistence) = persistence(&store);

    assert!(!persistence.load_and_restore().await);
    assert_eq!(surface.skeleton_renders(), 0);
}

#[tokio::test(start_paused = true)]
async fn clear_resets_the_page_even_when_delete_fails() {
    let store = InMemorySessionStore::new();
    let (surface, persistence) = persistence(&store);
    for n in 0..3 {
        persistence
            .record_result(ItemIndex::new(n), "essay", json!({ "score": n }))
            .await
            .unwrap();
    }
    persistence
        .records()
        .update(ItemIndex::new(5), ItemSnapshot::new("stray", json!(null)));
    persistence.notify_change();
    store.fail_deletes(true);

    let report = persistence.clear_session().await;
    assert!(!report.deleted);
    assert_eq!(report.purged, 4);
    assert_eq!(store.delete_count(), 1);
    assert!(persistence.records().is_empty());
    assert_eq!(surface.output_cleared(), 1);
    assert_eq!(surface.rendered_items(), 0);
    assert_eq!(
        persistence
            .registry()
            .wired_count(WiringScope::Item(ItemIndex::new(0))),
        0
    );
    assert_eq!(persistence.status(), SaveStatus::Idle);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.post_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn content_events_trigger_a_debounced_save() {
    let store = InMemorySessionStore::new();
    let (_, persistence) = persistence(&store);
    persistence
        .records()
        .record_computed(ItemIndex::new(0), ItemSnapshot::new("essay", json!({})))
        .unwrap();

    let (tx, rx) = broadcast::channel(16);
    let listener = persistence.listen(rx);
    tx.send(ContentEvent::Changed {
        item: Some(ItemIndex::new(0)),
    })
    .unwrap();
    tx.send(ContentEvent::Changed { item: None }).unwrap();

    tokio::time::sleep(Duration::from_millis(2_501)).await;
    assert_eq!(store.post_count(), 1);

    drop(tx);
    listener.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restore_guard_is_held_until_handlers_are_reattached() {
    let store = InMemorySessionStore::with_session(three_item_session());
    let headless = Arc::new(HeadlessSurface::new());
    let gated = Arc::new(GatedSurface::new(Arc::clone(&headless)));
    let persistence = SessionPersistence::new(
        Arc::new(store.clone()),
        Collaborators {
            surface: Arc::clone(&gated) as Arc<dyn UiSurface>,
            renderer: Arc::clone(&headless) as Arc<dyn SkeletonRenderer>,
            scores: Arc::clone(&headless) as Arc<dyn ScoreRegistry>,
            binder: Arc::clone(&headless) as Arc<dyn BehaviorBinder>,
        },
        PersistenceConfig::default(),
        fixed_clock(),
    );

    let restoring = persistence.clone();
    let restore = tokio::spawn(async move { restoring.load_and_restore().await });
    gated.reached.notified().await;

    let item = WiringScope::Item(ItemIndex::new(0));
    assert_eq!(persistence.status(), SaveStatus::Restored);
    assert_eq!(persistence.registry().wired_count(item), 0);
    persistence.notify_change();
    assert_eq!(
        persistence.save_now().await,
        SaveOutcome::Dropped(DropReason::Restoring)
    );
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.post_count(), 0);

    gated.release.notify_one();
    assert!(restore.await.unwrap());
    assert!(persistence.registry().wired_count(item) > 0);
    assert_eq!(persistence.save_now().await, SaveOutcome::Saved);
    assert_eq!(store.post_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn regrading_an_item_rewires_its_new_markup() {
    let store = InMemorySessionStore::new();
    let (surface, persistence) = persistence(&store);
    let item = ItemIndex::new(0);

    persistence
        .record_result(item, "essay v1", json!({ "score": 1 }))
        .await
        .unwrap();
    let first = surface.bindings().len();
    assert!(first > 0);

    persistence
        .record_result(item, "essay v2", json!({ "score": 2 }))
        .await
        .unwrap();
    let bindings = surface.bindings();
    assert_eq!(bindings.len(), first * 2);
    assert!(
        surface
            .markup_html(item, MarkupSlot::Body)
            .unwrap()
            .contains("essay v2")
    );
    let scored: Vec<&str> = bindings
        .iter()
        .filter_map(|binding| match binding {
            Binding::EditableScores { snapshot, .. } => Some(snapshot.original_input.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(scored, ["essay v1", "essay v2"]);
    assert_eq!(surface.stripped_scopes(), vec![WiringScope::Item(item); 2]);
    assert_eq!(persistence.records().count(), 1);
    assert_eq!(store.post_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn save_landing_after_clear_keeps_the_page_idle() {
    let store = InMemorySessionStore::new();
    let (_, persistence) = persistence(&store);
    persistence
        .records()
        .record_computed(ItemIndex::new(0), ItemSnapshot::new("essay", json!({})))
        .unwrap();
    store.set_latency(Duration::from_secs(1));

    let saving = persistence.clone();
    let in_flight = tokio::spawn(async move { saving.save_now().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(persistence.status(), SaveStatus::Saving);

    store.set_latency(Duration::ZERO);
    let report = persistence.clear_session().await;
    assert!(report.deleted);
    assert_eq!(persistence.status(), SaveStatus::Idle);

    assert_eq!(in_flight.await.unwrap(), SaveOutcome::Discarded);
    assert_eq!(persistence.status(), SaveStatus::Idle);
    assert_eq!(persistence.scheduler().last_saved_at(), None);
}
