use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use grader_core::model::{
    BatchRecord, Category, ContentId, GradeResult, HighlightsView, ItemIndex, ScoreOverride,
    ScoreOverrides, TabId,
};

use crate::error::SurfaceError;
use crate::persistence::ItemRecords;
use crate::ports::{
    BehaviorBinder, Binding, Control, InlineMarker, MarkupFragment, MarkupSlot, ScoreRegistry,
    SkeletonRenderer, UiSurface, WiringScope,
};

const BODY_PLACEHOLDER: &str = "<p class=\"muted\">Formatting...</p>";

#[derive(Default)]
struct HeadlessState {
    active_tab: Option<TabId>,
    rendered: BTreeSet<ItemIndex>,
    markup: BTreeMap<(ItemIndex, MarkupSlot), MarkupFragment>,
    checked: BTreeMap<Control, bool>,
    score_inputs: BTreeMap<(ItemIndex, Category), ScoreOverride>,
    score_changes: Vec<(ItemIndex, Category)>,
    overrides: ScoreOverrides,
    categories: Vec<Category>,
    inline_markers: BTreeMap<ItemIndex, Vec<InlineMarker>>,
    bindings: Vec<Binding>,
    stripped: Vec<WiringScope>,
    excluded: BTreeMap<ContentId, bool>,
    fitted: Vec<Option<ItemIndex>>,
    skeleton_renders: usize,
    output_cleared: usize,
    fail_tab_switch: bool,
}

/// In-memory grading page for tests and headless tooling.
///
/// Implements every collaborator role over plain maps and records what the
/// persistence layer asked of it.
#[derive(Default)]
pub struct HeadlessSurface {
    state: Mutex<HeadlessState>,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn select_tab(&self, tab: TabId) {
        self.lock().active_tab = Some(tab);
    }

    pub fn put_markup(&self, item: ItemIndex, slot: MarkupSlot, fragment: MarkupFragment) {
        let mut state = self.lock();
        state.rendered.insert(item);
        state.markup.insert((item, slot), fragment);
    }

    /// Simulates the user clicking a checkbox.
    pub fn toggle(&self, control: Control, checked: bool) {
        self.lock().checked.insert(control, checked);
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        self.lock().categories = categories;
    }

    pub fn set_inline_markers(&self, item: ItemIndex, markers: Vec<InlineMarker>) {
        self.lock().inline_markers.insert(item, markers);
    }

    /// Make every subsequent `switch_tab` fail.
    pub fn fail_tab_switches(&self, fail: bool) {
        self.lock().fail_tab_switch = fail;
    }

    #[must_use]
    pub fn markup_html(&self, item: ItemIndex, slot: MarkupSlot) -> Option<String> {
        self.lock()
            .markup
            .get(&(item, slot))
            .map(|fragment| fragment.html.clone())
    }

    #[must_use]
    pub fn bindings(&self) -> Vec<Binding> {
        self.lock().bindings.clone()
    }

    #[must_use]
    pub fn stripped_scopes(&self) -> Vec<WiringScope> {
        self.lock().stripped.clone()
    }

    /// Visual "excluded from export" state of a highlights view's toggle buttons.
    #[must_use]
    pub fn excluded(&self, content: ContentId) -> Option<bool> {
        self.lock().excluded.get(&content).copied()
    }

    #[must_use]
    pub fn score_input(&self, item: ItemIndex, category: &Category) -> Option<ScoreOverride> {
        self.lock()
            .score_inputs
            .get(&(item, category.clone()))
            .cloned()
    }

    #[must_use]
    pub fn score_changes(&self) -> Vec<(ItemIndex, Category)> {
        self.lock().score_changes.clone()
    }

    #[must_use]
    pub fn fitted_scopes(&self) -> Vec<Option<ItemIndex>> {
        self.lock().fitted.clone()
    }

    #[must_use]
    pub fn skeleton_renders(&self) -> usize {
        self.lock().skeleton_renders
    }

    #[must_use]
    pub fn output_cleared(&self) -> usize {
        self.lock().output_cleared
    }

    #[must_use]
    pub fn rendered_items(&self) -> usize {
        self.lock().rendered.len()
    }
}

#[async_trait]
impl UiSurface for HeadlessSurface {
    fn active_tab(&self) -> Option<TabId> {
        self.lock().active_tab.clone()
    }

    fn switch_tab(&self, tab: &TabId) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        if state.fail_tab_switch {
            return Err(SurfaceError::UnknownTab(tab.to_string()));
        }
        state.active_tab = Some(tab.clone());
        Ok(())
    }

    fn markup(&self, item: ItemIndex, slot: MarkupSlot) -> Option<MarkupFragment> {
        self.lock().markup.get(&(item, slot)).cloned()
    }

    fn inject_markup(
        &self,
        item: ItemIndex,
        slot: MarkupSlot,
        html: &str,
    ) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        state.rendered.insert(item);
        let populated = matches!(slot, MarkupSlot::Body);
        state.markup.insert(
            (item, slot),
            MarkupFragment {
                html: html.to_owned(),
                populated,
            },
        );
        Ok(())
    }

    fn mark_populated(&self, item: ItemIndex, view: HighlightsView) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        let fragment = state
            .markup
            .get_mut(&(item, MarkupSlot::Highlights(view)))
            .ok_or_else(|| SurfaceError::MissingElement(ContentId::new(view, item).to_string()))?;
        fragment.populated = true;
        Ok(())
    }

    fn is_checked(&self, control: Control) -> bool {
        self.lock().checked.get(&control).copied().unwrap_or(false)
    }

    fn set_checked(&self, control: Control, checked: bool) -> Result<(), SurfaceError> {
        self.lock().checked.insert(control, checked);
        Ok(())
    }

    fn apply_score_input(
        &self,
        item: ItemIndex,
        category: &Category,
        value: &ScoreOverride,
    ) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        state
            .score_inputs
            .insert((item, category.clone()), value.clone());
        state.score_changes.push((item, category.clone()));
        Ok(())
    }

    fn fit_text_areas(&self, scope: Option<ItemIndex>) {
        self.lock().fitted.push(scope);
    }

    fn clear_output(&self) {
        let mut state = self.lock();
        state.rendered.clear();
        state.markup.clear();
        state.checked.clear();
        state.score_inputs.clear();
        state.output_cleared += 1;
    }
}

impl SkeletonRenderer for HeadlessSurface {
    fn render_skeleton(
        &self,
        batch: &BatchRecord,
        records: &ItemRecords,
    ) -> Result<(), SurfaceError> {
        records.reset_from_batch(batch);
        let mut state = self.lock();
        state.rendered.clear();
        state.markup.clear();
        state.checked.clear();
        state.score_inputs.clear();
        for item in ItemIndex::range(batch.count()) {
            state.rendered.insert(item);
            state.markup.insert(
                (item, MarkupSlot::Body),
                MarkupFragment::pending(BODY_PLACEHOLDER),
            );
            for view in HighlightsView::ALL {
                state.markup.insert(
                    (item, MarkupSlot::Highlights(view)),
                    MarkupFragment::pending(""),
                );
            }
        }
        state.skeleton_renders += 1;
        Ok(())
    }

    fn render_item(&self, original_input: &str, result: &GradeResult) -> String {
        format!("<article class=\"essay\"><p>{original_input}</p><aside>{result}</aside></article>")
    }
}

impl ScoreRegistry for HeadlessSurface {
    fn overrides(&self) -> ScoreOverrides {
        self.lock().overrides.clone()
    }

    fn set_override(&self, item: ItemIndex, category: &Category, value: ScoreOverride) {
        self.lock()
            .overrides
            .entry(item)
            .or_default()
            .insert(category.clone(), value);
    }

    fn clear(&self) {
        self.lock().overrides.clear();
    }
}

impl BehaviorBinder for HeadlessSurface {
    fn strip_wired_markers(&self, scope: WiringScope) {
        self.lock().stripped.push(scope);
    }

    fn inline_markers(&self, item: ItemIndex) -> Vec<InlineMarker> {
        self.lock()
            .inline_markers
            .get(&item)
            .cloned()
            .unwrap_or_default()
    }

    fn category_controls(&self, _item: ItemIndex) -> Vec<Category> {
        self.lock().categories.clone()
    }

    fn bind(&self, binding: &Binding) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        if let Binding::RemoveAll { content, checked } = binding {
            state.excluded.insert(*content, *checked);
        }
        state.bindings.push(binding.clone());
        Ok(())
    }
}
