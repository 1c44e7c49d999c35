//! Seams to the UI collaborators the persistence subsystem drives.
//!
//! The rendering toolkit owns the actual elements; these traits expose only
//! the reads and writes capture and restore need.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use grader_core::model::{
    BatchRecord, Category, ContentId, GradeResult, HighlightsView, ItemIndex, ItemSnapshot,
    ScoreOverride, ScoreOverrides, TabId,
};

use crate::error::SurfaceError;
use crate::persistence::ItemRecords;

/// Which cached fragment of an item is addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkupSlot {
    Body,
    Highlights(HighlightsView),
}

/// Rendered markup plus whether its lazy render has completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupFragment {
    pub html: String,
    pub populated: bool,
}

impl MarkupFragment {
    #[must_use]
    pub fn populated(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            populated: true,
        }
    }

    #[must_use]
    pub fn pending(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            populated: false,
        }
    }
}

/// A boolean control whose state does not survive markup serialisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Control {
    MarkComplete(ItemIndex),
    RemoveAll(ContentId),
}

/// The rendered grading page.
#[async_trait]
pub trait UiSurface: Send + Sync {
    fn active_tab(&self) -> Option<TabId>;

    /// # Errors
    ///
    /// Returns `SurfaceError::UnknownTab` if no such tab exists.
    fn switch_tab(&self, tab: &TabId) -> Result<(), SurfaceError>;

    fn markup(&self, item: ItemIndex, slot: MarkupSlot) -> Option<MarkupFragment>;

    /// Write markup straight into the slot's placeholder, bypassing formatting.
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError::MissingElement` if the slot was not rendered.
    fn inject_markup(&self, item: ItemIndex, slot: MarkupSlot, html: &str)
    -> Result<(), SurfaceError>;

    /// Flag a highlights view as loaded so the lazy render path skips it.
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError::MissingElement` if the view was not rendered.
    fn mark_populated(&self, item: ItemIndex, view: HighlightsView) -> Result<(), SurfaceError>;

    /// Missing controls read as unchecked.
    fn is_checked(&self, control: Control) -> bool;

    /// # Errors
    ///
    /// Returns `SurfaceError::MissingElement` if the control does not exist.
    fn set_checked(&self, control: Control, checked: bool) -> Result<(), SurfaceError>;

    /// Write an override into its score input and fire the input's change
    /// notification so dependent totals recompute.
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError::MissingElement` if the input does not exist.
    fn apply_score_input(
        &self,
        item: ItemIndex,
        category: &Category,
        value: &ScoreOverride,
    ) -> Result<(), SurfaceError>;

    /// Resize auto-growing text inputs to their content; `None` means the whole page.
    fn fit_text_areas(&self, scope: Option<ItemIndex>);

    /// Empty the visible output area.
    fn clear_output(&self);

    /// Resolves once injected markup is live in the rendering tree.
    async fn settled(&self) {}
}

/// Produces item markup and the per-item skeleton.
pub trait SkeletonRenderer: Send + Sync {
    /// Render the item list for `batch`.
    ///
    /// Resets `records` to the pristine computed form of every item.
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError::Render` if the skeleton cannot be built.
    fn render_skeleton(&self, batch: &BatchRecord, records: &ItemRecords)
    -> Result<(), SurfaceError>;

    fn render_item(&self, original_input: &str, result: &GradeResult) -> String;
}

/// Registry of manual score overrides.
pub trait ScoreRegistry: Send + Sync {
    fn overrides(&self) -> ScoreOverrides;
    fn set_override(&self, item: ItemIndex, category: &Category, value: ScoreOverride);
    fn clear(&self);
}

/// What kind of wiring a `Binding` installs; used as the registry key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKey {
    SelectionRelease,
    CategorySelect(Category),
    MarkerEdit(String),
    EnsureHandlers,
    EssayEditor,
    EditableScores,
    ExportVisibility,
    ToggleButtons,
    RemoveAll,
}

/// Where a set of bindings lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WiringScope {
    Item(ItemIndex),
    View(ContentId),
}

/// One unit of interactive behaviour to install.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    SelectionRelease { item: ItemIndex },
    CategorySelect { item: ItemIndex, category: Category },
    MarkerEdit { item: ItemIndex, marker: String },
    EnsureHandlers { item: ItemIndex },
    EssayEditor { item: ItemIndex },
    EditableScores { item: ItemIndex, snapshot: ItemSnapshot },
    ExportVisibility { item: ItemIndex },
    ToggleButtons { content: ContentId },
    RemoveAll { content: ContentId, checked: bool },
}

impl Binding {
    #[must_use]
    pub fn scope(&self) -> WiringScope {
        match self {
            Binding::SelectionRelease { item }
            | Binding::CategorySelect { item, .. }
            | Binding::MarkerEdit { item, .. }
            | Binding::EnsureHandlers { item }
            | Binding::EssayEditor { item }
            | Binding::EditableScores { item, .. }
            | Binding::ExportVisibility { item } => WiringScope::Item(*item),
            Binding::ToggleButtons { content } | Binding::RemoveAll { content, .. } => {
                WiringScope::View(*content)
            }
        }
    }

    #[must_use]
    pub fn key(&self) -> BindingKey {
        match self {
            Binding::SelectionRelease { .. } => BindingKey::SelectionRelease,
            Binding::CategorySelect { category, .. } => BindingKey::CategorySelect(category.clone()),
            Binding::MarkerEdit { marker, .. } => BindingKey::MarkerEdit(marker.clone()),
            Binding::EnsureHandlers { .. } => BindingKey::EnsureHandlers,
            Binding::EssayEditor { .. } => BindingKey::EssayEditor,
            Binding::EditableScores { .. } => BindingKey::EditableScores,
            Binding::ExportVisibility { .. } => BindingKey::ExportVisibility,
            Binding::ToggleButtons { .. } => BindingKey::ToggleButtons,
            Binding::RemoveAll { .. } => BindingKey::RemoveAll,
        }
    }
}

/// Kind of an inline marker inside an item body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    Correction,
    Highlight,
    /// Unmarked text; never editable.
    Plain,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineMarker {
    pub id: String,
    pub kind: MarkerKind,
}

/// Installs interactive behaviour onto rendered elements.
pub trait BehaviorBinder: Send + Sync {
    /// Remove serialised "already wired" attributes from the scope and its descendants.
    fn strip_wired_markers(&self, scope: WiringScope);

    fn inline_markers(&self, item: ItemIndex) -> Vec<InlineMarker>;

    fn category_controls(&self, item: ItemIndex) -> Vec<Category>;

    /// # Errors
    ///
    /// Returns `SurfaceError::MissingElement` if the target is not rendered.
    fn bind(&self, binding: &Binding) -> Result<(), SurfaceError>;
}

/// The set of collaborators capture and restore talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub surface: Arc<dyn UiSurface>,
    pub renderer: Arc<dyn SkeletonRenderer>,
    pub scores: Arc<dyn ScoreRegistry>,
    pub binder: Arc<dyn BehaviorBinder>,
}

impl Collaborators {
    /// Use one object for every collaborator role.
    #[must_use]
    pub fn from_single<T>(ui: Arc<T>) -> Self
    where
        T: UiSurface + SkeletonRenderer + ScoreRegistry + BehaviorBinder + 'static,
    {
        Self {
            surface: Arc::clone(&ui) as Arc<dyn UiSurface>,
            renderer: Arc::clone(&ui) as Arc<dyn SkeletonRenderer>,
            scores: Arc::clone(&ui) as Arc<dyn ScoreRegistry>,
            binder: ui as Arc<dyn BehaviorBinder>,
        }
    }
}

/// Drops categories with no overrides so empty maps are never persisted.
#[must_use]
pub fn non_empty_overrides(overrides: ScoreOverrides) -> ScoreOverrides {
    overrides
        .into_iter()
        .filter(|(_, per_item): &(ItemIndex, BTreeMap<Category, ScoreOverride>)| {
            !per_item.is_empty()
        })
        .collect()
}
