use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use grader_core::model::{ContentId, ItemIndex};

use crate::error::SurfaceError;
use crate::persistence::ItemRecords;
use crate::ports::{
    BehaviorBinder, Binding, BindingKey, Control, MarkerKind, UiSurface, WiringScope,
};

/// Bookkeeping of which behaviour is installed where.
///
/// Replaces "already wired" attributes in markup, which survive
/// serialisation while the behaviour they stand for does not.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    wired: Arc<Mutex<BTreeMap<WiringScope, BTreeSet<BindingKey>>>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<WiringScope, BTreeSet<BindingKey>>> {
        self.wired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_wired(&self, scope: WiringScope, key: &BindingKey) -> bool {
        self.lock()
            .get(&scope)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Returns `false` if the binding was already registered.
    pub fn register(&self, scope: WiringScope, key: BindingKey) -> bool {
        self.lock().entry(scope).or_default().insert(key)
    }

    pub fn forget(&self, scope: WiringScope) {
        self.lock().remove(&scope);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn wired_count(&self, scope: WiringScope) -> usize {
        self.lock().get(&scope).map_or(0, BTreeSet::len)
    }
}

/// Installs the interactive behaviour of items and highlights views, once each.
#[derive(Clone)]
pub struct HandlerReattacher {
    surface: Arc<dyn UiSurface>,
    binder: Arc<dyn BehaviorBinder>,
    registry: HandlerRegistry,
    records: ItemRecords,
}

impl HandlerReattacher {
    #[must_use]
    pub fn new(
        surface: Arc<dyn UiSurface>,
        binder: Arc<dyn BehaviorBinder>,
        registry: HandlerRegistry,
        records: ItemRecords,
    ) -> Self {
        Self {
            surface,
            binder,
            registry,
            records,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Rewire an item whose markup was replayed from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError` if the binder cannot reach an element.
    pub fn reattach_item(&self, item: ItemIndex) -> Result<usize, SurfaceError> {
        let scope = WiringScope::Item(item);
        self.binder.strip_wired_markers(scope);
        self.registry.forget(scope);
        self.wire_item(item)
    }

    /// Wire an item, skipping anything already registered. Returns how many
    /// bindings were installed.
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError` if the binder cannot reach an element.
    pub fn wire_item(&self, item: ItemIndex) -> Result<usize, SurfaceError> {
        let mut bindings = vec![Binding::SelectionRelease { item }];
        bindings.extend(
            self.binder
                .category_controls(item)
                .into_iter()
                .map(|category| Binding::CategorySelect { item, category }),
        );
        bindings.extend(
            self.binder
                .inline_markers(item)
                .into_iter()
                .filter(|marker| marker.kind != MarkerKind::Plain)
                .map(|marker| Binding::MarkerEdit {
                    item,
                    marker: marker.id,
                }),
        );
        bindings.push(Binding::EnsureHandlers { item });
        bindings.push(Binding::EssayEditor { item });
        match self.records.get(item) {
            Some(snapshot) => bindings.push(Binding::EditableScores { item, snapshot }),
            None => tracing::debug!(%item, "no record for item; editable scores not wired"),
        }
        bindings.push(Binding::ExportVisibility { item });

        let mut installed = 0;
        for binding in &bindings {
            if self.bind_once(binding)? {
                installed += 1;
            }
        }
        self.surface.fit_text_areas(Some(item));
        Ok(installed)
    }

    /// Rewire a highlights view whose markup was replayed from a snapshot.
    ///
    /// An explicit "remove all" choice made on this page wins over the
    /// checkbox's current state.
    ///
    /// # Errors
    ///
    /// Returns `SurfaceError` if the binder cannot reach an element.
    pub fn reattach_view(&self, content: ContentId) -> Result<usize, SurfaceError> {
        let scope = WiringScope::View(content);
        self.binder.strip_wired_markers(scope);
        self.registry.forget(scope);

        let checked = self
            .records
            .remove_all_preference(content)
            .unwrap_or_else(|| self.surface.is_checked(Control::RemoveAll(content)));

        let mut installed = 0;
        for binding in [
            Binding::ToggleButtons { content },
            Binding::RemoveAll { content, checked },
        ] {
            if self.bind_once(&binding)? {
                installed += 1;
            }
        }
        Ok(installed)
    }

    fn bind_once(&self, binding: &Binding) -> Result<bool, SurfaceError> {
        let (scope, key) = (binding.scope(), binding.key());
        if self.registry.is_wired(scope, &key) {
            return Ok(false);
        }
        self.binder.bind(binding)?;
        self.registry.register(scope, key);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;
    use crate::ports::InlineMarker;
    use grader_core::model::{Category, ItemSnapshot};
    use serde_json::json;

    fn setup() -> (Arc<HeadlessSurface>, ItemRecords, HandlerReattacher) {
        let surface = Arc::new(HeadlessSurface::new());
        let records = ItemRecords::new();
        let reattacher = HandlerReattacher::new(
            Arc::clone(&surface) as Arc<dyn UiSurface>,
            Arc::clone(&surface) as Arc<dyn BehaviorBinder>,
            HandlerRegistry::new(),
            records.clone(),
        );
        (surface, records, reattacher)
    }

    fn marker(id: &str, kind: MarkerKind) -> InlineMarker {
        InlineMarker {
            id: id.into(),
            kind,
        }
    }

    #[test]
    fn item_wiring_skips_plain_text_and_passes_the_record() {
        let (surface, records, reattacher) = setup();
        let item = ItemIndex::new(0);
        let snapshot = ItemSnapshot::new("essay", json!({ "score": 3 }));
        records.update(item, snapshot.clone());
        surface.set_categories(vec![Category::new("content"), Category::new("grammar")]);
        surface.set_inline_markers(
            item,
            vec![
                marker("c1", MarkerKind::Correction),
                marker("t1", MarkerKind::Plain),
                marker("h1", MarkerKind::Highlight),
            ],
        );

        let installed = reattacher.reattach_item(item).unwrap();
        assert_eq!(installed, 9);

        let bindings = surface.bindings();
        assert!(bindings.contains(&Binding::MarkerEdit {
            item,
            marker: "c1".into()
        }));
        assert!(!bindings.contains(&Binding::MarkerEdit {
            item,
            marker: "t1".into()
        }));
        assert!(bindings.contains(&Binding::EditableScores { item, snapshot }));
        assert_eq!(surface.stripped_scopes(), vec![WiringScope::Item(item)]);
        assert_eq!(surface.fitted_scopes(), vec![Some(item)]);
    }

    #[test]
    fn wiring_twice_is_a_no_op_until_reattached() {
        let (surface, _, reattacher) = setup();
        let item = ItemIndex::new(2);

        let first = reattacher.wire_item(item).unwrap();
        assert_eq!(reattacher.wire_item(item).unwrap(), 0);
        assert_eq!(surface.bindings().len(), first);

        assert_eq!(reattacher.reattach_item(item).unwrap(), first);
        assert_eq!(surface.bindings().len(), first * 2);
    }

    #[test]
    fn local_preference_beats_checkbox_state() {
        let (surface, records, reattacher) = setup();
        let content = ContentId::standalone(ItemIndex::new(1));
        surface.toggle(Control::RemoveAll(content), true);

        reattacher.reattach_view(content).unwrap();
        assert_eq!(surface.excluded(content), Some(true));

        records.set_remove_all_preference(content, false);
        reattacher.reattach_view(content).unwrap();
        assert_eq!(surface.excluded(content), Some(false));
        assert_eq!(reattacher.registry().wired_count(WiringScope::View(content)), 2);
    }
}
