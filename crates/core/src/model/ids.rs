use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Zero-based position of an item within a grading batch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIndex(usize);

impl ItemIndex {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn value(&self) -> usize {
        self.0
    }

    /// Iterates `0..count` as item indices.
    pub fn range(count: usize) -> impl Iterator<Item = ItemIndex> {
        (0..count).map(ItemIndex)
    }
}

impl fmt::Debug for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemIndex({})", self.0)
    }
}

impl fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a top-level view tab.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scoring category name (e.g. "content", "grammar").
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two lazily rendered highlights views every item carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HighlightsView {
    /// The dedicated highlights tab.
    Standalone,
    /// The highlights panel embedded next to the item body.
    Inline,
}

impl HighlightsView {
    pub const ALL: [HighlightsView; 2] = [HighlightsView::Standalone, HighlightsView::Inline];

    fn prefix(self) -> &'static str {
        match self {
            HighlightsView::Standalone => "highlights-tab-content-",
            HighlightsView::Inline => "highlights-inline-content-",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentIdError {
    #[error("unknown content id prefix: {0}")]
    UnknownPrefix(String),
    #[error("invalid item index in content id: {0}")]
    InvalidIndex(String),
}

/// Identifies one highlights view of one item.
///
/// Serialised as the rendered element id, e.g. `highlights-tab-content-1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId {
    view: HighlightsView,
    item: ItemIndex,
}

impl ContentId {
    #[must_use]
    pub fn new(view: HighlightsView, item: ItemIndex) -> Self {
        Self { view, item }
    }

    #[must_use]
    pub fn standalone(item: ItemIndex) -> Self {
        Self::new(HighlightsView::Standalone, item)
    }

    #[must_use]
    pub fn inline(item: ItemIndex) -> Self {
        Self::new(HighlightsView::Inline, item)
    }

    #[must_use]
    pub fn view(&self) -> HighlightsView {
        self.view
    }

    #[must_use]
    pub fn item(&self) -> ItemIndex {
        self.item
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.view.prefix(), self.item)
    }
}

impl FromStr for ContentId {
    type Err = ContentIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        for view in HighlightsView::ALL {
            if let Some(rest) = raw.strip_prefix(view.prefix()) {
                let index = rest
                    .parse::<usize>()
                    .map_err(|_| ContentIdError::InvalidIndex(raw.to_owned()))?;
                return Ok(Self::new(view, ItemIndex::new(index)));
            }
        }
        Err(ContentIdError::UnknownPrefix(raw.to_owned()))
    }
}

impl TryFrom<String> for ContentId {
    type Error = ContentIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentId> for String {
    fn from(value: ContentId) -> Self {
        value.to_string()
    }
}
