use std::env;
use std::time::Duration;

use grader_core::model::TabId;

const DEFAULT_DEBOUNCE_MS: u64 = 2_500;
const DEFAULT_RETRY_MS: u64 = 10_000;
const DEFAULT_LEGACY_SCAN_LIMIT: usize = 50;

/// Tunables for the save/restore subsystem.
#[derive(Clone, Debug)]
pub struct PersistenceConfig {
    /// Quiet period after the last edit before a save fires.
    pub debounce: Duration,
    /// Delay before the single retry of a failed save.
    pub retry_delay: Duration,
    /// Tab persisted when no tab is active.
    pub fallback_tab: TabId,
    /// How far past the known item count the legacy scans probe.
    pub legacy_scan_limit: usize,
    /// Body markup containing any of these is a placeholder, not a render.
    pub placeholder_markers: Vec<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_MS),
            fallback_tab: TabId::new("grader"),
            legacy_scan_limit: DEFAULT_LEGACY_SCAN_LIMIT,
            placeholder_markers: vec!["Loading...".into(), "Formatting...".into()],
        }
    }
}

impl PersistenceConfig {
    /// Defaults overridden by `GRADER_*` environment variables where set and valid.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_parse::<u64>("GRADER_SAVE_DEBOUNCE_MS") {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("GRADER_SAVE_RETRY_MS") {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(limit) = env_parse::<usize>("GRADER_LEGACY_SCAN_LIMIT") {
            config.legacy_scan_limit = limit;
        }
        if let Some(tab) = env::var("GRADER_FALLBACK_TAB")
            .ok()
            .filter(|tab| !tab.trim().is_empty())
        {
            config.fallback_tab = TabId::new(tab.trim());
        }
        config
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn with_fallback_tab(mut self, tab: TabId) -> Self {
        self.fallback_tab = tab;
        self
    }

    #[must_use]
    pub fn is_placeholder(&self, html: &str) -> bool {
        let trimmed = html.trim();
        trimmed.is_empty()
            || self
                .placeholder_markers
                .iter()
                .any(|marker| trimmed.contains(marker.as_str()))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}
