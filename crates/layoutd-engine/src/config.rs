//! Engine configuration.

use std::collections::HashSet;

use crate::types::AppId;

/// System surfaces that never get a window watcher.
///
/// The first two cannot be observed through Accessibility at all. The other
/// two do not reliably send hide notifications when dismissed.
pub const DEFAULT_EXCLUDED_APPS: &[&str] = &[
    "com.apple.dock",
    "com.apple.universalcontrol",
    "com.apple.controlcenter",
    "com.apple.notificationcenterui",
];

/// Default capacity of the tracker's diagnostic event stream.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Applications excluded from window watching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exclusions(HashSet<AppId>);

impl Exclusions {
    /// An empty exclusion set.
    pub fn none() -> Self {
        Self(HashSet::new())
    }

    /// Add one application to the set.
    pub fn with(mut self, app: impl Into<AppId>) -> Self {
        self.0.insert(app.into());
        self
    }

    /// True if `app` must not be watched.
    pub fn contains(&self, app: &AppId) -> bool {
        self.0.contains(app)
    }

    /// Number of excluded applications.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Exclusions {
    fn default() -> Self {
        DEFAULT_EXCLUDED_APPS
            .iter()
            .fold(Self::none(), |acc, id| acc.with(*id))
    }
}

impl<A: Into<AppId>> Extend<A> for Exclusions {
    fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Tunables for the tracker and registry.
#[derive(Clone, Debug)]
pub struct Config {
    /// Applications that never receive a window watcher.
    pub exclusions: Exclusions,
    /// Buffer size of the tracker event broadcast.
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclusions: Exclusions::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Config {
    /// Add extra applications to the exclusion set.
    pub fn with_excluded_apps<I, A>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AppId>,
    {
        self.exclusions.extend(apps);
        self
    }

    /// Override the tracker event buffer size (clamped to at least 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
