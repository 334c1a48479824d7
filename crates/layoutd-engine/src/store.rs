//! Per-application input source memory.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::types::{AppId, SourceId};

/// Shared map from application to the input source it last used.
///
/// Clones share the same map. Every operation takes the lock exactly once, so
/// readers never observe a partial update and concurrent callers on different
/// keys cannot corrupt the map. Contents live only as long as the process.
#[derive(Clone, Debug, Default)]
pub struct InputSourceStore {
    /// Application to input source map.
    inner: Arc<Mutex<HashMap<AppId, SourceId>>>,
}

impl InputSourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The input source remembered for `app`, if any.
    pub fn load(&self, app: &AppId) -> Option<SourceId> {
        self.inner.lock().get(app).cloned()
    }

    /// Remember `source` for `app`, returning the value it replaced.
    pub fn save(&self, app: AppId, source: SourceId) -> Option<SourceId> {
        self.inner.lock().insert(app, source)
    }

    /// Number of applications with a remembered source.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing has been remembered yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of the current contents, ordered by application id.
    pub fn snapshot(&self) -> Vec<(AppId, SourceId)> {
        let mut out: Vec<_> = self
            .inner
            .lock()
            .iter()
            .map(|(a, s)| (a.clone(), s.clone()))
            .collect();
        out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        out
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn load_missing_is_none() {
        let store = InputSourceStore::new();
        assert!(store.load(&AppId::from("com.example.app")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn save_overwrites_and_returns_previous() {
        let store = InputSourceStore::new();
        let app = AppId::from("com.example.app");
        assert_eq!(store.save(app.clone(), SourceId::from("us")), None);
        assert_eq!(
            store.save(app.clone(), SourceId::from("de")),
            Some(SourceId::from("us"))
        );
        assert_eq!(store.load(&app), Some(SourceId::from("de")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let store = InputSourceStore::new();
        let other = store.clone();
        other.save(AppId::from("a"), SourceId::from("x"));
        assert_eq!(store.load(&AppId::from("a")), Some(SourceId::from("x")));
    }

    #[test]
    fn concurrent_saves_on_distinct_keys_all_land() {
        let store = InputSourceStore::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    for j in 0..100 {
                        store.save(
                            AppId::new(format!("app.{i}")),
                            SourceId::new(format!("src.{j}")),
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer thread");
        }
        assert_eq!(store.len(), 8);
        for i in 0..8 {
            assert_eq!(
                store.load(&AppId::new(format!("app.{i}"))),
                Some(SourceId::from("src.99"))
            );
        }
    }

    #[test]
    fn snapshot_is_sorted_by_app() {
        let store = InputSourceStore::new();
        store.save(AppId::from("b"), SourceId::from("2"));
        store.save(AppId::from("a"), SourceId::from("1"));
        let snap = store.snapshot();
        assert_eq!(snap[0].0, AppId::from("a"));
        assert_eq!(snap[1].0, AppId::from("b"));
    }
}
