//! The metrics registry.
//!
//! A two-level, mutex-guarded map: path -> registered metric -> tag
//! permutation -> handle. Accessors get-or-register and hand back `Arc`
//! handles, so the locks are only held during lookup, never while a
//! metric is being updated.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::counter::Counter;
use crate::ewma::Ewma;
use crate::path::MetricPath;
use crate::snapshot::Snapshot;
use crate::tags::TagCollection;
use crate::window::SlidingWindow;

/// The kind of metric registered under a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Ewma,
    Window,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Ewma => "ewma",
            MetricKind::Window => "window",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A path can only ever hold one kind of metric.
    #[error("metric `{path}` is registered as {existing}, not {requested}")]
    KindMismatch {
        path: MetricPath,
        existing: MetricKind,
        requested: MetricKind,
    },
}

/// A shared handle to one tagged metric permutation.
#[derive(Clone)]
pub enum MetricHandle {
    Counter(Arc<Counter>),
    Ewma(Arc<Ewma>),
    Window(Arc<SlidingWindow>),
}

impl MetricHandle {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricHandle::Counter(_) => MetricKind::Counter,
            MetricHandle::Ewma(_) => MetricKind::Ewma,
            MetricHandle::Window(_) => MetricKind::Window,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        match self {
            MetricHandle::Counter(counter) => counter.snapshot(),
            MetricHandle::Ewma(ewma) => ewma.snapshot(),
            MetricHandle::Window(window) => window.aggregate_snapshot(),
        }
    }
}

/// Everything registered under one path: the kind, and a handle per tag
/// permutation.
pub struct RegisteredMetric {
    kind: MetricKind,
    tagged: Mutex<HashMap<TagCollection, MetricHandle>>,
}

impl RegisteredMetric {
    fn new(kind: MetricKind) -> Self {
        RegisteredMetric {
            kind,
            tagged: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    fn child(&self, tags: TagCollection, build: impl FnOnce() -> MetricHandle) -> MetricHandle {
        let mut tagged = self.tagged.lock().unwrap();
        tagged.entry(tags).or_insert_with(build).clone()
    }

    /// Call `visit` with every tag permutation and its current snapshot.
    /// Snapshots are taken outside the lock.
    pub fn visit(&self, mut visit: impl FnMut(&TagCollection, Snapshot)) {
        let handles: Vec<(TagCollection, MetricHandle)> = {
            let tagged = self.tagged.lock().unwrap();
            tagged
                .iter()
                .map(|(tags, handle)| (tags.clone(), handle.clone()))
                .collect()
        };

        for (tags, handle) in handles {
            visit(&tags, handle.snapshot());
        }
    }

    /// Merge the snapshots of every tag permutation into one.
    pub fn aggregate(&self) -> Option<Snapshot> {
        let handles: Vec<MetricHandle> = {
            let tagged = self.tagged.lock().unwrap();
            tagged.values().cloned().collect()
        };

        let mut merged: Option<Snapshot> = None;
        for handle in handles {
            let snapshot = handle.snapshot();
            merged = Some(match merged {
                None => snapshot,
                Some(acc) => acc.merge(snapshot),
            });
        }
        merged
    }
}

/// The registry mapping `(path, tags)` to metrics.
#[derive(Default)]
pub struct MetricsRegistry {
    metrics: Mutex<HashMap<MetricPath, Arc<RegisteredMetric>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_register(
        &self,
        path: MetricPath,
        kind: MetricKind,
    ) -> Result<Arc<RegisteredMetric>, RegistryError> {
        let mut metrics = self.metrics.lock().unwrap();

        if let Some(existing) = metrics.get(&path) {
            if existing.kind() != kind {
                return Err(RegistryError::KindMismatch {
                    path,
                    existing: existing.kind(),
                    requested: kind,
                });
            }
            return Ok(Arc::clone(existing));
        }

        debug!(path = %path, kind = %kind, "registering metric");
        let registered = Arc::new(RegisteredMetric::new(kind));
        metrics.insert(path, Arc::clone(&registered));
        Ok(registered)
    }

    /// The counter at `path` with `tags`, registering it if absent.
    pub fn counter(
        &self,
        path: impl Into<MetricPath>,
        tags: TagCollection,
    ) -> Result<Arc<Counter>, RegistryError> {
        let path = path.into();
        let registered = self.get_or_register(path.clone(), MetricKind::Counter)?;
        let handle = registered.child(tags, || MetricHandle::Counter(Arc::new(Counter::default())));

        match handle {
            MetricHandle::Counter(counter) => Ok(counter),
            other => Err(RegistryError::KindMismatch {
                path,
                existing: other.kind(),
                requested: MetricKind::Counter,
            }),
        }
    }

    /// The EWMA at `path` with `tags`. `window` and `interval` apply only
    /// when this call registers the metric; an existing EWMA keeps its
    /// configuration.
    pub fn ewma(
        &self,
        path: impl Into<MetricPath>,
        window: Duration,
        interval: Duration,
        tags: TagCollection,
    ) -> Result<Arc<Ewma>, RegistryError> {
        let path = path.into();
        let registered = self.get_or_register(path.clone(), MetricKind::Ewma)?;
        let handle = registered.child(tags, || {
            MetricHandle::Ewma(Arc::new(Ewma::new(window, interval)))
        });

        match handle {
            MetricHandle::Ewma(ewma) => Ok(ewma),
            other => Err(RegistryError::KindMismatch {
                path,
                existing: other.kind(),
                requested: MetricKind::Ewma,
            }),
        }
    }

    /// The sliding-window reservoir at `path` with `tags`. `window`
    /// applies only when this call registers the metric.
    pub fn window(
        &self,
        path: impl Into<MetricPath>,
        window: Duration,
        tags: TagCollection,
    ) -> Result<Arc<SlidingWindow>, RegistryError> {
        let path = path.into();
        let registered = self.get_or_register(path.clone(), MetricKind::Window)?;
        let handle = registered.child(tags, || {
            MetricHandle::Window(Arc::new(SlidingWindow::new(window)))
        });

        match handle {
            MetricHandle::Window(window) => Ok(window),
            other => Err(RegistryError::KindMismatch {
                path,
                existing: other.kind(),
                requested: MetricKind::Window,
            }),
        }
    }

    /// Call `visit` with every `(path, tags)` permutation and its current
    /// snapshot. Useful for publishers. The registry lock is released
    /// before any snapshot is taken.
    pub fn visit(&self, mut visit: impl FnMut(&MetricPath, &TagCollection, Snapshot)) {
        let entries: Vec<(MetricPath, Arc<RegisteredMetric>)> = {
            let metrics = self.metrics.lock().unwrap();
            metrics
                .iter()
                .map(|(path, registered)| (path.clone(), Arc::clone(registered)))
                .collect()
        };

        for (path, registered) in entries {
            registered.visit(|tags, snapshot| visit(&path, tags, snapshot));
        }
    }

    /// Merge the snapshots of every tag permutation under `path`.
    pub fn aggregate(&self, path: &MetricPath) -> Option<Snapshot> {
        let registered = {
            let metrics = self.metrics.lock().unwrap();
            metrics.get(path).cloned()
        }?;
        registered.aggregate()
    }
}
