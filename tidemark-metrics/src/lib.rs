//! Metrics registry built on the tidemark skip list.
//!
//! The user-visible surface is a [`MetricsRegistry`] mapping metric paths
//! and tag sets to metrics:
//!
//! - [`Counter`] - an atomic integer
//! - [`Ewma`] - an exponentially weighted moving average over a decay window
//! - [`SlidingWindow`] - a time-bounded reservoir of samples, kept in the
//!   lock-free skip list so recording never takes a lock
//!
//! ```ignore
//! use std::time::Duration;
//! use tidemark_metrics::{MetricsRegistry, TagCollection};
//!
//! let registry = MetricsRegistry::new();
//!
//! let requests = registry
//!     .counter("api.requests", TagCollection::new().with("region", "eu"))
//!     .unwrap();
//! requests.inc();
//!
//! let latency = registry
//!     .window("api.latency", Duration::from_secs(60), TagCollection::new())
//!     .unwrap();
//! latency.record(12.5);
//! ```

pub mod clock;
pub mod counter;
pub mod ewma;
pub mod path;
pub mod registry;
pub mod snapshot;
pub mod tags;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::Counter;
pub use ewma::Ewma;
pub use path::MetricPath;
pub use registry::{MetricHandle, MetricKind, MetricsRegistry, RegisteredMetric, RegistryError};
pub use snapshot::{Snapshot, WindowSnapshot};
pub use tags::TagCollection;
pub use window::SlidingWindow;
