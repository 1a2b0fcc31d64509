//! Point-in-time metric values and their aggregation.

/// A point-in-time value of one metric permutation.
///
/// Snapshots of the same metric path can be merged to aggregate across
/// tag permutations.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Counter(i64),
    Ewma(f64),
    Window(WindowSnapshot),
}

impl Snapshot {
    /// Merge two snapshots of the same kind: counters and rates sum,
    /// window snapshots pool their samples.
    ///
    /// # Panics
    ///
    /// Panics when the kinds differ. The registry only merges snapshots
    /// taken under one path, which share a kind by construction.
    pub fn merge(self, other: Snapshot) -> Snapshot {
        match (self, other) {
            (Snapshot::Counter(a), Snapshot::Counter(b)) => Snapshot::Counter(a + b),
            (Snapshot::Ewma(a), Snapshot::Ewma(b)) => Snapshot::Ewma(a + b),
            (Snapshot::Window(a), Snapshot::Window(b)) => Snapshot::Window(a.merge(b)),
            _ => panic!("cannot merge snapshots of different metric kinds"),
        }
    }
}

/// The samples currently inside a sliding window, sorted ascending.
///
/// Keeping the raw samples makes merging exact; the summary statistics
/// are computed on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot {
    values: Vec<f64>,
}

impl WindowSnapshot {
    pub fn from_values(mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        WindowSnapshot { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Nearest-rank quantile, `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.values.is_empty() || !(0.0..=1.0).contains(&q) {
            return None;
        }
        let rank = (q * (self.values.len() - 1) as f64).round() as usize;
        Some(self.values[rank])
    }

    pub fn merge(mut self, other: WindowSnapshot) -> WindowSnapshot {
        self.values.extend(other.values);
        self.values.sort_by(|a, b| a.total_cmp(b));
        self
    }
}
