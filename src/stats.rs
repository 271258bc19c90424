//! Statistics collected during a search.

use std::time::Duration;

/// Counters gathered while a search runs.
#[derive(Debug, Clone)]
pub struct SearchStatistics {
    /// Number of simulations completed
    pub simulations: usize,

    /// Total time spent searching
    pub total_time: Duration,

    /// Number of nodes in the tree
    pub tree_size: usize,

    /// Deepest selection path reached
    pub max_depth: usize,

    /// Whether the search stopped on its deadline before exhausting `power`
    pub stopped_early: bool,
}

impl SearchStatistics {
    pub fn new() -> Self {
        SearchStatistics {
            simulations: 0,
            total_time: Duration::from_secs(0),
            tree_size: 1,
            max_depth: 0,
            stopped_early: false,
        }
    }

    /// Simulations per second over the whole search.
    pub fn simulations_per_second(&self) -> f64 {
        if self.total_time.as_secs_f64() <= 0.0 {
            return 0.0;
        }
        self.simulations as f64 / self.total_time.as_secs_f64()
    }

    pub fn summary(&self) -> String {
        format!(
            "search statistics:\n\
             - simulations: {}\n\
             - total time: {:.3} s\n\
             - tree size: {} nodes\n\
             - max depth: {}\n\
             - simulations per second: {:.1}\n\
             - stopped early: {}",
            self.simulations,
            self.total_time.as_secs_f64(),
            self.tree_size,
            self.max_depth,
            self.simulations_per_second(),
            self.stopped_early
        )
    }
}

impl Default for SearchStatistics {
    fn default() -> Self {
        Self::new()
    }
}
