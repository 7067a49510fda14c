use std::time::Duration;

/// Knobs shared by every solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// Bound increase between two deepening iterations.
    pub depth_step: u32,
    /// Largest bound tried before giving up.
    pub depth_limit: u32,
    /// Expanded-node ceiling across the whole solve.
    pub node_budget: Option<u64>,
    /// Wall-clock ceiling for the whole solve.
    pub time_budget: Option<Duration>,
    /// Push a box through a one-wide corridor as a single step.
    pub tunnels: bool,
    /// Prune pushes that freeze a box off its goal.
    pub freeze_deadlocks: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            depth_step: 3,
            depth_limit: 1000,
            node_budget: None,
            time_budget: None,
            tunnels: true,
            freeze_deadlocks: true,
        }
    }
}

impl SolverConfig {
    pub fn with_depth_step(mut self, step: u32) -> Self {
        self.depth_step = step.max(1);
        self
    }

    pub fn with_depth_limit(mut self, limit: u32) -> Self {
        self.depth_limit = limit;
        self
    }

    pub fn with_node_budget(mut self, nodes: Option<u64>) -> Self {
        self.node_budget = nodes;
        self
    }

    pub fn with_time_budget(mut self, time: Option<Duration>) -> Self {
        self.time_budget = time;
        self
    }

    pub fn with_tunnels(mut self, enabled: bool) -> Self {
        self.tunnels = enabled;
        self
    }

    pub fn with_freeze_deadlocks(mut self, enabled: bool) -> Self {
        self.freeze_deadlocks = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = SolverConfig::default()
            .with_depth_step(0)
            .with_depth_limit(40)
            .with_node_budget(Some(10))
            .with_tunnels(false);
        assert_eq!(config.depth_step, 1);
        assert_eq!(config.depth_limit, 40);
        assert_eq!(config.node_budget, Some(10));
        assert!(!config.tunnels);
        assert!(config.freeze_deadlocks);
        assert_eq!(config.time_budget, None);
    }
}
