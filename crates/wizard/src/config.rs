use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Heuristic pause after an install completes with no credential drafted, in
/// case the user is still typing one.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
    pub poll_interval: Duration,
    pub grace_delay: Duration,
    /// Consecutive progress-poll failures tolerated before an install is
    /// declared failed. Zero fails on the first one.
    pub poll_failure_budget: u32,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_delay: DEFAULT_GRACE_DELAY,
            poll_failure_budget: 0,
        }
    }
}
