//! Drives one local model install from trigger to a terminal progress state.
//!
//! Poll ticks are strictly sequential: the next tick is only scheduled once the
//! previous progress request has resolved. `Done` and `Failed` are absorbing,
//! so a poller instance runs at most one install.

use crate::config::WizardConfig;
use omni_setup_client::{ProgressState, SetupBackend, SetupError, SetupResult};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const START_FAILED_MESSAGE: &str = "Failed to start installation.";
pub const POLL_LOST_MESSAGE: &str = "Installation failed: lost contact with the setup service.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Requesting,
    Polling,
    Done,
    Failed,
}

impl PollerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PollerState::Done | PollerState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { message: String },
    Failed { message: String },
    Cancelled,
}

pub struct InstallProgressPoller<B: ?Sized> {
    backend: Arc<B>,
    interval: Duration,
    failure_budget: u32,
    state: PollerState,
    cancel: CancellationToken,
}

impl<B: SetupBackend + ?Sized> InstallProgressPoller<B> {
    pub fn new(backend: Arc<B>, config: &WizardConfig) -> Self {
        Self {
            backend,
            interval: config.poll_interval,
            failure_budget: config.poll_failure_budget,
            state: PollerState::Idle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Token that stops this poller. Cancelling it after the poller has
    /// finished is a no-op.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn transition(&mut self, next: PollerState) {
        debug!(from = ?self.state, to = ?next, "Install poller transition");
        self.state = next;
    }

    fn cancelled(&mut self) -> PollOutcome {
        info!("Install polling cancelled");
        self.transition(PollerState::Failed);
        PollOutcome::Cancelled
    }

    /// Triggers the install of `model` and polls until it completes, fails or
    /// is cancelled. `on_progress` receives each fetched progress message in
    /// request order and is never called after cancellation.
    pub async fn start_install<F>(
        &mut self,
        model: &str,
        mut on_progress: F,
    ) -> SetupResult<PollOutcome>
    where
        F: FnMut(&str) + Send,
    {
        if self.state != PollerState::Idle {
            return Err(SetupError::InvalidState(format!(
                "install poller already used ({:?})",
                self.state
            )));
        }

        self.transition(PollerState::Requesting);
        let requested = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.backend.install_local(model) => Some(result),
        };
        match requested {
            None => return Ok(self.cancelled()),
            Some(Err(e)) => {
                warn!(model, error = %e, "Install request failed");
                self.transition(PollerState::Failed);
                return Ok(PollOutcome::Failed {
                    message: START_FAILED_MESSAGE.to_string(),
                });
            }
            Some(Ok(())) => {}
        }

        info!(model, "Install acknowledged, polling progress");
        self.transition(PollerState::Polling);

        let mut consecutive_failures = 0u32;
        loop {
            let woke = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => false,
                _ = tokio::time::sleep(self.interval) => true,
            };
            if !woke {
                return Ok(self.cancelled());
            }

            let tick = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.backend.fetch_progress() => Some(result),
            };
            let progress = match tick {
                None => return Ok(self.cancelled()),
                Some(Ok(progress)) => progress,
                Some(Err(e)) => {
                    consecutive_failures += 1;
                    if consecutive_failures > self.failure_budget {
                        warn!(error = %e, "Progress poll failed, abandoning install");
                        self.transition(PollerState::Failed);
                        return Ok(PollOutcome::Failed {
                            message: POLL_LOST_MESSAGE.to_string(),
                        });
                    }
                    debug!(
                        error = %e,
                        attempt = consecutive_failures,
                        "Progress poll failed, retrying"
                    );
                    continue;
                }
            };
            consecutive_failures = 0;

            debug!(status = ?progress.status, message = %progress.message, "Install progress");
            on_progress(&progress.message);

            match progress.status {
                ProgressState::Pending | ProgressState::Running => {}
                ProgressState::Completed => {
                    info!(model, "Local model installed");
                    self.transition(PollerState::Done);
                    return Ok(PollOutcome::Completed {
                        message: progress.message,
                    });
                }
                ProgressState::Error => {
                    warn!(model, message = %progress.message, "Install reported an error");
                    self.transition(PollerState::Failed);
                    return Ok(PollOutcome::Failed {
                        message: progress.message,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{completed, errored, running, status, Call, FakeBackend};
    use omni_setup_client::{InstallProgress, Tier};

    fn scripted(script: Vec<Option<InstallProgress>>) -> Arc<FakeBackend> {
        Arc::new(FakeBackend::new(status(Tier::HybridLite, true, false)).with_progress(script))
    }

    #[tokio::test(start_paused = true)]
    async fn reports_messages_in_order_until_completed() {
        let backend = scripted(vec![
            running("Downloading 10%"),
            running("Downloading 90%"),
            completed("Done"),
        ]);
        let mut poller = InstallProgressPoller::new(backend.clone(), &WizardConfig::default());
        let mut seen = Vec::new();

        let outcome = poller
            .start_install("qwen2.5-coder:3b", |m| seen.push(m.to_string()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Completed {
                message: "Done".to_string()
            }
        );
        assert_eq!(poller.state(), PollerState::Done);
        assert_eq!(seen, vec!["Downloading 10%", "Downloading 90%", "Done"]);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Install("qwen2.5-coder:3b".to_string()),
                Call::Progress,
                Call::Progress,
                Call::Progress,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn polls_at_the_configured_cadence() {
        let backend = scripted(vec![running("a"), running("b"), completed("c")]);
        let mut poller = InstallProgressPoller::new(backend, &WizardConfig::default());
        let started = tokio::time::Instant::now();

        poller.start_install("m", |_| {}).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn never_overlaps_progress_requests() {
        let backend = Arc::new(
            FakeBackend::new(status(Tier::HybridPro, true, false))
                .with_progress(vec![running("1"), running("2"), running("3"), completed("4")])
                .with_progress_delay(Duration::from_secs(5)),
        );
        let mut poller = InstallProgressPoller::new(backend.clone(), &WizardConfig::default());

        poller.start_install("m", |_| {}).await.unwrap();

        assert_eq!(backend.progress_calls(), 4);
        assert_eq!(backend.max_concurrent_progress(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_is_terminal() {
        let backend = scripted(vec![running("Downloading"), errored("disk full")]);
        let mut poller = InstallProgressPoller::new(backend.clone(), &WizardConfig::default());

        let outcome = poller.start_install("m", |_| {}).await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                message: "disk full".to_string()
            }
        );
        assert_eq!(poller.state(), PollerState::Failed);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.progress_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trigger_skips_polling() {
        let backend = Arc::new(
            FakeBackend::new(status(Tier::HybridLite, true, false)).failing_install(),
        );
        let mut poller = InstallProgressPoller::new(backend.clone(), &WizardConfig::default());

        let outcome = poller.start_install("m", |_| {}).await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                message: START_FAILED_MESSAGE.to_string()
            }
        );
        assert_eq!(poller.state(), PollerState::Failed);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.progress_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_ends_install_by_default() {
        let backend = scripted(vec![running("Downloading"), None, completed("never seen")]);
        let mut poller = InstallProgressPoller::new(backend.clone(), &WizardConfig::default());

        let outcome = poller.start_install("m", |_| {}).await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                message: POLL_LOST_MESSAGE.to_string()
            }
        );
        assert_eq!(backend.progress_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_budget_tolerates_a_blip() {
        let backend = scripted(vec![None, running("Downloading"), None, completed("Done")]);
        let config = WizardConfig {
            poll_failure_budget: 1,
            ..WizardConfig::default()
        };
        let mut poller = InstallProgressPoller::new(backend.clone(), &config);

        let outcome = poller.start_install("m", |_| {}).await.unwrap();

        assert!(matches!(outcome, PollOutcome::Completed { .. }));
        assert_eq!(backend.progress_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_budget_counts_consecutive_failures() {
        let backend = scripted(vec![None, None, completed("Done")]);
        let config = WizardConfig {
            poll_failure_budget: 1,
            ..WizardConfig::default()
        };
        let mut poller = InstallProgressPoller::new(backend, &config);

        let outcome = poller.start_install("m", |_| {}).await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                message: POLL_LOST_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn finished_poller_cannot_be_reused() {
        let backend = scripted(vec![completed("Done")]);
        let mut poller = InstallProgressPoller::new(backend.clone(), &WizardConfig::default());
        poller.start_install("m", |_| {}).await.unwrap();

        let err = poller.start_install("m", |_| {}).await.unwrap_err();

        assert!(matches!(err, SetupError::InvalidState(_)));
        assert_eq!(poller.state(), PollerState::Done);
        assert_eq!(backend.progress_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let backend = scripted(Vec::new());
        let mut poller = InstallProgressPoller::new(backend.clone(), &WizardConfig::default());
        let cancel = poller.cancel_handle();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let outcome = poller
                .start_install("m", move |m| {
                    let _ = tx.send(m.to_string());
                })
                .await;
            (outcome, poller.state())
        });

        rx.recv().await.expect("first progress message");
        rx.recv().await.expect("second progress message");
        cancel.cancel();
        let (outcome, state) = task.await.unwrap();

        assert_eq!(outcome.unwrap(), PollOutcome::Cancelled);
        assert_eq!(state, PollerState::Failed);
        let polls = backend.progress_calls();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.progress_calls(), polls);
        assert!(rx.try_recv().is_err());
    }
}
