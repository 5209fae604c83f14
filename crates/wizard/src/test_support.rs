use async_trait::async_trait;
use omni_setup_client::{
    InstallProgress, ProgressState, SetupBackend, SetupError, SetupResult, SetupStatus, Tier,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Status,
    Install(String),
    Progress,
    Save(String),
}

/// Scripted in-memory setup service. `None` in the progress script stands for
/// a failed poll; an exhausted script keeps reporting a running download.
pub(crate) struct FakeBackend {
    status: Option<SetupStatus>,
    install_fails: bool,
    save_failures: AtomicUsize,
    progress: Mutex<VecDeque<Option<InstallProgress>>>,
    progress_delay: Duration,
    save_delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub(crate) fn status(tier: Tier, ollama_running: bool, has_gemini_key: bool) -> SetupStatus {
    SetupStatus {
        ram_gb: 16.0,
        recommendation: tier,
        ollama_running,
        models: Vec::new(),
        has_gemini_key,
    }
}

pub(crate) fn running(message: &str) -> Option<InstallProgress> {
    Some(InstallProgress::new(ProgressState::Running, message))
}

pub(crate) fn completed(message: &str) -> Option<InstallProgress> {
    Some(InstallProgress::new(ProgressState::Completed, message))
}

pub(crate) fn errored(message: &str) -> Option<InstallProgress> {
    Some(InstallProgress::new(ProgressState::Error, message))
}

fn unavailable() -> SetupError {
    SetupError::Status {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl FakeBackend {
    pub(crate) fn new(status: SetupStatus) -> Self {
        Self {
            status: Some(status),
            install_fails: false,
            save_failures: AtomicUsize::new(0),
            progress: Mutex::new(VecDeque::new()),
            progress_delay: Duration::ZERO,
            save_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            status: None,
            ..Self::new(status(Tier::CloudOnly, false, false))
        }
    }

    pub(crate) fn with_progress(
        self,
        script: impl IntoIterator<Item = Option<InstallProgress>>,
    ) -> Self {
        *self.progress.lock().unwrap() = script.into_iter().collect();
        self
    }

    pub(crate) fn with_progress_delay(mut self, delay: Duration) -> Self {
        self.progress_delay = delay;
        self
    }

    pub(crate) fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    pub(crate) fn failing_install(mut self) -> Self {
        self.install_fails = true;
        self
    }

    pub(crate) fn failing_saves(self, count: usize) -> Self {
        self.save_failures.store(count, Ordering::SeqCst);
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn progress_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == Call::Progress)
            .count()
    }

    pub(crate) fn save_requests(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Save(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn max_concurrent_progress(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SetupBackend for FakeBackend {
    async fn fetch_status(&self) -> SetupResult<SetupStatus> {
        self.record(Call::Status);
        self.status.clone().ok_or_else(unavailable)
    }

    async fn install_local(&self, model_name: &str) -> SetupResult<()> {
        self.record(Call::Install(model_name.to_string()));
        if self.install_fails {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    async fn fetch_progress(&self) -> SetupResult<InstallProgress> {
        self.record(Call::Progress);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.progress_delay.is_zero() {
            tokio::time::sleep(self.progress_delay).await;
        }
        let step = self
            .progress
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| running("Downloading..."));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        step.ok_or_else(unavailable)
    }

    async fn save_key(&self, key: &str) -> SetupResult<()> {
        self.record(Call::Save(key.to_string()));
        if !self.save_delay.is_zero() {
            tokio::time::sleep(self.save_delay).await;
        }
        let failing = self
            .save_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            // Echo the key the way a careless upstream error might.
            Err(SetupError::Status {
                status: 400,
                message: format!("rejected key {key}"),
            })
        } else {
            Ok(())
        }
    }
}
