//! End-to-end setup flow.
//!
//! Background work (install polling, credential saves, the grace timer) runs
//! in spawned tasks that report back over a channel.
//! [`SetupOrchestrator::handle_event`] is the only place those results touch
//! [`WizardState`], so handlers never interleave.

use crate::config::WizardConfig;
use crate::credential::CredentialSaver;
use crate::policy::{self, ModelId};
use crate::poller::{InstallProgressPoller, PollOutcome};
use crate::state::WizardState;
use crate::status::StatusClient;
use omni_setup_client::{redact_secret, SetupBackend, SetupError, SetupResult, SetupStatus};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum WizardEvent {
    InstallProgress(String),
    InstallFinished(PollOutcome),
    /// `key` is the credential that was sent, which may differ from the
    /// current draft.
    CredentialSaved { key: String, result: SetupResult<()> },
    GraceElapsed,
}

/// Signal to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// Setup is complete; reload configuration that depends on it.
    ReloadConfiguration,
}

pub struct SetupOrchestrator<B: ?Sized> {
    backend: Arc<B>,
    config: WizardConfig,
    status_client: StatusClient<B>,
    saver: CredentialSaver<B>,
    status: Option<SetupStatus>,
    initialized: bool,
    state: WizardState,
    events_tx: mpsc::UnboundedSender<WizardEvent>,
    events_rx: mpsc::UnboundedReceiver<WizardEvent>,
    host_tx: mpsc::UnboundedSender<HostSignal>,
    install_cancel: Option<CancellationToken>,
    grace_cancel: Option<CancellationToken>,
}

impl<B: SetupBackend + ?Sized + 'static> SetupOrchestrator<B> {
    pub fn new(
        backend: Arc<B>,
        config: WizardConfig,
        host_tx: mpsc::UnboundedSender<HostSignal>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            status_client: StatusClient::new(Arc::clone(&backend)),
            saver: CredentialSaver::new(Arc::clone(&backend)),
            backend,
            config,
            status: None,
            initialized: false,
            state: WizardState::default(),
            events_tx,
            events_rx,
            host_tx,
            install_cancel: None,
            grace_cancel: None,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn status(&self) -> Option<&SetupStatus> {
        self.status.as_ref()
    }

    /// Fetches the status snapshot once and decides whether the wizard is
    /// shown. A failed fetch leaves it hidden. Returns the visibility.
    pub async fn initialize(&mut self) -> bool {
        if self.initialized {
            warn!("Setup wizard already initialized");
            return self.state.visible();
        }
        self.initialized = true;

        match self.status_client.fetch_status().await {
            Ok(status) => {
                let visible = policy::decide_visibility(&status);
                info!(visible, "Setup wizard initialized");
                self.state = WizardState::opened(visible);
                self.status = Some(status);
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch setup status, hiding setup wizard");
                self.state = WizardState::opened(false);
            }
        }
        self.state.visible()
    }

    pub fn set_credential_draft(&mut self, draft: &str) {
        if self.state.is_active() {
            self.state.edit_draft(draft);
        }
    }

    pub fn can_save(&self) -> bool {
        self.state.is_active() && !self.state.saving() && self.state.has_draft()
    }

    pub fn can_install(&self) -> bool {
        self.state.is_active()
            && !self.state.installing()
            && self.status.as_ref().is_some_and(policy::install_enabled)
    }

    pub fn install_target(&self) -> Option<ModelId> {
        self.status.as_ref().map(policy::install_target)
    }

    /// "Use cloud only": persists the drafted key and finishes on success.
    pub fn save_credential(&mut self) -> SetupResult<()> {
        if !self.state.is_active() {
            return Err(SetupError::InvalidState(
                "setup wizard is not open".to_string(),
            ));
        }
        if self.state.saving() {
            return Err(SetupError::InvalidState(
                "a save is already in progress".to_string(),
            ));
        }
        if !self.state.has_draft() {
            let err = SetupError::Validation("API key is empty".to_string());
            self.state.rejected(err.user_message());
            return Err(err);
        }
        self.spawn_save();
        Ok(())
    }

    /// "Install hybrid": starts a fresh poller for the recommended model.
    pub fn start_install(&mut self) -> SetupResult<ModelId> {
        if !self.can_install() {
            return Err(SetupError::InvalidState(
                "local install is not available".to_string(),
            ));
        }
        let model = self
            .install_target()
            .ok_or_else(|| SetupError::InvalidState("setup status not loaded".to_string()))?;

        let mut poller = InstallProgressPoller::new(Arc::clone(&self.backend), &self.config);
        self.install_cancel = Some(poller.cancel_handle());
        self.state.install_started(model.name());
        info!(model = model.name(), "Starting local model install");

        let progress_tx = self.events_tx.clone();
        self.spawn_task(async move {
            let outcome = poller
                .start_install(model.name(), move |message| {
                    let _ = progress_tx.send(WizardEvent::InstallProgress(message.to_string()));
                })
                .await;
            WizardEvent::InstallFinished(outcome.unwrap_or_else(|e| PollOutcome::Failed {
                message: e.to_string(),
            }))
        });
        Ok(model)
    }

    pub async fn next_event(&mut self) -> Option<WizardEvent> {
        self.events_rx.recv().await
    }

    pub fn has_pending_work(&self) -> bool {
        self.state.installing() || self.state.saving() || self.grace_cancel.is_some()
    }

    /// Processes background results until nothing is outstanding or the
    /// wizard finalizes.
    pub async fn run_until_settled(&mut self) {
        while !self.state.is_finalized() && self.has_pending_work() {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    /// Applies one background result. Results that arrive after finalize are
    /// dropped.
    pub fn handle_event(&mut self, event: WizardEvent) {
        if self.state.is_finalized() {
            debug!("Dropping wizard event after finalize");
            return;
        }
        match event {
            WizardEvent::InstallProgress(message) => self.state.progress_reported(&message),
            WizardEvent::InstallFinished(outcome) => self.on_install_finished(outcome),
            WizardEvent::CredentialSaved { result: Ok(()), .. } => {
                self.state.save_succeeded();
                self.finalize();
            }
            WizardEvent::CredentialSaved {
                key,
                result: Err(e),
            } => {
                warn!(error = %save_failure_detail(&e, &key), "Failed to save cloud credential");
                self.state.save_failed(e.user_message());
            }
            WizardEvent::GraceElapsed => {
                if self.grace_cancel.take().is_some() {
                    self.finalize();
                }
            }
        }
    }

    fn on_install_finished(&mut self, outcome: PollOutcome) {
        self.install_cancel = None;
        match outcome {
            PollOutcome::Completed { message } => {
                self.state.install_completed(&message);
                if self.state.is_finalized() {
                    return;
                }
                if self.state.saving() {
                    info!("Install complete, waiting on the outstanding credential save");
                } else if self.state.has_draft() {
                    self.spawn_save();
                } else {
                    self.start_grace_timer();
                }
            }
            PollOutcome::Failed { message } => self.state.install_failed(&message),
            PollOutcome::Cancelled => self.state.install_cancelled(),
        }
    }

    /// Once a save is in flight its result alone decides whether setup
    /// finishes, so a pending grace timer is dropped.
    fn spawn_save(&mut self) {
        if let Some(cancel) = self.grace_cancel.take() {
            info!("Credential save started, dropping the grace timer");
            cancel.cancel();
        }
        self.state.save_started();
        let saver = self.saver.clone();
        let key = self.state.credential_draft().to_string();
        self.spawn_task(async move {
            let result = saver.save(&key).await;
            WizardEvent::CredentialSaved { key, result }
        });
    }

    fn start_grace_timer(&mut self) {
        let cancel = CancellationToken::new();
        self.grace_cancel = Some(cancel.clone());
        let delay = self.config.grace_delay;
        let tx = self.events_tx.clone();
        info!(?delay, "Install complete without a credential, finishing after grace delay");
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(WizardEvent::GraceElapsed);
                }
            }
        });
    }

    fn finalize(&mut self) {
        if self.state.is_finalized() {
            return;
        }
        self.teardown();
        self.state.finalize();
        info!("Setup complete, asking host to reload configuration");
        let _ = self.host_tx.send(HostSignal::ReloadConfiguration);
    }

    fn spawn_task<F>(&self, future: F)
    where
        F: Future<Output = WizardEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = future.await;
            let _ = tx.send(event);
        });
    }
}

/// Log text for a failed save with the sent key scrubbed out.
fn save_failure_detail(error: &SetupError, key: &str) -> String {
    redact_secret(&error.to_string(), key)
}

impl<B: ?Sized> SetupOrchestrator<B> {
    /// Stops install polling and the grace timer. Nothing scheduled by them
    /// fires afterwards.
    pub fn teardown(&mut self) {
        if let Some(cancel) = self.install_cancel.take() {
            cancel.cancel();
        }
        if let Some(cancel) = self.grace_cancel.take() {
            cancel.cancel();
        }
    }
}

impl<B: ?Sized> Drop for SetupOrchestrator<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
