/// Session-scoped wizard state. Only the orchestrator mutates it, and only
/// through the named transitions below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardState {
    visible: bool,
    credential_draft: String,
    saving: bool,
    installing: bool,
    progress_message: String,
    last_error: Option<String>,
    finalized: bool,
}

impl WizardState {
    /// Visibility is fixed here, at session start, and never re-derived.
    pub(crate) fn opened(visible: bool) -> Self {
        Self {
            visible,
            ..Self::default()
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn credential_draft(&self) -> &str {
        &self.credential_draft
    }

    pub fn has_draft(&self) -> bool {
        !self.credential_draft.trim().is_empty()
    }

    pub fn saving(&self) -> bool {
        self.saving
    }

    pub fn installing(&self) -> bool {
        self.installing
    }

    pub fn progress_message(&self) -> &str {
        &self.progress_message
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Accepting input: shown and not yet finished.
    pub fn is_active(&self) -> bool {
        self.visible && !self.finalized
    }

    pub(crate) fn edit_draft(&mut self, draft: &str) {
        self.credential_draft = draft.trim().to_string();
    }

    pub(crate) fn save_started(&mut self) {
        self.saving = true;
        self.last_error = None;
    }

    pub(crate) fn save_failed(&mut self, error: &str) {
        self.saving = false;
        self.last_error = Some(error.to_string());
    }

    pub(crate) fn save_succeeded(&mut self) {
        self.saving = false;
        self.last_error = None;
    }

    pub(crate) fn rejected(&mut self, error: &str) {
        self.last_error = Some(error.to_string());
    }

    pub(crate) fn install_started(&mut self, model: &str) {
        self.installing = true;
        self.progress_message = format!("Starting download for {model}...");
        self.last_error = None;
    }

    pub(crate) fn progress_reported(&mut self, message: &str) {
        if self.installing {
            self.progress_message = message.to_string();
        }
    }

    pub(crate) fn install_completed(&mut self, message: &str) {
        self.installing = false;
        self.progress_message = message.to_string();
    }

    pub(crate) fn install_failed(&mut self, message: &str) {
        self.installing = false;
        self.progress_message = message.to_string();
        self.last_error = Some(message.to_string());
    }

    pub(crate) fn install_cancelled(&mut self) {
        self.installing = false;
    }

    pub(crate) fn finalize(&mut self) {
        self.visible = false;
        self.finalized = true;
        self.saving = false;
        self.installing = false;
    }
}
