use anyhow::Result;
use omni_setup_client::{SetupBackend, SetupStatus};
use omni_setup_wizard::policy::{self, SetupPath};
use omni_setup_wizard::{HostSignal, SetupOrchestrator, WizardConfig};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

const HELP: &str = "Commands: key <API key> | cloud | hybrid | status | help | quit";
const DAEMON_MISSING: &str =
    "Ollama daemon not running. Please install Ollama on port 11434 to enable Hybrid features.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Key(String),
    Cloud,
    Hybrid,
    Status,
    Help,
    Quit,
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    AlreadyConfigured,
    Unavailable,
    Completed,
    Dismissed,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "key" => Command::Key(rest.to_string()),
        "cloud" => Command::Cloud,
        "hybrid" | "install" => Command::Hybrid,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(word.to_string()),
    };
    Some(command)
}

pub fn render_summary(status: &SetupStatus) -> String {
    let daemon = if status.ollama_running {
        "Active & Ready"
    } else {
        "Not Detected / Offline"
    };
    let recommended = match policy::recommended_path(status.recommendation) {
        SetupPath::Cloud => "Cloud Speed".to_string(),
        SetupPath::Hybrid => format!(
            "Hybrid Power, {}",
            policy::install_target(status).label()
        ),
    };
    format!(
        "Smart Engine Setup\n\
         Detected {}GB RAM\n\
         Local daemon (Ollama): {daemon}\n\
         Recommended: {recommended}",
        status.ram_gb
    )
}

pub struct App<B: ?Sized> {
    wizard: SetupOrchestrator<B>,
    host_rx: mpsc::UnboundedReceiver<HostSignal>,
    shown_progress: String,
    shown_error: Option<String>,
}

impl<B: SetupBackend + ?Sized + 'static> App<B> {
    pub fn new(backend: Arc<B>, config: WizardConfig) -> Self {
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        Self {
            wizard: SetupOrchestrator::new(backend, config, host_tx),
            host_rx,
            shown_progress: String::new(),
            shown_error: None,
        }
    }

    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        if !self.wizard.initialize().await {
            return Ok(if self.wizard.status().is_some() {
                SessionEnd::AlreadyConfigured
            } else {
                SessionEnd::Unavailable
            });
        }

        if let Some(status) = self.wizard.status() {
            writeln!(out, "{}", render_summary(status))?;
        }
        writeln!(out, "{HELP}")?;

        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(line) => line,
                        // The bad line is consumed; keep reading.
                        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                            tracing::warn!(error = %e, "Skipping unreadable input line");
                            writeln!(out, "Could not read that line; input must be UTF-8.")?;
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    };
                    let Some(line) = line else {
                        // Input closed: let outstanding work finish before leaving.
                        self.wizard.run_until_settled().await;
                        self.report(out)?;
                        return self.finish(out);
                    };
                    if let Some(command) = parse_command(&line) {
                        if !self.apply(command, out)? {
                            self.wizard.teardown();
                            return Ok(SessionEnd::Dismissed);
                        }
                    }
                }
                Some(event) = self.wizard.next_event() => {
                    self.wizard.handle_event(event);
                    self.report(out)?;
                }
                Some(HostSignal::ReloadConfiguration) = self.host_rx.recv() => {
                    writeln!(out, "Setup complete. Reloading configuration.")?;
                    return Ok(SessionEnd::Completed);
                }
            }
        }
    }

    fn finish<W: Write>(&mut self, out: &mut W) -> Result<SessionEnd> {
        match self.host_rx.try_recv() {
            Ok(HostSignal::ReloadConfiguration) => {
                writeln!(out, "Setup complete. Reloading configuration.")?;
                Ok(SessionEnd::Completed)
            }
            Err(_) => {
                self.wizard.teardown();
                Ok(SessionEnd::Dismissed)
            }
        }
    }

    /// Returns `false` when the user asked to leave.
    fn apply<W: Write>(&mut self, command: Command, out: &mut W) -> Result<bool> {
        match command {
            Command::Key(key) => {
                self.wizard.set_credential_draft(&key);
                if self.wizard.state().has_draft() {
                    writeln!(out, "API key captured.")?;
                } else {
                    writeln!(out, "API key cleared.")?;
                }
            }
            Command::Cloud => match self.wizard.save_credential() {
                Ok(()) => writeln!(out, "Saving API key...")?,
                Err(e) => writeln!(out, "{}", e.user_message())?,
            },
            Command::Hybrid => match self.wizard.start_install() {
                Ok(model) => writeln!(out, "Installing {}", model.label())?,
                Err(_) => writeln!(out, "{}", self.install_blocker())?,
            },
            Command::Status => {
                let state = self.wizard.state();
                writeln!(
                    out,
                    "key: {} | saving: {} | installing: {} | progress: {}",
                    if state.has_draft() { "entered" } else { "missing" },
                    state.saving(),
                    state.installing(),
                    state.progress_message()
                )?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(false),
            Command::Unknown(word) => writeln!(out, "Unknown command {word:?}. Type `help`.")?,
        }
        Ok(true)
    }

    fn install_blocker(&self) -> &'static str {
        let daemon_running = self.wizard.status().is_some_and(policy::install_enabled);
        if !daemon_running {
            DAEMON_MISSING
        } else if self.wizard.state().installing() {
            "An install is already running."
        } else {
            "Local install is not available right now."
        }
    }

    fn report<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let state = self.wizard.state();
        if state.progress_message() != self.shown_progress {
            self.shown_progress = state.progress_message().to_string();
            writeln!(out, "  {}", self.shown_progress)?;
        }
        let error = state.last_error().map(str::to_string);
        if error != self.shown_error {
            if let Some(ref message) = error {
                writeln!(out, "Error: {message}")?;
            }
            self.shown_error = error;
        }
        Ok(())
    }
}
