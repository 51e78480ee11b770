//! User-facing surface of the session client.
//!
//! The client only decides *what* text appears and *when*. Rendering is left
//! to a `Ui` implementation:
//! - `ConsoleUi` prints to stdout for the CLI
//! - `MemoryUi` keeps the latest view in memory (tests, embedding)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

/// Sink for the text the session client produces.
pub trait Ui: Send + Sync {
    /// Replace the status line.
    fn set_status(&self, text: &str);

    /// Show the connected account.
    fn set_account(&self, text: &str);

    /// Show the USDT balance display.
    fn set_usdt_balance(&self, text: &str);

    /// Show the ARSV balance display.
    fn set_arsv_balance(&self, text: &str);

    /// Blocking notice to the user.
    fn alert(&self, text: &str);

    /// Append one line to the event log.
    fn append_event(&self, line: &str);
}

/// Shared UI handle.
pub type SharedUi = Arc<dyn Ui>;

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    pub received_at: DateTime<Utc>,
    pub line: String,
}

/// Everything currently on screen.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub status: String,
    pub account: String,
    pub usdt_balance: String,
    pub arsv_balance: String,
    pub alerts: Vec<String>,
    pub event_log: Vec<EventLogEntry>,
    /// Every status ever set, oldest first.
    pub status_history: Vec<String>,
}

/// In-memory UI.
#[derive(Debug, Default)]
pub struct MemoryUi {
    state: RwLock<ViewState>,
}

impl MemoryUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Copy of the whole view.
    pub fn snapshot(&self) -> ViewState {
        self.state.read().clone()
    }

    pub fn status(&self) -> String {
        self.state.read().status.clone()
    }

    pub fn account(&self) -> String {
        self.state.read().account.clone()
    }

    pub fn balances(&self) -> (String, String) {
        let state = self.state.read();
        (state.usdt_balance.clone(), state.arsv_balance.clone())
    }

    pub fn alerts(&self) -> Vec<String> {
        self.state.read().alerts.clone()
    }

    pub fn status_history(&self) -> Vec<String> {
        self.state.read().status_history.clone()
    }

    /// Event log lines, oldest first.
    pub fn event_lines(&self) -> Vec<String> {
        self.state.read().event_log.iter().map(|e| e.line.clone()).collect()
    }
}

impl Ui for MemoryUi {
    fn set_status(&self, text: &str) {
        let mut state = self.state.write();
        state.status = text.to_string();
        state.status_history.push(text.to_string());
    }

    fn set_account(&self, text: &str) {
        self.state.write().account = text.to_string();
    }

    fn set_usdt_balance(&self, text: &str) {
        self.state.write().usdt_balance = text.to_string();
    }

    fn set_arsv_balance(&self, text: &str) {
        self.state.write().arsv_balance = text.to_string();
    }

    fn alert(&self, text: &str) {
        self.state.write().alerts.push(text.to_string());
    }

    fn append_event(&self, line: &str) {
        self.state.write().event_log.push(EventLogEntry {
            received_at: Utc::now(),
            line: line.to_string(),
        });
    }
}

/// Terminal UI for the CLI.
///
/// Status changes go through tracing; values the user asked for go to stdout.
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn set_status(&self, text: &str) {
        info!(status = text, "Status");
    }

    fn set_account(&self, text: &str) {
        println!("Account: {}", text);
    }

    fn set_usdt_balance(&self, text: &str) {
        println!("USDT balance: {}", text);
    }

    fn set_arsv_balance(&self, text: &str) {
        println!("ARSV balance: {}", text);
    }

    fn alert(&self, text: &str) {
        warn!(alert = text, "Alert");
        eprintln!("{}", text);
    }

    fn append_event(&self, line: &str) {
        println!("[{}] {}", Utc::now().format("%H:%M:%S"), line);
    }
}
