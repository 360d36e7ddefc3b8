// File: rusty-forms/src/diagnostics.rs
// Purpose: Where faults from user-supplied code are reported

use rusty_forms_validation::ValidatorFault;
use std::sync::Mutex;

/// A failure in caller-supplied code that the form isolated
#[derive(Debug)]
pub enum Diagnostic {
    /// A custom rule returned `Err` or panicked
    ValidatorFault(ValidatorFault),
    /// A watch callback returned `Err` or panicked
    WatcherFault { subscription: u64, error: anyhow::Error },
    /// A submit callback returned `Err` or panicked
    CallbackFault { callback: &'static str, error: anyhow::Error },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ValidatorFault(fault) => {
                write!(f, "validator `{}` on `{}` failed: {:#}", fault.rule, fault.path, fault.error)
            }
            Diagnostic::WatcherFault { subscription, error } => {
                write!(f, "watcher #{} failed: {:#}", subscription, error)
            }
            Diagnostic::CallbackFault { callback, error } => {
                write!(f, "{} callback failed: {:#}", callback, error)
            }
        }
    }
}

/// Receives isolated faults; each form owns one
pub trait ErrorSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::error!(%diagnostic, "form fault");
    }
}

/// Sink that keeps every report in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Rendered messages of everything reported so far
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|d| d.to_string()).collect()
    }

    /// Drain the collected reports
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.reports.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ErrorSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "form fault recorded");
        self.lock().push(diagnostic);
    }
}
