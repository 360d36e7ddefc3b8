// File: rusty-forms-validation/src/validator.rs
// Purpose: Custom validation rules (sync or async), dispatched uniformly

use futures::FutureExt;
use rusty_forms_types::FieldValue;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type SyncCheck = dyn Fn(&FieldValue) -> anyhow::Result<RuleOutcome> + Send + Sync;
type AsyncCheck = dyn Fn(FieldValue) -> BoxFuture<anyhow::Result<RuleOutcome>> + Send + Sync;

/// What a custom rule decided about a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    /// Failed; `None` when the rule gave no message (returned `false`)
    Fail(Option<String>),
}

impl RuleOutcome {
    /// Pass when `condition` holds, otherwise fail with `message`
    ///
    /// The Rust spelling of `value !== 'admin@mail.com' || 'Email is banned!'`.
    pub fn ensure(condition: bool, message: impl Into<String>) -> Self {
        if condition {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Fail(Some(message.into()))
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, RuleOutcome::Pass)
    }
}

impl From<bool> for RuleOutcome {
    fn from(passed: bool) -> Self {
        if passed {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Fail(None)
        }
    }
}

impl From<&str> for RuleOutcome {
    fn from(message: &str) -> Self {
        RuleOutcome::Fail(Some(message.to_string()))
    }
}

impl From<String> for RuleOutcome {
    fn from(message: String) -> Self {
        RuleOutcome::Fail(Some(message))
    }
}

/// A named custom rule: either a plain function or one returning a future
///
/// Both variants are checked through [`Validator::check`], so the runner does
/// not care which one it was given. An `Err` (or a panic) from the rule is a
/// fault, not a validation failure.
#[derive(Clone)]
pub enum Validator {
    Sync(Arc<SyncCheck>),
    Async(Arc<AsyncCheck>),
}

impl Validator {
    /// Wrap a synchronous rule
    pub fn sync<F>(check: F) -> Self
    where
        F: Fn(&FieldValue) -> anyhow::Result<RuleOutcome> + Send + Sync + 'static,
    {
        Validator::Sync(Arc::new(check))
    }

    /// Wrap an asynchronous rule
    ///
    /// The closure receives its own copy of the value so the future can be
    /// `'static`.
    pub fn future<F, Fut>(check: F) -> Self
    where
        F: Fn(FieldValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<RuleOutcome>> + Send + 'static,
    {
        Validator::Async(Arc::new(move |value| -> BoxFuture<anyhow::Result<RuleOutcome>> {
            Box::pin(check(value))
        }))
    }

    /// Run the rule against `value`
    pub async fn check(&self, value: &FieldValue) -> anyhow::Result<RuleOutcome> {
        match self {
            Validator::Sync(check) => {
                std::panic::catch_unwind(AssertUnwindSafe(|| check(value)))
                    .unwrap_or_else(|panic| Err(panic_error(panic)))
            }
            Validator::Async(check) => {
                // the closure may panic before it hands back a future
                match std::panic::catch_unwind(AssertUnwindSafe(|| check(value.clone()))) {
                    Ok(pending) => AssertUnwindSafe(pending)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(panic_error(panic))),
                    Err(panic) => Err(panic_error(panic)),
                }
            }
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Validator::Async(_))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Sync(_) => f.write_str("Validator::Sync(..)"),
            Validator::Async(_) => f.write_str("Validator::Async(..)"),
        }
    }
}

/// Turn a caught panic payload into an error for the diagnostic sink
pub fn panic_error(panic: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("panicked: {}", detail)
}
