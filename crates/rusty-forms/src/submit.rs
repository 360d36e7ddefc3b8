// File: rusty-forms/src/submit.rs
// Purpose: Full-form validation followed by the success or failure callback

use futures::FutureExt;
use rusty_forms_types::FieldValue;
use rusty_forms_validation::{panic_error, BoxFuture};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info};

use crate::diagnostics::Diagnostic;
use crate::state::ErrorMap;
use crate::store::Form;
use crate::watch::ChangeKind;

/// What a submit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Every field passed and `on_valid` completed
    Submitted,
    /// Some fields failed; `on_invalid` ran with these errors
    Invalid(ErrorMap),
    /// The callback that ran returned `Err` or panicked
    CallbackFailed { callback: &'static str, message: String },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted)
    }
}

impl Form {
    /// Validate every enabled field, then call `on_valid` or `on_invalid`
    ///
    /// `on_valid` receives the values with disabled fields read as
    /// `Undefined`. Whatever the callback does, the submit ends with
    /// `submit_count` incremented, `is_submitted` set and `is_submitting`
    /// cleared.
    pub async fn submit<V, VF, I, IF>(&self, on_valid: V, on_invalid: I) -> SubmitOutcome
    where
        V: FnOnce(FieldValue) -> VF,
        VF: Future<Output = anyhow::Result<()>>,
        I: FnOnce(ErrorMap) -> IF,
        IF: Future<Output = anyhow::Result<()>>,
    {
        let started = self.with_state(|state| {
            state.meta.is_submitting = true;
            state.commit(None, ChangeKind::Submit)
        });
        self.emit(started);

        let valid = self.validate_all().await;
        let (values, errors) = self.with_state(|state| (state.submitted_values(), state.errors.clone()));

        let (callback, result) = if valid {
            debug!("form valid, invoking onValid");
            ("onValid", guarded(async move { on_valid(values).await }).await)
        } else {
            debug!(errors = errors.len(), "form invalid, invoking onInvalid");
            let passed = errors.clone();
            ("onInvalid", guarded(async move { on_invalid(passed).await }).await)
        };

        let outcome = match result {
            Ok(()) if valid => SubmitOutcome::Submitted,
            Ok(()) => SubmitOutcome::Invalid(errors),
            Err(error) => {
                let message = format!("{:#}", error);
                self.report(Diagnostic::CallbackFault { callback, error });
                SubmitOutcome::CallbackFailed { callback, message }
            }
        };

        let finished = self.with_state(|state| {
            state.meta.is_valid = valid;
            state.meta.is_submit_successful = outcome.is_submitted();
            state.meta.submit_count += 1;
            state.meta.is_submitted = true;
            state.meta.is_submitting = false;
            state.commit(None, ChangeKind::Submit)
        });
        self.emit(finished);

        info!(valid, submit_count = self.form_state().meta.submit_count, "form submitted");
        outcome
    }

    /// A reusable submit handler, like binding `onSubmit` once and firing it many times
    pub fn handle_submit<V, VF, I, IF>(&self, on_valid: V, on_invalid: I) -> impl Fn() -> BoxFuture<SubmitOutcome>
    where
        V: Fn(FieldValue) -> VF + Clone + Send + Sync + 'static,
        VF: Future<Output = anyhow::Result<()>> + Send + 'static,
        I: Fn(ErrorMap) -> IF + Clone + Send + Sync + 'static,
        IF: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let form = self.clone();
        move || -> BoxFuture<SubmitOutcome> {
            let form = form.clone();
            let on_valid = on_valid.clone();
            let on_invalid = on_invalid.clone();
            Box::pin(async move { form.submit(on_valid, on_invalid).await })
        }
    }
}

/// Run a callback future, turning a panic into an error
async fn guarded(callback: impl Future<Output = anyhow::Result<()>>) -> anyhow::Result<()> {
    AssertUnwindSafe(callback)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(panic_error(panic)))
}
