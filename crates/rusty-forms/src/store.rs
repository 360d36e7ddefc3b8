// File: rusty-forms/src/store.rs
// Purpose: The form handle: values, errors, meta flags and validation scheduling

use futures::future::join_all;
use rusty_forms_types::{path, FieldPath, FieldValue, PathError};
use rusty_forms_validation::{runner, FieldError, RuleSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::binding::FieldBinding;
use crate::config::FormConfig;
use crate::diagnostics::{Diagnostic, ErrorSink, TracingSink};
use crate::error::{FormError, Result};
use crate::state::{FormState, FormStateSnapshot};
use crate::watch::{ChangeKind, WatchEvent, Watchers};

/// Capacity of the `subscribe()` broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Options for [`Form::set_value`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetValueOptions {
    pub should_validate: bool,
    pub should_dirty: bool,
    pub should_touch: bool,
}

impl SetValueOptions {
    pub fn validate() -> Self {
        Self {
            should_validate: true,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            should_validate: true,
            should_dirty: true,
            should_touch: true,
        }
    }
}

pub(crate) struct FormInner {
    state: Mutex<FormState>,
    pub(crate) watchers: Arc<Mutex<Watchers>>,
    pub(crate) sink: Arc<dyn ErrorSink>,
}

/// A form: cheap to clone, every clone drives the same state
///
/// ```rust
/// use rusty_forms::{Form, FormConfig, RuleSet, SetValueOptions};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let form = Form::new(FormConfig::default().with_defaults(json!({ "username": "" })));
/// form.register("username", RuleSet::new().required("Username is required!")).unwrap();
///
/// assert!(!form.trigger(["username"]).await.unwrap());
/// form.set_value("username", "Batman", SetValueOptions::validate()).await.unwrap();
/// assert!(form.form_state().errors.is_empty());
/// # });
/// ```
#[derive(Clone)]
pub struct Form {
    pub(crate) inner: Arc<FormInner>,
}

impl Form {
    pub fn new(config: FormConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create a form that reports isolated faults to `sink`
    pub fn with_sink(config: FormConfig, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            inner: Arc::new(FormInner {
                state: Mutex::new(FormState::new(config)),
                watchers: Arc::new(Mutex::new(Watchers::new(EVENT_CHANNEL_CAPACITY))),
                sink,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.inner.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` under the state lock
    ///
    /// Never await or call user code inside `f`.
    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut FormState) -> T) -> T {
        let mut state = self.lock();
        f(&mut state)
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.inner.sink.report(diagnostic);
    }

    pub fn config(&self) -> FormConfig {
        self.with_state(|state| state.config.clone())
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a field, or replace the rules of an already registered one
    ///
    /// When the default values do not cover `name`, the current value becomes
    /// its default.
    pub fn register<P>(&self, name: P, rules: RuleSet) -> Result<FieldBinding>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let name = name.try_into()?;
        self.with_state(|state| {
            state.capture_default(&name)?;
            state.registry.register(name.clone(), Arc::new(rules));
            state.refresh_disabled();
            Ok::<_, FormError>(())
        })?;
        debug!(%name, "field registered");
        Ok(FieldBinding::new(self.clone(), name))
    }

    /// Remove a field's entry and error
    ///
    /// With `should_unregister` configured its value is dropped too. Either way
    /// the form-wide dirty flag is recomputed.
    pub fn unregister<P>(&self, name: P) -> Result<()>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let name = name.try_into()?;
        let event = self.with_state(|state| {
            let removed = state.registry.unregister(&name);
            let had_error = state.errors.remove(&name).is_some();
            state.invalidate_within(&name);
            if state.config.should_unregister {
                state.values = path::unset(&state.values, &name)?;
                state.sync_all_arrays()?;
                state.refresh_form_dirty();
                return Ok::<_, FormError>(Some(state.commit(Some(name.clone()), ChangeKind::Value)));
            }

            let was_dirty = state.meta.is_dirty;
            state.refresh_form_dirty();
            let Some(entry) = removed else {
                return Ok(None);
            };
            let kind = if entry.is_dirty || was_dirty != state.meta.is_dirty {
                ChangeKind::Dirty
            } else if had_error {
                ChangeKind::Validation
            } else {
                ChangeKind::Touched
            };
            Ok(Some(state.commit(Some(name.clone()), kind)))
        })?;
        debug!(%name, "field unregistered");
        self.emit_all(event);
        Ok(())
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Write `value` at `name`
    pub async fn set_value<P>(&self, name: P, value: impl Into<FieldValue>, options: SetValueOptions) -> Result<()>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let name = name.try_into()?;
        let value = value.into();
        let events = self.with_state(|state| apply_value(state, &name, value, options))?;
        self.emit_all(events);

        if options.should_validate {
            self.validate_path(&name).await;
        }
        Ok(())
    }

    pub fn get_values(&self) -> FieldValue {
        self.with_state(|state| state.values.clone())
    }

    pub fn get_value<P>(&self, name: P) -> Result<FieldValue>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let name = name.try_into()?;
        Ok(self.with_state(|state| path::get(&state.values, &name))?)
    }

    /// Values at several paths, in the order asked
    pub fn get_values_of<I, P>(&self, names: I) -> Result<Vec<FieldValue>>
    where
        I: IntoIterator<Item = P>,
        P: TryInto<FieldPath, Error = PathError>,
    {
        let names = names
            .into_iter()
            .map(|name| name.try_into())
            .collect::<std::result::Result<Vec<FieldPath>, PathError>>()?;
        let values = self.with_state(|state| {
            names
                .iter()
                .map(|name| path::get(&state.values, name))
                .collect::<std::result::Result<Vec<_>, _>>()
        })?;
        Ok(values)
    }

    /// Replace values with `defaults` (or the captured defaults) and clear all state
    ///
    /// Given defaults become the captured defaults. Errors, flags and submit
    /// counters are cleared, in-flight validations are discarded and array
    /// rows get fresh ids.
    pub fn reset(&self, defaults: Option<FieldValue>) -> Result<()> {
        let event = self.with_state(|state| {
            if let Some(defaults) = defaults {
                state.defaults = match defaults {
                    FieldValue::Undefined | FieldValue::Null => FieldValue::empty_object(),
                    defaults => defaults,
                };
            }
            state.values = state.defaults.clone();
            state.errors.clear();
            state.registry.clear_flags();
            state.invalidate_all();
            state.meta = Default::default();
            state.regenerate_array_ids()?;
            state.refresh_disabled();
            Ok::<_, FormError>(state.commit(None, ChangeKind::Reset))
        })?;
        self.emit(event);
        Ok(())
    }

    pub fn form_state(&self) -> FormStateSnapshot {
        self.with_state(|state| state.snapshot())
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Set an error by hand; it stays until the field re-validates or is cleared
    pub fn set_error<P>(&self, name: P, error: FieldError) -> Result<()>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let name = name.try_into()?;
        let event = self.with_state(|state| {
            state.errors.insert(name.clone(), error);
            state.commit(Some(name.clone()), ChangeKind::Validation)
        });
        self.emit(event);
        Ok(())
    }

    pub fn clear_errors(&self) {
        let event = self.with_state(|state| {
            if state.errors.is_empty() {
                return None;
            }
            state.errors.clear();
            Some(state.commit(None, ChangeKind::Validation))
        });
        self.emit_all(event);
    }

    /// Clear the error at `name` and below it
    pub fn clear_error<P>(&self, name: P) -> Result<()>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let name = name.try_into()?;
        let event = self.with_state(|state| {
            let before = state.errors.len();
            state.errors.retain(|path, _| !path.is_within(&name));
            (state.errors.len() != before).then(|| state.commit(Some(name.clone()), ChangeKind::Validation))
        });
        self.emit_all(event);
        Ok(())
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate the given fields concurrently; `true` when all are valid
    pub async fn trigger<I, P>(&self, names: I) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: TryInto<FieldPath, Error = PathError>,
    {
        let names = names
            .into_iter()
            .map(|name| name.try_into())
            .collect::<std::result::Result<Vec<FieldPath>, PathError>>()?;
        let results = join_all(names.iter().map(|name| self.validate_path(name))).await;
        Ok(results.into_iter().all(|valid| valid))
    }

    /// Validate every enabled field and update `is_valid`
    pub async fn trigger_all(&self) -> bool {
        let valid = self.validate_all().await;
        let event = self.with_state(|state| {
            state.meta.is_valid = valid;
            state.commit(None, ChangeKind::Validation)
        });
        self.emit(event);
        valid
    }

    /// Full pass over every enabled field; `true` when the error map ends up empty
    pub(crate) async fn validate_all(&self) -> bool {
        let paths = self.with_state(|state| state.registry.enabled_paths());
        join_all(paths.iter().map(|path| self.validate_path(path))).await;
        self.with_state(|state| state.errors.is_empty())
    }

    /// Validate one path and commit the result unless a newer run superseded it
    ///
    /// Returns whether this run found the value valid.
    pub(crate) async fn validate_path(&self, path: &FieldPath) -> bool {
        let job = self.with_state(|state| state.begin_validation(path));
        let Some(job) = job else {
            return true;
        };
        trace!(path = %job.path, seq = job.seq, "validation started");

        let outcome = runner::run(&job.path, &job.value, &job.rules).await;
        if let Some(fault) = outcome.fault {
            self.report(Diagnostic::ValidatorFault(fault));
        }
        let valid = outcome.result.is_valid();

        let event = self.with_state(|state| match state.finish_validation(&job, outcome.result) {
            None => {
                debug!(path = %job.path, seq = job.seq, "discarding stale validation result");
                None
            }
            Some(false) => None,
            Some(true) => Some(state.commit(Some(job.path.clone()), ChangeKind::Validation)),
        });
        self.emit_all(event);
        valid
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Form")
            .field("version", &state.version)
            .field("fields", &state.registry.len())
            .field("errors", &state.errors.len())
            .finish()
    }
}

/// Commit a value write and the bookkeeping that follows it
fn apply_value(state: &mut FormState, name: &FieldPath, value: FieldValue, options: SetValueOptions) -> Result<Vec<WatchEvent>> {
    state.values = path::set(&state.values, name, value)?;
    state.sync_all_arrays()?;

    let dirty_before = options.should_dirty.then(|| state.registry.dirty_paths());
    if options.should_dirty {
        state.refresh_dirty(name);
    }
    state.refresh_disabled();

    let mut events = vec![state.commit(Some(name.clone()), ChangeKind::Value)];
    if dirty_before.is_some_and(|before| before != state.registry.dirty_paths()) {
        events.push(state.commit(Some(name.clone()), ChangeKind::Dirty));
    }
    if options.should_touch && state.registry.touch(name) {
        events.push(state.commit(Some(name.clone()), ChangeKind::Touched));
    }
    Ok(events)
}
