// File: rusty-forms/src/state.rs
// Purpose: Aggregate form state guarded by the form's lock

use rusty_forms_types::{path, FieldPath, FieldValue, PathError};
use rusty_forms_validation::{FieldError, RuleSet, ValidationResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::FormConfig;
use crate::field_array::FieldArrays;
use crate::registry::FieldRegistry;
use crate::watch::{ChangeKind, WatchEvent};

/// Current error per path; absence means valid
pub type ErrorMap = BTreeMap<FieldPath, FieldError>;

/// Form-wide flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMeta {
    pub is_dirty: bool,
    /// Set by full validation passes only
    pub is_valid: bool,
    pub is_submitting: bool,
    pub is_submitted: bool,
    pub is_submit_successful: bool,
    pub submit_count: u32,
    pub is_validating: bool,
}

/// Read-only copy of everything observable about a form
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStateSnapshot {
    pub values: FieldValue,
    pub errors: ErrorMap,
    pub touched_fields: Vec<FieldPath>,
    pub dirty_fields: Vec<FieldPath>,
    pub disabled_fields: Vec<FieldPath>,
    pub meta: FormMeta,
    pub version: u64,
}

/// A validation that was started and must be finished outside the lock
pub(crate) struct ValidationJob {
    pub path: FieldPath,
    pub seq: u64,
    pub value: FieldValue,
    pub rules: Arc<RuleSet>,
}

pub(crate) struct FormState {
    pub config: FormConfig,
    pub values: FieldValue,
    pub defaults: FieldValue,
    pub errors: ErrorMap,
    pub registry: FieldRegistry,
    pub arrays: FieldArrays,
    pub meta: FormMeta,
    pub version: u64,
    validation_seq: u64,
    /// Latest validation sequence number issued per path
    pending: HashMap<FieldPath, u64>,
}

impl FormState {
    pub fn new(config: FormConfig) -> Self {
        let defaults = match config.default_values.clone() {
            FieldValue::Undefined | FieldValue::Null => FieldValue::empty_object(),
            defaults => defaults,
        };

        Self {
            config,
            values: defaults.clone(),
            defaults,
            errors: ErrorMap::new(),
            registry: FieldRegistry::new(),
            arrays: FieldArrays::default(),
            meta: FormMeta::default(),
            version: 0,
            validation_seq: 0,
            pending: HashMap::new(),
        }
    }

    /// Bump the version and describe the change
    pub fn commit(&mut self, name: Option<FieldPath>, kind: ChangeKind) -> WatchEvent {
        self.version += 1;
        self.meta.is_validating = !self.pending.is_empty();
        tracing::debug!(version = self.version, ?kind, name = ?name.as_ref().map(|n| n.as_str()), "form change committed");
        WatchEvent {
            values: self.values.clone(),
            name,
            kind,
            version: self.version,
        }
    }

    pub fn snapshot(&self) -> FormStateSnapshot {
        let mut meta = self.meta.clone();
        meta.is_validating = !self.pending.is_empty();
        FormStateSnapshot {
            values: self.values.clone(),
            errors: self.errors.clone(),
            touched_fields: self.registry.touched_paths(),
            dirty_fields: self.registry.dirty_paths(),
            disabled_fields: self.registry.disabled_paths(),
            meta,
            version: self.version,
        }
    }

    /// Re-evaluate disabled predicates; newly disabled fields lose their error
    pub fn refresh_disabled(&mut self) {
        for path in self.registry.refresh_disabled(&self.values) {
            self.errors.remove(&path);
            self.pending.remove(&path);
        }
    }

    /// Recompute dirty flags near `scope` and the form-wide flag
    pub fn refresh_dirty(&mut self, scope: &FieldPath) {
        self.registry.refresh_dirty(scope, &self.values, &self.defaults);
        self.refresh_form_dirty();
    }

    pub fn refresh_form_dirty(&mut self) {
        self.meta.is_dirty = self.registry.any_dirty()
            || self
                .arrays
                .bases()
                .any(|base| sequence_len(&self.values, base) != sequence_len(&self.defaults, base));
    }

    /// Capture the current value as the default when the defaults do not cover `path`
    pub fn capture_default(&mut self, path: &FieldPath) -> Result<(), PathError> {
        if self.arrays.owns(path) || path::lookup(&self.defaults, path)?.is_some() {
            return Ok(());
        }
        let current = path::get(&self.values, path)?;
        if !current.is_undefined() {
            self.defaults = path::set(&self.defaults, path, current)?;
        }
        Ok(())
    }

    /// Start validating `path`, or `None` if there is nothing to run
    ///
    /// Unregistered and disabled paths have no validation; a disabled path's
    /// error is dropped.
    pub fn begin_validation(&mut self, path: &FieldPath) -> Option<ValidationJob> {
        let entry = self.registry.get(path)?;
        if entry.is_disabled {
            self.errors.remove(path);
            return None;
        }
        let rules = entry.rules.clone();
        let value = path::get(&self.values, path).ok()?;

        self.validation_seq += 1;
        self.pending.insert(path.clone(), self.validation_seq);
        self.meta.is_validating = true;

        Some(ValidationJob {
            path: path.clone(),
            seq: self.validation_seq,
            value,
            rules,
        })
    }

    /// Apply a finished validation if it is still the latest for its path
    ///
    /// Returns `None` for a stale result, otherwise whether the error map changed.
    pub fn finish_validation(&mut self, job: &ValidationJob, result: ValidationResult) -> Option<bool> {
        if self.pending.get(&job.path) != Some(&job.seq) {
            return None;
        }
        self.pending.remove(&job.path);
        self.meta.is_validating = !self.pending.is_empty();

        let changed = match result.into_error() {
            Some(error) => self.errors.insert(job.path.clone(), error.clone()) != Some(error),
            None => self.errors.remove(&job.path).is_some(),
        };
        Some(changed)
    }

    /// Forget in-flight validations for paths at or under `scope`
    pub fn invalidate_within(&mut self, scope: &FieldPath) {
        self.pending.retain(|path, _| !path.is_within(scope));
    }

    pub fn invalidate_all(&mut self) {
        self.pending.clear();
        self.meta.is_validating = false;
    }

    /// Values as handed to a submit callback: disabled fields read as `Undefined`
    pub fn submitted_values(&self) -> FieldValue {
        self.registry
            .disabled_paths()
            .iter()
            .fold(self.values.clone(), |values, disabled| {
                path::set(&values, disabled, FieldValue::Undefined).unwrap_or(values)
            })
    }
}

fn sequence_len(root: &FieldValue, at: &FieldPath) -> Option<usize> {
    path::lookup(root, at)
        .ok()
        .flatten()
        .and_then(|value| value.as_array())
        .map(|items| items.len())
}
