// File: rusty-forms-validation/src/runner.rs
// Purpose: Evaluate one field's rule set against its value

use chrono::{DateTime, Utc};
use rusty_forms_types::{FieldPath, FieldValue, DATE_FORMAT};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::rules::{epoch_millis, Rule, RuleSet};
use crate::string::{char_len, validate_max_length, validate_min_length};
use crate::validator::RuleOutcome;

/// Message stored when a custom rule faults instead of deciding
pub const FAULT_MESSAGE: &str = "Validation failed unexpectedly";

/// A user-facing validation error for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Rule that failed: `required`, `pattern`, `min`, ... or a custom rule name
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(FieldError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&FieldError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(error) => Some(error),
        }
    }

    pub fn into_error(self) -> Option<FieldError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(error) => Some(error),
        }
    }
}

/// A custom rule that returned `Err` or panicked
#[derive(Debug)]
pub struct ValidatorFault {
    pub path: FieldPath,
    pub rule: String,
    pub error: anyhow::Error,
}

/// Result of a run, plus the fault behind it when there was one
#[derive(Debug)]
pub struct RunOutcome {
    pub result: ValidationResult,
    pub fault: Option<ValidatorFault>,
}

impl RunOutcome {
    fn valid() -> Self {
        Self {
            result: ValidationResult::Valid,
            fault: None,
        }
    }

    fn invalid(kind: &str, message: impl Into<String>) -> Self {
        Self {
            result: ValidationResult::Invalid(FieldError::new(kind, message)),
            fault: None,
        }
    }
}

/// Validate `value` against `rules`, short-circuiting on the first failure
///
/// Faults are folded into an `Invalid` result with [`FAULT_MESSAGE`]; use
/// [`run`] to see the underlying error.
pub async fn validate(path: &FieldPath, value: &FieldValue, rules: &RuleSet) -> ValidationResult {
    run(path, value, rules).await.result
}

/// Validate and keep the fault, if any
///
/// Order: `required`, `min`/`max`, `min_length`/`max_length`, `pattern`, then
/// each custom rule in insertion order. Built-in rules other than `required`
/// skip empty input; custom rules always run.
pub async fn run(path: &FieldPath, value: &FieldValue, rules: &RuleSet) -> RunOutcome {
    if let Some(rule) = &rules.required {
        if rule.value && value.is_empty_input() {
            trace!(%path, "required rule failed");
            return RunOutcome::invalid("required", rule.message.as_str());
        }
    }

    if !value.is_empty_input() {
        if let Some(outcome) = check_builtin(value, rules) {
            trace!(%path, kind = %outcome.result.error().map(|e| e.kind.as_str()).unwrap_or(""), "built-in rule failed");
            return outcome;
        }
    }

    for (name, validator) in &rules.validate {
        trace!(%path, rule = %name, asynchronous = validator.is_async(), "running custom rule");
        match validator.check(value).await {
            Ok(RuleOutcome::Pass) => {}
            Ok(RuleOutcome::Fail(message)) => {
                return RunOutcome::invalid(name, message.unwrap_or_default());
            }
            Err(error) => {
                return RunOutcome {
                    result: ValidationResult::Invalid(FieldError::new(name.as_str(), FAULT_MESSAGE)),
                    fault: Some(ValidatorFault {
                        path: path.clone(),
                        rule: name.clone(),
                        error,
                    }),
                };
            }
        }
    }

    RunOutcome::valid()
}

fn check_builtin(value: &FieldValue, rules: &RuleSet) -> Option<RunOutcome> {
    if let Some(outcome) = check_bounds(value, rules) {
        return Some(outcome);
    }

    let len = match value {
        FieldValue::String(s) => Some(char_len(s)),
        FieldValue::Array(items) => Some(items.len()),
        _ => None,
    };
    if let Some(len) = len {
        if let Some(rule) = &rules.min_length {
            if let Err(default) = validate_min_length(len, rule.value) {
                return Some(RunOutcome::invalid("minLength", message_or(rule, || default)));
            }
        }
        if let Some(rule) = &rules.max_length {
            if let Err(default) = validate_max_length(len, rule.value) {
                return Some(RunOutcome::invalid("maxLength", message_or(rule, || default)));
            }
        }
    }

    if let (Some(rule), Some(s)) = (&rules.pattern, value.as_str()) {
        if !rule.value.is_match(s) {
            return Some(RunOutcome::invalid("pattern", rule.message.as_str()));
        }
    }

    None
}

/// `min` / `max` against a number, or against a date as epoch milliseconds
fn check_bounds(value: &FieldValue, rules: &RuleSet) -> Option<RunOutcome> {
    let is_date = matches!(value, FieldValue::Date(_));
    let n = match value.as_date() {
        Some(date) => epoch_millis(date),
        None => value.as_f64()?,
    };

    if let Some(rule) = rules.min.as_ref().filter(|rule| n < rule.value) {
        let message = message_or(rule, || format!("Must be at least {}", describe_bound(rule.value, is_date)));
        return Some(RunOutcome::invalid("min", message));
    }
    if let Some(rule) = rules.max.as_ref().filter(|rule| n > rule.value) {
        let message = message_or(rule, || format!("Must be at most {}", describe_bound(rule.value, is_date)));
        return Some(RunOutcome::invalid("max", message));
    }
    None
}

fn describe_bound(bound: f64, is_date: bool) -> String {
    let date = is_date
        .then(|| DateTime::<Utc>::from_timestamp_millis(bound as i64))
        .flatten();
    match date {
        Some(date) => date.date_naive().format(DATE_FORMAT).to_string(),
        None => FieldValue::Number(bound).to_string(),
    }
}

fn message_or<T>(rule: &Rule<T>, default: impl FnOnce() -> String) -> String {
    if rule.message.is_empty() {
        default()
    } else {
        rule.message.clone()
    }
}
