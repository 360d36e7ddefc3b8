// File: rusty-forms-validation/src/rules.rs
// Purpose: Per-field rule sets supplied at registration

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use rusty_forms_types::{FieldValue, DATE_FORMAT};
use std::fmt;
use std::sync::Arc;

use crate::validator::Validator;

/// A date as milliseconds since the Unix epoch, the scale `min`/`max` use for dates
pub fn epoch_millis(date: NaiveDate) -> f64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis() as f64
}

/// A rule parameter together with the message shown when it fails
#[derive(Debug, Clone)]
pub struct Rule<T> {
    pub value: T,
    pub message: String,
}

impl<T> Rule<T> {
    pub fn new(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            message: message.into(),
        }
    }
}

/// Coercion applied to raw input before rules run
///
/// The coerced value is what gets stored in the form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueTransform {
    #[default]
    None,
    /// `valueAsNumber`: unparseable input becomes NaN
    AsNumber,
    /// `valueAsDate`: `YYYY-MM-DD`, unparseable input becomes an invalid date
    AsDate,
}

impl ValueTransform {
    pub fn apply(self, raw: FieldValue) -> FieldValue {
        match self {
            ValueTransform::None => raw,
            ValueTransform::AsNumber => match raw {
                FieldValue::Number(n) => FieldValue::Number(n),
                FieldValue::String(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        FieldValue::Number(f64::NAN)
                    } else {
                        FieldValue::Number(trimmed.parse().unwrap_or(f64::NAN))
                    }
                }
                _ => FieldValue::Number(f64::NAN),
            },
            ValueTransform::AsDate => match raw {
                FieldValue::Date(d) => FieldValue::Date(d),
                FieldValue::String(s) => {
                    FieldValue::Date(NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
                }
                _ => FieldValue::Date(None),
            },
        }
    }
}

/// Predicate over the whole form value tree
pub type DisabledPredicate = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// Whether a field is disabled, possibly depending on other fields
#[derive(Clone, Default)]
pub enum Disabled {
    #[default]
    Never,
    Always,
    /// Re-evaluated against the current form values after every value change
    When(DisabledPredicate),
}

impl Disabled {
    pub fn evaluate(&self, values: &FieldValue) -> bool {
        match self {
            Disabled::Never => false,
            Disabled::Always => true,
            Disabled::When(predicate) => predicate(values),
        }
    }
}

impl fmt::Debug for Disabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disabled::Never => f.write_str("Never"),
            Disabled::Always => f.write_str("Always"),
            Disabled::When(_) => f.write_str("When(..)"),
        }
    }
}

/// Everything known about how one field is validated
///
/// Built with chained calls:
///
/// ```rust
/// use rusty_forms_validation::{RuleOutcome, RuleSet, Validator};
///
/// let rules = RuleSet::new()
///     .required("Email is required!")
///     .pattern(r"^[^@]+@[^@]+$", "Invalid email format!")
///     .unwrap()
///     .validate("notAdmin", Validator::sync(|v| {
///         Ok(RuleOutcome::ensure(v.as_str() != Some("admin@mail.com"), "Email is banned!"))
///     }));
/// assert_eq!(rules.validate.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub required: Option<Rule<bool>>,
    pub min: Option<Rule<f64>>,
    pub max: Option<Rule<f64>>,
    pub min_length: Option<Rule<usize>>,
    pub max_length: Option<Rule<usize>>,
    pub pattern: Option<Rule<Regex>>,
    /// Custom rules, run in insertion order
    pub validate: Vec<(String, Validator)>,
    pub value_transform: ValueTransform,
    pub disabled: Disabled,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = Some(Rule::new(true, message));
        self
    }

    pub fn min(mut self, value: f64, message: impl Into<String>) -> Self {
        self.min = Some(Rule::new(value, message));
        self
    }

    pub fn max(mut self, value: f64, message: impl Into<String>) -> Self {
        self.max = Some(Rule::new(value, message));
        self
    }

    /// Earliest accepted date, for fields read with [`RuleSet::value_as_date`]
    pub fn min_date(self, date: NaiveDate, message: impl Into<String>) -> Self {
        self.min(epoch_millis(date), message)
    }

    /// Latest accepted date, for fields read with [`RuleSet::value_as_date`]
    pub fn max_date(self, date: NaiveDate, message: impl Into<String>) -> Self {
        self.max(epoch_millis(date), message)
    }

    pub fn min_length(mut self, value: usize, message: impl Into<String>) -> Self {
        self.min_length = Some(Rule::new(value, message));
        self
    }

    pub fn max_length(mut self, value: usize, message: impl Into<String>) -> Self {
        self.max_length = Some(Rule::new(value, message));
        self
    }

    /// Compile `pattern` and attach it
    pub fn pattern(self, pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(self.pattern_regex(Regex::new(pattern)?, message))
    }

    /// Attach an already compiled pattern
    pub fn pattern_regex(mut self, regex: Regex, message: impl Into<String>) -> Self {
        self.pattern = Some(Rule::new(regex, message));
        self
    }

    /// Add a named custom rule; a rule with the same name is replaced in place
    pub fn validate(mut self, name: impl Into<String>, validator: Validator) -> Self {
        let name = name.into();
        match self.validate.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = validator,
            None => self.validate.push((name, validator)),
        }
        self
    }

    pub fn value_as_number(mut self) -> Self {
        self.value_transform = ValueTransform::AsNumber;
        self
    }

    pub fn value_as_date(mut self) -> Self {
        self.value_transform = ValueTransform::AsDate;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = if disabled { Disabled::Always } else { Disabled::Never };
        self
    }

    /// Disable the field whenever `predicate` holds for the current form values
    pub fn disabled_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        self.disabled = Disabled::When(Arc::new(predicate));
        self
    }

    /// True when the set would never report an error
    pub fn is_empty(&self) -> bool {
        !self.required.as_ref().map(|r| r.value).unwrap_or(false)
            && self.min.is_none()
            && self.max.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.validate.is_empty()
    }
}
