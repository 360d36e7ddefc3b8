//! Rusty-Forms-Validation
//!
//! Rule sets, value coercion and the per-field validation runner used by the
//! rusty-forms state engine.
//!
//! - [`RuleSet`] - what a field must satisfy (`required`, `pattern`, custom rules, ...)
//! - [`Validator`] - a named custom rule, synchronous or asynchronous
//! - [`runner`] - evaluates a rule set against one value, first failure wins

pub mod rules;
pub mod runner;
pub mod string;
pub mod validator;

pub use rules::{Disabled, DisabledPredicate, Rule, RuleSet, ValueTransform};
pub use runner::{run, validate, FieldError, RunOutcome, ValidationResult, ValidatorFault, FAULT_MESSAGE};
pub use validator::{panic_error, BoxFuture, RuleOutcome, Validator};
