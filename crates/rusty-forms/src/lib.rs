//! # rusty-forms
//!
//! A reactive form-state engine: register fields with rules, feed it input,
//! and observe values, errors and flags as they change.
//!
//! ## Quick Start
//!
//! ```rust
//! use rusty_forms::{Form, FormConfig, RuleOutcome, RuleSet, ValidationMode, Validator};
//! use serde_json::json;
//!
//! # futures::executor::block_on(async {
//! let form = Form::new(
//!     FormConfig::default()
//!         .with_mode(ValidationMode::OnChange)
//!         .with_defaults(json!({ "username": "", "email": "" })),
//! );
//!
//! let email = form
//!     .register(
//!         "email",
//!         RuleSet::new()
//!             .required("Email is required!")
//!             .validate("notAdmin", Validator::sync(|v| {
//!                 Ok(RuleOutcome::ensure(v.as_str() != Some("admin@mail.com"), "Email is banned!"))
//!             })),
//!     )
//!     .unwrap();
//!
//! email.on_change("admin@mail.com").await.unwrap();
//! assert_eq!(email.error().unwrap().message, "Email is banned!");
//!
//! let outcome = form
//!     .submit(|_values| async { anyhow::Ok(()) }, |_errors| async { anyhow::Ok(()) })
//!     .await;
//! assert!(!outcome.is_submitted());
//! assert_eq!(form.form_state().meta.submit_count, 1);
//! # });
//! ```
//!
//! ## Architecture
//!
//! - **`rusty-forms-types`** - the value tree and path access
//! - **`rusty-forms-validation`** - rule sets and the per-field validation runner
//! - **`rusty-forms`** (this crate) - registry, field arrays, the store, watch
//!   subscriptions and submit orchestration
//!
//! A [`Form`] never holds its lock while a validator, watcher or submit
//! callback runs, so those may freely read or update the form.

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field_array;
pub mod registry;
pub mod state;
pub mod store;
pub mod submit;
pub mod watch;

pub use binding::FieldBinding;
pub use config::{FormConfig, ValidationMode};
pub use diagnostics::{Diagnostic, ErrorSink, MemorySink, TracingSink};
pub use error::{FormError, Result};
pub use field_array::{ArrayFieldEntry, FieldArray, FieldArrayOptions};
pub use registry::{FieldEntry, FieldRegistry};
pub use state::{ErrorMap, FormMeta, FormStateSnapshot};
pub use store::{Form, SetValueOptions};
pub use submit::SubmitOutcome;
pub use watch::{ChangeKind, Subscription, WatchEvent};

pub use rusty_forms_types::{path, FieldMap, FieldPath, FieldValue, PathError};
pub use rusty_forms_validation::{
    Disabled, FieldError, RuleOutcome, RuleSet, ValidationResult, Validator, ValueTransform,
};
