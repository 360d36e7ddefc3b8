// File: rusty-forms/src/config.rs
// Purpose: Form configuration, loadable from `forms.toml`

use rusty_forms_types::FieldValue;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// When field validation runs in response to input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    /// Only when the form is submitted
    #[default]
    OnSubmit,
    /// On the first blur, then on every change
    OnTouched,
    All,
}

impl ValidationMode {
    /// Whether a change on a field with the given touched state validates it
    pub fn validates_on_change(self, is_touched: bool) -> bool {
        match self {
            ValidationMode::OnChange | ValidationMode::All => true,
            ValidationMode::OnTouched => is_touched,
            ValidationMode::OnBlur | ValidationMode::OnSubmit => false,
        }
    }

    pub fn validates_on_blur(self) -> bool {
        matches!(
            self,
            ValidationMode::OnBlur | ValidationMode::OnTouched | ValidationMode::All
        )
    }
}

/// Form configuration
///
/// ```toml
/// mode = "onTouched"
/// reValidateMode = "onBlur"
///
/// [defaultValues]
/// username = "Batman"
/// phNumbers = [{ number = "" }]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    #[serde(default)]
    pub mode: ValidationMode,
    /// Mode used on change/blur once the form has been submitted
    #[serde(default = "default_revalidate_mode", rename = "reValidateMode")]
    pub revalidate_mode: ValidationMode,
    /// Drop a field's value when it unregisters
    #[serde(default)]
    pub should_unregister: bool,
    #[serde(default = "FieldValue::empty_object")]
    pub default_values: FieldValue,
}

fn default_revalidate_mode() -> ValidationMode {
    ValidationMode::OnChange
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            revalidate_mode: default_revalidate_mode(),
            should_unregister: false,
            default_values: FieldValue::empty_object(),
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from `forms.toml` in the current directory
    pub fn load() -> Self {
        Self::load_from("forms.toml")
    }

    /// Load from a specific path
    /// Returns the default config if the file is missing or does not parse.
    pub fn load_from(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path, error = %e, "failed to parse form config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_revalidate_mode(mut self, mode: ValidationMode) -> Self {
        self.revalidate_mode = mode;
        self
    }

    pub fn with_should_unregister(mut self, should_unregister: bool) -> Self {
        self.should_unregister = should_unregister;
        self
    }

    pub fn with_defaults(mut self, defaults: impl Into<FieldValue>) -> Self {
        self.default_values = defaults.into();
        self
    }
}
