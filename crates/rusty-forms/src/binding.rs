// File: rusty-forms/src/binding.rs
// Purpose: What an input gets back from `register`: change/blur handlers and field reads

use rusty_forms_types::{path, FieldPath, FieldValue};
use rusty_forms_validation::FieldError;

use crate::error::Result;
use crate::store::{Form, SetValueOptions};
use crate::watch::ChangeKind;

/// A registered field, bound to its form
#[derive(Clone)]
pub struct FieldBinding {
    form: Form,
    name: FieldPath,
}

impl FieldBinding {
    pub(crate) fn new(form: Form, name: FieldPath) -> Self {
        Self { form, name }
    }

    pub fn name(&self) -> &FieldPath {
        &self.name
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Input changed
    ///
    /// The field's value transform runs first and the coerced value is
    /// stored. Validation follows the form's mode, or `reValidateMode` once
    /// the form has been submitted.
    pub async fn on_change(&self, raw: impl Into<FieldValue>) -> Result<()> {
        let raw = raw.into();
        let (value, should_validate) = self.form.with_state(|state| {
            let entry = state.registry.get(&self.name);
            let value = match entry {
                Some(entry) => entry.rules.value_transform.apply(raw),
                None => raw,
            };
            let is_touched = entry.map(|entry| entry.is_touched).unwrap_or(false);
            let should_validate = if state.meta.is_submitted {
                state.config.revalidate_mode.validates_on_change(true)
            } else {
                state.config.mode.validates_on_change(is_touched)
            };
            (value, should_validate)
        });

        self.form
            .set_value(
                &self.name,
                value,
                SetValueOptions {
                    should_validate,
                    should_dirty: true,
                    should_touch: false,
                },
            )
            .await
    }

    /// Input lost focus: mark touched and validate if the mode asks for it
    pub async fn on_blur(&self) -> Result<()> {
        let (event, should_validate) = self.form.with_state(|state| {
            let event = state
                .registry
                .touch(&self.name)
                .then(|| state.commit(Some(self.name.clone()), ChangeKind::Touched));
            let mode = if state.meta.is_submitted {
                state.config.revalidate_mode
            } else {
                state.config.mode
            };
            (event, mode.validates_on_blur())
        });
        self.form.emit_all(event);

        if should_validate {
            self.form.validate_path(&self.name).await;
        }
        Ok(())
    }

    pub fn value(&self) -> FieldValue {
        self.form
            .with_state(|state| path::get(&state.values, &self.name))
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<FieldError> {
        self.form.with_state(|state| state.errors.get(&self.name).cloned())
    }

    pub fn is_touched(&self) -> bool {
        self.flag(|entry| entry.is_touched)
    }

    pub fn is_dirty(&self) -> bool {
        self.flag(|entry| entry.is_dirty)
    }

    pub fn is_disabled(&self) -> bool {
        self.flag(|entry| entry.is_disabled)
    }

    fn flag(&self, read: impl Fn(&crate::registry::FieldEntry) -> bool) -> bool {
        self.form
            .with_state(|state| state.registry.get(&self.name).map(&read))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FormConfig, ValidationMode};
    use pretty_assertions::assert_eq;
    use rusty_forms_validation::RuleSet;
    use serde_json::json;

    fn form_with(mode: ValidationMode) -> Form {
        Form::new(
            FormConfig::default()
                .with_mode(mode)
                .with_defaults(json!({ "username": "", "age": 0 })),
        )
    }

    #[tokio::test]
    async fn test_on_submit_mode_defers_validation() {
        let form = form_with(ValidationMode::OnSubmit);
        let username = form.register("username", RuleSet::new().required("Username is required!")).unwrap();

        username.on_change("").await.unwrap();
        username.on_blur().await.unwrap();
        assert_eq!(username.error(), None);
        assert!(username.is_touched());
    }

    #[tokio::test]
    async fn test_on_change_mode_validates_each_change() {
        let form = form_with(ValidationMode::OnChange);
        let username = form.register("username", RuleSet::new().required("Username is required!")).unwrap();

        username.on_change("").await.unwrap();
        assert_eq!(username.error(), Some(FieldError::new("required", "Username is required!")));

        username.on_change("Batman").await.unwrap();
        assert_eq!(username.error(), None);
        assert!(username.is_dirty());
        assert_eq!(username.value(), FieldValue::from("Batman"));
    }

    #[tokio::test]
    async fn test_on_touched_mode_waits_for_first_blur() {
        let form = form_with(ValidationMode::OnTouched);
        let username = form.register("username", RuleSet::new().required("Username is required!")).unwrap();

        username.on_change("").await.unwrap();
        assert_eq!(username.error(), None);

        username.on_blur().await.unwrap();
        assert!(username.error().is_some());

        username.on_change("Batman").await.unwrap();
        assert_eq!(username.error(), None);
    }

    #[tokio::test]
    async fn test_revalidate_mode_after_submit() {
        let form = Form::new(
            FormConfig::default()
                .with_mode(ValidationMode::OnSubmit)
                .with_revalidate_mode(ValidationMode::OnBlur)
                .with_defaults(json!({ "username": "" })),
        );
        let username = form.register("username", RuleSet::new().required("Username is required!")).unwrap();
        form.submit(|_| async { anyhow::Ok(()) }, |_| async { anyhow::Ok(()) }).await;
        assert!(username.error().is_some());

        // onBlur re-validation: a change alone keeps the stale error
        username.on_change("Batman").await.unwrap();
        assert!(username.error().is_some());
        username.on_blur().await.unwrap();
        assert_eq!(username.error(), None);
    }

    #[tokio::test]
    async fn test_value_as_number_coerces_input() {
        let form = form_with(ValidationMode::OnChange);
        let age = form
            .register("age", RuleSet::new().required("Age is required").value_as_number())
            .unwrap();

        age.on_change("25").await.unwrap();
        assert_eq!(age.value(), FieldValue::Number(25.0));
        assert_eq!(age.error(), None);

        age.on_change("abc").await.unwrap();
        assert!(age.value().as_f64().unwrap().is_nan());
        assert_eq!(age.error().map(|e| e.kind), Some("required".to_string()));
    }
}
