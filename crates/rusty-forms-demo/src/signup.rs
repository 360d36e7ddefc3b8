// File: rusty-forms-demo/src/signup.rs
// Purpose: The sign-up form: defaults, field rules and bindings

use rusty_forms::{
    FieldArray, FieldArrayOptions, FieldBinding, FieldValue, Form, FormConfig, RuleOutcome, RuleSet, Validator,
};
use serde_json::json;
use std::time::Duration;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*$";

/// Values the form starts with when the config does not supply any
pub fn default_values() -> FieldValue {
    json!({
        "username": "John Doe",
        "email": "john@mail.com",
        "channel": "john_doe",
        "social": { "facebook": "john_doe_fb", "twitter": "john_doe_tw" },
        "phoneNumbers": ["1234567890", "9876543210"],
        "phNumbers": [{ "number": "5555555555" }, { "number": "9999999999" }],
        "age": 25,
        "dob": "1996-01-01"
    })
    .into()
}

/// Every binding the page would hand to its inputs
pub struct SignupForm {
    pub form: Form,
    pub username: FieldBinding,
    pub email: FieldBinding,
    pub channel: FieldBinding,
    pub twitter: FieldBinding,
    pub facebook: FieldBinding,
    pub primary_phone: FieldBinding,
    pub secondary_phone: FieldBinding,
    pub age: FieldBinding,
    pub dob: FieldBinding,
    pub ph_numbers: FieldArray,
}

impl SignupForm {
    pub fn build(mut config: FormConfig) -> anyhow::Result<Self> {
        let no_defaults = config
            .default_values
            .as_object()
            .map(|defaults| defaults.is_empty())
            .unwrap_or(true);
        if no_defaults {
            config = config.with_defaults(default_values());
        }

        let form = Form::new(config);

        let username = form.register("username", RuleSet::new().required("Username is required!"))?;
        let email = form.register("email", email_rules()?)?;
        let channel = form.register("channel", RuleSet::new().required("Channel is required!"))?;
        let twitter = form.register(
            "social.twitter",
            RuleSet::new()
                .required("Twitter is required!")
                .disabled_when(|values| channel_of(values).is_empty()),
        )?;
        let facebook = form.register("social.facebook", RuleSet::new().required("Facebook is required!"))?;
        let primary_phone = form.register("phoneNumbers.0", RuleSet::new().required("Primary phone is required!"))?;
        let secondary_phone = form.register("phoneNumbers.1", RuleSet::new().required("Secondary phone is required!"))?;
        let age = form.register("age", RuleSet::new().required("Age is required!").value_as_number())?;
        let dob = form.register("dob", RuleSet::new().required("Date of Birth is required!").value_as_date())?;
        // the first row has no Remove button
        let ph_numbers = form.field_array("phNumbers", FieldArrayOptions::new().min_length(1))?;

        Ok(Self {
            form,
            username,
            email,
            channel,
            twitter,
            facebook,
            primary_phone,
            secondary_phone,
            age,
            dob,
            ph_numbers,
        })
    }
}

fn channel_of(values: &FieldValue) -> &str {
    values
        .as_object()
        .and_then(|m| m.get("channel"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn email_rules() -> anyhow::Result<RuleSet> {
    Ok(RuleSet::new()
        .required("Email is required!")
        .pattern(EMAIL_PATTERN, "Invalid email format!")?
        .validate(
            "notAdmin",
            Validator::sync(|v| Ok(RuleOutcome::ensure(v.as_str() != Some("admin@mail.com"), "Email is banned!"))),
        )
        .validate(
            "notBlacklisted",
            // Stands in for a server round trip
            Validator::future(|v: FieldValue| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let blacklisted = v.as_str().map(|s| s.ends_with("baddomain.com")).unwrap_or(false);
                anyhow::Ok(RuleOutcome::ensure(!blacklisted, "You are blacklisted!"))
            }),
        ))
}
