mod render_counter;
mod signup;

use rusty_forms::{ChangeKind, FormConfig, FormError, SetValueOptions, SubmitOutcome};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::render_counter::RenderCounter;
use crate::signup::SignupForm;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("FORMS_CONFIG").unwrap_or_else(|_| "forms.toml".to_string());
    let config = FormConfig::load_from(&config_path);
    info!(mode = ?config.mode, revalidate = ?config.revalidate_mode, "form config loaded");

    let signup = SignupForm::build(config)?;
    let form = signup.form.clone();

    // Every committed change is one render of the page
    let renders = RenderCounter::new();
    let counter = renders.clone();
    form.watch(move |event| {
        let count = counter.bump();
        tracing::debug!(count, kind = ?event.kind, "render");
        Ok(())
    });

    form.watch_value("username", |value| {
        info!(username = %value, "username changed");
        Ok(())
    })?;

    let mut events = form.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.kind == ChangeKind::Submit {
                info!(version = event.version, "submit state changed");
            }
        }
    });

    // Typing into the form
    signup.username.on_change("Bruce").await?;
    signup.username.on_blur().await?;
    signup.email.on_change("bruce@baddomain.com").await?;
    signup.email.on_blur().await?;
    form.trigger(["email"]).await?;
    report_error("email", signup.email.error());
    signup.email.on_change("bruce@wayne.com").await?;

    signup.channel.on_change("codevolution").await?;
    info!(disabled = signup.twitter.is_disabled(), "twitter enabled once a channel is set");
    signup.twitter.on_change("bruce_tw").await?;
    signup.facebook.on_change("bruce_fb").await?;
    signup.primary_phone.on_change("1234567890").await?;
    signup.secondary_phone.on_change("").await?;

    signup.age.on_change("abc").await?;
    signup.age.on_blur().await?;
    form.trigger(["age"]).await?;
    report_error("age", signup.age.error());
    signup.age.on_change("35").await?;
    signup.dob.on_change("1985-02-19").await?;

    // Phone number rows
    let extra = signup.ph_numbers.append(json!({ "number": "5555555555" }))?;
    info!(id = %extra.id, index = extra.index, "phone row added");
    match signup.ph_numbers.remove(0) {
        Err(FormError::MinLength { .. }) => info!("first phone row cannot be removed"),
        other => other?,
    }
    form.set_value("phNumbers.0.number", "9876543210", SetValueOptions::all()).await?;

    // "Get values" button
    info!(values = %serde_json::to_string(&form.get_values())?, "get values");
    let picked = form.get_values_of(["username", "channel"])?;
    info!(?picked, "get values of username and channel");

    // "Set values" button
    form.set_value("username", "", SetValueOptions::all()).await?;
    report_error("username", signup.username.error());
    form.set_value("username", "Batman", SetValueOptions::all()).await?;

    let on_submit = form.handle_submit(
        |values| async move {
            info!(values = %serde_json::to_string(&values)?, "form submitted");
            anyhow::Ok(())
        },
        |errors| async move {
            warn!(count = errors.len(), "form has errors");
            anyhow::Ok(())
        },
    );

    match on_submit().await {
        SubmitOutcome::Submitted => info!("submit succeeded"),
        SubmitOutcome::Invalid(errors) => {
            for (path, error) in &errors {
                report_error(path.as_str(), Some(error.clone()));
            }
        }
        SubmitOutcome::CallbackFailed { callback, message } => warn!(callback, %message, "submit callback failed"),
    }

    let state = form.form_state();
    info!(
        submit_count = state.meta.submit_count,
        successful = state.meta.is_submit_successful,
        dirty = ?state.dirty_fields,
        touched = state.touched_fields.len(),
        "form state"
    );

    // Submit succeeded, start over
    if state.meta.is_submit_successful {
        form.reset(None)?;
    }

    info!(renders = renders.count(), "done");
    logger.abort();
    Ok(())
}

fn report_error(field: &str, error: Option<rusty_forms::FieldError>) {
    match error {
        Some(error) => warn!(field, kind = %error.kind, message = %error.message, "field error"),
        None => info!(field, "field valid"),
    }
}
