// Integration tests: the tutorial sign-up form driven end to end

use pretty_assertions::assert_eq;
use rusty_forms::{
    ChangeKind, FieldArrayOptions, FieldError, FieldPath, FieldValue, Form, FormConfig, FormError, MemorySink,
    RuleOutcome, RuleSet, SetValueOptions, SubmitOutcome, ValidationMode, Validator,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn p(raw: &str) -> FieldPath {
    FieldPath::parse(raw).unwrap()
}

fn defaults() -> serde_json::Value {
    json!({
        "username": "Batman",
        "email": "",
        "channel": "",
        "social": { "twitter": "", "facebook": "" },
        "phoneNumbers": ["", ""],
        "phNumbers": [{ "number": "" }, { "number": "" }],
        "age": 0,
        "dob": "2000-01-01"
    })
}

fn email_rules() -> RuleSet {
    RuleSet::new()
        .required("Email is required!")
        .pattern(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$", "Invalid email format!")
        .unwrap()
        .validate(
            "notAdmin",
            Validator::sync(|v| Ok(RuleOutcome::ensure(v.as_str() != Some("admin@mail.com"), "Email is banned!"))),
        )
        .validate(
            "notBlacklisted",
            Validator::future(|v: FieldValue| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let blacklisted = v.as_str().map(|s| s.ends_with("baddomain.com")).unwrap_or(false);
                anyhow::Ok(RuleOutcome::ensure(!blacklisted, "You are blacklisted!"))
            }),
        )
}

fn channel_is_empty(values: &FieldValue) -> bool {
    values
        .as_object()
        .and_then(|m| m.get("channel"))
        .and_then(|v| v.as_str())
        .map(str::is_empty)
        .unwrap_or(true)
}

fn tutorial_form(sink: Arc<MemorySink>) -> Form {
    let form = Form::with_sink(
        FormConfig::default()
            .with_mode(ValidationMode::OnChange)
            .with_defaults(defaults()),
        sink,
    );
    form.register("username", RuleSet::new().required("Username is required!")).unwrap();
    form.register("email", email_rules()).unwrap();
    form.register("channel", RuleSet::new().required("Channel is required!")).unwrap();
    form.register(
        "social.twitter",
        RuleSet::new().required("Enter twitter profile").disabled_when(channel_is_empty),
    )
    .unwrap();
    form.register("social.facebook", RuleSet::new()).unwrap();
    form.register("age", RuleSet::new().required("Age is required").value_as_number()).unwrap();
    form.register("dob", RuleSet::new().required("Date of birth is required").value_as_date()).unwrap();
    form.field_array(
        "phNumbers",
        FieldArrayOptions::new().min_length(1).rule("number", RuleSet::new()),
    )
    .unwrap();
    form
}

#[tokio::test]
async fn email_validation_walks_the_rules_in_order() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    let email = form.register("email", email_rules()).unwrap();

    let cases = [
        ("", Some(("required", "Email is required!"))),
        ("batman", Some(("pattern", "Invalid email format!"))),
        ("admin@mail.com", Some(("notAdmin", "Email is banned!"))),
        ("bruce@baddomain.com", Some(("notBlacklisted", "You are blacklisted!"))),
        ("bruce@wayne.com", None),
    ];

    for (input, expected) in cases {
        email.on_change(input).await.unwrap();
        let expected = expected.map(|(kind, message)| FieldError::new(kind, message));
        assert_eq!(email.error(), expected, "input {:?}", input);
    }
}

#[tokio::test]
async fn first_phone_row_is_fixed() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    let numbers = form.list("phNumbers").unwrap();
    assert_eq!(numbers.len(), 2);

    let err = form.remove("phNumbers", 0).unwrap_err();
    assert!(matches!(err, FormError::MinLength { index: 0, min_length: 1, .. }));
    assert_eq!(form.list("phNumbers").unwrap(), numbers);

    form.remove("phNumbers", 1).unwrap();
    let remaining = form.list("phNumbers").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, numbers[0].id);
}

#[tokio::test]
async fn append_then_remove_restores_the_id_sequence() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    let before = form.list("phNumbers").unwrap();

    let added = form.append("phNumbers", json!({ "number": "5555555555" })).unwrap();
    assert_eq!(added.index, 2);
    assert!(before.iter().all(|entry| entry.id != added.id));

    form.remove("phNumbers", 2).unwrap();
    assert_eq!(form.list("phNumbers").unwrap(), before);
}

#[tokio::test]
async fn submit_with_one_invalid_field() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    form.set_value("email", "bruce@wayne.com", SetValueOptions::default()).await.unwrap();

    let invalid_calls = Arc::new(AtomicUsize::new(0));
    let calls = invalid_calls.clone();
    let outcome = form
        .submit(
            |_| async { Err::<(), _>(anyhow::anyhow!("onValid must not run")) },
            move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            },
        )
        .await;

    let SubmitOutcome::Invalid(errors) = outcome else {
        panic!("expected an invalid submit, got {:?}", outcome);
    };
    assert_eq!(errors.keys().cloned().collect::<Vec<_>>(), vec![p("channel")]);
    assert_eq!(invalid_calls.load(Ordering::SeqCst), 1);

    let meta = form.form_state().meta;
    assert_eq!(meta.submit_count, 1);
    assert!(!meta.is_submit_successful);
    assert!(meta.is_submitted);
    assert!(!meta.is_submitting);
}

#[tokio::test]
async fn later_validation_wins_even_when_it_finishes_first() {
    let form = Form::new(FormConfig::default().with_defaults(json!({ "username": "" })));
    let username = form
        .register(
            "username",
            RuleSet::new().validate(
                "available",
                Validator::future(|v: FieldValue| async move {
                    let delay = if v.as_str() == Some("taken") { 50 } else { 5 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    anyhow::Ok(RuleOutcome::ensure(v.as_str() != Some("taken"), "Username is taken"))
                }),
            ),
        )
        .unwrap();

    let slow = form.set_value("username", "taken", SetValueOptions::validate());
    let fast = async {
        tokio::time::sleep(Duration::from_millis(2)).await;
        form.set_value("username", "free", SetValueOptions::validate()).await
    };
    let (slow, fast) = tokio::join!(slow, fast);
    slow.unwrap();
    fast.unwrap();

    assert_eq!(username.error(), None);
    assert_eq!(username.value(), FieldValue::from("free"));
}

#[tokio::test]
async fn reset_twice_equals_reset_once() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    let username = form.register("username", RuleSet::new().required("Username is required!")).unwrap();
    username.on_change("").await.unwrap();
    username.on_blur().await.unwrap();
    form.append("phNumbers", json!({ "number": "1" })).unwrap();
    form.submit(|_| async { anyhow::Ok(()) }, |_| async { anyhow::Ok(()) }).await;

    form.reset(None).unwrap();
    let once = form.form_state();
    form.reset(None).unwrap();
    let twice = form.form_state();

    assert_eq!(once.values, twice.values);
    assert_eq!(once.errors, twice.errors);
    assert_eq!(once.meta, twice.meta);
    assert_eq!(once.touched_fields, twice.touched_fields);
    assert_eq!(twice.values, FieldValue::from(defaults()));
    assert_eq!(twice.meta.submit_count, 0);
    assert_eq!(form.list("phNumbers").unwrap().len(), 2);
}

#[tokio::test]
async fn twitter_is_disabled_while_channel_is_empty() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    let channel = form.register("channel", RuleSet::new().required("Channel is required!")).unwrap();
    let twitter = form
        .register(
            "social.twitter",
            RuleSet::new().required("Enter twitter profile").disabled_when(channel_is_empty),
        )
        .unwrap();
    assert!(twitter.is_disabled());
    assert!(form.trigger(["social.twitter"]).await.unwrap());

    channel.on_change("codevolution").await.unwrap();
    assert!(!twitter.is_disabled());
    assert!(!form.trigger(["social.twitter"]).await.unwrap());
    assert_eq!(twitter.error().map(|e| e.kind), Some("required".to_string()));

    // Disabling again drops the stale error
    channel.on_change("").await.unwrap();
    assert!(twitter.is_disabled());
    assert_eq!(twitter.error(), None);
    assert_eq!(form.form_state().disabled_fields, vec![p("social.twitter")]);
}

#[tokio::test]
async fn non_numeric_age_fails_required() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    let age = form.register("age", RuleSet::new().required("Age is required").value_as_number()).unwrap();

    age.on_change("twenty").await.unwrap();
    assert!(age.value().as_f64().unwrap().is_nan());
    assert_eq!(age.error(), Some(FieldError::new("required", "Age is required")));

    age.on_change("20").await.unwrap();
    assert_eq!(age.value(), FieldValue::Number(20.0));
    assert_eq!(age.error(), None);
}

#[tokio::test]
async fn panicking_watcher_is_isolated() {
    let sink = Arc::new(MemorySink::new());
    let form = tutorial_form(sink.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));

    form.watch(|event| {
        if event.kind == ChangeKind::Value {
            panic!("watcher blew up");
        }
        Ok(())
    });
    form.watch(|_| anyhow::bail!("watcher refused"));
    let log = seen.clone();
    form.watch(move |event| {
        log.lock().unwrap().push(event.kind);
        Ok(())
    });

    form.set_value("username", "Robin", SetValueOptions::default()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![ChangeKind::Value]);
    assert_eq!(form.get_value("username").unwrap(), FieldValue::from("Robin"));
    let messages = sink.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("watcher blew up"));
    assert!(messages[1].contains("watcher refused"));
}

#[tokio::test]
async fn get_values_of_returns_only_what_was_asked() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    form.set_value("social.twitter", "john_doe_tw", SetValueOptions::default()).await.unwrap();

    let values = form.get_values_of(["username", "social.twitter", "phoneNumbers.0"]).unwrap();
    assert_eq!(
        values,
        vec![FieldValue::from("Batman"), FieldValue::from("john_doe_tw"), FieldValue::from("")]
    );
    assert_eq!(form.get_value("social.instagram").unwrap(), FieldValue::Undefined);
}

#[tokio::test]
async fn dirty_and_touched_follow_the_user() {
    let form = tutorial_form(Arc::new(MemorySink::new()));
    let username = form.register("username", RuleSet::new().required("Username is required!")).unwrap();

    username.on_change("Robin").await.unwrap();
    username.on_blur().await.unwrap();
    let state = form.form_state();
    assert_eq!(state.dirty_fields, vec![p("username")]);
    assert_eq!(state.touched_fields, vec![p("username")]);
    assert!(state.meta.is_dirty);

    username.on_change("Batman").await.unwrap();
    assert!(!form.form_state().meta.is_dirty);
}
