//! Integration tests for the instruction -> action -> deep link pipeline

use agentic_ios::command::ActionDispatcher;
use agentic_ios::core::config::RunnerConfig;
use agentic_ios::core::AppId;
use agentic_ios::core::error::{Result, RunnerError};
use agentic_ios::device::Device;
use agentic_ios::llm::{parse_instruction, CompletionBackend, InstructionContext, LlmClient};
use std::sync::Mutex;

/// Backend that answers every model with the next canned response
struct ScriptedBackend {
    models: Vec<String>,
    answers: Mutex<Vec<Result<String>>>,
}

impl ScriptedBackend {
    fn answering(answers: Vec<Result<String>>) -> Self {
        Self {
            models: vec!["gpt-4o-mini".into(), "gpt-4o".into()],
            answers: Mutex::new(answers.into_iter().rev().collect()),
        }
    }

    fn single(answer: &str) -> Self {
        Self::answering(vec![Ok(answer.to_string())])
    }
}

impl CompletionBackend for ScriptedBackend {
    fn models(&self) -> &[String] {
        &self.models
    }

    async fn complete(&self, _model: &str, _system: &str, _user: &str) -> Result<String> {
        self.answers
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(RunnerError::Llm("no more answers".into())))
    }
}

#[derive(Default)]
struct RecordingDevice {
    opened: Mutex<Vec<String>>,
}

impl Device for RecordingDevice {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn describe(&self) -> String {
        "recording device".into()
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Run one instruction end to end and return the opened links
async fn run(instruction: &str, backend: &ScriptedBackend) -> Result<Vec<String>> {
    let context = InstructionContext::from_instruction(instruction);
    let action = parse_instruction(backend, &context).await?;
    let device = RecordingDevice::default();
    ActionDispatcher::new(&device).dispatch(&action)?;
    let opened = device.opened.lock().unwrap().clone();
    Ok(opened)
}

#[tokio::test]
async fn test_phone_call_example() {
    let backend = ScriptedBackend::single(r#"{"app": "Phone", "arguments": {"contact": "Alice"}}"#);
    let context = InstructionContext::from_instruction("give Alice a phone call");
    let action = parse_instruction(&backend, &context).await.unwrap();

    assert_eq!(action.app, AppId::Phone);
    assert_eq!(action.params.len(), 1);
    assert_eq!(action.param("contact"), Some("Alice"));

    let device = RecordingDevice::default();
    let outcome = ActionDispatcher::new(&device).dispatch(&action).unwrap();
    assert_eq!(outcome.url, "tel:Alice");
    assert_eq!(*device.opened.lock().unwrap(), vec!["tel:Alice"]);
}

#[tokio::test]
async fn test_driving_directions_example() {
    let backend = ScriptedBackend::single(
        r#"{"app": "Maps", "arguments": {"source": "San Francisco", "destination": "Los Angeles", "transport": "driving"}}"#,
    );
    let opened = run("open maps for driving from San Francisco to Los Angeles", &backend)
        .await
        .unwrap();
    assert_eq!(
        opened,
        vec!["maps://?saddr=San%20Francisco&daddr=Los%20Angeles&dirflg=d"]
    );
}

#[tokio::test]
async fn test_detected_slots_fill_missing_model_arguments() {
    // The model names the app but leaves out the route
    let backend = ScriptedBackend::single(r#"{"app": "Maps", "arguments": {}}"#);
    let opened = run("walk from Union Square to Ferry Building", &backend)
        .await
        .unwrap();
    assert_eq!(
        opened,
        vec!["maps://?saddr=Union%20Square&daddr=Ferry%20Building&dirflg=w"]
    );
}

#[tokio::test]
async fn test_destination_only_directions() {
    let backend =
        ScriptedBackend::single(r#"{"app": "Maps", "arguments": {"destination": "the airport"}}"#);
    let opened = run("navigate to the airport", &backend).await.unwrap();
    assert_eq!(opened, vec!["maps://?daddr=the%20airport&dirflg=d"]);
}

#[tokio::test]
async fn test_bare_open_of_searchable_apps() {
    let cases = [
        ("open the app store", "App Store", "itms-apps://"),
        ("open apple music", "Music", "music://"),
        ("open google maps", "Google Maps", "comgooglemaps://?mapmode=streetview"),
    ];
    for (instruction, app, expected) in cases {
        let answer = format!(r#"{{"app": "{}", "arguments": {{}}}}"#, app);
        let backend = ScriptedBackend::single(&answer);
        let opened = run(instruction, &backend).await.unwrap();
        assert_eq!(opened, vec![expected], "{}", instruction);
    }
}

#[tokio::test]
async fn test_spotify_example() {
    let backend =
        ScriptedBackend::single(r#"{"app": "Spotify", "arguments": {"query": "The Beatles"}}"#);
    let opened = run("play some Beatles on Spotify", &backend).await.unwrap();
    assert_eq!(opened, vec!["spotify:search:The%20Beatles"]);
}

#[tokio::test]
async fn test_settings_enum_is_normalized() {
    let backend = ScriptedBackend::single(r#"{"app": "Settings", "arguments": {"root": "bluetooth"}}"#);
    let opened = run("turn on bluetooth", &backend).await.unwrap();
    assert_eq!(opened, vec!["App-Prefs:root=Bluetooth"]);
}

#[tokio::test]
async fn test_messages_example() {
    let backend = ScriptedBackend::single(
        r#"{"app": "Messages", "arguments": {"phone": "5551234", "message": "running late"}}"#,
    );
    let opened = run("text 5551234 that I'm running late", &backend).await.unwrap();
    assert_eq!(opened, vec!["sms:5551234&body=running%20late"]);
}

#[tokio::test]
async fn test_unsupported_app_is_reported_not_dispatched() {
    let backend = ScriptedBackend::single(
        r#"{"app": "unsupported", "arguments": {"app": "Snapchat"}}"#,
    );
    let err = run("send a snap to Bob on Snapchat", &backend).await.unwrap_err();
    match &err {
        RunnerError::UnsupportedApp(name) => assert_eq!(name, "Snapchat"),
        other => panic!("expected UnsupportedApp, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_missing_required_argument_is_classification_error() {
    let backend = ScriptedBackend::single(r#"{"app": "Mail", "arguments": {"subject": "Hi"}}"#);
    let err = run("write an email", &backend).await.unwrap_err();
    assert!(matches!(err, RunnerError::Classification(_)));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_falls_back_to_next_model() {
    let backend = ScriptedBackend::answering(vec![
        Err(RunnerError::Llm("HTTP 429".into())),
        Ok(r#"```json
{"app": "Notes", "arguments": {}}
```"#
            .into()),
    ]);
    let opened = run("open my notes", &backend).await.unwrap();
    assert_eq!(opened, vec!["mobilenotes://"]);
}

#[tokio::test]
async fn test_all_models_failing_is_llm_error() {
    let backend = ScriptedBackend::answering(vec![
        Err(RunnerError::Llm("timeout".into())),
        Err(RunnerError::Llm("timeout".into())),
    ]);
    let err = run("open my notes", &backend).await.unwrap_err();
    assert!(matches!(err, RunnerError::Llm(_)));
}

#[test]
fn test_missing_api_key_fails_before_any_request() {
    let mut config = RunnerConfig::default();
    config.apply_env(|_| None);
    match LlmClient::from_config(&config) {
        Err(err) => {
            assert!(matches!(err, RunnerError::Config(_)));
            assert!(err.to_string().contains("OPENAI_API_KEY"));
            assert_eq!(err.exit_code(), 2);
        }
        Ok(_) => panic!("client built without a key"),
    }
}

#[test]
fn test_dispatch_named_unsupported() {
    let device = RecordingDevice::default();
    let err = ActionDispatcher::new(&device)
        .dispatch_named("Snapchat", Default::default())
        .unwrap_err();
    assert!(matches!(err, RunnerError::UnsupportedApp(_)));
    assert!(device.opened.lock().unwrap().is_empty());
}
