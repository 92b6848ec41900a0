//! Chat session tests
//!
//! Run full turns through `AppState`'s engine and the real OpenAI client
//! against the mock chat endpoint.

use keychat::chat::{NoopObserver, ReplySource, EXTRACTION_FAILED_TEXT};
use keychat::{AppError, AppState, Message, Role, Session};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::common::{constants, test_params, test_state};
use crate::mocks::MockOpenAI;

async fn say(state: &AppState, session: &mut Session, text: &str) -> keychat::TurnReport {
    state
        .engine
        .send(
            session,
            text,
            &test_params(),
            &mut NoopObserver,
            &CancellationToken::new(),
        )
        .await
        .expect("turn runs")
}

#[tokio::test]
async fn test_say_hi_streams_reply() {
    let mock = MockOpenAI::start().await;
    mock.mock_chat_stream(&["Hi", " there!"]).await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();

    let report = say(&state, &mut session, "Say hi").await;

    assert_eq!(report.source, ReplySource::Streamed);
    assert_eq!(
        session.messages(),
        &[
            Message::system(constants::TEST_SYSTEM_PROMPT),
            Message::user("Say hi"),
            Message::assistant("Hi there!"),
        ]
    );

    let requests = mock.chat_requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request["model"], constants::TEST_MODEL);
    assert_eq!(request["stream"], true);
    assert_eq!(request["max_tokens"], 256);
    let temperature = request["temperature"].as_f64().unwrap();
    assert!((temperature - 0.7).abs() < 1e-6);
    // The empty placeholder is never sent
    assert_eq!(
        request["messages"],
        json!([
            {"role": "system", "content": constants::TEST_SYSTEM_PROMPT},
            {"role": "user", "content": "Say hi"}
        ])
    );
}

#[tokio::test]
async fn test_second_turn_carries_history() {
    let mock = MockOpenAI::start().await;
    mock.mock_chat_stream(&["ok"]).await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();

    say(&state, &mut session, "one").await;
    say(&state, &mut session, "two").await;

    assert_eq!(session.len(), 5);
    let requests = mock.chat_requests().await;
    let roles: Vec<&str> = requests[1]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
}

#[tokio::test]
async fn test_empty_stream_falls_back_to_blocking() {
    let mock = MockOpenAI::start().await;
    mock.mock_chat_stream(&[]).await;
    mock.mock_chat_completion("Hello from the fallback").await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();

    let report = say(&state, &mut session, "hello").await;

    assert_eq!(report.source, ReplySource::Blocking);
    assert_eq!(session.last().unwrap().content, "Hello from the fallback");

    let requests = mock.chat_requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1]["stream"], false);
    assert_eq!(requests[0]["messages"], requests[1]["messages"]);
    assert_eq!(requests[0]["max_tokens"], requests[1]["max_tokens"]);
}

#[tokio::test]
async fn test_stream_failure_falls_back_to_blocking() {
    let mock = MockOpenAI::start().await;
    mock.mock_chat_stream_error(500).await;
    mock.mock_chat_completion("recovered").await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();

    let report = say(&state, &mut session, "hello").await;

    assert_eq!(report.source, ReplySource::Blocking);
    assert!(report.fallback_reason.unwrap().contains("HTTP 500"));
    assert_eq!(session.last().unwrap().content, "recovered");
}

#[tokio::test]
async fn test_unrecognized_events_are_skipped() {
    let mock = MockOpenAI::start().await;
    let body = concat!(
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"weird\":true}\n\n",
        "data: {\"choices\":[{\"text\":\"legacy \"}]}\n\n",
        "data: {\"text\":\"bare\"}\n\n",
        "data: [DONE]\n\n",
    );
    mock.mock_chat_stream_raw(body.to_string()).await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();

    let report = say(&state, &mut session, "hello").await;

    assert_eq!(report.source, ReplySource::Streamed);
    assert_eq!(report.fragments, 2);
    assert_eq!(session.last().unwrap().content, "legacy bare");
}

#[tokio::test]
async fn test_blocking_failure_is_written_to_transcript() {
    let mock = MockOpenAI::start().await;
    mock.mock_chat_stream_error(503).await;
    mock.mock_chat_completion_error(429).await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();

    let report = say(&state, &mut session, "hello").await;

    assert!(matches!(report.source, ReplySource::Failed(_)));
    let last = session.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.content.starts_with("Error calling the API: Rate limited"));
}

#[tokio::test]
async fn test_unextractable_completion_uses_sentinel() {
    let mock = MockOpenAI::start().await;
    mock.mock_chat_stream(&[]).await;
    mock.mock_chat_completion_json(json!({"choices": [{"message": {"role": "assistant", "content": null}}]}))
        .await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();

    let report = say(&state, &mut session, "hello").await;

    assert_eq!(report.source, ReplySource::Extraction);
    assert_eq!(session.last().unwrap().content, EXTRACTION_FAILED_TEXT);
}

#[tokio::test]
async fn test_unconfigured_state_rejects_turns() {
    let mock = MockOpenAI::start().await;
    let state = AppState::new(crate::common::test_config(&mock.uri()), None).unwrap();
    let mut session = state.new_session();

    let result = state
        .engine
        .send(
            &mut session,
            "hello",
            &test_params(),
            &mut NoopObserver,
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::ClientNotConfigured)));
    assert_eq!(session.len(), 1);
    assert!(mock.chat_requests().await.is_empty());
}

#[tokio::test]
async fn test_reset_and_export_round_trip() {
    let mock = MockOpenAI::start().await;
    mock.mock_chat_stream(&["Hi", " there!"]).await;
    let state = test_state(&mock.uri(), constants::TEST_API_KEY);
    let mut session = state.new_session();
    say(&state, &mut session, "Say hi").await;

    let dir = TempDir::new().unwrap();
    let path = session.export_to_file(dir.path()).unwrap();
    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("chat_history_"));
    assert!(file_name.ends_with(".json"));

    let restored = Session::from_export(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(restored.messages(), session.messages());

    session.reset();
    session.reset();
    assert_eq!(
        session.messages(),
        &[Message::system(constants::TEST_SYSTEM_PROMPT)]
    );
}
