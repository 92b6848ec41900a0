//! Key validation tests
//!
//! Drive the validator held by `AppState` against the mock models endpoint.

use keychat::validator::BodyPreview;
use keychat::{AppState, KeyStatus};
use pretty_assertions::assert_eq;

use crate::common::{constants, test_config};
use crate::mocks::MockOpenAI;

fn state_for(mock: &MockOpenAI) -> AppState {
    AppState::new(test_config(&mock.uri()), None).expect("state builds")
}

#[tokio::test]
async fn test_accepted_key_is_valid() {
    let mock = MockOpenAI::start().await;
    mock.mock_models_for_key(constants::TEST_API_KEY).await;

    let result = state_for(&mock)
        .validator
        .validate(constants::TEST_API_KEY)
        .await;

    assert!(result.ok);
    assert_eq!(result.status, KeyStatus::Valid);
    assert_eq!(result.status_code, Some(200));
    match result.body_preview {
        Some(BodyPreview::Json(body)) => assert_eq!(body["object"], "list"),
        other => panic!("expected JSON preview, got {:?}", other),
    }
}

#[tokio::test]
async fn test_revoked_key_is_unauthorized() {
    let mock = MockOpenAI::start().await;
    mock.mock_models_for_key(constants::TEST_API_KEY).await;

    let result = state_for(&mock)
        .validator
        .validate(constants::REVOKED_API_KEY)
        .await;

    assert!(!result.ok);
    assert_eq!(result.status, KeyStatus::Unauthorized);
    assert_eq!(
        result.label(),
        "Unauthorized (HTTP 401): The API key is invalid or revoked."
    );
    match result.body_preview {
        Some(BodyPreview::Json(body)) => {
            assert_eq!(body["error"]["code"], "invalid_api_key")
        }
        other => panic!("expected JSON preview, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ok_only_for_http_200() {
    for (status, expected) in [
        (403, KeyStatus::Forbidden),
        (429, KeyStatus::RateLimited),
        (500, KeyStatus::RequestFailed),
        (204, KeyStatus::RequestFailed),
    ] {
        let mock = MockOpenAI::start().await;
        mock.mock_models_status(status, "").await;

        let result = state_for(&mock).validator.validate("sk-any").await;

        assert!(!result.ok, "HTTP {} must not be ok", status);
        assert_eq!(result.status, expected);
        assert_eq!(result.status_code, Some(status));
    }
}

#[tokio::test]
async fn test_labels_are_deterministic() {
    let mock = MockOpenAI::start().await;
    mock.mock_models_status(429, "slow down").await;
    let state = state_for(&mock);

    let first = state.validator.validate("sk-any").await;
    let second = state.validator.validate("sk-any").await;

    assert_eq!(first.label(), second.label());
    assert_eq!(first.body_preview, second.body_preview);
    assert_eq!(mock.models_requests().await, 2);
}

#[tokio::test]
async fn test_blank_key_makes_no_request() {
    let mock = MockOpenAI::start().await;
    mock.mock_models_for_key(constants::TEST_API_KEY).await;

    let result = state_for(&mock).validator.validate("").await;

    assert_eq!(result.status, KeyStatus::MissingCredential);
    assert_eq!(result.status_code, None);
    assert_eq!(mock.models_requests().await, 0);
}
