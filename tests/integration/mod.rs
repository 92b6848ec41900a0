//! Integration tests for Keychat
//!
//! These tests drive the library through `AppState` against a wiremock
//! server standing in for the OpenAI API.

mod chat_session;
mod validator;
