//! Mock infrastructure for testing external services
//!
//! This module provides a mock OpenAI API server. It supports the models
//! listing used for key validation and chat completions in both streaming
//! and blocking form, with success and failure scenarios.

pub mod openai;

pub use openai::*;
