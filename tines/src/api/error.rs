use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub(crate) const ERR_EMPTY_API_KEY: &str = "API Token must not be empty";
pub(crate) const ERR_EMPTY_TENANT: &str = "Tines Tenant must not be empty";
pub(crate) const ERR_DO_REQUEST: &str = "error while attempting to make the HTTP request";
pub(crate) const ERR_UNMARSHAL: &str = "error unmarshalling the JSON response";
pub(crate) const ERR_READ_BODY: &str = "error reading the HTTP response body bytes";
pub(crate) const ERR_PARSE: &str = "error parsing the input";

/// Broad category of a failed API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Request,
    Authentication,
    Authorization,
    NotFound,
    RateLimit,
    Server,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorType::Request => "request",
            ErrorType::Authentication => "authentication",
            ErrorType::Authorization => "authorization",
            ErrorType::NotFound => "not_found",
            ErrorType::RateLimit => "rate_limit",
            ErrorType::Server => "server",
        };
        f.write_str(s)
    }
}

/// A single message from a Tines error body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.errors))]
pub struct TinesError {
    pub error_type: ErrorType,
    pub status_code: Option<u16>,
    pub errors: Vec<ErrorMessage>,
}

fn render(errors: &[ErrorMessage]) -> String {
    let messages: Vec<String> = errors
        .iter()
        .map(|e| format!("{}: {}", e.message, e.details))
        .collect();
    format!("{} error(s) occurred: {}", errors.len(), messages.join(", "))
}

impl TinesError {
    pub fn new(error_type: ErrorType, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error_type,
            status_code: None,
            errors: vec![ErrorMessage::new(message, details)],
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ErrorMessage>,
}

/// Error bodies differ between endpoints. Try the `{"errors": [...]}` envelope,
/// then a bare array, and finally keep the raw body as the details.
pub(crate) fn parse_error_messages(body: &[u8]) -> Vec<ErrorMessage> {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        return envelope.errors;
    }
    if let Ok(messages) = serde_json::from_slice::<Vec<ErrorMessage>>(body) {
        return messages;
    }
    vec![ErrorMessage::new(
        "message",
        String::from_utf8_lossy(body).into_owned(),
    )]
}
