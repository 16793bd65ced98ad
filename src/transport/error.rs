use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// Field name -> validation messages, as sent in the envelope `errors` map.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Classified data-layer error. Every transport and store operation returns
/// one of these so call sites can pick a display strategy without string
/// matching.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// No response was received (DNS, connection refused, reset, timeout).
    Network { message: String, timed_out: bool },
    /// The body was not valid JSON, or not the shape the caller asked for.
    Parse { message: String },
    /// Non-2xx response.
    HttpStatus {
        status: u16,
        message: String,
        errors: Option<FieldErrors>,
        body: Option<Value>,
    },
    /// 2xx response whose envelope said `success: false`.
    Envelope {
        message: String,
        errors: Option<FieldErrors>,
        body: Value,
    },
}

/// Coarse display class for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataErrorKind {
    Network,
    Parse,
    /// 404.
    NotFound,
    /// 403, also used by the API for rate limiting.
    Forbidden,
    /// 401.
    Unauthorized,
    /// 422 or any response carrying field errors.
    Validation,
    /// 5xx.
    Server,
    /// Application-level rejection inside a 2xx envelope.
    Rejected,
    Other,
}

impl DataError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Build an HTTP status error from the raw response body. The body is
    /// parsed as JSON when possible; `message` and `errors` are lifted from it.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let parsed: Option<Value> = if body.is_empty() {
            None
        } else {
            serde_json::from_slice(body).ok()
        };

        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Server error {}", status));

        let errors = parsed
            .as_ref()
            .and_then(|v| v.get("errors"))
            .and_then(field_errors_from_value);

        Self::HttpStatus {
            status,
            message,
            errors,
            body: parsed,
        }
    }

    pub fn kind(&self) -> DataErrorKind {
        match self {
            Self::Network { .. } => DataErrorKind::Network,
            Self::Parse { .. } => DataErrorKind::Parse,
            Self::Envelope { .. } => DataErrorKind::Rejected,
            Self::HttpStatus { status, errors, .. } => match status {
                401 => DataErrorKind::Unauthorized,
                403 => DataErrorKind::Forbidden,
                404 => DataErrorKind::NotFound,
                422 => DataErrorKind::Validation,
                500..=599 => DataErrorKind::Server,
                _ if errors.is_some() => DataErrorKind::Validation,
                _ => DataErrorKind::Other,
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network { message, .. }
            | Self::Parse { message }
            | Self::HttpStatus { message, .. }
            | Self::Envelope { message, .. } => message,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::HttpStatus { errors, .. } | Self::Envelope { errors, .. } => errors.as_ref(),
            _ => None,
        }
    }

    /// User-facing summary for inline banners and notifications.
    pub fn user_message(&self) -> String {
        match self.kind() {
            DataErrorKind::Network => {
                "Cannot reach the server. Check your connection and try again.".to_string()
            }
            DataErrorKind::Parse => format!("Unexpected response from server: {}", self.message()),
            DataErrorKind::NotFound => "The requested item was not found.".to_string(),
            DataErrorKind::Forbidden => {
                "Access denied or too many requests. Wait a moment, then check your permissions."
                    .to_string()
            }
            DataErrorKind::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            DataErrorKind::Validation => match self.field_errors() {
                Some(errors) if !errors.is_empty() => {
                    let first = errors
                        .iter()
                        .find_map(|(field, msgs)| msgs.first().map(|m| format!("{}: {}", field, m)));
                    first.unwrap_or_else(|| self.message().to_string())
                }
                _ => self.message().to_string(),
            },
            DataErrorKind::Server => "The server had a problem. Please try again.".to_string(),
            DataErrorKind::Rejected | DataErrorKind::Other => self.message().to_string(),
        }
    }

    /// Whether a fresh user-initiated attempt of the same call could succeed.
    /// The data layer itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            DataErrorKind::Network | DataErrorKind::Server | DataErrorKind::Forbidden
        )
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { message, timed_out } => {
                if *timed_out {
                    write!(f, "Network error (timeout): {}", message)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Parse { message } => write!(f, "Parse error: {}", message),
            Self::HttpStatus {
                status, message, ..
            } => write!(f, "HTTP error ({}): {}", status, message),
            Self::Envelope { message, .. } => write!(f, "Request rejected: {}", message),
        }
    }
}

impl std::error::Error for DataError {}

/// Lenient parse of an `errors` map. Accepts `{field: [msg, ...]}` and
/// `{field: msg}`; anything else yields `None`.
pub(crate) fn field_errors_from_value(value: &Value) -> Option<FieldErrors> {
    let obj = value.as_object()?;
    let mut out = FieldErrors::new();
    for (field, msgs) in obj {
        let list: Vec<String> = match msgs {
            Value::Array(items) => items
                .iter()
                .map(|m| match m.as_str() {
                    Some(s) => s.to_string(),
                    None => m.to_string(),
                })
                .collect(),
            Value::String(s) => vec![s.clone()],
            Value::Null => continue,
            other => vec![other.to_string()],
        };
        out.insert(field.clone(), list);
    }
    Some(out)
}
