//! Server response envelope handling.
//!
//! Mutation endpoints answer `{success, data, message, errors}`; most list
//! endpoints answer a bare array or a paginated object. Both shapes are folded
//! into one `Value` here so nothing above the transport sees the difference.

use std::ops::RangeInclusive;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::error::{field_errors_from_value, DataError, FieldErrors};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Wrapped {
        success: bool,
        /// `None` when the key is absent; `Some(Value::Null)` when sent as null.
        data: Option<Value>,
        message: Option<String>,
        errors: Option<FieldErrors>,
        body: Value,
    },
    Bare(Value),
}

impl Envelope {
    /// An object is treated as wrapped only when it carries a boolean `success`.
    pub fn classify(body: Value) -> Self {
        let success = match body.get("success").and_then(Value::as_bool) {
            Some(success) => success,
            None => return Self::Bare(body),
        };

        let data = body.get("data").cloned();
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        let errors = body.get("errors").and_then(field_errors_from_value);

        Self::Wrapped {
            success,
            data,
            message,
            errors,
            body,
        }
    }

    pub fn into_data(self) -> Result<Value, DataError> {
        match self {
            Self::Bare(value) => Ok(value),
            Self::Wrapped {
                success: true,
                data,
                body,
                ..
            } => Ok(data.unwrap_or(body)),
            Self::Wrapped {
                success: false,
                message,
                errors,
                body,
                ..
            } => Err(DataError::Envelope {
                message: message.unwrap_or_else(|| "Request failed".to_string()),
                errors,
                body,
            }),
        }
    }
}

/// Normalize a parsed 2xx body.
pub fn normalize(body: Value) -> Result<Value, DataError> {
    Envelope::classify(body).into_data()
}

/// Pagination metadata returned alongside paginated list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub current_page: Option<u64>,
    #[serde(default)]
    pub last_page: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl PageMeta {
    /// Page numbers after the one this response carried. Empty when the
    /// server didn't say how many pages there are.
    pub fn remaining_pages(&self) -> RangeInclusive<u64> {
        let current = self.current_page.unwrap_or(1);
        match self.last_page {
            Some(last) => current + 1..=last,
            None => 1..=0,
        }
    }
}

/// A list response in whichever shape the endpoint chose.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPayload<T> {
    pub items: Vec<T>,
    pub meta: Option<PageMeta>,
}

impl<T: DeserializeOwned> ListPayload<T> {
    /// Accepts a bare array, `{data: [...], ...meta}` or one more level of
    /// `data` nesting (paginator inside a success envelope).
    pub fn from_value(value: Value) -> Result<Self, DataError> {
        let mut current = value;
        let mut meta = None;
        for _ in 0..2 {
            let inner = match &current {
                Value::Object(obj) if obj.contains_key("data") => {
                    if meta.is_none() && obj.contains_key("current_page") {
                        meta = serde_json::from_value::<PageMeta>(current.clone()).ok();
                    }
                    obj.get("data").cloned().unwrap_or(Value::Null)
                }
                _ => break,
            };
            current = inner;
        }

        match current {
            Value::Array(items) => {
                let items = items
                    .into_iter()
                    .map(serde_json::from_value::<T>)
                    .collect::<Result<Vec<T>, _>>()
                    .map_err(|e| DataError::parse(format!("Invalid list item: {}", e)))?;
                Ok(Self { items, meta })
            }
            Value::Null => Ok(Self {
                items: Vec::new(),
                meta,
            }),
            other => Err(DataError::parse(format!(
                "Expected a list, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
