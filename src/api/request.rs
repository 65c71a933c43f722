//! Request/Response Contract
//!
//! Every call to the reporting API is an `ApiRequest` handed to an
//! `ApiTransport`. The transport never acts on an authorization failure; it
//! reports it as `RequestOutcome::AuthorizationFailure` and the session
//! manager decides what happens.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::config::mask_secret;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

/// Transport-agnostic description of one API call
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Bearer credential, attached by the session manager
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach (or replace) the bearer credential
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.bearer.as_ref().map(|t| format!("Bearer {}", t))
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("bearer", &self.bearer.as_deref().map(mask_secret))
            .finish()
    }
}

/// What came back from one request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    Ok(T),
    /// 401-class response: the credential is missing, invalid or expired
    AuthorizationFailure { detail: Option<String> },
    Error(ClientError),
}

/// Sends requests to the reporting API
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> RequestOutcome<Value>;
}

/// Pull a human-readable message out of an error body
pub fn error_detail(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => {
            for key in ["detail", "error", "message", "non_field_errors"] {
                if let Some(value) = map.get(key)
                    && let Some(text) = error_detail(value)
                {
                    return Some(text);
                }
            }
            // Field errors: {"username": ["already exists"]}
            map.iter().find_map(|(field, value)| {
                error_detail(value).map(|text| format!("{}: {}", field, text))
            })
        }
        Value::Array(items) => items.iter().find_map(error_detail),
        _ => None,
    }
}

/// Map an HTTP status and decoded body onto the outcome taxonomy
pub fn classify_response(status: u16, body: Value) -> RequestOutcome<Value> {
    if (200..300).contains(&status) {
        return RequestOutcome::Ok(body);
    }

    let detail = error_detail(&body);
    let message = detail
        .clone()
        .unwrap_or_else(|| format!("request failed with status {}", status));

    match status {
        401 => RequestOutcome::AuthorizationFailure { detail },
        400 | 422 => RequestOutcome::Error(ClientError::Validation(message)),
        404 => RequestOutcome::Error(ClientError::NotFound(message)),
        409 => RequestOutcome::Error(ClientError::Conflict(message)),
        _ => RequestOutcome::Error(ClientError::Server { status, message }),
    }
}
