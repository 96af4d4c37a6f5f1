//! Suggestion endpoint client.
//!
//! The wire contract is a single JSON POST: `{ "code": <source> }` in,
//! `{ "suggestion": <text> }` out. An absent or null `suggestion` field is a
//! valid empty reply, not an error; non-2xx statuses and malformed bodies
//! surface as `Err` and are downgraded to `NoSuggestion` by the caller. No
//! auth, no retry, no timeout — one fire-and-forget call per debounce firing.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::SuggestionRequest;

/// Object-safe seam for the suggestion backend. Tests substitute mock
/// clients with controllable completion order.
#[async_trait]
pub trait SuggestClient: Send + Sync + 'static {
    /// Fetch a suggestion for the request's source text. `Ok(String::new())`
    /// means the backend had nothing to offer.
    async fn fetch(&self, request: &SuggestionRequest) -> Result<String>;
}

#[derive(Serialize)]
struct SuggestBody<'a> {
    code: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SuggestReply {
    #[serde(default)]
    pub(crate) suggestion: Option<String>,
}

/// HTTP implementation over reqwest.
#[derive(Debug, Clone)]
pub struct HttpSuggestClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSuggestClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SuggestClient for HttpSuggestClient {
    async fn fetch(&self, request: &SuggestionRequest) -> Result<String> {
        let reply: SuggestReply = self
            .http
            .post(&self.endpoint)
            .json(&SuggestBody {
                code: &request.source_text,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.suggestion.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_with_suggestion_field() {
        let reply: SuggestReply =
            serde_json::from_str(r#"{"suggestion": "n add(a,b){return a+b}"}"#).unwrap();
        assert_eq!(reply.suggestion.as_deref(), Some("n add(a,b){return a+b}"));
    }

    #[test]
    fn reply_with_absent_field_is_empty() {
        let reply: SuggestReply = serde_json::from_str("{}").unwrap();
        assert!(reply.suggestion.is_none());
        assert_eq!(reply.suggestion.unwrap_or_default(), "");
    }

    #[test]
    fn reply_with_null_field_is_empty() {
        let reply: SuggestReply = serde_json::from_str(r#"{"suggestion": null}"#).unwrap();
        assert!(reply.suggestion.is_none());
    }

    #[test]
    fn reply_with_wrong_type_is_an_error() {
        assert!(serde_json::from_str::<SuggestReply>(r#"{"suggestion": 42}"#).is_err());
    }

    #[test]
    fn request_body_shape() {
        let body = SuggestBody { code: "functio" };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"code":"functio"}"#);
    }
}
