//! Outbound API request type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::HttpMethod;
use crate::error::{DomainError, DomainResult};

/// A call against the backend API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    /// Query parameters, in order.
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// Extra headers. `Authorization` is managed by the pipeline.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON body, if any.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a request with no body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    /// Creates a PUT request with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Put, path).with_body(body)
    }

    /// Creates a PATCH request with a JSON body.
    #[must_use]
    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Patch, path).with_body(body)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Checks the path and header names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for empty or absolute paths and
    /// `InvalidHeaderName` for names that are not HTTP tokens.
    pub fn validate(&self) -> DomainResult<()> {
        let path = self.path.trim();
        if path.is_empty() || !path.starts_with('/') || path.starts_with("//") {
            return Err(DomainError::InvalidPath(self.path.clone()));
        }

        for name in self.headers.keys() {
            let is_token = !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
            if !is_token {
                return Err(DomainError::InvalidHeaderName(name.clone()));
            }
        }

        Ok(())
    }

    /// Resolves the absolute URL against the API base.
    ///
    /// The base path is preserved: `http://host/api` + `/buses` yields
    /// `http://host/api/buses`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the joined URL does not parse.
    pub fn url(&self, base: &Url) -> DomainResult<Url> {
        self.validate()?;

        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), self.path.trim());
        let mut url = Url::parse(&joined).map_err(|e| DomainError::InvalidUrl(format!("{e}: {joined}")))?;

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://fleet.example.com/api/").unwrap()
    }

    #[test]
    fn test_url_keeps_base_path() {
        let request = ApiRequest::get("/buses").with_query("page", "2");
        assert_eq!(
            request.url(&base()).unwrap().as_str(),
            "https://fleet.example.com/api/buses?page=2"
        );
    }

    #[test]
    fn test_rejects_relative_and_absolute_paths() {
        assert!(matches!(
            ApiRequest::get("buses").validate(),
            Err(DomainError::InvalidPath(_))
        ));
        assert!(matches!(
            ApiRequest::get("//evil.example.com/x").validate(),
            Err(DomainError::InvalidPath(_))
        ));
        assert!(ApiRequest::get("").url(&base()).is_err());
    }

    #[test]
    fn test_rejects_bad_header_names() {
        let request = ApiRequest::get("/drivers").with_header("X Trace", "1");
        assert!(matches!(
            request.validate(),
            Err(DomainError::InvalidHeaderName(_))
        ));
        assert!(ApiRequest::get("/drivers")
            .with_header("X-Trace-Id", "1")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_body_constructors() {
        let request = ApiRequest::post("/coupons", serde_json::json!({"code": "SPRING"}));
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.body, Some(serde_json::json!({"code": "SPRING"})));
        assert!(ApiRequest::delete("/coupons/1").body.is_none());
    }
}
