//! HTTP transport seam.
//!
//! The session never talks to the network directly; it goes through the
//! [`HttpClient`] trait so tests can substitute a scripted transport the same
//! way production code uses the blocking `reqwest` implementation. Responses
//! are plain owned values exposing status, multi-valued headers, cookies
//! parsed from `Set-Cookie`, and the raw body.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::config::SessionConfig;

/// Request methods the session can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Parse a form `method` attribute; unknown verbs fall back to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by the transport.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("could not construct the HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("invalid request URI [{uri}]")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{method} {uri} failed")]
    Transport {
        method: Method,
        uri: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0}")]
    Unsupported(&'static str),
}

/// The response of a completed request.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of a header, in response order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// All headers grouped by name, preserving the casing they arrived with.
    pub fn headers(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in &self.headers {
            grouped.entry(name.clone()).or_default().push(value.clone());
        }
        grouped
    }

    /// Cookies set by this response, parsed from its `Set-Cookie` headers.
    ///
    /// Attributes (`Path`, `Expires`, ...) are dropped; only the name/value
    /// pair survives.
    pub fn cookies(&self) -> BTreeMap<String, String> {
        let mut cookies = BTreeMap::new();
        for raw in self.header_values("set-cookie") {
            let pair = raw.split(';').next().unwrap_or(raw);
            if let Some((name, value)) = pair.split_once('=') {
                cookies.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
        cookies
    }

    /// Whether the body should be parsed as an HTML document.
    ///
    /// A missing `Content-Type` is treated as HTML, matching the forgiving
    /// behaviour of the transports this crate fronts.
    pub fn is_html(&self) -> bool {
        match self.header("content-type") {
            None => true,
            Some(value) => {
                let value = value.to_ascii_lowercase();
                value.contains("text/html") || value.contains("application/xhtml")
            }
        }
    }
}

/// Blocking transport capability consumed by the session.
///
/// `parameters` carry form/query data; `body` is a raw payload that, when
/// present, takes the request body over form-encoding the parameters.
pub trait HttpClient {
    fn request(
        &self,
        method: Method,
        uri: &str,
        parameters: &[(String, String)],
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> Result<Response, HttpError>;
}

/// Default transport backed by `reqwest::blocking`.
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Build a client honouring the session's user agent, redirect policy,
    /// and timeout.
    pub fn new(config: &SessionConfig) -> Result<Self, HttpError> {
        let redirects = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirects)
            .cookie_store(true);

        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(Self {
            inner: builder.build().map_err(HttpError::Build)?,
        })
    }
}

impl HttpClient for ReqwestClient {
    fn request(
        &self,
        method: Method,
        uri: &str,
        parameters: &[(String, String)],
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> Result<Response, HttpError> {
        let parsed = url::Url::parse(uri).map_err(|source| HttpError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;

        let reqwest_method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self.inner.request(reqwest_method, parsed);

        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        // GET carries parameters in the query string; other verbs form-encode
        // them unless an explicit raw body displaces them to the query.
        request = match (method, body) {
            (Method::Get, _) => request.query(parameters),
            (_, Some(raw)) => request.query(parameters).body(raw.to_string()),
            (_, None) => request.form(parameters),
        };

        let response = request.send().map_err(|source| HttpError::Transport {
            method,
            uri: uri.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().map_err(|source| HttpError::Transport {
            method,
            uri: uri.to_string(),
            source,
        })?;

        Ok(Response::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_headers(headers: Vec<(&str, &str)>) -> Response {
        Response::new(
            200,
            headers
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            "<html></html>",
        )
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = response_with_headers(vec![("E-Tag", "an-etag-hash")]);
        assert_eq!(response.header("e-tag"), Some("an-etag-hash"));
        assert_eq!(response.header("E-TAG"), Some("an-etag-hash"));
        assert_eq!(response.header("Cache-Control"), None);
    }

    #[test]
    fn headers_group_repeated_names() {
        let response =
            response_with_headers(vec![("Vary", "Accept"), ("Vary", "Accept-Encoding")]);
        let grouped = response.headers();
        assert_eq!(
            grouped.get("Vary"),
            Some(&vec!["Accept".to_string(), "Accept-Encoding".to_string()])
        );
    }

    #[test]
    fn cookies_are_parsed_from_set_cookie() {
        let response = response_with_headers(vec![(
            "Set-Cookie",
            "foo=bar; Path=/; Expires=Fri, 15 Jan 2021 22:00:00 GMT; Secure; HttpOnly",
        )]);
        let cookies = response.cookies();
        assert_eq!(cookies.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(cookies.len(), 1);
    }

    #[test]
    fn multiple_set_cookie_headers_all_land() {
        let response = response_with_headers(vec![
            ("Set-Cookie", "foo=bar; Path=/"),
            ("Set-Cookie", "baz=qux"),
        ]);
        let cookies = response.cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("baz").map(String::as_str), Some("qux"));
    }

    #[test]
    fn missing_content_type_is_treated_as_html() {
        assert!(response_with_headers(vec![]).is_html());
        assert!(response_with_headers(vec![("Content-Type", "text/html; charset=utf-8")]).is_html());
        assert!(!response_with_headers(vec![("Content-Type", "application/json")]).is_html());
    }

    #[test]
    fn form_method_parsing_ignores_case_and_unknown_verbs() {
        assert_eq!(Method::parse("post"), Some(Method::Post));
        assert_eq!(Method::parse(" DELETE "), Some(Method::Delete));
        assert_eq!(Method::parse("dialog"), None);
    }
}
