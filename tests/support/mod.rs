//! Shared scripted transport and page fixtures for the integration suites.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use pagewalk::config::SessionConfig;
use pagewalk::http::{HttpClient, HttpError, Method, Response};
use pagewalk::session::PageSession;

/// One request as the session handed it to the transport.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: String,
    pub parameters: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RecordedRequest {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Transport double replaying canned responses and recording every request.
#[derive(Debug)]
pub struct MockHttpClient {
    responses: RefCell<VecDeque<Response>>,
    history: RefCell<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    pub fn with_responses(responses: Vec<Response>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            history: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bodies(bodies: &[&str]) -> Self {
        Self::with_responses(
            bodies
                .iter()
                .map(|body| Response::new(200, Vec::new(), *body))
                .collect(),
        )
    }

    pub fn history(&self) -> Vec<RecordedRequest> {
        self.history.borrow().clone()
    }
}

impl HttpClient for MockHttpClient {
    fn request(
        &self,
        method: Method,
        uri: &str,
        parameters: &[(String, String)],
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> Result<Response, HttpError> {
        self.history.borrow_mut().push(RecordedRequest {
            method,
            uri: uri.to_string(),
            parameters: parameters.to_vec(),
            headers: headers.to_vec(),
            body: body.map(str::to_string),
        });

        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or(HttpError::Unsupported("no scripted response left"))
    }
}

/// A session over a transport scripted with plain HTML bodies.
pub fn session_with_bodies(bodies: &[&str]) -> PageSession<MockHttpClient> {
    PageSession::new(SessionConfig::default(), MockHttpClient::with_bodies(bodies))
}

/// A session over a transport scripted with full responses.
pub fn session_with_responses(responses: Vec<Response>) -> PageSession<MockHttpClient> {
    PageSession::new(
        SessionConfig::default(),
        MockHttpClient::with_responses(responses),
    )
}

pub const WELCOME_HTML: &str = r#"<html>
<body>
    <h1>Hello world!</h1>
    <p align="center">Welcome to the site</p>
    <div id="container">
        <p>Enter your name</p>
        <input type="text" name="name">
    </div>
</body>
</html>"#;

pub const FORM_HTML: &str = r#"<html>
<body>
    <form method="post" action="http://example.com/login">
        <input type="text" name="name" value="Bob Smith">
        <input type="checkbox" name="confirm">
        <input type="checkbox" name="newsletter" checked>
        <select name="country">
            <option value="uk">United Kingdom</option>
            <option value="fr" selected>France</option>
        </select>
        <select name="season">
            <option>Winter</option>
            <option selected>Spring</option>
            <option>Summer</option>
        </select>
        <select name="food">
            <optgroup label="Protein">
                <option value="Egg" selected>Egg</option>
                <option value="Tofu">Tofu</option>
            </optgroup>
            <optgroup label="Vegetables">
                <option value="Onions">Onions</option>
            </optgroup>
        </select>
        <select name="tags[]" id="tags" multiple>
            <option value="rust" selected>Rust</option>
            <option value="wasm">WASM</option>
            <option value="html" selected>HTML</option>
        </select>
        <input type="radio" name="sex" value="m" checked>
        <input type="radio" name="sex" value="f">
        <input type="radio" name="colour" value="red">
        <input type="radio" name="colour" value="blue">
        <input type="submit" value="Login">
    </form>
    <input type="text" name="comment">
</body>
</html>"#;

pub const LINK_HTML: &str = r#"<html>
<body>
    <a href="done.html" id="continue" name="continue">Click here</a>
</body>
</html>"#;

pub const LIST_HTML: &str = r#"<html>
<body>
    <ul id="container">
        <li>Foo</li>
        <li>Bar</li>
        <li>Baz</li>
        <li>Qux</li>
    </ul>
</body>
</html>"#;

pub const DONE_HTML: &str = r#"<html>
<body>
    <h1>All done</h1>
</body>
</html>"#;
