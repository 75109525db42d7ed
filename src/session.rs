//! High-level page session facade.
//!
//! A [`PageSession`] owns the transport, the parsed document of the last
//! response, the scope stack, and the staging buffer, and exposes the whole
//! fluent surface: navigation, form interaction and submission, link
//! clicking, scoped execution, and `see*`/`dont_see*` assertions.
//!
//! The session is reusable for any number of sequential navigations. Every
//! successful request replaces the document wholesale and unconditionally
//! clears the scope stack and any staged inputs — nothing typed on one page
//! survives onto the next.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::SessionConfig;
use crate::constraints::{
    AttrRequirement, Constraint, ConstraintError, HasElement, HasInElement, HasLink, HasSource,
    HasText, HasValue, IsChecked, IsSelected, Negate, PageView,
};
use crate::document::{Document, Form, QueryError};
use crate::http::{HttpClient, HttpError, Method, ReqwestClient, Response};
use crate::inputs::{FieldValue, InputStagingBuffer};
use crate::logging::SessionLogger;
use crate::metrics::{self, SessionMetrics};
use crate::scope::ScopeStack;
use crate::selector::{self, normalize_key, FieldNotFound, ANCHOR_KINDS};

/// Which form a submission should target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTarget {
    /// The form owning the submit control with this visible label.
    Button(String),
    /// The first form in the current scope.
    SoleForm,
}

impl From<&str> for SubmitTarget {
    fn from(label: &str) -> Self {
        SubmitTarget::Button(label.to_string())
    }
}

impl From<String> for SubmitTarget {
    fn from(label: String) -> Self {
        SubmitTarget::Button(label)
    }
}

/// Failures surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no page has been visited yet")]
    NoPage,
    #[error(transparent)]
    MissingField(#[from] FieldNotFound),
    #[error("could not find a form that has submit button{}", .button.as_deref().map(|b| format!(" [{b}]")).unwrap_or_default())]
    FormNotFound { button: Option<String> },
    #[error("could not find a link with a body, name, or ID attribute of [{name}]")]
    LinkNotFound { name: String },
    #[error("cannot inspect elements of a response without a parsed document")]
    NotEvaluable,
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("could not resolve URI [{uri}] against the current page")]
    UriResolution {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid match pattern")]
    Pattern(#[from] regex::Error),
}

impl From<ConstraintError> for SessionError {
    fn from(err: ConstraintError) -> Self {
        match err {
            ConstraintError::NotEvaluable => SessionError::NotEvaluable,
            ConstraintError::MissingField(missing) => SessionError::MissingField(missing),
            ConstraintError::Query(query) => SessionError::Query(query),
            ConstraintError::Pattern(pattern) => SessionError::Pattern(pattern),
        }
    }
}

/// Resolve the document lookups run against: innermost scope, else the page.
fn scoped_document<'a>(
    scopes: &'a ScopeStack,
    document: &'a Option<Document>,
) -> Result<&'a Document, SessionError> {
    if let Some(view) = scopes.current() {
        return Ok(view);
    }
    document.as_ref().ok_or(SessionError::NoPage)
}

/// A scripted browser without the browser: one live document, one in-flight
/// request at a time, fluent interaction and assertion calls in between.
#[derive(Debug)]
pub struct PageSession<C: HttpClient> {
    client: C,
    config: SessionConfig,
    logger: SessionLogger,
    metrics: SessionMetrics,
    response: Option<Response>,
    document: Option<Document>,
    current_url: Option<Url>,
    scopes: ScopeStack,
    inputs: InputStagingBuffer,
    cookies: BTreeMap<String, String>,
}

impl PageSession<ReqwestClient> {
    /// Construct a session backed by the default blocking transport.
    pub fn with_default_client(config: SessionConfig) -> Result<Self, HttpError> {
        let client = ReqwestClient::new(&config)?;
        Ok(Self::new(config, client))
    }
}

impl<C: HttpClient> PageSession<C> {
    pub fn new(config: SessionConfig, client: C) -> Self {
        let mut logger = SessionLogger::new(config.verbose);
        if let Some(callback) = config.logger.clone() {
            logger.set_external_logger(Some(callback));
        }

        Self {
            client,
            config,
            logger,
            metrics: SessionMetrics::default(),
            response: None,
            document: None,
            current_url: None,
            scopes: ScopeStack::new(),
            inputs: InputStagingBuffer::new(),
            cookies: BTreeMap::new(),
        }
    }

    /// Access the underlying transport for advanced operations.
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// The response of the most recent request, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// The absolute URL of the current page, once one has been visited.
    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    // ----- navigation -------------------------------------------------

    /// Visit the given URI with a GET request.
    pub fn visit(&mut self, uri: &str) -> Result<&mut Self, SessionError> {
        self.perform_request(Method::Get, uri, &[], &[], None)
    }

    /// Visit the given URI with a GET request and explicit headers.
    pub fn get(&mut self, uri: &str, headers: &[(&str, &str)]) -> Result<&mut Self, SessionError> {
        self.perform_request(Method::Get, uri, &[], &own_pairs(headers), None)
    }

    pub fn post(
        &mut self,
        uri: &str,
        parameters: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<&mut Self, SessionError> {
        self.perform_request(
            Method::Post,
            uri,
            &own_pairs(parameters),
            &own_pairs(headers),
            body,
        )
    }

    pub fn put(
        &mut self,
        uri: &str,
        parameters: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<&mut Self, SessionError> {
        self.perform_request(
            Method::Put,
            uri,
            &own_pairs(parameters),
            &own_pairs(headers),
            body,
        )
    }

    pub fn patch(
        &mut self,
        uri: &str,
        parameters: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<&mut Self, SessionError> {
        self.perform_request(
            Method::Patch,
            uri,
            &own_pairs(parameters),
            &own_pairs(headers),
            body,
        )
    }

    pub fn delete(
        &mut self,
        uri: &str,
        parameters: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<&mut Self, SessionError> {
        self.perform_request(
            Method::Delete,
            uri,
            &own_pairs(parameters),
            &own_pairs(headers),
            body,
        )
    }

    fn perform_request(
        &mut self,
        method: Method,
        uri: &str,
        parameters: &[(String, String)],
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> Result<&mut Self, SessionError> {
        let target = self.resolve_uri(uri)?;
        self.logger
            .info(format!("{method} {target}"), Some("request"), None);

        let timer = metrics::start_transport_timer();
        let response = self
            .client
            .request(method, &target, parameters, headers, body)?;
        self.metrics
            .record_request(method, metrics::transport_time_ms(timer));

        self.logger.debug(
            format!("{} responded with status {}", target, response.status()),
            Some("request"),
            None,
        );

        for (name, value) in response.cookies() {
            self.cookies.insert(name, value);
        }

        self.document = response.is_html().then(|| Document::parse(response.body()));
        self.current_url = Url::parse(&target).ok();
        self.response = Some(response);
        self.scopes.reset();
        self.inputs.clear();

        Ok(self)
    }

    /// Turn a possibly-relative URI into the absolute form the transport
    /// needs, joining against the current page or the configured base URL.
    fn resolve_uri(&self, uri: &str) -> Result<String, SessionError> {
        if let Ok(absolute) = Url::parse(uri) {
            return Ok(absolute.to_string());
        }

        let base = self
            .current_url
            .clone()
            .or_else(|| self.config.base_url.as_deref().and_then(|b| Url::parse(b).ok()));

        match base {
            Some(base) => base
                .join(uri)
                .map(|joined| joined.to_string())
                .map_err(|source| SessionError::UriResolution {
                    uri: uri.to_string(),
                    source,
                }),
            None => Ok(uri.to_string()),
        }
    }

    // ----- interaction ------------------------------------------------

    /// Fill an input field with the given text.
    pub fn type_text(&mut self, text: &str, field: &str) -> Result<&mut Self, SessionError> {
        self.store_input(field, FieldValue::Text(text.to_string()))
    }

    /// Check a checkbox on the page.
    pub fn check(&mut self, field: &str) -> Result<&mut Self, SessionError> {
        self.store_input(field, FieldValue::Flag(true))
    }

    /// Uncheck a checkbox on the page.
    pub fn uncheck(&mut self, field: &str) -> Result<&mut Self, SessionError> {
        self.store_input(field, FieldValue::Flag(false))
    }

    /// Select an option from a drop-down (or a radio in a group).
    pub fn select(&mut self, option: &str, field: &str) -> Result<&mut Self, SessionError> {
        self.store_input(field, FieldValue::Text(option.to_string()))
    }

    fn store_input(&mut self, field: &str, value: FieldValue) -> Result<&mut Self, SessionError> {
        self.inputs
            .stage(scoped_document(&self.scopes, &self.document)?, field, value)?;
        Ok(self)
    }

    /// Submit a form using the button with the given visible text, applying
    /// everything staged so far.
    pub fn press(&mut self, button_text: &str) -> Result<&mut Self, SessionError> {
        self.submit_form(SubmitTarget::Button(button_text.to_string()), &[])
    }

    /// Submit a form with explicit inputs merged over the staged ones.
    ///
    /// Staged values are defaults recorded while walking the page; on key
    /// collision the explicit map given here is the submission's final word.
    pub fn submit_form(
        &mut self,
        target: SubmitTarget,
        inputs: &[(&str, FieldValue)],
    ) -> Result<&mut Self, SessionError> {
        let mut form = self.locate_form(&target)?;

        let mut merged = self.inputs.drain();
        for (key, value) in inputs {
            merged.insert(normalize_key(key), value.clone());
        }

        for (key, value) in &merged {
            match value {
                FieldValue::Text(text) => form.apply_text(key, text),
                FieldValue::Flag(flag) => form.apply_flag(key, *flag),
            }
        }

        let method = form.method();
        let uri = match form.action() {
            Some(action) => action.to_string(),
            None => self
                .current_url
                .as_ref()
                .map(Url::to_string)
                .unwrap_or_default(),
        };
        let parameters = form.parameters();

        self.metrics.record_submission();
        self.logger.info(
            format!("submitting form via {method} {uri}"),
            Some("submit"),
            None,
        );

        self.perform_request(method, &uri, &parameters, &[], None)
    }

    fn locate_form(&self, target: &SubmitTarget) -> Result<Form, SessionError> {
        let view = scoped_document(&self.scopes, &self.document)?;

        match target {
            SubmitTarget::Button(label) => {
                view.select_button_form(label)
                    .ok_or_else(|| SessionError::FormNotFound {
                        button: Some(label.clone()),
                    })
            }
            SubmitTarget::SoleForm => view
                .first_form()
                .ok_or(SessionError::FormNotFound { button: None }),
        }
    }

    /// Click a link with the given body, name, or ID attribute.
    pub fn click(&mut self, name: &str) -> Result<&mut Self, SessionError> {
        let href = {
            let view = scoped_document(&self.scopes, &self.document)?;

            let mut links = view.select_links(name);
            if links.is_empty() {
                links = selector::resolve(view, name, ANCHOR_KINDS).unwrap_or_default();
            }

            let Some(link) = links.first() else {
                return Err(SessionError::LinkNotFound {
                    name: name.to_string(),
                });
            };

            link.attr("href").unwrap_or("").to_string()
        };

        self.metrics.record_click();
        self.logger
            .info(format!("clicking [{name}] -> {href}"), Some("click"), None);

        self.visit(&href)
    }

    // ----- scoping ----------------------------------------------------

    /// Narrow the test content to a specific area of the page for the
    /// duration of the callback.
    ///
    /// The narrowed view is popped on the way out whether or not the
    /// callback succeeds, so a failing assertion can never leak a scope
    /// into subsequent calls.
    pub fn within<F>(&mut self, selector: &str, callback: F) -> Result<&mut Self, SessionError>
    where
        F: FnOnce(&mut Self) -> Result<(), SessionError>,
    {
        let narrowed = scoped_document(&self.scopes, &self.document)?.narrow(selector)?;

        self.scopes.push(narrowed);
        let outcome = callback(self);
        self.scopes.pop();
        outcome?;

        Ok(self)
    }

    /// Hand a one-shot narrowed view to the callback without entering a
    /// scope.
    pub fn filter<F>(&mut self, selector: &str, callback: F) -> Result<&mut Self, SessionError>
    where
        F: FnOnce(&Document),
    {
        let narrowed = scoped_document(&self.scopes, &self.document)?.narrow(selector)?;
        callback(&narrowed);
        Ok(self)
    }

    /// Like [`PageSession::filter`], but returns the callback's value.
    pub fn extract<T, F>(&mut self, selector: &str, callback: F) -> Result<T, SessionError>
    where
        F: FnOnce(&Document) -> T,
    {
        let narrowed = scoped_document(&self.scopes, &self.document)?.narrow(selector)?;
        Ok(callback(&narrowed))
    }

    // ----- page assertions --------------------------------------------

    /// Check that a given string is seen in the page source.
    pub fn see(&self, text: &str) -> Result<bool, SessionError> {
        self.assert_in_page(HasSource::new(text))
    }

    pub fn dont_see(&self, text: &str) -> Result<bool, SessionError> {
        self.assert_not_in_page(HasSource::new(text))
    }

    /// Check that a given string is seen in the page's visible text.
    pub fn see_text(&self, text: &str) -> Result<bool, SessionError> {
        self.assert_in_page(HasText::new(text))
    }

    pub fn dont_see_text(&self, text: &str) -> Result<bool, SessionError> {
        self.assert_not_in_page(HasText::new(text))
    }

    /// Check that an element matching the selector is present, optionally
    /// carrying every required attribute.
    pub fn see_element(
        &self,
        css: &str,
        attributes: &[AttrRequirement],
    ) -> Result<bool, SessionError> {
        self.assert_in_page(HasElement::new(css, attributes.to_vec()))
    }

    pub fn dont_see_element(
        &self,
        css: &str,
        attributes: &[AttrRequirement],
    ) -> Result<bool, SessionError> {
        self.assert_not_in_page(HasElement::new(css, attributes.to_vec()))
    }

    /// Check that a given string is seen inside an element.
    pub fn see_in_element(&self, css: &str, text: &str) -> Result<bool, SessionError> {
        self.assert_in_page(HasInElement::new(css, text))
    }

    pub fn dont_see_in_element(&self, css: &str, text: &str) -> Result<bool, SessionError> {
        self.assert_not_in_page(HasInElement::new(css, text))
    }

    /// Check that a link with the given text (and optionally URL) is seen.
    pub fn see_link(&self, text: &str, url: Option<&str>) -> Result<bool, SessionError> {
        self.assert_in_page(self.link_constraint(text, url))
    }

    pub fn dont_see_link(&self, text: &str, url: Option<&str>) -> Result<bool, SessionError> {
        self.assert_not_in_page(self.link_constraint(text, url))
    }

    /// Check that an input field contains the given value.
    pub fn see_in_field(&self, field: &str, expected: &str) -> Result<bool, SessionError> {
        self.assert_in_page(HasValue::new(field, expected))
    }

    pub fn dont_see_in_field(&self, field: &str, expected: &str) -> Result<bool, SessionError> {
        self.assert_not_in_page(HasValue::new(field, expected))
    }

    /// Check that the expected value is selected in a select or radio group.
    pub fn see_is_selected(&self, field: &str, value: &str) -> Result<bool, SessionError> {
        self.assert_in_page(IsSelected::new(field, value))
    }

    pub fn dont_see_is_selected(&self, field: &str, value: &str) -> Result<bool, SessionError> {
        self.assert_not_in_page(IsSelected::new(field, value))
    }

    /// Check that the given checkbox is checked.
    pub fn see_is_checked(&self, field: &str) -> Result<bool, SessionError> {
        self.assert_in_page(IsChecked::new(field))
    }

    pub fn dont_see_is_checked(&self, field: &str) -> Result<bool, SessionError> {
        self.assert_not_in_page(IsChecked::new(field))
    }

    fn link_constraint(&self, text: &str, url: Option<&str>) -> HasLink {
        let constraint = HasLink::new(text, url.map(str::to_string));

        match self.current_url.clone() {
            Some(base) => constraint.with_absolutizer(Arc::new(move |href| {
                base.join(href)
                    .map(|joined| joined.to_string())
                    .unwrap_or_else(|_| href.to_string())
            })),
            None => constraint,
        }
    }

    fn assert_in_page(&self, constraint: impl Constraint) -> Result<bool, SessionError> {
        Ok(constraint.matches(&self.page_view()?)?)
    }

    fn assert_not_in_page(&self, constraint: impl Constraint) -> Result<bool, SessionError> {
        self.assert_in_page(Negate::new(constraint))
    }

    /// The view assertions evaluate against: the innermost scope, the page
    /// document, or the raw body of a non-HTML response.
    fn page_view(&self) -> Result<PageView<'_>, SessionError> {
        if let Some(view) = self.scopes.current() {
            return Ok(PageView::Dom(view));
        }
        if let Some(document) = &self.document {
            return Ok(PageView::Dom(document));
        }
        match &self.response {
            Some(response) => Ok(PageView::Raw(response.body())),
            None => Err(SessionError::NoPage),
        }
    }

    // ----- response assertions ----------------------------------------

    /// Check that the last response has an OK status code.
    pub fn is_ok(&self) -> bool {
        self.is_status_code(200)
    }

    /// Check that the last response has the given status code.
    pub fn is_status_code(&self, code: u16) -> bool {
        self.response
            .as_ref()
            .map(|response| response.status() == code)
            .unwrap_or(false)
    }

    /// Check for a response header, and its value when one is expected.
    /// Absence is a normal `false`, never an error.
    pub fn has_header(&self, name: &str, value: Option<&str>) -> bool {
        let Some(found) = self.get_header(name) else {
            return false;
        };
        match value {
            Some(expected) => found == expected,
            None => true,
        }
    }

    /// Check for a cookie, and its value when one is expected.
    pub fn has_cookie(&self, name: &str, value: Option<&str>) -> bool {
        let Some(found) = self.cookies.get(name) else {
            return false;
        };
        match value {
            Some(expected) => found == expected,
            None => true,
        }
    }

    /// All headers of the last response, grouped by name.
    pub fn get_headers(&self) -> BTreeMap<String, Vec<String>> {
        self.response
            .as_ref()
            .map(Response::headers)
            .unwrap_or_default()
    }

    /// First value of a header of the last response.
    pub fn get_header(&self, name: &str) -> Option<String> {
        self.response
            .as_ref()
            .and_then(|response| response.header(name))
            .map(str::to_string)
    }

    /// Every cookie accumulated over the session so far.
    pub fn get_cookies(&self) -> BTreeMap<String, String> {
        self.cookies.clone()
    }

    pub fn get_cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }
}

fn own_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedClient {
        responses: RefCell<VecDeque<Response>>,
        requests: RefCell<Vec<(Method, String, Vec<(String, String)>)>>,
    }

    impl ScriptedClient {
        fn new(bodies: Vec<&str>) -> Self {
            Self {
                responses: RefCell::new(
                    bodies
                        .into_iter()
                        .map(|body| Response::new(200, Vec::new(), body))
                        .collect(),
                ),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<(Method, String, Vec<(String, String)>)> {
            self.requests.borrow().clone()
        }
    }

    impl HttpClient for ScriptedClient {
        fn request(
            &self,
            method: Method,
            uri: &str,
            parameters: &[(String, String)],
            _headers: &[(String, String)],
            _body: Option<&str>,
        ) -> Result<Response, HttpError> {
            self.requests
                .borrow_mut()
                .push((method, uri.to_string(), parameters.to_vec()));
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or(HttpError::Unsupported("no scripted response left"))
        }
    }

    fn session(bodies: Vec<&str>) -> PageSession<ScriptedClient> {
        PageSession::new(SessionConfig::default(), ScriptedClient::new(bodies))
    }

    #[test]
    fn operations_before_any_visit_report_no_page() {
        let mut session = session(vec![]);
        assert!(matches!(
            session.type_text("Joe", "name"),
            Err(SessionError::NoPage)
        ));
        assert!(matches!(session.see("anything"), Err(SessionError::NoPage)));
        assert!(!session.is_ok());
    }

    #[test]
    fn navigation_clears_staged_inputs() {
        let page = "<form><input name=\"name\"><input type=\"submit\" value=\"Go\"></form>";
        let mut session = session(vec![page, page, "<p>done</p>"]);

        session.visit("http://example.com").unwrap();
        session.type_text("Joe", "name").unwrap();
        session.visit("http://example.com").unwrap();
        session.press("Go").unwrap();

        let recorded = session.client().recorded();
        let submitted = &recorded[2].2;
        assert!(
            submitted.contains(&("name".to_string(), String::new())),
            "a prior page's typed value must not survive navigation: {submitted:?}"
        );
    }

    #[test]
    fn within_pops_the_scope_even_when_the_callback_fails() {
        let mut session = session(vec![
            "<div id=\"container\"><input name=\"inner\"></div><input name=\"outer\">",
        ]);
        session.visit("http://example.com").unwrap();

        let result = session.within("#container", |scoped| {
            scoped.type_text("x", "outer").map(|_| ())
        });
        assert!(matches!(result, Err(SessionError::MissingField(_))));

        // The scope unwound, so the outer field resolves again.
        session.type_text("x", "outer").unwrap();
    }

    #[test]
    fn relative_uris_resolve_against_the_current_page() {
        let mut session = session(vec!["<p>one</p>", "<p>two</p>"]);
        session.visit("http://example.com/app/index.html").unwrap();
        session.visit("done.html").unwrap();

        let recorded = session.client().recorded();
        assert_eq!(recorded[1].1, "http://example.com/app/done.html");
    }

    #[test]
    fn configured_base_url_anchors_the_first_visit() {
        let config = SessionConfig {
            base_url: Some("http://example.com".to_string()),
            ..Default::default()
        };
        let mut session = PageSession::new(config, ScriptedClient::new(vec!["<p>hi</p>"]));
        session.visit("/welcome").unwrap();

        let recorded = session.client().recorded();
        assert_eq!(recorded[0].1, "http://example.com/welcome");
    }

    #[test]
    fn non_html_responses_assert_against_the_raw_body() {
        let mut session = PageSession::new(
            SessionConfig::default(),
            ScriptedClient {
                responses: RefCell::new(VecDeque::from([Response::new(
                    200,
                    vec![("Content-Type".to_string(), "application/json".to_string())],
                    r#"{"status": "ok"}"#,
                )])),
                requests: RefCell::new(Vec::new()),
            },
        );
        session.visit("http://example.com/api").unwrap();

        assert!(session.see("\"status\"").unwrap());
        assert!(matches!(
            session.see_element("p", &[]),
            Err(SessionError::NotEvaluable)
        ));
    }
}
