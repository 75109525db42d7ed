//! Fluent HTML page interaction and assertion DSL.
//!
//! `pagewalk` scripts a browser-less walk through a site: visit pages over
//! HTTP, stage form input, submit forms, click links, narrow lookups to a
//! sub-region of the page, and assert on text, elements, links, and
//! form-field state — all through one fluent [`PageSession`].
//!
//! ```no_run
//! use pagewalk::config::SessionConfig;
//! use pagewalk::session::PageSession;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = PageSession::with_default_client(SessionConfig::default())?;
//!
//! session
//!     .visit("http://example.com/login")?
//!     .type_text("joe@example.com", "email")?
//!     .type_text("secret", "password")?
//!     .press("Log in")?;
//!
//! assert!(session.is_ok());
//! assert!(session.see_text("Welcome back")?);
//! # Ok(())
//! # }
//! ```
//!
//! The HTTP transport and the HTML engine are collaborators behind seams:
//! [`http::HttpClient`] is a trait a test harness can script, and
//! [`document::Document`] wraps CSS querying and form-value extraction.

pub mod config;
pub mod constraints;
pub mod document;
pub mod http;
pub mod inputs;
pub mod logging;
pub mod metrics;
pub mod scope;
pub mod selector;
pub mod session;

pub use config::{SessionConfig, SessionConfigOverrides, Verbosity};
pub use constraints::{AttrRequirement, Constraint, Negate, PageView};
pub use document::{Document, Element, Form};
pub use http::{HttpClient, HttpError, Method, ReqwestClient, Response};
pub use inputs::FieldValue;
pub use selector::FieldNotFound;
pub use session::{PageSession, SessionError, SubmitTarget};
