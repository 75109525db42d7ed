//! The `see*`/`dont_see*` assertion surface, exercised over page fixtures.
//!
//! Each positive assertion is checked together with its negative twin; the
//! negation must always be the exact boolean inverse, whatever the input.

mod support;

use anyhow::Result;
use pagewalk::constraints::AttrRequirement;
use pagewalk::session::SessionError;

use support::{session_with_bodies, FORM_HTML, LINK_HTML, WELCOME_HTML};

#[test]
fn sees_markup_in_the_page_source() -> Result<()> {
    let mut session = session_with_bodies(&[WELCOME_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see("<h1>Hello world!</h1>")?);
    assert!(!session.dont_see("<h1>Hello world!</h1>")?);

    assert!(session.dont_see("<p>Foo bar</p>")?);
    assert!(!session.see("<p>Foo bar</p>")?);
    Ok(())
}

#[test]
fn source_matching_ignores_case() -> Result<()> {
    let mut session = session_with_bodies(&[WELCOME_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see("<h1>HELLO WORLD!</h1>")?);
    Ok(())
}

#[test]
fn sees_visible_text_but_not_markup() -> Result<()> {
    let mut session = session_with_bodies(&[WELCOME_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_text("Hello world!")?);
    assert!(!session.dont_see_text("Hello world!")?);

    assert!(session.dont_see_text("Foo bar")?);
    assert!(!session.see_text("Foo bar")?);
    Ok(())
}

#[test]
fn sees_elements_by_selector() -> Result<()> {
    let mut session = session_with_bodies(&[WELCOME_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_element("#container", &[])?);
    assert!(!session.dont_see_element("#container", &[])?);

    assert!(session.dont_see_element("#banner", &[])?);
    assert!(!session.see_element("#banner", &[])?);
    Ok(())
}

#[test]
fn element_assertions_honour_attribute_requirements() -> Result<()> {
    let mut session = session_with_bodies(&[WELCOME_HTML]);
    session.visit("http://example.com")?;

    let centered = [AttrRequirement::Equals("align".into(), "center".into())];
    assert!(session.see_element("p", &centered)?);
    assert!(!session.dont_see_element("p", &centered)?);

    let present = [AttrRequirement::Present("align".into())];
    assert!(session.see_element("p", &present)?);

    let right = [AttrRequirement::Equals("align".into(), "right".into())];
    assert!(session.dont_see_element("p", &right)?);
    assert!(!session.see_element("p", &right)?);

    let styled = [AttrRequirement::Present("style".into())];
    assert!(session.dont_see_element("p", &styled)?);
    Ok(())
}

#[test]
fn sees_text_inside_a_specific_element() -> Result<()> {
    let mut session = session_with_bodies(&[WELCOME_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_in_element("#container > p", "Enter your name")?);
    assert!(!session.dont_see_in_element("#container > p", "Enter your name")?);

    assert!(session.dont_see_in_element("#container > p", "Hello world!")?);
    assert!(!session.see_in_element("#container > p", "Hello world!")?);
    Ok(())
}

#[test]
fn sees_links_by_text() -> Result<()> {
    let mut session = session_with_bodies(&[LINK_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_link("Click here", None)?);
    assert!(!session.dont_see_link("Click here", None)?);

    assert!(session.dont_see_link("Go away", None)?);
    assert!(!session.see_link("Go away", None)?);
    Ok(())
}

#[test]
fn sees_links_by_text_and_url() -> Result<()> {
    let mut session = session_with_bodies(&[LINK_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_link("Click here", Some("done.html"))?);
    assert!(!session.dont_see_link("Click here", Some("done.html"))?);

    assert!(session.dont_see_link("Click here", Some("login.html"))?);
    assert!(!session.see_link("Click here", Some("login.html"))?);
    Ok(())
}

#[test]
fn link_urls_also_match_their_absolute_form() -> Result<()> {
    let mut session = session_with_bodies(&[LINK_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_link("Click here", Some("http://example.com/done.html"))?);
    assert!(session.dont_see_link("Click here", Some("http://other.example/done.html"))?);
    Ok(())
}

#[test]
fn sees_field_values() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_in_field("name", "Bob Smith")?);
    assert!(!session.dont_see_in_field("name", "Bob Smith")?);

    assert!(session.dont_see_in_field("name", "John Smith")?);
    assert!(!session.see_in_field("name", "John Smith")?);
    Ok(())
}

#[test]
fn field_assertions_on_missing_fields_fail_loudly() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    let err = session.see_in_field("surname", "Smith").unwrap_err();
    assert!(matches!(err, SessionError::MissingField(_)));
    Ok(())
}

#[test]
fn sees_selected_option_by_value() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_is_selected("country", "fr")?);
    assert!(!session.dont_see_is_selected("country", "fr")?);

    assert!(session.dont_see_is_selected("country", "uk")?);
    assert!(!session.see_is_selected("country", "uk")?);
    Ok(())
}

#[test]
fn sees_selected_option_by_text_when_it_has_no_value() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_is_selected("season", "Spring")?);
    assert!(session.dont_see_is_selected("season", "Winter")?);
    Ok(())
}

#[test]
fn sees_selected_option_inside_an_optgroup() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_is_selected("food", "Egg")?);
    assert!(session.dont_see_is_selected("food", "Onions")?);
    Ok(())
}

#[test]
fn multi_selects_report_every_selected_value() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_is_selected("tags[]", "rust")?);
    assert!(session.see_is_selected("tags[]", "html")?);
    assert!(session.dont_see_is_selected("tags[]", "wasm")?);
    Ok(())
}

#[test]
fn sees_checked_radio_values() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_is_selected("sex", "m")?);
    assert!(session.dont_see_is_selected("sex", "f")?);
    Ok(())
}

#[test]
fn an_untouched_radio_group_selects_nothing() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.dont_see_is_selected("colour", "red")?);
    assert!(!session.see_is_selected("colour", "blue")?);
    Ok(())
}

#[test]
fn sees_checkbox_checked_state() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    assert!(session.see_is_checked("newsletter")?);
    assert!(!session.dont_see_is_checked("newsletter")?);

    assert!(session.dont_see_is_checked("confirm")?);
    assert!(!session.see_is_checked("confirm")?);
    Ok(())
}

#[test]
fn assertions_respect_the_current_scope() -> Result<()> {
    let mut session = session_with_bodies(&[WELCOME_HTML]);
    session.visit("http://example.com")?;

    session.within("#container", |scoped| {
        assert!(scoped.see_text("Enter your name")?);
        assert!(scoped.dont_see_text("Hello world!")?);
        Ok(())
    })?;

    // Back at the whole page once the scope unwinds.
    assert!(session.see_text("Hello world!")?);
    Ok(())
}

#[test]
fn every_negative_assertion_is_the_exact_inverse_of_its_positive() -> Result<()> {
    let mut session = session_with_bodies(&[FORM_HTML]);
    session.visit("http://example.com")?;

    for text in ["Bob Smith", "definitely absent"] {
        assert_eq!(session.see(text)?, !session.dont_see(text)?);
        assert_eq!(session.see_text(text)?, !session.dont_see_text(text)?);
    }

    for selector in ["form", "#banner"] {
        assert_eq!(
            session.see_element(selector, &[])?,
            !session.dont_see_element(selector, &[])?
        );
    }

    for value in ["uk", "fr", "xx"] {
        assert_eq!(
            session.see_is_selected("country", value)?,
            !session.dont_see_is_selected("country", value)?
        );
    }

    for field in ["confirm", "newsletter"] {
        assert_eq!(
            session.see_is_checked(field)?,
            !session.dont_see_is_checked(field)?
        );
    }
    Ok(())
}
