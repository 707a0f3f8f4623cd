//! Element locators (W3C location strategies plus Appium's accessibility id)

use std::fmt;

/// How to find an element on screen
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Android resource id, e.g. `com.spotify.music:id/query`
    Id(String),
    XPath(String),
    /// `content-desc` of the view
    AccessibilityId(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Locator::AccessibilityId(value.into())
    }

    /// The `using` field of a find-element request
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::XPath(_) => "xpath",
            Locator::AccessibilityId(_) => "accessibility id",
        }
    }

    /// The `value` field of a find-element request
    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v) | Locator::XPath(v) | Locator::AccessibilityId(v) => v,
        }
    }

    /// Build an XPath matching views whose text or content description is
    /// exactly `text`
    pub fn text_or_description(text: &str) -> Self {
        let literal = xpath_literal(text);
        Locator::XPath(format!(
            "//*[@text={literal} or @content-desc={literal}]"
        ))
    }

    /// Build an XPath matching views whose text or content description
    /// contains `text`
    pub fn containing_text(text: &str) -> Self {
        let literal = xpath_literal(text);
        Locator::XPath(format!(
            "//*[contains(@text, {literal}) or contains(@content-desc, {literal})]"
        ))
    }

    /// Like [`Locator::text_or_description`], relative to a parent element
    pub fn descendant_text_or_description(text: &str) -> Self {
        let literal = xpath_literal(text);
        Locator::XPath(format!(
            ".//*[@text={literal} or @content-desc={literal}]"
        ))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Quote a string as an XPath 1.0 literal
///
/// XPath has no escape sequences, so a string containing both quote kinds
/// is assembled with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }

    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
