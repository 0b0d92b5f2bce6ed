//! Viewport and viewBox inspection.
//!
//! Shape-based pattern matching over the markup, not XML parsing: the
//! service only needs boolean gates and literal values to substitute, so a
//! handful of regexes over the root tag is enough.

use iconvault_config::DimensionMode;
use regex::Regex;
use std::sync::LazyLock;

const NUMBER: &str = r"-?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?";
const UNSIGNED_DECIMAL: &str = r"\d+(?:\.\d+)?";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

macro_rules! attribute_regex {
    ($name:ident, $attribute:literal) => {
        regex!($name, concat!(r#"(?:^|\s)"#, $attribute, r#"\s*=\s*(?:"([^"]*)"|'([^']*)')"#));
    };
}

regex!(ROOT_TAG, r"<svg\b[^>]*>");
regex!(ROOT_OPEN, r"<svg\b");
attribute_regex!(WIDTH_ATTRIBUTE, "width");
attribute_regex!(HEIGHT_ATTRIBUTE, "height");
attribute_regex!(VIEWBOX_ATTRIBUTE, "viewBox");
regex!(
    SQUARE_VIEWBOX,
    format!(r"^\s*0\s+0\s+({UNSIGNED_DECIMAL})\s+({UNSIGNED_DECIMAL})\s*$").as_str()
);
regex!(
    FOUR_NUMBER_VIEWBOX,
    format!(r"^\s*({NUMBER})(?:\s+|\s*,\s*)({NUMBER})(?:\s+|\s*,\s*)({NUMBER})(?:\s+|\s*,\s*)({NUMBER})\s*$").as_str()
);
regex!(LEADING_DECIMAL, format!(r"^\s*({UNSIGNED_DECIMAL}|\.\d+)").as_str());

/// The root element's `width` and `height` attributes, as written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport<'a> {
    pub width: Option<&'a str>,
    pub height: Option<&'a str>,
}

/// The width and height tokens of a `viewBox` attribute, as written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewboxDimensions<'a> {
    pub width: Option<&'a str>,
    pub height: Option<&'a str>,
}

fn quoted<'a>(captures: regex::Captures<'a>) -> Option<&'a str> {
    captures.get(1).or_else(|| captures.get(2)).map(|m| m.as_str())
}

/// Every value of `attribute` in `haystack`, in document order.
fn attribute_values<'a>(attribute: &'static Regex, haystack: &'a str) -> impl Iterator<Item = &'a str> {
    attribute.captures_iter(haystack).filter_map(quoted)
}

fn root_tag(markup: &str) -> Option<&str> {
    ROOT_TAG.find(markup).map(|m| m.as_str())
}

/// Read `width` and `height` from the root `<svg>` opening tag.
///
/// Only standalone attributes count: `stroke-width` does not, and neither do
/// attributes of nested elements.
pub fn viewport(markup: &str) -> Viewport<'_> {
    let Some(tag) = root_tag(markup) else {
        return Viewport::default();
    };
    Viewport {
        width: attribute_values(&WIDTH_ATTRIBUTE, tag).next(),
        height: attribute_values(&HEIGHT_ATTRIBUTE, tag).next(),
    }
}

/// Exactly one `viewBox="0 0 N N"` in the document, both `N` written identically.
pub fn is_viewbox_correct(markup: &str) -> bool {
    let squares = attribute_values(&VIEWBOX_ATTRIBUTE, markup)
        .filter_map(|value| SQUARE_VIEWBOX.captures(value))
        .filter(|captures| captures[1] == captures[2])
        .count();
    squares == 1
}

/// Any `viewBox` attribute at all, whatever its shape.
pub fn is_viewbox_present(markup: &str) -> bool {
    VIEWBOX_ATTRIBUTE.is_match(markup)
}

/// Width and height tokens of the first well-formed, four-number `viewBox`.
pub fn viewbox_dimensions(markup: &str) -> ViewboxDimensions<'_> {
    attribute_values(&VIEWBOX_ATTRIBUTE, markup)
        .find_map(|value| FOUR_NUMBER_VIEWBOX.captures(value))
        .map(|captures| ViewboxDimensions {
            width: captures.get(3).map(|m| m.as_str()),
            height: captures.get(4).map(|m| m.as_str()),
        })
        .unwrap_or_default()
}

/// Insert `viewBox="{value}"` as the first attribute of the root element.
///
/// Markup without a root `<svg` tag is returned unchanged.
pub fn inject_viewbox(markup: &str, value: &str) -> String {
    match ROOT_OPEN.find(markup) {
        Some(open) => {
            let (head, tail) = markup.split_at(open.end());
            format!(r#"{head} viewBox="{value}"{tail}"#)
        },
        None => markup.to_string(),
    }
}

/// Turn a literal width, height or viewBox token into a pixel count.
///
/// See [`DimensionMode`]: `Literal` counts characters, `Numeric` rounds the
/// leading decimal number up. Empty, zero and non-numeric tokens do not
/// measure.
pub fn measure(literal: &str, mode: DimensionMode) -> Option<u32> {
    match mode {
        DimensionMode::Literal => match literal.chars().count() {
            0 => None,
            length => u32::try_from(length).ok(),
        },
        DimensionMode::Numeric => {
            let captures = LEADING_DECIMAL.captures(literal)?;
            let value: f64 = captures[1].parse().ok()?;
            let value = value.ceil();
            match value > 0.0 && value <= f64::from(u32::MAX) {
                true => Some(value as u32),
                false => None,
            }
        },
    }
}
