//! Root document scraping.
//!
//! The Nucleares webserver answers `GET /` with an HTML page listing every
//! readable variable as a `/?variable=NAME` link under a `==== GET ====`
//! heading, followed by the writable variables as bold labels under
//! `==== POST ====`.

use crate::types::RootDocument;
use common::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Heading that starts the readable variable section
pub const GET_MARKER: &str = "==== GET ====";

/// Heading that starts the writable variable section
pub const POST_MARKER: &str = "==== POST ====";

static VARIABLE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/\?variable=([^"'<>\s]+)"#).expect("variable link pattern is valid")
});

static BOLD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:b|strong)(?:\s[^>]*)?>(.*?)</(?:b|strong)\s*>")
        .expect("bold label pattern is valid")
});

/// Split the root document into GET and POST variable names.
///
/// Fails only when the GET heading is missing.
pub fn parse_root_document(text: &str) -> Result<RootDocument> {
    let start = text.find(GET_MARKER).ok_or(Error::MissingMarker { marker: GET_MARKER })?;
    let post_start = text[start..].find(POST_MARKER).map(|offset| start + offset);

    let section_end = post_start.unwrap_or(text.len());
    let get_section = &text[start + GET_MARKER.len()..section_end];

    let post_variables =
        post_start.map(|post| extract_bold_labels(&text[post + POST_MARKER.len()..]));

    Ok(RootDocument {
        get_variables: extract_variable_links(get_section),
        post_variables,
    })
}

/// Every `/?variable=NAME` target, URL-decoded, in order of appearance.
///
/// Tokens that fail to decode are kept as-is.
pub fn extract_variable_links(section: &str) -> Vec<String> {
    VARIABLE_LINK
        .captures_iter(section)
        .map(|caps| {
            let token = &caps[1];
            urlencoding::decode(token)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| token.to_string())
        })
        .collect()
}

/// Text of every `<b>` / `<strong>` element, trimmed, empty ones skipped.
pub fn extract_bold_labels(section: &str) -> Vec<String> {
    BOLD_LABEL
        .captures_iter(section)
        .map(|caps| caps[1].trim().to_string())
        .filter(|label| !label.is_empty())
        .collect()
}
