//! Parsers for the auction site's listing page, detail pages and items API.
//!
//! All functions here are pure: markup or JSON in, typed fields out. Fields
//! the source omits come back empty rather than as errors.

pub mod dates;
pub mod details;
pub mod items;
pub mod listing;

pub use dates::{DateMark, parse_marked_date, parse_site_date};
pub use details::{AuctionDetails, Contact, parse_auction_details, parse_auction_details_in_year};
pub use items::{ItemFields, parse_items_response};
pub use listing::{AuctionListing, parse_auction_list};

/// Errors from parsing source content.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// Input cannot be traversed at all.
    #[error("content unavailable: {0}")]
    Unavailable(String),

    /// Structurally valid input in a shape the parser does not recognize.
    #[error("unexpected format: {0}")]
    UnexpectedFormat(String),
}

impl From<ParseError> for bidscout_core::Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Unavailable(msg) => bidscout_core::Error::ParseUnavailable(msg),
            ParseError::UnexpectedFormat(msg) => bidscout_core::Error::UnexpectedFormat(msg),
        }
    }
}

/// Reject input that holds nothing to traverse.
pub(crate) fn ensure_content(html: &str, what: &str) -> Result<(), ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::Unavailable(format!("empty {what}")));
    }
    Ok(())
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
