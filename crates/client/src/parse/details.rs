//! Auction detail page.
//!
//! Detail pages are loosely structured: most fields are labeled runs of text
//! (`INSPECTION: ...`) rather than distinct elements, so extraction mixes DOM
//! selection with regex over the raw markup and its visible text.

use std::collections::HashSet;
use std::sync::LazyLock;

use bidscout_core::{ImageDescriptor, Location};
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dates::{DateMark, parse_marked_date};
use super::{ParseError, ensure_content, squash_whitespace};

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("invalid selector"));

static HEADING_CANDIDATES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, h5, h6, div, strong, span").expect("invalid selector"));

static MAP_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="maps.google.com"], a[href*="map"]"#).expect("invalid selector"));

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").expect("invalid selector"));

static ONLINE_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bonline only\b").expect("invalid regex"));

static OFFLINE_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\boffline only\b").expect("invalid regex"));

static MOUNTAIN_ZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:MST|MDT|MT|US/Mountain)\b").expect("invalid regex"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.[A-Za-z]{2,6}").expect("invalid regex"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").expect("invalid regex"));

static ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3,5} [\w .]+), ([\w .]+), ([A-Z]{2}) (\d{5})").expect("invalid regex"));

static MAP_QUERY_COORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&](?:q|ll)=(-?\d{1,3}(?:\.\d+)?)(?:,|%2C)\s*(-?\d{1,3}(?:\.\d+)?)").expect("invalid regex")
});

static MAP_AT_COORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(-?\d{1,3}\.\d+),(-?\d{1,3}\.\d+)").expect("invalid regex"));

/// Labeled run of text: the label, an optional colon and closing tag, then
/// everything up to the next tag or line break.
fn labeled(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){label}:?[ \t]*(?:</[a-z]+>)?[ \t]*([^<\n]+)")).expect("invalid regex")
}

static INSPECTION: LazyLock<Regex> = LazyLock::new(|| labeled("INSPECTION"));
static REMOVAL: LazyLock<Regex> = LazyLock::new(|| labeled("REMOVAL"));
static BUYER_RESPONSIBILITIES: LazyLock<Regex> = LazyLock::new(|| labeled("Buyer Responsibilities"));
static ON_BEHALF_OF: LazyLock<Regex> = LazyLock::new(|| labeled("On Behalf Of"));

/// Auction coordinator contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Fields scraped from one detail page. Absent fields are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionDetails {
    pub title: String,
    /// Inner HTML of the description block.
    pub description: String,
    pub company_name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub scheduled_end_time: Option<DateTime<Utc>>,
    pub inspection_details: String,
    pub removal_details: String,
    pub buyer_responsibilities: String,
    /// Not published by the site; kept for the record shape.
    pub status: String,
    pub online_only: bool,
    pub offline_only: bool,
    pub timezone: String,
    pub contact: Contact,
    pub location: Option<Location>,
    pub featured_images: Vec<ImageDescriptor>,
}

/// Parse a detail page, reading printed dates in the current year.
pub fn parse_auction_details(html: &str, base: &Url) -> Result<AuctionDetails, ParseError> {
    parse_auction_details_in_year(html, base, Utc::now().year())
}

/// Parse a detail page, reading printed dates in `year`.
pub fn parse_auction_details_in_year(html: &str, base: &Url, year: i32) -> Result<AuctionDetails, ParseError> {
    ensure_content(html, "detail page")?;

    let document = Html::parse_document(html);
    let text = squash_whitespace(&document.root_element().text().collect::<Vec<_>>().join(" "));

    let title = document
        .select(&H1)
        .next()
        .map(|h1| squash_whitespace(&h1.text().collect::<String>()))
        .unwrap_or_default();

    Ok(AuctionDetails {
        title,
        description: description(&document),
        company_name: label_value(&ON_BEHALF_OF, html),
        starts_at: parse_marked_date(&text, DateMark::Start, year),
        scheduled_end_time: parse_marked_date(&text, DateMark::End, year),
        inspection_details: label_value(&INSPECTION, html),
        removal_details: label_value(&REMOVAL, html),
        buyer_responsibilities: label_value(&BUYER_RESPONSIBILITIES, html),
        status: String::new(),
        online_only: ONLINE_ONLY.is_match(&text),
        offline_only: OFFLINE_ONLY.is_match(&text),
        timezone: if MOUNTAIN_ZONE.is_match(&text) { "US/Mountain".to_string() } else { String::new() },
        contact: contact(&text, html),
        location: location(&document),
        featured_images: images(&document, base),
    })
}

fn label_value(pattern: &Regex, html: &str) -> String {
    pattern
        .captures(html)
        .map(|c| squash_whitespace(&c[1]))
        .unwrap_or_default()
}

fn next_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// The block after a "Details" heading, else the first `div`/`p` after the title.
fn description(document: &Html) -> String {
    let after_heading = document
        .select(&HEADING_CANDIDATES)
        .find(|el| squash_whitespace(&el.text().collect::<String>()).eq_ignore_ascii_case("details"))
        .and_then(next_element);

    let block = after_heading.or_else(|| {
        let h1 = document.select(&H1).next()?;
        h1.next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| matches!(el.value().name(), "div" | "p"))
    });

    block.map(|el| el.inner_html().trim().to_string()).unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Coordinator email and phone, with names taken from a `first.last@` address.
fn contact(text: &str, html: &str) -> Contact {
    let email = EMAIL
        .find(text)
        .or_else(|| EMAIL.find(html))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let phone = PHONE.find(text).map(|m| m.as_str().to_string()).unwrap_or_default();

    let (first_name, last_name) = match email.split('@').next().map(|local| local.split('.').collect::<Vec<_>>()) {
        Some(parts) if parts.len() >= 2 && !parts[0].is_empty() && !parts[1].is_empty() => {
            (capitalize(parts[0]), capitalize(parts[1]))
        }
        _ => (String::new(), String::new()),
    };

    Contact { first_name, last_name, email, phone }
}

fn coordinates(href: &str) -> (Option<f64>, Option<f64>) {
    let caps = MAP_QUERY_COORDS.captures(href).or_else(|| MAP_AT_COORDS.captures(href));
    match caps {
        Some(c) => (c[1].parse().ok(), c[2].parse().ok()),
        None => (None, None),
    }
}

/// Postal address from the text surrounding the first map link.
fn location(document: &Html) -> Option<Location> {
    let link = document.select(&MAP_LINK).next()?;
    let block = link
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| squash_whitespace(&parent.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    if block.is_empty() {
        return None;
    }

    let (lat, lng) = link.value().attr("href").map(coordinates).unwrap_or((None, None));

    let location = match ADDRESS.captures(&block) {
        Some(c) => Location {
            street: c[1].trim().to_string(),
            city: c[2].trim().to_string(),
            state: c[3].to_string(),
            zip: c[4].to_string(),
            country: "US".to_string(),
            lat,
            lng,
        },
        None => Location { street: block, country: "US".to_string(), lat, lng, ..Location::default() },
    };

    Some(location)
}

/// Image URLs resolved against `base`, skipping inline `data:` images.
fn images(document: &Html, base: &Url) -> Vec<ImageDescriptor> {
    let mut seen = HashSet::new();
    document
        .select(&IMG)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .filter_map(|src| base.join(src).ok())
        .map(|url| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .map(|url| ImageDescriptor { url })
        .collect()
}
