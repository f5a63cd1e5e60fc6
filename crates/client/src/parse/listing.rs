//! Auction listing page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{ParseError, ensure_content, squash_whitespace};

static DETAIL_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/auctions/detail/bw"]"#).expect("invalid selector"));

static AUCTION_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"bw(\d+)").expect("invalid regex"));

/// One auction as it appears on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionListing {
    /// Numeric site id, e.g. `"139759"`.
    pub id: String,
    pub title: String,
    /// Absolute URL of the detail page.
    pub details_url: String,
}

/// Extract auction entries from the listing page.
///
/// Anchors without a numeric id or without visible text are skipped. The same
/// auction is usually linked several times; the first titled link wins.
pub fn parse_auction_list(html: &str, base: &Url) -> Result<Vec<AuctionListing>, ParseError> {
    ensure_content(html, "listing page")?;

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut auctions = Vec::new();

    for element in document.select(&DETAIL_LINK) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(id) = AUCTION_ID.captures(href).map(|c| c[1].to_string()) else {
            continue;
        };

        let title = squash_whitespace(&element.text().collect::<String>());
        if title.is_empty() || seen.contains(&id) {
            continue;
        }

        let details_url = match base.join(href) {
            Ok(u) => u.to_string(),
            Err(e) => {
                tracing::debug!(href, error = %e, "skipping unresolvable detail link");
                continue;
            }
        };

        seen.insert(id.clone());
        auctions.push(AuctionListing { id, title, details_url });
    }

    Ok(auctions)
}
