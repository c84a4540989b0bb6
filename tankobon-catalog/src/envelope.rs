//! The paged collection envelope and pagination resolution.
//!
//! Collection endpoints wrap their items in an envelope carrying a total
//! count and a partial view with first/last/next/prev links. Legacy
//! deployments prefix the same keys with `hydra:`; both spellings are
//! accepted. [`PageMetadata::resolve`] reduces an envelope to the numbers
//! a pager needs, falling back to counting when the envelope is sparse.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Envelope around every paged collection response.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct CollectionEnvelope<T> {
    #[serde(default, alias = "hydra:member")]
    pub member: Vec<T>,
    #[serde(rename = "totalItems", alias = "hydra:totalItems", default)]
    pub total_items: Option<u64>,
    #[serde(default, alias = "hydra:view")]
    pub view: Option<PartialView>,
}

/// Pagination links of a collection response. All parts are optional;
/// single-page collections often omit the view entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialView {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(default, alias = "hydra:first")]
    pub first: Option<String>,
    #[serde(default, alias = "hydra:last")]
    pub last: Option<String>,
    #[serde(default, alias = "hydra:next")]
    pub next: Option<String>,
    #[serde(default, alias = "prev", alias = "hydra:previous")]
    pub previous: Option<String>,
}

/// Resolved pagination state for one fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
}

impl PageMetadata {
    /// Derive pagination from an envelope.
    ///
    /// The page count comes from the `page` parameter of the view's
    /// `last` link; without one the response is a single page. The total
    /// comes from the declared `totalItems`, falling back to counting
    /// the members. The current page comes from the view's own link,
    /// falling back to the page that was requested.
    pub fn resolve<T>(
        envelope: &CollectionEnvelope<T>,
        requested_page: u32,
        items_per_page: u32,
    ) -> Self {
        let view = envelope.view.as_ref();
        let total_pages = view
            .and_then(|view| view.last.as_deref())
            .and_then(page_param)
            .unwrap_or(1)
            .max(1);
        let total_items = envelope
            .total_items
            .unwrap_or(envelope.member.len() as u64);
        let mut current_page = view
            .and_then(|view| view.id.as_deref())
            .and_then(page_param)
            .unwrap_or(requested_page)
            .max(1);
        if total_items > 0 {
            current_page = current_page.min(total_pages);
        }
        PageMetadata {
            current_page,
            total_pages,
            total_items,
            items_per_page,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Extract the `page` query parameter from a pagination link such as
/// `/api/mangas?itemsPerPage=24&page=7`.
fn page_param(link: &str) -> Option<u32> {
    let (_, query) = link.split_once('?')?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}
