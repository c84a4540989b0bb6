//! Filter state for the catalog browse view.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::types::TagId;

/// Page sizes the browse view accepts.
pub const ALLOWED_PAGE_SIZES: [u32; 4] = [12, 24, 48, 96];

/// A validated items-per-page value.
///
/// Values outside [ALLOWED_PAGE_SIZES] do not construct; callers keep
/// whatever valid value they already had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageSize(u32);

impl PageSize {
    pub const DEFAULT: PageSize = PageSize(24);

    pub fn new(value: u32) -> Option<PageSize> {
        ALLOWED_PAGE_SIZES.contains(&value).then_some(PageSize(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::DEFAULT
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The status / content-rating constraint of the browse view.
///
/// A single-choice control: three of the values constrain publication
/// status, `safe` constrains content rating instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Ongoing,
    Completed,
    Safe,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Ongoing => "ongoing",
            StatusFilter::Completed => "completed",
            StatusFilter::Safe => "safe",
        }
    }

    pub fn parse(value: &str) -> Option<StatusFilter> {
        match value {
            "all" => Some(StatusFilter::All),
            "ongoing" => Some(StatusFilter::Ongoing),
            "completed" => Some(StatusFilter::Completed),
            "safe" => Some(StatusFilter::Safe),
            _ => None,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusFilter::parse(s)
            .ok_or_else(|| format!("unknown filter '{s}', expected one of all, ongoing, completed, safe"))
    }
}

/// What the user is browsing for: search text, status constraint,
/// selected tags and page size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub search_text: String,
    pub status: StatusFilter,
    pub tags: BTreeSet<TagId>,
    pub items_per_page: PageSize,
}

impl FilterState {
    pub fn is_default(&self) -> bool {
        *self == FilterState::default()
    }

    /// Query parameters for the catalog list endpoint. Only published
    /// titles are ever requested, newest updates first.
    pub fn to_api_query(&self, page: u32) -> Vec<(String, String)> {
        let mut query = vec![
            ("state".to_string(), "published".to_string()),
            ("page".to_string(), page.to_string()),
            ("itemsPerPage".to_string(), self.items_per_page.to_string()),
            ("order[updatedAt]".to_string(), "desc".to_string()),
        ];
        if !self.search_text.is_empty() {
            query.push(("title".to_string(), self.search_text.clone()));
        }
        match self.status {
            StatusFilter::All => {},
            StatusFilter::Ongoing => query.push(("status".to_string(), "ongoing".to_string())),
            StatusFilter::Completed => query.push(("status".to_string(), "completed".to_string())),
            StatusFilter::Safe => query.push(("contentRating".to_string(), "safe".to_string())),
        }
        for tag in &self.tags {
            query.push(("tags.id".to_string(), tag.clone()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn page_size_rejects_values_off_the_list() {
        assert_eq!(PageSize::new(24), Some(PageSize::DEFAULT));
        assert_eq!(PageSize::new(96).map(PageSize::get), Some(96));
        assert_eq!(PageSize::new(0), None);
        assert_eq!(PageSize::new(25), None);
        assert_eq!(PageSize::new(1000), None);
    }

    #[test]
    fn default_filter_queries_published_newest_first() {
        let query = FilterState::default().to_api_query(1);
        assert_eq!(query, vec![
            ("state".to_string(), "published".to_string()),
            ("page".to_string(), "1".to_string()),
            ("itemsPerPage".to_string(), "24".to_string()),
            ("order[updatedAt]".to_string(), "desc".to_string()),
        ]);
    }

    #[test]
    fn full_filter_produces_every_parameter() {
        let filter = FilterState {
            search_text: "dragon".to_string(),
            status: StatusFilter::Ongoing,
            tags: ["t1".to_string(), "t2".to_string()].into_iter().collect(),
            items_per_page: PageSize::new(48).unwrap(),
        };
        let query = filter.to_api_query(3);
        assert!(query.contains(&("title".to_string(), "dragon".to_string())));
        assert!(query.contains(&("status".to_string(), "ongoing".to_string())));
        assert!(query.contains(&("page".to_string(), "3".to_string())));
        assert!(query.contains(&("itemsPerPage".to_string(), "48".to_string())));
        let tags: Vec<_> = query.iter().filter(|(key, _)| key == "tags.id").collect();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn safe_filter_constrains_content_rating_not_status() {
        let filter = FilterState {
            status: StatusFilter::Safe,
            ..Default::default()
        };
        let query = filter.to_api_query(1);
        assert!(query.contains(&("contentRating".to_string(), "safe".to_string())));
        assert!(!query.iter().any(|(key, _)| key == "status"));
    }
}
