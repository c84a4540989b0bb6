//! The shareable query-string form of a browse view position.
//!
//! Filter state and page number round-trip through `page`, `search`,
//! `filter`, `tags` and `itemsPerPage` query parameters so any view can
//! be linked to or restored. A parameter equal to its default is omitted
//! to keep links minimal. Parsing is fail-closed: malformed or
//! out-of-range values collapse to their defaults instead of erroring, so
//! a hand-edited link still lands on a sane view.

use std::collections::BTreeSet;

use url::form_urlencoded;

use crate::filter::{FilterState, PageSize, StatusFilter};

/// A browse view position: the filters plus the page within them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseLocation {
    pub filter: FilterState,
    pub page: u32,
}

impl Default for BrowseLocation {
    fn default() -> Self {
        BrowseLocation {
            filter: FilterState::default(),
            page: 1,
        }
    }
}

impl BrowseLocation {
    /// Encode as a query string, omitting parameters at their defaults.
    /// The default location encodes to the empty string.
    pub fn encode(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if self.page > 1 {
            query.append_pair("page", &self.page.to_string());
        }
        if !self.filter.search_text.is_empty() {
            query.append_pair("search", &self.filter.search_text);
        }
        if self.filter.status != StatusFilter::default() {
            query.append_pair("filter", self.filter.status.as_str());
        }
        if !self.filter.tags.is_empty() {
            let tags = self
                .filter
                .tags
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",");
            query.append_pair("tags", &tags);
        }
        if self.filter.items_per_page != PageSize::default() {
            query.append_pair("itemsPerPage", &self.filter.items_per_page.to_string());
        }
        query.finish()
    }

    /// Parse a query string (with or without a leading `?`). Unknown
    /// parameters are ignored; unparsable values take their defaults.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut location = BrowseLocation::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "page" => {
                    location.page = value.parse().ok().filter(|page| *page >= 1).unwrap_or(1);
                },
                "search" => location.filter.search_text = value.into_owned(),
                "filter" => {
                    location.filter.status = StatusFilter::parse(&value).unwrap_or_default();
                },
                "tags" => {
                    location.filter.tags = value
                        .split(',')
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_string)
                        .collect::<BTreeSet<_>>();
                },
                "itemsPerPage" => {
                    location.filter.items_per_page = value
                        .parse()
                        .ok()
                        .and_then(PageSize::new)
                        .unwrap_or_default();
                },
                _ => {},
            }
        }
        location
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::filter::ALLOWED_PAGE_SIZES;

    #[test]
    fn default_location_encodes_to_nothing() {
        assert_eq!(BrowseLocation::default().encode(), "");
        assert_eq!(BrowseLocation::parse(""), BrowseLocation::default());
    }

    #[test]
    fn defaults_are_omitted_individually() {
        let location = BrowseLocation {
            filter: FilterState {
                search_text: "dragon".to_string(),
                ..Default::default()
            },
            page: 1,
        };
        assert_eq!(location.encode(), "search=dragon");
    }

    #[test]
    fn full_location_round_trips() {
        let location = BrowseLocation {
            filter: FilterState {
                search_text: "space pirates".to_string(),
                status: StatusFilter::Completed,
                tags: ["action".to_string(), "sci-fi".to_string()].into_iter().collect(),
                items_per_page: PageSize::new(48).unwrap(),
            },
            page: 3,
        };
        let encoded = location.encode();
        assert_eq!(BrowseLocation::parse(&encoded), location);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let location = BrowseLocation::parse("page=banana&filter=weird&itemsPerPage=25");
        assert_eq!(location, BrowseLocation::default());

        let location = BrowseLocation::parse("page=0");
        assert_eq!(location.page, 1);

        let location = BrowseLocation::parse("page=-3");
        assert_eq!(location.page, 1);

        let location = BrowseLocation::parse("itemsPerPage=forty");
        assert_eq!(location.filter.items_per_page, PageSize::default());
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let location = BrowseLocation::parse("utm_source=feed&page=2");
        assert_eq!(location.page, 2);
        assert_eq!(location.filter, FilterState::default());
    }

    #[test]
    fn leading_question_mark_is_accepted() {
        assert_eq!(BrowseLocation::parse("?page=4").page, 4);
    }

    proptest! {
        #[test]
        fn any_location_round_trips(
            search in "[a-zA-Z0-9 .!-]{0,24}",
            status_index in 0usize..4,
            tags in proptest::collection::btree_set("[a-z0-9-]{1,12}", 0..5),
            page in 1u32..=500,
            size_index in 0usize..ALLOWED_PAGE_SIZES.len(),
        ) {
            let status = [
                StatusFilter::All,
                StatusFilter::Ongoing,
                StatusFilter::Completed,
                StatusFilter::Safe,
            ][status_index];
            let location = BrowseLocation {
                filter: FilterState {
                    search_text: search,
                    status,
                    tags,
                    items_per_page: PageSize::new(ALLOWED_PAGE_SIZES[size_index]).unwrap(),
                },
                page,
            };
            prop_assert_eq!(BrowseLocation::parse(&location.encode()), location);
        }
    }
}
