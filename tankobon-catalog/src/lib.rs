//! Client-side machinery for browsing a manga catalog service.
//!
//! This crate provides:
//! - an HTTP client over the catalog's REST API, with bearer token
//!   authentication and typed errors,
//! - the normalized domain types behind the loosely shaped wire data,
//! - filter state, URL state synchronization and pagination resolution
//!   for the browse view,
//! - a browse session that serializes fetch cycles so stale responses
//!   cannot overwrite newer state.
//!
//! The expected entry points are [`CatalogClient`] for talking to the
//! service and [`BrowseSession`] for driving a browse view.

pub mod browse;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod types;
pub mod urlstate;

pub use browse::{BrowseOutcome, BrowseSession, FetchTicket};
pub use client::{BrowsePage, CatalogClient, ClientTrait, SessionTokens};
pub use config::CatalogClientConfig;
pub use envelope::{CollectionEnvelope, PageMetadata};
pub use error::{AuthError, CatalogClientError};
pub use filter::{FilterState, PageSize, StatusFilter, ALLOWED_PAGE_SIZES};
pub use types::{
    group_tags,
    CatalogEntry,
    ChapterDetail,
    ChapterMangaRef,
    ChapterSummary,
    ContentRating,
    CoverRef,
    LocalizedText,
    MangaDetail,
    PublicationStatus,
    RatingSummary,
    Tag,
    TagGroup,
    TagId,
    TitleStatistics,
    User,
};
pub use urlstate::BrowseLocation;
