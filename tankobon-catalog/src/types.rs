//! Domain types for the catalog, and the normalization boundary over the
//! loosely shaped wire data.
//!
//! The service duck-types several fields: a manga's `tags` may be id
//! strings or full tag objects, `coverArts` entries may be IRI strings or
//! objects, and titles arrive as locale maps with no guaranteed keys.
//! Everything past [`CatalogEntry::from_raw`] / [`MangaDetail::from_raw`]
//! is uniform; no other module inspects raw shapes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use tankobon_core::User;

/// Opaque identifier of a tag.
pub type TagId = String;

// -------------------------------------------------------------------------
// Localized text
// -------------------------------------------------------------------------

/// A locale-keyed text map, e.g. `{"en": "...", "ja": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value to display: English, then Japanese, then whatever is there.
    pub fn display(&self) -> Option<&str> {
        self.get("en")
            .or_else(|| self.get("ja"))
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    pub fn display_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.display().unwrap_or(placeholder)
    }
}

impl<S1, S2> FromIterator<(S1, S2)> for LocalizedText
where
    S1: Into<String>,
    S2: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (S1, S2)>>(iter: T) -> Self {
        LocalizedText(
            iter.into_iter()
                .map(|(locale, text)| (locale.into(), text.into()))
                .collect(),
        )
    }
}

// -------------------------------------------------------------------------
// Statuses and ratings
// -------------------------------------------------------------------------

/// Publication status of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    /// A status this client does not know about yet.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationStatus::Ongoing => write!(f, "Ongoing"),
            PublicationStatus::Completed => write!(f, "Completed"),
            PublicationStatus::Hiatus => write!(f, "Hiatus"),
            PublicationStatus::Cancelled => write!(f, "Cancelled"),
            PublicationStatus::Other(status) => write!(f, "{status}"),
        }
    }
}

/// Content rating of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRating {
    Safe,
    Suggestive,
    Erotica,
    Pornographic,
    #[serde(untagged)]
    Other(String),
}

impl ContentRating {
    pub fn as_str(&self) -> &str {
        match self {
            ContentRating::Safe => "safe",
            ContentRating::Suggestive => "suggestive",
            ContentRating::Erotica => "erotica",
            ContentRating::Pornographic => "pornographic",
            ContentRating::Other(rating) => rating,
        }
    }
}

impl fmt::Display for ContentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// -------------------------------------------------------------------------
// Tags
// -------------------------------------------------------------------------

/// Bucket a tag belongs to, used to cluster the tag catalog for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagGroup {
    Content,
    Format,
    Genre,
    Theme,
    #[serde(untagged)]
    Other(String),
}

impl Default for TagGroup {
    fn default() -> Self {
        TagGroup::Other("other".to_string())
    }
}

impl fmt::Display for TagGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagGroup::Content => write!(f, "Content"),
            TagGroup::Format => write!(f, "Format"),
            TagGroup::Genre => write!(f, "Genre"),
            TagGroup::Theme => write!(f, "Theme"),
            TagGroup::Other(group) => write!(f, "{group}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(rename = "tagGroup", default)]
    pub group: TagGroup,
}

impl Tag {
    pub fn display_name(&self) -> &str {
        self.name.display_or("Unknown")
    }
}

/// Cluster tags by their group, each bucket sorted by display name.
pub fn group_tags(tags: &[Tag]) -> BTreeMap<TagGroup, Vec<&Tag>> {
    let mut groups: BTreeMap<TagGroup, Vec<&Tag>> = BTreeMap::new();
    for tag in tags {
        groups.entry(tag.group.clone()).or_default().push(tag);
    }
    for bucket in groups.values_mut() {
        bucket.sort_by(|a, b| a.display_name().cmp(b.display_name()));
    }
    groups
}

// -------------------------------------------------------------------------
// Covers
// -------------------------------------------------------------------------

/// Reference to a cover image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverRef {
    pub file_name: String,
}

impl CoverRef {
    /// Absolute URL of the image. Filenames may already be absolute
    /// URLs; anything else is joined onto the cover host.
    pub fn url(&self, base: &str) -> String {
        if self.file_name.starts_with("http://") || self.file_name.starts_with("https://") {
            return self.file_name.clone();
        }
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.file_name.trim_start_matches('/')
        )
    }
}

// -------------------------------------------------------------------------
// Wire shapes
// -------------------------------------------------------------------------

/// A tag reference as it appears embedded in a manga: either a full tag
/// object or a bare id string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawTagRef {
    Full(Tag),
    Id(TagId),
}

impl RawTagRef {
    fn into_tag(self) -> Tag {
        match self {
            RawTagRef::Full(tag) => tag,
            RawTagRef::Id(id) => Tag {
                id,
                name: LocalizedText::default(),
                group: TagGroup::default(),
            },
        }
    }
}

/// A `coverArts` entry: an object that may carry a file name, or a bare
/// IRI string (which carries none).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawCoverArt {
    Object {
        #[serde(rename = "fileName", default)]
        file_name: Option<String>,
    },
    Iri(String),
}

impl RawCoverArt {
    fn file_name(self) -> Option<String> {
        match self {
            RawCoverArt::Object { file_name } => file_name,
            RawCoverArt::Iri(_) => None,
        }
    }
}

/// An author or artist entry: a full object or a bare name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawCreator {
    Object {
        #[serde(default)]
        name: Option<String>,
    },
    Name(String),
}

impl RawCreator {
    fn name(self) -> Option<String> {
        match self {
            RawCreator::Object { name } => name,
            RawCreator::Name(name) => Some(name),
        }
    }
}

/// Aggregate user rating of a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    #[serde(default)]
    pub count: u64,
}

/// Follow and view counters of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleStatistics {
    #[serde(default)]
    pub follows: u64,
    #[serde(default)]
    pub views: u64,
}

/// A manga as the service sends it, list and item endpoints alike.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawManga {
    pub id: String,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub status: Option<PublicationStatus>,
    #[serde(rename = "contentRating", default)]
    pub content_rating: Option<ContentRating>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(rename = "lastChapter", default)]
    pub last_chapter: Option<String>,
    #[serde(default)]
    pub tags: Vec<RawTagRef>,
    #[serde(rename = "coverArts", default)]
    pub cover_arts: Vec<RawCoverArt>,
    #[serde(rename = "mainCoverArtFilename", default)]
    pub main_cover_art_filename: Option<String>,
    #[serde(default)]
    pub authors: Vec<RawCreator>,
    #[serde(default)]
    pub artists: Vec<RawCreator>,
    #[serde(default)]
    pub rating: Option<RatingSummary>,
    #[serde(default)]
    pub statistics: Option<TitleStatistics>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn normalize_cover(
    main_cover_art_filename: Option<String>,
    cover_arts: Vec<RawCoverArt>,
) -> Option<CoverRef> {
    main_cover_art_filename
        .or_else(|| cover_arts.into_iter().find_map(RawCoverArt::file_name))
        .map(|file_name| CoverRef { file_name })
}

fn normalize_tag_ids(tags: Vec<RawTagRef>) -> Vec<TagId> {
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|tag| tag.into_tag().id)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

// -------------------------------------------------------------------------
// Normalized catalog entries
// -------------------------------------------------------------------------

/// One title in the catalog list, normalized for display.
///
/// The list is replaced wholesale on every fetch; entries carry tag ids
/// only, resolved against the tag catalog when names are needed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: LocalizedText,
    pub status: Option<PublicationStatus>,
    pub content_rating: Option<ContentRating>,
    pub cover: Option<CoverRef>,
    pub tag_ids: Vec<TagId>,
    pub year: Option<i32>,
    pub last_chapter: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn display_title(&self) -> &str {
        self.title.display_or("Untitled")
    }

    pub(crate) fn from_raw(raw: RawManga) -> Self {
        CatalogEntry {
            id: raw.id,
            title: raw.title,
            status: raw.status,
            content_rating: raw.content_rating,
            cover: normalize_cover(raw.main_cover_art_filename, raw.cover_arts),
            tag_ids: normalize_tag_ids(raw.tags),
            year: raw.year,
            last_chapter: raw.last_chapter,
            updated_at: raw.updated_at,
        }
    }
}

/// Full detail of a single title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MangaDetail {
    pub id: String,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub status: Option<PublicationStatus>,
    pub content_rating: Option<ContentRating>,
    pub cover: Option<CoverRef>,
    /// Embedded tags; a bare-id reference yields a tag with an empty
    /// name.
    pub tags: Vec<Tag>,
    pub authors: Vec<String>,
    pub artists: Vec<String>,
    pub year: Option<i32>,
    pub last_chapter: Option<String>,
    pub rating: Option<RatingSummary>,
    pub statistics: Option<TitleStatistics>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MangaDetail {
    pub fn display_title(&self) -> &str {
        self.title.display_or("Untitled")
    }

    pub fn display_description(&self) -> &str {
        self.description.display_or("No description available.")
    }

    pub(crate) fn from_raw(raw: RawManga) -> Self {
        MangaDetail {
            id: raw.id,
            title: raw.title,
            description: raw.description,
            status: raw.status,
            content_rating: raw.content_rating,
            cover: normalize_cover(raw.main_cover_art_filename, raw.cover_arts),
            tags: raw.tags.into_iter().map(RawTagRef::into_tag).collect(),
            authors: raw.authors.into_iter().filter_map(RawCreator::name).collect(),
            artists: raw.artists.into_iter().filter_map(RawCreator::name).collect(),
            year: raw.year,
            last_chapter: raw.last_chapter,
            rating: raw.rating,
            statistics: raw.statistics,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

// -------------------------------------------------------------------------
// Chapters
// -------------------------------------------------------------------------

/// One chapter in a title's chapter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub id: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(rename = "translatedLanguage", default)]
    pub translated_language: Option<String>,
    #[serde(default)]
    pub scanlator: Option<String>,
    #[serde(rename = "publishAt", default)]
    pub publish_at: Option<DateTime<Utc>>,
}

impl ChapterSummary {
    /// Label like "Vol. 2 Ch. 13: The Title", with whatever parts exist.
    pub fn label(&self) -> String {
        let mut label = String::new();
        if let Some(volume) = &self.volume {
            label.push_str(&format!("Vol. {volume} "));
        }
        match &self.chapter {
            Some(chapter) => label.push_str(&format!("Ch. {chapter}")),
            None => label.push_str("Oneshot"),
        }
        if let Some(title) = &self.title {
            if !title.is_empty() {
                label.push_str(&format!(": {title}"));
            }
        }
        label
    }
}

/// A chapter with its page image URLs, as served by the item endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDetail {
    #[serde(flatten)]
    pub summary: ChapterSummary,
    #[serde(rename = "pagesData", default)]
    pub page_urls: Vec<String>,
    #[serde(default)]
    pub manga: Option<ChapterMangaRef>,
}

/// The parent title embedded in a chapter item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMangaRef {
    pub id: String,
    #[serde(default)]
    pub title: LocalizedText,
}
