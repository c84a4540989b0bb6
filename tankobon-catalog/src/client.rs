//! HTTP client for the manga catalog service.

use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use async_stream::try_stream;
use futures::stream::Stream;
use futures::TryStreamExt;
use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::envelope::{CollectionEnvelope, PageMetadata};
use crate::error::{error_for_response, AuthError, CatalogClientError};
use crate::filter::FilterState;
use crate::types::{
    CatalogEntry,
    ChapterDetail,
    ChapterSummary,
    MangaDetail,
    RawManga,
    Tag,
    User,
};

/// Page size used when de-paging the tag catalog.
const TAGS_PAGE_SIZE: u32 = 200;

/// One resolved page of the catalog list.
#[derive(Debug, Clone, Serialize)]
pub struct BrowsePage {
    pub entries: Vec<CatalogEntry>,
    pub page: PageMetadata,
}

/// Bearer token and account returned by login and token refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokens {
    pub token: String,
    pub user: User,
}

/// The read-side interface of the catalog service.
///
/// A trait so views and sessions can run against canned data in tests
/// instead of a live server.
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// Fetch one page of the published catalog under `filter`.
    async fn browse(
        &self,
        filter: &FilterState,
        page: u32,
    ) -> Result<BrowsePage, CatalogClientError>;

    /// Fetch full detail of a single title.
    async fn manga(&self, id: &str) -> Result<MangaDetail, CatalogClientError>;

    /// Fetch the chapter list of a title, optionally constrained to one
    /// translated language.
    async fn chapters(
        &self,
        manga_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<ChapterSummary>, CatalogClientError>;

    /// Fetch one chapter including its page image URLs.
    async fn chapter(&self, id: &str) -> Result<ChapterDetail, CatalogClientError>;

    /// Fetch the complete tag catalog, following `view.next` until the
    /// last page.
    async fn all_tags(&self) -> Result<Vec<Tag>, CatalogClientError>;
}

/// A client for the catalog service.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: Url,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let base_url = Url::parse(&config.catalog_url).map_err(CatalogClientError::InvalidUrl)?;
        let client = build_http_client(&config)?;
        Ok(CatalogClient { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogClientError> {
        // Url::join drops the last segment of a base without a trailing
        // slash, so splice the path in by hand.
        let joined = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(CatalogClientError::InvalidUrl)
    }

    async fn get_json<T>(
        &self,
        url: Url,
        query: &[(String, String)],
    ) -> Result<T, CatalogClientError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(CatalogClientError::Network)?;
        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }
        response.json().await.map_err(CatalogClientError::InvalidResponse)
    }

    /// Stream of tag catalog pages. A page is the last one when the view
    /// has no `next` link or the page comes back empty.
    fn tag_pages(&self) -> impl Stream<Item = Result<Vec<Tag>, CatalogClientError>> + '_ {
        try_stream! {
            let mut page = 1u32;
            loop {
                let envelope: CollectionEnvelope<Tag> = self
                    .get_json(self.endpoint("tags")?, &[
                        ("page".to_string(), page.to_string()),
                        ("itemsPerPage".to_string(), TAGS_PAGE_SIZE.to_string()),
                    ])
                    .await?;
                let has_next = envelope
                    .view
                    .as_ref()
                    .and_then(|view| view.next.as_ref())
                    .is_some();
                let done = envelope.member.is_empty() || !has_next;
                yield envelope.member;
                if done {
                    break;
                }
                page += 1;
            }
        }
    }

    /// Log in with email and password, returning the token and account
    /// to persist.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionTokens, AuthError> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            email: &'a str,
            password: &'a str,
        }

        debug!(email, "sending login request");
        let response = self
            .client
            .post(self.endpoint("login")?)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(CatalogClientError::Network)?;
        Self::session_response(response).await
    }

    /// Create an account. The service validates the fields and reports
    /// constraint violations in the error body.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        #[derive(Serialize)]
        struct RegisterRequest<'a> {
            username: &'a str,
            email: &'a str,
            password: &'a str,
            roles: [&'a str; 1],
        }

        debug!(username, email, "sending registration request");
        let response = self
            .client
            .post(self.endpoint("users")?)
            .header(header::CONTENT_TYPE, "application/ld+json")
            .header(header::ACCEPT, "application/ld+json")
            .json(&RegisterRequest {
                username,
                email,
                password,
                roles: ["ROLE_USER"],
            })
            .send()
            .await
            .map_err(CatalogClientError::Network)?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::rejection(response).await)
    }

    /// Exchange the current token for a fresh one.
    pub async fn refresh(&self, token: &str) -> Result<SessionTokens, AuthError> {
        let response = self
            .client
            .post(self.endpoint("refresh")?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(CatalogClientError::Network)?;
        Self::session_response(response).await
    }

    async fn session_response(response: reqwest::Response) -> Result<SessionTokens, AuthError> {
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        response
            .json()
            .await
            .map_err(|err| AuthError::Client(CatalogClientError::InvalidResponse(err)))
    }

    /// Prefer the message in the error body, falling back to the plain
    /// status error.
    async fn rejection(response: reqwest::Response) -> AuthError {
        match error_for_response(response).await {
            CatalogClientError::ErrorResponse { detail, .. } => AuthError::Rejected(detail),
            other => AuthError::Client(other),
        }
    }
}

impl ClientTrait for CatalogClient {
    #[instrument(skip_all, fields(page))]
    async fn browse(
        &self,
        filter: &FilterState,
        page: u32,
    ) -> Result<BrowsePage, CatalogClientError> {
        debug!(
            search = %filter.search_text,
            status = %filter.status,
            n_tags = filter.tags.len(),
            items_per_page = %filter.items_per_page,
            "sending browse request"
        );
        let envelope: CollectionEnvelope<RawManga> = self
            .get_json(self.endpoint("mangas")?, &filter.to_api_query(page))
            .await?;
        let page = PageMetadata::resolve(&envelope, page, filter.items_per_page.get());
        let entries: Vec<CatalogEntry> = envelope
            .member
            .into_iter()
            .map(CatalogEntry::from_raw)
            .collect();
        debug!(
            n_entries = entries.len(),
            total_items = page.total_items,
            total_pages = page.total_pages,
            "received catalog page"
        );
        Ok(BrowsePage { entries, page })
    }

    async fn manga(&self, id: &str) -> Result<MangaDetail, CatalogClientError> {
        let raw: RawManga = self
            .get_json(self.endpoint(&format!("mangas/{id}"))?, &[])
            .await?;
        Ok(MangaDetail::from_raw(raw))
    }

    async fn chapters(
        &self,
        manga_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<ChapterSummary>, CatalogClientError> {
        let mut query = vec![("manga.id".to_string(), manga_id.to_string())];
        if let Some(language) = language {
            query.push(("translatedLanguage".to_string(), language.to_string()));
        }
        let envelope: CollectionEnvelope<ChapterSummary> =
            self.get_json(self.endpoint("chapters")?, &query).await?;
        Ok(envelope.member)
    }

    async fn chapter(&self, id: &str) -> Result<ChapterDetail, CatalogClientError> {
        self.get_json(self.endpoint(&format!("chapters/{id}"))?, &[])
            .await
    }

    #[instrument(skip_all)]
    async fn all_tags(&self) -> Result<Vec<Tag>, CatalogClientError> {
        let tags: Vec<Tag> = self.tag_pages().try_concat().await?;
        debug!(n_tags = tags.len(), "loaded tag catalog");
        Ok(tags)
    }
}

/// Build the HTTP client used for catalog requests, with the bearer
/// token and extra headers baked in as defaults.
fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    if let Some(token) = &config.token {
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| CatalogClientError::Other(err.to_string()))?,
        );
    }

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key)
                .map_err(|err| CatalogClientError::Other(err.to_string()))?,
            header::HeaderValue::from_str(value)
                .map_err(|err| CatalogClientError::Other(err.to_string()))?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        has_token = config.token.is_some(),
        n_extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let builder = match &config.user_agent {
        Some(user_agent) => builder.user_agent(user_agent),
        None => builder.user_agent(concat!("tankobon/", env!("CARGO_PKG_VERSION"))),
    };

    builder
        .build()
        .map_err(|err| CatalogClientError::Other(err.to_string()))
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::filter::{PageSize, StatusFilter};

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(CatalogClientConfig {
            catalog_url: server.base_url(),
            ..Default::default()
        })
        .unwrap()
    }

    fn empty_envelope() -> serde_json::Value {
        json!({ "member": [], "totalItems": 0 })
    }

    #[tokio::test]
    async fn browse_sends_the_full_filter_query() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/mangas")
                .query_param("state", "published")
                .query_param("page", "2")
                .query_param("itemsPerPage", "48")
                .query_param("order[updatedAt]", "desc")
                .query_param("title", "dragon")
                .query_param("status", "ongoing")
                .query_param("tags.id", "t1");
            then.status(200).json_body(empty_envelope());
        });

        let filter = FilterState {
            search_text: "dragon".to_string(),
            status: StatusFilter::Ongoing,
            tags: ["t1".to_string()].into_iter().collect(),
            items_per_page: PageSize::new(48).unwrap(),
        };
        client_for(&server).browse(&filter, 2).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn browse_normalizes_entries_and_pagination() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/mangas");
            then.status(200).json_body(json!({
                "member": [
                    {
                        "id": "m1",
                        "title": { "ja": "進撃" },
                        "status": "ongoing",
                        "tags": ["t1", { "id": "t2", "name": { "en": "Action" } }],
                        "mainCoverArtFilename": "m1.jpg",
                    },
                ],
                "totalItems": 163,
                "view": {
                    "@id": "/api/mangas?page=2",
                    "last": "/api/mangas?page=7",
                },
            }));
        });

        let page = client_for(&server)
            .browse(&FilterState::default(), 2)
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].display_title(), "進撃");
        assert_eq!(page.entries[0].tag_ids, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(page.page, PageMetadata {
            current_page: 2,
            total_pages: 7,
            total_items: 163,
            items_per_page: 24,
        });
    }

    #[tokio::test]
    async fn server_error_body_is_surfaced() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/mangas");
            then.status(500).json_body(json!({ "detail": "boom" }));
        });

        let err = client_for(&server)
            .browse(&FilterState::default(), 1)
            .await
            .unwrap_err();
        match err {
            CatalogClientError::ErrorResponse { status, detail } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(detail, "boom");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unrecognized_error_body_is_unexpected_response() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/mangas");
            then.status(418).body("short and stout");
        });

        let err = client_for(&server)
            .browse(&FilterState::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogClientError::UnexpectedResponse(status) if status.as_u16() == 418
        ));
    }

    #[tokio::test]
    async fn all_tags_follows_next_links() {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(GET).path("/tags").query_param("page", "1");
            then.status(200).json_body(json!({
                "member": [
                    { "id": "t1", "name": { "en": "Action" }, "tagGroup": "genre" },
                    { "id": "t2", "name": { "en": "Gore" }, "tagGroup": "content" },
                ],
                "totalItems": 3,
                "view": { "next": "/api/tags?page=2" },
            }));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/tags").query_param("page", "2");
            then.status(200).json_body(json!({
                "member": [
                    { "id": "t3", "name": { "en": "Isekai" }, "tagGroup": "theme" },
                ],
                "totalItems": 3,
                "view": {},
            }));
        });

        let tags = client_for(&server).all_tags().await.unwrap();
        first.assert();
        second.assert();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[2].display_name(), "Isekai");
    }

    #[tokio::test]
    async fn bearer_token_is_sent_with_every_request() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/mangas")
                .header("authorization", "Bearer sekrit");
            then.status(200).json_body(empty_envelope());
        });

        let client = CatalogClient::new(CatalogClientConfig {
            catalog_url: server.base_url(),
            token: Some("sekrit".to_string()),
            ..Default::default()
        })
        .unwrap();
        client.browse(&FilterState::default(), 1).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn user_agent_can_be_overridden() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/mangas")
                .header("user-agent", "tankobon-tests");
            then.status(200).json_body(empty_envelope());
        });

        let client = CatalogClient::new(CatalogClientConfig {
            catalog_url: server.base_url(),
            user_agent: Some("tankobon-tests".to_string()),
            ..Default::default()
        })
        .unwrap();
        client.browse(&FilterState::default(), 1).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn login_returns_token_and_user() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/login")
                .json_body(json!({ "email": "a@example.com", "password": "pw" }));
            then.status(200).json_body(json!({
                "token": "jwt-token",
                "user": { "id": "u1", "name": "alice", "email": "a@example.com" },
            }));
        });

        let tokens = client_for(&server)
            .login("a@example.com", "pw")
            .await
            .unwrap();
        mock.assert();
        assert_eq!(tokens.token, "jwt-token");
        assert_eq!(tokens.user.name, "alice");
    }

    #[tokio::test]
    async fn rejected_login_carries_the_service_message() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/login");
            then.status(401).json_body(json!({ "error": "Invalid credentials." }));
        });

        let err = client_for(&server).login("a@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(message) if message == "Invalid credentials."));
    }

    #[tokio::test]
    async fn registration_surfaces_constraint_violations() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/users")
                .header("content-type", "application/ld+json");
            then.status(422).json_body(json!({
                "violations": [
                    { "propertyPath": "username", "message": "This value is too short." },
                    { "propertyPath": "email", "message": "This value is already used." },
                ],
            }));
        });

        let err = client_for(&server)
            .register("x", "a@example.com", "pw")
            .await
            .unwrap_err();
        mock.assert();
        assert!(matches!(
            err,
            AuthError::Rejected(message)
                if message == "This value is too short., This value is already used."
        ));
    }

    #[tokio::test]
    async fn refresh_exchanges_the_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/refresh")
                .header("authorization", "Bearer old-token");
            then.status(200).json_body(json!({
                "token": "new-token",
                "user": { "id": "u1", "name": "alice" },
            }));
        });

        let tokens = client_for(&server).refresh("old-token").await.unwrap();
        mock.assert();
        assert_eq!(tokens.token, "new-token");
    }

    #[test]
    fn endpoint_joins_without_eating_the_base_path() {
        let client = CatalogClient::new(CatalogClientConfig {
            catalog_url: "http://localhost:8000/api".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("mangas").unwrap().as_str(),
            "http://localhost:8000/api/mangas"
        );
        assert_eq!(
            client.endpoint("mangas/m1").unwrap().as_str(),
            "http://localhost:8000/api/mangas/m1"
        );
    }
}
