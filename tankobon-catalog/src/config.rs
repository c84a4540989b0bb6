//! Configuration for catalog client construction.

use std::collections::BTreeMap;

/// Configuration for which catalog service to connect to and how.
#[derive(Debug, Clone, Default)]
pub struct CatalogClientConfig {
    /// Base URL of the catalog API, e.g. `http://localhost:8000/api`.
    pub catalog_url: String,
    /// Bearer token for authenticated requests.
    pub token: Option<String>,
    /// Extra headers to send with every request.
    pub extra_headers: BTreeMap<String, String>,
    /// Overrides the default `tankobon/<version>` user agent.
    pub user_agent: Option<String>,
}
