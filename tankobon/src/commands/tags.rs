use anyhow::{Context, Result};
use bpaf::Bpaf;
use tankobon_catalog::types::group_tags;
use tankobon_catalog::ClientTrait;
use tracing::instrument;

use crate::commands::catalog_client;
use crate::config::Config;
use crate::utils::message;

/// List the tag catalog grouped by tag group
#[derive(Debug, Bpaf, Clone)]
pub struct Tags {
    /// Display tags as a JSON array
    #[bpaf(long)]
    json: bool,
}

impl Tags {
    #[instrument(name = "tags", skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let (client, _session) = catalog_client(&config)?;

        let tags = client
            .all_tags()
            .await
            .context("Could not fetch the tag catalog")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&tags)?);
            return Ok(());
        }

        if tags.is_empty() {
            message::plain("No tags available.");
            return Ok(());
        }

        for (group, tags) in group_tags(&tags) {
            println!("{group}:");
            for tag in tags {
                println!("  {:<40}  {}", tag.id, tag.display_name());
            }
            println!();
        }

        Ok(())
    }
}
