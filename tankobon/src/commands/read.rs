use anyhow::{Context, Result};
use bpaf::Bpaf;
use tankobon_catalog::ClientTrait;
use tracing::instrument;

use crate::commands::catalog_client;
use crate::config::Config;
use crate::utils::message;

/// Show a chapter and its page image URLs
#[derive(Debug, Bpaf, Clone)]
pub struct Read {
    /// Display the chapter as JSON
    #[bpaf(long)]
    json: bool,

    /// Id of the chapter to read
    #[bpaf(positional("chapter-id"))]
    chapter_id: String,
}

impl Read {
    #[instrument(name = "read", fields(chapter_id = self.chapter_id), skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let (client, _session) = catalog_client(&config)?;

        let chapter = client
            .chapter(&self.chapter_id)
            .await
            .context("Could not fetch the chapter")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&chapter)?);
            return Ok(());
        }

        match &chapter.manga {
            Some(manga) => println!(
                "{} - {}",
                manga.title.display_or("Untitled"),
                chapter.summary.label()
            ),
            None => println!("{}", chapter.summary.label()),
        }
        if let Some(pages) = chapter.summary.pages {
            println!("Pages: {pages}");
        }
        if let Some(scanlator) = &chapter.summary.scanlator {
            println!("Scanlation: {scanlator}");
        }
        println!();

        if chapter.page_urls.is_empty() {
            message::warning("This chapter has no page data.");
            return Ok(());
        }
        for url in &chapter.page_urls {
            println!("{url}");
        }

        Ok(())
    }
}
