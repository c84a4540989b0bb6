use anyhow::{Context, Result};
use bpaf::Bpaf;
use tankobon_catalog::{ClientTrait, Tag};
use tracing::instrument;

use crate::commands::catalog_client;
use crate::config::Config;
use crate::utils::message;

/// Show a title with its chapter list
#[derive(Debug, Bpaf, Clone)]
pub struct Show {
    /// Display the title as JSON
    #[bpaf(long)]
    json: bool,

    /// Only list chapters in this translated language
    #[bpaf(short, long, argument("LANG"))]
    language: Option<String>,

    /// Id of the title to show
    #[bpaf(positional("manga-id"))]
    manga_id: String,
}

impl Show {
    #[instrument(name = "show", fields(manga_id = self.manga_id), skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let (client, _session) = catalog_client(&config)?;

        let detail = client
            .manga(&self.manga_id)
            .await
            .context("Could not fetch the title")?;
        let chapters = client
            .chapters(&self.manga_id, self.language.as_deref())
            .await
            .context("Could not fetch the chapter list")?;

        if self.json {
            let payload = serde_json::json!({ "manga": detail, "chapters": chapters });
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok(());
        }

        println!("{}", detail.display_title());
        if let Some(status) = &detail.status {
            println!("Status: {status}");
        }
        if let Some(rating) = &detail.content_rating {
            println!("Content rating: {rating}");
        }
        if let Some(year) = detail.year {
            println!("Year: {year}");
        }
        if let Some(rating) = &detail.rating {
            println!("Rating: {:.2} ({} votes)", rating.average, rating.count);
        }
        if let Some(stats) = &detail.statistics {
            println!("Follows: {}, views: {}", stats.follows, stats.views);
        }
        if !detail.authors.is_empty() {
            println!("Authors: {}", detail.authors.join(", "));
        }
        if !detail.artists.is_empty() {
            println!("Artists: {}", detail.artists.join(", "));
        }
        if let Some(cover) = &detail.cover {
            println!("Cover: {}", cover.url(&config.tankobon.cover_base_url));
        }
        if !detail.tags.is_empty() {
            let names = detail.tags.iter().map(Tag::display_name).collect::<Vec<_>>();
            println!("Tags: {}", names.join(", "));
        }
        println!();
        println!("{}", detail.display_description());
        println!();

        if chapters.is_empty() {
            message::plain("No chapters available.");
            return Ok(());
        }
        println!("Chapters:");
        for chapter in &chapters {
            let language = chapter.translated_language.as_deref().unwrap_or("??");
            let mut line = format!("  {:<40}  [{}]  {}", chapter.id, language, chapter.label());
            if let Some(scanlator) = &chapter.scanlator {
                line.push_str(&format!("  ({scanlator})"));
            }
            println!("{line}");
        }

        Ok(())
    }
}
