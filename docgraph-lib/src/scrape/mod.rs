//! Documentation scrapers
//!
//! Produces [`Document`]s from three sources:
//!
//! - the standard library index (`std`)
//! - the book's table of contents (`guide`)
//! - crate pages on the registry (`crate`)
//!
//! Local markdown or HTML files become documents through [`load_file`].
//!
//! # Usage
//!
//! ```ignore
//! use docgraph_lib::{config::SourcesConfig, scrape::Scraper};
//! use futures::StreamExt;
//!
//! let scraper = Scraper::new(SourcesConfig::default())?;
//! let mut docs = scraper.documents(scraper.configured_sources());
//! while let Some(doc) = docs.next().await {
//!     println!("{}", doc?.title);
//! }
//! ```

use std::fmt;

use futures::stream::{self, Stream, StreamExt};
use tracing::{info, warn};

use crate::config::SourcesConfig;
use crate::document::Document;
use crate::Result;

mod fetch;
mod local;
pub mod parse;

pub use local::{document_from_markup, load_file};
pub use parse::{
    clean_markdown, extract_main_text, parse_book_toc, parse_crate_page, parse_std_index,
};

/// One scrapeable source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Standard library index page
    Std,
    /// The book's table of contents
    Book,
    /// A crate page on the registry
    Crate(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Std => f.write_str("std"),
            Self::Book => f.write_str("book"),
            Self::Crate(name) => write!(f, "crate {name}"),
        }
    }
}

/// Fetches and parses documentation pages.
pub struct Scraper {
    client: reqwest::Client,
    config: SourcesConfig,
}

impl Scraper {
    pub fn new(config: SourcesConfig) -> Result<Self> {
        Ok(Self {
            client: fetch::build_client()?,
            config,
        })
    }

    /// Standard library, book, then every configured crate.
    #[must_use]
    pub fn configured_sources(&self) -> Vec<Source> {
        let mut sources = vec![Source::Std, Source::Book];
        sources.extend(self.config.crates.iter().cloned().map(Source::Crate));
        sources
    }

    /// Scrape a single source.
    pub async fn scrape(&self, source: &Source) -> Result<Vec<Document>> {
        let docs = match source {
            Source::Std => self.scrape_std().await?,
            Source::Book => self.scrape_book().await?,
            Source::Crate(name) => self.scrape_crate(name).await?,
        };
        info!("Scraped {} document(s) from {}", docs.len(), source);
        Ok(docs)
    }

    pub async fn scrape_std(&self) -> Result<Vec<Document>> {
        let url = &self.config.std_url;
        let html = fetch::fetch_html(&self.client, url).await?;
        parse_std_index(&html, url)
    }

    pub async fn scrape_crate(&self, name: &str) -> Result<Vec<Document>> {
        let url = format!("{}/crates/{name}", self.config.crates_url.trim_end_matches('/'));
        let html = fetch::fetch_html(&self.client, &url).await?;
        parse_crate_page(&html, &url)
    }

    /// Book chapters; their content is fetched only when `fetch_chapters` is set.
    pub async fn scrape_book(&self) -> Result<Vec<Document>> {
        let book_url = format!("{}/book/", self.config.docs_url.trim_end_matches('/'));
        let html = fetch::fetch_html(&self.client, &book_url).await?;
        let mut docs = parse_book_toc(&html, &book_url)?;

        if self.config.fetch_chapters {
            for doc in &mut docs {
                match self.fetch_chapter(&doc.url).await {
                    Ok(content) => doc.content = content,
                    // an empty chapter still indexes under its title
                    Err(e) => warn!("Could not fetch chapter {}: {}", doc.url, e),
                }
            }
        }

        Ok(docs)
    }

    async fn fetch_chapter(&self, url: &str) -> Result<String> {
        let html = fetch::fetch_html(&self.client, url).await?;
        extract_main_text(&html)
    }

    /// Lazily scrape `sources` in order, yielding documents as each page is parsed.
    ///
    /// A source that fails yields one error and the stream moves on to the next.
    /// The stream is finite and can be restarted by calling this again.
    pub fn documents(&self, sources: Vec<Source>) -> impl Stream<Item = Result<Document>> + '_ {
        stream::iter(sources)
            .then(move |source| async move { self.scrape(&source).await })
            .flat_map(|scraped| {
                let items: Vec<Result<Document>> = match scraped {
                    Ok(docs) => docs.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn offline_config() -> SourcesConfig {
        SourcesConfig {
            docs_url: "file:///nowhere".to_string(),
            std_url: "file:///nowhere/std/".to_string(),
            crates_url: "file:///nowhere".to_string(),
            crates: vec!["tokio".to_string(), "serde".to_string()],
            fetch_chapters: false,
        }
    }

    #[test]
    fn test_configured_sources() {
        let scraper = Scraper::new(offline_config()).unwrap();
        assert_eq!(
            scraper.configured_sources(),
            vec![
                Source::Std,
                Source::Book,
                Source::Crate("tokio".to_string()),
                Source::Crate("serde".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_sources_yield_one_error_each() {
        let scraper = Scraper::new(offline_config()).unwrap();

        let items: Vec<_> = scraper.documents(scraper.configured_sources()).collect().await;

        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| matches!(i, Err(Error::Scrape(_)))));
    }

    #[tokio::test]
    async fn test_documents_restart_from_first_source() {
        let scraper = Scraper::new(offline_config()).unwrap();
        let sources = scraper.configured_sources();

        let run = |sources: Vec<Source>| {
            scraper.documents(sources).map(|item| match item {
                Ok(doc) => Ok(doc.url),
                Err(e) => Err(e.to_string()),
            })
        };
        let first: Vec<_> = run(sources.clone()).collect().await;
        let second: Vec<_> = run(sources).collect().await;

        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
        assert!(first[0].as_ref().unwrap_err().contains("nowhere/std/"));
        assert!(first[1].as_ref().unwrap_err().contains("nowhere/book/"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_scrape_std_live() {
        let scraper = Scraper::new(SourcesConfig::default()).unwrap();
        let docs = scraper.scrape(&Source::Std).await.unwrap();
        assert!(docs.iter().any(|d| d.title == "option"));
    }
}
