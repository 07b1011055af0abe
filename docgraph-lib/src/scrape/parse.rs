//! HTML extraction rules for each documentation source.
//!
//! All functions are pure: they take a page body and the url it came from and
//! return well-formed [`Document`]s. Items without a title or without content
//! are skipped.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::document::{DocMetadata, DocType, Document};
use crate::{Error, Result};

const STD_CATEGORY: &str = "module";
const CRATE_CATEGORY: &str = "crate-doc";
const BOOK_CATEGORY: &str = "book";

/// Elements whose text is never content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "head", "nav"];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Scrape(format!("invalid CSS selector {css:?}: {e:?}")))
}

/// Concatenates text fragments, collapsing every run of whitespace into one space.
fn clean_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let raw: String = parts.collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|e| clean_text(e.text()))
        .unwrap_or_default()
}

/// Last meaningful path segment of a page url: `.../std/` gives `std`,
/// `.../std/collections/index.html` gives `collections`.
fn module_from_url(page_url: &str) -> Option<String> {
    page_url
        .split(['#', '?'])
        .next()?
        .split('/')
        .filter(|s| !s.is_empty() && *s != "index.html")
        .last()
        .filter(|s| !s.ends_with(':'))
        .map(String::from)
}

fn resolve(page_url: &str, href: &str) -> Option<String> {
    url::Url::parse(page_url)
        .and_then(|base| base.join(href))
        .ok()
        .map(|u| u.to_string())
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

struct StdPage<'a> {
    page_url: &'a str,
    module: Option<String>,
    seen: HashSet<String>,
    docs: Vec<Document>,
}

impl StdPage<'_> {
    fn push(&mut self, title: String, content: String, href: Option<&str>) {
        if title.is_empty() || content.is_empty() {
            return;
        }

        let url = href
            .and_then(|href| resolve(self.page_url, href))
            .unwrap_or_else(|| format!("{}#{}", self.page_url, title.to_lowercase()));
        if !self.seen.insert(url.clone()) {
            return;
        }

        self.docs.push(Document {
            title,
            content,
            url,
            doc_type: DocType::Std,
            metadata: DocMetadata {
                module: self.module.clone(),
                category: Some(STD_CATEGORY.to_string()),
                ..Default::default()
            },
        });
    }
}

/// Items listed on a standard library index page.
///
/// Understands `.module-item` blocks as well as rustdoc's item tables, both
/// the `dl.item-table` (`dt`/`dd`) and the `.item-row` layouts.
pub fn parse_std_index(html: &str, page_url: &str) -> Result<Vec<Document>> {
    let document = Html::parse_document(html);
    let mut page = StdPage {
        page_url,
        module: module_from_url(page_url),
        seen: HashSet::new(),
        docs: Vec::new(),
    };

    let link = selector("a[href]")?;

    let module_item = selector(".module-item")?;
    let module_item_title = selector(".module-item-title")?;
    let docblock = selector(".docblock")?;
    for item in document.select(&module_item) {
        let title = first_text(item, &module_item_title);
        let content = first_text(item, &docblock);
        let href = item.select(&link).next().and_then(|a| a.value().attr("href"));
        page.push(title, content, href);
    }

    let table_name = selector("dl.item-table > dt")?;
    for dt in document.select(&table_name) {
        let title = clean_text(dt.text());
        let href = dt.select(&link).next().and_then(|a| a.value().attr("href"));
        let content = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .filter(|e| e.value().name() == "dd")
            .map(|dd| clean_text(dd.text()))
            .unwrap_or_default();
        page.push(title, content, href);
    }

    let item_row = selector(".item-row")?;
    let item_name = selector(".item-name")?;
    let item_desc = selector(".desc")?;
    for row in document.select(&item_row) {
        let title = first_text(row, &item_name);
        let content = first_text(row, &item_desc);
        let href = row.select(&link).next().and_then(|a| a.value().attr("href"));
        page.push(title, content, href);
    }

    Ok(page.docs)
}

/// Doc blocks on a crate page, each titled by the first heading of its section.
pub fn parse_crate_page(html: &str, page_url: &str) -> Result<Vec<Document>> {
    let document = Html::parse_document(html);
    let docblock = selector(".docblock")?;
    let heading = selector("h1, h2, h3")?;

    let mut fragments: HashMap<String, usize> = HashMap::new();
    let mut docs = Vec::new();

    for block in document.select(&docblock) {
        let Some(section) = block
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "section")
        else {
            continue;
        };

        let title = first_text(section, &heading);
        let content = clean_text(block.text());
        if title.is_empty() || content.is_empty() {
            continue;
        }

        // several blocks can share a page; the fragment keeps urls unique
        let slug = slugify(&title);
        let count = fragments.entry(slug.clone()).or_insert(0);
        *count += 1;
        let fragment = if *count == 1 {
            slug
        } else {
            format!("{slug}-{count}")
        };

        docs.push(Document {
            title,
            content,
            url: format!("{page_url}#{fragment}"),
            doc_type: DocType::Crate,
            metadata: DocMetadata {
                category: Some(CRATE_CATEGORY.to_string()),
                ..Default::default()
            },
        });
    }

    Ok(docs)
}

/// Chapters listed in a book's table of contents.
///
/// Content is left empty; see [`extract_main_text`] for filling it in from
/// the chapter page.
pub fn parse_book_toc(html: &str, book_url: &str) -> Result<Vec<Document>> {
    let document = Html::parse_document(html);
    let chapter = selector(".chapter-item")?;
    let link = selector("a[href]")?;
    let base = book_url.trim_end_matches('/');

    let mut seen = HashSet::new();
    let mut docs = Vec::new();

    for item in document.select(&chapter) {
        let Some(anchor) = item.select(&link).next() else {
            continue;
        };
        let title = clean_text(anchor.text());
        let href = anchor.value().attr("href").unwrap_or_default().trim_start_matches("./");
        if title.is_empty() || href.is_empty() {
            continue;
        }

        let url = format!("{base}/{href}");
        if !seen.insert(url.clone()) {
            continue;
        }

        docs.push(Document {
            title,
            content: String::new(),
            url,
            doc_type: DocType::Guide,
            metadata: DocMetadata {
                category: Some(BOOK_CATEGORY.to_string()),
                ..Default::default()
            },
        });
    }

    Ok(docs)
}

/// Visible text of a page's `main` element (or `body` when there is none).
pub fn extract_main_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let root = document
        .select(&selector("main")?)
        .next()
        .or_else(|| document.select(&selector("body").ok()?).next());

    let mut parts = Vec::new();
    if let Some(root) = root {
        collect_text(root, &mut parts);
    }
    Ok(clean_text(parts.into_iter()))
}

/// Plain text of a markdown (or HTML) document.
///
/// Fenced code blocks and inline code spans are dropped, remaining markup is
/// parsed as an HTML fragment and only its visible text is kept.
pub fn clean_markdown(content: &str) -> Result<String> {
    let fenced = Regex::new(r"```[\s\S]*?```").map_err(|e| Error::Scrape(e.to_string()))?;
    let inline = Regex::new(r"`[^`]*`").map_err(|e| Error::Scrape(e.to_string()))?;

    let without_fences = fenced.replace_all(content, " ");
    let without_code = inline.replace_all(&without_fences, "");

    let fragment = Html::parse_fragment(&without_code);
    let mut parts = Vec::new();
    collect_text(fragment.root_element(), &mut parts);
    Ok(clean_text(parts.into_iter()))
}

fn collect_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(&**text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, parts);
                }
            }
            _ => {}
        }
    }
}
