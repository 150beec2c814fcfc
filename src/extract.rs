use std::sync::LazyLock;

use anyhow::Result;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::discover::fetch_text;
use crate::errors::PipelineError;
use crate::model::{ContentBlock, ImagePosition, ImageSize, NormalizedDocument};
use crate::sanitize::clean_up;

/// Human-readable date format used by the legacy template, e.g.
/// "01 January 2024".
const LEGACY_DATE_FMT: &str = "%d %B %Y";

static CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.newscontent").unwrap());
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section.contentBlock").unwrap());
static CONTENT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".content").unwrap());
static DATE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".date").unwrap());

/// Distills one legacy article page into a `NormalizedDocument`. The
/// heuristics target the single known template family; anything without the
/// `div.newscontent` container is rejected.
pub struct PageExtractor {
    client: reqwest::Client,
    base: Url,
}

impl PageExtractor {
    pub fn new(config: &Config, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            base: Url::parse(&config.legacy_base)?,
        })
    }

    pub async fn extract(&self, url: &str) -> Result<NormalizedDocument, PipelineError> {
        let html = fetch_text(&self.client, url).await?;
        self.parse(url, &html)
    }

    /// Pure parsing step, split from the fetch so fixtures can exercise it.
    pub fn parse(&self, url: &str, html: &str) -> Result<NormalizedDocument, PipelineError> {
        let dom = Html::parse_document(html);
        let container = dom.select(&CONTAINER_SEL).next().ok_or_else(|| {
            PipelineError::Fetch {
                url: url.to_string(),
                reason: "no div.newscontent container".to_string(),
            }
        })?;

        let title = container
            .select(&HEADING_SEL)
            .next()
            .map(|h| h.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let main_image_url = container
            .select(&IMG_SEL)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| self.resolve(src));

        let (body_html, blocks_section) = self.collect_body(container);
        let (content_blocks, date) = match blocks_section {
            Some(section) => self.collect_blocks(section),
            None => (Vec::new(), None),
        };

        debug!(
            "Extracted '{}': {} body bytes, {} blocks",
            title.as_deref().unwrap_or("<untitled>"),
            body_html.len(),
            content_blocks.len()
        );

        Ok(NormalizedDocument {
            title,
            date,
            main_image_url,
            body_html,
            content_blocks,
        })
    }

    /// Accumulate direct <p> children up to the contentBlocks boundary.
    /// Returns the sanitized body and the boundary section, if any.
    fn collect_body<'a>(&self, container: ElementRef<'a>) -> (String, Option<ElementRef<'a>>) {
        let mut body = String::new();
        let mut boundary = None;

        for child in container.children().filter_map(ElementRef::wrap) {
            let el = child.value();
            if el.name() == "section" && has_class(child, "contentBlocks") {
                // Body accumulation stops permanently here; paragraphs after
                // the boundary are never collected.
                boundary = Some(child);
                break;
            }
            if el.name() != "p" {
                continue;
            }
            let text: String = child.text().collect();
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed == "\u{a0}" {
                continue;
            }
            body.push_str(&child.html());
        }

        (clean_up(&body), boundary)
    }

    /// Enumerate contentBlock sections in document order. The document date
    /// is the first block date that parses.
    fn collect_blocks(&self, section: ElementRef) -> (Vec<ContentBlock>, Option<NaiveDate>) {
        let mut blocks = Vec::new();
        let mut doc_date = None;

        for (priority, block) in section.select(&BLOCK_SEL).enumerate() {
            let content_html = block
                .select(&CONTENT_SEL)
                .next()
                .map(|c| clean_up(&c.inner_html()))
                .unwrap_or_default();

            // A date that fails to parse leaves the date unset; it never
            // aborts extraction.
            let date = block
                .select(&DATE_SEL)
                .next()
                .map(|d| d.text().collect::<String>())
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), LEGACY_DATE_FMT).ok());
            if doc_date.is_none() {
                doc_date = date;
            }

            let image = block.select(&IMG_SEL).next();
            let image_url = image
                .and_then(|img| img.value().attr("src"))
                .and_then(|src| self.resolve(src));
            let image_size = class_token(image, "imagesize")
                .map(|t| ImageSize::from_token(&t))
                .unwrap_or(ImageSize::Small);
            let image_position = class_token(image, "imageposition")
                .map(|t| ImagePosition::from_token(&t))
                .unwrap_or(ImagePosition::Left);

            blocks.push(ContentBlock {
                content_html,
                image_url,
                image_size,
                image_position,
                priority: priority as u32,
            });
        }

        (blocks, doc_date)
    }

    fn resolve(&self, src: &str) -> Option<String> {
        self.base.join(src).ok().map(|u| u.to_string())
    }
}

fn has_class(el: ElementRef, name: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|c| c.split_whitespace().any(|t| t == name))
}

/// Second underscore-separated segment of a `{prefix}_{token}` class on the
/// image element, e.g. `imagesize_large` → `large`.
fn class_token(image: Option<ElementRef>, prefix: &str) -> Option<String> {
    let classes = image?.value().attr("class")?;
    classes
        .split_whitespace()
        .find(|c| c.split('_').next() == Some(prefix))
        .and_then(|c| c.split('_').nth(1))
        .map(|t| t.to_string())
}

// ── Tests ──
