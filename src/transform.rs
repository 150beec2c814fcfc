use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::images::{ImageRenditionPipeline, RENDITION_WIDTHS};
use crate::model::{DestinationPayload, NormalizedDocument, PayloadBlock};

/// Inline images embedded in body text, distinct from the declared main
/// image and the content-block images.
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]*?src\s*=\s*"([^"]+)""#).unwrap());

const SMALLEST_WIDTH: u32 = RENDITION_WIDTHS[RENDITION_WIDTHS.len() - 1];

/// Maps a normalized document onto the destination schema, regenerating
/// every referenced image through the rendition pipeline on the way.
pub struct ArticleTransformer {
    media_base: String,
    images: ImageRenditionPipeline,
}

impl ArticleTransformer {
    pub fn new(media_base: String, images: ImageRenditionPipeline) -> Self {
        Self { media_base, images }
    }

    /// Returns `None` for documents without a title: no title means no
    /// dedup key and no slug, so the article cannot be migrated.
    pub async fn transform(&self, doc: &NormalizedDocument) -> Option<DestinationPayload> {
        let title = match &doc.title {
            Some(t) => t.clone(),
            None => {
                warn!("Skipping untitled document");
                return None;
            }
        };
        let slug = slugify(&title);

        // Thumbnail and main image share one rendition set. A failed image
        // never fails the article.
        let mut image_main = None;
        if let Some(url) = &doc.main_image_url {
            match self.images.process(url, &slug).await {
                Ok(set) => image_main = Some(set.name_root),
                Err(e) => warn!("Main image skipped for '{}': {}", title, e),
            }
        }

        let body = self.rewrite_body_images(&doc.body_html, &slug).await;

        let mut content = Vec::with_capacity(doc.content_blocks.len());
        for block in &doc.content_blocks {
            let mut image_file = None;
            if let Some(url) = &block.image_url {
                let name_root = format!("{}-block-{}", slug, block.priority);
                match self.images.process(url, &name_root).await {
                    Ok(set) => image_file = Some(set.name_root),
                    Err(e) => warn!("Block {} image skipped for '{}': {}", block.priority, title, e),
                }
            }
            content.push(PayloadBlock {
                image_file,
                image_size: block.image_size.ordinal(),
                image_position: block.image_position.ordinal(),
                content: block.content_html.clone(),
                priority: block.priority,
            });
        }

        Some(DestinationPayload {
            date: doc.date.map(|d| d.format("%Y-%m-%d").to_string()),
            title,
            slug,
            image_thumbnail: image_main.clone(),
            image_main,
            body,
            content,
        })
    }

    /// Regenerate inline body images and repoint each `src` at the smallest
    /// stored rendition, so body text never references the legacy host. A
    /// failed image keeps its original `src`.
    async fn rewrite_body_images(&self, body: &str, slug: &str) -> String {
        let sources: Vec<(std::ops::Range<usize>, String)> = IMG_SRC_RE
            .captures_iter(body)
            .filter_map(|c| c.get(1).map(|m| (m.range(), m.as_str().to_string())))
            .collect();
        if sources.is_empty() {
            return body.to_string();
        }

        let mut out = String::with_capacity(body.len());
        let mut last = 0;
        for (idx, (range, src)) in sources.into_iter().enumerate() {
            let name_root = format!("{slug}-body-{idx}");
            let new_src = match self.images.process(&src, &name_root).await {
                Ok(_) => format!("{}/{}-{}.webp", self.media_base, name_root, SMALLEST_WIDTH),
                Err(e) => {
                    warn!("Inline image {} kept as-is: {}", src, e);
                    src
                }
            };
            out.push_str(&body[last..range.start]);
            out.push_str(&new_src);
            last = range.end;
        }
        out.push_str(&body[last..]);
        out
    }
}

/// Lowercased alphanumeric runs joined by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

// ── Tests ──
