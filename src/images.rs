use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use crate::errors::PipelineError;
use crate::storage::BlobStore;

/// Descending target widths for the responsive renditions.
pub const RENDITION_WIDTHS: [u32; 7] = [1920, 1600, 1280, 1024, 800, 640, 320];

/// Re-encode quality for both the JPEG original and the WebP renditions.
const QUALITY: u8 = 85;

#[derive(Debug)]
pub struct RenditionSet {
    pub name_root: String,
    /// `{name_root}.jpg` followed by one `{name_root}-{width}.webp` per
    /// target width, in descending width order.
    pub blob_names: Vec<String>,
}

/// Fetches a source image and persists one lightly-compressed original plus
/// the responsive rendition series. All renditions of one image share the
/// caller-supplied name root; re-running overwrites in place.
pub struct ImageRenditionPipeline {
    client: reqwest::Client,
    store: Arc<dyn BlobStore>,
}

impl ImageRenditionPipeline {
    pub fn new(client: reqwest::Client, store: Arc<dyn BlobStore>) -> Self {
        Self { client, store }
    }

    pub async fn process(
        &self,
        source_url: &str,
        name_root: &str,
    ) -> Result<RenditionSet, PipelineError> {
        let bytes = self.fetch_bytes(source_url).await?;
        let img = image::load_from_memory(&bytes).map_err(|e| PipelineError::ImageProcess {
            url: source_url.to_string(),
            reason: e.to_string(),
        })?;
        let (src_w, src_h) = (img.width(), img.height());
        debug!("Processing {} ({}x{}) as '{}'", source_url, src_w, src_h, name_root);

        let mut blob_names = Vec::with_capacity(RENDITION_WIDTHS.len() + 1);

        // Full-resolution copy, re-encoded at moderate compression.
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, QUALITY)
            .encode_image(&img.to_rgb8())
            .map_err(|e| PipelineError::ImageProcess {
                url: source_url.to_string(),
                reason: e.to_string(),
            })?;
        let original_key = format!("{name_root}.jpg");
        self.store.put(&original_key, &jpeg, "image/jpeg").await?;
        blob_names.push(original_key);

        for width in RENDITION_WIDTHS {
            let height = (f64::from(src_h) * f64::from(width) / f64::from(src_w)).round() as u32;
            let height = height.max(1);
            let resized = img.resize_exact(width, height, FilterType::Lanczos3);
            let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
            let encoded = webp::Encoder::from_image(&rgb)
                .map_err(|e| PipelineError::ImageProcess {
                    url: source_url.to_string(),
                    reason: e.to_string(),
                })?
                .encode(f32::from(QUALITY));

            let key = format!("{name_root}-{width}.webp");
            self.store.put(&key, &encoded, "image/webp").await?;
            blob_names.push(key);
        }

        Ok(RenditionSet {
            name_root: name_root.to_string(),
            blob_names,
        })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::ImageFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(PipelineError::ImageFetch {
                url: url.to_string(),
                reason: format!("status {}", resp.status()),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| PipelineError::ImageFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(w, h, image::Rgb([200, 30, 30])));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    async fn run_pipeline(src_w: u32, src_h: u32) -> (Arc<MemoryStore>, RenditionSet) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/pic.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(png_bytes(src_w, src_h)),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let pipeline = ImageRenditionPipeline::new(reqwest::Client::new(), store.clone());
        let set = pipeline
            .process(&format!("{}/media/pic.png", server.uri()), "article-0")
            .await
            .unwrap();
        (store, set)
    }

    #[tokio::test]
    async fn produces_original_plus_seven_renditions() {
        let (store, set) = run_pipeline(64, 32).await;
        assert_eq!(set.blob_names.len(), 8);
        assert_eq!(set.blob_names[0], "article-0.jpg");
        assert_eq!(set.blob_names[1], "article-0-1920.webp");
        assert_eq!(set.blob_names[7], "article-0-320.webp");
        assert_eq!(store.keys().len(), 8);

        // Original decodes back as a JPEG at source resolution.
        let jpeg = store.get("article-0.jpg").unwrap();
        let original = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((original.width(), original.height()), (64, 32));
    }

    #[tokio::test]
    async fn renditions_preserve_aspect_ratio() {
        let (store, _) = run_pipeline(1000, 500).await;
        for width in RENDITION_WIDTHS {
            let bytes = store.get(&format!("article-0-{width}.webp")).unwrap();
            let decoded = webp::Decoder::new(&bytes).decode().unwrap();
            assert_eq!(decoded.width(), width);
            let expected = (500.0 * f64::from(width) / 1000.0).round() as u32;
            assert_eq!(decoded.height(), expected);
        }
    }

    #[tokio::test]
    async fn unreachable_image_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let pipeline = ImageRenditionPipeline::new(reqwest::Client::new(), store.clone());
        let err = pipeline
            .process(&format!("{}/gone.png", server.uri()), "x")
            .await;
        assert!(matches!(err, Err(PipelineError::ImageFetch { .. })));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn undecodable_bytes_are_a_process_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let pipeline = ImageRenditionPipeline::new(reqwest::Client::new(), store);
        let err = pipeline
            .process(&format!("{}/bad.png", server.uri()), "x")
            .await;
        assert!(matches!(err, Err(PipelineError::ImageProcess { .. })));
    }
}
