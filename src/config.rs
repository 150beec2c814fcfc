use anyhow::{Context, Result};

const DEFAULT_ARCHIVE_PATH: &str = "data/archive.jsonl";

/// Immutable run configuration, built once in `main` and passed by
/// reference into every component. Nothing in the pipeline reads ambient
/// state after this is constructed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the legacy site, e.g. "https://www.oldsite.example".
    pub legacy_base: String,
    /// Base URL of the destination content API.
    pub api_base: String,
    /// Bearer token for the destination API.
    pub api_token: String,
    /// Public base URL under which stored renditions are served; used when
    /// rewriting inline <img> references in body HTML.
    pub media_base: String,
    /// Path of the intermediate JSON-lines archive file.
    pub archive_path: String,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Custom S3-compatible endpoint (minio etc.); AWS when unset.
    pub endpoint: Option<String>,
}

impl Config {
    /// Read configuration from the environment. Secrets and endpoints are
    /// required; the archive path has a default.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            legacy_base: require("LEGACY_BASE_URL")?,
            api_base: require("CONTENT_API_BASE")?,
            api_token: require("CONTENT_API_TOKEN")?,
            media_base: require("MEDIA_BASE_URL")?,
            archive_path: std::env::var("ARCHIVE_PATH")
                .unwrap_or_else(|_| DEFAULT_ARCHIVE_PATH.into()),
            storage: StorageConfig {
                region: std::env::var("BLOB_REGION").unwrap_or_else(|_| "eu-west-1".into()),
                bucket: require("BLOB_BUCKET")?,
                access_key: require("BLOB_ACCESS_KEY")?,
                secret_key: require("BLOB_SECRET_KEY")?,
                endpoint: std::env::var("BLOB_ENDPOINT").ok(),
            },
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} environment variable must be set"))
}
