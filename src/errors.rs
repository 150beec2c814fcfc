use thiserror::Error;

/// Pipeline-stage errors. Each variant maps to one failure class so callers
/// can decide between "abort the run", "skip this article" and "skip this
/// image" without inspecting strings.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Archive index or article page unreachable, or non-success status.
    /// Fatal for discovery; per-article for extraction.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Source image unreachable or non-success status. The article proceeds
    /// without the image.
    #[error("image fetch failed for {url}: {reason}")]
    ImageFetch { url: String, reason: String },

    /// Source image bytes could not be decoded or re-encoded.
    #[error("image processing failed for {url}: {reason}")]
    ImageProcess { url: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Non-2xx from the destination content API.
    #[error("destination request failed ({status}): {message}")]
    Destination { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob upload failed for {key}: {reason}")]
    Upload { key: String, reason: String },
}
