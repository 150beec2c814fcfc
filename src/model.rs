use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One legacy article after extraction, before transformation. Immutable
/// once built.
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub main_image_url: Option<String>,
    pub body_html: String,
    /// Ordered by `priority`; consumers must never re-sort.
    pub content_blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone)]
pub struct ContentBlock {
    pub content_html: String,
    pub image_url: Option<String>,
    pub image_size: ImageSize,
    pub image_position: ImagePosition,
    /// Zero-based source encounter order, unique and ascending per document.
    pub priority: u32,
}

/// Rendition size class of a block image. `Small` doubles as the deliberate
/// fallback for unknown or missing size tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    Small,
    Medium,
    Large,
}

impl ImageSize {
    /// Resolve a `imagesize_{token}` class token. Anything unrecognized
    /// maps to `Small` rather than failing.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "medium" => Self::Medium,
            "large" => Self::Large,
            _ => Self::Small,
        }
    }

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Large => 2,
        }
    }
}

/// Placement of a block image relative to its text. `Left` is the
/// deliberate fallback for unknown or missing position tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagePosition {
    Left,
    Right,
    Center,
    Top,
    Bottom,
}

impl ImagePosition {
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "right" => Self::Right,
            "center" => Self::Center,
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            _ => Self::Left,
        }
    }

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Center => 2,
            Self::Top => 3,
            Self::Bottom => 4,
        }
    }
}

/// JSON body for the destination create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_main: Option<String>,
    pub body: String,
    pub content: Vec<PayloadBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
    pub image_size: u8,
    pub image_position: u8,
    pub content: String,
    pub priority: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_tokens_resolve_to_ordinals() {
        assert_eq!(ImageSize::from_token("large").ordinal(), 2);
        assert_eq!(ImageSize::from_token("Medium").ordinal(), 1);
        assert_eq!(ImageSize::from_token("bogus").ordinal(), 0);
        assert_eq!(ImageSize::from_token("").ordinal(), 0);
    }

    #[test]
    fn position_tokens_resolve_to_ordinals() {
        assert_eq!(ImagePosition::from_token("bottom").ordinal(), 4);
        assert_eq!(ImagePosition::from_token("nonsense").ordinal(), 0);
    }

    #[test]
    fn payload_serializes_with_destination_field_names() {
        let payload = DestinationPayload {
            date: Some("2024-01-01".into()),
            title: "T".into(),
            slug: "t".into(),
            image_thumbnail: Some("t".into()),
            image_main: Some("t".into()),
            body: "<p>b</p>".into(),
            content: vec![PayloadBlock {
                image_file: None,
                image_size: 2,
                image_position: 0,
                content: "<p>x</p>".into(),
                priority: 0,
            }],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["imageThumbnail"], "t");
        assert_eq!(json["content"][0]["imageSize"], 2);
        assert!(json["content"][0].get("imageFile").is_none());
    }
}
