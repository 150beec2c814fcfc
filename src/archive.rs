use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{ContentBlock, ImagePosition, ImageSize, NormalizedDocument};

const ISO_DATE_FMT: &str = "%Y-%m-%d";

/// One article in the intermediate archive file: JSON lines, one object per
/// article, bridging the extract and migrate phases.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub title: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    pub body: String,
    #[serde(rename = "contentBlocks")]
    pub content_blocks: Vec<ArchiveBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveBlock {
    pub content: String,
    #[serde(rename = "img-src")]
    pub img_src: Option<String>,
    #[serde(rename = "img-pos")]
    pub img_pos: ImagePosition,
    #[serde(rename = "img-size")]
    pub img_size: ImageSize,
    pub order: u32,
}

impl From<&NormalizedDocument> for ArchiveRecord {
    fn from(doc: &NormalizedDocument) -> Self {
        Self {
            title: doc.title.clone(),
            date: doc.date.map(|d| d.format(ISO_DATE_FMT).to_string()),
            image: doc.main_image_url.clone(),
            body: doc.body_html.clone(),
            content_blocks: doc
                .content_blocks
                .iter()
                .map(|b| ArchiveBlock {
                    content: b.content_html.clone(),
                    img_src: b.image_url.clone(),
                    img_pos: b.image_position,
                    img_size: b.image_size,
                    order: b.priority,
                })
                .collect(),
        }
    }
}

impl ArchiveRecord {
    pub fn into_document(self) -> NormalizedDocument {
        NormalizedDocument {
            title: self.title,
            date: self
                .date
                .and_then(|d| NaiveDate::parse_from_str(&d, ISO_DATE_FMT).ok()),
            main_image_url: self.image,
            body_html: self.body,
            content_blocks: self
                .content_blocks
                .into_iter()
                .map(|b| ContentBlock {
                    content_html: b.content,
                    image_url: b.img_src,
                    image_size: b.img_size,
                    image_position: b.img_pos,
                    priority: b.order,
                })
                .collect(),
        }
    }
}

pub fn write(path: &str, docs: &[NormalizedDocument]) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = fs::File::create(path).with_context(|| format!("creating {path}"))?;
    for doc in docs {
        let record = ArchiveRecord::from(doc);
        serde_json::to_writer(&mut file, &record)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

pub fn read(path: &str) -> Result<Vec<NormalizedDocument>> {
    let file = fs::File::open(path).with_context(|| format!("opening {path}"))?;
    let mut docs = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ArchiveRecord = serde_json::from_str(&line)
            .with_context(|| format!("malformed archive record in {path}"))?;
        docs.push(record.into_document());
    }
    Ok(docs)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_legacy_field_names() {
        let doc = NormalizedDocument {
            title: Some("T".into()),
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            main_image_url: Some("https://x/i.jpg".into()),
            body_html: "<p>b</p>".into(),
            content_blocks: vec![ContentBlock {
                content_html: "<p>c</p>".into(),
                image_url: None,
                image_size: ImageSize::Large,
                image_position: ImagePosition::Center,
                priority: 0,
            }],
        };
        let json = serde_json::to_value(ArchiveRecord::from(&doc)).unwrap();
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["contentBlocks"][0]["img-size"], "Large");
        assert_eq!(json["contentBlocks"][0]["order"], 0);
    }

    #[test]
    fn archive_survives_a_write_read_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.jsonl");
        let path = path.to_str().unwrap();

        let doc = NormalizedDocument {
            title: Some("Round trip".into()),
            date: None,
            main_image_url: None,
            body_html: "<p>b</p>".into(),
            content_blocks: vec![],
        };
        write(path, std::slice::from_ref(&doc)).unwrap();
        let back = read(path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].title.as_deref(), Some("Round trip"));
        assert!(back[0].date.is_none());
    }
}
