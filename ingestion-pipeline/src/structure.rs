use common::{
    error::AppError, storage::types::bounding_box::BoundingBox, utils::tokens::TokenCounter,
};
use serde::{Deserialize, Serialize};

/// Structural block kind as reported by the upstream parser service.
///
/// Closed set on purpose: a new heading level is a compile-time change, not a
/// string comparison scattered over the extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Title,
    #[serde(rename = "subtitle_1")]
    Subtitle1,
    #[serde(rename = "subtitle_2")]
    Subtitle2,
    Body,
}

impl BlockType {
    /// Heading level for heading blocks, `None` for body text.
    pub const fn heading_level(self) -> Option<u8> {
        match self {
            Self::Title => Some(1),
            Self::Subtitle1 => Some(2),
            Self::Subtitle2 => Some(3),
            Self::Body => None,
        }
    }

    pub const fn is_heading(self) -> bool {
        self.heading_level().is_some()
    }

    /// Maps a parser heading depth (0 = document title) onto the closed set.
    /// Depths below the second subtitle level clamp to `Subtitle2`.
    pub const fn from_heading_depth(depth: u8) -> Self {
        match depth {
            0 => Self::Title,
            1 => Self::Subtitle1,
            _ => Self::Subtitle2,
        }
    }
}

/// One typed block from the parsed document's ordered stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub text: String,
    pub page_no: u32,
    pub bbox: BoundingBox,
}

/// A structurally-delimited unit of the document: a heading plus the body
/// text that follows it, up to the next heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub level: u8,
    pub page_no: u32,
    pub bbox: BoundingBox,
    pub text: String,
    pub token_count: usize,
}

impl Section {
    fn open(heading: String, level: u8, page_no: u32, bbox: BoundingBox) -> Self {
        Self {
            heading,
            level,
            page_no,
            bbox,
            text: String::new(),
            token_count: 0,
        }
    }
}

/// Boundary with the parser service: a JSON block stream either deserializes
/// into the closed block model or the document fails structure parsing.
pub fn parse_blocks(payload: &str) -> Result<Vec<Block>, AppError> {
    serde_json::from_str(payload)
        .map_err(|e| AppError::ParseStructure(format!("malformed block stream: {e}")))
}

/// Folds the ordered block stream into sections.
///
/// Heading blocks close the accumulating section and open a new one; body
/// blocks append to the current section's text. A document that opens with
/// body text gets a synthesized headingless level-1 section. Heading-only
/// sections are kept: zero body tokens still carries positional signal.
pub fn extract_sections(
    blocks: &[Block],
    counter: &TokenCounter,
) -> Result<Vec<Section>, AppError> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for block in blocks {
        match block.block_type.heading_level() {
            Some(level) => {
                if let Some(section) = current.take() {
                    sections.push(section);
                }
                current = Some(Section::open(
                    block.text.clone(),
                    level,
                    block.page_no,
                    block.bbox,
                ));
            }
            None => {
                let section = current.get_or_insert_with(|| {
                    Section::open(String::new(), 1, block.page_no, block.bbox)
                });
                section.text.push_str(&block.text);
                section.text.push('\n');
                section.token_count = counter.count(&section.text)?;
            }
        }
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }

    Ok(sections)
}
