use common::{
    error::AppError, storage::types::bounding_box::BoundingBox, utils::config::AppConfig,
};
use serde::Serialize;
use tracing::debug;

use crate::structure::Section;

/// Token thresholds steering the merge pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChunkerConfig {
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub large_section_threshold: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_tokens: 800,
            max_tokens: 1800,
            large_section_threshold: 1200,
        }
    }
}

impl ChunkerConfig {
    pub const fn from_app_config(config: &AppConfig) -> Self {
        Self {
            min_tokens: config.chunk_min_tokens,
            max_tokens: config.chunk_max_tokens,
            large_section_threshold: config.large_section_threshold,
        }
    }

    /// Requires `0 < min_tokens < large_section_threshold <= max_tokens`.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_tokens == 0
            || self.min_tokens >= self.large_section_threshold
            || self.large_section_threshold > self.max_tokens
        {
            return Err(AppError::Configuration(format!(
                "invalid chunking thresholds: require 0 < min_tokens ({}) < large_section_threshold ({}) <= max_tokens ({})",
                self.min_tokens, self.large_section_threshold, self.max_tokens
            )));
        }
        Ok(())
    }
}

/// The retrievable unit: one or more whole sections, with parallel
/// per-section provenance lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionChunk {
    pub chunk_id: String,
    pub text: String,
    pub token_count: usize,
    pub section_headings: Vec<String>,
    pub section_pages: Vec<u32>,
    pub section_bboxes: Vec<BoundingBox>,
    pub primary_section: String,
    pub num_sections: usize,
}

/// Section-aware merge pass.
///
/// Small neighboring sections are merged up to `max_tokens`; a section above
/// `large_section_threshold` always stands alone. `min_tokens` is advisory: a
/// trailing remainder below it is still emitted rather than dropped.
pub struct AdaptiveSectionChunker {
    config: ChunkerConfig,
}

impl AdaptiveSectionChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Single left-to-right pass over the document's sections. Every section
    /// lands in exactly one chunk and section order is preserved.
    pub fn chunk(&self, document_id: &str, sections: &[Section]) -> Vec<SectionChunk> {
        let mut chunks: Vec<SectionChunk> = Vec::new();
        let mut current: Vec<&Section> = Vec::new();
        let mut current_tokens = 0usize;

        for section in sections {
            if section.token_count > self.config.large_section_threshold {
                // Large enough to stand on its own; merging would dilute it.
                if !current.is_empty() {
                    chunks.push(flush(document_id, chunks.len(), &current));
                    current.clear();
                    current_tokens = 0;
                }
                chunks.push(flush(document_id, chunks.len(), &[section]));
            } else if current_tokens + section.token_count <= self.config.max_tokens {
                current.push(section);
                current_tokens += section.token_count;
            } else {
                if !current.is_empty() {
                    chunks.push(flush(document_id, chunks.len(), &current));
                }
                current = vec![section];
                current_tokens = section.token_count;
            }
        }

        // Trailing remainder is emitted even below min_tokens
        if !current.is_empty() {
            chunks.push(flush(document_id, chunks.len(), &current));
        }

        debug!(
            document_id,
            sections = sections.len(),
            chunks = chunks.len(),
            "adaptive chunking finished"
        );

        chunks
    }
}

fn flush(document_id: &str, sequence: usize, sections: &[&Section]) -> SectionChunk {
    let text = sections
        .iter()
        .map(|section| {
            if section.heading.is_empty() {
                section.text.clone()
            } else {
                format!("{}\n\n{}", section.heading, section.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let section_headings: Vec<String> =
        sections.iter().map(|s| s.heading.clone()).collect();
    let primary_section = section_headings.first().cloned().unwrap_or_default();
    let num_sections = section_headings.len();

    SectionChunk {
        chunk_id: format!("{document_id}-{sequence}"),
        text,
        token_count: sections.iter().map(|s| s.token_count).sum(),
        section_pages: sections.iter().map(|s| s.page_no).collect(),
        section_bboxes: sections.iter().map(|s| s.bbox).collect(),
        section_headings,
        primary_section,
        num_sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(heading: &str, token_count: usize, page_no: u32) -> Section {
        // Body text content is irrelevant to the merge decisions; the pass
        // only reads token_count.
        Section {
            heading: heading.to_string(),
            level: if heading.is_empty() { 1 } else { 2 },
            page_no,
            bbox: BoundingBox::new(0.0, 0.0, 612.0, 792.0),
            text: format!("body of {heading}\n"),
            token_count,
        }
    }

    fn chunker() -> AdaptiveSectionChunker {
        AdaptiveSectionChunker::new(ChunkerConfig::default()).expect("valid config")
    }

    fn total_tokens(sections: &[Section]) -> usize {
        sections.iter().map(|s| s.token_count).sum()
    }

    #[test]
    fn test_config_validation_rejects_bad_orderings() {
        for (min, max, threshold) in [
            (0usize, 1800usize, 1200usize),
            (1200, 1800, 1200),
            (1300, 1800, 1200),
            (800, 1100, 1200),
        ] {
            let config = ChunkerConfig {
                min_tokens: min,
                max_tokens: max,
                large_section_threshold: threshold,
            };
            assert!(
                matches!(config.validate(), Err(AppError::Configuration(_))),
                "expected configuration error for min={min} max={max} threshold={threshold}"
            );
        }

        ChunkerConfig::default().validate().expect("default config is valid");
    }

    #[test]
    fn test_dense_prose_scenario() {
        // Five 400-token sections: the greedy pass packs four (1600 <= 1800)
        // and the fifth starts a new chunk.
        let sections: Vec<Section> = (1..=5)
            .map(|i| section(&format!("Section {i}"), 400, i))
            .collect();

        let chunks = chunker().chunk("doc", &sections);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].num_sections, 4);
        assert_eq!(chunks[0].token_count, 1600);
        assert_eq!(chunks[1].num_sections, 1);
        assert_eq!(chunks[1].token_count, 400);
    }

    #[test]
    fn test_slide_deck_scenario() {
        // Fifteen slide-sized sections; none crosses the large-section
        // threshold, so none may stand alone, and no merged chunk may
        // exceed max_tokens.
        let sections: Vec<Section> = (1..=15)
            .map(|i| section(&format!("Slide {i}"), 150, i))
            .collect();

        let chunks = chunker().chunk("deck", &sections);

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.token_count <= 1800);
            assert!(chunk.num_sections > 1, "no slide should be standalone");
        }
        let chunk_total: usize = chunks.iter().map(|c| c.token_count).sum();
        assert_eq!(chunk_total, total_tokens(&sections));
    }

    #[test]
    fn test_single_oversized_section_scenario() {
        let sections = vec![
            section("Appendix", 5000, 1),
            section("Notes A", 200, 2),
            section("Notes B", 200, 2),
            section("Notes C", 200, 3),
        ];

        let chunks = chunker().chunk("doc", &sections);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].num_sections, 1);
        assert_eq!(chunks[0].token_count, 5000);
        assert_eq!(chunks[0].primary_section, "Appendix");
        assert_eq!(chunks[1].num_sections, 3);
        assert_eq!(chunks[1].token_count, 600);
    }

    #[test]
    fn test_oversized_section_flushes_accumulator_first() {
        let sections = vec![
            section("Small 1", 300, 1),
            section("Small 2", 300, 1),
            section("Huge", 2000, 2),
            section("Small 3", 300, 3),
        ];

        let chunks = chunker().chunk("doc", &sections);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].section_headings, vec!["Small 1", "Small 2"]);
        assert_eq!(chunks[1].section_headings, vec!["Huge"]);
        assert_eq!(chunks[2].section_headings, vec!["Small 3"]);
    }

    #[test]
    fn test_token_conservation() {
        let shapes: Vec<Vec<usize>> = vec![
            vec![],
            vec![10],
            vec![0, 0, 0],
            vec![400, 400, 400, 400, 400],
            vec![1300, 100, 5000, 1, 1799, 0, 650],
            vec![1800, 1800, 1800],
            (0..50).map(|i| i * 37 % 1900).collect(),
        ];

        for tokens in shapes {
            let sections: Vec<Section> = tokens
                .iter()
                .enumerate()
                .map(|(i, t)| section(&format!("H{i}"), *t, 1))
                .collect();
            let chunks = chunker().chunk("doc", &sections);

            let chunk_total: usize = chunks.iter().map(|c| c.token_count).sum();
            assert_eq!(
                chunk_total,
                total_tokens(&sections),
                "token conservation violated for shape {tokens:?}"
            );
        }
    }

    #[test]
    fn test_large_section_isolation_and_max_bound() {
        let tokens = [1300usize, 100, 5000, 1, 1799, 0, 650, 1201, 40];
        let sections: Vec<Section> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| section(&format!("H{i}"), *t, 1))
            .collect();

        let chunks = chunker().chunk("doc", &sections);

        // H0 (1300), H2 (5000) and H7 (1201) cross the threshold
        for chunk in &chunks {
            let contains_large = chunk
                .section_headings
                .iter()
                .any(|h| matches!(h.as_str(), "H0" | "H2" | "H7"));
            if contains_large {
                assert_eq!(
                    chunk.num_sections, 1,
                    "large section must stand alone: {chunk:?}"
                );
            } else {
                assert!(
                    chunk.token_count <= 1800,
                    "merged chunk exceeds max_tokens: {chunk:?}"
                );
            }
        }
    }

    #[test]
    fn test_order_preservation_and_parallel_lists() {
        let tokens = [500usize, 900, 1250, 0, 300, 2000, 10];
        let sections: Vec<Section> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| section(&format!("H{i}"), *t, i as u32 + 1))
            .collect();

        let chunks = chunker().chunk("doc", &sections);

        let mut seen: Vec<String> = Vec::new();
        for chunk in &chunks {
            assert!(chunk.num_sections >= 1);
            assert_eq!(chunk.section_headings.len(), chunk.num_sections);
            assert_eq!(chunk.section_pages.len(), chunk.num_sections);
            assert_eq!(chunk.section_bboxes.len(), chunk.num_sections);
            assert_eq!(chunk.primary_section, chunk.section_headings[0]);
            seen.extend(chunk.section_headings.iter().cloned());
        }

        let expected: Vec<String> = sections.iter().map(|s| s.heading.clone()).collect();
        assert_eq!(seen, expected, "section order must be preserved");
    }

    #[test]
    fn test_zero_token_sections_merge_freely() {
        // Headings with no body must not produce spurious standalone chunks.
        let sections = vec![
            section("Empty 1", 0, 1),
            section("Empty 2", 0, 1),
            section("Content", 500, 2),
            section("Empty 3", 0, 3),
        ];

        let chunks = chunker().chunk("doc", &sections);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].num_sections, 4);
        assert_eq!(chunks[0].token_count, 500);
    }

    #[test]
    fn test_trailing_undersized_remainder_is_emitted() {
        let sections = vec![section("Only", 12, 1)];
        let chunks = chunker().chunk("doc", &sections);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].token_count, 12);
    }

    #[test]
    fn test_chunk_ids_are_document_scoped_and_sequential() {
        let sections: Vec<Section> = (1..=5)
            .map(|i| section(&format!("S{i}"), 1000, i))
            .collect();

        let chunks = chunker().chunk("report-7", &sections);

        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, format!("report-7-{idx}"));
        }
    }

    #[test]
    fn test_chunk_text_joins_heading_and_body() {
        let mut first = section("Intro", 2, 1);
        first.text = "Opening words.\n".to_string();
        let mut second = section("Next", 2, 1);
        second.text = "More words.\n".to_string();

        let chunks = chunker().chunk("doc", &[first, second]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].text,
            "Intro\n\nOpening words.\n\n\nNext\n\nMore words.\n"
        );
    }

    #[test]
    fn test_headingless_section_text_has_no_heading_fragment() {
        let mut synthesized = section("", 3, 1);
        synthesized.text = "Preamble text here.\n".to_string();

        let chunks = chunker().chunk("doc", &[synthesized]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Preamble text here.\n");
        assert_eq!(chunks[0].primary_section, "");
        assert_eq!(chunks[0].num_sections, 1);
    }
}
