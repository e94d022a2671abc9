pub mod chunker;
pub mod index_writer;
pub mod pipeline;
pub mod provenance;
pub mod structure;

pub use chunker::{AdaptiveSectionChunker, ChunkerConfig, SectionChunk};
pub use index_writer::{ChunkIndexWriter, IndexWriteOutcome};
pub use pipeline::{IngestionPipeline, IngestionReport};
pub use provenance::{GraphProvenanceBuilder, GraphWriteOutcome};
pub use structure::{extract_sections, parse_blocks, Block, BlockType, Section};
