use std::sync::Arc;

use crate::{error::AppError, utils::config::AppConfig};

/// Token counter used for section sizes and chunking thresholds.
///
/// Same backend split as [`super::embedding::EmbeddingProvider`]: a real
/// tokenizer for production and a deterministic heuristic for tests.
#[derive(Clone)]
pub enum TokenCounter {
    HuggingFace(Arc<tokenizers::Tokenizer>),
    Heuristic,
}

impl TokenCounter {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::pretrained(&config.tokenizer_model)
    }

    pub fn pretrained(identifier: &str) -> Result<Self, AppError> {
        let tokenizer = tokenizers::Tokenizer::from_pretrained(identifier, None)
            .map_err(|e| AppError::InternalError(format!("failed to initialize tokenizer: {e}")))?;
        Ok(Self::HuggingFace(Arc::new(tokenizer)))
    }

    pub const fn heuristic() -> Self {
        Self::Heuristic
    }

    pub fn count(&self, text: &str) -> Result<usize, AppError> {
        match self {
            Self::HuggingFace(tokenizer) => {
                let encoding = tokenizer.encode(text, false).map_err(|e| {
                    AppError::InternalError(format!("failed to tokenize text: {e}"))
                })?;
                Ok(encoding.len())
            }
            Self::Heuristic => Ok(heuristic_count(text)),
        }
    }
}

fn heuristic_count(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_counts_words() {
        let counter = TokenCounter::heuristic();
        assert_eq!(counter.count("adaptive section chunking").expect("count"), 3);
        assert_eq!(counter.count("").expect("count"), 0);
        assert_eq!(counter.count("  \n\t ").expect("count"), 0);
    }

    #[test]
    fn test_heuristic_splits_on_punctuation() {
        let counter = TokenCounter::heuristic();
        assert_eq!(
            counter.count("chunk-level metadata, per section.").expect("count"),
            5
        );
    }
}
