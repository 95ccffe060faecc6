//! Reading-time estimation

use serde::Serialize;

use super::post::ContentBlock;

/// Fixed reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Word count and whole-minute estimate for a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadingTime {
    pub words: usize,
    pub minutes: usize,
}

impl ReadingTime {
    pub fn from_content(content: &[ContentBlock]) -> Self {
        Self::from_words(count_words(content))
    }

    pub fn from_words(words: usize) -> Self {
        Self {
            words,
            minutes: minutes_for_words(words),
        }
    }
}

/// Total words across all block bodies. Headings are not counted.
pub fn count_words(content: &[ContentBlock]) -> usize {
    content.iter().map(|block| block.body.word_count()).sum()
}

/// `ceil(words / WORDS_PER_MINUTE)`; empty content reads in 0 minutes
pub fn minutes_for_words(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}
