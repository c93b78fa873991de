use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use hn_core::{InferenceModel, Result, DEFAULT_VECTOR_SIZE};

/// Deterministic stand-in model for tests. Answers by truncating the
/// context; embeds by character frequency.
pub struct DummyModel;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

#[async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn answer_question(&self, question: &str, context: &str) -> Result<String> {
        // First 40 words of the context stand in for an answer.
        let words: Vec<&str> = context.split_whitespace().take(40).collect();
        if words.is_empty() {
            return Ok(format!("No context available for: {}", question));
        }
        Ok(words.join(" "))
    }

    async fn generate_embeddings(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0; DEFAULT_VECTOR_SIZE as usize];

        let text_len = text.chars().count().max(1) as f32;
        embedding[0] = text_len / 1000.0;

        // Character frequencies, sorted so the embedding is stable across
        // runs.
        let mut char_freq = BTreeMap::new();
        for c in text.chars() {
            *char_freq.entry(c).or_insert(0u32) += 1;
        }
        for (i, (_, count)) in char_freq
            .iter()
            .enumerate()
            .take(DEFAULT_VECTOR_SIZE as usize - 1)
        {
            embedding[i + 1] = *count as f32 / text_len;
        }

        Ok(embedding)
    }
}
