//! Lightweight answer-quality harness: run a set of question/reference
//! pairs through the engine and score each answer by bag-of-words cosine
//! similarity against the reference.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use hn_core::Result;

use crate::rag::RagEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub question: String,
    pub reference: String,
    pub answer: String,
    pub score: f32,
}

/// Load evaluation cases from a JSON file: `[{"question", "answer"}, ...]`.
pub async fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let data = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&data)?)
}

fn word_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    for word in cleaned.split_whitespace() {
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity over word-frequency vectors. Crude, but enough to
/// notice a model drifting off the reference answers.
pub fn text_similarity(a: &str, b: &str) -> f32 {
    let freq_a = word_counts(a);
    let freq_b = word_counts(b);
    if freq_a.is_empty() || freq_b.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    for (word, count_a) in &freq_a {
        if let Some(count_b) = freq_b.get(word) {
            dot += (*count_a as f32) * (*count_b as f32);
        }
    }

    let magnitude = |freq: &HashMap<String, u32>| {
        freq.values()
            .map(|c| (*c as f32) * (*c as f32))
            .sum::<f32>()
            .sqrt()
    };
    let mag_a = magnitude(&freq_a);
    let mag_b = magnitude(&freq_b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Run every case through the engine. Engine errors abort the evaluation;
/// a no-data answer just scores what it scores.
pub async fn evaluate(engine: &RagEngine, cases: &[EvalCase]) -> Result<Vec<EvalOutcome>> {
    let mut outcomes = Vec::with_capacity(cases.len());
    for (i, case) in cases.iter().enumerate() {
        let result = engine.answer(&case.question).await?;
        let score = text_similarity(&case.answer, &result.answer);
        info!(
            "📊 Evaluated {}/{}: {:.4} for {:.50}",
            i + 1,
            cases.len(),
            score,
            case.question
        );
        outcomes.push(EvalOutcome {
            question: case.question.clone(),
            reference: case.answer.clone(),
            answer: result.answer,
            score,
        });
    }
    Ok(outcomes)
}

/// Mean score across outcomes, 0.0 for an empty set.
pub fn mean_score(outcomes: &[EvalOutcome]) -> f32 {
    if outcomes.is_empty() {
        return 0.0;
    }
    outcomes.iter().map(|o| o.score).sum::<f32>() / outcomes.len() as f32
}
