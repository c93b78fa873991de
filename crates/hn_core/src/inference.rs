use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait InferenceModel: Send + Sync {
    fn name(&self) -> &str;

    /// Answer a question given retrieved context.
    async fn answer_question(&self, question: &str, context: &str) -> Result<String>;

    /// Generate embeddings for a piece of text.
    async fn generate_embeddings(&self, text: &str) -> Result<Vec<f32>>;
}
