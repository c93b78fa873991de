/// Answer returned when nothing has been indexed yet, or when retrieval
/// comes back empty. Callers treat this as a normal answer, not an error.
pub const NO_DATA_ANSWER: &str =
    "No HackerNews content has been indexed yet. Run the ingest pipeline first.";

const ANSWER_TEMPLATE: &str = "\
You are a HackerNews analyst. Answer the question concisely based on the provided context.

Guidelines:
- Keep answers short and focused
- Directly answer the question asked
- Only include the most relevant information
- Use bullet points for lists when appropriate
- If no relevant information is found, say so briefly

Context:
{context}

Question: {question}

Answer:";

/// Render the analyst prompt for a question and its retrieved context.
pub fn answer_prompt(context: &str, question: &str) -> String {
    ANSWER_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}
