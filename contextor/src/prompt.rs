//! Prompt template for "stuff"-style question answering.

use rag_store::RagHit;

/// Chunk texts in ranking order, separated by blank lines.
pub fn build_context(hits: &[RagHit]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fills the question-answering prompt with the retrieved `context` and
/// the user `question`.
///
/// # Example
/// ```
/// let prompt = contextor::prompt::render("ctx", "why?");
/// assert!(prompt.contains("<context>\nctx\n</context>"));
/// assert!(prompt.contains("Question: why?"));
/// ```
pub fn render(context: &str, question: &str) -> String {
    format!(
        "\n\nHuman: Use the following pieces of context to provide a\n\
         concise answer to the question at the end but summarize with at least\n\
         250 words with detailed explanations. If you don't know the answer,\n\
         just say that you don't know, don't try to make up an answer.\n\
         <context>\n{context}\n</context>\n\n\
         Question: {question}\n\n\
         Assistant:",
        question = question.trim()
    )
}
