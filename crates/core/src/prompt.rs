use crate::chat::ChatMessage;
use crate::models::ScoredChunk;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context from a PDF document.
If the answer cannot be found in the context, politely state that you don't have enough information to answer accurately.
Always base your answers on the provided context and avoid making up information.";

pub const USER_TEMPLATE: &str =
    "Context: {context}\n\nQuestion: {query}\n\nAnswer the question based on the context provided.";

/// Joins retrieved chunk texts in rank order.
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fills the two-role template. Placeholders are substituted in one pass so
/// braces inside the context or question are left alone.
pub fn render_prompt(context: &str, query: &str) -> Vec<ChatMessage> {
    let mut user = String::with_capacity(USER_TEMPLATE.len() + context.len() + query.len());
    let mut rest = USER_TEMPLATE;

    while let Some(start) = rest.find('{') {
        user.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{context}") {
            user.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{query}") {
            user.push_str(query);
            rest = after;
        } else {
            user.push('{');
            rest = &tail[1..];
        }
    }
    user.push_str(rest);

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
