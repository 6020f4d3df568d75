//! Formatting retrieved chunks into a grounding block for text generation.

use super::types::SearchHit;

/// Heading placed before the retrieved chunks.
pub const CONTEXT_HEADER: &str = "Relevant context from your documents:";

/// Builds the context block handed to a text-generation prompt.
///
/// Returns an empty string when there are no hits, so callers can append it
/// unconditionally.
///
/// ```
/// use scholar_core::search::{format_context, SearchHit};
///
/// let hit = SearchHit {
///     source_name: "notes.txt".to_string(),
///     source_path: "/data/notes.txt".to_string(),
///     chunk_index: 0,
///     chunk_text: "Osmosis moves water across membranes.".to_string(),
///     distance: 0.4,
///     similarity: 1.0 / 1.4,
/// };
/// let context = format_context(&[hit]);
/// assert!(context.contains("[Source 1: notes.txt]"));
/// ```
pub fn format_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut context = String::from(CONTEXT_HEADER);
    context.push('\n');
    for (i, hit) in hits.iter().enumerate() {
        context.push_str(&format!(
            "\n[Source {}: {}]\n{}\n",
            i + 1,
            hit.source_name,
            hit.chunk_text
        ));
    }
    context
}
