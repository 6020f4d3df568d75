//! Output formatting for command results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use scholar_core::processing::IngestReport;
use scholar_core::search::{IndexStats, InitReport, SearchHit, TrackedAction};
use serde::Serialize;

/// Maximum characters to show in text snippet
const SNIPPET_MAX_LEN: usize = 200;

/// JSON output structure for search results
#[derive(Serialize)]
pub struct JsonOutput {
    pub query: String,
    pub results: Vec<JsonHit>,
}

/// Chunk-level result in JSON format
#[derive(Serialize)]
pub struct JsonHit {
    /// Source file path
    pub file_path: String,
    /// Display name (file name)
    pub file_name: String,
    pub chunk_index: usize,
    /// `1 / (1 + distance)`
    pub similarity: f32,
    pub distance: f32,
    pub snippet: String,
}

impl From<&SearchHit> for JsonHit {
    fn from(hit: &SearchHit) -> Self {
        Self {
            file_path: hit.source_path.clone(),
            file_name: hit.source_name.clone(),
            chunk_index: hit.chunk_index,
            similarity: hit.similarity,
            distance: hit.distance,
            snippet: truncate_text(&hit.chunk_text, SNIPPET_MAX_LEN),
        }
    }
}

/// Formats search results as JSON.
pub fn format_json(query: &str, hits: &[SearchHit]) -> String {
    let output = JsonOutput {
        query: query.to_string(),
        results: hits.iter().map(JsonHit::from).collect(),
    };
    to_json(&output)
}

/// Pretty JSON for any serializable report.
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats search results for human-readable terminal output.
pub fn format_human(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for \"{}\"", query);
    }

    let mut output = String::new();
    output.push_str(&format!(
        "Found {} chunk{} for \"{}\":\n\n",
        hits.len(),
        if hits.len() == 1 { "" } else { "s" },
        query
    ));

    for (i, hit) in hits.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} (similarity: {:.2})\n",
            i + 1,
            hit.source_name,
            hit.similarity
        ));

        if hit.source_path != hit.source_name {
            output.push_str(&format!("   Path: {}\n", hit.source_path));
        }
        output.push_str(&format!("   Chunk {}\n", hit.chunk_index + 1));

        let snippet = truncate_text(&hit.chunk_text, SNIPPET_MAX_LEN);
        output.push_str(&format!("   {}\n", indent_text(&snippet, "   ")));
        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Summary of an `init` run.
pub fn format_init(report: &InitReport) -> String {
    let mut lines = Vec::new();

    if report.load.restored_chunks > 0 {
        lines.push(format!(
            "Loaded existing index ({} chunks)",
            report.load.restored_chunks
        ));
    }
    if let Some(reason) = &report.load.discarded {
        lines.push(format!("Discarded unreadable index: {}", reason));
    }

    for update in &report.tracked {
        let line = match &update.action {
            TrackedAction::Missing => continue,
            TrackedAction::Unchanged => format!("{}: unchanged", update.source_path),
            TrackedAction::Indexed { chunks } => {
                format!("{}: indexed ({} chunks)", update.source_path, chunks)
            }
            TrackedAction::Rebuilt { removed, added } => format!(
                "{}: updated ({} chunks replaced by {})",
                update.source_path, removed, added
            ),
            TrackedAction::Failed { reason } => {
                format!("{}: not updated, will retry ({})", update.source_path, reason)
            }
        };
        lines.push(line);
    }

    lines.push(format_ingest(&report.ingest));
    lines.join("\n")
}

/// One-line summary of an ingestion batch.
pub fn format_ingest(report: &IngestReport) -> String {
    let mut line = format!(
        "Indexed {} file{} ({} chunk{})",
        report.files_indexed,
        if report.files_indexed == 1 { "" } else { "s" },
        report.chunks_added,
        if report.chunks_added == 1 { "" } else { "s" },
    );
    if report.files_skipped > 0 {
        line.push_str(&format!(", {} skipped", report.files_skipped));
    }
    if report.files_failed > 0 {
        line.push_str(&format!(", {} failed", report.files_failed));
    }
    line
}

/// Index overview for the `status` command.
pub fn format_status(stats: &IndexStats) -> String {
    let mut output = format!(
        "Model: {} ({} dims)\nChunks: {}\nSources: {}\nGeneration: {}\n",
        stats.model_id,
        stats.embedding_dim,
        stats.chunk_count,
        stats.source_count,
        stats.generation
    );

    for (source, count) in &stats.sources {
        output.push_str(&format!("   {} ({} chunks)\n", source, count));
    }
    for tracked in &stats.tracked_sources {
        output.push_str(&format!("Tracked: {}\n", tracked.source_path));
    }

    output.trim_end().to_string()
}

/// Truncates text to a maximum number of characters at a word boundary,
/// adding ellipsis if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(max_len) else {
        return text.to_string();
    };

    let truncated = &text[..cut];
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

/// Indents all lines of text after the first line.
fn indent_text(text: &str, indent: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_core::search::{LoadSummary, SourceVersion, TrackedUpdate};
    use std::collections::BTreeMap;

    fn make_hit(path: &str, text: &str, distance: f32) -> SearchHit {
        SearchHit {
            source_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            source_path: path.to_string(),
            chunk_index: 0,
            chunk_text: text.to_string(),
            distance,
            similarity: 1.0 / (1.0 + distance),
        }
    }

    #[test]
    fn test_format_human_empty() {
        let output = format_human("test query", &[]);
        assert!(output.contains("No results found"));
    }

    #[test]
    fn test_format_human_single() {
        let hits = vec![make_hit("/notes/test.md", "This is test content", 0.25)];
        let output = format_human("test", &hits);
        assert!(output.contains("1 chunk for"));
        assert!(output.contains("test.md"));
        assert!(output.contains("0.80"));
        assert!(output.contains("Path: /notes/test.md"));
    }

    #[test]
    fn test_format_json() {
        let hits = vec![make_hit("/path/to/doc.txt", "Content here", 0.0)];
        let output = format_json("query", &hits);
        assert!(output.contains("\"query\": \"query\""));
        assert!(output.contains("\"file_path\": \"/path/to/doc.txt\""));
        assert!(output.contains("\"file_name\": \"doc.txt\""));
        assert!(output.contains("\"similarity\": 1.0"));
        assert!(output.contains("\"chunk_index\": 0"));
    }

    #[test]
    fn test_truncate_text() {
        let short = "Short text";
        assert_eq!(truncate_text(short, 50), short);

        let long = "This is a much longer text that should be truncated at a reasonable point";
        let truncated = truncate_text(long, 30);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 33); // 30 + "..."
    }

    #[test]
    fn test_truncate_text_multibyte() {
        let text = "é".repeat(300);
        let truncated = truncate_text(&text, 200);
        assert_eq!(truncated.chars().count(), 203);
    }

    #[test]
    fn test_format_init() {
        let report = InitReport {
            load: LoadSummary {
                restored_chunks: 12,
                discarded: None,
            },
            tracked: vec![TrackedUpdate {
                source_path: "/data/history.txt".to_string(),
                action: TrackedAction::Rebuilt {
                    removed: 2,
                    added: 3,
                },
            }],
            ingest: IngestReport {
                files_indexed: 1,
                files_skipped: 0,
                files_failed: 1,
                chunks_added: 4,
            },
        };

        let output = format_init(&report);
        assert!(output.contains("Loaded existing index (12 chunks)"));
        assert!(output.contains("/data/history.txt: updated (2 chunks replaced by 3)"));
        assert!(output.contains("Indexed 1 file (4 chunks), 1 failed"));
    }

    #[test]
    fn test_format_status() {
        let mut sources = BTreeMap::new();
        sources.insert("/data/notes.txt".to_string(), 3);
        let stats = IndexStats {
            chunk_count: 3,
            source_count: 1,
            generation: 5,
            embedding_dim: 384,
            model_id: "hashing-384".to_string(),
            sources,
            tracked_sources: vec![SourceVersion {
                source_path: "/data/history.txt".to_string(),
                mtime: 1,
            }],
        };

        let output = format_status(&stats);
        assert!(output.contains("Chunks: 3"));
        assert!(output.contains("/data/notes.txt (3 chunks)"));
        assert!(output.contains("Tracked: /data/history.txt"));
    }
}
