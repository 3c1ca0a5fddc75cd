//! Attachment ingestion for the modeler.
//!
//! Two strategies: concatenate the full extracted text of every attachment,
//! or build a retrieval index over chunks and inject only the passages
//! closest to the prompt. The choice is internal; no external toggle exists.

use optiflow_core::codec;
use optiflow_core::messages::FileAttachment;

use crate::prompts::NO_DOCUMENTS;

/// When set, attachments go through the chunked retrieval index instead of
/// being injected wholesale.
const USE_RETRIEVAL_INDEX: bool = false;

const CHUNK_SIZE: usize = 1000;
const CHUNK_OVERLAP: usize = 200;
const TOP_K: usize = 5;

const UNSUPPORTED_FORMAT: &str = "[System: Format pliku nieobsługiwany, pominięto treść]";

const TEXT_EXTENSIONS: &[&str] = &[".txt", ".md", ".csv", ".json", ".py", ".java"];

/// Build the reference block injected into the modeler's prompt from the
/// task's attachments. Empty when there are none.
pub fn attachment_context(files: &[FileAttachment], prompt: &str) -> String {
    if files.is_empty() {
        return String::new();
    }
    if USE_RETRIEVAL_INDEX {
        let index = RetrievalIndex::build(files);
        let passages = index.top_k(prompt, TOP_K);
        if passages.is_empty() {
            return NO_DOCUMENTS.to_string();
        }
        return passages.join("\n\n");
    }
    extract_attachment_text(files)
}

/// Concatenate the extracted text of every attachment, framed the way the
/// frontend expects.
pub fn extract_attachment_text(files: &[FileAttachment]) -> String {
    let mut context = String::from("\n=== ZAŁĄCZONE PLIKI UŻYTKOWNIKA ===\n");

    for file in files {
        match extract_file_text(file) {
            Some(text) => {
                context.push_str(&format!("\n--- PLIK: {} ---\n{}\n", file.name, text));
            }
            None => {
                tracing::warn!(file = %file.name, "attachment could not be read");
                context.push_str(&format!("\n--- PLIK: {} (Błąd odczytu) ---\n", file.name));
            }
        }
    }

    context.push_str("===================================\n");
    context
}

/// Extract text from one attachment. `None` when the payload cannot be
/// decoded or the document cannot be parsed.
fn extract_file_text(file: &FileAttachment) -> Option<String> {
    let bytes = codec::decode_file_bytes(&file.content)?;
    let lowered = file.name.to_lowercase();

    if lowered.ends_with(".pdf") {
        return match pdf_extract::extract_text_from_mem(&bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "pdf extraction failed");
                None
            }
        };
    }

    if TEXT_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
        return String::from_utf8(bytes).ok();
    }

    Some(UNSUPPORTED_FORMAT.to_string())
}

// =============================================================================
// Retrieval Index
// =============================================================================

/// A chunked index over attachment text, scored lexically against a query.
pub struct RetrievalIndex {
    chunks: Vec<String>,
}

impl RetrievalIndex {
    /// Split every readable attachment into overlapping chunks.
    pub fn build(files: &[FileAttachment]) -> Self {
        let mut chunks = Vec::new();
        for file in files {
            let Some(text) = extract_file_text(file) else {
                continue;
            };
            if text == UNSUPPORTED_FORMAT {
                continue;
            }
            chunks.extend(split_into_chunks(&text, CHUNK_SIZE, CHUNK_OVERLAP));
        }
        Self { chunks }
    }

    /// The `k` chunks sharing the most terms with the query, best first.
    /// Chunks with no overlap at all are never returned.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<&str> {
        let query_terms: Vec<String> = tokenize(query);
        let mut scored: Vec<(usize, &String)> = self
            .chunks
            .iter()
            .map(|chunk| (overlap_score(&query_terms, chunk), chunk))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(_, chunk)| chunk.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Character-windowed chunking with overlap.
fn split_into_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}

fn overlap_score(query_terms: &[String], chunk: &str) -> usize {
    let chunk_terms = tokenize(chunk);
    query_terms
        .iter()
        .filter(|term| chunk_terms.contains(term))
        .count()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use optiflow_core::codec::encode_file_bytes;

    fn text_file(name: &str, content: &str) -> FileAttachment {
        FileAttachment {
            name: name.into(),
            content: encode_file_bytes(content.as_bytes()),
        }
    }

    #[test]
    fn text_attachments_are_decoded_inline() {
        let files = vec![text_file("notes.txt", "capacity limit is 40")];
        let context = extract_attachment_text(&files);
        assert!(context.contains("=== ZAŁĄCZONE PLIKI UŻYTKOWNIKA ==="));
        assert!(context.contains("--- PLIK: notes.txt ---"));
        assert!(context.contains("capacity limit is 40"));
    }

    #[test]
    fn unsupported_formats_keep_placeholder() {
        let files = vec![FileAttachment {
            name: "image.bmp".into(),
            content: encode_file_bytes(&[0u8, 1, 2, 3]),
        }];
        let context = extract_attachment_text(&files);
        assert!(context.contains("Format pliku nieobsługiwany"));
    }

    #[test]
    fn undecodable_payload_reports_read_error() {
        let files = vec![FileAttachment {
            name: "broken.txt".into(),
            content: "\u{142}not-base64".into(),
        }];
        let context = extract_attachment_text(&files);
        assert!(context.contains("broken.txt (Błąd odczytu)"));
    }

    #[test]
    fn chunking_overlaps_and_covers_the_text() {
        let text = "a".repeat(2500);
        let chunks = split_into_chunks(&text, 1000, 200);
        assert_eq!(chunks[0].len(), 1000);
        assert!(chunks.len() >= 3);
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert!(total >= 2500);
    }

    #[test]
    fn retrieval_prefers_chunks_sharing_terms() {
        let files = vec![
            text_file("a.txt", "warehouse capacity constraints and truck routing"),
            text_file("b.txt", "completely unrelated poetry about rivers"),
        ];
        let index = RetrievalIndex::build(&files);
        let hits = index.top_k("maximize warehouse capacity", 5);
        assert!(!hits.is_empty());
        assert!(hits[0].contains("warehouse capacity"));
        assert!(hits.iter().all(|h| !h.contains("poetry")));
    }

    #[test]
    fn no_attachments_yields_empty_context() {
        assert!(attachment_context(&[], "anything").is_empty());
    }
}
