//! Splits oversized document text into overlapping windows before
//! embedding. Most items fit in one chunk; long Ask HN threads and user
//! bios occasionally do not.

use hn_core::Document;

pub const CHUNK_SIZE: usize = 800;
pub const CHUNK_OVERLAP: usize = 80;

/// Split `text` into windows of at most `chunk_size` characters with
/// `overlap` characters shared between neighbors. Operates on chars so
/// multi-byte text never splits inside a code point.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(overlap < chunk_size, "overlap must be smaller than the chunk size");

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Expand a document into one or more documents whose ids share the
/// source item id, suffixed `#<n>` for continuations.
pub fn split_document(document: &Document) -> Vec<Document> {
    let pieces = split_text(&document.text, CHUNK_SIZE, CHUNK_OVERLAP);
    if pieces.len() == 1 {
        return vec![document.clone()];
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut chunk = document.clone();
            if i > 0 {
                chunk.id = format!("{}#{}", document.id, i);
            }
            chunk.text = text;
            chunk
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hn_core::DocumentKind;

    fn doc_with_text(text: String) -> Document {
        Document {
            id: "100".to_string(),
            source_id: "100".to_string(),
            kind: DocumentKind::Story,
            author: "someone".to_string(),
            posted_at: Utc::now(),
            category: "topstories".to_string(),
            text,
        }
    }

    #[test]
    fn short_documents_pass_through_untouched() {
        let doc = doc_with_text("short".to_string());
        let chunks = split_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], doc);
    }

    #[test]
    fn long_documents_split_with_overlap() {
        let text: String = std::iter::repeat('x').take(2000).collect();
        let doc = doc_with_text(text);
        let chunks = split_document(&doc);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].id, "100");
        assert_eq!(chunks[1].id, "100#1");
        for chunk in &chunks {
            assert_eq!(chunk.source_id, "100");
            assert!(chunk.text.chars().count() <= CHUNK_SIZE);
        }
    }

    #[test]
    fn neighboring_chunks_share_the_overlap() {
        let text: String = (0..1600).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = split_text(&text, 800, 80);
        assert_eq!(chunks.len(), 3);
        let first_tail: String = chunks[0].chars().skip(800 - 80).collect();
        let second_head: String = chunks[1].chars().take(80).collect();
        assert_eq!(first_tail, second_head);
    }

    #[test]
    fn multibyte_text_splits_cleanly() {
        let text: String = std::iter::repeat('é').take(1000).collect();
        let chunks = split_text(&text, 800, 80);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().all(|ch| ch == 'é')));
    }
}
