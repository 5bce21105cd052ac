//! Deterministic text chunking.
//!
//! Splits cleaned document text into bounded-size passages, preferring
//! sentence boundaries and falling back to hard character cuts only for
//! sentences longer than the target size. Re-chunking identical input with
//! identical parameters yields identical output, so reprocessing a document
//! is idempotent.

use crate::core::errors::RagError;

/// Split `text` into passages of roughly `target_size` characters with
/// `overlap` characters carried between consecutive passages.
pub fn chunk_text(text: &str, target_size: usize, overlap: usize) -> Result<Vec<String>, RagError> {
    if target_size == 0 {
        return Err(RagError::invalid("chunk target_size must be positive"));
    }
    if overlap >= target_size {
        return Err(RagError::invalid(format!(
            "chunk overlap ({overlap}) must be smaller than target_size ({target_size})"
        )));
    }

    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }
    if char_len(&cleaned) <= target_size {
        return Ok(vec![cleaned]);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(&cleaned) {
        let sentence_len = char_len(&sentence);

        if sentence_len > target_size {
            // Oversized sentence: flush what we have, then hard-cut it.
            if !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
            }
            current = String::new();
            chunks.extend(hard_split(&sentence, target_size, overlap));
            continue;
        }

        if !current.is_empty() && char_len(&current) + 1 + sentence_len > target_size {
            chunks.push(current.trim().to_string());
            let tail = overlap_tail(&current, overlap);
            current = if tail.is_empty() {
                sentence
            } else {
                format!("{tail} {sentence}")
            };
        } else if current.is_empty() {
            current = sentence;
        } else {
            current.push(' ');
            current.push_str(&sentence);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    Ok(chunks)
}

/// Collapse whitespace runs to single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split into sentences on terminal punctuation, keeping the punctuation
/// with its sentence. Text without terminal punctuation comes back whole.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            // Consume a run of terminal punctuation ("?!", "...").
            while let Some(&next) = chars.peek() {
                if !matches!(next, '.' | '!' | '?') {
                    break;
                }
                current.push(next);
                chars.next();
            }
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

/// Hard character cuts for text with no usable sentence boundary.
fn hard_split(text: &str, target_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = (target_size - overlap).max(1);
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + target_size).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim().to_string();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    pieces
}

/// Last `overlap` characters of `text`, advanced to the next word boundary
/// so a chunk never opens mid-word.
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= overlap {
        return text.trim().to_string();
    }

    let tail: String = chars[chars.len() - overlap..].iter().collect();
    match tail.find(' ') {
        Some(pos) if pos > 0 => tail[pos..].trim().to_string(),
        _ => tail.trim().to_string(),
    }
}
