//! Sentence-aware text chunking
//!
//! Long documents are split into chunks that each fit a single model call.
//! Split points prefer sentence boundaries near the target size, then
//! whitespace, then a plain character boundary; the chunks concatenate back
//! to the original text.

/// Target chunk size in bytes
pub const CHUNK_SIZE: usize = 30_000;

/// How far around the target we look for a sentence boundary
const SENTENCE_WINDOW: usize = 500;

/// How far back we look for whitespace when no sentence boundary is found
const WHITESPACE_WINDOW: usize = 1_000;

/// Split `text` into chunks of at most roughly [`CHUNK_SIZE`] bytes
pub fn chunk_text(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_SIZE {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > CHUNK_SIZE {
        let split = split_point(rest, CHUNK_SIZE);
        let (chunk, tail) = rest.split_at(split);
        chunks.push(chunk.to_string());
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Pick the split point closest to `target`: a sentence end within the
/// sentence window, else whitespace within the whitespace window, else the
/// next character boundary at or after the target
fn split_point(text: &str, target: usize) -> usize {
    let bytes = text.as_bytes();
    let low = target.saturating_sub(SENTENCE_WINDOW);
    let high = (target + SENTENCE_WINDOW).min(text.len());

    // sentence end: terminator followed by ascii whitespace, split after the
    // whitespace byte (ascii, so always a char boundary)
    let mut best: Option<usize> = None;
    for i in low..high.saturating_sub(1) {
        if matches!(bytes[i], b'.' | b'!' | b'?') && bytes[i + 1].is_ascii_whitespace() {
            let candidate = i + 2;
            let closer = match best {
                Some(current) => candidate.abs_diff(target) < current.abs_diff(target),
                None => true,
            };
            if closer {
                best = Some(candidate);
            }
        }
    }
    if let Some(split) = best {
        return split.min(text.len());
    }

    // whitespace fallback, scanning back from the target
    let floor = target.saturating_sub(WHITESPACE_WINDOW);
    for i in (floor..target.min(text.len())).rev() {
        if bytes[i].is_ascii_whitespace() {
            return i + 1;
        }
    }

    // plain boundary fallback for unbroken runs
    let mut split = target.min(text.len());
    while !text.is_char_boundary(split) {
        split += 1;
    }
    split
}
