//! Overlapping fixed-size text chunking.

/// Split `text` into overlapping chunks of `size` characters.
///
/// Consecutive chunks share exactly `overlap` characters: chunk `i` ends
/// `overlap` characters after chunk `i + 1` starts. Text no longer than
/// `size` yields a single chunk; empty text yields none. Boundaries are
/// counted in characters, never splitting a UTF-8 sequence.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || size == 0 {
        return Vec::new();
    }

    // A degenerate overlap would loop forever; fall back to disjoint chunks.
    let step = if overlap < size { size - overlap } else { size };

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
