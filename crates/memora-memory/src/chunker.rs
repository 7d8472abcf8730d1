// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic fixed-width text chunking.
//!
//! Sizes are measured in characters, never bytes, so multi-byte text is
//! never split inside a code point.

use memora_core::MemoraError;

/// Splits `text` into overlapping chunks of at most `chunk_size` characters.
///
/// While more than `chunk_size` characters remain, a full chunk is emitted and
/// the cursor advances by `chunk_size - chunk_overlap`; the remainder becomes
/// the final chunk. Text that fits in one chunk is returned unchanged.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<String>, MemoraError> {
    if chunk_size == 0 {
        return Err(MemoraError::validation("chunk_size", "must be greater than 0"));
    }
    if chunk_overlap >= chunk_size {
        return Err(MemoraError::validation(
            "chunk_overlap",
            format!("must be less than chunk_size ({chunk_size})"),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let step = chunk_size - chunk_overlap;
    let mut chunks = Vec::with_capacity(chars.len() / step + 1);
    let mut start = 0;
    while chars.len() - start > chunk_size {
        chunks.push(chars[start..start + chunk_size].iter().collect());
        start += step;
    }
    chunks.push(chars[start..].iter().collect());
    Ok(chunks)
}
