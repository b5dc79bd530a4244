// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window text chunker with boundary-seeking breaks.
//!
//! Splits memory text into windows of at most `chunk_size` characters with
//! `overlap` characters of trailing context carried into the next window.
//! Break points are chosen in order of preference:
//!
//! 1. The last `". "` inside the window, at least halfway in.
//! 2. The last newline inside the window, at least halfway in.
//! 3. The last space inside the window.
//! 4. The window end (hard cut).
//!
//! Operates on char indices so multi-byte scalars are never split. Chunks
//! are trimmed; empty chunks are dropped.

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    if chunk_size == 0 {
        return chunks;
    }

    let chars: Vec<char> = text.chars().collect();
    let mut start = 0usize;

    while start < chars.len() {
        if chars.len() - start <= chunk_size {
            push_trimmed(&mut chunks, &chars[start..]);
            break;
        }

        let end = start + chunk_size;
        let half = start + chunk_size / 2;
        let break_point = sentence_break(&chars, half, end)
            .or_else(|| newline_break(&chars, half, end))
            .or_else(|| space_break(&chars, start, end))
            .unwrap_or(end - 1);

        push_trimmed(&mut chunks, &chars[start..=break_point]);

        // Carry `overlap` characters of context; always make progress even
        // when the break landed inside the overlap region.
        let next = (break_point + 1).saturating_sub(overlap);
        start = next.max(start + 1);
    }

    chunks
}

/// Last `". "` whose period sits in `[half, end - 1)`.
fn sentence_break(chars: &[char], half: usize, end: usize) -> Option<usize> {
    (half..end.saturating_sub(1))
        .rev()
        .find(|&i| chars[i] == '.' && chars[i + 1] == ' ')
}

/// Last newline in `[half, end)`.
fn newline_break(chars: &[char], half: usize, end: usize) -> Option<usize> {
    (half..end).rev().find(|&i| chars[i] == '\n')
}

/// Last space in `[start, end)`.
fn space_break(chars: &[char], start: usize, end: usize) -> Option<usize> {
    (start..end).rev().find(|&i| chars[i] == ' ')
}

fn push_trimmed(chunks: &mut Vec<String>, window: &[char]) {
    let piece: String = window.iter().collect();
    let piece = piece.trim();
    if !piece.is_empty() {
        chunks.push(piece.to_string());
    }
}
