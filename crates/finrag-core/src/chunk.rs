//! Paragraph-boundary fragment splitter.
//!
//! Long files embed poorly as a single vector, so ingestion can optionally
//! split a body into fragments of at most `max_tokens` (approximated as
//! 4 characters per token). Each fragment becomes its own document.
//!
//! Paragraphs (`\n\n`-separated) are packed greedily; a paragraph larger than
//! the limit is hard-split at the last newline or space before the limit,
//! never inside a UTF-8 character.
//!
//! ```rust
//! use finrag_core::chunk::split_fragments;
//!
//! let parts = split_fragments("Revenue grew.\n\nMargins held.", 700);
//! assert_eq!(parts, vec!["Revenue grew.\n\nMargins held."]);
//! ```

const CHARS_PER_TOKEN: usize = 4;

/// Split `text` into fragments of at most `max_tokens * 4` bytes each.
///
/// Whitespace-only input yields no fragments. `max_tokens == 0` returns the
/// trimmed text as a single fragment.
pub fn split_fragments(text: &str, max_tokens: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if max_tokens == 0 {
        return vec![trimmed.to_string()];
    }

    let max_chars = max_tokens * CHARS_PER_TOKEN;
    let mut fragments = Vec::new();
    let mut buf = String::new();

    for para in trimmed.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let would_be = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if would_be > max_chars && !buf.is_empty() {
            fragments.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            hard_split(para, max_chars, &mut fragments);
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        fragments.push(buf);
    }
    fragments
}

fn hard_split(para: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut remaining = para;
    while !remaining.is_empty() {
        let limit = snap_to_char_boundary(remaining, max_chars);
        let mut split_at = if limit < remaining.len() {
            remaining[..limit]
                .rfind(['\n', ' '])
                .map(|pos| pos + 1)
                .unwrap_or(limit)
        } else {
            limit
        };
        if split_at == 0 {
            // a single character wider than the limit
            split_at = remaining
                .char_indices()
                .nth(1)
                .map_or(remaining.len(), |(i, _)| i);
        }

        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        remaining = &remaining[split_at..];
    }
}

/// Largest char boundary not after `index`.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_fragment() {
        assert_eq!(split_fragments("Hello, world!", 700), vec!["Hello, world!"]);
    }

    #[test]
    fn test_blank_text_no_fragments() {
        assert!(split_fragments("", 700).is_empty());
        assert!(split_fragments("  \n\n \t", 700).is_empty());
    }

    #[test]
    fn test_zero_limit_keeps_whole_text() {
        assert_eq!(split_fragments("  a\n\nb  ", 0), vec!["a\n\nb"]);
    }

    #[test]
    fn test_paragraphs_split_when_over_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let parts = split_fragments(text, 7);
        assert_eq!(
            parts,
            vec![
                "This is paragraph one.",
                "This is paragraph two.",
                "This is paragraph three."
            ]
        );
    }

    #[test]
    fn test_fragments_respect_limit() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {} of the annual report.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        for part in split_fragments(&text, 25) {
            assert!(part.len() <= 100, "fragment too long: {}", part.len());
        }
    }

    #[test]
    fn test_oversized_paragraph_hard_split_on_spaces() {
        let text = "word ".repeat(100);
        let parts = split_fragments(&text, 5);
        assert!(parts.len() > 1);
        for part in &parts {
            assert!(part.len() <= 20);
            assert!(!part.starts_with(' ') && !part.ends_with(' '));
        }
    }

    #[test]
    fn test_multibyte_utf8() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let parts = split_fragments(text, 1);
        assert!(!parts.is_empty());
        assert_eq!(parts.concat().chars().filter(|c| *c == '┌').count(), 1);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        assert_eq!(split_fragments(text, 2), split_fragments(text, 2));
    }
}
