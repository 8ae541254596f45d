//! Sentence-boundary text chunker.
//!
//! Splits lesson text into chunks of at most `chunk_size` characters,
//! repeating up to `chunk_overlap` characters of trailing sentences at the
//! start of the next chunk so that context spanning a boundary survives in
//! at least one chunk.
//!
//! # Algorithm
//!
//! 1. Collapse all whitespace runs to a single space.
//! 2. Split into sentences after `.`, `!` or `?` followed by whitespace and
//!    an uppercase letter. Abbreviations such as `Dr.` and initialisms such
//!    as `U.S.A.` or `e.g.` do not end a sentence.
//! 3. Sentences longer than `chunk_size` are broken at word boundaries.
//! 4. Pack sentences greedily into chunks.
//! 5. Start each following chunk with the longest run of trailing sentences
//!    that fits in `chunk_overlap`, always advancing by at least one
//!    sentence.
//!
//! # Example
//!
//! ```rust
//! use coursemate_core::chunk::chunk_sentences;
//!
//! let chunks = chunk_sentences("First point. Second point.", 800, 100);
//! assert_eq!(chunks, vec!["First point. Second point.".to_string()]);
//! ```

/// Split text into overlapping sentence-aligned chunks.
///
/// Returns an empty vector for empty or whitespace-only input. A single
/// word longer than `chunk_size` is kept whole rather than cut mid-word.
pub fn chunk_sentences(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let sentences: Vec<String> = split_sentences(&normalized)
        .into_iter()
        .flat_map(|s| split_oversized(&s, chunk_size))
        .collect();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < sentences.len() {
        let mut end = start;
        let mut size = 0;
        while end < sentences.len() {
            let add = char_len(&sentences[end]) + usize::from(end > start);
            if size + add > chunk_size && end > start {
                break;
            }
            size += add;
            end += 1;
        }

        chunks.push(sentences[start..end].join(" "));
        if end >= sentences.len() {
            break;
        }

        let mut overlap_size = 0;
        let mut overlap_count = 0;
        for s in sentences[start..end].iter().rev() {
            let add = char_len(s) + usize::from(overlap_count > 0);
            if overlap_size + add > chunk_overlap {
                break;
            }
            overlap_size += add;
            overlap_count += 1;
        }
        let overlap_count = overlap_count.min(end - start - 1);
        start = end - overlap_count;
    }

    chunks
}

/// Split normalized text into sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 1;

    while i < chars.len() {
        if chars[i].is_whitespace() && is_terminator(chars[i - 1]) {
            let mut next = i;
            while next < chars.len() && chars[next].is_whitespace() {
                next += 1;
            }
            if next < chars.len() && chars[next].is_uppercase() && !ends_with_abbreviation(&chars[..i])
            {
                push_trimmed(&mut sentences, &chars[start..i]);
                start = next;
                i = next;
                continue;
            }
        }
        i += 1;
    }
    push_trimmed(&mut sentences, &chars[start..]);

    sentences
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Titles and short forms that are followed by a capitalised word without
/// ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Dr", "Prof", "Sr", "Jr", "St", "Mt", "Fig", "vs",
];

/// True when the word before the full stop is a known title or a dotted
/// initialism such as `U.S.A.` or `e.g.`.
fn ends_with_abbreviation(before: &[char]) -> bool {
    let word_start = before
        .iter()
        .rposition(|c| c.is_whitespace())
        .map_or(0, |p| p + 1);
    let word: String = before[word_start..]
        .iter()
        .skip_while(|c| !c.is_alphanumeric())
        .collect();
    let stem = match word.strip_suffix('.') {
        Some(stem) => stem,
        None => return false,
    };
    ABBREVIATIONS.contains(&stem) || is_initialism(stem)
}

/// Single letters joined by dots: `U.S.A`, `e.g`, `i.e`.
fn is_initialism(stem: &str) -> bool {
    let mut parts = 0;
    for part in stem.split('.') {
        let mut chars = part.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_alphabetic() => parts += 1,
            _ => return false,
        }
    }
    parts >= 2
}

fn push_trimmed(out: &mut Vec<String>, chars: &[char]) {
    let s: String = chars.iter().collect();
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}

/// Break a sentence longer than `max_chars` into word-aligned pieces.
fn split_oversized(sentence: &str, max_chars: usize) -> Vec<String> {
    if char_len(sentence) <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in sentence.split(' ') {
        if !current.is_empty() && char_len(&current) + 1 + char_len(word) > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
