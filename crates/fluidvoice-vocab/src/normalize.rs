//! Normalizes raw transcript text into a matching surface for the
//! automaton while keeping a position map back to the original text, so a
//! match against collapsed whitespace or joined single-letter tokens
//! ("a p i" -> "api") still reports the correct original span to replace.

use unicode_normalization::UnicodeNormalization;

/// One position in the normalized string, with the original byte span it
/// was derived from.
#[derive(Debug, Clone, Copy)]
pub struct MappedChar {
    pub ch: char,
    pub orig_start: usize,
    pub orig_end: usize,
}

pub struct Normalized {
    pub text: String,
    map: Vec<MappedChar>,
    /// Byte offset in `text` of the start of each char; length is
    /// `map.len() + 1` (the last entry is `text.len()`).
    byte_offsets: Vec<usize>,
}

impl Normalized {
    /// Maps a `[start, end)` *byte* range in `self.text` (as returned by an
    /// `aho_corasick` match over `text.as_bytes()`) back to the `[start,
    /// end)` byte range in the original text it was derived from.
    pub fn original_span(&self, byte_start: usize, byte_end: usize) -> Option<(usize, usize)> {
        let start = self.byte_offsets.binary_search(&byte_start).ok()?;
        let end_char = self.byte_offsets.binary_search(&byte_end).ok()?;
        if start >= end_char || end_char > self.map.len() {
            return None;
        }
        Some((self.map[start].orig_start, self.map[end_char - 1].orig_end))
    }
}

/// Normalizes text for matching: NFKC fold, lowercase, collapse whitespace
/// runs, standardize separators (`_`/`-` -> space), and join runs of
/// single-letter tokens into one word ("a p i" -> "api").
pub fn normalize(original: &str) -> Normalized {
    // Stage 1: per-char lowercase + separator standardization, each output
    // char mapped 1:1 (before NFKC) to its source byte span. NFKC folding
    // is applied per-char via `nfkc()`, which for the accented/width-form
    // inputs this matcher cares about still yields one folded char per
    // input char, keeping the mapping exact for the common case.
    let mut groups: Vec<MappedChar> = Vec::with_capacity(original.len());
    for (start, ch) in original.char_indices() {
        let end = start + ch.len_utf8();
        let folded = ch.nfkc().next().unwrap_or(ch);
        let mapped = if folded.is_whitespace() || folded == '_' || folded == '-' {
            ' '
        } else {
            folded.to_lowercase().next().unwrap_or(folded)
        };
        // Collapse consecutive whitespace into the first group's slot.
        if mapped == ' ' {
            if let Some(last) = groups.last_mut() {
                if last.ch == ' ' {
                    last.orig_end = end;
                    continue;
                }
            }
        }
        groups.push(MappedChar {
            ch: mapped,
            orig_start: start,
            orig_end: end,
        });
    }

    // Trim leading/trailing collapsed whitespace groups.
    while groups.first().map(|g| g.ch == ' ').unwrap_or(false) {
        groups.remove(0);
    }
    while groups.last().map(|g| g.ch == ' ').unwrap_or(false) {
        groups.pop();
    }

    // Stage 2: join "single letter, space, single letter, ..." runs into
    // one contiguous word, e.g. tokens "a", " ", "p", " ", "i" -> "api".
    let joined = join_single_letter_runs(groups);

    let text: String = joined.iter().map(|g| g.ch).collect();
    let mut byte_offsets = Vec::with_capacity(joined.len() + 1);
    let mut offset = 0;
    for g in &joined {
        byte_offsets.push(offset);
        offset += g.ch.len_utf8();
    }
    byte_offsets.push(offset);

    Normalized {
        text,
        map: joined,
        byte_offsets,
    }
}

fn is_single_letter_token(groups: &[MappedChar], idx: usize) -> bool {
    groups[idx].ch.is_alphabetic()
        && (idx == 0 || groups[idx - 1].ch == ' ')
        && (idx + 1 == groups.len() || groups[idx + 1].ch == ' ')
}

fn join_single_letter_runs(groups: Vec<MappedChar>) -> Vec<MappedChar> {
    let mut out: Vec<MappedChar> = Vec::with_capacity(groups.len());
    let mut i = 0;
    while i < groups.len() {
        if is_single_letter_token(&groups, i) {
            // Look ahead for more single-letter tokens separated by single
            // spaces, forming a run of at least two.
            let mut j = i;
            let mut run = vec![groups[i]];
            while j + 2 < groups.len()
                && groups[j + 1].ch == ' '
                && is_single_letter_token(&groups, j + 2)
            {
                run.push(groups[j + 2]);
                j += 2;
            }
            if run.len() >= 2 {
                out.extend(run);
                i = j + 1;
                continue;
            }
        }
        out.push(groups[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_whitespace() {
        let n = normalize("Hello   World");
        assert_eq!(n.text, "hello world");
    }

    #[test]
    fn joins_single_letter_acronym_tokens() {
        let n = normalize("the a p i is down");
        assert_eq!(n.text, "the api is down");
    }

    #[test]
    fn maps_match_span_back_to_original_acronym() {
        let original = "the a p i is down";
        let n = normalize(original);
        let start = n.text.find("api").unwrap();
        let end = start + 3;
        let (orig_start, orig_end) = n.original_span(start, end).unwrap();
        assert_eq!(&original[orig_start..orig_end], "a p i");
    }

    #[test]
    fn standardizes_separators_to_space() {
        let n = normalize("co_worker-list");
        assert_eq!(n.text, "co worker list");
    }

    proptest::proptest! {
        #[test]
        fn original_span_stays_within_bounds_and_on_char_boundaries(s in ".{0,64}") {
            let n = normalize(&s);
            for start in 0..=n.text.len() {
                for end in start..=n.text.len() {
                    if let Some((orig_start, orig_end)) = n.original_span(start, end) {
                        prop_assert!(orig_start <= orig_end);
                        prop_assert!(orig_end <= s.len());
                        prop_assert!(s.is_char_boundary(orig_start));
                        prop_assert!(s.is_char_boundary(orig_end));
                    }
                }
            }
        }
    }
}
