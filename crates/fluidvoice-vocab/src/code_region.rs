//! Classifies byte ranges of a transcript as inline-code or fenced-code so
//! the corrector can skip matches that fall inside them, independent of the
//! automaton's own match scan.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRegion {
    Inline,
    Fenced,
}

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: CodeRegion,
}

/// Single forward scan: fenced blocks start at a line beginning with
/// three backticks and run to the next such line (or end of text); inline
/// spans run between single backticks on the same line.
pub fn scan(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut in_fence = false;
    let mut fence_start = 0;
    let mut line_start = 0;

    let bytes = text.as_bytes();
    let mut i = 0;
    while i <= bytes.len() {
        let at_line_end = i == bytes.len() || bytes[i] == b'\n';
        if at_line_end {
            let line = &text[line_start..i];
            if line.trim_start().starts_with("```") {
                if in_fence {
                    spans.push(Span {
                        start: fence_start,
                        end: i,
                        kind: CodeRegion::Fenced,
                    });
                    in_fence = false;
                } else {
                    fence_start = line_start;
                    in_fence = true;
                }
            } else if !in_fence {
                scan_inline(line, line_start, &mut spans);
            }
            line_start = i + 1;
        }
        i += 1;
    }
    if in_fence {
        spans.push(Span {
            start: fence_start,
            end: text.len(),
            kind: CodeRegion::Fenced,
        });
    }
    spans
}

fn scan_inline(line: &str, line_offset: usize, spans: &mut Vec<Span>) {
    let mut open: Option<usize> = None;
    for (idx, ch) in line.char_indices() {
        if ch == '`' {
            match open.take() {
                Some(start) => spans.push(Span {
                    start: line_offset + start,
                    end: line_offset + idx + 1,
                    kind: CodeRegion::Inline,
                }),
                None => open = Some(idx),
            }
        }
    }
}

pub fn overlaps_any(spans: &[Span], start: usize, end: usize) -> bool {
    spans.iter().any(|s| start < s.end && end > s.start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_inline_code() {
        let spans = scan("run `kubectl get pods` now");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, CodeRegion::Inline);
    }

    #[test]
    fn detects_fenced_block() {
        let text = "before\n```\nkubernettes apply -f x.yml\n```\nafter";
        let spans = scan(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, CodeRegion::Fenced);
    }

    #[test]
    fn unterminated_fence_still_protects_to_end() {
        let text = "```\nsome code with kubernettes typo";
        let spans = scan(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, text.len());
    }
}
