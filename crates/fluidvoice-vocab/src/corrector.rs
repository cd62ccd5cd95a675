use crate::automaton::VocabAutomaton;
use crate::code_region::{self, CodeRegion};
use crate::config::{CaseMode, VocabConfig};
use crate::normalize::normalize;

/// Applies the configured casing policy to a canonical replacement. Only
/// `upper` transforms the canonical; every other mode is emitted exactly as
/// stored in the config (§4.6.3 step 5) — `mixed` is always "as stored
/// (GitHub)", `camel` is always "as stored (TypeScript)".
fn apply_case(canonical: &str, mode: CaseMode) -> String {
    match mode {
        CaseMode::Exact | CaseMode::Mixed | CaseMode::Camel => canonical.to_string(),
        CaseMode::Upper => canonical.to_uppercase(),
    }
}

/// True unless the byte immediately before `start` or after `end` in
/// `haystack` is alphanumeric or `_` (§4.6.3 step 2).
fn has_word_boundary(haystack: &str, start: usize, end: usize) -> bool {
    let before_ok = haystack[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric() && c != '_');
    let after_ok = haystack[end..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_alphanumeric() && c != '_');
    before_ok && after_ok
}

/// Ties together normalization, the matching automaton and the code-region
/// guard into the public `correct()` entry point.
pub struct VocabularyCorrector {
    automaton: VocabAutomaton,
}

impl VocabularyCorrector {
    pub fn new(config: &VocabConfig) -> Self {
        Self {
            automaton: VocabAutomaton::new(config),
        }
    }

    pub fn rebuild(&self, config: &VocabConfig) {
        self.automaton.rebuild(config);
    }

    /// Corrects vocabulary in `text`, skipping any span that falls inside
    /// inline or fenced code regions. Idempotent: running it twice over its
    /// own output yields the same output, since canonical forms never
    /// themselves match an alias.
    pub fn correct(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let normalized = normalize(text);
        let code_spans = code_region::scan(text);
        let guard = self.automaton.load();

        struct Replacement {
            start: usize,
            end: usize,
            text: String,
        }

        let mut replacements: Vec<Replacement> = Vec::new();
        for (n_start, n_end, payload) in guard.find_matches(&normalized.text) {
            if payload.requires_word_boundaries
                && !has_word_boundary(&normalized.text, n_start, n_end)
            {
                continue;
            }
            let Some((orig_start, orig_end)) = normalized.original_span(n_start, n_end) else {
                continue;
            };
            if code_region::overlaps_any(&code_spans, orig_start, orig_end) {
                continue;
            }
            replacements.push(Replacement {
                start: orig_start,
                end: orig_end,
                text: apply_case(&payload.canonical, payload.case_mode),
            });
        }

        if replacements.is_empty() {
            return text.to_string();
        }

        replacements.sort_by_key(|r| r.start);
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for r in replacements {
            if r.start < cursor {
                continue; // overlapping match from a prior replacement; skip
            }
            out.push_str(&text[cursor..r.start]);
            out.push_str(&r.text);
            cursor = r.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VocabularyTerm;
    use std::collections::BTreeMap;

    fn corrector() -> VocabularyCorrector {
        let mut terms = BTreeMap::new();
        terms.insert(
            "Kubernetes".to_string(),
            VocabularyTerm {
                aliases: vec!["kubernettes".into(), "koobernetties".into()],
                case_mode: CaseMode::Exact,
                category: None,
            },
        );
        terms.insert(
            "API".to_string(),
            VocabularyTerm {
                aliases: vec!["api".into()],
                case_mode: CaseMode::Upper,
                category: None,
            },
        );
        VocabularyCorrector::new(&VocabConfig { terms, fuzzy_whitelist: vec![] })
    }

    #[test]
    fn replaces_known_misrecognition() {
        let c = corrector();
        assert_eq!(
            c.correct("deploying to kubernettes now"),
            "deploying to Kubernetes now"
        );
    }

    #[test]
    fn no_op_when_nothing_matches() {
        let c = corrector();
        let text = "this sentence has no vocabulary terms";
        assert_eq!(c.correct(text), text);
    }

    #[test]
    fn preserves_trailing_punctuation() {
        let c = corrector();
        assert_eq!(c.correct("we use kubernettes, yes"), "we use Kubernetes, yes");
    }

    #[test]
    fn skips_matches_inside_inline_code() {
        let c = corrector();
        let text = "run `kubernettes get pods` please";
        assert_eq!(c.correct(text), text);
    }

    #[test]
    fn joins_spoken_acronym_and_uppercases() {
        let c = corrector();
        assert_eq!(c.correct("call the a p i now"), "call the API now");
    }

    #[test]
    fn is_idempotent() {
        let c = corrector();
        let once = c.correct("deploying to kubernettes now");
        let twice = c.correct(&once);
        assert_eq!(once, twice);
    }

    // S1 (spec.md §8): a single-word alias inside ordinary prose is replaced
    // with its canonical form.
    #[test]
    fn scenario_s1_single_word_alias_is_replaced() {
        let c = corrector();
        assert_eq!(c.correct("spin up kubernettes"), "spin up Kubernetes");
    }

    // S3 (spec.md §8): a canonical containing internal punctuation matches
    // its alias even when the alias abuts ordinary word characters, since
    // `requires_word_boundaries` is false for such canonicals.
    #[test]
    fn scenario_s3_punctuated_canonical_matches_without_word_boundary() {
        let mut terms = BTreeMap::new();
        terms.insert(
            "co.dev".to_string(),
            VocabularyTerm {
                aliases: vec!["codev".into()],
                case_mode: CaseMode::Exact,
                category: None,
            },
        );
        let c = VocabularyCorrector::new(&VocabConfig { terms, fuzzy_whitelist: vec![] });
        assert_eq!(c.correct("visit codevnow"), "visit co.devnow");
    }

    // S4 (spec.md §8, non-code-region half): vocabulary correction still
    // applies outside of a fenced/inline code region in the same string.
    #[test]
    fn scenario_s4_applies_outside_code_region() {
        let c = corrector();
        let text = "kubernettes docs say: `kubernettes get pods`";
        assert_eq!(c.correct(text), "Kubernetes docs say: `kubernettes get pods`");
    }

    // S5 (spec.md §8): leftmost-longest matching picks the longer of two
    // overlapping aliases rather than the first one registered.
    #[test]
    fn scenario_s5_leftmost_longest_prefers_longer_overlapping_alias() {
        let mut terms = BTreeMap::new();
        terms.insert(
            "Kubernetes".to_string(),
            VocabularyTerm {
                aliases: vec!["kube".into()],
                case_mode: CaseMode::Exact,
                category: None,
            },
        );
        terms.insert(
            "Kubernetes Engine".to_string(),
            VocabularyTerm {
                aliases: vec!["kube engine".into()],
                case_mode: CaseMode::Exact,
                category: None,
            },
        );
        let c = VocabularyCorrector::new(&VocabConfig { terms, fuzzy_whitelist: vec![] });
        assert_eq!(c.correct("deploy on kube engine"), "deploy on Kubernetes Engine");
    }

    #[test]
    fn alias_does_not_match_inside_a_longer_word() {
        let c = corrector();
        let text = "ask the therapist";
        assert_eq!(c.correct(text), text);
    }
}
