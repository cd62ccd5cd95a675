//! Multi-pattern matcher over normalized vocabulary aliases, rebuildable
//! and atomically swappable so an in-flight `correct()` call never observes
//! a half-updated pattern set.

use crate::config::{CaseMode, VocabConfig};
use crate::normalize::normalize;
use aho_corasick::{AhoCorasickBuilder, AhoCorasick, MatchKind};
use arc_swap::ArcSwap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MatchPayload {
    pub canonical: String,
    pub case_mode: CaseMode,
    /// False when the canonical contains `.`, `-` or `_` (§4.6.2): such
    /// canonicals are themselves punctuation-joined, so a match is accepted
    /// regardless of what touches its edges.
    pub requires_word_boundaries: bool,
}

pub struct CompiledAutomaton {
    ac: AhoCorasick,
    payloads: Vec<MatchPayload>,
}

impl CompiledAutomaton {
    pub fn build(config: &VocabConfig) -> Self {
        let mut patterns = Vec::new();
        let mut payloads = Vec::new();
        for (canonical, term) in &config.terms {
            let requires_word_boundaries = !canonical.contains(['.', '-', '_']);
            for alias in &term.aliases {
                patterns.push(normalize(alias).text);
                payloads.push(MatchPayload {
                    canonical: canonical.clone(),
                    case_mode: term.case_mode,
                    requires_word_boundaries,
                });
            }
        }

        let ac = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .ascii_case_insensitive(true)
            .build(&patterns)
            .expect("pattern set is always valid UTF-8 from parsed config");

        Self { ac, payloads }
    }

    pub fn find_matches<'a>(&'a self, haystack: &'a str) -> impl Iterator<Item = (usize, usize, &'a MatchPayload)> + 'a {
        self.ac
            .find_iter(haystack)
            .map(move |m| (m.start(), m.end(), &self.payloads[m.pattern()]))
    }
}

/// Read-mostly handle allowing the config watcher to rebuild and swap the
/// automaton atomically while in-flight readers keep using the prior one.
pub struct VocabAutomaton {
    handle: ArcSwap<CompiledAutomaton>,
}

impl VocabAutomaton {
    pub fn new(config: &VocabConfig) -> Self {
        Self {
            handle: ArcSwap::new(Arc::new(CompiledAutomaton::build(config))),
        }
    }

    pub fn rebuild(&self, config: &VocabConfig) {
        self.handle.store(Arc::new(CompiledAutomaton::build(config)));
    }

    pub fn load(&self) -> arc_swap::Guard<Arc<CompiledAutomaton>> {
        self.handle.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VocabularyTerm;
    use std::collections::BTreeMap;

    fn cfg() -> VocabConfig {
        let mut terms = BTreeMap::new();
        terms.insert(
            "Kubernetes".to_string(),
            VocabularyTerm {
                aliases: vec!["kubernettes".into(), "koobernetties".into()],
                case_mode: CaseMode::Exact,
                category: None,
            },
        );
        VocabConfig {
            terms,
            fuzzy_whitelist: vec![],
        }
    }

    #[test]
    fn finds_configured_alias_case_insensitively() {
        let automaton = VocabAutomaton::new(&cfg());
        let guard = automaton.load();
        let matches: Vec<_> = guard.find_matches("I love KUBERNETTES".to_lowercase().as_str()).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].2.canonical, "Kubernetes");
    }

    #[test]
    fn swap_is_observed_by_new_loads_only() {
        let automaton = VocabAutomaton::new(&cfg());
        let guard_before = automaton.load();
        let mut new_cfg = cfg();
        let term = new_cfg.terms.remove("Kubernetes").unwrap();
        new_cfg.terms.insert("K8s".to_string(), term);
        automaton.rebuild(&new_cfg);
        assert_eq!(guard_before.find_matches("kubernettes").next().unwrap().2.canonical, "Kubernetes");
        let guard_after = automaton.load();
        assert_eq!(guard_after.find_matches("kubernettes").next().unwrap().2.canonical, "K8s");
    }

    #[test]
    fn alias_with_joinable_single_letters_matches_via_normalization() {
        let mut terms = BTreeMap::new();
        terms.insert(
            "markdown".to_string(),
            VocabularyTerm {
                aliases: vec!["claude m d".into()],
                case_mode: CaseMode::Exact,
                category: None,
            },
        );
        let automaton = VocabAutomaton::new(&VocabConfig { terms, fuzzy_whitelist: vec![] });
        let guard = automaton.load();
        let matches: Vec<_> = guard.find_matches(&normalize("claude m d").text).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].2.canonical, "markdown");
    }

    #[test]
    fn punctuated_canonical_does_not_require_word_boundaries() {
        let mut terms = BTreeMap::new();
        terms.insert(
            "co.dev".to_string(),
            VocabularyTerm {
                aliases: vec!["codev".into()],
                case_mode: CaseMode::Exact,
                category: None,
            },
        );
        let automaton = VocabAutomaton::new(&VocabConfig { terms, fuzzy_whitelist: vec![] });
        let guard = automaton.load();
        let (_, _, payload) = guard.find_matches("codev").next().unwrap();
        assert!(!payload.requires_word_boundaries);
    }
}
