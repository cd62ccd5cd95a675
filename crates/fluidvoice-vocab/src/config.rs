use fluidvoice_foundation::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    Exact,
    Upper,
    Mixed,
    Camel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VocabularyTerm {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_case_mode", rename = "caseMode")]
    pub case_mode: CaseMode,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_case_mode() -> CaseMode {
    CaseMode::Exact
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VocabConfig {
    /// Keyed by canonical form, matching the external JSONC schema:
    /// `{"terms": {"<canonical>": {"aliases": [...], "caseMode": ...}}}`.
    #[serde(default)]
    pub terms: BTreeMap<String, VocabularyTerm>,
    /// Terms allowed to participate in the bounded fuzzy-match fallback.
    /// Empty by default — fuzzy matching only applies to whitelisted terms
    /// an operator opts in explicitly.
    #[serde(default)]
    pub fuzzy_whitelist: Vec<String>,
}

impl VocabConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn parse(jsonc: &str) -> Result<Self, String> {
        let value = jsonc_parser::parse_to_serde_value(jsonc, &Default::default())
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "empty vocabulary config".to_string())?;
        serde_json::from_value(value).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jsonc_with_comments() {
        let src = r#"
        {
            // inline vocabulary
            "terms": {
                "Kubernetes": { "aliases": ["kubernettes", "koobernetties"] }
            },
            "fuzzy_whitelist": []
        }
        "#;
        let cfg = VocabConfig::parse(src).unwrap();
        assert_eq!(cfg.terms.len(), 1);
        assert!(cfg.terms.contains_key("Kubernetes"));
        assert!(cfg.fuzzy_whitelist.is_empty());
    }

    #[test]
    fn parses_camel_case_field_name() {
        let src = r#"
        {
            "terms": {
                "API": { "aliases": ["api"], "caseMode": "upper" }
            }
        }
        "#;
        let cfg = VocabConfig::parse(src).unwrap();
        assert_eq!(cfg.terms["API"].case_mode, CaseMode::Upper);
    }

    #[test]
    fn fuzzy_whitelist_defaults_empty() {
        let cfg = VocabConfig::default();
        assert!(cfg.fuzzy_whitelist.is_empty());
    }
}
