//! Generic JSONC (JSON with `//` and `/* */` comments) config loading,
//! parse-or-fall-back-to-default with structured error logging mirroring
//! `ConfigError::Parse`'s path/message shape.

use fluidvoice_foundation::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::warn;

pub fn parse<T: DeserializeOwned>(jsonc: &str) -> Result<T, ConfigError> {
    let value = jsonc_parser::parse_to_serde_value(jsonc, &Default::default())
        .map_err(|e| ConfigError::Parse {
            path: "<memory>".to_string(),
            message: e.to_string(),
        })?
        .unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value).map_err(|e| ConfigError::Parse {
        path: "<memory>".to_string(),
        message: e.to_string(),
    })
}

pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// Loads `path`, falling back to `T::default()` and logging on any failure
/// — a missing or malformed vocabulary file must never block startup.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load(path) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "falling back to default config");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: String,
    }

    #[test]
    fn parses_comments_and_trailing_commas() {
        let jsonc = r#"{
            // a comment
            "name": "fluidvoice", /* trailing */
        }"#;
        let parsed: Sample = parse(jsonc).unwrap();
        assert_eq!(parsed.name, "fluidvoice");
    }

    #[test]
    fn load_or_default_survives_missing_file() {
        let parsed: Sample = load_or_default(Path::new("/nonexistent/path.jsonc"));
        assert_eq!(parsed, Sample::default());
    }
}
