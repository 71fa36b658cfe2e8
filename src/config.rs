//! Loading tokenizer rule tables and grammar files.
//!
//! Rule tables are YAML:
//!
//! ```yaml
//! case_insensitive: false
//! rules:
//!   - name: number
//!     pattern: '[0-9]+'
//!   - name: space
//!     pattern: '\s+'
//! ```
//!
//! Rule order is the order of the `rules` list. Grammars are plain text in
//! the meta-grammar notation.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{ConfigError, FixedpointError, SourceContext};
use crate::grammar::Grammar;
use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl TokenizerConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml { source })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_yaml_str(&read(path)?)?;
        debug!("loaded {} token rules from {}", config.rules.len(), path.display());
        Ok(config)
    }

    pub fn build(&self) -> Result<Tokenizer, FixedpointError> {
        let rules = self
            .rules
            .iter()
            .map(|r| (r.name.as_str(), r.pattern.as_str()));
        Ok(Tokenizer::new(rules, self.case_insensitive)?)
    }
}

/// Reads a text file, attaching the path to I/O failures.
pub fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a file into a [`SourceContext`] named after its path.
pub fn read_source(path: &Path) -> Result<SourceContext, ConfigError> {
    Ok(SourceContext::new(path.display().to_string(), read(path)?))
}

/// Loads and builds a grammar file.
pub fn load_grammar(path: &Path) -> Result<Grammar, FixedpointError> {
    let source = read_source(path)?;
    Grammar::from_source_context(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_table_keeps_rule_order() {
        let config = TokenizerConfig::from_yaml_str(
            "case_insensitive: true\nrules:\n  - name: kw\n    pattern: 'if|else'\n  - name: id\n    pattern: '[a-z]+'\n",
        )
        .unwrap();
        assert!(config.case_insensitive);
        let names: Vec<_> = config.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["kw", "id"]);

        let tokenizer = config.build().unwrap();
        assert_eq!(tokenizer.identify("IF"), Some("kw"));
    }

    #[test]
    fn flags_default_to_false() {
        let config = TokenizerConfig::from_yaml_str("rules: []").unwrap();
        assert_eq!(config, TokenizerConfig::default());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        assert!(matches!(
            TokenizerConfig::from_yaml_str("rules: [name: x"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read(Path::new("/nonexistent/rules.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rules.yaml"));
    }
}
