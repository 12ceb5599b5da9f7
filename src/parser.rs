//! # Parser options
//!
//! This module defines the parser configuration of a project and its
//! translation into the keyword arguments the Lark constructor expects.

use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Algorithms

/// One of the parsing strategies offered by Lark.
///
/// The `id` is passed opaquely to the runtime as the `parser` keyword.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParsingAlgorithm {
    pub id: String,
    pub name: String,
}

impl ParsingAlgorithm {
    pub fn lalr() -> Self {
        ParsingAlgorithm {
            id: "lalr".to_owned(),
            name: "LALR(1)".to_owned(),
        }
    }

    pub fn earley() -> Self {
        ParsingAlgorithm {
            id: "earley".to_owned(),
            name: "Earley".to_owned(),
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::lalr(), Self::earley()]
    }

    /// Look up a known algorithm by its runtime id.
    pub fn by_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserAmbiguity {
    Explicit,
    Resolve,
    Forest,
}

impl std::str::FromStr for ParserAmbiguity {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Options

/// Parser configuration of a project.
///
/// Optional fields that are `None` have never been set and are not forwarded
/// to the runtime at all.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserOptions {
    pub algorithm: ParsingAlgorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_all_tokens: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguity: Option<ParserAmbiguity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maybe_placeholders: Option<bool>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            algorithm: ParsingAlgorithm::earley(),
            keep_all_tokens: Some(false),
            ambiguity: None,
            maybe_placeholders: None,
        }
    }
}

impl ParserOptions {
    pub fn new(algorithm: ParsingAlgorithm) -> Self {
        ParserOptions {
            algorithm,
            keep_all_tokens: None,
            ambiguity: None,
            maybe_placeholders: None,
        }
    }

    pub fn to_python_compatible(&self) -> PythonCompatibleParserOptions {
        PythonCompatibleParserOptions {
            parser: self.algorithm.id.clone(),
            keep_all_tokens: self.keep_all_tokens,
            ambiguity: self.ambiguity,
            maybe_placeholders: self.maybe_placeholders,
        }
    }
}

/// The keyword arguments handed to `lark.Lark(...)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PythonCompatibleParserOptions {
    pub parser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_all_tokens: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity: Option<ParserAmbiguity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maybe_placeholders: Option<bool>,
}

impl PythonCompatibleParserOptions {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn earley_with_ambiguity_only() {
        let options = ParserOptions {
            algorithm: ParsingAlgorithm::earley(),
            keep_all_tokens: None,
            ambiguity: Some(ParserAmbiguity::Explicit),
            maybe_placeholders: None,
        };
        assert_eq!(
            options.to_python_compatible().to_json().unwrap(),
            json!({"parser": "earley", "ambiguity": "explicit"})
        );
    }

    #[test]
    fn all_fields_are_renamed() {
        let options = ParserOptions {
            algorithm: ParsingAlgorithm::earley(),
            keep_all_tokens: Some(true),
            ambiguity: Some(ParserAmbiguity::Explicit),
            maybe_placeholders: Some(true),
        };
        assert_eq!(
            options.to_python_compatible().to_json().unwrap(),
            json!({
                "parser": "earley",
                "keep_all_tokens": true,
                "ambiguity": "explicit",
                "maybe_placeholders": true,
            })
        );
    }

    #[test]
    fn explicit_false_is_forwarded() {
        let value = ParserOptions::default().to_python_compatible().to_json().unwrap();
        assert_eq!(value, json!({"parser": "earley", "keep_all_tokens": false}));
        assert!(value.as_object().unwrap().values().all(|v| !v.is_null()));
    }

    #[test]
    fn bare_options_only_name_the_parser() {
        let value = ParserOptions::new(ParsingAlgorithm::lalr())
            .to_python_compatible()
            .to_json()
            .unwrap();
        assert_eq!(value, json!({"parser": "lalr"}));
    }

    #[test]
    fn algorithm_lookup() {
        assert_eq!(
            ParsingAlgorithm::by_id("lalr"),
            Some(ParsingAlgorithm::lalr())
        );
        assert_eq!(ParsingAlgorithm::by_id("cyk"), None);
        assert_eq!(
            "forest".parse::<ParserAmbiguity>().unwrap(),
            ParserAmbiguity::Forest
        );
    }
}
