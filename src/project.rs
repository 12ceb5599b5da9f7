//! # Projects
//!
//! A project bundles a grammar, its parser configuration and the test cases
//! written against it. This module also defines the built-in sample catalog.

use crate::grammar::Grammar;
use crate::parser::{ParserAmbiguity, ParserOptions, ParsingAlgorithm};
use crate::test_case::TestCase;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Globally unique.
    pub id: String,
    pub name: String,
    pub grammar: Grammar,
    pub test_cases: Vec<TestCase>,
    pub parser_options: ParserOptions,
}

impl Project {
    pub fn template() -> Self {
        Project {
            id: "template".to_owned(),
            name: "Template Project".to_owned(),
            grammar: Grammar::template(),
            test_cases: vec![TestCase::template()],
            parser_options: ParserOptions::default(),
        }
    }

    pub fn test_case(&self, id: u32) -> Option<&TestCase> {
        self.test_cases.iter().find(|tc| tc.id == id)
    }

    /// Replace the test case with the same id, or append it.
    pub(crate) fn upsert_test_case(&mut self, test_case: TestCase) {
        let mut test_cases = self.test_cases.clone();
        match test_cases.iter_mut().find(|tc| tc.id == test_case.id) {
            Some(slot) => *slot = test_case,
            None => test_cases.push(test_case),
        }
        self.test_cases = test_cases;
    }
}

////////////////////////////////////////////////////////////////////////////////
// Samples

fn sample(
    id: &str,
    name: &str,
    file: &str,
    test: (&str, &str),
    parser_options: ParserOptions,
) -> Project {
    Project {
        id: id.to_owned(),
        name: name.to_owned(),
        grammar: Grammar::from_uri(&format!("grammars/{}.lark", file)),
        test_cases: vec![TestCase::new(1, test.0, test.1)],
        parser_options,
    }
}

fn lalr() -> ParserOptions {
    ParserOptions {
        keep_all_tokens: Some(false),
        ..ParserOptions::new(ParsingAlgorithm::lalr())
    }
}

fn earley() -> ParserOptions {
    ParserOptions {
        keep_all_tokens: Some(false),
        ..ParserOptions::new(ParsingAlgorithm::earley())
    }
}

pub fn hello_world() -> Project {
    sample(
        "hello-world",
        "Hello World",
        "hello",
        ("Basic Hello World Test", "Hello, World!"),
        lalr(),
    )
}

pub fn json() -> Project {
    sample(
        "json",
        "JSON",
        "json",
        ("Basic JSON Test", r#"{"key": "value"}"#),
        lalr(),
    )
}

pub fn calculator() -> Project {
    sample(
        "calculator",
        "Calculator",
        "calc",
        ("Basic Calculator Test", "2 + 20 / (13 - 6) + 1.5"),
        lalr(),
    )
}

pub fn fruit_flies() -> Project {
    sample(
        "fruit-flies",
        "Fruit Flies",
        "fruitflies",
        ("Basic Fruit Flies Test", "fruit flies like bananas"),
        ParserOptions {
            ambiguity: Some(ParserAmbiguity::Explicit),
            ..earley()
        },
    )
}

pub fn semver() -> Project {
    sample(
        "semver",
        "SemVer",
        "semver",
        ("Basic SemVer Test", "1.0.0-rc1+build.0001"),
        lalr(),
    )
}

pub fn configuration() -> Project {
    sample(
        "configuration",
        "Configuration",
        "conf",
        ("Basic Configuration Test", "[main]\nhello=world\n"),
        lalr(),
    )
}

pub fn lark() -> Project {
    sample(
        "lark",
        "Lark",
        "lark",
        ("Basic Lark Test", r#"start: "Hello" "World""#),
        ParserOptions {
            maybe_placeholders: Some(false),
            ..earley()
        },
    )
}

/// The fixed built-in catalog.
pub fn sample_projects() -> Vec<Project> {
    vec![
        hello_world(),
        json(),
        calculator(),
        fruit_flies(),
        semver(),
        configuration(),
        lark(),
    ]
}
