//! # Test cases
//!
//! A test case is a sample input for a project's grammar together with the
//! outcome of the last time it was parsed.

use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Results

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum TestStatus {
    #[default]
    Unknown,
    Success,
    Failure,
    /// Shown while a run is in flight; never produced by the runtime itself.
    Parsing,
}

/// The outcome of running a test case against a grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestResult {
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl TestResult {
    pub fn template() -> Self {
        TestResult {
            status: TestStatus::Unknown,
            message: Some(String::new()),
            traceback: Some(String::new()),
            content: Some(String::new()),
        }
    }

    pub fn parsing() -> Self {
        TestResult {
            status: TestStatus::Parsing,
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        TestResult {
            status: TestStatus::Failure,
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Test cases

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestCase {
    /// Unique within the owning project.
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TestResult>,
}

impl TestCase {
    pub fn template() -> Self {
        TestCase {
            id: 0,
            description: Some("New Test Case".to_owned()),
            content: Some(String::new()),
            result: Some(TestResult::template()),
        }
    }

    pub fn new(id: u32, description: &str, content: &str) -> Self {
        TestCase {
            id,
            description: Some(description.to_owned()),
            content: Some(content.to_owned()),
            result: None,
        }
    }

    /// One past the largest id in use, or the smallest free id once the
    /// largest is `u32::MAX`.
    pub fn next_id(cases: &[TestCase]) -> u32 {
        let largest = cases.iter().map(|tc| tc.id).max();
        match largest {
            None => 1,
            Some(id) => id.checked_add(1).unwrap_or_else(|| {
                (1..u32::MAX)
                    .find(|candidate| cases.iter().all(|tc| tc.id != *candidate))
                    .unwrap_or(0)
            }),
        }
    }

    pub fn with_result(&self, result: TestResult) -> Self {
        TestCase {
            result: Some(result),
            ..self.clone()
        }
    }
}
