//! # Test execution bridge
//!
//! Runs a test case through Lark inside the Python runtime. The grammar, the
//! input and the parser options are bound as Python globals, and a fixed
//! Python function turns them into a JSON-encoded [`TestResult`].

use crate::grammar::Grammar;
use crate::ide::IdeStore;
use crate::parser::ParserOptions;
use crate::runtime::{Runtime, RuntimeError};
use crate::test_case::{TestCase, TestResult};

use std::fmt;

pub const DEFINE_EXECUTE_TEST_CASE_SCRIPT: &str = r#"
def execute_test_case(grammar, test_string, parser_options):
    if hasattr(parser_options, "to_py"):
        parser_options = parser_options.to_py()
    try:
        parser = lark.Lark(grammar, **dict(parser_options))
        tree = parser.parse(test_string)
        return json.dumps({
            "status": "Success",
            "content": json.dumps(tree, cls=LarkEncoder),
        })
    except Exception as e:
        return json.dumps({
            "status": "Failure",
            "message": str(e),
            "traceback": traceback.format_exc(),
        })
"#;

pub const EXECUTE_TEST_CASE_CALL: &str =
    "execute_test_case(grammar, test_string, parser_options)";

#[derive(Debug)]
pub enum BridgeError {
    /// The runtime itself failed.
    Runtime(RuntimeError),
    /// The parser options could not be encoded for the runtime.
    Options(serde_json::Error),
    /// The runtime answered with something that is not a test result.
    Response(serde_json::Error),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BridgeError::Runtime(e) => write!(f, "{}", e),
            BridgeError::Options(e) => write!(f, "invalid parser options: {}", e),
            BridgeError::Response(e) => write!(f, "malformed test result: {}", e),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<RuntimeError> for BridgeError {
    fn from(e: RuntimeError) -> Self {
        BridgeError::Runtime(e)
    }
}

pub fn parse_test_result(response: &str) -> Result<TestResult, BridgeError> {
    serde_json::from_str(response).map_err(BridgeError::Response)
}

pub async fn execute_test_case<R: Runtime>(
    runtime: &mut R,
    parser_options: &ParserOptions,
    grammar: &Grammar,
    test_case: &TestCase,
) -> Result<TestResult, BridgeError> {
    let options = parser_options
        .to_python_compatible()
        .to_json()
        .map_err(BridgeError::Options)?;
    let grammar = grammar.content.clone().unwrap_or_default();
    let test_string = test_case.content.clone().unwrap_or_default();

    runtime.set_global("parser_options", options).await?;
    runtime.set_global("grammar", grammar.into()).await?;
    runtime.set_global("test_string", test_string.into()).await?;

    runtime.run_python(DEFINE_EXECUTE_TEST_CASE_SCRIPT).await?;
    let response = runtime.run_python(EXECUTE_TEST_CASE_CALL).await?;
    log::debug!("Test case {} returned {}", test_case.id, response);

    parse_test_result(&response)
}

/// Run the selected test case and store its result.
///
/// The result is shown as `Parsing` while the runtime works. Bridge errors
/// are stored as a `Failure`. Returns the stored result, or `None` if there
/// was nothing to run or the result was superseded by a newer run.
pub async fn run_current_test<R: Runtime>(
    store: &mut IdeStore,
    runtime: &mut R,
) -> Option<TestResult> {
    let run = store.begin_test_run()?;

    let result = match execute_test_case(
        runtime,
        &run.parser_options,
        &run.grammar,
        &run.test_case,
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            log::error!("Test case {} could not run: {}", run.test_case.id, e);
            TestResult::failure(e.to_string())
        }
    };

    if store.complete_test_run(&run, result.clone()) {
        Some(result)
    } else {
        None
    }
}
