//! A [`Runtime`] backed by a local Python interpreter.
//!
//! Every call starts a fresh interpreter and rebuilds the session from the
//! bound globals and the statements that changed interpreter state (imports,
//! definitions, assignments). Calls that only evaluate an expression are not
//! kept, so running many test cases does not replay earlier runs. Globals are
//! bound before the kept statements are replayed.
//!
//! Lark must already be installed for the interpreter; `micropip` is replaced
//! by a shim whose `install` only checks that the package can be imported.

use crate::runtime::{Runtime, RuntimeError};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const DRIVER: &str = r#"
import ast, asyncio, importlib, json, sys, types

request = json.load(sys.stdin)
result = sys.stdout
sys.stdout = sys.stderr

if "micropip" in request["packages"]:
    micropip = types.ModuleType("micropip")
    async def install(name):
        importlib.import_module(name)
    micropip.install = install
    sys.modules["micropip"] = micropip

namespace = {"__name__": "__main__"}
namespace.update(request["globals"])
flags = ast.PyCF_ALLOW_TOP_LEVEL_AWAIT

async def run(source):
    tree = ast.parse(source, mode="exec")
    last = None
    if tree.body and isinstance(tree.body[-1], ast.Expr):
        last = ast.Expression(tree.body.pop().value)
    stateful = bool(tree.body)
    value = eval(compile(tree, "<ide>", "exec", flags=flags), namespace)
    if asyncio.iscoroutine(value):
        await value
    if last is not None:
        value = eval(compile(last, "<ide>", "eval", flags=flags), namespace)
        if asyncio.iscoroutine(value):
            value = await value
    else:
        value = None
    return value, stateful

async def main():
    for source in request["history"]:
        await run(source)
    return await run(request["source"])

value, stateful = asyncio.run(main())
json.dump({
    "value": None if value is None else str(value),
    "stateful": stateful,
}, result)
"#;

#[derive(Serialize)]
struct Request<'a> {
    packages: &'a [String],
    globals: &'a IndexMap<String, serde_json::Value>,
    history: &'a [String],
    source: &'a str,
}

#[derive(Debug, Deserialize)]
struct Response {
    value: Option<String>,
    /// Whether the source did more than evaluate a final expression.
    stateful: bool,
}

pub struct ProcessRuntime {
    python: String,
    packages: Vec<String>,
    globals: IndexMap<String, serde_json::Value>,
    history: Vec<String>,
}

impl ProcessRuntime {
    pub fn new(python: &str) -> Self {
        ProcessRuntime {
            python: python.to_owned(),
            packages: vec![],
            globals: IndexMap::new(),
            history: vec![],
        }
    }

    fn request(&self, source: &str) -> Result<Vec<u8>, RuntimeError> {
        serde_json::to_vec(&Request {
            packages: &self.packages,
            globals: &self.globals,
            history: &self.history,
            source,
        })
        .map_err(|e| RuntimeError(e.to_string()))
    }

    /// Keep `source` for later calls if it changed interpreter state.
    /// Re-running an identical statement adds nothing new.
    fn record(&mut self, source: &str, stateful: bool) {
        if stateful && !self.history.iter().any(|s| s == source) {
            self.history.push(source.to_owned());
        }
    }

    async fn execute(&self, source: &str) -> Result<Response, RuntimeError> {
        let request = self.request(source)?;

        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RuntimeError(format!("could not start '{}': {}", self.python, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&request)
                .await
                .map_err(|e| RuntimeError(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RuntimeError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::debug!("Python failed:\n{}", stderr);
            return Err(RuntimeError(match stderr.trim_end().lines().last() {
                Some(line) => line.to_owned(),
                None => format!("{} exited with {}", self.python, output.status),
            }));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| RuntimeError(format!("unexpected driver output: {}", e)))
    }
}

impl Runtime for ProcessRuntime {
    async fn load_package(&mut self, name: &str) -> Result<(), RuntimeError> {
        log::debug!("Loading package {}", name);
        if !self.packages.iter().any(|p| p == name) {
            self.packages.push(name.to_owned());
        }
        Ok(())
    }

    async fn run_python(&mut self, source: &str) -> Result<String, RuntimeError> {
        log::debug!("Running Python:\n{}", source);
        let response = self.execute(source).await?;
        self.record(source, response.stateful);
        Ok(response.value.unwrap_or_default())
    }

    async fn set_global(
        &mut self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), RuntimeError> {
        self.globals.insert(name.to_owned(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge;
    use serde_json::json;

    #[tokio::test]
    async fn globals_are_replaced_by_name() {
        let mut runtime = ProcessRuntime::new("python3");
        runtime.set_global("grammar", json!("a")).await.unwrap();
        runtime.set_global("test_string", json!("x")).await.unwrap();
        runtime.set_global("grammar", json!("b")).await.unwrap();

        assert_eq!(runtime.globals.len(), 2);
        assert_eq!(runtime.globals["grammar"], json!("b"));
    }

    #[test]
    fn repeated_runs_do_not_grow_history() {
        let mut runtime = ProcessRuntime::new("python3");
        runtime.record("import lark", true);
        for _ in 0..3 {
            runtime.record(bridge::DEFINE_EXECUTE_TEST_CASE_SCRIPT, true);
            runtime.record(bridge::EXECUTE_TEST_CASE_CALL, false);
        }
        assert_eq!(
            runtime.history,
            vec![
                "import lark".to_owned(),
                bridge::DEFINE_EXECUTE_TEST_CASE_SCRIPT.to_owned()
            ]
        );
    }

    #[tokio::test]
    async fn request_carries_session() {
        let mut runtime = ProcessRuntime::new("python3");
        runtime.load_package("micropip").await.unwrap();
        runtime.load_package("micropip").await.unwrap();
        runtime.set_global("x", json!(1)).await.unwrap();
        runtime.record("y = x + 1", true);

        let request: serde_json::Value =
            serde_json::from_slice(&runtime.request("y").unwrap()).unwrap();
        assert_eq!(
            request,
            json!({
                "packages": ["micropip"],
                "globals": {"x": 1},
                "history": ["y = x + 1"],
                "source": "y",
            })
        );
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_runtime_error() {
        let mut runtime = ProcessRuntime::new("lark-ide-no-such-python");
        let err = runtime.run_python("1").await.unwrap_err();
        assert!(err.0.contains("could not start 'lark-ide-no-such-python'"));
    }

    /// Exercises the driver when a Python 3 interpreter is on the path.
    #[tokio::test]
    async fn session_survives_between_calls() {
        if std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map_or(true, |o| !o.status.success())
        {
            return;
        }

        let mut runtime = ProcessRuntime::new("python3");
        runtime.set_global("x", json!(41)).await.unwrap();
        assert_eq!(runtime.run_python("y = x + 1").await.unwrap(), "");
        assert_eq!(runtime.run_python("print('noise')\ny").await.unwrap(), "42");
        assert_eq!(runtime.run_python("y * 2").await.unwrap(), "84");
        assert_eq!(
            runtime.history,
            vec!["y = x + 1".to_owned(), "print('noise')\ny".to_owned()]
        );

        let err = runtime.run_python("1 / 0").await.unwrap_err();
        assert_eq!(err.0, "ZeroDivisionError: division by zero");
    }
}
