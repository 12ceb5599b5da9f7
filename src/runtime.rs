//! # Python runtime
//!
//! Lark runs inside an embedded Python interpreter (Pyodide in the browser,
//! a local interpreter on the command line). This module defines what the
//! IDE needs from that interpreter and how it is prepared.

use std::fmt;

////////////////////////////////////////////////////////////////////////////////
// Contract

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError(pub String);

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RuntimeError {}

/// An asynchronous Python interpreter session.
pub trait Runtime {
    /// Make a bundled package importable.
    async fn load_package(&mut self, name: &str) -> Result<(), RuntimeError>;

    /// Run `source` and return the value of its final expression rendered
    /// as a string (empty if there is none).
    async fn run_python(&mut self, source: &str) -> Result<String, RuntimeError>;

    /// Bind `name` in the interpreter's global namespace.
    async fn set_global(
        &mut self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), RuntimeError>;
}

////////////////////////////////////////////////////////////////////////////////
// Setup

pub const LARK_INSTALL_SCRIPT: &str = "
import micropip
await micropip.install('lark')
";

pub const LARK_IMPORT_SCRIPT: &str = "
import lark
import json
import traceback
";

pub const LARK_ENCODER_SCRIPT: &str = r#"
class LarkEncoder(json.JSONEncoder):
    def default(self, o) -> object:
        if isinstance(o, lark.Tree):
            return {
                "type": "Tree",
                "data": o.data,
                "children": o.children,
            }
        elif isinstance(o, lark.Token):
            return {
                "type": "Token",
                "type_name": o.type,
                "value": o.value,
            }
        return super().default(o)
"#;

/// Progress of runtime setup, as shown by the loading screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingStatus {
    pub message: &'static str,
    pub progress: u8,
}

pub async fn setup_runtime<R: Runtime>(
    runtime: &mut R,
    mut report: impl FnMut(LoadingStatus),
) -> Result<(), RuntimeError> {
    let mut step = |message: &'static str, progress: u8| {
        log::info!("[{:>3}%] {}", progress, message);
        report(LoadingStatus { message, progress });
    };

    step("Loading Pyodide...", 0);

    step("Installing micropip...", 25);
    runtime.load_package("micropip").await?;

    step("Installing Lark Parser...", 50);
    runtime.run_python(LARK_INSTALL_SCRIPT).await?;
    runtime.run_python(LARK_IMPORT_SCRIPT).await?;
    runtime.run_python(LARK_ENCODER_SCRIPT).await?;

    step("Setup complete.", 75);
    step("Setup complete.", 100);
    Ok(())
}
