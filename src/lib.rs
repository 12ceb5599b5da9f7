pub mod bridge;
pub mod config;
pub mod fetch;
pub mod grammar;
pub mod ide;
pub mod parser;
#[cfg(not(target_arch = "wasm32"))]
pub mod process;
pub mod project;
pub mod runtime;
pub mod test_case;
pub mod theme;
pub mod tree;

#[cfg(not(target_arch = "wasm32"))]
pub mod main_handler;

use serde::{de::DeserializeOwned, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, String> {
    serde_wasm_bindgen::from_value(value).map_err(|e| e.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    serde_wasm_bindgen::to_value(value).map_err(|e| e.to_string())
}

fn is_absent(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

fn js_error(value: JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_default()
}

////////////////////////////////////////////////////////////////////////////////
// Fetch

/// Fetches through a JS callback `(uri) => {status, statusText, body}`,
/// which may also return a promise of that object.
struct JsFetcher(js_sys::Function);

impl fetch::Fetch for JsFetcher {
    async fn get(&self, uri: &str) -> Result<fetch::FetchResponse, String> {
        let value = self
            .0
            .call1(&JsValue::NULL, &JsValue::from_str(uri))
            .map_err(js_error)?;
        let value = JsFuture::from(js_sys::Promise::resolve(&value))
            .await
            .map_err(js_error)?;
        from_js(value)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Browser session

/// The IDE store as seen from the browser.
#[wasm_bindgen]
pub struct IdeSession {
    store: Rc<RefCell<ide::IdeStore>>,
}

#[wasm_bindgen]
impl IdeSession {
    #[wasm_bindgen(constructor)]
    pub fn new(project: JsValue) -> Result<IdeSession, String> {
        let project = if is_absent(&project) {
            None
        } else {
            Some(from_js(project)?)
        };
        Ok(IdeSession {
            store: Rc::new(RefCell::new(ide::IdeStore::new(project))),
        })
    }

    pub fn state(&self) -> Result<JsValue, String> {
        to_js(self.store.borrow().state())
    }

    /// Call `callback` with the state now and after every change. The
    /// callback must not call back into the session synchronously.
    pub fn subscribe(&self, callback: js_sys::Function) -> usize {
        let subscription = self.store.borrow_mut().subscribe(move |state| {
            let result = to_js(state).and_then(|value| {
                callback.call1(&JsValue::NULL, &value).map_err(js_error)
            });
            if let Err(e) = result {
                log::error!("Observer failed: {}", e);
            }
        });
        subscription.0
    }

    pub fn unsubscribe(&self, subscription: usize) {
        self.store
            .borrow_mut()
            .unsubscribe(ide::Subscription(subscription))
    }

    pub fn set_project(&self, project: JsValue) -> Result<(), String> {
        self.store.borrow_mut().set_project(from_js(project)?);
        Ok(())
    }

    pub fn set_test_case(&self, test_case: JsValue) -> Result<(), String> {
        self.store.borrow_mut().set_test_case(from_js(test_case)?);
        Ok(())
    }

    pub fn set_test_result(&self, result: JsValue) -> Result<(), String> {
        self.store.borrow_mut().set_test_result(from_js(result)?);
        Ok(())
    }

    pub fn set_grammar(&self, patch: JsValue) -> Result<(), String> {
        self.store.borrow_mut().set_grammar(from_js(patch)?);
        Ok(())
    }

    pub fn replace_grammar(&self, grammar: JsValue) -> Result<(), String> {
        self.store.borrow_mut().replace_grammar(from_js(grammar)?);
        Ok(())
    }

    pub fn set_parser_options(&self, options: JsValue) -> Result<(), String> {
        self.store.borrow_mut().set_parser_options(from_js(options)?);
        Ok(())
    }

    pub fn set_available_projects(&self, projects: JsValue) -> Result<(), String> {
        let projects = if is_absent(&projects) {
            None
        } else {
            Some(from_js(projects)?)
        };
        self.store.borrow_mut().set_available_projects(projects);
        Ok(())
    }

    pub fn select_test_case(&self, id: u32) {
        self.store.borrow_mut().select_test_case(id)
    }

    pub fn remove_test_case(&self, id: u32) {
        self.store.borrow_mut().remove_test_case(id)
    }

    /// Load the current project's grammar through `fetch` and store it.
    ///
    /// Resolves to the loaded grammar. If another project was selected while
    /// loading, the store is left alone.
    pub fn load_grammar(&self, fetch: js_sys::Function, force: bool) -> js_sys::Promise {
        let store = self.store.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            let (project_id, current) = {
                let store = store.borrow();
                let project = &store.state().project;
                (project.id.clone(), project.grammar.clone())
            };

            let loaded =
                grammar::load_grammar(&JsFetcher(fetch), current, force).await;

            store
                .borrow_mut()
                .finish_grammar_load(&project_id, loaded.clone());
            to_js(&loaded).map_err(JsValue::from)
        })
    }

    /// The current parser options as keyword arguments for `lark.Lark`.
    pub fn python_parser_options(&self) -> Result<JsValue, String> {
        to_js(
            &self
                .store
                .borrow()
                .state()
                .project
                .parser_options
                .to_python_compatible(),
        )
    }

    /// Store a runtime response as the selected test case's result.
    pub fn parse_test_result(&self, response: &str) -> Result<JsValue, String> {
        let result =
            bridge::parse_test_result(response).map_err(|e| e.to_string())?;
        self.store.borrow_mut().set_test_result(result.clone());
        to_js(&result)
    }

    pub fn begin_test_run(&self) -> Option<TestRun> {
        self.store.borrow_mut().begin_test_run().map(TestRun)
    }

    /// Returns `false` if the run was superseded and its result dropped.
    pub fn complete_test_run(&self, run: &TestRun, response: &str) -> bool {
        let result = match bridge::parse_test_result(response) {
            Ok(result) => result,
            Err(e) => test_case::TestResult::failure(e.to_string()),
        };
        self.store.borrow_mut().complete_test_run(&run.0, result)
    }

    pub fn download_grammar(&self) -> Result<JsValue, String> {
        let store = self.store.borrow();
        let project = &store.state().project;
        to_js(&grammar::download_grammar(&project.name, &project.grammar))
    }
}

/// A test run in flight, holding the values to bind in the runtime.
#[wasm_bindgen]
pub struct TestRun(ide::PendingRun);

#[wasm_bindgen]
impl TestRun {
    pub fn parser_options(&self) -> Result<JsValue, String> {
        to_js(&self.0.parser_options.to_python_compatible())
    }

    pub fn grammar(&self) -> String {
        self.0.grammar.content.clone().unwrap_or_default()
    }

    pub fn test_string(&self) -> String {
        self.0.test_case.content.clone().unwrap_or_default()
    }
}

#[wasm_bindgen]
pub fn sample_projects() -> Result<JsValue, String> {
    to_js(&project::sample_projects())
}

#[wasm_bindgen]
pub fn parse_tree_text(content: &str) -> Result<String, String> {
    tree::ParseNode::from_json(content)
        .map(|node| node.plain().to_string())
        .map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn execute_test_case_script() -> String {
    bridge::DEFINE_EXECUTE_TEST_CASE_SCRIPT.to_owned()
}
