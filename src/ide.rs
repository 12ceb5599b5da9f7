//! # IDE state store
//!
//! The store is the single source of truth for the IDE: the project being
//! edited, the selected test case and its latest result, and the catalog of
//! known projects. Every mutation goes through [`IdeStore`], which keeps the
//! following consistent:
//!
//! - the selected test case is value-equal to the project's test case with
//!   the same id;
//! - the selected result is the selected test case's result;
//! - the catalog holds at most one project per id, and the catalog entry
//!   matching the current project's id mirrors the current project.
//!
//! Observers are notified synchronously after each mutation.

use crate::grammar::{Grammar, GrammarPatch};
use crate::parser::ParserOptions;
use crate::project::{self, Project};
use crate::test_case::{TestCase, TestResult, TestStatus};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

////////////////////////////////////////////////////////////////////////////////
// State

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeState {
    pub project: Project,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case: Option<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_result: Option<TestResult>,
    pub available_projects: Vec<Project>,
}

impl IdeState {
    pub fn new(project: Project) -> Self {
        let mut state = IdeState {
            project,
            test_case: None,
            test_result: None,
            available_projects: project::sample_projects(),
        };
        state.select_first_test_case();
        state
    }

    fn select_first_test_case(&mut self) {
        self.test_case = self.project.test_cases.first().cloned();
        self.test_result =
            self.test_case.as_ref().and_then(|tc| tc.result.clone());
    }

    /// Mirror the current project into the catalog if it has an entry there.
    fn sync_catalog(&mut self) {
        if let Some(entry) = self
            .available_projects
            .iter_mut()
            .find(|p| p.id == self.project.id)
        {
            *entry = self.project.clone();
        }
    }

    /// Mirror the current project into the catalog, adding it if needed.
    fn upsert_catalog(&mut self) {
        if self.available_projects.iter().any(|p| p.id == self.project.id) {
            self.sync_catalog();
        } else {
            self.available_projects.push(self.project.clone());
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Runs

/// A test run that has been started but whose result has not arrived yet.
///
/// Carries everything the bridge needs so the store does not have to be
/// borrowed while the runtime is working.
#[derive(Debug, Clone)]
pub struct PendingRun {
    generation: u64,
    pub project_id: String,
    pub parser_options: ParserOptions,
    pub grammar: Grammar,
    pub test_case: TestCase,
    /// The case's result before any unfinished run marked it `Parsing`.
    pub previous_result: Option<TestResult>,
}

/// Runs are tracked per test case of a project.
type RunKey = (String, u32);

fn is_parsing(project: &Project, id: u32) -> bool {
    project
        .test_case(id)
        .and_then(|tc| tc.result.as_ref())
        .is_some_and(|r| r.status == TestStatus::Parsing)
}

////////////////////////////////////////////////////////////////////////////////
// Store

/// Handle returned by [`IdeStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(pub usize);

type Observer = Box<dyn FnMut(&IdeState)>;

pub struct IdeStore {
    state: IdeState,
    observers: Vec<(Subscription, Observer)>,
    next_subscription: usize,
    generation: u64,
    runs: HashMap<RunKey, (u64, Option<TestResult>)>,
}

impl IdeStore {
    /// Create a store for `project`, or for the template project if `None`.
    pub fn new(project: Option<Project>) -> Self {
        IdeStore {
            state: IdeState::new(project.unwrap_or_else(Project::template)),
            observers: vec![],
            next_subscription: 0,
            generation: 0,
            runs: HashMap::new(),
        }
    }

    pub fn state(&self) -> &IdeState {
        &self.state
    }

    fn notify(&mut self) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&self.state);
        }
    }

    /// Call `observer` now and after every mutation until unsubscribed.
    pub fn subscribe(
        &mut self,
        mut observer: impl FnMut(&IdeState) + 'static,
    ) -> Subscription {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        observer(&self.state);
        self.observers.push((subscription, Box::new(observer)));
        subscription
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.observers.retain(|(s, _)| *s != subscription);
    }

    pub fn set_project(&mut self, project: Project) {
        log::debug!("Switching to project '{}'", project.id);
        self.state.project = project;
        self.state.select_first_test_case();
        self.state.upsert_catalog();
        self.notify();
    }

    /// Select `test_case`, replacing the project's case with the same id or
    /// adding it if there is none.
    pub fn set_test_case(&mut self, test_case: TestCase) {
        self.state.project.upsert_test_case(test_case.clone());
        self.state.test_result = test_case.result.clone();
        self.state.test_case = Some(test_case);
        self.state.sync_catalog();
        self.notify();
    }

    /// Attach `result` to the selected test case.
    ///
    /// Without a selected test case there is nothing to attach to and the
    /// state is left untouched.
    pub fn set_test_result(&mut self, result: TestResult) {
        let test_case = match &self.state.test_case {
            Some(tc) => tc.with_result(result.clone()),
            None => {
                log::warn!("No test case selected; dropping test result.");
                return;
            }
        };
        self.state.project.upsert_test_case(test_case.clone());
        self.state.test_case = Some(test_case);
        self.state.test_result = Some(result);
        self.state.sync_catalog();
        self.notify();
    }

    pub fn set_grammar(&mut self, patch: GrammarPatch) {
        self.state.project.grammar.merge(patch);
        self.state.sync_catalog();
        self.notify();
    }

    /// Replace the grammar wholesale, e.g. with the outcome of a reload.
    pub fn replace_grammar(&mut self, grammar: Grammar) {
        self.state.project.grammar = grammar;
        self.state.sync_catalog();
        self.notify();
    }

    /// Store a grammar that was loaded for project `project_id`.
    ///
    /// Returns `false` and leaves the state alone if another project has
    /// been selected since, or if the grammar is unchanged.
    pub fn finish_grammar_load(&mut self, project_id: &str, grammar: Grammar) -> bool {
        if self.state.project.id != project_id {
            log::debug!("Project changed while loading grammar of '{}'", project_id);
            return false;
        }
        if self.state.project.grammar == grammar {
            return false;
        }
        self.replace_grammar(grammar);
        true
    }

    pub fn set_parser_options(&mut self, parser_options: ParserOptions) {
        self.state.project.parser_options = parser_options;
        self.state.sync_catalog();
        self.notify();
    }

    /// Replace the catalog and select its first project.
    ///
    /// An empty or missing catalog falls back to the sample projects.
    /// Later duplicates of an id are dropped.
    pub fn set_available_projects(&mut self, projects: Option<Vec<Project>>) {
        let projects = match projects {
            Some(projects) if !projects.is_empty() => projects,
            _ => {
                log::debug!("Empty catalog; falling back to samples");
                project::sample_projects()
            }
        };

        let mut catalog: Vec<Project> = Vec::with_capacity(projects.len());
        for project in projects {
            if catalog.iter().any(|p| p.id == project.id) {
                log::warn!("Duplicate project id '{}' ignored", project.id);
                continue;
            }
            catalog.push(project);
        }

        self.state.project = catalog[0].clone();
        self.state.available_projects = catalog;
        self.state.select_first_test_case();
        self.notify();
    }

    /// Select an existing test case by id.
    pub fn select_test_case(&mut self, id: u32) {
        let test_case = match self.state.project.test_case(id) {
            Some(tc) => tc.clone(),
            None => {
                log::warn!("No test case with id {}", id);
                return;
            }
        };
        self.state.test_result = test_case.result.clone();
        self.state.test_case = Some(test_case);
        self.notify();
    }

    pub fn remove_test_case(&mut self, id: u32) {
        if self.state.project.test_case(id).is_none() {
            log::warn!("No test case with id {}", id);
            return;
        }
        self.state.project.test_cases = self
            .state
            .project
            .test_cases
            .iter()
            .filter(|tc| tc.id != id)
            .cloned()
            .collect();
        if self.state.test_case.as_ref().is_some_and(|tc| tc.id == id) {
            self.state.select_first_test_case();
        }
        self.state.sync_catalog();
        self.notify();
    }

    /// Start a run of the selected test case.
    ///
    /// Marks the selected result as `Parsing` and supersedes any unfinished
    /// run of the same test case. Returns `None` if no test case is selected.
    pub fn begin_test_run(&mut self) -> Option<PendingRun> {
        let test_case = self.state.test_case.clone()?;
        let key = (self.state.project.id.clone(), test_case.id);

        // A superseded run never settles, so its predecessor's result is
        // the one to fall back to.
        let previous_result = match self.runs.get(&key) {
            Some((_, previous)) => previous.clone(),
            None => test_case.result.clone(),
        };

        self.generation += 1;
        self.runs
            .insert(key, (self.generation, previous_result.clone()));

        let run = PendingRun {
            generation: self.generation,
            project_id: self.state.project.id.clone(),
            parser_options: self.state.project.parser_options.clone(),
            grammar: self.state.project.grammar.clone(),
            test_case,
            previous_result,
        };
        self.set_test_result(TestResult::parsing());
        Some(run)
    }

    /// Record the result of `run`.
    ///
    /// The result is dropped (and `false` returned) if the same test case has
    /// been run again since, or if the run's project is no longer current.
    /// In the latter case the `Parsing` marker left in the catalog is reset
    /// to the case's previous result. If another test case has been selected
    /// meanwhile, the result still lands on the case that was run, without
    /// changing the selection.
    pub fn complete_test_run(
        &mut self,
        run: &PendingRun,
        result: TestResult,
    ) -> bool {
        let key = (run.project_id.clone(), run.test_case.id);
        match self.runs.get(&key) {
            Some((generation, _)) if *generation == run.generation => {
                self.runs.remove(&key);
            }
            _ => {
                log::debug!(
                    "Discarding superseded result for test case {} (run {})",
                    run.test_case.id,
                    run.generation
                );
                return false;
            }
        }

        if self.state.project.id != run.project_id {
            log::debug!(
                "Project '{}' is no longer current; discarding result",
                run.project_id
            );
            self.restore_previous_result(run);
            return false;
        }

        let selected = self.state.test_case.as_ref().map(|tc| tc.id);
        if selected == Some(run.test_case.id) {
            self.set_test_result(result);
            return true;
        }

        let test_case = match self.state.project.test_case(run.test_case.id) {
            Some(tc) => tc.with_result(result),
            None => {
                log::debug!("Test case {} was removed", run.test_case.id);
                return false;
            }
        };
        self.state.project.upsert_test_case(test_case);
        self.state.sync_catalog();
        self.notify();
        true
    }

    /// Put back the result `run` replaced, wherever it still shows `Parsing`.
    fn restore_previous_result(&mut self, run: &PendingRun) {
        let id = run.test_case.id;
        let Some(entry) = self
            .state
            .available_projects
            .iter_mut()
            .find(|p| p.id == run.project_id)
        else {
            return;
        };
        if !is_parsing(entry, id) {
            return;
        }
        if let Some(tc) = entry.test_case(id) {
            let restored = TestCase {
                result: run.previous_result.clone(),
                ..tc.clone()
            };
            entry.upsert_test_case(restored);
        }
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_case::TestStatus;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn success(content: &str) -> TestResult {
        TestResult {
            status: TestStatus::Success,
            content: Some(content.to_owned()),
            ..Default::default()
        }
    }

    fn bare_project(id: &str) -> Project {
        Project {
            id: id.to_owned(),
            name: id.to_owned(),
            grammar: Grammar::from_content("start: \"test\""),
            test_cases: vec![],
            parser_options: ParserOptions::default(),
        }
    }

    #[test]
    fn starts_from_template() {
        let store = IdeStore::new(None);
        let state = store.state();
        assert_eq!(state.project, Project::template());
        assert_eq!(state.test_case, Some(TestCase::template()));
        assert_eq!(state.test_result, TestCase::template().result);
        assert_eq!(state.available_projects, project::sample_projects());
    }

    #[test]
    fn starts_from_given_project() {
        let store = IdeStore::new(Some(project::hello_world()));
        let state = store.state();
        assert_eq!(state.project, project::hello_world());
        assert_eq!(state.test_case, project::hello_world().test_cases.first().cloned());
        assert_eq!(state.test_result, None);
    }

    #[test]
    fn set_project_replaces_catalog_entry_in_place() {
        let mut store = IdeStore::new(None);
        let index = store
            .state()
            .available_projects
            .iter()
            .position(|p| p.id == "json")
            .unwrap();
        let mut edited = project::json();
        edited.name = "Edited JSON".to_owned();

        store.set_project(edited.clone());

        let state = store.state();
        assert_eq!(state.available_projects[index], edited);
        assert_eq!(state.available_projects.len(), project::sample_projects().len());
    }

    #[test]
    fn set_project_appends_new_project() {
        let mut store = IdeStore::new(None);
        let before = store.state().available_projects.len();
        let mut new_project = bare_project("new-project");
        new_project.test_cases.push(TestCase { id: 1, ..TestCase::template() });

        store.set_project(new_project.clone());

        let state = store.state();
        assert_eq!(state.available_projects.len(), before + 1);
        assert_eq!(state.available_projects.last(), Some(&new_project));
        assert_eq!(state.test_case, new_project.test_cases.first().cloned());
    }

    #[test]
    fn set_project_without_test_cases() {
        let mut store = IdeStore::new(None);
        store.set_project(bare_project("no-tests"));
        assert_eq!(store.state().test_case, None);
        assert_eq!(store.state().test_result, None);
    }

    #[test]
    fn set_test_case_updates_existing() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        let updated = TestCase {
            description: Some("Updated test case".to_owned()),
            content: Some("updated content".to_owned()),
            ..project::hello_world().test_cases[0].clone()
        };

        store.set_test_case(updated.clone());

        let state = store.state();
        assert_eq!(state.test_case.as_ref(), Some(&updated));
        assert_eq!(state.project.test_cases, vec![updated.clone()]);
        let entry = state.available_projects.iter().find(|p| p.id == "hello-world").unwrap();
        assert_eq!(entry.test_cases, vec![updated]);
    }

    #[test]
    fn set_test_case_adds_new_and_is_idempotent() {
        let mut store = IdeStore::new(None);
        let added = TestCase {
            result: Some(success("success")),
            ..TestCase::new(2, "New test case", "test content")
        };

        store.set_test_case(added.clone());
        let once = store.state().project.test_cases.clone();
        store.set_test_case(added.clone());

        let state = store.state();
        assert_eq!(once.len(), 2);
        assert_eq!(state.project.test_cases, once);
        assert_eq!(state.test_result, added.result);
    }

    #[test]
    fn set_test_result_attaches_to_selected_case() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        let result = success("<tree>");

        store.set_test_result(result.clone());

        let state = store.state();
        assert_eq!(state.test_result.as_ref(), Some(&result));
        assert_eq!(state.test_case.as_ref().unwrap().result.as_ref(), Some(&result));
        assert_eq!(state.project.test_cases[0].result.as_ref(), Some(&result));
        let entry = state.available_projects.iter().find(|p| p.id == "hello-world").unwrap();
        assert_eq!(entry.test_cases[0].result.as_ref(), Some(&result));
    }

    #[test]
    fn set_test_result_without_selection_is_ignored() {
        let mut store = IdeStore::new(Some(bare_project("no-tests")));
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        store.subscribe(move |_| *counter.borrow_mut() += 1);

        let before = store.state().clone();
        store.set_test_result(success("x"));

        assert_eq!(store.state(), &before);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn set_grammar_merges() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        store.set_grammar(GrammarPatch::content("x"));

        let grammar = &store.state().project.grammar;
        assert_eq!(grammar.uri.as_deref(), Some("grammars/hello.lark"));
        assert_eq!(grammar.content.as_deref(), Some("x"));
        assert_eq!(grammar.error, None);

        let entry = &store.state().available_projects[0];
        assert_eq!(entry.grammar, *grammar);
    }

    #[test]
    fn empty_grammar_patch_changes_nothing() {
        let mut store = IdeStore::new(None);
        store.set_grammar(GrammarPatch::default());
        assert_eq!(store.state().project.grammar, Grammar::template());
    }

    #[test]
    fn replace_grammar_clears_stale_error() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        store.set_grammar(GrammarPatch {
            error: Some("Failed to load grammar: Not Found".to_owned()),
            ..Default::default()
        });
        store.replace_grammar(Grammar {
            uri: Some("grammars/hello.lark".to_owned()),
            content: Some("start: WORD".to_owned()),
            error: None,
        });
        assert_eq!(store.state().project.grammar.error, None);
    }

    #[test]
    fn grammar_load_for_other_project_is_dropped() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        store.set_project(project::json());
        let loaded = Grammar::from_content("start: WORD");

        assert!(!store.finish_grammar_load("hello-world", loaded.clone()));
        assert_eq!(store.state().project.grammar, project::json().grammar);

        assert!(store.finish_grammar_load("json", loaded.clone()));
        assert_eq!(store.state().project.grammar, loaded);
        assert!(!store.finish_grammar_load("json", loaded));
    }

    #[test]
    fn set_available_projects_selects_first() {
        let mut store = IdeStore::new(None);
        let catalog = vec![project::hello_world(), Project::template()];

        store.set_available_projects(Some(catalog.clone()));

        let state = store.state();
        assert_eq!(state.available_projects, catalog);
        assert_eq!(state.project, project::hello_world());
        assert_eq!(state.test_case, project::hello_world().test_cases.first().cloned());
    }

    #[test]
    fn empty_catalog_falls_back_to_samples() {
        for input in [Some(vec![]), None] {
            let mut store = IdeStore::new(Some(bare_project("custom")));
            store.set_available_projects(input);
            assert_eq!(store.state().available_projects, project::sample_projects());
            assert_eq!(store.state().project, project::sample_projects()[0]);
        }
    }

    #[test]
    fn catalog_drops_duplicate_ids() {
        let mut store = IdeStore::new(None);
        let mut renamed = project::json();
        renamed.name = "Other".to_owned();
        store.set_available_projects(Some(vec![project::json(), renamed]));
        assert_eq!(store.state().available_projects, vec![project::json()]);
    }

    #[test]
    fn subscribers_are_independent() {
        let mut store = IdeStore::new(None);
        let first = Rc::new(RefCell::new(vec![]));
        let second = Rc::new(RefCell::new(vec![]));

        let log = first.clone();
        let a = store.subscribe(move |s| log.borrow_mut().push(s.project.id.clone()));
        let log = second.clone();
        store.subscribe(move |s| log.borrow_mut().push(s.project.id.clone()));

        store.set_project(project::json());
        store.unsubscribe(a);
        store.set_project(project::semver());

        assert_eq!(*first.borrow(), vec!["template", "json"]);
        assert_eq!(*second.borrow(), vec!["template", "json", "semver"]);
    }

    #[test]
    fn edits_survive_project_switch() {
        let mut store = IdeStore::new(None);
        store.set_project(project::hello_world());
        let added = TestCase::new(2, "Added test", "test");
        store.set_test_case(added.clone());
        store.set_project(Project::template());

        let entry = store
            .state()
            .available_projects
            .iter()
            .find(|p| p.id == "hello-world")
            .unwrap();
        assert_eq!(entry.test_cases.len(), 2);
        assert!(entry.test_cases.contains(&added));
    }

    #[test]
    fn select_and_remove_test_cases() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        store.set_test_case(TestCase::new(2, "second", "b"));
        store.select_test_case(1);
        assert_eq!(store.state().test_case.as_ref().unwrap().id, 1);

        store.select_test_case(42);
        assert_eq!(store.state().test_case.as_ref().unwrap().id, 1);

        store.remove_test_case(1);
        let state = store.state();
        assert_eq!(state.project.test_cases.len(), 1);
        assert_eq!(state.test_case.as_ref().unwrap().id, 2);
        assert_eq!(state.available_projects[0].test_cases.len(), 1);
    }

    #[test]
    fn stale_runs_are_discarded() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        let first = store.begin_test_run().unwrap();
        assert_eq!(store.state().test_result, Some(TestResult::parsing()));
        let second = store.begin_test_run().unwrap();

        assert!(store.complete_test_run(&second, success("new")));
        assert!(!store.complete_test_run(&first, success("old")));
        assert_eq!(store.state().test_result, Some(success("new")));
    }

    #[test]
    fn run_for_deselected_case_keeps_selection() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        let run = store.begin_test_run().unwrap();
        store.set_test_case(TestCase::new(2, "other", "x"));

        assert!(store.complete_test_run(&run, success("late")));
        let state = store.state();
        assert_eq!(state.test_case.as_ref().unwrap().id, 2);
        assert_eq!(state.test_result, None);
        assert_eq!(state.project.test_cases[0].result, Some(success("late")));
    }

    #[test]
    fn run_for_other_project_is_discarded() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        let run = store.begin_test_run().unwrap();
        store.set_project(project::json());

        assert!(!store.complete_test_run(&run, success("late")));
        assert_eq!(store.state().test_result, None);
    }

    fn catalog_result(store: &IdeStore, project_id: &str, id: u32) -> Option<TestResult> {
        store
            .state()
            .available_projects
            .iter()
            .find(|p| p.id == project_id)
            .and_then(|p| p.test_case(id))
            .and_then(|tc| tc.result.clone())
    }

    #[test]
    fn runs_of_different_cases_do_not_supersede_each_other() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        let first = store.begin_test_run().unwrap();
        store.set_test_case(TestCase::new(2, "second", "b"));
        let second = store.begin_test_run().unwrap();

        assert!(store.complete_test_run(&second, success("second")));
        assert!(store.complete_test_run(&first, success("first")));

        let state = store.state();
        assert_eq!(state.project.test_cases[0].result, Some(success("first")));
        assert_eq!(state.test_result, Some(success("second")));
        assert_eq!(catalog_result(&store, "hello-world", 1), Some(success("first")));
    }

    #[test]
    fn switching_project_mid_run_restores_previous_result() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        store.set_test_result(success("before"));
        let run = store.begin_test_run().unwrap();
        assert_eq!(catalog_result(&store, "hello-world", 1), Some(TestResult::parsing()));

        store.set_project(project::json());
        assert!(!store.complete_test_run(&run, success("late")));

        assert_eq!(catalog_result(&store, "hello-world", 1), Some(success("before")));
        assert_eq!(store.state().project, project::json());
    }

    #[test]
    fn superseded_runs_restore_the_oldest_result() {
        let mut store = IdeStore::new(Some(project::hello_world()));
        store.set_test_result(success("before"));
        let first = store.begin_test_run().unwrap();
        let second = store.begin_test_run().unwrap();
        assert_eq!(second.previous_result, Some(success("before")));

        store.set_project(project::json());
        assert!(!store.complete_test_run(&second, success("second")));
        assert!(!store.complete_test_run(&first, success("first")));

        assert_eq!(catalog_result(&store, "hello-world", 1), Some(success("before")));
    }

    #[test]
    fn no_run_without_test_case() {
        let mut store = IdeStore::new(Some(bare_project("empty")));
        assert!(store.begin_test_run().is_none());
    }
}
