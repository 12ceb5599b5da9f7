use crate::*;

use ansi_term::Color::*;
use std::path::PathBuf;

fn find_project(id: &str) -> Result<project::Project, String> {
    project::sample_projects()
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| {
            format!(
                "{} unknown project '{}' (see `lark-ide projects`)",
                Red.bold().paint("error:"),
                id
            )
        })
}

async fn fetch_grammar(
    config: &config::IdeConfig,
    store: &mut ide::IdeStore,
    force: bool,
) -> Result<(), String> {
    let fetcher = fetch::UriFetcher::new(&config.grammar_root);
    let project = &store.state().project;
    let project_id = project.id.clone();
    let loaded =
        grammar::load_grammar(&fetcher, project.grammar.clone(), force).await;
    store.finish_grammar_load(&project_id, loaded);

    let grammar = &store.state().project.grammar;
    if grammar.has_error() {
        return Err(format!(
            "{} {}",
            Red.bold().paint("grammar error:"),
            grammar.error.as_deref().unwrap_or_default()
        ));
    }
    Ok(())
}

pub fn projects() -> Result<(), String> {
    let store = ide::IdeStore::new(None);
    for project in &store.state().available_projects {
        println!(
            "{:<16} {} {}",
            Cyan.bold().paint(&project.id),
            project.name,
            Fixed(8).paint(format!(
                "({}, {} test case{}, {})",
                project.parser_options.algorithm.name,
                project.test_cases.len(),
                if project.test_cases.len() == 1 { "" } else { "s" },
                project.grammar.uri.as_deref().unwrap_or("inline grammar"),
            ))
        );
    }
    Ok(())
}

pub async fn grammar(
    config: &config::IdeConfig,
    project_id: &str,
    download: Option<PathBuf>,
) -> Result<(), String> {
    let mut store = ide::IdeStore::new(Some(find_project(project_id)?));
    fetch_grammar(config, &mut store, true).await?;

    let project = &store.state().project;
    match download {
        None => {
            print!("{}", project.grammar.content.as_deref().unwrap_or_default());
            Ok(())
        }
        Some(dir) => {
            let file = grammar::download_grammar(&project.id, &project.grammar)
                .ok_or_else(|| "grammar has no content".to_owned())?;
            let path = dir.join(&file.file_name);
            std::fs::write(&path, &file.content).map_err(|e| e.to_string())?;
            println!(
                "{} {}",
                Green.bold().paint("Downloaded"),
                path.display()
            );
            Ok(())
        }
    }
}

fn print_result(test_case: &test_case::TestCase, quiet: bool) {
    use test_case::TestStatus;

    let result = test_case.result.clone().unwrap_or_default();
    let status = match result.status {
        TestStatus::Success => Green.bold().paint("Success"),
        TestStatus::Failure => Red.bold().paint("Failure"),
        TestStatus::Parsing => Yellow.bold().paint("Parsing"),
        TestStatus::Unknown => Fixed(8).bold().paint("Unknown"),
    };

    println!(
        "{} {}",
        Fixed(8).paint(format!(
            "══ Test {} {}",
            test_case.id,
            test_case.description.as_deref().unwrap_or_default()
        )),
        status
    );

    if quiet {
        return;
    }

    match result.status {
        TestStatus::Success => {
            let content = result.content.unwrap_or_default();
            match tree::ParseNode::from_json(&content) {
                Ok(node) => print!("\n{}\n", node.pretty()),
                Err(_) => println!("\n{}\n", content),
            }
        }
        _ => {
            if let Some(message) = result.message.filter(|m| !m.is_empty()) {
                println!("\n  {}", message);
            }
            if let Some(traceback) = result.traceback.filter(|t| !t.is_empty()) {
                println!("\n{}", Fixed(8).paint(traceback));
            }
            println!();
        }
    }
}

pub async fn run(
    config: &config::IdeConfig,
    project_id: &str,
    grammar_path: Option<PathBuf>,
    input: Option<String>,
    parser: Option<String>,
    quiet: bool,
) -> Result<(), String> {
    let mut store = ide::IdeStore::new(Some(find_project(project_id)?));

    match grammar_path {
        Some(path) => {
            let content =
                std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
            store.replace_grammar(grammar::Grammar {
                uri: Some(path.display().to_string()),
                content: Some(content),
                error: None,
            });
        }
        None => fetch_grammar(config, &mut store, false).await?,
    }

    if let Some(id) = parser {
        let algorithm = parser::ParsingAlgorithm::by_id(&id)
            .ok_or_else(|| format!("unknown parser '{}'", id))?;
        let options = parser::ParserOptions {
            algorithm,
            ..store.state().project.parser_options.clone()
        };
        store.set_parser_options(options);
    }

    let ids: Vec<u32> = match input {
        Some(input) => {
            let id = test_case::TestCase::next_id(&store.state().project.test_cases);
            store.set_test_case(test_case::TestCase::new(id, "Command-line input", &input));
            vec![id]
        }
        None => store.state().project.test_cases.iter().map(|tc| tc.id).collect(),
    };

    let mut runtime = process::ProcessRuntime::new(&config.python);
    runtime::setup_runtime(&mut runtime, |status| {
        if !quiet {
            eprintln!("{}", Fixed(8).paint(status.message));
        }
    })
    .await
    .map_err(|e| format!("{} {}", Red.bold().paint("runtime error:"), e))?;

    let mut failures = 0;
    for id in &ids {
        store.select_test_case(*id);
        let start = instant::Instant::now();
        let result = bridge::run_current_test(&mut store, &mut runtime).await;
        log::info!("Test case {} took {:?}", id, start.elapsed());

        if result.map_or(true, |r| r.status != test_case::TestStatus::Success) {
            failures += 1;
        }
        if let Some(tc) = store.state().project.test_case(*id) {
            print_result(tc, quiet);
        }
    }

    if failures > 0 {
        return Err(format!(
            "{} {} of {} test cases failed",
            Red.bold().paint("error:"),
            failures,
            ids.len()
        ));
    }
    Ok(())
}

pub fn theme(
    config: &config::IdeConfig,
    value: Option<String>,
) -> Result<(), String> {
    let storage = theme::FileStorage::open(&config.settings_path);
    let mut settings = theme::ThemeSettings::load(storage);

    match value.as_deref() {
        None => (),
        Some("toggle") => {
            settings.toggle()?;
        }
        Some(s) => {
            let theme = s
                .parse::<theme::Theme>()
                .map_err(|_| format!("unknown theme '{}'", s))?;
            settings.set_theme(theme)?;
        }
    }

    println!("{}", settings.theme().as_str());
    Ok(())
}
