use lark_ide::{config, main_handler};

use ansi_term::Color::*;
use clap::{builder::styling::*, Parser, Subcommand};
use std::path::PathBuf;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

#[derive(Parser)]
#[command(
    version,
    about = format!("{} for {}",
        Purple.bold().paint("Grammar playground"),
        Yellow.bold().paint("Lark"),
    ),
    long_about = None,
    styles = styles(),
)]
struct Cli {
    /// Configuration file (defaults to lark-ide.toml if present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory that grammar URIs resolve against
    #[arg(long, value_name = "DIR", global = true)]
    grammar_root: Option<PathBuf>,

    /// Python interpreter with Lark installed
    #[arg(long, value_name = "PYTHON", global = true)]
    python: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the sample projects
    Projects,

    /// Load a project's grammar
    Grammar {
        /// The project to use
        #[arg(short, long, value_name = "ID")]
        project: String,

        /// Save the grammar as <ID>.lark in this directory instead of printing it
        #[arg(short, long, value_name = "DIR")]
        download: Option<PathBuf>,
    },

    /// Run a project's test cases through Lark
    Run {
        /// The project to use
        #[arg(short, long, value_name = "ID")]
        project: String,

        /// Use this grammar file instead of the project's grammar
        #[arg(short, long, value_name = "FILE")]
        grammar: Option<PathBuf>,

        /// Parse this text instead of the project's test cases
        #[arg(short, long, value_name = "TEXT")]
        input: Option<String>,

        /// Override the parsing algorithm (lalr or earley)
        #[arg(long, value_name = "ID")]
        parser: Option<String>,

        /// Only print the status of each test case
        #[arg(short, long, action)]
        quiet: bool,
    },

    /// Show or change the theme (light, dark or toggle)
    Theme {
        #[arg(value_name = "THEME")]
        value: Option<String>,
    },
}

impl Cli {
    fn config(&self) -> Result<config::IdeConfig, String> {
        let mut config = config::IdeConfig::load(self.config.as_deref())
            .map_err(|e| format!("{} {}", Red.bold().paint("error:"), e))?;
        if let Some(root) = &self.grammar_root {
            config.grammar_root = root.clone();
        }
        if let Some(python) = &self.python {
            config.python = python.clone();
        }
        Ok(config)
    }

    async fn handle(self) -> Result<(), String> {
        let config = self.config()?;
        match self.command {
            Command::Projects => main_handler::projects(),
            Command::Grammar { project, download } => {
                main_handler::grammar(&config, &project, download).await
            }
            Command::Run {
                project,
                grammar,
                input,
                parser,
                quiet,
            } => {
                main_handler::run(&config, &project, grammar, input, parser, quiet)
                    .await
            }
            Command::Theme { value } => main_handler::theme(&config, value),
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = cli.handle().await;

    match result {
        Ok(()) => (),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1)
        }
    }
}
