//! Easel style engine CLI
//!
//! Inspect stylesheets from the command line: dump their tokens, check them
//! for syntax errors, print the parsed form and see which declarations reach
//! an element.

mod element;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use easel_css::cascade::{StyleManagerConfig, StyleOrigin};
use easel_css::tokenizer::CSSTokenizer;
use easel_css::{ParseError, StyleManager, parse_stylesheet};
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Easel: inspect stylesheets for the Easel drawing editor
#[derive(Parser, Debug)]
#[command(name = "easel")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Show the token stream of a stylesheet
    easel tokens theme.css

    # Report syntax errors
    easel check theme.css overrides.css

    # Print the parsed stylesheet as JSON
    easel dump --json theme.css

    # Show the styles that reach a selected rect inside a layer
    easel match --element 'layer > rect.warning:selected' --rules theme.css

    # Log compile jobs
    RUST_LOG=easel_css=debug easel match --element rect theme.css
"#)]
struct Cli {
    /// Style manager configuration (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tokens of a stylesheet
    Tokens {
        /// Stylesheet to tokenize
        file: PathBuf,

        /// Print JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parse stylesheets and report syntax errors
    Check {
        /// Stylesheets to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a parsed stylesheet
    Dump {
        /// Stylesheet to parse
        file: PathBuf,

        /// Print the syntax tree as JSON instead of CSS
        #[arg(long)]
        json: bool,
    },

    /// Apply stylesheets to an element and print the winning declarations
    Match {
        /// Element path as a child selector chain, e.g. 'layer > rect.warning'
        #[arg(short, long, value_name = "PATH")]
        element: String,

        /// Author stylesheets, in cascade order
        files: Vec<PathBuf>,

        /// User agent stylesheets, in cascade order
        #[arg(long = "user-agent", value_name = "FILE")]
        user_agent: Vec<PathBuf>,

        /// Also list every matching ruleset
        #[arg(long)]
        rules: bool,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Tokens { file, json } => print_tokens(&file, json),
        Command::Check { files } => check(&files),
        Command::Dump { file, json } => dump(&file, json),
        Command::Match {
            element,
            files,
            user_agent,
            rules,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let output = if json { Output::Json } else { Output::Text };
            match_element(config, &element, &user_agent, &files, rules, output)
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Output {
    Text,
    Json,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<StyleManagerConfig> {
    let Some(path) = path else {
        return Ok(StyleManagerConfig::default());
    };
    let config: StyleManagerConfig = serde_json::from_str(&read(path)?)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    debug!(?config, path = %path.display(), "loaded configuration");
    Ok(config)
}

fn report(file: &Path, error: &ParseError) {
    eprintln!(
        "{}: {}:{}: {} (offset {})",
        "error".red().bold(),
        file.display(),
        error.line,
        error.message,
        error.offset
    );
}

fn print_tokens(file: &Path, json: bool) -> Result<ExitCode> {
    let mut tokenizer = CSSTokenizer::new(read(file)?);
    tokenizer.run();

    if json {
        println!("{}", serde_json::to_string_pretty(tokenizer.tokens())?);
    } else {
        for token in tokenizer.tokens() {
            println!(
                "{:>4}:{:<6} {:?}",
                token.line.dimmed(),
                token.start.dimmed(),
                token.value
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn check(files: &[PathBuf]) -> Result<ExitCode> {
    let mut failed = false;
    for file in files {
        let (stylesheet, errors) = parse_stylesheet(&read(file)?);
        if errors.is_empty() {
            println!(
                "{} {} ({} rulesets)",
                "ok".green().bold(),
                file.display(),
                stylesheet.rulesets.len()
            );
        } else {
            failed = true;
            for error in &errors {
                report(file, error);
            }
        }
    }
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn dump(file: &Path, json: bool) -> Result<ExitCode> {
    let (stylesheet, errors) = parse_stylesheet(&read(file)?);
    for error in &errors {
        report(file, error);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&stylesheet)?);
    } else {
        print!("{stylesheet}");
    }
    Ok(if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn match_element(
    config: StyleManagerConfig,
    element: &str,
    user_agent: &[PathBuf],
    author: &[PathBuf],
    show_rules: bool,
    output: Output,
) -> Result<ExitCode> {
    let (tree, target, overrides) = element::build(element)?;

    let mut styles = StyleManager::new(config)?;
    for (origin, files) in [(StyleOrigin::UserAgent, user_agent), (StyleOrigin::Author, author)] {
        for file in files {
            let _ = styles.add_stylesheet(origin, None, &file.to_string_lossy());
        }
    }

    // Broken stylesheets are reported but do not stop the others.
    for failure in styles.compile_failures() {
        eprintln!("{}: [{}] {}", "error".red().bold(), failure.origin, failure.error);
    }
    for sheet in styles.parse_errors() {
        for error in &sheet.errors {
            eprintln!("{}: {}: {error}", "warning".yellow().bold(), sheet.source);
        }
    }

    let applied = styles.apply_styles_to(&tree, &target, &overrides);
    let matched = if show_rules {
        styles.matching_rulesets(&tree, &target, &overrides)
    } else {
        Vec::new()
    };

    if output == Output::Json {
        let value = serde_json::json!({
            "matched": matched,
            "applied": applied,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(ExitCode::SUCCESS);
    }

    for rule in &matched {
        println!(
            "{} {} {}",
            format!("[{}]", rule.origin).dimmed(),
            rule.ruleset.selectors.bold(),
            format!("({})", rule.source).dimmed()
        );
    }
    if !matched.is_empty() {
        println!();
    }

    if applied.is_empty() {
        println!("{}", "no declarations apply".dimmed());
    }
    for (property, winner) in applied.iter() {
        println!(
            "{}: {}{} {}",
            property.bold(),
            winner.declaration.value_text(),
            if winner.declaration.important {
                " !important"
            } else {
                ""
            },
            format!("({})", winner.origin).dimmed()
        );
    }
    Ok(ExitCode::SUCCESS)
}
