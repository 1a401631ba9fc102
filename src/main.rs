//! vigil CLI: online rule learning for event recognition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use vigil::config::LearnerConfig;
use vigil::example::read_examples;
use vigil::learner::Learner;
use vigil::parser::{parse_clause_file, parse_mode_file};
use vigil::solver::ForwardGrounder;

#[derive(Parser)]
#[command(name = "vigil", version, about = "Online event-definition rule learner")]
struct Cli {
    /// Path to a JSON configuration file (defaults apply when omitted).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a theory from a training stream.
    Learn {
        /// Mode-declaration file (the language bias).
        #[arg(long)]
        modes: PathBuf,

        /// Training examples (JSON lines).
        #[arg(long)]
        train: PathBuf,

        /// Optional held-out test examples (JSON lines).
        #[arg(long)]
        test: Option<PathBuf>,

        /// Write the final theory here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Evaluate an existing theory file against an example stream.
    Eval {
        /// Mode-declaration file (the language bias).
        #[arg(long)]
        modes: PathBuf,

        /// Theory file: one weighted rule per line.
        #[arg(long)]
        theory: PathBuf,

        /// Examples to evaluate on (JSON lines).
        #[arg(long)]
        examples: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LearnerConfig::from_json_file(path)?,
        None => LearnerConfig::default(),
    };

    match cli.command {
        Commands::Learn {
            modes,
            train,
            test,
            output,
        } => {
            let mode_text = std::fs::read_to_string(&modes).into_diagnostic()?;
            let declarations = parse_mode_file(&mode_text)?;
            let training = read_examples(&train)?;

            let mut learner = Learner::new(config, &declarations, ForwardGrounder)?;
            learner.run(training.clone())?;
            learner.rescore(&training)?;

            let rendered = learner.theory().render();
            match output {
                Some(path) => {
                    std::fs::write(&path, &rendered).into_diagnostic()?;
                    println!("wrote {} rules to {}", learner.theory().len(), path.display());
                }
                None => print!("{rendered}"),
            }

            if let Some(test) = test {
                let held_out = read_examples(&test)?;
                let report = learner.evaluate(&held_out)?;
                println!(
                    "test: precision {:.3}  recall {:.3}  f-score {:.3}  ({} tps, {} fps, {} fns)",
                    report.precision(),
                    report.recall(),
                    report.fscore(),
                    report.tps,
                    report.fps,
                    report.fns
                );
            }
        }

        Commands::Eval {
            modes,
            theory,
            examples,
        } => {
            let mode_text = std::fs::read_to_string(&modes).into_diagnostic()?;
            let declarations = parse_mode_file(&mode_text)?;
            let rules = parse_clause_file(&std::fs::read_to_string(&theory).into_diagnostic()?)?;
            let stream = read_examples(&examples)?;

            let mut learner = Learner::new(config, &declarations, ForwardGrounder)?;
            learner.install_theory(rules)?;
            let report = learner.evaluate(&stream)?;
            println!(
                "precision {:.3}  recall {:.3}  f-score {:.3}  ({} tps, {} fps, {} fns over {} examples)",
                report.precision(),
                report.recall(),
                report.fscore(),
                report.tps,
                report.fps,
                report.fns,
                report.examples
            );
        }
    }

    Ok(())
}
