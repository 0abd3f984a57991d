//! Run a repeated cross-validation evaluation from a TOML experiment file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use cuminc::config::ExperimentConfig;
use cuminc::io::read_table;
use cuminc::{CsvSink, Evaluation, Summary, SurvivalDataset};

#[derive(Debug, Parser)]
#[command(
    name = "evaluate",
    about = "Repeated cross-validation evaluation of a competing-risks survival model"
)]
struct Args {
    /// Path to the experiment TOML file.
    config: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let experiment = ExperimentConfig::load(&args.config)?;
    let table = read_table(&experiment.dataset)?;
    let (dataset, _encoder) = SurvivalDataset::from_table(
        &table,
        &experiment.columns,
        &experiment.time_column,
        &experiment.event_column,
        experiment.topology.n_risks,
        experiment.horizon,
    )?;

    let config = experiment.eval_config()?;
    let confidence = config.confidence;
    let evaluation = Evaluation::new(
        config,
        experiment.topology.clone(),
        experiment.training.clone(),
        experiment.grid.clone(),
    );
    let mut sink = CsvSink::new(experiment.output_dir.clone())?;
    let report = evaluation.run(&dataset, &mut sink)?;

    print_summary(
        "concordance",
        report.concordance_summary(confidence),
        confidence,
    );
    print_summary(
        "integrated brier score",
        report.brier_summary(confidence),
        confidence,
    );
    Ok(())
}

fn print_summary(
    name: &str,
    summary: Result<Summary, cuminc::AggregateError>,
    confidence: f64,
) {
    match summary {
        Ok(s) => println!(
            "{name}: {:.4} ({:.0}% CI {:.4} to {:.4}, {} folds)",
            s.mean,
            confidence * 100.0,
            s.lower,
            s.upper,
            s.n
        ),
        Err(err) => println!("{name}: {err}"),
    }
}
