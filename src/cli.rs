use crate::config::types::CheckConfig;
use crate::exec::executor::Checker;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// Exit code for a program that failed or timed out
const EXIT_NOT_PASSED: i32 = 1;
/// Exit code for harness setup problems
const EXIT_SETUP: i32 = 2;

#[derive(Parser)]
#[command(author, version, about = "Run an untrusted Python program and report whether it succeeds", long_about = None)]
struct Cli {
    /// Wall-clock deadline in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,
    /// Address-space cap for the worker in bytes
    #[arg(long, value_name = "BYTES")]
    max_memory: Option<u64>,
    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Interpreter used to run the program
    #[arg(long, value_name = "PATH")]
    interpreter: Option<PathBuf>,
    /// Print the full check report as JSON
    #[arg(long)]
    json: bool,
    /// Program file; reads stdin when omitted or `-`
    file: Option<PathBuf>,
}

fn build_config(cli: &Cli) -> Result<CheckConfig> {
    let mut config = match &cli.config {
        Some(path) => CheckConfig::from_file(path)?,
        None => CheckConfig::default(),
    };

    if let Some(secs) = cli.timeout {
        let timeout = Duration::try_from_secs_f64(secs)
            .map_err(|e| anyhow::anyhow!("invalid --timeout {}: {}", secs, e))?;
        config = config.with_timeout(timeout);
    }
    if let Some(bytes) = cli.max_memory {
        config = config.with_max_memory(bytes);
    }
    if let Some(interpreter) = &cli.interpreter {
        config.interpreter = interpreter.clone();
    }

    config.validate()?;
    Ok(config)
}

fn read_program(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read program file {}", path.display())),
        _ => {
            let mut program = String::new();
            std::io::stdin()
                .read_to_string(&mut program)
                .context("Failed to read program from stdin")?;
            Ok(program)
        }
    }
}

fn check(cli: &Cli) -> Result<bool> {
    let config = build_config(cli)?;
    let program = read_program(cli.file.as_ref())?;
    let report = Checker::new(config)?.check(&program)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.result.first_diagnostic());
    }
    Ok(report.passed())
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match check(&cli) {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(EXIT_NOT_PASSED),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_SETUP);
        }
    }
}
