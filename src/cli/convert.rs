//! Conversion command implementation

use tracing::{error, info};

use super::{Cli, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::batch::{failure_count, BatchError, BatchRunner};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, SubformMode};
use crate::structure::LoadError;

fn overrides(cli: &Cli) -> CliOverrides {
    CliOverrides {
        output_dir: cli.output_dir.clone(),
        report: cli.report.then_some(true),
        copy_resources: cli.copy_resources.then_some(true),
        jobs: cli.jobs,
        subform_mode: cli.standalone_forms.then_some(SubformMode::Standalone),
    }
}

fn exit_code_for(err: &BatchError) -> u8 {
    match err {
        BatchError::NotFound(_)
        | BatchError::StandaloneSubForm(_)
        | BatchError::Load(LoadError::UnsupportedFile(_)) => EXIT_INVALID_ARGS,
        _ => EXIT_ERROR,
    }
}

/// Execute a conversion run and return the process exit code.
pub fn run_convert(cli: &Cli) -> u8 {
    if !cli.input.exists() {
        eprintln!("Error: input not found: {}", cli.input.display());
        return EXIT_INVALID_ARGS;
    }
    if cli.single_file && !cli.input.is_file() {
        eprintln!("Error: --single-file expects a .dbm file, got {}", cli.input.display());
        return EXIT_INVALID_ARGS;
    }
    if !cli.single_file && !cli.input.is_dir() {
        eprintln!("Error: {} is a file; use --single-file to convert it", cli.input.display());
        return EXIT_INVALID_ARGS;
    }

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_ERROR;
        }
    };
    merge_cli_overrides(&mut config, &overrides(cli));

    let runner = BatchRunner::new(config);
    info!("Writing programs to {}", runner.output_dir().display());
    let result = if cli.single_file { runner.run_single(&cli.input) } else { runner.run_directory(&cli.input) };

    let records = match result {
        Ok(records) => records,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return exit_code_for(&e);
        }
    };

    let failed = failure_count(&records);
    println!("Converted {} file(s), {} failed. Output: {}", records.len() - failed, failed, runner.output_dir().display());
    if failed > 0 {
        EXIT_ERROR
    } else {
        EXIT_SUCCESS
    }
}
