use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use pelvis_yolo_prep::{process_tree, NormalizeArgs, NormalizeOptions};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = NormalizeArgs::parse();

    if !args.input_dir.is_dir() {
        error!(
            "The specified input_dir does not exist: {}",
            args.input_dir.display()
        );
        return ExitCode::FAILURE;
    }

    info!(
        "Normalizing {} into {}...",
        args.input_dir.display(),
        args.output_dir.display()
    );

    let options = NormalizeOptions::new(&args.passthrough_ext);
    match process_tree(&args.input_dir, &args.output_dir, &options) {
        Ok(stats) => {
            info!(
                "Done: {} image(s) written to {}",
                stats.produced(),
                args.output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to process {}: {}", args.input_dir.display(), e);
            ExitCode::FAILURE
        }
    }
}
