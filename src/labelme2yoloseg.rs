use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use pelvis_yolo_prep::{process_dataset, ConvertArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ConvertArgs::parse();

    if !args.data_dir.exists() {
        error!(
            "The specified data_dir does not exist: {}",
            args.data_dir.display()
        );
        return ExitCode::FAILURE;
    }

    info!("Starting LabelMe to YOLO segmentation conversion...");

    match process_dataset(&args) {
        Ok(_) => {
            info!("Conversion process completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to process dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
