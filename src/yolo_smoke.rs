use clap::Parser;
use image::GenericImageView;
use log::{error, info};
use std::process::ExitCode;

use pelvis_yolo_prep::inference::load_source_image;
use pelvis_yolo_prep::{Detector, DetectorConfig, InferenceError, SmokeArgs};

fn run(args: &SmokeArgs) -> Result<(), InferenceError> {
    let mut detector = Detector::new(
        &args.model,
        DetectorConfig {
            imgsz: args.imgsz,
            conf: args.conf,
            iou: args.iou,
            max_det: args.max_det,
        },
    )?;
    info!("Loaded model {}", detector.model_path().display());

    let image = load_source_image(&args.source)?;
    let detections = detector.detect(&image)?;

    let (width, height) = image.dimensions();
    println!("Image shape: ({}, {})", height, width);
    println!("Detections: {}", detections.len());
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = SmokeArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Smoke test failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
