use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::config::{ClassMap, ConvertArgs};
use crate::conversion::{convert_to_segment_lines, SegmentLine};
use crate::error::ConvertError;
use crate::io::{collect_json_files, create_dataset_yaml, write_label_file};
use crate::types::ConversionStats;
use crate::utils::{create_progress_bar, label_file_stem, read_and_parse_json};

/// Result of converting one annotation file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// A label file was written with these lines
    Written(PathBuf, Vec<SegmentLine>),
    /// No shape carried a known label, so nothing was written
    NoRelevantShapes,
}

/// Options for a folder conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Log and count malformed files instead of returning the first error
    pub skip_invalid: bool,
}

/// Convert one LabelMe JSON file into at most one label file in `labels_dir`
pub fn convert_single_file(
    json_path: &Path,
    labels_dir: &Path,
    class_map: &ClassMap,
) -> Result<FileOutcome, ConvertError> {
    let annotation = read_and_parse_json(json_path)?;
    let lines = convert_to_segment_lines(&annotation, class_map)?;
    if lines.is_empty() {
        return Ok(FileOutcome::NoRelevantShapes);
    }

    let stem = label_file_stem(&annotation.image_path);
    let label_path = write_label_file(labels_dir, &stem, &lines)?;
    Ok(FileOutcome::Written(label_path, lines))
}

/// Convert every LabelMe JSON file in `images_dir`, in sorted order
pub fn convert_folder(
    images_dir: &Path,
    labels_dir: &Path,
    class_map: &ClassMap,
    options: ConvertOptions,
) -> Result<ConversionStats, ConvertError> {
    let mut stats = ConversionStats::new();
    let json_files = collect_json_files(images_dir);
    if json_files.is_empty() {
        info!("No labelme JSON files found in {}", images_dir.display());
        return Ok(stats);
    }

    stats.files_found = json_files.len();
    info!(
        "Found {} labelme JSON files in {}",
        json_files.len(),
        images_dir.display()
    );

    let label = images_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "labels".to_string());
    let pb = create_progress_bar(json_files.len() as u64, &label);

    for json_path in &json_files {
        match convert_single_file(json_path, labels_dir, class_map) {
            Ok(FileOutcome::Written(label_path, _)) => {
                pb.suspend(|| info!("Written {}", label_path.display()));
                stats.increment_written();
            }
            Ok(FileOutcome::NoRelevantShapes) => {
                pb.suspend(|| {
                    info!(
                        "No relevant shapes in {}, skipping.",
                        json_path.display()
                    )
                });
                stats.increment_skipped_no_shapes();
            }
            Err(e) if options.skip_invalid => {
                pb.suspend(|| warn!("Skipping {}: {}", json_path.display(), e));
                stats.increment_failed();
            }
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message(format!("{} conversion complete", label));

    Ok(stats)
}

/// Convert every split under `data_dir` and write dataset.yaml
pub fn process_dataset(args: &ConvertArgs) -> Result<ConversionStats, ConvertError> {
    let class_map = args.class_map();
    let options = ConvertOptions {
        skip_invalid: args.skip_invalid,
    };
    info!(
        "Using {} classes: {}",
        class_map.len(),
        class_map.labels().join(", ")
    );

    let mut total = ConversionStats::new();
    for split in &args.splits {
        let images_dir = args.data_dir.join("images").join(split);
        let labels_dir = args.data_dir.join("labels").join(split);
        let stats = convert_folder(&images_dir, &labels_dir, &class_map, options).map_err(|e| {
            error!("Conversion of split '{}' failed", split);
            e
        })?;
        total.merge(&stats);
    }

    if !args.no_yaml {
        info!("Creating dataset.yaml file...");
        let yaml_path = create_dataset_yaml(&args.data_dir, &args.splits, &class_map)?;
        info!("Wrote {}", yaml_path.display());
    }

    total.print_summary();
    Ok(total)
}
