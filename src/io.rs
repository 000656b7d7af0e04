use glob::glob;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::ClassMap;
use crate::conversion::{render_label_file, SegmentLine};
use crate::utils::ensure_directory;

/// Collect the LabelMe JSON files directly inside `images_dir`, sorted by path
pub fn collect_json_files(images_dir: &Path) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&images_dir.to_string_lossy())
    );
    let mut json_files: Vec<PathBuf> = match glob(&pattern) {
        Ok(paths) => paths.filter_map(|entry| entry.ok()).collect(),
        Err(e) => {
            log::error!("Invalid glob pattern {}: {}", pattern, e);
            Vec::new()
        }
    };
    json_files.sort();
    json_files
}

/// Write one label file, creating `labels_dir` as needed
pub fn write_label_file(
    labels_dir: &Path,
    stem: &str,
    lines: &[SegmentLine],
) -> std::io::Result<PathBuf> {
    ensure_directory(labels_dir)?;
    let label_output_path = labels_dir.join(format!("{}.txt", stem));
    let mut writer = BufWriter::new(File::create(&label_output_path)?);
    writer.write_all(render_label_file(lines).as_bytes())?;
    writer.flush()?;
    Ok(label_output_path)
}

/// Create the dataset.yaml file for YOLO training
pub fn create_dataset_yaml(
    data_dir: &Path,
    splits: &[String],
    class_map: &ClassMap,
) -> std::io::Result<PathBuf> {
    ensure_directory(data_dir)?;
    let dataset_yaml_path = data_dir.join("dataset.yaml");
    let mut dataset_yaml = BufWriter::new(File::create(&dataset_yaml_path)?);
    let absolute_path = fs::canonicalize(data_dir)?;

    let mut yaml_content = format!("path: {}\n", absolute_path.to_string_lossy());
    for split in splits {
        yaml_content.push_str(&format!("{}: images/{}\n", split, split));
    }
    yaml_content.push_str("\nnames:\n");
    for (id, label) in class_map.labels().iter().enumerate() {
        yaml_content.push_str(&format!("    {}: {}\n", id, label));
    }

    dataset_yaml.write_all(yaml_content.as_bytes())?;
    dataset_yaml.flush()?;
    Ok(dataset_yaml_path)
}
