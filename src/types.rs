use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

// Supported image formats
pub const IMG_FORMATS: &[&str] = &[
    "bmp", "dng", "jpeg", "jpg", "mpo", "png", "tif", "tiff", "webp", "pfm",
];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

fn default_shape_type() -> String {
    "polygon".to_string()
}

// The Shape struct representing annotated shapes
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Shape {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default = "default_shape_type")]
    pub shape_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

// The ImageAnnotation struct representing the annotation information of an image
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnnotation {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub flags: Option<HashMap<String, bool>>,
    pub shapes: Vec<Shape>,
    pub image_path: String,
    #[serde(default, skip_serializing)]
    pub image_data: Option<String>,
    pub image_height: u32,
    pub image_width: u32,
}

// Struct to hold annotation conversion statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub files_found: usize,
    pub label_files_written: usize,
    pub skipped_no_shapes: usize,
    pub failed_files: usize,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_written(&mut self) {
        self.label_files_written += 1;
    }

    pub fn increment_skipped_no_shapes(&mut self) {
        self.skipped_no_shapes += 1;
    }

    pub fn increment_failed(&mut self) {
        self.failed_files += 1;
    }

    pub fn merge(&mut self, other: &ConversionStats) {
        self.files_found += other.files_found;
        self.label_files_written += other.label_files_written;
        self.skipped_no_shapes += other.skipped_no_shapes;
        self.failed_files += other.failed_files;
    }

    pub fn print_summary(&self) {
        log::info!("=== Conversion Summary ===");
        log::info!("JSON files found: {}", self.files_found);
        log::info!("Label files written: {}", self.label_files_written);
        log::info!(
            "Skipped (no relevant shapes): {}",
            self.skipped_no_shapes
        );
        if self.failed_files > 0 {
            log::warn!("Failed files: {}", self.failed_files);
        }
    }
}

// Struct to hold patient/visit normalization statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeStats {
    pub copied: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl NormalizeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs produced by either copying or converting.
    pub fn produced(&self) -> usize {
        self.copied + self.converted
    }

    pub fn merge(&mut self, other: &NormalizeStats) {
        self.copied += other.copied;
        self.converted += other.converted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn print_summary(&self) {
        log::info!("=== Normalization Summary ===");
        log::info!("Images copied through: {}", self.copied);
        log::info!("DICOM files converted: {}", self.converted);
        log::info!("Skipped (not an image): {}", self.skipped);
        if self.failed > 0 {
            log::warn!("Failed files: {}", self.failed);
        }
    }
}
