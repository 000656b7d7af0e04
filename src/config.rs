use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::IMG_FORMATS;

/// Labels used when no label list is given on the command line.
pub const DEFAULT_LABELS: &[&str] = &[
    "pelvic ring",
    "left_obturator_foramen",
    "right_obturator_foramen",
];

/// Command-line arguments for converting LabelMe JSON to YOLO segmentation labels.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ConvertArgs {
    /// Dataset root holding images/<split> and labels/<split>
    #[arg(short = 'd', long = "data_dir", default_value = "data")]
    pub data_dir: PathBuf,

    /// Splits to convert
    #[arg(long = "splits", value_delimiter = ',', default_values = ["train", "val"])]
    pub splits: Vec<String>,

    /// Log and count malformed annotation files instead of aborting
    #[arg(long = "skip_invalid")]
    pub skip_invalid: bool,

    /// Do not write dataset.yaml
    #[arg(long = "no_yaml")]
    pub no_yaml: bool,

    /// Ordered label list; the class id of a label is its position
    #[arg(value_delimiter = ',')]
    pub label_list: Vec<String>,
}

impl ConvertArgs {
    pub fn class_map(&self) -> ClassMap {
        if self.label_list.is_empty() {
            ClassMap::default()
        } else {
            ClassMap::new(self.label_list.iter().cloned())
        }
    }
}

/// Command-line arguments for normalizing a patient/visit tree into 8-bit images.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct NormalizeArgs {
    /// Root directory holding <patient>/<visit>/** folders
    #[arg(short = 'i', long = "input_dir")]
    pub input_dir: PathBuf,

    /// Root directory receiving <patient>/<visit>/<patient>-<visit>-NN files
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: PathBuf,

    /// Extensions copied through unchanged
    #[arg(long = "passthrough_ext", value_delimiter = ',', default_values_t = IMG_FORMATS.iter().map(|s| s.to_string()).collect::<Vec<_>>())]
    pub passthrough_ext: Vec<String>,
}

/// Command-line arguments for the detector smoke test.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct SmokeArgs {
    /// ONNX export of the pretrained detector
    #[arg(short = 'm', long = "model", default_value = "yolov8n.onnx")]
    pub model: PathBuf,

    /// Image URL or local path
    #[arg(
        short = 's',
        long = "source",
        default_value = "https://ultralytics.com/images/bus.jpg"
    )]
    pub source: String,

    /// Square network input size
    #[arg(long = "imgsz", default_value_t = 640, value_parser = validate_imgsz)]
    pub imgsz: u32,

    /// Minimum class score for a detection
    #[arg(long = "conf", default_value_t = 0.25, value_parser = validate_threshold)]
    pub conf: f32,

    /// IoU above which overlapping boxes of one class are suppressed
    #[arg(long = "iou", default_value_t = 0.7, value_parser = validate_threshold)]
    pub iou: f32,

    /// Upper bound on reported detections
    #[arg(long = "max_det", default_value_t = 300)]
    pub max_det: usize,
}

// Validate that a threshold is between 0.0 and 1.0
pub fn validate_threshold(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("THRESHOLD must be between 0.0 and 1.0".to_string()),
    }
}

// Validate that the network input size is a positive integer
pub fn validate_imgsz(s: &str) -> Result<u32, String> {
    match u32::from_str(s) {
        Ok(val) if val >= 1 => Ok(val),
        _ => Err("IMGSZ must be a positive integer".to_string()),
    }
}

/// Fixed lookup from label text to class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    labels: Vec<String>,
    ids: HashMap<String, usize>,
}

impl ClassMap {
    /// Builds a map where each label's id is its position. Later duplicates are ignored.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self {
            labels: Vec::new(),
            ids: HashMap::new(),
        };
        for label in labels {
            let label = label.into();
            if !map.ids.contains_key(&label) {
                map.ids.insert(label.clone(), map.labels.len());
                map.labels.push(label);
            }
        }
        map
    }

    pub fn class_id(&self, label: &str) -> Option<usize> {
        self.ids.get(label).copied()
    }

    /// Labels in id order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for ClassMap {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS.iter().copied())
    }
}
