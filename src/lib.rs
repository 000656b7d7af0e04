//! Data preparation tools for pelvic radiograph segmentation
//!
//! This library converts LabelMe polygon annotations into YOLO segmentation
//! labels, normalizes patient/visit DICOM trees into 8-bit TIFF images, and
//! runs a pretrained YOLOv8 detector as a smoke test.

pub mod config;
pub mod conversion;
pub mod dataset;
pub mod dicom;
pub mod error;
pub mod inference;
pub mod io;
pub mod normalize;
pub mod types;
pub mod utils;
pub mod visits;

// Re-export commonly used types and functions
pub use config::{ClassMap, ConvertArgs, NormalizeArgs, SmokeArgs};
pub use conversion::{convert_to_segment_lines, SegmentLine};
pub use dataset::{convert_folder, convert_single_file, process_dataset, FileOutcome};
pub use error::{ConvertError, DicomError, InferenceError};
pub use inference::{Detection, Detector, DetectorConfig};
pub use normalize::normalize_to_u8;
pub use types::{ConversionStats, ImageAnnotation, NormalizeStats, Shape};
pub use visits::{process_tree, process_visit, NormalizeOptions};
