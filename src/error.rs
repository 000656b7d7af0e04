//! Error types for the conversion, normalization and inference tools.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while converting a LabelMe annotation file.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The annotation file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or lacks a required key.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The declared image size cannot be used as a normalization denominator.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A shape with a known label cannot be turned into a polygon.
    #[error("malformed shape '{label}': {reason}")]
    MalformedShape { label: String, reason: String },

    /// Writing a label file or the dataset descriptor failed.
    #[error("failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

impl ConvertError {
    pub fn malformed(label: &str, reason: impl Into<String>) -> Self {
        Self::MalformedShape {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while turning a file into a normalized 8-bit image.
#[derive(Error, Debug)]
pub enum DicomError {
    /// The file does not carry the DICOM part 10 magic.
    #[error("not a DICOM file")]
    NotDicom,

    /// The file could not be read from disk.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The file looks like DICOM but the data set could not be parsed.
    #[error("failed to parse DICOM object: {0}")]
    Parse(#[from] dicom_object::ReadError),

    /// The data set has no Pixel Data element.
    #[error("DICOM object has no pixel data")]
    NoPixelData,

    /// The pixel data could not be decoded into samples.
    #[error("failed to decode pixel data: {0}")]
    Decode(#[from] dicom_pixeldata::Error),

    /// The pixel layout cannot be written as an 8-bit image.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// Encoding the output image failed.
    #[error("failed to write image: {0}")]
    Write(#[from] image::ImageError),
}

impl DicomError {
    /// Whether the file should be skipped without being reported as a failure.
    pub fn is_expected_skip(&self) -> bool {
        matches!(self, DicomError::NotDicom | DicomError::NoPixelData)
    }
}

/// Errors raised by the detector smoke test.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("failed to load model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    #[error("onnx runtime: {0}")]
    Session(#[from] ort::Error),

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decode: {0}")]
    Image(#[from] image::ImageError),

    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<i64>),

    #[error("network input size must be at least 1, got {0}")]
    InputSize(u32),
}
