use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::types::ImageAnnotation;

/// Offset of the "DICM" magic in a DICOM part 10 file
pub const DICOM_MAGIC_OFFSET: usize = 128;
pub const DICOM_MAGIC: &[u8; 4] = b"DICM";

/// Whether the bytes start with a 128-byte preamble followed by the DICM magic
pub fn is_dicom_preamble(bytes: &[u8]) -> bool {
    bytes.len() >= DICOM_MAGIC_OFFSET + DICOM_MAGIC.len()
        && &bytes[DICOM_MAGIC_OFFSET..DICOM_MAGIC_OFFSET + DICOM_MAGIC.len()] == DICOM_MAGIC
}

/// Read and parse a single LabelMe JSON file.
///
/// The file is parsed straight from a buffered reader so large embedded
/// `imageData` payloads are never held twice.
pub fn read_and_parse_json(path: &Path) -> Result<ImageAnnotation, ConvertError> {
    let file = fs::File::open(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConvertError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Create a directory and its parents if missing, keeping existing content
pub fn ensure_directory(path: &Path) -> std::io::Result<PathBuf> {
    if !path.is_dir() {
        log::debug!("Creating directory {:?}", path);
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Label file stem for an annotation's `imagePath`.
///
/// LabelMe writes Windows separators when annotating on Windows, so both
/// `/` and `\` split path components here.
pub fn label_file_stem(image_path: &str) -> String {
    let file_name = image_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(image_path);
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    sanitize_filename::sanitize(stem)
}
