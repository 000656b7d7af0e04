use jwalk::WalkDir;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dicom::{read_pixel_array, write_normalized};
use crate::error::DicomError;
use crate::types::NormalizeStats;
use crate::utils::{create_progress_bar, ensure_directory};

/// Extension of converted DICOM outputs
pub const OUTPUT_EXTENSION: &str = "tif";

/// How a file found under a visit folder is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// Already an image; copied through with this lowercased extension
    Passthrough(String),
    /// Anything else; probed as DICOM
    Candidate,
}

/// Options for a tree normalization
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    passthrough: HashSet<String>,
}

impl NormalizeOptions {
    pub fn new<I, S>(passthrough_ext: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            passthrough: passthrough_ext
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn classify(&self, path: &Path) -> FileKind {
        match path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
        {
            Some(ext) if self.passthrough.contains(&ext) => FileKind::Passthrough(ext),
            _ => FileKind::Candidate,
        }
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::new(crate::types::get_image_extensions_set())
    }
}

/// `<patient>-<visit>-<NN>.<ext>` with NN zero-padded to two digits
pub fn output_file_name(patient: &str, visit: &str, seq: usize, ext: &str) -> String {
    format!("{}-{}-{:02}.{}", patient, visit, seq, ext)
}

/// Immediate child directories of `dir`, sorted by name
pub fn list_subdirectories(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// All regular files below `visit_dir` in sorted walk order, symlinks resolved to their targets
pub fn walk_files(visit_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(visit_dir)
        .skip_hidden(false)
        .follow_links(true)
        .sort(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read entry under {}: {}", visit_dir.display(), e);
                None
            }
        })
        .filter(|entry| {
            let is_file = entry.file_type().is_file();
            if !is_file && !entry.file_type().is_dir() {
                debug!("Skipping non-regular entry {}", entry.path().display());
            }
            is_file
        })
        .map(|entry| entry.path())
        .collect()
}

/// Produce one output for `path` if it is an image or a DICOM with pixel data.
///
/// Returns `Ok(None)` for files that are silently skipped.
fn produce_output(
    path: &Path,
    kind: &FileKind,
    out_dir: &Path,
    patient: &str,
    visit: &str,
    seq: usize,
) -> Result<Option<PathBuf>, DicomError> {
    match kind {
        FileKind::Passthrough(ext) => {
            let output_path = out_dir.join(output_file_name(patient, visit, seq, ext));
            fs::copy(path, &output_path)?;
            Ok(Some(output_path))
        }
        FileKind::Candidate => {
            let pixels = match read_pixel_array(path) {
                Ok(pixels) => pixels,
                Err(e) if e.is_expected_skip() => {
                    debug!("Skipping {}: {}", path.display(), e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let output_path = out_dir.join(output_file_name(patient, visit, seq, OUTPUT_EXTENSION));
            write_normalized(&pixels, &output_path)?;
            Ok(Some(output_path))
        }
    }
}

/// Normalize one visit folder into `out_dir`. The sequence restarts at 1 for every visit.
pub fn process_visit(
    patient: &str,
    visit: &str,
    visit_dir: &Path,
    out_dir: &Path,
    options: &NormalizeOptions,
) -> std::io::Result<NormalizeStats> {
    ensure_directory(out_dir)?;

    let mut stats = NormalizeStats::new();
    for path in walk_files(visit_dir) {
        let kind = options.classify(&path);
        let seq = stats.produced() + 1;
        match produce_output(&path, &kind, out_dir, patient, visit, seq) {
            Ok(Some(output_path)) => {
                debug!("{} -> {}", path.display(), output_path.display());
                match kind {
                    FileKind::Passthrough(_) => stats.copied += 1,
                    FileKind::Candidate => stats.converted += 1,
                }
            }
            Ok(None) => stats.skipped += 1,
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                stats.failed += 1;
            }
        }
    }
    Ok(stats)
}

/// Normalize every `<patient>/<visit>` pair under `input_root` into `output_root`
pub fn process_tree(
    input_root: &Path,
    output_root: &Path,
    options: &NormalizeOptions,
) -> std::io::Result<NormalizeStats> {
    let mut total = NormalizeStats::new();
    let patients = list_subdirectories(input_root)?;
    info!(
        "Found {} patient folders in {}",
        patients.len(),
        input_root.display()
    );

    for (patient, patient_dir) in patients {
        let visits = list_subdirectories(&patient_dir)?;
        let pb = create_progress_bar(visits.len() as u64, &patient);
        for (visit, visit_dir) in visits {
            let out_dir = output_root.join(&patient).join(&visit);
            let stats = process_visit(&patient, &visit, &visit_dir, &out_dir, options)?;
            pb.suspend(|| {
                info!(
                    "{}/{}: {} image(s) written to {}",
                    patient,
                    visit,
                    stats.produced(),
                    out_dir.display()
                )
            });
            total.merge(&stats);
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    total.print_summary();
    Ok(total)
}
