//! Reading DICOM pixel data and writing it back out as 8-bit TIFF.

use dicom_dictionary_std::tags;
use dicom_pixeldata::{DecodedPixelData, PixelDecoder, PixelRepresentation, PlanarConfiguration};
use image::{GrayImage, ImageFormat, RgbImage};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::DicomError;
use crate::normalize::normalize_to_u8;
use crate::utils::{is_dicom_preamble, DICOM_MAGIC, DICOM_MAGIC_OFFSET};

/// Decoded samples of a DICOM image, frames stored back to back with interleaved samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelArray {
    pub rows: u32,
    pub columns: u32,
    pub samples_per_pixel: u16,
    pub frames: u32,
    pub data: Vec<f32>,
}

impl PixelArray {
    pub fn frame_len(&self) -> usize {
        self.rows as usize * self.columns as usize * self.samples_per_pixel as usize
    }

    /// Samples of frame `index`, if the buffer holds it
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let len = self.frame_len();
        let start = index.checked_mul(len)?;
        self.data.get(start..start.checked_add(len)?)
    }
}

/// Check for the part 10 preamble without parsing the data set.
///
/// Short files are reported as [`DicomError::NotDicom`]; any other read
/// failure is surfaced as [`DicomError::Io`].
pub fn probe_dicom(path: &Path) -> Result<(), DicomError> {
    let mut header = [0u8; DICOM_MAGIC_OFFSET + DICOM_MAGIC.len()];
    let mut file = File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(DicomError::NotDicom),
        Err(e) => return Err(e.into()),
    }
    if is_dicom_preamble(&header) {
        Ok(())
    } else {
        Err(DicomError::NotDicom)
    }
}

/// Parse a DICOM file and decode its pixel data into floating point samples
pub fn read_pixel_array(path: &Path) -> Result<PixelArray, DicomError> {
    probe_dicom(path)?;

    let obj = dicom_object::open_file(path)?;
    if obj.element(tags::PIXEL_DATA).is_err() {
        return Err(DicomError::NoPixelData);
    }

    let decoded = obj.decode_pixel_data()?;
    let samples_per_pixel = decoded.samples_per_pixel();
    let data = if samples_per_pixel > 1
        && decoded.planar_configuration() == PlanarConfiguration::PixelFirst
    {
        let frame_pixels = decoded.rows() as usize * decoded.columns() as usize;
        interleave_planes(
            &raw_samples(&decoded)?,
            frame_pixels,
            samples_per_pixel as usize,
        )
    } else {
        decoded.to_vec()?
    };
    let pixels = PixelArray {
        rows: decoded.rows(),
        columns: decoded.columns(),
        samples_per_pixel,
        frames: decoded.number_of_frames(),
        data,
    };
    log::debug!(
        "{}: {}x{} x{} samples, {} frame(s)",
        path.display(),
        pixels.columns,
        pixels.rows,
        pixels.samples_per_pixel,
        pixels.frames
    );
    Ok(pixels)
}

// Stored sample values straight from the native little endian buffer.
// The decoder's own conversion does not accept plane-by-plane colour data.
fn raw_samples(decoded: &DecodedPixelData) -> Result<Vec<f32>, DicomError> {
    let signed = decoded.pixel_representation() == PixelRepresentation::Signed;
    let bytes = decoded.data();
    match decoded.bits_allocated() {
        8 => Ok(bytes
            .iter()
            .map(|&b| if signed { b as i8 as f32 } else { b as f32 })
            .collect()),
        16 => Ok(bytes
            .chunks_exact(2)
            .map(|pair| {
                let v = u16::from_le_bytes([pair[0], pair[1]]);
                if signed {
                    v as i16 as f32
                } else {
                    v as f32
                }
            })
            .collect()),
        bits => Err(DicomError::UnsupportedLayout(format!(
            "planar colour data with {} bits allocated",
            bits
        ))),
    }
}

/// Reorder frames stored plane by plane (RRR..GGG..BBB) into interleaved samples (RGBRGB..).
///
/// A trailing partial frame is copied unchanged.
pub fn interleave_planes(data: &[f32], frame_pixels: usize, samples: usize) -> Vec<f32> {
    let frame_len = frame_pixels * samples;
    if frame_len == 0 || samples < 2 {
        return data.to_vec();
    }

    let mut out = Vec::with_capacity(data.len());
    let mut frames = data.chunks_exact(frame_len);
    for frame in frames.by_ref() {
        for pixel in 0..frame_pixels {
            out.extend((0..samples).map(|plane| frame[plane * frame_pixels + pixel]));
        }
    }
    out.extend_from_slice(frames.remainder());
    out
}

/// Normalize over the whole array and write the first frame as an 8-bit TIFF
pub fn write_normalized(pixels: &PixelArray, output_path: &Path) -> Result<(), DicomError> {
    if pixels.frame(0).is_none() || pixels.frame_len() == 0 {
        return Err(DicomError::UnsupportedLayout(format!(
            "{} samples cannot hold a {}x{}x{} frame",
            pixels.data.len(),
            pixels.columns,
            pixels.rows,
            pixels.samples_per_pixel
        )));
    }
    if pixels.frames > 1 {
        log::debug!(
            "Writing first of {} frames to {}",
            pixels.frames,
            output_path.display()
        );
    }

    let mut normalized = normalize_to_u8(&pixels.data);
    normalized.truncate(pixels.frame_len());

    match pixels.samples_per_pixel {
        1 => GrayImage::from_raw(pixels.columns, pixels.rows, normalized)
            .ok_or_else(|| DicomError::UnsupportedLayout("grayscale buffer size".to_string()))?
            .save_with_format(output_path, ImageFormat::Tiff)?,
        3 => RgbImage::from_raw(pixels.columns, pixels.rows, normalized)
            .ok_or_else(|| DicomError::UnsupportedLayout("rgb buffer size".to_string()))?
            .save_with_format(output_path, ImageFormat::Tiff)?,
        n => {
            return Err(DicomError::UnsupportedLayout(format!(
                "{} samples per pixel",
                n
            )))
        }
    }
    Ok(())
}
