//! Single-image YOLOv8 detection through ONNX Runtime.
//!
//! The detector expects a YOLOv8 detection export with one input of shape
//! `[1, 3, S, S]` and one output of shape `[1, 4 + C, N]`, where each of the
//! `N` columns holds a center/size box followed by `C` class scores.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::InferenceError;

const PAD_VALUE: f32 = 114.0 / 255.0;

/// An axis-aligned detection in original image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// Geometry of a letterbox resize, used to map boxes back to the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub width: u32,
    pub height: u32,
}

impl Letterbox {
    fn unmap_x(&self, x: f32) -> f32 {
        ((x - self.pad_x) / self.scale).clamp(0.0, self.width as f32)
    }

    fn unmap_y(&self, y: f32) -> f32 {
        ((y - self.pad_y) / self.scale).clamp(0.0, self.height as f32)
    }
}

/// Resize into a `size`x`size` canvas keeping the aspect ratio, padded with gray.
///
/// The tensor is RGB in NCHW layout scaled to [0, 1]. A zero `size` is rejected.
pub fn letterbox(
    image: &DynamicImage,
    size: u32,
) -> Result<(Array4<f32>, Letterbox), InferenceError> {
    if size == 0 {
        return Err(InferenceError::InputSize(size));
    }
    let (width, height) = image.dimensions();
    let scale = (size as f32 / width.max(1) as f32).min(size as f32 / height.max(1) as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = image
        .resize_exact(new_w, new_h, FilterType::Triangle)
        .to_rgb8();
    let side = size as usize;
    let mut input = Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (row, col) = ((y + pad_y) as usize, (x + pad_x) as usize);
        for c in 0..3 {
            input[[0, c, row, col]] = pixel[c] as f32 / 255.0;
        }
    }

    Ok((
        input,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            width,
            height,
        },
    ))
}

/// Decode a `[1, 4 + C, N]` prediction tensor into scored boxes above `conf_threshold`
pub fn decode_predictions(
    shape: &[i64],
    data: &[f32],
    letterbox: &Letterbox,
    conf_threshold: f32,
) -> Result<Vec<Detection>, InferenceError> {
    let (rows, anchors) = match shape {
        [1, rows, anchors] if *rows > 4 && *anchors >= 0 => (*rows as usize, *anchors as usize),
        _ => return Err(InferenceError::OutputShape(shape.to_vec())),
    };
    if data.len() != rows * anchors {
        return Err(InferenceError::OutputShape(shape.to_vec()));
    }

    let at = |row: usize, anchor: usize| data[row * anchors + anchor];
    let mut detections = Vec::new();
    for i in 0..anchors {
        let (class_id, score) = (4..rows)
            .map(|row| (row - 4, at(row, i)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        detections.push(Detection {
            x1: letterbox.unmap_x(cx - w / 2.0),
            y1: letterbox.unmap_y(cy - h / 2.0),
            x2: letterbox.unmap_x(cx + w / 2.0),
            y2: letterbox.unmap_y(cy + h / 2.0),
            score,
            class_id,
        });
    }
    Ok(detections)
}

/// Greedy per-class suppression, highest score first
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_det: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();
    for det in detections {
        if kept.len() >= max_det {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

/// Loads a session with default logging configuration.
pub fn load_session(model_path: &Path) -> Result<Session, InferenceError> {
    let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
    builder
        .commit_from_file(model_path)
        .map_err(|source| InferenceError::ModelLoad {
            path: model_path.to_path_buf(),
            source,
        })
}

/// Load an image from an `http(s)://` URL or a local path
pub fn load_source_image(source: &str) -> Result<DynamicImage, InferenceError> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        log::info!("Fetching {}", source);
        let response = ureq::get(source)
            .call()
            .map_err(|e| InferenceError::Fetch {
                url: source.to_string(),
                source: Box::new(e),
            })?;
        let mut buf = Vec::new();
        response.into_reader().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(source)?
    };
    Ok(image::load_from_memory(&bytes)?)
}

/// Thresholds applied after the forward pass
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub imgsz: u32,
    pub conf: f32,
    pub iou: f32,
    pub max_det: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            imgsz: 640,
            conf: 0.25,
            iou: 0.7,
            max_det: 300,
        }
    }
}

pub struct Detector {
    session: Session,
    input_name: String,
    output_name: String,
    model_path: PathBuf,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(model_path: &Path, config: DetectorConfig) -> Result<Self, InferenceError> {
        let session = load_session(model_path)?;
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| "output0".to_string());
        log::debug!(
            "Loaded {} (input '{}', output '{}')",
            model_path.display(),
            input_name,
            output_name
        );
        Ok(Self {
            session,
            input_name,
            output_name,
            model_path: model_path.to_path_buf(),
            config,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        let (input, geometry) = letterbox(image, self.config.imgsz)?;
        let input_tensor = TensorRef::from_array_view(input.view())?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])?;
        let (shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        let candidates = decode_predictions(&dims, data, &geometry, self.config.conf)?;
        Ok(non_max_suppression(
            candidates,
            self.config.iou,
            self.config.max_det,
        ))
    }
}
