use std::fmt;

use crate::config::ClassMap;
use crate::error::ConvertError;
use crate::types::{ImageAnnotation, Shape};

const CIRCLE_POINTS: usize = 12;

/// One line of a YOLO segmentation label file.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentLine {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    /// Normalized polygon vertices in input order.
    pub points: Vec<(f64, f64)>,
}

impl fmt::Display for SegmentLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )?;
        for (x, y) in &self.points {
            write!(f, " {} {}", x, y)?;
        }
        Ok(())
    }
}

/// Axis-aligned extent of a point list as (x_min, y_min, x_max, y_max)
pub fn calculate_bounding_box(points: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    points.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(x_min, y_min, x_max, y_max), &(x, y)| {
            (x_min.min(x), y_min.min(y), x_max.max(x), y_max.max(y))
        },
    )
}

/// Pixel-space polygon for a shape. Rectangles and circles are expanded into vertices.
pub fn polygon_points(shape: &Shape) -> Result<Vec<(f64, f64)>, ConvertError> {
    match shape.shape_type.as_str() {
        "rectangle" => {
            let [(x1, y1), (x2, y2)] = two_points(shape)?;
            Ok(vec![(x1, y1), (x2, y1), (x2, y2), (x1, y2)])
        }
        "circle" => {
            let [(cx, cy), (px, py)] = two_points(shape)?;
            let radius = ((cx - px).powi(2) + (cy - py).powi(2)).sqrt();
            Ok((0..CIRCLE_POINTS)
                .map(|i| {
                    let angle = 2.0 * std::f64::consts::PI * i as f64 / CIRCLE_POINTS as f64;
                    (cx + radius * angle.cos(), cy + radius * angle.sin())
                })
                .collect())
        }
        _ => Ok(shape.points.clone()),
    }
}

fn two_points(shape: &Shape) -> Result<[(f64, f64); 2], ConvertError> {
    match shape.points.as_slice() {
        [a, b] => Ok([*a, *b]),
        other => Err(ConvertError::malformed(
            &shape.label,
            format!(
                "{} needs exactly 2 points, got {}",
                shape.shape_type,
                other.len()
            ),
        )),
    }
}

/// Convert a single shape with a known class id into a normalized label line
pub fn convert_shape(
    shape: &Shape,
    class_id: usize,
    image_width: u32,
    image_height: u32,
) -> Result<SegmentLine, ConvertError> {
    let points = polygon_points(shape)?;
    if points.len() < 3 {
        return Err(ConvertError::malformed(
            &shape.label,
            format!("polygon needs at least 3 points, got {}", points.len()),
        ));
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(ConvertError::malformed(
            &shape.label,
            "non-finite coordinate",
        ));
    }

    let w = image_width as f64;
    let h = image_height as f64;
    let (x_min, y_min, x_max, y_max) = calculate_bounding_box(&points);

    Ok(SegmentLine {
        class_id,
        x_center: (x_min + x_max) / 2.0 / w,
        y_center: (y_min + y_max) / 2.0 / h,
        width: (x_max - x_min) / w,
        height: (y_max - y_min) / h,
        points: points.iter().map(|&(x, y)| (x / w, y / h)).collect(),
    })
}

/// Convert every shape with a known label. Unknown labels are dropped.
pub fn convert_to_segment_lines(
    annotation: &ImageAnnotation,
    class_map: &ClassMap,
) -> Result<Vec<SegmentLine>, ConvertError> {
    if annotation.image_width == 0 || annotation.image_height == 0 {
        return Err(ConvertError::InvalidDimensions {
            width: annotation.image_width,
            height: annotation.image_height,
        });
    }

    let mut lines = Vec::with_capacity(annotation.shapes.len());
    for shape in &annotation.shapes {
        let class_id = match class_map.class_id(&shape.label) {
            Some(class_id) => class_id,
            None => continue,
        };
        lines.push(convert_shape(
            shape,
            class_id,
            annotation.image_width,
            annotation.image_height,
        )?);
    }
    Ok(lines)
}

/// Render label lines as file content, one newline-terminated line each
pub fn render_label_file(lines: &[SegmentLine]) -> String {
    let mut yolo_data = String::with_capacity(lines.len() * 64);
    for line in lines {
        yolo_data.push_str(&line.to_string());
        yolo_data.push('\n');
    }
    yolo_data
}
