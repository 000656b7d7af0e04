use pelvis_yolo_prep::config::{validate_imgsz, validate_threshold};
use pelvis_yolo_prep::conversion::{calculate_bounding_box, convert_shape, polygon_points};
use pelvis_yolo_prep::dicom::{interleave_planes, write_normalized, PixelArray};
use pelvis_yolo_prep::inference::{decode_predictions, letterbox, non_max_suppression, Letterbox};
use pelvis_yolo_prep::utils::{is_dicom_preamble, label_file_stem};
use pelvis_yolo_prep::visits::{output_file_name, FileKind};
use pelvis_yolo_prep::{
    convert_to_segment_lines, normalize_to_u8, ClassMap, ConvertError, Detection, ImageAnnotation,
    InferenceError, NormalizeOptions, Shape,
};
use std::path::Path;

fn shape(label: &str, points: &[(f64, f64)]) -> Shape {
    Shape {
        label: label.to_string(),
        points: points.to_vec(),
        group_id: None,
        shape_type: "polygon".to_string(),
        description: None,
    }
}

fn annotation(width: u32, height: u32, shapes: Vec<Shape>) -> ImageAnnotation {
    ImageAnnotation {
        version: Some("5.4.1".to_string()),
        flags: None,
        shapes,
        image_path: "case_001.png".to_string(),
        image_data: None,
        image_height: height,
        image_width: width,
    }
}

#[test]
fn test_pelvic_ring_example_line() {
    let ann = annotation(
        100,
        200,
        vec![shape(
            "pelvic ring",
            &[(10.0, 20.0), (90.0, 20.0), (90.0, 180.0), (10.0, 180.0)],
        )],
    );

    let lines = convert_to_segment_lines(&ann, &ClassMap::default()).unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0].to_string(),
        "0 0.5 0.5 0.8 0.8 0.1 0.1 0.9 0.1 0.9 0.9 0.1 0.9"
    );
}

#[test]
fn test_default_class_map() {
    let class_map = ClassMap::default();
    assert_eq!(class_map.class_id("pelvic ring"), Some(0));
    assert_eq!(class_map.class_id("left_obturator_foramen"), Some(1));
    assert_eq!(class_map.class_id("right_obturator_foramen"), Some(2));
    assert_eq!(class_map.class_id("femur"), None);
}

#[test]
fn test_class_map_from_label_list() {
    let class_map = ClassMap::new(["b", "a", "b", "c"]);
    assert_eq!(class_map.labels(), ["b", "a", "c"]);
    assert_eq!(class_map.class_id("c"), Some(2));
}

#[test]
fn test_unknown_labels_are_dropped_and_field_counts_match() {
    let ann = annotation(
        640,
        480,
        vec![
            shape("pelvic ring", &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]),
            shape("femur", &[(1.0, 1.0), (2.0, 2.0), (3.0, 1.0)]),
            shape(
                "right_obturator_foramen",
                &[(5.0, 5.0), (50.0, 5.0), (60.0, 40.0), (20.0, 60.0), (4.0, 30.0)],
            ),
        ],
    );

    let lines = convert_to_segment_lines(&ann, &ClassMap::default()).unwrap();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].class_id, 0);
    assert_eq!(lines[1].class_id, 2);
    assert_eq!(lines[0].to_string().split(' ').count(), 5 + 2 * 3);
    assert_eq!(lines[1].to_string().split(' ').count(), 5 + 2 * 5);
}

#[test]
fn test_points_are_divided_by_own_dimensions() {
    let points = [(13.0, 7.0), (250.5, 19.25), (300.0, 401.0), (-4.0, 520.0)];
    let line = convert_shape(&shape("pelvic ring", &points), 0, 320, 480).unwrap();

    for (&(x, y), &(nx, ny)) in points.iter().zip(&line.points) {
        assert_eq!(nx, x / 320.0);
        assert_eq!(ny, y / 480.0);
    }
    // out-of-bounds points are not clamped
    assert!(line.points[3].0 < 0.0);
    assert!(line.points[3].1 > 1.0);
}

#[test]
fn test_bbox_contains_every_point() {
    let points = [(3.0, 90.0), (77.0, 12.0), (41.0, 55.0), (60.0, 99.0)];
    let line = convert_shape(&shape("pelvic ring", &points), 0, 100, 100).unwrap();

    let eps = 1e-12;
    for &(x, y) in &line.points {
        assert!(line.x_center - line.width / 2.0 <= x + eps);
        assert!(x <= line.x_center + line.width / 2.0 + eps);
        assert!(line.y_center - line.height / 2.0 <= y + eps);
        assert!(y <= line.y_center + line.height / 2.0 + eps);
    }
}

#[test]
fn test_calculate_bounding_box() {
    let (x_min, y_min, x_max, y_max) =
        calculate_bounding_box(&[(10.0, 10.0), (20.0, 5.0), (15.0, 30.0)]);
    assert_eq!((x_min, y_min, x_max, y_max), (10.0, 5.0, 20.0, 30.0));
}

#[test]
fn test_rectangle_expands_to_four_corners() {
    let mut rect = shape("pelvic ring", &[(10.0, 10.0), (20.0, 20.0)]);
    rect.shape_type = "rectangle".to_string();

    let points = polygon_points(&rect).unwrap();
    assert_eq!(
        points,
        vec![(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)]
    );

    let line = convert_shape(&rect, 0, 100, 100).unwrap();
    assert_eq!(line.x_center, 0.15);
    assert_eq!(line.y_center, 0.15);
    assert_eq!(line.width, 0.1);
    assert_eq!(line.height, 0.1);
}

#[test]
fn test_circle_expands_to_polygon() {
    let mut circle = shape("pelvic ring", &[(50.0, 50.0), (60.0, 50.0)]);
    circle.shape_type = "circle".to_string();

    let points = polygon_points(&circle).unwrap();
    assert_eq!(points.len(), 12);
    for (x, y) in points {
        let r = ((x - 50.0).powi(2) + (y - 50.0).powi(2)).sqrt();
        assert!((r - 10.0).abs() < 1e-9);
    }
}

#[test]
fn test_short_polygon_is_malformed() {
    let ann = annotation(
        100,
        100,
        vec![shape("pelvic ring", &[(1.0, 1.0), (2.0, 2.0)])],
    );
    let err = convert_to_segment_lines(&ann, &ClassMap::default()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedShape { ref label, .. } if label == "pelvic ring"));
}

#[test]
fn test_short_polygon_with_unknown_label_is_ignored() {
    let ann = annotation(100, 100, vec![shape("femur", &[(1.0, 1.0)])]);
    let lines = convert_to_segment_lines(&ann, &ClassMap::default()).unwrap();
    assert!(lines.is_empty());
}

#[test]
fn test_zero_dimensions_are_rejected() {
    let ann = annotation(
        0,
        100,
        vec![shape("pelvic ring", &[(1.0, 1.0), (2.0, 2.0), (3.0, 1.0)])],
    );
    let err = convert_to_segment_lines(&ann, &ClassMap::default()).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::InvalidDimensions {
            width: 0,
            height: 100
        }
    ));
}

#[test]
fn test_label_file_stem() {
    assert_eq!(label_file_stem("case_001.png"), "case_001");
    assert_eq!(label_file_stem("../images/case_002.jpg"), "case_002");
    assert_eq!(label_file_stem("..\\images\\case_003.tif"), "case_003");
    assert_eq!(label_file_stem("scan.v2.png"), "scan.v2");
}

#[test]
fn test_dicom_preamble() {
    let mut bytes = vec![0u8; 128];
    bytes.extend_from_slice(b"DICM");
    assert!(is_dicom_preamble(&bytes));
    assert!(!is_dicom_preamble(b"DICM"));
    bytes[129] = b'X';
    assert!(!is_dicom_preamble(&bytes));
}

#[test]
fn test_validate_threshold() {
    assert!(validate_threshold("0.5").is_ok());
    assert!(validate_threshold("1.0").is_ok());
    assert!(validate_threshold("0.0").is_ok());
    assert!(validate_threshold("-0.1").is_err());
    assert!(validate_threshold("1.1").is_err());
    assert!(validate_threshold("abc").is_err());
}

#[test]
fn test_validate_imgsz() {
    assert_eq!(validate_imgsz("640"), Ok(640));
    assert_eq!(validate_imgsz("1"), Ok(1));
    assert!(validate_imgsz("0").is_err());
    assert!(validate_imgsz("-32").is_err());
    assert!(validate_imgsz("abc").is_err());
}

#[test]
fn test_normalize_constant_array_is_zero() {
    assert_eq!(normalize_to_u8(&[7.0; 6]), vec![0; 6]);
    assert_eq!(normalize_to_u8(&[0.0; 3]), vec![0; 3]);
    assert!(normalize_to_u8(&[]).is_empty());
}

#[test]
fn test_normalize_min_max_formula() {
    let values = [-100.0_f32, 0.0, 37.0, 412.5, 900.0, 1000.0];
    let (m, big_m) = (-100.0_f64, 1000.0_f64);

    let out = normalize_to_u8(&values);

    for (&v, &o) in values.iter().zip(&out) {
        let expected = ((f64::from(v) - m) / (big_m - m) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8;
        assert_eq!(o, expected);
    }
    assert_eq!(out[0], 0);
    assert_eq!(out[5], 255);
}

#[test]
fn test_normalize_ignores_nan() {
    let out = normalize_to_u8(&[f32::NAN, 0.0, 10.0]);
    assert_eq!(out, vec![0, 0, 255]);
}

#[test]
fn test_output_file_name() {
    assert_eq!(output_file_name("P001", "V1", 1, "tif"), "P001-V1-01.tif");
    assert_eq!(output_file_name("P001", "V1", 12, "png"), "P001-V1-12.png");
    assert_eq!(output_file_name("P001", "V1", 123, "tif"), "P001-V1-123.tif");
}

#[test]
fn test_classify_by_extension() {
    let options = NormalizeOptions::new(["tif", ".PNG"]);
    assert_eq!(
        options.classify(Path::new("a/b/scan.TIF")),
        FileKind::Passthrough("tif".to_string())
    );
    assert_eq!(
        options.classify(Path::new("scan.png")),
        FileKind::Passthrough("png".to_string())
    );
    assert_eq!(options.classify(Path::new("IM0001")), FileKind::Candidate);
    assert_eq!(options.classify(Path::new("scan.dcm")), FileKind::Candidate);
}

#[test]
fn test_iou() {
    let a = Detection {
        x1: 0.0,
        y1: 0.0,
        x2: 10.0,
        y2: 10.0,
        score: 0.9,
        class_id: 0,
    };
    let b = Detection {
        x1: 5.0,
        x2: 15.0,
        ..a
    };
    assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
    assert_eq!(a.iou(&a), 1.0);
}

#[test]
fn test_non_max_suppression_is_per_class() {
    let base = Detection {
        x1: 0.0,
        y1: 0.0,
        x2: 10.0,
        y2: 10.0,
        score: 0.5,
        class_id: 0,
    };
    let detections = vec![
        base,
        Detection { score: 0.9, x1: 1.0, ..base },
        Detection { class_id: 1, ..base },
        Detection { x1: 50.0, x2: 60.0, score: 0.3, ..base },
    ];

    let kept = non_max_suppression(detections, 0.7, 300);

    assert_eq!(kept.len(), 3);
    assert_eq!(kept[0].score, 0.9);
    assert!(kept.iter().any(|d| d.class_id == 1));

    let capped = non_max_suppression(kept, 0.7, 2);
    assert_eq!(capped.len(), 2);
}

#[test]
fn test_letterbox_geometry() {
    let image = image::DynamicImage::new_rgb8(200, 100);
    let (tensor, geometry) = letterbox(&image, 64).unwrap();

    assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
    assert_eq!(geometry.scale, 0.32);
    assert_eq!(geometry.pad_x, 0.0);
    assert_eq!(geometry.pad_y, 16.0);
    // padded rows keep the gray fill, image rows are black
    assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 1e-6);
    assert_eq!(tensor[[0, 0, 32, 32]], 0.0);
}

#[test]
fn test_letterbox_rejects_zero_size() {
    let image = image::DynamicImage::new_rgb8(200, 100);
    assert!(matches!(
        letterbox(&image, 0),
        Err(InferenceError::InputSize(0))
    ));
}

#[test]
fn test_interleave_planes() {
    // two frames of 2 RGB pixels each, stored plane by plane
    let planar = [
        1.0, 2.0, 10.0, 20.0, 100.0, 200.0, //
        3.0, 4.0, 30.0, 40.0, 300.0, 400.0,
    ];
    assert_eq!(
        interleave_planes(&planar, 2, 3),
        vec![1.0, 10.0, 100.0, 2.0, 20.0, 200.0, 3.0, 30.0, 300.0, 4.0, 40.0, 400.0]
    );
    assert_eq!(interleave_planes(&[5.0, 6.0], 2, 1), vec![5.0, 6.0]);
}

#[test]
fn test_write_normalized_rgb_keeps_channels() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("rgb.tif");
    // red then green, given plane by plane
    let pixels = PixelArray {
        rows: 1,
        columns: 2,
        samples_per_pixel: 3,
        frames: 1,
        data: interleave_planes(&[255.0, 0.0, 0.0, 255.0, 0.0, 0.0], 2, 3),
    };

    write_normalized(&pixels, &output).unwrap();

    let written = image::open(&output).unwrap().to_rgb8();
    assert_eq!(written.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(written.get_pixel(1, 0).0, [0, 255, 0]);
}

#[test]
fn test_decode_predictions() {
    let geometry = Letterbox {
        scale: 0.5,
        pad_x: 0.0,
        pad_y: 10.0,
        width: 100,
        height: 80,
    };
    // rows: cx, cy, w, h, class0, class1; two anchors
    let data = vec![
        20.0, 30.0, // cx
        30.0, 30.0, // cy
        10.0, 10.0, // w
        20.0, 20.0, // h
        0.1, 0.05, // class 0
        0.8, 0.1, // class 1
    ];

    let detections = decode_predictions(&[1, 6, 2], &data, &geometry, 0.25).unwrap();

    assert_eq!(detections.len(), 1);
    let det = detections[0];
    assert_eq!(det.class_id, 1);
    assert_eq!(det.score, 0.8);
    assert_eq!((det.x1, det.y1, det.x2, det.y2), (30.0, 20.0, 50.0, 60.0));

    assert!(decode_predictions(&[1, 6, 3], &data, &geometry, 0.25).is_err());
    assert!(decode_predictions(&[6, 2], &data, &geometry, 0.25).is_err());
}
