use anyhow::{Context, Result};
use image::imageops::FilterType;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use crate::config::DetectorConfig;
use crate::types::{Detection, Frame, Rect};

/// Detector collaborator contract: a pixel buffer in, up to
/// `max_results` confidence-ordered detections out.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
    fn name(&self) -> &str;
}

/// EfficientDet-Lite input edge length.
const INPUT_SIZE: u32 = 320;

/// ONNX-backed object detector. The session is acquired once here and
/// held for the pipeline's lifetime; it is released when the pipeline is
/// dropped, on every exit path.
pub struct OnnxDetector {
    session: Session,
    score_threshold: f32,
    max_results: usize,
}

impl OnnxDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?
            .with_execution_providers([
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])?
            .commit_from_file(&config.model_path)
            .with_context(|| format!("failed to load detection model {}", config.model_path))?;

        Ok(Self {
            session,
            score_threshold: config.score_threshold,
            max_results: config.max_results,
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        // Preprocess: resize to the model's square input, keep NHWC u8
        let resized = image::imageops::resize(frame, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let input_data: Vec<u8> = resized.into_raw();

        let shape = vec![1usize, INPUT_SIZE as usize, INPUT_SIZE as usize, 3];
        let input_tensor = Tensor::from_array((shape, input_data))?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;

        // TF detection-postprocess heads: normalized [ymin,xmin,ymax,xmax]
        let (_boxes_shape, boxes) = outputs["detection_boxes"].try_extract_tensor::<f32>()?;
        let (_scores_shape, scores) = outputs["detection_scores"].try_extract_tensor::<f32>()?;
        let (_classes_shape, classes) = outputs["detection_classes"].try_extract_tensor::<f32>()?;
        let (_count_shape, count) = outputs["num_detections"].try_extract_tensor::<f32>()?;

        let count = count.first().copied().unwrap_or(0.0) as usize;

        Ok(collect_detections(
            boxes,
            scores,
            classes,
            count,
            self.score_threshold,
            self.max_results,
            frame.width() as f32,
            frame.height() as f32,
        ))
    }

    fn name(&self) -> &str {
        "EfficientDet-Lite"
    }
}

/// Threshold, rank by descending score, cap, and scale boxes back to
/// frame pixels.
#[allow(clippy::too_many_arguments)]
fn collect_detections(
    boxes: &[f32],
    scores: &[f32],
    classes: &[f32],
    count: usize,
    score_threshold: f32,
    max_results: usize,
    frame_w: f32,
    frame_h: f32,
) -> Vec<Detection> {
    let count = count.min(scores.len()).min(boxes.len() / 4);

    let mut hits: Vec<usize> = (0..count)
        .filter(|&i| scores[i] >= score_threshold)
        .collect();
    hits.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(max_results);

    hits.into_iter()
        .map(|i| {
            let ymin = boxes[i * 4];
            let xmin = boxes[i * 4 + 1];
            let ymax = boxes[i * 4 + 2];
            let xmax = boxes[i * 4 + 3];
            let rect = Rect::new(
                xmin * frame_w,
                ymin * frame_h,
                (xmax - xmin) * frame_w,
                (ymax - ymin) * frame_h,
            );
            let class_id = classes.get(i).copied().unwrap_or(-1.0).max(0.0) as usize;
            Detection::new(rect, label_for_class(class_id), scores[i])
        })
        .collect()
}

/// COCO label map as exported by the TFLite detection head: 90 slots,
/// some of them unused.
const COCO_LABELS: [&str; 90] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "n/a",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "n/a",
    "backpack",
    "umbrella",
    "n/a",
    "n/a",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "n/a",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "n/a",
    "dining table",
    "n/a",
    "n/a",
    "toilet",
    "n/a",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "n/a",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

fn label_for_class(class_id: usize) -> &'static str {
    COCO_LABELS.get(class_id).copied().unwrap_or("object")
}
