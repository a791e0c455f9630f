//! End-to-end tests through the public API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, Axis};
use oar_classify::core::{Tensor2D, Tensor4D};
use oar_classify::models::parse_version;
use oar_classify::prelude::*;
use serde_json::Value;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Records the spatial size of every batch it sees and scores by brightness.
#[derive(Debug, Default)]
struct RecordingClassifier {
    declared: Option<(usize, usize)>,
    seen: Mutex<Vec<(usize, usize, usize)>>,
}

impl ImageClassifier for RecordingClassifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn input_shape(&self) -> Option<(usize, usize)> {
        self.declared
    }

    fn predict_batch(&self, batch: &Tensor4D) -> ClassifyResult<Tensor2D> {
        let shape = batch.shape();
        self.seen
            .lock()
            .unwrap()
            .push((shape[1], shape[2], shape[3]));
        let mut out = Array2::<f32>::zeros((shape[0], 2));
        for (i, image) in batch.axis_iter(Axis(0)).enumerate() {
            let bright = image.mean().unwrap_or(0.0) / 255.0;
            out[[i, 0]] = 1.0 - bright;
            out[[i, 1]] = bright;
        }
        Ok(out)
    }
}

fn solid_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn context(model: Arc<RecordingClassifier>, labels: [&str; 2]) -> AppContext {
    let config = ServiceConfig {
        class_labels: labels.iter().map(|l| l.to_string()).collect(),
        ..ServiceConfig::default()
    };
    let engine = InferenceEngine::from_model(model, (128, 128));
    AppContext::new(engine, &config).unwrap()
}

#[test]
fn images_are_resized_to_declared_shape() {
    let model = Arc::new(RecordingClassifier {
        declared: Some((64, 32)),
        ..Default::default()
    });
    let ctx = context(model.clone(), ["Cat", "Dog"]);

    classify(&ctx, ImageSource::Binary(solid_png(300, 200, 10))).unwrap();
    classify(&ctx, ImageSource::Binary(solid_png(32, 64, 10))).unwrap();

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[(64, 32, 3), (64, 32, 3)]);
}

#[test]
fn labels_follow_configuration_order() {
    let model = Arc::new(RecordingClassifier::default());
    let ctx = context(model, ["Dark", "Bright"]);

    let result = classify(&ctx, ImageSource::Binary(solid_png(16, 16, 255))).unwrap();
    assert_eq!(result.labels().collect::<Vec<_>>(), vec!["Dark", "Bright"]);
    let score = |label: &str| result.get(label).unwrap().parse::<f32>().unwrap();
    assert!(score("Bright") > 0.99);
    assert!(score("Dark") < 0.01);
}

#[test]
fn base64_and_binary_agree() {
    let model = Arc::new(RecordingClassifier::default());
    let ctx = context(model, ["Cat", "Dog"]);
    let png = solid_png(20, 10, 100);

    let binary = classify(&ctx, ImageSource::Binary(png.clone())).unwrap();
    let text = classify(
        &ctx,
        ImageSource::Base64Text(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
            .without_data_url_prefix(),
    )
    .unwrap();
    assert_eq!(binary, text);
}

#[tokio::test]
async fn http_round_trip() {
    let model = Arc::new(RecordingClassifier::default());
    let ctx = Arc::new(context(model, ["Cat", "Dog"]));
    let api = routes(ctx);

    let resp = warp::test::request()
        .method("POST")
        .path("/classify/withImageString")
        .header("content-type", "application/json")
        .body(
            serde_json::json!({ "imageString": STANDARD.encode(solid_png(8, 8, 0)) })
                .to_string(),
        )
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 200);

    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["result"], "success");
    assert_eq!(body["mlOutput"]["Cat"], "1");
    assert_eq!(body["mlOutput"]["Dog"], "0");
}

#[test]
fn registry_selection_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["model-v1.2.0", "model-v1.10.0", "model-v1.9.3", "notes", "weights-v9.0.0"] {
        std::fs::create_dir(dir.path().join(name)).unwrap();
    }
    std::fs::write(dir.path().join("model-v2.0.0.onnx"), b"").unwrap();

    let registry = ModelRegistry::discover(dir.path()).unwrap();
    assert_eq!(registry.artifacts().len(), 4);

    let latest = registry.select(&ModelSelection::Latest).unwrap();
    assert_eq!(latest.name, "model-v2.0.0.onnx");

    let pinned = registry
        .select(&ModelSelection::Version("1.10.0".into()))
        .unwrap();
    assert_eq!(pinned.name, "model-v1.10.0");
    assert_eq!(pinned.version, parse_version("v1.10.0"));

    assert!(matches!(
        registry.select(&ModelSelection::Name("model-v3.0.0".into())),
        Err(ClassifyError::ArtifactNotFound { .. })
    ));
}

#[test]
fn bootstrap_fails_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        model_dir: dir.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    let err = AppContext::bootstrap(&config).unwrap_err();
    assert!(err.is_bootstrap_fatal());
}
