//! Classification against a real exported model

use std::path::PathBuf;

use singerid_classifier::{AppContext, Classifier, LabelSet, OnnxClassifier};
use singerid_features::FeatureTensor;

fn model_path() -> PathBuf {
    std::env::var("SINGERID_MODEL")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("musician_recognition_model.onnx"))
}

#[test]
#[ignore = "Requires ONNX Runtime libraries and the exported singer model (SINGERID_MODEL)"]
fn test_real_model_metadata() {
    let model = OnnxClassifier::load(model_path(), 2).expect("Failed to load model");

    let shape = model.input_shape();
    assert_eq!(shape.len(), 4);
    assert_eq!(&shape[1..], &[Some(128), Some(128), Some(3)]);
    assert_eq!(model.output_width(), Some(11));
}

#[test]
#[ignore = "Requires ONNX Runtime libraries and the exported singer model (SINGERID_MODEL)"]
fn test_real_model_predicts_a_known_label() {
    let mut context =
        AppContext::load(model_path(), LabelSet::default(), 2).expect("Failed to load model");

    let prediction = context.predict(&FeatureTensor::zeros(128)).unwrap();
    assert_eq!(prediction.scores.len(), 11);
    assert!(context.labels().position(&prediction.label).is_some());
    println!("Zero tensor -> {} ({:?})", prediction.label, prediction.scores);
}
