// Tests for saving and loading trained parameters: the feedforward network's
// JSON document and the layered network's parameter snapshot.

use convnet_engine::feedforward::FeedforwardNetwork;
use convnet_engine::layers::{ConvolutionLayer, FullyConnectedLayer, LayerShape, MaxPoolingLayer};
use convnet_engine::matrix::Matrix;
use convnet_engine::network::{NeuralNetwork, ParameterSnapshot};
use convnet_engine::utils::{Activation, SimpleRng};
use convnet_engine::{Network, NetworkError};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_document(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp document");
    file
}

fn invalid_field(contents: &str) -> String {
    let temp_file = write_temp_document(contents);
    match FeedforwardNetwork::load(temp_file.path()) {
        Err(NetworkError::InvalidData { field }) => field,
        Err(other) => panic!("expected invalid data, got {:?}", other),
        Ok(_) => panic!("expected invalid data, document loaded"),
    }
}

fn bits(matrix: &Matrix) -> Vec<u64> {
    matrix.elements().iter().map(|value| value.to_bits()).collect()
}

fn small_document() -> serde_json::Value {
    json!({
        "LayerSizes": [2, 1],
        "Weights": [{ "Rows": 1, "Columns": 2, "Elements": [0.5, -0.5] }],
        "Biases": [{ "Rows": 1, "Columns": 1, "Elements": [0.1] }]
    })
}

fn conv_network(rng: &mut SimpleRng) -> NeuralNetwork {
    NeuralNetwork::new(
        LayerShape::new(1, 6, 6),
        vec![
            Box::new(ConvolutionLayer::new(2, 3, 3, Activation::Rectifier)),
            Box::new(MaxPoolingLayer::new(2, 2)),
            Box::new(FullyConnectedLayer::new(3, Activation::Sigmoid)),
        ],
        rng,
    )
}

// ============================================================================
// Feedforward Document Tests
// ============================================================================

mod feedforward_document_tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip_is_exact() {
        let mut rng = SimpleRng::new(7);
        let mut original = FeedforwardNetwork::new(&[784, 100, 10], &mut rng);
        let file = NamedTempFile::new().expect("failed to create temp file");

        original.save(file.path()).expect("save failed");
        let mut restored = FeedforwardNetwork::load(file.path()).expect("load failed");

        assert_eq!(restored.layer_sizes(), &[784, 100, 10]);
        for (a, b) in original.layers().iter().zip(restored.layers()) {
            assert_eq!(a.weights().shape(), b.weights().shape());
            assert_eq!(bits(a.weights()), bits(b.weights()));
            assert_eq!(bits(a.biases()), bits(b.biases()));
        }
        let input = Matrix::random_normal(784, 1, &mut rng);
        assert_eq!(original.predict(&input), restored.predict(&input));
    }

    #[test]
    fn test_saved_document_uses_record_keys() {
        let net = FeedforwardNetwork::new(&[3, 2], &mut SimpleRng::new(1));
        let file = NamedTempFile::new().expect("failed to create temp file");
        net.save(file.path()).expect("save failed");

        let contents = std::fs::read_to_string(file.path()).expect("read failed");
        let document: serde_json::Value = serde_json::from_str(&contents).expect("saved JSON");
        assert_eq!(document["LayerSizes"], json!([3, 2]));
        assert_eq!(document["Weights"][0]["Rows"], json!(2));
        assert_eq!(document["Weights"][0]["Columns"], json!(3));
        assert_eq!(document["Weights"][0]["Elements"].as_array().map(Vec::len), Some(6));
        assert_eq!(document["Biases"][0]["Columns"], json!(1));
    }

    #[test]
    fn test_load_hand_written_document() {
        let temp_file = write_temp_document(&small_document().to_string());
        let mut net = FeedforwardNetwork::load(temp_file.path()).expect("load failed");

        let output = net.predict(&Matrix::from_vec(2, 1, vec![1.0, 1.0]));
        let expected = 1.0 / (1.0 + (-(0.0 + 0.5 - 0.5 + 0.1_f64)).exp());
        assert!((output[(0, 0)] - expected).abs() < 1e-15);
    }

    #[test]
    fn test_missing_file() {
        let result = FeedforwardNetwork::load("does/not/exist/network.json");
        assert!(matches!(result, Err(NetworkError::FileNotFound { .. })));
    }

    #[test]
    fn test_not_json() {
        let temp_file = write_temp_document("LayerSizes: [2, 1]");
        assert!(matches!(
            FeedforwardNetwork::load(temp_file.path()),
            Err(NetworkError::Json(_))
        ));
    }
}

// ============================================================================
// Invalid Document Tests
// ============================================================================

mod invalid_document_tests {
    use super::*;

    #[test]
    fn test_missing_layer_sizes() {
        let mut document = small_document();
        document.as_object_mut().unwrap().remove("LayerSizes");
        assert_eq!(invalid_field(&document.to_string()), "LayerSizes");
    }

    #[test]
    fn test_single_layer_size() {
        let mut document = small_document();
        document["LayerSizes"] = json!([2]);
        assert_eq!(invalid_field(&document.to_string()), "LayerSizes");
    }

    #[test]
    fn test_wrong_number_of_weight_records() {
        let mut document = small_document();
        document["LayerSizes"] = json!([2, 1, 1]);
        assert_eq!(invalid_field(&document.to_string()), "Weights");
    }

    #[test]
    fn test_missing_biases() {
        let mut document = small_document();
        document.as_object_mut().unwrap().remove("Biases");
        assert_eq!(invalid_field(&document.to_string()), "Biases");
    }

    #[test]
    fn test_non_numeric_rows() {
        let mut document = small_document();
        document["Weights"][0]["Rows"] = json!("one");
        assert_eq!(invalid_field(&document.to_string()), "Weights[0].Rows");
    }

    #[test]
    fn test_element_count_mismatch() {
        let mut document = small_document();
        document["Biases"][0]["Elements"] = json!([0.1, 0.2]);
        assert_eq!(invalid_field(&document.to_string()), "Biases[0].Elements");
    }

    #[test]
    fn test_overflowing_shape_is_invalid_data() {
        let mut document = small_document();
        document["Weights"][0] = json!({
            "Rows": 4294967296u64,
            "Columns": 4294967296u64,
            "Elements": []
        });
        assert_eq!(invalid_field(&document.to_string()), "Weights[0].Elements");
    }

    #[test]
    fn test_weights_inconsistent_with_layer_sizes() {
        let mut document = small_document();
        document["Weights"][0] = json!({ "Rows": 2, "Columns": 1, "Elements": [0.5, -0.5] });
        assert_eq!(invalid_field(&document.to_string()), "Weights[0]");
    }
}

// ============================================================================
// Parameter Snapshot Tests
// ============================================================================

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_snapshot_json_restores_predictions() {
        let mut rng = SimpleRng::new(6);
        let mut trained = conv_network(&mut rng);
        let json = serde_json::to_string(&trained.parameter_snapshot()).expect("serialize");

        let mut fresh = conv_network(&mut rng);
        let snapshot: ParameterSnapshot = serde_json::from_str(&json).expect("deserialize");
        fresh.restore_parameters(&snapshot).expect("restore");

        let expected = trained.parameter_snapshot();
        for (restored, saved) in fresh.parameter_snapshot().layers.iter().zip(&expected.layers) {
            let restored: Vec<u64> = restored.iter().map(|value| value.to_bits()).collect();
            let saved: Vec<u64> = saved.iter().map(|value| value.to_bits()).collect();
            assert_eq!(restored, saved);
        }

        let input = Matrix::random_normal(6, 6, &mut rng);
        assert_eq!(fresh.predict(&input), trained.predict(&input));
    }

    #[test]
    fn test_snapshot_json_is_bit_exact_for_many_values() {
        let mut rng = SimpleRng::new(7);
        let values: Vec<f64> = (0..20_000).map(|_| rng.next_normal()).collect();
        let snapshot = ParameterSnapshot {
            layers: vec![values],
        };
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: ParameterSnapshot = serde_json::from_str(&json).expect("deserialize");

        let mismatches = snapshot.layers[0]
            .iter()
            .zip(&back.layers[0])
            .filter(|(a, b)| a.to_bits() != b.to_bits())
            .count();
        assert_eq!(mismatches, 0);
    }

    #[test]
    fn test_snapshot_lists_pooling_as_empty() {
        let snapshot = conv_network(&mut SimpleRng::new(2)).parameter_snapshot();
        assert_eq!(snapshot.layers.len(), 3);
        assert_eq!(snapshot.layers[0].len(), 2 + 2 * 9);
        assert!(snapshot.layers[1].is_empty());
        assert_eq!(snapshot.layers[2].len(), 3 + 3 * 2 * 2 * 2);
    }

    #[test]
    fn test_restore_rejects_wrong_layer_count() {
        let mut net = conv_network(&mut SimpleRng::new(3));
        let snapshot = ParameterSnapshot {
            layers: vec![vec![0.0; 20]],
        };
        assert!(matches!(
            net.restore_parameters(&snapshot),
            Err(NetworkError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_restore_mismatch_leaves_network_unchanged() {
        let mut net = conv_network(&mut SimpleRng::new(4));
        let before = net.parameter_snapshot();
        let mut snapshot = before.clone();
        snapshot.layers[0] = vec![1.0; 20];
        snapshot.layers[2].pop();

        let err = net.restore_parameters(&snapshot).expect_err("count mismatch");
        assert!(matches!(
            err,
            NetworkError::ParameterCountMismatch {
                layer: 2,
                expected: 27,
                actual: 26
            }
        ));
        assert_eq!(net.parameter_snapshot(), before);
    }
}
