use convnet_engine::architecture::{
    build_network, load_architecture, ArchitectureConfig, LayerConfig,
};
use convnet_engine::config::{load_config, TrainingConfig};
use convnet_engine::layers::LayerShape;
use convnet_engine::matrix::Matrix;
use convnet_engine::training::{LogObserver, Network, Sample};
use convnet_engine::utils::{Activation, SimpleRng};
use log::{error, info};
use std::fs;
use std::process;
use std::time::Instant;
use tracing_subscriber::filter::LevelFilter;

// Small convolutional network trained on synthetic bar images.
// Usage: train_synthetic [training.json] [architecture.json] [parameters_out.json]
const IMAGE_SIZE: usize = 8;
const TRAIN_SAMPLES: usize = 200;
const TEST_SAMPLES: usize = 50;
const NOISE: f64 = 0.2;
const DEFAULT_OUTPUT: &str = "parameters.json";

fn default_training() -> TrainingConfig {
    TrainingConfig {
        epochs: 15,
        mini_batch_size: 10,
        learning_rate: 1.0,
        seed: Some(42),
    }
}

fn default_architecture() -> ArchitectureConfig {
    ArchitectureConfig {
        input: LayerShape::new(1, IMAGE_SIZE, IMAGE_SIZE),
        layers: vec![
            LayerConfig {
                layer_type: "convolution".to_string(),
                features: Some(3),
                kernel_rows: Some(3),
                kernel_columns: Some(3),
                activation: Some(Activation::Sigmoid),
                ..LayerConfig::default()
            },
            LayerConfig {
                layer_type: "max_pooling".to_string(),
                pooling_rows: Some(2),
                pooling_columns: Some(2),
                ..LayerConfig::default()
            },
            LayerConfig {
                layer_type: "fully_connected".to_string(),
                neurons: Some(2),
                activation: Some(Activation::Sigmoid),
                ..LayerConfig::default()
            },
        ],
    }
}

/// Noisy images containing one full-length bar: horizontal bars are class 0,
/// vertical bars class 1.
fn bar_images(count: usize, rng: &mut SimpleRng) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let label = i % 2;
            let position = rng.gen_usize(IMAGE_SIZE);
            let mut image = Matrix::zeros(IMAGE_SIZE, IMAGE_SIZE);
            for row in 0..IMAGE_SIZE {
                for column in 0..IMAGE_SIZE {
                    let on_bar = if label == 0 { row == position } else { column == position };
                    image[(row, column)] = if on_bar { 1.0 } else { rng.next_f64() * NOISE };
                }
            }
            Sample::classification(image, label, 2)
        })
        .collect()
}

fn fail(message: String) -> ! {
    error!("{}", message);
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let training = match args.get(1) {
        Some(path) => load_config(path).unwrap_or_else(|e| fail(format!("{}: {}", path, e))),
        None => default_training(),
    };
    let architecture = match args.get(2) {
        Some(path) => load_architecture(path).unwrap_or_else(|e| fail(format!("{}: {}", path, e))),
        None => default_architecture(),
    };
    let output_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_OUTPUT);

    let mut rng = match training.seed {
        Some(seed) => SimpleRng::new(seed),
        None => SimpleRng::from_time(),
    };

    let shape = architecture.input;
    if shape.features != 1 || shape.rows != IMAGE_SIZE || shape.columns != IMAGE_SIZE {
        fail(format!(
            "Synthetic images are 1x{}x{} but the architecture expects {}x{}x{}",
            IMAGE_SIZE, IMAGE_SIZE, shape.features, shape.rows, shape.columns
        ));
    }

    let mut network =
        build_network(&architecture, &mut rng).unwrap_or_else(|e| fail(e.to_string()));
    info!(
        "Network with {} layers and {} parameters",
        network.layers().len(),
        network.parameter_count()
    );

    let training_set = bar_images(TRAIN_SAMPLES, &mut rng);
    let test_set = bar_images(TEST_SAMPLES, &mut rng);

    let start = Instant::now();
    network.train(
        &training_set,
        &training.options(),
        Some(&test_set),
        &mut rng,
        &mut LogObserver,
    );
    info!("Training finished in {:.2}s", start.elapsed().as_secs_f64());

    let correct = network.test(&test_set);
    info!(
        "Test accuracy: {}/{} ({:.1}%)",
        correct,
        test_set.len(),
        100.0 * correct as f64 / test_set.len() as f64
    );

    let snapshot = network.parameter_snapshot();
    let written = serde_json::to_string(&snapshot)
        .map_err(|e| e.to_string())
        .and_then(|json| fs::write(output_path, json).map_err(|e| e.to_string()));
    match written {
        Ok(()) => info!("Parameters written to {}", output_path),
        Err(e) => fail(format!("{}: {}", output_path, e)),
    }
}
