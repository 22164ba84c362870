use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use animal_presence::config::AnalyzerConfig;
use animal_presence::temporal::LstmWeights;
use animal_presence::VideoAnalyzer;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ANIMAL_CONFIG",
        "ANIMAL_BACKEND",
        "ANIMAL_MODEL_PATH",
        "ANIMAL_DECISION_THRESHOLD",
        "ANIMAL_SEQUENCE_LENGTH",
        "ANIMAL_SCORER_WEIGHTS",
        "ANIMAL_SKIP_FRAMES",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "backend": "stub",
        "base_confidence_threshold": 0.25,
        "temporal": {
            "sequence_length": 8,
            "hidden_size": 32,
            "num_layers": 1,
            "decision_threshold": 0.5,
            "fast_path": false,
            "seed": 7
        },
        "ingest": {
            "skip_frames": 2
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("ANIMAL_CONFIG", file.path());
    std::env::set_var("ANIMAL_SEQUENCE_LENGTH", "6");
    std::env::set_var("ANIMAL_SKIP_FRAMES", "0");

    let cfg = AnalyzerConfig::load().expect("load config");

    assert_eq!(cfg.backend, "stub");
    assert_eq!(cfg.base_confidence_threshold, 0.25);
    assert_eq!(cfg.temporal.sequence_length, 6);
    assert_eq!(cfg.temporal.hidden_size, 32);
    assert_eq!(cfg.temporal.num_layers, 1);
    assert_eq!(cfg.temporal.feature_dim, 128);
    assert_eq!(cfg.temporal.decision_threshold, 0.5);
    assert!(!cfg.temporal.fast_path);
    assert_eq!(cfg.temporal.seed, 7);
    assert_eq!(cfg.ingest.skip_frames, 0);

    let temporal = cfg.temporal_config();
    assert_eq!(temporal.base_confidence_threshold, Some(0.25));

    let analyzer = VideoAnalyzer::from_config(&cfg).expect("analyzer");
    assert_eq!(analyzer.backend(), "stub");
    assert_eq!(analyzer.config().sequence_length, 6);

    clear_env();
}

#[test]
fn loads_toml_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
backend = "stub"
model_width = 320
model_height = 240

[temporal]
decision_threshold = 0.4
feature_dim = 64
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = AnalyzerConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.model.width, 320);
    assert_eq!(cfg.model.height, 240);
    assert_eq!(cfg.temporal.decision_threshold, 0.4);
    assert_eq!(cfg.temporal.feature_dim, 64);
    assert_eq!(cfg.temporal.sequence_length, 5);

    clear_env();
}

#[test]
fn rejects_malformed_env_numbers() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ANIMAL_DECISION_THRESHOLD", "high");
    assert!(AnalyzerConfig::load().is_err());
    std::env::remove_var("ANIMAL_DECISION_THRESHOLD");

    std::env::set_var("ANIMAL_SEQUENCE_LENGTH", "0");
    assert!(AnalyzerConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unknown_backend_when_building() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ANIMAL_BACKEND", "megadetector");
    let cfg = AnalyzerConfig::load().expect("load config");
    assert_eq!(cfg.backend, "megadetector");
    assert!(VideoAnalyzer::from_config(&cfg).is_err());

    clear_env();
}

#[test]
fn scorer_checkpoint_must_match_configured_shape() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let weights = LstmWeights::seeded(128, 16, 1, 3);
    let mut file = NamedTempFile::new().expect("temp weights");
    serde_json::to_writer(&mut file, &weights).expect("write weights");
    file.flush().expect("flush weights");
    std::env::set_var("ANIMAL_SCORER_WEIGHTS", file.path());

    let mut cfg = AnalyzerConfig::load().expect("load config");
    assert!(cfg.build_scorer().is_err());

    cfg.temporal.hidden_size = 16;
    cfg.temporal.num_layers = 1;
    let scorer = cfg.build_scorer().expect("scorer");
    assert_eq!(scorer.feature_dim(), 128);

    clear_env();
}
