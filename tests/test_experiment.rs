use settlement_ml::{
    DataLoader, Experiment, ExperimentConfig, ForecastingModel, ModelConfig, SettlementError,
    TrainSplit,
};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

// Синусоида с трендом, два признака
fn create_sample_csv(rows: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,settlement,pore_pressure").unwrap();
    for i in 0..rows {
        let t = i as f64;
        writeln!(
            file,
            "2019-01-{:02},{:.4},{:.4}",
            i % 28 + 1,
            10.0 + 0.05 * t + (t / 5.0).sin(),
            50.0 + (t / 7.0).cos() * 3.0
        )
        .unwrap();
    }
    file
}

fn small_config() -> ExperimentConfig {
    ExperimentConfig {
        name: "test".to_string(),
        dataset: None,
        window: 2,
        horizon: 1,
        target_variable: 0,
        split: TrainSplit::Fraction(0.75),
        feature_range: (0.0, 1.0),
        model: ModelConfig {
            lstm_units: vec![12, 6],
            dropout: 0.2,
            learning_rate: 0.01,
            batch_size: 8,
            epochs: 10,
        },
        seed: 11,
        artifact_dir: None,
    }
}

#[test]
fn test_full_experiment_workflow() {
    let csv = create_sample_csv(41);
    let out = tempdir().unwrap();

    let mut config = small_config();
    config.dataset = Some(csv.path().to_path_buf());
    config.artifact_dir = Some(out.path().join("model"));

    let mut experiment = Experiment::new(config).unwrap();
    let report = experiment.run_from_dataset().unwrap();

    // 41 - 2 - 1 + 1 строк, 2 * 3 столбца
    assert_eq!(report.frame_shape, (39, 6));
    assert_eq!(report.n_train, 29);
    assert_eq!(report.n_test, 10);
    assert_eq!(report.history.loss.len(), 10);
    assert_eq!(report.history.val_loss.len(), 10);
    assert_eq!(report.predictions.len(), 10);
    assert!(report.rmse.is_finite());
    assert!(report.rmse >= report.mae);

    let artifacts = report.artifacts.unwrap();
    assert!(artifacts.architecture.exists());
    assert!(artifacts.weights.exists());

    // Модель восстанавливается из сохранённых файлов
    let restored = ForecastingModel::load(out.path().join("model")).unwrap();
    assert_eq!(restored.architecture().lstm_units, vec![12, 6]);
    assert_eq!(restored.architecture().n_steps, 2);
}

#[test]
fn test_seed_makes_runs_repeatable() {
    let data = DataLoader::from_csv(create_sample_csv(30).path()).unwrap();

    let a = Experiment::new(small_config()).unwrap().run(&data.values).unwrap();
    let b = Experiment::new(small_config()).unwrap().run(&data.values).unwrap();
    assert_eq!(a.predictions, b.predictions);
    assert_eq!(a.history, b.history);

    let mut other = small_config();
    other.seed = 12;
    let c = Experiment::new(other).unwrap().run(&data.values).unwrap();
    assert_ne!(a.predictions, c.predictions);
}

#[test]
fn test_too_short_series_is_empty_result() {
    let data = DataLoader::from_csv(create_sample_csv(2).path()).unwrap();
    let result = Experiment::new(small_config()).unwrap().run(&data.values);

    assert!(matches!(result, Err(SettlementError::EmptyResult(_))));
}

#[test]
fn test_save_before_run_fails() {
    let experiment = Experiment::new(small_config()).unwrap();
    let dir = tempdir().unwrap();

    assert!(matches!(
        experiment.save_artifacts(dir.path()),
        Err(SettlementError::NotFitted(_))
    ));
}

#[test]
fn test_config_file_roundtrip() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"name": "from-file", "window": 4, "split": {{"rows": 100}}, "model": {{"lstm_units": [32]}}}}"#
    )
    .unwrap();

    let config = ExperimentConfig::from_file(file.path()).unwrap();
    assert_eq!(config.name, "from-file");
    assert_eq!(config.window, 4);
    assert_eq!(config.split, TrainSplit::Rows(100));
    assert_eq!(config.model.lstm_units, vec![32]);
    assert_eq!(config.model.epochs, 50);
}
