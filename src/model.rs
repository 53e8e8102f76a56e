//! Inference wrapper around the fitted pipeline and classifier.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::classifier::GradientBoostingClassifier;
use crate::error::{Result, ServiceError};
use crate::frame::{apply_gender_substitution, read_upload};
use crate::pipeline::Preprocessor;
use crate::records::{id_value, PredictionRecord, ID_COLUMN};

/// Default artifact locations. The files shipped in `models/` carry
/// illustrative parameters, not a fitted model, so their predictions carry no
/// clinical meaning; deploy exported artifacts of the real pipeline and
/// classifier in their place.
pub static PIPELINE_PATH: &str = "models/pipeline.json";
pub static MODEL_PATH: &str = "models/model_heart_attack.json";

#[derive(Debug, Clone)]
pub struct Model {
    preprocessor: Preprocessor,
    classifier: GradientBoostingClassifier,
}

impl Model {
    pub fn new(preprocessor: Preprocessor, classifier: GradientBoostingClassifier) -> Result<Self> {
        preprocessor.validate()?;
        classifier.validate()?;

        let width = preprocessor.output_width();
        if width != classifier.num_features {
            return Err(ServiceError::InvalidArtifact(format!(
                "pipeline emits {} features but classifier expects {}",
                width, classifier.num_features
            )));
        }
        Ok(Self { preprocessor, classifier })
    }

    /// Loads both artifacts from disk.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(pipeline_path: P, model_path: Q) -> Result<Self> {
        let preprocessor = Preprocessor::from_path(&pipeline_path)?;
        let classifier = GradientBoostingClassifier::from_path(&model_path)?;
        info!(
            "loaded pipeline {:?} ({} transformers) and classifier {:?} ({} trees)",
            pipeline_path.as_ref(),
            preprocessor.transformers.len(),
            model_path.as_ref(),
            classifier.trees.len()
        );
        Self::new(preprocessor, classifier)
    }

    /// Predicts the label of every row in the uploaded file at `path`.
    /// Output rows follow input row order and carry the input `id`.
    pub fn predict<P: AsRef<Path>>(&self, path: P) -> Result<Vec<PredictionRecord>> {
        let mut df = read_upload(path)?;
        apply_gender_substitution(&mut df)?;

        let x = self.preprocessor.transform(&df)?;
        let labels = self.classifier.predict(&x)?;

        // ids are passed through uncast; the iterator needs a single chunk
        let ids = df.column(ID_COLUMN)?.rechunk();
        let records: Vec<PredictionRecord> = ids
            .iter()
            .zip(labels)
            .map(|(id, prediction)| PredictionRecord { id: id_value(id), prediction })
            .collect();
        debug!("predicted {} rows", records.len());

        Ok(records)
    }
}

/// Outcome of loading the artifacts at startup.
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(Arc<Model>),
    Failed(String),
}

impl ModelState {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(pipeline_path: P, model_path: Q) -> Self {
        match Model::load(pipeline_path, model_path) {
            Ok(model) => ModelState::Ready(Arc::new(model)),
            Err(e) => ModelState::Failed(e.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Node, Tree};
    use crate::pipeline::{ColumnTransformer, Scaler};
    use serde_json::{json, Value};
    use std::io::Write;
    use tempfile::Builder;

    // Predicts 1 for men, 0 for women.
    fn gender_model() -> Model {
        let preprocessor = Preprocessor {
            transformers: vec![
                ColumnTransformer::OneHot {
                    columns: vec!["Gender".to_string()],
                    categories: vec![vec!["Female".to_string(), "Male".to_string()]],
                    fill_values: vec!["Female".to_string()],
                    drop_first: true,
                },
                ColumnTransformer::Numeric {
                    columns: vec!["Age".to_string()],
                    fill_values: vec![0.0],
                    scaler: Scaler::None,
                },
            ],
        };
        let classifier = GradientBoostingClassifier {
            num_features: 2,
            init_score: 0.0,
            threshold: 0.5,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split { feature: 0, threshold: 0.5, left: 1, right: 2, default_left: true },
                    Node::Leaf { value: -1.0 },
                    Node::Leaf { value: 1.0 },
                ],
            }],
        };
        Model::new(preprocessor, classifier).unwrap()
    }

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn predictions_keep_ids_in_input_order() {
        let file = write_csv(&[
            "id,Gender,Age",
            "42,1.0,61",
            "7,0.0,45",
            "19,Male,50",
            "3,Female,70",
        ]);

        let records = gender_model().predict(file.path()).unwrap();
        let ids: Vec<Value> = records.iter().map(|r| r.id.clone()).collect();
        let labels: Vec<u8> = records.iter().map(|r| r.prediction).collect();

        assert_eq!(ids, vec![json!(42), json!(7), json!(19), json!(3)]);
        assert_eq!(labels, vec![1, 0, 1, 0]);
    }

    #[test]
    fn text_ids_are_passed_through() {
        let file = write_csv(&["id,Gender,Age", "P-001,1.0,61", "P-002,0.0,45"]);

        let records = gender_model().predict(file.path()).unwrap();
        assert_eq!(records[0], PredictionRecord { id: json!("P-001"), prediction: 1 });
        assert_eq!(records[1], PredictionRecord { id: json!("P-002"), prediction: 0 });
    }

    #[test]
    fn fractional_ids_are_not_truncated() {
        let file = write_csv(&["id,Gender,Age", "1.5,1.0,61", "2.7,0.0,45"]);

        let records = gender_model().predict(file.path()).unwrap();
        let ids: Vec<Value> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![json!(1.5), json!(2.7)]);
    }

    #[test]
    fn empty_ids_become_null() {
        let file = write_csv(&["id,Gender,Age", ",1.0,61", "8,0.0,45"]);

        let records = gender_model().predict(file.path()).unwrap();
        assert_eq!(records[0].id, Value::Null);
        assert_eq!(records[1].id, json!(8));
    }

    #[test]
    fn missing_feature_column_fails() {
        let file = write_csv(&["id,Gender", "1,1.0"]);
        assert!(gender_model().predict(file.path()).is_err());
    }

    #[test]
    fn missing_id_column_fails() {
        let file = write_csv(&["Gender,Age", "1.0,61"]);
        assert!(gender_model().predict(file.path()).is_err());
    }

    #[test]
    fn width_mismatch_is_rejected_at_construction() {
        let model = gender_model();
        let mut classifier = model.classifier.clone();
        classifier.num_features = 5;
        let err = Model::new(model.preprocessor.clone(), classifier).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArtifact(_)));
    }

    #[test]
    fn dangling_tree_child_is_rejected_at_construction() {
        let model = gender_model();
        let mut classifier = model.classifier.clone();
        classifier.trees[0].nodes[0] =
            Node::Split { feature: 0, threshold: 0.5, left: 1, right: 9, default_left: true };
        let err = Model::new(model.preprocessor.clone(), classifier).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArtifact(_)));
    }

    #[test]
    fn inconsistent_pipeline_is_rejected_at_construction() {
        let model = gender_model();
        let mut preprocessor = model.preprocessor.clone();
        if let ColumnTransformer::Numeric { fill_values, .. } = &mut preprocessor.transformers[1] {
            fill_values.clear();
        }
        let err = Model::new(preprocessor, model.classifier.clone()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArtifact(_)));
    }

    #[test]
    fn failed_load_is_reported_not_raised() {
        let state = ModelState::load("does/not/exist.json", MODEL_PATH);
        assert!(!state.is_ready());
        match state {
            ModelState::Failed(reason) => assert!(reason.contains("does/not/exist.json")),
            ModelState::Ready(_) => unreachable!(),
        }
    }
}
