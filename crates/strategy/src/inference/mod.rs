use std::path::Path;
use std::sync::Arc;

use common::traits::{ScoreError, Scorer};
use tract_onnx::prelude::*;
use tracing::{debug, error, info, warn};

type RunnableModel = TypedRunnableModel<TypedModel>;

/// Probability returned when no model is loaded. It sits inside the dead
/// zone, so simulation mode never trades.
const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Up-probability scorer backed by an ONNX export of the trained classifier.
#[derive(Clone)]
pub struct OnnxScorer {
    model: Option<Arc<RunnableModel>>,
}

impl OnnxScorer {
    pub fn new(model_path: &str, n_features: usize) -> Self {
        let path = Path::new(model_path);
        let model = if path.exists() {
            info!("Loading ONNX model from {:?}", path);
            match Self::load_model(model_path, n_features) {
                Ok(plan) => Some(Arc::new(plan)),
                Err(e) => {
                    error!("Failed to load model: {}", e);
                    None
                }
            }
        } else {
            warn!(
                "ONNX model not found at {:?}. Running in SIMULATION mode (neutral predictions).",
                path
            );
            None
        };

        Self { model }
    }

    pub fn is_simulated(&self) -> bool {
        self.model.is_none()
    }

    fn load_model(path: &str, n_features: usize) -> TractResult<RunnableModel> {
        let model = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, f32::fact([1, n_features]).into())?
            .into_optimized()?
            .into_runnable()?;
        Ok(model)
    }

    fn predict(&self, model: &RunnableModel, features: &[f32]) -> TractResult<Option<f32>> {
        let tensor =
            tract_ndarray::Array::from_shape_vec((1, features.len()), features.to_vec())?
                .into_tensor();
        let outputs = model.run(tvec!(tensor.into()))?;

        // Classifier exports emit a label tensor plus [1, 2] class
        // probabilities; regressors emit a single score.
        for output in outputs.iter() {
            let Ok(view) = output.to_array_view::<f32>() else {
                continue;
            };
            let values: Vec<f32> = view.iter().copied().collect();
            match values.as_slice() {
                [_, up] => return Ok(Some(*up)),
                [p] => return Ok(Some(*p)),
                _ => continue,
            }
        }
        Ok(None)
    }
}

/// Rejects NaN and anything outside [0, 1].
pub fn checked_probability(p: f64) -> Result<f64, ScoreError> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(ScoreError::OutOfRange(p))
    }
}

impl Scorer for OnnxScorer {
    fn score(&self, features: &[f32]) -> Result<f64, ScoreError> {
        let Some(model) = &self.model else {
            return Ok(NEUTRAL_PROBABILITY);
        };

        let p = self
            .predict(model, features)
            .map_err(|e| ScoreError::Inference(e.to_string()))?
            .ok_or_else(|| ScoreError::Inference("model produced no probability output".into()))?;
        debug!("Model probability (up) = {:.4}", p);
        checked_probability(p as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_runs_in_simulation() {
        let scorer = OnnxScorer::new("does/not/exist.onnx", 6);
        assert!(scorer.is_simulated());
        assert_eq!(scorer.score(&[0.0; 6]).unwrap(), NEUTRAL_PROBABILITY);
    }

    #[test]
    fn probability_range_is_enforced() {
        assert_eq!(checked_probability(0.0).unwrap(), 0.0);
        assert_eq!(checked_probability(1.0).unwrap(), 1.0);
        assert!(matches!(checked_probability(1.2), Err(ScoreError::OutOfRange(_))));
        assert!(checked_probability(f64::NAN).is_err());
    }
}
