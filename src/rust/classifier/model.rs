use log::{debug, info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::error::ClassifierError;
use super::features::FeatureVector;
use super::utils::{sigmoid, sparse_dot};

/// Learned binary decision function over feature vectors.
pub trait ProbabilisticClassifier {
    /// Fits the model; `labels[i]` is 1 for fraudulent, 0 for authentic.
    fn fit(&mut self, features: &[FeatureVector], labels: &[u8]) -> Result<(), ClassifierError>;

    /// Probability that `x` belongs to class 1 (fraudulent), in `[0, 1]`.
    ///
    /// # Errors
    /// - `NotFitted` if called before [`ProbabilisticClassifier::fit`]
    /// - `ArtifactMismatch` if `x` has the wrong dimension
    fn predict_proba(&self, x: &FeatureVector) -> Result<f64, ClassifierError>;

    /// Feature dimension the classifier was fitted on; zero before fitting.
    fn input_dimension(&self) -> usize;
}

/// Hyperparameters for [`LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    pub max_iterations: usize,
    /// Inverse L2 strength; larger values regularize less.
    pub regularization: f64,
    pub tolerance: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            regularization: 1.0,
            tolerance: 1e-4,
        }
    }
}

/// Class-balanced, L2-regularized logistic regression.
///
/// Each sample is weighted by `n / (2 * n_class)` so a rare fraudulent class
/// pulls as hard on the decision boundary as the common one. Optimized with
/// full-batch gradient descent using a fixed step of `1 / L`, where `L`
/// bounds the curvature of the objective for unit-norm inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticRegressionParams,
    weights: Option<Array1<f64>>,
    intercept: f64,
    iterations_run: usize,
}

impl LogisticRegression {
    /// Optimization checks for cancellation every this many iterations.
    const CANCEL_CHECK_INTERVAL: usize = 25;

    pub fn new(params: LogisticRegressionParams) -> Self {
        Self {
            params,
            weights: None,
            intercept: 0.0,
            iterations_run: 0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    pub fn iterations_run(&self) -> usize {
        self.iterations_run
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Like [`ProbabilisticClassifier::fit`], but stops early with
    /// `Ok(false)` when `cancel` fires; the model is left unfitted then.
    pub fn fit_cancellable(
        &mut self,
        features: &[FeatureVector],
        labels: &[u8],
        cancel: &CancellationToken,
    ) -> Result<bool, ClassifierError> {
        let dimension = Self::validate_training_data(features, labels)?;

        let n = labels.len() as f64;
        let positives = labels.iter().filter(|&&y| y == 1).count() as f64;
        let negatives = n - positives;
        let class_weight = [n / (2.0 * negatives), n / (2.0 * positives)];
        let sample_weights: Vec<f64> = labels.iter().map(|&y| class_weight[y as usize]).collect();

        let l2 = 1.0 / (self.params.regularization * n);
        let max_weight = class_weight[0].max(class_weight[1]);
        // |x|^2 <= 1 for normalized features, plus 1 for the intercept column
        let lipschitz = 0.25 * max_weight * 2.0 + l2;
        let step = 1.0 / lipschitz;

        let mut weights = Array1::<f64>::zeros(dimension);
        let mut intercept = 0.0;
        let mut iterations = 0;

        for iteration in 0..self.params.max_iterations {
            if iteration % Self::CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                warn!("Logistic regression cancelled after {} iterations", iteration);
                self.weights = None;
                return Ok(false);
            }

            let mut grad_w = &weights * l2;
            let mut grad_b = 0.0;
            for ((x, &y), &sw) in features.iter().zip(labels).zip(&sample_weights) {
                let p = sigmoid(sparse_dot(x, &weights) + intercept);
                let residual = sw * (p - f64::from(y)) / n;
                for &(i, v) in x.entries() {
                    grad_w[i] += residual * v;
                }
                grad_b += residual;
            }

            let grad_norm = grad_w.iter().fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            iterations = iteration + 1;
            if grad_norm < self.params.tolerance {
                debug!("Converged after {} iterations (gradient {:.2e})", iterations, grad_norm);
                break;
            }

            weights.scaled_add(-step, &grad_w);
            intercept -= step * grad_b;
        }

        if iterations == self.params.max_iterations {
            warn!("Logistic regression stopped at max_iterations={} before converging", iterations);
        }
        info!("Fitted logistic regression on {} samples ({} positive), {} features", labels.len(), positives, dimension);

        self.weights = Some(weights);
        self.intercept = intercept;
        self.iterations_run = iterations;
        Ok(true)
    }

    fn validate_training_data(features: &[FeatureVector], labels: &[u8]) -> Result<usize, ClassifierError> {
        if features.is_empty() {
            return Err(ClassifierError::ValidationError("No training samples".into()));
        }
        if features.len() != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "{} feature vectors but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if let Some(pos) = labels.iter().position(|&y| y > 1) {
            return Err(ClassifierError::ValidationError(format!(
                "Label {} at position {} is not 0 or 1",
                labels[pos], pos
            )));
        }
        if !labels.contains(&0) || !labels.contains(&1) {
            return Err(ClassifierError::ValidationError("Both classes must be present".into()));
        }

        let dimension = features[0].dimension();
        if dimension == 0 {
            return Err(ClassifierError::ValidationError("Feature dimension is zero".into()));
        }
        if let Some(bad) = features.iter().find(|x| x.dimension() != dimension) {
            return Err(ClassifierError::ArtifactMismatch {
                extractor_dim: bad.dimension(),
                classifier_dim: dimension,
            });
        }
        Ok(dimension)
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn fit(&mut self, features: &[FeatureVector], labels: &[u8]) -> Result<(), ClassifierError> {
        self.fit_cancellable(features, labels, &CancellationToken::new())
            .map(|_| ())
    }

    fn predict_proba(&self, x: &FeatureVector) -> Result<f64, ClassifierError> {
        let weights = self.weights.as_ref().ok_or(ClassifierError::NotFitted)?;
        if x.dimension() != weights.len() {
            return Err(ClassifierError::ArtifactMismatch {
                extractor_dim: x.dimension(),
                classifier_dim: weights.len(),
            });
        }
        Ok(sigmoid(sparse_dot(x, weights) + self.intercept))
    }

    fn input_dimension(&self) -> usize {
        self.weights.as_ref().map_or(0, |w| w.len())
    }
}
