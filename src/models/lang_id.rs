use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, LanguageIdDataset, Validation};
use crate::models::{check_batch_size, check_cap, check_learning_rate, check_size, TrainReport};
use crate::nn::{Linear, Module, Parameter, RecurrentCell};
use crate::optim::Sgd;
use crate::tensor::functional;
use crate::tensor::{argmax, RcTensor};
use crate::{Error, Result};

pub const LANGUAGES: [&str; 5] = ["English", "Spanish", "Finnish", "Dutch", "Polish"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageIdConfig {
    /// Size of the combined alphabet.
    pub num_chars: usize,
    pub hidden_size: usize,
    pub languages: Vec<String>,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Accuracy is not consulted until more than this many updates have run.
    pub min_iterations: usize,
    /// Validation accuracy has to exceed this to stop.
    pub target_accuracy: f64,
    pub max_iterations: Option<usize>,
}

impl Default for LanguageIdConfig {
    fn default() -> Self {
        LanguageIdConfig {
            num_chars: 47,
            hidden_size: 300,
            languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
            batch_size: 3,
            learning_rate: 0.0075,
            min_iterations: 35000,
            target_accuracy: 0.83,
            max_iterations: None,
        }
    }
}

impl LanguageIdConfig {
    pub fn validate(&self) -> Result<()> {
        check_size("lang_id", "num_chars", self.num_chars)?;
        check_size("lang_id", "hidden_size", self.hidden_size)?;
        check_size("lang_id", "languages", self.languages.len())?;
        check_batch_size("lang_id", self.batch_size)?;
        check_learning_rate("lang_id", self.learning_rate)?;
        check_cap("lang_id", "max_iterations", self.max_iterations)
    }
}

/// Character-level recurrent classifier: a [`RecurrentCell`] folded over the
/// word, then a linear read-out to one score per language.
#[derive(Debug, Clone)]
pub struct LanguageIdModel {
    cell: RecurrentCell<f64>,
    output: Linear<f64>,
}

impl LanguageIdModel {
    pub fn new<R: Rng + ?Sized>(config: &LanguageIdConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        Ok(LanguageIdModel {
            cell: RecurrentCell::new(config.num_chars, config.hidden_size, rng)?,
            output: Linear::random(
                "lang_id.output",
                config.hidden_size,
                config.languages.len(),
                None,
                rng,
            )?,
        })
    }

    /// `xs` holds one `[batch, num_chars]` one-hot tensor per character.
    /// Returns `[batch, languages]` scores.
    pub fn run(&self, xs: &[RcTensor<f64>]) -> Result<RcTensor<f64>> {
        self.output.forward(&self.cell.fold(xs)?)
    }

    pub fn get_loss(&self, xs: &[RcTensor<f64>], y: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        functional::softmax_loss(&self.run(xs)?, y)
    }

    pub fn predict_language<'d>(
        &self,
        word: &str,
        dataset: &'d LanguageIdDataset,
    ) -> Result<&'d str> {
        let scores = self.run(&dataset.encode_word(word)?)?;
        argmax(scores.row(0))
            .and_then(|i| dataset.languages().get(i))
            .map(|l| l.as_str())
            .ok_or_else(|| Error::InvalidData(format!("no language for {word:?}")))
    }

    /// Checks after every update. Stops when more than `min_iterations`
    /// updates have run and validation accuracy is above `target_accuracy`.
    pub fn train<D>(&mut self, dataset: &mut D, config: &LanguageIdConfig) -> Result<TrainReport>
    where
        D: Dataset<Input = Vec<RcTensor<f64>>> + Validation<Self>,
    {
        config.validate()?;
        let sgd = Sgd::new(config.learning_rate)?;
        info!(
            "training language id: batch size {}, learning rate {}, {} languages",
            config.batch_size,
            config.learning_rate,
            config.languages.len()
        );
        let mut report = TrainReport::default();
        loop {
            let mut batches = 0;
            for batch in dataset.iterate_once(config.batch_size)? {
                let loss = self.get_loss(&batch.x, &batch.y)?;
                let value = sgd.step(self, loss)?;
                debug!("lang id batch {}: loss {value}", report.iterations);
                report.last_loss = Some(value);
                report.iterations += 1;
                batches += 1;

                if report.iterations > config.min_iterations {
                    let accuracy = dataset.validation_accuracy(&*self)?;
                    report.validation_accuracy = Some(accuracy);
                    info!(
                        "lang id iteration {}: validation accuracy {accuracy:.4}",
                        report.iterations
                    );
                    if accuracy > config.target_accuracy {
                        report.converged = true;
                        info!("language id converged after {} iterations", report.iterations);
                        return Ok(report);
                    }
                }
                if config.max_iterations.is_some_and(|max| report.iterations >= max) {
                    warn!(
                        "language id stopped after {} iterations, accuracy {:?}",
                        report.iterations, report.validation_accuracy
                    );
                    return Ok(report);
                }
            }
            if batches == 0 {
                return Err(Error::InvalidData("language id dataset is empty".to_string()));
            }
            report.epochs += 1;
        }
    }
}

impl crate::nn::module::private::Private for LanguageIdModel {}

impl Module<f64> for LanguageIdModel {
    type InputType = Vec<RcTensor<f64>>;

    fn forward(&self, xs: &Vec<RcTensor<f64>>) -> Result<RcTensor<f64>> {
        self.run(xs)
    }

    fn params(&self) -> Vec<&Parameter<f64>> {
        let mut params = self.cell.params();
        params.extend(self.output.params());
        params
    }

    fn params_mut(&mut self) -> Vec<&mut Parameter<f64>> {
        let mut params = self.cell.params_mut();
        params.extend(self.output.params_mut());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> LanguageIdConfig {
        LanguageIdConfig {
            num_chars: 4,
            hidden_size: 6,
            languages: vec!["a".to_string(), "b".to_string()],
            ..LanguageIdConfig::default()
        }
    }

    #[test]
    fn test_default_shapes() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = LanguageIdModel::new(&LanguageIdConfig::default(), &mut rng).unwrap();
        let shapes: Vec<Vec<usize>> = model.params().iter().map(|p| p.shape().clone()).collect();
        assert_eq!(
            shapes,
            vec![
                vec![47, 300],
                vec![300, 300],
                vec![1, 300],
                vec![300, 300],
                vec![1, 300],
                vec![300, 5],
                vec![1, 5]
            ]
        );
    }

    #[test]
    fn test_empty_word() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = LanguageIdModel::new(&small_config(), &mut rng).unwrap();
        assert!(matches!(model.run(&[]), Err(Error::EmptySequence)));
    }

    #[test]
    fn test_scores_per_word() {
        let mut rng = StdRng::seed_from_u64(2);
        let model = LanguageIdModel::new(&small_config(), &mut rng).unwrap();
        let step = RcTensor::from([[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]]);
        let scores = model.run(&[step.clone(), step]).unwrap();
        assert_eq!(scores.shape(), &vec![2, 2]);
    }

    #[test]
    fn test_defaults_match_tuned_values() {
        let config = LanguageIdConfig::default();
        assert_eq!(config.num_chars, 47);
        assert_eq!(config.hidden_size, 300);
        assert_eq!(
            config.languages,
            vec!["English", "Spanish", "Finnish", "Dutch", "Polish"]
        );
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.learning_rate, 0.0075);
        assert_eq!(config.min_iterations, 35000);
        assert_eq!(config.target_accuracy, 0.83);
        assert_eq!(config.max_iterations, None);
        assert!(config.validate().is_ok());
    }
}
