use std::env;
use std::process::ExitCode;

use light_models::config::{self, TrainingConfig};
use light_models::data::{mnist, synthetic, LanguageIdDataset};
use light_models::models::{
    DigitClassificationModel, LanguageIdModel, Perceptron, RegressionModel, TrainReport,
};
use light_models::{Error, Result};
use log::{error, info, warn};
use rand::prelude::*;

const USAGE: &str = "usage: train <perceptron|regression|digits|lang-id> [config.json]";

const PERCEPTRON_POINTS: usize = 500;
const PERCEPTRON_DIMS: usize = 3;
const REGRESSION_POINTS: usize = 200;

fn train(model: &str, config: &TrainingConfig) -> Result<TrainReport> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    match model {
        "perceptron" => {
            let mut dataset =
                synthetic::perceptron_dataset(PERCEPTRON_POINTS, PERCEPTRON_DIMS, &mut rng)?
                    .shuffled(config.seed);
            let mut perceptron = Perceptron::new(PERCEPTRON_DIMS, &mut rng)?;
            perceptron.train(&mut dataset, &config.perceptron)
        }
        "regression" => {
            let mut dataset =
                synthetic::regression_dataset(REGRESSION_POINTS)?.shuffled(config.seed);
            let mut model = RegressionModel::new(&config.regression, &mut rng)?;
            model.train(&mut dataset, &config.regression)
        }
        "digits" => {
            let mut dataset = mnist::load(config::mnist_dir(), config.digits.dev_len, config.seed)?;
            let mut model = DigitClassificationModel::new(&config.digits, &mut rng)?;
            model.train(&mut dataset, &config.digits)
        }
        "lang-id" => {
            let mut lang_id = config.lang_id.clone();
            let mut dataset =
                LanguageIdDataset::load(config::lang_id_dir(), &lang_id.languages, config.seed)?;
            if dataset.num_chars() != lang_id.num_chars {
                warn!(
                    "configured for {} characters but the data has {}, using the data",
                    lang_id.num_chars,
                    dataset.num_chars()
                );
                lang_id.num_chars = dataset.num_chars();
            }
            let mut model = LanguageIdModel::new(&lang_id, &mut rng)?;
            let report = model.train(&mut dataset, &lang_id)?;
            for word in ["hello", "hola", "hallo"] {
                match model.predict_language(word, &dataset) {
                    Ok(language) => info!("{word:?} looks {language}"),
                    Err(e) => warn!("cannot classify {word:?}: {e}"),
                }
            }
            Ok(report)
        }
        other => Err(Error::InvalidConfig(format!("unknown model {other:?}\n{USAGE}"))),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(model) = args.first() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };
    let config = match args.get(1) {
        Some(path) => TrainingConfig::from_json_file(path),
        None => Ok(TrainingConfig::default()),
    };
    match config.and_then(|config| train(model, &config)) {
        Ok(report) => {
            info!("{model} finished: {report:?}");
            println!(
                "{model}: converged={} epochs={} iterations={} last_loss={:?} validation_accuracy={:?}",
                report.converged,
                report.epochs,
                report.iterations,
                report.last_loss,
                report.validation_accuracy
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{model} failed: {e}");
            eprintln!("train: {e}");
            ExitCode::FAILURE
        }
    }
}
