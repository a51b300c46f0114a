//! Word lists for language identification.
//!
//! Each split is a TSV file with one `word<TAB>language` pair per line. Words
//! are grouped by length so every batch is a rectangular stack of one-hot
//! character steps.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{check_batch_size, Batch, Dataset, Validation};
use crate::nn::Module;
use crate::tensor::{argmax, RcTensor};
use crate::{Error, Result};

pub const TRAIN_FILE: &str = "train.tsv";
pub const DEV_FILE: &str = "dev.tsv";

#[derive(Debug, Clone)]
struct Example {
    chars: Vec<usize>,
    language: usize,
}

#[derive(Debug, Clone)]
struct Vocabulary {
    alphabet: Vec<char>,
    languages: Vec<String>,
}

impl Vocabulary {
    fn char_index(&self, c: char) -> Result<usize> {
        self.alphabet
            .binary_search(&c)
            .map_err(|_| Error::InvalidData(format!("character {c:?} is not in the alphabet")))
    }

    fn encode(&self, word: &str, language: &str) -> Result<Example> {
        let language = self
            .languages
            .iter()
            .position(|l| l == language)
            .ok_or_else(|| Error::InvalidData(format!("unknown language {language:?}")))?;
        let chars = word
            .chars()
            .map(|c| self.char_index(c))
            .collect::<Result<Vec<_>>>()?;
        if chars.is_empty() {
            return Err(Error::EmptySequence);
        }
        Ok(Example { chars, language })
    }

    /// One `[rows, alphabet]` one-hot tensor per character position, plus
    /// `[rows, languages]` one-hot targets. All examples share one length.
    fn stack(&self, examples: &[&Example]) -> Batch<Vec<RcTensor<f64>>> {
        let width = self.alphabet.len();
        let rows = examples.len();
        let steps = examples.first().map_or(0, |e| e.chars.len());
        let x = (0..steps)
            .map(|step| {
                let mut array = vec![0.0; rows * width];
                for (row, example) in examples.iter().enumerate() {
                    array[row * width + example.chars[step]] = 1.0;
                }
                RcTensor::new(array, vec![rows, width])
            })
            .collect();
        let classes = self.languages.len();
        let mut y = vec![0.0; rows * classes];
        for (row, example) in examples.iter().enumerate() {
            y[row * classes + example.language] = 1.0;
        }
        Batch {
            x,
            y: RcTensor::new(y, vec![rows, classes]),
        }
    }
}

fn by_length(examples: &[Example]) -> BTreeMap<usize, Vec<usize>> {
    let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, example) in examples.iter().enumerate() {
        buckets.entry(example.chars.len()).or_default().push(i);
    }
    buckets
}

fn parse_tsv(text: &str, source: &str) -> Result<Vec<(String, String)>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            let (word, language) = line
                .split_once('\t')
                .ok_or_else(|| {
                    Error::InvalidData(format!(
                        "{source}:{}: expected word<TAB>language",
                        n + 1
                    ))
                })?;
            let word = word.trim().to_lowercase();
            if word.is_empty() {
                return Err(Error::InvalidData(format!("{source}:{}: empty word", n + 1)));
            }
            Ok((word, language.trim().to_string()))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct LanguageIdDataset {
    vocabulary: Rc<Vocabulary>,
    train: Rc<Vec<Example>>,
    dev: Vec<Example>,
    rng: StdRng,
}

impl LanguageIdDataset {
    /// The alphabet is every character seen in either split, sorted.
    /// Labels must name one of `languages`.
    pub fn new(
        languages: &[String],
        train: &[(String, String)],
        dev: &[(String, String)],
        seed: u64,
    ) -> Result<Self> {
        let mut alphabet: Vec<char> = train
            .iter()
            .chain(dev.iter())
            .flat_map(|(word, _)| word.chars())
            .collect();
        alphabet.sort_unstable();
        alphabet.dedup();
        let vocabulary = Vocabulary {
            alphabet,
            languages: languages.to_vec(),
        };
        let encode_all = |pairs: &[(String, String)]| {
            pairs
                .iter()
                .map(|(word, language)| vocabulary.encode(word, language))
                .collect::<Result<Vec<_>>>()
        };
        let train = encode_all(train)?;
        let dev = encode_all(dev)?;
        debug!(
            "lang id: {} training words, {} dev words, {} characters, {} languages",
            train.len(),
            dev.len(),
            vocabulary.alphabet.len(),
            vocabulary.languages.len()
        );
        Ok(LanguageIdDataset {
            vocabulary: Rc::new(vocabulary),
            train: Rc::new(train),
            dev,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Reads `train.tsv` and `dev.tsv` from `dir`.
    pub fn load(dir: impl AsRef<Path>, languages: &[String], seed: u64) -> Result<Self> {
        let dir = dir.as_ref();
        debug!("loading language id data from {}", dir.display());
        let train = parse_tsv(&fs::read_to_string(dir.join(TRAIN_FILE))?, TRAIN_FILE)?;
        let dev = parse_tsv(&fs::read_to_string(dir.join(DEV_FILE))?, DEV_FILE)?;
        LanguageIdDataset::new(languages, &train, &dev, seed)
    }

    pub fn num_chars(&self) -> usize {
        self.vocabulary.alphabet.len()
    }

    pub fn alphabet(&self) -> &[char] {
        &self.vocabulary.alphabet
    }

    pub fn languages(&self) -> &[String] {
        &self.vocabulary.languages
    }

    pub fn len(&self) -> usize {
        self.train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }

    /// A single word as `[1, num_chars]` one-hot steps.
    pub fn encode_word(&self, word: &str) -> Result<Vec<RcTensor<f64>>> {
        let width = self.num_chars();
        word.to_lowercase()
            .chars()
            .map(|c| {
                let index = self.vocabulary.char_index(c)?;
                let mut array = vec![0.0; width];
                array[index] = 1.0;
                Ok(RcTensor::new(array, vec![1, width]))
            })
            .collect::<Result<Vec<_>>>()
            .and_then(|steps| {
                if steps.is_empty() {
                    Err(Error::EmptySequence)
                } else {
                    Ok(steps)
                }
            })
    }
}

impl Dataset for LanguageIdDataset {
    type Input = Vec<RcTensor<f64>>;
    type Epoch = LanguageIdEpoch;

    /// Within each length, words are shuffled and cut into batches; the batches
    /// of all lengths are then visited in shuffled order.
    fn iterate_once(&mut self, batch_size: usize) -> Result<LanguageIdEpoch> {
        check_batch_size(batch_size)?;
        let mut batches = Vec::new();
        for (_, mut indices) in by_length(&self.train) {
            indices.shuffle(&mut self.rng);
            batches.extend(indices.chunks(batch_size).map(|chunk| chunk.to_vec()));
        }
        batches.shuffle(&mut self.rng);
        Ok(LanguageIdEpoch {
            vocabulary: Rc::clone(&self.vocabulary),
            examples: Rc::clone(&self.train),
            batches: batches.into_iter(),
        })
    }
}

impl<M> Validation<M> for LanguageIdDataset
where
    M: Module<f64, InputType = Vec<RcTensor<f64>>>,
{
    fn validation_accuracy(&self, model: &M) -> Result<f64> {
        if self.dev.is_empty() {
            return Err(Error::InvalidData("dataset has no dev words".to_string()));
        }
        let mut correct = 0;
        for indices in by_length(&self.dev).into_values() {
            let examples: Vec<&Example> = indices.iter().map(|&i| &self.dev[i]).collect();
            let batch = self.vocabulary.stack(&examples);
            let scores = model.forward(&batch.x)?;
            let (rows, _) = scores.matrix_dims("validation_accuracy")?;
            correct += (0..rows)
                .filter(|&r| argmax(scores.row(r)) == Some(examples[r].language))
                .count();
        }
        Ok(correct as f64 / self.dev.len() as f64)
    }
}

#[derive(Debug)]
pub struct LanguageIdEpoch {
    vocabulary: Rc<Vocabulary>,
    examples: Rc<Vec<Example>>,
    batches: std::vec::IntoIter<Vec<usize>>,
}

impl Iterator for LanguageIdEpoch {
    type Item = Batch<Vec<RcTensor<f64>>>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.batches.next()?;
        let examples: Vec<&Example> = indices.iter().map(|&i| &self.examples[i]).collect();
        Some(self.vocabulary.stack(&examples))
    }
}
