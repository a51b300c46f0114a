//! Reader for the MNIST IDX training files.

use std::fs;
use std::path::Path;

use log::debug;

use crate::data::TabularDataset;
use crate::tensor::RcTensor;
use crate::{Error, Result};

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const NUM_CLASSES: usize = 10;

const IMAGE_MAGIC: u32 = 0x0000_0803;
const LABEL_MAGIC: u32 = 0x0000_0801;

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::InvalidData(format!("IDX header truncated at byte {offset}")))
}

/// Returns `(images, pixels_per_image, pixels)` with pixels scaled to `[0, 1]`.
pub fn parse_images(bytes: &[u8]) -> Result<(usize, usize, Vec<f64>)> {
    let magic = read_u32(bytes, 0)?;
    if magic != IMAGE_MAGIC {
        return Err(Error::InvalidData(format!(
            "bad IDX image magic {magic:#010x}"
        )));
    }
    let count = read_u32(bytes, 4)? as usize;
    let rows = read_u32(bytes, 8)? as usize;
    let cols = read_u32(bytes, 12)? as usize;
    let body = &bytes[16..];
    let header_size = rows
        .checked_mul(cols)
        .and_then(|pixels| Some((pixels, pixels.checked_mul(count)?)));
    let Some((pixels, total)) = header_size else {
        return Err(Error::InvalidData(format!(
            "IDX image header {count} x {rows} x {cols} is too large"
        )));
    };
    if body.len() != total {
        return Err(Error::InvalidData(format!(
            "IDX image body has {} bytes, header says {count} x {rows} x {cols}",
            body.len()
        )));
    }
    Ok((count, pixels, body.iter().map(|&p| p as f64 / 255.0).collect()))
}

pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let magic = read_u32(bytes, 0)?;
    if magic != LABEL_MAGIC {
        return Err(Error::InvalidData(format!(
            "bad IDX label magic {magic:#010x}"
        )));
    }
    let count = read_u32(bytes, 4)? as usize;
    let body = &bytes[8..];
    if body.len() != count {
        return Err(Error::InvalidData(format!(
            "IDX label body has {} bytes, header says {count}",
            body.len()
        )));
    }
    if let Some(&bad) = body.iter().find(|&&l| l as usize >= NUM_CLASSES) {
        return Err(Error::InvalidData(format!("digit label {bad} out of range")));
    }
    Ok(body.to_vec())
}

pub fn one_hot(labels: &[u8]) -> Vec<f64> {
    let mut out = vec![0.0; labels.len() * NUM_CLASSES];
    for (row, &label) in out.chunks_mut(NUM_CLASSES).zip(labels.iter()) {
        row[label as usize] = 1.0;
    }
    out
}

/// Builds a digit dataset from raw IDX bytes. The last `dev_len` examples
/// become the dev split; training batches are reshuffled every epoch.
pub fn from_idx(images: &[u8], labels: &[u8], dev_len: usize, seed: u64) -> Result<TabularDataset> {
    let (count, pixels, pixel_values) = parse_images(images)?;
    let labels = parse_labels(labels)?;
    if labels.len() != count {
        return Err(Error::InvalidData(format!(
            "{count} images but {} labels",
            labels.len()
        )));
    }
    if dev_len >= count {
        return Err(Error::InvalidConfig(format!(
            "dev split of {dev_len} leaves no training images out of {count}"
        )));
    }
    let train_len = count - dev_len;
    let (train_x, dev_x) = pixel_values.split_at(train_len * pixels);
    let targets = one_hot(&labels);
    let (train_y, dev_y) = targets.split_at(train_len * NUM_CLASSES);
    debug!("mnist: {train_len} training images, {dev_len} dev images, {pixels} pixels each");

    TabularDataset::new(
        RcTensor::new(train_x.to_vec(), vec![train_len, pixels]),
        RcTensor::new(train_y.to_vec(), vec![train_len, NUM_CLASSES]),
    )?
    .with_dev(
        RcTensor::new(dev_x.to_vec(), vec![dev_len, pixels]),
        RcTensor::new(dev_y.to_vec(), vec![dev_len, NUM_CLASSES]),
    )
    .map(|dataset| dataset.shuffled(seed))
}

pub fn load(dir: impl AsRef<Path>, dev_len: usize, seed: u64) -> Result<TabularDataset> {
    let dir = dir.as_ref();
    debug!("loading mnist from {}", dir.display());
    let images = fs::read(dir.join(TRAIN_IMAGES))?;
    let labels = fs::read(dir.join(TRAIN_LABELS))?;
    from_idx(&images, &labels, dev_len, seed)
}
