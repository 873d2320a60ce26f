use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::batch::Batch;
use crate::data::idx::{self, IMAGE_HEADER_LEN, LABEL_HEADER_LEN};
use crate::error::{Error, Result};

/// Number of classes in digit datasets; labels must be below this.
pub const DIGIT_CLASSES: usize = 10;

/// Reads an IDX label/image file pair and yields fixed-size minibatches.
///
/// Records are read lazily, one batch at a time. Each call to `batches`
/// reopens both files, so every epoch starts from the beginning. Without
/// shuffling, records come out in file order; with `with_shuffle(seed)`,
/// each epoch visits them in a fresh permutation derived from the seed.
#[derive(Debug, Clone)]
pub struct BatchDataProvider {
    labels_path: PathBuf,
    images_path: PathBuf,
    batch_size: usize,
    record_count: usize,
    rows: usize,
    cols: usize,
    classes: usize,
    shuffle_seed: Option<u64>,
    epoch: u64,
}

impl BatchDataProvider {
    /// Opens both files and validates their headers and lengths.
    ///
    /// Fails with `DatasetFormat` when the headers disagree on the record
    /// count or a file is shorter than its header declares.
    pub fn new(
        labels_path: impl AsRef<Path>,
        images_path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<BatchDataProvider> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be at least 1".to_owned()));
        }
        let labels_path = labels_path.as_ref().to_path_buf();
        let images_path = images_path.as_ref().to_path_buf();

        let (mut labels, label_len) = open(&labels_path)?;
        let label_count = idx::read_label_header(&mut labels, &labels_path)?;
        let (mut images, image_len) = open(&images_path)?;
        let header = idx::read_image_header(&mut images, &images_path)?;

        if label_count != header.count {
            return Err(Error::dataset(
                &labels_path,
                format!(
                    "record count mismatch: {} labels but {} declares {} images",
                    label_count,
                    images_path.display(),
                    header.count
                ),
            ));
        }
        let needed_labels = LABEL_HEADER_LEN + label_count as u64;
        if label_len < needed_labels {
            return Err(Error::dataset(
                &labels_path,
                format!("file holds {label_len} bytes, header declares {needed_labels}"),
            ));
        }
        let needed_images = (header.count as u64)
            .checked_mul(header.pixels_per_image() as u64)
            .and_then(|body| body.checked_add(IMAGE_HEADER_LEN))
            .ok_or_else(|| {
                Error::dataset(
                    &images_path,
                    format!(
                        "{} records of {}x{} pixels overflow the addressable file size",
                        header.count, header.rows, header.cols
                    ),
                )
            })?;
        if image_len < needed_images {
            return Err(Error::dataset(
                &images_path,
                format!("file holds {image_len} bytes, header declares {needed_images}"),
            ));
        }

        Ok(BatchDataProvider {
            labels_path,
            images_path,
            batch_size,
            record_count: label_count,
            rows: header.rows,
            cols: header.cols,
            classes: DIGIT_CLASSES,
            shuffle_seed: None,
            epoch: 0,
        })
    }

    /// Visit records in a seeded random order, re-drawn every epoch.
    pub fn with_shuffle(mut self, seed: u64) -> BatchDataProvider {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Overrides the number of classes labels are checked against.
    pub fn with_classes(mut self, classes: usize) -> BatchDataProvider {
        self.classes = classes;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Length of one flattened pixel vector.
    pub fn feature_len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle_seed.is_some()
    }

    /// Number of batches one epoch yields; the last one may be short.
    pub fn num_batches(&self) -> usize {
        self.record_count.div_ceil(self.batch_size)
    }

    /// Starts a new pass over the dataset.
    pub fn batches(&mut self) -> Result<Batches> {
        let order = self.shuffle_seed.map(|seed| {
            let mut indices: Vec<usize> = (0..self.record_count).collect();
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(self.epoch));
            indices.shuffle(&mut rng);
            indices
        });
        self.epoch += 1;
        self.open_pass(order)
    }

    /// Reads the whole dataset, in file order, as a single batch.
    pub fn get_data(&self) -> Result<Batch> {
        let mut pass = self.open_pass(None)?;
        pass.read_batch(self.record_count)
    }

    fn open_pass(&self, order: Option<Vec<usize>>) -> Result<Batches> {
        let (mut labels, _) = open(&self.labels_path)?;
        let (mut images, _) = open(&self.images_path)?;
        seek(&mut labels, LABEL_HEADER_LEN, &self.labels_path)?;
        seek(&mut images, IMAGE_HEADER_LEN, &self.images_path)?;
        Ok(Batches {
            labels,
            images,
            labels_path: self.labels_path.clone(),
            images_path: self.images_path.clone(),
            order,
            next: 0,
            record_count: self.record_count,
            batch_size: self.batch_size,
            feature_len: self.feature_len(),
            classes: self.classes,
        })
    }
}

/// One pass over a dataset, yielding batches lazily.
#[derive(Debug)]
pub struct Batches {
    labels: BufReader<File>,
    images: BufReader<File>,
    labels_path: PathBuf,
    images_path: PathBuf,
    order: Option<Vec<usize>>,
    next: usize,
    record_count: usize,
    batch_size: usize,
    feature_len: usize,
    classes: usize,
}

impl Batches {
    fn read_batch(&mut self, size: usize) -> Result<Batch> {
        let mut pixels = Vec::with_capacity(size);
        let mut labels = Vec::with_capacity(size);
        let mut label_buf = [0u8; 1];
        let mut pixel_buf = vec![0u8; self.feature_len];

        for _ in 0..size {
            let position = self.next;
            if let Some(order) = &self.order {
                let record = order[position] as u64;
                seek(&mut self.labels, LABEL_HEADER_LEN + record, &self.labels_path)?;
                seek(
                    &mut self.images,
                    IMAGE_HEADER_LEN + record * self.feature_len as u64,
                    &self.images_path,
                )?;
            }
            idx::read_record(&mut self.labels, &mut label_buf, &self.labels_path)?;
            idx::read_record(&mut self.images, &mut pixel_buf, &self.images_path)?;

            let label = label_buf[0] as usize;
            if label >= self.classes {
                return Err(Error::dataset(
                    &self.labels_path,
                    format!("label at record {position} is {label}, expected below {}", self.classes),
                ));
            }
            labels.push(label);
            pixels.push(pixel_buf.iter().map(|&px| px as f64 / 255.0).collect());
            self.next += 1;
        }

        Batch::new(pixels, labels)
    }
}

impl Iterator for Batches {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.record_count {
            return None;
        }
        let size = self.batch_size.min(self.record_count - self.next);
        let batch = self.read_batch(size);
        if batch.is_err() {
            // A failed read ends the pass.
            self.next = self.record_count;
        }
        Some(batch)
    }
}

fn open(path: &Path) -> Result<(BufReader<File>, u64)> {
    let io_err = |source| Error::DatasetIo { path: path.to_path_buf(), source };
    let file = File::open(path).map_err(io_err)?;
    let len = file.metadata().map_err(io_err)?.len();
    Ok((BufReader::new(file), len))
}

fn seek(reader: &mut BufReader<File>, offset: u64, path: &Path) -> Result<()> {
    reader
        .seek(SeekFrom::Start(offset))
        .map(|_| ())
        .map_err(|source| Error::DatasetIo { path: path.to_path_buf(), source })
}
