//! IDX binary layout used by MNIST and its derivatives.
//!
//! ```text
//! IDX1 labels:  00 00 08 01 | N (u32 BE) | N × u8 class index
//! IDX3 images:  00 00 08 03 | N (u32 BE) | rows (u32 BE) | cols (u32 BE) | N × rows × cols × u8
//! ```

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

pub const LABEL_MAGIC: u32 = 0x0000_0801;
pub const IMAGE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_HEADER_LEN: u64 = 8;
pub const IMAGE_HEADER_LEN: u64 = 16;

/// Header of an IDX3 image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub count: usize,
    pub rows: usize,
    pub cols: usize,
}

impl ImageHeader {
    /// Headers returned by `read_image_header` are checked not to overflow here.
    pub fn pixels_per_image(&self) -> usize {
        self.rows * self.cols
    }
}

/// Reads and validates an IDX1 header, returning the label count.
pub fn read_label_header(reader: &mut impl Read, path: &Path) -> Result<usize> {
    let magic = read_u32(reader, path)?;
    if magic != LABEL_MAGIC {
        return Err(Error::dataset(
            path,
            format!("label file magic number mismatch (got {magic:#010x}, expected {LABEL_MAGIC:#010x})"),
        ));
    }
    Ok(read_u32(reader, path)? as usize)
}

/// Reads and validates an IDX3 header.
pub fn read_image_header(reader: &mut impl Read, path: &Path) -> Result<ImageHeader> {
    let magic = read_u32(reader, path)?;
    if magic != IMAGE_MAGIC {
        return Err(Error::dataset(
            path,
            format!("image file magic number mismatch (got {magic:#010x}, expected {IMAGE_MAGIC:#010x})"),
        ));
    }
    let count = read_u32(reader, path)? as usize;
    let rows = read_u32(reader, path)? as usize;
    let cols = read_u32(reader, path)? as usize;
    if rows == 0 || cols == 0 {
        return Err(Error::dataset(path, format!("image dimensions must be non-zero, got {rows}x{cols}")));
    }
    if rows.checked_mul(cols).is_none() {
        return Err(Error::dataset(path, format!("image dimensions {rows}x{cols} overflow the record width")));
    }
    Ok(ImageHeader { count, rows, cols })
}

/// Encodes class indices as an IDX1 label file.
pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LABEL_HEADER_LEN as usize + labels.len());
    out.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}

/// Encodes `rows × cols` grayscale images as an IDX3 image file.
///
/// Returns `ShapeMismatch` if an image does not hold `rows * cols` bytes.
pub fn encode_images(images: &[Vec<u8>], rows: usize, cols: usize) -> Result<Vec<u8>> {
    let width = rows * cols;
    let mut out = Vec::with_capacity(IMAGE_HEADER_LEN as usize + images.len() * width);
    out.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
    out.extend_from_slice(&(images.len() as u32).to_be_bytes());
    out.extend_from_slice(&(rows as u32).to_be_bytes());
    out.extend_from_slice(&(cols as u32).to_be_bytes());
    for image in images {
        if image.len() != width {
            return Err(Error::shape("IDX image", (rows, cols), (1, image.len())));
        }
        out.extend_from_slice(image);
    }
    Ok(out)
}

/// Reads exactly `buf.len()` bytes, reporting a short read as a format error.
pub(crate) fn read_record(reader: &mut impl Read, buf: &mut [u8], path: &Path) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::dataset(
            path,
            format!("truncated record: expected {} more bytes", buf.len()),
        ),
        _ => Error::DatasetIo { path: path.to_path_buf(), source: e },
    })
}

fn read_u32(reader: &mut impl Read, path: &Path) -> Result<u32> {
    let mut buf4 = [0u8; 4];
    read_record(reader, &mut buf4, path)?;
    Ok(u32::from_be_bytes(buf4))
}
