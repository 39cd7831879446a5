//! MNIST IDX files.
//!
//! Image files start with a 16-byte big-endian header (magic `0x00000803`, count, rows,
//! columns) followed by one byte per pixel. Label files start with an 8-byte header
//! (magic `0x00000801`, count) followed by one byte per label.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use tracing::debug;

use ann::linear_algebra::{Matrix, Value};
use ann::{one_hot_index, TrainingExample};

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

pub const CLASSES: usize = 10;

const RAMP: &[u8] = b" .*$#";

pub struct Images {
    pub rows: usize,
    pub columns: usize,
    /// One `rows * columns × 1` vector per image, normalized to [0, 1].
    pub pixels: Vec<Matrix>,
}

pub fn read_examples(
    images: &Path,
    labels: &Path,
    count: Option<usize>,
) -> Result<Vec<TrainingExample>, DatasetError> {
    let images = read_images(&mut BufReader::new(File::open(images)?), count)?;
    let labels = read_labels(&mut BufReader::new(File::open(labels)?), count)?;

    let examples = examples(images, labels)?;

    debug!(examples = examples.len(), "Read dataset.");
    Ok(examples)
}

/// Pairs images with one-hot encoded labels.
pub fn examples(images: Images, labels: Vec<u8>) -> Result<Vec<TrainingExample>, DatasetError> {
    if images.pixels.len() != labels.len() {
        return Err(DatasetError::Count {
            expected: images.pixels.len(),
            found: labels.len(),
        });
    }

    images
        .pixels
        .into_iter()
        .zip(labels)
        .map(|(input, label)| {
            if label as usize >= CLASSES {
                return Err(DatasetError::Label(label));
            }

            let mut target = Matrix::zeros(CLASSES, 1);
            target[(label as usize, 0)] = 1.0;
            Ok(TrainingExample::new(input, target))
        })
        .collect()
}

/// Reads at most `count` images, or all of them.
pub fn read_images<R: Read>(reader: &mut R, count: Option<usize>) -> Result<Images, DatasetError> {
    check_magic(reader, IMAGES_MAGIC)?;

    let available = read_u32(reader)? as usize;
    let count = limit(count, available)?;
    let rows = read_u32(reader)? as usize;
    let columns = read_u32(reader)? as usize;

    let mut buffer = vec![0u8; rows * columns];
    let pixels = (0..count)
        .map(|_| -> Result<Matrix, DatasetError> {
            reader.read_exact(&mut buffer)?;
            let values: Vec<Value> = buffer.iter().map(|&p| p as Value / 255.0).collect();
            Ok(Matrix::column(&values))
        })
        .collect::<Result<_, _>>()?;

    Ok(Images {
        rows,
        columns,
        pixels,
    })
}

/// Reads at most `count` labels, or all of them.
pub fn read_labels<R: Read>(reader: &mut R, count: Option<usize>) -> Result<Vec<u8>, DatasetError> {
    check_magic(reader, LABELS_MAGIC)?;

    let available = read_u32(reader)? as usize;
    let count = limit(count, available)?;

    let mut labels = vec![0; count];
    reader.read_exact(&mut labels)?;

    if let Some(&label) = labels.iter().find(|&&label| label as usize >= CLASSES) {
        return Err(DatasetError::Label(label));
    }

    Ok(labels)
}

/// Draws an image as rows of ASCII characters, darkest pixels as `#`.
pub fn render(image: &Matrix, columns: usize) -> String {
    let mut output = String::new();

    for (i, &value) in image.values().enumerate() {
        let index = ((value * 255.0) as usize / 51).min(RAMP.len() - 1);
        output.push(RAMP[index] as char);
        output.push(' ');

        if (i + 1) % columns.max(1) == 0 {
            output.push('\n');
        }
    }

    output
}

pub fn label(example: &TrainingExample) -> usize {
    one_hot_index(&example.target)
}

fn limit(count: Option<usize>, available: usize) -> Result<usize, DatasetError> {
    match count {
        Some(count) if count > available => Err(DatasetError::Count {
            expected: count,
            found: available,
        }),
        Some(count) => Ok(count),
        None => Ok(available),
    }
}

fn check_magic<R: Read>(reader: &mut R, expected: u32) -> Result<(), DatasetError> {
    let found = read_u32(reader)?;
    if found != expected {
        return Err(DatasetError::Magic { expected, found });
    }
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
}

#[derive(Debug)]
pub enum DatasetError {
    Io(io::Error),
    Magic { expected: u32, found: u32 },
    Count { expected: usize, found: usize },
    Label(u8),
}

impl From<io::Error> for DatasetError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "{error}"),
            Self::Magic { expected, found } => {
                write!(f, "bad magic number {found:#010x}, expected {expected:#010x}")
            }
            Self::Count { expected, found } => {
                write!(f, "expected {expected} samples, found {found}")
            }
            Self::Label(label) => write!(f, "label {label} is not a digit"),
        }
    }
}

impl Error for DatasetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_file(count: u32, rows: u32, columns: u32, pixels: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::new();
        for field in [IMAGES_MAGIC, count, rows, columns] {
            buffer.extend_from_slice(&field.to_be_bytes());
        }
        buffer.extend_from_slice(pixels);
        buffer
    }

    fn label_file(labels: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        buffer.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        buffer.extend_from_slice(labels);
        buffer
    }

    #[test]
    fn decode() {
        let images = image_file(2, 2, 2, &[0, 255, 51, 102, 255, 255, 0, 0]);
        let labels = label_file(&[3, 9]);

        let images = read_images(&mut images.as_slice(), None).unwrap();
        assert_eq!((images.rows, images.columns), (2, 2));
        assert_eq!(images.pixels[0], Matrix::from([[0.0], [1.0], [0.2], [0.4]]));

        let labels = read_labels(&mut labels.as_slice(), None).unwrap();
        let examples = examples(images, labels).unwrap();

        assert_eq!(examples.len(), 2);
        assert_eq!(label(&examples[0]), 3);
        assert_eq!(label(&examples[1]), 9);
        assert_eq!(examples[1].target.shape(), (10, 1));
        assert_eq!(examples[1].target.values().sum::<Value>(), 1.0);
    }

    #[test]
    fn count_limits_samples() {
        let images = image_file(3, 1, 2, &[1, 2, 3, 4, 5, 6]);
        let images = read_images(&mut images.as_slice(), Some(2)).unwrap();
        assert_eq!(images.pixels.len(), 2);

        let labels = label_file(&[1, 2, 3]);
        assert!(matches!(
            read_labels(&mut labels.as_slice(), Some(4)),
            Err(DatasetError::Count { expected: 4, found: 3 })
        ));
    }

    #[test]
    fn wrong_magic() {
        let labels = label_file(&[1]);
        assert!(matches!(
            read_images(&mut labels.as_slice(), None),
            Err(DatasetError::Magic {
                expected: IMAGES_MAGIC,
                found: LABELS_MAGIC,
            })
        ));
    }

    #[test]
    fn truncated() {
        let images = image_file(2, 2, 2, &[0, 0, 0, 0, 0]);
        assert!(matches!(
            read_images(&mut images.as_slice(), None),
            Err(DatasetError::Io(_))
        ));
    }

    #[test]
    fn bad_label() {
        let labels = label_file(&[1, 10]);
        assert!(matches!(
            read_labels(&mut labels.as_slice(), None),
            Err(DatasetError::Label(10))
        ));
    }

    #[test]
    fn mismatched_counts() {
        let images = image_file(2, 1, 1, &[0, 0]);
        let images = read_images(&mut images.as_slice(), None).unwrap();
        assert!(matches!(
            examples(images, vec![1]),
            Err(DatasetError::Count { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn ascii_art() {
        let image: Matrix = [[0.0], [0.2], [0.4], [0.6], [0.8], [1.0]].into();
        assert_eq!(render(&image, 3), "  . * \n$ # # \n");
    }
}
