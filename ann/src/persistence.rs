//! Binary model files.
//!
//! A model file stores a network's parameters behind a small header so that a file can
//! only be loaded into a network of the shape it was saved from. All integers and
//! values are little-endian.
//!
//! ```text
//! magic     4 bytes   "MLPW"
//! version   u32
//! layers    u32
//! shape     u32 * layers
//! elements  u64       number of f32 values that follow
//! weights   f32 * ... every weight matrix, layer order, row-major
//! biases    f32 * ... every bias vector, layer order
//! ```
//!
//! The raw variant is just the trailing weight and bias values, with nothing to check
//! them against.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::linear_algebra::{Matrix, Value};
use crate::network::Network;

const MAGIC: [u8; 4] = *b"MLPW";
const VERSION: u32 = 1;

impl Network {
    /// The number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.weights
            .iter()
            .chain(&self.biases)
            .map(|m| m.rows() * m.columns())
            .sum()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ModelError> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;

        writer.write_all(&(self.shape.len() as u32).to_le_bytes())?;
        for &size in &self.shape {
            writer.write_all(&(size as u32).to_le_bytes())?;
        }

        writer.write_all(&(self.parameter_count() as u64).to_le_bytes())?;

        self.write_raw_to(writer)
    }

    /// Replaces this network's parameters with those read from `reader`. The stored
    /// shape must match this network's shape exactly.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<(), ModelError> {
        let mut magic = [0; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(ModelError::Magic(magic));
        }

        let version = read_u32(reader)?;
        if version != VERSION {
            return Err(ModelError::Version(version));
        }

        let layers = read_u32(reader)?;
        let shape = (0..layers)
            .map(|_| read_u32(reader).map(|size| size as usize))
            .collect::<Result<Vec<_>, _>>()?;
        if shape != self.shape {
            return Err(ModelError::Shape {
                expected: self.shape.clone(),
                found: shape,
            });
        }

        let elements = read_u64(reader)?;
        let expected = self.parameter_count() as u64;
        if elements != expected {
            return Err(ModelError::ElementCount {
                expected,
                found: elements,
            });
        }

        self.read_raw_from(reader)
    }

    /// Writes only the parameter values: weights, then biases.
    pub fn write_raw_to<W: Write>(&self, writer: &mut W) -> Result<(), ModelError> {
        for value in self.weights.iter().chain(&self.biases).flat_map(Matrix::values) {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads parameter values written by [`Network::write_raw_to`]. Nothing ties the
    /// values to a shape; a short read fails and leaves the network untouched.
    pub fn read_raw_from<R: Read>(&mut self, reader: &mut R) -> Result<(), ModelError> {
        let mut weights = self.weights.clone();
        let mut biases = self.biases.clone();

        for value in weights
            .iter_mut()
            .chain(biases.iter_mut())
            .flat_map(|m| m.values_mut())
        {
            let mut bytes = [0; 4];
            reader.read_exact(&mut bytes)?;
            *value = Value::from_le_bytes(bytes);
        }

        self.weights = weights;
        self.biases = biases;

        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();

        let mut file = BufWriter::new(File::create(path)?);
        self.write_to(&mut file)?;
        file.flush()?;

        debug!(?path, "Saved model.");
        Ok(())
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();

        let mut file = BufReader::new(File::open(path)?);
        self.read_from(&mut file)?;

        debug!(?path, "Loaded model.");
        Ok(())
    }

    pub fn save_raw(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();

        let mut file = BufWriter::new(File::create(path)?);
        self.write_raw_to(&mut file)?;
        file.flush()?;

        debug!(?path, "Saved raw model.");
        Ok(())
    }

    pub fn load_raw(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();

        let mut file = BufReader::new(File::open(path)?);
        self.read_raw_from(&mut file)?;

        debug!(?path, "Loaded raw model.");
        Ok(())
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut bytes = [0; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

#[derive(Debug)]
pub enum ModelError {
    Io(io::Error),
    Magic([u8; 4]),
    Version(u32),
    Shape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    ElementCount {
        expected: u64,
        found: u64,
    },
}

impl From<io::Error> for ModelError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "{error}"),
            Self::Magic(magic) => write!(f, "not a model file (magic {magic:?})"),
            Self::Version(version) => write!(f, "unsupported model version {version}"),
            Self::Shape { expected, found } => {
                write!(f, "model shape {found:?} does not match network shape {expected:?}")
            }
            Self::ElementCount { expected, found } => {
                write!(f, "model holds {found} values, network needs {expected}")
            }
        }
    }
}

impl Error for ModelError {
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

    use std::env;
    use std::fs;
    use std::io::ErrorKind;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::network::NetworkConfig;

    fn network(shape: &[usize], seed: u64) -> Network {
        Network::new(&NetworkConfig::new(shape), &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn bits(network: &Network) -> Vec<u32> {
        network
            .weights()
            .iter()
            .chain(network.biases())
            .flat_map(Matrix::values)
            .map(|x| x.to_bits())
            .collect()
    }

    #[test]
    fn round_trip() {
        let saved = network(&[4, 3, 2], 1);
        let mut loaded = network(&[4, 3, 2], 2);
        assert_ne!(bits(&saved), bits(&loaded));

        let mut buffer = Vec::new();
        saved.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 4 + 4 + 4 + 3 * 4 + 8 + saved.parameter_count() * 4);

        loaded.read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(bits(&saved), bits(&loaded));
        assert_eq!(saved, loaded);
    }

    #[test]
    fn round_trip_file() {
        let path = env::temp_dir().join(format!("ann-round-trip-{}.net", std::process::id()));

        let saved = network(&[3, 5, 2], 3);
        saved.save(&path).unwrap();

        let mut loaded = network(&[3, 5, 2], 4);
        loaded.load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(bits(&saved), bits(&loaded));
    }

    #[test]
    fn raw_round_trip() {
        let saved = network(&[2, 3, 3, 1], 5);

        let mut buffer = Vec::new();
        saved.write_raw_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), (6 + 9 + 3 + 3 + 3 + 1) * 4);

        let mut loaded = network(&[2, 3, 3, 1], 6);
        loaded.read_raw_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(bits(&saved), bits(&loaded));
    }

    #[test]
    fn raw_layout() {
        let mut network = network(&[2, 1], 7);
        network.weights[0] = [[1.0, 2.0]].into();
        network.biases[0] = [[3.0]].into();

        let mut buffer = Vec::new();
        network.write_raw_to(&mut buffer).unwrap();

        let values: Vec<Value> = buffer
            .chunks_exact(4)
            .map(|chunk| Value::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn shape_mismatch() {
        let saved = network(&[4, 3, 2], 8);
        let mut buffer = Vec::new();
        saved.write_to(&mut buffer).unwrap();

        let mut other = network(&[4, 2, 2], 9);
        let before = other.clone();
        match other.read_from(&mut buffer.as_slice()) {
            Err(ModelError::Shape { expected, found }) => {
                assert_eq!(expected, vec![4, 2, 2]);
                assert_eq!(found, vec![4, 3, 2]);
            }
            result => panic!("unexpected result: {result:?}"),
        }
        assert_eq!(other, before);
    }

    #[test]
    fn bad_header() {
        let saved = network(&[2, 2], 10);
        let mut buffer = Vec::new();
        saved.write_to(&mut buffer).unwrap();

        let mut loaded = saved.clone();

        let mut bad_magic = buffer.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            loaded.read_from(&mut bad_magic.as_slice()),
            Err(ModelError::Magic(_))
        ));

        let mut bad_version = buffer.clone();
        bad_version[4] = 9;
        assert!(matches!(
            loaded.read_from(&mut bad_version.as_slice()),
            Err(ModelError::Version(9))
        ));

        let mut bad_count = buffer;
        bad_count[20] = 99;
        assert!(matches!(
            loaded.read_from(&mut bad_count.as_slice()),
            Err(ModelError::ElementCount { expected: 6, found: 99 })
        ));
    }

    #[test]
    fn truncated() {
        let saved = network(&[3, 2], 11);
        let mut buffer = Vec::new();
        saved.write_to(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 2);

        let mut loaded = network(&[3, 2], 12);
        let before = loaded.clone();
        match loaded.read_from(&mut buffer.as_slice()) {
            Err(ModelError::Io(error)) => assert_eq!(error.kind(), ErrorKind::UnexpectedEof),
            result => panic!("unexpected result: {result:?}"),
        }
        assert_eq!(loaded, before);
    }

    #[test]
    fn missing_file() {
        let mut loaded = network(&[2, 2], 13);
        let path = env::temp_dir().join("ann-does-not-exist.net");
        assert!(matches!(loaded.load(path), Err(ModelError::Io(_))));
    }
}
