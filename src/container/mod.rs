// src/container/mod.rs
//! Hierarchical container access and reference resolution
//!
//! Session files store per-trial data as cell arrays whose elements are
//! object references into the same file. The [`Container`] trait hides the
//! file-format library behind group/member lookup and reference
//! dereferencing, and [`resolve`] turns any cell element into a payload.
//!
//! Backends:
//! - [`memory::MemoryContainer`]: in-memory, used by tests and fixtures
//! - [`mat73::Hdf5Container`] (feature `hdf5`): MATLAB v7.3 files through libhdf5

pub mod layout;
pub mod memory;

#[cfg(feature = "hdf5")]
pub mod mat73;

pub use layout::CellLayout;
pub use memory::{MemoryContainer, MemoryOpener};

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::ArrayD;
use thiserror::Error;

use crate::report::{Reporter, Scope};

/// Opaque handle to an object stored elsewhere in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub u64);

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Concrete array data held by a container object
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Float64(ArrayD<f64>),
    Float32(ArrayD<f32>),
    Int16(ArrayD<i16>),
    /// 16-bit character codes, as MATLAB writes `char` arrays
    Chars(ArrayD<u16>),
    /// Raw bytes, interpreted as UTF-8 when decoded as text
    Bytes(ArrayD<u8>),
}

impl Payload {
    pub fn shape(&self) -> &[usize] {
        match self {
            Payload::Float64(a) => a.shape(),
            Payload::Float32(a) => a.shape(),
            Payload::Int16(a) => a.shape(),
            Payload::Chars(a) => a.shape(),
            Payload::Bytes(a) => a.shape(),
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Float64(_) => "float64",
            Payload::Float32(_) => "float32",
            Payload::Int16(_) => "int16",
            Payload::Chars(_) => "chars",
            Payload::Bytes(_) => "bytes",
        }
    }

    /// Numeric payloads cast to `f64`; text payloads are rejected
    pub fn to_f64(&self) -> Result<ArrayD<f64>, ContainerError> {
        match self {
            Payload::Float64(a) => Ok(a.clone()),
            Payload::Float32(a) => Ok(a.mapv(f64::from)),
            Payload::Int16(a) => Ok(a.mapv(f64::from)),
            Payload::Chars(_) | Payload::Bytes(_) => Err(ContainerError::NotNumeric { kind: self.kind() }),
        }
    }
}

/// One cell of a reference array
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Reference(ObjectRef),
    Value(Payload),
}

/// A cell array as stored in the container, in its on-disk shape
pub type CellArray = ArrayD<Element>;

/// Container access errors
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Failed to open container {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("Group '{0}' not found")]
    MissingGroup(String),

    #[error("Member '{name}' not found in group '{group}'")]
    MissingMember { group: String, name: String },

    #[error("Reference {0} does not point to a readable object")]
    DanglingReference(ObjectRef),

    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Unsupported reference array shape {shape:?}")]
    UnsupportedShape { shape: Vec<usize> },

    #[error("Payload of kind {kind} is not numeric")]
    NotNumeric { kind: &'static str },

    #[error("Container backend error: {0}")]
    Backend(String),

    #[error("Container backend unavailable: {0}")]
    Unavailable(String),
}

/// Read access to a hierarchical container
pub trait Container {
    /// Human-readable identity, used in log messages
    fn describe(&self) -> String;

    fn has_group(&self, group: &str) -> bool;

    fn has_member(&self, group: &str, name: &str) -> bool;

    /// Read a cell array of references (or values) stored at `group/name`
    fn cell_array(&self, group: &str, name: &str) -> Result<CellArray, ContainerError>;

    /// Follow a reference to the payload it names
    fn dereference(&self, reference: ObjectRef) -> Result<Payload, ContainerError>;
}

/// Opens containers by path
pub trait ContainerOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>, ContainerError>;
}

/// Resolve one cell element to its payload
///
/// References are dereferenced, concrete values pass through unchanged. A
/// failed lookup is reported at warning level and yields `None`.
pub fn resolve(
    container: &dyn Container,
    element: &Element,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Option<Payload> {
    match element {
        Element::Value(payload) => Some(payload.clone()),
        Element::Reference(reference) => match container.dereference(*reference) {
            Ok(payload) => Some(payload),
            Err(err) => {
                reporter.warn(
                    scope,
                    format!("Could not resolve reference {} in {}: {}", reference, container.describe(), err),
                );
                None
            }
        },
    }
}

/// Opener used when no container backend is compiled in
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableOpener;

impl ContainerOpener for UnavailableOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>, ContainerError> {
        Err(ContainerError::Unavailable(format!(
            "cannot read {}: built without the `hdf5` feature",
            path.display()
        )))
    }
}

/// Opener for real session files
#[cfg(feature = "hdf5")]
pub fn default_opener() -> Box<dyn ContainerOpener> {
    Box::new(mat73::Hdf5Opener)
}

/// Opener for real session files
#[cfg(not(feature = "hdf5"))]
pub fn default_opener() -> Box<dyn ContainerOpener> {
    Box::new(UnavailableOpener)
}
