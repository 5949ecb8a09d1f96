// src/container/mat73.rs
//! MATLAB v7.3 containers read through libhdf5
//!
//! MATLAB writes cell arrays as datasets of old-style object references and
//! `char` arrays as `uint16` datasets. References cannot be turned into plain
//! integers, so each container keeps a table of the references it has handed
//! out and [`ObjectRef`] values index into that table.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use hdf5::types::{IntSize, TypeDescriptor};
use hdf5::{Dataset, File, ObjectReference1, ReferencedObject};
use ndarray::{ArrayD, IxDyn};

use crate::container::{CellArray, Container, ContainerError, ContainerOpener, Element, ObjectRef, Payload};

fn backend(err: hdf5::Error) -> ContainerError {
    ContainerError::Backend(err.to_string())
}

fn shaped<T>(shape: Vec<usize>, data: Vec<T>) -> Result<ArrayD<T>, ContainerError> {
    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|_| ContainerError::UnsupportedShape { shape })
}

/// HDF5 file opened read-only
pub struct Hdf5Container {
    path: PathBuf,
    file: File,
    references: RefCell<Vec<ObjectReference1>>,
}

impl Hdf5Container {
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let file = File::open(path).map_err(|err| ContainerError::Open {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            references: RefCell::new(Vec::new()),
        })
    }

    fn dataset(&self, group: &str, name: &str) -> Result<Dataset, ContainerError> {
        let group_handle = self
            .file
            .group(group)
            .map_err(|_| ContainerError::MissingGroup(group.to_string()))?;
        group_handle.dataset(name).map_err(|_| ContainerError::MissingMember {
            group: group.to_string(),
            name: name.to_string(),
        })
    }

    fn register(&self, reference: ObjectReference1) -> ObjectRef {
        let mut references = self.references.borrow_mut();
        references.push(reference);
        ObjectRef(references.len() as u64 - 1)
    }

    fn read_payload(dataset: &Dataset) -> Result<Payload, ContainerError> {
        let shape = dataset.shape();
        let descriptor = dataset
            .dtype()
            .and_then(|dtype| dtype.to_descriptor())
            .map_err(backend)?;

        match descriptor {
            TypeDescriptor::Unsigned(IntSize::U2) => {
                let data = dataset.read_raw::<u16>().map_err(backend)?;
                Ok(Payload::Chars(shaped(shape, data)?))
            }
            TypeDescriptor::Unsigned(IntSize::U1) => {
                let data = dataset.read_raw::<u8>().map_err(backend)?;
                Ok(Payload::Bytes(shaped(shape, data)?))
            }
            TypeDescriptor::Integer(IntSize::U2) => {
                let data = dataset.read_raw::<i16>().map_err(backend)?;
                Ok(Payload::Int16(shaped(shape, data)?))
            }
            TypeDescriptor::Float(hdf5::types::FloatSize::U4) => {
                let data = dataset.read_raw::<f32>().map_err(backend)?;
                Ok(Payload::Float32(shaped(shape, data)?))
            }
            TypeDescriptor::Float(_) | TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
                let data = dataset.read_raw::<f64>().map_err(backend)?;
                Ok(Payload::Float64(shaped(shape, data)?))
            }
            other => Err(ContainerError::Backend(format!("unsupported element type {:?}", other))),
        }
    }
}

impl Container for Hdf5Container {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn has_group(&self, group: &str) -> bool {
        self.file.group(group).is_ok()
    }

    fn has_member(&self, group: &str, name: &str) -> bool {
        self.file
            .group(group)
            .and_then(|g| g.member_names())
            .is_ok_and(|names| names.iter().any(|n| n == name))
    }

    fn cell_array(&self, group: &str, name: &str) -> Result<CellArray, ContainerError> {
        let dataset = self.dataset(group, name)?;
        let shape = dataset.shape();
        let is_reference = matches!(
            dataset.dtype().and_then(|dtype| dtype.to_descriptor()),
            Ok(TypeDescriptor::Reference(_))
        );

        if is_reference {
            let raw = dataset.read_raw::<ObjectReference1>().map_err(backend)?;
            let elements = raw
                .into_iter()
                .map(|reference| Element::Reference(self.register(reference)))
                .collect();
            shaped(shape, elements)
        } else {
            // A plain dataset stands for a single inline value
            let payload = Self::read_payload(&dataset)?;
            shaped(vec![1], vec![Element::Value(payload)])
        }
    }

    fn dereference(&self, reference: ObjectRef) -> Result<Payload, ContainerError> {
        let handle = usize::try_from(reference.0)
            .ok()
            .and_then(|index| self.references.borrow().get(index).cloned())
            .ok_or_else(|| ContainerError::MalformedReference(format!("unknown handle {}", reference)))?;

        match self.file.dereference(&handle) {
            Ok(ReferencedObject::Dataset(dataset)) => Self::read_payload(&dataset),
            Ok(_) => Err(ContainerError::MalformedReference(format!(
                "{} does not point to a dataset",
                reference
            ))),
            Err(_) => Err(ContainerError::DanglingReference(reference)),
        }
    }
}

/// Opens session files with libhdf5
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Opener;

impl ContainerOpener for Hdf5Opener {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>, ContainerError> {
        Ok(Box::new(Hdf5Container::open(path)?))
    }
}
