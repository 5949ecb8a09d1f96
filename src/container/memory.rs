// src/container/memory.rs
//! In-memory container backend

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use ndarray::{ArrayD, IxDyn};

use crate::container::{CellArray, Container, ContainerError, ContainerOpener, Element, ObjectRef, Payload};

/// Container held entirely in memory
///
/// Objects are addressed by their insertion order, so any `ObjectRef` past
/// the last stored object is dangling.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    name: String,
    groups: BTreeMap<String, BTreeMap<String, CellArray>>,
    objects: Vec<Payload>,
}

impl MemoryContainer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Store an object and return a reference to it
    pub fn store(&mut self, payload: Payload) -> ObjectRef {
        self.objects.push(payload);
        ObjectRef(self.objects.len() as u64 - 1)
    }

    pub fn add_group(&mut self, group: &str) -> &mut Self {
        self.groups.entry(group.to_string()).or_default();
        self
    }

    /// Place a cell array at `group/name`, creating the group if needed
    pub fn insert_cells(&mut self, group: &str, name: &str, cells: CellArray) -> &mut Self {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(name.to_string(), cells);
        self
    }

    /// Place a reference array of the given shape, filled in row-major order
    pub fn insert_references(
        &mut self,
        group: &str,
        name: &str,
        shape: &[usize],
        references: &[ObjectRef],
    ) -> Result<&mut Self, ContainerError> {
        let elements = references.iter().copied().map(Element::Reference).collect();
        let cells = ArrayD::from_shape_vec(IxDyn(shape), elements)
            .map_err(|_| ContainerError::UnsupportedShape { shape: shape.to_vec() })?;
        Ok(self.insert_cells(group, name, cells))
    }

    /// Store each payload and reference them from a `(1, n)` row array
    pub fn insert_row(&mut self, group: &str, name: &str, payloads: Vec<Payload>) -> Vec<ObjectRef> {
        let references: Vec<ObjectRef> = payloads.into_iter().map(|p| self.store(p)).collect();
        let elements = references.iter().copied().map(Element::Reference).collect();
        // A row of n elements always matches shape (1, n)
        if let Ok(cells) = ArrayD::from_shape_vec(IxDyn(&[1, references.len()]), elements) {
            self.insert_cells(group, name, cells);
        }
        references
    }
}

impl Container for MemoryContainer {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    fn has_member(&self, group: &str, name: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|members| members.contains_key(name))
    }

    fn cell_array(&self, group: &str, name: &str) -> Result<CellArray, ContainerError> {
        let members = self
            .groups
            .get(group)
            .ok_or_else(|| ContainerError::MissingGroup(group.to_string()))?;
        members
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::MissingMember {
                group: group.to_string(),
                name: name.to_string(),
            })
    }

    fn dereference(&self, reference: ObjectRef) -> Result<Payload, ContainerError> {
        usize::try_from(reference.0)
            .ok()
            .and_then(|index| self.objects.get(index))
            .cloned()
            .ok_or(ContainerError::DanglingReference(reference))
    }
}

/// Opener serving registered in-memory containers by file name
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    containers: HashMap<String, MemoryContainer>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: &str, container: MemoryContainer) -> &mut Self {
        self.containers.insert(file_name.to_string(), container);
        self
    }

    pub fn with(mut self, file_name: &str, container: MemoryContainer) -> Self {
        self.insert(file_name, container);
        self
    }
}

impl ContainerOpener for MemoryOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>, ContainerError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.containers.get(&file_name) {
            Some(container) => Ok(Box::new(container.clone())),
            None => Err(ContainerError::Open {
                path: path.to_path_buf(),
                reason: "no in-memory container registered".to_string(),
            }),
        }
    }
}
