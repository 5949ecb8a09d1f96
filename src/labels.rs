// src/labels.rs
//! Channel label decoding
//!
//! A region's `<region>_labels` member is a 1-D, row, or column array of
//! references to character arrays. Every position yields exactly one label:
//! the decoded text, or `Channel_{i}` when the reference or the text cannot
//! be recovered.

use crate::container::{resolve, CellArray, CellLayout, Container, ContainerError, Payload};
use crate::report::{Reporter, Scope};

/// Label substituted for position `index` when decoding fails
pub fn placeholder_label(index: usize) -> String {
    format!("Channel_{}", index)
}

/// Decode every label reference in order
///
/// Only an unsupported array shape is an error; per-element failures are
/// replaced by placeholders and reported.
pub fn decode_labels(
    container: &dyn Container,
    labels: &CellArray,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Result<Vec<String>, ContainerError> {
    let layout = CellLayout::of(labels)?;
    reporter.debug(scope, format!("Label array shape {:?}", labels.shape()));

    let decoded = (0..layout.len())
        .map(|i| {
            let text = layout
                .get(labels, i)
                .and_then(|element| resolve(container, element, reporter, scope))
                .and_then(|payload| payload_text(&payload));
            match text {
                Some(label) => label,
                None => {
                    reporter.warn(
                        scope,
                        format!("Label for channel {} could not be decoded, using {}", i, placeholder_label(i)),
                    );
                    placeholder_label(i)
                }
            }
        })
        .collect();

    Ok(decoded)
}

/// Interpret a payload as text, stripping surrounding whitespace and NULs
pub fn payload_text(payload: &Payload) -> Option<String> {
    let text = match payload {
        Payload::Chars(codes) => String::from_utf16(&codes.iter().copied().collect::<Vec<_>>()).ok()?,
        Payload::Bytes(bytes) => String::from_utf8(bytes.iter().copied().collect()).ok()?,
        numeric => numeric
            .to_f64()
            .ok()?
            .iter()
            .map(|&code| {
                if code.fract() == 0.0 && code >= 0.0 && code <= u32::MAX as f64 {
                    char::from_u32(code as u32)
                } else {
                    None
                }
            })
            .collect::<Option<String>>()?,
    };
    Some(text.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string())
}

/// Fit decoded labels to the channel count of the loaded trials
///
/// Longer label sets are truncated. Shorter sets are returned as-is; the
/// region writer skips channels that have no label.
pub fn align_labels(
    mut labels: Vec<String>,
    channel_count: usize,
    reporter: &dyn Reporter,
    scope: &Scope,
) -> Vec<String> {
    if labels.len() != channel_count {
        reporter.warn(
            scope,
            format!(
                "Number of labels ({}) does not match number of channels ({})",
                labels.len(),
                channel_count
            ),
        );
        labels.truncate(channel_count);
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{MemoryContainer, ObjectRef};
    use crate::report::{Level, MemoryReporter};
    use ndarray::{arr1, ArrayD, IxDyn};

    // MATLAB writes a char row as shape (1, n)
    fn chars(text: &str) -> Payload {
        let codes: Vec<u16> = text.encode_utf16().collect();
        Payload::Chars(ArrayD::from_shape_vec(IxDyn(&[1, codes.len()]), codes).unwrap())
    }

    fn label_container(shape: &[usize]) -> (MemoryContainer, CellArray) {
        let mut container = MemoryContainer::new("labels");
        let refs: Vec<ObjectRef> = ["CA1", "CA3", "DG"].iter().map(|l| container.store(chars(l))).collect();
        container.insert_references("g", "HPC_labels", shape, &refs).unwrap();
        let cells = container.cell_array("g", "HPC_labels").unwrap();
        (container, cells)
    }

    #[test]
    fn test_row_and_column_decode_identically() {
        let reporter = MemoryReporter::new();
        let scope = Scope::root();

        let (row_container, row) = label_container(&[1, 3]);
        let (column_container, column) = label_container(&[3, 1]);
        let (flat_container, flat) = label_container(&[3]);

        let expected = vec!["CA1".to_string(), "CA3".to_string(), "DG".to_string()];
        assert_eq!(decode_labels(&row_container, &row, &reporter, &scope).unwrap(), expected);
        assert_eq!(decode_labels(&column_container, &column, &reporter, &scope).unwrap(), expected);
        assert_eq!(decode_labels(&flat_container, &flat, &reporter, &scope).unwrap(), expected);
    }

    #[test]
    fn test_unresolved_reference_gets_placeholder() {
        let mut container = MemoryContainer::new("labels");
        let a = container.store(chars("a"));
        let c = container.store(chars("c"));
        container
            .insert_references("g", "HPC_labels", &[1, 3], &[a, ObjectRef(99), c])
            .unwrap();
        let cells = container.cell_array("g", "HPC_labels").unwrap();
        let reporter = MemoryReporter::new();

        let labels = decode_labels(&container, &cells, &reporter, &Scope::root()).unwrap();
        assert_eq!(labels, vec!["a", "Channel_1", "c"]);
        assert_eq!(reporter.find(Level::Warn, "Channel_1").len(), 1);
    }

    #[test]
    fn test_matrix_shape_is_rejected() {
        let mut container = MemoryContainer::new("labels");
        let refs: Vec<ObjectRef> = (0..4).map(|_| container.store(chars("x"))).collect();
        container.insert_references("g", "HPC_labels", &[2, 2], &refs).unwrap();
        let cells = container.cell_array("g", "HPC_labels").unwrap();

        let result = decode_labels(&container, &cells, &MemoryReporter::new(), &Scope::root());
        assert!(matches!(result, Err(ContainerError::UnsupportedShape { .. })));
    }

    #[test]
    fn test_payload_text_variants() {
        assert_eq!(payload_text(&Payload::Bytes(arr1(b"  LFP1 \0").into_dyn())).unwrap(), "LFP1");
        assert_eq!(payload_text(&Payload::Float64(arr1(&[72.0, 105.0]).into_dyn())).unwrap(), "Hi");
        assert!(payload_text(&Payload::Bytes(arr1(&[0xff, 0xfe]).into_dyn())).is_none());
        assert!(payload_text(&Payload::Float64(arr1(&[1.5]).into_dyn())).is_none());
    }

    #[test]
    fn test_align_truncates_and_warns() {
        let reporter = MemoryReporter::new();
        let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let aligned = align_labels(labels.clone(), 2, &reporter, &Scope::root());
        assert_eq!(aligned, vec!["a", "b"]);

        let short = align_labels(labels, 4, &reporter, &Scope::root());
        assert_eq!(short.len(), 3);
        assert_eq!(reporter.count(Level::Warn), 2);
    }
}
