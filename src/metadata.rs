// src/metadata.rs
//! Session metadata
//!
//! The list of sessions and regions to process comes from an external
//! metadata engine with an explicit start/load/stop lifecycle. The bundled
//! [`FileEngineLauncher`] reads a JSON or TOML export of the metadata struct.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::report::{Reporter, Scope};

/// Key holding the session identifiers
pub const SESSION_IDS_KEY: &str = "includedPatientIDs";
/// Key holding the (possibly nested) region names
pub const REGIONS_KEY: &str = "finalSelectedRegions";
/// Variable used as the mapping root when present
pub const ROOT_VARIABLE: &str = "metaDataExt";

/// Metadata engine errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata engine failed to start: {0}")]
    Start(String),

    #[error("Failed to load metadata from {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Unsupported metadata format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Metadata is not a mapping")]
    NotAMapping,

    #[error("Required metadata key '{0}' not found")]
    MissingKey(String),

    #[error("Metadata engine failed to stop: {0}")]
    Stop(String),
}

/// Starts a metadata engine
pub trait EngineLauncher {
    type Engine: MetadataEngine;

    fn start(&self) -> Result<Self::Engine, MetadataError>;
}

/// A running metadata engine; consumed by [`MetadataEngine::stop`]
pub trait MetadataEngine {
    fn load(&mut self, path: &Path) -> Result<Value, MetadataError>;

    fn stop(self) -> Result<(), MetadataError>;
}

/// What to process, in metadata order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionPlan {
    pub session_ids: Vec<String>,
    pub regions: Vec<String>,
}

impl SessionPlan {
    pub fn new(session_ids: Vec<String>, regions: Vec<String>) -> Self {
        Self { session_ids, regions }
    }

    /// Normalize a metadata mapping into a plan
    pub fn from_metadata(metadata: &Value) -> Result<Self, MetadataError> {
        let root = match metadata.get(ROOT_VARIABLE) {
            Some(inner) => inner,
            None => metadata,
        };
        if !root.is_object() {
            return Err(MetadataError::NotAMapping);
        }

        let session_ids = root
            .get(SESSION_IDS_KEY)
            .ok_or_else(|| MetadataError::MissingKey(SESSION_IDS_KEY.to_string()))?;
        let regions = root
            .get(REGIONS_KEY)
            .ok_or_else(|| MetadataError::MissingKey(REGIONS_KEY.to_string()))?;

        Ok(Self {
            session_ids: flatten_strings(session_ids),
            regions: flatten_strings(regions),
        })
    }
}

/// Flatten nested sequences in order; a scalar becomes a one-element list
pub fn flatten_strings(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_strings(value, &mut out);
    out
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Null => {}
        other => out.push(stringify(other)),
    }
}

/// Integral numbers render without a fractional part
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Start, load once, stop
///
/// A failed stop is reported as a warning and does not discard the plan.
pub fn load_session_plan<L: EngineLauncher>(
    launcher: &L,
    path: &Path,
    reporter: &dyn Reporter,
) -> Result<SessionPlan, MetadataError> {
    let scope = Scope::root();

    reporter.debug(&scope, "Starting metadata engine".to_string());
    let mut engine = launcher.start()?;

    let loaded = engine.load(path);
    if let Err(err) = engine.stop() {
        reporter.warn(&scope, format!("Metadata engine did not stop cleanly: {}", err));
    }
    let metadata = loaded?;
    reporter.info(&scope, format!("Loaded metadata from {}", path.display()));

    let plan = SessionPlan::from_metadata(&metadata)?;
    reporter.info(
        &scope,
        format!(
            "{} sessions, {} regions: {:?}",
            plan.session_ids.len(),
            plan.regions.len(),
            plan.regions
        ),
    );
    Ok(plan)
}

/// Launcher for metadata exported to `.json` or `.toml`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileEngineLauncher;

impl EngineLauncher for FileEngineLauncher {
    type Engine = FileEngine;

    fn start(&self) -> Result<FileEngine, MetadataError> {
        Ok(FileEngine::default())
    }
}

/// Reads metadata exports from disk
#[derive(Debug, Default)]
pub struct FileEngine {
    loaded: Vec<PathBuf>,
}

impl FileEngine {
    /// Files read so far
    pub fn loaded(&self) -> &[PathBuf] {
        &self.loaded
    }
}

impl MetadataEngine for FileEngine {
    fn load(&mut self, path: &Path) -> Result<Value, MetadataError> {
        let load_err = |reason: String| MetadataError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let content = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;

        let value = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?,
            Some("toml") => {
                let table: toml::Value = toml::from_str(&content).map_err(|e| load_err(e.to_string()))?;
                serde_json::to_value(table).map_err(|e| load_err(e.to_string()))?
            }
            _ => return Err(MetadataError::UnsupportedFormat(path.to_path_buf())),
        };

        self.loaded.push(path.to_path_buf());
        Ok(value)
    }

    fn stop(self) -> Result<(), MetadataError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Level, MemoryReporter};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_nested_regions_flattened_in_order() {
        let metadata = json!({
            "includedPatientIDs": ["P01", "P02"],
            "finalSelectedRegions": [["HPC", "PFC"], "AMY", [["EC"]]]
        });
        let plan = SessionPlan::from_metadata(&metadata).unwrap();
        assert_eq!(plan.session_ids, vec!["P01", "P02"]);
        assert_eq!(plan.regions, vec!["HPC", "PFC", "AMY", "EC"]);
    }

    #[test]
    fn test_scalar_and_numeric_ids() {
        let metadata = json!({
            "metaDataExt": {
                "includedPatientIDs": 17.0,
                "finalSelectedRegions": "HPC"
            }
        });
        let plan = SessionPlan::from_metadata(&metadata).unwrap();
        assert_eq!(plan.session_ids, vec!["17"]);
        assert_eq!(plan.regions, vec!["HPC"]);

        let plan = SessionPlan::from_metadata(&json!({
            "includedPatientIDs": [3, 4.5],
            "finalSelectedRegions": []
        }))
        .unwrap();
        assert_eq!(plan.session_ids, vec!["3", "4.5"]);
        assert!(plan.regions.is_empty());
    }

    #[test]
    fn test_missing_keys_are_fatal() {
        let err = SessionPlan::from_metadata(&json!({ "finalSelectedRegions": ["HPC"] })).unwrap_err();
        assert!(matches!(err, MetadataError::MissingKey(key) if key == SESSION_IDS_KEY));

        let err = SessionPlan::from_metadata(&json!({ "includedPatientIDs": ["P01"] })).unwrap_err();
        assert!(matches!(err, MetadataError::MissingKey(key) if key == REGIONS_KEY));

        assert!(matches!(
            SessionPlan::from_metadata(&json!([1, 2])),
            Err(MetadataError::NotAMapping)
        ));
    }

    #[test]
    fn test_file_engine_reads_toml_and_json() {
        let dir = tempdir().unwrap();
        let toml_path = dir.path().join("meta.toml");
        fs::write(
            &toml_path,
            "[metaDataExt]\nincludedPatientIDs = [\"P01\"]\nfinalSelectedRegions = [[\"HPC\"], [\"PFC\"]]\n",
        )
        .unwrap();
        let json_path = dir.path().join("meta.json");
        fs::write(&json_path, r#"{"includedPatientIDs": "P09", "finalSelectedRegions": ["AMY"]}"#).unwrap();

        let reporter = MemoryReporter::new();
        let plan = load_session_plan(&FileEngineLauncher, &toml_path, &reporter).unwrap();
        assert_eq!(plan, SessionPlan::new(vec!["P01".into()], vec!["HPC".into(), "PFC".into()]));

        let plan = load_session_plan(&FileEngineLauncher, &json_path, &reporter).unwrap();
        assert_eq!(plan.session_ids, vec!["P09"]);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.mat");
        fs::write(&path, "binary").unwrap();

        let err = load_session_plan(&FileEngineLauncher, &path, &MemoryReporter::new()).unwrap_err();
        assert!(matches!(err, MetadataError::UnsupportedFormat(_)));
    }

    struct FlakyLauncher {
        start_fails: bool,
    }

    struct FlakyEngine;

    impl EngineLauncher for FlakyLauncher {
        type Engine = FlakyEngine;

        fn start(&self) -> Result<FlakyEngine, MetadataError> {
            if self.start_fails {
                return Err(MetadataError::Start("no license".to_string()));
            }
            Ok(FlakyEngine)
        }
    }

    impl MetadataEngine for FlakyEngine {
        fn load(&mut self, _path: &Path) -> Result<Value, MetadataError> {
            Ok(json!({ "includedPatientIDs": ["P01"], "finalSelectedRegions": ["HPC"] }))
        }

        fn stop(self) -> Result<(), MetadataError> {
            Err(MetadataError::Stop("engine hung".to_string()))
        }
    }

    #[test]
    fn test_stop_failure_is_warning() {
        let reporter = MemoryReporter::new();
        let plan = load_session_plan(&FlakyLauncher { start_fails: false }, Path::new("meta"), &reporter).unwrap();
        assert_eq!(plan.regions, vec!["HPC"]);
        assert_eq!(reporter.find(Level::Warn, "did not stop cleanly").len(), 1);
    }

    #[test]
    fn test_start_failure_is_fatal() {
        let reporter = MemoryReporter::new();
        let err = load_session_plan(&FlakyLauncher { start_fails: true }, Path::new("meta"), &reporter).unwrap_err();
        assert!(matches!(err, MetadataError::Start(_)));
    }
}
