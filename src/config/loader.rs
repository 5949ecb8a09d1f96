// src/config/loader.rs
//! Configuration loader: defaults, TOML files, then environment overrides

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{constants::paths, PipelineConfig};

/// Configuration loader merging every discovered source in precedence order
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_overrides: bool,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            env_overrides: true,
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_overrides: true,
        }
    }

    /// Skip `BYCYCLE__*` environment variables
    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    /// Paths consulted, lowest precedence first
    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load pipeline configuration with validation
    pub fn load(&self) -> Result<PipelineConfig, ConfigError> {
        let mut merged = toml::Value::try_from(&PipelineConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for config_path in &self.config_paths {
            match Self::load_config_file(config_path) {
                Ok(file_config) => merge_toml_values(&mut merged, file_config),
                Err(ConfigError::FileNotFound(_)) => continue, // Skip missing optional files
                Err(e) => return Err(e),
            }
        }

        if self.env_overrides {
            apply_environment_overrides(&mut merged, std::env::vars());
        }

        let config: PipelineConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

        config
            .validate_consistency()
            .map_err(ConfigError::ValidationError)?;

        Ok(config)
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(paths::DEFAULT_CONFIG_FILE),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ]
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// `BYCYCLE__PROCESSING__LOWPASS_CUTOFF_HZ=40` sets `processing.lowpass_cutoff_hz`
fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(config_key) = key.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };
        let parts: Vec<String> = config_key
            .split(paths::ENV_SEPARATOR)
            .map(|part| part.to_lowercase())
            .collect();
        if parts.iter().any(|p| p.is_empty()) {
            continue;
        }
        set_nested_value(config, &parts, parse_env_value(&value));
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    // Try parsing as different types
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, parts: &[String], value: toml::Value) {
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }

    if let toml::Value::Table(table) = current {
        // Integers given for float fields would otherwise fail to deserialize
        let value = match (table.get(last), value) {
            (Some(toml::Value::Float(_)), toml::Value::Integer(i)) => toml::Value::Float(i as f64),
            (_, value) => value,
        };
        table.insert(last.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert_eq!(loader.config_paths().len(), 2);
    }

    #[test]
    fn test_load_defaults_without_files() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/bycycle.toml")])
            .without_env_overrides();
        let config = loader.load().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[processing]
lowpass_cutoff_hz = 45.0

[processing.band]
low_hz = 4.0
high_hz = 8.0
        "#
        )
        .unwrap();

        let loader = ConfigLoader::with_paths(vec![temp_file.path().to_path_buf()]).without_env_overrides();
        let config = loader.load().unwrap();

        assert_eq!(config.processing.lowpass_cutoff_hz, 45.0);
        assert_eq!(config.processing.band.low_hz, 4.0);
        assert_eq!(config.processing.sampling_rate_hz, 400.0);
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[processing]
lowpass_cutoff_hz = 300.0  # Above Nyquist
        "#
        )
        .unwrap();

        let loader = ConfigLoader::with_paths(vec![temp_file.path().to_path_buf()]).without_env_overrides();
        assert!(matches!(
            loader.load(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_environment_override_mapping() {
        let mut value = toml::Value::try_from(&PipelineConfig::default()).unwrap();
        apply_environment_overrides(
            &mut value,
            vec![
                ("BYCYCLE__PROCESSING__SAMPLING_RATE_HZ".to_string(), "1000".to_string()),
                ("BYCYCLE__PROCESSING__THRESHOLDS__MIN_N_CYCLES".to_string(), "5".to_string()),
                ("OTHER_VAR".to_string(), "ignored".to_string()),
            ],
        );
        let config: PipelineConfig = value.try_into().unwrap();

        assert_eq!(config.processing.sampling_rate_hz, 1000.0);
        assert_eq!(config.processing.thresholds.min_n_cycles, 5);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        unsafe {
            std::env::set_var("BYCYCLE__LAYOUT__FEATURE_TAG", "cycle_features");
        }

        let config = ConfigLoader::with_paths(vec![]).load().unwrap();
        assert_eq!(config.layout.feature_tag, "cycle_features");

        unsafe {
            std::env::remove_var("BYCYCLE__LAYOUT__FEATURE_TAG");
        }
    }
}
