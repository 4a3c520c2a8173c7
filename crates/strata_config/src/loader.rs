//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads and validates a `strata.toml` configuration from a project directory.
///
/// Reads `<project_dir>/strata.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `strata.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.top.is_empty() {
        return Err(ConfigError::MissingField("project.top".to_string()));
    }
    if config.filelist.name.is_empty() {
        return Err(ConfigError::ValidationError(
            "filelist.name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "uart"
top = "uart_lib.uart"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "uart");
        assert_eq!(config.project.top, "uart_lib.uart");
        assert!(config.paths.libraries.is_empty());
        assert_eq!(config.filelist.name, "hdl");
        assert_eq!(config.filelist.root_placeholder, "$PRJROOT");
        assert!(!config.elaborate.parallel);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "uart"
version = "0.2.0"
description = "UART with register file"
top = "tb_lib.tb#uart_lib.uart"

[paths]
libraries = ["libs", "ext/libs"]
templates = "templates"

[filelist]
name = "sim"
target = "verilator"
root_placeholder = "${ROOT}"

[elaborate]
parallel = true
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.version, "0.2.0");
        assert_eq!(config.paths.libraries, vec!["libs", "ext/libs"]);
        assert_eq!(config.paths.templates, vec!["templates"]);
        assert_eq!(config.filelist.name, "sim");
        assert_eq!(config.filelist.target.as_deref(), Some("verilator"));
        assert_eq!(config.filelist.root_placeholder, "${ROOT}");
        assert!(config.elaborate.parallel);
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
top = "uart_lib.uart"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_top_errors() {
        let toml = r#"
[project]
name = "test"
top = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn empty_filelist_name_errors() {
        let toml = r#"
[project]
name = "test"
top = "a.b"

[filelist]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"x\"\ntop = \"lib.top\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.top, "lib.top");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
