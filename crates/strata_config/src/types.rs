//! Configuration types deserialized from `strata.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level project configuration parsed from `strata.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, version, top module reference).
    pub project: ProjectMeta,
    /// Declaration library and template search paths.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Defaults for file-list computation.
    #[serde(default)]
    pub filelist: FileListConfig,
    /// Elaboration settings.
    #[serde(default)]
    pub elaborate: ElaborateConfig,
}

/// Core project metadata required in every `strata.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
    /// Top module reference, e.g. `uart_lib.uart` or `tb_lib.tb#uart_lib.uart`.
    pub top: String,
}

/// Search paths, relative to the directory holding `strata.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct PathsConfig {
    /// Directories scanned for declaration library files.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub libraries: Vec<String>,
    /// Directories searched for templates not found next to their declaration.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub templates: Vec<String>,
}

/// Defaults applied when computing file lists.
#[derive(Debug, Deserialize)]
pub struct FileListConfig {
    /// Name of the file list to compute.
    #[serde(default = "default_filelist_name")]
    pub name: String,
    /// Target filter matched against rule targets (e.g. `"sim"`).
    #[serde(default)]
    pub target: Option<String>,
    /// Token substituted for the project root in reports.
    #[serde(default = "default_root_placeholder")]
    pub root_placeholder: String,
}

impl Default for FileListConfig {
    fn default() -> Self {
        Self {
            name: default_filelist_name(),
            target: None,
            root_placeholder: default_root_placeholder(),
        }
    }
}

fn default_filelist_name() -> String {
    "hdl".to_string()
}

fn default_root_placeholder() -> String {
    "$PRJROOT".to_string()
}

/// Elaboration settings.
#[derive(Debug, Default, Deserialize)]
pub struct ElaborateConfig {
    /// Elaborate independent sibling subtrees on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `libraries = "lib"` (string) and
/// `libraries = ["lib", "ext/lib"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
