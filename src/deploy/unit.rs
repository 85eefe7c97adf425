// ABOUTME: Ordered template files: filename parsing, discovery, parameters.
// ABOUTME: A numeric prefix is the file's delta index; .delta marks update-only.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::delta::DeltaIndex;
use crate::gateway::Parameter;
use crate::types::ProjectEnv;

const TEMPLATE_EXTENSION: &str = "json";
const DELTA_MARKER: &str = ".delta";
const PARAMS_SUFFIX: &str = ".params.yml";

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("not a template directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to read template directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("template file name {file}: {reason}")]
    BadName { file: String, reason: String },

    #[error("duplicate index {index} in {first} and {second}")]
    DuplicateIndex {
        index: u32,
        first: String,
        second: String,
    },

    #[error("failed to parse parameter file {file}: {source}")]
    BadParams {
        file: String,
        source: serde_yaml::Error,
    },

    #[error("parameter {key} requires a build number and none was given")]
    MustHaveBuildNumber { key: String },

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("parameter {key} references unknown builtin: {builtin}")]
    UnknownBuiltin { key: String, builtin: String },
}

/// A parameter value from a `.params.yml` sidecar: a literal, an
/// environment variable reference, or one of the deployment builtins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
    Builtin {
        builtin: String,
    },
    Literal(String),
}

impl ParamValue {
    fn resolve(
        &self,
        key: &str,
        scope: &ProjectEnv,
        build: Option<u32>,
    ) -> Result<String, UnitError> {
        match self {
            ParamValue::Literal(s) => Ok(s.clone()),
            ParamValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| UnitError::MissingEnvVar(var.clone())),
            },
            ParamValue::Builtin { builtin } => match builtin.as_str() {
                "project" => Ok(scope.project().to_string()),
                "environment" => Ok(scope.environment().to_string()),
                "build" => build.map(|b| b.to_string()).ok_or_else(|| {
                    UnitError::MustHaveBuildNumber {
                        key: key.to_string(),
                    }
                }),
                other => Err(UnitError::UnknownBuiltin {
                    key: key.to_string(),
                    builtin: other.to_string(),
                }),
            },
        }
    }
}

/// One template file in the ordered deployment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentUnit {
    index: DeltaIndex,
    base: String,
    update_only: bool,
    path: PathBuf,
}

impl DeploymentUnit {
    /// Parse a template file name like `01createSubnet.json` or
    /// `02createSubnet.delta.json`.
    pub fn from_path(path: &Path) -> Result<Self, UnitError> {
        let file = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or_default()
            .to_string();

        let bad = |reason: &str| UnitError::BadName {
            file: file.clone(),
            reason: reason.to_string(),
        };

        let stem = file
            .strip_suffix(&format!(".{TEMPLATE_EXTENSION}"))
            .ok_or_else(|| bad("not a template file"))?;

        let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(bad("missing numeric index prefix"));
        }
        let index: u32 = digits
            .parse()
            .map_err(|_| bad("index prefix is not a number"))?;
        if index == 0 {
            return Err(bad("index must be at least 1"));
        }

        let rest = &stem[digits.len()..];
        let (base, update_only) = match rest.strip_suffix(DELTA_MARKER) {
            Some(base) => (base, true),
            None => (rest, false),
        };
        if base.is_empty() {
            return Err(bad("missing base name after index"));
        }

        Ok(Self {
            index: DeltaIndex::new(index),
            base: base.to_string(),
            update_only,
            path: path.to_path_buf(),
        })
    }

    /// Discover every template in `directory`, sorted ascending by index.
    /// Non-template files are ignored; two templates at the same index are
    /// an error because the watermark cannot express them.
    pub fn discover(directory: &Path) -> Result<Vec<Self>, UnitError> {
        if !directory.is_dir() {
            return Err(UnitError::NotADirectory(directory.to_path_buf()));
        }

        let mut units: Vec<DeploymentUnit> = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            if !name.ends_with(&format!(".{TEMPLATE_EXTENSION}")) || name.ends_with(PARAMS_SUFFIX)
            {
                continue;
            }
            units.push(Self::from_path(&path)?);
        }

        units.sort_by_key(|u| u.index);
        for pair in units.windows(2) {
            if pair[0].index == pair[1].index {
                return Err(UnitError::DuplicateIndex {
                    index: pair[0].index.value(),
                    first: pair[0].file_name(),
                    second: pair[1].file_name(),
                });
            }
        }
        Ok(units)
    }

    pub fn index(&self) -> DeltaIndex {
        self.index
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Update-only files parameterize an earlier file's stack; they are
    /// applied as updates and have nothing of their own to tear down.
    pub fn update_only(&self) -> bool {
        self.update_only
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or_default()
            .to_string()
    }

    fn params_path(&self) -> PathBuf {
        let file = self.file_name();
        let stem = file
            .strip_suffix(&format!(".{TEMPLATE_EXTENSION}"))
            .unwrap_or(&file);
        self.path.with_file_name(format!("{stem}{PARAMS_SUFFIX}"))
    }

    /// Load and resolve the sidecar parameter file, if one exists.
    pub fn load_parameters(
        &self,
        scope: &ProjectEnv,
        build: Option<u32>,
    ) -> Result<Vec<Parameter>, UnitError> {
        let path = self.params_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&path)?;
        // BTreeMap keeps parameter order deterministic.
        let values: BTreeMap<String, ParamValue> =
            serde_yaml::from_str(&raw).map_err(|source| UnitError::BadParams {
                file: path.display().to_string(),
                source,
            })?;

        values
            .into_iter()
            .map(|(key, value)| {
                value
                    .resolve(&key, scope, build)
                    .map(|resolved| Parameter::new(key, resolved))
            })
            .collect()
    }
}
