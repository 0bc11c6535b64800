//! Reading and writing property files.
//!
//! Property files are plain `key=value` lines parsed as the general section
//! of an INI document. Escapes are disabled so that Windows paths and
//! regular-expression values survive untouched.

use ini::{EscapePolicy, Ini, ParseOption};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::Properties;

/// Property file errors.
#[derive(Debug, Error)]
pub enum PropertiesError {
    #[error("Failed to parse properties from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ini::ParseError,
    },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where a property source came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    /// Passed to the registry builder
    Boot,
    /// Named by the process environment
    ProcessWide,
    /// `steward.properties` in the system home
    Application,
    /// Built-in list plus discovered catalog files
    Default,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::Boot => "boot",
            SourceKind::ProcessWide => "process",
            SourceKind::Application => "application",
            SourceKind::Default => "default",
        };
        f.write_str(label)
    }
}

/// A named set of properties feeding catalog assembly.
#[derive(Debug, Clone)]
pub struct PropertySource {
    pub kind: SourceKind,
    /// File path or `builtin`
    pub origin: String,
    pub properties: Properties,
}

impl PropertySource {
    pub fn new(kind: SourceKind, origin: impl Into<String>, properties: Properties) -> Self {
        Self {
            kind,
            origin: origin.into(),
            properties,
        }
    }

    pub fn parse(
        kind: SourceKind,
        origin: impl Into<String>,
        text: &str,
    ) -> Result<Self, PropertiesError> {
        let origin = origin.into();
        let properties = parse_with_origin(text, &origin)?;
        Ok(Self::new(kind, origin, properties))
    }

    /// Load a property file; `None` if it does not exist.
    pub fn load(kind: SourceKind, path: &Path) -> Result<Option<Self>, PropertiesError> {
        Ok(read_properties(path)?
            .map(|properties| Self::new(kind, path.display().to_string(), properties)))
    }
}

/// Parse `key=value` text into ordered properties.
pub fn parse_properties(text: &str) -> Result<Properties, PropertiesError> {
    parse_with_origin(text, "<string>")
}

fn parse_with_origin(text: &str, origin: &str) -> Result<Properties, PropertiesError> {
    let option = ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(text, option).map_err(|source| PropertiesError::Parse {
        origin: origin.to_string(),
        source,
    })?;

    Ok(ini
        .general_section()
        .iter()
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect())
}

/// Read a property file; `None` if it does not exist.
pub fn read_properties(path: &Path) -> Result<Option<Properties>, PropertiesError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PropertiesError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_with_origin(&text, &path.display().to_string()).map(Some)
}

/// Write the flattened view of `properties` to `path`.
pub fn write_properties(properties: &Properties, path: &Path) -> Result<(), PropertiesError> {
    let mut ini = Ini::new();
    for (k, v) in properties.flattened().iter() {
        ini.with_general_section().set(k, v);
    }
    ini.write_to_file_policy(path, EscapePolicy::Nothing)
        .map_err(|source| PropertiesError::Io {
            path: path.to_path_buf(),
            source,
        })
}
