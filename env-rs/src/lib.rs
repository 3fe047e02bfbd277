pub mod schema;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use schema::{ConfigError, ConfigErrors, Schema};

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("failed to read run document {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("no input on stdin")]
    EmptyInput,
    #[error("failed to parse JSON run document: {0}")]
    Json(#[source] serde_json::Error),
    #[error("failed to parse TOML run document: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigErrors),
    #[error("failed to deserialize validated input: {0}")]
    Input(#[source] serde_json::Error),
    #[error("failed to serialize output: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to write CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

pub type Result<T> = std::result::Result<T, EnvError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// TOML for `.toml` files, JSON otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: None,
            output,
        }
    }

    pub fn parse(raw: &str, format: Format) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(EnvError::EmptyInput);
        }
        let data: Value = match format {
            Format::Json => serde_json::from_str(raw).map_err(EnvError::Json)?,
            Format::Toml => toml::from_str(raw)?,
        };
        Ok(Self::from_json(data))
    }

    pub fn from_stdin() -> Result<Self> {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .map_err(|source| EnvError::Read {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        Self::parse(&raw, Format::Json)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EnvError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, Format::from_path(path))
    }

    /// Validates the input section against `schema` and deserializes the
    /// resolved options (defaults filled in) into `I`.
    pub fn with_schema<I: DeserializeOwned>(self, schema: &Schema) -> Result<Environment<I>> {
        let validated = schema.validate(&self.input_json)?;
        for name in &validated.unknown {
            log::warn!("ignoring unknown option `{name}`");
        }
        let input_value = Value::Object(validated.options.clone());
        let input = serde_json::from_value(input_value).map_err(EnvError::Input)?;
        Ok(Environment {
            input_json: validated.options,
            input: Some(input),
            output: self.output,
        })
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    /// SHA-256 of the canonical (key-sorted) input section.
    pub fn fingerprint(&self) -> String {
        let canonical = Value::Object(self.input_json.clone()).to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            if let Some(dir) = output.get("dir").and_then(|v| v.as_str()) {
                return Some(PathBuf::from(dir));
            }
            return None;
        }

        // Check profiled output, preferring the default profile
        if let Some(profiles) = output.get("profile").and_then(|v| v.as_object()) {
            let selected = profiles.get("default").or_else(|| profiles.values().next());
            if let Some(profile) = selected {
                if profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
                    if let Some(dir) = profile.get("dir").and_then(|v| v.as_str()) {
                        return Some(PathBuf::from(dir));
                    }
                }
            }
        }

        None
    }

    /// Relative paths are placed under the output directory when one is set.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match self.output_dir() {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn prepare(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.resolve_path(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| EnvError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(path)
    }

    pub fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<PathBuf> {
        let path = self.prepare(path)?;
        fs::write(&path, data).map_err(|source| EnvError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> Result<PathBuf> {
        let data = serde_json::to_vec_pretty(value).map_err(EnvError::Serialize)?;
        self.write(path, &data)
    }

    pub fn write_csv<R, T>(
        &self,
        path: impl AsRef<Path>,
        headers: &[&str],
        rows: impl IntoIterator<Item = R>,
    ) -> Result<PathBuf>
    where
        R: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let path = self.prepare(path)?;
        let csv_err = |source| EnvError::Csv {
            path: path.clone(),
            source,
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record(headers).map_err(csv_err)?;
        for row in rows {
            wtr.write_record(row).map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| EnvError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
