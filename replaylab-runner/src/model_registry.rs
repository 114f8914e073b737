//! Model registry: a directory of model files plus a `registry.json` index.
//!
//! The registry is an ordinary value: open it, hand it to whatever needs a
//! model, drop it. Nothing is cached process-wide and every mutation is
//! written back to disk before returning.
//!
//! Layout:
//! ```text
//! models/
//!   registry.json        { "models": [...], "active_model": "momentum_v2" }
//!   momentum_v2.json     LinearModel
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use replaylab_core::agent::{LinearModel, ModelError, ProbabilityModel};

pub const INDEX_FILE: &str = "registry.json";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt registry index: {0}")]
    Index(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("no model named '{0}'")]
    NotFound(String),

    #[error("registry has no active model")]
    NoActiveModel,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> RegistryError + '_ {
    move |source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One registered model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    /// File name inside the registry directory.
    pub file: String,
    pub created_at: DateTime<Utc>,
    pub feature_count: usize,
    pub classes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryIndex {
    models: Vec<ModelEntry>,
    active_model: Option<String>,
}

#[derive(Debug)]
pub struct ModelRegistry {
    dir: PathBuf,
    index: RegistryIndex,
}

impl ModelRegistry {
    /// Open (or create) the registry rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let index_path = dir.join(INDEX_FILE);
        let index = match fs::read_to_string(&index_path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => RegistryIndex::default(),
            Err(e) => return Err(io_err(&index_path)(e)),
        };
        Ok(Self { dir, index })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy a model file into the registry under a unique name.
    ///
    /// A taken name gets a `_2`, `_3`, ... suffix. The first model ever
    /// registered becomes active. Returns the name actually used.
    pub fn register(
        &mut self,
        name: &str,
        source: impl AsRef<Path>,
        description: Option<String>,
    ) -> Result<String, RegistryError> {
        let source = source.as_ref();
        let json = fs::read_to_string(source).map_err(io_err(source))?;
        let model = LinearModel::from_json(&json)?;

        let name = self.unique_name(name);
        let file = format!("{name}.json");
        let dest = self.dir.join(&file);
        fs::write(&dest, model.to_json()?).map_err(io_err(&dest))?;

        self.index.models.push(ModelEntry {
            name: name.clone(),
            file,
            created_at: Utc::now(),
            feature_count: model.feature_names.len(),
            classes: model.n_classes(),
            description,
        });
        if self.index.active_model.is_none() {
            self.index.active_model = Some(name.clone());
        }
        self.save()?;
        info!(model = %name, "registered model");
        Ok(name)
    }

    /// All models, newest first.
    pub fn list(&self) -> Vec<&ModelEntry> {
        let mut entries: Vec<&ModelEntry> = self.index.models.iter().rev().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.index.models.iter().find(|m| m.name == name)
    }

    pub fn active(&self) -> Option<&ModelEntry> {
        self.index.active_model.as_deref().and_then(|n| self.get(n))
    }

    pub fn activate(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.get(name).is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.index.active_model = Some(name.to_string());
        self.save()?;
        info!(model = %name, "activated model");
        Ok(())
    }

    /// Delete a model and its file. Removing the active model activates the
    /// newest remaining one.
    pub fn remove(&mut self, name: &str) -> Result<ModelEntry, RegistryError> {
        let pos = self
            .index
            .models
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let entry = self.index.models.remove(pos);

        let path = self.dir.join(&entry.file);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&path)(e)),
        }

        if self.index.active_model.as_deref() == Some(name) {
            self.index.active_model = self.list().first().map(|m| m.name.clone());
        }
        self.save()?;
        info!(model = %name, "removed model");
        Ok(entry)
    }

    pub fn model_path(&self, name: &str) -> Option<PathBuf> {
        self.get(name).map(|m| self.dir.join(&m.file))
    }

    pub fn active_model_path(&self) -> Option<PathBuf> {
        self.active().map(|m| self.dir.join(&m.file))
    }

    pub fn load(&self, name: &str) -> Result<Arc<dyn ProbabilityModel>, RegistryError> {
        let path = self
            .model_path(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        load_model_file(&path)
    }

    pub fn load_active(&self) -> Result<Arc<dyn ProbabilityModel>, RegistryError> {
        let path = self.active_model_path().ok_or(RegistryError::NoActiveModel)?;
        load_model_file(&path)
    }

    fn unique_name(&self, base: &str) -> String {
        if self.get(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    fn save(&self) -> Result<(), RegistryError> {
        let path = self.dir.join(INDEX_FILE);
        let json = serde_json::to_string_pretty(&self.index)?;
        fs::write(&path, json).map_err(io_err(&path))
    }
}

/// Read a `LinearModel` JSON file from anywhere on disk.
pub fn load_model_file(path: &Path) -> Result<Arc<dyn ProbabilityModel>, RegistryError> {
    let json = fs::read_to_string(path).map_err(io_err(path))?;
    Ok(Arc::new(LinearModel::from_json(&json)?))
}
