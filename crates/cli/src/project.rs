use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE_NAME: &str = "argtree.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub settings: IndexMap<String, String>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: IndexMap::new(),
        }
    }

    /// `name` is always readable; everything else comes from `settings`.
    pub fn setting(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(self.name.as_str()),
            _ => self.settings.get(key).map(String::as_str),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            "name" => self.name = value,
            _ => {
                self.settings.insert(key.to_string(), value);
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read project file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse project file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Path of the project file in the current directory.
pub fn project_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(PROJECT_FILE_NAME))
}

pub fn load_project() -> Result<(PathBuf, Project)> {
    let path = project_path()?;
    if !path.exists() {
        bail!(
            "{PROJECT_FILE_NAME} not found in {} (run `argtree-demo init` first)",
            path.parent().unwrap_or(Path::new(".")).display()
        );
    }
    let project = Project::from_file(&path)?;
    Ok((path, project))
}
