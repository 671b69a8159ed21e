//! Canonical topic mapping artifact

use crate::error::{TallyError, TallyResult};
use crate::file_id::{FileId, normalize_file_id};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version reported when the artifact does not declare one
pub const DEFAULT_MAPPING_VERSION: &str = "1.0";

/// Parsed `canonical_topic_mapping.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMappingArtifact {
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    #[serde(default)]
    pub themes: Vec<ThemeEntry>,
    #[serde(default)]
    pub data_access: DataAccess,
    /// Files outside any topic (overviews, market lists)
    #[serde(default)]
    pub global_files: BTreeMap<String, GlobalFileEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub version: Option<String>,
    pub last_updated: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAccess {
    /// Markets whose country data may be compared across years
    #[serde(default)]
    pub comparable_markets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeEntry {
    #[serde(alias = "theme")]
    pub name: String,
    #[serde(default)]
    pub topics: Vec<TopicEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicEntry {
    pub id: String,
    pub canonical_question: Option<String>,
    #[serde(default)]
    pub comparable: bool,
    pub user_message: Option<String>,
    #[serde(default)]
    pub available_markets: Vec<String>,
    /// Survey year → files holding this topic's data for that year
    #[serde(default)]
    pub mapping: BTreeMap<String, Vec<MappedFile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalFileEntry {
    #[serde(default)]
    pub comparable: bool,
    #[serde(default)]
    pub description: String,
}

/// One per-year mapping entry
///
/// Either a bare identifier (`"2025_7"`, `"Q7"`) or an object naming the
/// question and/or the file (`{"id": "Q7", "file": "2025_7.json"}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappedFile {
    Id(String),
    Entry {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        file: Option<String>,
    },
}

impl MappedFile {
    /// Dataset file id for this entry within `year`
    pub fn file_id(&self, year: &str) -> Option<String> {
        match self {
            Self::Entry {
                file: Some(file), ..
            } => Some(normalize_file_id(file).to_string()),
            Self::Entry { id: Some(id), .. } | Self::Id(id) => Some(qualify(id, year)),
            Self::Entry { .. } => None,
        }
    }

    /// Question number this entry refers to, without any `Q` prefix
    pub fn question_id(&self, year: &str) -> Option<String> {
        let raw = match self {
            Self::Entry { id: Some(id), .. } => id.clone(),
            _ => self.file_id(year)?,
        };
        let raw = normalize_file_id(&raw);
        if let Some(parsed) = FileId::parse(raw) {
            return Some(strip_q(&parsed.question).to_string());
        }
        let question = raw.split('_').next().unwrap_or(raw);
        Some(strip_q(question).to_string())
    }
}

fn strip_q(id: &str) -> &str {
    id.strip_prefix('Q')
        .or_else(|| id.strip_prefix('q'))
        .unwrap_or(id)
}

/// Turn a bare question id into `{year}_{question}`
fn qualify(id: &str, year: &str) -> String {
    let id = normalize_file_id(id);
    if id.starts_with(&format!("{}_", year)) || FileId::parse(id).is_some() {
        id.to_string()
    } else {
        format!("{}_{}", year, strip_q(id))
    }
}

impl TopicMappingArtifact {
    /// Parse the artifact from JSON text
    pub fn from_json(content: &str) -> TallyResult<Self> {
        serde_json::from_str(content).map_err(|e| {
            TallyError::config_with_context(
                format!("Failed to parse topic mapping: {}", e),
                "Deserializing canonical topic mapping",
            )
        })
    }

    /// Read and parse the artifact from disk
    pub fn load(path: &Path) -> TallyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TallyError::io_with_path(
                format!("Failed to read topic mapping: {}", e),
                path.display().to_string(),
            )
        })?;
        Self::from_json(&content)
    }

    /// Declared version, or the default
    pub fn version(&self) -> &str {
        self.metadata
            .version
            .as_deref()
            .unwrap_or(DEFAULT_MAPPING_VERSION)
    }
}
