//! Domain types shared by the workflow coordinators.
//!
//! Artifact types and output formats are closed sets; their string forms are
//! exactly the names the backend service accepts.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// A category of generated document.
///
/// The variant order is the declaration order used for every request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Epic,
    Stories,
    UseCases,
    Tdd,
    DataModel,
}

impl ArtifactType {
    /// All artifact types in declaration order.
    pub const ALL: [Self; 5] =
        [Self::Epic, Self::Stories, Self::UseCases, Self::Tdd, Self::DataModel];

    /// Wire name of the artifact type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Stories => "stories",
            Self::UseCases => "use_cases",
            Self::Tdd => "tdd",
            Self::DataModel => "data_model",
        }
    }

    /// Human-readable label, e.g. "USE CASES".
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownArtifactType(s.to_string()))
    }
}

/// Output document format, applied to every artifact in one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Docx,
    Pdf,
}

impl OutputFormat {
    /// Wire name and file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ValidationError::UnknownOutputFormat(s.to_string())),
        }
    }
}

/// Which artifact types the next generation request will include.
///
/// Defaults to every type selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSelection {
    flags: [bool; 5],
}

impl Default for ArtifactSelection {
    fn default() -> Self {
        Self { flags: [true; 5] }
    }
}

impl ArtifactSelection {
    /// A selection with nothing included.
    pub fn none() -> Self {
        Self { flags: [false; 5] }
    }

    /// A selection including exactly the given types.
    pub fn only(types: &[ArtifactType]) -> Self {
        let mut selection = Self::none();
        for t in types {
            selection.set(*t, true);
        }
        selection
    }

    /// Include or exclude an artifact type.
    pub fn set(&mut self, artifact: ArtifactType, included: bool) {
        self.flags[artifact.index()] = included;
    }

    /// Whether an artifact type is included.
    pub fn is_selected(&self, artifact: ArtifactType) -> bool {
        self.flags[artifact.index()]
    }

    /// Selected types in declaration order, independent of toggle order.
    pub fn selected(&self) -> Vec<ArtifactType> {
        ArtifactType::ALL.into_iter().filter(|t| self.is_selected(*t)).collect()
    }

    /// True when no artifact type is selected.
    pub fn is_empty(&self) -> bool {
        !self.flags.iter().any(|f| *f)
    }
}

/// MIME type for PDF documents.
pub const PDF_MIME: &str = "application/pdf";

/// MIME type for DOCX documents.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A specification document the user wants to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCandidate {
    /// Local path of the document
    pub path: PathBuf,
    /// File name sent in the multipart body
    pub file_name: String,
    /// Declared MIME type
    pub mime_type: String,
}

impl DocumentCandidate {
    /// Create a candidate with an explicit MIME type.
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, file_name, mime_type: mime_type.into() }
    }

    /// Create a candidate whose MIME type is inferred from the file extension.
    ///
    /// Unknown extensions map to `application/octet-stream`, which selection
    /// then rejects.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::new(path, mime_for_path(path))
    }

    /// Whether the declared MIME type is one the service accepts.
    pub fn is_supported(&self) -> bool {
        self.mime_type == PDF_MIME || self.mime_type == DOCX_MIME
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("pdf") => PDF_MIME,
        Some("docx") => DOCX_MIME,
        _ => "application/octet-stream",
    }
}

/// Durable server-side reference to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReference {
    /// Original file name
    pub file_name: String,
    /// Server-opaque path used by later requests
    pub file_path: String,
    /// Server-reported file type (e.g. ".pdf")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Whether the service indexed the document for retrieval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

/// Outcome of a successful generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Service message
    pub message: String,
    /// Server-side location of each generated artifact
    pub file_paths: BTreeMap<ArtifactType, String>,
    /// Generated content per artifact, as returned by the service
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<ArtifactType, serde_json::Value>,
    /// Format the artifacts were generated in
    pub format: OutputFormat,
}

impl GenerationResult {
    /// Artifact types present in this result, in declaration order.
    pub fn artifact_types(&self) -> Vec<ArtifactType> {
        self.file_paths.keys().copied().collect()
    }

    /// True when the result holds no artifacts.
    pub fn is_empty(&self) -> bool {
        self.file_paths.is_empty()
    }

    /// Whether the result holds the given artifact type.
    pub fn contains(&self, artifact: ArtifactType) -> bool {
        self.file_paths.contains_key(&artifact)
    }
}

/// Tracker work item identifier. Trackers use numeric or textual ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkItemId {
    Number(u64),
    Text(String),
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A work item created in the external tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub title: String,
    pub url: String,
    /// Work item type the tracker created (e.g. "User Story")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item_type: Option<String>,
}

/// Outcome of a tracker push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    /// Service message
    pub message: String,
    /// Items created, in the order the service reported them
    pub work_items_created: Vec<WorkItem>,
    /// Per-artifact failures reported alongside a partial success
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Default tracker work item type.
pub const DEFAULT_WORK_ITEM_TYPE: &str = "User Story";

/// Optional tracker placement for pushed work items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOptions {
    /// Work item type to create
    pub work_item_type: String,
    /// Tracker project, overriding the service default
    pub project_name: Option<String>,
    /// Area path for created items
    pub area_path: Option<String>,
    /// Iteration path for created items
    pub iteration_path: Option<String>,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            work_item_type: DEFAULT_WORK_ITEM_TYPE.to_string(),
            project_name: None,
            area_path: None,
            iteration_path: None,
        }
    }
}

impl PushOptions {
    /// Options for a work item type with no placement overrides.
    pub fn new(work_item_type: impl Into<String>) -> Self {
        Self { work_item_type: work_item_type.into(), ..Self::default() }
    }
}
