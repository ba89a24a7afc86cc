//! Shared types between the site editor and the CMS API
//!
//! These types are used by both:
//! - the editor session controller (native or WASM host)
//! - the HTTP gateway and any test servers standing in for the CMS
//!
//! Serializable with serde for JSON over HTTP

use serde::{Deserialize, Serialize};

// ============================================================================
// Pages
// ============================================================================

/// Canonical entry page of every site. Always listed first.
pub const INDEX_PAGE: &str = "index.md";

/// Style identifier used until the site's persisted style has loaded.
pub const DEFAULT_STYLE: &str = "default";

/// A Markdown document plus its last-rendered HTML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// Unique, filename-like key (e.g. `about.md`)
    pub name: String,
    #[serde(default)]
    pub markdown: String,
    /// Last rendered HTML cache
    #[serde(default)]
    pub html: String,
}

impl Page {
    pub fn new(name: impl Into<String>, markdown: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markdown: markdown.into(),
            html: html.into(),
        }
    }

    pub fn is_index(&self) -> bool {
        self.name == INDEX_PAGE
    }

    /// Same page under a different name; content is carried over.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markdown: self.markdown.clone(),
            html: self.html.clone(),
        }
    }
}

/// Body of a create-page request. The server assigns the name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPage {
    pub markdown: String,
    pub html: String,
}

// ============================================================================
// Files
// ============================================================================

/// An uploaded asset. The server may attach arbitrary metadata
/// (size, mime type, ...) which the editor carries without interpreting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteFile {
    pub name: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SiteFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Size in bytes, when the server reported one.
    pub fn size(&self) -> Option<u64> {
        self.metadata.get("size").and_then(|v| v.as_u64())
    }
}

// ============================================================================
// Requests / Responses
// ============================================================================

/// Rename request for either a page or a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameRequest {
    pub old_name: String,
    pub new_name: String,
}

/// Delete request for a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteFileRequest {
    pub name: String,
}

/// Site style, read and written as `{"style": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleBody {
    pub style: String,
}

/// Upload result. `error == true` is an application-level rejection whose
/// reason code is carried in `result`; transport failures never produce one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl UploadResponse {
    pub fn accepted() -> Self {
        Self {
            error: false,
            result: None,
        }
    }

    pub fn rejected(code: impl Into<String>) -> Self {
        Self {
            error: true,
            result: Some(code.into()),
        }
    }

    /// The rejection this response carries, if any.
    pub fn rejection(&self) -> Option<UploadRejection> {
        self.error
            .then(|| UploadRejection::from_code(self.result.as_deref().unwrap_or_default()))
    }
}

pub const UPLOAD_CODE_TOO_BIG: &str = "file too big";
pub const UPLOAD_CODE_NO_SPACE: &str = "insufficient space";

/// Largest upload the CMS accepts, in MiB.
pub const MAX_UPLOAD_MIB: u64 = 50;

/// Known application-level upload rejection codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    FileTooBig,
    InsufficientSpace,
    Other(String),
}

impl UploadRejection {
    pub fn from_code(code: &str) -> Self {
        match code {
            UPLOAD_CODE_TOO_BIG => Self::FileTooBig,
            UPLOAD_CODE_NO_SPACE => Self::InsufficientSpace,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::FileTooBig => UPLOAD_CODE_TOO_BIG,
            Self::InsufficientSpace => UPLOAD_CODE_NO_SPACE,
            Self::Other(code) => code,
        }
    }

    /// Message shown in the upload dialog.
    pub fn user_message(&self) -> String {
        match self {
            Self::FileTooBig => format!(
                "That file is too big! You can only upload files smaller than {MAX_UPLOAD_MIB} MiB."
            ),
            Self::InsufficientSpace => "You've used up too much hard drive space. \
                 Delete some files before uploading another."
                .to_string(),
            Self::Other(_) => UPLOAD_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Generic upload failure, for unknown codes and transport errors alike.
pub const UPLOAD_FAILED_MESSAGE: &str = "Something went wrong while uploading that file. Try again.";
