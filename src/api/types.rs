//! Wire types for the humanization service and the customization options.
//!
//! The service takes human-readable option strings ("High School",
//! "More Human"), so the option enums serialize through `serde(rename)`.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Target reading level of the rewritten text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Readability {
    #[default]
    #[serde(rename = "High School")]
    HighSchool,
    University,
    Doctorate,
    Journalist,
    Marketing,
}

impl Readability {
    pub fn as_str(self) -> &'static str {
        match self {
            Readability::HighSchool => "High School",
            Readability::University => "University",
            Readability::Doctorate => "Doctorate",
            Readability::Journalist => "Journalist",
            Readability::Marketing => "Marketing",
        }
    }
}

/// What the rewritten text is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Purpose {
    #[default]
    #[serde(rename = "General Writing")]
    GeneralWriting,
    Essay,
    Article,
    #[serde(rename = "Marketing Material")]
    MarketingMaterial,
    Story,
    #[serde(rename = "Cover Letter")]
    CoverLetter,
    Report,
    #[serde(rename = "Business Material")]
    BusinessMaterial,
    #[serde(rename = "Legal Material")]
    LegalMaterial,
}

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::GeneralWriting => "General Writing",
            Purpose::Essay => "Essay",
            Purpose::Article => "Article",
            Purpose::MarketingMaterial => "Marketing Material",
            Purpose::Story => "Story",
            Purpose::CoverLetter => "Cover Letter",
            Purpose::Report => "Report",
            Purpose::BusinessMaterial => "Business Material",
            Purpose::LegalMaterial => "Legal Material",
        }
    }
}

/// How aggressively the service rewrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Strength {
    Quality,
    Balanced,
    #[default]
    #[serde(rename = "More Human")]
    MoreHuman,
}

impl Strength {
    pub fn as_str(self) -> &'static str {
        match self {
            Strength::Quality => "Quality",
            Strength::Balanced => "Balanced",
            Strength::MoreHuman => "More Human",
        }
    }
}

impl fmt::Display for Readability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's request to humanize a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanizationRequest {
    pub text: String,
    #[serde(default)]
    pub readability: Readability,
    #[serde(default)]
    pub purpose: Purpose,
    #[serde(default)]
    pub strength: Strength,
}

impl HumanizationRequest {
    /// Build a request with the default options.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            readability: Readability::default(),
            purpose: Purpose::default(),
            strength: Strength::default(),
        }
    }

    pub fn with_readability(mut self, readability: Readability) -> Self {
        self.readability = readability;
        self
    }

    pub fn with_purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = strength;
        self
    }
}

/// Body of `POST /submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub content: String,
    pub readability: Readability,
    pub purpose: Purpose,
    pub strength: Strength,
    pub model: String,
}

impl SubmitRequest {
    pub fn from_request(request: &HumanizationRequest, model: &str) -> Self {
        Self {
            content: request.text.clone(),
            readability: request.readability,
            purpose: request.purpose,
            strength: request.strength,
            model: model.to_string(),
        }
    }
}

/// Success body of `POST /submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

/// Error body the service may attach to a non-2xx response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /document`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub id: String,
}

/// Success body of `POST /document`. Every field may be absent while the
/// job is still running.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentResponse {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub readability: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
}

/// Handle for a job the service accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
}

/// Current status of a submitted job as seen by one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub ready: bool,
    pub output: Option<String>,
    pub readability: Option<String>,
    pub purpose: Option<String>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            ready: false,
            output: None,
            readability: None,
            purpose: None,
        }
    }

    pub fn ready(output: impl Into<String>) -> Self {
        Self {
            ready: true,
            output: Some(output.into()),
            readability: None,
            purpose: None,
        }
    }
}

impl From<DocumentResponse> for JobStatus {
    /// A job is ready only when the service returned non-blank output.
    fn from(doc: DocumentResponse) -> Self {
        let output = doc.output.filter(|o| !o.trim().is_empty());
        Self {
            ready: output.is_some(),
            output,
            readability: doc.readability,
            purpose: doc.purpose,
        }
    }
}
