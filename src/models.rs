use bytes::Bytes;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;
use uuid::Uuid;

/// The two LightX transformations the studio offers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Avatar,
    Cartoon,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::Avatar, Service::Cartoon];

    /// Accepts the form ids (`avatar`, `cartoon`) as well as the display labels.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "avatar" | "ai avatar" => Some(Service::Avatar),
            "cartoon" | "ai cartoon" => Some(Service::Cartoon),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Service::Avatar => "avatar",
            Service::Cartoon => "cartoon",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Service::Avatar => "AI Avatar",
            Service::Cartoon => "AI Cartoon",
        }
    }

    /// Path of the generation endpoint, relative to the API base.
    pub fn endpoint_path(self) -> &'static str {
        match self {
            Service::Avatar => "v1/avatar",
            Service::Cartoon => "v1/cartoon",
        }
    }

    pub fn default_prompt(self) -> &'static str {
        match self {
            Service::Avatar => "Turn my photo into a superhero avatar with realistic details",
            Service::Cartoon => "Transform my photo into a full-body cartoon character with bold outlines, exaggerated features, and vibrant colors",
        }
    }

    pub fn docs_url(self) -> &'static str {
        match self {
            Service::Avatar => "https://docs.lightxeditor.com/api/ai-avatar",
            Service::Cartoon => "https://docs.lightxeditor.com/api/ai-caricature-generator",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ServiceInfo {
    pub id: Service,
    pub label: &'static str,
    pub endpoint: &'static str,
    pub default_prompt: &'static str,
    pub docs_url: &'static str,
}

impl From<Service> for ServiceInfo {
    fn from(service: Service) -> Self {
        Self {
            id: service,
            label: service.label(),
            endpoint: service.endpoint_path(),
            default_prompt: service.default_prompt(),
            docs_url: service.docs_url(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Png => "image/png",
            ContentType::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file exactly as the browser sent it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Unvalidated form fields for one Generate click.
#[derive(Clone, Default)]
pub struct RawSubmission {
    pub api_key: String,
    pub service: Option<String>,
    pub prompt: Option<String>,
    pub image: Option<UploadedFile>,
}

impl fmt::Debug for RawSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSubmission")
            .field("api_key", &"[REDACTED]")
            .field("service", &self.service)
            .field("prompt", &self.prompt)
            .field("image", &self.image)
            .finish()
    }
}

/// Validated input for one pipeline run.
#[derive(Debug)]
pub struct SessionInput {
    pub api_key: SecretString,
    pub service: Service,
    pub prompt: String,
    pub file_name: String,
    pub image: Bytes,
    pub content_type: ContentType,
    pub dimensions: (u32, u32),
}

impl SessionInput {
    pub fn size(&self) -> usize {
        self.image.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    pub upload_url: String,
    pub image_url: String,
}

/// One reply of the order-status endpoint that carried the success marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatus {
    pub status: String,
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Active { output: Option<String> },
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    UploadSlot,
    Upload,
    Submission,
    Polling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Input => "input validation",
            Stage::UploadSlot => "upload URL request",
            Stage::Upload => "image upload",
            Stage::Submission => "generation request",
            Stage::Polling => "status polling",
        })
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Serialize, Clone)]
pub struct ProgressEvent {
    pub level: ProgressLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded { output_url: String },
    Failed { stage: Stage, message: String },
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub service: Option<Service>,
    pub order_id: Option<String>,
    pub poll_attempts: u32,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub progress: Option<Vec<ProgressEvent>>,
}

/// One line of the NDJSON stream returned by `POST /api/generate`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Progress(ProgressEvent),
    Report(GenerationReport),
}
