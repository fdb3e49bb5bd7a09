use thiserror::Error;

use crate::models::Stage;

/// Local input problems. The user has to fix the form and click again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your LightX API Key.")]
    MissingApiKey,
    #[error("Unknown service '{0}'. Choose AI Avatar or AI Cartoon.")]
    UnknownService(String),
    #[error("Please upload an image.")]
    MissingImage,
    #[error("Image exceeds the 2MB limit ({size} bytes). Please upload a smaller image.")]
    ImageTooLarge { size: usize },
    #[error("Unsupported file '{file_name}'. Upload a JPG, JPEG or PNG image.")]
    UnsupportedType { file_name: String },
    #[error("The uploaded file could not be read as an image: {0}")]
    UnreadableImage(String),
}

#[derive(Debug, Clone, Error)]
pub enum StudioError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to get presigned URL. Response: {0}")]
    SlotAllocation(String),
    #[error("Image upload failed: {0}")]
    UploadTransfer(String),
    #[error("Generation request failed. Response: {0}")]
    JobSubmission(String),
    /// Soft failure of a single status query; the poller logs it and moves on.
    #[error("Status check failed: {0}")]
    StatusCheck(String),
    #[error("Generation failed: {0}")]
    JobFailed(String),
    #[error("Generation timed out after {attempts} status checks. Please try again.")]
    Timeout { attempts: u32 },
}

impl StudioError {
    pub fn stage(&self) -> Stage {
        match self {
            StudioError::Validation(_) => Stage::Input,
            StudioError::SlotAllocation(_) => Stage::UploadSlot,
            StudioError::UploadTransfer(_) => Stage::Upload,
            StudioError::JobSubmission(_) => Stage::Submission,
            StudioError::StatusCheck(_) | StudioError::JobFailed(_) | StudioError::Timeout { .. } => {
                Stage::Polling
            }
        }
    }
}
