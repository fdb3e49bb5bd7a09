use secrecy::SecretString;
use tracing::info;

use crate::error::ValidationError;
use crate::models::{ContentType, RawSubmission, Service, SessionInput};

pub const MAX_IMAGE_BYTES: usize = 2_097_152;

const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub fn content_type_for(file_name: &str) -> ContentType {
    if file_name.to_ascii_lowercase().ends_with(".png") {
        ContentType::Png
    } else {
        ContentType::Jpeg
    }
}

fn has_accepted_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Validates one form submission. Checks run cheapest first so an oversize
/// file is rejected before any decoding happens.
pub fn collect(raw: RawSubmission) -> Result<SessionInput, ValidationError> {
    let api_key = raw.api_key.trim();
    if api_key.is_empty() {
        return Err(ValidationError::MissingApiKey);
    }

    let service = match raw.service.as_deref().map(str::trim) {
        None | Some("") => Service::Avatar,
        Some(other) => Service::parse(other).ok_or_else(|| ValidationError::UnknownService(other.to_string()))?,
    };

    let file = raw.image.filter(|f| !f.bytes.is_empty()).ok_or(ValidationError::MissingImage)?;
    if file.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::ImageTooLarge { size: file.bytes.len() });
    }
    if !has_accepted_extension(&file.file_name) {
        return Err(ValidationError::UnsupportedType { file_name: file.file_name });
    }

    let decoded = image::load_from_memory(&file.bytes).map_err(|e| ValidationError::UnreadableImage(e.to_string()))?;
    let dimensions = (decoded.width(), decoded.height());

    let prompt = match raw.prompt.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => service.default_prompt().to_string(),
    };

    let content_type = content_type_for(&file.file_name);
    info!(
        "📥 Accepted {} ({} bytes, {}x{}, {}) for {}",
        file.file_name,
        file.bytes.len(),
        dimensions.0,
        dimensions.1,
        content_type,
        service
    );

    Ok(SessionInput {
        api_key: SecretString::new(api_key.to_string()),
        service,
        prompt,
        file_name: file.file_name,
        image: file.bytes,
        content_type,
        dimensions,
    })
}
