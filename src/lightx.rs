use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::StudioError;
use crate::models::{ContentType, OrderStatus, Service, UploadSlot};

pub const DEFAULT_API_BASE: &str = "https://api.lightxeditor.com/external/api";

/// `statusCode` LightX puts in every response body when the call itself went through.
pub const SUCCESS_MARKER: i64 = 2000;

/// The vendor calls the pipeline depends on. `LightxClient` is the real one;
/// tests script their own.
#[async_trait]
pub trait VendorApi: Send + Sync {
    async fn reserve_upload_slot(
        &self,
        api_key: &SecretString,
        size: usize,
        content_type: ContentType,
    ) -> Result<UploadSlot, StudioError>;

    /// `Ok(false)` when storage answered with anything but 200.
    async fn upload_bytes(&self, upload_url: &str, bytes: Bytes, content_type: ContentType) -> Result<bool, StudioError>;

    async fn submit_job(
        &self,
        api_key: &SecretString,
        service: Service,
        image_url: &str,
        prompt: &str,
    ) -> Result<String, StudioError>;

    /// Errors with `StatusCheck` when the reply lacks the success marker.
    async fn order_status(&self, api_key: &SecretString, order_id: &str) -> Result<OrderStatus, StudioError>;
}

pub struct LightxClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "statusCode")]
    status_code: Option<i64>,
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotBody {
    upload_image: Option<String>,
    image_url: Option<String>,
    masked_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody {
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: Option<String>,
    output: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Splits a vendor reply into its body when the success marker is present.
/// `Err` carries the raw JSON for the user-facing message.
fn accepted_body<T: DeserializeOwned>(raw: &Value) -> Result<Option<T>, String> {
    let envelope: Envelope<T> = serde_json::from_value(raw.clone()).map_err(|e| format!("{e}: {raw}"))?;
    if envelope.status_code != Some(SUCCESS_MARKER) {
        return Err(raw.to_string());
    }
    Ok(envelope.body)
}

impl LightxClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub fn endpoint_for(&self, service: Service) -> String {
        self.url(service.endpoint_path())
    }

    /// POSTs JSON with the key header and returns the reply body as JSON,
    /// regardless of HTTP status; LightX reports failures inside the body.
    async fn post_json(&self, url: &str, api_key: &SecretString, payload: &Value) -> Result<Value, String> {
        info!("🔗 POST {}", url);
        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;
        info!("📥 Response status: {}", status);
        serde_json::from_str(&text).map_err(|e| format!("status={} unparseable body ({}): {}", status, e, text))
    }
}

#[async_trait]
impl VendorApi for LightxClient {
    async fn reserve_upload_slot(
        &self,
        api_key: &SecretString,
        size: usize,
        content_type: ContentType,
    ) -> Result<UploadSlot, StudioError> {
        let payload = json!({
            "uploadType": "maskedImageUrl",
            "size": size,
            "contentType": content_type.as_str(),
        });
        let raw = self
            .post_json(&self.url("v2/uploadImageUrl"), api_key, &payload)
            .await
            .map_err(StudioError::SlotAllocation)?;

        let body: SlotBody = accepted_body(&raw)
            .map_err(StudioError::SlotAllocation)?
            .ok_or_else(|| StudioError::SlotAllocation(raw.to_string()))?;

        let upload_url = non_empty(body.upload_image);
        let image_url = non_empty(body.image_url).or_else(|| non_empty(body.masked_image_url));
        match (upload_url, image_url) {
            (Some(upload_url), Some(image_url)) => {
                info!("✅ Upload slot reserved, image will live at {}", image_url);
                Ok(UploadSlot { upload_url, image_url })
            }
            _ => {
                error!("❌ Upload slot reply is missing a URL: {}", raw);
                Err(StudioError::SlotAllocation(format!("missing upload URL or final image URL in {raw}")))
            }
        }
    }

    async fn upload_bytes(&self, upload_url: &str, bytes: Bytes, content_type: ContentType) -> Result<bool, StudioError> {
        let size = bytes.len();
        let response = self
            .client
            .put(upload_url)
            .header(CONTENT_TYPE, content_type.as_str())
            .body(bytes)
            .send()
            .await
            .map_err(|e| StudioError::UploadTransfer(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            info!("✅ Uploaded {} bytes to storage", size);
            Ok(true)
        } else {
            error!("❌ Storage rejected the upload with status {}", status);
            Ok(false)
        }
    }

    async fn submit_job(
        &self,
        api_key: &SecretString,
        service: Service,
        image_url: &str,
        prompt: &str,
    ) -> Result<String, StudioError> {
        let payload = json!({
            "imageUrl": image_url,
            "styleImageUrl": image_url,
            "textPrompt": prompt,
        });
        let raw = self
            .post_json(&self.endpoint_for(service), api_key, &payload)
            .await
            .map_err(StudioError::JobSubmission)?;

        let body: Option<OrderBody> = accepted_body(&raw).map_err(StudioError::JobSubmission)?;
        match body.and_then(|b| non_empty(b.order_id)) {
            Some(order_id) => {
                info!("🎯 {} order accepted: {}", service, order_id);
                Ok(order_id)
            }
            None => Err(StudioError::JobSubmission(format!("no orderId received: {raw}"))),
        }
    }

    async fn order_status(&self, api_key: &SecretString, order_id: &str) -> Result<OrderStatus, StudioError> {
        let raw = self
            .post_json(&self.url("v1/order-status"), api_key, &json!({ "orderId": order_id }))
            .await
            .map_err(StudioError::StatusCheck)?;

        let body: Option<StatusBody> = accepted_body(&raw).map_err(StudioError::StatusCheck)?;
        let body = body.ok_or_else(|| StudioError::StatusCheck(raw.to_string()))?;
        Ok(OrderStatus {
            status: body.status.unwrap_or_default(),
            output: non_empty(body.output),
        })
    }
}
