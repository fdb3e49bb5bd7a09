//! Fakes shared by the unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageBuffer, ImageFormat, Rgb};
use parking_lot::Mutex;
use secrecy::SecretString;
use std::{collections::VecDeque, io::Cursor, time::Duration};

use crate::error::StudioError;
use crate::lightx::VendorApi;
use crate::models::{ContentType, OrderStatus, RawSubmission, Service, UploadSlot, UploadedFile};
use crate::poller::Sleeper;

pub fn tiny_png() -> Bytes {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([200, 30, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

pub fn submission() -> RawSubmission {
    RawSubmission {
        api_key: "k".into(),
        service: Some("avatar".into()),
        prompt: Some("superhero".into()),
        image: Some(UploadedFile { file_name: "in.png".into(), bytes: tiny_png() }),
    }
}

/// Records requested delays without waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// Vendor double answering from a script. Status replies are consumed in
/// order; once the script runs out every check reports "pending".
pub struct ScriptedVendor {
    pub slot: Result<UploadSlot, StudioError>,
    pub upload_ok: bool,
    pub order: Result<String, StudioError>,
    pub statuses: Mutex<VecDeque<Result<OrderStatus, StudioError>>>,
    pub calls: Mutex<Vec<String>>,
    pub uploaded_to: Mutex<Option<String>>,
    pub submitted_image_url: Mutex<Option<String>>,
}

impl Default for ScriptedVendor {
    fn default() -> Self {
        Self {
            slot: Ok(UploadSlot {
                upload_url: "https://s3.example/put".into(),
                image_url: "https://cdn.example/in.png".into(),
            }),
            upload_ok: true,
            order: Ok("ord-1".into()),
            statuses: Mutex::default(),
            calls: Mutex::default(),
            uploaded_to: Mutex::default(),
            submitted_image_url: Mutex::default(),
        }
    }
}

impl ScriptedVendor {
    pub fn with_statuses(statuses: Vec<Result<OrderStatus, StudioError>>) -> Self {
        Self { statuses: Mutex::new(statuses.into()), ..Default::default() }
    }

    pub fn status(status: &str) -> Result<OrderStatus, StudioError> {
        Ok(OrderStatus { status: status.into(), output: None })
    }

    pub fn active(output: &str) -> Result<OrderStatus, StudioError> {
        Ok(OrderStatus { status: "active".into(), output: Some(output.into()) })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls.lock().iter().filter(|c| *c == "status").count()
    }

    pub fn uploaded_to(&self) -> Option<String> {
        self.uploaded_to.lock().clone()
    }

    pub fn submitted_image_url(&self) -> Option<String> {
        self.submitted_image_url.lock().clone()
    }
}

#[async_trait]
impl VendorApi for ScriptedVendor {
    async fn reserve_upload_slot(
        &self,
        _api_key: &SecretString,
        _size: usize,
        _content_type: ContentType,
    ) -> Result<UploadSlot, StudioError> {
        self.calls.lock().push("reserve".into());
        self.slot.clone()
    }

    async fn upload_bytes(&self, upload_url: &str, _bytes: Bytes, _content_type: ContentType) -> Result<bool, StudioError> {
        self.calls.lock().push("upload".into());
        *self.uploaded_to.lock() = Some(upload_url.to_string());
        Ok(self.upload_ok)
    }

    async fn submit_job(
        &self,
        _api_key: &SecretString,
        service: Service,
        image_url: &str,
        _prompt: &str,
    ) -> Result<String, StudioError> {
        self.calls.lock().push(format!("submit:{}", service.id()));
        *self.submitted_image_url.lock() = Some(image_url.to_string());
        self.order.clone()
    }

    async fn order_status(&self, _api_key: &SecretString, _order_id: &str) -> Result<OrderStatus, StudioError> {
        self.calls.lock().push("status".into());
        self.statuses.lock().pop_front().unwrap_or_else(|| Self::status("pending"))
    }
}
