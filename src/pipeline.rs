use chrono::Utc;
use parking_lot::Mutex;
use std::{convert::Infallible, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::StudioError;
use crate::input;
use crate::lightx::VendorApi;
use crate::models::{
    GenerationReport, JobState, ProgressEvent, ProgressLevel, RawSubmission, RunOutcome, Service, StreamFrame,
};
use crate::poller::{PollPolicy, Sleeper, StatusPoller};

/// Receives the user-facing status lines of a run as they happen.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    fn info(&self, message: String) {
        self.emit(event(ProgressLevel::Info, message));
    }

    fn success(&self, message: String) {
        self.emit(event(ProgressLevel::Success, message));
    }

    fn warning(&self, message: String) {
        self.emit(event(ProgressLevel::Warning, message));
    }

    fn error(&self, message: String) {
        self.emit(event(ProgressLevel::Error, message));
    }
}

fn event(level: ProgressLevel, message: String) -> ProgressEvent {
    ProgressEvent { level, message, at: Utc::now() }
}

/// Keeps every event, for callers that want the whole log at the end.
#[derive(Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressLog {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for ProgressLog {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}

/// Writes each event as one NDJSON line into a response body channel.
pub struct ChannelSink {
    tx: UnboundedSender<Result<String, Infallible>>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<Result<String, Infallible>>) -> Self {
        Self { tx }
    }

    pub fn send_frame(&self, frame: &StreamFrame) {
        match serde_json::to_string(frame) {
            // Receiver gone means the browser hung up; the run still finishes.
            Ok(line) => {
                let _ = self.tx.send(Ok(line + "\n"));
            }
            Err(e) => error!("❌ Could not encode stream frame: {}", e),
        }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        self.send_frame(&StreamFrame::Progress(event));
    }
}

#[derive(Default)]
struct RunTrace {
    service: Option<Service>,
    order_id: Option<String>,
    poll_attempts: u32,
}

/// Input check, upload slot, upload, job submission, polling. In that order,
/// stopping at the first failure.
pub struct Pipeline {
    vendor: Arc<dyn VendorApi>,
    poller: StatusPoller,
}

impl Pipeline {
    pub fn new(vendor: Arc<dyn VendorApi>, sleeper: Arc<dyn Sleeper>, policy: PollPolicy) -> Self {
        let poller = StatusPoller::new(vendor.clone(), sleeper, policy);
        Self { vendor, poller }
    }

    pub async fn run(&self, raw: RawSubmission, progress: &dyn ProgressSink) -> GenerationReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut trace = RunTrace::default();

        let result = self
            .execute(raw, progress, &mut trace)
            .instrument(info_span!("generation", %run_id))
            .await;

        let outcome = render(result, trace.service, progress);
        GenerationReport {
            run_id,
            service: trace.service,
            order_id: trace.order_id,
            poll_attempts: trace.poll_attempts,
            outcome,
            started_at,
            finished_at: Utc::now(),
            progress: None,
        }
    }

    async fn execute(
        &self,
        raw: RawSubmission,
        progress: &dyn ProgressSink,
        trace: &mut RunTrace,
    ) -> Result<String, StudioError> {
        let input = input::collect(raw)?;
        let service = input.service;
        trace.service = Some(service);
        progress.info(format!(
            "Uploaded image {} ({}x{}, {} bytes).",
            input.file_name,
            input.dimensions.0,
            input.dimensions.1,
            input.size()
        ));

        progress.info("Requesting presigned upload URL from LightX...".into());
        let slot = self
            .vendor
            .reserve_upload_slot(&input.api_key, input.size(), input.content_type)
            .await?;

        progress.info("Uploading image to storage...".into());
        let uploaded = self
            .vendor
            .upload_bytes(&slot.upload_url, input.image.clone(), input.content_type)
            .await?;
        if !uploaded {
            return Err(StudioError::UploadTransfer("storage did not answer 200 OK".into()));
        }
        progress.success("Image uploaded successfully!".into());

        progress.info(format!("Requesting {service} generation from LightX..."));
        let order_id = self
            .vendor
            .submit_job(&input.api_key, service, &slot.image_url, &input.prompt)
            .await?;
        trace.order_id = Some(order_id.clone());
        progress.info(format!("{service} generation started. Order ID: {order_id}"));

        progress.info("Polling for order status...".into());
        let outcome = self.poller.poll(&input.api_key, &order_id, progress).await;
        trace.poll_attempts = outcome.attempts;

        match outcome.state {
            JobState::Active { output: Some(url) } => Ok(url),
            JobState::Active { output: None } => Err(StudioError::JobFailed(format!(
                "order {order_id} became active without an output image"
            ))),
            JobState::Failed => Err(StudioError::JobFailed(format!("{service} generation failed."))),
            JobState::Pending | JobState::TimedOut => Err(StudioError::Timeout { attempts: outcome.attempts }),
        }
    }
}

fn render(result: Result<String, StudioError>, service: Option<Service>, progress: &dyn ProgressSink) -> RunOutcome {
    match result {
        Ok(output_url) => {
            let label = service.map(Service::label).unwrap_or("AI");
            info!("🖼️ {} output ready: {}", label, output_url);
            progress.success(format!("Your {label} Output is ready."));
            RunOutcome::Succeeded { output_url }
        }
        Err(e) => {
            let stage = e.stage();
            error!("❌ Run stopped during {}: {}", stage, e);
            progress.error(e.to_string());
            RunOutcome::Failed { stage, message: e.to_string() }
        }
    }
}
