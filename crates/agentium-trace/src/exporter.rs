//! Batched HTTP exporter for the ingestion API.
//!
//! Trace nodes are enqueued as ingestion events on a mutex-guarded deque.
//! A background worker drains the queue into batches bounded by event
//! count and byte size, POSTing each with HTTP basic auth. Delivery is
//! at-least-once: a failed batch goes back to the front of the queue.

use crate::model::{
    GenerationInput, GenerationStatus, PhaseEnd, SpanCtx, TraceCtx, TraceEnd,
};
use crate::tracer::Tracer;
use agentium_core::{AgentiumError, AgentiumResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default cap on events per batch.
pub const DEFAULT_BATCH_MAX_EVENTS: usize = 50;
/// Default cap on serialized batch size, in bytes.
pub const DEFAULT_BATCH_MAX_BYTES: usize = 900_000;

/// Exporter connection and batching configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub base_url: String,
    pub public_key: String,
    pub secret_key: String,
    pub batch_max_events: usize,
    pub batch_max_bytes: usize,
    /// How often the background worker drains the queue.
    pub export_interval: Duration,
}

impl ExporterConfig {
    /// Config with default batching limits.
    pub fn new(
        base_url: impl Into<String>,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            batch_max_events: DEFAULT_BATCH_MAX_EVENTS,
            batch_max_bytes: DEFAULT_BATCH_MAX_BYTES,
            export_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct IngestionEvent {
    id: Uuid,
    #[serde(rename = "type")]
    event_type: String,
    timestamp: chrono::DateTime<Utc>,
    body: serde_json::Value,
}

impl IngestionEvent {
    fn new(event_type: &str, body: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            body,
        }
    }

    fn approximate_size(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    successes: Vec<serde_json::Value>,
    #[serde(default)]
    errors: Vec<IngestionError>,
}

#[derive(Debug, Deserialize)]
struct IngestionError {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    message: String,
}

/// Tracer that exports to the HTTP ingestion API in batches.
pub struct HttpTracer {
    config: ExporterConfig,
    http: reqwest::Client,
    pending: Arc<Mutex<VecDeque<IngestionEvent>>>,
    shutdown: CancellationToken,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl HttpTracer {
    /// Create the tracer and start its background drain worker.
    pub fn new(config: ExporterConfig) -> Arc<Self> {
        let tracer = Arc::new(Self {
            config,
            http: reqwest::Client::new(),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            shutdown: CancellationToken::new(),
            worker: tokio::sync::Mutex::new(None),
        });

        let worker_tracer = tracer.clone();
        let handle = tokio::spawn(async move {
            worker_tracer.drain_loop().await;
        });
        if let Ok(mut worker) = tracer.worker.try_lock() {
            *worker = Some(handle);
        }

        tracer
    }

    async fn drain_loop(&self) {
        let mut interval = tokio::time::interval(self.config.export_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.export_pending().await {
                        debug!(error = %e, "Background export failed, batch re-queued");
                    }
                }
                _ = self.shutdown.cancelled() => break,
            }
        }
    }

    fn enqueue(&self, event: IngestionEvent) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_back(event);
        }
    }

    /// Take one batch off the queue, respecting both bounds. Always takes
    /// at least one event when the queue is non-empty.
    fn next_batch(&self) -> Vec<IngestionEvent> {
        let mut pending = match self.pending.lock() {
            Ok(p) => p,
            Err(_) => return Vec::new(),
        };
        let mut batch = Vec::new();
        let mut bytes = 0usize;
        while let Some(event) = pending.front() {
            let size = event.approximate_size();
            let over_count = batch.len() >= self.config.batch_max_events;
            let over_bytes = !batch.is_empty() && bytes + size > self.config.batch_max_bytes;
            if over_count || over_bytes {
                break;
            }
            bytes += size;
            if let Some(event) = pending.pop_front() {
                batch.push(event);
            }
        }
        batch
    }

    fn requeue_front(&self, batch: Vec<IngestionEvent>) {
        if let Ok(mut pending) = self.pending.lock() {
            for event in batch.into_iter().rev() {
                pending.push_front(event);
            }
        }
    }

    async fn export_pending(&self) -> AgentiumResult<()> {
        loop {
            let batch = self.next_batch();
            if batch.is_empty() {
                return Ok(());
            }
            if let Err(e) = self.post_batch(&batch).await {
                self.requeue_front(batch);
                return Err(e);
            }
        }
    }

    async fn post_batch(&self, batch: &[IngestionEvent]) -> AgentiumResult<()> {
        let url = format!(
            "{}/api/public/ingestion",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({ "batch": batch });

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.config.public_key, Some(&self.config.secret_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentiumError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AgentiumError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(AgentiumError::Http(format!(
                "ingestion API error {status}: {text}"
            )));
        }

        match serde_json::from_str::<IngestionResponse>(&text) {
            Ok(parsed) => {
                info!(
                    accepted = parsed.successes.len(),
                    rejected = parsed.errors.len(),
                    "Ingestion batch delivered"
                );
                for err in &parsed.errors {
                    warn!(
                        id = %err.id,
                        status = err.status,
                        message = %err.message,
                        "Ingestion event rejected"
                    );
                }
            }
            Err(_) => {
                // Delivered as far as we can tell; the body just isn't
                // the documented shape.
                warn!("could not parse response");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Tracer for HttpTracer {
    fn start_trace(&self, task_id: &str) -> TraceCtx {
        let ctx = TraceCtx {
            trace_id: Uuid::new_v4(),
            task_id: task_id.to_string(),
        };
        self.enqueue(IngestionEvent::new(
            "trace-create",
            json!({
                "id": ctx.trace_id,
                "name": ctx.task_id,
                "timestamp": Utc::now(),
            }),
        ));
        ctx
    }

    fn start_phase(&self, trace: &TraceCtx, phase_name: &str) -> SpanCtx {
        let ctx = SpanCtx {
            trace_id: trace.trace_id,
            span_id: Uuid::new_v4(),
            phase_name: phase_name.to_string(),
        };
        self.enqueue(IngestionEvent::new(
            "span-create",
            json!({
                "id": ctx.span_id,
                "traceId": ctx.trace_id,
                "name": ctx.phase_name,
                "startTime": Utc::now(),
            }),
        ));
        ctx
    }

    fn record_generation(&self, span: &SpanCtx, generation: GenerationInput) {
        let mut metadata = json!({});
        if let Some(system_prompt) = &generation.system_prompt {
            if !system_prompt.is_empty() {
                metadata["system_prompt"] = json!(system_prompt);
            }
        }

        self.enqueue(IngestionEvent::new(
            "generation-create",
            json!({
                "id": Uuid::new_v4(),
                "traceId": span.trace_id,
                "parentObservationId": span.span_id,
                "name": generation.name.to_string(),
                "model": generation.model,
                "input": generation.input,
                "output": generation.output,
                "usage": {
                    "input": generation.input_tokens,
                    "output": generation.output_tokens,
                },
                "level": match generation.status {
                    GenerationStatus::Completed => "DEFAULT",
                    GenerationStatus::Error => "ERROR",
                },
                "metadata": metadata,
                "startTime": generation.started_at,
                "endTime": generation.ended_at,
            }),
        ));
    }

    fn record_skipped(&self, span: &SpanCtx, component: &str, reason: &str) {
        self.enqueue(IngestionEvent::new(
            "event-create",
            json!({
                "id": Uuid::new_v4(),
                "traceId": span.trace_id,
                "parentObservationId": span.span_id,
                "name": format!("{component} skipped"),
                "metadata": { "reason": reason },
            }),
        ));
    }

    fn end_phase(&self, span: &SpanCtx, end: PhaseEnd) {
        self.enqueue(IngestionEvent::new(
            "span-update",
            json!({
                "id": span.span_id,
                "traceId": span.trace_id,
                "endTime": Utc::now(),
                "metadata": {
                    "status": end.status,
                    "duration_ms": end.duration_ms,
                },
                "input": end.input,
                "output": end.output,
            }),
        ));
    }

    fn complete_trace(&self, trace: &TraceCtx, end: TraceEnd) {
        self.enqueue(IngestionEvent::new(
            "trace-create",
            json!({
                "id": trace.trace_id,
                "name": trace.task_id,
                "output": end.status,
                "metadata": {
                    "total_input_tokens": end.total_input_tokens,
                    "total_output_tokens": end.total_output_tokens,
                },
            }),
        ));
    }

    async fn flush(&self) -> AgentiumResult<()> {
        self.export_pending().await
    }

    async fn stop(&self) {
        // Idempotent: cancelling twice is a no-op, the handle is taken once.
        self.shutdown.cancel();
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        if let Err(e) = self.export_pending().await {
            warn!(error = %e, "Final trace flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationName;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generation(name: GenerationName) -> GenerationInput {
        GenerationInput {
            name,
            model: "test-model".into(),
            input: "in".into(),
            output: "out".into(),
            system_prompt: None,
            input_tokens: 10,
            output_tokens: 5,
            status: GenerationStatus::Completed,
            started_at: Utc::now(),
            ended_at: Utc::now(),
        }
    }

    async fn mock_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/public/ingestion"))
            .respond_with(
                ResponseTemplate::new(207)
                    .set_body_json(json!({ "successes": [], "errors": [] })),
            )
            .mount(server)
            .await;
    }

    fn tracer_for(server: &MockServer) -> Arc<HttpTracer> {
        let mut config = ExporterConfig::new(server.uri(), "pk", "sk");
        // Long interval: tests drive flush() explicitly.
        config.export_interval = Duration::from_secs(3600);
        HttpTracer::new(config)
    }

    async fn batched_events(server: &MockServer) -> Vec<serde_json::Value> {
        let mut events = Vec::new();
        for request in server.received_requests().await.unwrap_or_default() {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            events.extend(body["batch"].as_array().cloned().unwrap_or_default());
        }
        events
    }

    #[tokio::test]
    async fn one_phase_with_skip_produces_seven_events() {
        let server = MockServer::start().await;
        mock_ok(&server).await;
        let tracer = tracer_for(&server);

        let trace = tracer.start_trace("task-42");
        let span = tracer.start_phase(&trace, "IMPLEMENT");
        tracer.record_generation(&span, generation(GenerationName::Worker));
        tracer.record_skipped(&span, "Reviewer", "no reviewer configured");
        tracer.record_generation(&span, generation(GenerationName::Judge));
        tracer.end_phase(
            &span,
            PhaseEnd {
                status: "completed".into(),
                duration_ms: 1200,
                input: None,
                output: None,
            },
        );
        tracer.complete_trace(
            &trace,
            TraceEnd {
                status: "COMPLETE".into(),
                total_input_tokens: 20,
                total_output_tokens: 10,
            },
        );
        tracer.flush().await.unwrap();

        let events = batched_events(&server).await;
        assert_eq!(events.len(), 7);

        let count = |t: &str| events.iter().filter(|e| e["type"] == t).count();
        assert_eq!(count("trace-create"), 2);
        assert_eq!(count("span-create"), 1);
        assert_eq!(count("generation-create"), 2);
        assert_eq!(count("event-create"), 1);
        assert_eq!(count("span-update"), 1);

        // Parent linkage: generations and the skip event point at the span,
        // the span points at the trace.
        let trace_id = json!(trace.trace_id);
        let span_id = json!(span.span_id);
        for event in &events {
            match event["type"].as_str().unwrap() {
                "generation-create" | "event-create" => {
                    assert_eq!(event["body"]["parentObservationId"], span_id);
                    assert_eq!(event["body"]["traceId"], trace_id);
                }
                "span-create" | "span-update" => {
                    assert_eq!(event["body"]["id"], span_id);
                    assert_eq!(event["body"]["traceId"], trace_id);
                }
                _ => assert_eq!(event["body"]["id"], trace_id),
            }
        }

        tracer.stop().await;
    }

    #[tokio::test]
    async fn batches_respect_the_event_cap() {
        let server = MockServer::start().await;
        mock_ok(&server).await;
        let mut config = ExporterConfig::new(server.uri(), "pk", "sk");
        config.export_interval = Duration::from_secs(3600);
        config.batch_max_events = 2;
        let tracer = HttpTracer::new(config);

        let trace = tracer.start_trace("t");
        for i in 0..5 {
            tracer.start_phase(&trace, &format!("phase-{i}"));
        }
        tracer.flush().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        // 6 events at 2 per batch.
        assert_eq!(requests.len(), 3);
        tracer.stop().await;
    }

    #[tokio::test]
    async fn basic_auth_header_is_sent() {
        let server = MockServer::start().await;
        mock_ok(&server).await;
        let tracer = tracer_for(&server);

        tracer.start_trace("t");
        tracer.flush().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let auth = requests[0].headers.get("authorization").unwrap();
        assert!(auth.to_str().unwrap().starts_with("Basic "));
        tracer.stop().await;
    }

    #[tokio::test]
    async fn per_event_rejections_are_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public/ingestion"))
            .respond_with(ResponseTemplate::new(207).set_body_json(json!({
                "successes": [{"id": "a"}],
                "errors": [{"id": "b", "status": 400, "message": "bad span"}],
            })))
            .mount(&server)
            .await;
        let tracer = tracer_for(&server);

        let trace = tracer.start_trace("t");
        tracer.start_phase(&trace, "PLAN");
        // Rejections are logged, not errors.
        tracer.flush().await.unwrap();
        tracer.stop().await;
    }

    #[tokio::test]
    async fn malformed_response_body_counts_as_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public/ingestion"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let tracer = tracer_for(&server);

        tracer.start_trace("t");
        tracer.flush().await.unwrap();

        // Nothing left to deliver: the batch was not re-queued.
        tracer.flush().await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        tracer.stop().await;
    }

    #[tokio::test]
    async fn server_error_propagates_and_requeues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public/ingestion"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let tracer = tracer_for(&server);

        tracer.start_trace("t");
        let err = tracer.flush().await.unwrap_err();
        assert!(matches!(err, AgentiumError::Http(_)));

        // The failed batch is still queued for retry.
        assert!(!tracer.pending.lock().unwrap().is_empty());
        tracer.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let server = MockServer::start().await;
        mock_ok(&server).await;
        let tracer = tracer_for(&server);
        tracer.stop().await;
        tracer.stop().await;
    }
}
