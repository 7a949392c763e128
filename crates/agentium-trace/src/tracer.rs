use crate::model::{GenerationInput, PhaseEnd, SpanCtx, TraceCtx, TraceEnd};
use agentium_core::AgentiumResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Observability tracer over the task/phase/generation hierarchy.
///
/// Components hold only the opaque [`TraceCtx`]/[`SpanCtx`] handles; the
/// tracer owns every node. Failures are the tracer's own business — the
/// controller treats them as non-fatal.
#[async_trait]
pub trait Tracer: Send + Sync {
    /// Open a trace for one task.
    fn start_trace(&self, task_id: &str) -> TraceCtx;

    /// Open a span for one phase of a task.
    fn start_phase(&self, trace: &TraceCtx, phase_name: &str) -> SpanCtx;

    /// Record one LLM invocation under a phase.
    fn record_generation(&self, span: &SpanCtx, generation: GenerationInput);

    /// Record that a component was skipped in this phase.
    fn record_skipped(&self, span: &SpanCtx, component: &str, reason: &str);

    /// Close a phase span.
    fn end_phase(&self, span: &SpanCtx, end: PhaseEnd);

    /// Close a task trace with session totals.
    fn complete_trace(&self, trace: &TraceCtx, end: TraceEnd);

    /// Push every pending event to the backend. Network failures and
    /// non-2xx responses propagate.
    async fn flush(&self) -> AgentiumResult<()>;

    /// Stop the background exporter. Safe to call more than once.
    async fn stop(&self);
}

/// Tracer that records nothing. Always available as the fallback when no
/// exporter is configured.
pub struct NoopTracer;

#[async_trait]
impl Tracer for NoopTracer {
    fn start_trace(&self, task_id: &str) -> TraceCtx {
        TraceCtx {
            trace_id: Uuid::new_v4(),
            task_id: task_id.to_string(),
        }
    }

    fn start_phase(&self, trace: &TraceCtx, phase_name: &str) -> SpanCtx {
        SpanCtx {
            trace_id: trace.trace_id,
            span_id: Uuid::new_v4(),
            phase_name: phase_name.to_string(),
        }
    }

    fn record_generation(&self, _span: &SpanCtx, _generation: GenerationInput) {}

    fn record_skipped(&self, _span: &SpanCtx, _component: &str, _reason: &str) {}

    fn end_phase(&self, _span: &SpanCtx, _end: PhaseEnd) {}

    fn complete_trace(&self, _trace: &TraceCtx, _end: TraceEnd) {}

    async fn flush(&self) -> AgentiumResult<()> {
        Ok(())
    }

    async fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_tracer_hands_out_linked_contexts() {
        let tracer = NoopTracer;
        let trace = tracer.start_trace("task-1");
        let span = tracer.start_phase(&trace, "PLAN");
        assert_eq!(span.trace_id, trace.trace_id);
        assert_eq!(span.phase_name, "PLAN");

        tracer.record_skipped(&span, "Reviewer", "no reviewer configured");
        tracer.end_phase(&span, PhaseEnd::default());
        tracer.complete_trace(&trace, TraceEnd::default());
        tracer.flush().await.unwrap();
        tracer.stop().await;
        tracer.stop().await;
    }
}
