//! Observability tracing for the task/phase/generation hierarchy.
//!
//! Each task gets a trace, each phase a span, each worker/reviewer/judge
//! invocation a generation. Export is batched, at-least-once, and never
//! fatal to the pipeline.
//!
//! # Main types
//!
//! - [`Tracer`] — the tracing interface; [`NoopTracer`] is always
//!   available.
//! - [`HttpTracer`] / [`ExporterConfig`] — the batched ingestion-API
//!   exporter.
//! - [`GenerationInput`] — one recorded LLM invocation.

/// Batched HTTP export.
pub mod exporter;
/// Trace/span/generation records.
pub mod model;
/// The tracer interface and no-op implementation.
pub mod tracer;

pub use exporter::{ExporterConfig, HttpTracer, DEFAULT_BATCH_MAX_BYTES, DEFAULT_BATCH_MAX_EVENTS};
pub use model::{
    GenerationInput, GenerationName, GenerationStatus, PhaseEnd, SpanCtx, TraceCtx, TraceEnd,
};
pub use tracer::{NoopTracer, Tracer};
