//! Hooks called by the engine around resolvers: field tracing and panic logging.

use std::any::Any;

use tracing::field;

use crate::context::Context;
use crate::error::panic_message;
use crate::graphql::Error;
use crate::json_ext::Object;

pub const FIELD_SPAN_NAME: &str = "graphql.field";

/// Closes a field trace. Called exactly once per resolution attempt, with the
/// error the field resolved to, if any.
pub type TraceFieldFinish = Box<dyn FnOnce(Option<&Error>) + Send>;

/// Opens a trace around every field resolution.
pub trait Tracer: Send + Sync + 'static {
    /// Returns the context the resolver runs with, and the callback closing the trace.
    fn trace_field(
        &self,
        context: &Context,
        label: &str,
        type_name: &str,
        field_name: &str,
        trivial: bool,
        arguments: &Object,
    ) -> (Context, TraceFieldFinish);
}

/// Reports panics recovered while executing.
pub trait Logger: Send + Sync + 'static {
    fn log_panic(&self, context: &Context, value: &(dyn Any + Send));
}

/// One `tracing` span per resolved field.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTracer;

impl Tracer for TracingTracer {
    fn trace_field(
        &self,
        context: &Context,
        label: &str,
        type_name: &str,
        field_name: &str,
        trivial: bool,
        arguments: &Object,
    ) -> (Context, TraceFieldFinish) {
        let span = tracing::info_span!(
            parent: context.span(),
            FIELD_SPAN_NAME,
            "otel.kind" = "INTERNAL",
            "graphql.field.label" = label,
            "graphql.type.name" = type_name,
            "graphql.field.name" = field_name,
            "graphql.field.trivial" = trivial,
            "graphql.field.arguments" = field::Empty,
            "otel.status_code" = field::Empty,
            "graphql.error.message" = field::Empty,
        );
        if !arguments.is_empty() {
            if let Ok(arguments) = serde_json::to_string(arguments) {
                span.record("graphql.field.arguments", arguments.as_str());
            }
        }

        let finish_span = span.clone();
        let finish: TraceFieldFinish = Box::new(move |error: Option<&Error>| match error {
            Some(error) => {
                finish_span.record("otel.status_code", "ERROR");
                finish_span.record("graphql.error.message", error.message.as_str());
            }
            None => {
                finish_span.record("otel.status_code", "OK");
            }
        });

        (context.with_span(span), finish)
    }
}

/// Does not trace anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn trace_field(
        &self,
        context: &Context,
        _label: &str,
        _type_name: &str,
        _field_name: &str,
        _trivial: bool,
        _arguments: &Object,
    ) -> (Context, TraceFieldFinish) {
        (context.clone(), Box::new(|_| {}))
    }
}

/// Logs panics as `tracing` errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log_panic(&self, context: &Context, value: &(dyn Any + Send)) {
        tracing::error!(
            parent: context.span(),
            panic = %panic_message(value),
            "graphql: panic occurred"
        );
    }
}
