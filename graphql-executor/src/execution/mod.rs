//! Executes an operation against the resolver graph.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::configuration::ExecutionConfig;
use crate::context::Context;
use crate::error::ExecutionError;
use crate::graphql::Error;
use crate::graphql::ErrorCollector;
use crate::graphql::Response;
use crate::json_ext::Path;
use crate::spec::Operation;
use crate::spec::OperationKind;
use crate::spec::Schema;
use crate::trace::Logger;
use crate::trace::Tracer;
use crate::trace::TracingLogger;
use crate::trace::TracingTracer;

mod dispatch;
mod field;
mod list;
mod selection_set;

pub(crate) const EXECUTION_SPAN_NAME: &str = "graphql.execute";

/// One execution of one operation.
///
/// Holds the request-wide admission pool and the errors collected while
/// executing. A request is consumed by [`Request::execute`].
pub struct Request {
    state: Arc<ExecutionState>,
}

/// Shared by every task spawned for a request.
pub(crate) struct ExecutionState {
    /// Admission pool bounding the resolvers running at once.
    limiter: Semaphore,
    /// Size of the admission pools; also used for per-list pools.
    capacity: usize,
    tracer: Arc<dyn Tracer>,
    logger: Arc<dyn Logger>,
    include_error_codes: bool,
    subscribe_resolver_timeout: Duration,
    errors: ErrorCollector,
}

impl Request {
    pub fn new(
        config: &ExecutionConfig,
        tracer: Arc<dyn Tracer>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let capacity = config.capacity();
        Self {
            state: Arc::new(ExecutionState {
                limiter: Semaphore::new(capacity),
                capacity,
                tracer,
                logger,
                include_error_codes: config.include_error_codes,
                subscribe_resolver_timeout: config.subscribe_resolver_timeout,
                errors: ErrorCollector::default(),
            }),
        }
    }

    /// A request tracing fields and logging panics through `tracing`.
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(config, Arc::new(TracingTracer), Arc::new(TracingLogger))
    }

    /// Timeout that long-lived subscription resolvers should apply. Zero means none.
    pub fn subscribe_resolver_timeout(&self) -> Duration {
        self.state.subscribe_resolver_timeout
    }

    /// Executes `operation` and returns the serialized `data` with the errors
    /// collected along the way.
    ///
    /// Mutations run their top-level fields one after the other. When
    /// `context` is cancelled or times out, whatever was resolved until then
    /// is returned: fields still running are reported as `null` with an error.
    pub async fn execute(
        self,
        context: &Context,
        schema: &Schema,
        operation: &Operation,
    ) -> Response {
        let span = tracing::info_span!(
            parent: context.span(),
            EXECUTION_SPAN_NAME,
            "otel.kind" = "INTERNAL",
            "graphql.operation.kind" = operation.kind.as_str(),
            "graphql.operation.name" = operation.name.as_deref().unwrap_or_default(),
        );
        let context = context.with_span(span.clone());
        let state = self.state;

        let serially = operation.kind == OperationKind::Mutation;
        let mut out = Vec::new();
        let traversal = AssertUnwindSafe(state.exec_selections(
            &context,
            &operation.selections,
            None,
            schema.root(),
            serially,
            &mut out,
        ))
        .catch_unwind()
        .instrument(span)
        .await;

        if let Err(payload) = traversal {
            state.handle_panic(&context, payload.as_ref(), None);
            out.clear();
            out.extend_from_slice(b"null");
        }

        if let Some(error) = context.err() {
            tracing::debug!(%error, "execution interrupted, returning partial data");
        }

        Response {
            data: Bytes::from(out),
            errors: state.errors.snapshot(),
        }
    }
}

impl ExecutionState {
    pub(crate) fn add_error(&self, error: Error) {
        self.errors.push(error);
    }

    pub(crate) fn add_execution_error(&self, error: ExecutionError, path: Option<Path>) {
        self.errors
            .push(error.to_graphql_error(path, self.include_error_codes));
    }

    /// Logs a recovered panic and records it as an error.
    pub(crate) fn handle_panic(
        &self,
        context: &Context,
        payload: &(dyn Any + Send),
        path: Option<Path>,
    ) {
        self.logger.log_panic(context, payload);
        self.add_execution_error(ExecutionError::from_panic(payload), path);
    }
}
