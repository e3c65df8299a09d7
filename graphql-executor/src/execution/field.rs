use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::Instrument;

use super::selection_set::FieldToExec;
use super::ExecutionState;
use crate::context::Context;
use crate::error::ExecutionError;
use crate::graphql::Error;
use crate::json_ext::ResponsePath;
use crate::spec::FieldResolver;
use crate::spec::MethodCall;
use crate::spec::Resolved;

impl ExecutionState {
    /// Resolves one field and serializes its value into the field's output.
    ///
    /// With `apply_limiter`, the resolver only runs once an admission token
    /// is available, and the token is given back before sub-selections
    /// execute. Resolver errors and panics are recorded at the field's path
    /// and the field becomes `null`. The field is marked done in every case.
    pub(crate) async fn exec_field_selection(
        self: &Arc<Self>,
        context: &Context,
        field: &FieldToExec,
        path: &Arc<ResponsePath>,
        apply_limiter: bool,
    ) {
        field.start();

        let permit = if apply_limiter {
            // The pool lives as long as the request and is never closed.
            self.limiter.acquire().await.ok()
        } else {
            None
        };

        let schema_field = &field.field;
        let (traced, finish) = self.tracer.trace_field(
            context,
            &schema_field.trace_label,
            &schema_field.type_name,
            &schema_field.name,
            !schema_field.is_async,
            &schema_field.arguments,
        );

        let resolved = AssertUnwindSafe(self.resolve(&traced, field, path))
            .catch_unwind()
            .await;
        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(payload) => {
                self.logger.log_panic(&traced, payload.as_ref());
                Err(ExecutionError::from_panic(payload.as_ref()).to_graphql_error(
                    Some(ResponsePath::to_path(Some(path))),
                    self.include_error_codes,
                ))
            }
        };
        drop(permit);

        let out = match &resolved {
            Err(error) => {
                self.add_error(error.clone());
                b"null".to_vec()
            }
            Ok(value) => {
                let mut out = Vec::new();
                let executed = AssertUnwindSafe(self.exec_selection_set(
                    &traced,
                    &field.selections,
                    &schema_field.field_type,
                    Some(path),
                    value.clone(),
                    &mut out,
                ))
                .catch_unwind()
                .await;
                if let Err(payload) = executed {
                    self.handle_panic(
                        &traced,
                        payload.as_ref(),
                        Some(ResponsePath::to_path(Some(path))),
                    );
                    out.clear();
                    out.extend_from_slice(b"null");
                }
                out
            }
        };

        field.complete(out);
        finish(resolved.as_ref().err());
    }

    /// Obtains the value of a field from its parent.
    async fn resolve(
        &self,
        context: &Context,
        field: &FieldToExec,
        path: &Arc<ResponsePath>,
    ) -> Result<Resolved, Error> {
        let schema_field = &field.field;
        if let Some(fixed) = &schema_field.fixed_result {
            return Ok(fixed.clone());
        }

        if let Some(error) = context.err() {
            return Err(ExecutionError::from(error).to_graphql_error(
                Some(ResponsePath::to_path(Some(path))),
                self.include_error_codes,
            ));
        }

        match &schema_field.resolver {
            FieldResolver::Field(index) => Ok(field.resolver.field(*index)),
            FieldResolver::Method(method) => {
                let call = MethodCall {
                    context: method.has_context.then(|| context.clone()),
                    arguments: method.has_args.then(|| schema_field.arguments.clone()),
                };
                match field
                    .resolver
                    .call(method, call)
                    .instrument(context.span().clone())
                    .await
                {
                    Ok(value) => Ok(value),
                    Err(error) if method.has_error => {
                        Err(error.to_graphql_error(ResponsePath::to_path(Some(path))))
                    }
                    Err(error) => {
                        failfast_debug!(
                            method = %method.name,
                            %error,
                            "infallible resolver returned an error"
                        );
                        panic!(
                            "resolver {}.{} returned an error: {error}",
                            schema_field.type_name, method.name
                        )
                    }
                }
            }
        }
    }
}
