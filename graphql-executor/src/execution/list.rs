use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::Semaphore;

use super::ExecutionState;
use crate::context::Context;
use crate::json_ext::ResponsePath;
use crate::spec::has_async_sel;
use crate::spec::FieldType;
use crate::spec::Resolved;
use crate::spec::Selection;

impl ExecutionState {
    /// Serializes the elements of a list, in order.
    ///
    /// Elements run concurrently when the element selections hold
    /// asynchronous work, at most `capacity` at a time. This pool is separate
    /// from the request-wide one. If the element type is non-null and any
    /// element is `null`, the whole list is `null`.
    pub(crate) async fn exec_list(
        self: &Arc<Self>,
        context: &Context,
        selections: &[Selection],
        element_type: &FieldType,
        path: Option<&Arc<ResponsePath>>,
        elements: Vec<Resolved>,
        out: &mut Vec<u8>,
    ) {
        let entries = if has_async_sel(selections) {
            self.exec_elements_concurrently(context, selections, element_type, path, elements)
                .await
        } else {
            let mut entries = Vec::with_capacity(elements.len());
            for (index, element) in elements.into_iter().enumerate() {
                let mut entry = Vec::new();
                let path = ResponsePath::child(path, index);
                self.exec_selection_set(
                    context,
                    selections,
                    element_type,
                    Some(&path),
                    element,
                    &mut entry,
                )
                .await;
                entries.push(entry);
            }
            entries
        };

        let non_null_elements = element_type.is_non_null();
        out.push(b'[');
        for (index, entry) in entries.iter().enumerate() {
            if non_null_elements && entry == b"null" {
                out.clear();
                out.extend_from_slice(b"null");
                return;
            }
            if index > 0 {
                out.push(b',');
            }
            out.extend_from_slice(entry);
        }
        out.push(b']');
    }

    async fn exec_elements_concurrently(
        self: &Arc<Self>,
        context: &Context,
        selections: &[Selection],
        element_type: &FieldType,
        path: Option<&Arc<ResponsePath>>,
        elements: Vec<Resolved>,
    ) -> Vec<Vec<u8>> {
        let pool = Arc::new(Semaphore::new(self.capacity));
        let selections: Arc<[Selection]> = selections.into();
        let element_type = Arc::new(element_type.clone());

        let mut tasks = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let permit = pool.clone().acquire_owned().await.ok();
            let state = self.clone();
            let context = context.clone();
            let selections = selections.clone();
            let element_type = element_type.clone();
            let path = ResponsePath::child(path, index);
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let mut entry = Vec::new();
                let executed = AssertUnwindSafe(state.exec_selection_set(
                    &context,
                    &selections,
                    &element_type,
                    Some(&path),
                    element,
                    &mut entry,
                ))
                .catch_unwind()
                .await;
                if let Err(payload) = executed {
                    state.handle_panic(
                        &context,
                        payload.as_ref(),
                        Some(ResponsePath::to_path(Some(&path))),
                    );
                    entry.clear();
                    entry.extend_from_slice(b"null");
                }
                entry
            }));
        }

        let mut entries = Vec::with_capacity(tasks.len());
        for (index, joined) in join_all(tasks).await.into_iter().enumerate() {
            match joined {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    if error.is_panic() {
                        let payload = error.into_panic();
                        self.handle_panic(
                            context,
                            payload.as_ref(),
                            Some(ResponsePath::to_path(Some(&ResponsePath::child(
                                path, index,
                            )))),
                        );
                    } else {
                        failfast_error!(%error, index, "list element task failed");
                    }
                    entries.push(b"null".to_vec());
                }
            }
        }
        entries
    }
}
