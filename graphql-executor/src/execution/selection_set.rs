use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinError;

use super::ExecutionState;
use crate::context::Context;
use crate::error::ExecutionError;
use crate::json_ext::ResponsePath;
use crate::spec::has_async_sel;
use crate::spec::Resolvable;
use crate::spec::SchemaField;
use crate::spec::Selection;
use crate::spec::TypenameField;

/// Where a field stands. Written by the task executing the field, read when
/// its parent object is assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Completion {
    Pending,
    Running,
    Done,
}

#[derive(Debug)]
struct FieldOutput {
    completion: Completion,
    out: Vec<u8>,
}

/// A field of a selection set, after merging same-alias selections, bound
/// to the value it is resolved against.
pub(crate) struct FieldToExec {
    pub(crate) field: Arc<SchemaField>,
    pub(crate) selections: Vec<Selection>,
    pub(crate) resolver: Arc<dyn Resolvable>,
    output: Mutex<FieldOutput>,
}

impl FieldToExec {
    fn new(field: Arc<SchemaField>, resolver: Arc<dyn Resolvable>) -> Self {
        Self {
            selections: field.selections.clone(),
            field,
            resolver,
            output: Mutex::new(FieldOutput {
                completion: Completion::Pending,
                out: Vec::new(),
            }),
        }
    }

    pub(crate) fn start(&self) {
        let mut output = self.output.lock();
        if output.completion == Completion::Pending {
            output.completion = Completion::Running;
        }
    }

    /// Publishes the serialized value of the field.
    pub(crate) fn complete(&self, out: Vec<u8>) {
        let mut output = self.output.lock();
        if output.completion == Completion::Done {
            failfast_error!(field = %self.field.alias, "field completed twice");
            return;
        }
        output.out = out;
        output.completion = Completion::Done;
    }

    /// Publishes `null` for a field whose task ended without completing it.
    fn abandon(&self) {
        let mut output = self.output.lock();
        if output.completion != Completion::Done {
            output.out = b"null".to_vec();
            output.completion = Completion::Done;
        }
    }

    #[cfg(test)]
    pub(crate) fn completion(&self) -> Completion {
        self.output.lock().completion
    }
}

/// Flattens `selections` against `target` into the fields to execute.
///
/// Fields sharing an alias are merged: the first occurrence is kept, and the
/// sub-selections of the later ones are appended to it. Type assertions are
/// inlined when `target` is of the asserted type and dropped otherwise.
/// `__typename` is answered right away and never merged.
pub(crate) fn collect_fields(
    selections: &[Selection],
    target: &Arc<dyn Resolvable>,
) -> Vec<Arc<FieldToExec>> {
    let mut fields = Vec::new();
    let mut by_alias = HashMap::new();
    collect_fields_into(selections, target, &mut fields, &mut by_alias);
    fields.into_iter().map(Arc::new).collect()
}

fn collect_fields_into(
    selections: &[Selection],
    target: &Arc<dyn Resolvable>,
    fields: &mut Vec<FieldToExec>,
    by_alias: &mut HashMap<String, usize>,
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => match by_alias.get(&field.alias) {
                Some(&index) => {
                    fields[index]
                        .selections
                        .extend(field.selections.iter().cloned());
                }
                None => {
                    by_alias.insert(field.alias.clone(), fields.len());
                    fields.push(FieldToExec::new(field.clone(), target.clone()));
                }
            },
            Selection::Typename(typename) => {
                let field = SchemaField::typename(
                    &typename.alias,
                    &typename.name,
                    type_of(typename, target),
                );
                fields.push(FieldToExec::new(Arc::new(field), target.clone()));
            }
            Selection::TypeAssertion(assertion) => {
                if let Some(narrowed) = target.assert_type(&assertion.type_name) {
                    collect_fields_into(&assertion.selections, &narrowed, fields, by_alias);
                }
            }
        }
    }
}

/// The concrete type name of `target`: the first asserted type it can be
/// viewed as, or the static name.
pub(crate) fn type_of(typename: &TypenameField, target: &Arc<dyn Resolvable>) -> String {
    typename
        .type_assertions
        .iter()
        .find(|type_name| target.assert_type(type_name).is_some())
        .unwrap_or(&typename.name)
        .clone()
}

impl ExecutionState {
    /// Executes a selection set against `target` and writes the resulting
    /// JSON object to `out`.
    ///
    /// Fields run concurrently when the set holds asynchronous work and
    /// `serially` is not requested. The wait ends when every field is done
    /// or `context` is, whichever comes first: fields that did not finish
    /// are reported as `null` with the context error. A non-null field that
    /// is `null` or unfinished nulls the whole object.
    pub(crate) async fn exec_selections(
        self: &Arc<Self>,
        context: &Context,
        selections: &[Selection],
        path: Option<&Arc<ResponsePath>>,
        target: &Arc<dyn Resolvable>,
        serially: bool,
        out: &mut Vec<u8>,
    ) {
        let concurrent = !serially && has_async_sel(selections);
        let fields = collect_fields(selections, target);

        let paths: Vec<_> = fields
            .iter()
            .map(|field| ResponsePath::child(path, field.field.alias.as_str()))
            .collect();

        if concurrent {
            let tasks: Vec<_> = fields
                .iter()
                .zip(&paths)
                .map(|(field, field_path)| {
                    let state = self.clone();
                    let context = context.clone();
                    let field = field.clone();
                    let field_path = field_path.clone();
                    tokio::spawn(async move {
                        state
                            .exec_field_selection(&context, &field, &field_path, true)
                            .await
                    })
                })
                .collect();
            tokio::select! {
                joined = join_all(tasks) => {
                    for ((field, field_path), joined) in fields.iter().zip(&paths).zip(joined) {
                        if let Err(error) = joined {
                            self.handle_task_failure(context, field, field_path, error);
                        }
                    }
                }
                error = context.done() => {
                    tracing::debug!(%error, "stopped waiting for fields");
                }
            }
        } else {
            for (field, field_path) in fields.iter().zip(&paths) {
                self.exec_field_selection(context, field, field_path, true)
                    .await;
            }
        }

        self.assemble(context, &fields, path, out);
    }

    fn assemble(
        &self,
        context: &Context,
        fields: &[Arc<FieldToExec>],
        path: Option<&Arc<ResponsePath>>,
        out: &mut Vec<u8>,
    ) {
        out.push(b'{');
        for (i, field) in fields.iter().enumerate() {
            let output = field.output.lock();
            let finished = output.completion == Completion::Done;
            let alias = field.field.alias.as_str();

            if output.completion == Completion::Running {
                tracing::debug!(field = %alias, "resolver still running at assembly");
            }

            if field.field.field_type.is_non_null() && (!finished || output.out == b"null") {
                if !finished {
                    self.add_unfinished_error(context, path, alias);
                }
                out.clear();
                out.extend_from_slice(b"null");
                return;
            }

            if i > 0 {
                out.push(b',');
            }
            out.push(b'"');
            out.extend_from_slice(alias.as_bytes());
            out.extend_from_slice(b"\":");
            if finished {
                out.extend_from_slice(&output.out);
            } else {
                self.add_unfinished_error(context, path, alias);
                out.extend_from_slice(b"null");
            }
        }
        out.push(b'}');
    }

    /// A field task died outside of the field's own panic recovery.
    fn handle_task_failure(
        &self,
        context: &Context,
        field: &FieldToExec,
        path: &Arc<ResponsePath>,
        error: JoinError,
    ) {
        if error.is_panic() {
            let payload = error.into_panic();
            self.handle_panic(
                context,
                payload.as_ref(),
                Some(ResponsePath::to_path(Some(path))),
            );
        } else {
            failfast_error!(%error, field = %field.field.alias, "field task failed");
        }
        field.abandon();
    }

    fn add_unfinished_error(
        &self,
        context: &Context,
        path: Option<&Arc<ResponsePath>>,
        alias: &str,
    ) {
        let error = context
            .err()
            .map(ExecutionError::from)
            .unwrap_or(ExecutionError::Incomplete);
        self.add_execution_error(error, Some(ResponsePath::to_path_with(path, alias)));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::execution::tests::TestObject;
    use crate::spec::FieldResolver;
    use crate::spec::FieldType;
    use crate::spec::TypeAssertion;

    fn field(name: &str, alias: &str, selections: Vec<Selection>) -> Selection {
        SchemaField::builder()
            .name(name)
            .alias(alias)
            .type_name("Query")
            .field_type(FieldType::object("User"))
            .resolver(FieldResolver::Field(0))
            .selections(selections)
            .build()
            .into()
    }

    fn leaf(name: &str) -> Selection {
        SchemaField::builder()
            .name(name)
            .type_name("User")
            .field_type(FieldType::scalar("String"))
            .resolver(FieldResolver::Field(0))
            .build()
            .into()
    }

    fn aliases(fields: &[Arc<FieldToExec>]) -> Vec<&str> {
        fields.iter().map(|f| f.field.alias.as_str()).collect()
    }

    #[test]
    fn merges_same_alias_keeping_first_position() {
        let target: Arc<dyn Resolvable> = Arc::new(TestObject::new("Query"));
        let selections = vec![
            field("user", "user", vec![leaf("name")]),
            field("user", "other", vec![]),
            field("user", "user", vec![leaf("email")]),
        ];

        let fields = collect_fields(&selections, &target);
        assert_eq!(aliases(&fields), vec!["user", "other"]);

        let merged: Vec<&str> = fields[0]
            .selections
            .iter()
            .map(|selection| match selection {
                Selection::Field(field) => field.name.as_str(),
                _ => "?",
            })
            .collect();
        assert_eq!(merged, vec!["name", "email"]);
        assert_eq!(fields[0].completion(), Completion::Pending);
    }

    #[test]
    fn inlines_matching_type_assertions_only() {
        let target: Arc<dyn Resolvable> =
            Arc::new(TestObject::new("Human").implements(["Character"]));
        let selections = vec![
            leaf("id"),
            TypeAssertion::new("Droid", vec![leaf("primaryFunction")]).into(),
            TypeAssertion::new("Human", vec![leaf("height"), leaf("id")]).into(),
        ];

        let fields = collect_fields(&selections, &target);
        assert_eq!(aliases(&fields), vec!["id", "height"]);
    }

    #[test]
    fn typename_picks_first_matching_assertion() {
        let typename = TypenameField::new("Character")
            .with_type_assertions(["Droid", "Human", "Character"]);

        let human: Arc<dyn Resolvable> =
            Arc::new(TestObject::new("Human").implements(["Character"]));
        assert_eq!(type_of(&typename, &human), "Human");

        let unknown: Arc<dyn Resolvable> = Arc::new(TestObject::new("Robot"));
        assert_eq!(type_of(&typename, &unknown), "Character");

        let fields = collect_fields(&[typename.with_alias("kind").into()], &human);
        assert_eq!(aliases(&fields), vec!["kind"]);
        assert!(fields[0].field.fixed_result.is_some());
    }
}
