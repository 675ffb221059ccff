//! Concatenation of operations into one composite operation.

use crate::error::{CollisionError, ComposeError, ComposeResult};
use gqlfuse_syntax::OperationDefinition;
use rustc_hash::FxHashSet;
use tracing::error;

/// Merges `b` into `a`.
///
/// Variables and top-level fields are concatenated, `a`'s first. Name and
/// kind come from `a`. `merge(None, b)` is `b`, so a batch can be built with
/// a left fold.
///
/// Both operations must be of the same kind and must not share a variable
/// name or a top-level response key.
pub fn merge(
    a: Option<OperationDefinition>,
    b: OperationDefinition,
) -> ComposeResult<OperationDefinition> {
    let Some(a) = a else {
        return Ok(b);
    };

    if a.kind != b.kind {
        return Err(ComposeError::shape(format!(
            "cannot merge a {} into a {}",
            b.kind, a.kind
        )));
    }

    check_disjoint(&a, &b)?;

    let selection_set = a.selection_set.concat(&b.selection_set);
    let mut variables = a.variables;
    variables.extend(b.variables);

    Ok(OperationDefinition {
        kind: a.kind,
        name: a.name,
        variables,
        selection_set,
    })
}

fn check_disjoint(a: &OperationDefinition, b: &OperationDefinition) -> Result<(), CollisionError> {
    let names: FxHashSet<&str> = a.variables.iter().map(|v| v.name.as_str()).collect();
    if let Some(var) = b.variables.iter().find(|v| names.contains(v.name.as_str())) {
        let err = CollisionError::Variable {
            name: var.name.clone(),
        };
        error!(error = %err, "merge collision");
        return Err(err);
    }

    let keys: FxHashSet<&str> = a.fields().iter().map(|f| f.response_key()).collect();
    if let Some(field) = b.fields().iter().find(|f| keys.contains(f.response_key())) {
        let err = CollisionError::ResponseKey {
            key: field.response_key().to_string(),
        };
        error!(error = %err, "merge collision");
        return Err(err);
    }

    Ok(())
}

/// Left fold of [`merge`]. Returns `None` for an empty input.
pub fn merge_all(
    ops: impl IntoIterator<Item = OperationDefinition>,
) -> ComposeResult<Option<OperationDefinition>> {
    ops.into_iter()
        .try_fold(None, |acc, op| merge(acc, op).map(Some))
}
