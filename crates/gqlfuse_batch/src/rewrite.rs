//! Pure rewrites of a single operation: aliasing, variable renaming and
//! prefixing.
//!
//! Every rewrite returns a new operation. Subtrees that the rewrite does not
//! touch are shared with the input through their `Arc`ed selection sets.

use crate::error::{CollisionError, ComposeError, ComposeResult};
use gqlfuse_syntax::{Argument, Directive, Field, OperationDefinition, SelectionSet, Value};
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::hash::BuildHasher;
use tracing::error;

/// Sets the alias of the operation's only top-level field, replacing any
/// existing alias.
pub fn set_alias(op: &OperationDefinition, alias: &str) -> ComposeResult<OperationDefinition> {
    let Some(field) = op.single_field() else {
        return Err(ComposeError::shape(format!(
            "expected exactly one top-level field, found {}",
            op.fields().len()
        )));
    };

    let mut field = field.clone();
    field.alias = Some(alias.to_string());

    Ok(OperationDefinition {
        selection_set: SelectionSet::new(vec![field]),
        ..op.clone()
    })
}

/// Renames variables in declarations and in every reference.
///
/// Names missing from `rename` are left alone. Fails if two variables would
/// end up sharing a name.
pub fn rename_variables<S: BuildHasher>(
    op: &OperationDefinition,
    rename: &HashMap<String, String, S>,
) -> ComposeResult<OperationDefinition> {
    check_rename(op, rename)?;

    let variables = op
        .variables
        .iter()
        .map(|var| match rename.get(&var.name) {
            Some(to) => {
                let mut var = var.clone();
                var.name.clone_from(to);
                var
            }
            None => var.clone(),
        })
        .collect();

    let selection_set = rename_in_set(&op.selection_set, rename)
        .unwrap_or_else(|| op.selection_set.clone());

    Ok(OperationDefinition {
        kind: op.kind,
        name: op.name.clone(),
        variables,
        selection_set,
    })
}

/// Prefixes every variable and every top-level response key with `prefix`.
///
/// Unlike [`set_alias`] this accepts operations with several top-level
/// fields; a field without an alias gets its prefixed name as one.
pub fn prefix_operation(
    op: &OperationDefinition,
    prefix: &str,
) -> ComposeResult<OperationDefinition> {
    let mut rename = FxHashMap::default();
    let declared = op.variables.iter().map(|var| var.name.as_str());
    for name in declared.chain(op.variable_references()) {
        rename
            .entry(name.to_string())
            .or_insert_with(|| format!("{prefix}{name}"));
    }

    let mut op = rename_variables(op, &rename)?;
    op.selection_set = op
        .fields()
        .iter()
        .map(|field| {
            let mut field = field.clone();
            field.alias = Some(format!("{prefix}{}", field.response_key()));
            field
        })
        .collect();
    Ok(op)
}

fn check_rename<S: BuildHasher>(
    op: &OperationDefinition,
    rename: &HashMap<String, String, S>,
) -> Result<(), CollisionError> {
    let mut sources: Vec<(&String, &String)> = rename.iter().collect();
    sources.sort();

    let mut targets: FxHashMap<&str, &str> = FxHashMap::default();
    for (from, to) in sources {
        if let Some(first) = targets.insert(to, from) {
            let err = CollisionError::Rename {
                first: first.to_string(),
                second: from.clone(),
                target: to.clone(),
            };
            error!(error = %err, "variable rename collision");
            return Err(err);
        }
    }

    for var in &op.variables {
        if rename.contains_key(&var.name) {
            continue;
        }
        if let Some(from) = targets.get(var.name.as_str()) {
            let err = CollisionError::Rename {
                first: (*from).to_string(),
                second: var.name.clone(),
                target: var.name.clone(),
            };
            error!(error = %err, "variable renamed onto a declared variable");
            return Err(err);
        }
    }

    Ok(())
}

/// Returns `None` when nothing in `set` references a renamed variable.
fn rename_in_set<S: BuildHasher>(
    set: &SelectionSet,
    rename: &HashMap<String, String, S>,
) -> Option<SelectionSet> {
    let renamed: Vec<Option<Field>> = set
        .fields()
        .iter()
        .map(|field| rename_in_field(field, rename))
        .collect();

    if renamed.iter().all(Option::is_none) {
        return None;
    }

    Some(
        renamed
            .into_iter()
            .zip(set.fields())
            .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
            .collect(),
    )
}

fn rename_in_field<S: BuildHasher>(
    field: &Field,
    rename: &HashMap<String, String, S>,
) -> Option<Field> {
    let nested = field
        .selection_set
        .as_ref()
        .and_then(|set| rename_in_set(set, rename));
    let renamed = |name: &str| rename.contains_key(name);
    let own = field
        .arguments
        .iter()
        .chain(field.directives.iter().flat_map(|d| &d.arguments))
        .any(|arg| arg.value.references_variable(&renamed));
    if !own && nested.is_none() {
        return None;
    }

    let selection_set = nested.or_else(|| field.selection_set.clone());

    Some(Field {
        alias: field.alias.clone(),
        name: field.name.clone(),
        arguments: rename_in_arguments(&field.arguments, rename),
        directives: field
            .directives
            .iter()
            .map(|directive| Directive {
                name: directive.name.clone(),
                arguments: rename_in_arguments(&directive.arguments, rename),
            })
            .collect(),
        selection_set,
    })
}

fn rename_in_arguments<S: BuildHasher>(
    args: &[Argument],
    rename: &HashMap<String, String, S>,
) -> Vec<Argument> {
    args.iter()
        .map(|arg| Argument {
            name: arg.name.clone(),
            value: rename_in_value(&arg.value, rename),
        })
        .collect()
}

fn rename_in_value<S: BuildHasher>(
    value: &Value,
    rename: &HashMap<String, String, S>,
) -> Value {
    match value {
        Value::Variable(name) => match rename.get(name) {
            Some(to) => Value::Variable(to.clone()),
            None => value.clone(),
        },
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| rename_in_value(item, rename))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), rename_in_value(value, rename)))
                .collect(),
        ),
        _ => value.clone(),
    }
}
