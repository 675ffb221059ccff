//! Loading template operations from GraphQL source text.

use crate::error::{ComposeError, ComposeResult};
use gqlfuse_core::DiagnosticSeverity;
use gqlfuse_syntax::{parse, OperationDefinition};

/// Parses `source` and selects one operation.
///
/// With `name`, the operation of that name is returned; without it the
/// document must hold exactly one operation. Any error diagnostic fails the
/// whole parse; warnings are dropped.
pub fn parse_operation(source: &str, name: Option<&str>) -> ComposeResult<OperationDefinition> {
    let result = parse(source);
    if result.diagnostics.has_errors() {
        let diagnostics: Vec<_> = result
            .diagnostics
            .into_iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .collect();
        let rendered = diagnostics
            .iter()
            .map(|d| d.render(source))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ComposeError::Parse {
            diagnostics,
            rendered,
        });
    }

    let document = result.document;
    match name {
        Some(name) => document
            .operation(name)
            .cloned()
            .ok_or_else(|| ComposeError::OperationNotFound {
                name: name.to_string(),
            }),
        None => document
            .single_operation()
            .cloned()
            .ok_or(ComposeError::NoOperation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlfuse_core::codes;

    const ALERTS: &str = r#"
        query AlertQuery($id: ID!) { alert(id: $id) { id } }
        mutation CreateAlertMutation($input: CreateAlertInput!) {
            createAlert(input: $input) { id }
        }
    "#;

    #[test]
    fn test_select_by_name() {
        let op = parse_operation(ALERTS, Some("CreateAlertMutation")).unwrap();
        assert_eq!(op.name.as_deref(), Some("CreateAlertMutation"));
        assert_eq!(op.single_field().unwrap().name, "createAlert");
    }

    #[test]
    fn test_missing_name() {
        let err = parse_operation(ALERTS, Some("Nope")).unwrap_err();
        assert!(matches!(err, ComposeError::OperationNotFound { ref name } if name == "Nope"));
    }

    #[test]
    fn test_unnamed_selection_needs_single_operation() {
        assert!(matches!(
            parse_operation(ALERTS, None).unwrap_err(),
            ComposeError::NoOperation
        ));
        assert!(parse_operation("{ a }", None).is_ok());
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_operation("query { a { ...F } }", None).unwrap_err();
        let ComposeError::Parse { diagnostics, .. } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(diagnostics[0].code, codes::UNSUPPORTED_SELECTION);
    }

    #[test]
    fn test_parse_error_points_at_source() {
        let err = parse_operation("query {\n  a(x: 1e400)\n}", None).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("template failed to parse with 1 error(s):"));
        assert!(message.contains("--> 2:8:"), "{message}");
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let op = parse_operation("query { a(id: $id) }", None).unwrap();
        assert_eq!(op.variable_references(), ["id"]);
    }
}
