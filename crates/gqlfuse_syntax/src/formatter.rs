//! Prints the document model back to GraphQL query language.
//!
//! Output depends only on the AST, so equal documents print to identical
//! bytes.

use crate::ast::*;

/// Formatting options.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Number of spaces for indentation.
    pub indent_size: usize,
    /// Print everything on a single line.
    pub compact: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_size: 2,
            compact: false,
        }
    }
}

impl FormatOptions {
    /// Single-line output, as sent over the wire.
    #[must_use]
    pub fn compact() -> Self {
        Self {
            compact: true,
            ..Self::default()
        }
    }
}

/// GraphQL printer.
pub struct Formatter {
    options: FormatOptions,
    output: String,
    indent: usize,
}

impl Formatter {
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            output: String::new(),
            indent: 0,
        }
    }

    /// Formats a document, separating operations with a blank line.
    pub fn format(&mut self, document: &Document) -> String {
        self.output.clear();

        let separator = if self.options.compact { " " } else { "\n\n" };
        for (i, op) in document.definitions.iter().enumerate() {
            if i > 0 {
                self.output.push_str(separator);
            }
            self.write_operation(op);
        }

        std::mem::take(&mut self.output)
    }

    /// Formats a single operation.
    pub fn format_operation(&mut self, op: &OperationDefinition) -> String {
        self.output.clear();
        self.write_operation(op);
        std::mem::take(&mut self.output)
    }

    fn write_operation(&mut self, op: &OperationDefinition) {
        self.indent = 0;
        self.output.push_str(op.kind.as_str());
        if let Some(name) = &op.name {
            self.output.push(' ');
            self.output.push_str(name);
        }
        if !op.variables.is_empty() {
            self.output.push('(');
            for (i, var) in op.variables.iter().enumerate() {
                if i > 0 {
                    self.output.push_str(", ");
                }
                self.output.push('$');
                self.output.push_str(&var.name);
                self.output.push_str(": ");
                self.output.push_str(&var.ty.to_string());
                if let Some(default) = &var.default_value {
                    self.output.push_str(" = ");
                    self.write_value(default);
                }
            }
            self.output.push(')');
        }
        self.output.push(' ');
        self.write_selection_set(&op.selection_set);
    }

    fn write_selection_set(&mut self, set: &SelectionSet) {
        if self.options.compact {
            self.output.push('{');
            for field in set.fields() {
                self.output.push(' ');
                self.write_field(field);
            }
            self.output.push_str(" }");
            return;
        }

        self.output.push_str("{\n");
        self.indent += 1;
        for field in set.fields() {
            self.push_indent();
            self.write_field(field);
            self.output.push('\n');
        }
        self.indent -= 1;
        self.push_indent();
        self.output.push('}');
    }

    fn write_field(&mut self, field: &Field) {
        if let Some(alias) = &field.alias {
            self.output.push_str(alias);
            self.output.push_str(": ");
        }
        self.output.push_str(&field.name);
        self.write_arguments(&field.arguments);
        for directive in &field.directives {
            self.output.push_str(" @");
            self.output.push_str(&directive.name);
            self.write_arguments(&directive.arguments);
        }
        if let Some(set) = &field.selection_set {
            self.output.push(' ');
            self.write_selection_set(set);
        }
    }

    fn write_arguments(&mut self, arguments: &[Argument]) {
        if arguments.is_empty() {
            return;
        }
        self.output.push('(');
        for (i, arg) in arguments.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(&arg.name);
            self.output.push_str(": ");
            self.write_value(&arg.value);
        }
        self.output.push(')');
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Variable(name) => {
                self.output.push('$');
                self.output.push_str(name);
            }
            Value::Int(n) => self.output.push_str(&n.to_string()),
            // Debug keeps the fractional part (`1.0`), so floats stay floats.
            Value::Float(n) => self.output.push_str(&format!("{n:?}")),
            Value::String(s) => self.write_string(s),
            Value::Boolean(b) => self.output.push_str(if *b { "true" } else { "false" }),
            Value::Null => self.output.push_str("null"),
            Value::Enum(name) => self.output.push_str(name),
            Value::List(items) => {
                self.output.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_value(item);
                }
                self.output.push(']');
            }
            Value::Object(fields) => {
                self.output.push('{');
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.output.push_str(name);
                    self.output.push_str(": ");
                    self.write_value(value);
                }
                self.output.push('}');
            }
        }
    }

    fn write_string(&mut self, s: &str) {
        self.output.push('"');
        for c in s.chars() {
            match c {
                '"' => self.output.push_str("\\\""),
                '\\' => self.output.push_str("\\\\"),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                '\u{8}' => self.output.push_str("\\b"),
                '\u{c}' => self.output.push_str("\\f"),
                c if c.is_control() => {
                    self.output.push_str(&format!("\\u{:04X}", c as u32));
                }
                c => self.output.push(c),
            }
        }
        self.output.push('"');
    }

    fn push_indent(&mut self) {
        let width = self.indent * self.options.indent_size;
        self.output.extend(std::iter::repeat(' ').take(width));
    }
}

/// Formats a document with default options.
pub fn format(document: &Document) -> String {
    Formatter::new(FormatOptions::default()).format(document)
}

/// Formats a single operation with the given options.
pub fn format_operation(op: &OperationDefinition, options: FormatOptions) -> String {
    Formatter::new(options).format_operation(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn create_alert() -> OperationDefinition {
        OperationDefinition::new(
            OperationKind::Mutation,
            vec![Field::new("createAlert")
                .with_argument("input", Value::variable("input"))
                .with_selection(vec![
                    Field::new("_id").with_alias("number"),
                    Field::new("id"),
                ])],
        )
        .with_name("CreateAlertMutation")
        .with_variable(VariableDefinition::new(
            "input",
            Type::named("CreateAlertInput").non_null(),
        ))
    }

    #[test]
    fn test_format_pretty() {
        assert_snapshot!(format_operation(&create_alert(), FormatOptions::default()), @r###"
        mutation CreateAlertMutation($input: CreateAlertInput!) {
          createAlert(input: $input) {
            number: _id
            id
          }
        }
        "###);
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(
            format_operation(&create_alert(), FormatOptions::compact()),
            "mutation CreateAlertMutation($input: CreateAlertInput!) { createAlert(input: $input) { number: _id id } }"
        );
    }

    #[test]
    fn test_format_values() {
        let op = OperationDefinition::new(
            OperationKind::Query,
            vec![Field::new("search")
                .with_argument(
                    "filter",
                    Value::Object(vec![
                        ("term".to_string(), Value::String("a \"b\"\n".to_string())),
                        ("score".to_string(), Value::Float(1.0)),
                        (
                            "states".to_string(),
                            Value::List(vec![Value::Enum("OPEN".to_string()), Value::Null]),
                        ),
                        ("first".to_string(), Value::Int(-3)),
                        ("fav".to_string(), Value::Boolean(true)),
                    ]),
                )
                .with_directive(
                    Directive::new("include").with_argument("if", Value::variable("on")),
                )],
        )
        .with_variable(
            VariableDefinition::new("on", Type::named("Boolean").non_null())
                .with_default(Value::Boolean(false)),
        );

        assert_eq!(
            format_operation(&op, FormatOptions::compact()),
            r#"query($on: Boolean! = false) { search(filter: {term: "a \"b\"\n", score: 1.0, states: [OPEN, null], first: -3, fav: true}) @include(if: $on) }"#
        );
    }

    #[test]
    fn test_format_document_separates_operations() {
        let doc = Document {
            definitions: vec![
                OperationDefinition::new(OperationKind::Query, vec![Field::new("a")]),
                OperationDefinition::new(OperationKind::Query, vec![Field::new("b")]),
            ],
        };
        assert_eq!(format(&doc), "query {\n  a\n}\n\nquery {\n  b\n}");
    }

    #[test]
    fn test_equal_documents_print_identically() {
        let a = format_operation(&create_alert(), FormatOptions::compact());
        let b = format_operation(&create_alert(), FormatOptions::compact());
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
