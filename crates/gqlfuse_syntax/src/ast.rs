//! Document model for GraphQL executable documents.
//!
//! Every node is an immutable value compared by deep structural equality.
//! Nested selection sets live behind an [`Arc`], so a rewrite that leaves a
//! subtree alone shares it with the input instead of copying it.

use std::fmt;
use std::sync::Arc;

/// A complete executable document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub definitions: Vec<OperationDefinition>,
}

impl Document {
    /// Returns the operation named `name`.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.definitions
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
    }

    /// Returns a new document holding only the operation named `name`.
    ///
    /// ```graphql
    /// query Foo { hello }
    /// query Bar { world }
    /// ```
    ///
    /// `operation_by_name("Bar")` keeps `query Bar { world }` only.
    #[must_use]
    pub fn operation_by_name(&self, name: &str) -> Option<Document> {
        self.operation(name).map(|op| Document {
            definitions: vec![op.clone()],
        })
    }

    /// Returns the operation when the document holds exactly one.
    #[must_use]
    pub fn single_operation(&self) -> Option<&OperationDefinition> {
        match self.definitions.as_slice() {
            [op] => Some(op),
            _ => None,
        }
    }
}

/// Type of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationDefinition {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub selection_set: SelectionSet,
}

impl OperationDefinition {
    pub fn new(kind: OperationKind, selection_set: impl Into<SelectionSet>) -> Self {
        Self {
            kind,
            name: None,
            variables: Vec::new(),
            selection_set: selection_set.into(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_variable(mut self, variable: VariableDefinition) -> Self {
        self.variables.push(variable);
        self
    }

    /// The top-level fields.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        self.selection_set.fields()
    }

    /// The top-level field, when there is exactly one.
    #[must_use]
    pub fn single_field(&self) -> Option<&Field> {
        match self.fields() {
            [field] => Some(field),
            _ => None,
        }
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Collects every variable referenced by the selection tree, in
    /// document order, duplicates included.
    #[must_use]
    pub fn variable_references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.selection_set.collect_variables(&mut out);
        out
    }
}

/// Variable definition: `$name: Type = default`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub ty: Type,
    pub default_value: Option<Value>,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Type reference. Carried through rewrites untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Named(String),
    List(Box<Type>),
    NonNull(Box<Type>),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    #[must_use]
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Selection set. Cloning is cheap; the fields are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSet {
    fields: Arc<[Field]>,
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl SelectionSet {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when both sets share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }

    /// Concatenates two selection sets, `self` first.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        self.fields.iter().chain(other.fields.iter()).cloned().collect()
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        for field in self.fields.iter() {
            field.collect_variables(out);
        }
    }
}

impl From<Vec<Field>> for SelectionSet {
    fn from(fields: Vec<Field>) -> Self {
        Self::new(fields)
    }
}

impl FromIterator<Field> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Field selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub directives: Vec<Directive>,
    pub selection_set: Option<SelectionSet>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            arguments: Vec::new(),
            directives: Vec::new(),
            selection_set: None,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.push(Argument::new(name, value));
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    #[must_use]
    pub fn with_selection(mut self, fields: Vec<Field>) -> Self {
        self.selection_set = Some(SelectionSet::new(fields));
        self
    }

    /// The key this field's value appears under in the response.
    #[must_use]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    /// True when this field or anything below it references a variable
    /// accepted by `matches`.
    pub fn references_variable(&self, matches: impl Fn(&str) -> bool) -> bool {
        self.any_variable(&matches)
    }

    fn any_variable(&self, matches: &dyn Fn(&str) -> bool) -> bool {
        self.arguments
            .iter()
            .chain(self.directives.iter().flat_map(|d| &d.arguments))
            .any(|arg| arg.value.references_variable(matches))
            || self
                .selection_set
                .as_ref()
                .is_some_and(|set| set.fields.iter().any(|f| f.any_variable(matches)))
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        for arg in &self.arguments {
            arg.value.collect_variables(out);
        }
        for directive in &self.directives {
            for arg in &directive.arguments {
                arg.value.collect_variables(out);
            }
        }
        if let Some(set) = &self.selection_set {
            set.collect_variables(out);
        }
    }
}

/// Argument: `name: value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Directive usage: `@name(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<Argument>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.push(Argument::new(name, value));
        self
    }
}

/// Input value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// True when no variable appears anywhere inside this value.
    #[must_use]
    pub fn is_const(&self) -> bool {
        !self.references_variable(&|_| true)
    }

    /// True when a variable accepted by `matches` appears inside this value.
    pub fn references_variable(&self, matches: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Self::Variable(name) => matches(name),
            Self::List(items) => items.iter().any(|item| item.references_variable(matches)),
            Self::Object(fields) => fields
                .iter()
                .any(|(_, value)| value.references_variable(matches)),
            _ => false,
        }
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Variable(name) => out.push(name),
            Self::List(items) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
            Self::Object(fields) => {
                for (_, value) in fields {
                    value.collect_variables(out);
                }
            }
            _ => {}
        }
    }
}
