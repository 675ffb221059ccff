//! GraphQL-over-HTTP wire types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Request body: `{query, variables, operationName}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Response body: `{data, errors}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub errors: Vec<ErrorInfo>,
}

impl GraphQLResponse {
    pub fn new(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.errors.push(error);
        self
    }
}

/// One segment of an error path: a response key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A GraphQL error as returned in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub path: Vec<PathSegment>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub extensions: Map<String, Value>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: Map::new(),
        }
    }

    #[must_use]
    pub fn with_path<S: Into<PathSegment>>(mut self, path: impl IntoIterator<Item = S>) -> Self {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// The top-level response key this error is rooted at, if any.
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        self.path.first().and_then(PathSegment::as_key)
    }

    /// `extensions.code`.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }

    /// `extensions.fieldName`, set on legacy field-level validation errors.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.extensions.get("fieldName").and_then(Value::as_str)
    }

    /// `extensions.isFieldError`.
    #[must_use]
    pub fn is_field_error(&self) -> bool {
        self.extensions
            .get("isFieldError")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The path joined with `.`, e.g. `alias1.items.0`.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} (at {})", self.message, self.path_string())
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let mut variables = Map::new();
        variables.insert("input0".into(), json!({"service": "svc1"}));
        let request = GraphQLRequest::new("mutation M { a }")
            .with_variables(variables)
            .with_operation_name("M");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "query": "mutation M { a }",
                "variables": {"input0": {"service": "svc1"}},
                "operationName": "M"
            })
        );
    }

    #[test]
    fn test_request_omits_empty_parts() {
        let body = serde_json::to_string(&GraphQLRequest::new("{ a }")).unwrap();
        assert_eq!(body, r#"{"query":"{ a }"}"#);
    }

    #[test]
    fn test_response_deserialization() {
        let response: GraphQLResponse = serde_json::from_value(json!({
            "data": {"alias0": {"id": "A1"}, "alias1": null},
            "errors": [{
                "message": "service not found",
                "locations": [{"line": 1, "column": 2}],
                "path": ["alias1", "items", 0],
                "extensions": {"code": "NOT_FOUND", "isFieldError": true, "fieldName": "service"}
            }]
        }))
        .unwrap();

        let err = &response.errors[0];
        assert_eq!(err.root_key(), Some("alias1"));
        assert_eq!(err.path_string(), "alias1.items.0");
        assert_eq!(err.code(), Some("NOT_FOUND"));
        assert_eq!(err.field_name(), Some("service"));
        assert!(err.is_field_error());
        assert_eq!(err.to_string(), "service not found (at alias1.items.0)");
    }

    #[test]
    fn test_nulls_are_tolerated() {
        let response: GraphQLResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "boom", "path": null, "extensions": null}]
        }))
        .unwrap();
        assert!(response.data.is_none());
        assert!(response.errors[0].path.is_empty());
        assert_eq!(response.errors[0].root_key(), None);
        assert!(!response.errors[0].is_field_error());

        let response: GraphQLResponse =
            serde_json::from_value(json!({"data": {}, "errors": null})).unwrap();
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_index_root_is_not_a_key() {
        let err = ErrorInfo::new("x").with_path([PathSegment::Index(0)]);
        assert_eq!(err.root_key(), None);
    }
}
