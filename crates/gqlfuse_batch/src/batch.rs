//! Batch composition: N copies of one template fused into one operation.
//!
//! Item `i` gets the alias `policy.alias(i)` and its own renamed copy of
//! every template variable. The resulting [`AliasMap`] is what lets the
//! demultiplexer route the merged response back to the items.

use crate::demux::{demux_with, ComposedResult};
use crate::error::{CollisionError, ComposeError, ComposeResult};
use crate::merge::merge;
use crate::namespace::{IndexedNamespace, NamespacePolicy};
use crate::response::{GraphQLRequest, GraphQLResponse};
use crate::rewrite::{rename_variables, set_alias};
use gqlfuse_syntax::{format_operation, FormatOptions, OperationDefinition};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::hash::Hash;
use tracing::{debug, error, trace};

/// Default upper bound on the number of items in one batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Default message of the failure synthesized for an item with neither data
/// nor errors.
pub const DEFAULT_MISSING_DATA_MESSAGE: &str = "no data returned";

/// One logical request in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem<K> {
    /// Caller-defined identity; outcomes are keyed by it.
    pub id: K,
    /// Values by original template variable name.
    pub variables: Map<String, Value>,
}

impl<K> BatchItem<K> {
    pub fn new(id: K) -> Self {
        Self {
            id,
            variables: Map::new(),
        }
    }

    /// Sets the value of a template variable.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Alias to item identity, in alias order.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasMap<K> {
    entries: Vec<(String, K)>,
    index: FxHashMap<String, usize>,
}

impl<K> Default for AliasMap<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<K> AliasMap<K> {
    fn insert(&mut self, alias: String, id: K) {
        self.index.insert(alias.clone(), self.entries.len());
        self.entries.push((alias, id));
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&K> {
        self.position(alias).map(|i| &self.entries[i].1)
    }

    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.index.contains_key(alias)
    }

    /// Position of `alias` in alias order.
    #[must_use]
    pub fn position(&self, alias: &str) -> Option<usize> {
        self.index.get(alias).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &K)> {
        self.entries.iter().map(|(alias, id)| (alias.as_str(), id))
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(alias, _)| alias.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A composed operation ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedRequest<K> {
    pub document: OperationDefinition,
    /// Values by renamed variable name.
    pub variable_values: Map<String, Value>,
    pub alias_map: AliasMap<K>,
}

impl<K> ComposedRequest<K> {
    /// The composite operation printed on a single line.
    #[must_use]
    pub fn query(&self) -> String {
        format_operation(&self.document, FormatOptions::compact())
    }

    /// The GraphQL-over-HTTP request body.
    #[must_use]
    pub fn to_request(&self) -> GraphQLRequest {
        GraphQLRequest {
            query: self.query(),
            variables: self.variable_values.clone(),
            operation_name: self.document.name.clone(),
        }
    }
}

/// Batch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchConfig {
    /// Largest accepted batch.
    pub max_batch_size: usize,
    /// Name of the composite operation. Defaults to the template's name.
    pub operation_name: Option<String>,
    /// Message of the failure reported for an item with no data and no
    /// errors.
    pub missing_data_message: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            operation_name: None,
            missing_data_message: DEFAULT_MISSING_DATA_MESSAGE.to_string(),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the batch size limit.
    #[must_use]
    pub fn max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Overrides the composite operation name.
    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Sets the message used when an item gets neither data nor errors.
    #[must_use]
    pub fn missing_data_message(mut self, message: impl Into<String>) -> Self {
        self.missing_data_message = message.into();
        self
    }
}

/// Composes batches with a fixed configuration and namespace policy.
#[derive(Debug, Clone)]
pub struct Composer<P = IndexedNamespace> {
    config: BatchConfig,
    policy: P,
}

impl Composer {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            policy: IndexedNamespace,
        }
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl<P: NamespacePolicy> Composer<P> {
    pub fn with_policy(config: BatchConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Fuses one aliased, renamed copy of `template` per item.
    pub fn compose<K>(
        &self,
        template: &OperationDefinition,
        items: &[BatchItem<K>],
    ) -> ComposeResult<ComposedRequest<K>>
    where
        K: Eq + Hash + Clone,
    {
        if items.is_empty() {
            return Err(ComposeError::EmptyBatch);
        }
        if items.len() > self.config.max_batch_size {
            return Err(ComposeError::BatchTooLarge {
                len: items.len(),
                max: self.config.max_batch_size,
            });
        }
        if template.fields().len() != 1 {
            return Err(ComposeError::shape(format!(
                "template must select exactly one top-level field, found {}",
                template.fields().len()
            )));
        }
        if let Some(name) = template
            .variable_references()
            .into_iter()
            .find(|name| template.variable(name).is_none())
        {
            return Err(ComposeError::shape(format!(
                "template references `${name}` without declaring it"
            )));
        }

        let mut seen_ids: FxHashSet<&K> = FxHashSet::default();
        let mut seen_variables: FxHashSet<String> = FxHashSet::default();
        let mut alias_map = AliasMap::default();
        let mut variable_values = Map::new();
        let mut composite: Option<OperationDefinition> = None;

        for (index, item) in items.iter().enumerate() {
            let alias = self.policy.alias(index);
            if alias_map.contains(&alias) {
                return Err(collision(CollisionError::ResponseKey { key: alias }));
            }
            if !seen_ids.insert(&item.id) {
                return Err(ComposeError::DuplicateItem { alias });
            }

            let mut rename = FxHashMap::default();
            for var in &template.variables {
                let renamed = self.policy.variable(index, &var.name);
                if !seen_variables.insert(renamed.clone()) {
                    return Err(collision(CollisionError::Variable { name: renamed }));
                }
                rename.insert(var.name.clone(), renamed);
            }

            for (name, value) in &item.variables {
                let Some(renamed) = rename.get(name) else {
                    return Err(ComposeError::UnknownVariable { name: name.clone() });
                };
                variable_values.insert(renamed.clone(), value.clone());
            }

            let op = rename_variables(template, &rename)?;
            let op = set_alias(&op, &alias)?;
            composite = Some(merge(composite, op)?);

            trace!(index, alias = %alias, "composed batch item");
            alias_map.insert(alias, item.id.clone());
        }

        let Some(mut document) = composite else {
            return Err(ComposeError::EmptyBatch);
        };
        if let Some(name) = &self.config.operation_name {
            document.name = Some(name.clone());
        }

        debug!(
            items = items.len(),
            variables = document.variables.len(),
            "composed batch"
        );

        Ok(ComposedRequest {
            document,
            variable_values,
            alias_map,
        })
    }

    /// Routes a response for `request` back to its items.
    pub fn demux<K>(
        &self,
        request: &ComposedRequest<K>,
        response: GraphQLResponse,
    ) -> ComposedResult<K>
    where
        K: Eq + Hash + Clone,
    {
        demux_with(
            &request.alias_map,
            response.data.as_ref(),
            response.errors,
            &self.config.missing_data_message,
        )
    }
}

fn collision(err: CollisionError) -> ComposeError {
    error!(error = %err, "namespace policy produced a collision");
    err.into()
}

/// Composes with the default configuration and [`IndexedNamespace`].
pub fn compose<K>(
    template: &OperationDefinition,
    items: &[BatchItem<K>],
) -> ComposeResult<ComposedRequest<K>>
where
    K: Eq + Hash + Clone,
{
    Composer::new(BatchConfig::default()).compose(template, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_operation;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CREATE_ALERT: &str = r#"
        mutation CreateAlertMutation($input: CreateAlertInput!) {
            createAlert(input: $input) {
                number: _id
                id
            }
        }
    "#;

    fn template() -> OperationDefinition {
        parse_operation(CREATE_ALERT, None).unwrap()
    }

    fn items(services: &[&str]) -> Vec<BatchItem<String>> {
        services
            .iter()
            .map(|svc| {
                BatchItem::new((*svc).to_string())
                    .with_variable("input", json!({"service": svc, "summary": "disk full"}))
            })
            .collect()
    }

    #[test]
    fn test_compose_two_services() {
        let composed = compose(&template(), &items(&["svc1", "svc2"])).unwrap();

        assert_snapshot!(format_operation(&composed.document, FormatOptions::default()), @r###"
        mutation CreateAlertMutation($input0: CreateAlertInput!, $input1: CreateAlertInput!) {
          alias0: createAlert(input: $input0) {
            number: _id
            id
          }
          alias1: createAlert(input: $input1) {
            number: _id
            id
          }
        }
        "###);

        assert_eq!(
            Value::Object(composed.variable_values.clone()),
            json!({
                "input0": {"service": "svc1", "summary": "disk full"},
                "input1": {"service": "svc2", "summary": "disk full"},
            })
        );
        assert_eq!(composed.alias_map.get("alias0"), Some(&"svc1".to_string()));
        assert_eq!(composed.alias_map.get("alias1"), Some(&"svc2".to_string()));
        assert_eq!(composed.alias_map.aliases().collect::<Vec<_>>(), ["alias0", "alias1"]);
    }

    #[test]
    fn test_single_item_batch() {
        let composed = compose(&template(), &items(&["svc1"])).unwrap();
        assert_eq!(composed.document.fields().len(), 1);
        assert_eq!(
            composed.document.single_field().unwrap().alias.as_deref(),
            Some("alias0")
        );
        assert_eq!(composed.document.variables[0].name, "input0");
    }

    #[test]
    fn test_compose_is_deterministic() {
        let a = compose(&template(), &items(&["svc1", "svc2", "svc3"])).unwrap();
        let b = compose(&template(), &items(&["svc1", "svc2", "svc3"])).unwrap();
        assert_eq!(a, b);

        let (ra, rb) = (a.to_request(), b.to_request());
        assert_eq!(ra.query.as_bytes(), rb.query.as_bytes());
        assert_eq!(
            serde_json::to_vec(&ra).unwrap(),
            serde_json::to_vec(&rb).unwrap()
        );
    }

    #[test]
    fn test_request_body() {
        let composed = Composer::new(BatchConfig::new().operation_name("CreateAlerts"))
            .compose(&template(), &items(&["svc1"]))
            .unwrap();
        let body = serde_json::to_value(composed.to_request()).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "mutation CreateAlerts($input0: CreateAlertInput!) { alias0: createAlert(input: $input0) { number: _id id } }",
                "variables": {"input0": {"service": "svc1", "summary": "disk full"}},
                "operationName": "CreateAlerts"
            })
        );
    }

    #[test]
    fn test_empty_and_oversized_batches() {
        let err = compose::<String>(&template(), &[]).unwrap_err();
        assert!(matches!(err, ComposeError::EmptyBatch));

        let composer = Composer::new(BatchConfig::new().max_batch_size(2));
        let err = composer
            .compose(&template(), &items(&["a", "b", "c"]))
            .unwrap_err();
        assert!(matches!(err, ComposeError::BatchTooLarge { len: 3, max: 2 }));
    }

    #[test]
    fn test_template_must_have_one_field() {
        let template = parse_operation("query($id: ID) { a(id: $id) b }", None).unwrap();
        let err = compose(&template, &items(&["svc1"])).unwrap_err();
        assert!(matches!(err, ComposeError::Shape { .. }));
    }

    #[test]
    fn test_undeclared_template_variable() {
        let template = parse_operation("query { node(id: $id) { id } }", None).unwrap();
        let batch = vec![BatchItem::new(1), BatchItem::new(2)];

        let err = compose(&template, &batch).unwrap_err();
        assert!(matches!(err, ComposeError::Shape { ref message } if message.contains("$id")));
    }

    #[test]
    fn test_duplicate_item_identity() {
        let err = compose(&template(), &items(&["svc1", "svc2", "svc1"])).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateItem { ref alias } if alias == "alias2"));
    }

    #[test]
    fn test_unknown_variable() {
        let batch = vec![BatchItem::new(1).with_variable("nope", 5)];
        let err = compose(&template(), &batch).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownVariable { ref name } if name == "nope"));
    }

    #[test]
    fn test_missing_value_is_omitted() {
        let template = parse_operation(
            "query($id: ID!, $size: Int = 64) { user(id: $id) { avatar(size: $size) } }",
            None,
        )
        .unwrap();
        let batch = vec![
            BatchItem::new("a").with_variable("id", "1"),
            BatchItem::new("b").with_variable("id", "2").with_variable("size", 128),
        ];
        let composed = compose(&template, &batch).unwrap();

        assert_eq!(
            Value::Object(composed.variable_values),
            json!({"id0": "1", "id1": "2", "size1": 128})
        );
        assert_eq!(composed.document.variables.len(), 4);
    }

    struct Colliding;

    impl NamespacePolicy for Colliding {
        fn alias(&self, index: usize) -> String {
            format!("a{index}")
        }

        fn variable(&self, _index: usize, original: &str) -> String {
            original.to_string()
        }
    }

    #[test]
    fn test_broken_policy_is_rejected() {
        let composer = Composer::with_policy(BatchConfig::default(), Colliding);
        let err = composer
            .compose(&template(), &items(&["svc1", "svc2"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Collision(CollisionError::Variable { ref name }) if name == "input"
        ));
    }

    #[test]
    fn test_prefixed_policy() {
        let composer =
            Composer::with_policy(BatchConfig::default(), crate::namespace::PrefixedNamespace);
        let composed = composer.compose(&template(), &items(&["svc1"])).unwrap();
        assert_eq!(composed.document.variables[0].name, "input0_input");
    }

    #[test]
    fn test_config_from_json() {
        let config = BatchConfig::from_json(r#"{"maxBatchSize": 10}"#).unwrap();
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.missing_data_message, DEFAULT_MISSING_DATA_MESSAGE);
        assert_eq!(config.operation_name, None);

        assert_eq!(BatchConfig::from_json("{}").unwrap(), BatchConfig::default());
    }
}
