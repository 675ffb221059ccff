//! Splits one merged response into per-item outcomes.

use crate::batch::{AliasMap, DEFAULT_MISSING_DATA_MESSAGE};
use crate::response::{ErrorInfo, PathSegment};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::hash::Hash;
use tracing::warn;

/// Result of one batch item.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The item's slice of `data`.
    Success(Value),
    /// Errors rooted at the item's alias.
    Failure(Vec<ErrorInfo>),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    #[must_use]
    pub fn errors(&self) -> &[ErrorInfo] {
        match self {
            Self::Success(_) => &[],
            Self::Failure(errors) => errors,
        }
    }
}

/// Outcomes by item identity, plus the errors no item owns.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedResult<K: Eq + Hash> {
    pub per_item: FxHashMap<K, Outcome>,
    /// Errors without a path or rooted outside every alias.
    pub batch_errors: Vec<ErrorInfo>,
}

impl<K: Eq + Hash> ComposedResult<K> {
    #[must_use]
    pub fn get(&self, item: &K) -> Option<&Outcome> {
        self.per_item.get(item)
    }

    pub fn successes(&self) -> impl Iterator<Item = (&K, &Value)> {
        self.per_item
            .iter()
            .filter_map(|(id, outcome)| outcome.data().map(|data| (id, data)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&K, &[ErrorInfo])> {
        self.per_item
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(id, outcome)| (id, outcome.errors()))
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.per_item.values().filter(|o| o.is_success()).count()
    }

    /// True when every item succeeded and no batch-level error came back.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.batch_errors.is_empty() && self.per_item.values().all(Outcome::is_success)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.per_item.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.per_item.is_empty()
    }
}

/// Routes `data` and `errors` back to the items of `alias_map`.
pub fn demux<K>(
    alias_map: &AliasMap<K>,
    data: Option<&Value>,
    errors: Vec<ErrorInfo>,
) -> ComposedResult<K>
where
    K: Eq + Hash + Clone,
{
    demux_with(alias_map, data, errors, DEFAULT_MISSING_DATA_MESSAGE)
}

/// [`demux`] with a custom message for items that got neither data nor
/// errors.
pub fn demux_with<K>(
    alias_map: &AliasMap<K>,
    data: Option<&Value>,
    errors: Vec<ErrorInfo>,
    missing_data_message: &str,
) -> ComposedResult<K>
where
    K: Eq + Hash + Clone,
{
    let mut by_alias: FxHashMap<usize, Vec<ErrorInfo>> = FxHashMap::default();
    let mut batch_errors = Vec::new();

    for error in errors {
        match error.root_key().and_then(|key| alias_map.position(key)) {
            Some(position) => by_alias.entry(position).or_default().push(error),
            None => batch_errors.push(error),
        }
    }

    if !batch_errors.is_empty() {
        warn!(count = batch_errors.len(), "errors not attributable to any batch item");
    }

    let mut per_item = FxHashMap::default();
    for (position, (alias, id)) in alias_map.iter().enumerate() {
        let outcome = if let Some(errors) = by_alias.remove(&position) {
            Outcome::Failure(errors)
        } else {
            match data.and_then(|data| data.get(alias)) {
                Some(value) if !value.is_null() => Outcome::Success(value.clone()),
                _ => {
                    warn!(alias, "no data and no errors for batch item");
                    Outcome::Failure(vec![
                        ErrorInfo::new(missing_data_message).with_path([PathSegment::from(alias)])
                    ])
                }
            }
        };
        per_item.insert(id.clone(), outcome);
    }

    ComposedResult {
        per_item,
        batch_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{compose, BatchItem};
    use crate::parse_operation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn alias_map(ids: &[&'static str]) -> AliasMap<&'static str> {
        let template =
            parse_operation("query($id: ID!) { service(id: $id) { name } }", None).unwrap();
        let items: Vec<_> = ids
            .iter()
            .map(|id| BatchItem::new(*id).with_variable("id", *id))
            .collect();
        compose(&template, &items).unwrap().alias_map
    }

    #[test]
    fn test_all_succeed() {
        let map = alias_map(&["svc1", "svc2"]);
        let data = json!({"alias0": {"name": "one"}, "alias1": {"name": "two"}});
        let result = demux(&map, Some(&data), Vec::new());

        assert_eq!(result.get(&"svc1"), Some(&Outcome::Success(json!({"name": "one"}))));
        assert_eq!(result.get(&"svc2"), Some(&Outcome::Success(json!({"name": "two"}))));
        assert!(result.is_complete_success());
        assert_eq!(result.success_count(), 2);
    }

    #[test]
    fn test_partial_failure() {
        let map = alias_map(&["svc1", "svc2", "svc3"]);
        let data = json!({"alias0": {"name": "one"}, "alias1": null, "alias2": {"name": "three"}});
        let not_found = ErrorInfo::new("service not found").with_path(["alias1"]);
        let result = demux(&map, Some(&data), vec![not_found.clone()]);

        assert!(result.get(&"svc1").unwrap().is_success());
        assert!(result.get(&"svc3").unwrap().is_success());
        assert_eq!(result.get(&"svc2"), Some(&Outcome::Failure(vec![not_found])));
        assert!(result.batch_errors.is_empty());
        assert!(!result.is_complete_success());

        let failed: Vec<_> = result.failures().map(|(id, _)| *id).collect();
        assert_eq!(failed, ["svc2"]);
    }

    #[test]
    fn test_errors_win_over_data() {
        let map = alias_map(&["svc1"]);
        let data = json!({"alias0": {"name": null}});
        let error = ErrorInfo::new("name unavailable").with_path(["alias0", "name"]);
        let result = demux(&map, Some(&data), vec![error]);

        assert_eq!(result.get(&"svc1").unwrap().errors().len(), 1);
    }

    #[test]
    fn test_unattributed_errors_surface() {
        let map = alias_map(&["svc1"]);
        let data = json!({"alias0": {"name": "one"}});
        let errors = vec![
            ErrorInfo::new("rate limited"),
            ErrorInfo::new("stray").with_path(["somethingElse"]),
        ];
        let result = demux(&map, Some(&data), errors);

        assert!(result.get(&"svc1").unwrap().is_success());
        assert_eq!(result.batch_errors.len(), 2);
        assert_eq!(result.batch_errors[0].message, "rate limited");
        assert!(!result.is_complete_success());
    }

    #[test]
    fn test_missing_data_fallback() {
        let map = alias_map(&["svc1", "svc2"]);
        let data = json!({"alias0": {"name": "one"}});
        let result = demux_with(&map, Some(&data), Vec::new(), "nothing came back");

        let errors = result.get(&"svc2").unwrap().errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "nothing came back");
        assert_eq!(errors[0].path_string(), "alias1");
    }

    #[test]
    fn test_whole_request_failure() {
        let map = alias_map(&["svc1", "svc2"]);
        let result = demux(&map, None, vec![ErrorInfo::new("unauthorized")]);

        assert_eq!(result.success_count(), 0);
        assert_eq!(result.failures().count(), 2);
        assert_eq!(result.batch_errors.len(), 1);
        for (_, errors) in result.failures() {
            assert_eq!(errors[0].message, DEFAULT_MISSING_DATA_MESSAGE);
        }
    }
}
