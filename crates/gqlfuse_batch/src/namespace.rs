//! Naming of per-item aliases and variables in a composite operation.

/// Maps a batch index to the names its copy of the template uses.
///
/// Implementations must be pure and injective: distinct `(index, name)`
/// pairs must produce distinct variable names, and distinct indices must
/// produce distinct aliases. The composer checks the output and rejects a
/// policy that breaks this.
pub trait NamespacePolicy {
    /// Response key for item `index`.
    fn alias(&self, index: usize) -> String;

    /// New name of the template variable `original` for item `index`.
    fn variable(&self, index: usize, original: &str) -> String;
}

/// `alias{i}` for aliases; `$input` becomes `$input0`, `$input1`, ...
///
/// When the variable name does not end in an ASCII letter (`$id2`,
/// `$first_`), an underscore separates the index: `$id2_0`. That keeps the
/// index recoverable from the trailing digits, so no two pairs collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedNamespace;

impl NamespacePolicy for IndexedNamespace {
    fn alias(&self, index: usize) -> String {
        format!("alias{index}")
    }

    fn variable(&self, index: usize, original: &str) -> String {
        if original.ends_with(|c: char| c.is_ascii_alphabetic()) {
            format!("{original}{index}")
        } else {
            format!("{original}_{index}")
        }
    }
}

/// `alias{i}` for aliases and `input{i}_{name}` for variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixedNamespace;

impl NamespacePolicy for PrefixedNamespace {
    fn alias(&self, index: usize) -> String {
        format!("alias{index}")
    }

    fn variable(&self, index: usize, original: &str) -> String {
        format!("input{index}_{original}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    const NAMES: &[&str] = &[
        "input", "id", "id1", "id12", "id_", "id_1", "a", "a1", "a11", "_", "_1", "input0",
    ];

    fn assert_injective(policy: &impl NamespacePolicy) {
        let mut seen: FxHashMap<String, (usize, &str)> = FxHashMap::default();
        for index in 0..150 {
            for &name in NAMES {
                let renamed = policy.variable(index, name);
                if let Some(prev) = seen.insert(renamed.clone(), (index, name)) {
                    panic!("{renamed} produced by {prev:?} and {:?}", (index, name));
                }
            }
        }

        let mut aliases: Vec<String> = (0..150).map(|i| policy.alias(i)).collect();
        aliases.sort();
        aliases.dedup();
        assert_eq!(aliases.len(), 150);
    }

    #[test]
    fn test_indexed_names() {
        let policy = IndexedNamespace;
        assert_eq!(policy.alias(0), "alias0");
        assert_eq!(policy.variable(0, "input"), "input0");
        assert_eq!(policy.variable(1, "input"), "input1");
        assert_eq!(policy.variable(2, "id1"), "id1_2");
        assert_eq!(policy.variable(3, "first_"), "first__3");
    }

    #[test]
    fn test_indexed_is_injective() {
        assert_injective(&IndexedNamespace);
    }

    #[test]
    fn test_prefixed_names() {
        let policy = PrefixedNamespace;
        assert_eq!(policy.variable(3, "input"), "input3_input");
        assert_injective(&policy);
    }
}
