//! Dependency ordering between computed keys.
//!
//! A computed key depends on another computed key when one of its
//! dependencies names that key, something inside it, or something
//! containing it:
//!
//! | dependency | computed key | edge? |
//! |------------|--------------|-------|
//! | `title` | `title` | yes |
//! | `nav.key` | `nav` | yes |
//! | `nav` | `nav.key` | yes |
//! | `navigation` | `nav` | no |
//!
//! Ordering is a depth-first post-order walk; a back edge is a cycle.

use super::ComputedDataError;
use rustc_hash::{FxHashMap, FxHashSet};

/// `true` when `a` and `b` name the same value or one contains the other.
pub fn paths_overlap(a: &str, b: &str) -> bool {
    a == b || is_under(a, b) || is_under(b, a)
}

fn is_under(path: &str, parent: &str) -> bool {
    path.strip_prefix(parent).is_some_and(|rest| rest.starts_with('.'))
}

/// Edges between computed keys, in registration order.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    keys: Vec<String>,
    edges: FxHashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build from `(key, dependencies)` pairs.
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [String])>) -> Self {
        let entries: Vec<(&str, &[String])> = entries.into_iter().collect();
        let keys: Vec<String> = entries.iter().map(|(key, _)| (*key).to_owned()).collect();

        let mut edges = FxHashMap::default();
        for (key, deps) in &entries {
            let targets: Vec<String> = keys
                .iter()
                .filter(|other| other.as_str() != *key)
                .filter(|other| deps.iter().any(|dep| paths_overlap(dep, other)))
                .cloned()
                .collect();
            edges.insert((*key).to_owned(), targets);
        }
        Self { keys, edges }
    }

    /// Computed keys `key` waits for.
    pub fn dependencies(&self, key: &str) -> &[String] {
        self.edges.get(key).map_or(&[], Vec::as_slice)
    }

    /// Keys ordered so every key follows its dependencies.
    pub fn order(&self) -> Result<Vec<String>, ComputedDataError> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            if !visited.contains(key) {
                self.visit(key, &mut visited, &mut Vec::new(), &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit(
        &self,
        key: &str,
        visited: &mut FxHashSet<String>,
        stack: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<(), ComputedDataError> {
        visited.insert(key.to_owned());
        stack.push(key.to_owned());

        for dep in self.dependencies(key) {
            if let Some(start) = stack.iter().position(|k| k == dep) {
                let mut cycle = stack[start..].to_vec();
                cycle.push(dep.clone());
                return Err(ComputedDataError::Cycle(cycle));
            }
            if !visited.contains(dep) {
                self.visit(dep, visited, stack, order)?;
            }
        }

        stack.pop();
        order.push(key.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(entries: &[(&str, &[&str])]) -> DependencyGraph {
        let owned: Vec<(String, Vec<String>)> = entries
            .iter()
            .map(|(k, deps)| (k.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect();
        DependencyGraph::new(owned.iter().map(|(k, d)| (k.as_str(), d.as_slice())))
    }

    #[test]
    fn test_paths_overlap() {
        assert!(paths_overlap("title", "title"));
        assert!(paths_overlap("nav.key", "nav"));
        assert!(paths_overlap("nav", "nav.key"));
        assert!(!paths_overlap("navigation", "nav"));
    }

    #[test]
    fn test_order_follows_dependencies() {
        let g = graph(&[("c", &["b"]), ("b", &["a.x"]), ("a", &[])]);
        assert_eq!(g.order().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_non_computed_deps_ignored() {
        let g = graph(&[("page.url", &["permalink"]), ("title", &["site.name"])]);
        assert_eq!(g.order().unwrap(), ["page.url", "title"]);
        assert!(g.dependencies("page.url").is_empty());
    }

    #[test]
    fn test_detects_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let ComputedDataError::Cycle(path) = g.order().unwrap_err() else {
            panic!("expected a cycle");
        };
        assert_eq!(path, ["a", "b", "c", "a"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let g = graph(&[("title", &["title"])]);
        assert_eq!(g.order().unwrap(), ["title"]);
    }
}
