use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    White, // Unvisited
    Gray,  // On the current path
    Black, // Emitted
}

/// A declaration to be ordered, with the identifiers it depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Identifier of the declaration
    pub id: String,
    /// Identifiers that must be declared first
    pub dependencies: BTreeSet<String>,
}

impl DependencyNode {
    /// Create a node from an identifier and its dependencies
    pub fn new<I, S>(id: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DependencyNode {
            id: id.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }

    /// Identifier of a class
    #[must_use]
    pub fn class_id(name: &str) -> String {
        name.to_string()
    }

    /// Identifier of a protocol
    #[must_use]
    pub fn protocol_id(name: &str) -> String {
        format!("<{}>", name)
    }

    /// Identifier of a category on a class
    #[must_use]
    pub fn category_id(class_name: &str, category: &str) -> String {
        format!("{}({})", class_name, category)
    }
}

/// Result of a topological sort
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOutcome {
    /// Every node exactly once, dependencies before dependents
    pub order: Vec<String>,
    /// Edges `(from, to)` dropped to break dependency cycles
    pub broken_edges: Vec<(String, String)>,
}

/// Orders declarations so that dependencies come first.
///
/// Depth-first topological sort with three-color marking. Edges to identifiers that are
/// not part of the graph count as satisfied. An edge back to a node on the current path
/// closes a cycle; it is dropped and the sort continues.
///
/// Ties are broken by identifier locally: roots are visited in ascending order, and so are
/// the dependencies of each node. The result is not a globally smallest order. A
/// dependency is emitted right before the first root that reaches it, so with `A -> Z`
/// and an unrelated `B` the order is `Z, A, B`.
///
/// The traversal keeps its own stack, so long inheritance chains do not recurse.
#[derive(Debug, Clone, Default)]
pub struct DependencySorter {
    nodes: BTreeMap<String, DependencyNode>,
}

impl DependencySorter {
    /// Create an empty sorter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an identifier twice unites both dependency sets.
    pub fn add(&mut self, node: DependencyNode) {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => existing.dependencies.extend(node.dependencies),
            None => {
                self.nodes.insert(node.id.clone(), node);
            }
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node was added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if `id` is a node of the graph
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// The sorted identifiers
    #[must_use]
    pub fn sort(&self) -> Vec<String> {
        self.sort_with_outcome().order
    }

    /// The sorted identifiers together with the edges dropped to break cycles
    #[must_use]
    pub fn sort_with_outcome(&self) -> SortOutcome {
        let mut colors: HashMap<&str, Color> = self
            .nodes
            .keys()
            .map(|id| (id.as_str(), Color::White))
            .collect();
        let mut outcome = SortOutcome {
            order: Vec::with_capacity(self.nodes.len()),
            broken_edges: Vec::new(),
        };

        for root in self.nodes.keys() {
            if colors.get(root.as_str()) == Some(&Color::White) {
                self.visit(root, &mut colors, &mut outcome);
            }
        }

        outcome
    }

    fn visit<'a>(
        &'a self,
        root: &'a str,
        colors: &mut HashMap<&'a str, Color>,
        outcome: &mut SortOutcome,
    ) {
        // (node, dependencies of the node, index of the next dependency to visit)
        let mut stack: Vec<(&'a str, Vec<&'a str>, usize)> = Vec::new();
        colors.insert(root, Color::Gray);
        stack.push((root, self.dependencies_of(root), 0));

        while let Some((node, dependencies, next)) = stack.last_mut() {
            let Some(&dependency) = dependencies.get(*next) else {
                let node = *node;
                stack.pop();
                colors.insert(node, Color::Black);
                outcome.order.push(node.to_string());
                continue;
            };
            *next += 1;
            let node = *node;

            match colors.get(dependency) {
                Some(Color::White) => {
                    colors.insert(dependency, Color::Gray);
                    stack.push((dependency, self.dependencies_of(dependency), 0));
                }
                Some(Color::Gray) => {
                    debug!("breaking dependency cycle at {} -> {}", node, dependency);
                    outcome
                        .broken_edges
                        .push((node.to_string(), dependency.to_string()));
                }
                // Emitted already, or outside of the graph
                Some(Color::Black) | None => {}
            }
        }
    }

    fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.nodes
            .get(id)
            .map(|node| node.dependencies.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorter(nodes: &[(&str, &[&str])]) -> DependencySorter {
        let mut sorter = DependencySorter::new();
        for (id, dependencies) in nodes {
            sorter.add(DependencyNode::new(*id, dependencies.iter().copied()));
        }
        sorter
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|entry| entry == id).unwrap()
    }

    #[test]
    fn test_superclass_precedes_subclass() {
        let sorter = sorter(&[("B", &["A"]), ("A", &["NSObject"])]);
        assert_eq!(sorter.sort(), vec!["A", "B"]);
    }

    #[test]
    fn test_ties_in_ascending_order() {
        let sorter = sorter(&[("Zebra", &[]), ("Apple", &[]), ("Mango", &[])]);
        assert_eq!(sorter.sort(), vec!["Apple", "Mango", "Zebra"]);
    }

    #[test]
    fn test_dependency_is_emitted_with_its_first_dependent() {
        let sorter = sorter(&[("A", &["Z"]), ("B", &[]), ("Z", &[])]);
        assert_eq!(sorter.sort(), vec!["Z", "A", "B"]);
    }

    #[test]
    fn test_unknown_dependencies_are_ignored() {
        let sorter = sorter(&[("View", &["NSView", "<NSCoding>"])]);
        let outcome = sorter.sort_with_outcome();
        assert_eq!(outcome.order, vec!["View"]);
        assert!(outcome.broken_edges.is_empty());
    }

    #[test]
    fn test_protocols_and_categories() {
        let sorter = sorter(&[
            ("Widget(Extras)", &["Widget", "<Extra>"]),
            ("Widget", &["Base", "<Drawable>"]),
            ("Base", &[]),
            ("<Drawable>", &["<NSObject>"]),
            ("<Extra>", &["<Drawable>"]),
        ]);
        let order = sorter.sort();
        assert_eq!(order.len(), 5);
        assert!(position(&order, "Base") < position(&order, "Widget"));
        assert!(position(&order, "<Drawable>") < position(&order, "Widget"));
        assert!(position(&order, "<Drawable>") < position(&order, "<Extra>"));
        assert!(position(&order, "Widget") < position(&order, "Widget(Extras)"));
        assert!(position(&order, "<Extra>") < position(&order, "Widget(Extras)"));
    }

    #[test]
    fn test_cycle_is_broken() {
        let sorter = sorter(&[("<A>", &["<B>"]), ("<B>", &["<C>"]), ("<C>", &["<A>"])]);
        let outcome = sorter.sort_with_outcome();
        assert_eq!(outcome.order, vec!["<C>", "<B>", "<A>"]);
        assert_eq!(
            outcome.broken_edges,
            vec![("<C>".to_string(), "<A>".to_string())]
        );
    }

    #[test]
    fn test_self_dependency() {
        let sorter = sorter(&[("A", &["A"])]);
        let outcome = sorter.sort_with_outcome();
        assert_eq!(outcome.order, vec!["A"]);
        assert_eq!(outcome.broken_edges.len(), 1);
    }

    #[test]
    fn test_duplicate_nodes_unite_dependencies() {
        let mut sorter = sorter(&[("C", &["A"]), ("A", &[]), ("B", &[])]);
        sorter.add(DependencyNode::new("A", ["B"]));
        assert_eq!(sorter.len(), 3);
        assert_eq!(sorter.sort(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let mut sorter = DependencySorter::new();
        let count = 50_000;
        for index in 0..count {
            let dependencies: Vec<String> = if index == 0 {
                vec![]
            } else {
                vec![format!("N{:06}", index - 1)]
            };
            sorter.add(DependencyNode::new(format!("N{:06}", index), dependencies));
        }
        let order = sorter.sort();
        assert_eq!(order.len(), count);
        assert_eq!(order[0], "N000000");
        assert_eq!(order[count - 1], format!("N{:06}", count - 1));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(DependencyNode::class_id("NSView"), "NSView");
        assert_eq!(DependencyNode::protocol_id("NSCoding"), "<NSCoding>");
        assert_eq!(
            DependencyNode::category_id("NSString", "Extras"),
            "NSString(Extras)"
        );
    }
}
