//
//  mro.rs
//  apisig
//

//! Method resolution order and the inherited-member index.
//!
//! Classes are linearized with C3. Bases that never resolved to a class
//! (externals, builtins) are recorded on the class but contribute no
//! ancestors. Inheritance cycles are broken before linearization.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::warn;

use super::context::ResolutionContext;
use crate::model::{DerivedViews, ObjectKind, Package};

/// C3 merge. `None` when no consistent order exists.
fn merge(mut seqs: Vec<Vec<String>>) -> Option<Vec<String>> {
    let mut result = Vec::new();
    loop {
        seqs.retain(|seq| !seq.is_empty());
        if seqs.is_empty() {
            return Some(result);
        }

        let candidate = seqs.iter().map(|seq| &seq[0]).find(|head| {
            !seqs
                .iter()
                .any(|s| s.len() > 1 && s[1..].contains(*head))
        })?;
        let candidate = candidate.clone();

        for seq in seqs.iter_mut() {
            if seq.first() == Some(&candidate) {
                seq.remove(0);
            }
        }
        result.push(candidate);
    }
}

/// Linearize `class` given the already-linearized bases, in declared order.
pub fn linearize(class: &str, bases: &[&[String]]) -> Vec<String> {
    let mut seqs: Vec<Vec<String>> = bases.iter().map(|mro| mro.to_vec()).collect();
    seqs.push(bases.iter().filter_map(|mro| mro.first().cloned()).collect());

    let mut mro = vec![class.to_string()];
    match merge(seqs) {
        Some(merged) => mro.extend(merged),
        None => {
            warn!(class, "no consistent linearization; using depth-first order");
            // Depth-first, each duplicate kept at its last position.
            let flat: Vec<&String> = bases.iter().flat_map(|mro| mro.iter()).collect();
            for (i, name) in flat.iter().enumerate() {
                if !flat[i + 1..].contains(name) && !mro.contains(*name) {
                    mro.push((*name).clone());
                }
            }
        }
    }
    mro
}

/// Direct bases of the class at `path` that resolved to classes.
fn class_bases(ctx: &ResolutionContext, local: &Package, path: &str) -> Vec<String> {
    let Some(class) = ctx.entity(local, path).and_then(|e| e.kind.as_class()) else {
        return Vec::new();
    };
    class
        .bases
        .iter()
        .filter_map(|base| base.reference.resolved_target())
        .filter(|target| {
            ctx.entity(local, target)
                .is_some_and(|e| matches!(e.kind, ObjectKind::Class(_)))
        })
        .map(str::to_string)
        .collect()
}

/// Compute the linearization and inherited-member index of every local class.
pub fn compute_views(ctx: &ResolutionContext, local: &Package) -> DerivedViews {
    // Inheritance graph over local classes and every class they reach.
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
    let mut bases: HashMap<String, Vec<String>> = HashMap::new();
    let mut queue: VecDeque<String> = local
        .entities()
        .filter(|e| matches!(e.kind, ObjectKind::Class(_)))
        .map(|e| e.path.clone())
        .collect();

    while let Some(path) = queue.pop_front() {
        if bases.contains_key(&path) {
            continue;
        }
        let direct = class_bases(ctx, local, &path);
        let from = *nodes
            .entry(path.clone())
            .or_insert_with(|| graph.add_node(path.clone()));
        for base in &direct {
            let to = *nodes
                .entry(base.clone())
                .or_insert_with(|| graph.add_node(base.clone()));
            graph.add_edge(from, to, ());
            queue.push_back(base.clone());
        }
        bases.insert(path, direct);
    }

    for component in tarjan_scc(&graph) {
        let cyclic = component.len() > 1
            || component
                .first()
                .is_some_and(|n| graph.contains_edge(*n, *n));
        if !cyclic {
            continue;
        }
        let members: HashSet<String> = component.iter().map(|n| graph[*n].clone()).collect();
        warn!(classes = ?members, "inheritance cycle; edges inside the cycle ignored");
        let edges: Vec<_> = graph
            .edge_indices()
            .filter(|e| {
                graph
                    .edge_endpoints(*e)
                    .is_some_and(|(a, b)| component.contains(&a) && component.contains(&b))
            })
            .collect();
        // Remove highest indices first so the rest stay valid.
        for edge in edges.into_iter().rev() {
            graph.remove_edge(edge);
        }
        for class in &members {
            if let Some(direct) = bases.get_mut(class) {
                direct.retain(|b| !members.contains(b));
            }
        }
    }

    let order = toposort(&graph, None).unwrap_or_else(|_| graph.node_indices().collect());
    let mut linearized: HashMap<String, Vec<String>> = HashMap::new();
    for node in order.into_iter().rev() {
        let class = &graph[node];
        let direct = bases.get(class).cloned().unwrap_or_default();
        let base_mros: Vec<&[String]> = direct
            .iter()
            .filter_map(|b| linearized.get(b).map(Vec::as_slice))
            .collect();
        let mro = linearize(class, &base_mros);
        linearized.insert(class.clone(), mro);
    }

    let mut views = DerivedViews::default();
    for entity in local.entities() {
        if !matches!(entity.kind, ObjectKind::Class(_)) {
            continue;
        }
        let mro = linearized
            .get(&entity.path)
            .cloned()
            .unwrap_or_else(|| vec![entity.path.clone()]);

        let mut inherited = BTreeMap::new();
        for ancestor in &mro {
            for member in ctx.members(local, ancestor) {
                inherited
                    .entry(member.name.clone())
                    .or_insert_with(|| member.path.clone());
            }
        }
        views.mro.insert(entity.id, mro);
        views.inherited.insert(entity.id, inherited);
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diamond() {
        let a = names(&["A"]);
        let b = linearize("B", &[&a]);
        let c = linearize("C", &[&a]);
        let d = linearize("D", &[&b, &c]);
        assert_eq!(d, names(&["D", "B", "C", "A"]));
    }

    #[test]
    fn test_no_bases() {
        assert_eq!(linearize("A", &[]), names(&["A"]));
    }

    #[test]
    fn test_inconsistent_order_falls_back() {
        // X(A, B), Y(B, A), Z(X, Y) has no C3 order.
        let a = names(&["A"]);
        let b = names(&["B"]);
        let x = linearize("X", &[&a, &b]);
        let y = linearize("Y", &[&b, &a]);
        let z = linearize("Z", &[&x, &y]);
        assert_eq!(z[0], "Z");
        assert_eq!(z.len(), 5);
        let unique: HashSet<&String> = z.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_merge_keeps_declared_order() {
        let a = names(&["A"]);
        let b = names(&["B"]);
        assert_eq!(linearize("C", &[&a, &b]), names(&["C", "A", "B"]));
    }
}
