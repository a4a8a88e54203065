//
//  imports.rs
//  apisig
//

use tree_sitter::Node;
use tracing::{debug, warn};

use super::helpers::{location, named_children, node_text};
use crate::model::{Alias, Object, ObjectKind};

/// Import context of the unit being extracted.
pub struct ImportScope<'a> {
    pub module_path: &'a str,
    pub is_package: bool,
    pub origin_path: &'a str,
}

impl ImportScope<'_> {
    /// Absolute module path for a `from` clause with `dots` leading dots.
    fn anchor(&self, dots: usize, rest: Option<&str>) -> Option<String> {
        let parts: Vec<&str> = self.module_path.split('.').collect();
        // `from . import x` in pkg/mod.py refers to pkg; in pkg/__init__.py to pkg itself.
        let climb = if self.is_package {
            dots.saturating_sub(1)
        } else {
            dots
        };
        if climb >= parts.len() {
            return None;
        }
        let mut anchor = parts[..parts.len() - climb].join(".");
        if let Some(rest) = rest.filter(|r| !r.is_empty()) {
            anchor.push('.');
            anchor.push_str(rest);
        }
        Some(anchor)
    }
}

/// Aliases bound by an `import a.b` / `import a.b as c` statement.
pub fn import_statement(node: &Node, source: &[u8], scope: &ImportScope) -> Vec<Object> {
    let mut cursor = node.walk();
    let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();

    names
        .iter()
        .filter_map(|name| match name.kind() {
            "dotted_name" => {
                let dotted = node_text(name, source);
                let bound = dotted.split('.').next().unwrap_or(&dotted).to_string();
                Some(alias_object(bound.clone(), Alias::new(bound), node, scope))
            }
            "aliased_import" => {
                let dotted = name.child_by_field_name("name").map(|n| node_text(&n, source))?;
                let bound = name.child_by_field_name("alias").map(|n| node_text(&n, source))?;
                let alias = Alias {
                    explicit_reexport: bound == dotted,
                    ..Alias::new(dotted)
                };
                Some(alias_object(bound, alias, node, scope))
            }
            _ => None,
        })
        .collect()
}

/// Aliases bound by a `from m import x, y as z` statement.
pub fn import_from_statement(node: &Node, source: &[u8], scope: &ImportScope) -> Vec<Object> {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return Vec::new();
    };

    let module = match module_node.kind() {
        "relative_import" => {
            let mut dots = 0;
            let mut rest = None;
            for part in named_children(&module_node) {
                match part.kind() {
                    "import_prefix" => dots = node_text(&part, source).trim().len(),
                    "dotted_name" => rest = Some(node_text(&part, source)),
                    _ => {}
                }
            }
            match scope.anchor(dots, rest.as_deref()) {
                Some(anchor) => anchor,
                None => {
                    warn!(
                        module = scope.module_path,
                        line = node.start_position().row + 1,
                        "relative import climbs above the top-level package"
                    );
                    return Vec::new();
                }
            }
        }
        _ => node_text(&module_node, source),
    };

    if named_children(node)
        .iter()
        .any(|c| c.kind() == "wildcard_import")
    {
        debug!(module = scope.module_path, from = %module, "wildcard import not expanded");
        return Vec::new();
    }

    let mut cursor = node.walk();
    let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();

    names
        .iter()
        .filter_map(|name| match name.kind() {
            "dotted_name" => {
                let imported = node_text(name, source);
                let bound = imported.rsplit('.').next().unwrap_or(&imported).to_string();
                let alias = Alias::new(format!("{module}.{imported}"));
                Some(alias_object(bound, alias, node, scope))
            }
            "aliased_import" => {
                let imported = name.child_by_field_name("name").map(|n| node_text(&n, source))?;
                let bound = name.child_by_field_name("alias").map(|n| node_text(&n, source))?;
                let alias = Alias {
                    explicit_reexport: bound == imported,
                    ..Alias::new(format!("{module}.{imported}"))
                };
                Some(alias_object(bound, alias, node, scope))
            }
            _ => None,
        })
        .collect()
}

fn alias_object(name: String, alias: Alias, node: &Node, scope: &ImportScope) -> Object {
    Object::new(
        name,
        location(node, scope.origin_path),
        ObjectKind::Alias(alias),
    )
}
