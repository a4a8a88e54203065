//
//  helpers.rs
//  apisig
//

use tree_sitter::Node;

use crate::model::Location;

/// Get the full text of a node.
pub fn node_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

/// Text of a named field, if the field is present.
pub fn field_text(node: &Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(&child, source))
}

/// Get the `name` field of a definition.
pub fn node_name(node: &Node, source: &[u8]) -> Option<String> {
    field_text(node, "name", source).filter(|n| !n.is_empty())
}

pub fn location(node: &Node, origin_path: &str) -> Location {
    Location::new(
        origin_path,
        node.start_position().row + 1,
        node.end_position().row + 1,
    )
}

pub fn named_children<'tree>(node: &Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn first_named_child<'tree>(node: &Node<'tree>) -> Option<Node<'tree>> {
    named_children(node)
        .into_iter()
        .find(|n| n.kind() != "comment")
}

/// The docstring of a body: its first statement, when that is a bare string.
pub fn docstring(body: &Node, source: &[u8]) -> Option<String> {
    let first = named_children(body)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first_named_child(&first)?;
    match expr.kind() {
        "string" => Some(string_value(&node_text(&expr, source))),
        "concatenated_string" => Some(
            named_children(&expr)
                .iter()
                .map(|part| string_value(&node_text(part, source)))
                .collect(),
        ),
        _ => None,
    }
}

/// Strip prefix letters and quotes from a string literal. Escapes are kept.
pub fn string_value(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}

/// String literals inside a list/tuple/set display, e.g. the value of `__all__`.
pub fn string_items(node: &Node, source: &[u8]) -> Vec<String> {
    let container = if node.kind() == "parenthesized_expression" {
        match first_named_child(node) {
            Some(inner) => inner,
            None => return Vec::new(),
        }
    } else {
        *node
    };
    match container.kind() {
        "list" | "tuple" | "set" | "expression_list" => named_children(&container)
            .iter()
            .filter(|item| item.kind() == "string")
            .map(|item| string_value(&node_text(item, source)))
            .collect(),
        "string" => vec![string_value(&node_text(&container, source))],
        _ => Vec::new(),
    }
}

/// First node in the tree that the parser could not make sense of.
pub fn first_error_node<'tree>(root: &Node<'tree>) -> Option<Node<'tree>> {
    if root.is_error() || root.is_missing() {
        return Some(*root);
    }
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    let children: Vec<Node<'tree>> = root.children(&mut cursor).collect();
    children.iter().find_map(|child| first_error_node(child))
}
