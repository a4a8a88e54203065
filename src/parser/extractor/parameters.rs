//
//  parameters.rs
//  apisig
//

use tree_sitter::Node;

use super::helpers::{field_text, first_named_child, named_children, node_text};
use crate::model::{Parameter, ParameterKind};

/// Build the parameter list of a `parameters` node.
///
/// Kinds come from position alone: everything before `/` is positional-only,
/// everything after `*` or `*args` is keyword-only.
pub fn extract_parameters(params: &Node, source: &[u8]) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = Vec::new();
    let mut keyword_only = false;

    for child in named_children(params) {
        let regular = if keyword_only {
            ParameterKind::KeywordOnly
        } else {
            ParameterKind::PositionalOrKeyword
        };

        match child.kind() {
            "identifier" => parameters.push(Parameter::new(node_text(&child, source), regular)),
            "default_parameter" | "typed_default_parameter" => {
                let Some(name) = field_text(&child, "name", source) else {
                    continue;
                };
                parameters.push(Parameter {
                    name,
                    kind: regular,
                    annotation: field_text(&child, "type", source),
                    default: field_text(&child, "value", source),
                });
            }
            "typed_parameter" => {
                let Some(inner) = first_named_child(&child) else {
                    continue;
                };
                let annotation = field_text(&child, "type", source);
                let param = match inner.kind() {
                    "list_splat_pattern" => {
                        keyword_only = true;
                        splat(&inner, ParameterKind::VarPositional, source)
                    }
                    "dictionary_splat_pattern" => splat(&inner, ParameterKind::VarKeyword, source),
                    _ => Parameter::new(node_text(&inner, source), regular),
                };
                parameters.push(Parameter {
                    annotation,
                    ..param
                });
            }
            "list_splat_pattern" => {
                keyword_only = true;
                parameters.push(splat(&child, ParameterKind::VarPositional, source));
            }
            "dictionary_splat_pattern" => {
                parameters.push(splat(&child, ParameterKind::VarKeyword, source));
            }
            "keyword_separator" => keyword_only = true,
            "positional_separator" => {
                for param in parameters.iter_mut() {
                    if param.kind == ParameterKind::PositionalOrKeyword {
                        param.kind = ParameterKind::PositionalOnly;
                    }
                }
            }
            // Python 2 tuple parameters, comments.
            _ => {}
        }
    }

    parameters
}

fn splat(node: &Node, kind: ParameterKind, source: &[u8]) -> Parameter {
    let name = first_named_child(node)
        .map(|n| node_text(&n, source))
        .unwrap_or_else(|| node_text(node, source).trim_start_matches('*').to_string());
    Parameter::new(name, kind)
}
