//
//  python.rs
//  apisig
//

//! Python definitions: modules, classes, functions, attributes.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;
use tracing::debug;

use super::helpers::{
    docstring, field_text, first_named_child, location, named_children, node_name, node_text,
    string_items,
};
use super::imports::{import_from_statement, import_statement, ImportScope};
use super::parameters::extract_parameters;
use crate::config::ExtractConfig;
use crate::error::{SourceError, SourceErrorKind};
use crate::model::*;
use crate::parser::language::SourceFlavor;

/// Overload variants seen so far in one scope, waiting for their implementation.
#[derive(Default)]
struct PendingOverloads {
    by_name: HashMap<String, Vec<(Signature, Location, Option<String>)>>,
    order: Vec<String>,
}

impl PendingOverloads {
    fn push(&mut self, name: &str, signature: Signature, location: Location, doc: Option<String>) {
        if !self.by_name.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.by_name
            .entry(name.to_string())
            .or_default()
            .push((signature, location, doc));
    }

    fn take(&mut self, name: &str) -> Vec<(Signature, Location, Option<String>)> {
        self.order.retain(|n| n != name);
        self.by_name.remove(name).unwrap_or_default()
    }

    fn drain(&mut self) -> Vec<(String, Vec<(Signature, Location, Option<String>)>)> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|name| {
                let variants = self.by_name.remove(&name)?;
                Some((name, variants))
            })
            .collect()
    }
}

/// Where a body is being visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Class,
}

/// Walks one parsed module and builds its unresolved entity tree.
pub struct ModuleVisitor<'a> {
    source: &'a [u8],
    module_path: &'a str,
    origin_path: &'a str,
    is_package: bool,
    flavor: SourceFlavor,
    config: &'a ExtractConfig,
    pub errors: Vec<SourceError>,
}

impl<'a> ModuleVisitor<'a> {
    pub fn new(
        source: &'a [u8],
        module_path: &'a str,
        origin_path: &'a str,
        is_package: bool,
        config: &'a ExtractConfig,
    ) -> Self {
        Self {
            source,
            module_path,
            origin_path,
            is_package,
            flavor: SourceFlavor::from_origin(origin_path),
            config,
            errors: Vec::new(),
        }
    }

    pub fn visit_module(&mut self, root: &Node) -> Object {
        let name = self
            .module_path
            .rsplit('.')
            .next()
            .unwrap_or(self.module_path);
        let module = Module {
            docstring: self.docstring_of(root),
            exports: None,
            is_package: self.is_package,
        };
        let mut object = Object::module(name, location(root, self.origin_path), module);

        let mut pending = PendingOverloads::default();
        self.visit_body(root, &mut object, self.module_path, ScopeKind::Module, &mut pending);
        self.flush_overloads(&mut object, &mut pending);

        let bound: HashSet<String> = object.members.iter().map(|m| m.name.clone()).collect();
        anchor_bases(&mut object, self.module_path, &bound);
        object
    }

    fn docstring_of(&self, body: &Node) -> Option<String> {
        if self.config.docstrings {
            docstring(body, self.source)
        } else {
            None
        }
    }

    fn visit_body(
        &mut self,
        body: &Node,
        scope: &mut Object,
        scope_path: &str,
        kind: ScopeKind,
        pending: &mut PendingOverloads,
    ) {
        for statement in named_children(body) {
            match statement.kind() {
                "class_definition" => {
                    if let Some(class) = self.visit_class(&statement, Vec::new(), scope_path) {
                        scope.insert_member(class);
                    }
                }
                "function_definition" => {
                    self.visit_function(&statement, Vec::new(), scope, scope_path, kind, pending);
                }
                "decorated_definition" => {
                    let decorators = self.decorators(&statement);
                    let Some(definition) = statement.child_by_field_name("definition") else {
                        continue;
                    };
                    match definition.kind() {
                        "class_definition" => {
                            if let Some(class) = self.visit_class(&definition, decorators, scope_path)
                            {
                                scope.insert_member(class);
                            }
                        }
                        "function_definition" => {
                            self.visit_function(&definition, decorators, scope, scope_path, kind, pending);
                        }
                        _ => {}
                    }
                }
                "expression_statement" => self.visit_expression_statement(&statement, scope, kind),
                "import_statement" => {
                    for alias in import_statement(&statement, self.source, &self.import_scope()) {
                        scope.insert_member(alias);
                    }
                }
                "import_from_statement" => {
                    for alias in import_from_statement(&statement, self.source, &self.import_scope()) {
                        scope.insert_member(alias);
                    }
                }
                "if_statement" | "try_statement" | "with_statement" => {
                    if self.config.descend_conditionals {
                        for block in nested_blocks(&statement) {
                            self.visit_body(&block, scope, scope_path, kind, pending);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn import_scope(&self) -> ImportScope<'a> {
        ImportScope {
            module_path: self.module_path,
            is_package: self.is_package,
            origin_path: self.origin_path,
        }
    }

    fn decorators(&self, decorated: &Node) -> Vec<String> {
        named_children(decorated)
            .iter()
            .filter(|n| n.kind() == "decorator")
            .map(|d| {
                first_named_child(d)
                    .map(|expr| node_text(&expr, self.source))
                    .unwrap_or_else(|| node_text(d, self.source).trim_start_matches('@').trim().to_string())
            })
            .collect()
    }

    fn visit_class(&mut self, node: &Node, decorators: Vec<String>, scope_path: &str) -> Option<Object> {
        let name = node_name(node, self.source)?;
        let path = format!("{scope_path}.{name}");

        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| self.bases(&args))
            .unwrap_or_default();

        let body = node.child_by_field_name("body");
        let class = Class {
            bases,
            decorators,
            docstring: body.as_ref().and_then(|b| self.docstring_of(b)),
        };
        let mut object = Object::new(
            name,
            location(node, self.origin_path),
            ObjectKind::Class(class),
        );

        if let Some(body) = body {
            let mut pending = PendingOverloads::default();
            self.visit_body(&body, &mut object, &path, ScopeKind::Class, &mut pending);
            self.flush_overloads(&mut object, &mut pending);
        }
        Some(object)
    }

    fn bases(&self, args: &Node) -> Vec<Base> {
        named_children(args)
            .iter()
            .filter_map(|arg| {
                let expression = match arg.kind() {
                    "keyword_argument" | "list_splat" | "dictionary_splat" | "comment" => return None,
                    // Generic[T] -> Generic
                    "subscript" => field_text(arg, "value", self.source)?,
                    _ => node_text(arg, self.source),
                };
                Some(Base {
                    reference: Alias::new(expression.clone()),
                    expression,
                })
            })
            .collect()
    }

    fn visit_function(
        &mut self,
        node: &Node,
        decorators: Vec<String>,
        scope: &mut Object,
        scope_path: &str,
        kind: ScopeKind,
        pending: &mut PendingOverloads,
    ) {
        let Some(name) = node_name(node, self.source) else {
            return;
        };
        let body = node.child_by_field_name("body");
        let doc = body.as_ref().and_then(|b| self.docstring_of(b));
        let is_overload = decorators.iter().any(|d| is_overload_decorator(d));

        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| extract_parameters(&p, self.source))
            .unwrap_or_default();
        let signature = Signature {
            parameters,
            returns: field_text(node, "return_type", self.source),
            overload: is_overload,
            line: node.start_position().row + 1,
        };

        let defect = match (signature.check_kind_order(), signature.check_default_order()) {
            (Err(idx), _) => Some(format!(
                "parameter `{}` is {} but follows a stricter parameter",
                signature.parameters[idx].name, signature.parameters[idx].kind
            )),
            (Ok(()), Err(idx)) => Some(format!(
                "parameter `{}` has no default but follows a parameter with one",
                signature.parameters[idx].name
            )),
            (Ok(()), Ok(())) => None,
        };
        if let Some(message) = defect {
            self.errors.push(SourceError::new(
                SourceErrorKind::ParameterOrder,
                format!("{scope_path}.{name}"),
                self.origin_path,
                signature.line,
                node.start_position().column + 1,
                message,
            ));
            return;
        }

        let loc = location(node, self.origin_path);
        if is_overload {
            pending.push(&name, signature, loc, doc);
            return;
        }

        let mut signatures: Vec<Signature> = pending
            .take(&name)
            .into_iter()
            .map(|(sig, _, _)| sig)
            .collect();
        signatures.push(signature);

        if kind == ScopeKind::Class && name == "__init__" && self.config.instance_attributes {
            if let Some(body) = body {
                let receiver = signatures
                    .last()
                    .and_then(|s| s.parameters.first())
                    .map(|p| p.name.clone());
                if let Some(receiver) = receiver {
                    for attribute in self.instance_attributes(&body, &receiver) {
                        if scope.member(&attribute.name).is_none() {
                            scope.insert_member(attribute);
                        }
                    }
                }
            }
        }

        let function = Function {
            signatures,
            decorators,
            docstring: doc,
            is_async: is_async(node),
        };
        scope.insert_member(Object::new(name, loc, ObjectKind::Function(function)));
    }

    /// Overload variants never followed by an implementation (stubs, protocols).
    fn flush_overloads(&self, scope: &mut Object, pending: &mut PendingOverloads) {
        for (name, variants) in pending.drain() {
            if self.flavor == SourceFlavor::Module {
                debug!(module = self.module_path, function = %name, "overloads without implementation");
            }
            let loc = variants
                .first()
                .map(|(_, l, _)| l.clone())
                .unwrap_or_default();
            let docstring = variants.iter().rev().find_map(|(_, _, d)| d.clone());
            let function = Function {
                signatures: variants.into_iter().map(|(s, _, _)| s).collect(),
                decorators: Vec::new(),
                docstring,
                is_async: false,
            };
            scope.insert_member(Object::new(name, loc, ObjectKind::Function(function)));
        }
    }

    fn visit_expression_statement(&mut self, statement: &Node, scope: &mut Object, kind: ScopeKind) {
        let Some(expr) = first_named_child(statement) else {
            return;
        };
        match expr.kind() {
            "assignment" => self.visit_assignment(&expr, scope, kind),
            "augmented_assignment" => {
                let left = field_text(&expr, "left", self.source);
                if kind == ScopeKind::Module && left.as_deref() == Some("__all__") {
                    if let Some(right) = expr.child_by_field_name("right") {
                        let items = string_items(&right, self.source);
                        if let ObjectKind::Module(module) = &mut scope.kind {
                            module.exports.get_or_insert_with(Vec::new).extend(items);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_assignment(&mut self, assignment: &Node, scope: &mut Object, kind: ScopeKind) {
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        let annotation = field_text(assignment, "type", self.source);

        // a = b = value: every target gets the innermost value.
        let mut right = assignment.child_by_field_name("right");
        let mut targets = vec![left];
        while let Some(r) = right.filter(|r| r.kind() == "assignment") {
            if let Some(l) = r.child_by_field_name("left") {
                targets.push(l);
            }
            right = r.child_by_field_name("right");
        }

        for target in targets {
            for name in target_names(&target, self.source) {
                if kind == ScopeKind::Module && name == "__all__" {
                    if let Some(r) = right {
                        let items = string_items(&r, self.source);
                        if let ObjectKind::Module(module) = &mut scope.kind {
                            module.exports = Some(items);
                        }
                    }
                    continue;
                }
                let attribute = Attribute {
                    annotation: annotation.clone(),
                    value: right.map(|r| node_text(&r, self.source)),
                    instance: false,
                };
                scope.insert_member(Object::new(
                    name,
                    location(assignment, self.origin_path),
                    ObjectKind::Attribute(attribute),
                ));
            }
        }
    }

    /// `self.x = ...` assignments anywhere in an `__init__` body.
    fn instance_attributes(&self, body: &Node, receiver: &str) -> Vec<Object> {
        let mut found = Vec::new();
        self.collect_instance_attributes(body, receiver, &mut found);
        found
    }

    fn collect_instance_attributes(&self, node: &Node, receiver: &str, found: &mut Vec<Object>) {
        for statement in named_children(node) {
            match statement.kind() {
                "expression_statement" => {
                    let Some(assignment) = first_named_child(&statement).filter(|e| e.kind() == "assignment")
                    else {
                        continue;
                    };
                    let Some(left) = assignment.child_by_field_name("left") else {
                        continue;
                    };
                    if left.kind() != "attribute" {
                        continue;
                    }
                    let object = field_text(&left, "object", self.source);
                    let Some(attr) = field_text(&left, "attribute", self.source) else {
                        continue;
                    };
                    if object.as_deref() != Some(receiver) || found.iter().any(|o: &Object| o.name == attr) {
                        continue;
                    }
                    let attribute = Attribute {
                        annotation: field_text(&assignment, "type", self.source),
                        value: field_text(&assignment, "right", self.source),
                        instance: true,
                    };
                    found.push(Object::new(
                        attr,
                        location(&assignment, self.origin_path),
                        ObjectKind::Attribute(attribute),
                    ));
                }
                "if_statement" | "try_statement" | "with_statement" | "for_statement" | "while_statement" => {
                    for block in nested_blocks(&statement) {
                        self.collect_instance_attributes(&block, receiver, found);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Blocks directly under a compound statement and its clauses.
fn nested_blocks<'tree>(statement: &Node<'tree>) -> Vec<Node<'tree>> {
    let mut blocks = Vec::new();
    for child in named_children(statement) {
        if child.kind() == "block" {
            blocks.push(child);
        } else if child.kind().ends_with("_clause") {
            blocks.extend(named_children(&child).into_iter().filter(|n| n.kind() == "block"));
        }
    }
    blocks
}

/// Names bound by an assignment target (`x`, `x, y`, `(x, y)`).
fn target_names(target: &Node, source: &[u8]) -> Vec<String> {
    match target.kind() {
        "identifier" => vec![node_text(target, source)],
        "pattern_list" | "tuple_pattern" | "list_pattern" => named_children(target)
            .iter()
            .flat_map(|n| target_names(n, source))
            .collect(),
        _ => Vec::new(),
    }
}

fn is_overload_decorator(expression: &str) -> bool {
    expression == "overload" || expression.ends_with(".overload")
}

/// `async` is the first token of an async `function_definition`.
fn is_async(function: &Node) -> bool {
    function.child(0).is_some_and(|c| c.kind() == "async")
}

/// Point base references at module members when their first segment is bound
/// in the module; leave other bases (builtins, undefined names) as written.
fn anchor_bases(object: &mut Object, module_path: &str, bound: &HashSet<String>) {
    for member in object.members.iter_mut() {
        if let ObjectKind::Class(class) = &mut member.kind {
            for base in class.bases.iter_mut() {
                let head = base.expression.split('.').next().unwrap_or(&base.expression);
                if bound.contains(head) {
                    base.reference.target = format!("{module_path}.{}", base.expression);
                }
            }
            anchor_bases(member, module_path, bound);
        }
    }
}
