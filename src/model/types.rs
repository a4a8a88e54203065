//
//  types.rs
//  apisig
//

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of an entity inside its [`Package`](super::Package) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub usize);

/// Where an entity was declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub origin_path: String,
    /// 1-based first line; 0 when unknown.
    pub line: usize,
    pub end_line: usize,
}

impl Location {
    pub fn new(origin_path: impl Into<String>, line: usize, end_line: usize) -> Self {
        Self {
            origin_path: origin_path.into(),
            line,
            end_line,
        }
    }
}

/// The closed set of entity variants. Members live on the owning
/// [`Object`](super::Object) / [`Entity`](super::Entity), not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    Module(Module),
    Class(Class),
    Function(Function),
    Attribute(Attribute),
    Alias(Alias),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Module(_) => "module",
            ObjectKind::Class(_) => "class",
            ObjectKind::Function(_) => "function",
            ObjectKind::Attribute(_) => "attribute",
            ObjectKind::Alias(_) => "alias",
        }
    }

    pub fn as_alias(&self) -> Option<&Alias> {
        match self {
            ObjectKind::Alias(alias) => Some(alias),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self {
            ObjectKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            ObjectKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Module> {
        match self {
            ObjectKind::Module(module) => Some(module),
            _ => None,
        }
    }

    /// Decorator expressions, for the variants that carry them.
    pub fn decorators(&self) -> &[String] {
        match self {
            ObjectKind::Class(class) => &class.decorators,
            ObjectKind::Function(function) => &function.decorators,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// Names listed in `__all__`, when the module declares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
    /// True for `__init__` units and for namespace placeholders.
    #[serde(default)]
    pub is_package: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    #[serde(default)]
    pub bases: Vec<Base>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

/// A base class reference: the expression as written plus the lookup edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub expression: String,
    pub reference: Alias,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Overload variants first (declaration order), implementation last.
    pub signatures: Vec<Signature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default)]
    pub is_async: bool,
}

impl Function {
    pub fn overload_count(&self) -> usize {
        self.signatures.iter().filter(|s| s.overload).count()
    }

    /// The implementation signature, or the last variant when there is none (stubs).
    pub fn primary_signature(&self) -> Option<&Signature> {
        self.signatures
            .iter()
            .rev()
            .find(|s| !s.overload)
            .or_else(|| self.signatures.last())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(default)]
    pub overload: bool,
    #[serde(default)]
    pub line: usize,
}

impl Signature {
    pub fn parameter(&self, name: &str) -> Option<(usize, &Parameter)> {
        self.parameters
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    /// Check that parameter kinds never step back to a less strict kind.
    /// Returns the index of the first offending parameter.
    pub fn check_kind_order(&self) -> std::result::Result<(), usize> {
        let mut highest = 0u8;
        for (idx, param) in self.parameters.iter().enumerate() {
            let Some(rank) = param.kind.strictness() else {
                continue;
            };
            if rank < highest {
                return Err(idx);
            }
            highest = rank;
        }
        Ok(())
    }

    /// Check that no positional parameter without a default follows one with
    /// a default. Returns the index of the first offending parameter.
    pub fn check_default_order(&self) -> std::result::Result<(), usize> {
        let mut seen_default = false;
        for (idx, param) in self.parameters.iter().enumerate() {
            if !matches!(param.kind, ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword) {
                continue;
            }
            if param.default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(idx);
            }
        }
        Ok(())
    }

    pub fn has_kind(&self, kind: ParameterKind) -> bool {
        self.parameters.iter().any(|p| p.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Default value text; `Some` means the parameter has a default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            annotation: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.kind.is_variadic() && self.kind != ParameterKind::Unknown
    }
}

/// How a parameter may be bound at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
    /// Introspected callables whose binding rules are not known.
    Unknown,
}

impl ParameterKind {
    /// Declaration-order rank; `None` for [`ParameterKind::Unknown`].
    pub fn strictness(self) -> Option<u8> {
        match self {
            ParameterKind::PositionalOnly => Some(0),
            ParameterKind::PositionalOrKeyword => Some(1),
            ParameterKind::VarPositional => Some(2),
            ParameterKind::KeywordOnly => Some(3),
            ParameterKind::VarKeyword => Some(4),
            ParameterKind::Unknown => None,
        }
    }

    pub fn accepts_positional(self) -> bool {
        matches!(
            self,
            ParameterKind::PositionalOnly
                | ParameterKind::PositionalOrKeyword
                | ParameterKind::VarPositional
        )
    }

    pub fn accepts_keyword(self) -> bool {
        matches!(
            self,
            ParameterKind::PositionalOrKeyword | ParameterKind::KeywordOnly | ParameterKind::VarKeyword
        )
    }

    pub fn is_variadic(self) -> bool {
        matches!(self, ParameterKind::VarPositional | ParameterKind::VarKeyword)
    }

    pub fn description(self) -> &'static str {
        match self {
            ParameterKind::PositionalOnly => "positional-only",
            ParameterKind::PositionalOrKeyword => "positional or keyword",
            ParameterKind::VarPositional => "variadic positional",
            ParameterKind::KeywordOnly => "keyword-only",
            ParameterKind::VarKeyword => "variadic keyword",
            ParameterKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Assigned on `self` inside `__init__`.
    #[serde(default)]
    pub instance: bool,
}

/// A non-owning lookup edge to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    /// Dotted path as written (made absolute for relative imports).
    pub target: String,
    #[serde(default)]
    pub resolution: AliasState,
    /// Written as `import x as x` / `from m import y as y`.
    #[serde(default)]
    pub explicit_reexport: bool,
}

impl Alias {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            resolution: AliasState::Unresolved,
            explicit_reexport: false,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.resolution == AliasState::Unresolved
    }

    /// Terminal path once resolved.
    pub fn resolved_target(&self) -> Option<&str> {
        match &self.resolution {
            AliasState::Resolved { target } => Some(target),
            _ => None,
        }
    }
}

/// Moves only forward: unresolved, then resolved or external.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AliasState {
    #[default]
    Unresolved,
    /// Qualified name of the terminal (non-alias) entity.
    Resolved { target: String },
    External,
}

impl AliasState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AliasState::Unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(kinds: &[ParameterKind]) -> Signature {
        Signature {
            parameters: kinds
                .iter()
                .enumerate()
                .map(|(i, k)| Parameter::new(format!("p{i}"), *k))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_order_accepts_full_python_shape() {
        use ParameterKind::*;
        let s = sig(&[PositionalOnly, PositionalOrKeyword, VarPositional, KeywordOnly, VarKeyword]);
        assert_eq!(s.check_kind_order(), Ok(()));
    }

    #[test]
    fn test_kind_order_rejects_positional_after_keyword_only() {
        use ParameterKind::*;
        let s = sig(&[KeywordOnly, PositionalOnly]);
        assert_eq!(s.check_kind_order(), Err(1));
    }

    #[test]
    fn test_default_order() {
        use ParameterKind::*;
        let mut s = sig(&[PositionalOnly, PositionalOrKeyword, KeywordOnly]);
        s.parameters[0].default = Some("1".into());
        assert_eq!(s.check_default_order(), Err(1));

        // Keyword-only parameters may omit defaults anywhere.
        s.parameters[1].default = Some("2".into());
        assert_eq!(s.check_default_order(), Ok(()));
    }

    #[test]
    fn test_kind_order_skips_unknown() {
        use ParameterKind::*;
        let s = sig(&[KeywordOnly, Unknown, VarKeyword]);
        assert_eq!(s.check_kind_order(), Ok(()));
    }

    #[test]
    fn test_primary_signature_prefers_implementation() {
        let mut overload = sig(&[ParameterKind::PositionalOrKeyword]);
        overload.overload = true;
        let implementation = sig(&[]);
        let function = Function {
            signatures: vec![overload.clone(), implementation.clone()],
            ..Default::default()
        };
        assert_eq!(function.primary_signature(), Some(&implementation));
        assert_eq!(function.overload_count(), 1);

        let stub = Function {
            signatures: vec![overload.clone()],
            ..Default::default()
        };
        assert_eq!(stub.primary_signature(), Some(&overload));
    }

    #[test]
    fn test_alias_state_serializes_tagged() {
        let alias = Alias {
            target: "pkg.a".to_string(),
            resolution: AliasState::Resolved {
                target: "pkg.b.C".to_string(),
            },
            explicit_reexport: false,
        };
        let json = serde_json::to_value(&alias).unwrap();
        assert_eq!(json["resolution"]["state"], "resolved");
        assert_eq!(json["resolution"]["target"], "pkg.b.C");
    }
}
