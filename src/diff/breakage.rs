//
//  breakage.rs
//  apisig
//

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Location;

/// Kinds of incompatible change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakageKind {
    Removed,
    ObjectChangedKind,
    ParameterRemoved,
    ParameterKindChanged,
    ParameterAddedRequired,
    DefaultRemoved,
    BaseRemoved,
    SignatureCountChanged,
    ParameterPossiblyRenamed,
    ParameterMoved,
    ParameterChangedDefault,
    ReturnChangedType,
    AttributeChangedType,
    AttributeChangedValue,
}

impl BreakageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakageKind::Removed => "removed",
            BreakageKind::ObjectChangedKind => "object-changed-kind",
            BreakageKind::ParameterRemoved => "parameter-removed",
            BreakageKind::ParameterKindChanged => "parameter-kind-changed",
            BreakageKind::ParameterAddedRequired => "parameter-added-required",
            BreakageKind::DefaultRemoved => "default-removed",
            BreakageKind::BaseRemoved => "base-removed",
            BreakageKind::SignatureCountChanged => "signature-count-changed",
            BreakageKind::ParameterPossiblyRenamed => "parameter-possibly-renamed",
            BreakageKind::ParameterMoved => "parameter-moved",
            BreakageKind::ParameterChangedDefault => "parameter-changed-default",
            BreakageKind::ReturnChangedType => "return-changed-type",
            BreakageKind::AttributeChangedType => "attribute-changed-type",
            BreakageKind::AttributeChangedValue => "attribute-changed-value",
        }
    }

    /// What changed, as it reads in a report line (`<label> changed: ...`).
    pub fn label(self) -> &'static str {
        match self {
            BreakageKind::Removed => "Public object",
            BreakageKind::ObjectChangedKind => "Object kind",
            BreakageKind::ParameterRemoved => "Parameter",
            BreakageKind::ParameterKindChanged => "Parameter kind",
            BreakageKind::ParameterAddedRequired => "Required parameter",
            BreakageKind::DefaultRemoved => "Parameter default",
            BreakageKind::BaseRemoved => "Base class",
            BreakageKind::SignatureCountChanged => "Overload count",
            BreakageKind::ParameterPossiblyRenamed => "Parameter name",
            BreakageKind::ParameterMoved => "Parameter position",
            BreakageKind::ParameterChangedDefault => "Parameter default",
            BreakageKind::ReturnChangedType => "Return type",
            BreakageKind::AttributeChangedType => "Attribute type",
            BreakageKind::AttributeChangedValue => "Attribute value",
        }
    }

    /// Lower-confidence findings: a caller may or may not be affected.
    pub fn is_speculative(self) -> bool {
        matches!(self, BreakageKind::ParameterPossiblyRenamed)
    }
}

impl fmt::Display for BreakageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One incompatible change between two versions of the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakage {
    pub kind: BreakageKind,
    pub qualified_name: String,
    /// Parameter the change is about, for signature findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Index of the overload variant, when the change is inside one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overload: Option<usize>,
    pub location: Location,
    pub old_description: String,
    pub new_description: String,
}

impl Breakage {
    pub fn new(
        kind: BreakageKind,
        qualified_name: impl Into<String>,
        location: Location,
        old_description: impl Into<String>,
        new_description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
            parameter: None,
            overload: None,
            location,
            old_description: old_description.into(),
            new_description: new_description.into(),
        }
    }

    pub fn with_parameter(mut self, parameter: Option<String>) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn with_overload(mut self, overload: Option<usize>) -> Self {
        self.overload = overload;
        self
    }

    /// `pkg.f`, `pkg.f(x)`, or `pkg.f[overload 1](x)`.
    pub fn subject(&self) -> String {
        let mut subject = self.qualified_name.clone();
        if let Some(index) = self.overload {
            subject.push_str(&format!("[overload {index}]"));
        }
        if let Some(parameter) = &self.parameter {
            subject.push_str(&format!("({parameter})"));
        }
        subject
    }
}

impl fmt::Display for Breakage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {} changed: Old: {} New: {}",
            self.location.origin_path,
            self.location.line,
            self.subject(),
            self.kind.label(),
            self.old_description,
            self.new_description
        )
    }
}

/// One line per breakage, in the order given.
pub fn format_report(breakages: &[Breakage]) -> String {
    breakages
        .iter()
        .map(|b| format!("{b}\n"))
        .collect()
}
