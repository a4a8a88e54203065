//
//  compare.rs
//  apisig
//

use std::collections::HashSet;

use super::breakage::BreakageKind;
use crate::config::DiffConfig;
use crate::model::{Attribute, Function, Parameter, ParameterKind, Signature};

/// A breakage found inside one entity, before it is given a name and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: BreakageKind,
    /// Parameter the finding is about, if any.
    pub parameter: Option<String>,
    /// Overload variant the finding is about, if any.
    pub overload: Option<usize>,
    pub old: String,
    pub new: String,
}

impl Finding {
    fn new(kind: BreakageKind, parameter: Option<&str>, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            kind,
            parameter: parameter.map(str::to_string),
            overload: None,
            old: old.into(),
            new: new.into(),
        }
    }

    fn in_overload(mut self, index: usize) -> Self {
        self.overload = Some(index);
        self
    }
}

const ABSENT: &str = "absent";

pub fn compare_functions(old: &Function, new: &Function, config: &DiffConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    let (old_count, new_count) = (old.overload_count(), new.overload_count());
    if new_count < old_count {
        findings.push(Finding::new(
            BreakageKind::SignatureCountChanged,
            None,
            old_count.to_string(),
            new_count.to_string(),
        ));
    }

    // Variants pair up in declaration order.
    let old_variants = old.signatures.iter().filter(|s| s.overload);
    let new_variants = new.signatures.iter().filter(|s| s.overload);
    for (index, (old_sig, new_sig)) in old_variants.zip(new_variants).enumerate() {
        findings.extend(
            compare_signatures(old_sig, new_sig, config)
                .into_iter()
                .map(|finding| finding.in_overload(index)),
        );
    }

    // Stubs without an implementation are fully covered by their variants.
    if let (Some(old_sig), Some(new_sig)) = (implementation(old), implementation(new)) {
        findings.extend(compare_signatures(old_sig, new_sig, config));
    }
    findings
}

fn implementation(function: &Function) -> Option<&Signature> {
    function.primary_signature().filter(|s| !s.overload)
}

/// Compare two signatures of the same callable.
///
/// Positional-only parameters are matched by position, the rest by name.
/// A parameter with neither a name nor a positional match may have been
/// renamed in place; that is reported separately since no caller can be
/// proven affected.
pub fn compare_signatures(old: &Signature, new: &Signature, config: &DiffConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut matched: HashSet<usize> = HashSet::new();
    let old_names: HashSet<&str> = old.parameters.iter().map(|p| p.name.as_str()).collect();
    let new_has_args = new.has_kind(ParameterKind::VarPositional);
    let new_has_kwargs = new.has_kind(ParameterKind::VarKeyword);

    for (i, param) in old.parameters.iter().enumerate() {
        let name = Some(param.name.as_str());
        let by_name = || {
            new.parameter(&param.name)
                .filter(|(j, _)| !matched.contains(j))
        };
        let in_place = || {
            new.parameters
                .get(i)
                .filter(|q| q.kind == param.kind && !old_names.contains(q.name.as_str()))
                .filter(|_| !matched.contains(&i))
                .map(|q| (i, q))
        };

        let pair = match param.kind {
            ParameterKind::VarPositional | ParameterKind::VarKeyword => {
                new.parameters.iter().enumerate().find(|(_, q)| q.kind == param.kind)
            }
            ParameterKind::PositionalOnly => new
                .parameters
                .get(i)
                .filter(|q| !q.kind.is_variadic() && !matched.contains(&i))
                .map(|q| (i, q)),
            ParameterKind::PositionalOrKeyword | ParameterKind::KeywordOnly | ParameterKind::Unknown => {
                match by_name() {
                    Some(found) => Some(found),
                    None => match in_place() {
                        Some((j, q)) => {
                            if config.report_possible_renames {
                                findings.push(Finding::new(
                                    BreakageKind::ParameterPossiblyRenamed,
                                    name,
                                    &param.name,
                                    &q.name,
                                ));
                            }
                            // Compared below as the same parameter; no move to report.
                            matched.insert(j);
                            compare_pair(param, q, config, &mut findings);
                            continue;
                        }
                        None => None,
                    },
                }
            }
        };

        match pair {
            Some((j, q)) => {
                matched.insert(j);
                if j != i
                    && param.kind == ParameterKind::PositionalOrKeyword
                    && q.kind.accepts_positional()
                {
                    findings.push(Finding::new(
                        BreakageKind::ParameterMoved,
                        name,
                        format!("position {i}"),
                        format!("position {j}"),
                    ));
                }
                compare_pair(param, q, config, &mut findings);
            }
            None => {
                if !absorbed(param.kind, new_has_args, new_has_kwargs) {
                    findings.push(Finding::new(
                        BreakageKind::ParameterRemoved,
                        name,
                        describe(param),
                        ABSENT,
                    ));
                }
            }
        }
    }

    for (j, param) in new.parameters.iter().enumerate() {
        if !matched.contains(&j) && param.is_required() {
            findings.push(Finding::new(
                BreakageKind::ParameterAddedRequired,
                Some(param.name.as_str()),
                ABSENT,
                describe(param),
            ));
        }
    }

    if config.check_return_types {
        if let (Some(old_ret), Some(new_ret)) = (&old.returns, &new.returns) {
            if old_ret != new_ret {
                findings.push(Finding::new(BreakageKind::ReturnChangedType, None, old_ret, new_ret));
            }
        }
    }
    findings
}

/// Whether a variadic in the new signature still accepts what callers passed.
fn absorbed(kind: ParameterKind, new_has_args: bool, new_has_kwargs: bool) -> bool {
    match kind {
        ParameterKind::PositionalOnly => new_has_args,
        ParameterKind::PositionalOrKeyword | ParameterKind::Unknown => new_has_args && new_has_kwargs,
        ParameterKind::KeywordOnly => new_has_kwargs,
        ParameterKind::VarPositional | ParameterKind::VarKeyword => false,
    }
}

fn compare_pair(old: &Parameter, new: &Parameter, config: &DiffConfig, findings: &mut Vec<Finding>) {
    let name = Some(old.name.as_str());
    let comparable = old.kind != ParameterKind::Unknown && new.kind != ParameterKind::Unknown;
    let lost_positional = old.kind.accepts_positional() && !new.kind.accepts_positional();
    let lost_keyword = old.kind.accepts_keyword() && !new.kind.accepts_keyword();
    if comparable && (lost_positional || lost_keyword) {
        findings.push(Finding::new(
            BreakageKind::ParameterKindChanged,
            name,
            old.kind.description(),
            new.kind.description(),
        ));
    }

    if new.kind.is_variadic() {
        return;
    }
    match (&old.default, &new.default) {
        (Some(old_default), None) => findings.push(Finding::new(
            BreakageKind::DefaultRemoved,
            name,
            old_default,
            "none",
        )),
        (Some(old_default), Some(new_default)) if config.check_defaults && old_default != new_default => {
            findings.push(Finding::new(
                BreakageKind::ParameterChangedDefault,
                name,
                old_default,
                new_default,
            ))
        }
        _ => {}
    }
}

pub fn compare_attributes(old: &Attribute, new: &Attribute, config: &DiffConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    if let (Some(old_type), Some(new_type)) = (&old.annotation, &new.annotation) {
        if old_type != new_type {
            findings.push(Finding::new(BreakageKind::AttributeChangedType, None, old_type, new_type));
        }
    }
    if config.check_attribute_values {
        if let (Some(old_value), Some(new_value)) = (&old.value, &new.value) {
            if old_value != new_value {
                findings.push(Finding::new(
                    BreakageKind::AttributeChangedValue,
                    None,
                    old_value,
                    new_value,
                ));
            }
        }
    }
    findings
}

/// `name: annotation = default`, as written.
fn describe(param: &Parameter) -> String {
    let mut text = match param.kind {
        ParameterKind::VarPositional => format!("*{}", param.name),
        ParameterKind::VarKeyword => format!("**{}", param.name),
        _ => param.name.clone(),
    };
    if let Some(annotation) = &param.annotation {
        text.push_str(": ");
        text.push_str(annotation);
    }
    if let Some(default) = &param.default {
        text.push_str(" = ");
        text.push_str(default);
    }
    text
}
