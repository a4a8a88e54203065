//! Breaking-change detection between two resolved versions of a package.
//!
//! Entities are matched by qualified name, walking both packages from the
//! root. Additions never break; removals and incompatible changes to public
//! entities do. Private and deprecated entities are skipped. Re-exports are
//! compared through the definitions they resolve to, each pair once.

pub mod breakage;
pub mod compare;

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::config::DiffConfig;
use crate::model::{is_public_name, Base, Class, Entity, EntityId, ObjectKind, Package};

pub use breakage::{format_report, Breakage, BreakageKind};
pub use compare::{compare_attributes, compare_functions, compare_signatures, Finding};

/// Every breakage between `old` and `new`, ordered by location then name.
pub fn find_breaking_changes(old: &Package, new: &Package, config: &DiffConfig) -> Vec<Breakage> {
    let mut differ = Differ {
        old,
        new,
        config,
        visited: HashSet::new(),
        breakages: Vec::new(),
    };
    differ.compare(old.root().id, new.root().id);

    let mut breakages = differ.breakages;
    breakages.sort_by(|a, b| {
        (&a.location.origin_path, a.location.line, &a.qualified_name, a.overload, &a.parameter).cmp(&(
            &b.location.origin_path,
            b.location.line,
            &b.qualified_name,
            b.overload,
            &b.parameter,
        ))
    });
    debug!(
        old = old.name(),
        new = new.name(),
        breakages = breakages.len(),
        "compared packages"
    );
    breakages
}

struct Differ<'a> {
    old: &'a Package,
    new: &'a Package,
    config: &'a DiffConfig,
    /// (old, new) pairs already compared.
    visited: HashSet<(EntityId, EntityId)>,
    breakages: Vec<Breakage>,
}

impl<'a> Differ<'a> {
    fn compare(&mut self, old_id: EntityId, new_id: EntityId) {
        if !self.visited.insert((old_id, new_id)) {
            return;
        }
        let (old_package, new_package): (&'a Package, &'a Package) = (self.old, self.new);
        let (Some(old), Some(new)) = (old_package.get(old_id), new_package.get(new_id)) else {
            return;
        };

        match (&old.kind, &new.kind) {
            (ObjectKind::Alias(_), _) | (_, ObjectKind::Alias(_)) => {
                // External or unresolved on either side: only presence counts.
                if let (Some(old_target), Some(new_target)) =
                    (definition(old_package, old), definition(new_package, new))
                {
                    self.compare(old_target, new_target);
                }
                return;
            }
            (ObjectKind::Function(old_fn), ObjectKind::Function(new_fn)) => {
                let findings = compare_functions(old_fn, new_fn, self.config);
                self.record(&new.path, new, findings);
                return;
            }
            (ObjectKind::Attribute(old_attr), ObjectKind::Attribute(new_attr)) => {
                let findings = compare_attributes(old_attr, new_attr, self.config);
                self.record(&new.path, new, findings);
                return;
            }
            (ObjectKind::Class(old_class), ObjectKind::Class(new_class)) => {
                self.compare_bases(old, old_class, new, new_class);
            }
            (ObjectKind::Module(_), ObjectKind::Module(_)) => {}
            (old_kind, new_kind) => {
                self.breakages.push(Breakage::new(
                    BreakageKind::ObjectChangedKind,
                    &new.path,
                    new.location.clone(),
                    old_kind.name(),
                    new_kind.name(),
                ));
                return;
            }
        }

        self.compare_members(old, new);
    }

    fn compare_members(&mut self, old: &Entity, new: &Entity) {
        let old_package = self.old;
        for member in old_package.members(old.id) {
            if !old_package.is_public(member.id) || old_package.is_deprecated(member.id) {
                continue;
            }
            match self.counterpart(new, &member.name) {
                Some(counterpart) => self.compare(member.id, counterpart),
                // Inherited from a class outside the package: still there.
                None if self.inherited_elsewhere(new, &member.name) => {}
                None => self.breakages.push(Breakage::new(
                    BreakageKind::Removed,
                    &member.path,
                    member.location.clone(),
                    member.kind.name(),
                    "absent",
                )),
            }
        }
    }

    /// The entity in `new` standing in for `name`: an own member, or for
    /// classes, the member it now inherits.
    fn counterpart(&self, new: &Entity, name: &str) -> Option<EntityId> {
        if let Some(member) = self.new.child(new.id, name) {
            return Some(member.id);
        }
        let winner = self.new.inherited_members(new.id)?.get(name)?;
        self.new.id_of(winner)
    }

    fn inherited_elsewhere(&self, new: &Entity, name: &str) -> bool {
        self.new
            .inherited_members(new.id)
            .is_some_and(|members| members.contains_key(name))
    }

    /// A base is gone when neither its expression nor its resolved target
    /// appears among the new bases. It breaks callers when members it
    /// contributed are no longer reachable, or when what it contributed is
    /// unknown.
    fn compare_bases(&mut self, old: &Entity, old_class: &Class, new: &Entity, new_class: &Class) {
        let new_exprs: HashSet<&str> = new_class.bases.iter().map(|b| b.expression.as_str()).collect();
        let new_targets: HashSet<&str> = new_class
            .bases
            .iter()
            .filter_map(|b| b.reference.resolved_target())
            .collect();
        let new_package = self.new;
        let new_members = new_package.inherited_members(new.id);

        for base in &old_class.bases {
            if contributes_nothing(base) {
                continue;
            }
            let target = base.reference.resolved_target();
            if new_exprs.contains(base.expression.as_str()) || target.is_some_and(|t| new_targets.contains(t)) {
                continue;
            }

            let lost = match self.contributed(old, target) {
                Some(names) => names
                    .into_iter()
                    .filter(|name| !new_members.is_some_and(|m| m.contains_key(name)))
                    .count(),
                None => 1,
            };
            if lost > 0 {
                self.breakages.push(Breakage::new(
                    BreakageKind::BaseRemoved,
                    &new.path,
                    new.location.clone(),
                    &base.expression,
                    "absent",
                ));
            }
        }
    }

    /// Public member names `old` inherits through the base at `target`.
    /// `None` when the base is not a class of the old package.
    fn contributed(&self, old: &Entity, target: Option<&str>) -> Option<BTreeSet<String>> {
        let base_id = self.old.id_of(target?)?;
        self.old.get(base_id)?.kind.as_class()?;
        let ancestors: HashSet<&str> = self
            .old
            .mro(base_id)
            .map(|mro| mro.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let inherited = self.old.inherited_members(old.id)?;
        Some(
            inherited
                .iter()
                .filter(|(name, _)| is_public_name(name))
                .filter(|(_, winner)| {
                    winner
                        .rsplit_once('.')
                        .is_some_and(|(owner, _)| owner != old.path && ancestors.contains(owner))
                })
                .map(|(name, _)| name.clone())
                .collect(),
        )
    }

    fn record(&mut self, path: &str, new: &Entity, findings: Vec<Finding>) {
        for finding in findings {
            self.breakages.push(
                Breakage::new(finding.kind, path, new.location.clone(), finding.old, finding.new)
                    .with_parameter(finding.parameter)
                    .with_overload(finding.overload),
            );
        }
    }
}

/// The entity an alias stands for inside `package`; any other entity is its
/// own definition.
fn definition(package: &Package, entity: &Entity) -> Option<EntityId> {
    match &entity.kind {
        ObjectKind::Alias(alias) => package.id_of(alias.resolved_target()?),
        _ => Some(entity.id),
    }
}

/// `object` is every class's root; dropping it as a written base changes nothing.
fn contributes_nothing(base: &Base) -> bool {
    matches!(base.expression.as_str(), "object" | "builtins.object")
        || matches!(base.reference.resolved_target(), Some("builtins.object"))
}
