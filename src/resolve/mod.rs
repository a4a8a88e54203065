//! Alias resolution.
//!
//! Every alias edge (imports, re-exports, class bases) is followed to the
//! entity that defines it, across the package and its dependencies. Passes
//! repeat until nothing changes; whatever is still open afterwards is marked
//! external. True cycles are reported as [`ResolutionError`]s.

pub mod context;
pub mod mro;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ResolveConfig;
use crate::error::{ApiSigError, ResolutionError, Result};
use crate::model::{AliasSlot, AliasState, Package};

pub use context::{Lookup, ResolutionContext, SymbolRef};
pub use mro::{compute_views, linearize};

/// A resolved package and what could not be resolved.
#[derive(Debug)]
pub struct ResolveOutcome {
    pub package: Package,
    pub errors: Vec<ResolutionError>,
    /// Passes run before the fixed point.
    pub passes: usize,
}

/// Resolve every alias edge of `package` against itself and `dependencies`.
///
/// Running this on an already resolved package changes nothing.
pub fn resolve_package(
    mut package: Package,
    dependencies: &[Package],
    config: &ResolveConfig,
) -> Result<ResolveOutcome> {
    let slots = package.alias_slots();
    let bound = config.max_passes.unwrap_or(slots.len()) + 1;
    let ctx = ResolutionContext::new(&package, dependencies);

    let views = compute_views(&ctx, &package);
    package.set_derived(views);

    let mut passes = 0;
    loop {
        passes += 1;
        if passes > bound {
            return Err(ApiSigError::InvariantViolation {
                passes: bound,
                aliases: slots.len(),
            });
        }

        let found = run_pass(&ctx, &package, &slots);
        let changed = found.len();
        for (slot, target) in found {
            package.set_alias_state(slot, AliasState::Resolved { target });
        }
        debug!(package = package.name(), pass = passes, changed, "resolution pass");
        if changed == 0 {
            break;
        }
        let views = compute_views(&ctx, &package);
        package.set_derived(views);
    }

    let errors = finalize(&ctx, &mut package, &slots);
    let views = compute_views(&ctx, &package);
    package.set_derived(views);

    info!(
        package = package.name(),
        passes,
        aliases = slots.len(),
        cycles = errors.len(),
        "resolution reached fixed point"
    );
    Ok(ResolveOutcome {
        package,
        errors,
        passes,
    })
}

/// Look up every open slot against the current state. Read-only, so the
/// lookups run in parallel; the caller commits the results.
fn run_pass(ctx: &ResolutionContext, package: &Package, slots: &[AliasSlot]) -> Vec<(AliasSlot, String)> {
    let views = package.derived();
    slots
        .par_iter()
        .filter_map(|slot| {
            let alias = package.slot_alias(*slot)?;
            if !alias.is_unresolved() {
                return None;
            }
            match ctx.lookup(package, views, &alias.target) {
                Lookup::Found(target) => Some((*slot, target)),
                _ => None,
            }
        })
        .collect()
}

/// Mark every slot still open as external, recording true cycles.
fn finalize(ctx: &ResolutionContext, package: &mut Package, slots: &[AliasSlot]) -> Vec<ResolutionError> {
    let views = package.derived();
    let outcomes: Vec<(AliasSlot, String, Lookup)> = slots
        .par_iter()
        .filter_map(|slot| {
            let alias = package.slot_alias(*slot)?;
            if !alias.is_unresolved() {
                return None;
            }
            let lookup = ctx.lookup(package, views, &alias.target);
            Some((*slot, alias.target.clone(), lookup))
        })
        .collect();

    let mut errors = Vec::new();
    for (slot, target, lookup) in outcomes {
        let state = match lookup {
            Lookup::Found(target) => AliasState::Resolved { target },
            Lookup::Missing => AliasState::External,
            Lookup::Cycle(chain) => {
                let qualified_name = package.slot_path(slot);
                warn!(alias = %qualified_name, target = %target, "cyclic alias marked external");
                errors.push(ResolutionError {
                    qualified_name,
                    target,
                    chain,
                });
                AliasState::External
            }
        };
        package.set_alias_state(slot, state);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alias, Base, Class, EntityId, Location, Module, Object, ObjectKind};

    fn module(name: &str) -> Object {
        Object::module(name, Location::default(), Module::default())
    }

    fn alias(name: &str, target: &str) -> Object {
        Object::new(name, Location::default(), ObjectKind::Alias(Alias::new(target)))
    }

    fn class(name: &str, bases: &[&str]) -> Object {
        let bases = bases
            .iter()
            .map(|b| Base {
                expression: b.to_string(),
                reference: Alias::new(*b),
            })
            .collect();
        Object::new(
            name,
            Location::default(),
            ObjectKind::Class(Class {
                bases,
                ..Class::default()
            }),
        )
    }

    fn function(name: &str) -> Object {
        Object::new(name, Location::default(), ObjectKind::Function(Default::default()))
    }

    fn state(package: &Package, path: &str) -> AliasState {
        package
            .get_by_path(path)
            .and_then(|e| e.kind.as_alias())
            .map(|a| a.resolution.clone())
            .unwrap()
    }

    #[test]
    fn test_forward_reexports_resolve() {
        let tree = module("pkg")
            .with_member(alias("Public", "pkg.api.Public"))
            .with_member(module("api").with_member(alias("Public", "pkg.impl.Thing")))
            .with_member(module("impl").with_member(class("Thing", &[])))
            .with_member(alias("os", "os"));
        let outcome = resolve_package(Package::from_tree(tree), &[], &ResolveConfig::default()).unwrap();
        let package = outcome.package;
        assert_eq!(
            state(&package, "pkg.Public"),
            AliasState::Resolved {
                target: "pkg.impl.Thing".into()
            }
        );
        assert_eq!(state(&package, "pkg.os"), AliasState::External);
        assert!(outcome.errors.is_empty());
        assert!(package.is_resolved());
    }

    #[test]
    fn test_diamond_inherited_index() {
        let tree = module("pkg").with_member(
            module("m")
                .with_member(class("A", &[]).with_member(function("hello")))
                .with_member(class("B", &["pkg.m.A"]).with_member(function("hello")))
                .with_member(class("C", &["pkg.m.A"]).with_member(function("hello")))
                .with_member(class("D", &["pkg.m.B", "pkg.m.C"])),
        );
        let outcome = resolve_package(Package::from_tree(tree), &[], &ResolveConfig::default()).unwrap();
        let package = outcome.package;
        let d = package.id_of("pkg.m.D").unwrap();
        assert_eq!(
            package.mro(d).unwrap(),
            &["pkg.m.D", "pkg.m.B", "pkg.m.C", "pkg.m.A"]
        );
        assert_eq!(
            package.inherited_members(d).unwrap().get("hello").map(String::as_str),
            Some("pkg.m.B.hello")
        );
    }

    #[test]
    fn test_alias_to_inherited_member() {
        let tree = module("pkg")
            .with_member(class("Base", &[]).with_member(function("run")))
            .with_member(class("Child", &["pkg.Base"]))
            .with_member(alias("run", "pkg.Child.run"));
        let outcome = resolve_package(Package::from_tree(tree), &[], &ResolveConfig::default()).unwrap();
        assert_eq!(
            state(&outcome.package, "pkg.run"),
            AliasState::Resolved {
                target: "pkg.Base.run".into()
            }
        );
    }

    #[test]
    fn test_cycle_marks_all_external() {
        let n = 5;
        let mut tree = module("pkg");
        for i in 0..n {
            tree = tree.with_member(alias(&format!("a{i}"), &format!("pkg.a{}", (i + 1) % n)));
        }
        let outcome = resolve_package(Package::from_tree(tree), &[], &ResolveConfig::default()).unwrap();
        assert_eq!(outcome.errors.len(), n);
        for i in 0..n {
            assert_eq!(state(&outcome.package, &format!("pkg.a{i}")), AliasState::External);
        }
        assert!(outcome.package.is_resolved());
    }

    #[test]
    fn test_idempotent() {
        let tree = module("pkg")
            .with_member(class("A", &[]).with_member(function("f")))
            .with_member(class("B", &["pkg.A", "object"]))
            .with_member(alias("X", "pkg.B"));
        let first = resolve_package(Package::from_tree(tree), &[], &ResolveConfig::default()).unwrap();
        let once = first.package.clone();
        let second = resolve_package(first.package, &[], &ResolveConfig::default()).unwrap();
        assert_eq!(second.package.to_tree(), once.to_tree());
        assert_eq!(second.package.derived(), once.derived());
        assert_eq!(second.passes, 1);
        assert!(second.errors.is_empty());
    }

    #[test]
    fn test_external_base_contributes_nothing() {
        let tree = module("pkg").with_member(class("X", &["Y"]));
        let outcome = resolve_package(Package::from_tree(tree), &[], &ResolveConfig::default()).unwrap();
        let package = outcome.package;
        let x = package.id_of("pkg.X").unwrap();
        let class = package.get(x).unwrap().kind.as_class().unwrap();
        assert_eq!(class.bases[0].reference.resolution, AliasState::External);
        assert_eq!(package.mro(x).unwrap(), &["pkg.X"]);
        assert_eq!(package.root().id, EntityId(0));
    }

    #[test]
    fn test_dependency_base() {
        let dep = Package::from_tree(module("lib").with_member(class("Base", &[]).with_member(function("close"))));
        let dep = resolve_package(dep, &[], &ResolveConfig::default()).unwrap().package;
        let tree = module("pkg")
            .with_member(alias("Base", "lib.Base"))
            .with_member(class("Impl", &["pkg.Base"]));
        let deps = vec![dep];
        let outcome = resolve_package(Package::from_tree(tree), &deps, &ResolveConfig::default()).unwrap();
        let package = outcome.package;
        let id = package.id_of("pkg.Impl").unwrap();
        assert_eq!(package.mro(id).unwrap(), &["pkg.Impl", "lib.Base"]);
        assert_eq!(
            package.inherited_members(id).unwrap().get("close").map(String::as_str),
            Some("lib.Base.close")
        );
    }

    #[test]
    fn test_pass_bound_exceeded() {
        // One pass resolves X, a second confirms the fixed point.
        let tree = module("pkg")
            .with_member(class("A", &[]))
            .with_member(alias("X", "pkg.A"));
        let config = ResolveConfig { max_passes: Some(0) };
        let err = resolve_package(Package::from_tree(tree), &[], &config).unwrap_err();
        assert!(matches!(err, ApiSigError::InvariantViolation { .. }));
    }
}
