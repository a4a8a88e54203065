//
//  builder.rs
//  apisig
//

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ApiSigError, Result, SourceError, SourceErrorKind};
use crate::model::{Location, Module, Object, Package};
use crate::parser::{extract_module, python_parser};
use crate::source::{SourceProvider, UnitResult};

/// Module trees that extracted cleanly, plus every recoverable defect.
#[derive(Debug, Default)]
pub struct Extracted {
    /// `(qualified_name, module tree)` in provider order.
    pub modules: Vec<(String, Object)>,
    pub errors: Vec<SourceError>,
}

/// Extract every unit on a bounded worker pool.
///
/// Each worker keeps its own parser. Results keep the provider's order so the
/// assembled package does not depend on scheduling.
pub fn extract_units(units: Vec<UnitResult>, config: &Config) -> Result<Extracted> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads())
        .build()
        .map_err(|e| ApiSigError::WorkerPool(e.to_string()))?;

    let results: Vec<Result<(String, std::result::Result<Object, Vec<SourceError>>)>> =
        pool.install(|| {
            units
                .into_par_iter()
                .map_init(python_parser, |parser, unit| {
                    let unit = match unit {
                        Ok(unit) => unit,
                        Err(failure) => {
                            warn!(
                                module = %failure.qualified_name,
                                error = %failure.error,
                                "source provider could not read unit"
                            );
                            let err = SourceError::new(
                                SourceErrorKind::Unreadable,
                                &failure.qualified_name,
                                &failure.origin_path,
                                0,
                                0,
                                failure.error.to_string(),
                            );
                            return Ok((failure.qualified_name, Err(vec![err])));
                        }
                    };
                    let parser = parser
                        .as_mut()
                        .map_err(|e| ApiSigError::ParserInit(e.to_string()))?;
                    let extraction = extract_module(parser, &unit, &config.extract);
                    Ok((unit.qualified_name, extraction))
                })
                .collect()
        });

    let mut extracted = Extracted::default();
    for result in results {
        match result? {
            (name, Ok(module)) => extracted.modules.push((name, module)),
            (_, Err(errors)) => extracted.errors.extend(errors),
        }
    }
    Ok(extracted)
}

/// Nest extracted modules under the package root by qualified name.
///
/// Missing intermediate packages become empty namespace modules. A submodule
/// replaces any same-named member of its parent (typically the alias created
/// by `from . import sub`). Units outside the package are reported and dropped.
pub fn assemble_package(name: &str, modules: Vec<(String, Object)>) -> (Package, Vec<SourceError>) {
    let mut errors = Vec::new();
    let mut modules = modules;
    modules.sort_by(|(a, _), (b, _)| {
        a.split('.')
            .count()
            .cmp(&b.split('.').count())
            .then_with(|| a.cmp(b))
    });

    let mut root: Option<Object> = None;
    let mut nested = Vec::new();
    for (qualified_name, module) in modules {
        if qualified_name == name {
            if root.is_some() {
                warn!(module = %qualified_name, "duplicate unit; later one wins");
            }
            root = Some(module);
        } else if let Some(relative) = qualified_name
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            let segments: Vec<String> = relative.split('.').map(str::to_string).collect();
            nested.push((qualified_name.clone(), segments, module));
        } else {
            warn!(module = %qualified_name, package = name, "unit outside package");
            errors.push(SourceError::new(
                SourceErrorKind::OutsidePackage,
                &qualified_name,
                &module.location.origin_path,
                0,
                0,
                format!("module is not part of package `{name}`"),
            ));
        }
    }

    let mut root = root.unwrap_or_else(|| namespace(name));
    let count = nested.len();
    for (qualified_name, segments, module) in nested {
        let Some((_, parents)) = segments.split_last() else {
            continue;
        };
        if !insert_at(&mut root, parents, module) {
            debug!(module = %qualified_name, "could not place module");
        }
    }

    debug!(package = name, submodules = count, errors = errors.len(), "assembled package");
    (Package::from_tree(root), errors)
}

fn insert_at(root: &mut Object, parents: &[String], module: Object) -> bool {
    let mut cursor = root;
    for segment in parents {
        if !cursor.member(segment).is_some_and(Object::is_module) {
            cursor.insert_member(namespace(segment));
        }
        cursor = match cursor.member_mut(segment) {
            Some(next) => next,
            None => return false,
        };
    }
    cursor.insert_member(module);
    true
}

/// Placeholder for a package directory that has no initializer.
fn namespace(name: &str) -> Object {
    Object::module(
        name,
        Location::default(),
        Module {
            is_package: true,
            ..Module::default()
        },
    )
}

/// Run a provider through extraction and assembly.
pub fn build_package(
    name: &str,
    provider: &dyn SourceProvider,
    config: &Config,
) -> Result<(Package, Vec<SourceError>)> {
    let units = provider.units()?;
    debug!(package = name, units = units.len(), "extracting units");
    let Extracted { modules, mut errors } = extract_units(units, config)?;
    let (package, assembly_errors) = assemble_package(name, modules);
    errors.extend(assembly_errors);
    Ok((package, errors))
}
