//
//  mod.rs
//  apisig
//

//! Exchange format.
//!
//! A JSON object keyed by package name. Each value is the package's entity
//! tree: every entity is an object tagged with `kind`, carrying its name,
//! location, kind-specific fields, and `members`. Alias edges carry their
//! target and resolution state. Linearizations and inherited-member indices
//! are not written; they are recomputed by resolving again.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ApiSigError, Result};
use crate::model::{Object, Package};

/// Build the exchange tree for one or more packages.
pub fn to_exchange(packages: &[&Package]) -> Result<Value> {
    let mut map = Map::new();
    for package in packages {
        let tree = serde_json::to_value(package.to_tree())?;
        map.insert(package.name().to_string(), tree);
    }
    Ok(Value::Object(map))
}

/// Rebuild packages from an exchange tree.
pub fn from_exchange(value: Value) -> Result<Vec<Package>> {
    let Value::Object(map) = value else {
        return Err(ApiSigError::Exchange(
            "top level must be an object keyed by package name".into(),
        ));
    };

    let mut packages = Vec::with_capacity(map.len());
    for (name, tree) in map {
        let root: Object = serde_json::from_value(tree)?;
        if root.name != name {
            return Err(ApiSigError::Exchange(format!(
                "package key `{name}` does not match root name `{}`",
                root.name
            )));
        }
        if !root.is_module() {
            return Err(ApiSigError::Exchange(format!(
                "package `{name}` root is a {}, expected a module",
                root.kind.name()
            )));
        }
        let package = Package::from_tree(root);
        debug!(package = %name, entities = package.len(), "loaded package from exchange");
        packages.push(package);
    }
    Ok(packages)
}

pub fn to_json_string(packages: &[&Package]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_exchange(packages)?)?)
}

pub fn from_json_str(text: &str) -> Result<Vec<Package>> {
    from_exchange(serde_json::from_str(text)?)
}
