//
//  package.rs
//  apisig
//

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::object::Object;
use super::types::*;

/// One node of the package arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Dotted qualified name, unique within the package.
    pub path: String,
    pub parent: Option<EntityId>,
    pub location: Location,
    pub kind: ObjectKind,
    /// Owned members in declaration order.
    pub members: Vec<EntityId>,
}

/// Addresses one alias edge: an Alias entity, or one base of a Class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasSlot {
    Entity(EntityId),
    Base { class: EntityId, index: usize },
}

/// Views computed from the resolved graph. Not part of the exchange format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedViews {
    /// Linearization per class, as qualified names, the class itself first.
    pub mro: HashMap<EntityId, Vec<String>>,
    /// Member name -> qualified name of the winning definition.
    pub inherited: HashMap<EntityId, BTreeMap<String, String>>,
}

/// A package flattened into an arena keyed by [`EntityId`] and qualified name.
///
/// Alias and base edges are stored as paths, so cycles between them cost
/// nothing structurally.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    entities: Vec<Entity>,
    index: HashMap<String, EntityId>,
    derived: DerivedViews,
}

impl Package {
    /// Flatten an owned tree. The root object's name is the package name.
    pub fn from_tree(root: Object) -> Self {
        let mut package = Self {
            name: root.name.clone(),
            entities: Vec::new(),
            index: HashMap::new(),
            derived: DerivedViews::default(),
        };
        package.ingest(root, None);
        package
    }

    fn ingest(&mut self, object: Object, parent: Option<EntityId>) -> EntityId {
        let id = EntityId(self.entities.len());
        let path = match parent {
            Some(p) => format!("{}.{}", self.entities[p.0].path, object.name),
            None => object.name.clone(),
        };
        if self.index.insert(path.clone(), id).is_some() {
            warn!(path = %path, "duplicate qualified name; later definition wins");
        }
        self.entities.push(Entity {
            id,
            name: object.name,
            path,
            parent,
            location: object.location,
            kind: object.kind,
            members: Vec::new(),
        });

        for member in object.members {
            let member_id = self.ingest(member, Some(id));
            self.entities[id.0].members.push(member_id);
        }
        id
    }

    /// Rebuild the owned tree. Derived views are dropped.
    pub fn to_tree(&self) -> Object {
        self.tree_of(EntityId(0))
    }

    fn tree_of(&self, id: EntityId) -> Object {
        let entity = &self.entities[id.0];
        Object {
            name: entity.name.clone(),
            location: entity.location.clone(),
            kind: entity.kind.clone(),
            members: entity.members.iter().map(|m| self.tree_of(*m)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Entity {
        &self.entities[0]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    pub fn get_by_path(&self, path: &str) -> Option<&Entity> {
        self.index.get(path).map(|id| &self.entities[id.0])
    }

    pub fn id_of(&self, path: &str) -> Option<EntityId> {
        self.index.get(path).copied()
    }

    pub fn child(&self, parent: EntityId, name: &str) -> Option<&Entity> {
        let parent = self.get(parent)?;
        self.get_by_path(&format!("{}.{}", parent.path, name))
    }

    pub fn members(&self, id: EntityId) -> impl Iterator<Item = &Entity> + '_ {
        self.get(id)
            .map(|e| e.members.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|m| &self.entities[m.0])
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    pub fn mro(&self, id: EntityId) -> Option<&[String]> {
        self.derived.mro.get(&id).map(Vec::as_slice)
    }

    pub fn inherited_members(&self, id: EntityId) -> Option<&BTreeMap<String, String>> {
        self.derived.inherited.get(&id)
    }

    pub fn derived(&self) -> &DerivedViews {
        &self.derived
    }

    /// Visible to users of the package: listed in the parent's `__all__`, or,
    /// absent a listing, not underscore-prefixed. Imported names count only
    /// when re-exported explicitly.
    pub fn is_public(&self, id: EntityId) -> bool {
        let Some(entity) = self.get(id) else {
            return false;
        };
        let Some(parent) = entity.parent.and_then(|p| self.get(p)) else {
            return true;
        };

        if !matches!(entity.kind, ObjectKind::Module(_)) {
            if let ObjectKind::Module(Module {
                exports: Some(exports),
                ..
            }) = &parent.kind
            {
                return exports.iter().any(|e| e == &entity.name);
            }
        }

        if let ObjectKind::Alias(alias) = &entity.kind {
            return alias.explicit_reexport;
        }

        is_public_name(&entity.name)
    }

    pub fn is_deprecated(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|e| {
            e.kind
                .decorators()
                .iter()
                .any(|d| d.contains("deprecated"))
        })
    }

    /// Every alias edge in arena order: Alias entities and class bases.
    pub fn alias_slots(&self) -> Vec<AliasSlot> {
        let mut slots = Vec::new();
        for entity in &self.entities {
            match &entity.kind {
                ObjectKind::Alias(_) => slots.push(AliasSlot::Entity(entity.id)),
                ObjectKind::Class(class) => {
                    for index in 0..class.bases.len() {
                        slots.push(AliasSlot::Base {
                            class: entity.id,
                            index,
                        });
                    }
                }
                _ => {}
            }
        }
        slots
    }

    pub fn slot_alias(&self, slot: AliasSlot) -> Option<&Alias> {
        match slot {
            AliasSlot::Entity(id) => self.get(id)?.kind.as_alias(),
            AliasSlot::Base { class, index } => {
                Some(&self.get(class)?.kind.as_class()?.bases.get(index)?.reference)
            }
        }
    }

    /// Qualified name used when reporting on a slot.
    pub fn slot_path(&self, slot: AliasSlot) -> String {
        match slot {
            AliasSlot::Entity(id) => self.get(id).map(|e| e.path.clone()).unwrap_or_default(),
            AliasSlot::Base { class, index } => {
                let class_path = self.get(class).map(|e| e.path.as_str()).unwrap_or_default();
                format!("{class_path}.__bases__[{index}]")
            }
        }
    }

    /// True when no alias edge is left unresolved.
    pub fn is_resolved(&self) -> bool {
        self.alias_slots()
            .into_iter()
            .filter_map(|s| self.slot_alias(s))
            .all(|a| a.resolution.is_terminal())
    }

    /// Advance one alias edge. Terminal states are never overwritten.
    pub(crate) fn set_alias_state(&mut self, slot: AliasSlot, state: AliasState) {
        let alias = match slot {
            AliasSlot::Entity(id) => match self.entities.get_mut(id.0).map(|e| &mut e.kind) {
                Some(ObjectKind::Alias(alias)) => alias,
                _ => return,
            },
            AliasSlot::Base { class, index } => {
                match self.entities.get_mut(class.0).map(|e| &mut e.kind) {
                    Some(ObjectKind::Class(c)) => match c.bases.get_mut(index) {
                        Some(base) => &mut base.reference,
                        None => return,
                    },
                    _ => return,
                }
            }
        };
        if alias.resolution.is_terminal() {
            return;
        }
        alias.resolution = state;
    }

    pub(crate) fn set_derived(&mut self, derived: DerivedViews) {
        self.derived = derived;
    }
}

pub fn is_public_name(name: &str) -> bool {
    !name.starts_with('_') || (name.starts_with("__") && name.ends_with("__") && name.len() > 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(name: &str, target: &str, explicit: bool) -> Object {
        Object::new(
            name,
            Location::default(),
            ObjectKind::Alias(Alias {
                explicit_reexport: explicit,
                ..Alias::new(target)
            }),
        )
    }

    fn attribute(name: &str) -> Object {
        Object::new(
            name,
            Location::default(),
            ObjectKind::Attribute(Attribute::default()),
        )
    }

    fn sample() -> Package {
        let sub = Object::module("sub", Location::default(), Module::default())
            .with_member(attribute("value"))
            .with_member(attribute("_hidden"));
        let root = Object::module(
            "pkg",
            Location::default(),
            Module {
                is_package: true,
                ..Default::default()
            },
        )
        .with_member(alias("helper", "os.path.join", false))
        .with_member(alias("exported", "pkg.sub.value", true))
        .with_member(sub);
        Package::from_tree(root)
    }

    #[test]
    fn test_paths_and_lookup() {
        let package = sample();
        assert_eq!(package.name(), "pkg");
        assert_eq!(package.len(), 6);
        let value = package.get_by_path("pkg.sub.value").unwrap();
        assert_eq!(value.name, "value");
        let sub = package.get_by_path("pkg.sub").unwrap();
        assert_eq!(value.parent, Some(sub.id));
        assert_eq!(package.child(sub.id, "value").map(|e| e.id), Some(value.id));
    }

    #[test]
    fn test_tree_round_trip() {
        let package = sample();
        let again = Package::from_tree(package.to_tree());
        assert_eq!(package.to_tree(), again.to_tree());
    }

    #[test]
    fn test_public_rules() {
        let package = sample();
        let id = |p: &str| package.id_of(p).unwrap();
        assert!(package.is_public(id("pkg.sub.value")));
        assert!(!package.is_public(id("pkg.sub._hidden")));
        assert!(!package.is_public(id("pkg.helper")));
        assert!(package.is_public(id("pkg.exported")));
    }

    #[test]
    fn test_exports_override_names() {
        let root = Object::module(
            "pkg",
            Location::default(),
            Module {
                exports: Some(vec!["helper".to_string()]),
                ..Default::default()
            },
        )
        .with_member(alias("helper", "os.path.join", false))
        .with_member(attribute("visible"));
        let package = Package::from_tree(root);
        assert!(package.is_public(package.id_of("pkg.helper").unwrap()));
        assert!(!package.is_public(package.id_of("pkg.visible").unwrap()));
    }

    #[test]
    fn test_terminal_alias_state_is_never_overwritten() {
        let mut package = sample();
        let slot = AliasSlot::Entity(package.id_of("pkg.helper").unwrap());
        package.set_alias_state(slot, AliasState::External);
        package.set_alias_state(
            slot,
            AliasState::Resolved {
                target: "x".to_string(),
            },
        );
        assert_eq!(
            package.slot_alias(slot).map(|a| a.resolution.clone()),
            Some(AliasState::External)
        );
    }

    #[test]
    fn test_dunder_names_are_public() {
        assert!(is_public_name("__init__"));
        assert!(is_public_name("run"));
        assert!(!is_public_name("_private"));
        assert!(!is_public_name("__mangled"));
    }
}
