//
//  object.rs
//  apisig
//

use serde::{Deserialize, Serialize};

use super::types::*;

/// An owned entity with its members nested inline.
///
/// This is the shape the extractor produces and the shape of the exchange
/// format. [`Package`](super::Package) flattens it into an arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    #[serde(default)]
    pub location: Location,
    #[serde(flatten)]
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Object>,
}

impl Object {
    pub fn new(name: impl Into<String>, location: Location, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            location,
            kind,
            members: Vec::new(),
        }
    }

    pub fn module(name: impl Into<String>, location: Location, module: Module) -> Self {
        Self::new(name, location, ObjectKind::Module(module))
    }

    pub fn member(&self, name: &str) -> Option<&Object> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut Object> {
        self.members.iter_mut().find(|m| m.name == name)
    }

    /// Insert keeping declaration order; a redefinition replaces the earlier
    /// member in place.
    pub fn insert_member(&mut self, object: Object) {
        match self.members.iter_mut().find(|m| m.name == object.name) {
            Some(slot) => *slot = object,
            None => self.members.push(object),
        }
    }

    /// Builder-style [`Object::insert_member`].
    pub fn with_member(mut self, object: Object) -> Self {
        self.insert_member(object);
        self
    }

    pub fn is_module(&self) -> bool {
        matches!(self.kind, ObjectKind::Module(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(name: &str, value: &str) -> Object {
        Object::new(
            name,
            Location::default(),
            ObjectKind::Attribute(Attribute {
                value: Some(value.to_string()),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_redefinition_replaces_in_place() {
        let mut module = Object::module("m", Location::default(), Module::default());
        module.insert_member(attribute("a", "1"));
        module.insert_member(attribute("b", "2"));
        module.insert_member(attribute("a", "3"));

        let names: Vec<_> = module.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(module.member("a"), Some(&attribute("a", "3")));
    }

    #[test]
    fn test_kind_tag_is_flattened() {
        let json = serde_json::to_value(attribute("x", "1")).unwrap();
        assert_eq!(json["kind"], "attribute");
        assert_eq!(json["name"], "x");
        assert_eq!(json["value"], "1");
    }
}
