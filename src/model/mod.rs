//! Entity model shared by every stage of the pipeline.
//!
//! Extraction produces owned [`Object`] trees; the assembler flattens them
//! into a [`Package`] arena that the resolver, differ, and serializer work on.

pub mod object;
pub mod package;
pub mod types;

pub use object::Object;
pub use package::{is_public_name, AliasSlot, DerivedViews, Entity, Package};
pub use types::{
    Alias, AliasState, Attribute, Base, Class, EntityId, Function, Location, Module, ObjectKind,
    Parameter, ParameterKind, Signature,
};
