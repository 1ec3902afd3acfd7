//! Entity Component System core types.
//!
//! Components are registered by name with a schema describing their fields.
//! Each registration takes the next bit of a sequence of 32-bit generation
//! words, so membership of an entity across all component types is the
//! concatenation of its generation words. Systems subscribe to a required set
//! of components and keep a dense list of the entities that currently match.

mod component;
mod entity;
mod field_store;
mod mask;
mod schema;
mod system;
mod system_descriptor;
mod system_registration_error;
mod system_registry;
mod world;

pub use component::{
    ComponentDescriptor, ComponentId, ComponentRegistrationError, ComponentRegistry,
};
pub use entity::{EntityAllocator, EntityId};
pub use field_store::{Column, FieldError, FieldStore, FlatField};
pub use mask::{generations_for, BitPattern, ComponentBit, MembershipMasks, BITS_PER_GENERATION};
pub use schema::{FieldType, PrimitiveKind, Schema, SchemaError};
pub use system::{System, SystemHandle};
pub use system_descriptor::SystemDescriptor;
pub use system_registration_error::SystemRegistrationError;
pub(crate) use system_registry::SystemRegistry;
pub use world::{PendingRemoval, World, WorldError};
