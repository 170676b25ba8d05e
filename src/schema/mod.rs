//! Schema Registry
//!
//! Maps an entity type tag to a declarative validation ruleset and evaluates
//! payloads against it, collecting every violation.
//!
//! # Architecture
//!
//! - `rules.rs` - field rules, conditional rules and the `Schema` builder
//! - `validator.rs` - collect-all evaluation producing normalised documents
//! - `details.rs` - field-path keyed error aggregation
//! - `builtin.rs` - the record types the frontend submits
//! - `registry.rs` - `EntityType` and the startup-built `SchemaRegistry`
//! - `error.rs` - configuration and lookup errors

mod builtin;
mod details;
mod error;
mod registry;
mod rules;
mod validator;

pub use builtin::{DEVELOPER_TYPES, NATIONALITIES, ORG_TYPES};
pub use details::{ErrorDetails, Violation};
pub use error::{SchemaError, SchemaResult};
pub use registry::{EntityType, SchemaRegistry};
pub use rules::{ConditionalRule, Effect, FieldKind, FieldRule, Presence, Schema};

/// Body field naming the entity type a payload should be validated as.
pub const ENTITY_TAG: &str = "entity";
