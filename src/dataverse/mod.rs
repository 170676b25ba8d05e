//! Dataverse External Entity Gateway
//!
//! - `auth.rs` - bearer tokens via the client-credentials grant
//! - `client.rs` - OData requests against the Web API
//! - `mapping.rs` - frontend field names to Dataverse attributes
//! - `options.rs` - dropdown options from option sets and reference tables
//! - `organisation.rs` - organisation + contact submission mapping

pub mod auth;
mod client;
pub mod mapping;
pub mod options;
pub mod organisation;

pub use auth::{
    AccessToken, AuthError, CachedTokenProvider, ClientCredentials, ClientCredentialsProvider,
    MissingCredentials, TokenProvider,
};
pub use client::{CreatedRecord, DataverseGateway, id_from_entity_url, parse_guid, primary_key};
pub use options::{SelectOption, nested_property_value, process_options};
