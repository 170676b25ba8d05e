//! Collection Registry
//!
//! Resolves the logical collection name taken from a request path to the
//! physical destination of one gateway. Tables are fixed at construction.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),
}

/// Logical collections known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Contact,
    Organisation,
    DevelopmentSite,
    Upload,
}

impl Collection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Contact => "contact",
            Collection::Organisation => "organisation",
            Collection::DevelopmentSite => "developmentSite",
            Collection::Upload => "upload",
        }
    }
}

impl FromStr for Collection {
    type Err = RegistryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "contact" | "contacts" => Ok(Collection::Contact),
            "organisation" | "organization" | "organisations" | "organizations" => {
                Ok(Collection::Organisation)
            }
            "developmentSite" | "developmentSites" => Ok(Collection::DevelopmentSite),
            "upload" | "uploads" => Ok(Collection::Upload),
            other => Err(RegistryError::UnknownCollection(other.to_string())),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    /// Document-store collection.
    Collection,
    /// Dataverse entity set.
    ExternalEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    kind: DestinationKind,
    collection: Collection,
    name: &'static str,
}

impl Destination {
    pub fn kind(&self) -> DestinationKind {
        self.kind
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Physical name handed to the gateway.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone)]
pub struct CollectionRegistry {
    kind: DestinationKind,
    entries: HashMap<Collection, &'static str>,
}

impl CollectionRegistry {
    fn with_entries(kind: DestinationKind, entries: &[(Collection, &'static str)]) -> Self {
        Self {
            kind,
            entries: entries.iter().copied().collect(),
        }
    }

    /// Document-store collections.
    pub fn document_store() -> Self {
        Self::with_entries(
            DestinationKind::Collection,
            &[
                (Collection::Contact, "Contact"),
                (Collection::Organisation, "Organisation"),
                (Collection::DevelopmentSite, "DevelopmentSite"),
                (Collection::Upload, "Upload"),
            ],
        )
    }

    /// Dataverse entity sets. Uploads have no Dataverse counterpart.
    pub fn dataverse() -> Self {
        Self::with_entries(
            DestinationKind::ExternalEntity,
            &[
                (Collection::Contact, "contacts"),
                (Collection::Organisation, "nm_organisations"),
                (Collection::DevelopmentSite, "nm_developmentsites"),
            ],
        )
    }

    pub fn kind(&self) -> DestinationKind {
        self.kind
    }

    pub fn destination_for(&self, name: &str) -> Result<Destination, RegistryError> {
        let collection = name.parse::<Collection>()?;
        let physical = *self
            .entries
            .get(&collection)
            .ok_or_else(|| RegistryError::UnknownCollection(name.to_string()))?;
        Ok(Destination {
            kind: self.kind,
            collection,
            name: physical,
        })
    }
}

/// Validates a platform logical name before it is spliced into a request URL.
pub fn validate_logical_name(name: &str) -> Result<(), RegistryError> {
    let Some(first) = name.chars().next() else {
        return Err(RegistryError::InvalidName(
            "name cannot be empty".to_string(),
        ));
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(RegistryError::InvalidName(format!(
            "'{name}' must start with a letter or underscore"
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RegistryError::InvalidName(format!(
            "'{name}' can only contain letters, numbers, and underscores"
        )));
    }

    if name.len() > 128 {
        return Err(RegistryError::InvalidName(format!(
            "'{name}' is too long (max 128 characters)"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_store_resolves_every_collection() {
        let registry = CollectionRegistry::document_store();
        let destination = registry.destination_for("contacts").unwrap();
        assert_eq!(destination.name(), "Contact");
        assert_eq!(destination.kind(), DestinationKind::Collection);
        assert_eq!(destination.collection(), Collection::Contact);
        assert_eq!(registry.destination_for("upload").unwrap().name(), "Upload");
    }

    #[test]
    fn dataverse_maps_to_entity_sets() {
        let registry = CollectionRegistry::dataverse();
        assert_eq!(
            registry.destination_for("organization").unwrap().name(),
            "nm_organisations"
        );
        assert_eq!(
            registry.destination_for("developmentSite").unwrap().name(),
            "nm_developmentsites"
        );
    }

    #[test]
    fn unmapped_names_are_unknown() {
        assert_eq!(
            CollectionRegistry::document_store().destination_for("invoices"),
            Err(RegistryError::UnknownCollection("invoices".to_string()))
        );
        assert_eq!(
            CollectionRegistry::dataverse().destination_for("upload"),
            Err(RegistryError::UnknownCollection("upload".to_string()))
        );
    }

    #[test]
    fn logical_names() {
        assert!(validate_logical_name("contact").is_ok());
        assert!(validate_logical_name("nm_countries").is_ok());
        assert!(validate_logical_name("_internal").is_ok());
        assert!(validate_logical_name("").is_err());
        assert!(validate_logical_name("1contact").is_err());
        assert!(validate_logical_name("contact')/x").is_err());
        assert!(validate_logical_name("a b").is_err());
    }
}
