use super::builtin;
use super::error::{SchemaError, SchemaResult};
use super::rules::Schema;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Record types a payload can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Contact,
    Contacts,
    Organisation,
    OrganisationContact,
    DevelopmentSite,
    Upload,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Contact,
        EntityType::Contacts,
        EntityType::Organisation,
        EntityType::OrganisationContact,
        EntityType::DevelopmentSite,
        EntityType::Upload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Contact => "contact",
            EntityType::Contacts => "contacts",
            EntityType::Organisation => "organisation",
            EntityType::OrganisationContact => "organisationContact",
            EntityType::DevelopmentSite => "developmentSite",
            EntityType::Upload => "upload",
        }
    }

    fn build_schema(self) -> SchemaResult<Schema> {
        match self {
            EntityType::Contact => builtin::contact(),
            EntityType::Contacts => builtin::contacts(),
            EntityType::Organisation => builtin::organisation(),
            EntityType::OrganisationContact => builtin::organisation_contact(),
            EntityType::DevelopmentSite => builtin::development_site(),
            EntityType::Upload => builtin::upload(),
        }
    }
}

impl FromStr for EntityType {
    type Err = SchemaError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "contact" => Ok(EntityType::Contact),
            "contacts" => Ok(EntityType::Contacts),
            "organisation" | "organization" => Ok(EntityType::Organisation),
            "organisationContact" | "organizationContact" => Ok(EntityType::OrganisationContact),
            "developmentSite" => Ok(EntityType::DevelopmentSite),
            "upload" => Ok(EntityType::Upload),
            other => Err(SchemaError::UnknownEntity(other.to_string())),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only table from entity type to validation ruleset, built once at
/// startup.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<EntityType, Schema>,
}

impl SchemaRegistry {
    /// Builds and checks the schema of every [`EntityType`].
    pub fn builtin() -> SchemaResult<Self> {
        let mut schemas = HashMap::with_capacity(EntityType::ALL.len());
        for entity in EntityType::ALL {
            let schema = entity.build_schema()?;
            schema.check(entity.as_str())?;
            schemas.insert(entity, schema);
        }
        Ok(Self { schemas })
    }

    /// Resolves an untrusted tag. Unknown tags are an error, never a
    /// permissive schema.
    pub fn schema_for(&self, tag: &str) -> SchemaResult<&Schema> {
        let entity = tag.parse::<EntityType>()?;
        self.schema_of(entity)
    }

    pub fn schema_of(&self, entity: EntityType) -> SchemaResult<&Schema> {
        self.schemas
            .get(&entity)
            .ok_or_else(|| SchemaError::UnknownEntity(entity.as_str().to_string()))
    }
}
