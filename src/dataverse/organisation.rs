//! Organisation + primary contact submission.
//!
//! The contact is created with its organisation deep-inserted through the
//! `nm_Organisation` navigation property. A nationality, when given, is bound
//! to the new organisation afterwards since lookups to reference data cannot
//! ride along in the deep insert.

use super::client::DataverseGateway;
use crate::gateway::{Document, GatewayResult};
use serde_json::{Value as JsonValue, json};
use tracing::{info, warn};
use uuid::Uuid;

pub const CONTACT_ENTITY_SET: &str = "contacts";
pub const ORGANISATION_ENTITY_SET: &str = "nm_organisations";

const ORGANISATION_LOOKUP: &str = "_nm_organisation_value";

/// `nm_typeofdeveloper` option codes.
pub fn developer_type_code(label: &str) -> Option<u32> {
    match label {
        "Company" => Some(930_750_000),
        "Individual" => Some(930_750_001),
        "Public body" => Some(930_750_002),
        _ => None,
    }
}

/// `nm_countries` record for a nationality label.
pub fn nationality_id(label: &str) -> Option<Uuid> {
    let raw = match label {
        "United Kingdom" => "7bbb6fa9-7fdc-ee11-904d-002248c8796d",
        "United States" => "2f670df7-7fdc-ee11-904d-002248c87a10",
        "India" => "dfb20ccd-7fdc-ee11-904d-002248c87a10",
        _ => return None,
    };
    Uuid::parse_str(raw).ok()
}

fn text<'a>(submission: &'a Document, field: &str) -> Option<&'a str> {
    submission.get(field).and_then(JsonValue::as_str)
}

/// The field's value, with an empty string written as `null`.
fn nullable(submission: &Document, field: &str) -> JsonValue {
    match text(submission, field) {
        Some("") | None => JsonValue::Null,
        Some(value) => JsonValue::String(value.to_string()),
    }
}

fn passthrough(submission: &Document, field: &str) -> JsonValue {
    submission.get(field).cloned().unwrap_or(JsonValue::Null)
}

/// Maps a validated submission onto the contact create payload.
pub fn contact_payload(submission: &Document) -> Document {
    let developer_type = text(submission, "typeOfDeveloper")
        .and_then(developer_type_code)
        .map_or(JsonValue::Null, JsonValue::from);

    let organisation = json!({
        "nm_residentialaddressline1": passthrough(submission, "address1"),
        "nm_residentialaddressline2": passthrough(submission, "address2"),
        "nm_residentialaddressline3": passthrough(submission, "address3"),
        "nm_residentialtownorcity": passthrough(submission, "townRCity"),
        "nm_residentialpostcode": passthrough(submission, "postcode"),
        "nm_dateofbirth": nullable(submission, "dateOfBirth"),
        "nm_typeofdeveloper": developer_type,
        "nm_organisationname": nullable(submission, "orgName"),
    });

    let mut payload = Document::new();
    payload.insert("firstname".into(), passthrough(submission, "firstName"));
    payload.insert("lastname".into(), passthrough(submission, "lastName"));
    payload.insert("nm_telephonenumber".into(), passthrough(submission, "phone"));
    payload.insert("nm_email".into(), passthrough(submission, "email"));
    payload.insert("nm_Organisation".into(), organisation);
    payload
}

/// Patch binding an organisation to its nationality's country record.
pub fn nationality_binding(nationality: &str) -> Option<Document> {
    let country = nationality_id(nationality)?;
    let mut patch = Document::new();
    patch.insert(
        "nm_Nationality@odata.bind".into(),
        JsonValue::String(format!("/nm_countries({country})")),
    );
    Some(patch)
}

/// Creates the contact and its organisation, then binds the nationality.
/// Returns the created contact's representation.
pub async fn submit(gateway: &DataverseGateway, submission: &Document) -> GatewayResult<Document> {
    let created = gateway
        .create_record(CONTACT_ENTITY_SET, &contact_payload(submission))
        .await?;
    info!(contact = %created.id, "organisation contact created");

    let binding = text(submission, "nationality").and_then(nationality_binding);
    let organisation = created
        .representation
        .get(ORGANISATION_LOOKUP)
        .and_then(JsonValue::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok());

    match (binding, organisation) {
        (Some(patch), Some(organisation)) => {
            if !gateway
                .update_record(ORGANISATION_ENTITY_SET, organisation, &patch)
                .await?
            {
                warn!(%organisation, "organisation vanished before nationality was bound");
            }
        }
        (Some(_), None) => {
            warn!(contact = %created.id, "no organisation returned; nationality not bound");
        }
        _ => {}
    }

    Ok(created.representation)
}
