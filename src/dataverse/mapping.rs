//! Frontend field names to Dataverse attribute names.
//!
//! Clients submit the same camelCase documents to both destinations. Before a
//! write reaches Dataverse each field is renamed to its attribute logical
//! name and enumerated labels become option codes. Fields without a column
//! are not sent.

use super::organisation::{developer_type_code, nationality_id};
use crate::gateway::Document;
use crate::registry::Collection;
use serde_json::Value as JsonValue;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Attribute {
    /// Value sent unchanged.
    Text(&'static str),
    /// Empty string sent as `null`.
    Nullable(&'static str),
    /// `Yes` is 1, anything else 0.
    YesNo(&'static str),
    /// Option set; an empty or unknown label is `null`.
    Choice(&'static str, fn(&str) -> Option<u32>),
    /// Lookup bound to a country record; omitted when unknown.
    Country(&'static str),
}

/// `nm_creditsalesstatus` option codes.
pub fn credit_sales_status_code(label: &str) -> Option<u32> {
    let code = match label {
        "Application received" => 930_750_000,
        "Unsigned certificate sent" => 930_750_001,
        "Signed developer's declaration received" => 930_750_002,
        "Planning application decision received" => 930_750_003,
        "Second stage payment" => 930_750_004,
        "Developer withdrawn" => 930_750_005,
        "Cannot service" => 930_750_007,
        "First stage payment" => 930_750_008,
        "Final certificate sent" => 930_750_009,
        "CDD check" => 930_750_010,
        "Prioritisation" => 930_750_011,
        "NE withdrawn" => 930_750_012,
        _ => return None,
    };
    Some(code)
}

/// Codes shared by the applicant and site-interest answers.
pub fn developer_interest_code(label: &str) -> Option<u32> {
    match label {
        "Yes" | "Freehold" => Some(1),
        "NA - Information not provided by the applicant" => Some(2),
        "NA - No historical data" => Some(3),
        "Other" => Some(4),
        _ => None,
    }
}

fn contact_attribute(field: &str) -> Option<Attribute> {
    use Attribute::*;
    Some(match field {
        "firstName" => Text("firstname"),
        "lastName" => Text("lastname"),
        "email" => Text("nm_email"),
        "phone" => Text("nm_telephonenumber"),
        "address" => Text("address1_line1"),
        _ => return None,
    })
}

fn organisation_attribute(field: &str) -> Option<Attribute> {
    use Attribute::*;
    Some(match field {
        "orgName" => Nullable("nm_organisationname"),
        "typeOfDeveloper" => Choice("nm_typeofdeveloper", developer_type_code),
        "nationality" => Country("nm_Nationality@odata.bind"),
        "address1" => Text("nm_residentialaddressline1"),
        "address2" => Text("nm_residentialaddressline2"),
        "address3" => Text("nm_residentialaddressline3"),
        "townRCity" => Text("nm_residentialtownorcity"),
        "postcode" => Text("nm_residentialpostcode"),
        "dateOfBirth" => Nullable("nm_dateofbirth"),
        _ => return None,
    })
}

fn development_site_attribute(field: &str) -> Option<Attribute> {
    use Attribute::*;
    Some(match field {
        "catchment" => Text("nm_catchment"),
        "certificateExtensionRequired" => YesNo("nm_certificateextensionrequired"),
        "creditSalesStatus" => Choice("nm_creditsalesstatus", credit_sales_status_code),
        "customerDueDiligenceCheckNeeded" => YesNo("nm_customerduediligencecheckneeded"),
        "developerCompany" => Text("nm_developercompany"),
        "gridReference" => Text("nm_gridreference"),
        "lpas" => Text("nm_lpas"),
        "numberOfUnitsToBeBuilt" => Text("nm_numberofunitstobebuilt"),
        "ownerId" => Text("ownerid"),
        "phasedDevelopment" => YesNo("nm_phaseddevelopment"),
        "planningPermission" => YesNo("nm_planningpermission"),
        "siteName" => Text("nm_sitename"),
        "smeDeveloper" => YesNo("nm_smedeveloper"),
        "stateCode" => Text("statecode"),
        "subCatchments" => Text("nm_subcatchments"),
        "theDeveloperIsTheApplicant" => {
            Choice("nm_thedeveloperistheapplicant", developer_interest_code)
        }
        "theDevelopersInterestInTheDevelopmentSite" => Choice(
            "nm_thedevelopersinterestinthedevelopmentsite",
            developer_interest_code,
        ),
        "haveYouIncludedTheProposedRedLineB" => {
            YesNo("nm_haveyouincludedamapoftheproposedredlineb")
        }
        _ => return None,
    })
}

fn attribute(collection: Collection, field: &str) -> Option<Attribute> {
    match collection {
        Collection::Contact => contact_attribute(field),
        Collection::Organisation => organisation_attribute(field),
        Collection::DevelopmentSite => development_site_attribute(field),
        Collection::Upload => None,
    }
}

fn label(value: &JsonValue) -> &str {
    value.as_str().unwrap_or_default()
}

fn convert(attribute: Attribute, value: JsonValue) -> Option<(&'static str, JsonValue)> {
    match attribute {
        Attribute::Text(name) => Some((name, value)),
        Attribute::Nullable(name) => match label(&value) {
            "" => Some((name, JsonValue::Null)),
            _ => Some((name, value)),
        },
        Attribute::YesNo(name) => Some((name, JsonValue::from(u32::from(label(&value) == "Yes")))),
        Attribute::Choice(name, code) => Some((
            name,
            code(label(&value)).map_or(JsonValue::Null, JsonValue::from),
        )),
        Attribute::Country(name) => nationality_id(label(&value))
            .map(|country| (name, JsonValue::String(format!("/nm_countries({country})")))),
    }
}

/// Renames a validated document's fields to the collection's Dataverse
/// attributes. Only fields present in `document` are written, so a partial
/// update stays partial.
pub fn entity_payload(collection: Collection, document: Document) -> Document {
    let mut payload = Document::new();
    for (field, value) in document {
        match attribute(collection, &field).and_then(|attribute| convert(attribute, value)) {
            Some((name, value)) => {
                payload.insert(name.to_string(), value);
            }
            None => debug!(%collection, field = field.as_str(), "field has no dataverse attribute"),
        }
    }
    payload
}
