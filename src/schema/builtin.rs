//! Schemas for the record types the frontend submits.
//!
//! Enumerated fields travel as human-readable labels. Translation to Dataverse
//! option codes happens at the gateway boundary (see `dataverse::organisation`).

use super::error::SchemaResult;
use super::rules::{ConditionalRule, FieldRule, Schema};

const PHONE_PATTERN: &str = r"^\d{1,11}$";

const YES_NO: &[&str] = &["Yes", "No"];

pub const ORG_TYPES: &[&str] = &["Developer", "Landowner", "Mitigation provider"];
pub const DEVELOPER_TYPES: &[&str] = &["Company", "Individual", "Public body"];
pub const NATIONALITIES: &[&str] = &["United Kingdom", "United States", "India"];

/// Organisation types for which a residential address is mandatory.
const ADDRESSED_ORG_TYPES: &[&str] = &["Landowner", "Mitigation provider"];

const CREDIT_SALES_STATUSES: &[&str] = &[
    "Application received",
    "Prioritisation",
    "Cannot service",
    "CDD check",
    "Unsigned certificate sent",
    "Signed developer's declaration received",
    "First stage payment",
    "Planning application decision received",
    "Second stage payment",
    "Final certificate sent",
    "Developer withdrawn",
    "NE withdrawn",
];

const APPLICANT_ANSWERS: &[&str] = &[
    "Yes",
    "NA - Information not provided by the applicant",
    "NA - No historical data",
    "Other",
];

const INTEREST_ANSWERS: &[&str] = &[
    "Freehold",
    "NA - Information not provided by the applicant",
    "NA - No historical data",
    "Other",
];

pub(crate) fn contact() -> SchemaResult<Schema> {
    Ok(Schema::new().fields([
        FieldRule::string("firstName").label("First Name").max(50).required(),
        FieldRule::string("lastName").label("Last Name").max(50).required(),
        FieldRule::string("email")
            .label("E-Mail ID")
            .max(100)
            .email()?
            .required(),
        FieldRule::string("phone")
            .label("Telephone")
            .pattern(PHONE_PATTERN)?,
        FieldRule::string("address")
            .label("Address")
            .max(100)
            .allow_empty()
            .default_value(""),
    ]))
}

/// Contact entry inside a list submission; every field is mandatory.
fn contact_item() -> SchemaResult<Schema> {
    Ok(Schema::new().fields([
        FieldRule::string("firstName").label("First Name").max(50).required(),
        FieldRule::string("lastName").label("Last Name").max(50).required(),
        FieldRule::string("email")
            .label("E-Mail ID")
            .max(100)
            .email()?
            .required(),
        FieldRule::string("phone")
            .label("Telephone")
            .pattern(PHONE_PATTERN)?
            .required(),
        FieldRule::string("cid").label("Contact ID").required(),
    ]))
}

pub(crate) fn contacts() -> SchemaResult<Schema> {
    Ok(Schema::new().fields([
        FieldRule::array("contacts", contact_item()?)
            .label("Contacts")
            .required(),
        FieldRule::string("status").label("Status").required(),
    ]))
}

fn optional_text(name: &'static str, label: &'static str, max: usize) -> FieldRule {
    FieldRule::string(name)
        .label(label)
        .max(max)
        .allow_empty()
        .default_value("")
}

fn organisation_fields() -> Vec<FieldRule> {
    vec![
        FieldRule::string("orgName").label("Organization Name").required(),
        FieldRule::string("orgType")
            .label("Type of Organization")
            .one_of(ORG_TYPES)
            .required(),
        FieldRule::string("typeOfDeveloper")
            .label("Type of Developer")
            .one_of(DEVELOPER_TYPES)
            .allow_empty(),
        optional_text("mitigationProviderSBI", "Mitigation Provide SBI", 9),
        optional_text("crn", "Company Registration Number", 8),
        FieldRule::string("nationality")
            .label("Nationality")
            .one_of(NATIONALITIES)
            .allow_empty(),
        FieldRule::string("address1").label("Address 1").max(100).allow_empty(),
        optional_text("address2", "Address 2", 100),
        optional_text("address3", "Address 3", 100),
        FieldRule::string("townRCity").label("Town/City").max(100).allow_empty(),
        FieldRule::string("postcode").label("Postal Code").max(100).allow_empty(),
        FieldRule::string("regAddress1").label("Address 1").max(100).allow_empty(),
        optional_text("regAddress2", "Address 2", 100),
        optional_text("regAddress3", "Address 3", 100),
        FieldRule::string("regTownRCity").label("Town/City").max(100).allow_empty(),
        FieldRule::string("regPostcode").label("Postal Code").max(100).allow_empty(),
        FieldRule::string("status").label("Status").required(),
    ]
}

fn organisation_conditions(schema: Schema) -> Schema {
    let schema = schema
        .when(ConditionalRule::require_when(
            "typeOfDeveloper",
            "orgType",
            &["Developer"],
        ))
        .when(ConditionalRule::require_when(
            "nationality",
            "typeOfDeveloper",
            &["Individual"],
        ));

    let schema = ["address1", "townRCity", "postcode"]
        .into_iter()
        .fold(schema, |schema, field| {
            schema.when(ConditionalRule::require_when(
                field,
                "orgType",
                ADDRESSED_ORG_TYPES,
            ))
        });

    ["regAddress1", "regTownRCity", "regPostcode"]
        .into_iter()
        .fold(schema, |schema, field| {
            schema.when(ConditionalRule::require_when(
                field,
                "typeOfDeveloper",
                DEVELOPER_TYPES,
            ))
        })
}

pub(crate) fn organisation() -> SchemaResult<Schema> {
    let schema = Schema::new()
        .fields(organisation_fields())
        .field(FieldRule::array("contacts", contact_item()?).label("Contacts"));
    Ok(organisation_conditions(schema))
}

/// Organisation submitted together with its primary contact.
pub(crate) fn organisation_contact() -> SchemaResult<Schema> {
    let schema = Schema::new().fields(organisation_fields()).fields([
        FieldRule::string("firstName").label("First Name").max(50).required(),
        FieldRule::string("lastName").label("Last Name").max(50).required(),
        FieldRule::string("email")
            .label("E-Mail ID")
            .max(100)
            .email()?
            .required(),
        FieldRule::string("phone")
            .label("Telephone")
            .pattern(PHONE_PATTERN)?
            .required(),
        FieldRule::string("dateOfBirth")
            .label("Date of Birth")
            .allow_empty()
            .default_value(""),
    ]);
    Ok(organisation_conditions(schema))
}

fn required_text(name: &'static str, max: usize) -> FieldRule {
    FieldRule::string(name).max(max).required()
}

/// A listed answer that must be submitted, possibly as `""`.
fn answer(name: &'static str, values: &[&'static str]) -> FieldRule {
    FieldRule::string(name).one_of(values).allow_empty().required()
}

pub(crate) fn development_site() -> SchemaResult<Schema> {
    Ok(Schema::new().fields([
        required_text("developmentSiteId", 50),
        required_text("catchment", 50),
        answer("certificateExtensionRequired", YES_NO),
        answer("creditSalesStatus", CREDIT_SALES_STATUSES),
        answer("customerDueDiligenceCheckNeeded", YES_NO),
        required_text("developerCompany", 50),
        required_text("gridReference", 14),
        required_text("lpas", 50),
        required_text("numberOfUnitsToBeBuilt", 50),
        required_text("ownerId", 50),
        answer("phasedDevelopment", YES_NO),
        answer("planningPermission", YES_NO),
        required_text("siteName", 50),
        answer("smeDeveloper", YES_NO),
        required_text("stateCode", 50),
        required_text("subCatchments", 50),
        answer("theDeveloperIsTheApplicant", APPLICANT_ANSWERS),
        answer("theDevelopersInterestInTheDevelopmentSite", INTEREST_ANSWERS),
        answer("haveYouIncludedTheProposedRedLineB", YES_NO),
    ]))
}

pub(crate) fn upload() -> SchemaResult<Schema> {
    let file = Schema::new().fields([
        FieldRule::string("filename").label("File Name").required(),
        FieldRule::string("fileUrl").label("File URl").required(),
    ]);
    Ok(Schema::new().fields([
        FieldRule::object("file", file).label("File").required(),
        FieldRule::string("status")
            .label("Status")
            .one_of(&["complete", "incomplete"])
            .required(),
    ]))
}
