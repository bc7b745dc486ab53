use serde::{Deserialize, Serialize};

/// How one column of an import row maps onto the staged record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PropertyDescriptor {
    /// Value of a custom field, keyed by the field definition id
    CustomProperty {
        #[serde(rename = "id")]
        field_id: String,
    },
    /// Free-form string stored under `name`
    CustomData { name: String },
    /// Email resolved to a user id stored under `name`
    OwnerEmail { name: String },
    /// Comma separated primary names of companies to link
    CompaniesPrimaryNames,
    /// Comma separated primary emails of customers to link
    CustomersPrimaryEmails,
    /// Stage name resolved to a stage id; board items only
    StageName { name: String },
    /// Tag name resolved with a case-insensitive substring match
    Tag { name: String },
    /// Plain attribute; primary / list contact fields also fill the contact lists
    Basic { name: String },
}
