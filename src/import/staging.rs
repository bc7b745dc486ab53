//! # Record Staging
//!
//! Turns one raw import row into a [`StagedRecord`]. [`StagedRecordBuilder`]
//! accumulates already-resolved values; [`RecordStager`] walks the property
//! descriptors, performs the directory and stage lookups and feeds the builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::creator::ContentType;
use super::directory::ImportDirectory;
use super::properties::PropertyDescriptor;
use crate::error::BoardResult;
use crate::store::BoardStore;

const DEFAULT_EMAIL_VALIDATION_STATUS: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldValue {
    pub field_id: String,
    pub value: String,
}

/// Typed document handed to an [`super::ItemCreator`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedRecord {
    /// Basic and custom-data attributes keyed by property name
    pub fields: BTreeMap<String, String>,
    pub names: Vec<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub custom_fields_data: Vec<CustomFieldValue>,
    /// Resolved owner references keyed by property name
    pub user_refs: BTreeMap<String, Uuid>,
    pub stage_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub companies_primary_names: Vec<String>,
    pub customers_primary_emails: Vec<String>,
    pub email_validation_status: Option<String>,
    pub scope_brand_ids: Vec<String>,
    /// Creator of imported board items
    pub user_id: Option<Uuid>,
}

impl StagedRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn primary_name(&self) -> &str {
        self.field("primaryName").unwrap_or_default()
    }

    pub fn primary_email(&self) -> &str {
        self.field("primaryEmail").unwrap_or_default()
    }

    pub fn primary_phone(&self) -> &str {
        self.field("primaryPhone").unwrap_or_default()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub struct StagedRecordBuilder {
    content_type: ContentType,
    record: StagedRecord,
}

impl StagedRecordBuilder {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            record: StagedRecord::default(),
        }
    }

    pub fn scope_brands(mut self, brand_ids: Vec<String>) -> Self {
        self.record.scope_brand_ids = brand_ids;
        self
    }

    /// Plain attribute; contact attributes also populate the contact lists
    pub fn basic(&mut self, name: &str, value: &str) -> &mut Self {
        self.record.fields.insert(name.to_string(), value.to_string());

        if value.is_empty() {
            return self;
        }

        match name {
            "primaryName" => self.record.names = vec![value.to_string()],
            "primaryEmail" => self.record.emails = vec![value.to_string()],
            "primaryPhone" => self.record.phones = vec![value.to_string()],
            "names" => self.record.names = split_list(value),
            "emails" => self.record.emails = split_list(value),
            "phones" => self.record.phones = split_list(value),
            _ => {}
        }
        self
    }

    pub fn custom_data(&mut self, name: &str, value: &str) -> &mut Self {
        self.record.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn custom_field(&mut self, field_id: &str, value: &str) -> &mut Self {
        self.record.custom_fields_data.push(CustomFieldValue {
            field_id: field_id.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn owner(&mut self, name: &str, user_id: Option<Uuid>) -> &mut Self {
        match user_id {
            Some(id) => {
                self.record.user_refs.insert(name.to_string(), id);
            }
            None => {
                self.record.user_refs.remove(name);
            }
        }
        self
    }

    /// Stage references only stick on board items
    pub fn stage(&mut self, stage_id: Option<Uuid>) -> &mut Self {
        if self.content_type.is_board_item() {
            if let Some(id) = stage_id {
                self.record.stage_id = Some(id);
            }
        }
        self
    }

    pub fn tag(&mut self, tag_id: Option<Uuid>) -> &mut Self {
        self.record.tag_ids = tag_id.into_iter().collect();
        self
    }

    pub fn companies(&mut self, value: &str) -> &mut Self {
        self.record.companies_primary_names = split_list(value);
        self
    }

    pub fn customers(&mut self, value: &str) -> &mut Self {
        self.record.customers_primary_emails = split_list(value);
        self
    }

    /// Apply per-content-type defaults and return the record
    pub fn build(mut self, user_id: Uuid) -> StagedRecord {
        if self.content_type == ContentType::Customer
            && self.record.email_validation_status.is_none()
        {
            self.record.email_validation_status = Some(DEFAULT_EMAIL_VALIDATION_STATUS.to_string());
        }

        if self.content_type.is_board_item() {
            self.record.user_id = Some(user_id);
        }

        self.record
    }
}

/// Resolves descriptor lookups and produces staged records
#[derive(Clone)]
pub struct RecordStager {
    store: Arc<dyn BoardStore>,
    directory: Arc<dyn ImportDirectory>,
}

impl std::fmt::Debug for RecordStager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStager").finish_non_exhaustive()
    }
}

impl RecordStager {
    pub fn new(store: Arc<dyn BoardStore>, directory: Arc<dyn ImportDirectory>) -> Self {
        Self { store, directory }
    }

    /// Stage one row; missing trailing columns read as empty strings
    pub async fn stage(
        &self,
        content_type: ContentType,
        properties: &[PropertyDescriptor],
        row: &[String],
        user_id: Uuid,
        scope_brand_ids: &[String],
    ) -> BoardResult<StagedRecord> {
        let mut builder = StagedRecordBuilder::new(content_type).scope_brands(scope_brand_ids.to_vec());

        for (index, property) in properties.iter().enumerate() {
            let value = row.get(index).map(String::as_str).unwrap_or_default();

            match property {
                PropertyDescriptor::CustomProperty { field_id } => {
                    builder.custom_field(field_id, value);
                }
                PropertyDescriptor::CustomData { name } => {
                    builder.custom_data(name, value);
                }
                PropertyDescriptor::OwnerEmail { name } => {
                    let owner = self.directory.find_user_by_email(value).await?;
                    builder.owner(name, owner);
                }
                PropertyDescriptor::CompaniesPrimaryNames => {
                    builder.companies(value);
                }
                PropertyDescriptor::CustomersPrimaryEmails => {
                    builder.customers(value);
                }
                PropertyDescriptor::StageName { .. } => {
                    let stage = self.store.find_stage_by_name(value).await?;
                    builder.stage(stage.map(|stage| stage.id));
                }
                PropertyDescriptor::Tag { .. } => {
                    let tag = self.directory.find_tag_by_name(value).await?;
                    builder.tag(tag);
                }
                PropertyDescriptor::Basic { name } => {
                    builder.basic(name, value);
                }
            }
        }

        Ok(builder.build(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_lists_follow_basic_fields() {
        let mut builder = StagedRecordBuilder::new(ContentType::Customer);
        builder
            .basic("primaryEmail", "a@example.com")
            .basic("phones", "111, 222,")
            .basic("names", "");

        let record = builder.build(Uuid::new_v4());

        assert_eq!(record.emails, vec!["a@example.com".to_string()]);
        assert_eq!(record.phones, vec!["111".to_string(), "222".to_string()]);
        assert!(record.names.is_empty());
        assert_eq!(record.primary_email(), "a@example.com");
    }

    #[test]
    fn test_customer_defaults_email_validation_status() {
        let record = StagedRecordBuilder::new(ContentType::Customer).build(Uuid::new_v4());
        assert_eq!(record.email_validation_status.as_deref(), Some("unknown"));
        assert_eq!(record.user_id, None);
    }

    #[test]
    fn test_board_items_get_creator_and_stage() {
        let user = Uuid::new_v4();
        let stage = Uuid::new_v4();

        let mut builder = StagedRecordBuilder::new(ContentType::Deal);
        builder.stage(Some(stage));
        let record = builder.build(user);
        assert_eq!(record.user_id, Some(user));
        assert_eq!(record.stage_id, Some(stage));

        let mut builder = StagedRecordBuilder::new(ContentType::Company);
        builder.stage(Some(stage));
        let record = builder.build(user);
        assert_eq!(record.stage_id, None);
        assert_eq!(record.user_id, None);
    }
}
