//! Lookups the import worker needs outside the board collections: users, tags,
//! companies and customers.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::BoardResult;

#[async_trait]
pub trait ImportDirectory: Send + Sync + 'static {
    async fn find_user_by_email(&self, email: &str) -> BoardResult<Option<Uuid>>;

    /// First tag whose name contains `name`, ignoring case
    async fn find_tag_by_name(&self, name: &str) -> BoardResult<Option<Uuid>>;

    async fn find_company_ids_by_primary_names(&self, names: &[String]) -> BoardResult<Vec<Uuid>>;

    async fn find_customer_ids_by_primary_emails(
        &self,
        emails: &[String],
    ) -> BoardResult<Vec<Uuid>>;
}

#[derive(Debug, Default)]
struct DirectoryRecords {
    users: Vec<(Uuid, String)>,
    tags: Vec<(Uuid, String)>,
    companies: Vec<(Uuid, String)>,
    customers: Vec<(Uuid, String)>,
}

/// Directory held in memory; used by tests and embedding applications
#[derive(Debug, Default)]
pub struct InMemoryImportDirectory {
    records: RwLock<DirectoryRecords>,
}

impl InMemoryImportDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.records.write().users.push((id, email.into()));
        id
    }

    pub fn add_tag(&self, name: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.records.write().tags.push((id, name.into()));
        id
    }

    pub fn add_company(&self, primary_name: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.records.write().companies.push((id, primary_name.into()));
        id
    }

    pub fn add_customer(&self, primary_email: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.records.write().customers.push((id, primary_email.into()));
        id
    }
}

fn ids_matching(records: &[(Uuid, String)], wanted: &[String]) -> Vec<Uuid> {
    records
        .iter()
        .filter(|(_, value)| wanted.contains(value))
        .map(|(id, _)| *id)
        .collect()
}

#[async_trait]
impl ImportDirectory for InMemoryImportDirectory {
    async fn find_user_by_email(&self, email: &str) -> BoardResult<Option<Uuid>> {
        Ok(self
            .records
            .read()
            .users
            .iter()
            .find(|(_, user_email)| user_email == email)
            .map(|(id, _)| *id))
    }

    async fn find_tag_by_name(&self, name: &str) -> BoardResult<Option<Uuid>> {
        let needle = name.to_lowercase();
        Ok(self
            .records
            .read()
            .tags
            .iter()
            .find(|(_, tag)| tag.to_lowercase().contains(&needle))
            .map(|(id, _)| *id))
    }

    async fn find_company_ids_by_primary_names(&self, names: &[String]) -> BoardResult<Vec<Uuid>> {
        Ok(ids_matching(&self.records.read().companies, names))
    }

    async fn find_customer_ids_by_primary_emails(
        &self,
        emails: &[String],
    ) -> BoardResult<Vec<Uuid>> {
        Ok(ids_matching(&self.records.read().customers, emails))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tag_lookup_is_case_insensitive_substring() {
        let directory = InMemoryImportDirectory::new();
        let vip = directory.add_tag("VIP Customers");

        assert_eq!(directory.find_tag_by_name("vip").await.unwrap(), Some(vip));
        assert_eq!(directory.find_tag_by_name("gold").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_company_lookup_by_primary_names() {
        let directory = InMemoryImportDirectory::new();
        let acme = directory.add_company("Acme");
        directory.add_company("Globex");

        let ids = directory
            .find_company_ids_by_primary_names(&["Acme".to_string(), "Initech".to_string()])
            .await
            .unwrap();
        assert_eq!(ids, vec![acme]);
    }
}
