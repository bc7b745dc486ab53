//! Store-backed conformity operations: bulk linking, copying and replacing links.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::types::{ConformityLink, ConformityType};
use crate::error::BoardResult;
use crate::store::BoardStore;

#[derive(Clone)]
pub struct ConformityLinker {
    store: Arc<dyn BoardStore>,
}

impl std::fmt::Debug for ConformityLinker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConformityLinker")
            .field("store", &"BoardStore")
            .finish()
    }
}

impl ConformityLinker {
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self { store }
    }

    /// Link `main` to every id in `rel_ids`, one record per pair
    pub async fn link_many(
        &self,
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
        rel_ids: &[Uuid],
    ) -> BoardResult<usize> {
        for rel_id in rel_ids {
            self.store
                .insert_conformity(ConformityLink::new(main_type, main_type_id, rel_type, *rel_id))
                .await?;
        }

        debug!(
            main_type = %main_type,
            main_type_id = %main_type_id,
            rel_type = %rel_type,
            count = rel_ids.len(),
            "Linked conformities"
        );

        Ok(rel_ids.len())
    }

    /// Ids related to `main` through links of `rel_type`
    pub async fn related_ids(
        &self,
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
    ) -> BoardResult<Vec<Uuid>> {
        let links = self.store.find_conformities(main_type, main_type_id).await?;

        Ok(links
            .iter()
            .filter_map(|link| link.counterpart(main_type, main_type_id))
            .filter(|(kind, _)| *kind == rel_type)
            .map(|(_, id)| id)
            .collect())
    }

    /// Replace all `rel_type` links of `main` with `rel_ids`
    pub async fn replace(
        &self,
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
        rel_ids: &[Uuid],
    ) -> BoardResult<()> {
        let current = self.related_ids(main_type, main_type_id, rel_type).await?;
        let changes = super::differ::diff(&current, rel_ids);

        if !changes.removed_user_ids.is_empty() {
            self.store
                .remove_conformities_between(
                    main_type,
                    main_type_id,
                    rel_type,
                    &changes.removed_user_ids,
                )
                .await?;
        }

        self.link_many(main_type, main_type_id, rel_type, &changes.added_user_ids)
            .await?;

        Ok(())
    }

    /// Give `target` the same companies and customers as `source`
    pub async fn copy_contacts(
        &self,
        kind: ConformityType,
        source_id: Uuid,
        target_id: Uuid,
    ) -> BoardResult<()> {
        for rel_type in [ConformityType::Company, ConformityType::Customer] {
            let ids = self.related_ids(kind, source_id, rel_type).await?;
            self.link_many(kind, target_id, rel_type, &ids).await?;
        }
        Ok(())
    }
}
