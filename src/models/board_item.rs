use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::conformity::ConformityType;
use crate::state_machine::ItemStatus;

/// Kind of card living on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Deal,
    Task,
    Ticket,
    GrowthHack,
}

impl ItemType {
    pub const ALL: [ItemType; 4] = [Self::Deal, Self::Task, Self::Ticket, Self::GrowthHack];

    /// Module name used in links, notification types and conformity records
    pub fn module_name(&self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Task => "task",
            Self::Ticket => "ticket",
            Self::GrowthHack => "growthHack",
        }
    }

    /// Product lines only exist on deals
    pub fn has_products(&self) -> bool {
        matches!(self, Self::Deal)
    }

    pub fn conformity_type(&self) -> ConformityType {
        match self {
            Self::Deal => ConformityType::Deal,
            Self::Task => ConformityType::Task,
            Self::Ticket => ConformityType::Ticket,
            Self::GrowthHack => ConformityType::GrowthHack,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module_name())
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deal" => Ok(Self::Deal),
            "task" => Ok(Self::Task),
            "ticket" => Ok(Self::Ticket),
            "growthHack" => Ok(Self::GrowthHack),
            _ => Err(format!("Invalid item type: {s}")),
        }
    }
}

/// A product / service line attached to a deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
    pub assign_user_id: Option<Uuid>,
}

/// A deal, task, ticket or growth hack placed in a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub item_type: ItemType,
    pub name: String,
    pub stage_id: Uuid,
    pub initial_stage_id: Option<Uuid>,
    /// Rank within the stage, lower sorts first
    pub order: f64,
    pub status: ItemStatus,
    #[serde(default)]
    pub assigned_user_ids: Vec<Uuid>,
    #[serde(default)]
    pub watched_user_ids: Vec<Uuid>,
    #[serde(default)]
    pub products_data: Vec<ProductData>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub modified_by: Option<Uuid>,
}

impl BoardItem {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Users referenced by product lines
    pub fn product_assignee_ids(&self) -> Vec<Uuid> {
        product_assignees(&self.products_data)
    }

    /// Assignees and watchers, without duplicates
    pub fn member_ids(&self) -> Vec<Uuid> {
        let mut members = self.assigned_user_ids.clone();
        for id in &self.watched_user_ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        members
    }

    /// Sort key inducing the stage order; ties fall back to recency of creation
    pub fn sort_key(&self) -> (f64, DateTime<Utc>, Uuid) {
        (self.order, self.created_at, self.id)
    }
}

pub(crate) fn product_assignees(products: &[ProductData]) -> Vec<Uuid> {
    products.iter().filter_map(|p| p.assign_user_id).collect()
}

/// Sort items ascending by order with a stable tie-break
pub fn sort_by_order(items: &mut [BoardItem]) {
    items.sort_by(|a, b| {
        a.order
            .total_cmp(&b.order)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(order: f64, created_offset: i64) -> BoardItem {
        let now = Utc::now();
        BoardItem {
            id: Uuid::new_v4(),
            item_type: ItemType::Task,
            name: "t".into(),
            stage_id: Uuid::new_v4(),
            initial_stage_id: None,
            order,
            status: ItemStatus::Active,
            assigned_user_ids: vec![],
            watched_user_ids: vec![],
            products_data: vec![],
            user_id: None,
            created_at: now + Duration::seconds(created_offset),
            modified_at: now,
            modified_by: None,
        }
    }

    #[test]
    fn test_item_type_round_trips_module_name() {
        for item_type in ItemType::ALL {
            assert_eq!(item_type.module_name().parse::<ItemType>().unwrap(), item_type);
        }
        assert!("company".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_sort_ties_break_by_creation() {
        let later = item(1.0, 10);
        let earlier = item(1.0, 0);
        let first = item(0.5, 20);
        let mut items = vec![later.clone(), earlier.clone(), first.clone()];
        sort_by_order(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![first.id, earlier.id, later.id]);
    }

    #[test]
    fn test_wire_shape_uses_mongo_style_id() {
        let value = serde_json::to_value(item(2.0, 0)).unwrap();
        assert!(value.get("_id").is_some());
        assert!(value.get("stageId").is_some());
        assert_eq!(value["status"], "active");
    }

    #[test]
    fn test_member_ids_deduplicates() {
        let mut board_item = item(0.0, 0);
        let shared = Uuid::new_v4();
        board_item.assigned_user_ids = vec![shared];
        board_item.watched_user_ids = vec![shared, Uuid::new_v4()];
        assert_eq!(board_item.member_ids().len(), 2);
    }
}
