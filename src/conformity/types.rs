use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Entity kinds that can take part in a conformity link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConformityType {
    Deal,
    Task,
    Ticket,
    GrowthHack,
    Company,
    Customer,
}

impl ConformityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Task => "task",
            Self::Ticket => "ticket",
            Self::GrowthHack => "growthHack",
            Self::Company => "company",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for ConformityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConformityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deal" => Ok(Self::Deal),
            "task" => Ok(Self::Task),
            "ticket" => Ok(Self::Ticket),
            "growthHack" => Ok(Self::GrowthHack),
            "company" => Ok(Self::Company),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("Invalid conformity type: {s}")),
        }
    }
}

/// Asymmetric relation between a main record and a related record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformityLink {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub main_type: ConformityType,
    pub main_type_id: Uuid,
    pub rel_type: ConformityType,
    pub rel_type_id: Uuid,
}

impl ConformityLink {
    pub fn new(
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
        rel_type_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            main_type,
            main_type_id,
            rel_type,
            rel_type_id,
        }
    }

    /// Whether this link touches the given record on either side
    pub fn involves(&self, kind: ConformityType, id: Uuid) -> bool {
        (self.main_type == kind && self.main_type_id == id)
            || (self.rel_type == kind && self.rel_type_id == id)
    }

    /// Id on the other side of the link, seen from `kind`/`id`
    pub fn counterpart(&self, kind: ConformityType, id: Uuid) -> Option<(ConformityType, Uuid)> {
        if self.main_type == kind && self.main_type_id == id {
            Some((self.rel_type, self.rel_type_id))
        } else if self.rel_type == kind && self.rel_type_id == id {
            Some((self.main_type, self.main_type_id))
        } else {
            None
        }
    }
}
