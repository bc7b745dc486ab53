use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::import_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => import_status::IN_PROGRESS,
            Self::Done => import_status::DONE,
            Self::Cancelled => import_status::CANCELLED,
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            import_status::IN_PROGRESS => Ok(Self::InProgress),
            import_status::DONE => Ok(Self::Done),
            import_status::CANCELLED => Ok(Self::Cancelled),
            _ => Err(format!("Invalid import status: {s}")),
        }
    }
}

/// Progress record of one bulk import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistory {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content_type: String,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub percentage: f64,
    pub status: ImportStatus,
    pub ids: Vec<Uuid>,
    pub error_msgs: Vec<String>,
}

impl ImportHistory {
    pub fn new(content_type: impl Into<String>, total: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type: content_type.into(),
            total,
            success: 0,
            failed: 0,
            percentage: 0.0,
            status: ImportStatus::InProgress,
            ids: Vec::new(),
            error_msgs: Vec::new(),
        }
    }

    pub fn processed(&self) -> u64 {
        self.success + self.failed
    }

    pub fn is_finished(&self) -> bool {
        self.processed() >= self.total
    }
}

/// Counter increments applied after each processed record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportIncrement {
    pub success: u64,
    pub failed: u64,
    pub percentage: f64,
    pub created_id: Option<Uuid>,
    pub error_msgs: Vec<String>,
}
