use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level container of pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

/// Ordered set of stages representing a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
}

/// A single column within a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub name: String,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

impl Pipeline {
    pub fn new(board_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id,
            name: name.into(),
        }
    }
}

impl Stage {
    pub fn new(pipeline_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline_id,
            name: name.into(),
        }
    }
}
