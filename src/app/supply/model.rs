//! 物资申请数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::shared::{not_blank, Priority};
use crate::infrastructure::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SupplyStatus {
    #[default]
    Pending,
    Approved,
    Ordered,
    Fulfilled,
    Denied,
}

impl SupplyStatus {
    pub const ALL: [SupplyStatus; 5] = [
        SupplyStatus::Pending,
        SupplyStatus::Approved,
        SupplyStatus::Ordered,
        SupplyStatus::Fulfilled,
        SupplyStatus::Denied,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, SupplyStatus::Fulfilled | SupplyStatus::Denied)
    }

    pub fn can_transition_to(self, next: SupplyStatus) -> bool {
        use SupplyStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Denied) | (Approved, Ordered) | (Approved, Denied) | (Ordered, Fulfilled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyRequest {
    pub id: Uuid,
    pub requested_by: Option<Uuid>,
    pub item_name: String,
    pub quantity: u32,
    pub unit: Option<String>,
    pub priority: Priority,
    pub status: SupplyStatus,
    pub justification: Option<String>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for SupplyRequest {
    const KIND: &'static str = "supply_request";
    const LABEL: &'static str = "物资申请";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SupplyRequestForm {
    #[serde(default)]
    pub requested_by: Option<Uuid>,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "物品名称不能为空"))]
    pub item_name: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "数量至少为1"))]
    pub quantity: u32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub justification: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: SupplyStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplyQuery {
    pub status: Option<SupplyStatus>,
    pub requested_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusCount {
    pub status: SupplyStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyList {
    pub requests: Vec<SupplyRequest>,
    pub summary: Vec<StatusCount>,
}
