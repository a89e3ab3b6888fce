//! 装备数据模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::shared::not_blank;
use crate::infrastructure::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GearStatus {
    #[default]
    Available,
    Assigned,
    Maintenance,
    Lost,
    Retired,
}

impl GearStatus {
    /// 可以分配给队员
    pub fn is_assignable(self) -> bool {
        !matches!(self, GearStatus::Lost | GearStatus::Retired)
    }
}

/// 容器内的消耗品
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub status: GearStatus,
    pub assigned_to: Option<Uuid>,
    pub serial_number: Option<String>,
    pub condition: Option<String>,
    pub notes: Option<String>,
    pub contents: Vec<ContainerItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for GearItem {
    const KIND: &'static str = "gear_item";
    const LABEL: &'static str = "装备";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GearForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "装备名称不能为空"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "装备分类不能为空"))]
    pub category: String,
    /// 指派状态由 assign/unassign 维护，这里只接受其他状态
    #[serde(default)]
    pub status: Option<GearStatus>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub contents: Vec<ContainerItemForm>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContainerItemForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "物品名称不能为空"))]
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub member_id: Uuid,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GearSort {
    #[default]
    Name,
    Category,
    Status,
    Updated,
}

#[derive(Debug, Default, Deserialize)]
pub struct GearQuery {
    pub category: Option<String>,
    pub status: Option<GearStatus>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: GearSort,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpiringQuery {
    pub within_days: Option<i64>,
}

/// 临期物品
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiringItem {
    pub gear_id: Uuid,
    pub gear_name: String,
    pub item: ContainerItem,
    pub days_left: i64,
    pub expired: bool,
}
