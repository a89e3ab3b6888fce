//! 周复盘 (After-Action Review) 数据模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::shared::not_blank;
use crate::infrastructure::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    /// 保持
    Sustain,
    /// 改进
    Improve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Open,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub id: Uuid,
    pub kind: ObservationKind,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionItem {
    pub id: Uuid,
    pub description: String,
    pub owner: Option<Uuid>,
    pub status: ActionStatus,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAar {
    pub id: Uuid,
    pub week_start: NaiveDate,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub observations: Vec<Observation>,
    pub action_items: Vec<ActionItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for WeeklyAar {
    const KIND: &'static str = "weekly_aar";
    const LABEL: &'static str = "周复盘";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AarForm {
    /// 任意一天，存储时归一到该周第一天
    pub week_of: NaiveDate,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub observations: Vec<ObservationForm>,
    #[serde(default)]
    pub action_items: Vec<ActionItemForm>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ObservationForm {
    pub kind: ObservationKind,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "观察内容不能为空"))]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ActionItemForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "行动项描述不能为空"))]
    pub description: String,
    #[serde(default)]
    pub owner: Option<Uuid>,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionStatusChange {
    pub status: ActionStatus,
}

/// 跨复盘的未完成行动项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenActionItem {
    pub aar_id: Uuid,
    pub week_start: NaiveDate,
    pub item: ActionItem,
}
