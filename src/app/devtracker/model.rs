//! 开发跟踪数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::shared::{not_blank, Priority};
use crate::infrastructure::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DevStatus {
    #[default]
    Pending,
    Testing,
    Verified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevTrackerItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub area: Option<String>,
    pub status: DevStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl Record for DevTrackerItem {
    const KIND: &'static str = "dev_tracker_item";
    const LABEL: &'static str = "开发事项";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DevItemForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "标题不能为空"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub status: DevStatus,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Deserialize)]
pub struct DevStatusChange {
    pub status: DevStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct DevQuery {
    pub status: Option<DevStatus>,
}

/// 时间线分段，定义顺序即展示顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineRange {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    Older,
}

impl TimelineRange {
    /// 按距今天数划分
    pub fn from_age(days: i64) -> Self {
        match days {
            i64::MIN..=0 => TimelineRange::Today,
            1 => TimelineRange::Yesterday,
            2..=7 => TimelineRange::ThisWeek,
            8..=30 => TimelineRange::ThisMonth,
            _ => TimelineRange::Older,
        }
    }
}

// ---- 反馈 ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Bug,
    Feature,
    Question,
    #[default]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub message: String,
    pub page: Option<String>,
    pub kind: FeedbackKind,
    pub submitted_by: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Feedback {
    const KIND: &'static str = "feedback";
    const LABEL: &'static str = "反馈";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FeedbackForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "反馈内容不能为空"))]
    pub message: String,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub kind: FeedbackKind,
    #[serde(default)]
    pub submitted_by: Option<String>,
}
