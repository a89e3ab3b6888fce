//! 日历数据模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 事件来源，定义顺序即同一天内的展示顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEventKind {
    OrderDue,
    ActionItemDue,
    ItemExpiring,
    Checkins,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub kind: CalendarEventKind,
    pub title: String,
    /// 关联记录（订单、复盘、装备）；签到汇总没有
    pub ref_id: Option<Uuid>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub events: Vec<CalendarEvent>,
}
