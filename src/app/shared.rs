//! 各业务模块共用的类型

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::core::error::CoreError;

/// 优先级，定义顺序即排序顺序（critical 最前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// 必填文本字段的校验
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// 当前日期（UTC），与记录时间戳、开发追踪时间线使用同一时钟
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// 查询参数中的日期范围，包含两端
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(CoreError::BadRequest("开始日期不能晚于结束日期".to_string()));
            }
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// 所在月份的第一天和最后一天
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month.map(|d| d - Duration::days(1)).unwrap_or(first);
    (first, last)
}

/// 所在周的第一天
pub fn week_start(date: NaiveDate, monday_first: bool) -> NaiveDate {
    let offset = if monday_first {
        date.weekday().num_days_from_monday()
    } else {
        date.weekday().num_days_from_sunday()
    };
    date - Duration::days(offset as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn today_follows_utc_clock() {
        let before = chrono::Utc::now().date_naive();
        let day = today();
        let after = chrono::Utc::now().date_naive();
        assert!(day == before || day == after);
    }

    #[test]
    fn priority_orders_critical_first() {
        let mut list = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        list.sort();
        assert_eq!(
            list,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn month_bounds_handles_december_and_leap_years() {
        assert_eq!(month_bounds(d(2024, 12, 15)), (d(2024, 12, 1), d(2024, 12, 31)));
        assert_eq!(month_bounds(d(2024, 2, 10)), (d(2024, 2, 1), d(2024, 2, 29)));
    }

    #[test]
    fn week_start_respects_first_day() {
        // 2025-06-18 是周三
        assert_eq!(week_start(d(2025, 6, 18), true), d(2025, 6, 16));
        assert_eq!(week_start(d(2025, 6, 18), false), d(2025, 6, 15));
        assert_eq!(week_start(d(2025, 6, 16), true), d(2025, 6, 16));
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange {
            from: Some(d(2025, 1, 1)),
            to: Some(d(2025, 1, 31)),
        };
        assert!(range.contains(d(2025, 1, 1)));
        assert!(range.contains(d(2025, 1, 31)));
        assert!(!range.contains(d(2025, 2, 1)));
        assert!(DateRange::default().contains(d(1999, 1, 1)));

        let inverted = DateRange {
            from: Some(d(2025, 2, 1)),
            to: Some(d(2025, 1, 1)),
        };
        assert!(inverted.validate().is_err());
    }
}
