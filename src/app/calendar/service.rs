//! 日历业务服务

use chrono::NaiveDate;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::model::*;
use crate::app::aar::model::{ActionStatus, WeeklyAar};
use crate::app::finance::model::{Customer, Order};
use crate::app::gear::model::GearItem;
use crate::app::shared::{month_bounds, DateRange};
use crate::app::team::model::DailyCheckin;
use crate::core::error::CoreError;
use crate::infrastructure::Store;

/// 单次查询允许的最大天数（含首尾两天）
const MAX_RANGE_DAYS: i64 = 366;

/// 解析后的闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Window {
    /// 缺省的一端取当前月份的边界
    pub fn resolve(range: DateRange, today: NaiveDate) -> Result<Self, CoreError> {
        range.validate()?;
        let (first, last) = month_bounds(today);
        let window = Self {
            from: range.from.unwrap_or(first),
            to: range.to.unwrap_or(last),
        };
        if window.from > window.to {
            return Err(CoreError::BadRequest("开始日期不能晚于结束日期".to_string()));
        }
        if (window.to - window.from).num_days() >= MAX_RANGE_DAYS {
            return Err(CoreError::BadRequest(format!(
                "查询范围不能超过 {} 天",
                MAX_RANGE_DAYS
            )));
        }
        Ok(window)
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

#[derive(Clone)]
pub struct CalendarService {
    store: Store,
}

impl CalendarService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn agenda(&self, range: DateRange, today: NaiveDate) -> Result<Vec<CalendarDay>, CoreError> {
        let window = Window::resolve(range, today)?;
        let sources = Sources {
            orders: self.store.list::<Order>().await?,
            customers: self.store.list::<Customer>().await?,
            aars: self.store.list::<WeeklyAar>().await?,
            gear: self.store.list::<GearItem>().await?,
            checkins: self.store.list::<DailyCheckin>().await?,
        };
        Ok(build_agenda(&sources, window))
    }
}

/// 议程所需的全部记录
#[derive(Debug, Default)]
pub struct Sources {
    pub orders: Vec<Order>,
    pub customers: Vec<Customer>,
    pub aars: Vec<WeeklyAar>,
    pub gear: Vec<GearItem>,
    pub checkins: Vec<DailyCheckin>,
}

/// 按天归并事件，只返回有事件的日期，日期升序
pub fn build_agenda(sources: &Sources, window: Window) -> Vec<CalendarDay> {
    let mut days: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
    let mut push = |date: NaiveDate, event: CalendarEvent| {
        if window.contains(date) {
            days.entry(date).or_default().push(event);
        }
    };

    let customer_name = |id: Uuid| {
        sources
            .customers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    };

    for order in sources.orders.iter().filter(|o| o.status.is_open()) {
        if let Some(due) = order.due_date {
            push(
                due,
                CalendarEvent {
                    kind: CalendarEventKind::OrderDue,
                    title: format!(
                        "订单交付: {}",
                        customer_name(order.customer_id).unwrap_or_else(|| "未知客户".to_string())
                    ),
                    ref_id: Some(order.id),
                    detail: Some(format!("总额 {:.2}", order.total)),
                },
            );
        }
    }

    for aar in &sources.aars {
        for item in aar.action_items.iter().filter(|i| i.status != ActionStatus::Done) {
            if let Some(due) = item.due_date {
                push(
                    due,
                    CalendarEvent {
                        kind: CalendarEventKind::ActionItemDue,
                        title: item.description.clone(),
                        ref_id: Some(aar.id),
                        detail: None,
                    },
                );
            }
        }
    }

    for gear in &sources.gear {
        for content in &gear.contents {
            if let Some(expires) = content.expiration_date {
                push(
                    expires,
                    CalendarEvent {
                        kind: CalendarEventKind::ItemExpiring,
                        title: format!("{} 到期", content.name),
                        ref_id: Some(gear.id),
                        detail: Some(gear.name.clone()),
                    },
                );
            }
        }
    }

    let mut checkins: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for checkin in &sources.checkins {
        *checkins.entry(checkin.date).or_default() += 1;
    }
    for (date, count) in checkins {
        push(
            date,
            CalendarEvent {
                kind: CalendarEventKind::Checkins,
                title: format!("{} 人完成签到", count),
                ref_id: None,
                detail: None,
            },
        );
    }

    days.into_iter()
        .map(|(date, mut events)| {
            events.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.title.cmp(&b.title)));
            CalendarDay { date, events }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::aar::model::ActionItem;
    use crate::app::finance::model::{OrderItem, OrderStatus};
    use crate::app::gear::model::{ContainerItem, GearStatus};
    use crate::app::team::model::Readiness;
    use chrono::Utc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn order(due: NaiveDate, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            order_date: d(2025, 5, 1),
            due_date: Some(due),
            items: vec![OrderItem {
                description: "Eggs".to_string(),
                quantity: 2.0,
                unit_price: 6.0,
            }],
            total: 12.0,
            status,
            payments: Vec::new(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn checkin(date: NaiveDate) -> DailyCheckin {
        DailyCheckin {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            date,
            sleep_hours: 8.0,
            energy: 4,
            soreness: 1,
            mood: None,
            notes: None,
            readiness: Readiness::Green,
            created_at: Utc::now(),
        }
    }

    fn sources() -> Sources {
        let now = Utc::now();
        Sources {
            orders: vec![
                order(d(2025, 5, 10), OrderStatus::Confirmed),
                order(d(2025, 5, 11), OrderStatus::Cancelled),
            ],
            customers: Vec::new(),
            aars: vec![WeeklyAar {
                id: Uuid::new_v4(),
                week_start: d(2025, 5, 5),
                title: None,
                summary: None,
                observations: Vec::new(),
                action_items: vec![
                    ActionItem {
                        id: Uuid::new_v4(),
                        description: "Repair coop door".to_string(),
                        owner: None,
                        status: ActionStatus::Open,
                        due_date: Some(d(2025, 5, 10)),
                    },
                    ActionItem {
                        id: Uuid::new_v4(),
                        description: "Already done".to_string(),
                        owner: None,
                        status: ActionStatus::Done,
                        due_date: Some(d(2025, 5, 12)),
                    },
                ],
                created_at: now,
                updated_at: now,
            }],
            gear: vec![GearItem {
                id: Uuid::new_v4(),
                name: "First aid kit".to_string(),
                category: "medical".to_string(),
                status: GearStatus::Available,
                assigned_to: None,
                serial_number: None,
                condition: None,
                notes: None,
                contents: vec![ContainerItem {
                    id: Uuid::new_v4(),
                    name: "Bandages".to_string(),
                    quantity: 10,
                    unit: None,
                    expiration_date: Some(d(2025, 5, 20)),
                }],
                created_at: now,
                updated_at: now,
            }],
            checkins: vec![checkin(d(2025, 5, 10)), checkin(d(2025, 5, 10)), checkin(d(2025, 6, 2))],
        }
    }

    #[test]
    fn agenda_groups_by_day() {
        let window = Window::resolve(DateRange::default(), d(2025, 5, 15)).unwrap();
        assert_eq!(window, Window { from: d(2025, 5, 1), to: d(2025, 5, 31) });

        let agenda = build_agenda(&sources(), window);
        let dates: Vec<NaiveDate> = agenda.iter().map(|day| day.date).collect();
        assert_eq!(dates, vec![d(2025, 5, 10), d(2025, 5, 20)]);

        let kinds: Vec<CalendarEventKind> = agenda[0].events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CalendarEventKind::OrderDue,
                CalendarEventKind::ActionItemDue,
                CalendarEventKind::Checkins,
            ]
        );
        assert_eq!(agenda[0].events[2].title, "2 人完成签到");
        assert_eq!(agenda[1].events[0].kind, CalendarEventKind::ItemExpiring);
    }

    #[test]
    fn range_limits() {
        let today = d(2025, 5, 15);
        let too_long = DateRange {
            from: Some(d(2024, 1, 1)),
            to: Some(d(2025, 3, 1)),
        };
        assert!(matches!(Window::resolve(too_long, today), Err(CoreError::BadRequest(_))));

        // 只给结束日期且早于本月第一天
        let inverted = DateRange {
            from: None,
            to: Some(d(2025, 4, 1)),
        };
        assert!(Window::resolve(inverted, today).is_err());

        // 2024 年是闰年：366 天恰好允许，367 天拒绝
        let year = DateRange {
            from: Some(d(2024, 1, 1)),
            to: Some(d(2024, 12, 31)),
        };
        assert!(Window::resolve(year, today).is_ok());

        let one_over = DateRange {
            from: Some(d(2024, 1, 1)),
            to: Some(d(2025, 1, 1)),
        };
        assert!(matches!(Window::resolve(one_over, today), Err(CoreError::BadRequest(_))));
    }
}
