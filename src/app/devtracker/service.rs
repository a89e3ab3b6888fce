//! 开发跟踪业务服务

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::model::*;
use crate::core::error::CoreError;
use crate::core::view::{clean_opt, group_by, Group};
use crate::infrastructure::Store;

#[derive(Clone)]
pub struct DevTrackerService {
    store: Store,
}

impl DevTrackerService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &DevQuery) -> Result<Vec<DevTrackerItem>, CoreError> {
        let items = self.store.list::<DevTrackerItem>().await?;
        Ok(filter_and_sort(items, query))
    }

    pub async fn get(&self, id: Uuid) -> Result<DevTrackerItem, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create(&self, form: DevItemForm) -> Result<DevTrackerItem, CoreError> {
        let now = Utc::now();
        let mut item = DevTrackerItem {
            id: Uuid::new_v4(),
            title: form.title.trim().to_string(),
            description: clean_opt(form.description),
            area: clean_opt(form.area),
            status: DevStatus::Pending,
            priority: form.priority,
            created_at: now,
            updated_at: now,
            verified_at: None,
        };
        set_status(&mut item, form.status, now);

        self.store.upsert(&item).await?;
        info!("新增开发事项: {} [{:?}]", item.title, item.priority);
        Ok(item)
    }

    pub async fn update(&self, id: Uuid, form: DevItemForm) -> Result<DevTrackerItem, CoreError> {
        let mut item: DevTrackerItem = self.store.fetch(id).await?;
        let now = Utc::now();
        item.title = form.title.trim().to_string();
        item.description = clean_opt(form.description);
        item.area = clean_opt(form.area);
        item.priority = form.priority;
        set_status(&mut item, form.status, now);
        item.updated_at = now;

        self.store.upsert(&item).await?;
        Ok(item)
    }

    pub async fn change_status(&self, id: Uuid, status: DevStatus) -> Result<DevTrackerItem, CoreError> {
        let mut item: DevTrackerItem = self.store.fetch(id).await?;
        let now = Utc::now();
        set_status(&mut item, status, now);
        item.updated_at = now;

        self.store.upsert(&item).await?;
        info!("开发事项状态变更: {} -> {:?}", item.title, status);
        Ok(item)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<DevTrackerItem>(id).await
    }

    pub async fn timeline(&self, now: DateTime<Utc>) -> Result<Vec<Group<TimelineRange, DevTrackerItem>>, CoreError> {
        let items = self.store.list::<DevTrackerItem>().await?;
        Ok(timeline(items, now))
    }

    // ---- 反馈 ----

    pub async fn list_feedback(&self) -> Result<Vec<Feedback>, CoreError> {
        let mut feedback = self.store.list::<Feedback>().await?;
        sort_feedback(&mut feedback);
        Ok(feedback)
    }

    pub async fn submit_feedback(&self, form: FeedbackForm) -> Result<Feedback, CoreError> {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            message: form.message.trim().to_string(),
            page: clean_opt(form.page),
            kind: form.kind,
            submitted_by: clean_opt(form.submitted_by),
            resolved: false,
            created_at: Utc::now(),
        };
        self.store.upsert(&feedback).await?;
        info!("收到反馈: {:?}", feedback.kind);
        Ok(feedback)
    }

    pub async fn resolve_feedback(&self, id: Uuid) -> Result<Feedback, CoreError> {
        let mut feedback: Feedback = self.store.fetch(id).await?;
        feedback.resolved = true;
        self.store.upsert(&feedback).await?;
        Ok(feedback)
    }

    pub async fn delete_feedback(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<Feedback>(id).await
    }
}

/// 进入 verified 时记录时间，离开时清除
fn set_status(item: &mut DevTrackerItem, status: DevStatus, now: DateTime<Utc>) {
    if status == DevStatus::Verified && item.status != DevStatus::Verified {
        item.verified_at = Some(now);
    } else if status != DevStatus::Verified {
        item.verified_at = None;
    }
    item.status = status;
}

/// 优先级（critical 最前），同级按创建时间升序
pub fn filter_and_sort(items: Vec<DevTrackerItem>, query: &DevQuery) -> Vec<DevTrackerItem> {
    let mut items: Vec<DevTrackerItem> = items
        .into_iter()
        .filter(|i| query.status.map_or(true, |s| i.status == s))
        .collect();
    items.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    items
}

/// 按最近更新时间分段，段内最近的在前，空段不返回
pub fn timeline(mut items: Vec<DevTrackerItem>, now: DateTime<Utc>) -> Vec<Group<TimelineRange, DevTrackerItem>> {
    items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    let today = now.date_naive();
    group_by(&items, |item| {
        TimelineRange::from_age((today - item.updated_at.date_naive()).num_days())
    })
}

/// 未处理的在前，再按提交时间倒序
pub fn sort_feedback(feedback: &mut [Feedback]) {
    feedback.sort_by(|a, b| {
        a.resolved
            .cmp(&b.resolved)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::shared::Priority;
    use chrono::Duration;

    fn item(title: &str, priority: Priority, created_at: DateTime<Utc>) -> DevTrackerItem {
        DevTrackerItem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            area: None,
            status: DevStatus::Pending,
            priority,
            created_at,
            updated_at: created_at,
            verified_at: None,
        }
    }

    #[test]
    fn priority_then_creation_order() {
        let t0 = Utc::now();
        let items = vec![
            item("low", Priority::Low, t0),
            item("critical-late", Priority::Critical, t0 + Duration::minutes(5)),
            item("medium", Priority::Medium, t0),
            item("critical-early", Priority::Critical, t0),
        ];
        let titles: Vec<String> = filter_and_sort(items, &DevQuery::default())
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["critical-early", "critical-late", "medium", "low"]);
    }

    #[test]
    fn status_filter() {
        let t0 = Utc::now();
        let mut testing = item("b", Priority::High, t0);
        testing.status = DevStatus::Testing;
        let items = vec![item("a", Priority::High, t0), testing];
        let filtered = filter_and_sort(
            items,
            &DevQuery {
                status: Some(DevStatus::Testing),
            },
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "b");
    }

    #[test]
    fn timeline_ranges_in_order() {
        let now = Utc::now();
        let items = vec![
            item("ancient", Priority::Low, now - Duration::days(90)),
            item("now", Priority::Low, now),
            item("last-week", Priority::Low, now - Duration::days(5)),
            item("yesterday", Priority::Low, now - Duration::days(1)),
        ];
        let groups = timeline(items, now);
        let ranges: Vec<TimelineRange> = groups.iter().map(|g| g.key).collect();
        assert_eq!(
            ranges,
            vec![
                TimelineRange::Today,
                TimelineRange::Yesterday,
                TimelineRange::ThisWeek,
                TimelineRange::Older,
            ]
        );
        assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), 4);
    }

    #[test]
    fn age_boundaries() {
        assert_eq!(TimelineRange::from_age(-1), TimelineRange::Today);
        assert_eq!(TimelineRange::from_age(7), TimelineRange::ThisWeek);
        assert_eq!(TimelineRange::from_age(8), TimelineRange::ThisMonth);
        assert_eq!(TimelineRange::from_age(30), TimelineRange::ThisMonth);
        assert_eq!(TimelineRange::from_age(31), TimelineRange::Older);
    }

    #[tokio::test]
    async fn verified_at_follows_status() {
        let service = DevTrackerService::new(Store::memory());
        let created = service
            .create(DevItemForm {
                title: "Checkin form validation".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(created.verified_at.is_none());

        let verified = service.change_status(created.id, DevStatus::Verified).await.unwrap();
        let stamp = verified.verified_at.expect("verified_at set");

        // 重复设置不覆盖时间
        let again = service.change_status(created.id, DevStatus::Verified).await.unwrap();
        assert_eq!(again.verified_at, Some(stamp));

        let reopened = service.change_status(created.id, DevStatus::Testing).await.unwrap();
        assert!(reopened.verified_at.is_none());
    }

    #[tokio::test]
    async fn feedback_unresolved_first() {
        let service = DevTrackerService::new(Store::memory());
        let first = service
            .submit_feedback(FeedbackForm {
                message: "Calendar is slow".to_string(),
                kind: FeedbackKind::Bug,
                ..Default::default()
            })
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = service
            .submit_feedback(FeedbackForm {
                message: "Add CSV export".to_string(),
                kind: FeedbackKind::Feature,
                ..Default::default()
            })
            .await
            .unwrap();
        service.resolve_feedback(second.id).await.unwrap();

        let list = service.list_feedback().await.unwrap();
        assert_eq!(list[0].id, first.id);
        assert!(list[1].resolved);
    }
}
