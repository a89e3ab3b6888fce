//! 周复盘业务服务

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::model::*;
use crate::app::shared::week_start;
use crate::app::team::model::TeamMember;
use crate::core::error::CoreError;
use crate::core::view::clean_opt;
use crate::infrastructure::Store;

#[derive(Clone)]
pub struct AarService {
    store: Store,
    monday_first: bool,
    /// 每周一份复盘的检查与写入在此串行
    writes: Arc<Mutex<()>>,
}

impl AarService {
    pub fn new(store: Store, monday_first: bool) -> Self {
        Self {
            store,
            monday_first,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// 最近的周在前
    pub async fn list(&self) -> Result<Vec<WeeklyAar>, CoreError> {
        let mut aars = self.store.list::<WeeklyAar>().await?;
        aars.sort_by(|a, b| b.week_start.cmp(&a.week_start));
        Ok(aars)
    }

    pub async fn get(&self, id: Uuid) -> Result<WeeklyAar, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn find_week(&self, date: NaiveDate) -> Result<WeeklyAar, CoreError> {
        let start = week_start(date, self.monday_first);
        self.store
            .list::<WeeklyAar>()
            .await?
            .into_iter()
            .find(|a| a.week_start == start)
            .ok_or_else(|| CoreError::NotFound(format!("{} 所在周还没有复盘", start)))
    }

    pub async fn create(&self, form: AarForm) -> Result<WeeklyAar, CoreError> {
        let _guard = self.writes.lock().await;
        let start = week_start(form.week_of, self.monday_first);
        self.ensure_week_free(start, None).await?;

        let now = Utc::now();
        let mut aar = WeeklyAar {
            id: Uuid::new_v4(),
            week_start: start,
            title: None,
            summary: None,
            observations: Vec::new(),
            action_items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.apply_form(&mut aar, form).await?;

        self.store.upsert(&aar).await?;
        info!("新建周复盘: {}", aar.week_start);
        Ok(aar)
    }

    /// 描述相同的行动项保留原 ID
    pub async fn update(&self, id: Uuid, form: AarForm) -> Result<WeeklyAar, CoreError> {
        let _guard = self.writes.lock().await;
        let mut aar: WeeklyAar = self.store.fetch(id).await?;
        let start = week_start(form.week_of, self.monday_first);
        self.ensure_week_free(start, Some(id)).await?;

        aar.week_start = start;
        self.apply_form(&mut aar, form).await?;
        aar.updated_at = Utc::now();

        self.store.upsert(&aar).await?;
        Ok(aar)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<WeeklyAar>(id).await
    }

    pub async fn add_observation(&self, id: Uuid, form: ObservationForm) -> Result<WeeklyAar, CoreError> {
        let mut aar: WeeklyAar = self.store.fetch(id).await?;
        aar.observations.push(observation(form));
        aar.updated_at = Utc::now();
        self.store.upsert(&aar).await?;
        Ok(aar)
    }

    pub async fn add_action_item(&self, id: Uuid, form: ActionItemForm) -> Result<WeeklyAar, CoreError> {
        let mut aar: WeeklyAar = self.store.fetch(id).await?;
        let item = self.action_item(form).await?;
        aar.action_items.push(item);
        aar.updated_at = Utc::now();
        self.store.upsert(&aar).await?;
        Ok(aar)
    }

    pub async fn set_action_status(
        &self,
        id: Uuid,
        item_id: Uuid,
        status: ActionStatus,
    ) -> Result<WeeklyAar, CoreError> {
        let mut aar: WeeklyAar = self.store.fetch(id).await?;
        let item = aar
            .action_items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::not_found("行动项", item_id))?;
        item.status = status;
        aar.updated_at = Utc::now();
        self.store.upsert(&aar).await?;
        Ok(aar)
    }

    pub async fn open_action_items(&self) -> Result<Vec<OpenActionItem>, CoreError> {
        let aars = self.store.list::<WeeklyAar>().await?;
        Ok(open_action_items(&aars))
    }

    async fn ensure_week_free(&self, start: NaiveDate, except: Option<Uuid>) -> Result<(), CoreError> {
        let taken = self
            .store
            .list::<WeeklyAar>()
            .await?
            .iter()
            .any(|a| a.week_start == start && Some(a.id) != except);
        if taken {
            return Err(CoreError::Conflict(format!("{} 所在周已有复盘", start)));
        }
        Ok(())
    }

    async fn apply_form(&self, aar: &mut WeeklyAar, form: AarForm) -> Result<(), CoreError> {
        for obs in &form.observations {
            obs.validate()?;
        }
        let mut items = Vec::with_capacity(form.action_items.len());
        for item in form.action_items {
            items.push(self.action_item(item).await?);
        }
        keep_item_ids(&aar.action_items, &mut items);

        aar.title = clean_opt(form.title);
        aar.summary = clean_opt(form.summary);
        aar.observations = form.observations.into_iter().map(observation).collect();
        aar.action_items = items;
        Ok(())
    }

    async fn action_item(&self, form: ActionItemForm) -> Result<ActionItem, CoreError> {
        form.validate()?;
        if let Some(owner) = form.owner {
            self.store.ensure_exists::<TeamMember>(owner).await?;
        }
        Ok(ActionItem {
            id: Uuid::new_v4(),
            description: form.description.trim().to_string(),
            owner: form.owner,
            status: form.status,
            due_date: form.due_date,
        })
    }
}

fn keep_item_ids(existing: &[ActionItem], items: &mut [ActionItem]) {
    let mut taken = vec![false; existing.len()];
    for item in items.iter_mut() {
        if let Some(pos) = existing
            .iter()
            .enumerate()
            .position(|(i, old)| !taken[i] && old.description.eq_ignore_ascii_case(&item.description))
        {
            taken[pos] = true;
            item.id = existing[pos].id;
        }
    }
}

fn observation(form: ObservationForm) -> Observation {
    Observation {
        id: Uuid::new_v4(),
        kind: form.kind,
        text: form.text.trim().to_string(),
    }
}

/// 未完成的行动项，按截止日期排序（无截止日期的排最后），再按描述
pub fn open_action_items(aars: &[WeeklyAar]) -> Vec<OpenActionItem> {
    let mut items: Vec<OpenActionItem> = aars
        .iter()
        .flat_map(|aar| {
            aar.action_items
                .iter()
                .filter(|i| i.status != ActionStatus::Done)
                .map(move |i| OpenActionItem {
                    aar_id: aar.id,
                    week_start: aar.week_start,
                    item: i.clone(),
                })
        })
        .collect();

    items.sort_by(|a, b| {
        match (a.item.due_date, b.item.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.item.description.cmp(&b.item.description))
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn form(week_of: NaiveDate) -> AarForm {
        AarForm {
            week_of,
            title: Some("Week review".to_string()),
            summary: None,
            observations: vec![ObservationForm {
                kind: ObservationKind::Sustain,
                text: "Morning chores on time".to_string(),
            }],
            action_items: vec![
                ActionItemForm {
                    description: "Fix the east fence".to_string(),
                    due_date: Some(d(2025, 6, 20)),
                    ..Default::default()
                },
                ActionItemForm {
                    description: "Order feed".to_string(),
                    ..Default::default()
                },
            ],
        }
    }

    #[tokio::test]
    async fn one_aar_per_week() {
        let service = AarService::new(Store::memory(), true);
        let aar = service.create(form(d(2025, 6, 18))).await.unwrap();
        assert_eq!(aar.week_start, d(2025, 6, 16));
        assert_eq!(aar.action_items.len(), 2);

        let err = service.create(form(d(2025, 6, 21))).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let found = service.find_week(d(2025, 6, 22)).await.unwrap();
        assert_eq!(found.id, aar.id);

        // 更新自身所在周不算冲突
        service.update(aar.id, form(d(2025, 6, 17))).await.unwrap();
    }

    #[tokio::test]
    async fn edit_keeps_matching_action_item_ids() {
        let service = AarService::new(Store::memory(), true);
        let aar = service.create(form(d(2025, 6, 18))).await.unwrap();
        let fence_id = aar.action_items[0].id;
        let feed_id = aar.action_items[1].id;

        let mut edit = form(d(2025, 6, 18));
        edit.action_items[0].description = "  fix the EAST fence ".to_string();
        edit.action_items[1].description = "Buy seed".to_string();
        let updated = service.update(aar.id, edit).await.unwrap();

        assert_eq!(updated.action_items[0].id, fence_id);
        assert_eq!(updated.action_items[0].description, "fix the EAST fence");
        assert_ne!(updated.action_items[1].id, feed_id);

        // 旧 ID 仍可用于更新状态
        service
            .set_action_status(aar.id, fence_id, ActionStatus::Done)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_keep_one_aar_per_week() {
        let service = AarService::new(Store::memory(), true);
        let mut tasks = tokio::task::JoinSet::new();
        for day in 16..=22 {
            let service = service.clone();
            tasks.spawn(async move { service.create(form(d(2025, 6, day))).await });
        }

        let mut created = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_observation_rejected() {
        let service = AarService::new(Store::memory(), true);
        let mut f = form(d(2025, 6, 18));
        f.observations[0].text = "   ".to_string();
        assert!(matches!(service.create(f).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn open_items_sorted_and_done_excluded() {
        let service = AarService::new(Store::memory(), true);
        let week1 = service.create(form(d(2025, 6, 9))).await.unwrap();
        let week2 = service.create(form(d(2025, 6, 16))).await.unwrap();

        let done_id = week1.action_items[0].id;
        service
            .set_action_status(week1.id, done_id, ActionStatus::Done)
            .await
            .unwrap();

        let open = service.open_action_items().await.unwrap();
        assert_eq!(open.len(), 3);
        assert_eq!(open[0].item.description, "Fix the east fence");
        assert_eq!(open[0].aar_id, week2.id);
        assert!(open[1..].iter().all(|o| o.item.due_date.is_none()));
        assert!(open.iter().all(|o| o.item.id != done_id));

        let list = service.list().await.unwrap();
        assert_eq!(list[0].id, week2.id);
    }
}
