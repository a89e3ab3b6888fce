//! 装备业务服务

use chrono::{NaiveDate, Utc};
use std::cmp::Ordering;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::model::*;
use crate::app::team::model::TeamMember;
use crate::core::error::CoreError;
use crate::core::view::{any_contains_ci, clean_opt, group_by, Group};
use crate::infrastructure::Store;

#[derive(Clone)]
pub struct GearService {
    store: Store,
}

impl GearService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &GearQuery) -> Result<Vec<GearItem>, CoreError> {
        let gear = self.store.list::<GearItem>().await?;
        Ok(filter_and_sort(gear, query))
    }

    /// 过滤后按分类分组，组内按指定字段排序
    pub async fn grouped(&self, query: &GearQuery) -> Result<Vec<Group<String, GearItem>>, CoreError> {
        let gear = self.list(query).await?;
        Ok(group_by(&gear, |g| g.category.clone()))
    }

    pub async fn get(&self, id: Uuid) -> Result<GearItem, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create(&self, form: GearForm) -> Result<GearItem, CoreError> {
        validate_contents(&form.contents)?;
        let status = checked_status(form.status, None)?;
        let now = Utc::now();
        let gear = GearItem {
            id: Uuid::new_v4(),
            name: form.name.trim().to_string(),
            category: normalize_category(&form.category),
            status,
            assigned_to: None,
            serial_number: clean_opt(form.serial_number),
            condition: clean_opt(form.condition),
            notes: clean_opt(form.notes),
            contents: form.contents.into_iter().map(container_item).collect(),
            created_at: now,
            updated_at: now,
        };

        self.store.upsert(&gear).await?;
        info!("新增装备: {} [{}]", gear.name, gear.category);
        Ok(gear)
    }

    pub async fn update(&self, id: Uuid, form: GearForm) -> Result<GearItem, CoreError> {
        validate_contents(&form.contents)?;
        let mut gear: GearItem = self.store.fetch(id).await?;
        gear.status = checked_status(form.status, Some(&gear))?;
        if gear.status != GearStatus::Assigned {
            gear.assigned_to = None;
        }
        gear.name = form.name.trim().to_string();
        gear.category = normalize_category(&form.category);
        gear.serial_number = clean_opt(form.serial_number);
        gear.condition = clean_opt(form.condition);
        gear.notes = clean_opt(form.notes);
        gear.contents = merge_contents(&gear.contents, form.contents);
        gear.updated_at = Utc::now();

        self.store.upsert(&gear).await?;
        Ok(gear)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<GearItem>(id).await?;
        info!("删除装备: {}", id);
        Ok(())
    }

    /// 把装备分配给队员
    pub async fn assign(&self, id: Uuid, member_id: Uuid) -> Result<GearItem, CoreError> {
        let mut gear: GearItem = self.store.fetch(id).await?;
        let member: TeamMember = self.store.fetch(member_id).await?;
        if !gear.status.is_assignable() {
            return Err(CoreError::BadRequest(format!(
                "装备 {} 当前状态为 {:?}，不能分配",
                gear.name, gear.status
            )));
        }

        gear.status = GearStatus::Assigned;
        gear.assigned_to = Some(member.id);
        gear.updated_at = Utc::now();
        self.store.upsert(&gear).await?;

        info!("装备 {} 分配给 {}", gear.name, member.name);
        Ok(gear)
    }

    pub async fn unassign(&self, id: Uuid) -> Result<GearItem, CoreError> {
        let mut gear: GearItem = self.store.fetch(id).await?;
        if gear.assigned_to.is_none() {
            return Err(CoreError::BadRequest(format!("装备 {} 未分配", gear.name)));
        }

        gear.status = GearStatus::Available;
        gear.assigned_to = None;
        gear.updated_at = Utc::now();
        self.store.upsert(&gear).await?;

        info!("装备 {} 已归还", gear.name);
        Ok(gear)
    }

    pub async fn add_content(&self, id: Uuid, form: ContainerItemForm) -> Result<GearItem, CoreError> {
        let mut gear: GearItem = self.store.fetch(id).await?;
        gear.contents.push(container_item(form));
        gear.updated_at = Utc::now();
        self.store.upsert(&gear).await?;
        Ok(gear)
    }

    pub async fn update_content(
        &self,
        id: Uuid,
        item_id: Uuid,
        form: ContainerItemForm,
    ) -> Result<GearItem, CoreError> {
        let mut gear: GearItem = self.store.fetch(id).await?;
        let slot = gear
            .contents
            .iter_mut()
            .find(|c| c.id == item_id)
            .ok_or_else(|| CoreError::not_found("容器物品", item_id))?;
        *slot = ContainerItem {
            id: item_id,
            ..container_item(form)
        };
        gear.updated_at = Utc::now();
        self.store.upsert(&gear).await?;
        Ok(gear)
    }

    pub async fn remove_content(&self, id: Uuid, item_id: Uuid) -> Result<GearItem, CoreError> {
        let mut gear: GearItem = self.store.fetch(id).await?;
        let before = gear.contents.len();
        gear.contents.retain(|c| c.id != item_id);
        if gear.contents.len() == before {
            return Err(CoreError::not_found("容器物品", item_id));
        }
        gear.updated_at = Utc::now();
        self.store.upsert(&gear).await?;
        Ok(gear)
    }

    pub async fn expiring(&self, within_days: i64, today: NaiveDate) -> Result<Vec<ExpiringItem>, CoreError> {
        if within_days < 0 {
            return Err(CoreError::BadRequest("天数不能为负".to_string()));
        }
        let gear = self.store.list::<GearItem>().await?;
        Ok(expiring_items(&gear, within_days, today))
    }
}

/// 新建时不能直接设为 assigned；更新时只有已分配的装备可以保持 assigned
fn checked_status(requested: Option<GearStatus>, current: Option<&GearItem>) -> Result<GearStatus, CoreError> {
    let current_status = current.map(|g| g.status).unwrap_or_default();
    match requested {
        None => Ok(current_status),
        Some(GearStatus::Assigned) if current_status != GearStatus::Assigned => Err(
            CoreError::BadRequest("请通过分配接口指派装备".to_string()),
        ),
        Some(status) => Ok(status),
    }
}

fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

fn container_item(form: ContainerItemForm) -> ContainerItem {
    ContainerItem {
        id: Uuid::new_v4(),
        name: form.name.trim().to_string(),
        quantity: form.quantity,
        unit: clean_opt(form.unit),
        expiration_date: form.expiration_date,
    }
}

/// 整体更新时按名称保留原有物品的 id
fn validate_contents(forms: &[ContainerItemForm]) -> Result<(), CoreError> {
    for item in forms {
        item.validate()?;
    }
    Ok(())
}

fn merge_contents(existing: &[ContainerItem], forms: Vec<ContainerItemForm>) -> Vec<ContainerItem> {
    let mut taken = vec![false; existing.len()];
    forms
        .into_iter()
        .map(|form| {
            let mut item = container_item(form);
            if let Some(pos) = existing
                .iter()
                .enumerate()
                .position(|(i, c)| !taken[i] && c.name.eq_ignore_ascii_case(&item.name))
            {
                taken[pos] = true;
                item.id = existing[pos].id;
            }
            item
        })
        .collect()
}

pub fn filter_and_sort(gear: Vec<GearItem>, query: &GearQuery) -> Vec<GearItem> {
    let search = query.search.as_deref().unwrap_or("");
    let category = query.category.as_deref().map(normalize_category);

    let mut gear: Vec<GearItem> = gear
        .into_iter()
        .filter(|g| category.as_deref().map_or(true, |c| g.category == c))
        .filter(|g| query.status.map_or(true, |s| g.status == s))
        .filter(|g| query.assigned_to.map_or(true, |m| g.assigned_to == Some(m)))
        .filter(|g| {
            let contents = g.contents.iter().map(|c| Some(c.name.as_str()));
            any_contains_ci(
                [Some(g.name.as_str()), g.serial_number.as_deref(), g.notes.as_deref()]
                    .into_iter()
                    .chain(contents),
                search,
            )
        })
        .collect();

    gear.sort_by(|a, b| compare(a, b, query.sort));
    gear
}

fn compare(a: &GearItem, b: &GearItem, sort: GearSort) -> Ordering {
    let by_name = || a.name.to_lowercase().cmp(&b.name.to_lowercase());
    match sort {
        GearSort::Name => by_name(),
        GearSort::Category => a.category.cmp(&b.category).then_with(by_name),
        GearSort::Status => a.status.cmp(&b.status).then_with(by_name),
        GearSort::Updated => b.updated_at.cmp(&a.updated_at).then_with(by_name),
    }
}

/// 列出有效期在 `within_days` 天内（含已过期）的容器物品，按到期日升序
pub fn expiring_items(gear: &[GearItem], within_days: i64, today: NaiveDate) -> Vec<ExpiringItem> {
    let mut items: Vec<ExpiringItem> = gear
        .iter()
        .filter(|g| g.status != GearStatus::Retired)
        .flat_map(|g| {
            g.contents.iter().filter_map(move |item| {
                let expires = item.expiration_date?;
                let days_left = (expires - today).num_days();
                (days_left <= within_days).then(|| ExpiringItem {
                    gear_id: g.id,
                    gear_name: g.name.clone(),
                    item: item.clone(),
                    days_left,
                    expired: days_left < 0,
                })
            })
        })
        .collect();

    items.sort_by(|a, b| {
        a.days_left
            .cmp(&b.days_left)
            .then_with(|| a.gear_name.cmp(&b.gear_name))
            .then_with(|| a.item.name.cmp(&b.item.name))
    });
    items
}
