//! 物资申请业务服务

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::model::*;
use crate::app::team::model::TeamMember;
use crate::core::error::CoreError;
use crate::core::view::clean_opt;
use crate::infrastructure::Store;

#[derive(Clone)]
pub struct SupplyService {
    store: Store,
}

impl SupplyService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// 申请列表；汇总按全部申请计算，不受过滤影响
    pub async fn list(&self, query: &SupplyQuery) -> Result<SupplyList, CoreError> {
        let all = self.store.list::<SupplyRequest>().await?;
        let summary = status_summary(&all);
        Ok(SupplyList {
            requests: filter_and_sort(all, query),
            summary,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<SupplyRequest, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create(&self, form: SupplyRequestForm) -> Result<SupplyRequest, CoreError> {
        if let Some(member_id) = form.requested_by {
            self.store.ensure_exists::<TeamMember>(member_id).await?;
        }

        let now = Utc::now();
        let request = SupplyRequest {
            id: Uuid::new_v4(),
            requested_by: form.requested_by,
            item_name: form.item_name.trim().to_string(),
            quantity: form.quantity,
            unit: clean_opt(form.unit),
            priority: form.priority,
            status: SupplyStatus::Pending,
            justification: clean_opt(form.justification),
            review_note: None,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert(&request).await?;

        info!("新物资申请: {} x{} ({:?})", request.item_name, request.quantity, request.priority);
        Ok(request)
    }

    /// 只允许修改待审批的申请
    pub async fn update(&self, id: Uuid, form: SupplyRequestForm) -> Result<SupplyRequest, CoreError> {
        let mut request: SupplyRequest = self.store.fetch(id).await?;
        if request.status != SupplyStatus::Pending {
            return Err(CoreError::Conflict("申请已进入审批流程，不能修改".to_string()));
        }
        if let Some(member_id) = form.requested_by {
            self.store.ensure_exists::<TeamMember>(member_id).await?;
        }

        request.requested_by = form.requested_by;
        request.item_name = form.item_name.trim().to_string();
        request.quantity = form.quantity;
        request.unit = clean_opt(form.unit);
        request.priority = form.priority;
        request.justification = clean_opt(form.justification);
        request.updated_at = Utc::now();
        self.store.upsert(&request).await?;
        Ok(request)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<SupplyRequest>(id).await
    }

    pub async fn change_status(&self, id: Uuid, change: StatusChange) -> Result<SupplyRequest, CoreError> {
        let mut request: SupplyRequest = self.store.fetch(id).await?;
        if request.status.is_terminal() {
            return Err(CoreError::BadRequest(format!(
                "申请已处于终态 {:?}，不能再变更",
                request.status
            )));
        }
        if !request.status.can_transition_to(change.status) {
            return Err(CoreError::BadRequest(format!(
                "不能从 {:?} 变更为 {:?}",
                request.status, change.status
            )));
        }

        info!("物资申请 {} 状态: {:?} -> {:?}", request.item_name, request.status, change.status);
        request.status = change.status;
        if let Some(note) = clean_opt(change.note) {
            request.review_note = Some(note);
        }
        request.updated_at = Utc::now();
        self.store.upsert(&request).await?;
        Ok(request)
    }
}

/// 按优先级、创建时间升序
pub fn filter_and_sort(requests: Vec<SupplyRequest>, query: &SupplyQuery) -> Vec<SupplyRequest> {
    let mut requests: Vec<SupplyRequest> = requests
        .into_iter()
        .filter(|r| query.status.map_or(true, |s| r.status == s))
        .filter(|r| query.requested_by.map_or(true, |m| r.requested_by == Some(m)))
        .collect();
    requests.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    requests
}

pub fn status_summary(requests: &[SupplyRequest]) -> Vec<StatusCount> {
    SupplyStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: requests.iter().filter(|r| r.status == *status).count(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::shared::Priority;

    fn form(item: &str, priority: Priority) -> SupplyRequestForm {
        SupplyRequestForm {
            item_name: item.to_string(),
            quantity: 2,
            priority,
            ..Default::default()
        }
    }

    fn change(status: SupplyStatus) -> StatusChange {
        StatusChange { status, note: None }
    }

    #[test]
    fn transitions() {
        use SupplyStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Ordered));
        assert!(Ordered.can_transition_to(Fulfilled));
        assert!(!Pending.can_transition_to(Fulfilled));
        assert!(!Ordered.can_transition_to(Denied));
        assert!(Denied.is_terminal());
    }

    #[tokio::test]
    async fn list_sorted_by_priority_then_age() {
        let service = SupplyService::new(Store::memory());
        let low = service.create(form("Twine", Priority::Low)).await.unwrap();
        let crit = service.create(form("Insulin", Priority::Critical)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let crit2 = service.create(form("Epinephrine", Priority::Critical)).await.unwrap();

        let list = service.list(&SupplyQuery::default()).await.unwrap();
        let ids: Vec<Uuid> = list.requests.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![crit.id, crit2.id, low.id]);
        assert_eq!(list.summary[0], StatusCount { status: SupplyStatus::Pending, count: 3 });
    }

    #[tokio::test]
    async fn status_workflow_enforced() {
        let service = SupplyService::new(Store::memory());
        let req = service.create(form("Fencing wire", Priority::High)).await.unwrap();

        assert!(matches!(
            service.change_status(req.id, change(SupplyStatus::Fulfilled)).await,
            Err(CoreError::BadRequest(_))
        ));

        let approved = service
            .change_status(
                req.id,
                StatusChange {
                    status: SupplyStatus::Approved,
                    note: Some("ok for this week".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.review_note.as_deref(), Some("ok for this week"));

        assert!(matches!(
            service.update(req.id, form("Fencing wire", Priority::Low)).await,
            Err(CoreError::Conflict(_))
        ));

        service.change_status(req.id, change(SupplyStatus::Ordered)).await.unwrap();
        service.change_status(req.id, change(SupplyStatus::Fulfilled)).await.unwrap();
        assert!(matches!(
            service.change_status(req.id, change(SupplyStatus::Denied)).await,
            Err(CoreError::BadRequest(_))
        ));

        let filtered = service
            .list(&SupplyQuery {
                status: Some(SupplyStatus::Fulfilled),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.requests.len(), 1);
    }

    #[tokio::test]
    async fn unknown_requester_rejected() {
        let service = SupplyService::new(Store::memory());
        let mut f = form("Seeds", Priority::Medium);
        f.requested_by = Some(Uuid::new_v4());
        assert!(matches!(service.create(f).await, Err(CoreError::NotFound(_))));
    }
}
