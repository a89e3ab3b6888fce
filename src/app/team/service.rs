//! 团队业务服务

use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::model::*;
use crate::app::gear::model::{GearItem, GearStatus};
use crate::core::error::CoreError;
use crate::core::view::{any_contains_ci, clean_list, clean_opt, contains_ci, percent};
use crate::infrastructure::Store;

#[derive(Clone)]
pub struct TeamService {
    store: Store,
    /// 签到去重与队员记录的读改写在此串行
    writes: Arc<Mutex<()>>,
}

impl TeamService {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list_members(&self, query: &MemberQuery) -> Result<Vec<TeamMember>, CoreError> {
        let members = self.store.list::<TeamMember>().await?;
        Ok(filter_members(members, query))
    }

    pub async fn get_member(&self, id: Uuid) -> Result<TeamMember, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create_member(&self, form: MemberForm) -> Result<TeamMember, CoreError> {
        let now = Utc::now();
        let mut member = TeamMember {
            id: Uuid::new_v4(),
            name: String::new(),
            callsign: None,
            role: None,
            email: None,
            phone: None,
            date_of_birth: None,
            height_cm: None,
            weight_kg: None,
            blood_type: None,
            readiness: form.readiness.unwrap_or_default(),
            allergies: Vec::new(),
            medical_conditions: Vec::new(),
            medications: Vec::new(),
            skills: Vec::new(),
            trainings: Vec::new(),
            emergency_contact: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        apply_form(&mut member, form);

        self.store.upsert(&member).await?;
        info!("新增队员: {} ({})", member.name, member.id);
        Ok(member)
    }

    pub async fn update_member(&self, id: Uuid, form: MemberForm) -> Result<TeamMember, CoreError> {
        let _guard = self.writes.lock().await;
        let mut member: TeamMember = self.store.fetch(id).await?;
        apply_form(&mut member, form);
        member.updated_at = Utc::now();

        self.store.upsert(&member).await?;
        info!("更新队员: {} ({})", member.name, member.id);
        Ok(member)
    }

    /// 删除队员，同时清理其健康记录并归还其名下装备
    pub async fn delete_member(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.ensure_exists::<TeamMember>(id).await?;

        for checkin in self.store.list::<DailyCheckin>().await? {
            if checkin.member_id == id {
                self.store.remove::<DailyCheckin>(checkin.id).await?;
            }
        }
        for vital in self.store.list::<Vital>().await? {
            if vital.member_id == id {
                self.store.remove::<Vital>(vital.id).await?;
            }
        }
        for log in self.store.list::<WeightLog>().await? {
            if log.member_id == id {
                self.store.remove::<WeightLog>(log.id).await?;
            }
        }

        let mut returned = 0;
        for mut gear in self.store.list::<GearItem>().await? {
            if gear.assigned_to == Some(id) {
                gear.assigned_to = None;
                gear.status = GearStatus::Available;
                gear.updated_at = Utc::now();
                self.store.upsert(&gear).await?;
                returned += 1;
            }
        }

        self.store.delete::<TeamMember>(id).await?;
        info!("删除队员: {}，归还装备 {} 件", id, returned);
        Ok(())
    }

    /// 提交每日签到；同一队员同一天重复提交会覆盖之前的记录
    pub async fn submit_checkin(
        &self,
        form: CheckinForm,
        today: NaiveDate,
    ) -> Result<DailyCheckin, CoreError> {
        let _guard = self.writes.lock().await;
        let mut member: TeamMember = self.store.fetch(form.member_id).await?;
        let date = form.date.unwrap_or(today);
        if date > today {
            return Err(CoreError::BadRequest("不能为未来的日期签到".to_string()));
        }

        let existing = self
            .store
            .list::<DailyCheckin>()
            .await?
            .into_iter()
            .find(|c| c.member_id == form.member_id && c.date == date);

        let readiness = form
            .readiness
            .unwrap_or_else(|| derive_readiness(form.sleep_hours, form.energy, form.soreness));

        let checkin = DailyCheckin {
            id: existing.as_ref().map(|c| c.id).unwrap_or_else(Uuid::new_v4),
            member_id: form.member_id,
            date,
            sleep_hours: form.sleep_hours,
            energy: form.energy,
            soreness: form.soreness,
            mood: clean_opt(form.mood),
            notes: clean_opt(form.notes),
            readiness,
            created_at: existing.map(|c| c.created_at).unwrap_or_else(Utc::now),
        };
        self.store.upsert(&checkin).await?;

        // 只有最新一天的签到才改变队员当前状态
        let latest = self
            .store
            .list::<DailyCheckin>()
            .await?
            .into_iter()
            .filter(|c| c.member_id == member.id)
            .map(|c| c.date)
            .max();
        if latest == Some(date) && member.readiness != readiness {
            member.readiness = readiness;
            member.updated_at = Utc::now();
            self.store.upsert(&member).await?;
        }

        info!("队员 {} 完成 {} 签到: {:?}", member.name, date, readiness);
        Ok(checkin)
    }

    pub async fn list_checkins(&self, query: &CheckinQuery) -> Result<Vec<DailyCheckin>, CoreError> {
        let mut checkins: Vec<DailyCheckin> = self
            .store
            .list::<DailyCheckin>()
            .await?
            .into_iter()
            .filter(|c| query.member_id.map_or(true, |id| c.member_id == id))
            .filter(|c| query.date.map_or(true, |d| c.date == d))
            .collect();
        checkins.sort_by(|a, b| b.date.cmp(&a.date).then(a.created_at.cmp(&b.created_at)));
        Ok(checkins)
    }

    pub async fn add_vital(&self, member_id: Uuid, form: VitalForm) -> Result<Vital, CoreError> {
        self.store.ensure_exists::<TeamMember>(member_id).await?;
        if !form.has_measurement() {
            return Err(CoreError::Validation("至少需要填写一项体征数据".to_string()));
        }

        let vital = Vital {
            id: Uuid::new_v4(),
            member_id,
            recorded_at: form.recorded_at.unwrap_or_else(Utc::now),
            systolic: form.systolic,
            diastolic: form.diastolic,
            resting_heart_rate: form.resting_heart_rate,
            temperature_c: form.temperature_c,
            spo2: form.spo2,
            notes: clean_opt(form.notes),
        };
        self.store.upsert(&vital).await?;
        Ok(vital)
    }

    /// 最新的在前
    pub async fn list_vitals(&self, member_id: Uuid) -> Result<Vec<Vital>, CoreError> {
        self.store.ensure_exists::<TeamMember>(member_id).await?;
        let mut vitals: Vec<Vital> = self
            .store
            .list::<Vital>()
            .await?
            .into_iter()
            .filter(|v| v.member_id == member_id)
            .collect();
        vitals.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(vitals)
    }

    pub async fn add_weight(
        &self,
        member_id: Uuid,
        form: WeightForm,
        today: NaiveDate,
    ) -> Result<WeightLog, CoreError> {
        let _guard = self.writes.lock().await;
        let mut member: TeamMember = self.store.fetch(member_id).await?;
        let log = WeightLog {
            id: Uuid::new_v4(),
            member_id,
            date: form.date.unwrap_or(today),
            weight_kg: form.weight_kg,
            notes: clean_opt(form.notes),
        };

        let newest = self
            .list_weights(member_id)
            .await?
            .last()
            .map(|l| l.date);
        self.store.upsert(&log).await?;

        if newest.map_or(true, |d| log.date >= d) {
            member.weight_kg = Some(log.weight_kg);
            member.updated_at = Utc::now();
            self.store.upsert(&member).await?;
        }
        Ok(log)
    }

    /// 按日期升序
    pub async fn list_weights(&self, member_id: Uuid) -> Result<Vec<WeightLog>, CoreError> {
        let mut logs: Vec<WeightLog> = self
            .store
            .list::<WeightLog>()
            .await?
            .into_iter()
            .filter(|l| l.member_id == member_id)
            .collect();
        logs.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(logs)
    }

    pub async fn overview(&self, today: NaiveDate) -> Result<TeamOverview, CoreError> {
        let members = self.store.list::<TeamMember>().await?;
        let checkins = self.store.list::<DailyCheckin>().await?;
        Ok(build_overview(&members, &checkins, today))
    }
}

fn apply_form(member: &mut TeamMember, form: MemberForm) {
    member.name = form.name.trim().to_string();
    member.callsign = clean_opt(form.callsign);
    member.role = clean_opt(form.role);
    member.email = clean_opt(form.email).map(|e| e.to_lowercase());
    member.phone = clean_opt(form.phone);
    member.date_of_birth = form.date_of_birth;
    member.height_cm = form.height_cm;
    member.weight_kg = form.weight_kg;
    member.blood_type = clean_opt(form.blood_type).map(|b| b.to_uppercase());
    if let Some(readiness) = form.readiness {
        member.readiness = readiness;
    }
    member.allergies = clean_list(form.allergies);
    member.medical_conditions = clean_list(form.medical_conditions);
    member.medications = clean_list(form.medications);
    member.skills = clean_list(form.skills);
    member.trainings = clean_list(form.trainings);
    member.emergency_contact = clean_opt(form.emergency_contact);
    member.notes = clean_opt(form.notes);
}

/// 根据签到评分推算战备状态
pub fn derive_readiness(sleep_hours: f64, energy: u8, soreness: u8) -> Readiness {
    if energy <= 3 || sleep_hours < 5.0 || soreness >= 8 {
        Readiness::Red
    } else if energy <= 6 || sleep_hours < 7.0 || soreness >= 6 {
        Readiness::Amber
    } else {
        Readiness::Green
    }
}

/// 按查询条件过滤，结果按姓名排序
pub fn filter_members(members: Vec<TeamMember>, query: &MemberQuery) -> Vec<TeamMember> {
    let search = query.search.as_deref().unwrap_or("");
    let mut members: Vec<TeamMember> = members
        .into_iter()
        .filter(|m| {
            any_contains_ci(
                [Some(m.name.as_str()), m.callsign.as_deref(), m.role.as_deref()],
                search,
            )
        })
        .filter(|m| query.readiness.map_or(true, |r| m.readiness == r))
        .filter(|m| match query.skill.as_deref() {
            Some(skill) => m.skills.iter().any(|s| contains_ci(s, skill)),
            None => true,
        })
        .collect();
    members.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    members
}

pub fn build_overview(
    members: &[TeamMember],
    checkins: &[DailyCheckin],
    today: NaiveDate,
) -> TeamOverview {
    let total = members.len();

    let readiness = Readiness::ALL
        .iter()
        .map(|level| {
            let count = members.iter().filter(|m| m.readiness == *level).count();
            ReadinessBar {
                readiness: *level,
                count,
                percent: percent(count as f64, total as f64),
            }
        })
        .collect();

    let checked_ids: HashSet<Uuid> = checkins
        .iter()
        .filter(|c| c.date == today)
        .map(|c| c.member_id)
        .collect();

    let mut sorted: Vec<&TeamMember> = members.iter().collect();
    sorted.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    let to_ref = |m: &&TeamMember| MemberRef {
        id: m.id,
        name: m.name.clone(),
    };

    let (checked_in_today, missing_checkin): (Vec<_>, Vec<_>) =
        sorted.iter().copied().partition(|m| checked_ids.contains(&m.id));

    let medical_flags = sorted
        .iter()
        .filter(|m| !m.medical_conditions.is_empty() || !m.allergies.is_empty())
        .map(to_ref)
        .collect();

    let mut coverage: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for member in members {
        for skill in &member.skills {
            let entry = coverage
                .entry(skill.to_lowercase())
                .or_insert_with(|| (skill.clone(), 0));
            entry.1 += 1;
        }
    }
    let mut skills: Vec<SkillCoverage> = coverage
        .into_values()
        .map(|(skill, members)| SkillCoverage { skill, members })
        .collect();
    skills.sort_by(|a, b| b.members.cmp(&a.members).then_with(|| a.skill.cmp(&b.skill)));

    TeamOverview {
        total_members: total,
        readiness,
        checked_in_today: checked_in_today.iter().map(to_ref).collect(),
        missing_checkin: missing_checkin.iter().map(to_ref).collect(),
        medical_flags,
        skills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, readiness: Readiness, skills: &[&str]) -> TeamMember {
        let now = Utc::now();
        TeamMember {
            id: Uuid::new_v4(),
            name: name.to_string(),
            callsign: None,
            role: None,
            email: None,
            phone: None,
            date_of_birth: None,
            height_cm: None,
            weight_kg: None,
            blood_type: None,
            readiness,
            allergies: Vec::new(),
            medical_conditions: Vec::new(),
            medications: Vec::new(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            trainings: Vec::new(),
            emergency_contact: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn form(name: &str) -> MemberForm {
        MemberForm {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn checkin_form(member_id: Uuid, energy: u8) -> CheckinForm {
        CheckinForm {
            member_id,
            date: None,
            sleep_hours: 8.0,
            energy,
            soreness: 2,
            mood: None,
            notes: None,
            readiness: None,
        }
    }

    #[test]
    fn readiness_thresholds() {
        assert_eq!(derive_readiness(8.0, 9, 2), Readiness::Green);
        assert_eq!(derive_readiness(6.5, 9, 2), Readiness::Amber);
        assert_eq!(derive_readiness(8.0, 5, 2), Readiness::Amber);
        assert_eq!(derive_readiness(8.0, 9, 6), Readiness::Amber);
        assert_eq!(derive_readiness(4.0, 9, 2), Readiness::Red);
        assert_eq!(derive_readiness(8.0, 2, 2), Readiness::Red);
        assert_eq!(derive_readiness(8.0, 9, 9), Readiness::Red);
    }

    #[test]
    fn filter_by_search_readiness_and_skill() {
        let members = vec![
            member("Rosa", Readiness::Green, &["Welding"]),
            member("ada", Readiness::Red, &["First Aid"]),
            member("Bram", Readiness::Green, &["first aid", "Radio"]),
        ];

        let all = filter_members(members.clone(), &MemberQuery::default());
        assert_eq!(
            all.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["ada", "Bram", "Rosa"]
        );

        let query = MemberQuery {
            skill: Some("FIRST".to_string()),
            readiness: Some(Readiness::Green),
            ..Default::default()
        };
        let found = filter_members(members.clone(), &query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bram");

        let query = MemberQuery {
            search: Some("ros".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_members(members, &query)[0].name, "Rosa");
    }

    #[test]
    fn overview_readiness_bar_and_skills() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let mut ada = member("Ada", Readiness::Green, &["Radio", "First Aid"]);
        ada.allergies = vec!["Penicillin".to_string()];
        let bram = member("Bram", Readiness::Amber, &["radio"]);
        let cy = member("Cy", Readiness::Green, &[]);

        let checkins = vec![DailyCheckin {
            id: Uuid::new_v4(),
            member_id: bram.id,
            date: today,
            sleep_hours: 7.0,
            energy: 6,
            soreness: 3,
            mood: None,
            notes: None,
            readiness: Readiness::Amber,
            created_at: Utc::now(),
        }];

        let overview = build_overview(&[ada, bram, cy], &checkins, today);
        assert_eq!(overview.total_members, 3);
        assert_eq!(overview.readiness[0].count, 2);
        assert_eq!(overview.readiness[0].percent, 66.7);
        assert_eq!(overview.readiness[1].percent, 33.3);
        assert_eq!(overview.readiness[2].percent, 0.0);
        assert_eq!(overview.checked_in_today.len(), 1);
        assert_eq!(overview.checked_in_today[0].name, "Bram");
        assert_eq!(
            overview.missing_checkin.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["Ada", "Cy"]
        );
        assert_eq!(overview.medical_flags.len(), 1);
        assert_eq!(overview.skills[0], SkillCoverage { skill: "Radio".into(), members: 2 });
        assert_eq!(overview.skills[1].skill, "First Aid");
    }

    #[test]
    fn overview_of_empty_team() {
        let overview = build_overview(&[], &[], NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(overview.total_members, 0);
        assert!(overview.readiness.iter().all(|bar| bar.percent == 0.0));
    }

    #[tokio::test]
    async fn checkin_replaces_same_day_and_updates_member() {
        let service = TeamService::new(Store::memory());
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let created = service.create_member(form("  Ada ")).await.unwrap();
        assert_eq!(created.name, "Ada");

        let first = service.submit_checkin(checkin_form(created.id, 2), today).await.unwrap();
        assert_eq!(first.readiness, Readiness::Red);
        assert_eq!(service.get_member(created.id).await.unwrap().readiness, Readiness::Red);

        let second = service.submit_checkin(checkin_form(created.id, 9), today).await.unwrap();
        assert_eq!(second.id, first.id);
        let all = service.list_checkins(&CheckinQuery::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(service.get_member(created.id).await.unwrap().readiness, Readiness::Green);
    }

    #[tokio::test]
    async fn profile_edit_keeps_checkin_readiness() {
        let service = TeamService::new(Store::memory());
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let created = service.create_member(form("Ada")).await.unwrap();
        service.submit_checkin(checkin_form(created.id, 2), today).await.unwrap();

        let mut edit = form("Ada");
        edit.phone = Some("555-0100".to_string());
        let updated = service.update_member(created.id, edit).await.unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(updated.readiness, Readiness::Red);

        let mut cleared = form("Ada");
        cleared.readiness = Some(Readiness::Green);
        let updated = service.update_member(created.id, cleared).await.unwrap();
        assert_eq!(updated.readiness, Readiness::Green);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checkins_keep_one_per_day() {
        let service = TeamService::new(Store::memory());
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let member_id = service.create_member(form("Ada")).await.unwrap().id;

        let mut tasks = tokio::task::JoinSet::new();
        for energy in 1..=10 {
            let service = service.clone();
            tasks.spawn(async move { service.submit_checkin(checkin_form(member_id, energy), today).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let all = service.list_checkins(&CheckinQuery::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn checkin_for_future_date_rejected() {
        let service = TeamService::new(Store::memory());
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let created = service.create_member(form("Ada")).await.unwrap();
        let mut f = checkin_form(created.id, 8);
        f.date = today.succ_opt();
        assert!(matches!(
            service.submit_checkin(f, today).await,
            Err(CoreError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn delete_member_cascades() {
        let store = Store::memory();
        let service = TeamService::new(store.clone());
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let created = service.create_member(form("Ada")).await.unwrap();
        service.submit_checkin(checkin_form(created.id, 8), today).await.unwrap();
        service
            .add_weight(created.id, WeightForm { date: None, weight_kg: 70.0, notes: None }, today)
            .await
            .unwrap();

        service.delete_member(created.id).await.unwrap();
        assert_eq!(store.count::<DailyCheckin>().await.unwrap(), 0);
        assert_eq!(store.count::<WeightLog>().await.unwrap(), 0);
        assert!(matches!(
            service.get_member(created.id).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn vital_without_measurement_rejected() {
        let service = TeamService::new(Store::memory());
        let created = service.create_member(form("Ada")).await.unwrap();
        let err = service.add_vital(created.id, VitalForm::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn newest_weight_updates_member() {
        let service = TeamService::new(Store::memory());
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let created = service.create_member(form("Ada")).await.unwrap();

        service
            .add_weight(created.id, WeightForm { date: None, weight_kg: 71.0, notes: None }, today)
            .await
            .unwrap();
        service
            .add_weight(
                created.id,
                WeightForm { date: NaiveDate::from_ymd_opt(2025, 5, 1), weight_kg: 74.0, notes: None },
                today,
            )
            .await
            .unwrap();

        assert_eq!(service.get_member(created.id).await.unwrap().weight_kg, Some(71.0));
        let logs = service.list_weights(created.id).await.unwrap();
        assert_eq!(logs.iter().map(|l| l.weight_kg).collect::<Vec<_>>(), vec![74.0, 71.0]);
    }
}
