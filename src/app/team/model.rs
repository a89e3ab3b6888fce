//! 团队数据模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::shared::not_blank;
use crate::infrastructure::Record;

/// 战备状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Readiness {
    #[default]
    Green,
    Amber,
    Red,
}

impl Readiness {
    pub const ALL: [Readiness; 3] = [Readiness::Green, Readiness::Amber, Readiness::Red];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub callsign: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub blood_type: Option<String>,
    pub readiness: Readiness,
    pub allergies: Vec<String>,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub skills: Vec<String>,
    pub trainings: Vec<String>,
    pub emergency_contact: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for TeamMember {
    const KIND: &'static str = "team_member";
    const LABEL: &'static str = "队员";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// 队员表单（新建与整体更新共用）
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MemberForm {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "姓名不能为空"),
        length(max = 100, message = "姓名不能超过100个字符")
    )]
    pub name: String,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    #[validate(email(message = "请提供有效的邮箱地址"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 30.0, max = 250.0, message = "身高需在30到250厘米之间"))]
    pub height_cm: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 2.0, max = 400.0, message = "体重需在2到400公斤之间"))]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub blood_type: Option<String>,
    /// 缺省时保留当前状态（通常由签到推算）
    #[serde(default)]
    pub readiness: Option<Readiness>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub trainings: Vec<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberQuery {
    pub search: Option<String>,
    pub readiness: Option<Readiness>,
    pub skill: Option<String>,
}

/// 每日签到
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCheckin {
    pub id: Uuid,
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub sleep_hours: f64,
    pub energy: u8,
    pub soreness: u8,
    pub mood: Option<String>,
    pub notes: Option<String>,
    pub readiness: Readiness,
    pub created_at: DateTime<Utc>,
}

impl Record for DailyCheckin {
    const KIND: &'static str = "daily_checkin";
    const LABEL: &'static str = "签到";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckinForm {
    pub member_id: Uuid,
    /// 不填则为今天
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 24.0, message = "睡眠时长需在0到24小时之间"))]
    pub sleep_hours: f64,
    #[validate(range(min = 1, max = 10, message = "精力评分需在1到10之间"))]
    pub energy: u8,
    #[validate(range(min = 1, max = 10, message = "酸痛评分需在1到10之间"))]
    pub soreness: u8,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// 不填则根据评分推算
    #[serde(default)]
    pub readiness: Option<Readiness>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckinQuery {
    pub member_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

/// 体征记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vital {
    pub id: Uuid,
    pub member_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub systolic: Option<u16>,
    pub diastolic: Option<u16>,
    pub resting_heart_rate: Option<u16>,
    pub temperature_c: Option<f64>,
    pub spo2: Option<u8>,
    pub notes: Option<String>,
}

impl Record for Vital {
    const KIND: &'static str = "vital";
    const LABEL: &'static str = "体征记录";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct VitalForm {
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(range(min = 50, max = 260, message = "收缩压数值无效"))]
    pub systolic: Option<u16>,
    #[serde(default)]
    #[validate(range(min = 30, max = 160, message = "舒张压数值无效"))]
    pub diastolic: Option<u16>,
    #[serde(default)]
    #[validate(range(min = 20, max = 250, message = "静息心率数值无效"))]
    pub resting_heart_rate: Option<u16>,
    #[serde(default)]
    #[validate(range(min = 30.0, max = 45.0, message = "体温数值无效"))]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 50, max = 100, message = "血氧数值无效"))]
    pub spo2: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl VitalForm {
    pub fn has_measurement(&self) -> bool {
        self.systolic.is_some()
            || self.diastolic.is_some()
            || self.resting_heart_rate.is_some()
            || self.temperature_c.is_some()
            || self.spo2.is_some()
    }
}

/// 体重记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightLog {
    pub id: Uuid,
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub notes: Option<String>,
}

impl Record for WeightLog {
    const KIND: &'static str = "weight_log";
    const LABEL: &'static str = "体重记录";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WeightForm {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[validate(range(min = 2.0, max = 400.0, message = "体重需在2到400公斤之间"))]
    pub weight_kg: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 战备条中的一格
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessBar {
    pub readiness: Readiness,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillCoverage {
    pub skill: String,
    pub members: usize,
}

/// 团队概览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamOverview {
    pub total_members: usize,
    pub readiness: Vec<ReadinessBar>,
    pub checked_in_today: Vec<MemberRef>,
    pub missing_checkin: Vec<MemberRef>,
    pub medical_flags: Vec<MemberRef>,
    pub skills: Vec<SkillCoverage>,
}
