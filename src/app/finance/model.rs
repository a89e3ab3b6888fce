//! 财务与产出数据模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::shared::not_blank;
use crate::infrastructure::Record;

macro_rules! record {
    ($ty:ty, $kind:literal, $label:literal) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;
            const LABEL: &'static str = $label;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

// ---- 客户 ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

record!(Customer, "customer", "客户");

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "客户名称不能为空"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "请提供有效的邮箱地址"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---- 产出（牲畜批次 / 收成） ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionKind {
    Livestock,
    Harvest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Production {
    pub id: Uuid,
    pub kind: ProductionKind,
    pub name: String,
    pub category: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

record!(Production, "production", "产出记录");

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductionForm {
    pub kind: ProductionKind,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "产出名称不能为空"))]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "数量必须大于0"))]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 产出去向分配：出售、自用、赠送、损耗
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Uuid,
    pub production_id: Uuid,
    pub sale: f64,
    pub personal: f64,
    pub gift: f64,
    pub loss: f64,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

record!(Allocation, "allocation", "分配记录");

impl Allocation {
    pub fn total(&self) -> f64 {
        self.sale + self.personal + self.gift + self.loss
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AllocationForm {
    #[serde(default)]
    #[validate(range(min = 0.0, message = "出售数量不能为负"))]
    pub sale: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "自用数量不能为负"))]
    pub personal: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "赠送数量不能为负"))]
    pub gift: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "损耗数量不能为负"))]
    pub loss: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---- 销售 ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub date: NaiveDate,
    pub customer_id: Option<Uuid>,
    pub production_id: Option<Uuid>,
    pub description: String,
    pub category: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

record!(Sale, "sale", "销售记录");

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaleForm {
    pub date: NaiveDate,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub production_id: Option<Uuid>,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "销售描述不能为空"))]
    pub description: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "销售分类不能为空"))]
    pub category: String,
    #[validate(range(exclusive_min = 0.0, message = "数量必须大于0"))]
    pub quantity: f64,
    #[validate(range(min = 0.0, message = "单价不能为负"))]
    pub unit_price: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
}

// ---- 订单 ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    pub payments: Vec<Payment>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

record!(Order, "order", "订单");

impl Order {
    pub fn paid(&self) -> f64 {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "订单项描述不能为空"))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0, message = "订单项数量必须大于0"))]
    pub quantity: f64,
    #[validate(range(min = 0.0, message = "订单项单价不能为负"))]
    pub unit_price: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderForm {
    pub customer_id: Uuid,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(min = 1, message = "订单至少需要一个订单项"))]
    pub items: Vec<OrderItemForm>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentForm {
    #[validate(range(exclusive_min = 0.0, message = "付款金额必须大于0"))]
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusChange {
    pub status: OrderStatus,
}

/// 订单列表行：附带付款进度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub paid: f64,
    pub balance: f64,
    pub percent_paid: f64,
}

// ---- 支出 ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseScope {
    #[default]
    General,
    Livestock,
    Harvest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub vendor: Option<String>,
    pub scope: ExpenseScope,
    pub production_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

record!(Expense, "expense", "支出记录");

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExpenseForm {
    pub date: NaiveDate,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "支出分类不能为空"))]
    pub category: String,
    #[validate(range(exclusive_min = 0.0, message = "支出金额必须大于0"))]
    pub amount: f64,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub scope: ExpenseScope,
    #[serde(default)]
    pub production_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---- 查询 ----

#[derive(Debug, Default, Deserialize)]
pub struct LedgerQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
}

// ---- 汇总 ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyTotal {
    /// YYYY-MM
    pub month: String,
    pub revenue: f64,
    pub expenses: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerTotal {
    pub customer_id: Uuid,
    pub name: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sales_revenue: f64,
    pub payments_received: f64,
    pub revenue: f64,
    pub expenses: f64,
    pub net: f64,
    pub sales_by_category: Vec<CategoryTotal>,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub monthly: Vec<MonthlyTotal>,
    pub outstanding_balance: f64,
    pub top_customers: Vec<CustomerTotal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationBucket {
    pub bucket: String,
    pub quantity: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionSummary {
    pub production: Production,
    pub allocated: f64,
    pub unallocated: f64,
    pub buckets: Vec<AllocationBucket>,
    pub sales_revenue: f64,
    pub expenses: f64,
    pub net: f64,
}
