//! 财务业务服务

use chrono::{NaiveDate, Utc};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::model::*;
use super::summary::{financial_summary, order_view, production_summary};
use crate::app::shared::DateRange;
use crate::core::error::CoreError;
use crate::core::view::{clean_opt, round2};
use crate::infrastructure::Store;

/// 浮点比较容差
const EPSILON: f64 = 1e-6;

#[derive(Clone)]
pub struct FinanceService {
    store: Store,
    /// 先检查后写入的操作（分配总量、付款余额、支出类型）在此串行
    writes: Arc<Mutex<()>>,
}

impl FinanceService {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    // ---- 客户 ----

    pub async fn list_customers(&self) -> Result<Vec<Customer>, CoreError> {
        let mut customers = self.store.list::<Customer>().await?;
        customers.sort_by_key(|c| c.name.to_lowercase());
        Ok(customers)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<Customer, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create_customer(&self, form: CustomerForm) -> Result<Customer, CoreError> {
        let customer = Customer {
            id: Uuid::new_v4(),
            name: form.name.trim().to_string(),
            email: clean_opt(form.email),
            phone: clean_opt(form.phone),
            address: clean_opt(form.address),
            notes: clean_opt(form.notes),
            created_at: Utc::now(),
        };
        self.store.upsert(&customer).await?;
        info!("新增客户: {}", customer.name);
        Ok(customer)
    }

    pub async fn update_customer(&self, id: Uuid, form: CustomerForm) -> Result<Customer, CoreError> {
        let mut customer: Customer = self.store.fetch(id).await?;
        customer.name = form.name.trim().to_string();
        customer.email = clean_opt(form.email);
        customer.phone = clean_opt(form.phone);
        customer.address = clean_opt(form.address);
        customer.notes = clean_opt(form.notes);
        self.store.upsert(&customer).await?;
        Ok(customer)
    }

    /// 仍被销售或订单引用的客户不能删除
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.ensure_exists::<Customer>(id).await?;
        let has_sales = self
            .store
            .list::<Sale>()
            .await?
            .iter()
            .any(|s| s.customer_id == Some(id));
        let has_orders = self.store.list::<Order>().await?.iter().any(|o| o.customer_id == id);
        if has_sales || has_orders {
            return Err(CoreError::Conflict("该客户仍有关联的销售或订单".to_string()));
        }
        self.store.delete::<Customer>(id).await?;
        info!("删除客户: {}", id);
        Ok(())
    }

    // ---- 产出与分配 ----

    /// 最近的在前
    pub async fn list_productions(&self) -> Result<Vec<Production>, CoreError> {
        let mut productions = self.store.list::<Production>().await?;
        productions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.name.cmp(&b.name)));
        Ok(productions)
    }

    pub async fn get_production(&self, id: Uuid) -> Result<Production, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create_production(&self, form: ProductionForm) -> Result<Production, CoreError> {
        let production = Production {
            id: Uuid::new_v4(),
            kind: form.kind,
            name: form.name.trim().to_string(),
            category: clean_opt(form.category),
            quantity: form.quantity,
            unit: clean_opt(form.unit),
            date: form.date,
            notes: clean_opt(form.notes),
            created_at: Utc::now(),
        };
        self.store.upsert(&production).await?;
        info!("新增产出: {} x{}", production.name, production.quantity);
        Ok(production)
    }

    /// 数量不能低于已分配总量；有关联支出时不能改变产出类型
    pub async fn update_production(&self, id: Uuid, form: ProductionForm) -> Result<Production, CoreError> {
        let _guard = self.writes.lock().await;
        let mut production: Production = self.store.fetch(id).await?;
        let allocated = self.allocated(id, None).await?;
        if form.quantity + EPSILON < allocated {
            return Err(CoreError::BadRequest(format!(
                "数量不能小于已分配的 {}",
                allocated
            )));
        }
        if form.kind != production.kind {
            let linked = self
                .store
                .list::<Expense>()
                .await?
                .iter()
                .filter(|e| e.production_id == Some(id))
                .count();
            if linked > 0 {
                return Err(CoreError::Conflict(format!(
                    "产出 {} 已有 {} 笔关联支出，不能修改类型",
                    production.name, linked
                )));
            }
        }

        production.kind = form.kind;
        production.name = form.name.trim().to_string();
        production.category = clean_opt(form.category);
        production.quantity = form.quantity;
        production.unit = clean_opt(form.unit);
        production.date = form.date;
        production.notes = clean_opt(form.notes);
        self.store.upsert(&production).await?;
        Ok(production)
    }

    /// 连带删除分配记录；仍被销售或支出引用时拒绝
    pub async fn delete_production(&self, id: Uuid) -> Result<(), CoreError> {
        let _guard = self.writes.lock().await;
        self.store.ensure_exists::<Production>(id).await?;
        let has_sales = self
            .store
            .list::<Sale>()
            .await?
            .iter()
            .any(|s| s.production_id == Some(id));
        let has_expenses = self
            .store
            .list::<Expense>()
            .await?
            .iter()
            .any(|e| e.production_id == Some(id));
        if has_sales || has_expenses {
            return Err(CoreError::Conflict("该产出仍有关联的销售或支出".to_string()));
        }

        for allocation in self.list_allocations(id).await? {
            self.store.remove::<Allocation>(allocation.id).await?;
        }
        self.store.delete::<Production>(id).await?;
        info!("删除产出: {}", id);
        Ok(())
    }

    pub async fn list_allocations(&self, production_id: Uuid) -> Result<Vec<Allocation>, CoreError> {
        let mut allocations: Vec<Allocation> = self
            .store
            .list::<Allocation>()
            .await?
            .into_iter()
            .filter(|a| a.production_id == production_id)
            .collect();
        allocations.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(allocations)
    }

    pub async fn allocate(
        &self,
        production_id: Uuid,
        form: AllocationForm,
        today: NaiveDate,
    ) -> Result<Allocation, CoreError> {
        let _guard = self.writes.lock().await;
        let production: Production = self.store.fetch(production_id).await?;
        let allocation = Allocation {
            id: Uuid::new_v4(),
            production_id,
            sale: form.sale,
            personal: form.personal,
            gift: form.gift,
            loss: form.loss,
            date: form.date.unwrap_or(today),
            notes: clean_opt(form.notes),
        };
        self.check_allocation(&production, &allocation).await?;

        self.store.upsert(&allocation).await?;
        info!("产出分配: {} 分配 {}", production.name, allocation.total());
        Ok(allocation)
    }

    pub async fn update_allocation(&self, id: Uuid, form: AllocationForm) -> Result<Allocation, CoreError> {
        let _guard = self.writes.lock().await;
        let mut allocation: Allocation = self.store.fetch(id).await?;
        let production: Production = self.store.fetch(allocation.production_id).await?;
        allocation.sale = form.sale;
        allocation.personal = form.personal;
        allocation.gift = form.gift;
        allocation.loss = form.loss;
        if let Some(date) = form.date {
            allocation.date = date;
        }
        allocation.notes = clean_opt(form.notes);
        self.check_allocation(&production, &allocation).await?;

        self.store.upsert(&allocation).await?;
        Ok(allocation)
    }

    pub async fn delete_allocation(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<Allocation>(id).await
    }

    pub async fn production_summary(&self, id: Uuid) -> Result<ProductionSummary, CoreError> {
        let production: Production = self.store.fetch(id).await?;
        let allocations = self.store.list::<Allocation>().await?;
        let sales = self.store.list::<Sale>().await?;
        let expenses = self.store.list::<Expense>().await?;
        Ok(production_summary(production, &allocations, &sales, &expenses))
    }

    /// 已分配数量，可排除某条正在修改的分配
    async fn allocated(&self, production_id: Uuid, except: Option<Uuid>) -> Result<f64, CoreError> {
        Ok(self
            .list_allocations(production_id)
            .await?
            .iter()
            .filter(|a| Some(a.id) != except)
            .map(Allocation::total)
            .sum())
    }

    async fn check_allocation(&self, production: &Production, allocation: &Allocation) -> Result<(), CoreError> {
        if allocation.total() <= 0.0 {
            return Err(CoreError::BadRequest("分配数量必须大于0".to_string()));
        }
        let others = self.allocated(production.id, Some(allocation.id)).await?;
        if others + allocation.total() > production.quantity + EPSILON {
            return Err(CoreError::BadRequest(format!(
                "分配总量超过产出数量，剩余可分配 {}",
                (production.quantity - others).max(0.0)
            )));
        }
        Ok(())
    }

    // ---- 销售 ----

    pub async fn list_sales(&self, query: &LedgerQuery) -> Result<Vec<Sale>, CoreError> {
        let range = ledger_range(query)?;
        let category = query
            .category
            .as_deref()
            .map(normalize_category)
            .filter(|c| !c.is_empty());
        let mut sales: Vec<Sale> = self
            .store
            .list::<Sale>()
            .await?
            .into_iter()
            .filter(|s| range.contains(s.date))
            .filter(|s| category.as_ref().map_or(true, |c| &s.category == c))
            .collect();
        sales.sort_by(|a, b| newest_first((a.date, a.created_at), (b.date, b.created_at)));
        Ok(sales)
    }

    pub async fn get_sale(&self, id: Uuid) -> Result<Sale, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create_sale(&self, form: SaleForm) -> Result<Sale, CoreError> {
        self.check_sale_refs(&form).await?;
        let sale = Sale {
            id: Uuid::new_v4(),
            date: form.date,
            customer_id: form.customer_id,
            production_id: form.production_id,
            description: form.description.trim().to_string(),
            category: normalize_category(&form.category),
            quantity: form.quantity,
            unit_price: form.unit_price,
            amount: round2(form.quantity * form.unit_price),
            payment_method: clean_opt(form.payment_method),
            created_at: Utc::now(),
        };
        self.store.upsert(&sale).await?;
        info!("记录销售: {} 金额 {}", sale.description, sale.amount);
        Ok(sale)
    }

    pub async fn update_sale(&self, id: Uuid, form: SaleForm) -> Result<Sale, CoreError> {
        let mut sale: Sale = self.store.fetch(id).await?;
        self.check_sale_refs(&form).await?;
        sale.date = form.date;
        sale.customer_id = form.customer_id;
        sale.production_id = form.production_id;
        sale.description = form.description.trim().to_string();
        sale.category = normalize_category(&form.category);
        sale.quantity = form.quantity;
        sale.unit_price = form.unit_price;
        sale.amount = round2(form.quantity * form.unit_price);
        sale.payment_method = clean_opt(form.payment_method);
        self.store.upsert(&sale).await?;
        Ok(sale)
    }

    pub async fn delete_sale(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<Sale>(id).await
    }

    async fn check_sale_refs(&self, form: &SaleForm) -> Result<(), CoreError> {
        if let Some(customer_id) = form.customer_id {
            self.store.ensure_exists::<Customer>(customer_id).await?;
        }
        if let Some(production_id) = form.production_id {
            self.store.ensure_exists::<Production>(production_id).await?;
        }
        Ok(())
    }

    // ---- 订单 ----

    /// 最近下单的在前，附带付款进度
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderView>, CoreError> {
        let mut orders: Vec<Order> = self
            .store
            .list::<Order>()
            .await?
            .into_iter()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .filter(|o| query.customer_id.map_or(true, |c| o.customer_id == c))
            .collect();
        orders.sort_by(|a, b| newest_first((a.order_date, a.created_at), (b.order_date, b.created_at)));
        Ok(orders.into_iter().map(order_view).collect())
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderView, CoreError> {
        Ok(order_view(self.store.fetch(id).await?))
    }

    pub async fn create_order(&self, form: OrderForm) -> Result<OrderView, CoreError> {
        self.check_order_form(&form).await?;
        let now = Utc::now();
        let items = order_items(form.items);
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: form.customer_id,
            order_date: form.order_date,
            due_date: form.due_date,
            total: order_total(&items),
            items,
            status: OrderStatus::Pending,
            payments: Vec::new(),
            notes: clean_opt(form.notes),
            created_at: now,
            updated_at: now,
        };
        self.store.upsert(&order).await?;
        info!("新建订单: {} 总额 {}", order.id, order.total);
        Ok(order_view(order))
    }

    /// 只有未完结的订单可以修改，新总额不能低于已付金额
    pub async fn update_order(&self, id: Uuid, form: OrderForm) -> Result<OrderView, CoreError> {
        let _guard = self.writes.lock().await;
        let mut order: Order = self.store.fetch(id).await?;
        if !order.status.is_open() {
            return Err(CoreError::Conflict("订单已完结，不能修改".to_string()));
        }
        self.check_order_form(&form).await?;

        let items = order_items(form.items);
        let total = order_total(&items);
        if total + EPSILON < order.paid() {
            return Err(CoreError::BadRequest("订单总额不能低于已付金额".to_string()));
        }

        order.customer_id = form.customer_id;
        order.order_date = form.order_date;
        order.due_date = form.due_date;
        order.items = items;
        order.total = total;
        order.notes = clean_opt(form.notes);
        order.updated_at = Utc::now();
        self.store.upsert(&order).await?;
        Ok(order_view(order))
    }

    pub async fn delete_order(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<Order>(id).await
    }

    pub async fn add_payment(&self, id: Uuid, form: PaymentForm) -> Result<OrderView, CoreError> {
        let _guard = self.writes.lock().await;
        let mut order: Order = self.store.fetch(id).await?;
        if order.status == OrderStatus::Cancelled {
            return Err(CoreError::Conflict("订单已取消，不能付款".to_string()));
        }
        let balance = order.total - order.paid();
        if form.amount > balance + EPSILON {
            return Err(CoreError::BadRequest(format!(
                "付款金额超过未付余额 {}",
                round2(balance.max(0.0))
            )));
        }

        order.payments.push(Payment {
            id: Uuid::new_v4(),
            amount: round2(form.amount),
            date: form.date,
            method: clean_opt(form.method),
        });
        order.updated_at = Utc::now();
        self.store.upsert(&order).await?;
        info!("订单收款: {} 金额 {}", order.id, form.amount);
        Ok(order_view(order))
    }

    /// 已取消或已交付的订单状态不再变化
    pub async fn change_order_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, CoreError> {
        let _guard = self.writes.lock().await;
        let mut order: Order = self.store.fetch(id).await?;
        if order.status != status {
            if !order.status.is_open() {
                return Err(CoreError::Conflict(format!(
                    "订单状态 {:?} 不能再变更",
                    order.status
                )));
            }
            order.status = status;
            order.updated_at = Utc::now();
            self.store.upsert(&order).await?;
            info!("订单状态变更: {} -> {:?}", order.id, status);
        }
        Ok(order_view(order))
    }

    async fn check_order_form(&self, form: &OrderForm) -> Result<(), CoreError> {
        for item in &form.items {
            item.validate()?;
        }
        if let Some(due) = form.due_date {
            if due < form.order_date {
                return Err(CoreError::BadRequest("交付日期不能早于下单日期".to_string()));
            }
        }
        self.store.ensure_exists::<Customer>(form.customer_id).await
    }

    // ---- 支出 ----

    pub async fn list_expenses(&self, query: &LedgerQuery) -> Result<Vec<Expense>, CoreError> {
        let range = ledger_range(query)?;
        let category = query
            .category
            .as_deref()
            .map(normalize_category)
            .filter(|c| !c.is_empty());
        let mut expenses: Vec<Expense> = self
            .store
            .list::<Expense>()
            .await?
            .into_iter()
            .filter(|e| range.contains(e.date))
            .filter(|e| category.as_ref().map_or(true, |c| &e.category == c))
            .collect();
        expenses.sort_by(|a, b| newest_first((a.date, a.created_at), (b.date, b.created_at)));
        Ok(expenses)
    }

    pub async fn get_expense(&self, id: Uuid) -> Result<Expense, CoreError> {
        self.store.fetch(id).await
    }

    pub async fn create_expense(&self, form: ExpenseForm) -> Result<Expense, CoreError> {
        let _guard = self.writes.lock().await;
        self.check_expense_scope(&form).await?;
        let expense = Expense {
            id: Uuid::new_v4(),
            date: form.date,
            category: normalize_category(&form.category),
            amount: round2(form.amount),
            vendor: clean_opt(form.vendor),
            scope: form.scope,
            production_id: form.production_id,
            notes: clean_opt(form.notes),
            created_at: Utc::now(),
        };
        self.store.upsert(&expense).await?;
        info!("记录支出: {} 金额 {}", expense.category, expense.amount);
        Ok(expense)
    }

    pub async fn update_expense(&self, id: Uuid, form: ExpenseForm) -> Result<Expense, CoreError> {
        let _guard = self.writes.lock().await;
        let mut expense: Expense = self.store.fetch(id).await?;
        self.check_expense_scope(&form).await?;
        expense.date = form.date;
        expense.category = normalize_category(&form.category);
        expense.amount = round2(form.amount);
        expense.vendor = clean_opt(form.vendor);
        expense.scope = form.scope;
        expense.production_id = form.production_id;
        expense.notes = clean_opt(form.notes);
        self.store.upsert(&expense).await?;
        Ok(expense)
    }

    pub async fn delete_expense(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete::<Expense>(id).await
    }

    /// 非通用支出必须关联同类产出，通用支出不关联产出
    async fn check_expense_scope(&self, form: &ExpenseForm) -> Result<(), CoreError> {
        let expected = match form.scope {
            ExpenseScope::General => {
                if form.production_id.is_some() {
                    return Err(CoreError::BadRequest("通用支出不能关联产出".to_string()));
                }
                return Ok(());
            }
            ExpenseScope::Livestock => ProductionKind::Livestock,
            ExpenseScope::Harvest => ProductionKind::Harvest,
        };
        let production_id = form
            .production_id
            .ok_or_else(|| CoreError::BadRequest("该类支出必须关联产出".to_string()))?;
        let production: Production = self.store.fetch(production_id).await?;
        if production.kind != expected {
            return Err(CoreError::BadRequest("支出类型与产出类型不一致".to_string()));
        }
        Ok(())
    }

    // ---- 汇总 ----

    pub async fn financial_summary(&self, range: DateRange) -> Result<FinancialSummary, CoreError> {
        range.validate()?;
        let sales = self.store.list::<Sale>().await?;
        let orders = self.store.list::<Order>().await?;
        let expenses = self.store.list::<Expense>().await?;
        let customers = self.store.list::<Customer>().await?;
        Ok(financial_summary(&sales, &orders, &expenses, &customers, range))
    }
}

fn ledger_range(query: &LedgerQuery) -> Result<DateRange, CoreError> {
    let range = DateRange {
        from: query.from,
        to: query.to,
    };
    range.validate()?;
    Ok(range)
}

fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

fn newest_first<A: Ord, B: Ord>(a: (A, B), b: (A, B)) -> Ordering {
    b.cmp(&a)
}

fn order_items(forms: Vec<OrderItemForm>) -> Vec<OrderItem> {
    forms
        .into_iter()
        .map(|f| OrderItem {
            description: f.description.trim().to_string(),
            quantity: f.quantity,
            unit_price: f.unit_price,
        })
        .collect()
}

fn order_total(items: &[OrderItem]) -> f64 {
    round2(items.iter().map(|i| i.quantity * i.unit_price).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn customer(service: &FinanceService, name: &str) -> Customer {
        service
            .create_customer(CustomerForm {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn order_form(customer_id: Uuid) -> OrderForm {
        OrderForm {
            customer_id,
            order_date: d(2025, 3, 1),
            due_date: Some(d(2025, 3, 15)),
            items: vec![
                OrderItemForm {
                    description: "Half hog".to_string(),
                    quantity: 1.0,
                    unit_price: 250.0,
                },
                OrderItemForm {
                    description: "Eggs (dozen)".to_string(),
                    quantity: 3.0,
                    unit_price: 6.5,
                },
            ],
            notes: None,
        }
    }

    fn production_form(kind: ProductionKind, quantity: f64) -> ProductionForm {
        ProductionForm {
            kind,
            name: "Spring potatoes".to_string(),
            category: None,
            quantity,
            unit: Some("kg".to_string()),
            date: d(2025, 6, 1),
            notes: None,
        }
    }

    #[tokio::test]
    async fn sale_amount_is_derived() {
        let service = FinanceService::new(Store::memory());
        let sale = service
            .create_sale(SaleForm {
                date: d(2025, 5, 2),
                customer_id: None,
                production_id: None,
                description: "Honey jars".to_string(),
                category: " Honey ".to_string(),
                quantity: 3.0,
                unit_price: 12.333,
                payment_method: None,
            })
            .await
            .unwrap();
        assert_eq!(sale.amount, 37.0);
        assert_eq!(sale.category, "honey");
    }

    #[tokio::test]
    async fn sale_with_unknown_customer_rejected() {
        let service = FinanceService::new(Store::memory());
        let result = service
            .create_sale(SaleForm {
                date: d(2025, 5, 2),
                customer_id: Some(Uuid::new_v4()),
                production_id: None,
                description: "Eggs".to_string(),
                category: "eggs".to_string(),
                quantity: 1.0,
                unit_price: 6.0,
                payment_method: None,
            })
            .await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn order_payments_and_overpayment() {
        let service = FinanceService::new(Store::memory());
        let alice = customer(&service, "Alice").await;
        let order = service.create_order(order_form(alice.id)).await.unwrap();
        assert_eq!(order.order.total, 269.5);
        assert_eq!(order.balance, 269.5);

        let paid = service
            .add_payment(
                order.order.id,
                PaymentForm {
                    amount: 100.0,
                    date: d(2025, 3, 2),
                    method: Some("cash".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.paid, 100.0);
        assert_eq!(paid.balance, 169.5);

        let over = service
            .add_payment(
                order.order.id,
                PaymentForm {
                    amount: 200.0,
                    date: d(2025, 3, 3),
                    method: None,
                },
            )
            .await;
        assert!(matches!(over, Err(CoreError::BadRequest(_))));

        let done = service
            .add_payment(
                order.order.id,
                PaymentForm {
                    amount: 169.5,
                    date: d(2025, 3, 3),
                    method: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(done.percent_paid, 100.0);
    }

    #[tokio::test]
    async fn order_status_is_final_once_closed() {
        let service = FinanceService::new(Store::memory());
        let alice = customer(&service, "Alice").await;
        let order = service.create_order(order_form(alice.id)).await.unwrap();

        service
            .change_order_status(order.order.id, OrderStatus::Fulfilled)
            .await
            .unwrap();
        let reopen = service.change_order_status(order.order.id, OrderStatus::Pending).await;
        assert!(matches!(reopen, Err(CoreError::Conflict(_))));

        let edit = service.update_order(order.order.id, order_form(alice.id)).await;
        assert!(matches!(edit, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn blank_order_item_rejected() {
        let service = FinanceService::new(Store::memory());
        let alice = customer(&service, "Alice").await;
        let mut form = order_form(alice.id);
        form.items[1].description = " ".to_string();
        assert!(matches!(service.create_order(form).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn referenced_customer_cannot_be_deleted() {
        let service = FinanceService::new(Store::memory());
        let alice = customer(&service, "Alice").await;
        let bob = customer(&service, "Bob").await;
        service.create_order(order_form(alice.id)).await.unwrap();

        let result = service.delete_customer(alice.id).await;
        assert!(matches!(result, Err(CoreError::Conflict(_))));
        service.delete_customer(bob.id).await.unwrap();

        let names: Vec<String> = service
            .list_customers()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alice"]);
    }

    #[tokio::test]
    async fn allocations_cannot_exceed_quantity() {
        let service = FinanceService::new(Store::memory());
        let production = service
            .create_production(production_form(ProductionKind::Harvest, 100.0))
            .await
            .unwrap();
        let today = d(2025, 6, 2);

        let first = service
            .allocate(
                production.id,
                AllocationForm {
                    sale: 60.0,
                    personal: 20.0,
                    ..Default::default()
                },
                today,
            )
            .await
            .unwrap();
        assert_eq!(first.date, today);

        let over = service
            .allocate(
                production.id,
                AllocationForm {
                    gift: 25.0,
                    ..Default::default()
                },
                today,
            )
            .await;
        assert!(matches!(over, Err(CoreError::BadRequest(_))));

        // 修改自身时不重复计算
        service
            .update_allocation(
                first.id,
                AllocationForm {
                    sale: 70.0,
                    personal: 30.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let shrink = service
            .update_production(production.id, production_form(ProductionKind::Harvest, 50.0))
            .await;
        assert!(matches!(shrink, Err(CoreError::BadRequest(_))));

        let summary = service.production_summary(production.id).await.unwrap();
        assert_eq!(summary.allocated, 100.0);
        assert_eq!(summary.unallocated, 0.0);
    }

    #[tokio::test]
    async fn expense_scope_requires_matching_production() {
        let service = FinanceService::new(Store::memory());
        let herd = service
            .create_production(production_form(ProductionKind::Livestock, 12.0))
            .await
            .unwrap();

        let base = ExpenseForm {
            date: d(2025, 6, 3),
            category: "Feed".to_string(),
            amount: 80.0,
            vendor: None,
            scope: ExpenseScope::Livestock,
            production_id: None,
            notes: None,
        };

        let missing = service.create_expense(base.clone()).await;
        assert!(matches!(missing, Err(CoreError::BadRequest(_))));

        let wrong_kind = service
            .create_expense(ExpenseForm {
                scope: ExpenseScope::Harvest,
                production_id: Some(herd.id),
                ..base.clone()
            })
            .await;
        assert!(matches!(wrong_kind, Err(CoreError::BadRequest(_))));

        let expense = service
            .create_expense(ExpenseForm {
                production_id: Some(herd.id),
                ..base
            })
            .await
            .unwrap();
        assert_eq!(expense.category, "feed");

        let blocked = service.delete_production(herd.id).await;
        assert!(matches!(blocked, Err(CoreError::Conflict(_))));

        // 有关联支出时类型不能变，数量可以改
        let retyped = service
            .update_production(herd.id, production_form(ProductionKind::Harvest, 12.0))
            .await;
        assert!(matches!(retyped, Err(CoreError::Conflict(_))));
        let resized = service
            .update_production(herd.id, production_form(ProductionKind::Livestock, 14.0))
            .await
            .unwrap();
        assert_eq!(resized.kind, ProductionKind::Livestock);
        assert_eq!(resized.quantity, 14.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_stay_within_quantity() {
        let service = FinanceService::new(Store::memory());
        let production = service
            .create_production(production_form(ProductionKind::Harvest, 10.0))
            .await
            .unwrap();

        let production_id = production.id;
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let service = service.clone();
            tasks.spawn(async move {
                service
                    .allocate(
                        production_id,
                        AllocationForm {
                            sale: 3.0,
                            ..Default::default()
                        },
                        d(2025, 6, 2),
                    )
                    .await
            });
        }

        let mut accepted = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 3);

        let summary = service.production_summary(production_id).await.unwrap();
        assert_eq!(summary.allocated, 9.0);
    }

    #[tokio::test]
    async fn ledger_filters_and_orders_newest_first() {
        let service = FinanceService::new(Store::memory());
        for (day, category) in [(3, "feed"), (10, "vet"), (20, "feed")] {
            service
                .create_expense(ExpenseForm {
                    date: d(2025, 4, day),
                    category: category.to_string(),
                    amount: 10.0,
                    vendor: None,
                    scope: ExpenseScope::General,
                    production_id: None,
                    notes: None,
                })
                .await
                .unwrap();
        }

        let feed = service
            .list_expenses(&LedgerQuery {
                category: Some("FEED".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].date, d(2025, 4, 20));

        let ranged = service
            .list_expenses(&LedgerQuery {
                from: Some(d(2025, 4, 5)),
                to: Some(d(2025, 4, 15)),
                category: None,
            })
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);

        let bad = service
            .list_expenses(&LedgerQuery {
                from: Some(d(2025, 4, 15)),
                to: Some(d(2025, 4, 5)),
                category: None,
            })
            .await;
        assert!(matches!(bad, Err(CoreError::BadRequest(_))));
    }
}
