//! 财务汇总
//!
//! 纯函数：输入为已读取的记录集合，输出汇总视图。

use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::model::*;
use crate::app::shared::DateRange;
use crate::core::view::{percent, round2};

const TOP_CUSTOMERS: usize = 5;

pub fn order_view(order: Order) -> OrderView {
    let paid = round2(order.paid());
    let balance = round2((order.total - paid).max(0.0));
    let percent_paid = if order.total <= 0.0 {
        100.0
    } else {
        percent(paid, order.total)
    };
    OrderView {
        order,
        paid,
        balance,
        percent_paid,
    }
}

fn month_key(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// 按分类汇总，金额降序，同额按名称
fn by_category<'a>(rows: impl Iterator<Item = (&'a str, f64)>) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for (category, amount) in rows {
        *totals.entry(category).or_default() += amount;
    }
    let mut list: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total: round2(total),
        })
        .collect();
    list.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    list
}

pub fn financial_summary(
    sales: &[Sale],
    orders: &[Order],
    expenses: &[Expense],
    customers: &[Customer],
    range: DateRange,
) -> FinancialSummary {
    let sales: Vec<&Sale> = sales.iter().filter(|s| range.contains(s.date)).collect();
    let expenses: Vec<&Expense> = expenses.iter().filter(|e| range.contains(e.date)).collect();
    let payments: Vec<(&Order, &Payment)> = orders
        .iter()
        .flat_map(|o| o.payments.iter().map(move |p| (o, p)))
        .filter(|(_, p)| range.contains(p.date))
        .collect();

    let sales_revenue: f64 = sales.iter().map(|s| s.amount).sum();
    let payments_received: f64 = payments.iter().map(|(_, p)| p.amount).sum();
    let expense_total: f64 = expenses.iter().map(|e| e.amount).sum();
    let revenue = sales_revenue + payments_received;

    let mut monthly: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for sale in &sales {
        monthly.entry(month_key(sale.date)).or_default().0 += sale.amount;
    }
    for (_, payment) in &payments {
        monthly.entry(month_key(payment.date)).or_default().0 += payment.amount;
    }
    for expense in &expenses {
        monthly.entry(month_key(expense.date)).or_default().1 += expense.amount;
    }

    let mut per_customer: HashMap<Uuid, f64> = HashMap::new();
    for sale in &sales {
        if let Some(customer_id) = sale.customer_id {
            *per_customer.entry(customer_id).or_default() += sale.amount;
        }
    }
    for (order, payment) in &payments {
        *per_customer.entry(order.customer_id).or_default() += payment.amount;
    }
    let names: HashMap<Uuid, &str> = customers.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut top_customers: Vec<CustomerTotal> = per_customer
        .into_iter()
        .map(|(customer_id, revenue)| CustomerTotal {
            customer_id,
            name: names.get(&customer_id).copied().unwrap_or("未知客户").to_string(),
            revenue: round2(revenue),
        })
        .collect();
    top_customers.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    top_customers.truncate(TOP_CUSTOMERS);

    let outstanding_balance = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .map(|o| (o.total - o.paid()).max(0.0))
        .sum::<f64>();

    FinancialSummary {
        from: range.from,
        to: range.to,
        sales_revenue: round2(sales_revenue),
        payments_received: round2(payments_received),
        revenue: round2(revenue),
        expenses: round2(expense_total),
        net: round2(revenue - expense_total),
        sales_by_category: by_category(sales.iter().map(|s| (s.category.as_str(), s.amount))),
        expenses_by_category: by_category(expenses.iter().map(|e| (e.category.as_str(), e.amount))),
        monthly: monthly
            .into_iter()
            .map(|(month, (revenue, expenses))| MonthlyTotal {
                month,
                revenue: round2(revenue),
                expenses: round2(expenses),
                net: round2(revenue - expenses),
            })
            .collect(),
        outstanding_balance: round2(outstanding_balance),
        top_customers,
    }
}

pub fn production_summary(
    production: Production,
    allocations: &[Allocation],
    sales: &[Sale],
    expenses: &[Expense],
) -> ProductionSummary {
    let mine: Vec<&Allocation> = allocations
        .iter()
        .filter(|a| a.production_id == production.id)
        .collect();

    let bucket_totals = [
        ("sale", mine.iter().map(|a| a.sale).sum::<f64>()),
        ("personal", mine.iter().map(|a| a.personal).sum::<f64>()),
        ("gift", mine.iter().map(|a| a.gift).sum::<f64>()),
        ("loss", mine.iter().map(|a| a.loss).sum::<f64>()),
    ];
    let allocated: f64 = bucket_totals.iter().map(|(_, q)| q).sum();
    let buckets = bucket_totals
        .iter()
        .map(|(bucket, quantity)| AllocationBucket {
            bucket: bucket.to_string(),
            quantity: *quantity,
            percent: percent(*quantity, production.quantity),
        })
        .collect();

    let sales_revenue: f64 = sales
        .iter()
        .filter(|s| s.production_id == Some(production.id))
        .map(|s| s.amount)
        .sum();
    let expense_total: f64 = expenses
        .iter()
        .filter(|e| e.production_id == Some(production.id))
        .map(|e| e.amount)
        .sum();

    ProductionSummary {
        allocated,
        unallocated: (production.quantity - allocated).max(0.0),
        buckets,
        sales_revenue: round2(sales_revenue),
        expenses: round2(expense_total),
        net: round2(sales_revenue - expense_total),
        production,
    }
}
