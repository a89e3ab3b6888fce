//! 财务处理器

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

use super::model::*;
use crate::app::{
    shared::{today, DateRange},
    AppState,
};
use crate::core::extract::{ApiPath, ApiQuery, JsonBody, ValidJson};
use crate::core::response::{created, ok, ApiResult, Created};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/finance/customers", get(list_customers).post(create_customer))
        .route(
            "/finance/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/finance/productions", get(list_productions).post(create_production))
        .route(
            "/finance/productions/:id",
            get(get_production).put(update_production).delete(delete_production),
        )
        .route(
            "/finance/productions/:id/allocations",
            get(list_allocations).post(allocate),
        )
        .route("/finance/productions/:id/summary", get(production_summary))
        .route(
            "/finance/allocations/:id",
            put(update_allocation).delete(delete_allocation),
        )
        .route("/finance/sales", get(list_sales).post(create_sale))
        .route(
            "/finance/sales/:id",
            get(get_sale).put(update_sale).delete(delete_sale),
        )
        .route("/finance/orders", get(list_orders).post(create_order))
        .route(
            "/finance/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/finance/orders/:id/payments", post(add_payment))
        .route("/finance/orders/:id/status", post(change_order_status))
        .route("/finance/expenses", get(list_expenses).post(create_expense))
        .route(
            "/finance/expenses/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        .route("/finance/summary", get(financial_summary))
}

// ---- 客户 ----

async fn list_customers(State(state): State<AppState>) -> ApiResult<Vec<Customer>> {
    ok(state.finance.list_customers().await?)
}

async fn get_customer(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Customer> {
    ok(state.finance.get_customer(id).await?)
}

async fn create_customer(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<CustomerForm>,
) -> Created<Customer> {
    created(state.finance.create_customer(form).await?)
}

async fn update_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<CustomerForm>,
) -> ApiResult<Customer> {
    ok(state.finance.update_customer(id, form).await?)
}

async fn delete_customer(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.finance.delete_customer(id).await?)
}

// ---- 产出 ----

async fn list_productions(State(state): State<AppState>) -> ApiResult<Vec<Production>> {
    ok(state.finance.list_productions().await?)
}

async fn get_production(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Production> {
    ok(state.finance.get_production(id).await?)
}

async fn create_production(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<ProductionForm>,
) -> Created<Production> {
    created(state.finance.create_production(form).await?)
}

async fn update_production(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<ProductionForm>,
) -> ApiResult<Production> {
    ok(state.finance.update_production(id, form).await?)
}

async fn delete_production(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.finance.delete_production(id).await?)
}

async fn list_allocations(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Vec<Allocation>> {
    ok(state.finance.list_allocations(id).await?)
}

async fn allocate(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<AllocationForm>,
) -> Created<Allocation> {
    created(state.finance.allocate(id, form, today()).await?)
}

async fn update_allocation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<AllocationForm>,
) -> ApiResult<Allocation> {
    ok(state.finance.update_allocation(id, form).await?)
}

async fn delete_allocation(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.finance.delete_allocation(id).await?)
}

async fn production_summary(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ProductionSummary> {
    ok(state.finance.production_summary(id).await?)
}

// ---- 销售 ----

async fn list_sales(State(state): State<AppState>, ApiQuery(query): ApiQuery<LedgerQuery>) -> ApiResult<Vec<Sale>> {
    ok(state.finance.list_sales(&query).await?)
}

async fn get_sale(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Sale> {
    ok(state.finance.get_sale(id).await?)
}

async fn create_sale(State(state): State<AppState>, ValidJson(form): ValidJson<SaleForm>) -> Created<Sale> {
    created(state.finance.create_sale(form).await?)
}

async fn update_sale(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<SaleForm>,
) -> ApiResult<Sale> {
    ok(state.finance.update_sale(id, form).await?)
}

async fn delete_sale(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.finance.delete_sale(id).await?)
}

// ---- 订单 ----

async fn list_orders(State(state): State<AppState>, ApiQuery(query): ApiQuery<OrderQuery>) -> ApiResult<Vec<OrderView>> {
    ok(state.finance.list_orders(&query).await?)
}

async fn get_order(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<OrderView> {
    ok(state.finance.get_order(id).await?)
}

async fn create_order(State(state): State<AppState>, ValidJson(form): ValidJson<OrderForm>) -> Created<OrderView> {
    created(state.finance.create_order(form).await?)
}

async fn update_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<OrderForm>,
) -> ApiResult<OrderView> {
    ok(state.finance.update_order(id, form).await?)
}

async fn delete_order(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.finance.delete_order(id).await?)
}

async fn add_payment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<PaymentForm>,
) -> Created<OrderView> {
    created(state.finance.add_payment(id, form).await?)
}

async fn change_order_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(change): JsonBody<OrderStatusChange>,
) -> ApiResult<OrderView> {
    ok(state.finance.change_order_status(id, change.status).await?)
}

// ---- 支出 ----

async fn list_expenses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LedgerQuery>,
) -> ApiResult<Vec<Expense>> {
    ok(state.finance.list_expenses(&query).await?)
}

async fn get_expense(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Expense> {
    ok(state.finance.get_expense(id).await?)
}

async fn create_expense(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<ExpenseForm>,
) -> Created<Expense> {
    created(state.finance.create_expense(form).await?)
}

async fn update_expense(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<ExpenseForm>,
) -> ApiResult<Expense> {
    ok(state.finance.update_expense(id, form).await?)
}

async fn delete_expense(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.finance.delete_expense(id).await?)
}

async fn financial_summary(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> ApiResult<FinancialSummary> {
    ok(state.finance.financial_summary(range).await?)
}
