//! Point-of-sale recording: the sale draft, folio sequencing, and the sales
//! history with its date/text filter.
//!
//! The draft is the single in-progress sale of the console. Submitting it
//! writes an immutable [`SaleRecord`], advances the folio counter to
//! `folio + 1` and clears the cart, payments and customer for the next
//! ticket. Seller and date carry over.

use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::cart::{Cart, PaymentMethod, PaymentSplit, ServiceLineItem};
use crate::customers::{self, Customer, CustomerForm};
use crate::db::{self, DbState};
use crate::error::{require, AppError, AppResult};
use crate::{sellers, services};

const FOLIO_CATEGORY: &str = "sales";
const FOLIO_KEY: &str = "next_folio";

/// Immutable snapshot of a recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: String,
    pub folio: i64,
    pub date: NaiveDate,
    pub seller: String,
    pub seller_short: String,
    pub customer: Option<String>,
    pub gross_amount: f64,
    pub terminal_amount: f64,
    pub payments: PaymentSplit,
    pub payment_method: String,
    pub items: Vec<ServiceLineItem>,
}

impl SaleRecord {
    /// Inclusive date range plus free-text match on customer, seller or folio.
    pub fn matches(&self, filter: &HistoryFilter) -> bool {
        if filter.start.is_some_and(|start| self.date < start) {
            return false;
        }
        if filter.end.is_some_and(|end| self.date > end) {
            return false;
        }
        let query = filter.query.trim();
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        self.customer
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(&needle))
            || self.seller.to_lowercase().contains(&needle)
            || self.folio.to_string().contains(query)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilter {
    #[serde(default, alias = "startDate", alias = "start_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, alias = "endDate", alias = "end_date")]
    pub end: Option<NaiveDate>,
    #[serde(default, alias = "q", alias = "search")]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub sales: Vec<SaleRecord>,
    pub count: usize,
    pub total_amount: f64,
}

impl HistoryReport {
    fn from_sales(sales: Vec<SaleRecord>) -> Self {
        let total_amount = sales.iter().map(|s| s.gross_amount).sum();
        Self {
            count: sales.len(),
            total_amount,
            sales,
        }
    }
}

/// The sale being captured.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub folio: i64,
    pub date: NaiveDate,
    pub seller_id: Option<String>,
    pub customer: Option<Customer>,
    pub cart: Cart,
    pub payments: PaymentSplit,
    pub terminal_amount: f64,
}

impl SaleDraft {
    fn clear_ticket(&mut self, next_folio: i64) {
        self.folio = next_folio;
        self.cart.clear();
        self.payments = PaymentSplit::default();
        self.terminal_amount = 0.0;
        self.customer = None;
    }
}

/// Read-only view of the draft for the sales screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub folio: i64,
    pub date: NaiveDate,
    pub seller_id: Option<String>,
    pub customer: Option<Customer>,
    pub items: Vec<ServiceLineItem>,
    pub items_subtotal: f64,
    pub payments: PaymentSplit,
    pub gross_amount: f64,
    pub payment_method: String,
    pub terminal_amount: f64,
}

impl From<&SaleDraft> for DraftView {
    fn from(draft: &SaleDraft) -> Self {
        Self {
            folio: draft.folio,
            date: draft.date,
            seller_id: draft.seller_id.clone(),
            customer: draft.customer.clone(),
            items: draft.cart.items().to_vec(),
            items_subtotal: draft.cart.subtotal(),
            payments: draft.payments,
            gross_amount: draft.payments.total(),
            payment_method: draft.payments.method_label().to_string(),
            terminal_amount: draft.terminal_amount,
        }
    }
}

/// Holds the draft; it is created lazily from the store on first use.
#[derive(Default)]
pub struct SalesState {
    draft: Mutex<Option<SaleDraft>>,
}

impl SalesState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Mini form used to register a customer without leaving the sale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCustomerForm {
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "telefono")]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

// ---------------------------------------------------------------------------
// Folio counter
// ---------------------------------------------------------------------------

pub fn next_folio(db: &DbState) -> AppResult<i64> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    Ok(db::get_setting(&conn, FOLIO_CATEGORY, FOLIO_KEY)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(1))
}

fn store_next_folio(db: &DbState, folio: i64) -> AppResult<()> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    db::set_setting(&conn, FOLIO_CATEGORY, FOLIO_KEY, &folio.to_string())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

fn lock_draft<'a>(
    db: &DbState,
    sales: &'a SalesState,
) -> AppResult<MutexGuard<'a, Option<SaleDraft>>> {
    let mut guard = sales
        .draft
        .lock()
        .map_err(|e| AppError::Storage(e.to_string()))?;
    if guard.is_none() {
        let default_seller = sellers::list_sellers(db, true)?.into_iter().next();
        *guard = Some(SaleDraft {
            folio: next_folio(db)?,
            date: today(),
            seller_id: default_seller.map(|s| s.id),
            customer: None,
            cart: Cart::default(),
            payments: PaymentSplit::default(),
            terminal_amount: 0.0,
        });
    }
    Ok(guard)
}

/// Run `f` against the draft and return the updated view.
fn with_draft<F>(db: &DbState, sales: &SalesState, f: F) -> AppResult<DraftView>
where
    F: FnOnce(&mut SaleDraft) -> AppResult<()>,
{
    let mut guard = lock_draft(db, sales)?;
    let draft = guard
        .as_mut()
        .ok_or_else(|| AppError::Storage("sale draft unavailable".into()))?;
    f(draft)?;
    Ok(DraftView::from(&*draft))
}

pub fn draft_view(db: &DbState, sales: &SalesState) -> AppResult<DraftView> {
    with_draft(db, sales, |_| Ok(()))
}

pub fn select_seller(db: &DbState, sales: &SalesState, seller_id: &str) -> AppResult<DraftView> {
    let seller = sellers::get_seller(db, seller_id.trim())?;
    if !seller.active {
        return Err(AppError::Invalid(format!(
            "El vendedor {} está inactivo.",
            seller.name
        )));
    }
    with_draft(db, sales, |draft| {
        draft.seller_id = Some(seller.id);
        Ok(())
    })
}

pub fn select_customer(
    db: &DbState,
    sales: &SalesState,
    customer_id: Option<&str>,
) -> AppResult<DraftView> {
    let customer = match customer_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => Some(customers::get_customer(db, id)?),
        None => None,
    };
    with_draft(db, sales, |draft| {
        draft.customer = customer;
        Ok(())
    })
}

pub fn set_date(db: &DbState, sales: &SalesState, date: NaiveDate) -> AppResult<DraftView> {
    with_draft(db, sales, |draft| {
        draft.date = date;
        Ok(())
    })
}

/// Override the folio offered for the next ticket.
pub fn set_folio(db: &DbState, sales: &SalesState, folio: i64) -> AppResult<DraftView> {
    if folio <= 0 {
        return Err(AppError::Invalid("El folio debe ser mayor a cero.".into()));
    }
    if folio.checked_add(1).is_none() {
        return Err(AppError::Invalid("El folio es demasiado grande.".into()));
    }
    store_next_folio(db, folio)?;
    with_draft(db, sales, |draft| {
        draft.folio = folio;
        Ok(())
    })
}

pub fn set_payment(
    db: &DbState,
    sales: &SalesState,
    method: PaymentMethod,
    amount: f64,
) -> AppResult<DraftView> {
    with_draft(db, sales, |draft| {
        draft.payments.set(method, amount);
        Ok(())
    })
}

pub fn set_terminal_amount(db: &DbState, sales: &SalesState, amount: f64) -> AppResult<DraftView> {
    with_draft(db, sales, |draft| {
        draft.terminal_amount = if amount.is_finite() { amount } else { 0.0 };
        Ok(())
    })
}

pub fn add_service_to_cart(
    db: &DbState,
    sales: &SalesState,
    service_id: &str,
) -> AppResult<DraftView> {
    let service = services::get_service(db, service_id.trim())?;
    if !service.active {
        return Err(AppError::Invalid(format!(
            "El servicio {} no está vigente.",
            service.name
        )));
    }
    with_draft(db, sales, |draft| {
        draft.cart.add_service(&service);
        Ok(())
    })
}

pub fn set_item_quantity(
    db: &DbState,
    sales: &SalesState,
    service_id: &str,
    quantity: i64,
) -> AppResult<DraftView> {
    with_draft(db, sales, |draft| {
        draft.cart.set_quantity(service_id.trim(), quantity)
    })
}

/// Create a customer from the mini form and select it on the draft.
pub fn quick_create_customer(
    db: &DbState,
    sales: &SalesState,
    form: &QuickCustomerForm,
) -> AppResult<Customer> {
    require(&form.name, "nombre")?;
    require(&form.phone, "teléfono")?;
    let customer = customers::add_customer(
        db,
        &CustomerForm {
            name: form.name.clone(),
            phone: form.phone.clone(),
            email: form.email.clone(),
            active: Some(true),
            ..CustomerForm::default()
        },
    )?;
    let selected = customer.clone();
    with_draft(db, sales, |draft| {
        draft.customer = Some(selected);
        Ok(())
    })?;
    Ok(customer)
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Record the draft as a sale.
///
/// Rejected without any state change when the payments add up to zero or no
/// seller is selected.
pub fn submit_sale(db: &DbState, sales: &SalesState) -> AppResult<SaleRecord> {
    let mut guard = lock_draft(db, sales)?;
    let draft = guard
        .as_mut()
        .ok_or_else(|| AppError::Storage("sale draft unavailable".into()))?;

    let gross_amount = draft.payments.total();
    let seller = match draft.seller_id.as_deref() {
        Some(id) if gross_amount > 0.0 => sellers::get_seller(db, id).ok(),
        _ => None,
    };
    let Some(seller) = seller.filter(|s| s.active) else {
        warn!(
            gross_amount,
            seller_id = ?draft.seller_id,
            "sale rejected: invalid amount or seller"
        );
        return Err(AppError::SaleRejected);
    };

    let next = draft
        .folio
        .checked_add(1)
        .ok_or_else(|| AppError::Invalid("El folio es demasiado grande.".into()))?;

    let seller_short = if seller.short_name.trim().is_empty() {
        seller.name.split(' ').next().unwrap_or_default().to_string()
    } else {
        seller.short_name.clone()
    };

    let record = SaleRecord {
        id: uuid::Uuid::new_v4().to_string(),
        folio: draft.folio,
        date: draft.date,
        seller: seller.name,
        seller_short,
        customer: draft.customer.as_ref().map(|c| c.name.clone()),
        gross_amount,
        terminal_amount: draft.terminal_amount,
        payments: draft.payments,
        payment_method: draft.payments.method_label().to_string(),
        items: draft.cart.items().to_vec(),
    };

    {
        let mut conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
        let tx = conn.transaction()?;
        insert_sale(&tx, &record)?;
        db::set_setting(&tx, FOLIO_CATEGORY, FOLIO_KEY, &next.to_string())?;
        tx.commit()?;
    }
    draft.clear_ticket(next);

    info!(
        sale_id = %record.id,
        folio = record.folio,
        gross_amount = record.gross_amount,
        method = %record.payment_method,
        "Sale recorded"
    );
    Ok(record)
}

fn insert_sale(conn: &Connection, record: &SaleRecord) -> AppResult<()> {
    let items = serde_json::to_string(&record.items)?;
    conn.execute(
        "INSERT INTO sales (id, folio, sale_date, seller_name, seller_short, customer_name,
            gross_amount, terminal_amount, cash, transfer, card, payment_method, items)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.id,
            record.folio,
            record.date.format("%Y-%m-%d").to_string(),
            record.seller,
            record.seller_short,
            record.customer,
            record.gross_amount,
            record.terminal_amount,
            record.payments.cash,
            record.payments.transfer,
            record.payments.card,
            record.payment_method,
            items,
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// All recorded sales, most recent first.
pub fn list_history(db: &DbState) -> AppResult<Vec<SaleRecord>> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    let mut stmt = conn.prepare(
        "SELECT id, folio, sale_date, seller_name, seller_short, customer_name, gross_amount,
                terminal_amount, cash, transfer, card, payment_method, items
         FROM sales ORDER BY seq DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, f64>(6)?,
            row.get::<_, f64>(7)?,
            PaymentSplit {
                cash: row.get(8)?,
                transfer: row.get(9)?,
                card: row.get(10)?,
            },
            row.get::<_, String>(11)?,
            row.get::<_, String>(12)?,
        ))
    })?;

    let mut history = Vec::new();
    for row in rows {
        let (id, folio, date, seller, seller_short, customer, gross, terminal, payments, method, items) =
            row?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| AppError::Storage(format!("sale {id} date: {e}")))?;
        history.push(SaleRecord {
            id,
            folio,
            date,
            seller,
            seller_short,
            customer,
            gross_amount: gross,
            terminal_amount: terminal,
            payments,
            payment_method: method,
            items: serde_json::from_str(&items)?,
        });
    }
    Ok(history)
}

/// Filter the history and total the matching gross amounts.
pub fn filter_history(db: &DbState, filter: &HistoryFilter) -> AppResult<HistoryReport> {
    let matching = list_history(db)?
        .into_iter()
        .filter(|sale| sale.matches(filter))
        .collect();
    Ok(HistoryReport::from_sales(matching))
}

/// Count and total of the sales dated `date`.
pub fn day_summary(db: &DbState, date: NaiveDate) -> AppResult<HistoryReport> {
    let mut report = filter_history(
        db,
        &HistoryFilter {
            start: Some(date),
            end: Some(date),
            query: String::new(),
        },
    )?;
    report.sales.clear();
    Ok(report)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn pay_and_submit(state: &crate::AppState, cash: f64, card: f64) -> SaleRecord {
        set_payment(&state.db, &state.sales, PaymentMethod::Cash, cash).unwrap();
        set_payment(&state.db, &state.sales, PaymentMethod::Card, card).unwrap();
        submit_sale(&state.db, &state.sales).unwrap()
    }

    #[test]
    fn test_draft_defaults() {
        let state = test_state();
        let view = draft_view(&state.db, &state.sales).unwrap();
        assert_eq!(view.folio, 1);
        assert_eq!(view.seller_id.as_deref(), Some("1"));
        assert_eq!(view.date, today());
        assert_eq!(view.payment_method, "OTRO");
        assert!(view.items.is_empty());
    }

    #[test]
    fn test_zero_payment_is_rejected_without_changes() {
        let state = test_state();
        add_service_to_cart(&state.db, &state.sales, "1").unwrap();
        let err = submit_sale(&state.db, &state.sales).unwrap_err();
        assert!(matches!(err, AppError::SaleRejected));
        assert_eq!(
            err.to_string(),
            "Error: Monto inválido o vendedor no seleccionado."
        );
        assert!(list_history(&state.db).unwrap().is_empty());
        assert_eq!(next_folio(&state.db).unwrap(), 1);
        assert_eq!(draft_view(&state.db, &state.sales).unwrap().items.len(), 1);
    }

    #[test]
    fn test_missing_seller_is_rejected() {
        let state = test_state();
        {
            let mut guard = lock_draft(&state.db, &state.sales).unwrap();
            guard.as_mut().unwrap().seller_id = None;
        }
        set_payment(&state.db, &state.sales, PaymentMethod::Cash, 100.0).unwrap();
        assert!(matches!(
            submit_sale(&state.db, &state.sales),
            Err(AppError::SaleRejected)
        ));
        assert!(list_history(&state.db).unwrap().is_empty());
    }

    #[test]
    fn test_folio_at_limit_is_refused_without_changes() {
        let state = test_state();
        assert!(matches!(
            set_folio(&state.db, &state.sales, i64::MAX),
            Err(AppError::Invalid(_))
        ));
        assert_eq!(next_folio(&state.db).unwrap(), 1);

        {
            let mut guard = lock_draft(&state.db, &state.sales).unwrap();
            guard.as_mut().unwrap().folio = i64::MAX;
        }
        set_payment(&state.db, &state.sales, PaymentMethod::Cash, 100.0).unwrap();
        assert!(matches!(
            submit_sale(&state.db, &state.sales),
            Err(AppError::Invalid(_))
        ));
        assert!(list_history(&state.db).unwrap().is_empty());
        assert_eq!(next_folio(&state.db).unwrap(), 1);
        let view = draft_view(&state.db, &state.sales).unwrap();
        assert_eq!(view.gross_amount, 100.0);

        set_folio(&state.db, &state.sales, i64::MAX - 1).unwrap();
        let sale = submit_sale(&state.db, &state.sales).unwrap();
        assert_eq!(sale.folio, i64::MAX - 1);
        assert_eq!(next_folio(&state.db).unwrap(), i64::MAX);
    }

    #[test]
    fn test_failed_counter_write_rolls_back_sale() {
        let state = test_state();
        {
            let conn = state.db.conn.lock().unwrap();
            conn.execute_batch("DROP TABLE local_settings").unwrap();
        }
        add_service_to_cart(&state.db, &state.sales, "1").unwrap();
        set_payment(&state.db, &state.sales, PaymentMethod::Cash, 850.0).unwrap();
        assert!(matches!(
            submit_sale(&state.db, &state.sales),
            Err(AppError::Storage(_))
        ));
        assert!(list_history(&state.db).unwrap().is_empty());
        let view = draft_view(&state.db, &state.sales).unwrap();
        assert_eq!(view.folio, 1);
        assert_eq!(view.items.len(), 1);
    }

    #[test]
    fn test_cash_only_sale() {
        let state = test_state();
        add_service_to_cart(&state.db, &state.sales, "2").unwrap();
        let sale = pay_and_submit(&state, 100.0, 0.0);
        assert_eq!(sale.gross_amount, 100.0);
        assert_eq!(sale.payment_method, "EFECTIVO");
        assert_eq!(sale.seller, "Admin Principal");
        assert_eq!(sale.seller_short, "Admin");
        assert_eq!(sale.items.len(), 1);
        assert!(sale.customer.is_none());
    }

    #[test]
    fn test_mixed_sale_keeps_terminal_separate() {
        let state = test_state();
        set_terminal_amount(&state.db, &state.sales, 52.5).unwrap();
        let sale = pay_and_submit(&state, 50.0, 50.0);
        assert_eq!(sale.gross_amount, 100.0);
        assert_eq!(sale.payment_method, "MIXTO");
        assert_eq!(sale.terminal_amount, 52.5);
    }

    #[test]
    fn test_submission_advances_folio_and_clears_ticket() {
        let state = test_state();
        select_seller(&state.db, &state.sales, "2").unwrap();
        select_customer(&state.db, &state.sales, Some("1")).unwrap();
        add_service_to_cart(&state.db, &state.sales, "1").unwrap();
        set_folio(&state.db, &state.sales, 41).unwrap();
        let sale = pay_and_submit(&state, 850.0, 0.0);
        assert_eq!(sale.folio, 41);
        assert_eq!(sale.customer.as_deref(), Some("Tecnologías Globales S.A."));

        assert_eq!(next_folio(&state.db).unwrap(), 42);
        let view = draft_view(&state.db, &state.sales).unwrap();
        assert_eq!(view.folio, 42);
        assert!(view.items.is_empty());
        assert!(view.customer.is_none());
        assert_eq!(view.gross_amount, 0.0);
        assert_eq!(view.terminal_amount, 0.0);
        assert_eq!(view.seller_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let state = test_state();
        let first = pay_and_submit(&state, 10.0, 0.0);
        let second = pay_and_submit(&state, 20.0, 0.0);
        let history = list_history(&state.db).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], second);
        assert_eq!(history[1], first);
        assert_eq!(second.folio, first.folio + 1);
    }

    #[test]
    fn test_history_filter_by_day_and_query() {
        let state = test_state();
        set_date(&state.db, &state.sales, date("2026-10-18")).unwrap();
        pay_and_submit(&state, 300.0, 0.0);
        set_date(&state.db, &state.sales, date("2026-10-19")).unwrap();
        pay_and_submit(&state, 100.0, 0.0);
        select_seller(&state.db, &state.sales, "2").unwrap();
        pay_and_submit(&state, 0.0, 250.5);

        let day = HistoryFilter {
            start: Some(date("2026-10-19")),
            end: Some(date("2026-10-19")),
            query: String::new(),
        };
        let report = filter_history(&state.db, &day).unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(report.total_amount, 350.5);
        assert!(report.sales.iter().all(|s| s.date == date("2026-10-19")));

        let betty = HistoryFilter {
            query: "beatriz".into(),
            ..day.clone()
        };
        assert_eq!(filter_history(&state.db, &betty).unwrap().count, 1);

        let by_folio = HistoryFilter {
            query: "1".into(),
            ..HistoryFilter::default()
        };
        assert_eq!(filter_history(&state.db, &by_folio).unwrap().count, 1);

        let summary = day_summary(&state.db, date("2026-10-18")).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.total_amount, 300.0);
        assert!(summary.sales.is_empty());
    }

    #[test]
    fn test_quick_customer_is_created_and_selected() {
        let state = test_state();
        let missing_phone = QuickCustomerForm {
            name: "Rosa".into(),
            ..QuickCustomerForm::default()
        };
        assert!(quick_create_customer(&state.db, &state.sales, &missing_phone).is_err());
        assert_eq!(customers::list_customers(&state.db).unwrap().len(), 1);

        let form = QuickCustomerForm {
            name: "Rosa Medina".into(),
            phone: "5587654321".into(),
            email: String::new(),
        };
        let customer = quick_create_customer(&state.db, &state.sales, &form).unwrap();
        assert!(customer.active);
        assert!(customer.address.is_empty());
        assert_eq!(customers::list_customers(&state.db).unwrap().len(), 2);
        let view = draft_view(&state.db, &state.sales).unwrap();
        assert_eq!(view.customer.unwrap().id, customer.id);
    }

    #[test]
    fn test_inactive_service_and_seller_are_refused() {
        let state = test_state();
        services::toggle_service(&state.db, "1").unwrap();
        assert!(add_service_to_cart(&state.db, &state.sales, "1").is_err());
        sellers::toggle_seller(&state.db, "2").unwrap();
        assert!(select_seller(&state.db, &state.sales, "2").is_err());
        assert!(set_folio(&state.db, &state.sales, 0).is_err());
    }
}
