use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use journal_engine::{
    assemble_summary, extract_cash_balance, group_journal_entries, parse_date, LedgerFilter,
};
use models::{CashBalanceView, CurrencyInfo, JournalEntryView, SummaryView};

use crate::{error::ApiError, repository::LedgerRepository, Result};

pub type RepositoryState = Arc<dyn LedgerRepository>;

/// Journal entries returned by get_recent_transactions when no limit is given.
const RECENT_ENTRY_LIMIT: usize = 10;
/// Ceiling for the entry limit a client may request.
const MAX_ENTRY_LIMIT: usize = 100;
/// Ledger rows fetched per request before grouping.
const LINE_FETCH_CAP: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub action: String,
    pub company_id: Option<String>,
    pub store_id: Option<String>,
    pub request_date: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SummaryData {
    pub income: SummaryView,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub data: SummaryData,
    pub currency_symbol: String,
    pub currency_code: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub success: bool,
    pub data: Vec<JournalEntryView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CashBalanceResponse {
    pub success: bool,
    pub data: CashBalanceView,
}

/// GET /api/dashboard?action=...
/// Single dispatch endpoint mirroring the dashboard page contract.
pub async fn dispatch(
    State(repo): State<RepositoryState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    match query.action.as_str() {
        "get_summary" => Ok(get_summary(&repo, query).await?.into_response()),
        "get_recent_transactions" => {
            Ok(get_recent_transactions(&repo, query).await?.into_response())
        }
        "get_cash_balance" => Ok(get_cash_balance(&repo, query).await?.into_response()),
        _ => Err(ApiError::InvalidAction),
    }
}

/// action=get_summary
/// Income statement figures for the requested window, with the company's
/// display currency.
async fn get_summary(
    repo: &RepositoryState,
    query: DashboardQuery,
) -> Result<Json<SummaryResponse>> {
    let today = Utc::now().date_naive();
    let date_from = parse_query_date(query.date_from.as_deref())?;
    // request_date acts as an explicit upper bound when date_to is absent
    let date_to = match parse_query_date(query.date_to.as_deref())? {
        Some(to) => Some(to),
        None => parse_query_date(query.request_date.as_deref())?,
    };

    let filter = LedgerFilter::resolve(
        query.company_id.clone(),
        query.store_id.clone(),
        date_from,
        date_to,
        today,
    );

    let income = match repo.fetch_income_summary(&filter).await {
        Ok(result) => assemble_summary(&result),
        Err(err) => {
            tracing::warn!(error = %err, "Income summary fetch failed, defaulting to zeros");
            SummaryView::default()
        }
    };

    let currency = currency_or_default(repo, query.company_id.as_deref()).await;

    Ok(Json(SummaryResponse {
        success: true,
        data: SummaryData {
            income: income.rounded(),
        },
        currency_symbol: currency.symbol,
        currency_code: currency.code,
    }))
}

/// action=get_recent_transactions
/// Ledger rows for the window, grouped into journal entries. Store filtering
/// is entry-level: an entry touching the store is emitted with all its lines.
async fn get_recent_transactions(
    repo: &RepositoryState,
    query: DashboardQuery,
) -> Result<Json<TransactionsResponse>> {
    let today = Utc::now().date_naive();
    let date_from = parse_query_date(query.date_from.as_deref())?;
    let date_to = parse_query_date(query.date_to.as_deref())?;
    let limit = query
        .limit
        .unwrap_or(RECENT_ENTRY_LIMIT)
        .clamp(1, MAX_ENTRY_LIMIT);

    let filter = LedgerFilter::resolve(
        query.company_id.clone(),
        query.store_id.clone(),
        date_from,
        date_to,
        today,
    );

    let lines = match repo.fetch_ledger_lines(&filter, LINE_FETCH_CAP).await {
        Ok(lines) => lines,
        Err(err) => {
            tracing::warn!(error = %err, "Ledger row fetch failed, returning empty transactions");
            return Ok(Json(TransactionsResponse {
                success: true,
                data: Vec::new(),
                currency_symbol: None,
                currency_code: None,
                error: Some(err.to_string()),
            }));
        }
    };

    let entries: Vec<JournalEntryView> =
        group_journal_entries(lines, query.store_id.as_deref(), limit)
            .into_iter()
            .map(|entry| entry.rounded())
            .collect();

    let currency = currency_or_default(repo, query.company_id.as_deref()).await;

    Ok(Json(TransactionsResponse {
        success: true,
        data: entries,
        currency_symbol: Some(currency.symbol),
        currency_code: Some(currency.code),
        error: None,
    }))
}

/// action=get_cash_balance
/// Cash on hand across locations as of the request date.
async fn get_cash_balance(
    repo: &RepositoryState,
    query: DashboardQuery,
) -> Result<Json<CashBalanceResponse>> {
    let today = Utc::now().date_naive();
    let as_of = parse_query_date(query.request_date.as_deref())?.unwrap_or(today);

    let balance = match repo.fetch_cash_balance(query.company_id.as_deref(), as_of).await {
        Ok(result) => extract_cash_balance(&result),
        Err(err) => {
            tracing::warn!(error = %err, "Cash balance fetch failed, defaulting to zeros");
            CashBalanceView::default()
        }
    };

    Ok(Json(CashBalanceResponse {
        success: true,
        data: balance.rounded(),
    }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ledger-dashboard-api"
    }))
}

fn parse_query_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(raw) => parse_date(raw)
            .map(Some)
            .map_err(|_| ApiError::InvalidDateFormat(raw.to_string())),
    }
}

async fn currency_or_default(repo: &RepositoryState, company_id: Option<&str>) -> CurrencyInfo {
    match repo.fetch_currency(company_id).await {
        Ok(currency) => currency,
        Err(err) => {
            tracing::warn!(error = %err, "Currency lookup failed, using default");
            CurrencyInfo::default()
        }
    }
}
