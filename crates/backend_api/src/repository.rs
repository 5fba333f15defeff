use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use journal_engine::LedgerFilter;
use ledger_client::{income_summary_params, FetchError, RestClient};
use models::{CurrencyInfo, LedgerLine, RpcResult};

/// Income statement aggregation lives in the database.
const INCOME_STATEMENT_PROC: &str = "get_income_statement_summary";
/// Cash balance aggregation lives in the database.
const CASH_BALANCE_PROC: &str = "get_cash_balance_summary";

/// Repository trait for the hosted ledger backend.
/// This abstraction allows swapping the REST facade for a stub in tests.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn fetch_income_summary(&self, filter: &LedgerFilter) -> Result<RpcResult, FetchError>;
    async fn fetch_ledger_lines(
        &self,
        filter: &LedgerFilter,
        cap: usize,
    ) -> Result<Vec<LedgerLine>, FetchError>;
    async fn fetch_cash_balance(
        &self,
        company_id: Option<&str>,
        as_of: NaiveDate,
    ) -> Result<RpcResult, FetchError>;
    async fn fetch_currency(&self, company_id: Option<&str>) -> Result<CurrencyInfo, FetchError>;
}

/// Production implementation backed by the REST facade.
///
/// Requests may name a company explicitly; when they don't, the configured
/// default company (session handling is an external concern) is used.
pub struct RestLedgerRepository {
    client: RestClient,
    default_company_id: Option<String>,
}

impl RestLedgerRepository {
    pub fn new(client: RestClient, default_company_id: Option<String>) -> Self {
        Self {
            client,
            default_company_id,
        }
    }

    fn scoped(&self, filter: &LedgerFilter) -> LedgerFilter {
        let mut filter = filter.clone();
        if filter.company_id.is_none() {
            filter.company_id = self.default_company_id.clone();
        }
        filter
    }

    fn company_or_default<'a>(&'a self, company_id: Option<&'a str>) -> Option<&'a str> {
        company_id.or(self.default_company_id.as_deref())
    }
}

#[async_trait]
impl LedgerRepository for RestLedgerRepository {
    async fn fetch_income_summary(&self, filter: &LedgerFilter) -> Result<RpcResult, FetchError> {
        let filter = self.scoped(filter);
        self.client
            .rpc(INCOME_STATEMENT_PROC, income_summary_params(&filter))
            .await
    }

    async fn fetch_ledger_lines(
        &self,
        filter: &LedgerFilter,
        cap: usize,
    ) -> Result<Vec<LedgerLine>, FetchError> {
        let filter = self.scoped(filter);
        self.client.fetch_ledger_lines(&filter, cap).await
    }

    async fn fetch_cash_balance(
        &self,
        company_id: Option<&str>,
        as_of: NaiveDate,
    ) -> Result<RpcResult, FetchError> {
        let params = json!({
            "p_company_id": self.company_or_default(company_id),
            "p_as_of_date": as_of.format("%Y-%m-%d").to_string(),
        });
        self.client.rpc(CASH_BALANCE_PROC, params).await
    }

    async fn fetch_currency(&self, company_id: Option<&str>) -> Result<CurrencyInfo, FetchError> {
        match self.company_or_default(company_id) {
            Some(company) => self.client.fetch_company_currency(company).await,
            None => Ok(CurrencyInfo::default()),
        }
    }
}
