use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde_json::{Map, Value};
use thiserror::Error;

use journal_engine::LedgerFilter;
use models::{CurrencyInfo, LedgerLine, RpcResult, Settings};

/// Ledger view queried for transaction rows.
const LEDGER_LINES_VIEW: &str = "v_ledger_lines";
/// View resolving a company to its display currency.
const COMPANY_CURRENCY_VIEW: &str = "company_currencies";

/// Failures talking to the hosted backend.
///
/// Callers never surface these over HTTP; they log and degrade to default
/// views instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend returned HTTP {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("No {what} found for company {company_id}")]
    MissingData { what: String, company_id: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Configuration for talking to the hosted relational backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl ClientConfig {
    /// Loads config from env vars:
    /// - `LEDGER_BACKEND_URL` (required)
    /// - `LEDGER_API_KEY`     (optional)
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("LEDGER_BACKEND_URL").ok()?;
        let api_key = std::env::var("LEDGER_API_KEY").ok();
        Some(Self { base_url, api_key })
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.backend_url.clone(),
            api_key: settings.backend_api_key.clone(),
        }
    }
}

/// Generic client for the backend's REST facade: filtered row reads against
/// named views and keyed invocation of stored procedures.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                headers.insert("apikey", value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn rest_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("rest/v1/{}", path))
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Runs a filtered read against a named view, returning raw rows.
    pub async fn select_rows(
        &self,
        view: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Map<String, Value>>> {
        let endpoint = self.rest_url(view)?;
        let response = self
            .http
            .get(endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                endpoint: view.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: view.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<Map<String, Value>>>()
            .await
            .map_err(|e| FetchError::Transport {
                endpoint: view.to_string(),
                source: e,
            })
    }

    /// Invokes a named stored procedure with keyed parameters and normalizes
    /// whatever shape comes back.
    pub async fn rpc(&self, procedure: &str, params: Value) -> Result<RpcResult> {
        let endpoint = self.rest_url(&format!("rpc/{}", procedure))?;
        let response = self
            .http
            .post(endpoint)
            .json(&params)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                endpoint: procedure.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: procedure.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| FetchError::Transport {
            endpoint: procedure.to_string(),
            source: e,
        })?;

        Ok(RpcResult::from_value(body))
    }

    /// Fetches ledger rows for the filter window, newest first, capped at
    /// `cap` rows. Rows that fail to decode are skipped, never fatal.
    pub async fn fetch_ledger_lines(
        &self,
        filter: &LedgerFilter,
        cap: usize,
    ) -> Result<Vec<LedgerLine>> {
        let params = line_query_params(filter, cap);
        let rows = self.select_rows(LEDGER_LINES_VIEW, &params).await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<LedgerLine>(Value::Object(row)) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable ledger row");
                }
            }
        }
        Ok(lines)
    }

    /// Resolves a company to its display currency.
    pub async fn fetch_company_currency(&self, company_id: &str) -> Result<CurrencyInfo> {
        let params = vec![
            ("select".to_string(), "currency_code,currency_symbol,currency_name".to_string()),
            ("company_id".to_string(), format!("eq.{}", company_id)),
            ("limit".to_string(), "1".to_string()),
        ];
        let rows = self.select_rows(COMPANY_CURRENCY_VIEW, &params).await?;

        let row = rows.into_iter().next().ok_or_else(|| FetchError::MissingData {
            what: "currency".to_string(),
            company_id: company_id.to_string(),
        })?;

        serde_json::from_value::<CurrencyInfo>(Value::Object(row)).map_err(|_| {
            FetchError::MissingData {
                what: "currency".to_string(),
                company_id: company_id.to_string(),
            }
        })
    }
}

/// Encodes a ledger filter as operator-prefixed query pairs for the facade
/// (`eq.` / `gte.` / `lte.` predicates plus `order`, `limit` and `select`
/// modifiers). The store predicate is emitted only when the caller scopes the
/// row query itself; the transactions path filters at entry level instead.
pub fn line_query_params(filter: &LedgerFilter, cap: usize) -> Vec<(String, String)> {
    let mut params = vec![
        ("select".to_string(), "*".to_string()),
        (
            "entry_date".to_string(),
            format!("gte.{}", filter.date_from.format("%Y-%m-%d")),
        ),
        (
            "entry_date".to_string(),
            format!("lte.{}", filter.date_to.format("%Y-%m-%d")),
        ),
    ];
    if let Some(company_id) = &filter.company_id {
        params.push(("company_id".to_string(), format!("eq.{}", company_id)));
    }
    params.push((
        "order".to_string(),
        "entry_date.desc,created_at.desc".to_string(),
    ));
    params.push(("limit".to_string(), cap.to_string()));
    params
}

/// Keyed parameters for the income statement procedure.
pub fn income_summary_params(filter: &LedgerFilter) -> Value {
    serde_json::json!({
        "p_company_id": filter.company_id,
        "p_store_id": filter.store_id,
        "p_start_date": filter.date_from.format("%Y-%m-%d").to_string(),
        "p_end_date": filter.date_to.format("%Y-%m-%d").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn filter(company: Option<&str>, store: Option<&str>) -> LedgerFilter {
        LedgerFilter {
            company_id: company.map(|s| s.to_string()),
            store_id: store.map(|s| s.to_string()),
            date_from: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2025, 8, 21).unwrap(),
        }
    }

    #[test]
    fn test_line_query_params_encoding() {
        let params = line_query_params(&filter(Some("c1"), None), 200);

        assert!(params.contains(&("entry_date".to_string(), "gte.2025-08-01".to_string())));
        assert!(params.contains(&("entry_date".to_string(), "lte.2025-08-21".to_string())));
        assert!(params.contains(&("company_id".to_string(), "eq.c1".to_string())));
        assert!(params.contains(&(
            "order".to_string(),
            "entry_date.desc,created_at.desc".to_string()
        )));
        assert!(params.contains(&("limit".to_string(), "200".to_string())));
    }

    #[test]
    fn test_line_query_params_never_filter_rows_by_store() {
        // Store scoping happens at entry level in the grouping pipeline;
        // pushing it into the row query would drop a matching entry's
        // non-matching lines.
        let params = line_query_params(&filter(Some("c1"), Some("s1")), 50);
        assert!(params.iter().all(|(k, _)| k != "store_id"));
    }

    #[test]
    fn test_income_summary_params_carry_store_scope() {
        let params = income_summary_params(&filter(Some("c1"), Some("s1")));
        assert_eq!(params["p_company_id"], "c1");
        assert_eq!(params["p_store_id"], "s1");
        assert_eq!(params["p_start_date"], "2025-08-01");
        assert_eq!(params["p_end_date"], "2025-08-21");

        let params = income_summary_params(&filter(None, None));
        assert!(params["p_store_id"].is_null());
    }

    #[test]
    fn test_client_rejects_invalid_base_url() {
        let result = RestClient::new(ClientConfig {
            base_url: "not a url".to_string(),
            api_key: None,
        });
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}
