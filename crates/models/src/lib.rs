
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Settings models
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
	pub backend_url: String,
	#[serde(default)]
	pub backend_api_key: Option<String>,
	#[serde(default)]
	pub default_company_id: Option<String>,
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Settings {
	/// Settings with only the backend URL set; everything else at defaults.
	pub fn with_backend_url(backend_url: String) -> Self {
		Settings {
			backend_url,
			backend_api_key: None,
			default_company_id: None,
			host: default_host(),
			port: default_port(),
		}
	}
}

fn default_host() -> String {
	"127.0.0.1".to_string()
}

fn default_port() -> u16 {
	3000
}

// Raw ledger rows
//
// Rows come back from the ledger view with numeric columns encoded either as
// JSON numbers or as strings; money fields are decoded leniently and fall
// back to 0.0 so a partially malformed row never aborts the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerLine {
	pub journal_id: String,
	#[serde(default)]
	pub entry_date: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub line_description: Option<String>,
	#[serde(default)]
	pub account_name: Option<String>,
	#[serde(default, deserialize_with = "de_lenient_f64")]
	pub debit: f64,
	#[serde(default, deserialize_with = "de_lenient_f64")]
	pub credit: f64,
	#[serde(default)]
	pub cash_location_name: Option<String>,
	#[serde(default)]
	pub store_id: Option<String>,
	#[serde(default)]
	pub store_name: Option<String>,
	#[serde(default)]
	pub counterparty_name: Option<String>,
	#[serde(default)]
	pub created_by_name: Option<String>,
	#[serde(default)]
	pub company_name: Option<String>,
}

// View models
#[derive(Debug, Clone, Serialize)]
pub struct LineView {
	pub account_name: String,
	pub debit: f64,
	pub credit: f64,
	pub description: Option<String>,
	pub cash_location_name: Option<String>,
	pub store_name: Option<String>,
	pub store_id: Option<String>,
}

impl From<&LedgerLine> for LineView {
	fn from(line: &LedgerLine) -> Self {
		LineView {
			account_name: line.account_name.clone().unwrap_or_default(),
			debit: line.debit,
			credit: line.credit,
			description: line.line_description.clone(),
			cash_location_name: line.cash_location_name.clone(),
			store_name: line.store_name.clone(),
			store_id: line.store_id.clone(),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntryView {
	pub journal_id: String,
	pub entry_date: String,
	pub description: String,
	pub company_name: String,
	pub created_by: String,
	pub counterparty_name: Option<String>,
	pub total_debit: f64,
	pub lines: Vec<LineView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryView {
	pub total_income: f64,
	pub total_expense: f64,
	pub net_income: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CashBalanceView {
	pub total_cash: f64,
	pub location_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyInfo {
	#[serde(alias = "currency_code")]
	pub code: String,
	#[serde(alias = "currency_symbol")]
	pub symbol: String,
	#[serde(alias = "currency_name")]
	pub name: String,
}

impl Default for CurrencyInfo {
	fn default() -> Self {
		CurrencyInfo {
			code: "USD".to_string(),
			symbol: "$".to_string(),
			name: "US Dollar".to_string(),
		}
	}
}

// Normalized RPC responses
//
// Stored procedures answer with whatever shape the database hands back: a
// single record, a row set, a bare scalar, or nothing. The shape is decided
// once here; consumers only ever see the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResult {
	Empty,
	Record(Map<String, Value>),
	Rows(Vec<Map<String, Value>>),
}

impl RpcResult {
	pub fn from_value(value: Value) -> Self {
		match value {
			Value::Null => RpcResult::Empty,
			Value::Object(map) => RpcResult::Record(map),
			Value::Array(items) => {
				let rows: Vec<Map<String, Value>> = items
					.into_iter()
					.filter_map(|item| match item {
						Value::Object(map) => Some(map),
						_ => None,
					})
					.collect();
				if rows.is_empty() {
					RpcResult::Empty
				} else {
					RpcResult::Rows(rows)
				}
			}
			// Scalar procedure results have no consumer in this system.
			_ => RpcResult::Empty,
		}
	}

	/// The record this result carries: the object itself, or the first row
	/// of a row set.
	pub fn record(&self) -> Option<&Map<String, Value>> {
		match self {
			RpcResult::Empty => None,
			RpcResult::Record(map) => Some(map),
			RpcResult::Rows(rows) => rows.first(),
		}
	}

	pub fn number(&self, key: &str) -> Option<f64> {
		self.record().and_then(|map| map.get(key)).and_then(coerce_f64)
	}

	pub fn integer(&self, key: &str) -> Option<i64> {
		self.number(key).map(|v| v as i64)
	}
}

/// Coerces a JSON value into a float: numbers pass through, numeric strings
/// are parsed, everything else is treated as missing.
pub fn coerce_f64(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok(),
		_ => None,
	}
}

fn de_lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	Ok(coerce_f64(&value).unwrap_or(0.0))
}

// Rounding compatibility methods (applied at the presentation boundary)
fn round2(v: f64) -> f64 {
	(v * 100.0).round() / 100.0
}

impl SummaryView {
	pub fn rounded(self) -> Self {
		SummaryView {
			total_income: round2(self.total_income),
			total_expense: round2(self.total_expense),
			net_income: round2(self.net_income),
		}
	}
}

impl CashBalanceView {
	pub fn rounded(self) -> Self {
		CashBalanceView {
			total_cash: round2(self.total_cash),
			location_count: self.location_count,
		}
	}
}

impl JournalEntryView {
	pub fn rounded(mut self) -> Self {
		self.total_debit = round2(self.total_debit);
		for line in self.lines.iter_mut() {
			line.debit = round2(line.debit);
			line.credit = round2(line.credit);
		}
		self
	}
}
