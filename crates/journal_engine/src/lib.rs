use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate};

use models::{
    CashBalanceView, JournalEntryView, LedgerLine, LineView, RpcResult, SummaryView,
};

/// Parses date strings in multiple formats (YYYY-MM-DD or YYYY/MM/DD)
#[inline]
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .map_err(|e| anyhow!(e))
}

/// Resolves optional date bounds to a concrete window.
///
/// A missing lower bound becomes the first day of `today`'s month, a missing
/// upper bound becomes `today` itself. Supplied bounds pass through untouched.
pub fn resolve_date_window(
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let from = date_from.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
    let to = date_to.unwrap_or(today);
    (from, to)
}

/// Query scope handed to the ledger facade.
///
/// The store id is carried here for the summary procedures, which scope by
/// store on the database side. The row query for transactions deliberately
/// ignores it: store filtering happens at entry level in
/// [`group_journal_entries`], so a matching entry keeps its non-matching
/// lines.
#[derive(Debug, Clone)]
pub struct LedgerFilter {
    pub company_id: Option<String>,
    pub store_id: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl LedgerFilter {
    pub fn resolve(
        company_id: Option<String>,
        store_id: Option<String>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let (date_from, date_to) = resolve_date_window(date_from, date_to, today);
        LedgerFilter {
            company_id,
            store_id,
            date_from,
            date_to,
        }
    }
}

/// Groups flat ledger line rows into journal entry views.
///
/// `lines` arrives pre-sorted by the facade (descending entry date, then
/// creation time); the relative order is preserved and never re-sorted.
/// First-seen order of journal ids defines the output order. Every line is
/// appended to its entry and counted into `total_debit` regardless of the
/// store filter: the filter decides which entries are emitted, never which
/// lines an entry shows.
pub fn group_journal_entries(
    lines: Vec<LedgerLine>,
    store_filter: Option<&str>,
    limit: usize,
) -> Vec<JournalEntryView> {
    if lines.is_empty() {
        return Vec::new();
    }

    let mut entries: HashMap<String, JournalEntryView> = HashMap::new();
    let mut candidate_order: Vec<String> = Vec::new();
    let mut visible: HashSet<String> = HashSet::new();

    for line in &lines {
        let entry = entries.entry(line.journal_id.clone()).or_insert_with(|| {
            candidate_order.push(line.journal_id.clone());
            entry_header(line)
        });

        entry.total_debit += line.debit;
        entry.lines.push(LineView::from(line));

        let matches_store = match store_filter {
            None => true,
            Some(store) => line.store_id.as_deref() == Some(store),
        };
        if matches_store {
            visible.insert(line.journal_id.clone());
        }
    }

    candidate_order
        .into_iter()
        .filter(|id| visible.contains(id))
        .take(limit)
        .filter_map(|id| entries.remove(&id))
        .collect()
}

/// Entry header fields come from the first line seen for the journal id.
fn entry_header(line: &LedgerLine) -> JournalEntryView {
    JournalEntryView {
        journal_id: line.journal_id.clone(),
        entry_date: line.entry_date.clone(),
        description: line.description.clone().unwrap_or_default(),
        company_name: line.company_name.clone().unwrap_or_default(),
        created_by: line.created_by_name.clone().unwrap_or_default(),
        counterparty_name: line.counterparty_name.clone(),
        total_debit: 0.0,
        lines: Vec::new(),
    }
}

/// Merges an income statement procedure response into a fixed-shape summary.
///
/// Total on every input: missing fields default to zero and `net_income` is
/// always computed after defaulting.
pub fn assemble_summary(result: &RpcResult) -> SummaryView {
    let revenue = result.number("revenue").unwrap_or(0.0);
    let expense = result.number("expense").unwrap_or(0.0);
    SummaryView {
        total_income: revenue,
        total_expense: expense,
        net_income: revenue - expense,
    }
}

/// Same shape rules as [`assemble_summary`] over the cash balance procedure.
pub fn extract_cash_balance(result: &RpcResult) -> CashBalanceView {
    CashBalanceView {
        total_cash: result.number("total_cash").unwrap_or(0.0),
        location_count: result.integer("location_count").unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(journal_id: &str, store_id: Option<&str>, debit: f64, credit: f64) -> LedgerLine {
        LedgerLine {
            journal_id: journal_id.to_string(),
            entry_date: "2025-08-05".to_string(),
            description: Some(format!("journal {}", journal_id)),
            line_description: Some("line".to_string()),
            account_name: Some("Cash".to_string()),
            debit,
            credit,
            cash_location_name: None,
            store_id: store_id.map(|s| s.to_string()),
            store_name: store_id.map(|s| format!("Store {}", s)),
            counterparty_name: None,
            created_by_name: Some("alice".to_string()),
            company_name: Some("Acme".to_string()),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_group_empty_input() {
        let result = group_journal_entries(vec![], None, 10);
        assert!(result.is_empty());

        let result = group_journal_entries(vec![], Some("store-1"), 10);
        assert!(result.is_empty());
    }

    #[test]
    fn test_group_single_journal_sums_all_debits() {
        let lines = vec![
            line("j1", Some("s1"), 100.0, 0.0),
            line("j1", Some("s2"), 50.0, 0.0),
            line("j1", None, 0.0, 150.0),
        ];

        let result = group_journal_entries(lines.clone(), None, 10);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].total_debit, 150.0);
        assert_eq!(result[0].lines.len(), 3);

        // Same totals with a store filter: the filter never changes entry content
        let result = group_journal_entries(lines, Some("s1"), 10);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].total_debit, 150.0);
        assert_eq!(result[0].lines.len(), 3);
    }

    #[test]
    fn test_group_filter_is_monotonic() {
        let lines = vec![
            line("j1", Some("s1"), 10.0, 0.0),
            line("j2", Some("s2"), 20.0, 0.0),
            line("j3", Some("s1"), 30.0, 0.0),
        ];

        let unfiltered: Vec<String> = group_journal_entries(lines.clone(), None, 10)
            .into_iter()
            .map(|e| e.journal_id)
            .collect();
        let filtered: Vec<String> = group_journal_entries(lines, Some("s1"), 10)
            .into_iter()
            .map(|e| e.journal_id)
            .collect();

        assert_eq!(unfiltered, vec!["j1", "j2", "j3"]);
        assert_eq!(filtered, vec!["j1", "j3"]);
        for id in &filtered {
            assert!(unfiltered.contains(id));
        }
    }

    #[test]
    fn test_group_preserves_first_seen_order() {
        // Interleaved lines: first occurrence decides position
        let lines = vec![
            line("j2", None, 1.0, 0.0),
            line("j1", None, 1.0, 0.0),
            line("j2", None, 1.0, 0.0),
            line("j3", None, 1.0, 0.0),
            line("j1", None, 1.0, 0.0),
        ];

        let order: Vec<String> = group_journal_entries(lines, None, 10)
            .into_iter()
            .map(|e| e.journal_id)
            .collect();
        assert_eq!(order, vec!["j2", "j1", "j3"]);
    }

    #[test]
    fn test_group_limit_truncates_in_candidate_order() {
        let lines = vec![
            line("j1", None, 1.0, 0.0),
            line("j2", None, 1.0, 0.0),
            line("j3", None, 1.0, 0.0),
        ];

        let result = group_journal_entries(lines, None, 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].journal_id, "j1");
        assert_eq!(result[1].journal_id, "j2");
    }

    #[test]
    fn test_group_limit_counts_visible_entries_only() {
        // j1 is filtered out; the limit of 1 still admits j2
        let lines = vec![
            line("j1", Some("s9"), 1.0, 0.0),
            line("j2", Some("s1"), 2.0, 0.0),
        ];

        let result = group_journal_entries(lines, Some("s1"), 1);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].journal_id, "j2");
    }

    #[test]
    fn test_group_filtered_entry_keeps_all_lines() {
        // 12 lines over 3 journals; only j2 touches the filtered store
        let mut lines = Vec::new();
        for journal in ["j1", "j2", "j3"] {
            for i in 0..4 {
                let store = if journal == "j2" && i == 2 {
                    Some("sX")
                } else {
                    Some("other")
                };
                lines.push(line(journal, store, 25.0, 0.0));
            }
        }
        assert_eq!(lines.len(), 12);

        let result = group_journal_entries(lines, Some("sX"), 10);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].journal_id, "j2");
        // All four lines survive, not just the matching one
        assert_eq!(result[0].lines.len(), 4);
        assert_eq!(result[0].total_debit, 100.0);
    }

    #[test]
    fn test_group_header_comes_from_first_line() {
        let mut first = line("j1", None, 10.0, 0.0);
        first.description = Some("opening entry".to_string());
        let mut second = line("j1", None, 5.0, 0.0);
        second.description = Some("ignored".to_string());

        let result = group_journal_entries(vec![first, second], None, 10);
        assert_eq!(result[0].description, "opening entry");
        assert_eq!(result[0].created_by, "alice");
        assert_eq!(result[0].company_name, "Acme");
    }

    #[test]
    fn test_assemble_empty_is_all_zeros() {
        let summary = assemble_summary(&RpcResult::Empty);
        assert_eq!(summary, SummaryView::default());
        assert_eq!(summary.net_income, 0.0);
    }

    #[test]
    fn test_assemble_record() {
        let result = RpcResult::from_value(json!({"revenue": 100.0, "expense": 40.0}));
        let summary = assemble_summary(&result);
        assert_eq!(summary.total_income, 100.0);
        assert_eq!(summary.total_expense, 40.0);
        assert_eq!(summary.net_income, 60.0);
    }

    #[test]
    fn test_assemble_row_sequence_with_string_amounts() {
        let result = RpcResult::from_value(json!([{"revenue": "50", "expense": "10"}]));
        let summary = assemble_summary(&result);
        assert_eq!(summary.total_income, 50.0);
        assert_eq!(summary.total_expense, 10.0);
        assert_eq!(summary.net_income, 40.0);
    }

    #[test]
    fn test_assemble_missing_fields_default_to_zero() {
        let result = RpcResult::from_value(json!({"revenue": 75.5}));
        let summary = assemble_summary(&result);
        assert_eq!(summary.total_income, 75.5);
        assert_eq!(summary.total_expense, 0.0);
        assert_eq!(summary.net_income, 75.5);
    }

    #[test]
    fn test_rpc_result_normalization() {
        assert_eq!(RpcResult::from_value(json!(null)), RpcResult::Empty);
        assert_eq!(RpcResult::from_value(json!([])), RpcResult::Empty);
        assert_eq!(RpcResult::from_value(json!(42)), RpcResult::Empty);
        assert_eq!(RpcResult::from_value(json!("ok")), RpcResult::Empty);

        assert!(matches!(
            RpcResult::from_value(json!({"revenue": 1})),
            RpcResult::Record(_)
        ));
        assert!(matches!(
            RpcResult::from_value(json!([{"revenue": 1}, {"revenue": 2}])),
            RpcResult::Rows(ref rows) if rows.len() == 2
        ));
        // Non-object array elements are dropped
        assert!(matches!(
            RpcResult::from_value(json!([1, {"revenue": 1}])),
            RpcResult::Rows(ref rows) if rows.len() == 1
        ));
    }

    #[test]
    fn test_extract_cash_balance() {
        let result = RpcResult::from_value(json!({"total_cash": "1250.75", "location_count": 3}));
        let balance = extract_cash_balance(&result);
        assert_eq!(balance.total_cash, 1250.75);
        assert_eq!(balance.location_count, 3);

        assert_eq!(extract_cash_balance(&RpcResult::Empty), CashBalanceView::default());
    }

    #[test]
    fn test_resolve_date_window_defaults_to_month_to_date() {
        let today = date("2025-08-21");
        let (from, to) = resolve_date_window(None, None, today);
        assert_eq!(from, date("2025-08-01"));
        assert_eq!(to, today);
    }

    #[test]
    fn test_resolve_date_window_keeps_explicit_bounds() {
        let today = date("2025-08-21");
        let (from, to) = resolve_date_window(Some(date("2025-07-15")), None, today);
        assert_eq!(from, date("2025-07-15"));
        assert_eq!(to, today);

        let (from, to) =
            resolve_date_window(Some(date("2025-01-01")), Some(date("2025-01-31")), today);
        assert_eq!(from, date("2025-01-01"));
        assert_eq!(to, date("2025-01-31"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-08-05").unwrap(), date("2025-08-05"));
        assert_eq!(parse_date("2025/08/05").unwrap(), date("2025-08-05"));
        assert!(parse_date("not-a-date").is_err());
    }
}
