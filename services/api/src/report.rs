use std::fmt::Write as _;

use xpendit::workflows::expenses::{BatchReport, ExpenseStatus};

const DUPLICATE_EXAMPLES: usize = 5;
const NEGATIVE_EXAMPLES: usize = 10;

/// Markdown analysis of a batch run for reviewers.
pub(crate) fn render_markdown(report: &BatchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Expense batch analysis\n");
    let _ = writeln!(
        out,
        "Evaluated on {} against base currency {}.\n",
        report.evaluated_on, report.base_currency
    );

    let _ = writeln!(out, "## 1) Status breakdown\n");
    for status in ExpenseStatus::ordered() {
        let _ = writeln!(
            out,
            "- {}: {}",
            status.label(),
            report.status_counts.get(status)
        );
    }
    out.push('\n');

    let _ = writeln!(out, "## 2) Anomalies\n");
    let _ = writeln!(out, "### 2.1 Exact duplicates (amount, currency and date)\n");
    if report.duplicate_groups.is_empty() {
        let _ = writeln!(out, "No exact duplicates found.");
    } else {
        for group in report.duplicate_groups.iter().take(DUPLICATE_EXAMPLES) {
            let ids = group
                .expense_ids
                .iter()
                .map(|id| id.0.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "- {} | {} {} | ids: {}",
                group.key.date, group.key.amount, group.key.currency, ids
            );
        }
        if report.duplicate_groups.len() > DUPLICATE_EXAMPLES {
            let _ = writeln!(
                out,
                "- ... {} more groups",
                report.duplicate_groups.len() - DUPLICATE_EXAMPLES
            );
        }
    }

    let _ = writeln!(out, "\n### 2.2 Negative amounts\n");
    if report.negative_ids.is_empty() {
        let _ = writeln!(out, "No negative amounts found.");
    } else {
        let ids = report
            .negative_ids
            .iter()
            .take(NEGATIVE_EXAMPLES)
            .map(|id| id.0.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "Examples ({} of {}): {}",
            report.negative_ids.len().min(NEGATIVE_EXAMPLES),
            report.negative_ids.len(),
            ids
        );
    }

    let _ = writeln!(out, "\n## 3) Exchange rate lookups\n");
    let _ = writeln!(
        out,
        "- Non-{} expenses: {} across {} distinct dates",
        report.base_currency, report.non_base_expenses, report.non_base_dates
    );
    let _ = writeln!(
        out,
        "- Lookups issued: {} (one per date instead of one per expense)",
        report.rate_lookups
    );
    if report.failed_rate_dates.is_empty() {
        let _ = writeln!(out, "- Failed lookup dates: none");
    } else {
        let dates = report
            .failed_rate_dates
            .iter()
            .map(|date| date.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "- Failed lookup dates: {}", dates);
    }
    let _ = writeln!(
        out,
        "- Expenses without a rate carry TASA_CAMBIO_NO_DISPONIBLE and stay PENDING unless age already rejects them."
    );

    let _ = writeln!(out, "\n## 4) Batch data\n");
    let _ = writeln!(out, "- Total expenses: {}", report.total_expenses);
    let _ = writeln!(out, "- Skipped rows: {}", report.skipped_rows.len());
    let distribution = report
        .currency_distribution
        .iter()
        .map(|(currency, count)| format!("{currency}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "- Currency distribution: {}", distribution);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use xpendit::workflows::expenses::{
        DuplicateGroup, DuplicateKey, ExpenseId, StatusCounts,
    };

    fn report() -> BatchReport {
        let on = NaiveDate::from_ymd_opt(2025, 6, 20).expect("valid date");
        let duplicate_groups = (0..7)
            .map(|index| DuplicateGroup {
                key: DuplicateKey {
                    amount: Decimal::new(1000 + index, 2),
                    currency: "USD".to_string(),
                    date: on,
                },
                expense_ids: vec![
                    ExpenseId(format!("d-{index}-a")),
                    ExpenseId(format!("d-{index}-b")),
                ],
            })
            .collect();
        let negative_ids = (0..12).map(|index| ExpenseId(format!("n-{index:02}"))).collect();
        let mut currency_distribution = BTreeMap::new();
        currency_distribution.insert("CLP".to_string(), 4);
        currency_distribution.insert("USD".to_string(), 30);

        BatchReport {
            evaluated_on: NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date"),
            base_currency: "USD".to_string(),
            total_expenses: 34,
            non_base_expenses: 4,
            non_base_dates: 2,
            skipped_rows: Vec::new(),
            status_counts: StatusCounts {
                approved: 10,
                pending: 14,
                rejected: 10,
            },
            verdicts: Vec::new(),
            duplicate_groups,
            negative_ids,
            currency_distribution,
            rate_lookups: 2,
            failed_rate_dates: vec![on],
        }
    }

    #[test]
    fn markdown_caps_examples() {
        let markdown = render_markdown(&report());

        assert!(markdown.contains("- Approved: 10"));
        assert!(markdown.contains("- Pending: 14"));
        assert!(markdown.contains("d-4-a"));
        assert!(!markdown.contains("d-5-a"));
        assert!(markdown.contains("... 2 more groups"));
        assert!(markdown.contains("n-09"));
        assert!(!markdown.contains("n-10"));
        assert!(markdown.contains("Examples (10 of 12)"));
    }

    #[test]
    fn markdown_reports_lookup_stats() {
        let markdown = render_markdown(&report());

        assert!(markdown.contains("Non-USD expenses: 4 across 2 distinct dates"));
        assert!(markdown.contains("Lookups issued: 2"));
        assert!(markdown.contains("Failed lookup dates: 2025-06-20"));
        assert!(markdown.contains("Currency distribution: CLP: 4, USD: 30"));
    }
}
