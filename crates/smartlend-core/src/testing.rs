//! Shared fixtures for unit tests.

use crate::BorrowerRow;

/// The borrower from the end-to-end example.
pub(crate) fn example_row() -> BorrowerRow {
    BorrowerRow {
        revolving_utilization: 0.3,
        age: 45.0,
        past_due_30_59: 0.0,
        debt_ratio: 0.2,
        monthly_income: 5000.0,
        open_credit_lines: 5.0,
        times_90_days_late: 0.0,
        real_estate_loans: 1.0,
        past_due_60_89: 0.0,
        dependents: 2.0,
    }
}

/// [`example_row`] as CSV cell text, in schema order.
pub(crate) fn example_values() -> Vec<String> {
    example_row().values().iter().map(|v| v.to_string()).collect()
}

/// Render a header and rows as CSV text.
pub(crate) fn csv_text(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut text = header.join(",");
    text.push('\n');
    for row in rows {
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text
}
