use crate::preview::{PreviewSummary, UnitStatement};
use upkyp::workflows::billing::calculation::{BillingStatement, LineItem};
use upkyp::workflows::billing::domain::Money;

const LABEL_WIDTH: usize = 36;

/// Plain-text statement for terminal output.
pub(crate) fn render_statement(entry: &UnitStatement, currency: &str) -> String {
    let UnitStatement { unit_id, statement } = entry;
    let mut out = format!(
        "Billing statement for unit {} ({}, as of {})\n",
        unit_id.0, statement.period, statement.as_of
    );
    for item in &statement.line_items {
        push_line(&mut out, &line(&describe(item), currency, item.amount));
    }
    push_line(&mut out, &line("Base total", currency, statement.base_total));
    if let Some(note) = late_fee_note(statement) {
        push_line(&mut out, &note);
    }
    push_line(&mut out, &line("Total due", currency, statement.total_due));
    out
}

pub(crate) fn render_summary(summary: &PreviewSummary, currency: &str) -> String {
    let mut out = format!(
        "Billing run for {} ({} units, as of {})\n",
        summary.period,
        summary.statements.len(),
        summary.as_of
    );
    for entry in &summary.statements {
        push_line(
            &mut out,
            &line(&entry.unit_id.0, currency, entry.statement.total_due),
        );
    }
    push_line(&mut out, &line("Base total", currency, summary.base_total));
    push_line(&mut out, &line("Late fees", currency, summary.late_fees));
    push_line(&mut out, &line("Total due", currency, summary.total_due));
    out
}

/// Append an indented line.
fn push_line(out: &mut String, text: &str) {
    out.push_str("  ");
    out.push_str(text);
    out.push('\n');
}

fn describe(item: &LineItem) -> String {
    match (item.usage, item.rate) {
        (Some(usage), Some(rate)) => format!("{} ({usage:.2} x {rate})", item.label),
        _ => item.label.clone(),
    }
}

fn late_fee_note(statement: &BillingStatement) -> Option<String> {
    let assessment = statement.late_fee?;
    if assessment.days_late == 0 {
        Some(format!("Due {}, not yet late", assessment.due_date))
    } else {
        Some(format!(
            "Due {}, {} day(s) late",
            assessment.due_date, assessment.days_late
        ))
    }
}

fn line(label: &str, currency: &str, amount: Money) -> String {
    format!("{label:<LABEL_WIDTH$} {currency} {amount:>12}")
}
