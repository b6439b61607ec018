//! HTML rendering of the ETA alert digest.

use std::fmt::Write as _;

use chrono::NaiveDate;

/// One folder row of the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRow {
    pub case_number: String,
    pub customer: String,
    pub eta: NaiveDate,
    /// Days late for overdue folders, days remaining for the others.
    pub days: i64,
    pub owner: String,
    pub bill_of_lading: String,
}

/// Figures shown in the digest header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestSummary {
    pub overdue: usize,
    pub danger: usize,
    pub newly_overdue: usize,
    pub newly_danger: usize,
}

pub fn digest_subject(today: NaiveDate, summary: &DigestSummary) -> String {
    format!(
        "ETA alert report {} - {} overdue, {} in danger",
        today.format("%d/%m/%Y"),
        summary.overdue,
        summary.danger
    )
}

/// Render the digest body. Rows are expected sorted by case number.
pub fn render_digest(
    today: NaiveDate,
    summary: &DigestSummary,
    overdue: &[DigestRow],
    danger: &[DigestRow],
) -> String {
    let mut html = String::new();
    let _ = write!(html, "<h2>ETA alert report - {}</h2>", today.format("%d/%m/%Y"));
    html.push_str("<h3>Summary</h3><ul>");
    let _ = write!(html, "<li><strong>Overdue folders:</strong> {}</li>", summary.overdue);
    let _ = write!(html, "<li><strong>Folders in danger:</strong> {}</li>", summary.danger);
    let _ = write!(html, "<li><strong>Newly overdue:</strong> {}</li>", summary.newly_overdue);
    let _ = write!(html, "<li><strong>Newly in danger:</strong> {}</li>", summary.newly_danger);
    html.push_str("</ul>");

    if !overdue.is_empty() {
        html.push_str("<h3 style=\"color: #d9534f;\">Overdue folders</h3>");
        push_table(&mut html, "Days late", overdue);
    }
    if !danger.is_empty() {
        html.push_str("<h3 style=\"color: #f0ad4e;\">Folders in danger</h3>");
        push_table(&mut html, "Days remaining", danger);
    }
    html
}

fn push_table(html: &mut String, days_header: &str, rows: &[DigestRow]) {
    html.push_str("<table border=\"1\" style=\"border-collapse: collapse; width: 100%;\">");
    let _ = write!(
        html,
        "<tr><th>Folder</th><th>Customer</th><th>ETA</th><th>{days_header}</th>\
         <th>Owner</th><th>B/L</th></tr>"
    );
    for row in rows {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.case_number),
            escape(&row.customer),
            row.eta.format("%d/%m/%Y"),
            row.days,
            escape(&row.owner),
            escape(&row.bill_of_lading),
        );
    }
    html.push_str("</table>");
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(case_number: &str, days: i64) -> DigestRow {
        DigestRow {
            case_number: case_number.into(),
            customer: "Bolloré & Fils".into(),
            eta: NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
            days,
            owner: "Unassigned".into(),
            bill_of_lading: "N/A".into(),
        }
    }

    #[test]
    fn subject_carries_both_counts() {
        let summary = DigestSummary { overdue: 2, danger: 1, ..Default::default() };
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(
            digest_subject(today, &summary),
            "ETA alert report 10/06/2024 - 2 overdue, 1 in danger"
        );
    }

    #[test]
    fn tables_are_rendered_only_when_populated() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let summary = DigestSummary { overdue: 1, ..Default::default() };
        let html = render_digest(today, &summary, &[row("TR00001", 3)], &[]);

        assert!(html.contains("Overdue folders</h3>"));
        assert!(html.contains("<th>Days late</th>"));
        assert!(!html.contains("Days remaining"));
        assert!(html.contains("<td>07/06/2024</td><td>3</td>"));
    }

    #[test]
    fn cell_values_are_escaped() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let html = render_digest(today, &DigestSummary::default(), &[], &[row("TR<1>", 2)]);
        assert!(html.contains("TR&lt;1&gt;"));
        assert!(html.contains("Bolloré &amp; Fils"));
    }
}
