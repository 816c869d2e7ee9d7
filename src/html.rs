// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// HTML rendering of the run summary and queued run preview.
use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::report::{CSV_COLUMNS, CsvRecord, StatusCount};

const TITLE: &str = "GH Actions Report";

const STYLE: &str = "
body { font-family: -apple-system, Segoe UI, Helvetica, Arial, sans-serif; margin: 2rem; }
table.dataframe { border-collapse: collapse; margin-bottom: 2rem; }
table.dataframe th, table.dataframe td {
    border: 1px solid #d0d7de; padding: 4px 8px; text-align: left;
}
table.dataframe th { background: #f6f8fa; }
";

/// Renders the complete report page.
///
/// # Arguments
///
/// * `generated_at` - Timestamp shown in the page heading
/// * `summary` - Status and conclusion counts
/// * `queued` - Queued rows to list, already truncated to `limit`
/// * `limit` - Preview limit shown in the section heading
pub fn render_report(
    generated_at: &str,
    summary: &[StatusCount],
    queued: &[&CsvRecord],
    limit: usize,
) -> String
{
    let page = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (TITLE) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "Report generated " (generated_at) }
                h2 { "Summary" }
                (summary_table(summary))
                h2 { "Queued Runs (first " (limit) ")" }
                (queued_table(queued))
            }
        }
    };
    page.into_string()
}

fn summary_table(summary: &[StatusCount],) -> Markup
{
    html! {
        table class="dataframe" {
            thead {
                tr { th { "status" } th { "conclusion" } th { "count" } }
            }
            tbody {
                @for row in summary {
                    tr {
                        td { (row.status) }
                        td { (row.conclusion) }
                        td { (row.count) }
                    }
                }
            }
        }
    }
}

fn queued_table(rows: &[&CsvRecord],) -> Markup
{
    html! {
        table class="dataframe" {
            thead {
                tr {
                    @for column in CSV_COLUMNS {
                        th { (column) }
                    }
                }
            }
            tbody {
                @for row in rows {
                    tr {
                        @for (column, cell) in CSV_COLUMNS.iter().zip(row.cells()) {
                            @if *column == "html_url" && !cell.is_empty() {
                                td { a href=(cell) { (cell) } }
                            } @else {
                                td { (cell) }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::render_report;
    use crate::report::{CsvRecord, StatusCount};

    fn queued_row(id: u64, name: &str,) -> CsvRecord
    {
        CsvRecord {
            org_repo:               "octo/hello".to_owned(),
            workflow_run_id:        id,
            workflow_name:          Some(name.to_owned(),),
            head_branch:            Some("main".to_owned(),),
            event:                  Some("push".to_owned(),),
            status:                 Some("queued".to_owned(),),
            conclusion:             None,
            created_at:             None,
            updated_at:             None,
            actor:                  None,
            jobs_count:             None,
            queued_reason_inferred: None,
            html_url:               Some(
                format!("https://github.com/octo/hello/actions/runs/{id}"),
            ),
        }
    }

    #[test]
    fn page_contains_headings_and_counts()
    {
        let summary = vec![StatusCount {
            status:     "completed".to_owned(),
            conclusion: "success".to_owned(),
            count:      42,
        }];
        let row = queued_row(7, "CI",);
        let page = render_report("2025-01-01T00:00:00Z", &summary, &[&row], 200,);

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>GH Actions Report</title>"));
        assert!(page.contains("Report generated 2025-01-01T00:00:00Z"));
        assert!(page.contains("<h2>Summary</h2>"));
        assert!(page.contains("<td>42</td>"));
        assert!(page.contains("Queued Runs (first 200)"));
        assert!(page.contains("href=\"https://github.com/octo/hello/actions/runs/7\""));
    }

    #[test]
    fn values_are_escaped()
    {
        let row = queued_row(1, "<script>alert(1)</script>",);
        let page = render_report("now", &[], &[&row], 10,);

        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn empty_sections_still_render_tables()
    {
        let page = render_report("now", &[], &[], 0,);
        assert_eq!(page.matches("<table class=\"dataframe\">").count(), 2);
        assert!(page.contains("<th>queued_reason_inferred</th>"));
    }
}
