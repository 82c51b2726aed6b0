//! Static HTML report of recent external traffic.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::store::{ReportRow, Store};

/// Render the trailing-window traffic report and write it to `path`.
/// Returns the number of rows it contains.
pub fn write_report(store: &Store, path: &Path, window_days: u32) -> Result<usize> {
    let rows = store.recent_visits(window_days)?;
    let html = render(&rows, window_days);
    fs::write(path, html).with_context(|| format!("write report to {}", path.display()))?;
    Ok(rows.len())
}

pub fn render(rows: &[ReportRow], window_days: u32) -> String {
    let mut out = String::with_capacity(1024 + rows.len() * 160);
    out.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>Logs from last {window_days} days</title>");
    out.push_str(
        "<style>\n\
         #logs table{font-family:'Segoe UI';font-size:11px;text-align:left;color:#2E4758;width:100%;border-collapse:collapse;}\n\
         #logs td{padding:0 5px;max-width:600px;word-wrap:break-word;white-space:nowrap;overflow:hidden;text-overflow:ellipsis;}\n\
         #logs table tr:nth-child(even){background:#D0E0EB;}\n\
         #logs th{border-bottom:1px solid #ddd;padding:0 5px 10px;}\n\
         </style>\n</head>\n<body id=\"logs\">\n<table>\n",
    );
    out.push_str(
        "<tr><th>date</th><th>time</th><th>ip</th><th>city</th><th>country</th><th>path</th><th>useragent</th></tr>\n",
    );
    for row in rows {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.date),
            escape(&row.time),
            escape(&row.remote_ip),
            escape(&row.remote_city),
            escape(&row.remote_country),
            escape(&row.key),
            escape(&row.user_agent),
        );
    }
    out.push_str("</table>\n</body>\n</html>\n");
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
