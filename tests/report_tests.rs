//! Tests for the HTML report.

use buckettail::parser::parse_line;
use buckettail::report;
use buckettail::store::{ReportRow, Store};
use buckettail::types::LogRecord;
use chrono::{Duration, Utc};
use tempfile::tempdir;

const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0";

fn record(ip: &str, request_id: &str, days_ago: i64, status: &str, ua: &str, key: &str) -> LogRecord {
    let ts = (Utc::now() - Duration::days(days_ago)).format("%d/%b/%Y:%H:%M:%S +0000");
    let line = format!(
        "owner bucket [{ts}] {ip} requester {request_id} REST.GET.OBJECT {key} \
         \"GET /{key} HTTP/1.1\" {status} - 5034 5034 20 19 \"-\" \"{ua}\" -"
    );
    parse_line(&line).unwrap()
}

#[test]
fn test_report_contains_qualifying_rows_only() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("logs.db")).unwrap();

    store.insert_record("o", &record("1.1.1.1", "R1", 1, "200", BROWSER_UA, "page.html")).unwrap();
    store
        .insert_record(
            "o",
            &record("3.3.3.3", "R2", 1, "200", "Mozilla/5.0 (compatible; Googlebot/2.1)", "robots.txt"),
        )
        .unwrap();
    store.insert_record("o", &record("4.4.4.4", "R3", 1, "404", BROWSER_UA, "missing.html")).unwrap();

    let path = dir.path().join("report.html");
    let rows = report::write_report(&store, &path, 10).unwrap();
    let html = std::fs::read_to_string(&path).unwrap();

    assert_eq!(rows, 1);
    assert!(html.contains("1.1.1.1"));
    assert!(html.contains("page.html"));
    assert!(!html.contains("3.3.3.3"));
    assert!(!html.contains("4.4.4.4"));
}

#[test]
fn test_report_orders_most_recent_first() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("logs.db")).unwrap();

    store.insert_record("o", &record("1.1.1.1", "R1", 3, "200", BROWSER_UA, "old.html")).unwrap();
    store.insert_record("o", &record("2.2.2.2", "R2", 1, "200", BROWSER_UA, "new.html")).unwrap();

    let path = dir.path().join("report.html");
    report::write_report(&store, &path, 10).unwrap();
    let html = std::fs::read_to_string(&path).unwrap();

    let newer = html.find("2.2.2.2").unwrap();
    let older = html.find("1.1.1.1").unwrap();
    assert!(newer < older);
}

#[test]
fn test_render_escapes_html() {
    let rows = vec![ReportRow {
        date: "02-06".into(),
        time: "00:00:38".into(),
        remote_ip: "1.1.1.1".into(),
        remote_city: "Warsaw".into(),
        remote_country: "Poland".into(),
        key: "<script>alert(1)</script>".into(),
        user_agent: "Agent \"quoted\" & more".into(),
    }];

    let html = report::render(&rows, 10);
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(html.contains("Agent &quot;quoted&quot; &amp; more"));
    assert!(!html.contains("<script>alert(1)"));
}

#[test]
fn test_render_mentions_window_and_header() {
    let html = report::render(&[], 10);
    assert!(html.contains("Logs from last 10 days"));
    assert!(html.contains("<th>date</th>"));
    assert!(html.contains("</html>"));
}
