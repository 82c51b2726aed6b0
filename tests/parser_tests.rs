//! Tests for the access-log line grammar.

use buckettail::parser::{parse_line, ZERO_TIME};

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

fn sample_line() -> String {
    format!(
        "79a59df900b949e55d96a1e698fbacedfd6e09d98eacf8f8d5218e7cd47ef2be awsexamplebucket \
         [06/Feb/2019:00:00:38 +0000] 192.0.2.3 arn:aws:iam::123456789012:user/backup \
         3E57427F3EXAMPLE REST.GET.OBJECT photos/cat.jpg \
         \"GET /awsexamplebucket/photos/cat.jpg HTTP/1.1\" 200 - 5034 5034 20 19 \
         \"https://example.com/gallery\" \"{CHROME_UA}\" L4kqzHHAFNVid2A1"
    )
}

#[test]
fn test_valid_line_round_trips_textual_fields() {
    let record = parse_line(&sample_line()).unwrap();

    assert_eq!(
        record.bucket_owner,
        "79a59df900b949e55d96a1e698fbacedfd6e09d98eacf8f8d5218e7cd47ef2be"
    );
    assert_eq!(record.bucket, "awsexamplebucket");
    assert_eq!(record.remote_ip, "192.0.2.3");
    assert_eq!(record.requester, "arn:aws:iam::123456789012:user/backup");
    assert_eq!(record.request_id, "3E57427F3EXAMPLE");
    assert_eq!(record.operation, "REST.GET.OBJECT");
    assert_eq!(record.key, "photos/cat.jpg");
    assert_eq!(
        record.request_uri,
        "GET /awsexamplebucket/photos/cat.jpg HTTP/1.1"
    );
    assert_eq!(record.http_status, "200");
    assert_eq!(record.error_code, "-");
    assert_eq!(record.referrer, "https://example.com/gallery");
    assert_eq!(record.user_agent, CHROME_UA);
    assert_eq!(record.version_id, "L4kqzHHAFNVid2A1");
}

#[test]
fn test_timestamp_is_normalized_to_microseconds() {
    let record = parse_line(&sample_line()).unwrap();
    assert_eq!(record.time, "2019-02-06 00:00:38.000000");
}

#[test]
fn test_numeric_fields_parse() {
    let record = parse_line(&sample_line()).unwrap();
    assert_eq!(record.bytes_sent, 5034);
    assert_eq!(record.object_size, 5034);
    assert_eq!(record.total_time, 20);
    assert_eq!(record.turnaround_time, 19);
}

#[test]
fn test_non_numeric_counts_become_zero() {
    // Unmetered fields are logged as "-"; the line must still parse.
    let line = "owner bucket [06/Feb/2019:00:00:38 +0000] 192.0.2.3 requester \
                REQID1 REST.GET.VERSIONING - \"GET /bucket?versioning HTTP/1.1\" \
                200 - - - 7 - \"-\" \"S3Console/0.4\" -";
    let record = parse_line(line).unwrap();
    assert_eq!(record.bytes_sent, 0);
    assert_eq!(record.object_size, 0);
    assert_eq!(record.total_time, 7);
    assert_eq!(record.turnaround_time, 0);
    assert_eq!(record.http_status, "200");
}

#[test]
fn test_malformed_timestamp_falls_back_to_zero_time() {
    let line = "owner bucket [not a timestamp] 192.0.2.3 requester REQID2 \
                REST.GET.OBJECT photos/cat.jpg \"GET /photos/cat.jpg HTTP/1.1\" \
                200 - 12 12 5 4 \"-\" \"S3Console/0.4\" -";
    let record = parse_line(line).unwrap();
    assert_eq!(record.time, ZERO_TIME);
}

#[test]
fn test_zero_time_sorts_below_real_timestamps() {
    assert!(ZERO_TIME < "2019-02-06 00:00:38.000000");
}

#[test]
fn test_timestamps_sort_as_strings() {
    let earlier = parse_line(&sample_line().replace("00:00:38", "00:00:37")).unwrap();
    let later = parse_line(&sample_line()).unwrap();
    assert!(earlier.time < later.time);
}

#[test]
fn test_quoted_fields_keep_embedded_separators() {
    let line = "owner bucket [06/Feb/2019:00:00:38 +0000] 192.0.2.3 requester REQID3 \
                REST.GET.OBJECT some/key \"GET /some/key?a=1&b=2 HTTP/1.1\" 200 - 1 1 1 1 \
                \"https://example.com/page with spaces\" \"Agent With Spaces/1.0\" -";
    let record = parse_line(line).unwrap();
    assert_eq!(record.request_uri, "GET /some/key?a=1&b=2 HTTP/1.1");
    assert_eq!(record.referrer, "https://example.com/page with spaces");
    assert_eq!(record.user_agent, "Agent With Spaces/1.0");
}

#[test]
fn test_malformed_line_yields_nothing() {
    assert!(parse_line("not an access log line at all").is_none());
    assert!(parse_line("").is_none());
}

#[test]
fn test_agent_classification_populates_derived_fields() {
    let record = parse_line(&sample_line()).unwrap();
    assert_eq!(record.ua_browser, "Chrome");
    assert_eq!(record.ua_browser_version, "91.0.4472.124");
    assert_eq!(record.ua_platform, "Windows");
    assert_eq!(record.ua_os, "Windows 10");
    assert!(!record.ua_mobile);
    assert!(!record.ua_bot);
}

#[test]
fn test_location_fields_start_empty() {
    let record = parse_line(&sample_line()).unwrap();
    assert_eq!(record.remote_city, "");
    assert_eq!(record.remote_country, "");
    assert_eq!(record.remote_lat, 0.0);
    assert_eq!(record.remote_lng, 0.0);
}
