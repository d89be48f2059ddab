//! Metric emission protocol
//!
//! Steps publish numeric metrics by printing lines of the form
//! `::metric::<key>=<value>[:<unit>]` to stdout. The runner scans output
//! line by line and reports matches with the run completion. Captured file
//! sizes are reported under `size.<sanitized-path>` with unit `bytes`.

use crate::dto::job::MetricReport;

const PREFIX: &str = "::metric::";

/// Parse one line of step stdout as a metric emission
///
/// Returns None for lines that do not carry the prefix or do not parse; a
/// malformed metric line is ordinary output, not an error.
pub fn parse_metric_line(line: &str) -> Option<MetricReport> {
    let rest = line.trim().strip_prefix(PREFIX)?;
    let (key, value_part) = rest.split_once('=')?;

    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }

    let (value_str, unit) = match value_part.split_once(':') {
        Some((v, u)) if !u.trim().is_empty() => (v, Some(u.trim().to_string())),
        Some((v, _)) => (v, None),
        None => (value_part, None),
    };

    let value: f64 = value_str.trim().parse().ok()?;

    Some(MetricReport {
        key: key.to_string(),
        value,
        unit,
    })
}

/// Metric key for a captured file size
///
/// Path separators and any character outside `[A-Za-z0-9._-]` collapse to
/// underscores so keys stay stable across platforms.
pub fn size_metric_key(path: &str) -> String {
    let sanitized: String = path
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("size.{}", sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_metric() {
        let m = parse_metric_line("::metric::total_duration_ms=1234.5").unwrap();
        assert_eq!(m.key, "total_duration_ms");
        assert_eq!(m.value, 1234.5);
        assert_eq!(m.unit, None);
    }

    #[test]
    fn test_parse_metric_with_unit() {
        let m = parse_metric_line("::metric::throughput=42:req/s").unwrap();
        assert_eq!(m.key, "throughput");
        assert_eq!(m.value, 42.0);
        assert_eq!(m.unit.as_deref(), Some("req/s"));
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let m = parse_metric_line("  ::metric::x=1  ").unwrap();
        assert_eq!(m.key, "x");
    }

    #[test]
    fn test_non_metric_lines() {
        assert!(parse_metric_line("compiling crate...").is_none());
        assert!(parse_metric_line("::metric::").is_none());
        assert!(parse_metric_line("::metric::novalue").is_none());
        assert!(parse_metric_line("::metric::key=notanumber").is_none());
        assert!(parse_metric_line("::metric::bad key=1").is_none());
    }

    #[test]
    fn test_size_metric_key() {
        assert_eq!(size_metric_key("out/app.bin"), "size.out_app.bin");
        assert_eq!(size_metric_key("dist/bundle v2.js"), "size.dist_bundle_v2.js");
    }
}
