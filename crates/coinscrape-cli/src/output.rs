//! Rendering of results and progress for the terminal.

use coinscrape::progress::{ProgressEvent, ProgressEventKind};
use coinscrape::{ResultSet, ScrapeConfig};

const HEADERS: [&str; 4] = ["TIMESTAMP", "CURRENCY", "PRICE", "SOURCE"];

/// Plain-text table of records, followed by skipped targets if any.
pub fn render_table(results: &ResultSet) -> String {
    let rows: Vec<[String; 4]> = results
        .iter()
        .map(|r| {
            [
                r.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                r.currency.clone(),
                r.price.to_string(),
                r.source.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(String::from), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }

    let summary = &results.summary;
    if summary.failed > 0 {
        out.push_str(&format!(
            "\n{} of {} targets skipped:\n",
            summary.failed, summary.attempted
        ));
        for failure in &summary.failures {
            out.push_str(&format!("  {}: {}\n", failure.asset_symbol, failure.error));
        }
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &w))| {
            // Right-align the price column.
            if i == 2 {
                format!("{cell:>w$}")
            } else {
                format!("{cell:<w$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Pretty-printed JSON of the whole result set, summary included.
pub fn render_json(results: &ResultSet) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Compact single-line JSON, for one line per run in watch mode.
pub fn render_json_line(results: &ResultSet) -> anyhow::Result<String> {
    Ok(serde_json::to_string(results)?)
}

/// Human-readable listing of the resolved configuration.
pub fn render_targets(config: &ScrapeConfig) -> String {
    let s = &config.settings;
    let mut out = format!(
        "presence timeout: {}ms\nupdate timeout:   {}ms\npoll interval:    {}ms\ntimeout policy:   {}\n\n",
        s.presence_timeout_ms, s.update_timeout_ms, s.poll_interval_ms, s.timeout_policy
    );
    for target in &config.targets {
        out.push_str(&format!(
            "{:<6} {}\n       {}\n",
            target.asset_symbol, target.page_url, target.element_selector
        ));
    }
    out
}

/// One-line progress message for stderr, or `None` for events not worth
/// showing.
pub fn progress_line(event: &ProgressEvent) -> Option<String> {
    match &event.event {
        ProgressEventKind::RunStarted { targets } => {
            Some(format!("Scraping {targets} targets..."))
        }
        ProgressEventKind::TargetStarted { .. } => None,
        ProgressEventKind::TargetSucceeded {
            asset_symbol,
            price,
            elapsed_ms,
        } => Some(format!(
            "  ok    {asset_symbol:<6} {price} ({:.1}s)",
            *elapsed_ms as f64 / 1000.0
        )),
        ProgressEventKind::TargetFailed {
            asset_symbol,
            kind,
            elapsed_ms,
            ..
        } => Some(format!(
            "  fail  {asset_symbol:<6} {kind} ({:.1}s)",
            *elapsed_ms as f64 / 1000.0
        )),
        ProgressEventKind::RunComplete {
            attempted,
            succeeded,
            ..
        } => Some(format!("Collected {succeeded}/{attempted}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use coinscrape::{CollationSummary, PriceRecord, TargetFailure};
    use rust_decimal::Decimal;

    fn sample() -> ResultSet {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        ResultSet {
            run_id: "run-1".into(),
            records: vec![
                PriceRecord {
                    timestamp: ts,
                    price: Decimal::new(6123410, 2),
                    currency: "BTC".into(),
                    source: "https://coinmarketcap.com/currencies/bitcoin/".into(),
                },
                PriceRecord {
                    timestamp: ts,
                    price: Decimal::new(15025, 2),
                    currency: "SOL".into(),
                    source: "https://coinmarketcap.com/currencies/solana/".into(),
                },
            ],
            summary: CollationSummary {
                attempted: 3,
                succeeded: 2,
                failed: 1,
                failures: vec![TargetFailure {
                    asset_symbol: "ETH".into(),
                    error: "Selector not found within 10s: span.price".into(),
                }],
            },
        }
    }

    #[test]
    fn test_table_lists_records_in_order() {
        let table = render_table(&sample());
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("TIMESTAMP"));
        assert!(lines[1].contains("BTC") && lines[1].contains("61234.10"));
        assert!(lines[2].contains("SOL") && lines[2].contains("150.25"));
        assert!(table.contains("1 of 3 targets skipped"));
        assert!(table.contains("ETH: Selector not found"));
    }

    #[test]
    fn test_table_aligns_price_column() {
        let table = render_table(&sample());
        let lines: Vec<&str> = table.lines().collect();
        let btc_end = lines[1].find("61234.10").unwrap() + "61234.10".len();
        let sol_end = lines[2].find("150.25").unwrap() + "150.25".len();
        assert_eq!(btc_end, sol_end);
    }

    #[test]
    fn test_json_output_keeps_price_as_string() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["records"][0]["price"], "61234.10");
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["run_id"], "run-1");

        let line = render_json_line(&sample()).unwrap();
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_progress_lines() {
        let event = |kind| ProgressEvent {
            run_id: "r".into(),
            seq: 1,
            event: kind,
        };
        let failed = event(ProgressEventKind::TargetFailed {
            asset_symbol: "ETH".into(),
            kind: "selector_not_found".into(),
            error: "Selector not found".into(),
            elapsed_ms: 10_000,
        });
        assert_eq!(
            progress_line(&failed).unwrap(),
            "  fail  ETH    selector_not_found (10.0s)"
        );

        let started = event(ProgressEventKind::TargetStarted {
            asset_symbol: "ETH".into(),
            url: "https://example.com".into(),
        });
        assert!(progress_line(&started).is_none());
    }

    #[test]
    fn test_render_targets() {
        let out = render_targets(&ScrapeConfig::default());
        assert!(out.contains("timeout policy:   lenient"));
        assert!(out.contains("https://coinmarketcap.com/currencies/solana/"));
    }
}
