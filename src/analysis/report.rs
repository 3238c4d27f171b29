//! Fixed-order report rendering.

use std::io::{self, Write};

use chrono::Duration;

use super::Analysis;

/// Payloads longer than this are truncated in the report.
const PAYLOAD_DISPLAY_LIMIT: usize = 50;

/// Render the five report sections. Output over an unchanged analysis is
/// byte-identical between runs.
pub fn render<W: Write>(analysis: &Analysis, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n=== Honeypot Analysis Report ===")?;

    let top_ips = analysis.top_ips(10);

    writeln!(out, "\nTop 10 Most Active IPs:")?;
    for (ip, stats) in &top_ips {
        writeln!(out, "\nIP: {}", ip)?;
        writeln!(out, "Total Attempts: {}", stats.total_attempts)?;
        writeln!(
            out,
            "Active Duration: {}",
            format_duration(stats.last_seen - stats.first_seen)
        )?;
        writeln!(out, "Unique Ports Targeted: {}", stats.targeted_ports.len())?;
        writeln!(out, "Unique Payloads: {}", stats.unique_payloads.len())?;
    }

    writeln!(out, "\nPort Targeting Analysis:")?;
    for (port, stats) in analysis.ports_by_attempts() {
        writeln!(out, "\nPort {}:", port)?;
        writeln!(out, "Total Attempts: {}", stats.total_attempts)?;
        writeln!(out, "Unique Attackers: {}", stats.unique_ips.len())?;
        writeln!(out, "Unique Payloads: {}", stats.unique_payloads.len())?;
    }

    writeln!(out, "\nHourly Attack Distribution:")?;
    for (hour, count) in &analysis.hourly {
        writeln!(out, "Hour {:02}: {} attempts", hour, count)?;
    }

    writeln!(out, "\nAttacker Sophistication Analysis:")?;
    for (ip, stats) in &top_ips {
        writeln!(
            out,
            "IP {}: Sophistication Score {:.2}",
            ip,
            stats.sophistication()
        )?;
    }

    writeln!(out, "\nTop 10 Most Common Payloads:")?;
    for (payload, count) in analysis.top_payloads(10) {
        writeln!(out, "Count {}: {}", count, truncate_payload(payload))?;
    }

    Ok(())
}

/// Truncate a payload to the display limit, marking the cut with an
/// ellipsis. Counts characters, not bytes, so multi-byte text never splits.
fn truncate_payload(payload: &str) -> String {
    if payload.chars().count() > PAYLOAD_DISPLAY_LIMIT {
        let mut shown: String = payload.chars().take(PAYLOAD_DISPLAY_LIMIT).collect();
        shown.push_str("...");
        shown
    } else {
        payload.to_string()
    }
}

/// Render a span as `[Nd ]HH:MM:SS`.
fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}
