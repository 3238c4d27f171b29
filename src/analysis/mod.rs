//! Offline analysis of captured activity records.
//!
//! Streams a record file once and builds per-IP, per-port, hourly, and
//! payload aggregates. Lines that do not parse are skipped so a corrupt
//! tail never blocks analysis of the valid prefix. All collections grow
//! without eviction, which is fine for a bounded batch run.

pub mod report;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Timelike};
use tracing::warn;

use crate::store::ActivityRecord;

/// Everything observed about one source IP.
#[derive(Debug, Clone)]
pub struct IpProfile {
    pub total_attempts: u64,
    pub first_seen: DateTime<Local>,
    pub last_seen: DateTime<Local>,
    pub targeted_ports: HashSet<u16>,
    pub unique_payloads: HashSet<String>,
}

impl IpProfile {
    fn new(first_seen: DateTime<Local>) -> Self {
        Self {
            total_attempts: 0,
            first_seen,
            last_seen: first_seen,
            targeted_ports: HashSet::new(),
            unique_payloads: HashSet::new(),
        }
    }

    /// Heuristic score: port diversity weighted 0.4, payload diversity 0.6.
    pub fn sophistication(&self) -> f64 {
        self.targeted_ports.len() as f64 * 0.4 + self.unique_payloads.len() as f64 * 0.6
    }
}

/// Everything observed about one targeted port.
#[derive(Debug, Clone, Default)]
pub struct PortProfile {
    pub total_attempts: u64,
    pub unique_ips: HashSet<String>,
    pub unique_payloads: HashSet<String>,
}

#[derive(Debug, Clone)]
struct PayloadStat {
    count: u64,
    /// Sequence number of the record that first carried this payload,
    /// used to break frequency ties in file order.
    first_seen_seq: u64,
}

/// One timeline entry, retained in arrival order.
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Local>,
    pub ip: String,
    pub port: u16,
}

/// Aggregates built from one pass over a record file.
#[derive(Debug, Default)]
pub struct Analysis {
    pub ips: HashMap<String, IpProfile>,
    pub ports: HashMap<u16, PortProfile>,
    pub hourly: BTreeMap<u32, u64>,
    payloads: HashMap<String, PayloadStat>,
    pub timeline: Vec<TimelineEntry>,
    pub total_records: u64,
    pub skipped_lines: u64,
}

impl Analysis {
    /// Stream `path` once, skipping lines that are unreadable or fail to
    /// parse as records.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open record file {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut analysis = Analysis::default();
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => {
                    analysis.skipped_lines += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActivityRecord>(&line) {
                Ok(record) => analysis.observe(&record),
                Err(_) => analysis.skipped_lines += 1,
            }
        }

        if analysis.skipped_lines > 0 {
            warn!("Skipped {} malformed record lines", analysis.skipped_lines);
        }
        Ok(analysis)
    }

    /// Fold one record into every aggregate.
    pub fn observe(&mut self, record: &ActivityRecord) {
        let seq = self.total_records;
        self.total_records += 1;

        let trimmed = record.data.trim().to_string();

        let ip_profile = self
            .ips
            .entry(record.remote_ip.clone())
            .or_insert_with(|| IpProfile::new(record.timestamp));
        ip_profile.total_attempts += 1;
        ip_profile.last_seen = record.timestamp;
        ip_profile.targeted_ports.insert(record.port);
        ip_profile.unique_payloads.insert(trimmed.clone());

        *self.hourly.entry(record.timestamp.hour()).or_insert(0) += 1;

        let port_profile = self.ports.entry(record.port).or_default();
        port_profile.total_attempts += 1;
        port_profile.unique_ips.insert(record.remote_ip.clone());
        port_profile.unique_payloads.insert(trimmed.clone());

        // Empty payloads count toward the distinct sets above but not the
        // frequency table.
        if !trimmed.is_empty() {
            self.payloads
                .entry(trimmed)
                .and_modify(|stat| stat.count += 1)
                .or_insert(PayloadStat {
                    count: 1,
                    first_seen_seq: seq,
                });
        }

        self.timeline.push(TimelineEntry {
            timestamp: record.timestamp,
            ip: record.remote_ip.clone(),
            port: record.port,
        });
    }

    /// The `n` most active IPs: attempts descending, ties broken by
    /// first-seen ascending, then by IP for a stable report.
    pub fn top_ips(&self, n: usize) -> Vec<(&String, &IpProfile)> {
        let mut ranked: Vec<_> = self.ips.iter().collect();
        ranked.sort_by(|(a_ip, a), (b_ip, b)| {
            b.total_attempts
                .cmp(&a.total_attempts)
                .then(a.first_seen.cmp(&b.first_seen))
                .then(a_ip.cmp(b_ip))
        });
        ranked.truncate(n);
        ranked
    }

    /// All ports, attempts descending, ties by ascending port number.
    pub fn ports_by_attempts(&self) -> Vec<(u16, &PortProfile)> {
        let mut ranked: Vec<_> = self.ports.iter().map(|(p, s)| (*p, s)).collect();
        ranked.sort_by(|(a_port, a), (b_port, b)| {
            b.total_attempts
                .cmp(&a.total_attempts)
                .then(a_port.cmp(b_port))
        });
        ranked
    }

    /// The `n` most frequent payloads: count descending, ties broken by
    /// first appearance in the file.
    pub fn top_payloads(&self, n: usize) -> Vec<(&String, u64)> {
        let mut ranked: Vec<_> = self.payloads.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then(a.first_seen_seq.cmp(&b.first_seen_seq))
        });
        ranked.truncate(n);
        ranked.into_iter().map(|(p, stat)| (p, stat.count)).collect()
    }
}
