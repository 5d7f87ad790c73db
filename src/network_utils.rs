// Internet Watcher - Network Utilities
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Command and sysfs helpers used by the facts providers.
//!
//! Parsers are pure functions over command output so they can be tested
//! without NetworkManager. The readers around them never fail: anything
//! that cannot be obtained comes back as `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::models::{ConnectionCategory, ConnectionState, Error, QualityMetrics, Result};

/// `time=12.3 ms` or `time<1 ms` in ping output.
static PING_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").expect("valid regex"));

/// Bound for a single ping round trip, including process startup.
const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Root of the kernel power supply class.
const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

/// Run a command and return its stdout, failing on non-zero exit or timeout.
pub async fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String> {
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(|e| Error::command_failed(program, e.to_string()))?,
        Err(_) => return Err(Error::CommandTimeout(format!("{} {}", program, args.join(" ")))),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::command_failed(
            program,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Split one line of `nmcli -t` output, honouring `\:` and `\\` escapes.
pub fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    field.push(escaped);
                }
            }
            ':' => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Parse `nmcli -t -f TYPE,NAME connection show --active`.
///
/// Returns the active categories and the first connection name per category.
pub fn parse_active_connections(
    output: &str,
) -> (ConnectionState, BTreeMap<ConnectionCategory, String>) {
    let mut identifiers = BTreeMap::new();
    let mut categories = Vec::new();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let fields = split_terse(line.trim_end());
        let Some(category) = fields.first().and_then(|t| ConnectionCategory::from_nm_type(t)) else {
            continue;
        };
        categories.push(category);
        if let Some(name) = fields.get(1).filter(|n| !n.is_empty()) {
            identifiers.entry(category).or_insert_with(|| name.clone());
        }
    }

    (categories.into_iter().collect(), identifiers)
}

/// Parse `nmcli -t -f IN-USE,SIGNAL,RATE,SSID dev wifi` for the in-use line.
///
/// A rate of zero means the driver did not report one.
pub fn parse_wifi_quality(output: &str) -> Option<QualityMetrics> {
    output.lines().find_map(|line| {
        let fields = split_terse(line.trim_end());
        if fields.len() < 4 || fields[0] != "*" {
            return None;
        }

        let signal_strength = fields[1].trim().parse::<u8>().ok().map(|s| s.min(100));
        let max_bitrate_mbps = fields[2]
            .split_whitespace()
            .next()
            .and_then(|rate| rate.parse::<f64>().ok())
            .map(|rate| rate as u32)
            .filter(|rate| *rate > 0);

        Some(QualityMetrics {
            signal_strength,
            max_bitrate_mbps,
            latency_ms: None,
        })
    })
}

/// Extract the round-trip time from `ping -c 1` output.
pub fn parse_ping_latency(output: &str) -> Option<f64> {
    PING_TIME
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a sysfs `capacity` file.
pub fn parse_battery_capacity(content: &str) -> Option<f64> {
    content
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|pct| (0.0..=100.0).contains(pct))
}

/// Ping `host` once and return the latency in milliseconds.
pub async fn ping_latency(host: &str) -> Option<f64> {
    match run_command("ping", &["-c", "1", "-W", "1", host], PING_TIMEOUT).await {
        Ok(output) => parse_ping_latency(&output),
        Err(e) => {
            debug!("Ping to {} failed: {}", host, e);
            None
        }
    }
}

/// Average charge of all batteries under `/sys/class/power_supply`.
pub fn read_battery_percent() -> Option<f64> {
    read_battery_percent_from(Path::new(POWER_SUPPLY_PATH))
}

fn read_battery_percent_from(root: &Path) -> Option<f64> {
    let entries = fs::read_dir(root).ok()?;
    let readings: Vec<f64> = entries
        .flatten()
        .filter(|entry| {
            fs::read_to_string(entry.path().join("type"))
                .map(|t| t.trim() == "Battery")
                .unwrap_or(false)
        })
        .filter_map(|entry| {
            fs::read_to_string(entry.path().join("capacity"))
                .ok()
                .and_then(|c| parse_battery_capacity(&c))
        })
        .collect();

    if readings.is_empty() {
        None
    } else {
        Some(readings.iter().sum::<f64>() / readings.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_terse_escapes() {
        assert_eq!(split_terse("802-11-wireless:Cafe\\: Guest"), vec!["802-11-wireless", "Cafe: Guest"]);
        assert_eq!(split_terse("a\\\\b:c"), vec!["a\\b", "c"]);
        assert_eq!(split_terse("*:72::"), vec!["*", "72", "", ""]);
    }

    #[test]
    fn test_parse_active_connections() {
        let output = "802-3-ethernet:Wired connection 1\n\
                      802-11-wireless:HomeNet\n\
                      gsm:Carrier LTE\n\
                      loopback:lo\n";
        let (state, ids) = parse_active_connections(output);

        assert!(state.contains(ConnectionCategory::Wifi));
        assert!(state.contains(ConnectionCategory::Mobile));
        assert_eq!(ids.get(&ConnectionCategory::Wifi).map(String::as_str), Some("HomeNet"));
        assert_eq!(ids.get(&ConnectionCategory::Mobile).map(String::as_str), Some("Carrier LTE"));
    }

    #[test]
    fn test_parse_active_connections_empty() {
        let (state, ids) = parse_active_connections("");
        assert!(state.is_empty());
        assert!(ids.is_empty());
    }

    #[test]
    fn test_parse_wifi_quality() {
        let output = " :40:130 Mbit/s:Neighbour\n*:72:270 Mbit/s:HomeNet\n";
        let metrics = parse_wifi_quality(output).unwrap();
        assert_eq!(metrics.signal_strength, Some(72));
        assert_eq!(metrics.max_bitrate_mbps, Some(270));
        assert_eq!(metrics.latency_ms, None);
    }

    #[test]
    fn test_parse_wifi_quality_zero_rate_is_unknown() {
        let metrics = parse_wifi_quality("*:55:0 Mbit/s:Phone\n").unwrap();
        assert_eq!(metrics.signal_strength, Some(55));
        assert_eq!(metrics.max_bitrate_mbps, None);
    }

    #[test]
    fn test_parse_wifi_quality_not_connected() {
        assert!(parse_wifi_quality(" :40:130 Mbit/s:Neighbour\n").is_none());
    }

    #[test]
    fn test_parse_ping_latency() {
        let output = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.\n\
                      64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.4 ms\n";
        assert_eq!(parse_ping_latency(output), Some(12.4));
        assert_eq!(parse_ping_latency("64 bytes from ::1: time<1 ms"), Some(1.0));
        assert_eq!(parse_ping_latency("1 packets transmitted, 0 received"), None);
    }

    #[test]
    fn test_parse_battery_capacity() {
        assert_eq!(parse_battery_capacity("87\n"), Some(87.0));
        assert_eq!(parse_battery_capacity("garbage"), None);
        assert_eq!(parse_battery_capacity("250"), None);
    }

    #[test]
    fn test_read_battery_from_sysfs_tree() {
        let root = tempfile::tempdir().unwrap();
        for (name, kind, capacity) in [("BAT0", "Battery", "40"), ("BAT1", "Battery", "60"), ("AC", "Mains", "")] {
            let dir = root.path().join(name);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("type"), format!("{}\n", kind)).unwrap();
            if !capacity.is_empty() {
                fs::write(dir.join("capacity"), capacity).unwrap();
            }
        }
        assert_eq!(read_battery_percent_from(root.path()), Some(50.0));
    }

    #[test]
    fn test_no_battery_is_unknown() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(read_battery_percent_from(root.path()), None);
    }
}
