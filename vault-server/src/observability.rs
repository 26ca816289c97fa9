//! C8 observability: `/health`, `/health/ready`, `/health/live`, `/metrics`,
//! `/status`. Adapted from the original `monitoring.py`'s `HealthChecker`:
//! four independent checks (keys, memory, cpu, disk), aggregated to a single
//! overall status, with the last result cached for `/status` so it doesn't
//! re-run expensive checks on every poll.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;
use sysinfo::{Disks, System};

const DEGRADED_THRESHOLD: f32 = 80.0;
const UNHEALTHY_THRESHOLD: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub status: Status,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub overall: Status,
    pub checks: HashMap<String, Check>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl CheckReport {
    fn aggregate(checks: HashMap<String, Check>) -> Self {
        let overall = if checks.values().any(|c| c.status == Status::Unhealthy) {
            Status::Unhealthy
        } else if checks.values().any(|c| matches!(c.status, Status::Degraded | Status::Unknown)) {
            Status::Degraded
        } else {
            Status::Healthy
        };
        Self { overall, checks, checked_at: chrono::Utc::now() }
    }
}

pub struct HealthChecker {
    key_dir: PathBuf,
    started_at: Instant,
    started_at_utc: chrono::DateTime<chrono::Utc>,
    last: Mutex<Option<CheckReport>>,
}

impl HealthChecker {
    pub fn new(key_dir: PathBuf) -> Self {
        Self { key_dir, started_at: Instant::now(), started_at_utc: chrono::Utc::now(), last: Mutex::new(None) }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_utc(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at_utc
    }

    /// Runs every check fresh and caches the result for `last_report`.
    pub fn run_checks(&self) -> CheckReport {
        let mut checks = HashMap::new();
        checks.insert("keys".to_string(), self.check_keys());
        checks.insert("memory".to_string(), self.check_memory());
        checks.insert("cpu".to_string(), self.check_cpu());
        checks.insert("disk".to_string(), self.check_disk());

        let report = CheckReport::aggregate(checks);
        metrics::gauge!("vault_health_status").set(status_gauge_value(report.overall));
        metrics::gauge!("vault_uptime_seconds").set(self.uptime_seconds() as f64);
        *self.last.lock().expect("health checker mutex poisoned") = Some(report.clone());
        report
    }

    pub fn last_report(&self) -> Option<CheckReport> {
        self.last.lock().expect("health checker mutex poisoned").clone()
    }

    fn check_keys(&self) -> Check {
        let required = ["EncKey", "SecKey", "EvalKey"];
        let missing: Vec<&str> = required.iter().copied().filter(|name| !self.key_dir.join(name).exists()).collect();

        if missing.contains(&"SecKey") {
            return Check { status: Status::Unhealthy, message: "SecKey missing: decrypt_scores cannot run".to_string() };
        }
        if !missing.is_empty() {
            return Check { status: Status::Degraded, message: format!("missing key files: {}", missing.join(", ")) };
        }
        let metadata_note = if self.key_dir.join("MetadataKey").exists() { "present" } else { "absent" };
        Check { status: Status::Healthy, message: format!("all required keys present; MetadataKey {metadata_note}") }
    }

    fn check_memory(&self) -> Check {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Check { status: Status::Unknown, message: "could not read memory usage".to_string() };
        }
        let used_pct = (sys.used_memory() as f32 / total as f32) * 100.0;
        metrics::gauge!("vault_memory_usage_bytes").set(sys.used_memory() as f64);
        threshold_check(used_pct, "memory")
    }

    fn check_cpu(&self) -> Check {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();
        let usage = sys.global_cpu_usage();
        metrics::gauge!("vault_cpu_usage_percent").set(usage as f64);
        threshold_check(usage, "cpu")
    }

    fn check_disk(&self) -> Check {
        let disks = Disks::new_with_refreshed_list();
        let Some(disk) = disks.iter().max_by_key(|d| d.total_space()) else {
            return Check { status: Status::Unknown, message: "no disks reported".to_string() };
        };
        let total = disk.total_space();
        if total == 0 {
            return Check { status: Status::Unknown, message: "could not read disk usage".to_string() };
        }
        let used_pct = ((total - disk.available_space()) as f32 / total as f32) * 100.0;
        threshold_check(used_pct, "disk")
    }
}

fn threshold_check(used_pct: f32, label: &str) -> Check {
    if used_pct >= UNHEALTHY_THRESHOLD {
        Check { status: Status::Unhealthy, message: format!("{label} usage {used_pct:.1}% >= {UNHEALTHY_THRESHOLD}%") }
    } else if used_pct >= DEGRADED_THRESHOLD {
        Check { status: Status::Degraded, message: format!("{label} usage {used_pct:.1}% >= {DEGRADED_THRESHOLD}%") }
    } else {
        Check { status: Status::Healthy, message: format!("{label} usage {used_pct:.1}%") }
    }
}

fn status_gauge_value(status: Status) -> f64 {
    match status {
        Status::Healthy => 1.0,
        Status::Degraded => 0.5,
        Status::Unknown => 0.5,
        Status::Unhealthy => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sec_key_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let checker = HealthChecker::new(dir.path().to_path_buf());
        assert_eq!(checker.check_keys().status, Status::Unhealthy);
    }

    #[test]
    fn missing_eval_key_only_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("EncKey"), b"x").unwrap();
        std::fs::write(dir.path().join("SecKey"), b"x").unwrap();
        let checker = HealthChecker::new(dir.path().to_path_buf());
        assert_eq!(checker.check_keys().status, Status::Degraded);
    }

    #[test]
    fn all_required_keys_present_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["EncKey", "SecKey", "EvalKey"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let checker = HealthChecker::new(dir.path().to_path_buf());
        assert_eq!(checker.check_keys().status, Status::Healthy);
    }

    #[test]
    fn aggregate_prefers_unhealthy_over_degraded() {
        let mut checks = HashMap::new();
        checks.insert("a".to_string(), Check { status: Status::Degraded, message: String::new() });
        checks.insert("b".to_string(), Check { status: Status::Unhealthy, message: String::new() });
        assert_eq!(CheckReport::aggregate(checks).overall, Status::Unhealthy);
    }

    #[test]
    fn aggregate_is_healthy_only_when_everything_is() {
        let mut checks = HashMap::new();
        checks.insert("a".to_string(), Check { status: Status::Healthy, message: String::new() });
        checks.insert("b".to_string(), Check { status: Status::Healthy, message: String::new() });
        assert_eq!(CheckReport::aggregate(checks).overall, Status::Healthy);
    }
}
