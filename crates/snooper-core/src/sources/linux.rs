//! procfs / sysfs readers.
//!
//! Every reader resolves paths under a filesystem root (`/` by default) so it
//! can be pointed at a fixture tree.

use std::path::{Path, PathBuf};

use crate::accelerator::{AcceleratorStats, StatValue, TEMPERATURE_KEY};
use crate::cpu::{CoreTicks, TickSample};
use crate::error::{Result, SnoopError};
use crate::identity::{IdentityField, IdentitySnapshot};
use crate::metrics::{LoadAverages, SystemMetrics, parse_meminfo};

use super::helpers::{read_first_f64, read_trimmed};
use super::{AcceleratorStatsSource, IdentitySource, SystemMetricsSource, TickSource};

/// DRM key for the amdgpu / i915 busy percentage.
pub const GPU_BUSY_KEY: &str = "gpu_busy_percent";

fn default_root() -> PathBuf {
    PathBuf::from("/")
}

/// Per-core ticks from `/proc/stat`.
#[derive(Debug, Clone)]
pub struct ProcStatTicks {
    root: PathBuf,
}

impl Default for ProcStatTicks {
    fn default() -> Self {
        Self::with_root(default_root())
    }
}

impl ProcStatTicks {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TickSource for ProcStatTicks {
    fn read(&self) -> Result<TickSample> {
        let raw = std::fs::read_to_string(self.root.join("proc/stat"))?;
        let cores = parse_proc_stat(&raw);
        if cores.is_empty() {
            return Err(SnoopError::unavailable("no per-cpu lines in /proc/stat"));
        }
        TickSample::now(cores)
    }
}

/// `cpuN` lines of `/proc/stat`, in file order.
///
/// Columns are `user nice system idle iowait ...`; iowait counts as idle.
pub fn parse_proc_stat(raw: &str) -> Vec<CoreTicks> {
    raw.lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("cpu")?;
            if !rest.starts_with(|c: char| c.is_ascii_digit()) {
                return None;
            }
            let cols: Vec<u64> = rest
                .split_whitespace()
                .skip(1)
                .map_while(|v| v.parse::<u64>().ok())
                .collect();
            if cols.len() < 4 {
                return None;
            }
            let iowait = cols.get(4).copied().unwrap_or(0);
            Some(CoreTicks::new(
                cols[0],
                cols[2],
                cols[3].saturating_add(iowait),
                cols[1],
            ))
        })
        .collect()
}

/// DRM busy percentage and hwmon temperature from the first GPU card.
#[derive(Debug, Clone)]
pub struct DrmAccelerator {
    root: PathBuf,
}

impl Default for DrmAccelerator {
    fn default() -> Self {
        Self::with_root(default_root())
    }
}

impl DrmAccelerator {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `cardN` device directories, sorted by card number. Connector entries
    /// such as `card0-HDMI-A-1` are skipped.
    fn card_devices(&self) -> Result<Vec<PathBuf>> {
        let drm = self.root.join("sys/class/drm");
        let mut cards: Vec<(u32, PathBuf)> = std::fs::read_dir(&drm)
            .map_err(|e| SnoopError::unavailable(format!("{}: {e}", drm.display())))?
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let index = name.to_str()?.strip_prefix("card")?.parse::<u32>().ok()?;
                Some((index, entry.path().join("device")))
            })
            .collect();
        cards.sort_by_key(|(index, _)| *index);
        Ok(cards.into_iter().map(|(_, path)| path).collect())
    }
}

fn hwmon_temperature(device: &Path) -> Option<f64> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(device.join("hwmon"))
        .ok()?
        .flatten()
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs.iter()
        .find_map(|dir| read_first_f64(&dir.join("temp1_input")))
        .map(|millidegrees| millidegrees / 1000.0)
}

impl AcceleratorStatsSource for DrmAccelerator {
    fn read(&self) -> Result<AcceleratorStats> {
        let mut stats = AcceleratorStats::new();
        for device in self.card_devices()? {
            let busy = read_trimmed(&device.join(GPU_BUSY_KEY)).and_then(|v| v.parse::<i64>().ok());
            let temperature = hwmon_temperature(&device);
            if busy.is_none() && temperature.is_none() {
                continue;
            }
            if let Some(busy) = busy {
                stats.insert(GPU_BUSY_KEY.to_string(), StatValue::Integer(busy));
            }
            if let Some(t) = temperature {
                stats.insert(TEMPERATURE_KEY.to_string(), StatValue::Float(t));
            }
            break;
        }
        Ok(stats)
    }
}

/// Identity from `/proc/cpuinfo` and DMI.
#[derive(Debug, Clone)]
pub struct LinuxIdentity {
    root: PathBuf,
}

impl Default for LinuxIdentity {
    fn default() -> Self {
        Self::with_root(default_root())
    }
}

impl LinuxIdentity {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dmi(&self, name: &str) -> IdentityField {
        IdentityField::from_option(read_trimmed(&self.root.join("sys/class/dmi/id").join(name)))
    }
}

/// CPU model and core topology parsed from `/proc/cpuinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuInfo {
    pub model: Option<String>,
    pub physical_cores: u32,
    pub logical_cores: u32,
}

pub fn parse_cpuinfo(raw: &str) -> CpuInfo {
    let mut model = None;
    let mut logical = 0u32;
    let mut cores = std::collections::BTreeSet::new();
    let mut physical_id = None;

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "processor" => logical += 1,
            "model name" | "Model" | "cpu model" if model.is_none() && !value.is_empty() => {
                model = Some(value.to_string());
            }
            "physical id" => physical_id = value.parse::<u32>().ok(),
            "core id" => {
                if let Ok(core) = value.parse::<u32>() {
                    cores.insert((physical_id.unwrap_or(0), core));
                }
            }
            _ => {}
        }
    }

    let physical = if cores.is_empty() {
        logical
    } else {
        cores.len() as u32
    };
    CpuInfo {
        model,
        physical_cores: physical,
        logical_cores: logical,
    }
}

impl IdentitySource for LinuxIdentity {
    fn read(&self) -> Result<IdentitySnapshot> {
        let raw = std::fs::read_to_string(self.root.join("proc/cpuinfo"))?;
        let info = parse_cpuinfo(&raw);
        if info.logical_cores == 0 {
            return Err(SnoopError::unavailable("no processors listed in /proc/cpuinfo"));
        }
        Ok(IdentitySnapshot {
            model: IdentityField::from_option(info.model),
            architecture: std::env::consts::ARCH.into(),
            physical_cores: info.physical_cores,
            logical_cores: info.logical_cores,
            board_id: self.dmi("board_name"),
            product_name: self.dmi("product_name"),
            serial_number: self.dmi("product_serial"),
            hardware_uuid: self.dmi("product_uuid"),
        })
    }
}

/// Memory, load, uptime and process count from procfs.
#[derive(Debug, Clone)]
pub struct LinuxSystemMetrics {
    root: PathBuf,
}

impl Default for LinuxSystemMetrics {
    fn default() -> Self {
        Self::with_root(default_root())
    }
}

impl LinuxSystemMetrics {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn proc(&self) -> PathBuf {
        self.root.join("proc")
    }

    fn load(&self) -> Option<LoadAverages> {
        let raw = std::fs::read_to_string(self.proc().join("loadavg")).ok()?;
        let mut it = raw.split_whitespace().map(|v| v.parse::<f64>().ok());
        Some(LoadAverages {
            one: it.next()??,
            five: it.next()??,
            fifteen: it.next()??,
        })
    }

    fn process_count(&self) -> Option<u32> {
        let entries = std::fs::read_dir(self.proc()).ok()?;
        let n = entries
            .flatten()
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
            })
            .count();
        u32::try_from(n).ok()
    }
}

impl SystemMetricsSource for LinuxSystemMetrics {
    fn read(&self) -> SystemMetrics {
        let proc = self.proc();
        SystemMetrics {
            memory: std::fs::read_to_string(proc.join("meminfo"))
                .ok()
                .and_then(|raw| parse_meminfo(&raw)),
            load: self.load(),
            uptime_seconds: read_first_f64(&proc.join("uptime"))
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64),
            process_count: self.process_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PROC_STAT: &str = "\
cpu  4705 356 584 3699 23 23 0 0 0 0
cpu0 1393280 32966 572056 13343292 6130 0 17875 0 0 0
cpu1 1335 12 444 1000 5 0 0 0 0 0
intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
ctxt 1990473
";

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn proc_stat_skips_aggregate_line() {
        let cores = parse_proc_stat(PROC_STAT);
        assert_eq!(cores.len(), 2);
        assert_eq!(cores[0], CoreTicks::new(1_393_280, 572_056, 13_349_422, 32_966));
        assert_eq!(cores[1], CoreTicks::new(1335, 444, 1005, 12));
    }

    #[test]
    fn proc_stat_ignores_short_lines() {
        assert!(parse_proc_stat("cpu0 1 2\ncpufreq 1 2 3 4\n").is_empty());
    }

    #[test]
    fn tick_source_reads_fixture() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "proc/stat", PROC_STAT);
        let sample = ProcStatTicks::with_root(dir.path()).read().unwrap();
        assert_eq!(sample.core_count(), 2);
    }

    #[test]
    fn tick_source_without_cores_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "proc/stat", "cpu  1 2 3 4\n");
        assert!(matches!(
            ProcStatTicks::with_root(dir.path()).read(),
            Err(SnoopError::Unavailable(_))
        ));
    }

    #[test]
    fn snapshot_without_cores_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "proc/stat", "cpu  1 2 3 4\n");
        let sources = crate::sources::Sources {
            ticks: Box::new(ProcStatTicks::with_root(dir.path())),
            accelerator: Box::new(crate::sources::Unsupported),
            identity: Box::new(crate::sources::Unsupported),
            system: Box::new(crate::sources::Unsupported),
        };
        let mut orch =
            crate::TelemetryOrchestrator::new(crate::TelemetryConfig::default(), sources);
        assert!(matches!(
            orch.collect_snapshot(),
            Err(SnoopError::Unavailable(_))
        ));
    }

    #[test]
    fn missing_proc_stat_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProcStatTicks::with_root(dir.path()).read(),
            Err(SnoopError::Unavailable(_))
        ));
    }

    #[test]
    fn drm_reads_busy_and_temperature() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sys/class/drm/card0-HDMI-A-1/status", "connected\n");
        write(dir.path(), "sys/class/drm/card1/device/gpu_busy_percent", "37\n");
        write(
            dir.path(),
            "sys/class/drm/card1/device/hwmon/hwmon3/temp1_input",
            "52000\n",
        );
        let stats = DrmAccelerator::with_root(dir.path()).read().unwrap();
        assert_eq!(stats.get(GPU_BUSY_KEY), Some(&StatValue::Integer(37)));
        assert_eq!(stats.get(TEMPERATURE_KEY), Some(&StatValue::Float(52.0)));
    }

    #[test]
    fn drm_without_counters_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sys/class/drm/card0/device/vendor", "0x1234\n");
        let stats = DrmAccelerator::with_root(dir.path()).read().unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn drm_missing_class_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DrmAccelerator::with_root(dir.path()).read().is_err());
    }

    #[test]
    fn cpuinfo_counts_topology() {
        let raw = "\
processor\t: 0
model name\t: AMD Ryzen 7 5800X 8-Core Processor
physical id\t: 0
core id\t\t: 0

processor\t: 1
model name\t: AMD Ryzen 7 5800X 8-Core Processor
physical id\t: 0
core id\t\t: 0

processor\t: 2
physical id\t: 0
core id\t\t: 1
";
        let info = parse_cpuinfo(raw);
        assert_eq!(info.model.as_deref(), Some("AMD Ryzen 7 5800X 8-Core Processor"));
        assert_eq!(info.logical_cores, 3);
        assert_eq!(info.physical_cores, 2);
    }

    #[test]
    fn cpuinfo_without_topology_uses_logical() {
        let info = parse_cpuinfo("processor : 0\nprocessor : 1\nModel : Raspberry Pi 4\n");
        assert_eq!(info.physical_cores, 2);
        assert_eq!(info.model.as_deref(), Some("Raspberry Pi 4"));
    }

    #[test]
    fn identity_reads_dmi_fields() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "proc/cpuinfo", "processor : 0\nmodel name : Test CPU\n");
        write(dir.path(), "sys/class/dmi/id/board_name", "X570 AORUS\n");
        write(dir.path(), "sys/class/dmi/id/product_serial", "SN1234567890\n");
        let id = LinuxIdentity::with_root(dir.path()).read().unwrap();
        assert_eq!(id.model.as_deref(), Some("Test CPU"));
        assert_eq!(id.board_id.as_deref(), Some("X570 AORUS"));
        assert_eq!(id.product_name, IdentityField::Unavailable);
        assert_eq!(id.logical_cores, 1);

        let masked = LinuxIdentity::with_root(dir.path()).read_with_policy(false).unwrap();
        assert_eq!(masked.serial_number.as_deref(), Some("********7890"));
    }

    #[test]
    fn identity_without_processors_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "proc/cpuinfo", "\n");
        assert!(matches!(
            LinuxIdentity::with_root(dir.path()).read(),
            Err(SnoopError::Unavailable(_))
        ));
    }

    #[test]
    fn system_metrics_from_fixture() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "proc/meminfo", "MemTotal: 1000 kB\nMemFree: 100 kB\nMemAvailable: 400 kB\n");
        write(dir.path(), "proc/loadavg", "0.52 0.58 0.59 1/389 12345\n");
        write(dir.path(), "proc/uptime", "3600.75 7000.00\n");
        write(dir.path(), "proc/1/stat", "");
        write(dir.path(), "proc/42/stat", "");
        write(dir.path(), "proc/self/stat", "");
        let m = LinuxSystemMetrics::with_root(dir.path()).read();
        assert_eq!(m.memory.map(|m| m.used_bytes), Some(600 * 1024));
        assert_eq!(m.load.map(|l| l.fifteen), Some(0.59));
        assert_eq!(m.uptime_seconds, Some(3600));
        assert_eq!(m.process_count, Some(2));
    }

    #[test]
    fn system_metrics_missing_files_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let m = LinuxSystemMetrics::with_root(dir.path()).read();
        assert!(m.memory.is_none());
        assert!(m.load.is_none());
        assert!(m.uptime_seconds.is_none());
        assert!(m.process_count.is_none());
    }
}
