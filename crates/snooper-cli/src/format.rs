//! Human-readable rendering shared by the table output and the dashboard.

use snooper_core::{
    AcceleratorSample, IdentitySnapshot, LoadAverages, MemoryUsage, Snapshot, SystemMetrics,
    UsageReport,
};

/// Placeholder for a metric the host did not report.
pub const MISSING: &str = "—";

pub fn format_bytes(value: u64) -> String {
    let units = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut v = value as f64;
    let mut idx = 0usize;
    while v >= 1024.0 && idx < units.len() - 1 {
        v /= 1024.0;
        idx += 1;
    }
    if idx == 0 {
        format!("{value}B")
    } else {
        format!("{v:.2}{}", units[idx])
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{value:5.1}%")
}

/// `3d 04:05:06` style uptime.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let h = (seconds / 3600) % 24;
    let m = (seconds / 60) % 60;
    let s = seconds % 60;
    if days > 0 {
        format!("{days}d {h:02}:{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    }
}

pub fn format_load(load: Option<LoadAverages>) -> String {
    match load {
        Some(l) => format!("{:.2} {:.2} {:.2}", l.one, l.five, l.fifteen),
        None => MISSING.to_string(),
    }
}

pub fn format_memory(memory: Option<MemoryUsage>) -> String {
    let Some(m) = memory else {
        return MISSING.to_string();
    };
    let mut out = format!(
        "{} used / {} free",
        format_bytes(m.used_bytes),
        format_bytes(m.free_bytes)
    );
    if let Some(c) = m.compressed_bytes {
        out.push_str(&format!(" / {} compressed", format_bytes(c)));
    }
    out
}

pub fn format_gpu(gpu: &AcceleratorSample) -> String {
    let mut out = if gpu.available {
        format_percent(gpu.utilization_percent)
    } else {
        "   n/a".to_string()
    };
    if let Some(t) = gpu.thermal.temperature_celsius {
        out.push_str(&format!("  {t:.1}°C"));
    }
    if let Some(level) = gpu.thermal.pressure_level {
        out.push_str(&format!("  thermal {level}"));
    }
    out
}

/// One table line per snapshot.
pub fn snapshot_line(snap: &Snapshot) -> String {
    format!(
        "{}  cpu {} (usr {:.1} sys {:.1})  gpu {}  mem {}  load {}",
        snooper_core::time::format_iso8601_millis(snap.wall_time),
        format_percent(snap.cpu_used_percent),
        snap.cpu.user,
        snap.cpu.system,
        format_gpu(&snap.gpu),
        format_memory(snap.system.memory),
        format_load(snap.system.load),
    )
}

/// Overall line followed by one row per core.
pub fn usage_table(report: &UsageReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.core_count() + 2);
    lines.push(format!(
        "{}  overall  usr {}  sys {}  idle {}",
        snooper_core::time::format_iso8601_millis(report.wall_time),
        format_percent(report.overall.user),
        format_percent(report.overall.system),
        format_percent(report.overall.idle),
    ));
    for (i, core) in report.per_core.iter().enumerate() {
        lines.push(format!(
            "  core {i:>3}  usr {}  sys {}  idle {}",
            format_percent(core.user),
            format_percent(core.system),
            format_percent(core.idle),
        ));
    }
    lines
}

pub fn gpu_line(gpu: &AcceleratorSample) -> String {
    let source = gpu.source_key.as_deref().unwrap_or("no utilization key");
    format!("gpu {}  [{source}]", format_gpu(gpu))
}

/// Label/value pairs for an identity panel or table.
pub fn identity_rows(id: &IdentitySnapshot) -> Vec<(&'static str, String)> {
    vec![
        ("Model", id.model.to_string()),
        ("Architecture", id.architecture.to_string()),
        (
            "Cores",
            format!("{} physical / {} logical", id.physical_cores, id.logical_cores),
        ),
        ("Board ID", id.board_id.to_string()),
        ("Product", id.product_name.to_string()),
        ("Serial", id.serial_number.to_string()),
        ("Hardware UUID", id.hardware_uuid.to_string()),
    ]
}

pub fn system_rows(system: &SystemMetrics) -> Vec<(&'static str, String)> {
    vec![
        ("Memory", format_memory(system.memory)),
        ("Load", format_load(system.load)),
        (
            "Uptime",
            system
                .uptime_seconds
                .map_or_else(|| MISSING.to_string(), format_uptime),
        ),
        (
            "Processes",
            system
                .process_count
                .map_or_else(|| MISSING.to_string(), |n| n.to_string()),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use snooper_core::{IdentityField, ThermalReading};

    #[test]
    fn bytes_scale_by_1024() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(1536), "1.50KiB");
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.00GiB");
    }

    #[test]
    fn uptime_rolls_into_days() {
        assert_eq!(format_uptime(59), "00:00:59");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3600 + 5 * 60 + 6), "3d 04:05:06");
    }

    #[test]
    fn missing_metrics_are_not_zero() {
        let rows = system_rows(&SystemMetrics::default());
        assert!(rows.iter().all(|(_, v)| v == MISSING));
        assert_eq!(format_memory(None), MISSING);
    }

    #[test]
    fn unavailable_gpu_shows_thermal() {
        let gpu = AcceleratorSample {
            thermal: ThermalReading {
                available: true,
                temperature_celsius: Some(47.5),
                pressure_level: Some(1),
            },
            ..AcceleratorSample::unavailable()
        };
        assert_eq!(format_gpu(&gpu), "   n/a  47.5°C  thermal 1");
        assert_eq!(gpu_line(&gpu), "gpu    n/a  47.5°C  thermal 1  [no utilization key]");
    }

    #[test]
    fn identity_rows_show_placeholder() {
        let id = IdentitySnapshot {
            model: "Intel(R) Core(TM) i9-9980HK".into(),
            architecture: "x86_64".into(),
            physical_cores: 8,
            logical_cores: 16,
            board_id: IdentityField::Unavailable,
            product_name: IdentityField::Unavailable,
            serial_number: "****1234".into(),
            hardware_uuid: IdentityField::Unavailable,
        };
        let rows = identity_rows(&id);
        assert_eq!(rows[2].1, "8 physical / 16 logical");
        assert_eq!(rows[3].1, snooper_core::identity::UNAVAILABLE);
        assert_eq!(rows[5].1, "****1234");
    }
}
