//! Best-effort host metrics carried alongside each snapshot.
//!
//! Every group is independently optional. `None` means the host did not
//! report it and serialises as `null`; it is never rendered as zero.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub free_bytes: u64,
    /// Only reported by hosts with a memory compressor.
    pub compressed_bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadAverages {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl From<(f64, f64, f64)> for LoadAverages {
    fn from((one, five, fifteen): (f64, f64, f64)) -> Self {
        Self { one, five, fifteen }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub memory: Option<MemoryUsage>,
    pub load: Option<LoadAverages>,
    pub uptime_seconds: Option<u64>,
    pub process_count: Option<u32>,
}

impl SystemMetrics {
    pub fn is_empty(&self) -> bool {
        self.memory.is_none()
            && self.load.is_none()
            && self.uptime_seconds.is_none()
            && self.process_count.is_none()
    }
}

/// `vm_stat` prints counts like `12345.` or `1,234`.
fn parse_vm_stat_value(raw: &str) -> Option<u64> {
    let cleaned = raw.replace(['.', ','], "");
    cleaned.split_whitespace().next()?.parse::<u64>().ok()
}

/// Memory usage from `vm_stat` output.
///
/// Used is active + inactive + wired + speculative pages. The page size is
/// taken from the header line, defaulting to 4096.
pub fn parse_vm_stat(output: &str) -> Option<MemoryUsage> {
    let mut page_size = 4096_u64;
    let mut used = 0_u64;
    let mut free = None;
    let mut compressed = None;
    let mut seen_used = false;

    for line in output.lines() {
        if line.contains("page size of")
            && let Some(ps) = line
                .split("page size of")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.parse::<u64>().ok())
        {
            page_size = ps;
            continue;
        }
        let Some((raw_key, raw_value)) = line.split_once(':') else {
            continue;
        };
        let Some(pages) = parse_vm_stat_value(raw_value) else {
            continue;
        };
        match raw_key.trim().trim_matches('"') {
            "Pages active" | "Pages inactive" | "Pages wired down" | "Pages speculative" => {
                used = used.saturating_add(pages);
                seen_used = true;
            }
            "Pages free" => free = Some(pages),
            "Pages occupied by compressor" => compressed = Some(pages),
            _ => {}
        }
    }

    if !seen_used {
        return None;
    }
    Some(MemoryUsage {
        used_bytes: used.saturating_mul(page_size),
        free_bytes: free.unwrap_or(0).saturating_mul(page_size),
        compressed_bytes: compressed.map(|p| p.saturating_mul(page_size)),
    })
}

/// Memory usage from `/proc/meminfo`: used = MemTotal − MemAvailable.
pub fn parse_meminfo(raw: &str) -> Option<MemoryUsage> {
    let mut total = None;
    let mut available = None;
    let mut free = None;

    for line in raw.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kib) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        let bytes = kib.saturating_mul(1024);
        match key {
            "MemTotal" => total = Some(bytes),
            "MemAvailable" => available = Some(bytes),
            "MemFree" => free = Some(bytes),
            _ => {}
        }
    }

    let total = total?;
    let available = available.or(free)?;
    Some(MemoryUsage {
        used_bytes: total.saturating_sub(available),
        free_bytes: free.unwrap_or(available),
        compressed_bytes: None,
    })
}

/// Boot time in unix seconds from `sysctl -n kern.boottime`
/// (`{ sec = 1700000000, usec = 12345 } Tue Nov 14 ...`).
pub fn parse_boottime(raw: &str) -> Option<u64> {
    let rest = raw.split("sec =").nth(1)?;
    rest.trim()
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse::<u64>()
        .ok()
}
