//! Shared low-level readers used by the platform sources.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

use crate::accelerator::StatValue;

/// Upper bound for a helper process (`sysctl`, `ioreg`, `vm_stat`, `ps`).
const COMMAND_TIMEOUT: Duration = Duration::from_millis(400);

/// Run a command and return trimmed stdout, or `None` on failure, non-zero
/// exit, empty output or timeout.
pub fn run_command(cmd: &str, args: &[&str]) -> Option<String> {
    let mut child = std::process::Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    // Drain stdout on a helper thread so a chatty child cannot block on a
    // full pipe while we poll for exit.
    let mut stdout = child.stdout.take()?;
    let reader = std::thread::spawn(move || {
        let mut out = Vec::new();
        let _ = stdout.read_to_end(&mut out);
        out
    });

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let out = reader.join().ok()?;
                if !status.success() {
                    return None;
                }
                let s = String::from_utf8_lossy(&out).trim().to_string();
                return if s.is_empty() { None } else { Some(s) };
            }
            Ok(None) => {
                if start.elapsed() >= COMMAND_TIMEOUT {
                    log::debug!("{cmd} timed out after {COMMAND_TIMEOUT:?}");
                    abandon(&mut child);
                    return None;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => {
                log::debug!("waiting on {cmd} failed: {e}");
                abandon(&mut child);
                return None;
            }
        }
    }
}

/// Kill and reap a child we no longer wait for.
fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

pub fn read_sysctl(key: &str) -> Option<String> {
    run_command("sysctl", &["-n", key])
}

pub fn read_trimmed(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let v = raw.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

pub fn read_first_f64(path: &Path) -> Option<f64> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.split_whitespace().next().and_then(|v| v.parse().ok()))
}

/// 1/5/15 minute load averages, all three or none.
pub fn load_averages() -> Option<(f64, f64, f64)> {
    #[cfg(unix)]
    {
        let mut values = [0.0_f64; 3];
        // SAFETY: `getloadavg` writes up to `n` doubles to a valid buffer.
        let n = unsafe { libc::getloadavg(values.as_mut_ptr(), 3) };
        (n == 3).then_some((values[0], values[1], values[2]))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Parse every `"key"=value` pair inside the `{...}` dictionary that follows
/// `"dict_name" =` in `ioreg` output.
///
/// Numbers become [`StatValue::Integer`] or [`StatValue::Float`], quoted strings
/// become [`StatValue::Text`], `Yes`/`No` become [`StatValue::Bool`]. Nested
/// dictionaries and arrays are skipped.
pub fn parse_ioreg_dictionary(output: &str, dict_name: &str) -> BTreeMap<String, StatValue> {
    let mut map = BTreeMap::new();
    let marker = format!("\"{dict_name}\"");

    for line in output.lines() {
        let Some(pos) = line.find(&marker) else {
            continue;
        };
        let rest = &line[pos + marker.len()..];
        let Some(open) = rest.find('{') else {
            continue;
        };
        let Some(close) = rest.rfind('}') else {
            continue;
        };
        if close <= open {
            continue;
        }
        extract_quoted_pairs(&rest[open + 1..close], &mut map);
        break;
    }

    map
}

fn extract_quoted_pairs(s: &str, map: &mut BTreeMap<String, StatValue>) {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    let mut depth = 0usize;

    while i < len {
        match bytes[i] {
            b'{' | b'(' => {
                depth += 1;
                i += 1;
                continue;
            }
            b'}' | b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
                continue;
            }
            b'"' if depth == 0 => {}
            _ => {
                i += 1;
                continue;
            }
        }

        let key_start = i + 1;
        let Some(key_len) = s[key_start..].find('"') else {
            break;
        };
        let key_end = key_start + key_len;
        let key = &s[key_start..key_end];

        let mut j = key_end + 1;
        while j < len && bytes[j] == b' ' {
            j += 1;
        }
        if j >= len || bytes[j] != b'=' {
            i = key_end + 1;
            continue;
        }
        j += 1;
        while j < len && bytes[j] == b' ' {
            j += 1;
        }

        if j < len && bytes[j] == b'"' {
            let Some(val_len) = s[j + 1..].find('"') else {
                break;
            };
            map.insert(
                key.to_string(),
                StatValue::Text(s[j + 1..j + 1 + val_len].to_string()),
            );
            i = j + val_len + 2;
            continue;
        }

        let val_start = j;
        while j < len && !matches!(bytes[j], b',' | b'}' | b'{' | b'(') {
            j += 1;
        }
        if let Some(value) = parse_scalar(s[val_start..j].trim()) {
            map.insert(key.to_string(), value);
        }
        i = j.max(key_end + 1);
    }
}

fn parse_scalar(raw: &str) -> Option<StatValue> {
    match raw {
        "" => None,
        "Yes" => Some(StatValue::Bool(true)),
        "No" => Some(StatValue::Bool(false)),
        _ => raw
            .parse::<i64>()
            .map(StatValue::Integer)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(StatValue::Float)),
    }
}

/// Extract the value of `"key" = <"...">` or `"key" = "..."` from `ioreg` output.
pub fn parse_ioreg_string(output: &str, key: &str) -> Option<String> {
    let marker = format!("\"{key}\" = ");
    let line = output.lines().find(|l| l.contains(&marker))?;
    let raw = line.split_once(&marker)?.1.trim();
    let inner = raw
        .strip_prefix("<\"")
        .and_then(|r| r.strip_suffix("\">"))
        .or_else(|| raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')))?;
    let value = inner.trim_end_matches('\0').trim();
    (!value.is_empty()).then(|| value.to_string())
}
