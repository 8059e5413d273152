//! macOS readers: Mach host statistics, IORegistry via `ioreg`, and `sysctl`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::accelerator::AcceleratorStats;
use crate::cpu::{CoreTicks, TickSample};
use crate::error::{Result, SnoopError};
use crate::identity::{IdentityField, IdentitySnapshot};
use crate::metrics::{SystemMetrics, parse_boottime, parse_vm_stat};

use super::helpers::{
    load_averages, parse_ioreg_dictionary, parse_ioreg_string, read_sysctl, run_command,
};
use super::{AcceleratorStatsSource, IdentitySource, SystemMetricsSource, TickSource};

const PROCESSOR_CPU_LOAD_INFO: i32 = 2;
const CPU_STATE_MAX: usize = 4;
const CPU_STATE_USER: usize = 0;
const CPU_STATE_SYSTEM: usize = 1;
const CPU_STATE_IDLE: usize = 2;
const CPU_STATE_NICE: usize = 3;
const KERN_SUCCESS: i32 = 0;

unsafe extern "C" {
    fn mach_host_self() -> u32;
    fn mach_task_self() -> u32;
    fn host_processor_info(
        host: u32,
        flavor: i32,
        out_processor_count: *mut u32,
        out_processor_info: *mut *mut i32,
        out_processor_info_cnt: *mut u32,
    ) -> i32;
    fn vm_deallocate(target_task: u32, address: usize, size: usize) -> i32;
}

/// Per-core ticks from `host_processor_info(PROCESSOR_CPU_LOAD_INFO)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MachTicks;

impl TickSource for MachTicks {
    fn read(&self) -> Result<TickSample> {
        let mut cpu_count: u32 = 0;
        let mut info: *mut i32 = std::ptr::null_mut();
        let mut info_count: u32 = 0;

        // SAFETY: out-pointers are valid locals; on success the kernel hands us
        // a vm-allocated array of `info_count` integers that we free below.
        let kr = unsafe {
            host_processor_info(
                mach_host_self(),
                PROCESSOR_CPU_LOAD_INFO,
                &mut cpu_count,
                &mut info,
                &mut info_count,
            )
        };
        if kr != KERN_SUCCESS || info.is_null() {
            return Err(SnoopError::unavailable(format!(
                "host_processor_info failed: {kr}"
            )));
        }

        let len = (info_count as usize).min(cpu_count as usize * CPU_STATE_MAX);
        // SAFETY: `info` points to at least `info_count` i32s owned by us until
        // vm_deallocate.
        let raw = unsafe { std::slice::from_raw_parts(info, len) };
        let cores: Vec<CoreTicks> = raw
            .chunks_exact(CPU_STATE_MAX)
            .map(|c| {
                // Counters are natural_t; reinterpret the bits as unsigned.
                let tick = |i: usize| u64::from(c[i] as u32);
                CoreTicks::new(
                    tick(CPU_STATE_USER),
                    tick(CPU_STATE_SYSTEM),
                    tick(CPU_STATE_IDLE),
                    tick(CPU_STATE_NICE),
                )
            })
            .collect();

        // SAFETY: releases exactly the region returned by host_processor_info.
        unsafe {
            vm_deallocate(
                mach_task_self(),
                info as usize,
                info_count as usize * std::mem::size_of::<i32>(),
            );
        }

        if cores.is_empty() {
            return Err(SnoopError::unavailable("host_processor_info reported no cpus"));
        }
        TickSample::now(cores)
    }
}

/// `PerformanceStatistics` of the first `IOAccelerator` service.
#[derive(Debug, Clone, Copy, Default)]
pub struct IoregAccelerator;

impl AcceleratorStatsSource for IoregAccelerator {
    fn read(&self) -> Result<AcceleratorStats> {
        let out = run_command("ioreg", &["-r", "-d", "1", "-w", "0", "-c", "IOAccelerator"])
            .ok_or_else(|| SnoopError::unavailable("ioreg IOAccelerator query failed"))?;
        Ok(parse_ioreg_dictionary(&out, "PerformanceStatistics"))
    }
}

/// Identity from `sysctl` and the platform expert device.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysctlIdentity;

fn sysctl_u32(key: &str) -> Result<u32> {
    read_sysctl(key)
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| SnoopError::unavailable(format!("sysctl {key}")))
}

fn architecture() -> IdentityField {
    if read_sysctl("hw.optional.arm64").as_deref() == Some("1") {
        "ARM64".into()
    } else {
        IdentityField::from_option(read_sysctl("hw.machine"))
    }
}

impl IdentitySource for SysctlIdentity {
    fn read(&self) -> Result<IdentitySnapshot> {
        let model = read_sysctl("machdep.cpu.brand_string")
            .ok_or_else(|| SnoopError::unavailable("sysctl machdep.cpu.brand_string"))?;
        let physical_cores = sysctl_u32("hw.physicalcpu")?;
        let logical_cores = sysctl_u32("hw.logicalcpu")?;

        let platform =
            run_command("ioreg", &["-r", "-d", "1", "-c", "IOPlatformExpertDevice"]).unwrap_or_default();
        let board_id = read_sysctl("hw.model").or_else(|| parse_ioreg_string(&platform, "board-id"));

        Ok(IdentitySnapshot {
            model: model.as_str().into(),
            architecture: architecture(),
            physical_cores,
            logical_cores,
            board_id: IdentityField::from_option(board_id),
            product_name: IdentityField::from_option(parse_ioreg_string(&platform, "product-name")),
            serial_number: IdentityField::from_option(parse_ioreg_string(
                &platform,
                "IOPlatformSerialNumber",
            )),
            hardware_uuid: IdentityField::from_option(parse_ioreg_string(&platform, "IOPlatformUUID")),
        })
    }
}

/// `vm_stat`, `getloadavg`, `kern.boottime` and `ps`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacSystemMetrics;

fn uptime_seconds() -> Option<u64> {
    let boot = parse_boottime(&read_sysctl("kern.boottime")?)?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    now.checked_sub(boot)
}

fn process_count() -> Option<u32> {
    let out = run_command("ps", &["-A", "-o", "pid="])?;
    u32::try_from(out.lines().filter(|l| !l.trim().is_empty()).count()).ok()
}

impl SystemMetricsSource for MacSystemMetrics {
    fn read(&self) -> SystemMetrics {
        SystemMetrics {
            memory: run_command("vm_stat", &[]).and_then(|out| parse_vm_stat(&out)),
            load: load_averages().map(Into::into),
            uptime_seconds: uptime_seconds(),
            process_count: process_count(),
        }
    }
}
