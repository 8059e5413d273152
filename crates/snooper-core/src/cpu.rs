//! Per-core CPU utilization from cumulative tick counters.
//!
//! A [`TickSource`](crate::sources::TickSource) hands out [`TickSample`]s: one
//! set of monotonically increasing busy/idle counters per core. Utilization is
//! only defined between two samples, so [`CpuUsageProbe`] keeps exactly one
//! previous sample and reports the delta against it.
//!
//! Counters that move backwards (reset, wraparound) contribute a zero delta.
//! Cores that appear or disappear between samples are trimmed to the common
//! prefix instead of failing the call.

use std::time::SystemTime;

use serde::Serialize;

use crate::error::{Result, Sampled, SnoopError};

/// Cumulative ticks spent by one core in each scheduler state since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoreTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

impl CoreTicks {
    pub const fn new(user: u64, system: u64, idle: u64, nice: u64) -> Self {
        Self {
            user,
            system,
            idle,
            nice,
        }
    }

    fn accumulate(&mut self, other: &CoreTicks) {
        self.user = self.user.wrapping_add(other.user);
        self.system = self.system.wrapping_add(other.system);
        self.idle = self.idle.wrapping_add(other.idle);
        self.nice = self.nice.wrapping_add(other.nice);
    }
}

/// One timestamped reading of every core's tick counters.
///
/// Always holds at least one core; an empty reading is rejected at
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSample {
    monotonic_ns: u64,
    wall_time: SystemTime,
    cores: Vec<CoreTicks>,
}

impl TickSample {
    pub fn new(monotonic_ns: u64, wall_time: SystemTime, cores: Vec<CoreTicks>) -> Result<Self> {
        if cores.is_empty() {
            return Err(SnoopError::invalid("tick sample has no cores"));
        }
        Ok(Self {
            monotonic_ns,
            wall_time,
            cores,
        })
    }

    /// Build a sample stamped with the current monotonic and wall clocks.
    pub fn now(cores: Vec<CoreTicks>) -> Result<Self> {
        Self::new(crate::time::monotonic_ns(), SystemTime::now(), cores)
    }

    pub fn monotonic_ns(&self) -> u64 {
        self.monotonic_ns
    }

    pub fn wall_time(&self) -> SystemTime {
        self.wall_time
    }

    pub fn cores(&self) -> &[CoreTicks] {
        &self.cores
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }
}

/// Share of elapsed ticks per state, in percent.
///
/// Niced user time is folded into `user`, so the three fields sum to 100
/// whenever any ticks elapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    /// User plus nice time.
    pub user: f64,
    pub system: f64,
    pub idle: f64,
}

impl CpuUsage {
    /// Everything that was not idle.
    pub fn busy(&self) -> f64 {
        100.0 - self.idle
    }
}

/// Utilization between two consecutive tick samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub monotonic_ns: u64,
    #[serde(rename = "wall_unix_ms", serialize_with = "crate::time::serialize_unix_ms")]
    pub wall_time: SystemTime,
    /// Computed over the summed ticks of all reported cores.
    pub overall: CpuUsage,
    pub per_core: Vec<CpuUsage>,
}

impl UsageReport {
    pub fn core_count(&self) -> usize {
        self.per_core.len()
    }
}

fn usage_from_delta(prev: &CoreTicks, curr: &CoreTicks) -> CpuUsage {
    let user = curr.user.saturating_sub(prev.user);
    let system = curr.system.saturating_sub(prev.system);
    let idle = curr.idle.saturating_sub(prev.idle);
    let nice = curr.nice.saturating_sub(prev.nice);

    let total = user as f64 + system as f64 + idle as f64 + nice as f64;
    if total == 0.0 {
        return CpuUsage::default();
    }

    CpuUsage {
        user: (user as f64 + nice as f64) * 100.0 / total,
        system: system as f64 * 100.0 / total,
        idle: idle as f64 * 100.0 / total,
    }
}

/// Compute a report from two samples without touching any probe state.
pub fn usage_between(previous: &TickSample, current: &TickSample) -> Result<UsageReport> {
    let cores = previous.core_count().min(current.core_count());

    let mut per_core = Vec::new();
    per_core.try_reserve_exact(cores)?;

    let mut aggregate_prev = CoreTicks::default();
    let mut aggregate_curr = CoreTicks::default();

    for (prev, curr) in previous.cores.iter().zip(&current.cores) {
        per_core.push(usage_from_delta(prev, curr));
        aggregate_prev.accumulate(prev);
        aggregate_curr.accumulate(curr);
    }

    Ok(UsageReport {
        monotonic_ns: current.monotonic_ns,
        wall_time: current.wall_time,
        overall: usage_from_delta(&aggregate_prev, &aggregate_curr),
        per_core,
    })
}

/// Stateful delta calculator over a sliding window of one sample.
///
/// The first call only primes the window and yields [`Sampled::Warmup`].
/// Every later call reports against the immediately preceding sample and then
/// replaces it. Callers serialize access; the probe holds no locks.
#[derive(Debug, Default)]
pub struct CpuUsageProbe {
    previous: Option<TickSample>,
}

impl CpuUsageProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the probe has seen its first sample.
    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }

    pub fn sample(&mut self, current: TickSample) -> Result<Sampled<UsageReport>> {
        let Some(previous) = self.previous.as_ref() else {
            log::debug!(
                "cpu probe primed with {} cores, warming up",
                current.core_count()
            );
            self.previous = Some(current);
            return Ok(Sampled::Warmup);
        };

        if previous.core_count() != current.core_count() {
            log::debug!(
                "core count changed {} -> {}, reporting common cores only",
                previous.core_count(),
                current.core_count()
            );
        }

        // On error the stored sample stays put so the next call is well-formed.
        let report = usage_between(previous, &current)?;
        self.previous = Some(current);
        Ok(Sampled::Ready(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn sample_at(ns: u64, cores: &[(u64, u64, u64, u64)]) -> TickSample {
        TickSample::new(
            ns,
            UNIX_EPOCH + Duration::from_nanos(ns),
            cores
                .iter()
                .map(|&(u, s, i, n)| CoreTicks::new(u, s, i, n))
                .collect(),
        )
        .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_sample_is_invalid() {
        let err = TickSample::new(0, UNIX_EPOCH, Vec::new()).unwrap_err();
        assert!(matches!(err, SnoopError::InvalidArgument(_)));
    }

    #[test]
    fn first_call_warms_up() {
        let mut probe = CpuUsageProbe::new();
        assert!(!probe.is_primed());
        let out = probe.sample(sample_at(1, &[(5, 5, 5, 5)])).unwrap();
        assert!(out.is_warmup());
        assert!(probe.is_primed());
    }

    #[test]
    fn second_call_reports_delta() {
        let mut probe = CpuUsageProbe::new();
        probe.sample(sample_at(1, &[(100, 50, 800, 0)])).unwrap();
        let report = probe
            .sample(sample_at(2, &[(130, 60, 860, 0)]))
            .unwrap()
            .ready()
            .unwrap();

        // deltas: user 30, system 10, idle 60 -> total 100
        assert_eq!(report.core_count(), 1);
        assert!(close(report.per_core[0].user, 30.0));
        assert!(close(report.per_core[0].system, 10.0));
        assert!(close(report.per_core[0].idle, 60.0));
        assert!(close(report.overall.busy(), 40.0));
        assert_eq!(report.monotonic_ns, 2);
    }

    #[test]
    fn overall_aggregates_ticks_not_percentages() {
        let mut probe = CpuUsageProbe::new();
        probe
            .sample(sample_at(1, &[(0, 0, 0, 0), (0, 0, 0, 0)]))
            .unwrap();
        // core 0: 10 ticks all user; core 1: 90 ticks all idle
        let report = probe
            .sample(sample_at(2, &[(10, 0, 0, 0), (0, 0, 90, 0)]))
            .unwrap()
            .ready()
            .unwrap();
        // average-of-percentages would give 50% user; aggregate gives 10%
        assert!(close(report.overall.user, 10.0));
        assert!(close(report.overall.idle, 90.0));
    }

    #[test]
    fn zero_delta_core_reports_zeros() {
        let mut probe = CpuUsageProbe::new();
        probe.sample(sample_at(1, &[(7, 7, 7, 7)])).unwrap();
        let report = probe
            .sample(sample_at(2, &[(7, 7, 7, 7)]))
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(report.per_core[0], CpuUsage::default());
        assert_eq!(report.overall, CpuUsage::default());
    }

    #[test]
    fn counter_reset_clamps_to_zero() {
        let mut probe = CpuUsageProbe::new();
        probe.sample(sample_at(1, &[(1000, 500, 9000, 10)])).unwrap();
        // user and idle went backwards, system advanced by 20
        let report = probe
            .sample(sample_at(2, &[(10, 520, 5, 10)]))
            .unwrap()
            .ready()
            .unwrap();
        assert!(close(report.per_core[0].system, 100.0));
        assert!(close(report.per_core[0].user, 0.0));
        assert!(close(report.per_core[0].idle, 0.0));
    }

    #[test]
    fn hot_unplugged_cores_are_dropped() {
        let mut probe = CpuUsageProbe::new();
        probe.sample(sample_at(1, &[(0, 0, 0, 0); 8])).unwrap();
        let report = probe
            .sample(sample_at(2, &[(1, 1, 1, 1); 6]))
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(report.per_core.len(), 6);
    }

    #[test]
    fn window_slides_by_one_sample() {
        let mut probe = CpuUsageProbe::new();
        probe.sample(sample_at(1, &[(0, 0, 0, 0)])).unwrap();
        probe.sample(sample_at(2, &[(50, 0, 50, 0)])).unwrap();
        // Third report must be relative to the second sample only.
        let report = probe
            .sample(sample_at(3, &[(50, 0, 150, 0)]))
            .unwrap()
            .ready()
            .unwrap();
        assert!(close(report.overall.idle, 100.0));
    }

    #[test]
    fn nice_time_is_reported_as_user() {
        let mut probe = CpuUsageProbe::new();
        probe.sample(sample_at(1, &[(0, 0, 0, 0)])).unwrap();
        let report = probe
            .sample(sample_at(2, &[(25, 25, 25, 25)]))
            .unwrap()
            .ready()
            .unwrap();
        assert!(close(report.overall.user, 50.0));
        assert!(close(report.overall.system, 25.0));
        assert!(close(report.overall.busy(), 75.0));
    }

    #[test]
    fn percentages_sum_to_hundred() {
        let prev = sample_at(1, &[(12, 40, 300, 4), (3, 9, 27, 0)]);
        let curr = sample_at(2, &[(55, 71, 402, 19), (30, 31, 90, 2)]);
        let report = usage_between(&prev, &curr).unwrap();
        let o = report.overall;
        assert!((o.user + o.system + o.idle - 100.0).abs() < 1e-9);
        for c in &report.per_core {
            assert!((c.user + c.system + c.idle - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn primed_probe_never_warms_up_again() {
        let mut probe = CpuUsageProbe::new();
        assert!(probe.sample(sample_at(1, &[(0, 0, 0, 0)])).unwrap().is_warmup());
        for ns in 2..6 {
            assert!(probe.sample(sample_at(ns, &[(ns, 0, ns, 0)])).unwrap().ready().is_some());
            assert!(probe.is_primed());
        }
    }

    #[test]
    fn user_share_includes_nice() {
        let prev = sample_at(1, &[(0, 0, 0, 0)]);
        let curr = sample_at(2, &[(10, 20, 50, 20)]);
        let core = usage_between(&prev, &curr).unwrap().overall;
        assert!((core.user - 30.0).abs() < 1e-9);
        assert!((core.system - 20.0).abs() < 1e-9);
        assert!((core.idle - 50.0).abs() < 1e-9);
    }
}
