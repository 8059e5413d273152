//! GPU / accelerator utilization from a driver's performance-counter map.
//!
//! Drivers disagree on which key carries the authoritative utilization figure,
//! so the probe walks an ordered table of known keys and takes the first one
//! that holds a number. Thermal readings are pulled from their own keys and
//! succeed or fail independently of utilization.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::sources::AcceleratorStatsSource;

/// One value from a performance-statistics dictionary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl StatValue {
    /// Numeric view of the value; text and booleans are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Raw key→value counters as exposed by the accelerator driver.
pub type AcceleratorStats = BTreeMap<String, StatValue>;

/// A known utilization key and what it measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationKey {
    pub key: &'static str,
    pub meaning: &'static str,
}

/// Default lookup order. Earlier entries win.
pub const UTILIZATION_KEYS: &[UtilizationKey] = &[
    UtilizationKey {
        key: "GPU Busy",
        meaning: "fraction of time any GPU engine was busy",
    },
    UtilizationKey {
        key: "Device Utilization %",
        meaning: "whole-device utilization reported by Apple GPUs",
    },
    UtilizationKey {
        key: "HW Utilization",
        meaning: "hardware utilization on older IOAccelerator drivers",
    },
    UtilizationKey {
        key: "Renderer Utilization %",
        meaning: "renderer (fragment) pipeline utilization",
    },
    UtilizationKey {
        key: "Tiler Utilization %",
        meaning: "tiler (vertex) pipeline utilization",
    },
    UtilizationKey {
        key: "gpu_busy_percent",
        meaning: "amdgpu / i915 DRM busy percentage",
    },
];

/// Temperature in degrees Celsius.
pub const TEMPERATURE_KEY: &str = "Temperature";
/// Discrete thermal pressure level.
pub const THERMAL_LEVEL_KEY: &str = "ThermalLevel";

/// Thermal state read opportunistically alongside utilization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ThermalReading {
    pub available: bool,
    pub temperature_celsius: Option<f64>,
    pub pressure_level: Option<i32>,
}

/// Result of one accelerator probe call. Never cached across calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcceleratorSample {
    pub available: bool,
    pub utilization_percent: f64,
    /// Key the utilization figure came from.
    pub source_key: Option<String>,
    pub thermal: ThermalReading,
}

impl AcceleratorSample {
    /// The degraded "no accelerator data" outcome.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Stateless extractor over an ordered utilization key table.
#[derive(Debug, Clone)]
pub struct AcceleratorProbe {
    keys: Vec<UtilizationKey>,
}

impl Default for AcceleratorProbe {
    fn default() -> Self {
        Self {
            keys: UTILIZATION_KEYS.to_vec(),
        }
    }
}

impl AcceleratorProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe with a custom priority table, e.g. for a driver with its own key.
    pub fn with_keys(keys: impl IntoIterator<Item = UtilizationKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn keys(&self) -> &[UtilizationKey] {
        &self.keys
    }

    /// Extract utilization (first matching key) and thermal state.
    ///
    /// Missing keys are not an error: the sample comes back with
    /// `available = false` and `0.0` percent.
    pub fn sample(&self, stats: &AcceleratorStats) -> AcceleratorSample {
        let mut sample = AcceleratorSample {
            thermal: extract_thermal(stats),
            ..AcceleratorSample::default()
        };

        let hit = self.keys.iter().find_map(|entry| {
            stats
                .get(entry.key)
                .and_then(StatValue::as_f64)
                .map(|v| (entry, v))
        });

        match hit {
            Some((entry, percent)) => {
                log::debug!("accelerator utilization from {:?}: {percent}", entry.key);
                sample.available = true;
                sample.utilization_percent = percent;
                sample.source_key = Some(entry.key.to_string());
            }
            None => {
                log::debug!(
                    "no known utilization key among {} accelerator counters",
                    stats.len()
                );
            }
        }

        sample
    }

    /// Read `source` and sample it. A failed read degrades to unavailable.
    pub fn sample_source(&self, source: &dyn AcceleratorStatsSource) -> AcceleratorSample {
        match source.read() {
            Ok(stats) => self.sample(&stats),
            Err(e) => {
                log::warn!("accelerator stats unavailable: {e}");
                AcceleratorSample::unavailable()
            }
        }
    }
}

fn extract_thermal(stats: &AcceleratorStats) -> ThermalReading {
    let temperature_celsius = stats.get(TEMPERATURE_KEY).and_then(StatValue::as_f64);
    let pressure_level = stats
        .get(THERMAL_LEVEL_KEY)
        .and_then(StatValue::as_f64)
        .map(|v| v as i32);

    ThermalReading {
        available: temperature_celsius.is_some() || pressure_level.is_some(),
        temperature_celsius,
        pressure_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SnoopError};

    struct Fixed(Option<AcceleratorStats>);

    impl AcceleratorStatsSource for Fixed {
        fn read(&self) -> Result<AcceleratorStats> {
            self.0
                .clone()
                .ok_or_else(|| SnoopError::unavailable("no accelerator"))
        }
    }

    #[test]
    fn failed_source_read_degrades() {
        let sample = AcceleratorProbe::new().sample_source(&Fixed(None));
        assert_eq!(sample, AcceleratorSample::unavailable());
    }

    #[test]
    fn source_read_is_sampled() {
        let source = Fixed(Some(
            [("Device Utilization %".to_string(), StatValue::Integer(42))]
                .into_iter()
                .collect(),
        ));
        let sample = AcceleratorProbe::new().sample_source(&source);
        assert!(sample.available);
        assert_eq!(sample.utilization_percent, 42.0);
    }

    fn stats(pairs: &[(&str, StatValue)]) -> AcceleratorStats {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn no_known_keys_degrades() {
        let probe = AcceleratorProbe::new();
        let s = probe.sample(&stats(&[("Alloc system memory", 1234i64.into())]));
        assert!(!s.available);
        assert_eq!(s.utilization_percent, 0.0);
        assert!(s.source_key.is_none());
    }

    #[test]
    fn empty_map_degrades() {
        let s = AcceleratorProbe::new().sample(&AcceleratorStats::new());
        assert_eq!(s, AcceleratorSample::unavailable());
    }

    #[test]
    fn first_key_in_table_order_wins() {
        let probe = AcceleratorProbe::new();
        let s = probe.sample(&stats(&[
            ("Tiler Utilization %", 10i64.into()),
            ("Device Utilization %", 42i64.into()),
            ("Renderer Utilization %", 37i64.into()),
        ]));
        assert!(s.available);
        assert_eq!(s.utilization_percent, 42.0);
        assert_eq!(s.source_key.as_deref(), Some("Device Utilization %"));
    }

    #[test]
    fn non_numeric_value_is_skipped() {
        let probe = AcceleratorProbe::new();
        let s = probe.sample(&stats(&[
            ("GPU Busy", "n/a".into()),
            ("HW Utilization", 12.5f64.into()),
        ]));
        assert_eq!(s.source_key.as_deref(), Some("HW Utilization"));
        assert_eq!(s.utilization_percent, 12.5);
    }

    #[test]
    fn custom_table_extends_lookup() {
        let probe = AcceleratorProbe::with_keys([UtilizationKey {
            key: "npu_load",
            meaning: "neural engine load",
        }]);
        let s = probe.sample(&stats(&[("npu_load", 64i64.into()), ("GPU Busy", 1i64.into())]));
        assert_eq!(s.source_key.as_deref(), Some("npu_load"));
        assert_eq!(probe.keys().len(), 1);
    }

    #[test]
    fn thermal_is_independent_of_utilization() {
        let probe = AcceleratorProbe::new();
        let s = probe.sample(&stats(&[
            (TEMPERATURE_KEY, 51.5f64.into()),
            (THERMAL_LEVEL_KEY, 2i64.into()),
        ]));
        assert!(!s.available);
        assert!(s.thermal.available);
        assert_eq!(s.thermal.temperature_celsius, Some(51.5));
        assert_eq!(s.thermal.pressure_level, Some(2));

        let s = probe.sample(&stats(&[("GPU Busy", 9i64.into())]));
        assert!(s.available);
        assert!(!s.thermal.available);
        assert_eq!(s.thermal.temperature_celsius, None);
    }

    #[test]
    fn pressure_level_alone_marks_thermal_available() {
        let s = AcceleratorProbe::new().sample(&stats(&[(THERMAL_LEVEL_KEY, 0i64.into())]));
        assert!(s.thermal.available);
        assert_eq!(s.thermal.pressure_level, Some(0));
        assert_eq!(s.thermal.temperature_celsius, None);
    }

    #[test]
    fn nan_is_not_numeric() {
        assert_eq!(StatValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(StatValue::Bool(true).as_f64(), None);
        assert_eq!(StatValue::Integer(-3).as_f64(), Some(-3.0));
    }
}
