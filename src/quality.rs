//! Per-minute quality tagging and the minute-to-hour flag combinator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::reading::{Telemetry, TelemetryField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityFlag {
    Ok,
    Degraded,
    MissingData,
    SuspiciousVoltage,
}

impl QualityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Degraded => "DEGRADED",
            Self::MissingData => "MISSING_DATA",
            Self::SuspiciousVoltage => "SUSPICIOUS_VOLTAGE",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Collapses contributing flags into one hourly flag.
    ///
    /// All contributors OK gives OK. Otherwise the result is DEGRADED, unless
    /// `escalate_voltage` is set and a contributor was SUSPICIOUS_VOLTAGE.
    /// An empty input is vacuously OK.
    pub fn combine_hourly<I>(flags: I, escalate_voltage: bool) -> QualityFlag
    where
        I: IntoIterator<Item = QualityFlag>,
    {
        let mut combined = QualityFlag::Ok;
        for flag in flags {
            combined = match (combined, flag) {
                (current, QualityFlag::Ok) => current,
                (QualityFlag::SuspiciousVoltage, _) => QualityFlag::SuspiciousVoltage,
                (_, QualityFlag::SuspiciousVoltage) if escalate_voltage => {
                    QualityFlag::SuspiciousVoltage
                }
                _ => QualityFlag::Degraded,
            };
        }
        combined
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityFlag {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "OK" => Ok(Self::Ok),
            "DEGRADED" => Ok(Self::Degraded),
            "MISSING_DATA" => Ok(Self::MissingData),
            "SUSPICIOUS_VOLTAGE" => Ok(Self::SuspiciousVoltage),
            other => Err(format!("unknown quality flag '{other}'")),
        }
    }
}

/// Accepted voltage band in volts, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageBand {
    pub min: f64,
    pub max: f64,
}

impl Default for VoltageBand {
    fn default() -> Self {
        Self {
            min: 200.0,
            max: 260.0,
        }
    }
}

impl VoltageBand {
    pub fn contains(&self, voltage: f64) -> bool {
        voltage >= self.min && voltage <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// Flag for one minute reading, taken before any gap fill.
///
/// An out-of-band voltage wins over missing primary measurements; a missing
/// voltage can never be suspicious.
pub fn minute_flag(telemetry: &Telemetry, band: &VoltageBand) -> QualityFlag {
    if let Some(voltage) = telemetry.voltage {
        if !band.contains(voltage) {
            return QualityFlag::SuspiciousVoltage;
        }
    }

    let primary_missing = TelemetryField::PRIMARY
        .iter()
        .any(|field| telemetry.get(*field).is_none());
    if primary_missing {
        QualityFlag::MissingData
    } else {
        QualityFlag::Ok
    }
}
