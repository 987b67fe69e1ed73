//! Minute-level telemetry types shared by every pipeline stage.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const TELEMETRY_FIELD_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TelemetryField {
    GlobalActivePower,
    GlobalReactivePower,
    Voltage,
    GlobalIntensity,
    SubMetering1,
    SubMetering2,
    SubMetering3,
}

/// How minute values of a field collapse into one hourly value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    Mean,
    /// Sub-metering channels carry incremental energy per minute.
    Sum,
}

impl TelemetryField {
    pub const ALL: [TelemetryField; TELEMETRY_FIELD_COUNT] = [
        Self::GlobalActivePower,
        Self::GlobalReactivePower,
        Self::Voltage,
        Self::GlobalIntensity,
        Self::SubMetering1,
        Self::SubMetering2,
        Self::SubMetering3,
    ];

    pub const SUB_METERING: [TelemetryField; 3] =
        [Self::SubMetering1, Self::SubMetering2, Self::SubMetering3];

    /// Fields whose absence marks a minute as `MISSING_DATA`.
    pub const PRIMARY: [TelemetryField; 3] = [
        Self::GlobalActivePower,
        Self::GlobalReactivePower,
        Self::Voltage,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Self::GlobalActivePower => "global_active_power",
            Self::GlobalReactivePower => "global_reactive_power",
            Self::Voltage => "voltage",
            Self::GlobalIntensity => "global_intensity",
            Self::SubMetering1 => "sub_metering_1",
            Self::SubMetering2 => "sub_metering_2",
            Self::SubMetering3 => "sub_metering_3",
        }
    }

    pub fn source_header(self) -> &'static str {
        match self {
            Self::GlobalActivePower => "Global_active_power",
            Self::GlobalReactivePower => "Global_reactive_power",
            Self::Voltage => "Voltage",
            Self::GlobalIntensity => "Global_intensity",
            Self::SubMetering1 => "Sub_metering_1",
            Self::SubMetering2 => "Sub_metering_2",
            Self::SubMetering3 => "Sub_metering_3",
        }
    }

    pub fn aggregation(self) -> Aggregation {
        if self.is_sub_metering() {
            Aggregation::Sum
        } else {
            Aggregation::Mean
        }
    }

    pub fn is_sub_metering(self) -> bool {
        matches!(
            self,
            Self::SubMetering1 | Self::SubMetering2 | Self::SubMetering3
        )
    }

    pub fn index(self) -> usize {
        match self {
            Self::GlobalActivePower => 0,
            Self::GlobalReactivePower => 1,
            Self::Voltage => 2,
            Self::GlobalIntensity => 3,
            Self::SubMetering1 => 4,
            Self::SubMetering2 => 5,
            Self::SubMetering3 => 6,
        }
    }
}

/// One value slot per [`TelemetryField`]; `None` is a missing measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub global_active_power: Option<f64>,
    pub global_reactive_power: Option<f64>,
    pub voltage: Option<f64>,
    pub global_intensity: Option<f64>,
    pub sub_metering_1: Option<f64>,
    pub sub_metering_2: Option<f64>,
    pub sub_metering_3: Option<f64>,
}

impl Telemetry {
    pub fn get(&self, field: TelemetryField) -> Option<f64> {
        match field {
            TelemetryField::GlobalActivePower => self.global_active_power,
            TelemetryField::GlobalReactivePower => self.global_reactive_power,
            TelemetryField::Voltage => self.voltage,
            TelemetryField::GlobalIntensity => self.global_intensity,
            TelemetryField::SubMetering1 => self.sub_metering_1,
            TelemetryField::SubMetering2 => self.sub_metering_2,
            TelemetryField::SubMetering3 => self.sub_metering_3,
        }
    }

    pub fn set(&mut self, field: TelemetryField, value: Option<f64>) {
        let slot = match field {
            TelemetryField::GlobalActivePower => &mut self.global_active_power,
            TelemetryField::GlobalReactivePower => &mut self.global_reactive_power,
            TelemetryField::Voltage => &mut self.voltage,
            TelemetryField::GlobalIntensity => &mut self.global_intensity,
            TelemetryField::SubMetering1 => &mut self.sub_metering_1,
            TelemetryField::SubMetering2 => &mut self.sub_metering_2,
            TelemetryField::SubMetering3 => &mut self.sub_metering_3,
        };
        *slot = value;
    }

    pub fn missing_count(&self) -> usize {
        TelemetryField::ALL
            .iter()
            .filter(|field| self.get(**field).is_none())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub timestamp: NaiveDateTime,
    pub telemetry: Telemetry,
}

/// Parsed minute source. `has_sub_metering` reflects the source header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    pub readings: Vec<RawReading>,
    pub has_sub_metering: bool,
}
