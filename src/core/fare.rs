use crate::core::segment::segments;
use crate::domain::model::{DeliveryPoint, FareEstimate, Segment};
use crate::utils::error::{FareError, Result};
use crate::utils::validation::{validate_non_negative, validate_range, Validate};
use chrono::{FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Pricing policy. Every field can be overridden from the `[rates]` table
/// of the configuration file; missing fields keep the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareRates {
    pub flag_charge: f64,
    pub minimum_fare: f64,
    pub day_rate_per_km: f64,
    pub night_rate_per_km: f64,
    pub idle_rate_per_hour: f64,
    pub moving_speed_threshold_kmh: f64,
    pub night_start_hour: u32,
    pub night_end_hour: u32,
}

impl Default for FareRates {
    fn default() -> Self {
        Self {
            flag_charge: 1.30,
            minimum_fare: 3.47,
            day_rate_per_km: 0.74,
            night_rate_per_km: 1.30,
            idle_rate_per_hour: 11.90,
            moving_speed_threshold_kmh: 10.0,
            night_start_hour: 0,
            night_end_hour: 5,
        }
    }
}

impl Validate for FareRates {
    fn validate(&self) -> Result<()> {
        validate_non_negative("rates.flag_charge", self.flag_charge)?;
        validate_non_negative("rates.minimum_fare", self.minimum_fare)?;
        validate_non_negative("rates.day_rate_per_km", self.day_rate_per_km)?;
        validate_non_negative("rates.night_rate_per_km", self.night_rate_per_km)?;
        validate_non_negative("rates.idle_rate_per_hour", self.idle_rate_per_hour)?;
        validate_non_negative(
            "rates.moving_speed_threshold_kmh",
            self.moving_speed_threshold_kmh,
        )?;
        validate_range("rates.night_start_hour", self.night_start_hour, 0, 23)?;
        validate_range("rates.night_end_hour", self.night_end_hour, 0, 24)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Moving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Any,
    Day,
    Night,
}

impl TimeWindow {
    fn matches(self, is_night: bool) -> bool {
        match self {
            TimeWindow::Any => true,
            TimeWindow::Day => !is_night,
            TimeWindow::Night => is_night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Charge {
    PerKm(f64),
    PerHour(f64),
}

impl Charge {
    fn apply(self, segment: &Segment) -> f64 {
        match self {
            Charge::PerKm(rate) => rate * segment.distance_km,
            Charge::PerHour(rate) => rate * segment.duration_hours().max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareRule {
    pub state: MotionState,
    pub window: TimeWindow,
    pub charge: Charge,
}

/// Local-hour range `[start_hour, end_hour)`. A start after the end wraps
/// past midnight; equal bounds mean no night at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl NightWindow {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Folds the segments of one filtered delivery into a fare.
#[derive(Debug, Clone)]
pub struct FareCalculator {
    rates: FareRates,
    rules: Vec<FareRule>,
    night: NightWindow,
    offset: FixedOffset,
}

impl Default for FareCalculator {
    fn default() -> Self {
        Self::with_offset(FareRates::default(), Utc.fix())
    }
}

impl FareCalculator {
    pub fn new(rates: FareRates, utc_offset_minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60));
        let offset = offset.ok_or_else(|| FareError::InvalidConfigValueError {
            field: "clock.utc_offset_minutes".to_string(),
            value: utc_offset_minutes.to_string(),
            reason: "Offset must be strictly within +/-24 hours".to_string(),
        })?;
        Ok(Self::with_offset(rates, offset))
    }

    pub fn with_offset(rates: FareRates, offset: FixedOffset) -> Self {
        // first match wins; idle is decided before the time of day matters
        let rules = vec![
            FareRule {
                state: MotionState::Idle,
                window: TimeWindow::Any,
                charge: Charge::PerHour(rates.idle_rate_per_hour),
            },
            FareRule {
                state: MotionState::Moving,
                window: TimeWindow::Night,
                charge: Charge::PerKm(rates.night_rate_per_km),
            },
            FareRule {
                state: MotionState::Moving,
                window: TimeWindow::Day,
                charge: Charge::PerKm(rates.day_rate_per_km),
            },
        ];
        let night = NightWindow {
            start_hour: rates.night_start_hour,
            end_hour: rates.night_end_hour,
        };

        Self {
            rates,
            rules,
            night,
            offset,
        }
    }

    pub fn rates(&self) -> &FareRates {
        &self.rates
    }

    pub fn rules(&self) -> &[FareRule] {
        &self.rules
    }

    pub fn classify(&self, speed_kmh: f64) -> MotionState {
        if speed_kmh <= self.rates.moving_speed_threshold_kmh {
            MotionState::Idle
        } else {
            MotionState::Moving
        }
    }

    pub fn is_night(&self, point: &DeliveryPoint) -> bool {
        let hour = point.timestamp.with_timezone(&self.offset).hour();
        self.night.contains(hour)
    }

    pub fn segment_charge(&self, segment: &Segment) -> f64 {
        let state = self.classify(segment.speed_kmh);
        let is_night = self.is_night(&segment.end);

        self.rules
            .iter()
            .find(|rule| rule.state == state && rule.window.matches(is_night))
            .map(|rule| rule.charge.apply(segment))
            .unwrap_or(0.0)
    }

    /// Expects points already passed through the outlier filter.
    pub fn estimate(&self, delivery_id: i64, points: &[DeliveryPoint]) -> FareEstimate {
        if points.len() < 2 {
            return FareEstimate {
                delivery_id,
                fare: round_to_cents(self.rates.minimum_fare),
            };
        }

        let total = segments(points).fold(self.rates.flag_charge, |total, segment| {
            total + self.segment_charge(&segment)
        });
        // the floor replaces the running total, it is never added to it
        let floored = if total < self.rates.minimum_fare {
            self.rates.minimum_fare
        } else {
            total
        };

        FareEstimate {
            delivery_id,
            fare: round_to_cents(floored),
        }
    }
}
