use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Daily offering window for appointment start times.
///
/// Both ends are inclusive: a window of 09:00-18:00 with a 60 minute step
/// offers ten start times, the last one at 18:00.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatingHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub slot_minutes: u32,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            slot_minutes: 60,
        }
    }
}

impl OperatingHours {
    pub fn new(open: NaiveTime, close: NaiveTime, slot_minutes: u32) -> anyhow::Result<Self> {
        if open > close {
            return Err(anyhow::anyhow!(
                "opening time {} is after closing time {}",
                open.format("%H:%M"),
                close.format("%H:%M")
            ));
        }
        if slot_minutes == 0 || slot_minutes > 24 * 60 {
            return Err(anyhow::anyhow!(
                "slot length must be between 1 and 1440 minutes, got {slot_minutes}"
            ));
        }
        Ok(Self {
            open,
            close,
            slot_minutes,
        })
    }

    pub fn parse(open: &str, close: &str, slot_minutes: u32) -> anyhow::Result<Self> {
        Self::new(parse_time(open)?, parse_time(close)?, slot_minutes)
    }

    /// Whether `time` is one of the start times on the grid.
    pub fn offers(&self, time: NaiveTime) -> bool {
        if time < self.open || time > self.close {
            return false;
        }
        let offset = minutes_of_day(time) - minutes_of_day(self.open);
        time.second() == 0 && time.nanosecond() == 0 && offset % self.slot_minutes == 0
    }

    pub fn to_human_readable(&self) -> String {
        format!(
            "{}-{}, every {} min",
            self.open.format("%H:%M"),
            self.close.format("%H:%M"),
            self.slot_minutes
        )
    }
}

/// How existing active bookings block candidate slots.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// A slot is taken only by a booking starting at exactly that instant.
    #[default]
    ExactStart,
    /// A slot is taken by any booking whose interval overlaps the service's
    /// interval starting at that slot.
    Overlap,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::ExactStart => "exact",
            ConflictPolicy::Overlap => "overlap",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "exact" | "exact_start" => Ok(ConflictPolicy::ExactStart),
            "overlap" => Ok(ConflictPolicy::Overlap),
            _ => Err(anyhow::anyhow!("invalid conflict policy: {s}")),
        }
    }
}

fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}
