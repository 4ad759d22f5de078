//! Shared identifiers and outcome types used across the allocation engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseDesignatorError;

/// Index of a claimant thread within one simulation run.
pub type ClaimantId = usize;

/// Cabin tier a seat belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatClass {
    Standard,
    Premium,
}

impl SeatClass {
    /// Factor applied to the layout's base price.
    pub fn price_multiplier(self) -> f64 {
        match self {
            SeatClass::Standard => 1.0,
            SeatClass::Premium => 2.0,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SeatClass::Standard => "Standard",
            SeatClass::Premium => "Premium",
        }
    }
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Stable seat identity: a 1-based row and a column letter, e.g. `15A`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatDesignator {
    row: u32,
    column: char,
}

impl SeatDesignator {
    /// Build a designator from a 1-based row and a 0-based column index.
    pub fn from_position(row: u32, column_index: u32) -> Option<Self> {
        if row == 0 || column_index >= 26 {
            return None;
        }
        let column = char::from(b'A' + column_index as u8);
        Some(Self { row, column })
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> char {
        self.column
    }

    /// 0-based column index (`A` is 0).
    pub fn column_index(&self) -> u32 {
        u32::from(self.column) - u32::from('A')
    }
}

impl fmt::Display for SeatDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

impl FromStr for SeatDesignator {
    type Err = ParseDesignatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let column = chars
            .next_back()
            .ok_or(ParseDesignatorError::Empty)?
            .to_ascii_uppercase();
        if !column.is_ascii_uppercase() {
            return Err(ParseDesignatorError::InvalidColumn {
                input: trimmed.to_string(),
            });
        }
        let row_text = chars.as_str();
        if row_text.is_empty() || !row_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseDesignatorError::InvalidRow {
                input: trimmed.to_string(),
            });
        }
        let row = row_text
            .parse::<u32>()
            .map_err(|_| ParseDesignatorError::InvalidRow {
                input: trimmed.to_string(),
            })?;
        if row == 0 {
            return Err(ParseDesignatorError::InvalidRow {
                input: trimmed.to_string(),
            });
        }
        Ok(Self { row, column })
    }
}

impl Serialize for SeatDesignator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which claim path a caller (or a simulation run) uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Check-then-set under the coordinator lock.
    Serialized,
    /// Check-then-set with no lock and a widened race window.
    Unserialized,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Serialized, Strategy::Unserialized];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Serialized => "serialized",
            Strategy::Unserialized => "unserialized",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single claim call on one seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    Claimed,
    /// The seat was already reserved (or was taken during the race window).
    Conflict,
}

impl ClaimOutcome {
    pub fn is_claimed(self) -> bool {
        matches!(self, ClaimOutcome::Claimed)
    }
}

/// Final outcome of one claimant across all of its attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Claimed,
    /// Lost every race it entered before running out of attempts.
    Conflict,
    /// Found the pool fully reserved and never contacted the coordinator.
    NoSeatAvailable,
    /// The run was aborted before the start gate opened, or cancelled after
    /// its completion timeout expired.
    Aborted,
}

/// What one claimant did during a simulation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AllocationAttempt {
    pub claimant: ClaimantId,
    /// Seat targeted by the last claim call, if any was made.
    pub seat: Option<SeatDesignator>,
    pub outcome: AttemptOutcome,
    pub strategy: Strategy,
    /// Number of claim calls made (0 when no seat was available).
    pub attempts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_designators() {
        let seat: SeatDesignator = " 15a ".parse().expect("valid designator");
        assert_eq!(seat.row(), 15);
        assert_eq!(seat.column(), 'A');
        assert_eq!(seat.to_string(), "15A");
    }

    #[test]
    fn rejects_malformed_designators() {
        assert_eq!("".parse::<SeatDesignator>(), Err(ParseDesignatorError::Empty));
        assert!("INVALID".parse::<SeatDesignator>().is_err());
        assert!("0A".parse::<SeatDesignator>().is_err());
        assert!("12".parse::<SeatDesignator>().is_err());
        assert!("-3B".parse::<SeatDesignator>().is_err());
        assert!("A".parse::<SeatDesignator>().is_err());
    }

    #[test]
    fn position_round_trips_through_column_index() {
        let seat = SeatDesignator::from_position(7, 5).expect("in range");
        assert_eq!(seat.to_string(), "7F");
        assert_eq!(seat.column_index(), 5);
        assert!(SeatDesignator::from_position(0, 0).is_none());
        assert!(SeatDesignator::from_position(1, 26).is_none());
    }

    #[test]
    fn premium_costs_double() {
        assert_eq!(SeatClass::Standard.price_multiplier(), 1.0);
        assert_eq!(SeatClass::Premium.price_multiplier(), 2.0);
    }
}
