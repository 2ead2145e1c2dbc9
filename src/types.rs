//! Common value types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of the campaign start a day falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Days strictly before the campaign start date.
    NoAdvertising,
    /// Days on or after the campaign start date.
    Advertising,
}

impl Period {
    /// Classify a day against the campaign start date.
    pub fn of(day: NaiveDate, start_date: NaiveDate) -> Self {
        if day < start_date {
            Period::NoAdvertising
        } else {
            Period::Advertising
        }
    }
}

/// Total sales for one calendar day, preserving series order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    /// Calendar day.
    pub day: NaiveDate,
    /// Sum of sales amounts on that day in dollars (0.0 for days without sales).
    pub amount: f64,
}

/// One raw ledger row before daily aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction date.
    pub date: NaiveDate,
    /// Transaction amount in dollars.
    pub amount: f64,
    /// Ledger row type (e.g. "Sales Receipt"), if the ledger has one.
    pub kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_boundary_is_advertising() {
        let start = NaiveDate::from_ymd_opt(2018, 3, 31).unwrap();
        let before = NaiveDate::from_ymd_opt(2018, 3, 30).unwrap();
        assert_eq!(Period::of(before, start), Period::NoAdvertising);
        assert_eq!(Period::of(start, start), Period::Advertising);
    }
}
