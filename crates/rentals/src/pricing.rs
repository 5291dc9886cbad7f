//! Pure pricing calculator for rental date ranges.

use chrono::NaiveDate;

use rentloop_core::{DomainError, DomainResult, ValueObject};

/// A validated rental date range (both endpoints inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl ValueObject for RentalPeriod {}

impl RentalPeriod {
    /// Validate and build a period.
    ///
    /// `today` is passed explicitly so callers (and tests) control the
    /// reference date; fails with `InvalidDateRange` when `end < start` or
    /// `start` is in the past.
    pub fn new(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> DomainResult<Self> {
        if start < today {
            return Err(DomainError::invalid_date_range(
                "start date cannot be in the past",
            ));
        }
        if end < start {
            return Err(DomainError::invalid_date_range(
                "end date cannot be before start date",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of billable days, inclusive of both endpoints.
    ///
    /// A one-day rental (start == end) is one billable day, not zero.
    pub fn days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }
}

/// Total price for renting at `daily_rate` (cents) over `period`.
///
/// Pure function; no side effects. The result is fixed on the rental at
/// creation time and never recomputed.
pub fn quote(daily_rate: u64, period: &RentalPeriod) -> DomainResult<u64> {
    daily_rate
        .checked_mul(period.days())
        .ok_or_else(|| DomainError::validation("total price overflows"))
}
