//! As-of-date resolution over time-versioned ledgers.
//!
//! Material prices, process parameters and published piece prices are all
//! resolved with the same rule: among the rows that apply on the date, the
//! one with the latest effective date wins, and ties go to the most recently
//! created row. Resolution only reads the rows it is given.

use chrono::{Datelike, Months, NaiveDate};

use crate::models::{
    MaterialZonePrice, PieceZonePrice, ProcessParameters, ResolvedProcessParameters,
};

/// A ledger row that takes effect on a date and may stop applying later.
pub trait Versioned {
    /// First day the row applies (inclusive).
    fn effective_date(&self) -> NaiveDate;

    /// Last day the row applies (inclusive); `None` means open-ended.
    fn valid_until(&self) -> Option<NaiveDate> {
        None
    }

    /// Creation sequence used to break ties between equal effective dates.
    fn creation_order(&self) -> i64;

    /// Inactive rows are never resolved.
    fn is_active(&self) -> bool {
        true
    }

    /// True when the row is a candidate on `date`.
    fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_active()
            && self.effective_date() <= date
            && self.valid_until().is_none_or(|until| until >= date)
    }
}

impl Versioned for MaterialZonePrice {
    fn effective_date(&self) -> NaiveDate {
        self.valid_from
    }

    fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    fn creation_order(&self) -> i64 {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// A process parameter row applies for its own calendar month only.
impl Versioned for ProcessParameters {
    fn effective_date(&self) -> NaiveDate {
        month_start(self.month)
    }

    fn valid_until(&self) -> Option<NaiveDate> {
        Some(month_end(self.month))
    }

    fn creation_order(&self) -> i64 {
        self.updated_at.timestamp_micros()
    }
}

/// Published prices are open-ended: the latest one on or before the date wins.
impl Versioned for PieceZonePrice {
    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    fn creation_order(&self) -> i64 {
        self.id
    }
}

/// Resolves the row that applies on `as_of`.
///
/// Returns `None` when no row applies; callers decide whether that is a
/// warning, a fallback or a hard failure.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, Utc};
/// use precast_pricing::calculation::resolve_as_of;
/// use precast_pricing::models::MaterialZonePrice;
/// use rust_decimal::Decimal;
///
/// let row = |id: i64, from: &str, price: i64| MaterialZonePrice {
///     id,
///     material_id: "CEM-I".to_string(),
///     zone_id: "Z1".to_string(),
///     price: Decimal::from(price),
///     valid_from: NaiveDate::parse_from_str(from, "%Y-%m-%d").unwrap(),
///     valid_until: None,
///     active: true,
///     created_by: "system".to_string(),
///     created_at: Utc::now(),
/// };
/// let rows = vec![row(1, "2024-01-01", 10), row(2, "2024-03-01", 12)];
///
/// let feb = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
/// assert_eq!(resolve_as_of(&rows, feb).unwrap().price, Decimal::from(10));
///
/// let dec_2023 = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
/// assert!(resolve_as_of(&rows, dec_2023).is_none());
/// ```
pub fn resolve_as_of<'a, T, I>(rows: I, as_of: NaiveDate) -> Option<&'a T>
where
    T: Versioned + 'a,
    I: IntoIterator<Item = &'a T>,
{
    rows.into_iter()
        .filter(|row| row.applies_on(as_of))
        .max_by_key(|row| (row.effective_date(), row.creation_order()))
}

/// Resolves the process parameters for the month of `as_of`, falling back to
/// the immediately preceding calendar month.
///
/// `rows` must already be restricted to one zone.
pub fn resolve_process_parameters(
    rows: &[ProcessParameters],
    as_of: NaiveDate,
) -> Option<ResolvedProcessParameters> {
    let requested_month = month_start(as_of);

    if let Some(parameters) = resolve_as_of(rows, as_of) {
        return Some(ResolvedProcessParameters {
            requested_month,
            fallback: false,
            parameters: parameters.clone(),
        });
    }

    resolve_as_of(rows, one_month_back(as_of)).map(|parameters| ResolvedProcessParameters {
        requested_month,
        fallback: true,
        parameters: parameters.clone(),
    })
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// The same day one calendar month earlier, clamped to the end of that
/// month (March 31 becomes February 29 or 28).
pub fn one_month_back(date: NaiveDate) -> NaiveDate {
    date.checked_sub_months(Months::new(1))
        .unwrap_or(NaiveDate::MIN)
}

/// True when `date` falls in the month starting at `month`.
pub fn in_month(date: NaiveDate, month: NaiveDate) -> bool {
    month_start(date) == month_start(month)
}
