//! Published price history and period-over-period comparison.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{HistoryEntry, PieceZonePrice, PriceComparison, Trend};

use super::{one_month_back, resolve_as_of};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Percentage change from `previous`, rounded to two decimals.
///
/// Returns `None` when `previous` is zero.
///
/// # Example
///
/// ```
/// use precast_pricing::calculation::delta_percent;
/// use rust_decimal::Decimal;
///
/// let pct = delta_percent(Decimal::from(10), Decimal::from(300));
/// assert_eq!(pct, Some(Decimal::new(333, 2)));
/// assert_eq!(delta_percent(Decimal::from(10), Decimal::ZERO), None);
/// ```
pub fn delta_percent(delta: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    delta
        .checked_div(previous)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Annotates published prices with the change from the preceding row of the
/// same zone, newest first, then keeps the first `limit` entries.
///
/// Annotation runs over all rows before truncation, so the oldest returned
/// entry still compares against its predecessor.
pub fn annotate_history(mut rows: Vec<PieceZonePrice>, limit: usize) -> Vec<HistoryEntry> {
    rows.sort_by_key(|row| (row.effective_date, row.id));

    let mut last_by_zone: HashMap<String, Decimal> = HashMap::new();
    let mut entries: Vec<HistoryEntry> = rows
        .into_iter()
        .map(|price| {
            let unit_price = price.unit_price();
            let previous_price = last_by_zone.insert(price.zone_id.clone(), unit_price);
            let delta = previous_price.and_then(|previous| unit_price.checked_sub(previous));
            let delta_percent = previous_price
                .zip(delta)
                .and_then(|(previous, delta)| delta_percent(delta, previous));

            HistoryEntry {
                price,
                unit_price,
                previous_price,
                delta,
                delta_percent,
                trend: Trend::from_delta(delta),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.price
            .effective_date
            .cmp(&a.price.effective_date)
            .then_with(|| a.price.zone_id.cmp(&b.price.zone_id))
    });
    entries.truncate(limit);
    entries
}

/// Compares the price in effect on `date` with the one in effect a calendar
/// month earlier.
///
/// `rows` must already be restricted to one (piece, zone).
pub fn compare_prices(
    piece_id: &str,
    zone_id: &str,
    date: NaiveDate,
    rows: &[PieceZonePrice],
) -> PriceComparison {
    let previous_date = one_month_back(date);
    let current = resolve_as_of(rows, date);
    let previous = resolve_as_of(rows, previous_date);

    let current_price = current.map(PieceZonePrice::unit_price);
    let previous_price = previous.map(PieceZonePrice::unit_price);
    let delta = current_price
        .zip(previous_price)
        .and_then(|(current, previous)| current.checked_sub(previous));
    let delta_percent = previous_price
        .zip(delta)
        .and_then(|(previous, delta)| delta_percent(delta, previous));

    PriceComparison {
        piece_id: piece_id.to_string(),
        zone_id: zone_id.to_string(),
        date,
        current_price,
        current_effective_date: current.map(|p| p.effective_date),
        previous_date,
        previous_price,
        previous_effective_date: previous.map(|p| p.effective_date),
        delta,
        delta_percent,
        trend: Trend::from_delta(delta),
    }
}
