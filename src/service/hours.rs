use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::AppError;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Worked hours between check-in and check-out, rounded half-up to two
/// decimals. A check-out before the check-in is an `InvalidInterval`.
pub fn hours_worked(check_in: NaiveDateTime, check_out: NaiveDateTime) -> Result<Decimal, AppError> {
    if check_out < check_in {
        return Err(AppError::InvalidInterval { check_in, check_out });
    }

    let millis = (check_out - check_in).num_milliseconds();
    let hours = Decimal::from(millis) / Decimal::from(MILLIS_PER_HOUR);

    Ok(hours.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}
