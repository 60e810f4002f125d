use alloy::primitives::U256;

/// Largest number of fractional digits rendered
pub const MAX_DISPLAY_PLACES: u8 = 18;

/// Convert an integer amount of base units into a decimal string with a fixed
/// number of fractional digits. Extra precision is truncated, never rounded,
/// so a displayed balance is never larger than what the chain holds.
///
/// Falls back to the raw integer when `10^decimals` does not fit in 256 bits.
pub fn format_units_truncated(value: U256, decimals: u8, places: u8) -> String {
    let places = places.min(MAX_DISPLAY_PLACES);

    let Some(divisor) = U256::from(10u64).checked_pow(U256::from(decimals)) else {
        return value.to_string();
    };

    let whole = value / divisor;
    if places == 0 {
        return whole.to_string();
    }

    let remainder = value % divisor;
    let scale = U256::from(10u64).pow(U256::from(places));
    let fractional = match remainder.checked_mul(scale) {
        Some(scaled) => scaled / divisor,
        // remainder < divisor, so dividing first only loses digits beyond `places`
        None => remainder / (divisor / scale),
    };

    format!(
        "{}.{:0>width$}",
        whole,
        fractional.to_string(),
        width = places as usize
    )
}

/// Zero rendered with the given number of fractional digits
pub fn zero_with_places(places: u8) -> String {
    format_units_truncated(U256::ZERO, 0, places)
}
