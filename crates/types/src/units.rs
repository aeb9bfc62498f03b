//! Base-unit (planck) to token conversions.

/// `10^decimals`, or `None` when it does not fit in 128 bits.
pub fn units_per_token(decimals: u32) -> Option<u128> {
    10u128.checked_pow(decimals)
}

/// Render a base-unit amount as a token amount with trailing zeros trimmed,
/// e.g. `1000001` with 5 decimals is `"10.00001"`.
pub fn format_units(amount: u128, decimals: u32) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{digits}", "0".repeat(decimals + 1 - digits.len()))
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_planck_amounts() {
        assert_eq!(format_units(1_000_001, 5), "10.00001");
        assert_eq!(format_units(1_000_000, 5), "10");
        assert_eq!(format_units(100, 5), "0.001");
        assert_eq!(format_units(2_000_040, 5), "20.0004");
    }

    #[test]
    fn handles_edges() {
        assert_eq!(format_units(0, 10), "0");
        assert_eq!(format_units(12_345, 0), "12345");
        assert_eq!(format_units(1, 10), "0.0000000001");
        assert_eq!(format_units(10_000_000_000, 10), "1");
        assert_eq!(
            format_units(u128::MAX, 18),
            "340282366920938463463.374607431768211455"
        );
    }

    #[test]
    fn units_per_token_overflows_cleanly() {
        assert_eq!(units_per_token(10), Some(10_000_000_000));
        assert_eq!(units_per_token(38), Some(10u128.pow(38)));
        assert_eq!(units_per_token(39), None);
    }
}
