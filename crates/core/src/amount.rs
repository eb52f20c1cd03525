//! Amount Codec
//!
//! Converts between human-facing decimal quantities and integer base units
//! (lamports, token minor units). All arithmetic runs on `Decimal`
//! mantissa/scale pairs so repeated conversions never drift.

use rand::Rng;
use rust_decimal::Decimal;

use crate::error::{VolumeError, VolumeResult};

/// Decimal exponent of SOL (1 SOL = 10^9 lamports)
pub const SOL_DECIMALS: u32 = 9;

/// Scale a UI amount into base units, truncating toward zero.
pub fn to_base_units(ui_amount: Decimal, decimals: u32) -> VolumeResult<u64> {
    if ui_amount.is_sign_negative() && !ui_amount.is_zero() {
        return Err(VolumeError::Amount(format!(
            "negative amount {} cannot be converted to base units",
            ui_amount
        )));
    }

    let mantissa = ui_amount.mantissa();
    let scale = ui_amount.scale();

    let scaled = if decimals >= scale {
        10i128
            .checked_pow(decimals - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
            .ok_or_else(|| {
                VolumeError::Amount(format!(
                    "{} with {} decimals overflows base units",
                    ui_amount, decimals
                ))
            })?
    } else {
        // scale <= 28, so the divisor always fits in i128
        mantissa / 10i128.pow(scale - decimals)
    };

    u64::try_from(scaled).map_err(|_| {
        VolumeError::Amount(format!(
            "{} with {} decimals does not fit in u64 base units",
            ui_amount, decimals
        ))
    })
}

/// Exact inverse of [`to_base_units`].
pub fn to_ui_amount(base_units: u64, decimals: u32) -> VolumeResult<Decimal> {
    Decimal::try_from_i128_with_scale(base_units as i128, decimals).map_err(|e| {
        VolumeError::Amount(format!(
            "cannot scale {} by {} decimals: {}",
            base_units, decimals, e
        ))
    })
}

/// `(base / 100) * percent` with floor division.
///
/// The sub-percent remainder is dropped so the result can never exceed
/// `base_units`. `percent` is clamped to 100.
pub fn percent_of(base_units: u64, percent: u8) -> u64 {
    (base_units / 100) * u64::from(percent.min(100))
}

pub fn parse_sol(ui_amount: Decimal) -> VolumeResult<u64> {
    to_base_units(ui_amount, SOL_DECIMALS)
}

pub fn format_sol(lamports: u64) -> String {
    format_token(lamports, SOL_DECIMALS)
}

pub fn format_token(base_units: u64, decimals: u32) -> String {
    match to_ui_amount(base_units, decimals) {
        Ok(ui) => ui.normalize().to_string(),
        Err(_) => format!("{}e-{}", base_units, decimals),
    }
}

/// Uniform draw in `[low, high)`; an empty range yields `low`.
pub fn draw_between<R: Rng + ?Sized>(rng: &mut R, low: u64, high: u64) -> u64 {
    if high <= low {
        low
    } else {
        rng.gen_range(low..high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_sol_to_lamports() {
        assert_eq!(parse_sol(dec("1")).unwrap(), 1_000_000_000);
        assert_eq!(parse_sol(dec("0.000000001")).unwrap(), 1);
        assert_eq!(parse_sol(dec("0.25")).unwrap(), 250_000_000);
    }

    #[test]
    fn test_truncates_extra_precision() {
        // 6-decimal token, 9 fractional digits supplied
        assert_eq!(to_base_units(dec("1.234567999"), 6).unwrap(), 1_234_567);
        assert_eq!(to_base_units(dec("0.0000009"), 6).unwrap(), 0);
    }

    #[test]
    fn test_round_trip_law() {
        let cases = [
            ("0", 9),
            ("1", 0),
            ("0.5", 1),
            ("123.456789", 6),
            ("999999999.999999999", 9),
            ("1000000000", 9),
            ("0.000000001", 9),
            ("42.42", 2),
        ];

        for (raw, decimals) in cases {
            let ui = dec(raw);
            let base = to_base_units(ui, decimals).unwrap();
            assert_eq!(to_ui_amount(base, decimals).unwrap(), ui, "case {raw}/{decimals}");
        }
    }

    #[test]
    fn test_rejects_negative_and_overflow() {
        assert!(to_base_units(dec("-0.1"), 9).is_err());
        assert!(to_base_units(dec("100000000000"), 9).is_err());
        assert_eq!(to_base_units(dec("-0"), 9).unwrap(), 0);
    }

    #[test]
    fn test_percent_of_never_exceeds_balance() {
        for balance in [0u64, 1, 99, 100, 101, 12_345, 1_000_000_007, u64::MAX] {
            let swept = percent_of(balance, 99);
            assert!(swept <= balance);
            let remainder = balance - swept;
            // remainder = balance/100 + (balance % 100)
            assert!(remainder < balance / 100 + 100);
            if balance % 100 == 0 {
                assert!(remainder < balance / 100 + 1);
            }
        }
        assert_eq!(percent_of(1_000, 99), 990);
        assert_eq!(percent_of(199, 99), 99);
        assert_eq!(percent_of(500, 250), 500);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_sol(1_500_000_000), "1.5");
        assert_eq!(format_token(1_000, 3), "1");
        assert_eq!(format_token(5, 6), "0.000005");
    }

    #[test]
    fn test_draw_between_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let v = draw_between(&mut rng, 10, 20);
            assert!((10..20).contains(&v));
        }
        let mut zero = StepRng::new(0, 0);
        assert_eq!(draw_between(&mut zero, 10, 20), 10);
        assert_eq!(draw_between(&mut zero, 30, 30), 30);
    }
}
