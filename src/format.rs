use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DisplayConfig;

fn group_int_digits(int_part: &str) -> String {
    // Insert commas every 3 digits.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

fn pad_fraction_to_dp(s: &str, dp: u32) -> String {
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if dp == 0 {
        return int_part.to_string();
    }

    let frac: String = frac_part
        .chars()
        .chain(std::iter::repeat('0'))
        .take(dp as usize)
        .collect();
    format!("{int_part}.{frac}")
}

/// Render a notional amount for the report, e.g. `$1,234,567.50`.
///
/// Rounds half away from zero to `currency_decimals`, then applies padding,
/// grouping and the symbol as configured. The sign follows the symbol, so
/// negative amounts render as `$-5.00`.
pub fn format_currency(value: Decimal, display: &DisplayConfig) -> String {
    let rounded = match display.currency_decimals {
        Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        None => value,
    };

    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let mut s = rounded.abs().normalize().to_string();

    if display.currency_fixed_decimals {
        if let Some(dp) = display.currency_decimals {
            s = pad_fraction_to_dp(&s, dp);
        }
    }
    if display.currency_grouping {
        s = match s.split_once('.') {
            Some((int_part, frac)) => format!("{}.{frac}", group_int_digits(int_part)),
            None => group_int_digits(&s),
        };
    }

    let mut out = String::new();
    if let Some(symbol) = &display.currency_symbol {
        out.push_str(symbol);
    }
    if negative {
        out.push('-');
    }
    out.push_str(&s);
    out
}
