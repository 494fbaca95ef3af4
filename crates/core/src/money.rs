use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Formats an amount with the configured currency, grouped thousands, and
/// two decimal places: `PHP 45,000.00` with a symbol where one is common.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let symbol = match currency {
        "PHP" => "\u{20b1}",
        "USD" => "$",
        "EUR" => "\u{20ac}",
        "GBP" => "\u{a3}",
        _ => "",
    };

    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative();
    let fixed = format!("{:.2}", rounded.abs());
    let (integral, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(fixed.len() + integral.len() / 3);
    for (index, digit) in integral.chars().enumerate() {
        if index > 0 && (integral.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    if symbol.is_empty() {
        format!("{sign}{currency} {grouped}.{fraction}")
    } else {
        format!("{sign}{symbol}{grouped}.{fraction}")
    }
}

/// Long-form date used in customer-facing copy, e.g. `March 16, 2026`.
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
