//! Fixed-point number formatting shared by the range display and the report.

/// Format with two decimals and thousands separators, e.g. `12345.5` →
/// `"12,345.50"`.
pub(crate) fn grouped_2dp(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}.{frac_part}")
}
