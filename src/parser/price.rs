const RANGE_SEPARATORS: &[char] = &['-', '–'];

/// Parse a scraped price cell into `(min, max)`.
///
/// Accepts "50", "1,250.00" and ranges like "50-60" or "50–60" (en-dash).
/// A range is returned exactly as written, so "60-50" yields `(60.0, 50.0)`.
/// Anything else (empty, non-numeric, more than one separator) is `None`.
pub fn parse_price_range(text: &str) -> Option<(f64, f64)> {
    let cleaned = text.replace(',', "");
    let cleaned = cleaned.trim();

    if cleaned.contains(RANGE_SEPARATORS) {
        let parts: Vec<&str> = cleaned.split(RANGE_SEPARATORS).collect();
        if let [min, max] = parts.as_slice() {
            return Some((parse_number(min)?, parse_number(max)?));
        }
    }

    let price = parse_number(cleaned)?;
    Some((price, price))
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to two decimals, half away from zero. Values too large to carry
/// cents (or to scale by 100 without overflowing) come back unchanged.
pub fn round2(value: f64) -> f64 {
    let cents = value * 100.0;
    if value.abs() >= 1e15 || !cents.is_finite() {
        return value;
    }
    cents.round() / 100.0
}
