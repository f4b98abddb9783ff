use chrono::{Months, NaiveDate};

// Unparseable or unit-less durations resolve to one year.
const DEFAULT_MONTHS: u32 = 12;
const DAYS_PER_MONTH: i64 = 30;

/// Resolves a free-text duration ("6 meses", "2 anos") into a calendar date after `today`.
pub fn deadline_from(duration: &str, today: NaiveDate) -> NaiveDate {
    let months = months_in(duration);
    today
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Month count encoded in a duration string. The month keyword wins over the year keyword,
/// and only the first integer token is read.
pub fn months_in(duration: &str) -> u32 {
    let text = duration.to_lowercase();
    let first_int = first_integer(&text);

    if text.contains("mês") || text.contains("mes") {
        first_int.unwrap_or(DEFAULT_MONTHS)
    } else if text.contains("ano") {
        first_int
            .and_then(|n| n.checked_mul(12))
            .unwrap_or(DEFAULT_MONTHS)
    } else {
        DEFAULT_MONTHS
    }
}

fn first_integer(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Whole months left until `deadline`, rounding up 30-day blocks. Never below 1.
pub fn months_remaining(deadline: NaiveDate, today: NaiveDate) -> u32 {
    let days = (deadline - today).num_days();
    let months = if days <= 0 {
        0
    } else {
        (days + DAYS_PER_MONTH - 1) / DAYS_PER_MONTH
    };
    months.clamp(1, i64::from(u32::MAX)) as u32
}

/// Renders a month count the way goal timeframes are phrased to the user.
pub fn format_timeframe(months: u32) -> String {
    if months < 12 {
        let unit = if months == 1 { "mês" } else { "meses" };
        format!("{months} {unit}")
    } else {
        let years = months / 12;
        let unit = if years == 1 { "ano" } else { "anos" };
        format!("{years} {unit}")
    }
}
