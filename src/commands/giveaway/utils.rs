use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(r"^(?P<amount>\d+)(?P<unit>[smhd])$").unwrap();
}

// Parses giveaway durations in the `10s` / `10m` / `1h` / `1d` format.
// Returns None for anything that isn't a positive duration.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let captures = DURATION_REGEX.captures(text.trim())?;
    let amount = captures.name("amount")?.as_str().parse::<i64>().ok()?;
    if amount <= 0 {
        return None;
    }

    let seconds = match captures.name("unit")?.as_str() {
        "s" => amount,
        "m" => amount * 60,
        "h" => amount * 3600,
        "d" => amount * 86400,
        _ => return None,
    };
    Some(Duration::seconds(seconds))
}
