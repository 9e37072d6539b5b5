//! Display-formatting for byte counts.

const UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Shown when the output size could not be determined.
pub const UNKNOWN_SIZE: &str = "unknown size";

/// Format a byte count with decimal (base 1000) units, e.g. `~1.5 MB`.
/// Trailing zeros in the fraction are dropped.
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let mut number = format!("{value:.decimals$}");
    if number.contains('.') {
        number = number.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("~{number} {}", UNITS[unit])
}

/// Format an optional size, using the unknown-size sentinel for `None`.
pub fn format_size(bytes: Option<u64>, decimals: usize) -> String {
    match bytes {
        Some(b) => format_bytes(b, decimals),
        None => UNKNOWN_SIZE.to_string(),
    }
}
