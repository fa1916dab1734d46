const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const BASE: u64 = 1024;

/// Format a byte count with base-1024 units and two decimals.
///
/// The largest unit keeping the value `>= 1` is chosen; `0` formats as `"0 B"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0usize;
    let mut scale = 1u64;
    while exponent + 1 < UNITS.len() {
        let Some(next) = scale.checked_mul(BASE) else {
            break;
        };
        if bytes < next {
            break;
        }
        scale = next;
        exponent += 1;
    }

    let value = bytes as f64 / scale as f64;
    format!("{value:.2} {}", UNITS[exponent])
}

/// Percentage by which `output` is smaller than `original`.
///
/// Negative when the output grew. Returns `0.0` for an empty original.
pub fn compression_ratio(original: u64, output: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - output as f64 / original as f64) * 100.0
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/format.rs"]
mod tests;
