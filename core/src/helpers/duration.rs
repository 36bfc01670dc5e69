use std::time::Duration;

/// Human readable elapsed time for progress and summary lines, e.g. `1h 2m 5s` or `850ms`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    let ms = total_ms % 1000;

    match (hours, minutes, secs) {
        (h, m, _) if h > 0 => format!("{}h {}m {}s", h, m, seconds),
        (0, m, _) if m > 0 => format!("{}m {}s", m, seconds),
        (0, 0, s) if s >= 10 => format!("{}s", s),
        (0, 0, s) if s > 0 => format!("{}s {}ms", s, ms),
        _ => format!("{}ms", total_ms),
    }
}

/// Rows per second over the elapsed time, `0` until a full millisecond has passed.
pub fn rows_per_second(rows: u64, elapsed: Duration) -> u64 {
    let elapsed_ms = elapsed.as_millis();
    if elapsed_ms == 0 {
        return 0;
    }
    ((rows as u128 * 1000) / elapsed_ms) as u64
}
