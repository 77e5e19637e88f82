/// Get the current time in seconds since the UNIX epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn current_time_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Get the current time in seconds since the page was loaded
#[cfg(target_arch = "wasm32")]
pub fn current_time_secs() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|perf| perf.now() / 1000.0)
        .unwrap_or(0.0)
}

/// Nanosecond timestamp, used to name exported files
#[cfg(not(target_arch = "wasm32"))]
pub fn timestamp_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

/// Nanosecond timestamp, used to name exported files
#[cfg(target_arch = "wasm32")]
pub fn timestamp_nanos() -> u128 {
    (current_time_secs() * 1e9) as u128
}
