/// "HH:MM:SS" clock rendering of a millisecond duration
pub fn clock_format(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// "Xh Ym Zs" rendering used by the markdown report
pub fn human_format(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!(
        "{}h {}m {}s",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// "Xm Ys" offset of a marker relative to the session start
pub fn offset_format(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}
