/// Renders a unix timestamp as local `HH:MM:SS`, or `"--:--:--"` for the
/// zero sentinel (a stats row whose process hasn't recorded that field yet).
pub fn format_local_hms(unix_seconds: i64) -> String {
    if unix_seconds == 0 {
        return "--:--:--".to_string();
    }
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    let t = unix_seconds as libc::time_t;
    // SAFETY: `tm` is a valid out-pointer, `t` is a plain integer.
    unsafe {
        libc::localtime_r(&t, &mut tm);
    }
    format!("{:02}:{:02}:{:02}", tm.tm_hour, tm.tm_min, tm.tm_sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timestamp_renders_as_placeholder() {
        assert_eq!(format_local_hms(0), "--:--:--");
    }

    #[test]
    fn nonzero_timestamp_renders_as_hh_mm_ss() {
        let rendered = format_local_hms(1_700_000_000);
        assert_eq!(rendered.len(), 8);
        assert_eq!(rendered.chars().nth(2), Some(':'));
        assert_eq!(rendered.chars().nth(5), Some(':'));
    }
}
