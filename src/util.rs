// Small helpers shared by the host components.

/// Run time as zero-padded `mm:ss`; `h:mm:ss` past an hour and `Ns` under a minute.
pub fn format_time(ms: f64) -> String {
    let secs = (ms.max(0.0) / 1000.0) as u64;
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{:01}:{:02}:{:02}", h, m, s)
    } else if m > 0 {
        format!("{:02}:{:02}", m, s)
    } else {
        format!("{}s", s)
    }
}

pub fn clog(msg: &str) {
    log::debug!("{msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_by_magnitude() {
        assert_eq!(format_time(12_400.0), "12s");
        assert_eq!(format_time(75_000.0), "01:15");
        assert_eq!(format_time(3_723_000.0), "1:02:03");
    }
}
