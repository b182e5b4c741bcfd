//! Playback time formatting

/// Format seconds as `m:ss`, e.g. `0:07` or `3:05`
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_under_a_minute() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(7), "0:07");
        assert_eq!(format_time(59), "0:59");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_time(60), "1:00");
        assert_eq!(format_time(185), "3:05");
        assert_eq!(format_time(3725), "62:05");
    }
}
