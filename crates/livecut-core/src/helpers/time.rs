// crates/livecut-core/src/helpers/time.rs
//
// Timecode formatting shared by the cut log and the preview overlay.

/// Format seconds as `HH:MM:SS:FF` at the given frame rate.
///
/// ```
/// use livecut_core::helpers::time::format_timecode;
/// assert_eq!(format_timecode(0.0, 30),    "00:00:00:00");
/// assert_eq!(format_timecode(61.5, 30),   "00:01:01:15");
/// assert_eq!(format_timecode(3600.0, 30), "01:00:00:00");
/// ```
pub fn format_timecode(secs: f64, fps: u32) -> String {
    let h  = (secs / 3600.0) as u32;
    let m  = ((secs / 60.0) as u32) % 60;
    let s  = (secs as u32) % 60;
    let fr = ((secs * fps as f64) as u32) % fps.max(1);
    format!("{h:02}:{m:02}:{s:02}:{fr:02}")
}

/// Format a duration in seconds as a compact human-readable string for the
/// preview window title bar.
pub fn format_duration(secs: f64) -> String {
    if secs >= 3600.0 {
        format!(
            "{}:{:02}:{:02}",
            secs as u64 / 3600,
            (secs as u64 % 3600) / 60,
            secs as u64 % 60,
        )
    } else if secs >= 60.0 {
        format!("{}:{:02}", secs as u64 / 60, secs as u64 % 60)
    } else {
        format!("{secs:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timecode_carries_into_hours() {
        assert_eq!(format_timecode(3661.0, 25), "01:01:01:00");
    }

    #[test]
    fn timecode_frame_part_respects_fps() {
        assert_eq!(format_timecode(0.5, 30), "00:00:00:15");
        assert_eq!(format_timecode(0.5, 60), "00:00:00:30");
    }

    #[test]
    fn durations_pick_the_right_unit() {
        assert_eq!(format_duration(4.2), "4.2s");
        assert_eq!(format_duration(187.0), "3:07");
        assert_eq!(format_duration(3875.0), "1:04:35");
    }
}
