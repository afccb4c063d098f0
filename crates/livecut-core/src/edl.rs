// crates/livecut-core/src/edl.rs
//
// Cut log: every committed switch recorded as (timecode, source), serialized
// as a minimal CMX-style EDL so downstream tools can reconstruct which feed
// was live when. livecut-app writes the log next to the output files on
// shutdown.

use std::fmt::Write as _;

use crate::frame::SourceId;
use crate::helpers::time::format_timecode;

/// One committed switch: the elected source and when it took over.
#[derive(Debug, Clone, PartialEq)]
pub struct CutEvent {
    /// Seconds since the session started.
    pub at_secs: f64,
    pub source:  SourceId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutLog {
    events: Vec<CutEvent>,
    fps:    u32,
}

impl CutLog {
    pub fn new(fps: u32) -> Self {
        Self { events: Vec::new(), fps }
    }

    pub fn record(&mut self, at_secs: f64, source: SourceId) {
        self.events.push(CutEvent { at_secs, source });
    }

    pub fn events(&self) -> &[CutEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Render the log as EDL text:
    ///
    /// ```text
    /// TITLE: livecut session
    /// FCM: NON-DROP FRAME
    ///
    /// 001  AX  V  C  00:00:00:00
    /// * FROM CLIP NAME: cam:0
    /// ```
    pub fn to_edl(&self) -> String {
        let mut out = String::new();
        out.push_str("TITLE: livecut session\nFCM: NON-DROP FRAME\n\n");
        for (i, ev) in self.events.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:03}  AX  V  C  {}",
                i + 1,
                format_timecode(ev.at_secs, self.fps),
            );
            let _ = writeln!(out, "* FROM CLIP NAME: {}", ev.source);
        }
        out
    }

    /// Parse `(timecode, clip-name)` pairs back out of EDL text produced by
    /// `to_edl`. Lines that aren't an event/comment pair are skipped.
    pub fn parse_edl(text: &str) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut pending_tc: Option<String> = None;
        for line in text.lines() {
            if let Some(name) = line.strip_prefix("* FROM CLIP NAME: ") {
                if let Some(tc) = pending_tc.take() {
                    pairs.push((tc, name.trim().to_string()));
                }
            } else if let Some(tc) = line.split_whitespace().last() {
                // Event lines end in a timecode; header lines don't.
                if tc.bytes().filter(|&b| b == b':').count() == 3 {
                    pending_tc = Some(tc.to_string());
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_edl_text() {
        let mut log = CutLog::new(30);
        log.record(0.0, SourceId::Camera(0));
        log.record(61.5, SourceId::Camera(2));
        let text = log.to_edl();
        let pairs = CutLog::parse_edl(&text);
        assert_eq!(
            pairs,
            vec![
                ("00:00:00:00".to_string(), "cam:0".to_string()),
                ("00:01:01:15".to_string(), "cam:2".to_string()),
            ]
        );
    }

    #[test]
    fn empty_log_renders_header_only() {
        let log = CutLog::new(30);
        let text = log.to_edl();
        assert!(text.starts_with("TITLE:"));
        assert!(CutLog::parse_edl(&text).is_empty());
    }
}
