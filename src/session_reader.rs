//! JSONL session reader: parses recorded gesture sessions back into frames.
//!
//! Reads the header line (format, arrangement, sample rate) then yields
//! gesture frames one at a time. Works with any `BufRead`: files, in-memory
//! buffers, stdin.

use crate::gesture::touches_supported;
use crate::types::{CompactGesture, GestureFrame};
use crossbeam_channel::Sender;
use log::{info, warn};
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

/// Value of the header's `"format"` field.
pub const SESSION_FORMAT: &str = "swipe-conductor";

/// Parsed JSONL header (first line of a gestures file).
#[derive(Debug)]
pub struct SessionHeader {
    pub format: String,
    pub rate_hz: u32,
    pub arrangement_name: String,
    pub raw: serde_json::Value,
}

/// Line-by-line JSONL session reader.
pub struct SessionReader<R: BufRead> {
    reader: R,
    pub header: SessionHeader,
    line_buf: String,
    variant_count: Option<usize>,
}

impl<R: BufRead> SessionReader<R> {
    /// Read and validate the header line. Returns an error if the header
    /// is missing, unparseable, or lacks a `"format": "swipe-conductor"` field.
    pub fn open(mut reader: R) -> Result<Self, String> {
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| format!("read header: {}", e))?;

        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err("empty file".into());
        }

        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(|e| format!("parse header: {}", e))?;

        let format = raw["format"]
            .as_str()
            .ok_or("missing \"format\" field")?
            .to_string();
        if format != SESSION_FORMAT {
            return Err(format!("unknown format: {}", format));
        }

        let rate_hz = raw["rate_hz"].as_u64().unwrap_or(60) as u32;
        let arrangement_name = raw["arrangement"].as_str().unwrap_or("").to_string();

        Ok(Self {
            reader,
            header: SessionHeader {
                format,
                rate_hz,
                arrangement_name,
                raw,
            },
            line_buf: String::new(),
            variant_count: None,
        })
    }

    /// Reject frames whose finger count needs a voicing beyond the first
    /// `variant_count` of the chord table that will play them.
    pub fn with_variant_count(mut self, variant_count: usize) -> Self {
        self.variant_count = Some(variant_count);
        self
    }

    /// Read the next frame. Returns `None` at EOF, `Err` for unparseable
    /// lines, frames with an invalid surface, or frames with more fingers
    /// than the variant limit allows.
    pub fn next_frame(&mut self) -> Option<Result<GestureFrame, String>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let variant_count = self.variant_count;
                    return Some(
                        serde_json::from_str::<CompactGesture>(trimmed)
                            .map_err(|e| format!("parse frame: {}", e))
                            .and_then(GestureFrame::try_from)
                            .and_then(|frame| match variant_count {
                                Some(n) if !touches_supported(frame.sample.touches, n) => {
                                    Err(format!(
                                        "frame at t={} has {} touches, table has {} variants",
                                        frame.sample.timestamp_us, frame.sample.touches, n
                                    ))
                                }
                                _ => Ok(frame),
                            }),
                    );
                }
                Err(e) => return Some(Err(format!("read line: {}", e))),
            }
        }
    }

    /// Read all remaining frames, skipping rejected lines.
    pub fn read_all(mut self) -> Vec<GestureFrame> {
        let mut frames = Vec::new();
        let mut skipped = 0usize;
        while let Some(result) = self.next_frame() {
            match result {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    if skipped == 0 {
                        warn!("Skipping session line: {}", e);
                    }
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!("Skipped {} unusable session lines", skipped);
        }
        frames
    }
}

/// Feed recorded frames to the coordinator with their original spacing.
/// Stops early if the receiver hangs up.
pub fn replay(frames: &[GestureFrame], tx: &Sender<GestureFrame>) {
    let first_us = match frames.first() {
        Some(f) => f.sample.timestamp_us,
        None => return,
    };
    info!("Replaying {} gesture samples", frames.len());
    let start = Instant::now();
    for frame in frames {
        let offset = frame.sample.timestamp_us.saturating_sub(first_us);
        let due = start + Duration::from_micros(offset);
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        if tx.send(*frame).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GestureSample, Point, SurfaceBounds};
    use std::io::Cursor;

    fn minimal_header() -> String {
        r#"{"format":"swipe-conductor","rate_hz":120,"arrangement":"Test"}"#.to_string()
    }

    fn minimal_frame(ts: u64) -> String {
        frame_with_touches(ts, 1)
    }

    fn frame_with_touches(ts: u64, touches: u32) -> String {
        let frame = GestureFrame {
            sample: GestureSample::new(ts, Point::new(10.0, 20.0), Point::new(0.0, -5.0), touches),
            surface: SurfaceBounds::new(400.0, 600.0).unwrap(),
        };
        serde_json::to_string(&CompactGesture::from(&frame)).unwrap()
    }

    #[test]
    fn test_open_valid_header() {
        let data = minimal_header() + "\n";
        let reader = SessionReader::open(Cursor::new(data)).unwrap();
        assert_eq!(reader.header.format, "swipe-conductor");
        assert_eq!(reader.header.rate_hz, 120);
        assert_eq!(reader.header.arrangement_name, "Test");
    }

    #[test]
    fn test_open_missing_format() {
        let data = r#"{"rate_hz":60}"#.to_string() + "\n";
        let err = SessionReader::open(Cursor::new(data)).err().unwrap();
        assert!(err.contains("format"), "got: {}", err);
    }

    #[test]
    fn test_open_wrong_format() {
        let data = r#"{"format":"something-else"}"#.to_string() + "\n";
        let err = SessionReader::open(Cursor::new(data)).err().unwrap();
        assert!(err.contains("unknown format"), "got: {}", err);
    }

    #[test]
    fn test_open_empty_file() {
        assert!(SessionReader::open(Cursor::new("")).is_err());
    }

    #[test]
    fn test_read_frames() {
        let mut data = minimal_header() + "\n";
        data += &minimal_frame(1000);
        data += "\n\n";
        data += &minimal_frame(2000);
        data += "\n";

        let frames = SessionReader::open(Cursor::new(data)).unwrap().read_all();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].sample.timestamp_us, 1000);
        assert_eq!(frames[1].sample.timestamp_us, 2000);
        assert_eq!(frames[0].sample.velocity.y, -5.0);
        assert_eq!(frames[0].surface.height(), 600.0);
    }

    #[test]
    fn test_read_all_skips_malformed() {
        let mut data = minimal_header() + "\n";
        data += &minimal_frame(1000);
        data += "\nthis is not json\n";
        data += r#"{"t":2000,"x":0,"y":0,"vx":0,"vy":0,"n":1,"w":0,"h":600}"#;
        data += "\n";
        data += &minimal_frame(3000);
        data += "\n";

        let frames = SessionReader::open(Cursor::new(data)).unwrap().read_all();
        assert_eq!(frames.len(), 2, "should skip garbled line and zero-width surface");
        assert_eq!(frames[1].sample.timestamp_us, 3000);
    }

    #[test]
    fn test_replay_keeps_spacing() {
        let mut data = minimal_header() + "\n";
        for ts in [5_000u64, 25_000, 45_000] {
            data += &minimal_frame(ts);
            data += "\n";
        }
        let frames = SessionReader::open(Cursor::new(data)).unwrap().read_all();
        let (tx, rx) = crossbeam_channel::unbounded();
        let start = Instant::now();
        replay(&frames, &tx);
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(rx.try_iter().count(), 3);
    }

    #[test]
    fn test_next_frame_reports_error() {
        let data = minimal_header() + "\ngarbage\n";
        let mut reader = SessionReader::open(Cursor::new(data)).unwrap();
        assert!(reader.next_frame().unwrap().is_err());
        assert!(reader.next_frame().is_none());
    }

    #[test]
    fn test_next_frame_rejects_touches_beyond_table() {
        let mut data = minimal_header() + "\n";
        data += &frame_with_touches(1000, 6);
        data += "\n";
        data += &frame_with_touches(2000, 5);
        data += "\n";
        let mut reader = SessionReader::open(Cursor::new(data))
            .unwrap()
            .with_variant_count(5);
        let err = reader.next_frame().unwrap().err().unwrap();
        assert!(err.contains("6 touches"), "got: {}", err);
        assert_eq!(reader.next_frame().unwrap().unwrap().sample.touches, 5);
    }

    #[test]
    fn test_read_all_without_limit_keeps_any_touch_count() {
        let data = minimal_header() + "\n" + &frame_with_touches(1000, 9) + "\n";
        let frames = SessionReader::open(Cursor::new(data)).unwrap().read_all();
        assert_eq!(frames.len(), 1);
    }
}
