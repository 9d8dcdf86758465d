use crate::chord_table::Arrangement;
use crate::session_reader::SESSION_FORMAT;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Records a session: the gesture input (replayable) and every conductor
/// event, each as JSONL, plus a manifest and final stats.
pub struct DataLogger {
    rx: Receiver<ConductorEvent>,
    gesture_rx: Receiver<GestureFrame>,
    session_dir: PathBuf,
    arrangement: Arrangement,
    sample_rate_hz: u32,
}

impl DataLogger {
    pub fn new(
        rx: Receiver<ConductorEvent>,
        gesture_rx: Receiver<GestureFrame>,
        output_dir: &Path,
        arrangement: Arrangement,
        sample_rate_hz: u32,
    ) -> Result<Self, String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        fs::create_dir_all(&session_dir)
            .map_err(|e| format!("create {:?}: {}", session_dir, e))?;

        Ok(Self {
            rx,
            gesture_rx,
            session_dir,
            arrangement,
            sample_rate_hz,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger until the event channel closes. Blocks the calling thread.
    pub fn run(&self) {
        info!("Data logger → {:?}", self.session_dir);
        if let Err(e) = self.record() {
            error!("Data logger stopped: {}", e);
        }
    }

    fn record(&self) -> Result<(), String> {
        self.write_manifest()?;

        let mut events_writer = create(&self.session_dir.join("events.jsonl"))?;
        let mut gestures_writer = create(&self.session_dir.join("gestures.jsonl"))?;

        let header = json!({
            "format": SESSION_FORMAT,
            "rate_hz": self.sample_rate_hz,
            "arrangement": self.arrangement.name,
        });
        writeln!(gestures_writer, "{}", header).map_err(|e| format!("write header: {}", e))?;

        let mut event_count: u64 = 0;
        let mut gesture_count: u64 = 0;
        let mut note_count: u64 = 0;
        let mut phrase_count: u64 = 0;

        loop {
            // Non-blocking drain of gesture input
            while let Ok(frame) = self.gesture_rx.try_recv() {
                write_line(&mut gestures_writer, &CompactGesture::from(&frame))?;
                gesture_count += 1;
            }

            // Blocking receive of conductor events
            match self.rx.recv() {
                Ok(event) => {
                    match event {
                        ConductorEvent::NoteOn { .. } => note_count += 1,
                        ConductorEvent::PhraseEnded { .. } => phrase_count += 1,
                        _ => {}
                    }
                    write_line(&mut events_writer, &event)?;
                    event_count += 1;

                    if event_count % 1000 == 0 {
                        let _ = events_writer.flush();
                        let _ = gestures_writer.flush();
                        info!("Logged {} events, {} gesture samples", event_count, gesture_count);
                    }
                }
                Err(_) => break,
            }
        }

        // The coordinator has stopped; collect whatever input is left.
        for frame in self.gesture_rx.try_iter() {
            write_line(&mut gestures_writer, &CompactGesture::from(&frame))?;
            gesture_count += 1;
        }
        let _ = events_writer.flush();
        let _ = gestures_writer.flush();

        let stats = json!({
            "total_events": event_count,
            "total_gestures": gesture_count,
            "notes": note_count,
            "phrases": phrase_count,
        });
        write_json(&self.session_dir.join("stats.json"), &stats)?;

        info!(
            "Session saved: {} gestures, {} notes in {} phrases → {:?}",
            gesture_count, note_count, phrase_count, self.session_dir
        );
        Ok(())
    }

    fn write_manifest(&self) -> Result<(), String> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": SESSION_FORMAT,
            "arrangement": self.arrangement,
            "constants": {
                "base_pitch": BASE_PITCH,
                "octave_span": OCTAVE_SPAN,
                "octave_zones": OCTAVE_ZONES_COUNT,
                "velocity_scale": VELOCITY_SCALE,
                "release_ms": RELEASE_TIME.as_millis() as u64,
            },
            "input_config": {
                "rate_hz": self.sample_rate_hz,
                "files": ["gestures.jsonl", "events.jsonl"],
            },
        });
        write_json(&self.session_dir.join("manifest.json"), &manifest)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, String> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| format!("create {:?}: {}", path, e))
}

fn write_line<T: serde::Serialize>(w: &mut BufWriter<File>, value: &T) -> Result<(), String> {
    let line = serde_json::to_string(value).map_err(|e| format!("encode: {}", e))?;
    writeln!(w, "{}", line).map_err(|e| format!("write: {}", e))
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| format!("encode: {}", e))?;
    fs::write(path, text).map_err(|e| format!("write {:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord_table::default_arrangement;
    use crate::session_reader::SessionReader;
    use crossbeam_channel::unbounded;
    use std::io::BufReader;

    #[test]
    fn test_session_written_and_replayable() {
        let out = std::env::temp_dir().join(format!("swipe-conductor-test-{}", std::process::id()));
        let (ev_tx, ev_rx) = unbounded();
        let (g_tx, g_rx) = unbounded();
        let logger = DataLogger::new(ev_rx, g_rx, &out, default_arrangement(), 120).unwrap();

        let surface = SurfaceBounds::new(400.0, 600.0).unwrap();
        for t in 0..3u64 {
            g_tx.send(GestureFrame {
                sample: GestureSample::new(t * 1000, Point::new(5.0, 5.0), Point::new(0.0, 1.0), 1),
                surface,
            })
            .unwrap();
        }
        ev_tx.send(ConductorEvent::NoteOn { t: 10, note: 28 }).unwrap();
        ev_tx.send(ConductorEvent::PhraseEnded { t: 600_000 }).unwrap();
        drop(ev_tx);
        drop(g_tx);

        logger.run();
        let dir = logger.session_dir().to_path_buf();

        let file = File::open(dir.join("gestures.jsonl")).unwrap();
        let reader = SessionReader::open(BufReader::new(file)).unwrap();
        assert_eq!(reader.header.rate_hz, 120);
        assert_eq!(reader.read_all().len(), 3);

        let events = fs::read_to_string(dir.join("events.jsonl")).unwrap();
        assert_eq!(events.lines().count(), 2);

        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("stats.json")).unwrap()).unwrap();
        assert_eq!(stats["notes"], 1);
        assert_eq!(stats["phrases"], 1);

        let manifest = fs::read_to_string(dir.join("manifest.json")).unwrap();
        assert!(manifest.contains("E major"));

        let _ = fs::remove_dir_all(&out);
    }
}
