use crate::types::*;
use crossbeam_channel::Receiver;
use log::{debug, error, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// Forwards conductor events to a synth or visualizer over OSC/UDP.
///
/// Addresses:
///   /conductor/note i          note number
///   /conductor/chord i i       chord zone, variant
///   /conductor/phrase_end      (no args)
///   /conductor/viz f f f       x, y, scaled velocity
pub struct OscSender {
    rx: Receiver<ConductorEvent>,
    target: String,
}

impl OscSender {
    pub fn new(rx: Receiver<ConductorEvent>, target: String) -> Self {
        Self { rx, target }
    }

    /// Run the OSC sender loop. Blocks the calling thread.
    pub fn run(&self) {
        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to bind UDP socket: {}", e);
                return;
            }
        };
        info!("OSC sender → {}", self.target);

        for event in self.rx.iter() {
            if let Err(e) = self.send_event(&socket, &event) {
                debug!("OSC send error: {}", e);
            }
        }
        info!("OSC sender shutting down");
    }

    fn send_event(
        &self,
        socket: &UdpSocket,
        event: &ConductorEvent,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let buf = rosc::encoder::encode(&OscPacket::Message(to_message(event)))?;
        socket.send_to(&buf, &self.target)?;
        Ok(())
    }
}

/// OSC message for one event.
pub fn to_message(event: &ConductorEvent) -> OscMessage {
    let (addr, args) = match *event {
        ConductorEvent::NoteOn { note, .. } => ("/conductor/note", vec![OscType::Int(note)]),
        ConductorEvent::ChordChanged { chord, variant, .. } => (
            "/conductor/chord",
            vec![OscType::Int(chord as i32), OscType::Int(variant as i32)],
        ),
        ConductorEvent::PhraseEnded { .. } => ("/conductor/phrase_end", vec![]),
        ConductorEvent::Visualize { x, y, velocity, .. } => (
            "/conductor/viz",
            vec![
                OscType::Float(x as f32),
                OscType::Float(y as f32),
                OscType::Float(velocity as f32),
            ],
        ),
    };
    OscMessage {
        addr: addr.to_string(),
        args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_message_addresses() {
        let m = to_message(&ConductorEvent::NoteOn { t: 0, note: 45 });
        assert_eq!(m.addr, "/conductor/note");
        assert_eq!(m.args, vec![OscType::Int(45)]);

        let m = to_message(&ConductorEvent::ChordChanged { t: 0, chord: 2, variant: 1 });
        assert_eq!(m.addr, "/conductor/chord");
        assert_eq!(m.args, vec![OscType::Int(2), OscType::Int(1)]);

        let m = to_message(&ConductorEvent::PhraseEnded { t: 0 });
        assert!(m.args.is_empty());
    }

    #[test]
    fn test_sends_over_udp() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let (tx, rx) = unbounded();
        tx.send(ConductorEvent::NoteOn { t: 0, note: 52 }).unwrap();
        drop(tx);
        OscSender::new(rx, target).run();

        let mut buf = [0u8; 1024];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..n]).unwrap();
        match packet {
            OscPacket::Message(m) => {
                assert_eq!(m.addr, "/conductor/note");
                assert_eq!(m.args, vec![OscType::Int(52)]);
            }
            other => panic!("expected message, got {:?}", other),
        }
    }
}
