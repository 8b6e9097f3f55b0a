//! MIDI note mapping.
//!
//! Listening to a MIDI port is left to the caller; this module turns raw
//! channel messages into note events and note numbers into frequencies.

/// Convert a MIDI note number to frequency in Hz (A4 = note 69 = 440 Hz).
pub fn midi_to_frequency(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
}

impl NoteEvent {
    /// Parse a raw three-byte channel message.
    ///
    /// Only note-on (0x9n) and note-off (0x8n) are recognised; a note-on with
    /// velocity 0 is reported as a note-off. Everything else is `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<NoteEvent> {
        let &[status, note, velocity, ..] = bytes else {
            return None;
        };
        if note > 0x7f || velocity > 0x7f {
            return None;
        }
        let channel = status & 0x0f;
        match status & 0xf0 {
            0x90 if velocity > 0 => Some(NoteEvent::NoteOn { channel, note, velocity }),
            0x90 | 0x80 => Some(NoteEvent::NoteOff { channel, note }),
            _ => None,
        }
    }

    pub fn note(&self) -> u8 {
        match *self {
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => note,
        }
    }

    pub fn frequency(&self) -> f64 {
        midi_to_frequency(self.note())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert_eq!(midi_to_frequency(69), 440.0);
        assert!((midi_to_frequency(81) - 880.0).abs() < 1e-9);
        assert!((midi_to_frequency(60) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn parses_note_messages() {
        assert_eq!(
            NoteEvent::from_bytes(&[0x92, 64, 100]),
            Some(NoteEvent::NoteOn { channel: 2, note: 64, velocity: 100 })
        );
        assert_eq!(
            NoteEvent::from_bytes(&[0x80, 64, 40]),
            Some(NoteEvent::NoteOff { channel: 0, note: 64 })
        );
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        assert_eq!(
            NoteEvent::from_bytes(&[0x9f, 12, 0]),
            Some(NoteEvent::NoteOff { channel: 15, note: 12 })
        );
    }

    #[test]
    fn ignores_other_messages() {
        assert_eq!(NoteEvent::from_bytes(&[0xb0, 7, 100]), None); // control change
        assert_eq!(NoteEvent::from_bytes(&[0x90, 64]), None);
        assert_eq!(NoteEvent::from_bytes(&[0x90, 200, 10]), None);
    }

    #[test]
    fn event_frequency() {
        let ev = NoteEvent::from_bytes(&[0x90, 69, 90]).unwrap();
        assert_eq!(ev.note(), 69);
        assert_eq!(ev.frequency(), 440.0);
    }
}
