use super::BeatSink;
use crate::beat_stabilizer::BeatEvent;
use crate::error::SinkError;
use std::io::{self, Stdout, Write};

/// Number of cells of the bar visualization.
pub const BAR_CELLS: usize = 10;
/// BPM per filled cell.
const BPM_PER_CELL: f32 = 20.0;

/// Prints beats for a human. Either as a bar that is redrawn in place or as
/// one line per beat.
#[derive(Debug)]
pub struct ConsoleSink<W: Write = Stdout> {
    out: W,
    visual: bool,
}

impl ConsoleSink<Stdout> {
    pub fn stdout(visual: bool) -> Self {
        Self::new(io::stdout(), visual)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub const fn new(out: W, visual: bool) -> Self {
        Self { out, visual }
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Number of filled cells for the given tempo.
fn intensity(bpm: f32) -> usize {
    ((bpm / BPM_PER_CELL) as usize).min(BAR_CELLS)
}

impl<W: Write> BeatSink for ConsoleSink<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn report(&mut self, event: &BeatEvent) -> Result<(), SinkError> {
        if self.visual {
            let filled = intensity(event.bpm);
            write!(self.out, "\r 🎵 ")?;
            for _ in 0..filled {
                write!(self.out, "█")?;
            }
            for _ in filled..BAR_CELLS {
                write!(self.out, "░")?;
            }
            write!(
                self.out,
                " BPM: {:.1} | Conf: {:.2} | Avg: {:.1}",
                event.bpm, event.confidence, event.average_bpm
            )?;
        } else {
            write!(
                self.out,
                "🎵 BEAT! BPM: {:.1} | Conf: {:.2}",
                event.bpm, event.confidence
            )?;
            if let Some(pitch) = event.pitch_hz {
                write!(self.out, " | Pitch: {pitch:.1} Hz")?;
            }
            if event.stable {
                write!(self.out, " | STABLE")?;
            }
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::tests::event;
    use assert2::check;
    use std::string::String;
    use std::vec::Vec;

    fn render(visual: bool, event: &BeatEvent) -> String {
        let mut sink = ConsoleSink::new(Vec::new(), visual);
        sink.report(event).unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn bar_is_scaled_to_bpm() {
        check!(intensity(0.0) == 0);
        check!(intensity(119.0) == 5);
        check!(intensity(120.0) == 6);
        check!(intensity(250.0) == BAR_CELLS);
    }

    #[test]
    fn visual_line() {
        check!(render(true, &event(120.0)) == "\r 🎵 ██████░░░░ BPM: 120.0 | Conf: 0.87 | Avg: 119.8");
    }

    #[test]
    fn plain_line() {
        let mut unstable = event(98.0);
        unstable.stable = false;
        check!(render(false, &unstable) == "🎵 BEAT! BPM: 98.0 | Conf: 0.87\n");
        check!(render(false, &event(120.0)) == "🎵 BEAT! BPM: 120.0 | Conf: 0.87 | STABLE\n");

        let mut pitched = event(120.0);
        pitched.pitch_hz = Some(440.0);
        check!(render(false, &pitched) == "🎵 BEAT! BPM: 120.0 | Conf: 0.87 | Pitch: 440.0 Hz | STABLE\n");
    }
}
