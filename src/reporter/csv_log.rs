use super::BeatSink;
use crate::beat_stabilizer::BeatEvent;
use crate::error::SinkError;
use chrono::{Local, NaiveDateTime, TimeDelta};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Column header of the log.
pub const LOG_HEADER: &str = "# Timestamp,BPM,Confidence,Pitch(Hz),Amplitude,Variance";

/// Appends one CSV line per beat to a log and flushes it immediately.
///
/// The timestamp of a line is the wall-clock start of the run plus the
/// stream time of the beat. A beat without pitch logs a pitch of `0.00`.
#[derive(Debug)]
pub struct CsvLogSink<W: Write> {
    out: W,
    started: NaiveDateTime,
}

impl CsvLogSink<BufWriter<File>> {
    /// Creates `beat_log_%Y%m%d_%H%M%S.txt` in `dir` and writes the header.
    /// Returns the path of the file, too.
    pub fn create(dir: impl AsRef<Path>) -> Result<(Self, PathBuf), SinkError> {
        let started = Local::now().naive_local();
        let path = dir.as_ref().join(file_name(started));
        let file = File::create(&path)?;
        Ok((Self::buffered(file, started)?, path))
    }
}

impl<W: Write> CsvLogSink<BufWriter<W>> {
    /// Like [`CsvLogSink::new`], but every line reaches `out` with a single
    /// write.
    pub fn buffered(out: W, started: NaiveDateTime) -> io::Result<Self> {
        Self::new(BufWriter::new(out), started)
    }
}

impl<W: Write> CsvLogSink<W> {
    /// Writes the header lines to `out`.
    pub fn new(mut out: W, started: NaiveDateTime) -> io::Result<Self> {
        writeln!(out, "# Beat Detection Log - {}", started.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(out, "{LOG_HEADER}")?;
        out.flush()?;
        Ok(Self { out, started })
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Name of the log file of a run started at `started`.
pub fn file_name(started: NaiveDateTime) -> String {
    format!("beat_log_{}.txt", started.format("%Y%m%d_%H%M%S"))
}

impl<W: Write> BeatSink for CsvLogSink<W> {
    fn name(&self) -> &str {
        "csv log"
    }

    fn report(&mut self, event: &BeatEvent) -> Result<(), SinkError> {
        let at = TimeDelta::from_std(event.timestamp)
            .ok()
            .and_then(|offset| self.started.checked_add_signed(offset))
            .unwrap_or(self.started);
        writeln!(
            self.out,
            "{},{:.1},{:.2},{:.2},{:.4},{:.4}",
            at.format("%H:%M:%S%.3f"),
            event.bpm,
            event.confidence,
            event.pitch_hz.unwrap_or(0.0),
            event.amplitude,
            event.variance,
        )?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::tests::event;
    use assert2::check;
    use chrono::NaiveDate;
    use std::string::String;
    use std::vec::Vec;

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(21, 5, 7, 250)
            .unwrap()
    }

    #[test]
    fn header_and_lines() {
        let mut sink = CsvLogSink::new(Vec::new(), started()).unwrap();
        sink.report(&event(120.0)).unwrap();
        let mut pitched = event(98.0);
        pitched.pitch_hz = Some(440.0);
        sink.report(&pitched).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        check!(
            lines
                == [
                    "# Beat Detection Log - 2024-03-09 21:05:07",
                    LOG_HEADER,
                    "21:05:08.750,120.0,0.87,0.00,0.8125,1.2500",
                    "21:05:08.750,98.0,0.87,440.00,0.8125,1.2500",
                ]
        );
    }

    /// Records every `write` call it receives.
    #[derive(Debug, Default)]
    struct WriteCounter {
        writes: usize,
        data: Vec<u8>,
    }

    impl Write for WriteCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn buffered_log_writes_each_line_at_once() {
        let mut sink = CsvLogSink::buffered(WriteCounter::default(), started()).unwrap();
        check!(sink.out.get_ref().writes == 1);

        sink.report(&event(120.0)).unwrap();
        check!(sink.out.get_ref().writes == 2);
        sink.report(&event(98.0)).unwrap();
        check!(sink.out.get_ref().writes == 3);

        let text = String::from_utf8(sink.out.get_ref().data.clone()).unwrap();
        check!(text.lines().nth(2) == Some("21:05:08.750,120.0,0.87,0.00,0.8125,1.2500"));
        check!(text.lines().count() == 4);
    }

    #[test]
    fn file_name_has_start_time() {
        check!(file_name(started()) == "beat_log_20240309_210507.txt");
    }

    #[test]
    fn create_fails_in_missing_directory() {
        let dir = std::env::temp_dir().join("live-beat-detector-does-not-exist").join("nested");
        check!(let Err(SinkError::Io(_)) = CsvLogSink::create(dir));
    }

    #[test]
    fn create_writes_header_to_file() {
        let dir = std::env::temp_dir();
        let (sink, path) = CsvLogSink::create(&dir).unwrap();
        drop(sink);
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        check!(text.starts_with("# Beat Detection Log - "));
        check!(text.lines().nth(1) == Some(LOG_HEADER));
    }
}
