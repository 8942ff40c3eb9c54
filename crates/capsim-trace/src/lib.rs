//! capsim-trace — present-event stream from a PresentMon capture.
//!
//! PresentMon writes one CSV row per `Present()` call. The only column the
//! simulator needs is the delta since the previous present (by default
//! `msBetweenPresents`); present timestamps are the running sum of it.
//!
//! ```text
//! file ──► gzip sniff ──► csv::Reader ──► header lookup ──► PresentEvent…
//!            (1f 8b)
//! ```
//!
//! A [`FrameSource`] hands out its event iterator exactly once; asking again
//! fails with [`TraceError::AlreadyConsumed`]. The iterator owns the reader,
//! so dropping it (exhausted or not) closes the file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use capsim_core::{PresentEvent, TraceError};
use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::bufread::MultiGzDecoder;
use tracing::{debug, info};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

type BoxedReader = Box<dyn BufRead + Send>;

// ── FrameSource ───────────────────────────────────────────────────────────────

/// A not-yet-read present trace.
pub struct FrameSource {
    label:  String,
    column: String,
    reader: Option<BoxedReader>,
}

impl FrameSource {
    /// Open a trace file, plain or gzip-compressed.
    pub fn open(path: impl AsRef<Path>, column: impl Into<String>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let file = File::open(path).map_err(|error| TraceError::Io { label: label.clone(), error })?;
        Self::from_raw(BufReader::new(file), label, column)
    }

    /// Wrap a byte stream that may or may not be gzip-compressed.
    pub fn from_raw<R>(mut reader: R, label: impl Into<String>, column: impl Into<String>) -> Result<Self, TraceError>
    where
        R: BufRead + Send + 'static,
    {
        let label = label.into();
        let head = reader
            .fill_buf()
            .map_err(|error| TraceError::Io { label: label.clone(), error })?;
        let reader: BoxedReader = if head.starts_with(&GZIP_MAGIC) {
            info!("Reading frames from {} (gzip)", label);
            Box::new(BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            info!("Reading frames from {}", label);
            Box::new(reader)
        };
        Ok(Self { label, column: column.into(), reader: Some(reader) })
    }

    /// Wrap an already-decoded text stream.
    pub fn from_reader<R>(reader: R, label: impl Into<String>, column: impl Into<String>) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self { label: label.into(), column: column.into(), reader: Some(Box::new(reader)) }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start reading. Only succeeds once per source.
    pub fn events(&mut self) -> Result<PresentEvents, TraceError> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| TraceError::AlreadyConsumed { label: self.label.clone() })?;
        Ok(PresentEvents::new(self.label.clone(), self.column.clone(), reader))
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("label", &self.label)
            .field("column", &self.column)
            .field("consumed", &self.reader.is_none())
            .finish()
    }
}

// ── PresentEvents ─────────────────────────────────────────────────────────────

/// Lazy iterator over the presents in a trace.
///
/// Yields `Err` at most once; the iterator is fused after any error.
pub struct PresentEvents {
    label:         String,
    column:        String,
    reader:        csv::Reader<BoxedReader>,
    record:        StringRecord,
    line:          u64,
    column_index:  Option<usize>,
    next_sequence: u64,
    elapsed_ms:    f64,
    done:          bool,
}

impl PresentEvents {
    fn new(label: String, column: String, reader: BoxedReader) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        Self {
            label,
            column,
            reader,
            record: StringRecord::new(),
            line: 0,
            column_index: None,
            next_sequence: 0,
            elapsed_ms: 0.0,
            done: false,
        }
    }

    /// Next row with any non-empty field, or `None` at end of input.
    fn next_record(&mut self) -> Result<Option<()>, TraceError> {
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(false) => return Ok(None),
                Ok(true) => {}
                Err(e) => return Err(self.csv_error(e)),
            }
            if let Some(pos) = self.record.position() {
                self.line = pos.line();
            }
            if self.record.iter().any(|f| !f.is_empty()) {
                return Ok(Some(()));
            }
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> TraceError {
        TraceError::MalformedTrace { label: self.label.clone(), line: self.line, reason: reason.into() }
    }

    fn csv_error(&self, err: csv::Error) -> TraceError {
        let line = err.position().map_or(self.line, |pos| pos.line());
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(error) => TraceError::Io { label: self.label.clone(), error },
            _ => TraceError::MalformedTrace { label: self.label.clone(), line, reason },
        }
    }

    fn read_header(&mut self) -> Result<Option<usize>, TraceError> {
        let headers = match self.reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => return Err(self.csv_error(e)),
        };
        if headers.iter().all(str::is_empty) {
            debug!("{}: empty trace", self.label);
            return Ok(None);
        }
        self.line = headers.position().map_or(1, |pos| pos.line());
        let index = headers
            .iter()
            .position(|name| name.eq_ignore_ascii_case(&self.column))
            .ok_or_else(|| self.malformed(format!("no '{}' column in header", self.column)))?;
        debug!("{}: '{}' is column {}", self.label, self.column, index);
        Ok(Some(index))
    }

    fn read_event(&mut self) -> Result<Option<PresentEvent>, TraceError> {
        let index = match self.column_index {
            Some(index) => index,
            None => match self.read_header()? {
                Some(index) => {
                    self.column_index = Some(index);
                    index
                }
                None => return Ok(None),
            },
        };

        if self.next_record()?.is_none() {
            return Ok(None);
        }

        let raw = self
            .record
            .get(index)
            .ok_or_else(|| self.malformed(format!("missing '{}' field", self.column)))?;
        let delta: f64 = raw
            .parse()
            .map_err(|_| self.malformed(format!("'{}' is not a number: {:?}", self.column, raw)))?;
        if !delta.is_finite() || delta < 0.0 {
            return Err(self.malformed(format!("'{}' must be a finite, non-negative delta: {}", self.column, delta)));
        }

        self.elapsed_ms += delta;
        let event = PresentEvent::new(self.next_sequence, self.elapsed_ms);
        self.next_sequence += 1;
        Ok(Some(event))
    }
}

impl Iterator for PresentEvents {
    type Item = Result<PresentEvent, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                debug!("{}: {} presents read", self.label, self.next_sequence);
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for PresentEvents {}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    const TRACE: &str = "Application,ProcessID,msBetweenPresents,msUntilDisplayed\n\
                         game.exe,42,10.5,1.0\n\
                         game.exe,42,4.5,1.0\n\
                         \n\
                         \"game.exe\",42,\"20\",1.0\n";

    fn source(text: &'static str) -> FrameSource {
        FrameSource::from_reader(Cursor::new(text), "test", "msBetweenPresents")
    }

    #[test]
    fn present_times_are_cumulative() {
        let events: Vec<_> = source(TRACE)
            .events()
            .unwrap()
            .collect::<Result<_, _>>()
            .expect("well-formed trace");

        assert_eq!(
            events,
            vec![PresentEvent::new(0, 10.5), PresentEvent::new(1, 15.0), PresentEvent::new(2, 35.0)]
        );
    }

    #[test]
    fn second_read_is_rejected() {
        let mut src = source(TRACE);
        let _first = src.events().unwrap();
        match src.events() {
            Err(TraceError::AlreadyConsumed { label }) => assert_eq!(label, "test"),
            other => panic!("expected AlreadyConsumed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn column_lookup_ignores_case() {
        let mut src = FrameSource::from_reader(Cursor::new("MsBetweenPresents\n1\n2\n"), "v2", "msBetweenPresents");
        let times: Vec<f64> = src.events().unwrap().map(|e| e.unwrap().present_time_ms).collect();
        assert_eq!(times, vec![1.0, 3.0]);
    }

    #[test]
    fn non_numeric_delta_is_malformed_and_stops() {
        let mut src = source("msBetweenPresents\n1.0\nabc\n2.0\n");
        let mut events = src.events().unwrap();
        assert!(events.next().unwrap().is_ok());
        match events.next() {
            Some(Err(TraceError::MalformedTrace { line, .. })) => assert_eq!(line, 3),
            other => panic!("expected MalformedTrace, got {other:?}"),
        }
        assert!(events.next().is_none());
    }

    #[test]
    fn missing_field_is_malformed() {
        let mut src = source("Application,msBetweenPresents\ngame.exe\n");
        let err = src.events().unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, TraceError::MalformedTrace { line: 2, .. }), "{err}");
    }

    #[test]
    fn missing_column_is_malformed() {
        let mut src = source("Application,ProcessID\ngame.exe,1\n");
        let err = src.events().unwrap().next().unwrap().unwrap_err();
        assert!(err.to_string().contains("no 'msBetweenPresents' column"), "{err}");
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let text = "Application,ProcessID,msBetweenPresents\r\n\
                    \"My, Game.exe\",42,10.0\r\n\
                    \"My \"\"Best\"\" Game.exe\",42,5.0\r\n";
        let times: Vec<f64> = source(text).events().unwrap().map(|e| e.unwrap().present_time_ms).collect();
        assert_eq!(times, vec![10.0, 15.0]);
    }

    #[test]
    fn negative_delta_is_malformed() {
        let mut src = source("msBetweenPresents\n-1\n");
        assert!(src.events().unwrap().next().unwrap().is_err());
    }

    #[test]
    fn empty_trace_yields_nothing() {
        assert_eq!(source("").events().unwrap().count(), 0);
        assert_eq!(source("msBetweenPresents\n").events().unwrap().count(), 0);
    }

    #[test]
    fn gzip_input_is_detected() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(TRACE.as_bytes()).unwrap();
        let bytes = enc.finish().unwrap();

        let mut src = FrameSource::from_raw(Cursor::new(bytes), "trace.csv.gz", "msBetweenPresents").unwrap();
        let last = src.events().unwrap().last().unwrap().unwrap();
        assert_eq!(last, PresentEvent::new(2, 35.0));
    }

    #[test]
    fn plain_input_passes_through_from_raw() {
        let mut src = FrameSource::from_raw(Cursor::new(TRACE.as_bytes().to_vec()), "trace.csv", "msBetweenPresents").unwrap();
        assert_eq!(src.events().unwrap().count(), 3);
    }
}
