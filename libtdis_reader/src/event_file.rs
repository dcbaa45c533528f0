use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::constants::{EVENT_HEADER_KEYWORD, TRACK_FIELD_COUNT};
use super::error::{EventFileError, ParseError, ParseErrorKind};
use super::event::{Event, Hit, HitLayout, TrackParams};

/// NaN marks empty hit slots in the dense arrays, so only finite values are accepted
fn parse_float(token: &str, line: usize) -> Result<f64, ParseError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::new(
            line,
            ParseErrorKind::InvalidNumber(token.to_string()),
        )),
    }
}

/// Indices are written as integers, but some generators print them as integral floats (3.0)
fn parse_index(token: &str, line: usize) -> Result<i32, ParseError> {
    if let Ok(value) = token.parse::<i32>() {
        return Ok(value);
    }
    match token.parse::<f64>() {
        Ok(value)
            if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 =>
        {
            Ok(value as i32)
        }
        _ => Err(ParseError::new(
            line,
            ParseErrorKind::InvalidInteger(token.to_string()),
        )),
    }
}

/// Returns the event id if the line is a header
fn parse_header(trimmed: &str, line: usize) -> Result<Option<i64>, ParseError> {
    if !trimmed.starts_with(EVENT_HEADER_KEYWORD) {
        return Ok(None);
    }
    let mut tokens = trimmed.split_whitespace();
    let malformed = || ParseError::new(line, ParseErrorKind::MalformedHeader(trimmed.to_string()));
    if tokens.next() != Some(EVENT_HEADER_KEYWORD) {
        return Err(malformed());
    }
    let id = tokens
        .next()
        .and_then(|token| token.parse::<i64>().ok())
        .ok_or_else(malformed)?;
    if tokens.next().is_some() {
        return Err(malformed());
    }
    Ok(Some(id))
}

fn parse_track(tokens: &[&str], line: usize) -> Result<TrackParams, ParseError> {
    if tokens.len() != TRACK_FIELD_COUNT {
        return Err(ParseError::new(
            line,
            ParseErrorKind::TrackFieldCount {
                expected: TRACK_FIELD_COUNT,
                found: tokens.len(),
            },
        ));
    }
    let mut values = [0.0; TRACK_FIELD_COUNT];
    for (value, token) in values.iter_mut().zip(tokens) {
        *value = parse_float(token, line)?;
    }
    Ok(TrackParams::from(values))
}

fn parse_hit(tokens: &[&str], layout: HitLayout, line: usize) -> Result<Hit, ParseError> {
    if tokens.len() != layout.field_count() {
        return Err(ParseError::new(
            line,
            ParseErrorKind::HitFieldCount {
                layout,
                expected: layout.field_count(),
                found: tokens.len(),
            },
        ));
    }
    let float = |idx: usize| parse_float(tokens[idx], line);
    let index = |idx: usize| parse_index(tokens[idx], line);
    let hit = match layout {
        HitLayout::Readout => Hit {
            time: float(0)?,
            amplitude: float(1)?,
            ring: index(2)?,
            pad: index(3)?,
            plane: index(4)?,
            distance: float(5)?,
            ..Default::default()
        },
        HitLayout::ReadoutWithTruth => Hit {
            time: float(0)?,
            amplitude: float(1)?,
            ring: index(2)?,
            pad: index(3)?,
            plane: index(4)?,
            distance: float(5)?,
            true_x: Some(float(6)?),
            true_y: Some(float(7)?),
            true_z: None,
        },
        HitLayout::Simulation => Hit {
            time: float(0)?,
            amplitude: float(1)?,
            true_x: Some(float(2)?),
            true_y: Some(float(3)?),
            true_z: Some(float(4)?),
            ring: index(5)?,
            pad: index(6)?,
            plane: index(7)?,
            distance: float(8)?,
        },
    };
    Ok(hit)
}

/// An event whose header has been seen but whose block has not ended yet
#[derive(Debug)]
struct PendingEvent {
    id: i64,
    header_line: usize,
    track: Option<TrackParams>,
    hits: Vec<Hit>,
}

impl PendingEvent {
    fn complete(self) -> Result<Event, ParseError> {
        match self.track {
            Some(track) => Ok(Event {
                id: self.id,
                track,
                hits: self.hits,
            }),
            None => Err(ParseError::new(
                self.header_line,
                ParseErrorKind::TruncatedEvent(self.id),
            )),
        }
    }
}

/// EventParser takes the lines of an event file one at a time and composes them into Events.
///
/// A header line (`Event <int>`) ends the event being built and starts a new one. The first
/// data line after a header is always the track line, every following data line is a hit.
/// Blank lines are ignored. Any malformed line fails the parse; partial events are never
/// emitted.
#[derive(Debug)]
pub struct EventParser {
    layout: HitLayout,
    line_number: usize,
    current: Option<PendingEvent>,
}

impl EventParser {
    pub fn new(layout: HitLayout) -> Self {
        Self {
            layout,
            line_number: 0,
            current: None,
        }
    }

    pub fn layout(&self) -> HitLayout {
        self.layout
    }

    /// Number of lines fed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Feed the next line of the file.
    ///
    /// Returns `Ok(Some(event))` when the line closed a complete event, `Ok(None)` if the
    /// event being built is not complete.
    pub fn feed(&mut self, line: &str) -> Result<Option<Event>, ParseError> {
        self.line_number += 1;
        let line_number = self.line_number;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if let Some(id) = parse_header(trimmed, line_number)? {
            let finished = self.current.take().map(PendingEvent::complete).transpose()?;
            self.current = Some(PendingEvent {
                id,
                header_line: line_number,
                track: None,
                hits: Vec::new(),
            });
            return Ok(finished);
        }

        let pending = self
            .current
            .as_mut()
            .ok_or_else(|| ParseError::new(line_number, ParseErrorKind::DataBeforeHeader))?;
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if pending.track.is_none() {
            pending.track = Some(parse_track(&tokens, line_number)?);
        } else {
            pending.hits.push(parse_hit(&tokens, self.layout, line_number)?);
        }
        Ok(None)
    }

    /// Takes the event still being built at the end of input.
    ///
    /// Returns None if there was no event left over.
    pub fn finish(&mut self) -> Result<Option<Event>, ParseError> {
        self.current.take().map(PendingEvent::complete).transpose()
    }
}

/// Parse a complete set of lines into events, in file order
pub fn parse_event_data<I, S>(lines: I, layout: HitLayout) -> Result<Vec<Event>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = EventParser::new(layout);
    let mut events = Vec::new();
    for line in lines {
        if let Some(event) = parser.feed(line.as_ref())? {
            events.push(event);
        }
    }
    if let Some(event) = parser.finish()? {
        events.push(event);
    }
    Ok(events)
}

/// EventReader streams Events out of a buffered source one at a time.
///
/// Only the event currently being built is held in memory, so arbitrarily large files can
/// be sampled. Once an error is returned the reader is finished.
#[derive(Debug)]
pub struct EventReader<R: BufRead> {
    reader: R,
    parser: EventParser,
    buffer: String,
    path: Option<PathBuf>,
    size_bytes: Option<u64>,
    bytes_read: u64,
    is_ended: bool,
}

impl EventReader<BufReader<File>> {
    /// Open an event file
    pub fn open(path: &Path, layout: HitLayout) -> Result<Self, EventFileError> {
        if !path.exists() {
            return Err(EventFileError::BadFilePath(path.to_path_buf()));
        }
        let unreadable = |source| EventFileError::Unreadable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unreadable)?;
        let size_bytes = file.metadata().map_err(unreadable)?.len();
        spdlog::info!(
            "Opened event file {} ({}) with the {} hit layout",
            path.to_string_lossy(),
            human_bytes::human_bytes(size_bytes as f64),
            layout
        );

        let mut reader = Self::from_reader(BufReader::new(file), layout);
        reader.path = Some(path.to_path_buf());
        reader.size_bytes = Some(size_bytes);
        Ok(reader)
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn from_reader(reader: R, layout: HitLayout) -> Self {
        Self {
            reader,
            parser: EventParser::new(layout),
            buffer: String::new(),
            path: None,
            size_bytes: None,
            bytes_read: 0,
            is_ended: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Total size of the source, if it is a file
    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Get the next event in the source
    ///
    /// Returns a `Result<Option<Event>>`. The Option is None if the source has no more data.
    pub fn next_event(&mut self) -> Result<Option<Event>, EventFileError> {
        let result = self.read_event();
        if result.is_err() {
            self.is_ended = true;
        }
        result
    }

    /// A failed read of the line after the last one fed to the parser
    fn read_failed(&self, source: std::io::Error) -> EventFileError {
        let line = self.parser.line_number() + 1;
        match &self.path {
            Some(path) => EventFileError::ReadFailed {
                path: path.clone(),
                line,
                source,
            },
            None => EventFileError::StreamReadFailed { line, source },
        }
    }

    fn read_event(&mut self) -> Result<Option<Event>, EventFileError> {
        loop {
            if self.is_ended {
                return Ok(None);
            }
            self.buffer.clear();
            let n_bytes = match self.reader.read_line(&mut self.buffer) {
                Ok(n_bytes) => n_bytes,
                Err(source) => return Err(self.read_failed(source)),
            };
            if n_bytes == 0 {
                self.is_ended = true;
                let last = self.parser.finish()?;
                spdlog::debug!(
                    "Reached end of event data after {} lines",
                    self.parser.line_number()
                );
                return Ok(last);
            }
            self.bytes_read += n_bytes as u64;
            if let Some(event) = self.parser.feed(&self.buffer)? {
                return Ok(Some(event));
            }
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event, EventFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
