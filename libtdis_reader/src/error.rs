use std::path::PathBuf;
use thiserror::Error;

use super::event::HitLayout;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown hit layout {0:?}; expected readout, readout_with_truth, or simulation")]
pub struct HitLayoutError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("malformed event header {0:?}; expected 'Event <int>'")]
    MalformedHeader(String),
    #[error("expected {expected} track parameters, found {found}")]
    TrackFieldCount { expected: usize, found: usize },
    #[error("expected {expected} hit fields for the {layout} layout, found {found}")]
    HitFieldCount {
        layout: HitLayout,
        expected: usize,
        found: usize,
    },
    #[error("could not parse {0:?} as a number")]
    InvalidNumber(String),
    #[error("could not parse {0:?} as an integer index")]
    InvalidInteger(String),
    #[error("event {0} ended before its track parameter line")]
    TruncatedEvent(i64),
    #[error("found data before the first event header")]
    DataBeforeHeader,
}

/// A structural failure in an event file. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Event file parsing failed at line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Ring index {ring} is out of range; rings must be at least 0 and below {num_rings}")]
    RingOutOfRange { ring: i32, num_rings: usize },
    #[error("Pad index {pad} is out of range; pads must be at least 0 and below {num_pads}")]
    PadOutOfRange { pad: i32, num_pads: usize },
    #[error("Invalid detector geometry: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error)]
pub enum EventFileError {
    #[error("Could not open event file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Could not read event file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not read line {line} of event file {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        line: usize,
        source: std::io::Error,
    },
    #[error("Could not read line {line} of the event stream: {source}")]
    StreamReadFailed { line: usize, source: std::io::Error },
    #[error("{0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Builder failed due to event file error: {0}")]
    Source(#[from] EventFileError),
    #[error("Builder failed due to parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Builder failed to derive a pad position: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Builder found track id {0} more than once in the selected window")]
    DuplicateTrack(i64),
}

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV table failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("CSV table is missing the {0:?} column")]
    MissingColumn(String),
    #[error("CSV table has an unsupported header: {0}")]
    BadHeader(String),
    #[error("CSV row at line {line} has {found} cells; expected {expected}")]
    RowLength {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("CSV row at line {line} has invalid value {value:?} in column {column:?}")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },
    #[error("CSV row at line {line} repeats the key ({track_id}, {hit_index})")]
    DuplicateKey {
        line: usize,
        track_id: i64,
        hit_index: usize,
    },
    #[error("CSV row at line {line} returns to track {track_id} after other tracks")]
    NonContiguousTrack { line: usize, track_id: i64 },
}

#[derive(Debug, Error)]
pub enum HDF5WriterError {
    #[error("HDF5Writer failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("HDF5Writer found a bad layout attribute: {0}")]
    LayoutError(#[from] HitLayoutError),
    #[error("HDF5Writer found inconsistent dataset shapes: {0}")]
    ShapeMismatch(String),
    #[error("HDF5Writer could not store string attribute {0:?}")]
    InvalidString(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to event file error: {0}")]
    EventFileError(#[from] EventFileError),
    #[error("Processor failed due to builder error: {0}")]
    BuildError(#[from] BuildError),
    #[error("Processor failed due to CSV error: {0}")]
    CsvError(#[from] CsvError),
    #[error("Processor failed due to HDF5Writer error: {0}")]
    HDFError(#[from] HDF5WriterError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor does not know how to write {0:?}; use a .csv, .h5, or .hdf5 extension")]
    UnknownOutputFormat(PathBuf),
}
