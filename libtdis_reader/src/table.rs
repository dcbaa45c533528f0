use fxhash::FxHashMap;
use std::path::Path;

use super::constants::{POSITION_COLUMNS, TRACK_COLUMNS};
use super::error::BuildError;
use super::event::{Event, Hit, HitLayout, TrackParams};
use super::event_file::EventReader;
use super::geometry::DetectorGeometry;
use super::window::EventWindow;

pub const KEY_COLUMNS: [&str; 2] = ["track_id", "hit_index"];

/// The per-track part of the table
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    /// The event header id, not a renumbered index
    pub track_id: i64,
    pub params: TrackParams,
    /// Position of the track's first row in the table
    pub first_row: usize,
    pub hit_count: usize,
}

/// One hit, keyed by (track_id, hit_index). Ring, pad, and plane stay integers.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub track_id: i64,
    /// 0-based position of the hit within its track
    pub hit_index: usize,
    pub hit: Hit,
    /// Derived (x, y) of the pad center, present only when requested at build time
    pub pad_position: Option<(f64, f64)>,
}

/// Options for the table builder
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TableOptions {
    /// Add pad_x/pad_y columns computed with this geometry
    pub pad_positions: Option<DetectorGeometry>,
}

/// KeyedTable is an ordered mapping from (track_id, hit_index) to hit values.
///
/// Tracks keep the order they were first seen in, and each track's rows are stored
/// contiguously in hit order. Tracks without hits are kept so that they are not lost from
/// summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedTable {
    layout: HitLayout,
    pad_positions: bool,
    tracks: Vec<TrackEntry>,
    rows: Vec<TableRow>,
    track_lookup: FxHashMap<i64, usize>,
    row_lookup: FxHashMap<(i64, usize), usize>,
}

impl KeyedTable {
    /// Create an empty table
    pub fn new(layout: HitLayout, pad_positions: bool) -> Self {
        Self {
            layout,
            pad_positions,
            tracks: Vec::new(),
            rows: Vec::new(),
            track_lookup: FxHashMap::default(),
            row_lookup: FxHashMap::default(),
        }
    }

    pub fn layout(&self) -> HitLayout {
        self.layout
    }

    pub fn has_pad_positions(&self) -> bool {
        self.pad_positions
    }

    /// Number of hit rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no tracks at all
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn n_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[TrackEntry] {
        &self.tracks
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn track(&self, track_id: i64) -> Option<&TrackEntry> {
        self.track_lookup.get(&track_id).map(|idx| &self.tracks[*idx])
    }

    pub fn get(&self, track_id: i64, hit_index: usize) -> Option<&TableRow> {
        self.row_lookup
            .get(&(track_id, hit_index))
            .map(|idx| &self.rows[*idx])
    }

    /// All of the rows of a track, in hit order
    pub fn track_hits(&self, track_id: i64) -> Option<&[TableRow]> {
        self.track(track_id)
            .map(|entry| &self.rows[entry.first_row..entry.first_row + entry.hit_count])
    }

    /// Column names in output order: keys, track, hit, then derived position
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = KEY_COLUMNS.to_vec();
        columns.extend(TRACK_COLUMNS);
        columns.extend(self.layout.columns());
        if self.pad_positions {
            columns.extend(POSITION_COLUMNS);
        }
        columns
    }

    /// Start a new track. Its hits must follow before the next track is started.
    pub(crate) fn insert_track(
        &mut self,
        track_id: i64,
        params: TrackParams,
    ) -> Result<(), BuildError> {
        if self.track_lookup.contains_key(&track_id) {
            return Err(BuildError::DuplicateTrack(track_id));
        }
        self.track_lookup.insert(track_id, self.tracks.len());
        self.tracks.push(TrackEntry {
            track_id,
            params,
            first_row: self.rows.len(),
            hit_count: 0,
        });
        Ok(())
    }

    /// Append a hit to the most recently inserted track, returning its hit index.
    ///
    /// Returns None if no track has been inserted yet.
    pub(crate) fn insert_hit(
        &mut self,
        hit: Hit,
        pad_position: Option<(f64, f64)>,
    ) -> Option<usize> {
        let entry = self.tracks.last_mut()?;
        let hit_index = entry.hit_count;
        entry.hit_count += 1;
        self.row_lookup
            .insert((entry.track_id, hit_index), self.rows.len());
        self.rows.push(TableRow {
            track_id: entry.track_id,
            hit_index,
            hit,
            pad_position,
        });
        Some(hit_index)
    }

    fn push_event(
        &mut self,
        event: Event,
        geometry: Option<&DetectorGeometry>,
    ) -> Result<(), BuildError> {
        self.insert_track(event.id, event.track)?;
        for hit in event.hits {
            let pad_position = match geometry {
                Some(geo) => Some(geo.pad_center(hit.ring, hit.pad)?),
                None => None,
            };
            self.insert_hit(hit, pad_position);
        }
        Ok(())
    }
}

/// Build the keyed table of a window of an event stream.
///
/// Events are folded into the table as they stream in. If pad positions are requested, a hit
/// whose ring or pad is outside the geometry fails the build.
pub fn build_table<I, E>(
    events: I,
    window: EventWindow,
    layout: HitLayout,
    options: &TableOptions,
) -> Result<KeyedTable, BuildError>
where
    I: IntoIterator<Item = Result<Event, E>>,
    BuildError: From<E>,
{
    let mut table = KeyedTable::new(layout, options.pad_positions.is_some());
    for event in window.apply(events) {
        table.push_event(event?, options.pad_positions.as_ref())?;
    }
    if table.is_empty() {
        spdlog::info!("Event window {:?} selected no events", window);
    } else {
        spdlog::debug!(
            "Built table of {} tracks and {} hits",
            table.n_tracks(),
            table.len()
        );
    }
    Ok(table)
}

/// Read a window of an event file into a keyed table
pub fn read_table_file(
    path: &Path,
    layout: HitLayout,
    window: EventWindow,
    options: &TableOptions,
) -> Result<KeyedTable, BuildError> {
    let reader = EventReader::open(path, layout)?;
    build_table(reader, window, layout, options)
}
