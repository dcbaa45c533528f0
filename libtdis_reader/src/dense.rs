use ndarray::{aview1, s, Array1, Array2, Array3};
use std::path::Path;

use super::constants::{TRACK_COLUMNS, TRACK_FIELD_COUNT};
use super::error::BuildError;
use super::event::{Event, HitLayout};
use super::event_file::EventReader;
use super::window::EventWindow;

/// Fixed-shape numeric view of a window of events.
///
/// `tracks` is `[n_events, 4]` and `hits` is `[n_events, max_hits, n_fields]`. Events hold
/// different numbers of hits, so the hit slots past an event's own hit count are filled
/// with NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseArrayPair {
    pub layout: HitLayout,
    /// Header ids, one per row of `tracks`
    pub track_ids: Array1<i64>,
    pub tracks: Array2<f64>,
    pub hits: Array3<f64>,
}

impl DenseArrayPair {
    /// An empty pair with the correct number of columns
    pub fn empty(layout: HitLayout) -> Self {
        Self {
            layout,
            track_ids: Array1::zeros(0),
            tracks: Array2::zeros((0, TRACK_FIELD_COUNT)),
            hits: Array3::zeros((0, 0, layout.field_count())),
        }
    }

    /// Pack a set of events
    pub fn from_events(events: &[Event], layout: HitLayout) -> Self {
        let n_events = events.len();
        let max_hits = events.iter().map(|e| e.hits.len()).max().unwrap_or(0);
        let n_fields = layout.field_count();

        let mut track_ids = Array1::<i64>::zeros(n_events);
        let mut tracks = Array2::<f64>::zeros((n_events, TRACK_FIELD_COUNT));
        let mut hits = Array3::<f64>::from_elem((n_events, max_hits, n_fields), f64::NAN);
        for (row, event) in events.iter().enumerate() {
            track_ids[row] = event.id;
            tracks.row_mut(row).assign(&aview1(&event.track.as_array()));
            for (slot, hit) in event.hits.iter().enumerate() {
                let values = hit.as_array();
                hits.slice_mut(s![row, slot, ..])
                    .assign(&aview1(&values[..n_fields]));
            }
        }

        Self {
            layout,
            track_ids,
            tracks,
            hits,
        }
    }

    pub fn n_events(&self) -> usize {
        self.tracks.nrows()
    }

    pub fn max_hits(&self) -> usize {
        self.hits.dim().1
    }

    pub fn n_fields(&self) -> usize {
        self.hits.dim().2
    }

    pub fn track_columns(&self) -> [&'static str; TRACK_FIELD_COUNT] {
        TRACK_COLUMNS
    }

    pub fn hit_columns(&self) -> Vec<&'static str> {
        self.layout.columns()
    }

    /// Number of occupied hit slots of an event, or None if there is no such event.
    ///
    /// The parser only accepts finite values, so a NaN time always marks an empty slot.
    pub fn hit_count(&self, event: usize) -> Option<usize> {
        if event >= self.n_events() {
            return None;
        }
        let count = self
            .hits
            .slice(s![event, .., 0])
            .iter()
            .filter(|t| !t.is_nan())
            .count();
        Some(count)
    }
}

/// Build the dense representation of a window of an event stream.
///
/// Events are windowed as they stream in; only the selected events are held while the
/// widest event is found.
pub fn build_dense<I, E>(
    events: I,
    window: EventWindow,
    layout: HitLayout,
) -> Result<DenseArrayPair, BuildError>
where
    I: IntoIterator<Item = Result<Event, E>>,
    BuildError: From<E>,
{
    let selected = window
        .apply(events)
        .collect::<Result<Vec<Event>, E>>()?;
    if selected.is_empty() {
        spdlog::info!("Event window {:?} selected no events", window);
        return Ok(DenseArrayPair::empty(layout));
    }
    let dense = DenseArrayPair::from_events(&selected, layout);
    spdlog::debug!(
        "Built dense arrays for {} events with up to {} hits",
        dense.n_events(),
        dense.max_hits()
    );
    Ok(dense)
}

/// Read a window of an event file into dense arrays
pub fn read_dense_file(
    path: &Path,
    layout: HitLayout,
    window: EventWindow,
) -> Result<DenseArrayPair, BuildError> {
    let reader = EventReader::open(path, layout)?;
    build_dense(reader, window, layout)
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::event_file::parse_event_data;
    use std::io::Write;

    const THREE_EVENTS: &str = "Event 0
\t0.391797\t56.63\t-95.11\t0.0532
\t1143.44\t7.11161e-07\t0\t91\t6\t0.0366874
\t1160.56\t9.25686e-08\t0\t91\t6\t0.0372368
Event 1
\t0.5123\t45.2\t-120.5\t0.0621
\t1200.0\t1.5e-06\t1\t85\t5\t0.04
\t1250.0\t2.1e-06\t1\t86\t5\t0.045
\t1300.0\t1.8e-06\t2\t87\t5\t0.05
Event 2
\t0.623\t38.7\t-89.3\t0.0712
\t1400.0\t3.2e-06\t0\t90\t7\t0.055
";

    fn events() -> Vec<Result<Event, ParseError>> {
        parse_event_data(THREE_EVENTS.lines(), HitLayout::Readout)
            .unwrap()
            .into_iter()
            .map(Ok)
            .collect()
    }

    #[test]
    fn test_dense_shapes() {
        let dense = build_dense(events(), EventWindow::all(), HitLayout::Readout).unwrap();
        assert_eq!(dense.tracks.dim(), (3, 4));
        assert_eq!(dense.hits.dim(), (3, 3, 6));
        assert_eq!(dense.track_ids.to_vec(), vec![0, 1, 2]);
        assert_eq!(dense.tracks[[0, 0]], 0.391797);
        assert_eq!(dense.tracks[[1, 2]], -120.5);
        assert_eq!(dense.hits[[0, 0, 3]], 91.0);
        assert_eq!(dense.hits[[1, 2, 2]], 2.0);
        assert_eq!(dense.hit_columns()[5], "distance");
    }

    #[test]
    fn test_padding_is_nan() {
        let dense = build_dense(events(), EventWindow::all(), HitLayout::Readout).unwrap();
        let parsed = parse_event_data(THREE_EVENTS.lines(), HitLayout::Readout).unwrap();
        for (row, event) in parsed.iter().enumerate() {
            assert_eq!(dense.hit_count(row), Some(event.hits.len()));
            for slot in event.hits.len()..dense.max_hits() {
                assert!(dense.hits.slice(s![row, slot, ..]).iter().all(|v| v.is_nan()));
            }
            for slot in 0..event.hits.len() {
                assert!(dense.hits.slice(s![row, slot, ..]).iter().all(|v| !v.is_nan()));
            }
        }
    }

    #[test]
    fn test_window_keeps_ids() {
        let dense =
            build_dense(events(), EventWindow::new(1, Some(1)), HitLayout::Readout).unwrap();
        assert_eq!(dense.n_events(), 1);
        assert_eq!(dense.track_ids[0], 1);
        assert_eq!(dense.tracks[[0, 0]], 0.5123);
        // max_hits comes from the window, not the file
        assert_eq!(dense.max_hits(), 3);

        let dense =
            build_dense(events(), EventWindow::new(2, None), HitLayout::Readout).unwrap();
        assert_eq!(dense.max_hits(), 1);
    }

    #[test]
    fn test_empty_windows() {
        for window in [EventWindow::new(5, None), EventWindow::new(0, Some(0))] {
            let dense = build_dense(events(), window, HitLayout::Readout).unwrap();
            assert_eq!(dense.tracks.dim(), (0, 4));
            assert_eq!(dense.hits.dim(), (0, 0, 6));
            assert_eq!(dense, DenseArrayPair::empty(HitLayout::Readout));
        }
    }

    #[test]
    fn test_nan_hit_time_cannot_pose_as_padding() {
        let text = "Event 0\n1 2 3 4\nNaN 1.5 0 1 1 0.1\n";
        assert!(parse_event_data(text.lines(), HitLayout::Readout).is_err());

        let text = "Event 0\n1 2 3 4\n0.0 1.5 0 1 1 0.1\n";
        let events = parse_event_data(text.lines(), HitLayout::Readout).unwrap();
        let dense = DenseArrayPair::from_events(&events, HitLayout::Readout);
        assert_eq!(dense.hit_count(0), Some(events[0].hits.len()));
    }

    #[test]
    fn test_truth_columns() {
        let text = "Event 3\n1 2 3 4\n1 2 0 1 2 0.1 0.5 -0.5\nEvent 4\n1 2 3 4\n";
        let events = parse_event_data(text.lines(), HitLayout::ReadoutWithTruth).unwrap();
        let dense = DenseArrayPair::from_events(&events, HitLayout::ReadoutWithTruth);
        assert_eq!(dense.hits.dim(), (2, 1, 8));
        assert_eq!(dense.hits[[0, 0, 6]], 0.5);
        assert_eq!(dense.hits[[0, 0, 7]], -0.5);
        assert_eq!(dense.hit_count(1), Some(0));
        assert_eq!(dense.hit_count(2), None);
    }

    #[test]
    fn test_errors_propagate() {
        let mut source = events();
        source.insert(1, Err(ParseError::new(7, crate::error::ParseErrorKind::DataBeforeHeader)));
        let result = build_dense(source, EventWindow::new(2, None), HitLayout::Readout);
        assert!(matches!(result, Err(BuildError::Parse(ParseError { line: 7, .. }))));
    }

    #[test]
    fn test_read_dense_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(THREE_EVENTS.as_bytes()).unwrap();
        let dense = read_dense_file(file.path(), HitLayout::Readout, EventWindow::new(0, Some(2)))
            .unwrap();
        assert_eq!(dense.n_events(), 2);
        assert!(matches!(
            read_dense_file(Path::new("missing.txt"), HitLayout::Readout, EventWindow::all()),
            Err(BuildError::Source(_))
        ));
    }
}
