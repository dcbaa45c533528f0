use std::io::BufRead;
use std::sync::{Arc, Mutex};

use super::config::{Config, OutputFormat};
use super::csv_io::{write_summary_csv, write_table_csv};
use super::dense::build_dense;
use super::error::{BuildError, EventFileError, ProcessorError};
use super::event::Event;
use super::event_file::EventReader;
use super::hdf_writer::write_dense_bundle;
use super::summary::{summarize, TrackSummary};
use super::table::{build_table, read_table_file, TableOptions};
use super::window::EventWindow;

/// Fraction of the input that is read between progress updates
const FLUSH_FRAC: f64 = 0.01;

/// Wraps an EventReader and publishes the fraction of the input consumed so far
struct MonitoredReader<R: BufRead> {
    reader: EventReader<R>,
    status: Arc<Mutex<f32>>,
    total_bytes: u64,
    flush_val: u64,
    last_flush: u64,
}

impl<R: BufRead> MonitoredReader<R> {
    fn new(reader: EventReader<R>, status: Arc<Mutex<f32>>) -> Self {
        let total_bytes = reader.size_bytes().unwrap_or(0);
        Self {
            reader,
            status,
            total_bytes,
            flush_val: (total_bytes as f64 * FLUSH_FRAC) as u64,
            last_flush: 0,
        }
    }

    fn publish(&self, progress: f32) {
        match self.status.lock() {
            Ok(mut stat) => *stat = progress,
            Err(e) => spdlog::error!("Could not update progress: {e}"),
        }
    }
}

impl<R: BufRead> Iterator for MonitoredReader<R> {
    type Item = Result<Event, EventFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.reader.next();
        let bytes_read = self.reader.bytes_read();
        if self.total_bytes > 0 && bytes_read - self.last_flush > self.flush_val {
            self.last_flush = bytes_read;
            self.publish((bytes_read as f64 / self.total_bytes as f64) as f32);
        }
        item
    }
}

/// The main loop of tdis_reader.
///
/// This takes in a config (and progress monitor) and converts the windowed event file into the
/// output format chosen by the output path extension. If a summary path is given, the
/// per-track summary is written there as well.
pub fn process(config: Config, status: Arc<Mutex<f32>>) -> Result<(), ProcessorError> {
    let format = config.output_format()?;
    let window = config.window();
    let layout = config.hit_layout;
    let reader = EventReader::open(&config.input_path, layout)?;
    let events = MonitoredReader::new(reader, status.clone());
    spdlog::info!("Processing events with window {:?}...", window);

    match format {
        OutputFormat::Csv => {
            let table = build_table(events, window, layout, &config.table_options())?;
            write_table_csv(&table, &config.output_path)?;
            if let Some(summary_path) = &config.summary_path {
                write_summary_csv(&summarize(&table), summary_path)?;
            }
        }
        OutputFormat::Hdf5 => match &config.summary_path {
            None => {
                let dense = build_dense(events, window, layout)?;
                write_dense_bundle(&dense, &config.output_path)?;
            }
            Some(summary_path) => {
                // Both views come from one pass over the file
                let selected = window
                    .apply(events)
                    .collect::<Result<Vec<Event>, EventFileError>>()?;
                let dense = build_dense(
                    selected.iter().cloned().map(Ok::<Event, BuildError>),
                    EventWindow::all(),
                    layout,
                )?;
                write_dense_bundle(&dense, &config.output_path)?;
                // The summary never reads pad positions
                let table = build_table(
                    selected.into_iter().map(Ok::<Event, BuildError>),
                    EventWindow::all(),
                    layout,
                    &TableOptions::default(),
                )?;
                write_summary_csv(&summarize(&table), summary_path)?;
            }
        },
    }

    match status.lock() {
        Ok(mut stat) => *stat = 1.0,
        Err(e) => spdlog::error!("Could not update progress: {e}"),
    }
    spdlog::info!("Done with {}.", config.input_path.to_string_lossy());
    Ok(())
}

/// Summarize the windowed tracks of the configured input without writing any output
pub fn summarize_input(config: &Config) -> Result<Vec<TrackSummary>, ProcessorError> {
    let table = read_table_file(
        &config.input_path,
        config.hit_layout,
        config.window(),
        &config.table_options(),
    )?;
    Ok(summarize(&table))
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::read_table_csv;
    use crate::hdf_writer::read_dense_bundle;
    use std::path::{Path, PathBuf};

    const EVENTS: &str = "Event 0
0.391797 56.63 -95.11 0.0532
1143.44 7.11161e-07 0 91 6 0.0366874
1160.56 9.25686e-08 0 91 6 0.0372368
Event 1
0.5123 45.2 -120.5 0.0621
1200.0 1.5e-06 1 85 5 0.04
Event 2
0.623 38.7 -89.3 0.0712
";

    fn config(dir: &Path, output: &str, summary: bool) -> Config {
        let input_path = dir.join("events.txt");
        std::fs::write(&input_path, EVENTS).unwrap();
        Config {
            input_path,
            output_path: dir.join(output),
            summary_path: summary.then(|| dir.join("summary.csv")),
            ..Default::default()
        }
    }

    #[test]
    fn test_process_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "tracks.csv", true);
        config.skip_events = 1;
        let status = Arc::new(Mutex::new(0.0));
        process(config.clone(), status.clone()).unwrap();
        assert_eq!(*status.lock().unwrap(), 1.0);

        let table = read_table_csv(&config.output_path).unwrap();
        let ids: Vec<i64> = table.tracks().iter().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(table.len(), 1);

        let summary = std::fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        assert_eq!(summary.lines().count(), 3);
    }

    #[test]
    fn test_process_hdf5_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "tracks.h5", true);
        process(config.clone(), Arc::new(Mutex::new(0.0))).unwrap();

        let dense = read_dense_bundle(&config.output_path).unwrap();
        assert_eq!(dense.track_ids.to_vec(), vec![0, 1, 2]);
        assert_eq!(dense.hits.dim(), (3, 2, 6));
        let summary = std::fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        assert_eq!(summary.lines().count(), 4);
    }

    #[test]
    fn test_process_hdf5_summary_ignores_pad_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "tracks.h5", true);
        // Pad 122 has no center in the default geometry
        std::fs::write(&config.input_path, "Event 0\n1 2 3 4\n1.0 2.0 0 122 1 0.1\n").unwrap();
        config.pad_positions = true;
        process(config.clone(), Arc::new(Mutex::new(0.0))).unwrap();

        let dense = read_dense_bundle(&config.output_path).unwrap();
        assert_eq!(dense.hits[[0, 0, 3]], 122.0);
        let summary = std::fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        assert_eq!(summary.lines().count(), 2);
    }

    #[test]
    fn test_process_hdf5_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "tracks.hdf5", false);
        config.n_events = Some(1);
        process(config.clone(), Arc::new(Mutex::new(0.0))).unwrap();
        let dense = read_dense_bundle(&config.output_path).unwrap();
        assert_eq!(dense.n_events(), 1);
        assert_eq!(dense.max_hits(), 2);
    }

    #[test]
    fn test_process_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "tracks.npz", false);
        assert!(matches!(
            process(config, Arc::new(Mutex::new(0.0))),
            Err(ProcessorError::UnknownOutputFormat(_))
        ));

        let config = Config {
            input_path: PathBuf::from("no_such_events.txt"),
            output_path: dir.path().join("tracks.csv"),
            ..Default::default()
        };
        assert!(matches!(
            process(config, Arc::new(Mutex::new(0.0))),
            Err(ProcessorError::EventFileError(EventFileError::BadFilePath(_)))
        ));
    }

    #[test]
    fn test_summarize_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "tracks.csv", false);
        let summary = summarize_input(&config).unwrap();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].hit_count, 2);
        assert_eq!(summary[2].hit_count, 0);
    }
}
