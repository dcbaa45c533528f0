// Comma-separated text forms of the keyed table and the track summary.
//
// The table is written one row per hit, key columns first:
//
//   track_id,hit_index,momentum,theta,phi,z_vertex,time,amplitude,ring,pad,plane,distance[,true_x,true_y[,true_z]][,pad_x,pad_y]
//
// A track without hits is written as one row with an empty hit_index and empty hit cells.
// Floats are written in their shortest exact form, so reading the file back gives the same
// table.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::constants::{BASE_HIT_COLUMNS, POSITION_COLUMNS, TRACK_FIELD_COUNT, TRUTH_HIT_COLUMNS};
use super::error::CsvError;
use super::event::{Hit, HitLayout, TrackParams};
use super::summary::{TrackSummary, SUMMARY_COLUMNS};
use super::table::{KeyedTable, TableRow, KEY_COLUMNS};

const SEPARATOR: &str = ",";

fn format_option(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_row<W: Write>(writer: &mut W, cells: &[String]) -> Result<(), CsvError> {
    writeln!(writer, "{}", cells.join(SEPARATOR))?;
    Ok(())
}

fn hit_cells(row: &TableRow, layout: HitLayout, cells: &mut Vec<String>) {
    let hit = &row.hit;
    cells.push(hit.time.to_string());
    cells.push(hit.amplitude.to_string());
    cells.push(hit.ring.to_string());
    cells.push(hit.pad.to_string());
    cells.push(hit.plane.to_string());
    cells.push(hit.distance.to_string());
    let truth = [hit.true_x, hit.true_y, hit.true_z];
    cells.extend(truth.iter().take(layout.truth_count()).map(|v| format_option(*v)));
}

/// Write a keyed table as CSV to any writer
pub fn write_table_csv_to<W: Write>(table: &KeyedTable, writer: &mut W) -> Result<(), CsvError> {
    let columns = table.columns();
    writeln!(writer, "{}", columns.join(SEPARATOR))?;

    let mut cells: Vec<String> = Vec::with_capacity(columns.len());
    for entry in table.tracks() {
        let track_cells: Vec<String> = entry
            .params
            .as_array()
            .iter()
            .map(|v| v.to_string())
            .collect();
        let rows = table.track_hits(entry.track_id).unwrap_or_default();
        if rows.is_empty() {
            cells.clear();
            cells.push(entry.track_id.to_string());
            cells.push(String::new());
            cells.extend(track_cells.iter().cloned());
            cells.resize(columns.len(), String::new());
            write_row(writer, &cells)?;
            continue;
        }
        for row in rows {
            cells.clear();
            cells.push(row.track_id.to_string());
            cells.push(row.hit_index.to_string());
            cells.extend(track_cells.iter().cloned());
            hit_cells(row, table.layout(), &mut cells);
            if table.has_pad_positions() {
                let (x, y) = row.pad_position.unzip();
                cells.push(format_option(x));
                cells.push(format_option(y));
            }
            write_row(writer, &cells)?;
        }
    }
    Ok(())
}

/// Write a keyed table to a CSV file
pub fn write_table_csv(table: &KeyedTable, path: &Path) -> Result<(), CsvError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_table_csv_to(table, &mut writer)?;
    writer.flush()?;
    spdlog::info!(
        "Wrote {} tracks and {} hits to {}",
        table.n_tracks(),
        table.len(),
        path.to_string_lossy()
    );
    Ok(())
}

/// Work out the table shape from a header line
fn table_for_header(header: &str) -> Result<KeyedTable, CsvError> {
    let names: Vec<&str> = header.trim().split(SEPARATOR).collect();
    for required in KEY_COLUMNS.iter().chain(BASE_HIT_COLUMNS.iter()) {
        if !names.contains(required) {
            return Err(CsvError::MissingColumn(required.to_string()));
        }
    }
    let truth_count = TRUTH_HIT_COLUMNS
        .iter()
        .filter(|name| names.contains(name))
        .count();
    let layout = HitLayout::from_truth_count(truth_count)
        .ok_or_else(|| CsvError::BadHeader(header.to_string()))?;
    let table = KeyedTable::new(layout, names.contains(&POSITION_COLUMNS[0]));
    if table.columns() != names {
        return Err(CsvError::BadHeader(header.to_string()));
    }
    Ok(table)
}

/// Cursor over the cells of one CSV row which knows how to report bad values
struct CellReader<'a> {
    line: usize,
    cells: Vec<&'a str>,
    columns: &'a [&'static str],
}

impl<'a> CellReader<'a> {
    fn invalid(&self, col: usize) -> CsvError {
        CsvError::InvalidValue {
            line: self.line,
            column: self.columns[col].to_string(),
            value: self.cells[col].to_string(),
        }
    }

    fn parse<T: std::str::FromStr>(&self, col: usize) -> Result<T, CsvError> {
        self.cells[col].parse::<T>().map_err(|_| self.invalid(col))
    }

    fn parse_option(&self, col: usize) -> Result<Option<f64>, CsvError> {
        if self.cells[col].is_empty() {
            Ok(None)
        } else {
            self.parse(col).map(Some)
        }
    }

    fn is_blank(&self, col: usize) -> bool {
        self.cells[col].is_empty()
    }
}

/// Read a keyed table from CSV text written by [`write_table_csv_to`]
pub fn read_table_csv_from<R: BufRead>(reader: R) -> Result<KeyedTable, CsvError> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(CsvError::BadHeader(String::new())),
    };
    let mut table = table_for_header(&header)?;
    let columns = table.columns();
    let layout = table.layout();
    let hit_start = KEY_COLUMNS.len() + TRACK_FIELD_COUNT;
    let truth_start = hit_start + BASE_HIT_COLUMNS.len();
    let position_start = truth_start + layout.truth_count();

    // (track id, whether it was written as a track without hits)
    let mut current: Option<(i64, bool)> = None;
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line_number = idx + 2;
        if line.trim().is_empty() {
            continue;
        }
        let row = CellReader {
            line: line_number,
            cells: line.trim().split(SEPARATOR).collect(),
            columns: &columns,
        };
        if row.cells.len() != columns.len() {
            return Err(CsvError::RowLength {
                line: line_number,
                expected: columns.len(),
                found: row.cells.len(),
            });
        }

        let track_id: i64 = row.parse(0)?;
        let mut params = [0.0; TRACK_FIELD_COUNT];
        for (offset, value) in params.iter_mut().enumerate() {
            *value = row.parse(KEY_COLUMNS.len() + offset)?;
        }
        let params = TrackParams::from(params);
        let is_marker = row.is_blank(1);

        match current {
            Some((id, was_marker)) if id == track_id => {
                if was_marker || is_marker {
                    return Err(row.invalid(1));
                }
                let entry = table.track(track_id).ok_or_else(|| row.invalid(0))?;
                if entry.params != params {
                    return Err(row.invalid(KEY_COLUMNS.len()));
                }
            }
            _ => {
                if table.track(track_id).is_some() {
                    return Err(CsvError::NonContiguousTrack {
                        line: line_number,
                        track_id,
                    });
                }
                table
                    .insert_track(track_id, params)
                    .map_err(|_| row.invalid(0))?;
            }
        }
        current = Some((track_id, is_marker));
        if is_marker {
            if (hit_start..columns.len()).any(|col| !row.is_blank(col)) {
                return Err(row.invalid(1));
            }
            continue;
        }

        let hit_index: usize = row.parse(1)?;
        let expected = table.track(track_id).map_or(0, |entry| entry.hit_count);
        if hit_index < expected {
            return Err(CsvError::DuplicateKey {
                line: line_number,
                track_id,
                hit_index,
            });
        } else if hit_index > expected {
            return Err(row.invalid(1));
        }

        let hit = Hit {
            time: row.parse(hit_start)?,
            amplitude: row.parse(hit_start + 1)?,
            ring: row.parse(hit_start + 2)?,
            pad: row.parse(hit_start + 3)?,
            plane: row.parse(hit_start + 4)?,
            distance: row.parse(hit_start + 5)?,
            true_x: None,
            true_y: None,
            true_z: None,
        };
        let mut truth = [None; 3];
        for (offset, value) in truth.iter_mut().take(layout.truth_count()).enumerate() {
            *value = row.parse_option(truth_start + offset)?;
        }
        let hit = Hit {
            true_x: truth[0],
            true_y: truth[1],
            true_z: truth[2],
            ..hit
        };
        let pad_position = if table.has_pad_positions() {
            let x = row.parse_option(position_start)?;
            let y = row.parse_option(position_start + 1)?;
            x.zip(y)
        } else {
            None
        };
        table.insert_hit(hit, pad_position);
    }
    Ok(table)
}

/// Read a keyed table from a CSV file
pub fn read_table_csv(path: &Path) -> Result<KeyedTable, CsvError> {
    let file = File::open(path)?;
    read_table_csv_from(BufReader::new(file))
}

/// Write track summaries as CSV to any writer. Missing values are left empty.
pub fn write_summary_csv_to<W: Write>(
    summary: &[TrackSummary],
    writer: &mut W,
) -> Result<(), CsvError> {
    writeln!(writer, "{}", SUMMARY_COLUMNS.join(SEPARATOR))?;
    for track in summary {
        let cells = [
            track.track_id.to_string(),
            track.momentum.to_string(),
            track.theta.to_string(),
            track.phi.to_string(),
            track.z_vertex.to_string(),
            track.hit_count.to_string(),
            format_option(track.time_min),
            format_option(track.time_max),
            format_option(track.adc_mean),
            track.adc_total.to_string(),
            track.n_rings.to_string(),
            track.n_pads.to_string(),
            track.n_planes.to_string(),
        ];
        write_row(writer, &cells)?;
    }
    Ok(())
}

/// Write track summaries to a CSV file
pub fn write_summary_csv(summary: &[TrackSummary], path: &Path) -> Result<(), CsvError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_summary_csv_to(summary, &mut writer)?;
    writer.flush()?;
    spdlog::info!(
        "Wrote summary of {} tracks to {}",
        summary.len(),
        path.to_string_lossy()
    );
    Ok(())
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::event::Event;
    use crate::event_file::parse_event_data;
    use crate::geometry::DetectorGeometry;
    use crate::summary::summarize;
    use crate::table::{build_table, TableOptions};
    use crate::window::EventWindow;
    use std::io::Cursor;

    const EVENTS: &str = "Event 0
0.391797 56.63 -95.11 0.0532
1143.44 7.11161e-07 0 91 6 0.0366874 0.000319447 -0.050833
1160.56 9.25686e-08 0 91 6 0.0372368 0.000404208 -0.0516643
Event 5
0.5123 45.2 -120.5 0.0621
Event 2
0.623 38.7 -89.3 0.0712
1400.0 3.2e-06 1 90 7 0.055 0.0008 -0.075
";

    fn table(options: &TableOptions) -> KeyedTable {
        let events = parse_event_data(EVENTS.lines(), HitLayout::ReadoutWithTruth)
            .unwrap()
            .into_iter()
            .map(Ok::<Event, ParseError>);
        build_table(events, EventWindow::all(), HitLayout::ReadoutWithTruth, options).unwrap()
    }

    fn to_text(table: &KeyedTable) -> String {
        let mut buffer = Vec::new();
        write_table_csv_to(table, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_write_layout() {
        let text = to_text(&table(&TableOptions::default()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "track_id,hit_index,momentum,theta,phi,z_vertex,time,amplitude,ring,pad,plane,distance,true_x,true_y"
        );
        assert!(lines[1].starts_with("0,0,0.391797,56.63,-95.11,0.0532,1143.44,"));
        assert!(lines[1].contains(",0,91,6,"));
        assert_eq!(lines[3], "5,,0.5123,45.2,-120.5,0.0621,,,,,,,,");
        assert!(lines[4].starts_with("2,0,"));
    }

    #[test]
    fn test_round_trip() {
        for options in [
            TableOptions::default(),
            TableOptions {
                pad_positions: Some(DetectorGeometry::default()),
            },
        ] {
            let table = table(&options);
            let restored = read_table_csv_from(Cursor::new(to_text(&table))).unwrap();
            assert_eq!(restored, table);
        }
    }

    #[test]
    fn test_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = table(&TableOptions::default());
        write_table_csv(&table, &path).unwrap();
        assert_eq!(read_table_csv(&path).unwrap(), table);
    }

    #[test]
    fn test_bad_header() {
        let result = read_table_csv_from(Cursor::new("track_id,hit_index,time\n"));
        assert!(matches!(result, Err(CsvError::MissingColumn(_))));
        let result = read_table_csv_from(Cursor::new(""));
        assert!(matches!(result, Err(CsvError::BadHeader(_))));
        let header = "track_id,hit_index,momentum,theta,phi,z_vertex,amplitude,time,ring,pad,plane,distance\n";
        let result = read_table_csv_from(Cursor::new(header));
        assert!(matches!(result, Err(CsvError::BadHeader(_))));
    }

    #[test]
    fn test_bad_rows() {
        let header =
            "track_id,hit_index,momentum,theta,phi,z_vertex,time,amplitude,ring,pad,plane,distance\n";
        let short = format!("{header}0,0,1,2,3,4,5,6,7\n");
        assert!(matches!(
            read_table_csv_from(Cursor::new(short)),
            Err(CsvError::RowLength { line: 2, .. })
        ));

        let float_ring = format!("{header}0,0,1,2,3,4,5,6,0.5,1,1,0.1\n");
        match read_table_csv_from(Cursor::new(float_ring)) {
            Err(CsvError::InvalidValue { column, .. }) => assert_eq!(column, "ring"),
            other => panic!("unexpected result {other:?}"),
        }

        let repeated = format!("{header}0,0,1,2,3,4,5,6,0,1,1,0.1\n0,0,1,2,3,4,5,6,0,1,1,0.1\n");
        assert!(matches!(
            read_table_csv_from(Cursor::new(repeated)),
            Err(CsvError::DuplicateKey { line: 3, .. })
        ));

        let split = format!(
            "{header}0,0,1,2,3,4,5,6,0,1,1,0.1\n1,0,1,2,3,4,5,6,0,1,1,0.1\n0,1,1,2,3,4,5,6,0,1,1,0.1\n"
        );
        assert!(matches!(
            read_table_csv_from(Cursor::new(split)),
            Err(CsvError::NonContiguousTrack { line: 4, track_id: 0 })
        ));
    }

    #[test]
    fn test_summary_csv() {
        let summary = summarize(&table(&TableOptions::default()));
        let mut buffer = Vec::new();
        write_summary_csv_to(&summary, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("track_id,momentum,theta,phi,z_vertex,hit_count"));
        assert!(lines[1].starts_with("0,0.391797,56.63,-95.11,0.0532,2,1143.44,1160.56,"));
        assert_eq!(lines[2], "5,0.5123,45.2,-120.5,0.0621,0,,,,0,0,0,0");
    }
}
