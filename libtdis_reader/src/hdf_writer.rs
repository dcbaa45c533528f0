use hdf5::types::VarLenUnicode;
use hdf5::{Dataset, File, Location};
use ndarray::{ArrayView1, Ix3};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::constants::FORMAT_VERSION;
use super::dense::DenseArrayPair;
use super::error::HDF5WriterError;
use super::event::HitLayout;

const TRACKS_NAME: &str = "tracks";
const HITS_NAME: &str = "hits";
const TRACK_IDS_NAME: &str = "track_ids";

// Structure
// / - version, hit_layout
// |---- track_ids(dset) [n_events]
// |---- tracks(dset) [n_events, 4] - columns
// |---- hits(dset) [n_events, max_hits, n_fields] - columns
//
// Unused hit slots are NaN

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode, HDF5WriterError> {
    VarLenUnicode::from_str(value).map_err(|_| HDF5WriterError::InvalidString(value.to_string()))
}

fn write_string_attr(location: &Location, name: &str, value: &str) -> Result<(), HDF5WriterError> {
    location
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&to_var_len_unicode(value)?)?;
    Ok(())
}

fn write_columns_attr(dataset: &Dataset, columns: &[&str]) -> Result<(), HDF5WriterError> {
    let values = columns
        .iter()
        .map(|column| to_var_len_unicode(column))
        .collect::<Result<Vec<_>, _>>()?;
    let attr = dataset
        .new_attr::<VarLenUnicode>()
        .shape((values.len(),))
        .create("columns")?;
    attr.write(ArrayView1::from(values.as_slice()))?;
    Ok(())
}

fn read_string_attr(location: &Location, name: &str) -> Result<String, HDF5WriterError> {
    let value: VarLenUnicode = location.attr(name)?.read_scalar()?;
    Ok(value.to_string())
}

/// A simple struct which wraps around the hdf5-rust library.
///
/// Opens an HDF5 file and writes one dense array bundle to it.
#[derive(Debug)]
pub struct HDFWriter {
    file_handle: File,
    path: PathBuf,
}

impl HDFWriter {
    /// Create the writer, opening a file at path and tagging it with the format version
    pub fn new(path: &Path) -> Result<Self, HDF5WriterError> {
        let file_handle = File::create(path)?;
        let reader_version = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);
        write_string_attr(&file_handle, "version", &reader_version)?;
        Ok(Self {
            file_handle,
            path: path.to_path_buf(),
        })
    }

    /// Write the dense arrays. Column names are stored with each dataset.
    pub fn write_dense(&self, dense: &DenseArrayPair) -> Result<(), HDF5WriterError> {
        write_string_attr(&self.file_handle, "hit_layout", dense.layout.name())?;

        self.file_handle
            .new_dataset_builder()
            .with_data(&dense.track_ids)
            .create(TRACK_IDS_NAME)?;
        let tracks = self
            .file_handle
            .new_dataset_builder()
            .with_data(&dense.tracks)
            .create(TRACKS_NAME)?;
        write_columns_attr(&tracks, &dense.track_columns())?;
        let hits = self
            .file_handle
            .new_dataset_builder()
            .with_data(&dense.hits)
            .create(HITS_NAME)?;
        write_columns_attr(&hits, &dense.hit_columns())?;

        spdlog::info!(
            "Wrote {} events with up to {} hits to {}",
            dense.n_events(),
            dense.max_hits(),
            self.path.to_string_lossy()
        );
        Ok(())
    }

    /// Flush and consume the writer
    pub fn close(self) -> Result<(), HDF5WriterError> {
        self.file_handle.flush()?;
        Ok(())
    }
}

/// Write a dense array bundle to a new HDF5 file at path
pub fn write_dense_bundle(dense: &DenseArrayPair, path: &Path) -> Result<(), HDF5WriterError> {
    let writer = HDFWriter::new(path)?;
    writer.write_dense(dense)?;
    writer.close()
}

/// Read a bundle written by [`HDFWriter`] back into dense arrays
pub fn read_dense_bundle(path: &Path) -> Result<DenseArrayPair, HDF5WriterError> {
    let file = File::open(path)?;
    let version = read_string_attr(&file, "version")?;
    spdlog::debug!("Reading dense bundle {} with version {}", path.to_string_lossy(), version);

    let layout = HitLayout::from_str(&read_string_attr(&file, "hit_layout")?)?;
    let track_ids = file.dataset(TRACK_IDS_NAME)?.read_1d::<i64>()?;
    let tracks = file.dataset(TRACKS_NAME)?.read_2d::<f64>()?;
    let hits = file.dataset(HITS_NAME)?.read::<f64, Ix3>()?;

    let (n_events, _, n_fields) = hits.dim();
    if track_ids.len() != tracks.nrows() || tracks.nrows() != n_events {
        return Err(HDF5WriterError::ShapeMismatch(format!(
            "{} track ids, {} track rows, and {} hit rows",
            track_ids.len(),
            tracks.nrows(),
            n_events
        )));
    }
    if n_fields != layout.field_count() {
        return Err(HDF5WriterError::ShapeMismatch(format!(
            "hits have {} fields but the {} layout has {}",
            n_fields,
            layout,
            layout.field_count()
        )));
    }

    Ok(DenseArrayPair {
        layout,
        track_ids,
        tracks,
        hits,
    })
}
