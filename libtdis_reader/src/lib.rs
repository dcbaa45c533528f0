//! # tdis_reader
//!
//! tdis_reader converts the per-event text logs of the TDIS mTPC (a multi-ring, multi-plane
//! time projection chamber) into numeric forms that can be analyzed. Each event in a log
//! holds a single reconstructed track and the pad hits it produced. The library can pack a
//! window of events into dense arrays or into a keyed table, summarize tracks, and map the
//! pad plane's (ring, pad) addresses to Cartesian positions and back.
//!
//! ## Installation
//!
//! The only method of install is from source. If you have not used Rust before, see the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installation instructions.
//!
//! ### HDF5
//!
//! The dense output is written with HDF5, which must be installed before building. Typically
//! this is done with a package manager (homebrew, apt, etc) and the Rust libraries will auto
//! detect the location of the install. If HDF5 lives in a custom location, write the
//! following into `.cargo/config.toml` in the repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./tdis_reader_cli` from the top
//! level repository.
//!
//! ## Input Format
//!
//! Event logs are plain text. Every event is a header line, one line of track parameters,
//! and zero or more hit lines. Fields are separated by whitespace and blank lines are ignored.
//!
//! ```text
//! Event <int>
//! <momentum> <theta_deg> <phi_deg> <z_vertex>
//! <time> <amplitude> <ring> <pad> <plane> <distance> [<true_x> <true_y>]
//! ...
//! ```
//!
//! The header integer is used verbatim as the track id. The number of fields on a hit line
//! is fixed by the [`event::HitLayout`] given to the parser:
//!
//! - `readout`: `time amplitude ring pad plane distance`
//! - `readout_with_truth`: the readout fields then `true_x true_y`
//! - `simulation`: `time amplitude true_x true_y true_z ring pad plane distance`
//!
//! A file that does not follow the grammar fails to parse with the offending line number. A
//! header with no track parameter line after it is an error, never a dropped event.
//!
//! ## Configuration
//!
//! Conversions are driven by a YAML configuration. A template can be made with
//! `tdis_reader_cli -p config.yml new`. The format is as follows:
//!
//! ```yml
//! input_path: /data/tracks.txt
//! output_path: /data/tracks.h5
//! summary_path: null
//! hit_layout: readout
//! skip_events: 0
//! n_events: null
//! pad_positions: false
//! geometry:
//!   num_rings: 21
//!   num_pads_per_ring: 122
//!   inner_radius: 5.0
//!   outer_radius: 15.0
//! ```
//!
//! `skip_events` and `n_events` select a window of the file; a `null` `n_events` reads to the
//! end. Setting `pad_positions` adds the pad center coordinates to table output. Geometry
//! lengths are in cm.
//!
//! ## Output
//!
//! The output representation is chosen by the extension of `output_path`.
//!
//! ### CSV Table
//!
//! A `.csv` output is the keyed table, one row per hit with the keys first:
//!
//! ```csv
//! track_id,hit_index,momentum,theta,phi,z_vertex,time,amplitude,ring,pad,plane,distance
//! ```
//!
//! followed by any truth columns and `pad_x,pad_y` if requested. A track without hits is
//! written as one row with an empty `hit_index`.
//!
//! ### HDF5 Data Format
//!
//! A `.h5` or `.hdf5` output holds the dense arrays. Unused hit slots are NaN.
//!
//! ```text
//! tracks.h5 - version, hit_layout
//! |---- track_ids(dset) [n_events]
//! |---- tracks(dset) [n_events, 4] - columns
//! |---- hits(dset) [n_events, max_hits, n_fields] - columns
//! ```
//!
//! If `summary_path` is set, a CSV of per-track statistics is written there too.
pub mod config;
pub mod constants;
pub mod csv_io;
pub mod dense;
pub mod error;
pub mod event;
pub mod event_file;
pub mod geometry;
pub mod hdf_writer;
pub mod process;
pub mod summary;
pub mod table;
pub mod window;
