use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::constants::{BASE_HIT_COLUMNS, TRACK_FIELD_COUNT, TRUTH_HIT_COLUMNS};
use super::error::HitLayoutError;

/// Widest hit record any layout produces
pub const MAX_HIT_FIELDS: usize = BASE_HIT_COLUMNS.len() + TRUTH_HIT_COLUMNS.len();

/// The declared schema of a hit line.
///
/// Digitized files come in a few flavors. The readout flavor is what the DAQ chain produces,
/// while the truth and simulation flavors carry the Monte-Carlo position of the ionization.
/// The simulation flavor also orders its tokens differently:
///
/// ```text
/// readout:            time amplitude ring pad plane distance
/// readout_with_truth: time amplitude ring pad plane distance true_x true_y
/// simulation:         time amplitude true_x true_y true_z ring pad plane distance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitLayout {
    #[default]
    Readout,
    ReadoutWithTruth,
    Simulation,
}

impl HitLayout {
    /// Number of tokens on a hit line
    pub fn field_count(&self) -> usize {
        BASE_HIT_COLUMNS.len() + self.truth_count()
    }

    /// Number of true position coordinates carried by each hit
    pub fn truth_count(&self) -> usize {
        match self {
            Self::Readout => 0,
            Self::ReadoutWithTruth => 2,
            Self::Simulation => 3,
        }
    }

    /// Output column names, which are always base columns first, then truth
    pub fn columns(&self) -> Vec<&'static str> {
        BASE_HIT_COLUMNS
            .iter()
            .chain(TRUTH_HIT_COLUMNS.iter().take(self.truth_count()))
            .copied()
            .collect()
    }

    /// Find the layout with the given number of truth columns
    pub fn from_truth_count(count: usize) -> Option<Self> {
        match count {
            0 => Some(Self::Readout),
            2 => Some(Self::ReadoutWithTruth),
            3 => Some(Self::Simulation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Readout => "readout",
            Self::ReadoutWithTruth => "readout_with_truth",
            Self::Simulation => "simulation",
        }
    }
}

impl Display for HitLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HitLayout {
    type Err = HitLayoutError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readout" => Ok(Self::Readout),
            "readout_with_truth" => Ok(Self::ReadoutWithTruth),
            "simulation" => Ok(Self::Simulation),
            _ => Err(HitLayoutError(s.to_string())),
        }
    }
}

/// The reconstructed trajectory parameters of the single track in an event
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackParams {
    /// GeV/c
    pub momentum: f64,
    /// degrees
    pub theta: f64,
    /// degrees
    pub phi: f64,
    /// m
    pub z_vertex: f64,
}

impl TrackParams {
    pub fn as_array(&self) -> [f64; TRACK_FIELD_COUNT] {
        [self.momentum, self.theta, self.phi, self.z_vertex]
    }
}

impl From<[f64; TRACK_FIELD_COUNT]> for TrackParams {
    fn from(values: [f64; TRACK_FIELD_COUNT]) -> Self {
        Self {
            momentum: values[0],
            theta: values[1],
            phi: values[2],
            z_vertex: values[3],
        }
    }
}

/// A single pad signal
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hit {
    /// Time of arrival at the pad (ns)
    pub time: f64,
    /// ADC amplitude
    pub amplitude: f64,
    pub ring: i32,
    pub pad: i32,
    pub plane: i32,
    /// Drift distance to the GEM readout (m)
    pub distance: f64,
    pub true_x: Option<f64>,
    pub true_y: Option<f64>,
    pub true_z: Option<f64>,
}

impl Hit {
    /// Flatten the hit into the fixed output column order.
    ///
    /// Only the first `layout.field_count()` values are meaningful; absent truth
    /// coordinates are NaN.
    pub fn as_array(&self) -> [f64; MAX_HIT_FIELDS] {
        [
            self.time,
            self.amplitude,
            self.ring as f64,
            self.pad as f64,
            self.plane as f64,
            self.distance,
            self.true_x.unwrap_or(f64::NAN),
            self.true_y.unwrap_or(f64::NAN),
            self.true_z.unwrap_or(f64::NAN),
        ]
    }
}

/// One block of the event file. One event holds exactly one track.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    /// The integer from the `Event <int>` header, taken verbatim
    pub id: i64,
    pub track: TrackParams,
    /// Hits in file order; time is not guaranteed to be sorted
    pub hits: Vec<Hit>,
}
