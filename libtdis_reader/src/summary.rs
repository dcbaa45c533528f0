use fxhash::FxHashSet;

use super::table::KeyedTable;

pub const SUMMARY_COLUMNS: [&str; 13] = [
    "track_id",
    "momentum",
    "theta",
    "phi",
    "z_vertex",
    "hit_count",
    "time_min",
    "time_max",
    "adc_mean",
    "adc_total",
    "n_rings",
    "n_pads",
    "n_planes",
];

/// Per-track statistics of a KeyedTable.
///
/// Tracks without hits get a hit_count of 0 and no time bounds or mean amplitude.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub track_id: i64,
    pub momentum: f64,
    pub theta: f64,
    pub phi: f64,
    pub z_vertex: f64,
    pub hit_count: usize,
    pub time_min: Option<f64>,
    pub time_max: Option<f64>,
    pub adc_mean: Option<f64>,
    pub adc_total: f64,
    /// Number of distinct rings hit
    pub n_rings: usize,
    pub n_pads: usize,
    pub n_planes: usize,
}

/// Summarize every track of the table, in the order the tracks were first seen
pub fn summarize(table: &KeyedTable) -> Vec<TrackSummary> {
    table
        .tracks()
        .iter()
        .map(|entry| {
            // Rows of a track are contiguous, so this is the whole group
            let rows = table.track_hits(entry.track_id).unwrap_or_default();
            let mut time_min: Option<f64> = None;
            let mut time_max: Option<f64> = None;
            let mut adc_total = 0.0;
            let mut rings = FxHashSet::default();
            let mut pads = FxHashSet::default();
            let mut planes = FxHashSet::default();
            for row in rows {
                let hit = &row.hit;
                time_min = Some(time_min.map_or(hit.time, |t| t.min(hit.time)));
                time_max = Some(time_max.map_or(hit.time, |t| t.max(hit.time)));
                adc_total += hit.amplitude;
                rings.insert(hit.ring);
                // Pad numbers repeat in every ring
                pads.insert((hit.ring, hit.pad));
                planes.insert(hit.plane);
            }
            let hit_count = rows.len();

            TrackSummary {
                track_id: entry.track_id,
                momentum: entry.params.momentum,
                theta: entry.params.theta,
                phi: entry.params.phi,
                z_vertex: entry.params.z_vertex,
                hit_count,
                time_min,
                time_max,
                adc_mean: (hit_count > 0).then(|| adc_total / hit_count as f64),
                adc_total,
                n_rings: rings.len(),
                n_pads: pads.len(),
                n_planes: planes.len(),
            }
        })
        .collect()
}
