// mTPC pad plane, lengths in cm
pub const DEFAULT_NUM_RINGS: usize = 21;
pub const DEFAULT_NUM_PADS_PER_RING: usize = 122;
pub const DEFAULT_INNER_RADIUS: f64 = 5.0;
pub const DEFAULT_OUTER_RADIUS: f64 = 15.0;

/// Keyword which opens every event block
pub const EVENT_HEADER_KEYWORD: &str = "Event";

/// momentum, theta, phi, z_vertex
pub const TRACK_FIELD_COUNT: usize = 4;
pub const TRACK_COLUMNS: [&str; TRACK_FIELD_COUNT] = ["momentum", "theta", "phi", "z_vertex"];

/// Hit columns every layout carries, in output order
pub const BASE_HIT_COLUMNS: [&str; 6] = ["time", "amplitude", "ring", "pad", "plane", "distance"];
pub const TRUTH_HIT_COLUMNS: [&str; 3] = ["true_x", "true_y", "true_z"];
pub const POSITION_COLUMNS: [&str; 2] = ["pad_x", "pad_y"];

/// Version of the output formats written by this crate
pub const FORMAT_VERSION: &str = "1.0";
