//! Satellite tracking core: TLE parsing, SGP4 propagation, projection onto
//! the Earth and ground-track assembly, plus the collaborators a tracker
//! needs around it (TLE acquisition, pass prediction, configuration).

pub mod config;
pub mod earth;
pub mod error;
pub mod math;
pub mod pass;
pub mod projector;
pub mod propagator;
pub mod snapshot;
pub mod source;
pub mod time;
pub mod tle;
pub mod track;

pub use earth::EarthModel;
pub use error::{ConfigError, ParseError, PropagationError, SourceError};
pub use pass::{predict_passes, Pass};
pub use projector::{to_geodetic, to_look_angles, GeodeticPoint, LookAngles, ObserverLocation};
pub use propagator::{propagate, StateVector};
pub use snapshot::{snapshot, Snapshot, SnapshotRequest, TrackCache};
pub use tle::{initialize, ChecksumPolicy, OrbitalElementSet};
pub use track::{assemble, build_track, GroundTrack, TrackSample, TrackWindow};
