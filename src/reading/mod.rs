pub mod daily;
pub mod file_properties;
pub mod units;

pub use daily::DailyObservation;
pub use file_properties::StationMapping;
pub use units::{normalise_tenths, MISSING_SENTINEL};
