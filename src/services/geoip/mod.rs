mod maxmind;
mod provider;

pub use maxmind::MaxMindProvider;
pub use provider::{GeoLookup, GeoResolver, NullGeoProvider};
