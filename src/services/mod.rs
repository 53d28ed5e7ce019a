pub mod flood;
pub mod geoip;
pub mod nonce;
pub mod resolver;
pub mod title;

pub use flood::FloodGuard;
pub use geoip::{GeoLookup, GeoResolver, MaxMindProvider, NullGeoProvider};
pub use nonce::NonceFactory;
pub use resolver::{LinkResolver, NEXT_ID_OPTION};
pub use title::{EchoTitle, HttpTitleFetcher, TitleFetcher};
