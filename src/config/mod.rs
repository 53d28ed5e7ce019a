mod structs;

pub use structs::{
    AppConfig, CodecConfig, DatabaseConfig, FloodConfig, GeoConfig, LoggingConfig, NonceConfig,
    ResolverConfig, SiteConfig,
};
