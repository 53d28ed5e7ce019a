//! MaxMind GeoLite2 database lookup.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use maxminddb::Reader;
use tracing::trace;

use super::provider::GeoLookup;

pub struct MaxMindProvider {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindProvider {
    pub fn new(path: &str) -> Result<Self, maxminddb::MaxMindDbError> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

#[async_trait]
impl GeoLookup for MaxMindProvider {
    async fn lookup(&self, ip: &str) -> Option<String> {
        let ip_addr: IpAddr = ip.parse().ok()?;

        let result = self.reader.lookup(ip_addr).ok()?;
        let country: maxminddb::geoip2::Country = result.decode().ok()??;

        let code = country.country.iso_code.map(String::from);
        trace!("MaxMind lookup for {}: {:?}", ip, code);
        code
    }

    fn name(&self) -> &'static str {
        "MaxMind"
    }
}
