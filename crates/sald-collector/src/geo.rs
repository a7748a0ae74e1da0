//! IP geolocation
//!
//! Optional country lookups against a local MaxMind GeoLite2 database.
//! Enrichment must never block ingestion: every fault here degrades to
//! `None`, which callers persist as the literal `"Unknown"`.

use maxminddb::{geoip2, MaxMindDBError};
use std::net::IpAddr;
use std::path::Path;
use tracing::{info, warn};

/// Country placeholder stored when no lookup result is available
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Resolver mapping client addresses to ISO country codes
pub struct GeoResolver {
    reader: Option<maxminddb::Reader<Vec<u8>>>,
}

impl GeoResolver {
    /// Open the GeoLite2 database at `path`
    pub fn open(path: &Path) -> Result<Self, MaxMindDBError> {
        let reader = maxminddb::Reader::open_readfile(path)?;
        info!(path = %path.display(), "GeoIP database loaded");
        Ok(Self {
            reader: Some(reader),
        })
    }

    /// A resolver with no database; every lookup returns `None`
    pub fn disabled() -> Self {
        Self { reader: None }
    }

    /// Build a resolver from an optional configured database path
    ///
    /// A missing or unreadable database disables enrichment instead of
    /// failing the collector.
    pub fn from_config(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::open(path) {
                Ok(resolver) => resolver,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not load GeoIP database, enrichment disabled");
                    Self::disabled()
                },
            },
            None => {
                warn!("GEOIP_DATABASE_PATH not set, enrichment disabled");
                Self::disabled()
            },
        }
    }

    /// Whether a database is loaded
    pub fn is_enabled(&self) -> bool {
        self.reader.is_some()
    }

    /// Resolve an address to its ISO country code
    ///
    /// Returns `None` when no database is loaded, the input is empty or not
    /// an IP address, the address is not in the database, or the lookup
    /// fails for any other reason. Faults are logged, never propagated.
    pub fn resolve(&self, ip: &str) -> Option<String> {
        let reader = self.reader.as_ref()?;
        if ip.is_empty() {
            return None;
        }

        let address: IpAddr = match ip.parse() {
            Ok(addr) => addr,
            Err(_) => {
                warn!(ip = %ip, "Not a valid IP address, skipping geo lookup");
                return None;
            },
        };

        match reader.lookup::<geoip2::Country>(address) {
            Ok(country) => country
                .country
                .and_then(|c| c.iso_code)
                .map(|code| code.to_string()),
            Err(MaxMindDBError::AddressNotFoundError(_)) => None,
            Err(e) => {
                warn!(ip = %ip, error = %e, "GeoIP lookup failed");
                None
            },
        }
    }
}
