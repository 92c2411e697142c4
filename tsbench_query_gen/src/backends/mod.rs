//! Backend query generators for the devops use case.

use std::{fmt::Display, str::FromStr};

use crate::devops::{DevopsCore, DevopsGenerator};

mod siridb;
mod timescaledb;

pub use siridb::SiriDbDevops;
pub use timescaledb::TimescaleDbDevops;

/// The database a query stream is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    TimescaleDb,
    SiriDb,
}

impl Format {
    pub const ALL: &[Self] = &[Self::TimescaleDb, Self::SiriDb];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimescaleDb => "timescaledb",
            Self::SiriDb => "siridb",
        }
    }

    /// Build the devops generator of this backend around `core`
    pub fn devops_generator(
        &self,
        core: DevopsCore,
        options: BackendOptions,
    ) -> Box<dyn DevopsGenerator> {
        match self {
            Self::TimescaleDb => Box::new(TimescaleDbDevops::new(core, options.use_time_bucket)),
            Self::SiriDb => Box::new(SiriDbDevops::new(core)),
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|f| f.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(Self::as_str).collect();
                format!(
                    "unknown format '{s}', expected one of: {}",
                    known.join(", ")
                )
            })
    }
}

/// Backend specific generation switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendOptions {
    /// TimescaleDB: bucket with `time_bucket()` instead of `date_trunc()`
    pub use_time_bucket: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_format() {
        assert_eq!("siridb".parse::<Format>().unwrap(), Format::SiriDb);
        assert_eq!(
            "timescaledb".parse::<Format>().unwrap(),
            Format::TimescaleDb
        );
        assert_eq!(
            "influx".parse::<Format>().unwrap_err(),
            "unknown format 'influx', expected one of: timescaledb, siridb"
        );
    }
}
