use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::{Error, Result};

pub const KEYSPACE: &str = "yugabyte.cql.keyspace";
pub const TABLE: &str = "yugabyte.cql.tablename";
pub const CONTACT_POINTS: &str = "yugabyte.cql.contact.points";

/// A `host:port` address of a database node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContactPoint {
    host: String,
    port: u16,
}

impl ContactPoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for ContactPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s.split(':').collect_tuple().ok_or_else(|| {
            Error::Config(format!("invalid contact point `{s}`, expected host:port"))
        })?;
        if host.is_empty() {
            return Err(Error::Config(format!("contact point `{s}` has no host")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|err| Error::Config(format!("invalid port in contact point `{s}`: {err}")))?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ContactPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The connector settings of a sink task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    keyspace: String,
    table: String,
    contact_points: Vec<ContactPoint>,
}

impl SinkConfig {
    /// Reads the target table and the cluster's contact points out of the connector properties.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let keyspace = required(properties, KEYSPACE)?;
        let table = required(properties, TABLE)?;
        let contact_points = required(properties, CONTACT_POINTS)?
            .split(',')
            .map(|point| point.trim().parse::<ContactPoint>())
            .collect::<Result<Vec<_>>>()?;

        if !contact_points.iter().map(ContactPoint::port).all_equal() {
            return Err(Error::Config(format!(
                "using multiple CQL ports is not supported: {}",
                contact_points.iter().format(",")
            )));
        }

        Ok(Self { keyspace: keyspace.to_owned(), table: table.to_owned(), contact_points })
    }

    #[inline]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[inline]
    pub fn contact_points(&self) -> &[ContactPoint] {
        &self.contact_points
    }

    /// The port shared by every contact point.
    #[inline]
    pub fn port(&self) -> u16 {
        // a parsed config always has at least one contact point
        self.contact_points[0].port()
    }
}

fn required<'a>(properties: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    match properties.get(key).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!("missing required property `{key}`"))),
    }
}
