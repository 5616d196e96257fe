use std::fmt::{self, Display, Formatter};

use crate::error::Error;
use crate::protocol::{Capabilities, Status};

/// Where a connection is in its life.
///
/// Terminal state is `Closed`; any phase may move directly to
/// `Disconnecting` on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Connecting,
    Handshake,
    Ssl,
    Auth,
    Command,
    Disconnecting,
    Closed,
}

/// Per-connection mutable state. Owned and mutated only by the I/O task
/// (and by the handshake sequence that precedes it).
#[derive(Debug)]
pub(crate) struct ConnectionContext {
    pub(crate) capabilities: Capabilities,
    pub(crate) server_version: ServerVersion,
    pub(crate) connection_id: u32,
    pub(crate) collation: u8,
    pub(crate) status: Status,
    pub(crate) lifecycle: Lifecycle,
}

impl ConnectionContext {
    pub(crate) fn new(collation: u8) -> Self {
        Self {
            capabilities: Capabilities::empty(),
            server_version: ServerVersion::default(),
            connection_id: 0,
            collation,
            status: Status::empty(),
            lifecycle: Lifecycle::Connecting,
        }
    }

    pub(crate) fn transition(&mut self, to: Lifecycle) {
        tracing::debug!(from = ?self.lifecycle, to = ?to, "connection lifecycle");
        self.lifecycle = to;
    }
}

/// The server version triple, parsed out of the greeting.
///
/// Vendor suffixes (`5.5.5-10.4.7-MariaDB-...`) are tolerated; only the
/// leading `major.minor.patch` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ServerVersion {
    pub(crate) fn parse(version: &str) -> Result<Self, Error> {
        let core = version
            .split('-')
            .next()
            .unwrap_or(version);

        let mut parts = core.splitn(3, '.').map(|part| {
            part.parse::<u16>()
                .map_err(|_| err_protocol!("malformed server version {:?}", version))
        });

        let major = parts.next().transpose()?.unwrap_or(0);
        let minor = parts.next().transpose()?.unwrap_or(0);
        let patch = parts.next().transpose()?.unwrap_or(0);

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl Display for ServerVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::ServerVersion;

    #[test]
    fn it_parses_plain_versions() {
        let v = ServerVersion::parse("5.7.40").unwrap();

        assert_eq!((v.major, v.minor, v.patch), (5, 7, 40));
    }

    #[test]
    fn it_parses_vendor_suffixes() {
        let v = ServerVersion::parse("5.5.5-10.4.7-MariaDB-1:10.4.7+maria~bionic").unwrap();

        assert_eq!((v.major, v.minor, v.patch), (5, 5, 5));
    }

    #[test]
    fn it_orders_versions() {
        assert!(ServerVersion::parse("8.0.18").unwrap() > ServerVersion::parse("5.7.40").unwrap());
    }

    #[test]
    fn it_rejects_garbage() {
        assert!(ServerVersion::parse("not-a-version").is_err());
    }
}
