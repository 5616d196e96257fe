use std::path::{Path, PathBuf};
use std::time::Duration;

/// Determines whether or with what priority a TLS connection will be
/// negotiated during the handshake.
///
/// Mirrors the semantics of the `--ssl-mode` option of the MySQL client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Never attempt an encrypted connection.
    Disabled,

    /// Attempt the upgrade, but fall back to cleartext if the server does
    /// not advertise TLS support.
    #[default]
    Preferred,

    /// Fail the connection if the server does not support TLS.
    Required,
}

/// Options and flags used to configure a connection.
///
/// The engine does not parse connection URIs; an external collaborator is
/// expected to translate whatever syntax it accepts into this builder.
///
/// ```rust,no_run
/// # use reactor_mysql::{Client, ConnectOptions};
/// # async fn connect() -> Result<Client, reactor_mysql::Error> {
/// Client::connect(
///     &ConnectOptions::new()
///         .host("localhost")
///         .username("root")
///         .password("password")
///         .database("db"),
/// )
/// .await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: Option<String>,
    pub(crate) database: Option<String>,
    pub(crate) ssl_mode: SslMode,
    pub(crate) ssl_ca: Option<PathBuf>,
    pub(crate) tls_server_name: Option<String>,
    pub(crate) collation: u8,
    pub(crate) close_timeout: Duration,
    pub(crate) write_buffer_limit: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectOptions {
    /// Creates a new, default set of options ready for configuration.
    pub fn new() -> Self {
        Self {
            host: String::from("localhost"),
            port: 3306,
            username: String::from("root"),
            password: None,
            database: None,
            ssl_mode: SslMode::Preferred,
            ssl_ca: None,
            tls_server_name: None,
            // utf8mb4_general_ci
            collation: 45,
            close_timeout: Duration::from_secs(5),
            write_buffer_limit: 1 << 24,
        }
    }

    /// Sets the name of the host to connect to. Defaults to `localhost`.
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_owned();
        self
    }

    /// Sets the port to connect to at the server host. Defaults to `3306`.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the username to connect as.
    pub fn username(mut self, username: &str) -> Self {
        self.username = username.to_owned();
        self
    }

    /// Sets the password to connect with.
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_owned());
        self
    }

    /// Sets the database; if set, `CONNECT_WITH_DB` is negotiated and the
    /// handshake response selects this schema.
    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_owned());
        self
    }

    /// Sets whether or with what priority a TLS connection is negotiated.
    ///
    /// Defaults to [`SslMode::Preferred`].
    pub fn ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    /// Sets a file containing trusted Certificate Authorities in PEM
    /// format used to verify the server certificate during the upgrade.
    pub fn ssl_ca(mut self, path: impl AsRef<Path>) -> Self {
        self.ssl_ca = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the server name sent for SNI and used for certificate
    /// verification. Defaults to the connection host.
    pub fn tls_server_name(mut self, name: &str) -> Self {
        self.tls_server_name = Some(name.to_owned());
        self
    }

    /// Sets the collation id announced in the handshake response.
    ///
    /// Defaults to `45` (`utf8mb4_general_ci`).
    pub fn collation(mut self, collation: u8) -> Self {
        self.collation = collation;
        self
    }

    /// Time allowed for a graceful close (`COM_QUIT` followed by the peer
    /// closing) before falling back to an immediate shutdown.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Upper bound on bytes buffered for a single outbound request.
    /// Exceeding it fails the request with a backpressure error rather
    /// than growing without bound.
    pub fn write_buffer_limit(mut self, limit: usize) -> Self {
        self.write_buffer_limit = limit;
        self
    }
}
