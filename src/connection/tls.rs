use std::io::BufReader;
use std::sync::Arc;

use tokio_rustls::rustls::{Certificate, ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use tokio_rustls::TlsConnector;

use crate::connection::stream::MySqlStream;
use crate::error::Error;
use crate::options::{ConnectOptions, SslMode};
use crate::protocol::connect::SslRequest;
use crate::protocol::Capabilities;

/// Runs the in-band TLS upgrade after the greeting: sends the SSL
/// request (a truncated handshake response) in clear, then swaps the
/// transport for an encrypted one. The rest of the handshake continues
/// on the new channel.
///
/// Returns whether the connection is now encrypted. `Preferred` mode
/// downgrades silently when the server lacks TLS support; `Required`
/// refuses.
pub(super) async fn maybe_upgrade(
    stream: &mut MySqlStream,
    options: &ConnectOptions,
) -> Result<bool, Error> {
    match options.ssl_mode {
        SslMode::Disabled => Ok(false),

        SslMode::Preferred => {
            if !stream.capabilities.contains(Capabilities::SSL) {
                tracing::warn!("server does not support TLS; continuing in cleartext");
                return Ok(false);
            }

            upgrade(stream, options).await?;

            Ok(true)
        }

        SslMode::Required => {
            if !stream.capabilities.contains(Capabilities::SSL) {
                return Err(Error::Tls("server does not support TLS".into()));
            }

            upgrade(stream, options).await?;

            Ok(true)
        }
    }
}

async fn upgrade(stream: &mut MySqlStream, options: &ConnectOptions) -> Result<(), Error> {
    stream.write_message(&SslRequest {
        max_packet_size: super::MAX_PACKET_SIZE,
        client_collation: options.collation,
    })?;

    stream.flush().await?;

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_store(options)?)
        .with_no_client_auth();

    let host = options
        .tls_server_name
        .as_deref()
        .unwrap_or(&options.host);

    let server_name = ServerName::try_from(host)
        .map_err(|_| Error::Tls(format!("invalid TLS server name {:?}", host).into()))?;

    let connector = TlsConnector::from(Arc::new(config));

    let socket = stream.detach_socket();
    let encrypted = connector
        .connect(server_name, socket)
        .await
        .map_err(Error::tls)?;

    stream.attach_socket(Box::new(encrypted));

    Ok(())
}

fn root_store(options: &ConnectOptions) -> Result<RootCertStore, Error> {
    let mut store = RootCertStore::empty();

    if let Some(path) = &options.ssl_ca {
        let pem = std::fs::read(path)?;

        for cert in rustls_pemfile::certs(&mut BufReader::new(&pem[..]))? {
            store
                .add(&Certificate(cert))
                .map_err(Error::tls)?;
        }

        return Ok(store);
    }

    store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    Ok(store)
}
