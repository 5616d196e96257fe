use crate::connection::auth::AuthPlugin;
use crate::connection::codec::DuplexCodec;
use crate::connection::context::{ConnectionContext, Lifecycle, ServerVersion};
use crate::connection::stream::MySqlStream;
use crate::error::Error;
use crate::options::{ConnectOptions, SslMode};
use crate::protocol::connect::HandshakeResponse;
use crate::protocol::server::ServerMessage;
use crate::protocol::{Capabilities, ClientMessage};

/// The scripted first exchange on a connection, privileged to run before
/// the command phase: greeting, capability negotiation, optional TLS
/// upgrade, handshake response, and any number of auth-plugin
/// round-trips, terminated by OK (login success) or an error.
pub(super) async fn establish(
    stream: &mut MySqlStream,
    codec: &mut DuplexCodec,
    context: &mut ConnectionContext,
    options: &ConnectOptions,
) -> Result<bool, Error> {
    context.transition(Lifecycle::Handshake);

    let packet = stream.expect_packet().await?;
    let greeting = match codec.decode(packet)?.message.ok()? {
        ServerMessage::HandshakeGreeting(greeting) => greeting,

        message => {
            return Err(err_protocol!(
                "expected the server greeting; received {:?}",
                message
            ));
        }
    };

    let server_version = ServerVersion::parse(&greeting.server_version)?;

    if server_version < (ServerVersion { major: 5, minor: 5, patch: 0 }) {
        return Err(err_protocol!(
            "server version {} is below the 5.5 baseline",
            server_version
        ));
    }

    context.server_version = server_version;
    context.connection_id = greeting.connection_id;
    context.status = greeting.status;

    tracing::debug!(
        version = %server_version,
        connection_id = greeting.connection_id,
        "received server greeting"
    );

    // Negotiate the intersection of what we want with what the server
    // advertises
    let mut wanted = Capabilities::PROTOCOL_41
        | Capabilities::LONG_PASSWORD
        | Capabilities::IGNORE_SPACE
        | Capabilities::DEPRECATE_EOF
        | Capabilities::FOUND_ROWS
        | Capabilities::TRANSACTIONS
        | Capabilities::SECURE_CONNECTION
        | Capabilities::PLUGIN_AUTH_LENENC_DATA
        | Capabilities::MULTI_STATEMENTS
        | Capabilities::MULTI_RESULTS
        | Capabilities::PS_MULTI_RESULTS
        | Capabilities::PLUGIN_AUTH
        | Capabilities::LOCAL_FILES
        | Capabilities::SESSION_TRACK;

    if options.database.is_some() {
        wanted |= Capabilities::CONNECT_WITH_DB;
    }

    if cfg!(feature = "tls") && options.ssl_mode != SslMode::Disabled {
        wanted |= Capabilities::SSL;
    }

    if !greeting
        .server_capabilities
        .contains(Capabilities::PROTOCOL_41)
    {
        return Err(err_protocol!("server does not support the 4.1 protocol"));
    }

    let negotiated =
        (wanted & greeting.server_capabilities) | Capabilities::PROTOCOL_41;

    stream.capabilities = negotiated;
    codec.capabilities = negotiated;
    context.capabilities = negotiated;

    // TLS bridges in before the handshake response so credentials never
    // travel in clear
    let ssl_active = {
        #[cfg(feature = "tls")]
        {
            context.transition(Lifecycle::Ssl);
            super::tls::maybe_upgrade(stream, options).await?
        }

        #[cfg(not(feature = "tls"))]
        {
            if options.ssl_mode == SslMode::Required {
                return Err(Error::Tls(
                    "TLS required but this build carries no TLS support".into(),
                ));
            }

            false
        }
    };

    context.transition(Lifecycle::Auth);

    let mut plugin = greeting
        .auth_plugin_name
        .as_deref()
        .map(str::parse::<AuthPlugin>)
        .transpose()?
        .unwrap_or(AuthPlugin::MySqlNativePassword);

    let password = options.password.as_deref().unwrap_or("");
    let mut nonce = greeting.auth_plugin_data.to_vec();

    stream.write_message(&ClientMessage::HandshakeResponse(HandshakeResponse {
        max_packet_size: super::MAX_PACKET_SIZE,
        client_collation: context.collation,
        username: options.username.clone().into_boxed_str(),
        database: options.database.clone().map(String::into_boxed_str),
        auth_plugin_name: plugin.name().into(),
        auth_response: plugin.scramble(password, &nonce),
    }))?;

    stream.flush().await?;

    // Plugin round-trips until the server accepts or rejects the login
    loop {
        let packet = stream.expect_packet().await?;
        let decoded = codec.decode(packet)?;

        match decoded.message {
            ServerMessage::Ok(ok) => {
                context.status = ok.status;
                context.transition(Lifecycle::Command);

                tracing::debug!(
                    capabilities = ?context.capabilities,
                    status = ?context.status,
                    "login succeeded"
                );

                return Ok(ssl_active);
            }

            ServerMessage::Error(err) => {
                return Err(Error::AuthFailed(err.error_message));
            }

            ServerMessage::AuthSwitch(switch) => {
                plugin = switch.plugin_name.parse()?;
                nonce = switch.plugin_data.to_vec();

                stream.write_message(&ClientMessage::AuthContinue(
                    plugin.scramble(password, &nonce),
                ))?;
                stream.flush().await?;
            }

            ServerMessage::AuthMoreData(more) => {
                handle_more_data(stream, plugin, password, &nonce, &more.data, ssl_active).await?;
            }

            message => {
                return Err(err_protocol!(
                    "unexpected message {:?} during authentication",
                    message
                ));
            }
        }
    }
}

/// The full-authentication continuations of the SHA-2 plugins.
async fn handle_more_data(
    stream: &mut MySqlStream,
    plugin: AuthPlugin,
    password: &str,
    nonce: &[u8],
    data: &[u8],
    ssl_active: bool,
) -> Result<(), Error> {
    match (plugin, data) {
        // caching_sha2_password fast path hit; the OK follows on its own
        (AuthPlugin::CachingSha2Password, [0x03]) => Ok(()),

        // Fast path missed: full authentication
        (AuthPlugin::CachingSha2Password, [0x04]) | (AuthPlugin::Sha256Password, _)
            if ssl_active =>
        {
            // The channel is encrypted; the password may travel in clear
            let mut response = password.as_bytes().to_vec();
            response.push(0);

            stream.write_message(&ClientMessage::AuthContinue(response))?;
            stream.flush().await
        }

        (AuthPlugin::CachingSha2Password, [0x04]) => {
            request_rsa_key_and_respond(stream, plugin, password, nonce).await
        }

        (AuthPlugin::Sha256Password, _) => {
            request_rsa_key_and_respond(stream, plugin, password, nonce).await
        }

        _ => Err(err_protocol!(
            "unexpected auth continuation for {}",
            plugin.name()
        )),
    }
}

async fn request_rsa_key_and_respond(
    stream: &mut MySqlStream,
    plugin: AuthPlugin,
    password: &str,
    nonce: &[u8],
) -> Result<(), Error> {
    stream.write_message(&ClientMessage::AuthContinue(vec![
        plugin.public_key_request()
    ]))?;
    stream.flush().await?;

    let packet = stream.expect_packet().await?;
    let payload = packet.contiguous();

    // AUTH MORE DATA (0x01) carrying the PEM public key
    let pem = match payload.first() {
        Some(&0x01) => &payload[1..],

        Some(&0xFF) => {
            let err = crate::protocol::response::ErrPacket::decode(&payload)?;
            return Err(Error::AuthFailed(err.error_message));
        }

        _ => {
            return Err(err_protocol!(
                "expected the server RSA key during full authentication"
            ));
        }
    };

    let encrypted = super::auth::encrypt_rsa(pem, password, nonce)?;

    stream.write_message(&ClientMessage::AuthContinue(encrypted))?;
    stream.flush().await
}
