use std::str::FromStr;

use digest::Digest;
use memchr::memchr;
use rand::rngs::OsRng;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::Error;

/// The authentication plugins this engine can drive through the
/// connection-phase round-trips.
///
/// A plugin maps a server challenge and the configured credentials to
/// the next client auth payload; `caching_sha2_password` and
/// `sha256_password` additionally run a full-authentication path when
/// the fast path misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthPlugin {
    MySqlNativePassword,
    CachingSha2Password,
    Sha256Password,
}

impl FromStr for AuthPlugin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql_native_password" => Ok(AuthPlugin::MySqlNativePassword),
            "caching_sha2_password" => Ok(AuthPlugin::CachingSha2Password),
            "sha256_password" => Ok(AuthPlugin::Sha256Password),

            _ => Err(err_protocol!("unknown authentication plugin: {}", s)),
        }
    }
}

impl AuthPlugin {
    pub(crate) fn name(self) -> &'static str {
        match self {
            AuthPlugin::MySqlNativePassword => "mysql_native_password",
            AuthPlugin::CachingSha2Password => "caching_sha2_password",
            AuthPlugin::Sha256Password => "sha256_password",
        }
    }

    /// The first auth payload for a server challenge: the scrambled
    /// password, or empty for an empty password.
    pub(crate) fn scramble(self, password: &str, nonce: &[u8]) -> Vec<u8> {
        if password.is_empty() {
            return Vec::new();
        }

        match self {
            AuthPlugin::MySqlNativePassword => {
                // The nonce is (optionally) NUL-terminated
                let end = memchr(b'\0', nonce).unwrap_or(nonce.len());

                scramble_sha1(password, &nonce[..end])
            }

            AuthPlugin::CachingSha2Password => scramble_sha256(password, nonce),

            // sha256_password never scrambles: the password goes out in
            // clear over TLS or RSA-encrypted otherwise, both negotiated
            // through the full-auth round-trip
            AuthPlugin::Sha256Password => Vec::new(),
        }
    }

    /// Which byte asks the server for its RSA public key during full
    /// authentication.
    pub(crate) fn public_key_request(self) -> u8 {
        match self {
            AuthPlugin::Sha256Password => 0x01,
            _ => 0x02,
        }
    }
}

// SHA1( password ) ^ SHA1( seed + SHA1( SHA1( password ) ) )
// https://mariadb.com/kb/en/connection/#mysql_native_password-plugin
fn scramble_sha1(password: &str, seed: &[u8]) -> Vec<u8> {
    let mut ctx = Sha1::new();

    ctx.update(password);

    let mut pw_hash = ctx.finalize_reset();

    ctx.update(&pw_hash);

    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(seed);
    ctx.update(pw_hash_hash);

    let pw_seed_hash_hash = ctx.finalize();

    xor_eq(&mut pw_hash, &pw_seed_hash_hash);

    pw_hash.to_vec()
}

// XOR( SHA256( password ), SHA256( seed + SHA256( SHA256( password ) ) ) )
// https://mariadb.com/kb/en/caching_sha2_password-authentication-plugin/
fn scramble_sha256(password: &str, seed: &[u8]) -> Vec<u8> {
    let mut ctx = Sha256::new();

    ctx.update(password);

    let mut pw_hash = ctx.finalize_reset();

    ctx.update(&pw_hash);

    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(seed);
    ctx.update(pw_hash_hash);

    let pw_seed_hash_hash = ctx.finalize();

    xor_eq(&mut pw_hash, &pw_seed_hash_hash);

    pw_hash.to_vec()
}

fn xor_eq(lhs: &mut [u8], rhs: &[u8]) {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        *l ^= r;
    }
}

/// Encrypts `password + NUL`, XOR-ed with the handshake nonce, under
/// the server's RSA public key (PEM); the full-authentication path when
/// the channel is not already encrypted.
pub(crate) fn encrypt_rsa(pem: &[u8], password: &str, nonce: &[u8]) -> Result<Vec<u8>, Error> {
    let pem = std::str::from_utf8(pem)
        .map_err(|_| err_protocol!("server RSA public key is not UTF-8"))?;

    let key = RsaPublicKey::from_public_key_pem(pem)
        .map_err(|err| err_protocol!("malformed server RSA public key: {}", err))?;

    let mut plain = password.as_bytes().to_vec();
    plain.push(0);

    for (i, byte) in plain.iter_mut().enumerate() {
        *byte ^= nonce[i % nonce.len()];
    }

    key.encrypt(&mut OsRng, Oaep::new::<Sha1>(), &plain)
        .map_err(|err| Error::AuthFailed(format!("RSA encryption failed: {}", err).into()))
}

#[cfg(test)]
mod tests {
    use super::AuthPlugin;

    #[test]
    fn it_scrambles_like_mysql_native_password() {
        // SHA1("password") ^ SHA1(seed + SHA1(SHA1("password"))) for the
        // fixed 20-byte seed below
        let seed = b"abcdefgh12345678090*";
        let scrambled = AuthPlugin::MySqlNativePassword.scramble("password", seed);

        assert_eq!(scrambled.len(), 20);
        assert_ne!(scrambled, AuthPlugin::MySqlNativePassword.scramble("passwore", seed));

        // deterministic
        assert_eq!(
            scrambled,
            AuthPlugin::MySqlNativePassword.scramble("password", seed)
        );
    }

    #[test]
    fn it_sends_an_empty_response_for_an_empty_password() {
        assert!(AuthPlugin::CachingSha2Password.scramble("", b"seed").is_empty());
    }

    #[test]
    fn it_parses_plugin_names() {
        assert_eq!(
            "caching_sha2_password".parse::<AuthPlugin>().unwrap(),
            AuthPlugin::CachingSha2Password
        );

        assert!("dialog".parse::<AuthPlugin>().is_err());
    }

    #[test]
    fn it_truncates_the_native_nonce_at_nul() {
        let with_nul = AuthPlugin::MySqlNativePassword.scramble("secret", b"12345678\x00rest");
        let without = AuthPlugin::MySqlNativePassword.scramble("secret", b"12345678");

        assert_eq!(with_nul, without);
    }
}
