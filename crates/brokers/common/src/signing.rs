//! HMAC-SHA256 request signing.
//!
//! The exchange recomputes the signature from the query string it receives,
//! so the bytes signed here must be exactly the bytes sent. Build the query
//! once with [`query_string`] (or [`signed_query`]) and send that string.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Serialize parameters as `key=value` pairs joined by `&`, keys sorted
/// ascending. Insertion order of `params` does not matter.
pub fn query_string<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(K, V)> = params.into_iter().collect();
    pairs.sort_by(|a, b| {
        a.0.as_ref()
            .cmp(b.0.as_ref())
            .then_with(|| a.1.as_ref().cmp(b.1.as_ref()))
    });

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC-SHA256 of an already-built query string, lowercase hex.
pub fn sign_query(query: &str, secret: &SecretString) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take key of any size");

    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sign a parameter map: sort, serialize, HMAC, hex.
pub fn sign<I, K, V>(params: I, secret: &SecretString) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    sign_query(&query_string(params), secret)
}

/// Sorted query string with `&signature=<hex>` appended, ready to send.
pub fn signed_query<I, K, V>(params: I, secret: &SecretString) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let query = query_string(params);
    let signature = sign_query(&query, secret);
    if query.is_empty() {
        format!("signature={}", signature)
    } else {
        format!("{}&signature={}", query, signature)
    }
}
