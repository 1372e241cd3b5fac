//! HMAC-SHA256 query signing.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::error::BinanceError;

type HmacSha256 = Hmac<Sha256>;

/// Build the query string for `params` and append `timestamp` and
/// `signature`. Parameter order is kept as given.
pub fn signed_query(
    secret: &SecretString,
    params: &[(&str, String)],
    timestamp_ms: i64,
) -> Result<String, BinanceError> {
    let mut query = encode_query(params);
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str(&format!("timestamp={timestamp_ms}"));

    let signature = sign(secret, &query)?;
    query.push_str("&signature=");
    query.push_str(&signature);
    Ok(query)
}

/// Plain `key=value&...` query string.
pub fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex-encoded HMAC-SHA256 of `message`.
pub fn sign(secret: &SecretString, message: &str) -> Result<String, BinanceError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| BinanceError::Signing(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Query string with the signature removed, for logging.
pub fn redact(query: &str) -> &str {
    query
        .find("&signature=")
        .map_or(query, |idx| &query[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    #[test]
    fn matches_published_example() {
        let secret = SecretString::from(SECRET.to_string());
        let message = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign(&secret, message).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn signed_query_keeps_order_and_appends_signature() {
        let secret = SecretString::from(SECRET.to_string());
        let params = [
            ("symbol", "LTCBTC".to_string()),
            ("side", "BUY".to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", "1".to_string()),
            ("price", "0.1".to_string()),
            ("recvWindow", "5000".to_string()),
        ];
        let query = signed_query(&secret, &params, 1_499_827_319_559).unwrap();
        assert!(query.starts_with("symbol=LTCBTC&side=BUY"));
        assert!(query.ends_with(
            "timestamp=1499827319559&signature=c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        ));
        assert_eq!(
            redact(&query),
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559"
        );
    }
}
