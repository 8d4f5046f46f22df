//! CloudXNS request signature
//!
//! `API-HMAC` is the lowercase hex MD5 of
//! `api_key + url + [body] + date + secret_key`, where `url` is the full
//! request URL including the query string and `date` is the exact
//! `API-REQUEST-DATE` header value.

use md5::{Digest, Md5};

pub fn sign(api_key: &str, url: &str, body: Option<&str>, date: &str, secret_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(api_key.as_bytes());
    hasher.update(url.as_bytes());
    if let Some(body) = body {
        hasher.update(body.as_bytes());
    }
    hasher.update(date.as_bytes());
    hasher.update(secret_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Value for the `API-REQUEST-DATE` header
pub fn request_date() -> String {
    chrono::Utc::now().to_rfc2822()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sign("The quick brown ", "fox jumps over ", None, "the lazy", " dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn test_body_sits_between_url_and_date() {
        assert_eq!(
            sign("The quick ", "brown fox ", Some("jumps over "), "the lazy", " dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
        assert_eq!(
            sign("a", "b", Some(""), "c", ""),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_request_date_is_rfc2822() {
        let date = request_date();
        assert!(chrono::DateTime::parse_from_rfc2822(&date).is_ok(), "{}", date);
    }
}
