//! Shared Key authorization for Blob service requests

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use url::Url;

use crate::StorageCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Standard headers in the order they appear in the string to sign
const STANDARD_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Sign a string using HMAC-SHA256
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Base64 HMAC-SHA256 signature of `string_to_sign` under the decoded account key
pub fn sign(account_key: &[u8], string_to_sign: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(hmac_sha256(account_key, string_to_sign.as_bytes()))
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> &'a str {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map_or("", |(_, v)| v.as_str())
}

/// Collapse runs of whitespace into a single space
fn unfold(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `x-ms-*` headers, lowercased, sorted, one `name:value\n` line each
fn canonicalized_headers(headers: &[(String, String)]) -> String {
    let mut ms_headers: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), unfold(v)))
        .filter(|(k, _)| k.starts_with("x-ms-"))
        .collect();
    ms_headers.sort();

    ms_headers
        .into_iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect()
}

/// `/<account><path>` followed by one `\nname:v1,v2` line per query parameter
fn canonicalized_resource(account_name: &str, url: &Url) -> String {
    let mut resource = format!("/{}{}", account_name, url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }

    for (name, mut values) in params {
        values.sort();
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(&values.join(","));
    }

    resource
}

/// Create the Shared Key string to sign
pub fn create_string_to_sign(
    method: &str,
    account_name: &str,
    url: &Url,
    headers: &[(String, String)],
) -> String {
    let mut string_to_sign = String::new();
    string_to_sign.push_str(&method.to_uppercase());
    string_to_sign.push('\n');

    for name in STANDARD_HEADERS {
        let value = header_value(headers, name);
        // Since 2015-02-21 a zero length is signed as an empty string
        if name == "content-length" && value == "0" {
            string_to_sign.push('\n');
            continue;
        }
        string_to_sign.push_str(value);
        string_to_sign.push('\n');
    }

    string_to_sign.push_str(&canonicalized_headers(headers));
    string_to_sign.push_str(&canonicalized_resource(account_name, url));
    string_to_sign
}

/// Value of the `Authorization` header for a request
pub fn authorization_header(
    credentials: &StorageCredentials,
    method: &str,
    url: &Url,
    headers: &[(String, String)],
) -> String {
    let string_to_sign = create_string_to_sign(method, credentials.account_name(), url, headers);
    format!(
        "SharedKey {}:{}",
        credentials.account_name(),
        sign(credentials.account_key(), &string_to_sign)
    )
}
