use sha1::{Digest, Sha1};
use url::Url;

/// Alphabet of the link shortcodes; the index of a character is its digit value.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const SHORTCODE_LEN: usize = 3;

/// First three base62 characters of the SHA-1 digest of `url`.
///
/// Stable across runs; distinct URLs may share a code.
pub fn shortcode(url: &str) -> String {
    let digest = Sha1::digest(url.as_bytes());
    let mut encoded = base62_encode(&digest);
    encoded.truncate(SHORTCODE_LEN);
    encoded
}

/// Big-endian base-x encoding: every leading zero byte becomes the first
/// alphabet character, the remainder is converted as one big number.
pub fn base62_encode(input: &[u8]) -> String {
    let zeroes = input.iter().take_while(|b| **b == 0).count();

    // Little-endian base62 digits.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 2);
    for &byte in &input[zeroes..] {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 62) as u8;
            carry /= 62;
        }
        while carry > 0 {
            digits.push((carry % 62) as u8);
            carry /= 62;
        }
    }

    let mut out = String::with_capacity(zeroes + digits.len());
    out.extend(std::iter::repeat(BASE62_ALPHABET[0] as char).take(zeroes));
    out.extend(digits.iter().rev().map(|d| BASE62_ALPHABET[*d as usize] as char));
    out
}

/// Resolve an attribute value from the document into an absolute http(s) URL.
///
/// Fragments are dropped. Protocol-relative references without a base get
/// `https:`. Anything that is not fetchable over http(s) yields `None`.
pub fn resolve_reference(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("data:") {
        return None;
    }

    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => match base {
            Some(base) => base.join(trimmed).ok()?,
            None if trimmed.starts_with("//") => Url::parse(&format!("https:{trimmed}")).ok()?,
            None => return None,
        },
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
