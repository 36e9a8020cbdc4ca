//! GitHub webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs every delivery with the hook's shared secret and sends the
//! result in the `X-Hub-Signature-256` header as `sha256=<hex>`. Deliveries
//! are verified against the raw body bytes before anything is parsed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a signature was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The header is not of the form `sha256=<hex>`.
    #[error("malformed signature header")]
    Malformed,

    /// The header is well-formed but does not match the payload.
    #[error("signature mismatch")]
    Mismatch,
}

/// Parses a GitHub signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
/// Never panics.
///
/// # Examples
///
/// ```
/// use github_stars::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha256=abcd1234").is_some());
/// assert!(parse_signature_header("abcd1234").is_none());
/// assert!(parse_signature_header("sha1=abcd1234").is_none());
/// assert!(parse_signature_header("sha256=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload using the given secret.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a GitHub-style header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a GitHub webhook signature against the payload and secret.
///
/// The comparison is constant-time.
///
/// # Examples
///
/// ```
/// use github_stars::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let payload = b"Hello, World!";
/// let header = format_signature_header(&compute_signature(payload, b"my-secret-key"));
///
/// assert!(verify_signature(payload, &header, b"my-secret-key").is_ok());
/// assert!(verify_signature(payload, &header, b"wrong-secret").is_err());
/// ```
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &[u8],
) -> Result<(), SignatureError> {
    let expected = parse_signature_header(signature_header).ok_or(SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::Mismatch)?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header_for(payload: &[u8], secret: &[u8]) -> String {
        format_signature_header(&compute_signature(payload, secret))
    }

    // ─── Unit Tests ───

    #[test]
    fn parse_signature_header_valid() {
        assert_eq!(
            parse_signature_header("sha256=1234abcd"),
            Some(vec![0x12, 0x34, 0xab, 0xcd])
        );
        assert_eq!(
            parse_signature_header("sha256=ABCD1234"),
            Some(vec![0xab, 0xcd, 0x12, 0x34])
        );
    }

    #[test]
    fn parse_signature_header_rejects_malformed() {
        assert_eq!(parse_signature_header(""), None);
        assert_eq!(parse_signature_header("1234abcd"), None);
        assert_eq!(parse_signature_header("sha1=1234abcd"), None);
        assert_eq!(parse_signature_header("sha256=xyz"), None);
        assert_eq!(parse_signature_header("sha256=abc"), None);
    }

    /// Test vector from GitHub's "Validating webhook deliveries" guide.
    #[test]
    fn github_documentation_example() {
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert_eq!(
            verify_signature(b"Hello, World!", header, b"It's a Secret to Everybody"),
            Ok(())
        );
    }

    #[test]
    fn wrong_secret_is_a_mismatch() {
        let header = header_for(b"test payload", b"correct-secret");

        assert_eq!(
            verify_signature(b"test payload", &header, b"wrong-secret"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn modified_payload_is_a_mismatch() {
        let header = header_for(b"original payload", b"secret");

        assert_eq!(
            verify_signature(b"modified payload", &header, b"secret"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn malformed_headers_are_rejected_without_panicking() {
        for header in ["", "sha256=invalid", "sha1=abc123", "not-a-header", "sha256=zzzz"] {
            assert_eq!(
                verify_signature(b"test", header, b"secret"),
                Err(SignatureError::Malformed),
                "{header}"
            );
        }
        // Well-formed but empty: decodes, then fails the comparison.
        assert_eq!(
            verify_signature(b"test", "sha256=", b"secret"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn empty_payload_and_secret_are_valid_inputs() {
        assert!(verify_signature(b"", &header_for(b"", b"secret"), b"secret").is_ok());
        assert!(verify_signature(b"payload", &header_for(b"payload", b""), b"").is_ok());
    }

    #[test]
    fn format_signature_header_is_lowercase_hex() {
        assert_eq!(
            format_signature_header(&[0x12, 0x34, 0xab, 0xcd]),
            "sha256=1234abcd"
        );
    }

    // ─── Property Tests ───

    proptest! {
        #[test]
        fn sign_then_verify_succeeds(payload: Vec<u8>, secret: Vec<u8>) {
            let header = header_for(&payload, &secret);
            prop_assert!(verify_signature(&payload, &header, &secret).is_ok());
        }

        #[test]
        fn wrong_secret_fails(payload: Vec<u8>, secret1: Vec<u8>, secret2: Vec<u8>) {
            prop_assume!(secret1 != secret2);

            let header = header_for(&payload, &secret1);
            prop_assert!(verify_signature(&payload, &header, &secret2).is_err());
        }

        #[test]
        fn modified_payload_fails(original: Vec<u8>, modified: Vec<u8>, secret: Vec<u8>) {
            prop_assume!(original != modified);

            let header = header_for(&original, &secret);
            prop_assert!(verify_signature(&modified, &header, &secret).is_err());
        }

        #[test]
        fn arbitrary_headers_never_panic(header: String, payload: Vec<u8>, secret: Vec<u8>) {
            let _ = verify_signature(&payload, &header, &secret);
        }
    }
}
