// signature.rs
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::{fmt, sync::Arc};
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// The signed message: event name and timestamp joined by a single newline.
fn canonical_message(event: &str, timestamp: &str) -> String {
    format!("{}\n{}", event, timestamp)
}

/// Lowercase hex HMAC-SHA256 of the canonical message.
pub fn sign(secret: &[u8], event: &str, timestamp: &str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(canonical_message(event, timestamp).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `claimed` against the expected signature. Any missing input yields `false`.
pub fn verify(
    event: Option<&str>,
    timestamp: Option<&str>,
    secret: Option<&[u8]>,
    claimed: Option<&str>,
) -> bool {
    let (Some(event), Some(timestamp), Some(secret), Some(claimed)) =
        (event, timestamp, secret, claimed)
    else {
        return false;
    };

    match sign(secret, event, timestamp) {
        Some(expected) => constant_time_eq(&expected, claimed),
        None => false,
    }
}

fn constant_time_eq(expected: &str, claimed: &str) -> bool {
    // Length is not secret: every valid signature is 64 hex characters.
    if expected.len() != claimed.len() {
        return false;
    }
    expected.as_bytes().ct_eq(claimed.as_bytes()).into()
}

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Arc<[u8]>,
    log_inputs: bool,
}

impl SignatureVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: Arc::from(secret),
            log_inputs: false,
        }
    }

    /// Logs signature inputs and digests at debug level. Leaks material used in
    /// the signature computation, so keep it off in production.
    pub fn with_input_logging(mut self, enabled: bool) -> Self {
        self.log_inputs = enabled;
        self
    }

    pub fn verify(&self, event: Option<&str>, timestamp: Option<&str>, claimed: Option<&str>) -> bool {
        if self.log_inputs {
            debug!(
                event = ?event,
                timestamp = ?timestamp,
                received = ?claimed,
                computed = ?event.zip(timestamp).and_then(|(e, t)| sign(&self.secret, e, t)),
                "Verifying webhook signature"
            );
        }
        verify(event, timestamp, Some(&*self.secret), claimed)
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("log_inputs", &self.log_inputs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn flip(s: &str, index: usize) -> String {
        s.char_indices()
            .map(|(i, c)| {
                if i != index {
                    c
                } else if c == 'a' {
                    'b'
                } else {
                    'a'
                }
            })
            .collect()
    }

    #[test]
    fn sign_joins_event_and_timestamp_with_newline() {
        let sig = sign(b"Jefe", "what do ya want", "for nothing?").unwrap();
        assert_eq!(sig.len(), 64);

        let mut mac = HmacSha256::new_from_slice(b"Jefe").unwrap();
        mac.update(b"what do ya want\nfor nothing?");
        assert_eq!(sig, hex::encode(mac.finalize().into_bytes()));
    }

    #[test]
    fn signature_is_lowercase_hex() {
        let sig = sign(SECRET, "raffle:created", "1700000000").unwrap();
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn valid_signature_verifies() {
        let sig = sign(SECRET, "raffle:created", "1700000000").unwrap();
        assert!(verify(Some("raffle:created"), Some("1700000000"), Some(SECRET), Some(&sig)));
    }

    #[test]
    fn any_single_character_change_fails() {
        let event = "raffle:created";
        let ts = "1700000000";
        let sig = sign(SECRET, event, ts).unwrap();

        for i in 0..event.len() {
            assert!(!verify(Some(&flip(event, i)), Some(ts), Some(SECRET), Some(&sig)));
        }
        for i in 0..ts.len() {
            assert!(!verify(Some(event), Some(&flip(ts, i)), Some(SECRET), Some(&sig)));
        }
        for i in 0..sig.len() {
            assert!(!verify(Some(event), Some(ts), Some(SECRET), Some(&flip(&sig, i))));
        }
    }

    #[test]
    fn uppercase_signature_is_rejected() {
        let sig = sign(SECRET, "raffle:created", "1").unwrap().to_uppercase();
        assert!(!verify(Some("raffle:created"), Some("1"), Some(SECRET), Some(&sig)));
    }

    #[test]
    fn missing_inputs_fail_closed() {
        let sig = sign(SECRET, "e", "1").unwrap();
        assert!(!verify(None, Some("1"), Some(SECRET), Some(&sig)));
        assert!(!verify(Some("e"), None, Some(SECRET), Some(&sig)));
        assert!(!verify(Some("e"), Some("1"), None, Some(&sig)));
        assert!(!verify(Some("e"), Some("1"), Some(SECRET), None));
        assert!(!verify(Some("e"), Some("1"), Some(b""), Some(&sig)));
        assert!(!verify(Some("e"), Some("1"), Some(SECRET), Some("")));
    }

    #[test]
    fn truncated_signature_fails() {
        let sig = sign(SECRET, "e", "1").unwrap();
        assert!(!verify(Some("e"), Some("1"), Some(SECRET), Some(&sig[..63])));
    }

    #[test]
    fn verifier_uses_configured_secret() {
        let verifier = SignatureVerifier::new(SECRET).with_input_logging(true);
        let sig = sign(SECRET, "raffle:active", "42").unwrap();
        assert!(verifier.verify(Some("raffle:active"), Some("42"), Some(&sig)));

        let other = SignatureVerifier::new(b"another-secret");
        assert!(!other.verify(Some("raffle:active"), Some("42"), Some(&sig)));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let verifier = SignatureVerifier::new(SECRET);
        assert!(!format!("{:?}", verifier).contains("test-secret"));
    }
}
