//! Signed verification file
//!
//! ```text
//! <hex ed25519 signature over PAYLOAD>\n
//! PAYLOAD (manifest JSON bytes)
//! ```

use super::Signer;
use crate::error::SignatureError;
use ed25519_dalek::{Signature, SIGNATURE_LENGTH};

/// Prefix `payload` with a hex signature line
pub fn seal<S: Signer + ?Sized>(signer: &S, payload: &[u8]) -> Vec<u8> {
    let signature = hex::encode(signer.sign(payload).to_bytes());

    let mut container = Vec::with_capacity(signature.len() + 1 + payload.len());
    container.extend_from_slice(signature.as_bytes());
    container.push(b'\n');
    container.extend_from_slice(payload);
    container
}

/// Check the signature line and return the payload it covers
pub fn open<'a, S: Signer + ?Sized>(signer: &S, container: &'a [u8]) -> Result<&'a [u8], SignatureError> {
    let split = container
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(SignatureError::MissingSeparator)?;
    let (line, payload) = (&container[..split], &container[split + 1..]);

    let bytes = hex::decode(line.trim_ascii())?;
    let bytes: [u8; SIGNATURE_LENGTH] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::InvalidLength { len: bytes.len() })?;
    let signature = Signature::from_bytes(&bytes);

    if !signer.verify(payload, &signature) {
        return Err(SignatureError::Mismatch);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::Ed25519KeyStore;

    const PAYLOAD: &[u8] = br#"{"a.txt":"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"}"#;

    #[test]
    fn test_layout() {
        let key = Ed25519KeyStore::generate();
        let container = seal(&key, PAYLOAD);

        let newline = container.iter().position(|&b| b == b'\n').unwrap();
        assert_eq!(newline, SIGNATURE_LENGTH * 2);
        assert!(container[..newline]
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b)));
        assert_eq!(&container[newline + 1..], PAYLOAD);
    }

    #[test]
    fn test_round_trip() {
        let key = Ed25519KeyStore::generate();
        let container = seal(&key, PAYLOAD);
        assert_eq!(open(&key, &container).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_crlf_signature_line_accepted() {
        let key = Ed25519KeyStore::generate();
        let sig = hex::encode(key.sign(PAYLOAD).to_bytes());
        let container = [sig.as_bytes(), b"\r\n", PAYLOAD].concat();

        // The payload starts after the first '\n'
        assert_eq!(open(&key, &container).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_every_payload_bit_flip_detected() {
        let key = Ed25519KeyStore::generate();
        let container = seal(&key, PAYLOAD);
        let start = SIGNATURE_LENGTH * 2 + 1;

        for byte in start..container.len() {
            for bit in 0..8 {
                let mut tampered = container.clone();
                tampered[byte] ^= 1 << bit;
                assert!(
                    matches!(open(&key, &tampered), Err(SignatureError::Mismatch)),
                    "flip of bit {bit} in byte {byte} went undetected"
                );
            }
        }
    }

    #[test]
    fn test_other_key_rejected() {
        let container = seal(&Ed25519KeyStore::generate(), PAYLOAD);
        assert!(matches!(
            open(&Ed25519KeyStore::generate(), &container),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_malformed_containers() {
        let key = Ed25519KeyStore::generate();
        assert!(matches!(
            open(&key, b"no newline at all"),
            Err(SignatureError::MissingSeparator)
        ));
        assert!(matches!(
            open(&key, b"zz\n{}"),
            Err(SignatureError::InvalidHex(_))
        ));
        assert!(matches!(
            open(&key, b"abcd\n{}"),
            Err(SignatureError::InvalidLength { len: 2 })
        ));
    }
}
