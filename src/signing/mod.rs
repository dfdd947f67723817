//! Manifest signing
//!
//! The verification file written by a build is the manifest JSON prefixed by
//! a detachable Ed25519 signature line (see [`container`]). Keys live in a
//! PEM file managed by [`keystore`].

pub mod container;
pub mod keystore;

pub use container::{open, seal};
pub use ed25519_dalek::Signature;
pub use keystore::{default_key_path, Ed25519KeyStore};

/// Something that can produce and check detached signatures
pub trait Signer {
    fn sign(&self, message: &[u8]) -> Signature;

    fn verify(&self, message: &[u8], signature: &Signature) -> bool;
}
