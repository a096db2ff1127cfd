//! Wallet address derivation and RSA-PKCS1v15/SHA-256 signing & verification.
//!
//! Grounded on `examples/original_source/package/pocketcoin/pgp/pgp.go`:
//! keys are RSA, signatures are PKCS1v15 over a SHA-256 digest, and a wallet
//! address is a truncated hash of the signer's PEM-encoded public key.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::canonical::sha256_hex;

/// Number of leading bytes of `SHA256(pem)` kept as the wallet address.
const WALLET_ADDRESS_BYTES: usize = 16;

#[derive(Debug)]
pub enum CryptoError {
    /// The PEM blob could not be parsed as an RSA public key.
    InvalidPublicKeyPem(String),
    /// The signature was not valid base64.
    InvalidSignatureEncoding,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidPublicKeyPem(msg) => write!(f, "invalid public key PEM: {msg}"),
            CryptoError::InvalidSignatureEncoding => write!(f, "signature is not valid base64"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Derives a wallet address (32 lowercase hex chars) from a PEM-encoded RSA
/// public key: the first 16 bytes of `SHA256(pem)`, hex-encoded.
pub fn wallet_address_from_pem(public_key_pem: &str) -> String {
    let digest = Sha256::digest(public_key_pem.as_bytes());
    hex::encode(&digest[..WALLET_ADDRESS_BYTES])
}

/// Parses a PEM blob (PKCS1, `"RSA PUBLIC KEY"`) into an [`RsaPublicKey`].
pub fn parse_public_key_pem(public_key_pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_pkcs1_pem(public_key_pem.trim())
        .map_err(|e| CryptoError::InvalidPublicKeyPem(e.to_string()))
}

/// Encodes an [`RsaPublicKey`] back to its PEM form, for tests that need to
/// build signed fixtures from a freshly generated key pair.
pub fn encode_public_key_pem(public_key: &RsaPublicKey) -> String {
    public_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .expect("RsaPublicKey should always re-encode to PEM")
}

/// Verifies a base64-encoded PKCS1v15/SHA-256 signature of `message` under
/// `public_key_pem`.
///
/// Returns `false` (never an error) for any malformed input: a bad PEM, bad
/// base64, or a cryptographically invalid signature are all just "does not
/// verify" from the caller's point of view.
pub fn verify_pkcs1v15_sha256(message: &str, signature_b64: &str, public_key_pem: &str) -> bool {
    let Ok(public_key) = parse_public_key_pem(public_key_pem) else {
        return false;
    };
    let Ok(signature) = BASE64.decode(signature_b64) else {
        return false;
    };
    let hashed = Sha256::digest(message.as_bytes());
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, &signature)
        .is_ok()
}

/// Signs `message` with `private_key` using PKCS1v15/SHA-256 and returns the
/// base64-encoded signature.
///
/// Only used by tests and fixtures in this codebase: the ledger/node/miner
/// never hold a wallet's private key (signing is the wallet's job, out of
/// scope for this core).
#[cfg(any(test, feature = "test-support"))]
pub fn sign_pkcs1v15_sha256(
    message: &str,
    private_key: &rsa::RsaPrivateKey,
) -> Result<String, CryptoError> {
    let hashed = Sha256::digest(message.as_bytes());
    let signature = private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
        .map_err(|_| CryptoError::InvalidSignatureEncoding)?;
    Ok(BASE64.encode(signature))
}

/// Checks that the first 32 hex chars of `SHA256(pem)` equal `address`.
pub fn public_key_matches_address(public_key_pem: &str, address: &str) -> bool {
    wallet_address_from_pem(public_key_pem) == address
}

/// SHA-256 hex digest of a PEM blob, exposed for callers that already have
/// the canonical string form of a message and just want a plain hash (used
/// by block/transaction verification code that hashes non-key material too).
pub fn sha256(data: &str) -> String {
    sha256_hex(data)
}
