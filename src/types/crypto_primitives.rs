/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The definitions and re-exports in this module provide two categories of cryptographic primitives:
//! 1. **Cryptographic Hashes**: provided by the [`sha2`] crate.
//! 2. **Digital Signatures**: the [`Signer`] trait, and its default implementation over the
//!    [`ed25519_dalek`] crate, [`Ed25519Signer`].

use std::fmt::{self, Display, Formatter};

use ed25519_dalek::{Signer as DalekSigner, Verifier, SIGNATURE_LENGTH};
use rand_core::CryptoRngCore;

use super::{
    data_types::{Address, CryptoHash, SignatureBytes},
    validator_set::ValidatorSet,
};

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

pub use ed25519_dalek::{Signature, SignatureError, SigningKey, VerifyingKey};

/// Length in bytes of a signature produced by [`Ed25519Signer`]: the verifying key followed by the
/// Ed25519 signature proper.
pub const ED25519_SIGNATURE_BYTES_LENGTH: usize = 32 + SIGNATURE_LENGTH;

/// Hash `data` with SHA256.
pub fn hash(data: &[u8]) -> CryptoHash {
    CryptoHash::new(CryptoHasher::digest(data).into())
}

/// Hashes, signs, and recovers the signers of byte strings on behalf of one validator.
///
/// Recovery must be deterministic: every validator must recover the same [`Address`] from the same
/// `(data, signature)` pair.
pub trait Signer: Send {
    /// The address of the validator this `Signer` signs for.
    fn address(&self) -> Address;

    /// Sign arbitrary `data`.
    fn sign(&self, data: &[u8]) -> SignatureBytes;

    /// Recover the address that produced `signature` over `data`.
    fn recover(&self, data: &[u8], signature: &SignatureBytes) -> Result<Address, CryptoError>;

    /// Recover the signer of `data` and check that it is a member of `validator_set`.
    fn check_signature(
        &self,
        validator_set: &ValidatorSet,
        data: &[u8],
        signature: &SignatureBytes,
    ) -> Result<Address, CryptoError> {
        let signer = self.recover(data, signature)?;
        if validator_set.contains(&signer) {
            Ok(signer)
        } else {
            Err(CryptoError::UnauthorizedAddress)
        }
    }
}

/// A facade around [`SigningKey`] that implements [`Signer`].
///
/// Ed25519 does not support public key recovery, so the signatures this type produces carry the
/// verifying key in their first 32 bytes.
#[derive(Clone)]
pub struct Ed25519Signer(SigningKey);

impl Ed25519Signer {
    /// Create an `Ed25519Signer` that wraps over `signing_key`.
    pub fn new(signing_key: SigningKey) -> Self {
        Self(signing_key)
    }

    /// Create an `Ed25519Signer` with a freshly generated signing key.
    pub fn generate<R: CryptoRngCore + ?Sized>(csprng: &mut R) -> Self {
        Self(SigningKey::generate(csprng))
    }

    /// Get the `VerifyingKey` of this `Ed25519Signer`.
    pub fn public(&self) -> VerifyingKey {
        self.0.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn address(&self) -> Address {
        address_of(&self.public())
    }

    fn sign(&self, data: &[u8]) -> SignatureBytes {
        let signature = self.0.sign(data);
        let mut bytes = Vec::with_capacity(ED25519_SIGNATURE_BYTES_LENGTH);
        bytes.extend_from_slice(self.public().as_bytes());
        bytes.extend_from_slice(&signature.to_bytes());
        SignatureBytes::new(bytes)
    }

    fn recover(&self, data: &[u8], signature: &SignatureBytes) -> Result<Address, CryptoError> {
        ed25519_recover(data, signature)
    }
}

/// Derive the [`Address`] of `verifying_key`: the last 20 bytes of its SHA256 hash.
pub fn address_of(verifying_key: &VerifyingKey) -> Address {
    let digest = hash(verifying_key.as_bytes()).bytes();
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::new(bytes)
}

/// Verify a signature produced by [`Ed25519Signer::sign`] and return the address of its signer.
pub fn ed25519_recover(data: &[u8], signature: &SignatureBytes) -> Result<Address, CryptoError> {
    let bytes = signature.bytes();
    if bytes.len() != ED25519_SIGNATURE_BYTES_LENGTH {
        return Err(CryptoError::MalformedSignature);
    }

    let key_bytes: [u8; 32] = bytes[..32]
        .try_into()
        .map_err(|_| CryptoError::MalformedSignature)?;
    let signature_bytes: [u8; SIGNATURE_LENGTH] = bytes[32..]
        .try_into()
        .map_err(|_| CryptoError::MalformedSignature)?;

    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| CryptoError::MalformedSignature)?;
    let signature = Signature::from_bytes(&signature_bytes);
    verifying_key
        .verify(data, &signature)
        .map_err(|_| CryptoError::InvalidSignature)?;

    Ok(address_of(&verifying_key))
}

/// Failures of signature recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// The signature bytes do not have the shape the signature scheme expects.
    MalformedSignature,
    /// The signature does not verify against the data it came with.
    InvalidSignature,
    /// The signature verifies, but its signer is not a member of the validator set.
    UnauthorizedAddress,
}

impl Display for CryptoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::MalformedSignature => write!(f, "malformed signature"),
            CryptoError::InvalidSignature => write!(f, "invalid signature"),
            CryptoError::UnauthorizedAddress => write!(f, "signer is not a validator"),
        }
    }
}

impl std::error::Error for CryptoError {}
