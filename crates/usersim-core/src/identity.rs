//! Keyed identities and the account deriver.
//!
//! An [`Identity`] is produced by the chain client's key-derivation primitive
//! from a secret URI such as `//User3` or `//Base/Child/7`. Derivation is a
//! pure function of the URI: the same URI always yields the same address.

use crate::chain::ChainClient;
use crate::error::Result;
use crate::paths;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Signing capability
// ---------------------------------------------------------------------------

/// Signing capability supplied by a chain client's keyring.
///
/// Implementations hold the secret key; callers only ever see the public
/// key and signatures.
pub trait TxSigner: Send + Sync {
    /// 32-byte public key, which doubles as the on-chain account id.
    fn public_key(&self) -> [u8; 32];

    /// Sign an extrinsic signer payload.
    fn sign(&self, payload: &[u8]) -> [u8; 64];
}

/// Opaque, cheaply clonable handle to a [`TxSigner`].
#[derive(Clone)]
pub struct SigningHandle(Arc<dyn TxSigner>);

impl SigningHandle {
    pub fn new(signer: impl TxSigner + 'static) -> Self {
        Self(Arc::new(signer))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.0.public_key()
    }

    pub fn sign(&self, payload: &[u8]) -> [u8; 64] {
        self.0.sign(payload)
    }
}

impl fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningHandle(0x{})", hex::encode(self.public_key()))
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A derived, immutable keyed identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub address: String,
    pub derivation_path: String,
    signer: SigningHandle,
}

impl Identity {
    pub fn new(
        address: impl Into<String>,
        derivation_path: impl Into<String>,
        signer: SigningHandle,
    ) -> Self {
        Self {
            address: address.into(),
            derivation_path: derivation_path.into(),
            signer,
        }
    }

    pub fn signer(&self) -> &SigningHandle {
        &self.signer
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.derivation_path == other.derivation_path
    }
}

impl Eq for Identity {}

// ---------------------------------------------------------------------------
// AccountDeriver
// ---------------------------------------------------------------------------

/// Maps the harness's two account families onto derivation URIs and
/// delegates the key work to the chain client.
#[derive(Debug, Clone)]
pub struct AccountDeriver {
    base_seed: String,
}

impl AccountDeriver {
    pub fn new(base_seed: impl Into<String>) -> Self {
        Self {
            base_seed: base_seed.into(),
        }
    }

    pub fn base_seed(&self) -> &str {
        &self.base_seed
    }

    /// Derive from an arbitrary secret URI or seed phrase.
    pub fn derive(&self, client: &dyn ChainClient, uri: &str) -> Result<Identity> {
        client.derive_identity(uri)
    }

    /// Top-level simulation actor `//User{index}`.
    pub fn user(&self, client: &dyn ChainClient, index: usize) -> Result<Identity> {
        self.derive(client, &paths::user_uri(index))
    }

    /// Child account `{base_seed}/Child/{index}`.
    pub fn child(&self, client: &dyn ChainClient, index: usize) -> Result<Identity> {
        self.derive(client, &paths::child_uri(&self.base_seed, index))
    }
}
