//! sr25519 keys for the live chain, bridged onto the core signing handle.

use crate::error::{Result, TangleClientError};
use std::str::FromStr;
use subxt::tx::Signer;
use subxt::utils::{AccountId32, MultiAddress, MultiSignature};
use subxt::PolkadotConfig;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;
use usersim_core::identity::{Identity, SigningHandle, TxSigner};

struct Sr25519Signer(Keypair);

impl TxSigner for Sr25519Signer {
    fn public_key(&self) -> [u8; 32] {
        self.0.public_key().0
    }

    fn sign(&self, payload: &[u8]) -> [u8; 64] {
        self.0.sign(payload).0
    }
}

/// Derive an identity from a secret URI (`//Alice`, `//User/Child/3`) or a
/// mnemonic with optional junctions. The address is SS58 with the generic
/// substrate prefix.
pub fn derive(uri: &str) -> Result<Identity> {
    let invalid = |reason: String| TangleClientError::SecretUri {
        uri: uri.to_string(),
        reason,
    };
    let secret = SecretUri::from_str(uri).map_err(|e| invalid(e.to_string()))?;
    let pair = Keypair::from_uri(&secret).map_err(|e| invalid(e.to_string()))?;
    let address = AccountId32(pair.public_key().0).to_string();
    Ok(Identity::new(
        address,
        uri,
        SigningHandle::new(Sr25519Signer(pair)),
    ))
}

/// Parse an SS58 address, or a `0x`-prefixed 32-byte hex account id.
pub fn parse_account(address: &str) -> Result<AccountId32> {
    if let Some(raw) = address.strip_prefix("0x") {
        let bytes = hex::decode(raw).map_err(|_| TangleClientError::Address(address.to_string()))?;
        let id: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TangleClientError::Address(address.to_string()))?;
        return Ok(AccountId32(id));
    }
    AccountId32::from_str(address).map_err(|_| TangleClientError::Address(address.to_string()))
}

/// Presents a core [`SigningHandle`] to subxt.
pub(crate) struct HandleSigner<'a>(pub &'a SigningHandle);

impl Signer<PolkadotConfig> for HandleSigner<'_> {
    fn account_id(&self) -> AccountId32 {
        AccountId32(self.0.public_key())
    }

    fn address(&self) -> MultiAddress<AccountId32, ()> {
        self.account_id().into()
    }

    fn sign(&self, signer_payload: &[u8]) -> MultiSignature {
        MultiSignature::Sr25519(self.0.sign(signer_payload))
    }
}
