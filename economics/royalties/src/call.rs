use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use ipr_shares::{Amount, PatentId, Principal, ShareSet, TokenType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::host::HostError;

/// Identity and logical time of the call being executed.
///
/// The host builds this from an authenticated [`SignedCall`]; code that
/// drives a [`crate::RoyaltyContract`] directly is trusted to supply the
/// real caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    caller: Principal,
    height: u64,
}

impl CallContext {
    pub fn new(caller: Principal, height: u64) -> Self {
        Self { caller, height }
    }

    pub fn caller(&self) -> &Principal {
        &self.caller
    }

    pub fn height(&self) -> u64 {
        self.height
    }
}

/// A mutating contract operation as submitted to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoyaltyCall {
    SetPatentShares {
        patent_id: PatentId,
        shares: ShareSet,
    },
    DistributeRoyalties {
        patent_id: PatentId,
        amount: Amount,
        token: TokenType,
    },
    PauseContract,
    UnpauseContract,
    TransferOwnership {
        new_owner: Principal,
    },
}

/// A [`RoyaltyCall`] signed by the caller's Ed25519 key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedCall {
    /// Public key of the caller; becomes the call's identity once verified.
    pub signer: Principal,
    /// Per-signer sequence number, starting at 0.
    pub nonce: u64,
    pub call: RoyaltyCall,
    pub signature: Vec<u8>,
}

impl SignedCall {
    /// Sign `call` with `signing_key` at the given nonce.
    pub fn new(signing_key: &SigningKey, nonce: u64, call: RoyaltyCall) -> Result<Self, HostError> {
        let mut signed = Self {
            signer: signing_key.verifying_key().to_bytes(),
            nonce,
            call,
            signature: Vec::new(),
        };
        let msg = signed.signing_message()?;
        signed.signature = signing_key.sign(&msg).to_bytes().to_vec();
        Ok(signed)
    }

    /// SHA256(signer ++ nonce.to_le_bytes() ++ bincode(call))
    pub fn signing_message(&self) -> Result<[u8; 32], HostError> {
        let encoded =
            bincode::serialize(&self.call).map_err(|e| HostError::Encoding(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(self.signer);
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(&encoded);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Ok(out)
    }

    /// Check the signature against `signer`.
    pub fn verify(&self) -> Result<(), HostError> {
        let sig_bytes: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| HostError::InvalidSignature)?;
        let sig = Signature::from_bytes(&sig_bytes);
        let vk = VerifyingKey::from_bytes(&self.signer).map_err(|_| HostError::InvalidSignature)?;
        let msg = self.signing_message()?;
        vk.verify(&msg, &sig).map_err(|_| HostError::InvalidSignature)
    }
}
