use std::collections::{BTreeMap, HashMap};

use ipr_registry::PatentDirectory;
use ipr_shares::{Principal, TokenId, TokenType};
use ipr_state::{FungibleToken, TokenLedger, ValueTransfer};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use crate::call::{CallContext, RoyaltyCall, SignedCall};
use crate::engine::RoyaltyContract;
use crate::types::{DistributionOutcome, RoyaltyError};

/// Errors surfaced by the host before or while executing a call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("invalid call signature")]
    InvalidSignature,

    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    #[error("call encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Call(#[from] RoyaltyError),
}

/// Successful result of a committed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    Applied,
    Distribution(DistributionOutcome),
}

/// Everything a call may touch. Cloned per call so a failure discards it.
#[derive(Debug, Clone)]
struct HostState<D, V> {
    contract: RoyaltyContract<D, V>,
    tokens: BTreeMap<TokenId, TokenLedger>,
    nonces: HashMap<Principal, u64>,
    height: u64,
}

/// Execution host for a royalty contract.
///
/// Calls run one at a time. Each runs against a staged copy of the contract,
/// its capabilities and the token ledgers, and the copy replaces the live
/// state only if the call succeeds. Every committed call advances the block
/// height by one.
pub struct RoyaltyHost<D, V> {
    inner: Mutex<HostState<D, V>>,
}

impl<D, V> RoyaltyHost<D, V>
where
    D: PatentDirectory + Clone,
    V: ValueTransfer + Clone,
{
    /// Wrap a deployed contract, registering the token ledgers it may pay in.
    pub fn new(contract: RoyaltyContract<D, V>, tokens: Vec<TokenLedger>, height: u64) -> Self {
        let tokens = tokens.into_iter().map(|t| (t.token_id(), t)).collect();
        Self {
            inner: Mutex::new(HostState {
                contract,
                tokens,
                nonces: HashMap::new(),
                height,
            }),
        }
    }

    /// Verify and execute a signed call.
    ///
    /// The caller identity is the verified signer. The nonce must equal the
    /// signer's next nonce and is consumed only when the call commits, so a
    /// failed call can be resubmitted unchanged.
    pub fn submit(&self, signed: &SignedCall) -> Result<CallOutput, HostError> {
        signed.verify()?;

        let mut live = self.inner.lock();
        let expected = live.nonces.get(&signed.signer).copied().unwrap_or(0);
        if signed.nonce != expected {
            return Err(HostError::InvalidNonce {
                expected,
                got: signed.nonce,
            });
        }

        let mut staged = live.clone();
        let output = staged.execute(signed.signer, signed.call.clone())?;
        staged.nonces.insert(signed.signer, expected + 1);
        *live = staged;
        Ok(output)
    }

    #[cfg(test)]
    pub(crate) fn execute_as(&self, caller: Principal, call: RoyaltyCall) -> Result<CallOutput, HostError> {
        let mut live = self.inner.lock();
        let mut staged = live.clone();
        let output = staged.execute(caller, call)?;
        *live = staged;
        Ok(output)
    }

    /// Read committed state.
    pub fn view<R>(&self, f: impl FnOnce(&RoyaltyContract<D, V>) -> R) -> R {
        f(&self.inner.lock().contract)
    }

    /// Read a registered token ledger.
    pub fn view_token<R>(&self, token_id: &TokenId, f: impl FnOnce(&TokenLedger) -> R) -> Option<R> {
        self.inner.lock().tokens.get(token_id).map(f)
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        self.inner.lock().height
    }

    /// The nonce `signer` must use for its next call.
    pub fn next_nonce(&self, signer: &Principal) -> u64 {
        self.inner.lock().nonces.get(signer).copied().unwrap_or(0)
    }

    /// Commitment over the royalty ledger, native and token balances,
    /// signer nonces and the block height.
    pub fn state_root(&self) -> [u8; 32] {
        let live = self.inner.lock();
        let mut hasher = Sha256::new();
        hasher.update(live.contract.ledger().state_root());
        hasher.update(live.contract.native().state_root());
        for token in live.tokens.values() {
            hasher.update(token.state_root());
        }
        let mut nonces: Vec<_> = live.nonces.iter().collect();
        nonces.sort_by_key(|(signer, _)| *signer);
        for (signer, nonce) in nonces {
            hasher.update(signer);
            hasher.update(nonce.to_le_bytes());
        }
        hasher.update(live.height.to_le_bytes());
        let digest = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&digest);
        root
    }
}

impl<D, V> HostState<D, V>
where
    D: PatentDirectory + Clone,
    V: ValueTransfer + Clone,
{
    fn execute(&mut self, caller: Principal, call: RoyaltyCall) -> Result<CallOutput, HostError> {
        let ctx = CallContext::new(caller, self.height + 1);
        let result = self.dispatch(&ctx, call);
        match result {
            Ok(output) => {
                self.height = ctx.height();
                Ok(output)
            }
            Err(e) => {
                warn!(
                    caller = %hex::encode(caller),
                    code = e.code(),
                    error = %e,
                    "call rejected"
                );
                Err(HostError::Call(e))
            }
        }
    }

    fn dispatch(&mut self, ctx: &CallContext, call: RoyaltyCall) -> Result<CallOutput, RoyaltyError> {
        match call {
            RoyaltyCall::SetPatentShares { patent_id, shares } => {
                self.contract.set_patent_shares(ctx, patent_id, shares)?;
                Ok(CallOutput::Applied)
            }
            RoyaltyCall::DistributeRoyalties {
                patent_id,
                amount,
                token,
            } => {
                self.contract.check_distribution(&patent_id, amount)?;
                let outcome = match token {
                    TokenType::Native => {
                        self.contract
                            .distribute_royalties(ctx, patent_id, amount, None)?
                    }
                    TokenType::Token(id) => {
                        let ledger = self
                            .tokens
                            .get_mut(&id)
                            .ok_or(RoyaltyError::InvalidToken)?;
                        let ledger: &mut dyn FungibleToken = ledger;
                        self.contract
                            .distribute_royalties(ctx, patent_id, amount, Some(ledger))?
                    }
                };
                Ok(CallOutput::Distribution(outcome))
            }
            RoyaltyCall::PauseContract => {
                self.contract.pause_contract(ctx)?;
                Ok(CallOutput::Applied)
            }
            RoyaltyCall::UnpauseContract => {
                self.contract.unpause_contract(ctx)?;
                Ok(CallOutput::Applied)
            }
            RoyaltyCall::TransferOwnership { new_owner } => {
                self.contract.transfer_ownership(ctx, new_owner)?;
                Ok(CallOutput::Applied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use ipr_registry::PatentRegistry;
    use ipr_shares::{PatentId, Share};
    use ipr_state::{AccountState, StateDB, TransferError};
    use rand::rngs::OsRng;

    use crate::types::{DistributionFailure, RoyaltyParams};

    type Host = RoyaltyHost<PatentRegistry, StateDB>;

    const TOKEN: TokenId = [0x70; 32];

    struct Fixture {
        host: Host,
        owner: SigningKey,
        inventor: SigningKey,
        payer: SigningKey,
    }

    fn custody() -> Principal {
        [0xcc; 32]
    }

    fn person(n: u8) -> Principal {
        let mut k = [0u8; 32];
        k[31] = n;
        k
    }

    fn patent() -> PatentId {
        [0x01; 32]
    }

    fn setup() -> Fixture {
        let owner = SigningKey::generate(&mut OsRng);
        let inventor = SigningKey::generate(&mut OsRng);
        let payer = SigningKey::generate(&mut OsRng);
        let payer_key = payer.verifying_key().to_bytes();

        let mut registry = PatentRegistry::new();
        registry
            .register_patent(patent(), inventor.verifying_key().to_bytes(), 0)
            .unwrap();
        registry.add_contributor(&patent(), person(1)).unwrap();
        registry.add_contributor(&patent(), person(2)).unwrap();

        let mut native = StateDB::new();
        native.set_account(payer_key, AccountState::new(10_000));

        let mut token = TokenLedger::new(TOKEN, "ROY");
        token.mint(&payer_key, 5_000).unwrap();

        let contract = RoyaltyContract::new(
            owner.verifying_key().to_bytes(),
            RoyaltyParams::with_custody(custody()),
            registry,
            native,
        );
        Fixture {
            host: RoyaltyHost::new(contract, vec![token], 0),
            owner,
            inventor,
            payer,
        }
    }

    fn sign(host: &Host, key: &SigningKey, call: RoyaltyCall) -> SignedCall {
        let nonce = host.next_nonce(&key.verifying_key().to_bytes());
        SignedCall::new(key, nonce, call).unwrap()
    }

    fn set_sixty_forty(fx: &Fixture) {
        let call = RoyaltyCall::SetPatentShares {
            patent_id: patent(),
            shares: vec![Share::new(person(1), 60), Share::new(person(2), 40)],
        };
        fx.host.submit(&sign(&fx.host, &fx.inventor, call)).unwrap();
    }

    fn distribute(amount: u128, token: TokenType) -> RoyaltyCall {
        RoyaltyCall::DistributeRoyalties {
            patent_id: patent(),
            amount,
            token,
        }
    }

    #[test]
    fn submit_commits_and_advances_height() {
        let fx = setup();
        set_sixty_forty(&fx);
        assert_eq!(fx.host.height(), 1);

        let output = fx
            .host
            .submit(&sign(&fx.host, &fx.payer, distribute(1_000, TokenType::Native)))
            .unwrap();
        let CallOutput::Distribution(outcome) = output else {
            panic!("expected a distribution");
        };
        assert_eq!(outcome.remaining, 0);
        assert_eq!(fx.host.height(), 2);

        fx.host.view(|c| {
            assert_eq!(c.get_total_distributed(), 1_000);
            let record = c.get_distribution_history(1).unwrap();
            assert_eq!(record.height, 2);
            assert_eq!(record.caller, fx.payer.verifying_key().to_bytes());
            assert_eq!(c.native().balance_of(&person(1)), 600);
            assert_eq!(c.native().balance_of(&fx.payer.verifying_key().to_bytes()), 9_000);
        });
    }

    #[test]
    fn failed_distribution_leaves_no_trace() {
        let fx = setup();
        fx.host
            .execute_as(
                fx.inventor.verifying_key().to_bytes(),
                RoyaltyCall::SetPatentShares {
                    patent_id: patent(),
                    shares: vec![Share::new(person(1), 50), Share::new(person(2), 50)],
                },
            )
            .unwrap();
        let root_before = fx.host.state_root();

        // The payer holds 10_000, so the deposit cannot be collected.
        let result = fx.host.submit(&sign(
            &fx.host,
            &fx.payer,
            distribute(15_000, TokenType::Native),
        ));
        assert!(matches!(
            result,
            Err(HostError::Call(RoyaltyError::DistributionFailed(
                DistributionFailure::Deposit {
                    error: TransferError::InsufficientFunds { .. }
                }
            )))
        ));

        assert_eq!(fx.host.state_root(), root_before);
        fx.host.view(|c| {
            assert_eq!(c.get_distribution_counter(), 0);
            assert_eq!(c.get_total_distributed(), 0);
            assert!(c.get_contributor_payouts(&patent(), &person(1)).is_none());
            assert_eq!(c.native().balance_of(&person(1)), 0);
            assert_eq!(c.native().balance_of(&custody()), 0);
            assert_eq!(c.native().balance_of(&fx.payer.verifying_key().to_bytes()), 10_000);
        });
    }

    #[test]
    fn unfunded_signer_cannot_distribute() {
        let fx = setup();
        set_sixty_forty(&fx);
        let stranger = SigningKey::generate(&mut OsRng);
        let root_before = fx.host.state_root();

        let result = fx.host.submit(&sign(
            &fx.host,
            &stranger,
            distribute(1_000, TokenType::Native),
        ));
        assert!(matches!(
            result,
            Err(HostError::Call(RoyaltyError::DistributionFailed(
                DistributionFailure::Deposit {
                    error: TransferError::AccountNotFound
                }
            )))
        ));

        let result = fx.host.submit(&sign(
            &fx.host,
            &stranger,
            distribute(1_000, TokenType::Token(TOKEN)),
        ));
        assert!(matches!(
            result,
            Err(HostError::Call(RoyaltyError::DistributionFailed(
                DistributionFailure::Deposit { .. }
            )))
        ));

        assert_eq!(fx.host.state_root(), root_before);
        assert_eq!(fx.host.next_nonce(&stranger.verifying_key().to_bytes()), 0);
        fx.host.view(|c| assert_eq!(c.native().balance_of(&person(1)), 0));
    }

    #[test]
    fn custody_gains_exactly_the_remainder() {
        let fx = setup();
        fx.host
            .submit(&sign(
                &fx.host,
                &fx.inventor,
                RoyaltyCall::SetPatentShares {
                    patent_id: patent(),
                    shares: vec![Share::new(person(1), 33), Share::new(person(2), 67)],
                },
            ))
            .unwrap();

        let mut kept = 0;
        for amount in [101, 999, 7] {
            let output = fx
                .host
                .submit(&sign(&fx.host, &fx.payer, distribute(amount, TokenType::Native)))
                .unwrap();
            let CallOutput::Distribution(outcome) = output else {
                panic!("expected a distribution");
            };
            kept += outcome.remaining;
            fx.host
                .view(|c| assert_eq!(c.native().balance_of(&custody()), kept));
        }
        assert_eq!(kept, 1 + 1 + 1);

        let output = fx
            .host
            .submit(&sign(&fx.host, &fx.payer, distribute(101, TokenType::Token(TOKEN))))
            .unwrap();
        let CallOutput::Distribution(outcome) = output else {
            panic!("expected a distribution");
        };
        let custody_tokens = fx
            .host
            .view_token(&TOKEN, |t| t.balance_of(&custody()))
            .unwrap();
        assert_eq!(custody_tokens, outcome.remaining);
    }

    #[test]
    fn state_root_covers_balances_and_nonces() {
        let owner_key = SigningKey::generate(&mut OsRng);
        let owner = owner_key.verifying_key().to_bytes();
        let build = |custody_native: u128, split: (u128, u128)| {
            let mut native = StateDB::new();
            native.set_account(custody(), AccountState::new(custody_native));
            let mut token = TokenLedger::new(TOKEN, "ROY");
            token.mint(&person(1), split.0).unwrap();
            token.mint(&person(2), split.1).unwrap();
            let contract = RoyaltyContract::new(
                owner,
                RoyaltyParams::with_custody(custody()),
                PatentRegistry::new(),
                native,
            );
            Host::new(contract, vec![token], 0)
        };

        let base = build(1_000, (60, 40));
        assert_eq!(base.state_root(), build(1_000, (60, 40)).state_root());
        // Native balance only.
        assert_ne!(base.state_root(), build(1_001, (60, 40)).state_root());
        // Same token supply, different holders.
        assert_ne!(base.state_root(), build(1_000, (50, 50)).state_root());

        // Signed and unsigned runs of the same calls differ only in the
        // owner's nonce.
        let other = build(1_000, (60, 40));
        for (nonce, call) in [RoyaltyCall::PauseContract, RoyaltyCall::UnpauseContract]
            .into_iter()
            .enumerate()
        {
            other
                .submit(&SignedCall::new(&owner_key, nonce as u64, call).unwrap())
                .unwrap();
        }
        let replayed = build(1_000, (60, 40));
        replayed.execute_as(owner, RoyaltyCall::PauseContract).unwrap();
        replayed.execute_as(owner, RoyaltyCall::UnpauseContract).unwrap();
        assert_eq!(other.height(), replayed.height());
        assert_ne!(other.state_root(), replayed.state_root());
    }

    #[test]
    fn nonce_not_consumed_by_failed_call() {
        let fx = setup();
        let signer = fx.inventor.verifying_key().to_bytes();
        let failing = sign(&fx.host, &fx.inventor, distribute(1_000, TokenType::Native));
        assert!(fx.host.submit(&failing).is_err());
        assert_eq!(fx.host.next_nonce(&signer), 0);

        set_sixty_forty(&fx);
        assert_eq!(fx.host.next_nonce(&signer), 1);
    }

    #[test]
    fn replayed_call_rejected() {
        let fx = setup();
        let pause = sign(&fx.host, &fx.owner, RoyaltyCall::PauseContract);
        fx.host.submit(&pause).unwrap();
        assert_eq!(
            fx.host.submit(&pause).unwrap_err(),
            HostError::InvalidNonce {
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    fn forged_signature_rejected() {
        let fx = setup();
        let mut call = sign(&fx.host, &fx.inventor, RoyaltyCall::PauseContract);
        // Claim to be the owner without the owner's key.
        call.signer = fx.owner.verifying_key().to_bytes();
        assert_eq!(fx.host.submit(&call).unwrap_err(), HostError::InvalidSignature);
        fx.host.view(|c| assert!(!c.is_paused()));
    }

    #[test]
    fn token_distribution_through_host() {
        let fx = setup();
        set_sixty_forty(&fx);
        let payer = fx.payer.verifying_key().to_bytes();
        fx.host
            .submit(&sign(&fx.host, &fx.payer, distribute(1_000, TokenType::Token(TOKEN))))
            .unwrap();

        let balances = fx
            .host
            .view_token(&TOKEN, |t| {
                (t.balance_of(&person(1)), t.balance_of(&custody()), t.balance_of(&payer))
            })
            .unwrap();
        assert_eq!(balances, (600, 0, 4_000));
        fx.host.view(|c| assert_eq!(c.native().balance_of(&payer), 10_000));
    }

    #[test]
    fn unknown_token_rejected() {
        let fx = setup();
        set_sixty_forty(&fx);
        let result = fx.host.submit(&sign(
            &fx.host,
            &fx.inventor,
            distribute(100, TokenType::Token([0x99; 32])),
        ));
        assert_eq!(result, Err(HostError::Call(RoyaltyError::InvalidToken)));
    }

    #[test]
    fn paused_wins_over_unknown_token() {
        let fx = setup();
        set_sixty_forty(&fx);
        fx.host
            .submit(&sign(&fx.host, &fx.owner, RoyaltyCall::PauseContract))
            .unwrap();
        let result = fx.host.submit(&sign(
            &fx.host,
            &fx.inventor,
            distribute(100, TokenType::Token([0x99; 32])),
        ));
        assert_eq!(result, Err(HostError::Call(RoyaltyError::Paused)));
    }

    #[test]
    fn counter_moves_only_on_success() {
        let fx = setup();
        set_sixty_forty(&fx);
        let payer = fx.payer.verifying_key().to_bytes();

        for amount in [100, 0, 200, 50_000, 300] {
            let _ = fx.host.execute_as(payer, distribute(amount, TokenType::Native));
        }
        // 0 is below the minimum and 50_000 exceeds the payer's balance.
        fx.host.view(|c| {
            assert_eq!(c.get_distribution_counter(), 3);
            assert_eq!(c.get_total_distributed(), 600);
            let ids: Vec<_> = (1..=3)
                .map(|id| c.get_distribution_history(id).unwrap().amount)
                .collect();
            assert_eq!(ids, vec![100, 200, 300]);
        });
    }
}
