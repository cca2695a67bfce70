//! Keys for a fixed set of validators, and helpers to sign messages on their behalf.

use hotstuff_bft::{
    hotstuff::{
        messages::{HotStuffMessage, Message},
        types::{QuorumCert, Seal, Subject},
    },
    types::{
        crypto_primitives::{Ed25519Signer, Signer},
        data_types::Address,
        validator_set::{LeaderPolicy, ValidatorSet},
    },
};
use rand_core::OsRng;

/// `n` freshly generated validators, ordered by address like a [`ValidatorSet`] orders them, so that
/// `signer(i)` is the validator at index `i` of the set.
pub(crate) struct Validators {
    signers: Vec<Ed25519Signer>,
}

impl Validators {
    pub(crate) fn generate(n: usize) -> Validators {
        let mut csprng = OsRng {};
        let mut signers: Vec<Ed25519Signer> =
            (0..n).map(|_| Ed25519Signer::generate(&mut csprng)).collect();
        signers.sort_by_key(|signer| signer.address());
        Validators { signers }
    }

    pub(crate) fn len(&self) -> usize {
        self.signers.len()
    }

    pub(crate) fn signer(&self, index: usize) -> &Ed25519Signer {
        &self.signers[index]
    }

    pub(crate) fn address(&self, index: usize) -> Address {
        self.signers[index].address()
    }

    pub(crate) fn validator_set(&self, policy: LeaderPolicy) -> ValidatorSet {
        ValidatorSet::new(self.signers.iter().map(|signer| signer.address()), policy)
    }

    /// Encode `msg` in an envelope signed by validator `index`.
    pub(crate) fn signed(&self, index: usize, msg: HotStuffMessage) -> Vec<u8> {
        Message::new(self.signer(index), &msg).encode()
    }

    /// The seal validator `index` contributes by voting `vote` for `subject`.
    pub(crate) fn seal(
        &self,
        index: usize,
        vote: fn(Subject) -> HotStuffMessage,
        subject: Subject,
    ) -> Seal {
        Message::new(self.signer(index), &vote(subject)).seal()
    }

    /// A certificate for `subject` backed by the `vote`s of the validators at `indices`.
    pub(crate) fn certify(
        &self,
        indices: &[usize],
        vote: fn(Subject) -> HotStuffMessage,
        subject: Subject,
        proposer: Address,
    ) -> QuorumCert {
        let seals: Vec<Seal> = indices
            .iter()
            .map(|index| self.seal(*index, vote, subject))
            .collect();
        QuorumCert::from_seals(subject.view, subject.digest, proposer, &seals)
    }
}
