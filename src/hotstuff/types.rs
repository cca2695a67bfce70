/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to the HotStuff protocol: phases, vote subjects, quorum certificates and the seals
//! that back them, and the error type returned by every message handler.

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    time::Duration,
};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    backend::BackendError,
    types::{
        crypto_primitives::{CryptoError, Signer},
        data_types::{Address, CryptoHash, Round, SignatureBytes, View},
        proposal::Proposal,
        validator_set::ValidatorSet,
    },
};

use super::messages::{Message, MessageCode};

/// Progress of a validator within one round. Only ever moves forward until the round is replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Waiting for a proposal (replicas), or for the NewView quorum and a request (the proposer).
    AcceptRequest,
    /// A prepare certificate for the round's proposal is installed.
    Prepared,
    /// The locked certificate was replaced by the round's prepare certificate.
    Locked,
    /// This validator has cast its commit vote.
    PreCommitted,
    /// A commit certificate is installed and the proposal was handed to the chain.
    Committed,
}

/// The body of every vote: "I attest to `digest` at `view`".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Subject {
    pub view: View,
    pub digest: CryptoHash,
}

impl Subject {
    pub fn new(view: View, digest: CryptoHash) -> Self {
        Self { view, digest }
    }
}

/// Evidence that `signer` cast a vote of kind `code`: the signature over that vote's envelope.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Seal {
    pub code: MessageCode,
    pub signer: Address,
    pub signature: SignatureBytes,
}

/// Proof that at least `Q` validators attested to `hash` at `view`.
///
/// `extra` is the borsh encoding of the [`Seal`]s that back the certificate. The certificate over the
/// last committed proposal that a validator starts each height with carries no seals, and is only ever
/// trusted by the validator that derived it from its own chain.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct QuorumCert {
    pub view: View,
    pub hash: CryptoHash,
    pub proposer: Address,
    pub extra: Vec<u8>,
}

impl QuorumCert {
    /// The certificate over `proposal`, the last committed proposal of the chain.
    pub fn seed(proposal: &Proposal, proposer: Address) -> QuorumCert {
        QuorumCert {
            view: View::new(proposal.height, Round::new(0)),
            hash: proposal.hash,
            proposer,
            extra: Vec::new(),
        }
    }

    /// Form a certificate out of the seals of a quorum of matching votes.
    pub fn from_seals(view: View, hash: CryptoHash, proposer: Address, seals: &[Seal]) -> QuorumCert {
        // Safety: serializing into a Vec<u8> cannot fail.
        let extra = seals.to_vec().try_to_vec().unwrap();
        QuorumCert {
            view,
            hash,
            proposer,
            extra,
        }
    }

    /// Whether this is a seed certificate, i.e., has no seals.
    pub fn is_seed(&self) -> bool {
        self.extra.is_empty()
    }

    pub fn subject(&self) -> Subject {
        Subject::new(self.view, self.hash)
    }

    /// Decode the seals carried in `extra`.
    pub fn seals(&self) -> Result<Vec<Seal>, ConsensusError> {
        if self.extra.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Vec::<Seal>::try_from_slice(&self.extra)?)
    }

    /// Check that this certificate is backed by the seals of a quorum of distinct validators in
    /// `validator_set`, all over votes of kind `expected` for this certificate's subject.
    ///
    /// Seed certificates fail this check; callers that trust their own seed certificate must
    /// recognize it before calling this.
    pub fn verify(
        &self,
        expected: MessageCode,
        validator_set: &ValidatorSet,
        signer: &impl Signer,
    ) -> Result<(), ConsensusError> {
        if !expected.is_vote() {
            return Err(ConsensusError::VerifyQCError);
        }
        let seals = self.seals().map_err(|_| ConsensusError::VerifyQCError)?;
        if seals.is_empty() {
            return Err(ConsensusError::VerifyQCError);
        }

        // Safety: serializing into a Vec<u8> cannot fail.
        let body = self.subject().try_to_vec().unwrap();
        let mut seen = HashSet::new();
        for seal in &seals {
            if seal.code != expected {
                return Err(ConsensusError::VerifyQCError);
            }
            let data = Message::signing_bytes(seal.code, &body, &seal.signer);
            let recovered = signer
                .check_signature(validator_set, &data, &seal.signature)
                .map_err(|_| ConsensusError::VerifyQCError)?;
            if recovered != seal.signer || !seen.insert(recovered) {
                return Err(ConsensusError::VerifyQCError);
            }
        }

        if seen.len() >= validator_set.q() {
            Ok(())
        } else {
            Err(ConsensusError::VerifyQCError)
        }
    }
}

/// Everything that can go wrong while handling an input.
///
/// None of these is fatal: the algorithm thread logs the error and moves on to the next input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// The message is for a view this validator already left.
    OldMessage,
    /// The message is for a view this validator has not reached yet. It was kept in the backlog.
    FutureMessage,
    /// The message is malformed, or conflicts with a proposal accepted earlier in the round.
    InvalidMessage,
    /// The message could not be decoded.
    DecodeError(String),
    /// The sender of the message is not a validator.
    UnauthorizedAddress,
    /// The signature of the message was produced by someone other than its declared sender.
    InvalidSigner,
    /// A vote for something other than the round's proposal.
    InconsistentVote,
    /// A prepare certificate that does not match the round's proposal.
    InconsistentPrepareQC,
    /// A locked certificate that does not match the local prepare certificate.
    InconsistentLockedQC,
    /// A commit certificate that does not match the round's proposal.
    InconsistentCommittedQC,
    /// A leader-only message from a validator that is not the proposer of the round.
    NotFromProposer,
    /// A message for the proposer received by a validator that is not the proposer of the round.
    NotToProposer,
    /// The proposal neither extends the locked block nor carries a fresher certificate than the lock.
    SafeNodeFailed,
    /// The proposal does not extend the certificate it carries.
    ExtendError,
    /// A certificate does not carry the seals of a quorum.
    VerifyQCError,
    /// The chain cannot verify the proposal yet. It will be re-delivered after the delay.
    FutureBlock(Duration),
    /// The chain rejected the proposal.
    InvalidProposal,
    Backend(BackendError),
    Crypto(CryptoError),
}

impl ConsensusError {
    /// Whether this error is part of normal operation (stale or early messages) rather than a sign of
    /// a faulty peer or collaborator.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            ConsensusError::OldMessage | ConsensusError::FutureMessage | ConsensusError::FutureBlock(_)
        )
    }
}

impl Display for ConsensusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusError::OldMessage => write!(f, "message is for an old view"),
            ConsensusError::FutureMessage => write!(f, "message is for a future view"),
            ConsensusError::InvalidMessage => write!(f, "invalid message"),
            ConsensusError::DecodeError(reason) => write!(f, "failed to decode message: {}", reason),
            ConsensusError::UnauthorizedAddress => write!(f, "sender is not a validator"),
            ConsensusError::InvalidSigner => write!(f, "message not signed by its sender"),
            ConsensusError::InconsistentVote => write!(f, "vote does not match the round's proposal"),
            ConsensusError::InconsistentPrepareQC => write!(f, "inconsistent prepare certificate"),
            ConsensusError::InconsistentLockedQC => write!(f, "inconsistent locked certificate"),
            ConsensusError::InconsistentCommittedQC => write!(f, "inconsistent commit certificate"),
            ConsensusError::NotFromProposer => write!(f, "message not from the proposer"),
            ConsensusError::NotToProposer => write!(f, "message for the proposer, but not the proposer"),
            ConsensusError::SafeNodeFailed => write!(f, "proposal is not safe to vote for"),
            ConsensusError::ExtendError => write!(f, "proposal does not extend its certificate"),
            ConsensusError::VerifyQCError => write!(f, "certificate failed verification"),
            ConsensusError::FutureBlock(delay) => write!(f, "proposal is from the future, retry in {:?}", delay),
            ConsensusError::InvalidProposal => write!(f, "proposal rejected by the chain"),
            ConsensusError::Backend(err) => write!(f, "backend error: {}", err),
            ConsensusError::Crypto(err) => write!(f, "crypto error: {}", err),
        }
    }
}

impl std::error::Error for ConsensusError {}

impl From<BackendError> for ConsensusError {
    fn from(value: BackendError) -> Self {
        ConsensusError::Backend(value)
    }
}

impl From<CryptoError> for ConsensusError {
    fn from(value: CryptoError) -> Self {
        match value {
            CryptoError::UnauthorizedAddress => ConsensusError::UnauthorizedAddress,
            other => ConsensusError::Crypto(other),
        }
    }
}

impl From<std::io::Error> for ConsensusError {
    fn from(value: std::io::Error) -> Self {
        ConsensusError::DecodeError(value.to_string())
    }
}
