/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Trait for the consensus core's view of the outside world: the chain it extends, and the network it
//! talks to other validators through.
//!
//! ## Delivery
//!
//! `broadcast`, `gossip`, and `unicast` hand over payloads that are already encoded and signed. They must
//! not block the algorithm thread for long. Payloads addressed to the local validator (including its own
//! broadcasts, and unicasts while it is the proposer) must come back to it as an
//! [`Input::Message`](crate::algorithm::Input::Message) through the same channel everything else arrives on.
//!
//! ## Committing
//!
//! After [`commit`](Backend::commit) returns, [`last_proposal`](Backend::last_proposal) must report the
//! committed proposal. Once the chain is done with it, the backend sends
//! [`Input::FinalCommitted`](crate::algorithm::Input::FinalCommitted) to move consensus to the next height.

use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};

use crate::{
    hotstuff::types::Seal,
    types::{data_types::Address, proposal::Proposal, validator_set::ValidatorSet},
};

pub trait Backend: Send {
    /// Address of the local validator.
    fn address(&self) -> Address;

    /// The current validator set, as recorded in the chain.
    fn validators(&self) -> ValidatorSet;

    /// Send `payload` to every validator in `validator_set`, including the local validator.
    fn broadcast(&mut self, validator_set: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError>;

    /// Send `payload` to every validator in `validator_set` except the local validator.
    fn gossip(&mut self, validator_set: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError>;

    /// Send `payload` to the current proposer of `validator_set`.
    fn unicast(&mut self, validator_set: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError>;

    /// Check that the chain can extend itself with `proposal`.
    fn verify(&mut self, proposal: &Proposal) -> Result<(), VerifyError>;

    /// Attach the commit `seals` to `proposal`, returning the proposal to commit.
    fn pre_commit(&mut self, proposal: &Proposal, seals: &[Seal]) -> Result<Proposal, BackendError>;

    /// Append `proposal` to the chain.
    fn commit(&mut self, proposal: Proposal) -> Result<(), BackendError>;

    /// The last committed proposal, and the address of the validator that proposed it.
    fn last_proposal(&self) -> (Proposal, Address);
}

/// Reasons the chain may refuse to vote for a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The proposal is not valid yet, e.g., its timestamp is ahead of the local clock. It should be
    /// verified again after the given delay.
    FutureBlock(Duration),
    /// The proposal is invalid.
    Invalid(String),
}

/// A failure inside the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// A payload could not be handed to the network.
    Network(String),
    /// The chain could not pre-commit or commit a proposal.
    Chain(String),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Network(reason) => write!(f, "network: {}", reason),
            BackendError::Chain(reason) => write!(f, "chain: {}", reason),
        }
    }
}

impl std::error::Error for BackendError {}
