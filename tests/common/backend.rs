//! A backend that records everything the consensus core sends instead of delivering it, for driving a
//! single [`Core`](hotstuff_bft::hotstuff::implementation::Core) by hand.

use std::sync::{Arc, Mutex, MutexGuard};

use hotstuff_bft::{
    backend::{Backend, BackendError, VerifyError},
    hotstuff::{
        messages::{HotStuffMessage, Message},
        types::Seal,
    },
    types::{data_types::Address, proposal::Proposal, validator_set::ValidatorSet},
};

/// Where a recorded message was sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Destination {
    Broadcast,
    Gossip,
    Unicast(Option<Address>),
}

#[derive(Default)]
struct MockState {
    chain: Vec<(Proposal, Address)>,
    sent: Vec<(Destination, Message)>,
    verify_result: Option<VerifyError>,
}

/// Cloning a `MockBackend` yields a handle onto the same chain and outbox.
#[derive(Clone)]
pub(crate) struct MockBackend {
    address: Address,
    validator_set: ValidatorSet,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// A backend for validator `address` whose chain's head is `head`, proposed by `head_proposer`.
    pub(crate) fn new(
        address: Address,
        validator_set: ValidatorSet,
        head: Proposal,
        head_proposer: Address,
    ) -> MockBackend {
        let state = MockState {
            chain: vec![(head, head_proposer)],
            ..Default::default()
        };
        MockBackend {
            address,
            validator_set,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Remove and return everything sent so far, decoded.
    pub(crate) fn take_sent(&self) -> Vec<(Destination, HotStuffMessage)> {
        self.state()
            .sent
            .drain(..)
            .map(|(destination, msg)| (destination, msg.payload().unwrap()))
            .collect()
    }

    /// Remove and return the raw envelopes sent so far.
    pub(crate) fn take_envelopes(&self) -> Vec<(Destination, Message)> {
        self.state().sent.drain(..).collect()
    }

    /// Every proposal committed through this backend, oldest first, not including the initial head.
    pub(crate) fn committed(&self) -> Vec<Proposal> {
        self.state()
            .chain
            .iter()
            .skip(1)
            .map(|(proposal, _)| proposal.clone())
            .collect()
    }

    /// Make every subsequent `verify` fail with `err`, or succeed if `err` is `None`.
    pub(crate) fn set_verify_result(&self, err: Option<VerifyError>) {
        self.state().verify_result = err;
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, destination: Destination, payload: Vec<u8>) {
        let msg = Message::decode(&payload).unwrap();
        self.state().sent.push((destination, msg));
    }
}

impl Backend for MockBackend {
    fn address(&self) -> Address {
        self.address
    }

    fn validators(&self) -> ValidatorSet {
        self.validator_set.clone()
    }

    fn broadcast(&mut self, _: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError> {
        self.record(Destination::Broadcast, payload);
        Ok(())
    }

    fn gossip(&mut self, _: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError> {
        self.record(Destination::Gossip, payload);
        Ok(())
    }

    fn unicast(&mut self, validator_set: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError> {
        self.record(Destination::Unicast(validator_set.proposer()), payload);
        Ok(())
    }

    fn verify(&mut self, _: &Proposal) -> Result<(), VerifyError> {
        match self.state().verify_result.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn pre_commit(&mut self, proposal: &Proposal, _: &[Seal]) -> Result<Proposal, BackendError> {
        Ok(proposal.clone())
    }

    fn commit(&mut self, proposal: Proposal) -> Result<(), BackendError> {
        let proposer = proposal.proposer;
        self.state().chain.push((proposal, proposer));
        Ok(())
    }

    fn last_proposal(&self) -> (Proposal, Address) {
        // Safety: the chain always holds at least the initial head.
        self.state().chain.last().cloned().unwrap()
    }
}
