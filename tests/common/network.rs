//! An in-memory network of replicas, each with its own chain.
//!
//! Every validator's backend holds a sender into every validator's input channel. Its chain acts as a
//! miner too: whenever it commits a proposal, it asks its replica to propose the next one.

use std::{
    collections::HashMap,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
};

use hotstuff_bft::{
    algorithm::Input,
    backend::{Backend, BackendError, VerifyError},
    hotstuff::types::Seal,
    types::{
        data_types::{Address, BlockHeight},
        proposal::Proposal,
        validator_set::ValidatorSet,
    },
};

/// A handle onto a validator's chain, readable from the test thread.
#[derive(Clone)]
pub(crate) struct Chain(Arc<Mutex<Vec<(Proposal, Address)>>>);

impl Chain {
    fn new() -> Chain {
        Chain(Arc::new(Mutex::new(vec![(Proposal::genesis(), Address::zero())])))
    }

    /// Height of the last committed proposal.
    pub(crate) fn height(&self) -> BlockHeight {
        self.head().0.height
    }

    pub(crate) fn head(&self) -> (Proposal, Address) {
        self.0.lock().unwrap().last().cloned().unwrap()
    }

    /// The committed proposal at `height`, if the chain is that long.
    pub(crate) fn get(&self, height: BlockHeight) -> Option<Proposal> {
        self.0
            .lock()
            .unwrap()
            .get(height.int() as usize)
            .map(|(proposal, _)| proposal.clone())
    }

    fn push(&self, proposal: Proposal) {
        let proposer = proposal.proposer;
        self.0.lock().unwrap().push((proposal, proposer));
    }
}

pub(crate) struct NetworkBackend {
    address: Address,
    validator_set: ValidatorSet,
    peers: HashMap<Address, Sender<Input>>,
    chain: Chain,
}

impl NetworkBackend {
    fn send(&self, to: &Address, payload: &[u8]) {
        if let Some(peer) = self.peers.get(to) {
            // Peers that are not running have dropped their receivers.
            let _ = peer.send(Input::Message(payload.to_vec()));
        }
    }

    /// The request this validator makes for the height after its chain's head.
    pub(crate) fn next_request(&self) -> Proposal {
        let (head, _) = self.chain.head();
        Proposal::new(
            head.height + 1,
            head.hash,
            self.address,
            format!("height {} from {}", head.height + 1, self.address).into_bytes(),
        )
    }
}

impl Backend for NetworkBackend {
    fn address(&self) -> Address {
        self.address
    }

    fn validators(&self) -> ValidatorSet {
        self.validator_set.clone()
    }

    fn broadcast(&mut self, validator_set: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError> {
        for validator in validator_set.validators() {
            self.send(validator, &payload);
        }
        Ok(())
    }

    fn gossip(&mut self, validator_set: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError> {
        for validator in validator_set.validators().filter(|v| **v != self.address) {
            self.send(validator, &payload);
        }
        Ok(())
    }

    fn unicast(&mut self, validator_set: &ValidatorSet, payload: Vec<u8>) -> Result<(), BackendError> {
        match validator_set.proposer() {
            Some(proposer) => {
                self.send(&proposer, &payload);
                Ok(())
            }
            None => Err(BackendError::Network("no proposer".to_string())),
        }
    }

    fn verify(&mut self, proposal: &Proposal) -> Result<(), VerifyError> {
        let (head, _) = self.chain.head();
        if proposal.height != head.height + 1 || proposal.parent != head.hash {
            return Err(VerifyError::Invalid(format!(
                "proposal at height {} does not extend the head at height {}",
                proposal.height, head.height
            )));
        }
        Ok(())
    }

    fn pre_commit(&mut self, proposal: &Proposal, seals: &[Seal]) -> Result<Proposal, BackendError> {
        if seals.is_empty() {
            return Err(BackendError::Chain("no commit seals".to_string()));
        }
        Ok(proposal.clone())
    }

    fn commit(&mut self, proposal: Proposal) -> Result<(), BackendError> {
        self.chain.push(proposal);

        let own_inbox = self
            .peers
            .get(&self.address)
            .ok_or_else(|| BackendError::Chain("not connected to itself".to_string()))?;
        let _ = own_inbox.send(Input::Request(self.next_request()));
        let _ = own_inbox.send(Input::FinalCommitted);
        Ok(())
    }

    fn last_proposal(&self) -> (Proposal, Address) {
        self.chain.head()
    }
}

/// The pieces one validator needs to run: its backend, both ends of its input channel, and a handle
/// onto its chain.
pub(crate) struct NetworkStub {
    pub(crate) backend: NetworkBackend,
    pub(crate) input_sender: Sender<Input>,
    pub(crate) input_receiver: Receiver<Input>,
    pub(crate) chain: Chain,
}

/// Connect every validator in `validator_set` to every other, each starting from the genesis proposal.
/// Stubs are returned in the order of the validator set.
pub(crate) fn mock_network(validator_set: &ValidatorSet) -> Vec<NetworkStub> {
    let channels: Vec<(Address, Sender<Input>, Receiver<Input>)> = validator_set
        .validators()
        .map(|address| {
            let (sender, receiver) = mpsc::channel();
            (*address, sender, receiver)
        })
        .collect();

    let peers: HashMap<Address, Sender<Input>> = channels
        .iter()
        .map(|(address, sender, _)| (*address, sender.clone()))
        .collect();

    channels
        .into_iter()
        .map(|(address, input_sender, input_receiver)| {
            let chain = Chain::new();
            NetworkStub {
                backend: NetworkBackend {
                    address,
                    validator_set: validator_set.clone(),
                    peers: peers.clone(),
                    chain: chain.clone(),
                },
                input_sender,
                input_receiver,
                chain,
            }
        })
        .collect()
}
