/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! At most one message per validator, for counting votes towards a quorum.

use std::collections::BTreeMap;

use crate::types::{data_types::Address, validator_set::ValidatorSet};

use super::{
    messages::Message,
    types::{ConsensusError, Seal},
};

#[derive(Clone, Debug)]
pub struct MessageSet {
    validator_set: ValidatorSet,
    messages: BTreeMap<Address, Message>,
}

impl MessageSet {
    pub fn new(validator_set: &ValidatorSet) -> Self {
        Self {
            validator_set: validator_set.clone(),
            messages: BTreeMap::new(),
        }
    }

    /// Add `msg` to the set.
    ///
    /// A second message from the same sender is ignored, so a validator that votes twice is still only
    /// counted once.
    pub fn add(&mut self, msg: Message) -> Result<(), ConsensusError> {
        if !self.validator_set.contains(&msg.sender) {
            return Err(ConsensusError::UnauthorizedAddress);
        }
        self.messages.entry(msg.sender).or_insert(msg);
        Ok(())
    }

    /// Number of distinct senders in the set.
    pub fn size(&self) -> usize {
        self.messages.len()
    }

    /// The messages in the set, ordered by sender.
    pub fn values(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// The seals of every message in the set, ordered by signer.
    pub fn seals(&self) -> Vec<Seal> {
        self.messages.values().map(Message::seal).collect()
    }
}
