/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'proposal' type and its associated methods.
//!
//! A `Proposal` is the consensus core's view of a block: the chain's block bytes ride in
//! [`data`](Proposal::data), and the core only ever looks at the height, the parent link, and the hash.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{CryptoHasher, Digest},
    data_types::{Address, BlockHeight, CryptoHash},
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub height: BlockHeight,
    pub parent: CryptoHash,
    pub proposer: Address,
    pub hash: CryptoHash,
    pub data: Vec<u8>,
}

impl Proposal {
    pub fn new(height: BlockHeight, parent: CryptoHash, proposer: Address, data: Vec<u8>) -> Proposal {
        Proposal {
            height,
            parent,
            proposer,
            hash: Proposal::hash(height, &parent, &proposer, &data),
            data,
        }
    }

    /// The genesis proposal: height 0, no parent, no proposer, no data.
    pub fn genesis() -> Proposal {
        Proposal::new(BlockHeight::new(0), CryptoHash::zero(), Address::zero(), Vec::new())
    }

    /// `sha256(height || parent || proposer || sha256(data))`.
    pub fn hash(
        height: BlockHeight,
        parent: &CryptoHash,
        proposer: &Address,
        data: &[u8],
    ) -> CryptoHash {
        let data_hash: [u8; 32] = CryptoHasher::digest(data).into();
        let mut hasher = CryptoHasher::new();
        hasher.update(height.to_le_bytes());
        hasher.update(parent.bytes());
        hasher.update(proposer.bytes());
        hasher.update(data_hash);
        CryptoHash::new(hasher.finalize().into())
    }

    /// Checks if `hash` was computed from the other fields.
    pub fn is_correct(&self) -> bool {
        self.hash == Proposal::hash(self.height, &self.parent, &self.proposer, &self.data)
    }
}
