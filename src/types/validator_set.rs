/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The ordered set of validators that run consensus, and the policies that select the proposer of a
//! round from it.
//!
//! ## Quorum sizes
//!
//! A validator set of size `N` tolerates `F = ceil(N / 3) - 1` faulty validators. A quorum is any
//! `Q = N - F` distinct validators. For example, `N = 4` gives `F = 1` and `Q = 3`, and `N = 7`
//! gives `F = 2` and `Q = 5`.

use std::collections::HashSet;

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{CryptoHasher, Digest},
    data_types::{Address, Round},
};

/// How the proposer of a round is selected from the validator set.
///
/// Every policy is a pure function of `(validators, last_proposer, round)`, so all validators agree on
/// the proposer of every round without communicating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum LeaderPolicy {
    /// `validators[(offset(last_proposer) + round + 1) mod N]`: the role moves to the next validator
    /// after every committed proposal and every round change.
    RoundRobin,
    /// `validators[(offset(last_proposer) + round) mod N]`: the last proposer keeps the role until a
    /// round fails.
    Sticky,
    /// `validators[u64_le(sha256(last_proposer || round)[..8]) mod N]`.
    Vrf,
}

impl Default for LeaderPolicy {
    fn default() -> Self {
        LeaderPolicy::RoundRobin
    }
}

/// Validators ordered by ascending address, plus the proposer of the current round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Address>,
    policy: LeaderPolicy,
    proposer: Option<Address>,
}

impl ValidatorSet {
    /// Create a validator set from `validators`. Duplicates are removed. The initial proposer is the
    /// validator with the lowest address.
    pub fn new(validators: impl IntoIterator<Item = Address>, policy: LeaderPolicy) -> Self {
        let mut validators: Vec<Address> = validators.into_iter().collect();
        validators.sort();
        validators.dedup();
        let proposer = validators.first().copied();
        Self {
            validators,
            policy,
            proposer,
        }
    }

    pub fn policy(&self) -> LeaderPolicy {
        self.policy
    }

    /// Switch to a different leader policy. Takes effect on the next [`calc_proposer`](Self::calc_proposer).
    pub fn set_policy(&mut self, policy: LeaderPolicy) {
        self.policy = policy
    }

    pub fn size(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Number of faulty validators this set tolerates: `ceil(N / 3) - 1`.
    pub fn f(&self) -> usize {
        ((self.size() + 2) / 3).saturating_sub(1)
    }

    /// Quorum size: `N - F`.
    pub fn q(&self) -> usize {
        self.size() - self.f()
    }

    pub fn validators(&self) -> std::slice::Iter<'_, Address> {
        self.validators.iter()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.validators.binary_search(address).is_ok()
    }

    /// Get the position of `address` in the set along with the address itself.
    pub fn get_by_address(&self, address: &Address) -> Option<(usize, Address)> {
        self.validators
            .binary_search(address)
            .ok()
            .map(|index| (index, *address))
    }

    pub fn get_by_index(&self, index: usize) -> Option<Address> {
        self.validators.get(index).copied()
    }

    /// Add `address` to the set. Returns `false` if it was already a member.
    pub fn add_validator(&mut self, address: Address) -> bool {
        match self.validators.binary_search(&address) {
            Ok(_) => false,
            Err(index) => {
                self.validators.insert(index, address);
                true
            }
        }
    }

    /// Remove `address` from the set. Returns `false` if it was not a member.
    pub fn remove_validator(&mut self, address: &Address) -> bool {
        match self.validators.binary_search(address) {
            Ok(index) => {
                self.validators.remove(index);
                if self.proposer.as_ref() == Some(address) {
                    self.proposer = None;
                }
                true
            }
            Err(_) => false,
        }
    }

    /// The proposer selected by the last call to [`calc_proposer`](Self::calc_proposer).
    pub fn proposer(&self) -> Option<Address> {
        self.proposer
    }

    pub fn is_proposer(&self, address: &Address) -> bool {
        self.proposer.as_ref() == Some(address)
    }

    /// Select the proposer for `round`, given the proposer of the last committed proposal, and make it
    /// the current proposer.
    pub fn calc_proposer(&mut self, last_proposer: &Address, round: Round) {
        self.proposer = self.select_proposer(last_proposer, round);
    }

    /// Compute the proposer for `round` under this set's policy without changing the set.
    pub fn select_proposer(&self, last_proposer: &Address, round: Round) -> Option<Address> {
        if self.validators.is_empty() {
            return None;
        }
        let n = self.size() as u64;
        let index = match self.policy {
            LeaderPolicy::RoundRobin => {
                (self.offset(last_proposer) + round.int() % n + 1) % n
            }
            LeaderPolicy::Sticky => (self.offset(last_proposer) + round.int() % n) % n,
            LeaderPolicy::Vrf => {
                let mut hasher = CryptoHasher::new();
                hasher.update(last_proposer.bytes());
                hasher.update(round.to_le_bytes());
                let digest: [u8; 32] = hasher.finalize().into();
                let mut seed = [0u8; 8];
                seed.copy_from_slice(&digest[..8]);
                u64::from_le_bytes(seed) % n
            }
        };
        self.get_by_index(index as usize)
    }

    /// Count the distinct members of this set among `signers`, and check whether they form a quorum.
    ///
    /// Duplicates and non-members are skipped; the set itself is never modified.
    pub fn check_quorum<'a>(&self, signers: impl IntoIterator<Item = &'a Address>) -> bool {
        let mut seen = HashSet::new();
        for signer in signers {
            if self.contains(signer) {
                seen.insert(*signer);
            }
        }
        !self.is_empty() && seen.len() >= self.q()
    }

    // Position of `address` in the set, or 0 for the empty address and for former validators.
    fn offset(&self, address: &Address) -> u64 {
        if address.is_zero() {
            return 0;
        }
        self.get_by_address(address)
            .map_or(0, |(index, _)| index as u64)
    }
}
