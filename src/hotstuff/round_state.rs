/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! State of one consensus round.
//!
//! A `RoundState` is owned by [`Core`](super::implementation::Core) and replaced wholesale on every
//! round change through [`spawn`](RoundState::spawn), which carries the request being proposed and the
//! certificates forward and drops everything else. Other threads read a copy of it through a
//! [`RoundStateCamera`].

use std::sync::{Arc, RwLock};

use crate::types::{
    data_types::{Address, CryptoHash, View},
    proposal::Proposal,
    validator_set::ValidatorSet,
};

use super::{
    message_set::MessageSet,
    messages::{HotStuffMessage, Message},
    types::{ConsensusError, Phase, QuorumCert, Seal, Subject},
};

#[derive(Clone, Debug)]
pub struct RoundState {
    view: View,
    phase: Phase,
    proposal: Option<Proposal>,
    pending_request: Option<Proposal>,

    new_views: MessageSet,
    prepare_votes: MessageSet,
    pre_commit_votes: MessageSet,
    commit_votes: MessageSet,

    high_qc: QuorumCert,
    prepare_qc: QuorumCert,
    locked_qc: QuorumCert,
    committed_qc: QuorumCert,
    prepared_proposal: Option<Proposal>,

    // Which certificates were installed in this round, as opposed to carried from an earlier one.
    installed: Installed,
}

#[derive(Clone, Copy, Debug, Default)]
struct Installed {
    prepare_qc: bool,
    locked_qc: bool,
    committed_qc: bool,
}

impl RoundState {
    /// Create the state for `view`, with every certificate set to `seed`.
    pub fn new(view: View, validator_set: &ValidatorSet, seed: QuorumCert) -> Self {
        Self {
            view,
            phase: Phase::AcceptRequest,
            proposal: None,
            pending_request: None,
            new_views: MessageSet::new(validator_set),
            prepare_votes: MessageSet::new(validator_set),
            pre_commit_votes: MessageSet::new(validator_set),
            commit_votes: MessageSet::new(validator_set),
            high_qc: seed.clone(),
            prepare_qc: seed.clone(),
            locked_qc: seed.clone(),
            committed_qc: seed,
            prepared_proposal: None,
            installed: Installed::default(),
        }
    }

    /// Create the state for the next round. Carries the pending request, the four certificates, and the
    /// prepared proposal; everything else starts out empty.
    pub fn spawn(&self, view: View, validator_set: &ValidatorSet) -> RoundState {
        RoundState {
            view,
            phase: Phase::AcceptRequest,
            proposal: None,
            pending_request: self.pending_request.clone(),
            new_views: MessageSet::new(validator_set),
            prepare_votes: MessageSet::new(validator_set),
            pre_commit_votes: MessageSet::new(validator_set),
            commit_votes: MessageSet::new(validator_set),
            high_qc: self.high_qc.clone(),
            prepare_qc: self.prepare_qc.clone(),
            locked_qc: self.locked_qc.clone(),
            committed_qc: self.committed_qc.clone(),
            prepared_proposal: self.prepared_proposal.clone(),
            installed: Installed::default(),
        }
    }

    /// Replace every carried certificate with `seed`, and forget the prepared proposal.
    pub fn reseed(&mut self, seed: QuorumCert) {
        self.high_qc = seed.clone();
        self.prepare_qc = seed.clone();
        self.locked_qc = seed.clone();
        self.committed_qc = seed;
        self.prepared_proposal = None;
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advance to `phase`. Returns `false`, and leaves the phase unchanged, if the round is already at
    /// or past `phase`.
    pub fn set_phase(&mut self, phase: Phase) -> bool {
        if phase > self.phase {
            self.phase = phase;
            true
        } else {
            false
        }
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    pub fn set_proposal(&mut self, proposal: Proposal) {
        self.proposal = Some(proposal)
    }

    /// The subject every vote in this round must match, once a proposal was accepted.
    pub fn subject(&self) -> Option<Subject> {
        self.proposal
            .as_ref()
            .map(|proposal| Subject::new(self.view, proposal.hash))
    }

    pub fn pending_request(&self) -> Option<&Proposal> {
        self.pending_request.as_ref()
    }

    pub fn set_pending_request(&mut self, request: Proposal) {
        self.pending_request = Some(request)
    }

    pub fn take_pending_request(&mut self) -> Option<Proposal> {
        self.pending_request.take()
    }

    pub fn high_qc(&self) -> &QuorumCert {
        &self.high_qc
    }

    pub fn set_high_qc(&mut self, qc: QuorumCert) {
        self.high_qc = qc
    }

    pub fn prepare_qc(&self) -> &QuorumCert {
        &self.prepare_qc
    }

    /// Install the prepare certificate for the round's proposal. At most once per round.
    pub fn set_prepare_qc(&mut self, qc: QuorumCert) -> bool {
        if self.installed.prepare_qc {
            return false;
        }
        self.prepare_qc = qc;
        self.prepared_proposal = self.proposal.clone();
        self.installed.prepare_qc = true;
        true
    }

    pub fn locked_qc(&self) -> &QuorumCert {
        &self.locked_qc
    }

    /// Install the locked certificate. At most once per round.
    pub fn set_locked_qc(&mut self, qc: QuorumCert) -> bool {
        if self.installed.locked_qc {
            return false;
        }
        self.locked_qc = qc;
        self.installed.locked_qc = true;
        true
    }

    pub fn committed_qc(&self) -> &QuorumCert {
        &self.committed_qc
    }

    /// Install the commit certificate. At most once per round.
    pub fn set_committed_qc(&mut self, qc: QuorumCert) -> bool {
        if self.installed.committed_qc {
            return false;
        }
        self.committed_qc = qc;
        self.installed.committed_qc = true;
        true
    }

    /// The proposal certified by the prepare certificate, if that certificate was formed for a proposal
    /// this validator saw.
    pub fn prepared_proposal(&self) -> Option<&Proposal> {
        self.prepared_proposal.as_ref()
    }

    pub fn add_new_view(&mut self, msg: Message) -> Result<(), ConsensusError> {
        self.new_views.add(msg)
    }

    pub fn add_prepare_vote(&mut self, msg: Message) -> Result<(), ConsensusError> {
        self.prepare_votes.add(msg)
    }

    pub fn add_pre_commit_vote(&mut self, msg: Message) -> Result<(), ConsensusError> {
        self.pre_commit_votes.add(msg)
    }

    pub fn add_commit_vote(&mut self, msg: Message) -> Result<(), ConsensusError> {
        self.commit_votes.add(msg)
    }

    pub fn new_view_size(&self) -> usize {
        self.new_views.size()
    }

    pub fn prepare_vote_size(&self) -> usize {
        self.prepare_votes.size()
    }

    pub fn pre_commit_vote_size(&self) -> usize {
        self.pre_commit_votes.size()
    }

    pub fn commit_vote_size(&self) -> usize {
        self.commit_votes.size()
    }

    pub fn prepare_vote_seals(&self) -> Vec<Seal> {
        self.prepare_votes.seals()
    }

    pub fn commit_vote_seals(&self) -> Vec<Seal> {
        self.commit_votes.seals()
    }

    /// The highest-viewed certificate carried by the NewView messages collected so far.
    pub fn highest_new_view_qc(&self) -> Option<QuorumCert> {
        self.new_views
            .values()
            .filter_map(|msg| match msg.payload() {
                Ok(HotStuffMessage::NewView(new_view)) => Some(new_view.high_qc),
                _ => None,
            })
            .max_by(|a, b| a.view.cmp(&b.view))
    }

    pub fn snapshot(&self, proposer: Option<Address>) -> RoundSnapshot {
        RoundSnapshot {
            view: self.view,
            phase: self.phase,
            proposer,
            proposal: self.proposal.as_ref().map(|proposal| proposal.hash),
            new_views: self.new_views.size(),
            prepare_votes: self.prepare_votes.size(),
            pre_commit_votes: self.pre_commit_votes.size(),
            commit_votes: self.commit_votes.size(),
            high_qc: self.high_qc.clone(),
            locked_qc: self.locked_qc.clone(),
            committed_qc: self.committed_qc.clone(),
        }
    }
}

/// A copy of the parts of a [`RoundState`] that are interesting to observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub view: View,
    pub phase: Phase,
    pub proposer: Option<Address>,
    pub proposal: Option<CryptoHash>,
    pub new_views: usize,
    pub prepare_votes: usize,
    pub pre_commit_votes: usize,
    pub commit_votes: usize,
    pub high_qc: QuorumCert,
    pub locked_qc: QuorumCert,
    pub committed_qc: QuorumCert,
}

/// Read access to the latest [`RoundSnapshot`] of a running replica, from any thread.
#[derive(Clone)]
pub struct RoundStateCamera(Arc<RwLock<RoundSnapshot>>);

impl RoundStateCamera {
    pub(crate) fn new(snapshot: RoundSnapshot) -> Self {
        RoundStateCamera(Arc::new(RwLock::new(snapshot)))
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        match self.0.read() {
            Ok(snapshot) => snapshot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn update(&self, snapshot: RoundSnapshot) {
        match self.0.write() {
            Ok(mut current) => *current = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}
