/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the four-phase HotStuff protocol.
//!
//! Main type: [`Core`].
//!
//! ## Round structure
//!
//! Every round of every height goes through the same steps:
//! 1. On entering the round, every validator sends a `NewView` carrying its prepare certificate to the
//!    proposer of the round.
//! 2. Once the proposer holds `NewView`s from a quorum, it picks the highest certificate among them and
//!    broadcasts a `Prepare` for a proposal that extends it.
//! 3. Validators check the proposal and send `PrepareVote`s. A quorum of them forms the prepare
//!    certificate, which the proposer broadcasts in a `PreCommit`.
//! 4. Validators install the prepare certificate and send `PreCommitVote`s. On a quorum, the proposer
//!    locks on the prepare certificate and broadcasts it in a `Commit`.
//! 5. Validators lock too, and send `CommitVote`s. A quorum of them forms the commit certificate: the
//!    proposer commits the proposal and broadcasts the certificate in a `Decide`, on which everyone else
//!    commits.
//!
//! If a round does not complete before its timer fires, validators move to the next round of the same
//! height, carrying their certificates with them.

use std::{
    sync::mpsc::Sender,
    time::{Duration, SystemTime},
};

use crate::{
    algorithm::Input,
    backend::{Backend, VerifyError},
    events::{
        CollectQCEvent, CommitBlockEvent, Event, NewViewEvent, ProposeEvent, ReceiveNewViewEvent,
        ReceiveProposalEvent, ReceiveVoteEvent, RoundTimeoutEvent, StartRoundEvent,
        UpdateLockedQCEvent, VoteEvent,
    },
    pacemaker::{round_timeout, RoundTimer},
    types::{
        crypto_primitives::Signer,
        data_types::{Address, BufferSize, EpochLength, Round, View},
        proposal::Proposal,
        validator_set::{LeaderPolicy, ValidatorSet},
    },
};

use super::{
    backlog::Backlog,
    messages::{HotStuffMessage, Message, MessageCode, NewView, Prepare},
    round_state::{RoundSnapshot, RoundState},
    types::{ConsensusError, Phase, QuorumCert, Seal, Subject},
};

/// Parameters of the consensus core. Built from the replica's
/// [`Configuration`](crate::replica::Configuration).
#[derive(Clone, Debug)]
pub struct CoreConfiguration {
    pub request_timeout: Duration,
    pub block_period: Duration,
    pub leader_policy: LeaderPolicy,
    pub epoch_length: EpochLength,
    pub backlog_capacity: BufferSize,
}

/// A single validator's consensus state machine.
///
/// # Usage
///
/// `Core` is driven entirely through its input handlers, which are meant to be called from a single
/// thread (the [algorithm thread](crate::algorithm)):
/// 1. [`start`](Self::start): enter the first round.
/// 2. [`handle_request`](Self::handle_request): the local chain has a proposal ready.
/// 3. [`handle_message`](Self::handle_message): a message arrived from a validator (possibly this one).
/// 4. [`handle_timeout`](Self::handle_timeout): the timer of a round fired.
/// 5. [`handle_final_committed`](Self::handle_final_committed): the chain finished committing.
///
/// Handlers return a [`ConsensusError`] when they reject an input. Errors never leave `Core` in an
/// inconsistent state, so callers log them and carry on.
pub struct Core<B: Backend, S: Signer> {
    config: CoreConfiguration,
    backend: B,
    signer: S,
    address: Address,
    validator_set: ValidatorSet,
    current: RoundState,
    backlog: Backlog,
    timer: RoundTimer,
    started: bool,
    event_publisher: Option<Sender<Event>>,
}

impl<B: Backend, S: Signer> Core<B, S> {
    /// Create a validator that has not entered any round yet.
    pub fn new(
        config: CoreConfiguration,
        backend: B,
        signer: S,
        timer: RoundTimer,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        let mut validator_set = backend.validators();
        validator_set.set_policy(config.leader_policy);

        // Until the first round starts, pretend to be in round 0 of the last committed height.
        let (last_proposal, last_proposer) = backend.last_proposal();
        let seed = QuorumCert::seed(&last_proposal, last_proposer);
        let current = RoundState::new(
            View::new(last_proposal.height, Round::new(0)),
            &validator_set,
            seed,
        );

        let backlog = Backlog::new(config.backlog_capacity);
        let address = backend.address();

        Self {
            config,
            backend,
            signer,
            address,
            validator_set,
            current,
            backlog,
            timer,
            started: false,
            event_publisher,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn round_state(&self) -> &RoundState {
        &self.current
    }

    pub fn view(&self) -> View {
        self.current.view()
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of messages waiting in the backlog for a future view.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        self.current.snapshot(self.validator_set.proposer())
    }

    /// Enter the first round after the last committed height.
    pub fn start(&mut self) {
        self.start_new_round(Round::new(0))
    }

    /// Cancel the round timer.
    pub fn stop(&mut self) {
        self.timer.stop()
    }

    pub fn handle_input(&mut self, input: Input) -> Result<(), ConsensusError> {
        match input {
            Input::Request(request) => self.handle_request(request),
            Input::Message(payload) => self.handle_message(&payload),
            Input::Timeout(view) => {
                self.handle_timeout(view);
                Ok(())
            }
            Input::FinalCommitted => {
                self.handle_final_committed();
                Ok(())
            }
        }
    }

    /// Take `request` as the proposal to make whenever this validator is the proposer of a round at
    /// `request.height`.
    ///
    /// A request for a future height is kept too, but reported as a [`ConsensusError::FutureMessage`].
    pub fn handle_request(&mut self, request: Proposal) -> Result<(), ConsensusError> {
        let view = self.current.view();
        if request.height < view.height {
            return Err(ConsensusError::OldMessage);
        }
        if !request.is_correct() {
            return Err(ConsensusError::InvalidMessage);
        }

        let height = request.height;
        self.current.set_pending_request(request);
        if height > view.height {
            return Err(ConsensusError::FutureMessage);
        }
        self.try_propose()
    }

    /// Decode, authenticate, and handle an encoded [`Message`].
    pub fn handle_message(&mut self, payload: &[u8]) -> Result<(), ConsensusError> {
        let msg = Message::decode(payload)?;
        self.process_message(msg)
    }

    /// Move to the next round of the current height if `view` is still the current view.
    pub fn handle_timeout(&mut self, view: View) {
        if view != self.current.view() {
            log::debug!("Ignoring the timeout of {}, currently in {}.", view, self.current.view());
            return;
        }

        Event::RoundTimeout(RoundTimeoutEvent {
            timestamp: SystemTime::now(),
            view,
        })
        .publish(&self.event_publisher);

        self.start_new_round(view.round + 1)
    }

    /// The chain finished committing a proposal: move to the next height.
    pub fn handle_final_committed(&mut self) {
        self.start_new_round(Round::new(0))
    }

    /// Enter a new round.
    ///
    /// If the chain committed a proposal at or above the current height, this enters round 0 of the
    /// height after the chain's head, whatever `round` is. Otherwise it enters `round` of the current
    /// height, unless the validator is already in `round` or a later round.
    pub fn start_new_round(&mut self, round: Round) {
        let (last_proposal, last_proposer) = self.backend.last_proposal();
        let cur_view = self.current.view();

        let height_advance = last_proposal.height >= cur_view.height;
        let new_view = if height_advance {
            View::new(last_proposal.height + 1, Round::new(0))
        } else if round > cur_view.round {
            View::new(cur_view.height, round)
        } else {
            log::debug!("Not starting round {}, currently in {}.", round, cur_view);
            return;
        };

        // Refresh the validator set at epoch checkpoints.
        if height_advance
            && (!self.started || self.config.epoch_length.is_checkpoint(last_proposal.height))
        {
            self.validator_set = self.backend.validators();
            self.validator_set.set_policy(self.config.leader_policy);
        }
        self.validator_set.calc_proposer(&last_proposer, new_view.round);

        let mut next = self.current.spawn(new_view, &self.validator_set);
        if height_advance {
            // Certificates from heights the chain already committed are superseded by its head.
            next.reseed(QuorumCert::seed(&last_proposal, last_proposer));
            if next
                .pending_request()
                .is_some_and(|request| request.height < new_view.height)
            {
                next.take_pending_request();
            }
        }
        self.current = next;
        self.started = true;

        Event::StartRound(StartRoundEvent {
            timestamp: SystemTime::now(),
            view: new_view,
            proposer: self.validator_set.proposer().unwrap_or_default(),
        })
        .publish(&self.event_publisher);

        self.timer.arm(
            new_view,
            round_timeout(self.config.request_timeout, self.config.block_period, new_view.round),
        );

        self.send_new_view();
        self.process_backlog();
        if let Err(err) = self.try_propose() {
            log::warn!("Failed to propose in {}: {}", new_view, err);
        }
    }

    fn process_message(&mut self, msg: Message) -> Result<(), ConsensusError> {
        msg.verify(&self.signer, &self.validator_set)?;
        let payload = msg.payload()?;

        let view = payload.view();
        if let Err(err) = self.check_view(view) {
            if err == ConsensusError::FutureMessage {
                let code = msg.code;
                self.backlog.insert(view, msg);
                if code == MessageCode::NewView {
                    self.try_catch_up(view);
                }
            }
            return Err(err);
        }

        match payload {
            HotStuffMessage::NewView(new_view) => self.handle_new_view(msg, new_view),
            HotStuffMessage::Prepare(prepare) => self.handle_prepare(msg, prepare),
            HotStuffMessage::PrepareVote(subject) => self.handle_prepare_vote(msg, subject),
            HotStuffMessage::PreCommit(qc) => self.handle_pre_commit(msg, qc),
            HotStuffMessage::PreCommitVote(subject) => self.handle_pre_commit_vote(msg, subject),
            HotStuffMessage::Commit(qc) => self.handle_commit(msg, qc),
            HotStuffMessage::CommitVote(subject) => self.handle_commit_vote(msg, subject),
            HotStuffMessage::Decide(qc) => self.handle_decide(msg, qc),
        }
    }

    fn check_view(&self, view: View) -> Result<(), ConsensusError> {
        if view.height.int() == 0 {
            return Err(ConsensusError::InvalidMessage);
        }
        match view.cmp(&self.current.view()) {
            std::cmp::Ordering::Greater => Err(ConsensusError::FutureMessage),
            std::cmp::Ordering::Less => Err(ConsensusError::OldMessage),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }

    // Replay the backlogged messages of the current view.
    fn process_backlog(&mut self) {
        let view = self.current.view();
        for msg in self.backlog.take(view) {
            if let Err(err) = self.process_message(msg) {
                log_error(&err);
            }
        }
    }

    // Jump to a later round of the current height once more than F validators are already in it.
    //
    // NewViews are unicast to the proposer of their round, so only that round's proposer collects
    // them here. Every other validator reaches the round through its own round timer.
    fn try_catch_up(&mut self, view: View) {
        let cur_view = self.current.view();
        if view.height != cur_view.height || view.round <= cur_view.round {
            return;
        }
        if self.backlog.count_senders(view, MessageCode::NewView) > self.validator_set.f() {
            log::debug!("Catching up from {} to {}.", cur_view, view);
            self.start_new_round(view.round);
        }
    }

    fn handle_new_view(&mut self, msg: Message, new_view: NewView) -> Result<(), ConsensusError> {
        if !self.is_proposer() {
            return Err(ConsensusError::NotToProposer);
        }
        if new_view.high_qc.view >= new_view.view {
            return Err(ConsensusError::InvalidMessage);
        }
        self.verify_qc(&new_view.high_qc, MessageCode::PrepareVote)?;

        let origin = msg.sender;
        self.current.add_new_view(msg)?;
        Event::ReceiveNewView(ReceiveNewViewEvent {
            timestamp: SystemTime::now(),
            origin,
            new_view,
        })
        .publish(&self.event_publisher);

        if self.current.new_view_size() >= self.validator_set.q() {
            if let Some(highest) = self.current.highest_new_view_qc() {
                if highest.view > self.current.high_qc().view {
                    self.current.set_high_qc(highest);
                }
            }
            self.try_propose()?;
        }
        Ok(())
    }

    // Broadcast a Prepare if this validator is the proposer, holds a NewView quorum, has not proposed yet
    // in this round, and has something safe to propose.
    fn try_propose(&mut self) -> Result<(), ConsensusError> {
        if !self.is_proposer()
            || self.current.phase() != Phase::AcceptRequest
            || self.current.proposal().is_some()
            || self.current.new_view_size() < self.validator_set.q()
        {
            return Ok(());
        }

        let view = self.current.view();
        let high_qc = self.current.high_qc().clone();
        let proposal = if high_qc.view.height == view.height {
            // A proposal at this height was already prepared in an earlier round. Only it may be proposed.
            match self.current.prepared_proposal() {
                Some(prepared) if prepared.hash == high_qc.hash => prepared.clone(),
                _ => {
                    log::debug!("Cannot re-propose in {}: the prepared proposal is unknown.", view);
                    return Ok(());
                }
            }
        } else {
            match self.current.pending_request() {
                Some(request) if request.height == view.height && request.parent == high_qc.hash => {
                    request.clone()
                }
                _ => return Ok(()),
            }
        };

        self.current.set_proposal(proposal.clone());
        let prepare = Prepare {
            view,
            proposal,
            high_qc,
        };
        self.broadcast(&HotStuffMessage::Prepare(prepare.clone()))?;

        Event::Propose(ProposeEvent {
            timestamp: SystemTime::now(),
            prepare,
        })
        .publish(&self.event_publisher);

        Ok(())
    }

    fn handle_prepare(&mut self, msg: Message, prepare: Prepare) -> Result<(), ConsensusError> {
        if !self.validator_set.is_proposer(&msg.sender) {
            return Err(ConsensusError::NotFromProposer);
        }

        let proposal = &prepare.proposal;
        if proposal.height != prepare.view.height || !proposal.is_correct() {
            return Err(ConsensusError::InvalidMessage);
        }
        if let Some(accepted) = self.current.proposal() {
            if accepted.hash != proposal.hash {
                return Err(ConsensusError::InvalidMessage);
            }
        }
        if self.current.phase() > Phase::AcceptRequest {
            return Ok(());
        }

        Event::ReceiveProposal(ReceiveProposalEvent {
            timestamp: SystemTime::now(),
            origin: msg.sender,
            prepare: prepare.clone(),
        })
        .publish(&self.event_publisher);

        self.verify_qc(&prepare.high_qc, MessageCode::PrepareVote)?;

        // The proposal must extend the certificate it carries, or be the block that certificate certifies.
        if proposal.parent != prepare.high_qc.hash && proposal.hash != prepare.high_qc.hash {
            return Err(ConsensusError::ExtendError);
        }

        // SafeNode.
        let locked_qc = self.current.locked_qc();
        let extends_locked = proposal.parent == locked_qc.hash || proposal.hash == locked_qc.hash;
        if !extends_locked && prepare.high_qc.view < locked_qc.view {
            return Err(ConsensusError::SafeNodeFailed);
        }

        match self.backend.verify(proposal) {
            Ok(()) => (),
            Err(VerifyError::FutureBlock(delay)) => {
                self.timer.deliver_after(delay, Input::Message(msg.encode()));
                return Err(ConsensusError::FutureBlock(delay));
            }
            Err(VerifyError::Invalid(reason)) => {
                log::debug!("Chain rejected proposal {}: {}", proposal.hash, reason);
                return Err(ConsensusError::InvalidProposal);
            }
        }

        let subject = Subject::new(prepare.view, proposal.hash);
        self.current.set_proposal(prepare.proposal);
        self.current.set_high_qc(prepare.high_qc);
        self.send_vote(HotStuffMessage::PrepareVote, subject)
    }

    fn handle_prepare_vote(&mut self, msg: Message, subject: Subject) -> Result<(), ConsensusError> {
        self.check_vote(&subject)?;
        self.receive_vote(msg, subject)?;

        if self.current.prepare_vote_size() >= self.validator_set.q()
            && self.current.phase() < Phase::Prepared
        {
            let prepare_qc = QuorumCert::from_seals(
                subject.view,
                subject.digest,
                self.address,
                &self.current.prepare_vote_seals(),
            );
            self.current.set_prepare_qc(prepare_qc.clone());
            self.current.set_phase(Phase::Prepared);
            self.publish_collect_qc(MessageCode::PrepareVote, &prepare_qc);

            self.broadcast(&HotStuffMessage::PreCommit(prepare_qc))?;
        }
        Ok(())
    }

    fn handle_pre_commit(&mut self, msg: Message, prepare_qc: QuorumCert) -> Result<(), ConsensusError> {
        if !self.validator_set.is_proposer(&msg.sender) {
            return Err(ConsensusError::NotFromProposer);
        }
        let subject = match self.current.subject() {
            Some(subject) if subject == prepare_qc.subject() => subject,
            _ => return Err(ConsensusError::InconsistentPrepareQC),
        };
        self.verify_qc(&prepare_qc, MessageCode::PrepareVote)?;

        if self.current.phase() >= Phase::Locked {
            return Ok(());
        }
        self.current.set_prepare_qc(prepare_qc);
        self.current.set_phase(Phase::Prepared);

        self.send_vote(HotStuffMessage::PreCommitVote, subject)
    }

    fn handle_pre_commit_vote(&mut self, msg: Message, subject: Subject) -> Result<(), ConsensusError> {
        self.check_vote(&subject)?;
        self.receive_vote(msg, subject)?;

        if self.current.pre_commit_vote_size() >= self.validator_set.q()
            && self.current.phase() >= Phase::Prepared
            && self.current.phase() < Phase::Locked
        {
            let locked_qc = self.current.prepare_qc().clone();
            if self.current.set_locked_qc(locked_qc.clone()) {
                self.publish_update_locked_qc(&locked_qc);
            }
            self.current.set_phase(Phase::Locked);

            self.broadcast(&HotStuffMessage::Commit(locked_qc))?;
        }
        Ok(())
    }

    fn handle_commit(&mut self, msg: Message, locked_qc: QuorumCert) -> Result<(), ConsensusError> {
        if !self.validator_set.is_proposer(&msg.sender) {
            return Err(ConsensusError::NotFromProposer);
        }
        if self.current.phase() < Phase::Prepared || locked_qc != *self.current.prepare_qc() {
            return Err(ConsensusError::InconsistentLockedQC);
        }
        self.verify_qc(&locked_qc, MessageCode::PrepareVote)?;

        if self.current.phase() >= Phase::PreCommitted {
            return Ok(());
        }
        let subject = locked_qc.subject();
        if self.current.set_locked_qc(locked_qc.clone()) {
            self.publish_update_locked_qc(&locked_qc);
        }
        self.current.set_phase(Phase::Locked);

        self.send_vote(HotStuffMessage::CommitVote, subject)?;
        self.current.set_phase(Phase::PreCommitted);
        Ok(())
    }

    fn handle_commit_vote(&mut self, msg: Message, subject: Subject) -> Result<(), ConsensusError> {
        self.check_vote(&subject)?;
        self.receive_vote(msg, subject)?;

        if self.current.commit_vote_size() >= self.validator_set.q()
            && self.current.phase() >= Phase::Locked
            && self.current.phase() < Phase::Committed
        {
            let seals = self.current.commit_vote_seals();
            let committed_qc =
                QuorumCert::from_seals(subject.view, subject.digest, self.address, &seals);
            self.current.set_committed_qc(committed_qc.clone());
            self.current.set_phase(Phase::Committed);
            self.publish_collect_qc(MessageCode::CommitVote, &committed_qc);

            // Replicas commit on the Decide even if the local chain failed to.
            let committed = self.commit_proposal(&seals);
            self.gossip(&HotStuffMessage::Decide(committed_qc))?;
            committed?;
        }
        Ok(())
    }

    fn handle_decide(&mut self, msg: Message, committed_qc: QuorumCert) -> Result<(), ConsensusError> {
        if !self.validator_set.is_proposer(&msg.sender) {
            return Err(ConsensusError::NotFromProposer);
        }
        match self.current.subject() {
            Some(subject) if subject == committed_qc.subject() => (),
            _ => return Err(ConsensusError::InconsistentCommittedQC),
        }
        self.verify_qc(&committed_qc, MessageCode::CommitVote)?;

        if self.current.phase() >= Phase::Committed {
            return Ok(());
        }
        let seals = committed_qc.seals()?;
        self.current.set_committed_qc(committed_qc);
        self.current.set_phase(Phase::Committed);

        self.commit_proposal(&seals)
    }

    fn commit_proposal(&mut self, seals: &[Seal]) -> Result<(), ConsensusError> {
        let proposal = self
            .current
            .proposal()
            .cloned()
            .ok_or(ConsensusError::InvalidProposal)?;
        let sealed = self.backend.pre_commit(&proposal, seals)?;
        let (block, height) = (sealed.hash, sealed.height);
        self.backend.commit(sealed)?;

        Event::CommitBlock(CommitBlockEvent {
            timestamp: SystemTime::now(),
            block,
            height,
        })
        .publish(&self.event_publisher);
        Ok(())
    }

    // Votes are only for the proposer, and only for the proposal it made in this round.
    fn check_vote(&self, subject: &Subject) -> Result<(), ConsensusError> {
        if !self.is_proposer() {
            return Err(ConsensusError::NotToProposer);
        }
        match self.current.subject() {
            Some(expected) if expected == *subject => Ok(()),
            _ => Err(ConsensusError::InconsistentVote),
        }
    }

    fn receive_vote(&mut self, msg: Message, subject: Subject) -> Result<(), ConsensusError> {
        let (origin, code) = (msg.sender, msg.code);
        match code {
            MessageCode::PrepareVote => self.current.add_prepare_vote(msg)?,
            MessageCode::PreCommitVote => self.current.add_pre_commit_vote(msg)?,
            MessageCode::CommitVote => self.current.add_commit_vote(msg)?,
            _ => return Err(ConsensusError::InvalidMessage),
        }

        Event::ReceiveVote(ReceiveVoteEvent {
            timestamp: SystemTime::now(),
            origin,
            code,
            subject,
        })
        .publish(&self.event_publisher);
        Ok(())
    }

    // Certificates without seals are only trusted if they certify the head of the local chain. All
    // others must carry a quorum of `expected` votes.
    fn verify_qc(&self, qc: &QuorumCert, expected: MessageCode) -> Result<(), ConsensusError> {
        if qc.is_seed() {
            let (last_proposal, _) = self.backend.last_proposal();
            return if qc.hash == last_proposal.hash && qc.view.height == last_proposal.height {
                Ok(())
            } else {
                Err(ConsensusError::VerifyQCError)
            };
        }
        qc.verify(expected, &self.validator_set, &self.signer)
    }

    fn send_new_view(&mut self) {
        let new_view = NewView {
            view: self.current.view(),
            high_qc: self.current.prepare_qc().clone(),
        };
        match self.unicast(&HotStuffMessage::NewView(new_view.clone())) {
            Ok(()) => Event::NewView(NewViewEvent {
                timestamp: SystemTime::now(),
                new_view,
            })
            .publish(&self.event_publisher),
            Err(err) => log::warn!("Failed to send NewView for {}: {}", new_view.view, err),
        }
    }

    fn send_vote(
        &mut self,
        vote: fn(Subject) -> HotStuffMessage,
        subject: Subject,
    ) -> Result<(), ConsensusError> {
        let msg = vote(subject);
        let code = msg.code();
        self.unicast(&msg)?;

        Event::Vote(VoteEvent {
            timestamp: SystemTime::now(),
            code,
            subject,
        })
        .publish(&self.event_publisher);
        Ok(())
    }

    fn broadcast(&mut self, msg: &HotStuffMessage) -> Result<(), ConsensusError> {
        let payload = Message::new(&self.signer, msg).encode();
        Ok(self.backend.broadcast(&self.validator_set, payload)?)
    }

    fn gossip(&mut self, msg: &HotStuffMessage) -> Result<(), ConsensusError> {
        let payload = Message::new(&self.signer, msg).encode();
        Ok(self.backend.gossip(&self.validator_set, payload)?)
    }

    fn unicast(&mut self, msg: &HotStuffMessage) -> Result<(), ConsensusError> {
        let payload = Message::new(&self.signer, msg).encode();
        Ok(self.backend.unicast(&self.validator_set, payload)?)
    }

    fn is_proposer(&self) -> bool {
        self.validator_set.is_proposer(&self.address)
    }

    fn publish_collect_qc(&self, code: MessageCode, quorum_cert: &QuorumCert) {
        Event::CollectQC(CollectQCEvent {
            timestamp: SystemTime::now(),
            code,
            quorum_cert: quorum_cert.clone(),
        })
        .publish(&self.event_publisher)
    }

    fn publish_update_locked_qc(&self, locked_qc: &QuorumCert) {
        Event::UpdateLockedQC(UpdateLockedQCEvent {
            timestamp: SystemTime::now(),
            locked_qc: locked_qc.clone(),
        })
        .publish(&self.event_publisher)
    }
}

/// Log a rejected input: stale and early inputs at `debug`, everything else at `warn`.
pub(crate) fn log_error(err: &ConsensusError) {
    if err.is_benign() {
        log::debug!("Input not handled: {}", err)
    } else {
        log::warn!("Input rejected: {}", err)
    }
}
