/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events the consensus core emits, for event handling and logging.
//!
//! An event indicates that the action it names has been completed. Events are published by the
//! algorithm thread on a channel and passed to handlers by the [event bus](crate::event_bus) thread, so
//! slow handlers never hold consensus up.
//!
//! Handlers are registered with the optional `on_*` setters of
//! [`ReplicaSpec`](crate::replica::ReplicaSpec). If
//! [`log_events`](crate::replica::Configuration::log_events) is set, the default
//! [loggers](crate::logging) are registered too.

use std::{sync::mpsc::Sender, time::SystemTime};

use crate::{
    hotstuff::{
        messages::{MessageCode, NewView, Prepare},
        types::{QuorumCert, Subject},
    },
    types::data_types::{Address, BlockHeight, CryptoHash, View},
};

pub enum Event {
    // Events that change the round.
    StartRound(StartRoundEvent),
    RoundTimeout(RoundTimeoutEvent),
    // Events that involve sending a message.
    Propose(ProposeEvent),
    Vote(VoteEvent),
    NewView(NewViewEvent),
    // Events that involve receiving a message.
    ReceiveProposal(ReceiveProposalEvent),
    ReceiveVote(ReceiveVoteEvent),
    ReceiveNewView(ReceiveNewViewEvent),
    // Events that change the certificates or the chain.
    CollectQC(CollectQCEvent),
    UpdateLockedQC(UpdateLockedQCEvent),
    CommitBlock(CommitBlockEvent),
}

impl Event {
    /// Send the event to the event bus, if there is one.
    ///
    /// A publisher whose event bus has already shut down drops the event.
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(self);
        }
    }
}

/// The validator entered `view`, in which `proposer` proposes.
pub struct StartRoundEvent {
    pub timestamp: SystemTime,
    pub view: View,
    pub proposer: Address,
}

/// The timer of `view` fired before the view was left.
pub struct RoundTimeoutEvent {
    pub timestamp: SystemTime,
    pub view: View,
}

/// The validator, as the proposer of the round, broadcast a `Prepare`.
pub struct ProposeEvent {
    pub timestamp: SystemTime,
    pub prepare: Prepare,
}

/// The validator sent a vote of kind `code` to the proposer.
pub struct VoteEvent {
    pub timestamp: SystemTime,
    pub code: MessageCode,
    pub subject: Subject,
}

/// The validator sent a `NewView` to the proposer of the round it entered.
pub struct NewViewEvent {
    pub timestamp: SystemTime,
    pub new_view: NewView,
}

pub struct ReceiveProposalEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub prepare: Prepare,
}

pub struct ReceiveVoteEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub code: MessageCode,
    pub subject: Subject,
}

pub struct ReceiveNewViewEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub new_view: NewView,
}

/// The validator, as the proposer of the round, formed a certificate out of votes of kind `code`.
pub struct CollectQCEvent {
    pub timestamp: SystemTime,
    pub code: MessageCode,
    pub quorum_cert: QuorumCert,
}

pub struct UpdateLockedQCEvent {
    pub timestamp: SystemTime,
    pub locked_qc: QuorumCert,
}

/// The proposal with hash `block` was handed to the chain for commit.
pub struct CommitBlockEvent {
    pub timestamp: SystemTime,
    pub block: CryptoHash,
    pub height: BlockHeight,
}
