/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The event bus thread, which passes the [events](crate::events) published by the algorithm thread
//! to the registered handlers.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

#[derive(Default)]
pub(crate) struct EventHandlers {
    pub(crate) start_round_handlers: Vec<HandlerPtr<StartRoundEvent>>,
    pub(crate) round_timeout_handlers: Vec<HandlerPtr<RoundTimeoutEvent>>,
    pub(crate) propose_handlers: Vec<HandlerPtr<ProposeEvent>>,
    pub(crate) vote_handlers: Vec<HandlerPtr<VoteEvent>>,
    pub(crate) new_view_handlers: Vec<HandlerPtr<NewViewEvent>>,
    pub(crate) receive_proposal_handlers: Vec<HandlerPtr<ReceiveProposalEvent>>,
    pub(crate) receive_vote_handlers: Vec<HandlerPtr<ReceiveVoteEvent>>,
    pub(crate) receive_new_view_handlers: Vec<HandlerPtr<ReceiveNewViewEvent>>,
    pub(crate) collect_qc_handlers: Vec<HandlerPtr<CollectQCEvent>>,
    pub(crate) update_locked_qc_handlers: Vec<HandlerPtr<UpdateLockedQCEvent>>,
    pub(crate) commit_block_handlers: Vec<HandlerPtr<CommitBlockEvent>>,
}

// Push the default logger of `$event` (if logging is on) and the user's handler (if any) into `$handlers`.
macro_rules! register {
    ($handlers:expr, $log_events:expr, $event:ty, $user_handler:expr) => {
        if $log_events {
            $handlers.push(<$event>::get_logger());
        }
        if let Some(handler) = $user_handler {
            $handlers.push(handler);
        }
    };
}

impl EventHandlers {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        start_round_handler: Option<HandlerPtr<StartRoundEvent>>,
        round_timeout_handler: Option<HandlerPtr<RoundTimeoutEvent>>,
        propose_handler: Option<HandlerPtr<ProposeEvent>>,
        vote_handler: Option<HandlerPtr<VoteEvent>>,
        new_view_handler: Option<HandlerPtr<NewViewEvent>>,
        receive_proposal_handler: Option<HandlerPtr<ReceiveProposalEvent>>,
        receive_vote_handler: Option<HandlerPtr<ReceiveVoteEvent>>,
        receive_new_view_handler: Option<HandlerPtr<ReceiveNewViewEvent>>,
        collect_qc_handler: Option<HandlerPtr<CollectQCEvent>>,
        update_locked_qc_handler: Option<HandlerPtr<UpdateLockedQCEvent>>,
        commit_block_handler: Option<HandlerPtr<CommitBlockEvent>>,
    ) -> EventHandlers {
        let mut handlers = EventHandlers::default();

        register!(handlers.start_round_handlers, log_events, StartRoundEvent, start_round_handler);
        register!(handlers.round_timeout_handlers, log_events, RoundTimeoutEvent, round_timeout_handler);
        register!(handlers.propose_handlers, log_events, ProposeEvent, propose_handler);
        register!(handlers.vote_handlers, log_events, VoteEvent, vote_handler);
        register!(handlers.new_view_handlers, log_events, NewViewEvent, new_view_handler);
        register!(handlers.receive_proposal_handlers, log_events, ReceiveProposalEvent, receive_proposal_handler);
        register!(handlers.receive_vote_handlers, log_events, ReceiveVoteEvent, receive_vote_handler);
        register!(handlers.receive_new_view_handlers, log_events, ReceiveNewViewEvent, receive_new_view_handler);
        register!(handlers.collect_qc_handlers, log_events, CollectQCEvent, collect_qc_handler);
        register!(handlers.update_locked_qc_handlers, log_events, UpdateLockedQCEvent, update_locked_qc_handler);
        register!(handlers.commit_block_handlers, log_events, CommitBlockEvent, commit_block_handler);

        handlers
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.start_round_handlers.is_empty()
            && self.round_timeout_handlers.is_empty()
            && self.propose_handlers.is_empty()
            && self.vote_handlers.is_empty()
            && self.new_view_handlers.is_empty()
            && self.receive_proposal_handlers.is_empty()
            && self.receive_vote_handlers.is_empty()
            && self.receive_new_view_handlers.is_empty()
            && self.collect_qc_handlers.is_empty()
            && self.update_locked_qc_handlers.is_empty()
            && self.commit_block_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::StartRound(start_round_event) => self
                .start_round_handlers
                .iter()
                .for_each(|handler| handler(&start_round_event)),

            Event::RoundTimeout(round_timeout_event) => self
                .round_timeout_handlers
                .iter()
                .for_each(|handler| handler(&round_timeout_event)),

            Event::Propose(propose_event) => self
                .propose_handlers
                .iter()
                .for_each(|handler| handler(&propose_event)),

            Event::Vote(vote_event) => self
                .vote_handlers
                .iter()
                .for_each(|handler| handler(&vote_event)),

            Event::NewView(new_view_event) => self
                .new_view_handlers
                .iter()
                .for_each(|handler| handler(&new_view_event)),

            Event::ReceiveProposal(receive_proposal_event) => self
                .receive_proposal_handlers
                .iter()
                .for_each(|handler| handler(&receive_proposal_event)),

            Event::ReceiveVote(receive_vote_event) => self
                .receive_vote_handlers
                .iter()
                .for_each(|handler| handler(&receive_vote_event)),

            Event::ReceiveNewView(receive_new_view_event) => self
                .receive_new_view_handlers
                .iter()
                .for_each(|handler| handler(&receive_new_view_event)),

            Event::CollectQC(collect_qc_event) => self
                .collect_qc_handlers
                .iter()
                .for_each(|handler| handler(&collect_qc_event)),

            Event::UpdateLockedQC(update_locked_qc_event) => self
                .update_locked_qc_handlers
                .iter()
                .for_each(|handler| handler(&update_locked_qc_event)),

            Event::CommitBlock(commit_block_event) => self
                .commit_block_handlers
                .iter()
                .for_each(|handler| handler(&commit_block_event)),
        }
    }
}

/// Start the event bus thread, which polls `event_subscriber` and fires the matching handlers until
/// `shutdown_signal` fires or the algorithm thread goes away.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
