/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run a replica.
//!
//! A replica is one validator taking part in consensus. Its key components are:
//! - The builder-pattern interface to construct a [specification of the replica](ReplicaSpec) with:
//!   1. `ReplicaSpec::builder` to construct a `ReplicaSpecBuilder`,
//!   2. The setters of the `ReplicaSpecBuilder`, and
//!   3. The `ReplicaSpecBuilder::build` method to construct a [ReplicaSpec],
//! - The function to [start](ReplicaSpec::start) a [Replica] given its specification,
//! - [The type](Replica) which keeps the replica alive, and through which inputs are fed to it.
//!
//! ## Inputs
//!
//! A replica reacts to [inputs](crate::algorithm::Input) sent on a single channel. The library user
//! creates that channel, hands the receiving end to the replica, and keeps a sender in their
//! [backend](crate::backend::Backend) to deliver messages from the network and commit notifications.
//! [`Replica`] wraps another sender for convenience.
//!
//! ## Starting a replica
//!
//! Here is an example that demonstrates how to build and start running a replica using the builder
//! pattern:
//!
//! ```ignore
//! let (input_sender, input_receiver) = mpsc::channel();
//! let replica =
//!     ReplicaSpec::builder()
//!     .backend(backend)
//!     .signer(signer)
//!     .configuration(configuration)
//!     .input_sender(input_sender)
//!     .input_receiver(input_receiver)
//!     .on_commit_block(commit_handler)
//!     .build()
//!     .start();
//! ```
//!
//! ### Required setters
//!
//! - `.backend(...)`
//! - `.signer(...)`
//! - `.configuration(...)`
//! - `.input_sender(...)`
//! - `.input_receiver(...)`
//!
//! ### Optional setters
//!
//! The optional setters are for registering user-defined event handlers for events from [crate::events]:
//! - `.on_start_round(...)`
//! - `.on_round_timeout(...)`
//! - `.on_propose(...)`
//! - `.on_vote(...)`
//! - `.on_new_view(...)`
//! - `.on_receive_proposal(...)`
//! - `.on_receive_vote(...)`
//! - `.on_receive_new_view(...)`
//! - `.on_collect_qc(...)`
//! - `.on_update_locked_qc(...)`
//! - `.on_commit_block(...)`
//!
//! The replica's [configuration](Configuration) can also be defined using the builder pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .request_timeout(Duration::from_secs(3))
//!     .block_period(Duration::from_secs(1))
//!     .leader_policy(LeaderPolicy::RoundRobin)
//!     .log_events(true)
//!     .build();
//! ```

use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::JoinHandle,
    time::Duration,
};

use typed_builder::TypedBuilder;

use crate::{
    algorithm::{start_algorithm, Input},
    backend::Backend,
    event_bus::*,
    events::*,
    hotstuff::{
        implementation::{Core, CoreConfiguration},
        round_state::RoundStateCamera,
    },
    pacemaker::RoundTimer,
    types::{
        crypto_primitives::Signer,
        data_types::{BufferSize, EpochLength},
        proposal::Proposal,
        validator_set::LeaderPolicy,
    },
};

/// Stores the user-defined parameters required to start the replica, that is:
/// 1. The request timeout, the base duration of every round.
/// 2. The block period, added to the duration of round 0 of every height.
/// 3. The [leader policy](LeaderPolicy), which decides the proposer of each round.
/// 4. The epoch length: the validator set is re-read from the backend after committing every height
///    that is a multiple of it. 0 (the default) means it is only read at startup.
/// 5. The backlog capacity, the maximum number of messages for future views held per sender.
/// 6. The "Log Events" flag, if set to "true" then logs should be printed.
///
/// ## Round durations
///
/// Round 0 lasts `request_timeout + block_period`, and round `r > 0` lasts `request_timeout + 2^r`
/// seconds. Both durations must be "well below" [u32::MAX] seconds.
///
/// ## Log Events
///
/// This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.request_timeout(...)`
    - `.block_period(...)`
    - `.log_events(...)`

    Optional:
    - `.leader_policy(...)`
    - `.epoch_length(...)`
    - `.backlog_capacity(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the base duration of every round. Required."))]
    pub request_timeout: Duration,
    #[builder(setter(doc = "Set the extra duration of round 0 of every height. Required."))]
    pub block_period: Duration,
    #[builder(default, setter(doc = "Set the policy that picks the proposer of each round. Defaults to round robin."))]
    pub leader_policy: LeaderPolicy,
    #[builder(default = EpochLength::new(0), setter(doc = "Set the number of heights between validator set refreshes. Defaults to 0 (never)."))]
    pub epoch_length: EpochLength,
    #[builder(default, setter(doc = "Set the maximum number of future messages held per sender. Defaults to 64."))]
    pub backlog_capacity: BufferSize,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

impl From<Configuration> for CoreConfiguration {
    fn from(config: Configuration) -> Self {
        CoreConfiguration {
            request_timeout: config.request_timeout,
            block_period: config.block_period,
            leader_policy: config.leader_policy,
            epoch_length: config.epoch_length,
            backlog_capacity: config.backlog_capacity,
        }
    }
}

/// Stores all necessary parameters and trait implementations required to run the [Replica].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ReplicaSpec]. On the builder call the following methods to construct a valid [ReplicaSpec].

    Required:
    - `.backend(...)`
    - `.signer(...)`
    - `.configuration(...)`
    - `.input_sender(...)`
    - `.input_receiver(...)`

    Optional:
    - `.on_start_round(...)`
    - `.on_round_timeout(...)`
    - `.on_propose(...)`
    - `.on_vote(...)`
    - `.on_new_view(...)`
    - `.on_receive_proposal(...)`
    - `.on_receive_vote(...)`
    - `.on_receive_new_view(...)`
    - `.on_collect_qc(...)`
    - `.on_update_locked_qc(...)`
    - `.on_commit_block(...)`
"))]
pub struct ReplicaSpec<B: Backend + 'static, S: Signer + 'static> {
    // Required parameters
    #[builder(setter(doc = "Set the chain and network the replica works with. The argument must implement the [Backend](crate::backend::Backend) trait. Required."))]
    backend: B,
    #[builder(setter(doc = "Set the signer the replica signs its messages with. The argument must implement the [Signer](crate::types::crypto_primitives::Signer) trait. Required."))]
    signer: S,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the necessary parameters to run a replica. Required."))]
    configuration: Configuration,
    #[builder(setter(doc = "Set a sender into the replica's input channel, used by the round timer. Required."))]
    input_sender: Sender<Input>,
    #[builder(setter(doc = "Set the receiving end of the replica's input channel. Required."))]
    input_receiver: Receiver<Input>,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&StartRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StartRoundEvent>),
    doc = "Register a user-defined event handler for [StartRoundEvent]. Optional."))]
    on_start_round: Option<HandlerPtr<StartRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RoundTimeoutEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RoundTimeoutEvent>),
    doc = "Register a user-defined event handler for [RoundTimeoutEvent]. Optional."))]
    on_round_timeout: Option<HandlerPtr<RoundTimeoutEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeEvent>),
    doc = "Register a user-defined event handler for [ProposeEvent]. Optional."))]
    on_propose: Option<HandlerPtr<ProposeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&VoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<VoteEvent>),
    doc = "Register a user-defined event handler for [VoteEvent]. Optional."))]
    on_vote: Option<HandlerPtr<VoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NewViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<NewViewEvent>),
    doc = "Register a user-defined event handler for [NewViewEvent]. Optional."))]
    on_new_view: Option<HandlerPtr<NewViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveProposalEvent>),
    doc = "Register a user-defined event handler for [ReceiveProposalEvent]. Optional."))]
    on_receive_proposal: Option<HandlerPtr<ReceiveProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveVoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveVoteEvent>),
    doc = "Register a user-defined event handler for [ReceiveVoteEvent]. Optional."))]
    on_receive_vote: Option<HandlerPtr<ReceiveVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveNewViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveNewViewEvent>),
    doc = "Register a user-defined event handler for [ReceiveNewViewEvent]. Optional."))]
    on_receive_new_view: Option<HandlerPtr<ReceiveNewViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CollectQCEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CollectQCEvent>),
    doc = "Register a user-defined event handler for [CollectQCEvent]. Optional."))]
    on_collect_qc: Option<HandlerPtr<CollectQCEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateLockedQCEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UpdateLockedQCEvent>),
    doc = "Register a user-defined event handler for [UpdateLockedQCEvent]. Optional."))]
    on_update_locked_qc: Option<HandlerPtr<UpdateLockedQCEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CommitBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CommitBlockEvent>),
    doc = "Register a user-defined event handler for [CommitBlockEvent]. Optional."))]
    on_commit_block: Option<HandlerPtr<CommitBlockEvent>>,
}

impl<B: Backend + 'static, S: Signer + 'static> ReplicaSpec<B, S> {
    /// Starts the algorithm thread (and, if any handlers are registered, the event bus thread), and
    /// returns the handles to them in a [Replica] struct.
    pub fn start(self) -> Replica {
        let log_events = self.configuration.log_events;
        let event_handlers = EventHandlers::new(
            log_events,
            self.on_start_round,
            self.on_round_timeout,
            self.on_propose,
            self.on_vote,
            self.on_new_view,
            self.on_receive_proposal,
            self.on_receive_vote,
            self.on_receive_new_view,
            self.on_collect_qc,
            self.on_update_locked_qc,
            self.on_commit_block,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let timer = RoundTimer::new(self.input_sender.clone());
        let core = Core::new(
            self.configuration.into(),
            self.backend,
            self.signer,
            timer,
            event_publisher,
        );
        let camera = RoundStateCamera::new(core.snapshot());

        let (algorithm_shutdown, algorithm_shutdown_receiver) = mpsc::channel();
        let algorithm = start_algorithm(
            core,
            self.input_receiver,
            camera.clone(),
            algorithm_shutdown_receiver,
        );

        let (event_bus, event_bus_shutdown) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus = start_event_bus(
                    event_handlers,
                    event_subscriber,
                    event_bus_shutdown_receiver,
                );
                (Some(event_bus), Some(event_bus_shutdown))
            }
            None => (None, None),
        };

        Replica {
            camera,
            input_sender: self.input_sender,
            algorithm: Some(algorithm),
            algorithm_shutdown,
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// A handle to the background threads of a replica. When this value is dropped, all background threads
/// are gracefully shut down.
pub struct Replica {
    camera: RoundStateCamera,
    input_sender: Sender<Input>,
    algorithm: Option<JoinHandle<()>>,
    algorithm_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl Replica {
    /// Ask the replica to propose `request` when it is the proposer of a round at `request.height`.
    pub fn submit_request(&self, request: Proposal) {
        self.send(Input::Request(request))
    }

    /// Hand an encoded message received from the network to the replica.
    pub fn deliver(&self, payload: Vec<u8>) {
        self.send(Input::Message(payload))
    }

    /// Tell the replica that the chain finished committing the last decided proposal.
    pub fn notify_final_committed(&self) {
        self.send(Input::FinalCommitted)
    }

    /// Returns a [camera](RoundStateCamera) which can be used to peek into the replica's current round.
    pub fn round_state_camera(&self) -> &RoundStateCamera {
        &self.camera
    }

    // The algorithm thread only goes away when the replica is dropped, so a failed send can be ignored.
    fn send(&self, input: Input) {
        let _ = self.input_sender.send(input);
    }
}

impl Drop for Replica {
    fn drop(&mut self) {
        // The algorithm thread publishes into the event bus, so it is shut down first.
        let _ = self.algorithm_shutdown.send(());
        if let Some(algorithm) = self.algorithm.take() {
            let _ = algorithm.join();
        }

        self.event_bus_shutdown.iter().for_each(|shutdown| {
            let _ = shutdown.send(());
        });
        if let Some(event_bus) = self.event_bus.take() {
            let _ = event_bus.join();
        }
    }
}
