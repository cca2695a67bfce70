/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A Rust implementation of the four-phase HotStuff Byzantine Fault Tolerant consensus protocol.
//!
//! A set of `N` validators decides, one height at a time, on the proposal to append to a shared chain.
//! As long as at most `F = ceil(N/3) - 1` of them are faulty, no two honest validators ever commit
//! different proposals at the same height, and once the network is timely, every height is eventually
//! decided.
//!
//! ## Getting started
//!
//! The library user provides a [Backend](backend::Backend), which stands in for the chain being
//! extended and the network the validators talk to each other through, and a
//! [Signer](types::crypto_primitives::Signer). A [ReplicaSpec](replica::ReplicaSpec) bundles these
//! with a [Configuration](replica::Configuration), and starting it yields a running
//! [Replica](replica::Replica).
//!
//! ## Module map
//!
//! - [`hotstuff`]: the consensus state machine and the types it works with.
//! - [`pacemaker`]: round timeouts.
//! - [`algorithm`]: the thread that drives the state machine.
//! - [`events`] and [`logging`]: what the replica reports about its progress.
//! - [`types`]: the data types shared by all of the above.

pub mod algorithm;

pub mod backend;

pub(crate) mod event_bus;

pub mod events;

pub mod hotstuff;

pub mod logging;

pub mod pacemaker;

pub mod replica;

pub mod types;
