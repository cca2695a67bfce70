/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Subprotocol for committing proposals, one height at a time.
//!
//! Each height is decided by the four-phase HotStuff protocol: a proposal goes through a "prepare",
//! "pre-commit", "commit", and "decide" phase, each driven by the proposer of the round collecting a
//! quorum of votes from the validators and broadcasting the resulting certificate. If a round fails, a
//! new round of the same height starts with a (possibly) different proposer, and the validators' locks
//! guarantee that no two different proposals are ever committed at the same height.
//!
//! The [`implementation`] module has the state machine. The rest of the modules define the types it
//! works with:
//! - [`messages`]: the signed envelope, and the eight kinds of message it can carry.
//! - [`types`]: phases, vote subjects, quorum certificates, and the error type.
//! - [`round_state`]: everything a validator knows about the current round.
//! - [`message_set`]: per-round, per-sender collections of messages.
//! - [`backlog`]: messages for future views, held until the validator reaches those views.

pub mod backlog;

pub mod implementation;

pub mod message_set;

pub mod messages;

pub mod round_state;

pub mod types;
