/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The algorithm thread, which owns the [`Core`] and feeds it every input the replica receives.
//!
//! Everything that can change the consensus state arrives on a single channel of [`Input`]s: requests
//! from the chain, messages from the network, round timeouts, and commit notifications. The thread
//! handles them one at a time, so `Core` never has to deal with concurrent access. After every input,
//! the thread refreshes the [`RoundStateCamera`] that other threads read the round state through.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    backend::Backend,
    hotstuff::{
        implementation::{log_error, Core},
        round_state::RoundStateCamera,
    },
    types::{crypto_primitives::Signer, data_types::View, proposal::Proposal},
};

/// Everything the consensus core reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A proposal the chain would like this validator to propose.
    Request(Proposal),
    /// An encoded [`Message`](crate::hotstuff::messages::Message) from a validator.
    Message(Vec<u8>),
    /// The round timer of `View` fired.
    Timeout(View),
    /// The chain finished committing the last decided proposal.
    FinalCommitted,
}

/// Start the algorithm thread. The thread enters the first round right away, and runs until
/// `shutdown_signal` fires or every sender of `inputs` is dropped.
pub(crate) fn start_algorithm<B: Backend + 'static, S: Signer + 'static>(
    mut core: Core<B, S>,
    inputs: Receiver<Input>,
    camera: RoundStateCamera,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        core.start();
        camera.update(core.snapshot());

        loop {
            match shutdown_signal.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => (),
            }

            match inputs.recv_timeout(Duration::from_millis(100)) {
                Ok(input) => {
                    if let Err(err) = core.handle_input(input) {
                        log_error(&err);
                    }
                    camera.update(core.snapshot());
                }
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        core.stop();
    })
}
