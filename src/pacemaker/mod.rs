/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Round-change timeouts.
//!
//! A round can only succeed if a quorum of validators spend long enough in it to go through all four
//! phases. If the proposer is faulty or the network is slow, the round's timer fires, and the validator
//! moves on to the next round of the same height. Timeouts grow exponentially with the round number,
//! so that validators whose rounds drifted apart eventually overlap in the same round for long enough.
//!
//! ## Timer semantics
//!
//! A validator has at most one live timer. [`RoundTimer::arm`] cancels the previous timer before arming
//! the next one, and [`RoundTimer::stop`] cancels it for good. Cancellation is best-effort: a timer that
//! fired just before it was cancelled still delivers its [`Input::Timeout`], which is why
//! [`Core`](crate::hotstuff::implementation::Core) ignores timeouts for any view but the current one.

use std::{
    cmp::min,
    convert::identity,
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use crate::{
    algorithm::Input,
    types::data_types::{Round, View},
};

/// Duration of `round`:
/// - Round 0: `request_timeout + block_period`.
/// - Round `r > 0`: `request_timeout + 2^r` seconds.
///
/// # Safety
///
/// `request_timeout` and `block_period` must not be larger than [u32::MAX] seconds. The exponential part
/// is capped at [u32::MAX] seconds, so the sum cannot overflow a [`Duration`].
pub fn round_timeout(request_timeout: Duration, block_period: Duration, round: Round) -> Duration {
    if round.int() == 0 {
        return request_timeout + block_period;
    }
    let exp = min(u32::MAX as u64, round.int()) as u32;
    request_timeout + Duration::new(u32::checked_pow(2, exp).map_or(u32::MAX, identity) as u64, 0)
}

/// Delivers [`Input::Timeout`]s (and delayed inputs) into the algorithm thread's input channel.
pub struct RoundTimer {
    inputs: Sender<Input>,
    cancel: Option<Sender<()>>,
}

impl RoundTimer {
    /// Create a timer that delivers into `inputs`. No timer is armed yet.
    pub fn new(inputs: Sender<Input>) -> Self {
        Self {
            inputs,
            cancel: None,
        }
    }

    /// Cancel the live timer, if any, and arm a timer that delivers `Timeout(view)` after `timeout`.
    pub fn arm(&mut self, view: View, timeout: Duration) {
        let (cancel, cancelled) = mpsc::channel::<()>();
        // Dropping the previous sender wakes the previous timer thread up with `Disconnected`.
        self.cancel = Some(cancel);

        let inputs = self.inputs.clone();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(timeout) {
                let _ = inputs.send(Input::Timeout(view));
            }
        });
    }

    /// Cancel the live timer, if any.
    pub fn stop(&mut self) {
        self.cancel = None;
    }

    /// Deliver `input` after `delay`. Not affected by [`arm`](Self::arm) or [`stop`](Self::stop).
    pub fn deliver_after(&self, delay: Duration, input: Input) {
        let inputs = self.inputs.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = inputs.send(input);
        });
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.stop()
    }
}
