use std::{sync::mpsc, time::Duration};

use hotstuff_bft::{
    algorithm::Input,
    pacemaker::{round_timeout, RoundTimer},
    types::data_types::{BlockHeight, Round, View},
};

#[test]
fn round_timeout_test() {
    let request_timeout = Duration::from_millis(3000);
    let block_period = Duration::from_secs(1);

    assert_eq!(round_timeout(request_timeout, block_period, Round::new(0)), Duration::from_secs(4));
    assert_eq!(round_timeout(request_timeout, block_period, Round::new(1)), Duration::from_secs(5));
    assert_eq!(round_timeout(request_timeout, block_period, Round::new(3)), Duration::from_secs(11));

    // The exponential part saturates instead of overflowing.
    let capped = request_timeout + Duration::from_secs(u32::MAX as u64);
    assert_eq!(round_timeout(request_timeout, block_period, Round::new(32)), capped);
    assert_eq!(round_timeout(request_timeout, block_period, Round::new(u64::MAX)), capped);
}

#[test]
fn timer_fires_test() {
    let (inputs, receiver) = mpsc::channel();
    let mut timer = RoundTimer::new(inputs);
    let view = View::new(BlockHeight::new(1), Round::new(0));

    timer.arm(view, Duration::from_millis(50));
    assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(Input::Timeout(view)));
}

#[test]
fn rearming_cancels_the_previous_timer_test() {
    let (inputs, receiver) = mpsc::channel();
    let mut timer = RoundTimer::new(inputs);
    let first = View::new(BlockHeight::new(1), Round::new(0));
    let second = View::new(BlockHeight::new(1), Round::new(1));

    timer.arm(first, Duration::from_millis(100));
    timer.arm(second, Duration::from_millis(300));
    assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(Input::Timeout(second)));
    assert!(receiver.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn stopped_timer_never_fires_test() {
    let (inputs, receiver) = mpsc::channel();
    let mut timer = RoundTimer::new(inputs);

    timer.arm(View::new(BlockHeight::new(1), Round::new(0)), Duration::from_millis(50));
    timer.stop();
    assert!(receiver.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn delayed_delivery_test() {
    let (inputs, receiver) = mpsc::channel();
    let mut timer = RoundTimer::new(inputs);

    timer.deliver_after(Duration::from_millis(50), Input::Message(vec![1, 2, 3]));
    // Unaffected by the round timer being stopped.
    timer.stop();
    assert_eq!(
        receiver.recv_timeout(Duration::from_secs(5)),
        Ok(Input::Message(vec![1, 2, 3]))
    );
}
