//! Runs complete replicas against each other over an in-memory network.

use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use hotstuff_bft::{
    replica::{Configuration, Replica, ReplicaSpec},
    types::{
        data_types::{BlockHeight, BufferSize},
        validator_set::LeaderPolicy,
    },
};
use log::LevelFilter;

mod common;

use crate::common::{
    logging::setup_logger,
    network::{mock_network, Chain, NetworkStub},
    validators::Validators,
};

fn configuration() -> Configuration {
    Configuration::builder()
        .request_timeout(Duration::from_secs(1))
        .block_period(Duration::ZERO)
        .leader_policy(LeaderPolicy::RoundRobin)
        .backlog_capacity(BufferSize::new(256))
        .log_events(true)
        .build()
}

fn start(validators: &Validators, index: usize, stub: NetworkStub) -> Replica {
    let request = stub.backend.next_request();
    let replica = ReplicaSpec::builder()
        .backend(stub.backend)
        .signer(validators.signer(index).clone())
        .configuration(configuration())
        .input_sender(stub.input_sender)
        .input_receiver(stub.input_receiver)
        .build()
        .start();
    replica.submit_request(request);
    replica
}

/// Wait until every chain in `chains` is at least `height` long, failing the test after `timeout`.
fn wait_for_height(chains: &[Chain], height: BlockHeight, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while chains.iter().any(|chain| chain.height() < height) {
        assert!(
            Instant::now() < deadline,
            "chains did not reach height {} in time: {:?}",
            height,
            chains.iter().map(|chain| chain.height().int()).collect::<Vec<_>>()
        );
        thread::sleep(Duration::from_millis(50));
    }
}

/// Every chain holds the same proposal at every height up to `height`.
fn assert_agreement(chains: &[Chain], height: BlockHeight) {
    for h in 1..=height.int() {
        let h = BlockHeight::new(h);
        let first = chains[0].get(h);
        assert!(first.is_some());
        for chain in &chains[1..] {
            assert_eq!(chain.get(h), first, "chains disagree at height {}", h);
        }
    }
}

#[test]
fn four_replicas_commit_test() {
    setup_logger(LevelFilter::Info);

    let validators = Validators::generate(4);
    let stubs = mock_network(&validators.validator_set(LeaderPolicy::RoundRobin));
    let chains: Vec<Chain> = stubs.iter().map(|stub| stub.chain.clone()).collect();

    let (commit_sender, commits) = mpsc::channel();
    let mut replicas = Vec::new();
    for (index, stub) in stubs.into_iter().enumerate() {
        let request = stub.backend.next_request();
        let spec = ReplicaSpec::builder()
            .backend(stub.backend)
            .signer(validators.signer(index).clone())
            .configuration(configuration())
            .input_sender(stub.input_sender)
            .input_receiver(stub.input_receiver);
        let replica = if index == 0 {
            let commit_sender = commit_sender.clone();
            spec.on_commit_block(move |event| {
                let _ = commit_sender.send(event.height);
            })
            .build()
            .start()
        } else {
            spec.build().start()
        };
        replica.submit_request(request);
        replicas.push(replica);
    }

    let target = BlockHeight::new(3);
    wait_for_height(&chains, target, Duration::from_secs(60));
    assert_agreement(&chains, target);

    // Round robin over the validators that follow each block's proposer.
    for h in 1..=target.int() {
        let proposal = chains[0].get(BlockHeight::new(h)).unwrap();
        assert!(validators.validator_set(LeaderPolicy::RoundRobin).contains(&proposal.proposer));
        assert_eq!(proposal.height, BlockHeight::new(h));
    }

    // The commit handler of validator 0 saw its first three commits in order.
    let committed: Vec<BlockHeight> = (0..3)
        .map(|_| commits.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect();
    assert_eq!(
        committed,
        vec![BlockHeight::new(1), BlockHeight::new(2), BlockHeight::new(3)]
    );

    for replica in &replicas {
        let snapshot = replica.round_state_camera().snapshot();
        assert!(snapshot.view.height >= target);
    }
}

#[test]
fn silent_proposer_is_skipped_test() {
    setup_logger(LevelFilter::Info);

    let validators = Validators::generate(4);
    let stubs = mock_network(&validators.validator_set(LeaderPolicy::RoundRobin));

    // Validator 1 proposes round 0 of height 1, but never starts.
    let mut chains = Vec::new();
    let mut replicas = Vec::new();
    for (index, stub) in stubs.into_iter().enumerate() {
        if index == 1 {
            continue;
        }
        chains.push(stub.chain.clone());
        replicas.push(start(&validators, index, stub));
    }

    let target = BlockHeight::new(3);
    wait_for_height(&chains, target, Duration::from_secs(60));
    assert_agreement(&chains, target);

    // Height 1 was decided in a later round, by someone other than the silent validator.
    let first = chains[0].get(BlockHeight::new(1)).unwrap();
    assert_ne!(first.proposer, validators.address(1));
}
