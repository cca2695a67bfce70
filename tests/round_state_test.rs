use hotstuff_bft::{
    hotstuff::{
        backlog::Backlog,
        message_set::MessageSet,
        messages::{HotStuffMessage, Message, MessageCode, NewView},
        round_state::RoundState,
        types::{ConsensusError, Phase, QuorumCert, Subject},
    },
    types::{
        crypto_primitives::{hash, Ed25519Signer},
        data_types::{BlockHeight, BufferSize, Round, View},
        proposal::Proposal,
        validator_set::LeaderPolicy,
    },
};
use rand_core::OsRng;

mod common;

use crate::common::validators::Validators;

fn view(height: u64, round: u64) -> View {
    View::new(BlockHeight::new(height), Round::new(round))
}

fn vote(validators: &Validators, index: usize, subject: Subject) -> Message {
    Message::new(validators.signer(index), &HotStuffMessage::PrepareVote(subject))
}

#[test]
fn message_set_counts_each_sender_once_test() {
    let validators = Validators::generate(4);
    let mut set = MessageSet::new(&validators.validator_set(LeaderPolicy::RoundRobin));
    let subject = Subject::new(view(1, 0), hash(b"proposal"));

    set.add(vote(&validators, 0, subject)).unwrap();
    set.add(vote(&validators, 0, subject)).unwrap();
    set.add(vote(&validators, 1, subject)).unwrap();
    assert_eq!(set.size(), 2);
    let senders: Vec<_> = set.values().map(|msg| msg.sender).collect();
    assert_eq!(senders, vec![validators.address(0), validators.address(1)]);

    // Seals come out ordered by signer.
    let signers: Vec<_> = set.seals().iter().map(|seal| seal.signer).collect();
    assert_eq!(signers, vec![validators.address(0), validators.address(1)]);

    let outsider = Ed25519Signer::generate(&mut OsRng {});
    let msg = Message::new(&outsider, &HotStuffMessage::PrepareVote(subject));
    assert_eq!(set.add(msg), Err(ConsensusError::UnauthorizedAddress));
    assert_eq!(set.size(), 2);
}

#[test]
fn phase_only_moves_forward_test() {
    let validators = Validators::generate(4);
    let validator_set = validators.validator_set(LeaderPolicy::RoundRobin);
    let seed = QuorumCert::seed(&Proposal::genesis(), Default::default());
    let mut state = RoundState::new(view(1, 0), &validator_set, seed);

    assert_eq!(state.phase(), Phase::AcceptRequest);
    assert!(state.set_phase(Phase::Locked));
    assert!(!state.set_phase(Phase::Prepared));
    assert!(!state.set_phase(Phase::Locked));
    assert_eq!(state.phase(), Phase::Locked);
    assert!(state.set_phase(Phase::Committed));
    assert_eq!(state.phase(), Phase::Committed);
}

#[test]
fn certificates_install_once_per_round_test() {
    let validators = Validators::generate(4);
    let validator_set = validators.validator_set(LeaderPolicy::RoundRobin);
    let genesis = Proposal::genesis();
    let seed = QuorumCert::seed(&genesis, Default::default());
    let mut state = RoundState::new(view(1, 0), &validator_set, seed.clone());

    let proposal = Proposal::new(BlockHeight::new(1), genesis.hash, validators.address(1), b"1".to_vec());
    state.set_proposal(proposal.clone());
    let subject = state.subject().unwrap();
    assert_eq!(subject, Subject::new(view(1, 0), proposal.hash));

    let qc = validators.certify(&[0, 1, 2], HotStuffMessage::PrepareVote, subject, validators.address(1));
    let other_qc = validators.certify(&[1, 2, 3], HotStuffMessage::PrepareVote, subject, validators.address(1));

    assert!(state.set_prepare_qc(qc.clone()));
    assert!(!state.set_prepare_qc(other_qc.clone()));
    assert_eq!(state.prepare_qc(), &qc);
    assert_eq!(state.prepared_proposal(), Some(&proposal));

    assert!(state.set_locked_qc(qc.clone()));
    assert!(!state.set_locked_qc(other_qc.clone()));
    assert_eq!(state.locked_qc(), &qc);

    assert_eq!(state.committed_qc(), &seed);
    assert!(state.set_committed_qc(other_qc.clone()));
    assert!(!state.set_committed_qc(qc));
    assert_eq!(state.committed_qc(), &other_qc);
}

#[test]
fn spawn_carries_certificates_and_request_test() {
    let validators = Validators::generate(4);
    let validator_set = validators.validator_set(LeaderPolicy::RoundRobin);
    let genesis = Proposal::genesis();
    let seed = QuorumCert::seed(&genesis, Default::default());
    let mut state = RoundState::new(view(1, 0), &validator_set, seed.clone());

    let proposal = Proposal::new(BlockHeight::new(1), genesis.hash, validators.address(1), b"1".to_vec());
    let request = Proposal::new(BlockHeight::new(1), genesis.hash, validators.address(2), b"2".to_vec());
    state.set_pending_request(request.clone());
    state.set_proposal(proposal.clone());
    let subject = state.subject().unwrap();
    for i in 0..4 {
        state.add_prepare_vote(vote(&validators, i, subject)).unwrap();
    }
    let qc = validators.certify(&[0, 1, 2], HotStuffMessage::PrepareVote, subject, validators.address(1));
    state.set_prepare_qc(qc.clone());
    state.set_locked_qc(qc.clone());
    state.set_phase(Phase::Locked);

    let mut next = state.spawn(view(1, 1), &validator_set);
    assert_eq!(next.view(), view(1, 1));
    assert_eq!(next.phase(), Phase::AcceptRequest);
    assert_eq!(next.proposal(), None);
    assert_eq!(next.subject(), None);
    assert_eq!(next.prepare_vote_size(), 0);
    assert_eq!(next.pending_request(), Some(&request));
    assert_eq!(next.prepare_qc(), &qc);
    assert_eq!(next.locked_qc(), &qc);
    assert_eq!(next.committed_qc(), &seed);
    assert_eq!(next.prepared_proposal(), Some(&proposal));

    // Certificates carried from an earlier round can be replaced in the new one.
    let other_qc = validators.certify(&[1, 2, 3], HotStuffMessage::PrepareVote, subject, validators.address(1));
    assert!(next.set_prepare_qc(other_qc));

    next.reseed(seed.clone());
    assert_eq!(next.locked_qc(), &seed);
    assert_eq!(next.prepared_proposal(), None);
    assert_eq!(next.take_pending_request(), Some(request));
    assert_eq!(next.pending_request(), None);
}

#[test]
fn highest_new_view_certificate_test() {
    let validators = Validators::generate(4);
    let validator_set = validators.validator_set(LeaderPolicy::RoundRobin);
    let genesis = Proposal::genesis();
    let seed = QuorumCert::seed(&genesis, Default::default());
    let mut state = RoundState::new(view(1, 2), &validator_set, seed.clone());
    assert_eq!(state.highest_new_view_qc(), None);

    let subject = Subject::new(view(1, 1), hash(b"proposal"));
    let qc = validators.certify(&[0, 1, 2], HotStuffMessage::PrepareVote, subject, validators.address(0));
    for (i, high_qc) in [(0, seed.clone()), (1, qc.clone()), (2, seed)] {
        let new_view = NewView { view: view(1, 2), high_qc };
        let msg = Message::new(validators.signer(i), &HotStuffMessage::NewView(new_view));
        state.add_new_view(msg).unwrap();
    }
    assert_eq!(state.new_view_size(), 3);
    assert_eq!(state.highest_new_view_qc(), Some(qc));
}

#[test]
fn backlog_test() {
    let validators = Validators::generate(4);
    let subject = Subject::new(view(2, 0), hash(b"proposal"));
    let mut backlog = Backlog::new(BufferSize::new(2));

    let new_view = |i: usize, view: View| {
        let new_view = NewView {
            view,
            high_qc: QuorumCert::seed(&Proposal::genesis(), Default::default()),
        };
        Message::new(validators.signer(i), &HotStuffMessage::NewView(new_view))
    };

    assert!(backlog.insert(view(2, 0), vote(&validators, 0, subject)));
    assert!(backlog.insert(view(2, 3), new_view(0, view(2, 3))));
    // Full: a message for a higher view than everything queued is dropped...
    assert!(!backlog.insert(view(2, 5), new_view(0, view(2, 5))));
    // ...and one for a lower view evicts the highest-viewed message.
    assert!(backlog.insert(view(2, 1), new_view(0, view(2, 1))));
    assert_eq!(backlog.len(), 2);

    // Other senders have queues of their own.
    assert!(backlog.insert(view(2, 1), new_view(1, view(2, 1))));
    assert!(backlog.insert(view(2, 1), new_view(2, view(2, 1))));
    assert_eq!(backlog.count_senders(view(2, 1), MessageCode::NewView), 3);
    assert_eq!(backlog.count_senders(view(2, 1), MessageCode::PrepareVote), 0);
    assert_eq!(backlog.count_senders(view(2, 3), MessageCode::NewView), 0);

    // Taking a view discards everything older.
    let taken = backlog.take(view(2, 1));
    assert_eq!(taken.len(), 3);
    assert!(taken.iter().all(|msg| msg.code == MessageCode::NewView));
    assert!(backlog.is_empty());

    let mut disabled = Backlog::new(BufferSize::new(0));
    assert!(!disabled.insert(view(2, 0), vote(&validators, 0, subject)));
    assert!(disabled.is_empty());
}
