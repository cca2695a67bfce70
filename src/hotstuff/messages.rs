/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Messages sent between validators.
//!
//! Every message travels in a signed [`Message`] envelope. The envelope's `body` is the borsh encoding
//! of one of the payload types defined here, selected by the envelope's [`MessageCode`]. The
//! [`HotStuffMessage`] enum is the decoded form of a body, and is what the handlers in
//! [`implementation`](super::implementation) dispatch over.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    crypto_primitives::Signer,
    data_types::{Address, SignatureBytes, View},
    proposal::Proposal,
    validator_set::ValidatorSet,
};

use super::types::{ConsensusError, QuorumCert, Seal, Subject};

/// Kind of a message. Encoded as a single byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum MessageCode {
    NewView,
    Prepare,
    PrepareVote,
    PreCommit,
    PreCommitVote,
    Commit,
    CommitVote,
    Decide,
}

impl MessageCode {
    /// Whether messages of this kind are votes, sent by every validator to the proposer.
    pub fn is_vote(&self) -> bool {
        matches!(
            self,
            MessageCode::PrepareVote | MessageCode::PreCommitVote | MessageCode::CommitVote
        )
    }
}

/// The signed envelope every message travels in.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Message {
    pub code: MessageCode,
    pub body: Vec<u8>,
    pub sender: Address,
    pub signature: SignatureBytes,
}

impl Message {
    /// Encode `msg` and sign it as `signer`.
    pub fn new(signer: &impl Signer, msg: &HotStuffMessage) -> Message {
        let code = msg.code();
        let body = msg.body();
        let sender = signer.address();
        let signature = signer.sign(&Message::signing_bytes(code, &body, &sender));
        Message {
            code,
            body,
            sender,
            signature,
        }
    }

    /// The bytes a message's signature covers: the envelope without its signature.
    pub fn signing_bytes(code: MessageCode, body: &[u8], sender: &Address) -> Vec<u8> {
        // Safety: serializing into a Vec<u8> cannot fail.
        (code, body.to_vec(), *sender).try_to_vec().unwrap()
    }

    pub fn encode(&self) -> Vec<u8> {
        // Safety: serializing into a Vec<u8> cannot fail.
        self.try_to_vec().unwrap()
    }

    pub fn decode(bytes: &[u8]) -> Result<Message, ConsensusError> {
        Ok(Message::try_from_slice(bytes)?)
    }

    /// Check that this message was signed by its declared sender, and that the sender is a member of
    /// `validator_set`.
    pub fn verify(&self, signer: &impl Signer, validator_set: &ValidatorSet) -> Result<(), ConsensusError> {
        let data = Message::signing_bytes(self.code, &self.body, &self.sender);
        let recovered = signer.recover(&data, &self.signature)?;
        if recovered != self.sender {
            return Err(ConsensusError::InvalidSigner);
        }
        if !validator_set.contains(&recovered) {
            return Err(ConsensusError::UnauthorizedAddress);
        }
        Ok(())
    }

    /// Decode the body of this message according to its code.
    pub fn payload(&self) -> Result<HotStuffMessage, ConsensusError> {
        HotStuffMessage::decode(self.code, &self.body)
    }

    /// The seal this message contributes to a certificate.
    pub fn seal(&self) -> Seal {
        Seal {
            code: self.code,
            signer: self.sender,
            signature: self.signature.clone(),
        }
    }
}

/// Decoded body of a [`Message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HotStuffMessage {
    NewView(NewView),
    Prepare(Prepare),
    PrepareVote(Subject),
    PreCommit(QuorumCert),
    PreCommitVote(Subject),
    Commit(QuorumCert),
    CommitVote(Subject),
    Decide(QuorumCert),
}

impl HotStuffMessage {
    pub fn code(&self) -> MessageCode {
        match self {
            HotStuffMessage::NewView(_) => MessageCode::NewView,
            HotStuffMessage::Prepare(_) => MessageCode::Prepare,
            HotStuffMessage::PrepareVote(_) => MessageCode::PrepareVote,
            HotStuffMessage::PreCommit(_) => MessageCode::PreCommit,
            HotStuffMessage::PreCommitVote(_) => MessageCode::PreCommitVote,
            HotStuffMessage::Commit(_) => MessageCode::Commit,
            HotStuffMessage::CommitVote(_) => MessageCode::CommitVote,
            HotStuffMessage::Decide(_) => MessageCode::Decide,
        }
    }

    /// The view this message belongs to.
    pub fn view(&self) -> View {
        match self {
            HotStuffMessage::NewView(new_view) => new_view.view,
            HotStuffMessage::Prepare(prepare) => prepare.view,
            HotStuffMessage::PrepareVote(subject)
            | HotStuffMessage::PreCommitVote(subject)
            | HotStuffMessage::CommitVote(subject) => subject.view,
            HotStuffMessage::PreCommit(qc)
            | HotStuffMessage::Commit(qc)
            | HotStuffMessage::Decide(qc) => qc.view,
        }
    }

    /// Encode the payload into the bytes carried in a message's `body`.
    pub fn body(&self) -> Vec<u8> {
        // Safety: serializing into a Vec<u8> cannot fail.
        match self {
            HotStuffMessage::NewView(new_view) => new_view.try_to_vec().unwrap(),
            HotStuffMessage::Prepare(prepare) => prepare.try_to_vec().unwrap(),
            HotStuffMessage::PrepareVote(subject)
            | HotStuffMessage::PreCommitVote(subject)
            | HotStuffMessage::CommitVote(subject) => subject.try_to_vec().unwrap(),
            HotStuffMessage::PreCommit(qc)
            | HotStuffMessage::Commit(qc)
            | HotStuffMessage::Decide(qc) => qc.try_to_vec().unwrap(),
        }
    }

    pub fn decode(code: MessageCode, body: &[u8]) -> Result<HotStuffMessage, ConsensusError> {
        let msg = match code {
            MessageCode::NewView => HotStuffMessage::NewView(NewView::try_from_slice(body)?),
            MessageCode::Prepare => HotStuffMessage::Prepare(Prepare::try_from_slice(body)?),
            MessageCode::PrepareVote => HotStuffMessage::PrepareVote(Subject::try_from_slice(body)?),
            MessageCode::PreCommit => HotStuffMessage::PreCommit(QuorumCert::try_from_slice(body)?),
            MessageCode::PreCommitVote => {
                HotStuffMessage::PreCommitVote(Subject::try_from_slice(body)?)
            }
            MessageCode::Commit => HotStuffMessage::Commit(QuorumCert::try_from_slice(body)?),
            MessageCode::CommitVote => HotStuffMessage::CommitVote(Subject::try_from_slice(body)?),
            MessageCode::Decide => HotStuffMessage::Decide(QuorumCert::try_from_slice(body)?),
        };
        Ok(msg)
    }
}

/// Sent by every validator to the proposer on entering a round, carrying the sender's prepare
/// certificate.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NewView {
    pub view: View,
    pub high_qc: QuorumCert,
}

/// Broadcast by the proposer once it holds a NewView quorum: the proposal for the round, and the
/// highest certificate among the NewViews, which the proposal extends.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Prepare {
    pub view: View,
    pub proposal: Proposal,
    pub high_qc: QuorumCert,
}
