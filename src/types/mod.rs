/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types shared by every part of the consensus core: byte wrappers, cryptographic primitives, the
//! validator set, and proposals.

pub mod crypto_primitives;

pub mod data_types;

pub mod proposal;

pub mod validator_set;
