/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Storage for messages that arrived for a view this validator has not reached yet.
//!
//! Validators enter views at slightly different times, so a message for the next round or height is
//! usually not a sign of trouble. Instead of dropping it, [`Core`](super::implementation::Core) keeps it
//! here and replays it once it enters the message's view.
//!
//! ## Buffer management
//!
//! Every sender gets its own queue, so a single faulty validator cannot crowd out everyone else. When a
//! sender's queue is full, its highest-viewed messages are removed first to make space for a lower-viewed
//! one, and a message with a view at least as high as everything already queued is dropped.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::types::data_types::{Address, BufferSize, View};

use super::messages::{Message, MessageCode};

pub struct Backlog {
    capacity: BufferSize,
    queues: HashMap<Address, SenderQueue>,
}

#[derive(Default)]
struct SenderQueue {
    msgs: BTreeMap<View, VecDeque<Message>>,
    len: usize,
}

impl Backlog {
    /// Create an empty backlog that holds at most `capacity` messages per sender.
    pub fn new(capacity: BufferSize) -> Self {
        Self {
            capacity,
            queues: HashMap::new(),
        }
    }

    /// Try inserting `msg`, which belongs to `view`, into its sender's queue.
    ///
    /// Returns whether the message was stored.
    pub fn insert(&mut self, view: View, msg: Message) -> bool {
        if self.capacity.int() == 0 {
            return false;
        }

        let queue = self.queues.entry(msg.sender).or_default();
        if queue.len >= self.capacity.int() {
            match queue.msgs.keys().next_back().copied() {
                Some(max_view) if view < max_view => queue.remove_highest_viewed(),
                _ => return false,
            }
        }

        queue.msgs.entry(view).or_default().push_back(msg);
        queue.len += 1;
        true
    }

    /// Discard every message for a view lower than `view`, and remove and return every message for
    /// `view`, in arrival order per sender.
    pub fn take(&mut self, view: View) -> Vec<Message> {
        let mut msgs = Vec::new();
        for queue in self.queues.values_mut() {
            let mut retained = queue.msgs.split_off(&view);
            if let Some(current) = retained.remove(&view) {
                msgs.extend(current);
            }
            queue.msgs = retained;
            queue.len = queue.msgs.values().map(VecDeque::len).sum();
        }
        self.queues.retain(|_, queue| queue.len > 0);
        msgs
    }

    /// Number of distinct senders with at least one message of kind `code` queued for `view`.
    pub fn count_senders(&self, view: View, code: MessageCode) -> usize {
        self.queues
            .values()
            .filter(|queue| {
                queue
                    .msgs
                    .get(&view)
                    .is_some_and(|msgs| msgs.iter().any(|msg| msg.code == code))
            })
            .count()
    }

    /// Total number of messages queued.
    pub fn len(&self) -> usize {
        self.queues.values().map(|queue| queue.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SenderQueue {
    fn remove_highest_viewed(&mut self) {
        if let Some(mut entry) = self.msgs.last_entry() {
            if entry.get_mut().pop_back().is_some() {
                self.len -= 1;
            }
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }
}
