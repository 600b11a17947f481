//! Channels the bot has been switched on in.

use crate::ChannelId;
use std::collections::HashSet;

/// Set of channels live for auto-response. Entries live as long as the process.
#[derive(Debug, Default)]
pub struct ActivationRegistry {
    channels: HashSet<ChannelId>,
}

impl ActivationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a channel live. Returns `false` if it already was.
    pub fn activate(&mut self, channel_id: ChannelId) -> bool {
        self.channels.insert(channel_id)
    }

    pub fn is_active(&self, channel_id: &str) -> bool {
        self.channels.contains(channel_id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Whether `content` is the activation marker.
pub fn is_activation_marker(content: &str, keyword: &str) -> bool {
    content.trim() == keyword
}
