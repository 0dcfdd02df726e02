use std::collections::VecDeque;
use xmppcore_node::node::Node;

/// Units written while the session was not online. Ids are assigned before a
/// unit gets here, so a queued request is already correlatable.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    units: VecDeque<Node>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, unit: Node) {
        self.units.push_back(unit);
    }

    /// Swaps the queue for an empty one and hands back its contents in
    /// enqueue order.
    pub fn take_all(&mut self) -> VecDeque<Node> {
        std::mem::take(&mut self.units)
    }

    /// Puts back units that could not be written, ahead of anything queued
    /// since.
    pub fn requeue_front(&mut self, mut units: VecDeque<Node>) {
        units.append(&mut self.units);
        self.units = units;
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
