use std::sync::mpsc::{Receiver, Sender, channel};

use crate::data::NodeKind;

/// Snapshot of the clicked node carried by a selection notification.
#[derive(Clone, Debug)]
pub struct SelectedNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Broadcast channel for resolved click selections. One listener (the
/// detail panel) is the expected case, but any number may subscribe;
/// listeners whose receiver is gone are pruned on the next emit.
#[derive(Default)]
pub struct SelectionBus {
    listeners: Vec<Sender<SelectedNode>>,
}

impl SelectionBus {
    pub fn subscribe(&mut self) -> Receiver<SelectedNode> {
        let (tx, rx) = channel();
        self.listeners.push(tx);
        rx
    }

    /// Sends the notification to every live listener and returns how many
    /// were reached.
    pub fn emit(&mut self, node: &SelectedNode) -> usize {
        self.listeners.retain(|listener| listener.send(node.clone()).is_ok());
        self.listeners.len()
    }
}
