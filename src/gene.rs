//! Gene types for NEAT genomes.
//!
//! This module defines the fundamental building blocks of NEAT networks:
//! - [`NodeGene`]: a neuron, identified across genomes by its split innovation
//! - [`ConnectionGene`]: a weighted link, identified across genomes by its innovation number

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::activation::{Activation, Aggregation};

new_key_type! {
    /// Arena handle for a node within one genome.
    ///
    /// Handles are only meaningful inside the genome that issued them (and its
    /// bulk clones). Cross-genome identity goes through
    /// [`NodeGene::split_innovation`].
    pub struct NodeId;

    /// Arena handle for a connection within one genome.
    pub struct ConnectionId;
}

/// Layer sentinel carried by every output node.
pub const OUTPUT_LAYER: u32 = u32::MAX;

/// The role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Receives an external value; never the target of a connection.
    Input,
    /// Internal node created at construction or by splitting a connection.
    Hidden,
    /// Produces one of the network's outputs.
    Output,
}

/// A node gene representing a neuron in the NEAT network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGene {
    /// Cross-genome identity. Negative for nodes created at construction
    /// (`-1, -2, ...` in input, starting-hidden, output order); for nodes
    /// created by splitting a connection, that connection's innovation number.
    pub split_innovation: i64,
    pub node_type: NodeType,
    /// 0 for inputs, [`OUTPUT_LAYER`] for outputs, `1..` for hidden nodes.
    pub layer: u32,
    pub bias: f64,
    /// Multiplier applied to the aggregated input before the bias is added.
    pub response: f64,
    pub aggregation: Aggregation,
    pub activation: Activation,
    /// Value produced by the last evaluation; read by recurrent connections.
    #[serde(skip)]
    pub value: f64,
    /// Inbound connections (this node is their `output`).
    pub inputs: Vec<ConnectionId>,
    /// Outbound connections (this node is their `input`).
    pub outputs: Vec<ConnectionId>,
    /// The connection looping from this node back to itself, if any.
    pub self_recurrent: Option<ConnectionId>,
}

impl NodeGene {
    fn with_role(
        split_innovation: i64,
        node_type: NodeType,
        layer: u32,
        aggregation: Aggregation,
        activation: Activation,
    ) -> Self {
        Self {
            split_innovation,
            node_type,
            layer,
            bias: 0.0,
            response: 1.0,
            aggregation,
            activation,
            value: 0.0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            self_recurrent: None,
        }
    }

    /// Create a new input node. Inputs pass their value through unchanged.
    #[must_use]
    pub fn input(split_innovation: i64) -> Self {
        Self::with_role(
            split_innovation,
            NodeType::Input,
            0,
            Aggregation::Sum,
            Activation::Linear,
        )
    }

    /// Create a new output node.
    #[must_use]
    pub fn output(split_innovation: i64, aggregation: Aggregation, activation: Activation) -> Self {
        Self::with_role(
            split_innovation,
            NodeType::Output,
            OUTPUT_LAYER,
            aggregation,
            activation,
        )
    }

    /// Create a new hidden node at `layer`.
    #[must_use]
    pub fn hidden(
        split_innovation: i64,
        layer: u32,
        aggregation: Aggregation,
        activation: Activation,
    ) -> Self {
        Self::with_role(
            split_innovation,
            NodeType::Hidden,
            layer,
            aggregation,
            activation,
        )
    }

    #[inline]
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.node_type == NodeType::Input
    }

    #[inline]
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.node_type == NodeType::Hidden
    }

    #[inline]
    #[must_use]
    pub fn is_output(&self) -> bool {
        self.node_type == NodeType::Output
    }
}

/// A connection gene representing a weighted link between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionGene {
    /// Historical marking issued by the run's
    /// [`InnovationTracker`](crate::innovation::InnovationTracker).
    pub innovation: u64,
    /// The source node of this connection.
    pub input: NodeId,
    /// The target node of this connection.
    pub output: NodeId,
    pub weight: f64,
    /// Disabled connections are skipped during evaluation but kept for
    /// alignment and crossover.
    pub enabled: bool,
    /// Recurrent connections are left out of the layer ordering and deliver
    /// the source value from the previous evaluation.
    pub recurrent: bool,
    /// Cleared once this connection has been split into a hidden node.
    pub node_addable: bool,
}

impl ConnectionGene {
    /// Create a new enabled, forward, splittable connection.
    #[must_use]
    pub fn new(innovation: u64, input: NodeId, output: NodeId, weight: f64) -> Self {
        Self {
            innovation,
            input,
            output,
            weight,
            enabled: true,
            recurrent: false,
            node_addable: true,
        }
    }

    /// Whether this connection loops from a node back to itself.
    #[inline]
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.input == self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_gene_creation() {
        let input = NodeGene::input(-1);
        assert_eq!(input.node_type, NodeType::Input);
        assert_eq!(input.layer, 0);
        assert_eq!(input.activation, Activation::Linear);

        let output = NodeGene::output(-2, Aggregation::Sum, Activation::Sigmoid);
        assert!(output.is_output());
        assert_eq!(output.layer, OUTPUT_LAYER);
        assert_eq!(output.activation, Activation::Sigmoid);

        let hidden = NodeGene::hidden(7, 1, Aggregation::Max, Activation::Tanh);
        assert!(hidden.is_hidden());
        assert_eq!(hidden.split_innovation, 7);
        assert_eq!(hidden.aggregation, Aggregation::Max);
        assert!((hidden.response - 1.0).abs() < 1e-12);
        assert!(hidden.self_recurrent.is_none());
    }

    #[test]
    fn test_connection_gene_creation() {
        use slotmap::SlotMap;

        let mut nodes: SlotMap<NodeId, NodeGene> = SlotMap::with_key();
        let n1 = nodes.insert(NodeGene::input(-1));
        let n2 = nodes.insert(NodeGene::output(-2, Aggregation::Sum, Activation::Sigmoid));

        let conn = ConnectionGene::new(100, n1, n2, 0.5);
        assert_eq!(conn.input, n1);
        assert_eq!(conn.output, n2);
        assert!((conn.weight - 0.5).abs() < 1e-12);
        assert!(conn.enabled);
        assert!(conn.node_addable);
        assert!(!conn.recurrent);
        assert!(!conn.is_self_loop());
        assert!(ConnectionGene::new(101, n2, n2, 1.0).is_self_loop());
    }
}
