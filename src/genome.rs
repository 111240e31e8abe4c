//! NEAT genome implementation with arena-allocated graph topology.
//!
//! The [`NeatGenome`] keeps nodes and connections in SlotMap arenas, so a
//! clone is a bulk copy and every handle stays valid in the copy. Genes of
//! different genomes are aligned through their historical markings: a
//! connection's innovation number and a node's split innovation.
//!
//! After every structural change the genome re-derives its layers: inputs sit
//! on layer 0, outputs on [`OUTPUT_LAYER`], and each hidden node one past the
//! longest chain of non-recurrent connections leading to it. Evaluation walks
//! those layers in order (see [`crate::network`]).

use std::collections::{HashMap, HashSet};

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::debug;

use crate::activation::ActivationConfig;
use crate::config::{InitialConnectivity, NeatConfig};
use crate::error::GenomeError;
use crate::gene::{ConnectionGene, ConnectionId, NodeGene, NodeId, OUTPUT_LAYER};
use crate::innovation::InnovationTracker;
use crate::layout::Layout;
use crate::topology::GraphTopology;

/// Probability that a matching gene is disabled in the child when either
/// parent carries it disabled.
const INHERIT_DISABLED_PROB: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
enum StructuralMutation {
    AddConnection,
    AddNode,
    DeleteConnection,
    DeleteNode,
}

/// A NEAT genome representing a neural network topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeatGenome {
    pub(crate) nodes: SlotMap<NodeId, NodeGene>,
    pub(crate) connections: SlotMap<ConnectionId, ConnectionGene>,
    pub(crate) input_ids: Vec<NodeId>,
    hidden_ids: Vec<NodeId>,
    pub(crate) output_ids: Vec<NodeId>,
    /// `[inputs, hidden layer 1, .., hidden layer k, outputs]`
    pub(crate) layers: Vec<Vec<NodeId>>,
    max_innovation: Option<u64>,
    pub(crate) activation: ActivationConfig,
    /// Cached drawing coordinates; dropped on any structural change.
    #[serde(skip)]
    pub(crate) layout: Option<Layout>,
}

impl NeatGenome {
    /// Create a genome with the configured inputs, starting hidden layers and
    /// outputs, wired according to `config.initial_connectivity`.
    pub fn new<R: Rng>(
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Self {
        let mut genome = Self {
            nodes: SlotMap::with_key(),
            connections: SlotMap::with_key(),
            input_ids: Vec::with_capacity(config.num_inputs),
            hidden_ids: Vec::new(),
            output_ids: Vec::with_capacity(config.num_outputs),
            layers: Vec::new(),
            max_innovation: None,
            activation: config.activation,
            layout: None,
        };

        let mut split = -1i64;
        for _ in 0..config.num_inputs {
            let id = genome.nodes.insert(NodeGene::input(split));
            genome.input_ids.push(id);
            split -= 1;
        }

        for (depth, &count) in config.starting_hidden_layers.iter().enumerate() {
            let layer = u32::try_from(depth + 1).unwrap_or(OUTPUT_LAYER - 1);
            for _ in 0..count {
                let mut node = NodeGene::hidden(
                    split,
                    layer,
                    config.starting_aggregation,
                    config.hidden_activation,
                );
                node.bias = config.bias.sample(rng);
                node.response = config.response.sample(rng);
                let id = genome.nodes.insert(node);
                genome.hidden_ids.push(id);
                split -= 1;
            }
        }

        for _ in 0..config.num_outputs {
            let mut node = NodeGene::output(
                split,
                config.starting_aggregation,
                config.output_activation,
            );
            node.bias = config.bias.sample(rng);
            node.response = config.response.sample(rng);
            let id = genome.nodes.insert(node);
            genome.output_ids.push(id);
            split -= 1;
        }

        genome.rebuild_layers();
        genome.connect_initial(config, tracker, rng);
        genome.update_layers(config.feed_forward);
        genome
    }

    fn connect_initial<R: Rng>(
        &mut self,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) {
        let inputs = self.input_ids.clone();
        let hidden = self.hidden_ids.clone();
        let outputs = self.output_ids.clone();
        let recurrent_allowed = !config.feed_forward;

        match config.initial_connectivity {
            InitialConnectivity::Unconnected => {}
            InitialConnectivity::FeatureSelectionNoHidden => {
                let Some(&feature) = inputs.choose(rng) else {
                    return;
                };
                for &output in &outputs {
                    self.connect_sampled(feature, output, config, tracker, rng);
                }
            }
            InitialConnectivity::FeatureSelectionHidden => {
                let Some(&feature) = inputs.choose(rng) else {
                    return;
                };
                for &node in &hidden {
                    self.connect_sampled(feature, node, config, tracker, rng);
                }
                for &node in &hidden {
                    for &output in &outputs {
                        self.connect_sampled(node, output, config, tracker, rng);
                    }
                }
                for &output in &outputs {
                    self.connect_sampled(feature, output, config, tracker, rng);
                }
            }
            InitialConnectivity::LayerByLayer => {
                let layers = self.layers.clone();
                for pair in layers.windows(2) {
                    for &from in &pair[0] {
                        for &to in &pair[1] {
                            self.connect_sampled(from, to, config, tracker, rng);
                        }
                    }
                }
            }
            InitialConnectivity::FullNoDirect
            | InitialConnectivity::PartialNoDirect
            | InitialConnectivity::FullDirect
            | InitialConnectivity::PartialDirect => {
                let direct = matches!(
                    config.initial_connectivity,
                    InitialConnectivity::FullDirect | InitialConnectivity::PartialDirect
                );
                let p = match config.initial_connectivity {
                    InitialConnectivity::PartialNoDirect | InitialConnectivity::PartialDirect => {
                        config.connect_probability
                    }
                    _ => 1.0,
                };

                for &input in &inputs {
                    for &node in &hidden {
                        if keep(rng, p) {
                            self.connect_sampled(input, node, config, tracker, rng);
                        }
                    }
                }
                for &node in &hidden {
                    if recurrent_allowed && keep(rng, p) {
                        self.connect_self_loop(node, config, tracker, rng);
                    }
                    for &output in &outputs {
                        if keep(rng, p) {
                            self.connect_sampled(node, output, config, tracker, rng);
                        }
                    }
                }

                if direct {
                    for (k, &input) in inputs.iter().enumerate() {
                        for &output in &outputs {
                            if k == 0 && recurrent_allowed && keep(rng, p) {
                                self.connect_self_loop(output, config, tracker, rng);
                            }
                            if keep(rng, p) {
                                self.connect_sampled(input, output, config, tracker, rng);
                            }
                        }
                    }
                } else {
                    if hidden.is_empty() {
                        for &input in &inputs {
                            for &output in &outputs {
                                if keep(rng, p) {
                                    self.connect_sampled(input, output, config, tracker, rng);
                                }
                            }
                        }
                    }
                    for &output in &outputs {
                        if recurrent_allowed && keep(rng, p) {
                            self.connect_self_loop(output, config, tracker, rng);
                        }
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &SlotMap<NodeId, NodeGene> {
        &self.nodes
    }

    #[must_use]
    pub fn connections(&self) -> &SlotMap<ConnectionId, ConnectionGene> {
        &self.connections
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&ConnectionGene> {
        self.connections.get(id)
    }

    /// IDs of input nodes (in order).
    #[must_use]
    pub fn input_ids(&self) -> &[NodeId] {
        &self.input_ids
    }

    /// IDs of hidden nodes, in creation order.
    #[must_use]
    pub fn hidden_ids(&self) -> &[NodeId] {
        &self.hidden_ids
    }

    /// IDs of output nodes (in order).
    #[must_use]
    pub fn output_ids(&self) -> &[NodeId] {
        &self.output_ids
    }

    /// Nodes grouped by layer, inputs first and outputs last.
    #[must_use]
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Highest innovation number among this genome's connections.
    #[must_use]
    pub fn max_innovation(&self) -> Option<u64> {
        self.max_innovation
    }

    #[must_use]
    pub fn num_enabled_connections(&self) -> usize {
        self.connections.values().filter(|c| c.enabled).count()
    }

    #[must_use]
    pub fn find_connection_by_innovation(&self, innovation: u64) -> Option<ConnectionId> {
        self.connections
            .iter()
            .find(|(_, c)| c.innovation == innovation)
            .map(|(id, _)| id)
    }

    #[must_use]
    pub fn find_node_by_split_innovation(&self, split_innovation: i64) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.split_innovation == split_innovation)
            .map(|(id, _)| id)
    }

    /// The connection running from `from` to `to`, if any.
    #[must_use]
    pub fn find_connection(&self, from: NodeId, to: NodeId) -> Option<ConnectionId> {
        let node = self.nodes.get(from)?;
        node.outputs
            .iter()
            .copied()
            .find(|&id| self.connections.get(id).is_some_and(|c| c.output == to))
    }

    /// Zero every node value so recurrent connections start from a clean state.
    pub fn reset_state(&mut self) {
        for (_, node) in &mut self.nodes {
            node.value = 0.0;
        }
    }

    fn connect_sampled<R: Rng>(
        &mut self,
        from: NodeId,
        to: NodeId,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> ConnectionId {
        let weight = config.weight.sample(rng);
        self.connect(from, to, weight, false, config, tracker)
    }

    fn connect_self_loop<R: Rng>(
        &mut self,
        node: NodeId,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> ConnectionId {
        let weight = config.weight.sample(rng);
        self.connect(node, node, weight, true, config, tracker)
    }

    /// Create and attach a new connection gene. The caller has checked that
    /// no connection between the two nodes exists.
    fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        weight: f64,
        recurrent: bool,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
    ) -> ConnectionId {
        let innovation = tracker.innovation(
            self.nodes[from].split_innovation,
            self.nodes[to].split_innovation,
        );
        let mut gene = ConnectionGene::new(innovation, from, to, config.weight.clamp(weight));
        gene.enabled = config.enabled_default;
        gene.recurrent = recurrent;
        gene.node_addable = self
            .find_node_by_split_innovation(split_of(innovation))
            .is_none();
        self.attach(gene)
    }

    fn attach(&mut self, gene: ConnectionGene) -> ConnectionId {
        let (from, to, innovation) = (gene.input, gene.output, gene.innovation);
        let id = self.connections.insert(gene);
        self.nodes[from].outputs.push(id);
        self.nodes[to].inputs.push(id);
        if from == to {
            self.nodes[from].self_recurrent = Some(id);
        }
        self.max_innovation = Some(self.max_innovation.map_or(innovation, |m| m.max(innovation)));
        self.layout = None;
        id
    }

    fn remove_connection(&mut self, id: ConnectionId) -> Option<ConnectionGene> {
        let gene = self.connections.remove(id)?;
        if let Some(node) = self.nodes.get_mut(gene.input) {
            node.outputs.retain(|&c| c != id);
            if node.self_recurrent == Some(id) {
                node.self_recurrent = None;
            }
        }
        if let Some(node) = self.nodes.get_mut(gene.output) {
            node.inputs.retain(|&c| c != id);
        }
        if self.max_innovation == Some(gene.innovation) {
            self.refresh_max_innovation();
        }
        self.layout = None;
        Some(gene)
    }

    /// Remove a hidden node together with every connection touching it.
    ///
    /// The connection this node was split from becomes splittable again.
    fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.is_hidden() {
            return;
        }
        let incident: Vec<ConnectionId> =
            node.inputs.iter().chain(node.outputs.iter()).copied().collect();
        for conn in incident {
            self.remove_connection(conn);
        }

        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        self.hidden_ids.retain(|&h| h != id);
        if let Ok(innovation) = u64::try_from(node.split_innovation) {
            if let Some(conn) = self.find_connection_by_innovation(innovation) {
                self.connections[conn].node_addable = true;
            }
        }
        self.layout = None;
    }

    /// A hidden node with no enabled inbound or no enabled outbound
    /// connection, self-loops not counted.
    fn is_isolated(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let active = |ids: &[ConnectionId]| {
            ids.iter()
                .filter_map(|&c| self.connections.get(c))
                .filter(|c| c.enabled && !c.is_self_loop())
                .count()
        };
        active(&node.inputs) == 0 || active(&node.outputs) == 0
    }

    /// Repeatedly remove isolated hidden nodes until none remain.
    ///
    /// Returns the number of nodes removed.
    fn prune_isolated(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let isolated: Vec<NodeId> = self
                .hidden_ids
                .iter()
                .copied()
                .filter(|&id| self.is_isolated(id))
                .collect();
            if isolated.is_empty() {
                return removed;
            }
            removed += isolated.len();
            for id in isolated {
                self.remove_node(id);
            }
        }
    }

    fn refresh_max_innovation(&mut self) {
        self.max_innovation = self.connections.values().map(|c| c.innovation).max();
    }

    fn refresh_node_addable(&mut self) {
        let splits: HashSet<i64> = self.nodes.values().map(|n| n.split_innovation).collect();
        for (_, conn) in &mut self.connections {
            conn.node_addable = !splits.contains(&split_of(conn.innovation));
        }
    }

    /// Re-derive hidden layers from the non-recurrent connection graph.
    ///
    /// Hidden nodes unreachable from the inputs are removed. Cycles among
    /// non-recurrent connections are broken by marking back edges recurrent
    /// (and disabling them in feed-forward mode).
    pub(crate) fn update_layers(&mut self, feed_forward: bool) {
        loop {
            let topo = GraphTopology::layering_graph(self);

            let reached = topo.reachable_from_inputs();
            let unreached: Vec<NodeId> = reached
                .iter()
                .enumerate()
                .filter(|&(_, &r)| !r)
                .filter_map(|(idx, _)| topo.node_id(idx))
                .filter(|&id| self.nodes[id].is_hidden())
                .collect();
            if !unreached.is_empty() {
                for id in unreached {
                    self.remove_node(id);
                }
                continue;
            }

            match topo.longest_path_layers() {
                Some(layers) => {
                    for (idx, &layer) in layers.iter().enumerate() {
                        let Some(id) = topo.node_id(idx) else {
                            continue;
                        };
                        let node = &mut self.nodes[id];
                        if node.is_hidden() {
                            node.layer = layer;
                        }
                    }
                    break;
                }
                None => {
                    let back_edges = topo.back_edges();
                    debug!(target: "neat", count = back_edges.len(), feed_forward, "breaking cycle: marking back edges recurrent");
                    for id in back_edges {
                        let conn = &mut self.connections[id];
                        conn.recurrent = true;
                        if feed_forward {
                            conn.enabled = false;
                        }
                    }
                }
            }
        }

        self.reclassify_recurrent();
        self.rebuild_layers();
        self.refresh_max_innovation();
        self.layout = None;
    }

    /// Recurrent connections that now point forward become ordinary ones;
    /// those within a single layer are disabled.
    fn reclassify_recurrent(&mut self) {
        for (_, conn) in &mut self.connections {
            if !conn.recurrent || conn.is_self_loop() {
                continue;
            }
            let from = self.nodes[conn.input].layer;
            let to = self.nodes[conn.output].layer;
            if from == to {
                conn.enabled = false;
            } else if from < to {
                conn.recurrent = false;
            }
        }
    }

    fn rebuild_layers(&mut self) {
        let depth = self
            .hidden_ids
            .iter()
            .map(|&id| self.nodes[id].layer)
            .max()
            .unwrap_or(0) as usize;

        let mut layers = vec![Vec::new(); depth + 2];
        layers[0] = self.input_ids.clone();
        for &id in &self.hidden_ids {
            let layer = (self.nodes[id].layer as usize).clamp(1, depth.max(1));
            layers[layer].push(id);
        }
        if let Some(last) = layers.last_mut() {
            *last = self.output_ids.clone();
        }
        self.layers = layers;
    }

    /// Connect `from` to `to` with a freshly sampled weight.
    ///
    /// The connection is recurrent when `from` does not sit on a lower layer
    /// than `to`. Returns `None` if the nodes are unknown, `to` is an input,
    /// the connection already exists, or it would be recurrent in a
    /// feed-forward genome.
    pub fn add_connection<R: Rng>(
        &mut self,
        from: NodeId,
        to: NodeId,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Option<ConnectionId> {
        let from_layer = self.nodes.get(from)?.layer;
        let to_node = self.nodes.get(to)?;
        if to_node.is_input() {
            return None;
        }
        let recurrent = from_layer >= to_node.layer;
        if recurrent && config.feed_forward {
            return None;
        }
        if self.find_connection(from, to).is_some() {
            return None;
        }

        let weight = config.weight.sample(rng);
        Some(self.connect(from, to, weight, recurrent, config, tracker))
    }

    /// Split the connection with `innovation` into a new hidden node.
    ///
    /// The connection is disabled; the inbound half inherits its weight and
    /// the outbound half gets weight 1.0.
    pub fn add_node<R: Rng>(
        &mut self,
        innovation: u64,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Result<NodeId, GenomeError> {
        let id = self
            .find_connection_by_innovation(innovation)
            .ok_or(GenomeError::UnknownConnection(innovation))?;
        let conn = &self.connections[id];
        if !conn.node_addable || conn.recurrent {
            return Err(GenomeError::NotSplittable(innovation));
        }
        Ok(self.split_connection(id, config, tracker, rng))
    }

    fn split_connection<R: Rng>(
        &mut self,
        id: ConnectionId,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> NodeId {
        let conn = &mut self.connections[id];
        conn.enabled = false;
        conn.node_addable = false;
        let (from, to, weight, innovation) = (conn.input, conn.output, conn.weight, conn.innovation);

        let layer = self.nodes[from].layer.saturating_add(1);
        let mut node = NodeGene::hidden(
            split_of(innovation),
            layer,
            config.starting_aggregation,
            config.hidden_activation,
        );
        node.bias = config.bias.sample(rng);
        node.response = config.response.sample(rng);
        let node_id = self.nodes.insert(node);
        self.hidden_ids.push(node_id);

        let inbound = self.connect(from, node_id, weight, false, config, tracker);
        let outbound = self.connect(node_id, to, 1.0, false, config, tracker);
        self.connections[inbound].enabled = true;
        self.connections[outbound].enabled = true;

        self.update_layers(config.feed_forward);
        node_id
    }

    /// Structural mutation followed by parameter mutation.
    pub fn mutate<R: Rng>(
        &mut self,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) {
        self.mutate_structure(config, tracker, rng);
        self.mutate_parameters(config, rng);
    }

    /// Try each structural mutation once, in random order.
    ///
    /// With `single_structural_mutation` set, stops after the first one that
    /// changes the genome. Returns whether anything changed.
    pub fn mutate_structure<R: Rng>(
        &mut self,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> bool {
        let mut ops = [
            StructuralMutation::AddConnection,
            StructuralMutation::AddNode,
            StructuralMutation::DeleteConnection,
            StructuralMutation::DeleteNode,
        ];
        ops.shuffle(rng);

        let mut mutated = false;
        for op in ops {
            let applied = match op {
                StructuralMutation::AddConnection => {
                    self.mutate_add_connection(config, tracker, rng)
                }
                StructuralMutation::AddNode => self.mutate_add_node(config, tracker, rng),
                StructuralMutation::DeleteConnection => self.mutate_delete_connection(config, rng),
                StructuralMutation::DeleteNode => self.mutate_delete_node(config, rng),
            };
            mutated |= applied;
            if applied && config.single_structural_mutation {
                break;
            }
        }
        mutated
    }

    fn mutate_add_connection<R: Rng>(
        &mut self,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> bool {
        if rng.random::<f64>() >= config.add_connection_prob {
            return false;
        }
        let layer_count = self.layers.len();
        if layer_count < 2 {
            return false;
        }

        let (a, b) = if !config.feed_forward && rng.random::<f64>() < config.recurrent_connection_prob
        {
            let a = rng.random_range(1..layer_count);
            (a, rng.random_range(1..=a))
        } else {
            let a = rng.random_range(0..layer_count - 1);
            (a, rng.random_range(a + 1..layer_count))
        };

        let Some(&from) = self.layers[a].choose(rng) else {
            return false;
        };
        let to = if a == b {
            from
        } else {
            match self.layers[b].choose(rng) {
                Some(&id) => id,
                None => return false,
            }
        };

        if let Some(existing) = self.find_connection(from, to) {
            let conn = &mut self.connections[existing];
            if conn.enabled || !config.structural_mutation_advisor {
                return false;
            }
            if config.feed_forward && conn.recurrent {
                return false;
            }
            conn.enabled = true;
            return true;
        }

        self.add_connection(from, to, config, tracker, rng).is_some()
    }

    fn mutate_add_node<R: Rng>(
        &mut self,
        config: &NeatConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> bool {
        if rng.random::<f64>() >= config.add_node_prob
            || self.hidden_ids.len() >= config.max_hidden_nodes
        {
            return false;
        }

        let candidates: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| c.node_addable && c.enabled && !c.recurrent)
            .map(|(id, _)| id)
            .collect();
        let Some(&chosen) = candidates.choose(rng) else {
            return config.structural_mutation_advisor
                && self.mutate_add_connection(config, tracker, rng);
        };

        self.split_connection(chosen, config, tracker, rng);
        true
    }

    fn mutate_delete_connection<R: Rng>(&mut self, config: &NeatConfig, rng: &mut R) -> bool {
        if rng.random::<f64>() >= config.delete_connection_prob {
            return false;
        }
        let ids: Vec<ConnectionId> = self.connections.keys().collect();
        let Some(&id) = ids.choose(rng) else {
            return false;
        };

        self.remove_connection(id);
        self.prune_isolated();
        self.update_layers(config.feed_forward);
        true
    }

    fn mutate_delete_node<R: Rng>(&mut self, config: &NeatConfig, rng: &mut R) -> bool {
        if rng.random::<f64>() >= config.delete_node_prob {
            return false;
        }
        let Some(&id) = self.hidden_ids.choose(rng) else {
            return false;
        };

        self.remove_node(id);
        self.prune_isolated();
        self.update_layers(config.feed_forward);
        true
    }

    /// Perturb or resample every numeric parameter and occasionally swap
    /// functions or toggle connections.
    pub fn mutate_parameters<R: Rng>(&mut self, config: &NeatConfig, rng: &mut R) {
        for (_, node) in &mut self.nodes {
            if node.is_input() {
                continue;
            }
            node.response = config.response.mutate(node.response, rng);
            node.bias = config.bias.mutate(node.bias, rng);

            if node.is_hidden() && rng.random::<f64>() < config.aggregation_mutation_rate {
                if let Some(&aggregation) = config.allowed_aggregations.choose(rng) {
                    node.aggregation = aggregation;
                }
            }
            if rng.random::<f64>() < config.activation_mutation_rate {
                if let Some(&activation) = config.allowed_activations.choose(rng) {
                    node.activation = activation;
                }
            }
        }

        for (_, conn) in &mut self.connections {
            conn.weight = config.weight.mutate(conn.weight, rng);
            if rng.random::<f64>() < config.toggle_probability(conn.enabled) {
                // Feed-forward genomes never switch a recurrent connection on.
                if conn.enabled || !(config.feed_forward && conn.recurrent) {
                    conn.enabled = !conn.enabled;
                }
            }
        }
    }

    /// Compute compatibility distance to another genome for speciation.
    ///
    /// Genes past the other genome's highest innovation count as excess, the
    /// rest of the unmatched ones as disjoint. Genomes with fewer than 20
    /// connections are not size-normalized.
    #[must_use]
    pub fn compatibility_distance(&self, other: &Self, config: &NeatConfig) -> f64 {
        let n1 = self.connections.len();
        let n2 = other.connections.len();
        if n1 == 0 || n2 == 0 {
            return n1.abs_diff(n2) as f64 / 2.0;
        }

        let self_max = self.max_innovation.unwrap_or(0);
        let other_max = other.max_innovation.unwrap_or(0);
        let other_weights: HashMap<u64, f64> = other
            .connections
            .values()
            .map(|c| (c.innovation, c.weight))
            .collect();
        let self_innovations: HashSet<u64> =
            self.connections.values().map(|c| c.innovation).collect();

        let mut excess = 0usize;
        let mut disjoint = 0usize;
        let mut matching = 0usize;
        let mut weight_diff_sum = 0.0;

        for conn in self.connections.values() {
            if let Some(&weight) = other_weights.get(&conn.innovation) {
                matching += 1;
                weight_diff_sum += (conn.weight - weight).abs();
            } else if conn.innovation > other_max {
                excess += 1;
            } else {
                disjoint += 1;
            }
        }
        for conn in other.connections.values() {
            if self_innovations.contains(&conn.innovation) {
                continue;
            }
            if conn.innovation > self_max {
                excess += 1;
            } else {
                disjoint += 1;
            }
        }

        let avg_weight_diff = if matching > 0 {
            weight_diff_sum / matching as f64
        } else {
            5.0
        };
        let size = n1.max(n2);
        let n = if size < 20 { 1.0 } else { size as f64 };

        config.compatibility_excess_coeff * excess as f64 / n
            + config.compatibility_disjoint_coeff * disjoint as f64 / n
            + config.compatibility_weight_coeff * avg_weight_diff
    }

    /// Produce a child from `fitter` and `other`.
    ///
    /// The child starts as a copy of `fitter` and picks up every hidden node
    /// of `other` it lacks. Matching connections take either parent's weight
    /// with equal odds. Connections only `other` has are inherited when the
    /// parents are equally fit and the connection is legal in the child.
    pub fn crossover<R: Rng>(
        fitter: &Self,
        other: &Self,
        same_fitness: bool,
        config: &NeatConfig,
        rng: &mut R,
    ) -> Result<Self, GenomeError> {
        let mut child = fitter.clone();
        child.layout = None;

        let mut by_split: HashMap<i64, NodeId> = child
            .nodes
            .iter()
            .map(|(id, n)| (n.split_innovation, id))
            .collect();
        for &other_id in &other.hidden_ids {
            let Some(node) = other.nodes.get(other_id) else {
                continue;
            };
            if by_split.contains_key(&node.split_innovation) {
                continue;
            }
            let mut copy = node.clone();
            copy.inputs.clear();
            copy.outputs.clear();
            copy.self_recurrent = None;
            let id = child.nodes.insert(copy);
            child.hidden_ids.push(id);
            by_split.insert(node.split_innovation, id);
        }

        let by_innovation: HashMap<u64, ConnectionId> = child
            .connections
            .iter()
            .map(|(id, c)| (c.innovation, id))
            .collect();
        let mut other_connections: Vec<&ConnectionGene> = other.connections.values().collect();
        other_connections.sort_by_key(|c| c.innovation);

        for gene in other_connections {
            if let Some(&id) = by_innovation.get(&gene.innovation) {
                let mine = &mut child.connections[id];
                if rng.random::<f64>() < 0.5 {
                    mine.weight = gene.weight;
                }
                if !mine.enabled || !gene.enabled {
                    let enable = rng.random::<f64>() >= INHERIT_DISABLED_PROB;
                    mine.enabled = enable && !(config.feed_forward && mine.recurrent);
                }
                continue;
            }
            if !same_fitness {
                continue;
            }

            let from = remap_endpoint(other, gene.input, gene.innovation, &by_split)?;
            let to = remap_endpoint(other, gene.output, gene.innovation, &by_split)?;
            let legal = !config.feed_forward
                || child.nodes[from].layer < child.nodes[to].layer
                || child.nodes[to].is_output();
            if legal {
                let mut copy = gene.clone();
                copy.input = from;
                copy.output = to;
                child.attach(copy);
            }
        }

        child.prune_isolated();
        child.update_layers(config.feed_forward);
        child.refresh_node_addable();
        child.reset_state();
        Ok(child)
    }
}

/// Translate an endpoint of one of `other`'s connections into the child.
fn remap_endpoint(
    other: &NeatGenome,
    id: NodeId,
    innovation: u64,
    by_split: &HashMap<i64, NodeId>,
) -> Result<NodeId, GenomeError> {
    let split_innovation = other
        .nodes
        .get(id)
        .ok_or(GenomeError::DanglingConnection(innovation))?
        .split_innovation;
    by_split
        .get(&split_innovation)
        .copied()
        .ok_or(GenomeError::MissingEndpoint {
            innovation,
            split_innovation,
        })
}

/// The split innovation a node created from connection `innovation` carries.
fn split_of(innovation: u64) -> i64 {
    i64::try_from(innovation).unwrap_or(i64::MAX)
}

#[inline]
fn keep<R: Rng>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}
