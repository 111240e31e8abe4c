//! Graph analysis for layer assignment, using CSR format.
//!
//! A [`GraphTopology`] is a snapshot of the *layering graph* of a genome: the
//! input and hidden nodes plus every non-recurrent connection between them,
//! enabled or not. Output nodes sit on a fixed sentinel layer and never take
//! part. Recurrent connections are excluded, so a well-formed genome yields a
//! DAG; any cycle that does show up is reported as a set of back edges for the
//! genome to reclassify.
//!
//! ## Determinism
//!
//! Nodes are ordered by split innovation and edges by innovation number
//! before CSR construction, so traversal order never depends on arena slot
//! reuse or mutation history.

use std::collections::VecDeque;

use crate::gene::{ConnectionId, NodeId};
use crate::genome::NeatGenome;

/// CSR-format snapshot of a genome's layering graph.
#[derive(Debug, Clone)]
pub struct GraphTopology {
    /// Number of nodes in the graph.
    node_count: usize,
    /// Maps NodeId to dense index (0..node_count), sorted by NodeId.
    node_to_idx: Vec<(NodeId, usize)>,
    /// Maps dense index back to NodeId.
    idx_to_node: Vec<NodeId>,
    /// CSR offsets for forward edges. Length = node_count + 1.
    fwd_offsets: Vec<usize>,
    /// fwd_targets[fwd_offsets[i]..fwd_offsets[i+1]] are successors of node i.
    fwd_targets: Vec<usize>,
    /// Connection IDs parallel to fwd_targets.
    fwd_conn_ids: Vec<ConnectionId>,
    /// Dense indices of the input nodes, in the genome's input order.
    roots: Vec<usize>,
}

impl GraphTopology {
    /// Build the layering graph of `genome`.
    #[must_use]
    pub fn layering_graph(genome: &NeatGenome) -> Self {
        let mut node_entries: Vec<(NodeId, i64)> = genome
            .nodes()
            .iter()
            .filter(|(_, node)| !node.is_output())
            .map(|(id, node)| (id, node.split_innovation))
            .collect();
        node_entries.sort_by_key(|&(_, split)| split);

        let node_count = node_entries.len();
        let idx_to_node: Vec<NodeId> = node_entries.iter().map(|&(id, _)| id).collect();

        // Sorted vec + binary search instead of a HashMap.
        let mut node_to_idx: Vec<(NodeId, usize)> = idx_to_node
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        node_to_idx.sort_by_key(|&(id, _)| id);

        let mut edges: Vec<(ConnectionId, usize, usize, u64)> = genome
            .connections()
            .iter()
            .filter(|(_, c)| !c.recurrent)
            .filter_map(|(id, c)| {
                let from = lookup_idx(&node_to_idx, c.input)?;
                let to = lookup_idx(&node_to_idx, c.output)?;
                Some((id, from, to, c.innovation))
            })
            .collect();
        edges.sort_by_key(|&(_, _, _, innovation)| innovation);

        let mut fwd_offsets = vec![0usize; node_count + 1];
        for &(_, from, _, _) in &edges {
            fwd_offsets[from + 1] += 1;
        }
        for i in 0..node_count {
            fwd_offsets[i + 1] += fwd_offsets[i];
        }

        let mut fwd_targets = vec![0usize; edges.len()];
        let mut fwd_conn_ids = vec![ConnectionId::default(); edges.len()];
        let mut write_pos = fwd_offsets[..node_count].to_vec();
        for &(conn_id, from, to, _) in &edges {
            let pos = write_pos[from];
            fwd_targets[pos] = to;
            fwd_conn_ids[pos] = conn_id;
            write_pos[from] += 1;
        }

        let roots = genome
            .input_ids()
            .iter()
            .filter_map(|&id| lookup_idx(&node_to_idx, id))
            .collect();

        Self {
            node_count,
            node_to_idx,
            idx_to_node,
            fwd_offsets,
            fwd_targets,
            fwd_conn_ids,
            roots,
        }
    }

    /// Get the dense index for a NodeId.
    #[inline]
    #[must_use]
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        lookup_idx(&self.node_to_idx, id)
    }

    /// Get the NodeId for a dense index.
    #[inline]
    #[must_use]
    pub fn node_id(&self, idx: usize) -> Option<NodeId> {
        self.idx_to_node.get(idx).copied()
    }

    /// Number of nodes in the topology.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Iterate over successors of a node.
    #[inline]
    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self.fwd_offsets[idx];
        let end = self.fwd_offsets[idx + 1];
        self.fwd_targets[start..end].iter().copied()
    }

    /// Breadth-first reachability from the input nodes.
    #[must_use]
    pub fn reachable_from_inputs(&self) -> Vec<bool> {
        let mut reached = vec![false; self.node_count];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for &root in &self.roots {
            if !reached[root] {
                reached[root] = true;
                queue.push_back(root);
            }
        }

        while let Some(current) = queue.pop_front() {
            for succ in self.successors(current) {
                if !reached[succ] {
                    reached[succ] = true;
                    queue.push_back(succ);
                }
            }
        }

        reached
    }

    /// Longest-path layer of every node using Kahn's algorithm.
    ///
    /// Nodes without predecessors get layer 0. Returns `None` if the graph has
    /// a cycle.
    #[must_use]
    pub fn longest_path_layers(&self) -> Option<Vec<u32>> {
        let mut in_degree = vec![0usize; self.node_count];
        for &target in &self.fwd_targets {
            in_degree[target] += 1;
        }
        let mut layers = vec![0u32; self.node_count];

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(idx, _)| idx)
            .collect();

        let mut processed = 0;
        while let Some(u) = queue.pop_front() {
            processed += 1;
            for v in self.successors(u) {
                let candidate = layers[u].saturating_add(1);
                if candidate > layers[v] {
                    layers[v] = candidate;
                }

                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    queue.push_back(v);
                }
            }
        }

        (processed == self.node_count).then_some(layers)
    }

    /// Back edges of an iterative DFS that starts from the inputs.
    ///
    /// Removing every returned edge leaves the graph acyclic.
    #[must_use]
    pub fn back_edges(&self) -> Vec<ConnectionId> {
        // 0 = unvisited, 1 = on the current path, 2 = finished
        let mut color = vec![0u8; self.node_count];
        let mut back_edges = Vec::new();
        // (node, next edge offset)
        let mut stack: Vec<(usize, usize)> = Vec::with_capacity(self.node_count);

        let starts = self.roots.iter().copied().chain(0..self.node_count);
        for start in starts {
            if color[start] != 0 {
                continue;
            }
            color[start] = 1;
            stack.push((start, 0));

            while let Some((node, offset)) = stack.pop() {
                let begin = self.fwd_offsets[node];
                let end = self.fwd_offsets[node + 1];

                let mut descended = false;
                for pos in (begin + offset)..end {
                    let neighbor = self.fwd_targets[pos];
                    match color[neighbor] {
                        1 => back_edges.push(self.fwd_conn_ids[pos]),
                        0 => {
                            stack.push((node, pos - begin + 1));
                            color[neighbor] = 1;
                            stack.push((neighbor, 0));
                            descended = true;
                            break;
                        }
                        _ => {}
                    }
                }

                if !descended {
                    color[node] = 2;
                }
            }
        }

        back_edges
    }
}

/// Binary search for NodeId in sorted vec.
fn lookup_idx(sorted: &[(NodeId, usize)], id: NodeId) -> Option<usize> {
    sorted
        .binary_search_by_key(&id, |&(k, _)| k)
        .ok()
        .map(|pos| sorted[pos].1)
}
