//! 2D node placement for renderers.
//!
//! Layers are spread evenly from left to right and each layer's nodes are
//! centred vertically. The result is cached on the genome until the canvas
//! dimensions change or the genome's structure does.

use slotmap::SecondaryMap;

use crate::gene::{NodeId, NodeType};
use crate::genome::NeatGenome;

/// Gap kept between the canvas edge and the input and output columns.
const EDGE_PADDING: f64 = 4.0;

/// Node coordinates for a given canvas size.
#[derive(Debug, Clone)]
pub struct Layout {
    width: u32,
    height: u32,
    node_size: f64,
    positions: SecondaryMap<NodeId, [f64; 2]>,
}

impl Layout {
    fn compute(genome: &NeatGenome, width: u32, height: u32, node_size: f64) -> Self {
        let layers = genome.layers();
        let last = layers.len().saturating_sub(1).max(1) as f64;
        let (w, h) = (f64::from(width), f64::from(height));

        let mut positions = SecondaryMap::with_capacity(genome.nodes().len());
        for (depth, layer) in layers.iter().enumerate() {
            let margin = h / layer.len().max(1) as f64;
            let spread = (layer.len() as f64 - 1.0) * margin;
            for (k, &id) in layer.iter().enumerate() {
                let Some(node) = genome.node(id) else {
                    continue;
                };
                let mut x = depth as f64 / last * w;
                let y = k as f64 * margin + h / 2.0 - spread / 2.0;
                match node.node_type {
                    NodeType::Output => x -= node_size + EDGE_PADDING,
                    NodeType::Input => x += EDGE_PADDING,
                    NodeType::Hidden => x -= node_size / 2.0,
                }
                positions.insert(id, [x, y]);
            }
        }

        Self {
            width,
            height,
            node_size,
            positions,
        }
    }

    fn matches(&self, width: u32, height: u32, node_size: f64) -> bool {
        self.width == width && self.height == height && self.node_size == node_size
    }

    /// `[x, y]` of a node, if it belongs to the genome this layout was made for.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<[f64; 2]> {
        self.positions.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, [f64; 2])> + '_ {
        self.positions.iter().map(|(id, &pos)| (id, pos))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl NeatGenome {
    /// Node coordinates for a `width` x `height` canvas with nodes drawn
    /// `node_size` wide.
    ///
    /// Recomputed only when the arguments differ from the previous call or
    /// the structure has changed since.
    pub fn node_coordinates(&mut self, width: u32, height: u32, node_size: f64) -> &Layout {
        let cached = self
            .layout
            .take()
            .filter(|layout| layout.matches(width, height, node_size));
        let layout = match cached {
            Some(layout) => layout,
            None => Layout::compute(self, width, height, node_size),
        };
        self.layout.insert(layout)
    }
}
