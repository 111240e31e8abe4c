//! Forward evaluation of a genome.
//!
//! Nodes are activated layer by layer. A node's value is
//! `activation(response * aggregate(inbound) + bias)` over its enabled inbound
//! connections. A recurrent connection's source sits on the same or a later
//! layer, so it still holds the value from the previous call when it is read.
//! That stored value is the network's one step of memory; call
//! [`NeatGenome::reset_state`] to clear it.

use crate::error::GenomeError;
use crate::genome::NeatGenome;

impl NeatGenome {
    /// Evaluate the network on `inputs`, returning one value per output node.
    ///
    /// # Errors
    ///
    /// [`GenomeError::InputLength`] if `inputs` does not have one value per
    /// input node.
    pub fn feed(&mut self, inputs: &[f64]) -> Result<Vec<f64>, GenomeError> {
        if inputs.len() != self.input_ids.len() {
            return Err(GenomeError::InputLength {
                expected: self.input_ids.len(),
                actual: inputs.len(),
            });
        }

        for (&id, &value) in self.input_ids.iter().zip(inputs) {
            self.nodes[id].value = value;
        }

        let leak = self.activation.relu_leak;
        let mut incoming: Vec<f64> = Vec::new();
        for layer in self.layers.iter().skip(1) {
            for &id in layer {
                let node = &self.nodes[id];
                incoming.clear();
                incoming.extend(
                    node.inputs
                        .iter()
                        .filter_map(|&c| self.connections.get(c))
                        .filter(|c| c.enabled)
                        .map(|c| self.nodes[c.input].value * c.weight),
                );
                let sum = node.response * node.aggregation.aggregate(&incoming) + node.bias;
                let value = node.activation.apply(sum, leak);
                self.nodes[id].value = value;
            }
        }

        Ok(self
            .output_ids
            .iter()
            .map(|&id| self.nodes[id].value)
            .collect())
    }

    /// Evaluate and report, per output, whether its value is above the
    /// threshold configured for its activation function.
    ///
    /// # Errors
    ///
    /// Same as [`NeatGenome::feed`].
    pub fn feed_thresholded(&mut self, inputs: &[f64]) -> Result<Vec<bool>, GenomeError> {
        let values = self.feed(inputs)?;
        Ok(self
            .output_ids
            .iter()
            .zip(values)
            .map(|(&id, value)| {
                self.activation
                    .is_activated(self.nodes[id].activation, value)
            })
            .collect())
    }
}
