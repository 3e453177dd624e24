//! The board layer stack.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// A single board layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// The layer name.
    pub name: ArcStr,
    /// Whether the layer carries routed signals.
    pub is_signal: bool,
}

/// The ordered list of board layers.
///
/// Layer 0 is the component side; the last layer is the solder side. Inner
/// signal layers are the signal layers at neither end of the stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStructure {
    layers: Vec<Layer>,
}

impl LayerStructure {
    /// Creates a layer structure from an ordered layer list.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// A stack of `count` signal layers named `L0..L{count-1}`.
    pub fn signal_stack(count: usize) -> Self {
        Self {
            layers: (0..count)
                .map(|i| Layer {
                    name: arcstr::format!("L{i}"),
                    is_signal: true,
                })
                .collect(),
        }
    }

    /// The total layer count.
    pub fn count(&self) -> usize {
        self.layers.len()
    }

    /// The number of signal layers.
    pub fn signal_count(&self) -> usize {
        self.layers.iter().filter(|l| l.is_signal).count()
    }

    /// The layer at `index`.
    pub fn layer(&self, index: usize) -> &Layer {
        &self.layers[index]
    }

    /// Whether `index` is a signal layer.
    pub fn is_signal(&self, index: usize) -> bool {
        self.layers.get(index).is_some_and(|l| l.is_signal)
    }

    /// Whether `index` is an inner layer (neither component nor solder
    /// side).
    pub fn is_inner(&self, index: usize) -> bool {
        index != 0 && index + 1 != self.layers.len()
    }

    /// Iterates over all layers.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_stack_layout() {
        let s = LayerStructure::signal_stack(4);
        assert_eq!(s.count(), 4);
        assert_eq!(s.signal_count(), 4);
        assert!(!s.is_inner(0));
        assert!(s.is_inner(1));
        assert!(s.is_inner(2));
        assert!(!s.is_inner(3));
    }
}
