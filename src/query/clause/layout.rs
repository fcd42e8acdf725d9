//! LAYOUT: layout settings passed along in the side-channel

use super::GraphTransform;
use crate::graph::{DataEntry, LayoutSettings, PropertyGraph, LAYOUT_KEY};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutClause {
    pub settings: LayoutSettings,
}

impl GraphTransform for LayoutClause {
    fn transform(&self, mut graph: PropertyGraph) -> PropertyGraph {
        graph
            .data_mut()
            .insert(LAYOUT_KEY.to_string(), DataEntry::Layout(self.settings.clone()));
        graph
    }
}
