//! Named preprocessor chain construction with attachment-time cycle detection.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessor::{PreprocessorNode, SignalPreprocessor};

/// Direction of a link from a node to its neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// The target runs before the source.
    Parent,
    /// The target runs after the source.
    Child,
}

struct ChainEntry {
    name: String,
    preprocessor: Arc<dyn SignalPreprocessor>,
}

/// A set of named preprocessors whose parent/child links can be wired after creation.
///
/// Every link is an edge from a node to its parent or child. Attaching a link that would make a
/// node reachable from itself fails with [`PipelineError::CircularDependency`], so any chain
/// built from the graph terminates.
#[derive(Default)]
pub struct ChainGraph {
    graph: DiGraph<ChainEntry, Link>,
    index: HashMap<String, NodeIndex>,
}

impl ChainGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named preprocessor. Names must be unique within the graph.
    pub fn add_node(
        &mut self,
        name: &str,
        preprocessor: Arc<dyn SignalPreprocessor>,
    ) -> PipelineResult<()> {
        if self.index.contains_key(name) {
            return Err(PipelineError::InvalidConfiguration {
                message: format!("Preprocessor name '{}' already exists", name),
            });
        }
        let idx = self.graph.add_node(ChainEntry {
            name: name.to_string(),
            preprocessor,
        });
        self.index.insert(name.to_string(), idx);
        Ok(())
    }

    /// Makes `parent` run before `node`, replacing any previous parent of `node`.
    pub fn set_parent(&mut self, node: &str, parent: &str) -> PipelineResult<()> {
        self.attach(node, parent, Link::Parent)
    }

    /// Makes `child` run after `node`, replacing any previous child of `node`.
    pub fn set_child(&mut self, node: &str, child: &str) -> PipelineResult<()> {
        self.attach(node, child, Link::Child)
    }

    /// Returns the name of the node linked from `node` in the given direction.
    pub fn linked(&self, node: &str, link: Link) -> PipelineResult<Option<&str>> {
        let idx = self.lookup(node)?;
        Ok(self
            .existing_link(idx, link)
            .map(|(_, target)| self.graph[target].name.as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Builds the immutable chain whose entry point is `head`.
    pub fn build(&self, head: &str) -> PipelineResult<PreprocessorNode> {
        let idx = self.lookup(head)?;
        let node = self.build_node(idx);
        debug!("Built preprocessor chain '{}': {:?}", head, node.resolve());
        Ok(node)
    }

    fn build_node(&self, idx: NodeIndex) -> PreprocessorNode {
        let mut node = PreprocessorNode::from_arc(Arc::clone(&self.graph[idx].preprocessor));
        if let Some((_, parent)) = self.existing_link(idx, Link::Parent) {
            node = node.with_parent(self.build_node(parent));
        }
        if let Some((_, child)) = self.existing_link(idx, Link::Child) {
            node = node.with_child(self.build_node(child));
        }
        node
    }

    fn attach(&mut self, node: &str, target: &str, link: Link) -> PipelineResult<()> {
        let from = self.lookup(node)?;
        let to = self.lookup(target)?;

        // Walk everything reachable from the target; finding `from` means a cycle.
        if has_path_connecting(&self.graph, to, from, None) {
            return Err(PipelineError::CircularDependency {
                node: node.to_string(),
                target: target.to_string(),
            });
        }

        if let Some((edge, _)) = self.existing_link(from, link) {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(from, to, link);
        debug!("Linked '{}' -> {:?} '{}'", node, link, target);
        Ok(())
    }

    fn existing_link(
        &self,
        idx: NodeIndex,
        link: Link,
    ) -> Option<(petgraph::graph::EdgeIndex, NodeIndex)> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|e| *e.weight() == link)
            .map(|e| (e.id(), e.target()))
    }

    fn lookup(&self, name: &str) -> PipelineResult<NodeIndex> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::NodeNotFound {
                name: name.to_string(),
            })
    }
}
