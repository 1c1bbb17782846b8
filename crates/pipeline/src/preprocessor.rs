//! Core preprocessor trait and the chain node that composes preprocessors

use std::fmt;
use std::sync::Arc;

use aer_types::Signal;

use crate::error::PipelineResult;

/// Core trait that all signal preprocessors must implement.
///
/// A preprocessor is a pure function of its input signal and the parameters fixed at construction.
/// It must not keep state between calls, which is why `process_signal` takes `&self`.
pub trait SignalPreprocessor: Send + Sync + fmt::Debug {
    /// Transform a `rows x samples` signal.
    fn process_signal(&self, signal: Signal) -> PipelineResult<Signal>;

    /// Get the unique name/identifier for this preprocessor type
    fn preprocessor_type(&self) -> &'static str;

    /// Get a human-readable description of what this preprocessor does
    fn description(&self) -> &'static str {
        "Signal preprocessor"
    }
}

/// One node of a preprocessor chain.
///
/// Each node wraps a preprocessor and may link to a parent (run before this node) and a child (run
/// after this node). Evaluating a node runs its whole parent chain first, then its own
/// preprocessor, then its whole child chain, so the effective order is
/// `root parent -> ... -> parent -> self -> child -> ... -> leaf child`.
///
/// Nodes are immutable once built and may only link to nodes that already exist, so a chain built
/// through this API is always finite and acyclic. Use [`crate::ChainGraph`] to wire named nodes
/// after creation; it rejects cycles when a link is attached.
#[derive(Clone)]
pub struct PreprocessorNode {
    preprocessor: Arc<dyn SignalPreprocessor>,
    parent: Option<Arc<PreprocessorNode>>,
    child: Option<Arc<PreprocessorNode>>,
}

impl PreprocessorNode {
    pub fn new<P>(preprocessor: P) -> Self
    where
        P: SignalPreprocessor + 'static,
    {
        Self::from_arc(Arc::new(preprocessor))
    }

    pub fn from_arc(preprocessor: Arc<dyn SignalPreprocessor>) -> Self {
        Self {
            preprocessor,
            parent: None,
            child: None,
        }
    }

    /// Sets the node that runs before this one, replacing any previous parent.
    pub fn with_parent(mut self, parent: PreprocessorNode) -> Self {
        self.parent = Some(Arc::new(parent));
        self
    }

    /// Sets the node that runs after this one, replacing any previous child.
    pub fn with_child(mut self, child: PreprocessorNode) -> Self {
        self.child = Some(Arc::new(child));
        self
    }

    pub fn parent(&self) -> Option<&PreprocessorNode> {
        self.parent.as_deref()
    }

    pub fn child(&self) -> Option<&PreprocessorNode> {
        self.child.as_deref()
    }

    pub fn preprocessor(&self) -> &dyn SignalPreprocessor {
        self.preprocessor.as_ref()
    }

    /// Runs the chain rooted at this node over `signal`.
    pub fn apply(&self, signal: Signal) -> PipelineResult<Signal> {
        let signal = match &self.parent {
            Some(parent) => parent.apply(signal)?,
            None => signal,
        };
        let signal = self.preprocessor.process_signal(signal)?;
        match &self.child {
            Some(child) => child.apply(signal),
            None => Ok(signal),
        }
    }

    /// Lists preprocessor types in the order [`apply`](Self::apply) executes them.
    pub fn resolve(&self) -> Vec<&'static str> {
        let mut chain = Vec::new();
        self.resolve_into(&mut chain);
        chain
    }

    fn resolve_into(&self, chain: &mut Vec<&'static str>) {
        if let Some(parent) = &self.parent {
            parent.resolve_into(chain);
        }
        chain.push(self.preprocessor.preprocessor_type());
        if let Some(child) = &self.child {
            child.resolve_into(chain);
        }
    }

    /// Number of preprocessors executed by [`apply`](Self::apply).
    pub fn len(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.len()) + 1 + self.child.as_ref().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for PreprocessorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessorNode")
            .field("chain", &self.resolve())
            .finish()
    }
}

impl<P> From<P> for PreprocessorNode
where
    P: SignalPreprocessor + 'static,
{
    fn from(preprocessor: P) -> Self {
        PreprocessorNode::new(preprocessor)
    }
}
