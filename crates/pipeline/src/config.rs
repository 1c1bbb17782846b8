//! Preprocessor chain configuration types and serialization

use std::collections::BTreeMap;

use aer_types::SignalType;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::graph::ChainGraph;
use crate::preprocessor::PreprocessorNode;
use crate::registry::{PreprocessorParams, PreprocessorRegistry};

/// A named chain of preprocessors.
///
/// Nodes are created through a [`PreprocessorRegistry`] and wired by their `parent`/`child`
/// names; `head` is the node whose evaluation runs the whole chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Entry point of the chain
    pub head: String,
    /// Node definitions
    pub nodes: Vec<NodeConfig>,
}

/// Individual preprocessor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node name within the chain
    pub name: String,
    /// Preprocessor type identifier
    #[serde(rename = "type")]
    pub preprocessor_type: String,
    #[serde(default)]
    pub params: PreprocessorParams,
    /// Node that runs before this one
    #[serde(default)]
    pub parent: Option<String>,
    /// Node that runs after this one
    #[serde(default)]
    pub child: Option<String>,
}

impl NodeConfig {
    pub fn new(name: &str, preprocessor_type: &str, params: PreprocessorParams) -> Self {
        Self {
            name: name.to_string(),
            preprocessor_type: preprocessor_type.to_string(),
            params,
            parent: None,
            child: None,
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_child(mut self, child: &str) -> Self {
        self.child = Some(child.to_string());
        self
    }
}

impl ChainConfig {
    /// Builds the chain. Unknown types, bad parameters, dangling names and cycles all fail here.
    pub fn build(&self, registry: &PreprocessorRegistry) -> PipelineResult<PreprocessorNode> {
        if self.nodes.is_empty() {
            return Err(PipelineError::InvalidConfiguration {
                message: "Chain must contain at least one preprocessor".to_string(),
            });
        }

        let mut graph = ChainGraph::new();
        for node in &self.nodes {
            let preprocessor = registry.create(&node.preprocessor_type, &node.params)?;
            graph.add_node(&node.name, preprocessor)?;
        }

        for node in &self.nodes {
            if let Some(parent) = &node.parent {
                graph.set_parent(&node.name, parent)?;
            }
            if let Some(child) = &node.child {
                graph.set_child(&node.name, child)?;
            }
        }

        graph.build(&self.head)
    }

    /// Load chain configuration from JSON
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save chain configuration to JSON
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Preprocessor chains for several signal types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreprocessingConfig {
    pub chains: BTreeMap<SignalType, ChainConfig>,
}

impl PreprocessingConfig {
    /// Builds every configured chain, keyed by signal type.
    pub fn build_all(
        &self,
        registry: &PreprocessorRegistry,
    ) -> PipelineResult<BTreeMap<SignalType, PreprocessorNode>> {
        let mut built = BTreeMap::new();
        for (signal_type, chain) in &self.chains {
            let node = chain.build(registry)?;
            info!("Configured {} preprocessing: {:?}", signal_type, node.resolve());
            built.insert(signal_type.clone(), node);
        }
        Ok(built)
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
