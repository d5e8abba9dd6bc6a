//! ToolRegistry - the closed set of tools a run may use

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::builtin::{ClockTool, WeatherTool};
use super::{RegistryError, Tool};
use crate::config::ToolsConfig;
use crate::llm::ToolDefinition;

/// Result of looking a tool up by name
#[derive(Clone)]
pub enum Resolution {
    Found(Arc<dyn Tool>),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Found(tool) => f.debug_tuple("Found").field(&tool.name()).finish(),
            Resolution::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Immutable, validated mapping from tool name to handler
///
/// Built once through `ToolRegistryBuilder`; there is no way to add or remove
/// tools afterwards, so an `Arc<ToolRegistry>` can be shared by any number of
/// concurrent runs.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Registry with the built-in weather and clock tools
    pub fn standard(config: &ToolsConfig) -> Result<Self, RegistryError> {
        debug!(weather_seed = ?config.weather_seed, "ToolRegistry::standard: called");
        let weather = match config.weather_seed {
            Some(seed) => WeatherTool::seeded(seed),
            None => WeatherTool::new(),
        };
        Self::builder().register(weather).register(ClockTool::new()).build()
    }

    /// Catalogue advertised to the model, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Look up a tool by its exact (case-sensitive) name
    pub fn resolve(&self, name: &str) -> Resolution {
        match self.index.get(name) {
            Some(&idx) => Resolution::Found(Arc::clone(&self.tools[idx])),
            None => {
                debug!(%name, "ToolRegistry::resolve: not found");
                Resolution::NotFound
            }
        }
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Collects tools and validates them into a `ToolRegistry`
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Validate names and freeze the registry
    pub fn build(self) -> Result<ToolRegistry, RegistryError> {
        debug!(tool_count = %self.tools.len(), "ToolRegistryBuilder::build: called");
        let mut index = HashMap::with_capacity(self.tools.len());
        for (idx, tool) in self.tools.iter().enumerate() {
            let name = tool.name();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if index.insert(name.to_string(), idx).is_some() {
                return Err(RegistryError::DuplicateTool { name: name.to_string() });
            }
        }
        Ok(ToolRegistry {
            tools: self.tools,
            index,
        })
    }
}
