use serde::{Deserialize, Serialize};

/// What one connected provider can do, as seen by the planner.
///
/// Exists only while the provider is connected and ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Registered provider name.
    pub name: String,
    /// Free-text description of the provider's capabilities.
    pub capability_summary: String,
}

impl CapabilityDescriptor {
    /// Creates a descriptor.
    pub fn new(name: impl Into<String>, capability_summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capability_summary: capability_summary.into(),
        }
    }

    /// Renders the descriptor as a tagged block keyed by provider name.
    pub fn to_block(&self) -> String {
        format!(
            "<provider name=\"{}\">\n{}\n</provider>\n",
            self.name,
            self.capability_summary.trim()
        )
    }
}
