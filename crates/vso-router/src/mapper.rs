//! The tool-descriptor → capability mapping function: a pure total
//! function from a tool descriptor to zero-or-more capability names, each
//! with an optional score.

use serde_json::Value;

use vso_core::ids::Capability;

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// Supplied at [`crate::Router`] construction; maps one server's advertised
/// tool to the capabilities it satisfies.
pub trait CapabilityMapper: Send + Sync {
    fn map(&self, tool: &ToolDescriptor) -> Vec<(Capability, f64)>;
}

/// Treats a tool's own name as the capability it provides, scored 1.0. A
/// reasonable default when servers are expected to expose one tool per
/// capability with matching names; deployments with richer tool catalogs
/// supply their own [`CapabilityMapper`].
pub struct IdentityMapper;

impl CapabilityMapper for IdentityMapper {
    fn map(&self, tool: &ToolDescriptor) -> Vec<(Capability, f64)> {
        vec![(Capability::new(tool.name.clone()), 1.0)]
    }
}

/// Parses the standard `tools/list` response shape:
/// `{tools:[{name, description?, inputSchema?}]}`.
pub fn parse_tool_descriptors(list_tools_result: &Value) -> Vec<ToolDescriptor> {
    list_tools_result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|t| {
                    let name = t.get("name")?.as_str()?.to_string();
                    Some(ToolDescriptor {
                        name,
                        description: t
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        input_schema: t.get("inputSchema").cloned(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_mapper_uses_tool_name() {
        let tool = ToolDescriptor {
            name: "blockchain".into(),
            description: None,
            input_schema: None,
        };
        let mapped = IdentityMapper.map(&tool);
        assert_eq!(mapped, vec![(Capability::new("blockchain"), 1.0)]);
    }

    #[test]
    fn parse_tool_descriptors_reads_standard_shape() {
        let result = json!({
            "tools": [
                {"name": "vanity_address", "description": "mines an address"},
                {"name": "no_description"}
            ]
        });
        let descriptors = parse_tool_descriptors(&result);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "vanity_address");
        assert!(descriptors[1].description.is_none());
    }

    #[test]
    fn parse_tool_descriptors_tolerates_missing_tools_key() {
        assert!(parse_tool_descriptors(&json!({})).is_empty());
    }
}
