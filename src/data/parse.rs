use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawGraph {
    #[serde(default)]
    pub(super) nodes: Vec<RawNode>,
    #[serde(default)]
    pub(super) links: Vec<RawLink>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawNode {
    pub(super) id: String,
    #[serde(default)]
    pub(super) label: Option<String>,
    #[serde(default, rename = "type")]
    pub(super) kind: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawLink {
    pub(super) source: String,
    pub(super) target: String,
}

pub(super) fn parse_graph_document(raw: &str) -> Result<RawGraph> {
    let graph: RawGraph = serde_json::from_str(raw).context("invalid graph JSON")?;

    if graph.nodes.is_empty() {
        return Err(anyhow!("graph document contains no nodes"));
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_upstream_document_shape() {
        let raw = r#"{
            "nodes": [
                {"id": "repo-a", "label": "acme/core", "type": "repository"},
                {"id": "mod-b", "label": "core/util", "type": "module"}
            ],
            "links": [
                {"source": "repo-a", "target": "mod-b"}
            ]
        }"#;

        let graph = parse_graph_document(raw).expect("valid document");
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.nodes[0].kind.as_deref(), Some("repository"));
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let raw = r#"{ "nodes": [{"id": "a"}] }"#;
        let graph = parse_graph_document(raw).expect("valid document");
        assert_eq!(graph.nodes[0].label, None);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn rejects_empty_documents() {
        assert!(parse_graph_document(r#"{ "nodes": [] }"#).is_err());
        assert!(parse_graph_document("not json").is_err());
    }
}
