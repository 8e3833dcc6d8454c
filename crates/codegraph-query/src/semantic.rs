//! `semantic_code_search(query, file_glob, limit)` (§4.9.5): embed the
//! query, pull `2*limit` nearest functions and classes by cosine (C8), glob
//! against file path or basename, then take the closest `limit`.

use codegraph_core::graph::Graph;
use codegraph_core::{CodegraphError, NodeId};
use codegraph_embed::EmbeddingService;
use codegraph_store::StoreClient;
use codegraph_store::client::SearchKind;
use globset::Glob;
use serde_json::{json, Value};

pub async fn semantic_code_search(
    graph: &Graph,
    embed: &EmbeddingService,
    store: &StoreClient,
    query: &str,
    file_glob: Option<&str>,
    limit: usize,
) -> Result<Value, CodegraphError> {
    let matcher = file_glob
        .map(|pattern| Glob::new(pattern).map(|g| g.compile_matcher()))
        .transpose()
        .map_err(|err| CodegraphError::InvalidParameter(format!("invalid file_glob: {err}")))?;

    let vector = embed.embed_query(query).await;
    let fetch_k = limit.saturating_mul(2).max(limit);

    let functions = store
        .vector_search_similar(&vector, fetch_k, SearchKind::Function)
        .await
        .map_err(|err| CodegraphError::TransportError(err.to_string()))?;
    let classes = store
        .vector_search_similar(&vector, fetch_k, SearchKind::Class)
        .await
        .map_err(|err| CodegraphError::TransportError(err.to_string()))?;

    let mut candidates: Vec<(String, f32)> = functions.into_iter().chain(classes).collect();
    candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut results = Vec::new();
    for (id, distance) in candidates {
        let Some(node) = graph.node(&NodeId(id)) else { continue };

        if let Some(matcher) = &matcher {
            let path_matches = matcher.is_match(&node.file_path);
            let basename_matches = node.file_path.file_name().map(|name| matcher.is_match(name)).unwrap_or(false);
            if !path_matches && !basename_matches {
                continue;
            }
        }

        results.push(json!({
            "id": node.id.as_str(),
            "name": node.name,
            "kind": node.kind.type_name(),
            "file": node.file_path.to_string_lossy(),
            "similarity": 1.0 - distance,
        }));

        if results.len() >= limit {
            break;
        }
    }

    Ok(json!({ "results": results }))
}

#[cfg(test)]
mod tests {
    use globset::Glob;

    #[test]
    fn glob_matches_basename_regardless_of_directory() {
        let matcher = Glob::new("*.py").unwrap().compile_matcher();
        assert!(matcher.is_match(std::path::Path::new("helper.py")));
        assert!(!matcher.is_match(std::path::Path::new("src/helper.py")));
    }
}
