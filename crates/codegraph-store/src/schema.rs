//! GraphQL schema upload (§4.8 "Schema setup"). The schema mirrors the
//! typed `NodeData` model in `codegraph-core` one-for-one — each node kind
//! becomes a Dgraph GraphQL type with an `id: String! @id` predicate for
//! upsert-by-identity and, where the kind carries one, an
//! `embedding: [Float!] @embedding @search(by: [hnsw(...)])`-less plain
//! float list (the vector predicate is only ever touched by the GraphQL
//! update channel, never declared as searchable here).

use crate::backoff::{with_backoff, Outcome};

pub const GRAPHQL_SCHEMA: &str = r#"
type File {
  id: String! @id
  path: String! @search(by: [exact])
  functionsCount: Int
  classesCount: Int
  structsCount: Int
  importsCount: Int
  astNodeTotal: Int
  contains: [Function] @hasInverse(field: file)
}

type Function {
  id: String! @id
  name: String! @search(by: [exact, term])
  file: String! @search(by: [exact])
  line: Int
  column: Int
  signature: String
  parameters: [String]
  returnType: String
  docstring: String @search(by: [fulltext])
  embedding: [Float!]
  belongsToClass: String
  calls: [Function]
  calledBy: [Function]
  belongsToClassRef: Class @hasInverse(field: containsMethod)
}

type Class {
  id: String! @id
  name: String! @search(by: [exact, term])
  file: String! @search(by: [exact])
  line: Int
  column: Int
  methods: [String]
  baseClasses: [String]
  embedding: [Float!]
  inherits: [Class]
  inheritedBy: [Class]
  containsMethod: [Function]
}

type Struct {
  id: String! @id
  name: String! @search(by: [exact, term])
  file: String! @search(by: [exact])
  line: Int
  column: Int
  fields: [String]
  embedding: [Float!]
}

type Import {
  id: String! @id
  module: String! @search(by: [exact])
  file: String! @search(by: [exact])
  line: Int
  importedItems: [String]
  alias: String
  kind: String
  text: String
}

type Macro {
  id: String! @id
  name: String! @search(by: [exact])
  file: String! @search(by: [exact])
  line: Int
  column: Int
  value: String
  parameters: [String]
}

type Variable {
  id: String! @id
  name: String! @search(by: [exact])
  file: String! @search(by: [exact])
  line: Int
  column: Int
  type: String
  storageClass: String
  isGlobal: Boolean
  containingFunction: String
}

type Typedef {
  id: String! @id
  name: String! @search(by: [exact])
  file: String! @search(by: [exact])
  line: Int
  column: Int
  underlyingType: String
}

type StructFieldAccess {
  id: String! @id
  structName: String! @search(by: [exact])
  fieldName: String! @search(by: [exact])
  file: String! @search(by: [exact])
  line: Int
  column: Int
  accessType: String
  resolvedStructFile: String
  accesses: Struct
}
"#;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("admin endpoint rejected the schema: {0}")]
    Rejected(String),
    #[error("request to admin endpoint failed: {0}")]
    Transport(String),
}

/// Uploads `GRAPHQL_SCHEMA` to `{http_endpoint}/admin/schema`. The admin
/// endpoint may answer HTTP 200 with an embedded "not ready" error while
/// Dgraph is still starting up; that case is retried with backoff, every
/// other error aborts immediately (§4.8).
pub async fn upload_schema(client: &reqwest::Client, http_endpoint: &str) -> Result<(), SchemaError> {
    let url = format!("{http_endpoint}/admin/schema");

    with_backoff(|attempt| {
        let client = client.clone();
        let url = url.clone();
        async move {
            let response = match client
                .post(&url)
                .header("Content-Type", "application/graphql")
                .body(GRAPHQL_SCHEMA)
                .send()
                .await
            {
                Ok(r) => r,
                Err(err) => return Outcome::Retry(SchemaError::Transport(err.to_string())),
            };

            let status = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

            if let Some(message) = first_error_message(&body) {
                let retryable = message.to_lowercase().contains("not ready") || message.to_lowercase().contains("retry");
                return if retryable {
                    Outcome::Retry(SchemaError::Rejected(message))
                } else {
                    Outcome::Done(Err(SchemaError::Rejected(message)))
                };
            }

            if status.is_success() {
                Outcome::Done(Ok(()))
            } else if attempt + 1 < 5 {
                Outcome::Retry(SchemaError::Transport(format!("HTTP {status}")))
            } else {
                Outcome::Done(Err(SchemaError::Transport(format!("HTTP {status}"))))
            }
        }
    })
    .await
}

fn first_error_message(body: &serde_json::Value) -> Option<String> {
    body.get("errors")?.as_array()?.first()?.get("message")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_error_message() {
        let body = json!({"errors": [{"message": "Dgraph is not ready yet"}]});
        assert_eq!(first_error_message(&body).as_deref(), Some("Dgraph is not ready yet"));
    }

    #[test]
    fn no_errors_field_means_none() {
        assert_eq!(first_error_message(&json!({"data": {}})), None);
    }
}
