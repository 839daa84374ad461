//! The typed change catalogue
//!
//! Each [`Change`] is one kind of cluster modification a migration file can
//! declare. The engine never sees these: [`Change::to_operation`] translates
//! every variant into the opaque [`Operation`] the core consumes, and that is
//! the whole coupling.

use serde::Deserialize;

use seaway_core::{Method, Operation};

/// How an `INDEX_DOCUMENT` change behaves when the document already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpType {
    /// Fail if the document id is already present
    Create,
    /// Overwrite any existing document
    Index,
}

/// One declared cluster change
///
/// The `definition` fields hold raw JSON exactly as written in the migration
/// file; it is passed to the cluster untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Change {
    CreateIndex {
        index: String,
        definition: String,
    },
    DeleteIndex {
        index: String,
    },
    CreateOrUpdateIndexTemplate {
        template: String,
        definition: String,
    },
    DeleteIndexTemplate {
        template: String,
    },
    UpdateMapping {
        indices: Vec<String>,
        definition: String,
    },
    IndexDocument {
        index: String,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        op_type: Option<OpType>,
        definition: String,
    },
    UpdateDocument {
        index: String,
        id: String,
        definition: String,
    },
    DeleteDocument {
        index: String,
        id: String,
    },
}

impl Change {
    /// Translate into the opaque operation the engine executes
    pub fn to_operation(&self) -> Operation {
        match self {
            Self::CreateIndex { index, definition } => {
                Operation::new(Method::Put, format!("/{}", index))
                    .with_header("Content-Type", "application/json")
                    .with_body(definition.clone())
            }
            Self::DeleteIndex { index } => Operation::new(Method::Delete, format!("/{}", index)),
            Self::CreateOrUpdateIndexTemplate {
                template,
                definition,
            } => Operation::new(Method::Put, format!("/_template/{}", template))
                .with_header("Content-Type", "application/json")
                .with_body(definition.clone()),
            Self::DeleteIndexTemplate { template } => {
                Operation::new(Method::Delete, format!("/_template/{}", template))
            }
            Self::UpdateMapping {
                indices,
                definition,
            } => Operation::new(Method::Put, format!("/{}/_mapping", indices.join(",")))
                .with_header("Content-Type", "application/json")
                .with_body(definition.clone()),
            Self::IndexDocument {
                index,
                id,
                op_type,
                definition,
            } => {
                let mut operation = match id {
                    Some(id) => Operation::new(Method::Put, format!("/{}/_doc/{}", index, id)),
                    // Without an id the cluster assigns one; creation only.
                    None => Operation::new(Method::Post, format!("/{}/_doc", index)),
                };
                if let Some(OpType::Create) = op_type {
                    operation = operation.with_param("op_type", "create");
                }
                operation
                    .with_header("Content-Type", "application/json")
                    .with_body(definition.clone())
            }
            Self::UpdateDocument {
                index,
                id,
                definition,
            } => Operation::new(Method::Post, format!("/{}/_update/{}", index, id))
                .with_header("Content-Type", "application/json")
                .with_body(definition.clone()),
            Self::DeleteDocument { index, id } => {
                Operation::new(Method::Delete, format!("/{}/_doc/{}", index, id))
            }
        }
    }
}
