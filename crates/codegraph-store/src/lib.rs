//! Store client (C8) and its disk-resident hash cache (C7). Talks to the
//! property-graph store over two transports: a native gRPC channel for bulk
//! scalar/relationship mutations, and a GraphQL HTTP channel used only to
//! attach embedding vectors after a batch commits (§4.8).

pub mod backoff;
pub mod batch;
pub mod client;
pub mod hash_cache;
pub mod schema;

pub mod dgraph {
    tonic::include_proto!("dgraph");
}

pub use client::{StoreClient, StoreError};
pub use hash_cache::HashCache;
