//! OpenSearch index settings and mappings.
//!
//! Every generation is created from the same settings, so a reindex after a
//! mapping change only requires editing this module and re-running the
//! orchestrator.

use serde_json::{json, Value};

/// Get the index settings and mappings for a record index generation.
///
/// - **search_as_you_type** on `full_name` and `bio` for autocomplete
/// - **keyword** on `email` for exact lookups
/// - **date** on `updated_at`
///
/// Sharding: 1 primary shard, 1 replica.
pub fn index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": {
                "first_name": {
                    "type": "text"
                },
                "last_name": {
                    "type": "text"
                },
                "full_name": {
                    "type": "search_as_you_type",
                    "fields": {
                        "raw": {
                            "type": "keyword"
                        }
                    }
                },
                "email": {
                    "type": "keyword"
                },
                "bio": {
                    "type": "search_as_you_type"
                },
                "active": {
                    "type": "boolean"
                },
                "updated_at": {
                    "type": "date"
                }
            }
        }
    })
}
