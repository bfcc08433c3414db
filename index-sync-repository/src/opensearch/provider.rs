//! OpenSearch backend implementation.
//!
//! Concrete [`SearchIndexBackend`] built on the OpenSearch Rust client.
//! Timeouts, retries and circuit breaking live in `SearchIndexClient`; this
//! module only translates operations into OpenSearch requests and
//! classifies the responses.

use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesGetAliasParts},
    BulkParts, DeleteParts, IndexParts, OpenSearch, SearchParts,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use index_sync_shared::{SearchDocument, SearchHit, SearchRequest, SearchResponse};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexBackend;
use crate::opensearch::index_config::index_settings;
use crate::types::{BulkItemResult, BulkSummary};

/// OpenSearch-backed search index.
pub struct OpenSearchBackend {
    client: OpenSearch,
}

impl OpenSearchBackend {
    /// Create a backend connected to the given OpenSearch URL.
    pub fn new(url: &str) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(url = %url, "Created OpenSearch backend");

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Classify a non-success HTTP status into the error taxonomy.
    fn classify_status(status: u16, operation: &str, message: String) -> SearchIndexError {
        match status {
            408 => SearchIndexError::timeout(operation.to_string()),
            429 => SearchIndexError::throttled(message),
            _ => SearchIndexError::backend(status, message),
        }
    }

    /// Build per-item results from a bulk response body.
    ///
    /// The backend may partially apply a batch, so each item is inspected
    /// individually; items are returned in submission order.
    fn bulk_results(body: &Value, documents: &[SearchDocument]) -> Vec<BulkItemResult> {
        let Some(items) = body["items"].as_array() else {
            // No per-item detail: treat every document as rejected.
            return documents
                .iter()
                .map(|d| {
                    BulkItemResult::failed(
                        d.id.clone(),
                        SearchIndexError::bulk_rejected("bulk response missing items"),
                    )
                })
                .collect();
        };

        documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                // A short item list leaves trailing documents unaccounted
                // for; they must surface as failures so the caller can
                // re-submit them.
                let Some(item) = items.get(i) else {
                    return BulkItemResult::failed(
                        doc.id.clone(),
                        SearchIndexError::bulk_rejected("bulk response item missing"),
                    );
                };

                let action = &item["index"];
                let status = action["status"].as_u64().unwrap_or(0) as u16;
                if (200..300).contains(&status) {
                    BulkItemResult::ok(doc.id.clone())
                } else {
                    let reason = action["error"]["reason"]
                        .as_str()
                        .unwrap_or("unknown bulk item error")
                        .to_string();
                    BulkItemResult::failed(
                        doc.id.clone(),
                        Self::classify_status(status, "bulk_upsert", reason),
                    )
                }
            })
            .collect()
    }

    fn hit_from_json(hit: &Value) -> SearchHit {
        let source = &hit["_source"];
        SearchHit {
            id: hit["_id"].as_str().unwrap_or_default().to_string(),
            full_name: source["full_name"].as_str().map(str::to_string),
            email: source["email"].as_str().map(str::to_string),
            bio: source["bio"].as_str().map(str::to_string),
            active: source["active"].as_bool().unwrap_or(false),
            relevance_score: hit["_score"].as_f64().unwrap_or(0.0),
        }
    }
}

#[async_trait]
impl SearchIndexBackend for OpenSearchBackend {
    async fn upsert_one(
        &self,
        index: &str,
        document: &SearchDocument,
    ) -> Result<(), SearchIndexError> {
        // Full-document replace: the mapper always produces the complete
        // projection, so index (not partial update) keeps upserts idempotent.
        let body = serde_json::to_value(&document.fields)
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

        let response = self
            .client
            .index(IndexParts::IndexId(index, &document.id))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Upsert request failed");
            return Err(Self::classify_status(
                status.as_u16(),
                "upsert_one",
                error_body,
            ));
        }

        debug!(index, doc_id = %document.id, "Document upserted");
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<BulkSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BulkSummary::empty());
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            body.push(json!({ "index": { "_id": doc.id } }).into());
            body.push(
                serde_json::to_value(&doc.fields)
                    .map_err(|e| SearchIndexError::serialization(e.to_string()))?
                    .into(),
            );
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(Self::classify_status(
                status.as_u16(),
                "bulk_upsert",
                error_body,
            ));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

        let summary = BulkSummary::from_results(Self::bulk_results(&parsed, documents));
        if summary.failed > 0 {
            warn!(
                index,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Bulk upsert partially applied"
            );
        }
        Ok(summary)
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable: a delete for a document that was never indexed
        // is a no-op.
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(Self::classify_status(status.as_u16(), "delete", error_body));
        }

        debug!(index, doc_id = %id, "Document deleted");
        Ok(())
    }

    async fn query(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchIndexError> {
        let body = json!({
            "from": request.offset,
            "size": request.limit,
            "query": {
                "multi_match": {
                    "query": request.query,
                    "type": "bool_prefix",
                    "fields": [
                        "full_name",
                        "full_name._2gram",
                        "full_name._3gram",
                        "email",
                        "bio"
                    ]
                }
            }
        });

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status.as_u16(), "query", error_body));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

        let results: Vec<SearchHit> = parsed["hits"]["hits"]
            .as_array()
            .map(|hits| hits.iter().map(Self::hit_from_json).collect())
            .unwrap_or_default();

        Ok(SearchResponse::new(
            results,
            parsed["hits"]["total"]["value"].as_u64().unwrap_or(0),
            parsed["took"].as_u64().unwrap_or(0),
        ))
    }

    async fn create_generation(&self, name: &str) -> Result<(), SearchIndexError> {
        if name.trim().is_empty() {
            return Err(SearchIndexError::validation(
                "Generation name cannot be empty",
            ));
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .body(index_settings())
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Create generation failed");
            return Err(Self::classify_status(
                status.as_u16(),
                "create_generation",
                error_body,
            ));
        }

        info!(generation = %name, "Created index generation");
        Ok(())
    }

    async fn swap_alias(
        &self,
        alias: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<(), SearchIndexError> {
        // Remove-old and add-new in ONE actions request: OpenSearch applies
        // the list atomically, so the alias never resolves to zero or two
        // generations.
        let mut actions = Vec::new();
        if let Some(from) = from {
            actions.push(json!({ "remove": { "index": from, "alias": alias } }));
        }
        actions.push(json!({ "add": { "index": to, "alias": alias } }));

        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Alias swap failed");
            return Err(Self::classify_status(
                status.as_u16(),
                "swap_alias",
                error_body,
            ));
        }

        info!(alias, from = from.unwrap_or("<none>"), to, "Alias repointed");
        Ok(())
    }

    async fn delete_generation(&self, name: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();

        // Deleting an already-gone generation is fine: orphan cleanup may
        // run more than once.
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete generation failed");
            return Err(Self::classify_status(
                status.as_u16(),
                "delete_generation",
                error_body,
            ));
        }

        info!(generation = %name, "Deleted index generation");
        Ok(())
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(
                status.as_u16(),
                "resolve_alias",
                error_body,
            ));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

        // Response keys are the index names carrying the alias. The engine
        // maintains exactly one; anything else indicates external tampering.
        let mut generations: Vec<&str> = parsed
            .as_object()
            .map(|obj| obj.keys().map(String::as_str).collect())
            .unwrap_or_default();
        generations.sort_unstable();

        if generations.len() > 1 {
            warn!(
                alias,
                count = generations.len(),
                "Alias references multiple generations; using the newest"
            );
        }

        Ok(generations.last().map(|s| s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_sync_shared::FieldValue;

    fn doc(id: &str) -> SearchDocument {
        SearchDocument::new(id).with_field("full_name", FieldValue::Text("Ada".to_string()))
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            OpenSearchBackend::classify_status(429, "bulk_upsert", "slow down".to_string()),
            SearchIndexError::Throttled(_)
        ));
        assert!(matches!(
            OpenSearchBackend::classify_status(408, "query", String::new()),
            SearchIndexError::Timeout(_)
        ));
        assert!(OpenSearchBackend::classify_status(503, "query", String::new()).is_transient());
        assert!(!OpenSearchBackend::classify_status(400, "query", String::new()).is_transient());
    }

    #[test]
    fn test_bulk_results_partial_failure() {
        let documents = vec![doc("a"), doc("b"), doc("c")];
        let body = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": { "_id": "b", "status": 429, "error": { "reason": "throttled" } } },
                { "index": { "_id": "c", "status": 400, "error": { "reason": "mapper_parsing_exception" } } }
            ]
        });

        let results = OpenSearchBackend::bulk_results(&body, &documents);
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.as_ref().is_some_and(|e| e.is_transient()));
        assert!(!results[2].success);
        assert!(results[2].error.as_ref().is_some_and(|e| !e.is_transient()));
    }

    #[test]
    fn test_bulk_results_short_item_list_fails_trailing_documents() {
        let documents = vec![doc("a"), doc("b"), doc("c")];
        let body = json!({
            "errors": false,
            "items": [
                { "index": { "_id": "a", "status": 201 } }
            ]
        });

        let results = OpenSearchBackend::bulk_results(&body, &documents);
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(!results[2].success);
        assert_eq!(results[2].id, "c");
    }

    #[test]
    fn test_bulk_results_missing_items_rejects_all() {
        let documents = vec![doc("a"), doc("b")];
        let body = json!({ "took": 1 });

        let results = OpenSearchBackend::bulk_results(&body, &documents);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
    }

    #[test]
    fn test_hit_from_json() {
        let hit = json!({
            "_id": "r1",
            "_score": 1.5,
            "_source": {
                "full_name": "Ada Lovelace",
                "email": "ada@example.com",
                "active": true
            }
        });

        let parsed = OpenSearchBackend::hit_from_json(&hit);
        assert_eq!(parsed.id, "r1");
        assert_eq!(parsed.full_name, Some("Ada Lovelace".to_string()));
        assert_eq!(parsed.bio, None);
        assert!(parsed.active);
        assert_eq!(parsed.relevance_score, 1.5);
    }
}
