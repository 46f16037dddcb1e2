//! Elasticsearch writer for billing documents
//!
//! Documents go to one index per kind and day, named
//! `{prefix}-{kind}-{yyyy-MM-dd}`. Document ids are derived from the billed
//! record and the day, so re-indexing a day overwrites instead of duplicating.

use chrono::NaiveDate;
use cloudpipe_core::billing::{RunBillingDoc, StorageBillingDoc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{BillingError, Result, check_status};

/// A document that can be written to a billing index
pub trait BillingDocument: Serialize {
    const KIND: &'static str;

    fn doc_id(&self) -> &str;
    fn date(&self) -> NaiveDate;
}

impl BillingDocument for RunBillingDoc {
    const KIND: &'static str = RunBillingDoc::KIND;

    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl BillingDocument for StorageBillingDoc {
    const KIND: &'static str = StorageBillingDoc::KIND;

    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Outcome of a bulk request
#[derive(Debug, Default, PartialEq)]
pub struct BulkReport {
    pub indexed: usize,
    /// Document id and reason of every rejected document
    pub failed: Vec<(String, String)>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ElasticWriter {
    base_url: String,
    prefix: String,
    client: reqwest::Client,
}

impl ElasticWriter {
    pub fn new(base_url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prefix: prefix.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn index_name(&self, kind: &str, date: NaiveDate) -> String {
        format!("{}-{}-{}", self.prefix, kind, date.format("%Y-%m-%d"))
    }

    /// Install the index template covering every billing index
    pub async fn ensure_template(&self) -> Result<()> {
        let url = format!("{}/_index_template/{}", self.base_url, self.prefix);
        let template = json!({
            "index_patterns": [format!("{}-*", self.prefix)],
            "template": {
                "mappings": {
                    "properties": {
                        "doc_id": { "type": "keyword" },
                        "run_id": { "type": "keyword" },
                        "pipeline_id": { "type": "keyword" },
                        "pipeline_name": { "type": "keyword" },
                        "owner": { "type": "keyword" },
                        "instance_type": { "type": "keyword" },
                        "cloud_region": { "type": "keyword" },
                        "spot": { "type": "boolean" },
                        "storage_id": { "type": "keyword" },
                        "storage_name": { "type": "keyword" },
                        "storage_kind": { "type": "keyword" },
                        "date": { "type": "date", "format": "yyyy-MM-dd" },
                        "usage_minutes": { "type": "long" },
                        "usage_bytes": { "type": "long" },
                        "compute_cost": { "type": "long" },
                        "disk_cost": { "type": "long" },
                        "cost": { "type": "long" }
                    }
                }
            }
        });

        let response = self.client.put(&url).json(&template).send().await?;
        check_status(response).await?;

        tracing::info!("Index template {} is in place", self.prefix);
        Ok(())
    }

    /// Index documents with one `_bulk` request
    pub async fn bulk_index<D: BillingDocument>(&self, docs: &[D]) -> Result<BulkReport> {
        if docs.is_empty() {
            return Ok(BulkReport::default());
        }

        let body = self.bulk_body(docs)?;
        let url = format!("{}/_bulk", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        let response: BulkResponse = check_status(response).await?.json().await?;

        let mut report = BulkReport::default();
        for item in response.items {
            let Some(result) = item.index else {
                continue;
            };
            match result.error {
                Some(error) => report.failed.push((result.id, error.describe())),
                None if (200..300).contains(&result.status) => report.indexed += 1,
                None => report
                    .failed
                    .push((result.id, format!("status {}", result.status))),
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                "Bulk indexing of {} rejected {} of {} documents",
                D::KIND,
                report.failed.len(),
                docs.len()
            );
        }

        Ok(report)
    }

    fn bulk_body<D: BillingDocument>(&self, docs: &[D]) -> Result<String> {
        let mut body = String::new();
        for doc in docs {
            let action = json!({
                "index": {
                    "_index": self.index_name(D::KIND, doc.date()),
                    "_id": doc.doc_id(),
                }
            });
            let source = serde_json::to_string(doc)
                .map_err(|e| BillingError::InvalidRecord(e.to_string()))?;
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&source);
            body.push('\n');
        }
        Ok(body)
    }
}

// =============================================================================
// Bulk Response
// =============================================================================

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    index: Option<BulkItemResult>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    status: u16,
    error: Option<BulkItemError>,
}

#[derive(Debug, Deserialize)]
struct BulkItemError {
    #[serde(rename = "type")]
    kind: Option<String>,
    reason: Option<String>,
}

impl BulkItemError {
    fn describe(&self) -> String {
        match (&self.kind, &self.reason) {
            (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
            (Some(kind), None) => kind.clone(),
            (None, Some(reason)) => reason.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpipe_core::domain::storage::StorageKind;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn storage_doc(name: &str) -> StorageBillingDoc {
        let storage_id = Uuid::new_v4();
        StorageBillingDoc {
            doc_id: StorageBillingDoc::doc_id_for(storage_id, day()),
            storage_id,
            storage_name: name.to_string(),
            storage_kind: StorageKind::ObjectStorage,
            cloud_region: "us-east-1".to_string(),
            date: day(),
            usage_bytes: 1024,
            cost: 12,
        }
    }

    #[test]
    fn test_index_name() {
        let writer = ElasticWriter::new("http://localhost:9200/", "cp-billing");
        assert_eq!(
            writer.index_name(RunBillingDoc::KIND, day()),
            "cp-billing-pipeline-run-2024-03-01"
        );
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let writer = ElasticWriter::new("http://localhost:9200", "cp-billing");
        let doc = storage_doc("results");
        let body = writer.bulk_body(std::slice::from_ref(&doc)).unwrap();

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "cp-billing-storage-2024-03-01");
        assert_eq!(action["index"]["_id"], doc.doc_id.as_str());
        assert!(body.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_ensure_template() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/_index_template/cp-billing"))
            .and(body_string_contains("cp-billing-*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(1)
            .mount(&server)
            .await;

        let writer = ElasticWriter::new(server.uri(), "cp-billing");
        writer.ensure_template().await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_index_reports_rejected_documents() {
        let server = MockServer::start().await;
        let ok = storage_doc("raw-data");
        let rejected = storage_doc("scratch");

        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("content-type", "application/x-ndjson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "took": 3,
                "errors": true,
                "items": [
                    { "index": { "_id": ok.doc_id, "status": 201 } },
                    { "index": {
                        "_id": rejected.doc_id,
                        "status": 400,
                        "error": { "type": "mapper_parsing_exception", "reason": "failed to parse" }
                    } }
                ]
            })))
            .mount(&server)
            .await;

        let writer = ElasticWriter::new(server.uri(), "cp-billing");
        let report = writer.bulk_index(&[ok, rejected.clone()]).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, rejected.doc_id);
        assert!(report.failed[0].1.starts_with("mapper_parsing_exception"));
    }

    #[tokio::test]
    async fn test_bulk_index_empty_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let writer = ElasticWriter::new(server.uri(), "cp-billing");
        let docs: Vec<RunBillingDoc> = Vec::new();
        assert_eq!(writer.bulk_index(&docs).await.unwrap(), BulkReport::default());
    }
}
