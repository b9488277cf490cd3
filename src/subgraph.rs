//! Analytics subgraph client (GraphQL)

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{PeriodType, Snapshot, SnapshotRecords};
use crate::tracker;

pub const DEFAULT_SUBGRAPH: &str = "https://api.thegraph.com/subgraphs/name/renproject/renvm";

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct MetaBlock {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct Meta {
    block: MetaBlock,
}

#[derive(Debug, Deserialize)]
struct MetaData {
    #[serde(rename = "_meta")]
    meta: Meta,
}

pub struct SubgraphClient {
    endpoint: String,
    http: reqwest::Client,
}

impl SubgraphClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| Error::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            http,
        })
    }

    async fn query<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        tracing::debug!("Subgraph query ({} bytes) -> {}", query.len(), self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|source| Error::Http {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(Error::Status {
                endpoint: self.endpoint.clone(),
                status: response.status(),
            });
        }

        let body: GraphQlResponse<T> = response.json().await.map_err(|source| Error::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GraphQl(messages.join("; ")));
        }
        body.data.ok_or(Error::MissingData("data"))
    }

    async fn query_records(&self, query: &str) -> Result<SnapshotRecords> {
        let data: IndexMap<String, Option<Snapshot>> = self.query(query).await?;
        Ok(data
            .into_iter()
            .filter_map(|(alias, snapshot)| snapshot.map(|s| (alias, s)))
            .collect())
    }

    /// Asset metadata plus every snapshot of the window ending at `now`
    pub async fn query_snapshots(&self, period: PeriodType, now: i64) -> Result<SnapshotRecords> {
        self.query_records(&tracker::build_tracker_query(period, now))
            .await
    }

    /// Latest block the subgraph has indexed
    pub async fn indexed_block(&self) -> Result<u64> {
        let data: MetaData = self.query("{ _meta { block { number } } }").await?;
        Ok(data.meta.block.number)
    }
}
