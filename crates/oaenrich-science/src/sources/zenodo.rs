use std::time::Duration;

use async_trait::async_trait;
use oaenrich_core::config::HttpConfig;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ScienceError};
use crate::http::PoliteClient;
use crate::sources::{RecordHit, RecordLookup};

/// Hit count and record ids from one page of `/records` results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub total: u64,
    pub ids: Vec<String>,
}

impl SearchHits {
    pub fn from_json(v: &Value) -> Self {
        let hits = &v["hits"];
        let ids: Vec<String> = hits["hits"]
            .as_array()
            .map(|arr| arr.iter().filter_map(record_id).collect())
            .unwrap_or_default();
        // Older responses give `total` as a number, newer ones as `{"value": n}`.
        let total = hits["total"]
            .as_u64()
            .or_else(|| hits["total"]["value"].as_u64())
            .unwrap_or(ids.len() as u64);
        Self { total, ids }
    }
}

fn record_id(hit: &Value) -> Option<String> {
    let id = hit.get("id").or_else(|| hit.get("recid"))?;
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

pub struct ZenodoSource {
    client: PoliteClient,
    api_url: String,
    record_url: String,
}

impl ZenodoSource {
    pub fn from_config(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: PoliteClient::new(
                Duration::from_millis(http.request_interval_ms),
                &http.user_agent,
            )?,
            api_url: http.zenodo_api_url.trim_end_matches('/').to_string(),
            record_url: http.zenodo_record_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_params(api_url: &str, record_url: &str, min_interval: Duration) -> Result<Self> {
        Ok(Self {
            client: PoliteClient::new(min_interval, "oaenrich/0.1")?,
            api_url: api_url.trim_end_matches('/').to_string(),
            record_url: record_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn record_link(&self, id: &str) -> String {
        format!("{}/{}", self.record_url, id)
    }

    fn hit(&self, id: String) -> RecordHit {
        RecordHit {
            url: self.record_link(&id),
            id,
        }
    }

    pub async fn query(&self, q: &str) -> Result<SearchHits> {
        let url = format!("{}/records?q={}", self.api_url, urlencoding::encode(q));
        let val: Value = self.client.get_json(&url).await?;
        Ok(SearchHits::from_json(&val))
    }
}

#[async_trait]
impl RecordLookup for ZenodoSource {
    fn name(&self) -> &str {
        "zenodo"
    }

    async fn search_by_title(&self, title: &str) -> Result<RecordHit> {
        let q = format!("title:\"{title}\"");
        let hits = match self.query(&q).await {
            Ok(hits) => hits,
            Err(err) => {
                debug!("zenodo title search failed: {err}");
                return Err(ScienceError::NotFound);
            }
        };

        match hits.total {
            0 => Err(ScienceError::NotFound),
            1 => hits
                .ids
                .into_iter()
                .next()
                .map(|id| self.hit(id))
                .ok_or(ScienceError::NotFound),
            _ => Err(ScienceError::AmbiguousMatch),
        }
    }

    async fn search_by_doi(&self, doi: &str) -> Option<RecordHit> {
        let q = format!("doi:{doi}");
        match self.query(&q).await {
            Ok(hits) if hits.total > 0 => hits.ids.into_iter().next().map(|id| self.hit(id)),
            Ok(_) => None,
            Err(err) => {
                debug!("zenodo DOI search failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const RECORD_URL: &str = "https://zenodo.org/records";

    fn source(server: &Server) -> ZenodoSource {
        ZenodoSource::with_params(&format!("{}/api", server.url()), RECORD_URL, Duration::ZERO)
            .unwrap()
    }

    async fn mock_query(server: &mut Server, q: &str, body: Value) -> mockito::Mock {
        server
            .mock("GET", "/api/records")
            .match_query(Matcher::UrlEncoded("q".to_string(), q.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    #[test]
    fn parses_total_in_both_shapes() {
        let flat = json!({"hits": {"hits": [{"id": 7}], "total": 1}});
        assert_eq!(
            SearchHits::from_json(&flat),
            SearchHits { total: 1, ids: vec!["7".to_string()] }
        );

        let nested = json!({"hits": {"hits": [{"id": "8"}, {"id": 9}], "total": {"value": 2}}});
        assert_eq!(SearchHits::from_json(&nested).total, 2);
        assert_eq!(SearchHits::from_json(&nested).ids, vec!["8", "9"]);

        let bare = json!({"hits": {"hits": [{"recid": 3}]}});
        assert_eq!(SearchHits::from_json(&bare).total, 1);
    }

    #[tokio::test]
    async fn title_search_single_hit() {
        let mut server = Server::new_async().await;
        let _m = mock_query(
            &mut server,
            "title:\"Distributed Control\"",
            json!({"hits": {"hits": [{"id": 1234567}], "total": 1}}),
        )
        .await;

        let hit = source(&server).search_by_title("Distributed Control").await.unwrap();
        assert_eq!(hit.id, "1234567");
        assert_eq!(hit.url, "https://zenodo.org/records/1234567");
    }

    #[tokio::test]
    async fn title_search_multiple_hits_is_ambiguous() {
        let mut server = Server::new_async().await;
        let _m = mock_query(
            &mut server,
            "title:\"Control\"",
            json!({"hits": {"hits": [{"id": 1}, {"id": 2}], "total": 2}}),
        )
        .await;

        let err = source(&server).search_by_title("Control").await.unwrap_err();
        assert!(matches!(err, ScienceError::AmbiguousMatch));
        assert_eq!(err.to_string(), "multiple matches found");
    }

    #[tokio::test]
    async fn title_search_zero_hits_or_error_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = mock_query(
            &mut server,
            "title:\"Nothing\"",
            json!({"hits": {"hits": [], "total": 0}}),
        )
        .await;
        let _e = server
            .mock("GET", "/api/records")
            .match_query(Matcher::UrlEncoded("q".to_string(), "title:\"Broken\"".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let zenodo = source(&server);
        assert!(matches!(
            zenodo.search_by_title("Nothing").await,
            Err(ScienceError::NotFound)
        ));
        assert!(matches!(
            zenodo.search_by_title("Broken").await,
            Err(ScienceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn doi_search_takes_first_hit() {
        let mut server = Server::new_async().await;
        let _m = mock_query(
            &mut server,
            "doi:10.5281/zenodo.999",
            json!({"hits": {"hits": [{"id": 555}, {"id": 556}], "total": 2}}),
        )
        .await;

        let hit = source(&server).search_by_doi("10.5281/zenodo.999").await.unwrap();
        assert_eq!(hit.id, "555");
        assert_eq!(hit.url, "https://zenodo.org/records/555");
    }

    #[tokio::test]
    async fn doi_search_unreachable_is_none() {
        let zenodo =
            ZenodoSource::with_params("http://127.0.0.1:9/api", RECORD_URL, Duration::ZERO)
                .unwrap();
        assert_eq!(zenodo.search_by_doi("10.1/x").await, None);
    }
}
