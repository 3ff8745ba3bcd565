use super::{
    InfluxDbClient, InfluxQuery, line_protocol::encode_points, models::QueryResponse,
    models::ResultSet,
};
use crate::{config::AdapterConfig, datamodel::Point, storage::StorageError};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Samples carry millisecond timestamps, on the wire and in query results.
const TIMESTAMP_PRECISION: &str = "ms";

/// InfluxDB 1.x client over the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpInfluxDbClient {
    client: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpInfluxDbClient {
    pub fn new(
        mut base_url: Url,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        if base_url.cannot_be_a_base() {
            return Err(StorageError::Configuration(format!(
                "InfluxDB URL {} cannot be used as a base URL",
                base_url
            )));
        }
        // Url::join replaces the last path segment unless the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            username,
            password,
        })
    }

    pub fn from_config(config: &AdapterConfig) -> anyhow::Result<Self> {
        let client = Self::new(
            config.parse_influxdb_url()?,
            config.influxdb_username.clone(),
            config.influxdb_password.clone(),
            config.influxdb_timeout(),
        )
        .context("Failed to create the InfluxDB client")?;
        Ok(client)
    }

    fn endpoint(&self, path: &str) -> Result<Url, StorageError> {
        self.base_url
            .join(path)
            .map_err(|e| StorageError::Configuration(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn write_url(&self, database: &str, retention_policy: &str) -> Result<Url, StorageError> {
        let mut url = self.endpoint("write")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("db", database);
            if !retention_policy.is_empty() {
                pairs.append_pair("rp", retention_policy);
            }
            pairs.append_pair("precision", TIMESTAMP_PRECISION);
        }
        Ok(url)
    }

    fn query_url(&self, query: &InfluxQuery) -> Result<Url, StorageError> {
        let mut url = self.endpoint("query")?;
        url.query_pairs_mut()
            .append_pair("db", &query.database)
            .append_pair("q", &query.command)
            .append_pair("epoch", TIMESTAMP_PRECISION);
        Ok(url)
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_ref()),
            None => request,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

/// Decodes a `/query` body, surfacing errors InfluxDB reports inside it.
pub fn parse_query_response(body: &str) -> Result<Vec<ResultSet>, StorageError> {
    let response: QueryResponse = serde_json::from_str(body).map_err(|e| {
        StorageError::InvalidDataFormat(format!("Failed to decode query response: {}", e))
    })?;

    if let Some(error) = response.error {
        return Err(StorageError::InfluxDb(error));
    }
    if let Some(error) = response.results.iter().find_map(|r| r.error.clone()) {
        return Err(StorageError::InfluxDb(error));
    }

    Ok(response.results)
}

#[async_trait]
impl InfluxDbClient for HttpInfluxDbClient {
    async fn write(
        &self,
        database: &str,
        retention_policy: &str,
        points: &[Point],
    ) -> Result<(), StorageError> {
        if points.is_empty() {
            return Ok(());
        }

        let url = self.write_url(database, retention_policy)?;
        let body = encode_points(points);
        debug!(
            "InfluxDB write: {} points, {} bytes to database {}",
            points.len(),
            body.len(),
            database
        );

        let response = self.with_auth(self.client.post(url)).body(body).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn query(&self, query: &InfluxQuery) -> Result<Vec<ResultSet>, StorageError> {
        let url = self.query_url(query)?;
        debug!("InfluxDB query on {}: {}", query.database, query.command);

        let response = self.with_auth(self.client.get(url)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // InfluxDB reports query errors as JSON, with either status.
        match parse_query_response(&body) {
            Ok(results) if status.is_success() => Ok(results),
            Err(StorageError::InvalidDataFormat(_)) if !status.is_success() => {
                Err(StorageError::UnexpectedStatus {
                    status: status.as_u16(),
                    body,
                })
            }
            Ok(_) => Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            }),
            Err(error) => Err(error),
        }
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let url = self.endpoint("ping")?;
        let response = self.with_auth(self.client.get(url)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> HttpInfluxDbClient {
        HttpInfluxDbClient::new(
            Url::parse(url).unwrap(),
            None,
            None,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_write_url() {
        let client = client("http://localhost:8086");
        let url = client.write_url("metrics", "").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8086/write?db=metrics&precision=ms"
        );

        let url = client.write_url("metrics", "one week").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8086/write?db=metrics&rp=one+week&precision=ms"
        );
    }

    #[test]
    fn test_base_url_with_path() {
        let client = client("http://proxy.local/influx");
        let url = client.endpoint("ping").unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/influx/ping");
    }

    #[test]
    fn test_query_url() {
        let client = client("http://localhost:8086/");
        let query = InfluxQuery::new(
            "SELECT value FROM \"cpu\"".to_string(),
            "prometheus".to_string(),
        );
        let url = client.query_url(&query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/query");
        assert_eq!(
            pairs,
            vec![
                ("db".to_string(), "prometheus".to_string()),
                ("q".to_string(), "SELECT value FROM \"cpu\"".to_string()),
                ("epoch".to_string(), "ms".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_query_response() {
        let results = parse_query_response(
            r#"{"results":[{"statement_id":0,"series":[{"name":"up","columns":["time","value"],"values":[[1,1]]}]}]}"#,
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].series[0].name, "up");

        assert!(matches!(
            parse_query_response(r#"{"results":[{"statement_id":0,"error":"measurement not found"}]}"#),
            Err(StorageError::InfluxDb(message)) if message == "measurement not found"
        ));
        assert!(matches!(
            parse_query_response(r#"{"error":"unable to parse query"}"#),
            Err(StorageError::InfluxDb(_))
        ));
        assert!(matches!(
            parse_query_response("<html>"),
            Err(StorageError::InvalidDataFormat(_))
        ));
    }
}
