//! Cliente HTTP do serviço de small talk.
//!
//! As linhas são divididas em `batches` grupos contíguos (os primeiros
//! `n % k` grupos recebem uma linha a mais), cada grupo vira uma requisição
//! com id `"{grupo}_{índice}"` e as requisições saem em paralelo. As respostas voltam na ordem dos lotes, e
//! qualquer falha derruba a etapa inteira.

use std::time::{Duration, Instant};

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info};

use super::protocol::{RequestItem, SmallTalkRequest, SmallTalkResponse};
use super::reconcile::ReconcileError;
use crate::config::SmallTalkSettings;
use crate::pipeline::Record;

#[derive(Debug, Error)]
pub enum SmallTalkError {
    #[error("small talk batch count must be at least 1")]
    InvalidBatchCount,
    #[error("small talk timeout must be at least 1 second")]
    InvalidTimeout,
    #[error("small talk endpoint is not configured")]
    MissingEndpoint,
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("batch {batch} to {endpoint}: request failed: {source}")]
    Transport {
        batch: usize,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("batch {batch} to {endpoint}: service answered {status}: {body}")]
    Status {
        batch: usize,
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("batch {batch} to {endpoint}: undecodable response: {source}")]
    Decode {
        batch: usize,
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("batch {batch} to {endpoint}: sent {expected} items, received {received}")]
    ItemCount {
        batch: usize,
        endpoint: String,
        expected: usize,
        received: usize,
    },
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Tamanhos dos grupos contíguos para `n` linhas em `batches` lotes.
pub fn batch_sizes(n: usize, batches: usize) -> Vec<usize> {
    if batches == 0 {
        return Vec::new();
    }
    let base = n / batches;
    let extra = n % batches;
    (0..batches).map(|i| base + usize::from(i < extra)).collect()
}

/// Monta as requisições de cada lote não vazio, junto com o índice do lote.
pub fn build_requests(
    records: &[Record],
    batches: usize,
    group_id: &str,
) -> Result<Vec<(usize, SmallTalkRequest)>, SmallTalkError> {
    if batches == 0 {
        return Err(SmallTalkError::InvalidBatchCount);
    }
    let mut offset = 0;
    let mut requests = Vec::new();
    for (batch, size) in batch_sizes(records.len(), batches).into_iter().enumerate() {
        if size == 0 {
            continue;
        }
        let items = records[offset..offset + size]
            .iter()
            .map(|r| RequestItem::new(r.processed.clone()))
            .collect();
        offset += size;
        requests.push((
            batch,
            SmallTalkRequest {
                id: format!("{group_id}_{batch}"),
                items,
            },
        ));
    }
    Ok(requests)
}

pub struct SmallTalkClient {
    http: reqwest::Client,
    endpoint: String,
    batches: usize,
}

impl SmallTalkClient {
    pub fn new(settings: &SmallTalkSettings) -> Result<Self, SmallTalkError> {
        let endpoint = settings
            .endpoint
            .clone()
            .ok_or(SmallTalkError::MissingEndpoint)?;
        if settings.batches == 0 {
            return Err(SmallTalkError::InvalidBatchCount);
        }
        if settings.timeout_secs == 0 {
            return Err(SmallTalkError::InvalidTimeout);
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(SmallTalkError::Client)?;
        Ok(Self {
            http,
            endpoint,
            batches: settings.batches,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Envia todas as linhas e devolve as respostas na ordem dos lotes.
    pub async fn send(
        &self,
        records: &[Record],
        group_id: &str,
    ) -> Result<Vec<SmallTalkResponse>, SmallTalkError> {
        let requests = build_requests(records, self.batches, group_id)?;
        debug!(
            rows = records.len(),
            batches = requests.len(),
            endpoint = %self.endpoint,
            "sending small talk batches"
        );
        try_join_all(
            requests
                .into_iter()
                .map(|(batch, request)| self.post(batch, request)),
        )
        .await
    }

    async fn post(
        &self,
        batch: usize,
        request: SmallTalkRequest,
    ) -> Result<SmallTalkResponse, SmallTalkError> {
        let started = Instant::now();
        let expected = request.items.len();
        let transport = |source| SmallTalkError::Transport {
            batch,
            endpoint: self.endpoint.clone(),
            source,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        if !status.is_success() {
            return Err(SmallTalkError::Status {
                batch,
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: SmallTalkResponse =
            serde_json::from_slice(&body).map_err(|source| SmallTalkError::Decode {
                batch,
                endpoint: self.endpoint.clone(),
                source,
            })?;
        if parsed.items.len() != expected {
            return Err(SmallTalkError::ItemCount {
                batch,
                endpoint: self.endpoint.clone(),
                expected,
                received: parsed.items.len(),
            });
        }

        info!(
            id = %request.id,
            items = expected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "small talk batch finished"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Record> {
        (0..n).map(|i| Record::new(None, format!("linha {i}"))).collect()
    }

    #[test]
    fn test_batch_sizes_front_load_remainder() {
        assert_eq!(batch_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(batch_sizes(8, 4), vec![2, 2, 2, 2]);
        assert_eq!(batch_sizes(2, 4), vec![1, 1, 0, 0]);
        assert!(batch_sizes(5, 0).is_empty());
    }

    #[test]
    fn test_build_requests_preserves_order_and_ids() {
        let rows = records(10);
        let requests = build_requests(&rows, 3, "conversas").unwrap();
        let ids: Vec<&str> = requests.iter().map(|(_, r)| r.id.as_str()).collect();
        assert_eq!(ids, vec!["conversas_0", "conversas_1", "conversas_2"]);

        let texts: Vec<&str> = requests
            .iter()
            .flat_map(|(_, r)| r.items.iter().map(|i| i.text.as_str()))
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("linha {i}")).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_build_requests_skips_empty_batches() {
        let requests = build_requests(&records(2), 4, "g").unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].0, 1);
    }

    #[test]
    fn test_zero_batches_is_an_error() {
        assert!(matches!(
            build_requests(&records(3), 0, "g"),
            Err(SmallTalkError::InvalidBatchCount)
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let settings = SmallTalkSettings {
            endpoint: Some("http://localhost:9000/analysis".into()),
            timeout_secs: 0,
            ..SmallTalkSettings::default()
        };
        assert!(matches!(
            SmallTalkClient::new(&settings),
            Err(SmallTalkError::InvalidTimeout)
        ));
    }

    #[test]
    fn test_client_exposes_resolved_settings() {
        let settings = SmallTalkSettings {
            endpoint: Some("http://localhost:9000/analysis".into()),
            batches: 6,
            ..SmallTalkSettings::default()
        };
        let client = SmallTalkClient::new(&settings).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9000/analysis");
        assert_eq!(client.batches(), 6);
    }

    #[test]
    fn test_client_requires_endpoint() {
        let settings = SmallTalkSettings::default();
        assert!(matches!(
            SmallTalkClient::new(&settings),
            Err(SmallTalkError::MissingEndpoint)
        ));
    }
}
