//! # Remoção de Small Talk via Serviço Externo
//!
//! Etapa final (opcional) do pipeline: as linhas já processadas são enviadas
//! em lotes a um serviço HTTP que identifica cumprimentos e conversa fiada
//! ("oi", "bom dia", "tudo bem"). As respostas são reconciliadas de volta,
//! linha a linha, na ordem original.
//!
//! - [`protocol`]: formato JSON de requisição e resposta.
//! - [`client`]: divisão em lotes e chamadas HTTP.
//! - [`reconcile`]: emenda das correspondências em cada linha.

pub mod client;
pub mod protocol;
pub mod reconcile;

pub use client::{SmallTalkClient, SmallTalkError};
pub use protocol::{Analysis, Match, ResponseItem, SmallTalkRequest, SmallTalkResponse};
pub use reconcile::{reconcile, ReconcileError};

use tracing::info;

use crate::pipeline::{PipelineOptions, Record};

/// Envia, reconcilia e grava o resultado em `processed`. Devolve quantas linhas mudaram.
///
/// Falha em qualquer lote descarta o resultado inteiro: `records` só é
/// alterado depois que todas as respostas foram reconciliadas.
pub async fn remove_small_talk(
    client: &SmallTalkClient,
    records: &mut [Record],
    options: &PipelineOptions,
    group_id: &str,
) -> Result<usize, SmallTalkError> {
    let responses = client.send(records, group_id).await?;
    let items: Vec<ResponseItem> = responses.into_iter().flat_map(|r| r.items).collect();
    let cleaned = reconcile(&items, options.tagging, options.relevant)?;

    let mut changed = 0;
    for (record, text) in records.iter_mut().zip(cleaned) {
        if record.processed != text {
            changed += 1;
        }
        record.processed = text;
    }
    info!(rows = records.len(), changed, "small talk removed");
    Ok(changed)
}
