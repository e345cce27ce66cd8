//! Servidor web Axum com WebSocket para limpeza de mensagens em tempo real

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chatclean_core::{
    config::{self, Settings},
    smalltalk::remove_small_talk,
    Pipeline, PipelineEvent, PipelineOptions, Record, SmallTalkClient, SmallTalkError, Step,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: Pipeline,
    options: PipelineOptions,
    small_talk: Option<SmallTalkClient>,
    group_id: String,
}

#[derive(Deserialize)]
struct InputRecord {
    #[serde(default)]
    id: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ProcessRequest {
    records: Vec<InputRecord>,
    #[serde(default)]
    options: Option<PipelineOptions>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Serialize)]
struct ProcessResponse {
    records: Vec<Record>,
    processing_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = config::load(None)?;
    let state = Arc::new(build_state(&settings)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.listen_addr).await?;
    info!("Servidor chatclean iniciado em http://{}", settings.server.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let pipeline = settings.dictionaries.load_pipeline()?;
    let small_talk = match settings.small_talk.endpoint {
        Some(_) => Some(SmallTalkClient::new(&settings.small_talk)?),
        None => {
            warn!("small talk endpoint not configured; the step will be skipped");
            None
        }
    };
    Ok(AppState {
        pipeline,
        options: settings.pipeline.clone(),
        small_talk,
        group_id: settings
            .small_talk
            .request_id
            .clone()
            .unwrap_or_else(|| "chatclean".to_string()),
    })
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/process", post(process_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn to_records(input: Vec<InputRecord>) -> Vec<Record> {
    input
        .into_iter()
        .map(|r| match r.text {
            Some(text) => Record::new(r.id, text),
            None => Record::missing(r.id),
        })
        .collect()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Retorna a página principal HTML
async fn index_handler() -> impl IntoResponse {
    Html(include_str!("templates/index.html"))
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Roda a etapa de small talk se ela estiver habilitada e houver serviço configurado.
async fn run_small_talk(
    state: &AppState,
    records: &mut [Record],
    options: &PipelineOptions,
    group_id: &str,
) -> Result<Option<usize>, SmallTalkError> {
    match (&state.small_talk, options.small_talk) {
        (Some(client), true) => remove_small_talk(client, records, options, group_id)
            .await
            .map(Some),
        _ => Ok(None),
    }
}

/// Limpeza via HTTP POST (sem streaming)
async fn process_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> Response {
    if req.records.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Nenhum registro enviado");
    }

    let start = Instant::now();
    let options = req.options.unwrap_or_else(|| state.options.clone());
    let group_id = req.request_id.unwrap_or_else(|| state.group_id.clone());
    let records = to_records(req.records);

    // O pipeline é síncrono e usa Rayon: roda fora do runtime
    let worker = Arc::clone(&state);
    let worker_options = options.clone();
    let processed =
        tokio::task::spawn_blocking(move || worker.pipeline.process(records, &worker_options))
            .await;
    let mut records = match processed {
        Ok(records) => records,
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    if let Err(err) = run_small_talk(&state, &mut records, &options, &group_id).await {
        warn!(error = %err, "small talk step failed");
        return error_response(StatusCode::BAD_GATEWAY, err.to_string());
    }

    Json(ProcessResponse {
        records,
        processing_ms: start.elapsed().as_millis() as u64,
    })
    .into_response()
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Envia um evento serializado. Retorna `false` se o cliente desconectou.
async fn send_event(socket: &mut WebSocket, event: &PipelineEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json)).await.is_ok(),
        Err(_) => true,
    }
}

/// Evento enviado quando a tarefa do pipeline termina sem emitir `Done`.
fn worker_failure(err: &JoinError) -> PipelineEvent {
    warn!(error = %err, "pipeline worker failed");
    PipelineEvent::Error {
        message: format!("pipeline worker failed: {err}"),
    }
}

/// Lógica do WebSocket: recebe registros, executa o pipeline e transmite os eventos
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // Tenta parsear como JSON {records, options}; senão trata como uma única mensagem
                let (records, options, group_id) = match serde_json::from_str::<ProcessRequest>(&text) {
                    Ok(req) => (
                        to_records(req.records),
                        req.options.unwrap_or_else(|| state.options.clone()),
                        req.request_id.unwrap_or_else(|| state.group_id.clone()),
                    ),
                    Err(_) => (
                        vec![Record::new(None, text.trim())],
                        state.options.clone(),
                        state.group_id.clone(),
                    ),
                };

                if records.is_empty() {
                    continue;
                }

                info!(rows = records.len(), "Processando via WebSocket");
                let start = Instant::now();

                let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                let worker = Arc::clone(&state);
                let worker_options = options.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    worker.pipeline.process_streaming(records, &worker_options, tx);
                });
                if let Err(err) = handle.await {
                    if !send_event(&mut socket, &worker_failure(&err)).await {
                        return;
                    }
                    continue;
                }

                // O Done só sai depois da etapa de small talk
                let mut processed = Vec::new();
                let events: Vec<PipelineEvent> = rx.try_iter().collect();
                for event in events {
                    match event {
                        PipelineEvent::Done { records, .. } => processed = records,
                        other => {
                            if !send_event(&mut socket, &other).await {
                                return;
                            }
                        }
                    }
                }

                let last = match run_small_talk(&state, &mut processed, &options, &group_id).await {
                    Ok(Some(changed_rows)) => {
                        let step = PipelineEvent::StepApplied {
                            step: Step::SmallTalk,
                            changed_rows,
                        };
                        if !send_event(&mut socket, &step).await {
                            return;
                        }
                        PipelineEvent::Done {
                            records: processed,
                            processing_ms: start.elapsed().as_millis() as u64,
                        }
                    }
                    Ok(None) => PipelineEvent::Done {
                        records: processed,
                        processing_ms: start.elapsed().as_millis() as u64,
                    },
                    Err(err) => PipelineEvent::Error {
                        message: err.to_string(),
                    },
                };
                if !send_event(&mut socket, &last).await {
                    return;
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chatclean_core::Dictionary;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let abbreviations: Dictionary = [("vc".to_string(), "voce".to_string())]
            .into_iter()
            .collect();
        Arc::new(AppState {
            pipeline: Pipeline::new(Dictionary::empty(), abbreviations),
            options: PipelineOptions::default(),
            small_talk: None,
            group_id: "teste".into(),
        })
    }

    async fn post_json(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = router(test_state())
            .oneshot(
                Request::post("/process")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_process_preserves_order() {
        let (status, body) = post_json(serde_json::json!({
            "records": [
                {"id": "1", "text": "VC pagou R$20,00?"},
                {"id": "2", "text": null},
                {"id": "3", "text": "Liga 11h"}
            ]
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        let records = body["records"].as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["processed"], "voce pagou MONEY ");
        assert_eq!(records[1]["processed"], "");
        assert_eq!(records[2]["id"], "3");
        assert_eq!(records[2]["processed"], "liga TIME");
    }

    #[tokio::test]
    async fn test_process_with_custom_options() {
        let (_, body) = post_json(serde_json::json!({
            "records": [{"text": "Ligue 99"}],
            "options": {"tagging": false}
        }))
        .await;
        assert_eq!(body["records"][0]["processed"], "ligue");
    }

    #[tokio::test]
    async fn test_panicked_worker_becomes_error_event() {
        let err = tokio::task::spawn_blocking(|| panic!("falha no pipeline"))
            .await
            .unwrap_err();
        let event = serde_json::to_value(worker_failure(&err)).unwrap();
        assert_eq!(event["type"], "Error");
        assert!(event["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("pipeline worker failed"));
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let (status, body) = post_json(serde_json::json!({ "records": [] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
