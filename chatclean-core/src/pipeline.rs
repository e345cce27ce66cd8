//! # Pipeline de Limpeza — Orquestrador com Eventos Observáveis
//!
//! O pipeline aplica as etapas de limpeza em uma ordem total fixa sobre a
//! coluna de texto de um conjunto de registros:
//!
//! ```text
//! emoji → whatsapp_emoji → lowercase → typo → abbreviation →
//! email → cpf → money → date → url → time → code → number →
//! accentuation → punctuation → whitespace → (small_talk)
//! ```
//!
//! Cada etapa desligada em [`PipelineOptions`] é pulada por inteiro. As
//! demais são um `map` linha a linha, sem dependência entre linhas, e rodam
//! em paralelo com Rayon. A etapa de small talk é a única que opera sobre o
//! lote inteiro (ver [`crate::smalltalk`]).
//!
//! Como no restante do sistema, cada etapa emite um [`PipelineEvent`] por um
//! canal `mpsc`, permitindo que o servidor WebSocket transmita o progresso.

use std::sync::mpsc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dictionary::{substitute, Dictionary};
use crate::entity::{self, EntityKind};
use crate::error::ChatCleanError;
use crate::normalize;
use crate::smalltalk::{remove_small_talk, SmallTalkClient};

/// Um registro de entrada: identificador opcional, texto original e texto processado.
///
/// A quantidade e a ordem dos registros nunca mudam ao longo do pipeline;
/// apenas `processed` é alterado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Texto original. `None` quando a célula estava vazia ou ausente.
    pub text: Option<String>,
    /// Texto processado. Começa igual ao original (ou vazio, se não havia texto).
    #[serde(default)]
    pub processed: String,
}

impl Record {
    pub fn new(id: Option<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id,
            processed: text.clone(),
            text: Some(text),
        }
    }

    /// Registro sem texto: o processado fica vazio e nenhuma etapa o altera.
    pub fn missing(id: Option<String>) -> Self {
        Self {
            id,
            text: None,
            processed: String::new(),
        }
    }
}

/// Uma etapa do pipeline, na ordem em que é aplicada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Emoji,
    WhatsappEmoji,
    Lowercase,
    Typo,
    Abbreviation,
    Email,
    Cpf,
    Money,
    Date,
    Url,
    Time,
    Code,
    Number,
    Accentuation,
    Punctuation,
    Whitespace,
    SmallTalk,
}

impl Step {
    /// Etapas linha a linha, na ordem total obrigatória (small talk fica de fora).
    pub const ROW_STEPS: [Step; 16] = [
        Step::Emoji,
        Step::WhatsappEmoji,
        Step::Lowercase,
        Step::Typo,
        Step::Abbreviation,
        Step::Email,
        Step::Cpf,
        Step::Money,
        Step::Date,
        Step::Url,
        Step::Time,
        Step::Code,
        Step::Number,
        Step::Accentuation,
        Step::Punctuation,
        Step::Whitespace,
    ];

    /// Tipo de entidade mascarado pela etapa, se for uma etapa de mascaramento
    pub fn entity(&self) -> Option<EntityKind> {
        match self {
            Step::Emoji => Some(EntityKind::Emoji),
            Step::WhatsappEmoji => Some(EntityKind::WhatsappEmoji),
            Step::Email => Some(EntityKind::Email),
            Step::Cpf => Some(EntityKind::Cpf),
            Step::Money => Some(EntityKind::Money),
            Step::Date => Some(EntityKind::Date),
            Step::Url => Some(EntityKind::Url),
            Step::Time => Some(EntityKind::Time),
            Step::Code => Some(EntityKind::Code),
            Step::Number => Some(EntityKind::Number),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Lowercase => "lowercase",
            Step::Typo => "typo",
            Step::Abbreviation => "abbreviation",
            Step::Accentuation => "accentuation",
            Step::Punctuation => "punctuation",
            Step::Whitespace => "whitespace",
            Step::SmallTalk => "small_talk",
            other => other.entity().map(|k| k.name()).unwrap_or("unknown"),
        }
    }
}

/// Quais etapas rodam, mais as políticas globais de tagging e relevância.
///
/// Tudo ligado por padrão, exceto `relevant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub emoji: bool,
    pub whatsapp_emoji: bool,
    pub lowercase: bool,
    pub typo: bool,
    pub abbreviation: bool,
    pub email: bool,
    pub cpf: bool,
    pub money: bool,
    pub date: bool,
    pub url: bool,
    pub time: bool,
    pub code: bool,
    pub number: bool,
    pub accentuation: bool,
    pub punctuation: bool,
    pub small_talk: bool,
    /// `true`: entidades viram tags (`NUMBER`, `DATE`...); `false`: viram um espaço.
    pub tagging: bool,
    /// Sem tagging, usa `relevantInput` em vez de `cleanedInput` do serviço de small talk.
    pub relevant: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            emoji: true,
            whatsapp_emoji: true,
            lowercase: true,
            typo: true,
            abbreviation: true,
            email: true,
            cpf: true,
            money: true,
            date: true,
            url: true,
            time: true,
            code: true,
            number: true,
            accentuation: true,
            punctuation: true,
            small_talk: true,
            tagging: true,
            relevant: false,
        }
    }
}

impl PipelineOptions {
    /// Opções com todas as etapas desligadas (o colapso de espaços sempre roda).
    pub fn none() -> Self {
        Self {
            emoji: false,
            whatsapp_emoji: false,
            lowercase: false,
            typo: false,
            abbreviation: false,
            email: false,
            cpf: false,
            money: false,
            date: false,
            url: false,
            time: false,
            code: false,
            number: false,
            accentuation: false,
            punctuation: false,
            small_talk: false,
            tagging: true,
            relevant: false,
        }
    }

    pub fn is_enabled(&self, step: Step) -> bool {
        match step {
            Step::Emoji => self.emoji,
            Step::WhatsappEmoji => self.whatsapp_emoji,
            Step::Lowercase => self.lowercase,
            Step::Typo => self.typo,
            Step::Abbreviation => self.abbreviation,
            Step::Email => self.email,
            Step::Cpf => self.cpf,
            Step::Money => self.money,
            Step::Date => self.date,
            Step::Url => self.url,
            Step::Time => self.time,
            Step::Code => self.code,
            Step::Number => self.number,
            Step::Accentuation => self.accentuation,
            Step::Punctuation => self.punctuation,
            Step::Whitespace => true,
            Step::SmallTalk => self.small_talk,
        }
    }

    /// Etapas linha a linha habilitadas, em ordem.
    pub fn row_steps(&self) -> impl Iterator<Item = Step> + '_ {
        Step::ROW_STEPS.into_iter().filter(|s| self.is_enabled(*s))
    }
}

/// Eventos emitidos pelo pipeline durante o processamento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// Início: quantas linhas serão processadas e quais etapas vão rodar.
    Started { total_rows: usize, steps: Vec<Step> },
    /// Uma etapa terminou em todas as linhas.
    StepApplied { step: Step, changed_rows: usize },
    /// Conclusão com os registros processados.
    Done {
        records: Vec<Record>,
        processing_ms: u64,
    },
    /// Falha irrecuperável (ex: serviço de small talk fora do ar).
    Error { message: String },
}

/// O pipeline de limpeza, com os dicionários injetados na construção.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    typos: Dictionary,
    abbreviations: Dictionary,
}

impl Pipeline {
    pub fn new(typos: Dictionary, abbreviations: Dictionary) -> Self {
        Self {
            typos,
            abbreviations,
        }
    }

    /// Aplica uma única etapa linha a linha a um texto.
    ///
    /// `SmallTalk` não é uma etapa de linha e devolve o texto inalterado.
    pub fn apply_step(&self, step: Step, text: &str, options: &PipelineOptions) -> String {
        if let Some(kind) = step.entity() {
            return entity::apply(text, kind, options.tagging);
        }
        match step {
            Step::Lowercase => normalize::fold_case(text),
            Step::Typo => substitute(text, &self.typos),
            Step::Abbreviation => substitute(text, &self.abbreviations),
            Step::Accentuation => normalize::strip_accents(text),
            Step::Punctuation => normalize::strip_punctuation(text),
            Step::Whitespace => normalize::collapse_whitespace(text),
            _ => text.to_string(),
        }
    }

    /// Limpa um único texto com todas as etapas linha a linha habilitadas.
    pub fn clean(&self, text: &str, options: &PipelineOptions) -> String {
        options
            .row_steps()
            .fold(text.to_string(), |acc, step| self.apply_step(step, &acc, options))
    }

    /// Processa os registros de forma síncrona e devolve o resultado final.
    pub fn process(&self, records: Vec<Record>, options: &PipelineOptions) -> Vec<Record> {
        let (tx, rx) = mpsc::channel();
        self.process_streaming(records, options, tx);

        // Consome todos os eventos até o fim
        rx.into_iter()
            .find_map(|event| match event {
                PipelineEvent::Done { records, .. } => Some(records),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Executa as etapas linha a linha enviando eventos de progresso.
    ///
    /// # Fluxo de Eventos
    /// 1. `Started`
    /// 2. `StepApplied` (uma por etapa habilitada, em ordem)
    /// 3. `Done`
    pub fn process_streaming(
        &self,
        mut records: Vec<Record>,
        options: &PipelineOptions,
        tx: mpsc::Sender<PipelineEvent>,
    ) {
        let start = Instant::now();
        let steps: Vec<Step> = options.row_steps().collect();

        let missing = records.iter().filter(|r| r.text.is_none()).count();
        if missing > 0 {
            warn!(missing, "records without text will be emitted empty");
        }
        for record in records.iter_mut().filter(|r| r.text.is_none()) {
            record.processed.clear();
        }

        let _ = tx.send(PipelineEvent::Started {
            total_rows: records.len(),
            steps: steps.clone(),
        });

        for step in steps {
            let changed_rows = records
                .par_iter_mut()
                .map(|record| {
                    let next = self.apply_step(step, &record.processed, options);
                    let changed = next != record.processed;
                    record.processed = next;
                    changed
                })
                .filter(|changed| *changed)
                .count();
            debug!(step = step.name(), changed_rows, "step applied");
            let _ = tx.send(PipelineEvent::StepApplied { step, changed_rows });
        }

        let _ = tx.send(PipelineEvent::Done {
            records,
            processing_ms: start.elapsed().as_millis() as u64,
        });
    }

    /// Etapas linha a linha seguidas da remoção de small talk, quando habilitada e configurada.
    ///
    /// Sem cliente, ou com `small_talk` desligado, equivale a [`Pipeline::process`].
    /// Uma falha do serviço é devolvida ao chamador; não há resultado parcial.
    pub async fn process_with_small_talk(
        &self,
        records: Vec<Record>,
        options: &PipelineOptions,
        client: Option<&SmallTalkClient>,
        group_id: &str,
    ) -> Result<Vec<Record>, ChatCleanError> {
        let mut records = self.process(records, options);
        if let (true, Some(client)) = (options.small_talk, client) {
            remove_small_talk(client, &mut records, options, group_id).await?;
        }
        Ok(records)
    }
}
