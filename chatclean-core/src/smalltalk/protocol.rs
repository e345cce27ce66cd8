//! Contrato JSON do serviço externo de small talk.
//!
//! Requisição:
//!
//! ```json
//! {"id": "grupo_0", "items": [{"configuration": {"unicodeNormalization": true,
//!   "toLower": false, "informationLevel": 3}, "text": "oi bom dia", "dateCheck": false}]}
//! ```
//!
//! Resposta: `{"items": [{"analysis": {"matchesCount": 1, "input": "...",
//! "markedInput": "...", "matches": [{"index": 0, "length": 2, "smallTalk": "oi"}]}}]}`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub unicode_normalization: bool,
    pub to_lower: bool,
    pub information_level: u8,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            unicode_normalization: true,
            to_lower: false,
            information_level: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    pub configuration: Configuration,
    pub text: String,
    pub date_check: bool,
}

impl RequestItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            configuration: Configuration::default(),
            text: text.into(),
            date_check: false,
        }
    }
}

/// Um lote enviado ao serviço: `id` = `"{grupo}_{índice do lote}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallTalkRequest {
    pub id: String,
    pub items: Vec<RequestItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallTalkResponse {
    pub items: Vec<ResponseItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseItem {
    pub analysis: Analysis,
}

/// Análise de uma linha. Qual dos campos `*Input` vem preenchido depende do modo do serviço.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub matches_count: usize,
    #[serde(default)]
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_input: Option<String>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Trecho de small talk encontrado. `index` e `length` contam caracteres do `markedInput` original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub index: usize,
    // versões antigas do serviço escrevem "lenght"
    #[serde(alias = "lenght")]
    pub length: usize,
    pub small_talk: String,
}
