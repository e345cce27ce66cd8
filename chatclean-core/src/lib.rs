//! # chatclean-core — Limpeza de Mensagens de Chat em Português
//!
//! Prepara texto bruto de conversas (WhatsApp, chat de atendimento) para
//! análise: remove emojis, normaliza acentuação, mascara ou remove entidades
//! estruturadas, expande abreviações e corrige erros de digitação por
//! dicionário e, opcionalmente, delega a remoção de "small talk" a um serviço
//! HTTP externo.
//!
//! ## Arquitetura
//!
//! 1.  **Dicionários** ([`dictionary`]): mapas `token → substituição` carregados de arquivos `chave,valor`.
//! 2.  **Entidades** ([`entity`]): um padrão compilado por tipo (e-mail, CPF, dinheiro, data...), com tagging ou remoção.
//! 3.  **Normalização** ([`normalize`]): acentos, pontuação, espaços, minúsculas.
//! 4.  **Pipeline** ([`pipeline`]): aplica as etapas numa ordem fixa sobre os registros, emitindo eventos.
//! 5.  **Small talk** ([`smalltalk`]): lotes HTTP e reconciliação das respostas linha a linha.
//! 6.  **Tabelas** ([`table`]) e **configuração** ([`config`]): as bordas de E/S.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use chatclean_core::{Dictionary, Pipeline, PipelineOptions};
//!
//! let abbreviations: Dictionary = [("vc".to_string(), "voce".to_string())].into_iter().collect();
//! let pipeline = Pipeline::new(Dictionary::empty(), abbreviations);
//!
//! let out = pipeline.clean("VC chega às 10h do dia 10/05?", &PipelineOptions::default());
//! assert_eq!(out, "voce chega as TIME do dia DATE ");
//! ```

pub mod config;
pub mod dictionary;
pub mod entity;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod smalltalk;
pub mod table;

pub use dictionary::Dictionary;
pub use entity::{EntityKind, EntitySpan};
pub use error::{ChatCleanError, Result};
pub use pipeline::{Pipeline, PipelineEvent, PipelineOptions, Record, Step};
pub use smalltalk::{SmallTalkClient, SmallTalkError};
