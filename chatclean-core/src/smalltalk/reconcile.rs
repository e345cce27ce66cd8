//! # Reconciliação das Respostas de Small Talk
//!
//! Transforma cada item da resposta do serviço em uma única string de saída,
//! na mesma ordem dos itens.
//!
//! ## Sem tagging
//!
//! Seleção de campo: `relevantInput` ou `cleanedInput` quando houve
//! correspondências, string vazia caso contrário. O campo selecionado
//! ausente é erro.
//!
//! ## Com tagging — emenda com deslocamento acumulado
//!
//! O `markedInput` vem com uma lista de correspondências cujos `index` apontam
//! para a string **original**. Cada correspondência é trocada pela frase de
//! small talk em maiúsculas, o que muda o comprimento da string e desloca
//! todas as posições seguintes. Com as correspondências em ordem crescente de
//! `index`, basta carregar o deslocamento acumulado (`drift`):
//!
//! ```text
//! markedInput = "oi bom dia tudo bem"
//! match {0, 2, "oi"}      → adj = 0 + 0 = 0, troca "oi"      → drift = 0 + (2 - 2) = 0
//! match {3, 7, "bomdia"}  → adj = 3 + 0 = 3, troca "bom dia" → drift = 0 + (6 - 7) = -1
//! resultado               = "OI BOMDIA tudo bem"
//! ```
//!
//! Posições e comprimentos contam caracteres (valores escalares Unicode), não bytes.
//! Correspondências sobrepostas ou fora da string são rejeitadas.

use thiserror::Error;

use super::protocol::{Analysis, Match, ResponseItem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("item {item}: match at index {index} overlaps the previous match ending at {previous_end}")]
    Overlap {
        item: usize,
        index: usize,
        previous_end: usize,
    },
    #[error("item {item}: match [{start}, {end}) exceeds marked input of {len} characters")]
    OutOfRange {
        item: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("item {item}: response has {matches} matches but no markedInput")]
    MissingMarkedInput { item: usize, matches: usize },
    #[error("item {item}: response has matches but no {field}")]
    MissingField { item: usize, field: &'static str },
}

/// Uma string de saída por item, na ordem dos itens.
pub fn reconcile(
    items: &[ResponseItem],
    tagging: bool,
    relevant: bool,
) -> Result<Vec<String>, ReconcileError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if tagging {
                mark_item(i, &item.analysis)
            } else {
                select_cleaned(i, &item.analysis, relevant)
            }
        })
        .collect()
}

fn select_cleaned(item: usize, analysis: &Analysis, relevant: bool) -> Result<String, ReconcileError> {
    if analysis.matches_count == 0 {
        return Ok(String::new());
    }
    let (value, field) = if relevant {
        (&analysis.relevant_input, "relevantInput")
    } else {
        (&analysis.cleaned_input, "cleanedInput")
    };
    value
        .clone()
        .ok_or(ReconcileError::MissingField { item, field })
}

fn mark_item(item: usize, analysis: &Analysis) -> Result<String, ReconcileError> {
    if analysis.matches.is_empty() {
        return Ok(analysis.input.clone());
    }
    let marked = analysis
        .marked_input
        .as_deref()
        .ok_or(ReconcileError::MissingMarkedInput {
            item,
            matches: analysis.matches.len(),
        })?;

    let mut sorted: Vec<&Match> = analysis.matches.iter().collect();
    sorted.sort_by_key(|m| m.index);

    let original: Vec<char> = marked.chars().collect();
    validate(item, &sorted, original.len())?;

    let (spliced, _drift) = sorted.iter().fold((original, 0isize), |(mut working, drift), m| {
        let start = (m.index as isize + drift) as usize;
        let phrase = m.small_talk.to_uppercase();
        let inserted = phrase.chars().count();
        working.splice(start..start + m.length, phrase.chars());
        (working, drift + inserted as isize - m.length as isize)
    });

    Ok(spliced.into_iter().collect())
}

/// Exige correspondências disjuntas e contidas na string original.
fn validate(item: usize, sorted: &[&Match], len: usize) -> Result<(), ReconcileError> {
    let mut previous_end = 0;
    for m in sorted {
        if m.index < previous_end {
            return Err(ReconcileError::Overlap {
                item,
                index: m.index,
                previous_end,
            });
        }
        let end = m
            .index
            .checked_add(m.length)
            .filter(|end| *end <= len)
            .ok_or(ReconcileError::OutOfRange {
                item,
                start: m.index,
                end: m.index.saturating_add(m.length),
                len,
            })?;
        previous_end = end;
    }
    Ok(())
}
