//! # Normalização de Texto
//!
//! Transformações puras e sem estado aplicadas linha a linha:
//!
//! - [`strip_accents`]: decompõe (NFKD) e descarta as marcas combinantes ("ação" → "acao").
//! - [`strip_punctuation`]: troca pontuação ASCII por espaço, **exceto `@`**.
//! - [`collapse_whitespace`]: reduz sequências de 2+ espaços em branco a um espaço.
//! - [`fold_case`]: converte tudo para minúsculas.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\s+").unwrap());

/// Remove acentos: NFKD seguido do descarte de codepoints com classe combinante ≠ 0.
pub fn strip_accents(text: &str) -> String {
    text.nfkd()
        .filter(|c| canonical_combining_class(*c) == 0)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Troca cada caractere de pontuação ASCII por um espaço. O `@` é preservado.
pub fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_punctuation() && c != '@' { ' ' } else { c })
        .collect()
}

/// Colapsa sequências de dois ou mais espaços em branco em um único espaço.
///
/// Espaços simples ficam intocados, e as bordas não são aparadas.
pub fn collapse_whitespace(text: &str) -> String {
    MULTI_SPACE_RE.replace_all(text, " ").into_owned()
}

pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}
