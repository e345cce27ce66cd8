//! # Dicionários de Substituição — Abreviações e Erros de Digitação
//!
//! Um dicionário é um mapa imutável `token → substituição`, carregado uma
//! única vez a partir de um arquivo texto simples (`chave,valor` por linha)
//! e injetado no [`Pipeline`](crate::pipeline::Pipeline) na construção.
//!
//! ## Formato do arquivo
//!
//! ```text
//! vc,você
//! tb,também
//! obg,obrigado
//! ```
//!
//! Linhas em branco são ignoradas. Qualquer outra linha sem exatamente uma
//! vírgula é um erro fatal de carga: um dicionário pela metade produziria
//! substituições inconsistentes entre execuções.
//!
//! ## Substituição
//!
//! A busca é por token inteiro e sensível a maiúsculas. `"abrev"` é trocado,
//! `"abrevs"` não.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dictionary line {line} in {origin}: `{content}` (expected `key,value`)")]
    MalformedLine {
        origin: String,
        line: usize,
        content: String,
    },
}

/// Mapa imutável de token de superfície para token de substituição.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    /// Dicionário vazio: a substituição vira identidade (apenas normaliza espaços).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Interpreta o conteúdo de um arquivo `chave,valor`.
    ///
    /// `origin` aparece nas mensagens de erro (normalmente o caminho do arquivo).
    pub fn parse(content: &str, origin: &str) -> Result<Self, DictionaryError> {
        let mut entries = HashMap::new();
        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split(',');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) if !key.is_empty() => {
                    entries.insert(key.to_string(), value.to_string());
                }
                _ => {
                    return Err(DictionaryError::MalformedLine {
                        origin: origin.to_string(),
                        line: i + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        debug!(origin, entries = entries.len(), "dictionary parsed");
        Ok(Self { entries })
    }

    /// Lê e interpreta um arquivo de dicionário em UTF-8.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Substitui, token a token, as palavras encontradas no dicionário.
///
/// O texto é quebrado em espaços em branco e remontado com espaços simples,
/// então sequências de espaços também são normalizadas aqui.
pub fn substitute(text: &str, dictionary: &Dictionary) -> String {
    text.split_whitespace()
        .map(|word| dictionary.get(word).unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, &str)]) -> Dictionary {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let d = Dictionary::parse("vc,você\n\ntb,também\n", "inline").unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.get("vc"), Some("você"));
        assert_eq!(d.get("tb"), Some("também"));
    }

    #[test]
    fn test_parse_handles_crlf() {
        let d = Dictionary::parse("obg,obrigado\r\n", "inline").unwrap();
        assert_eq!(d.get("obg"), Some("obrigado"));
    }

    #[test]
    fn test_parse_rejects_extra_comma() {
        let err = Dictionary::parse("vc,você\na,b,c\n", "abbreviations.txt").unwrap_err();
        match err {
            DictionaryError::MalformedLine { origin, line, content } => {
                assert_eq!(origin, "abbreviations.txt");
                assert_eq!(line, 2);
                assert_eq!(content, "a,b,c");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_missing_comma() {
        assert!(Dictionary::parse("semvirgula", "inline").is_err());
    }

    #[test]
    fn test_substitute_whole_tokens_only() {
        let d = dict(&[("abrev", "abreviação")]);
        assert_eq!(substitute("abrev abrevs", &d), "abreviação abrevs");
    }

    #[test]
    fn test_substitute_is_case_sensitive() {
        let d = dict(&[("vc", "você")]);
        assert_eq!(substitute("VC vc", &d), "VC você");
    }

    #[test]
    fn test_substitute_collapses_spacing() {
        assert_eq!(substitute("  oi   tudo\tbem ", &Dictionary::empty()), "oi tudo bem");
    }
}
