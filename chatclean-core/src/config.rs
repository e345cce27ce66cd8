//! Carregamento de configuração em camadas.
//!
//! Ordem de precedência (a última vence):
//!
//! 1. valores padrão embutidos;
//! 2. arquivo `chatclean.toml` (ou o caminho passado), opcional;
//! 3. variáveis de ambiente `CHATCLEAN__<SEÇÃO>__<CHAVE>`, ex:
//!    `CHATCLEAN__SMALL_TALK__ENDPOINT=http://localhost:8080/analysis`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::dictionary::{Dictionary, DictionaryError};
use crate::pipeline::{Pipeline, PipelineOptions};

const CONFIG_FILE: &str = "chatclean";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineOptions,
    pub small_talk: SmallTalkSettings,
    pub dictionaries: DictionaryPaths,
    pub table: TableSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmallTalkSettings {
    /// URL do serviço. Sem ela, a etapa de small talk não roda.
    pub endpoint: Option<String>,
    /// Número de lotes em que as linhas são divididas.
    pub batches: usize,
    pub timeout_secs: u64,
    /// Prefixo dos ids de requisição (`"{request_id}_{lote}"`).
    pub request_id: Option<String>,
}

impl Default for SmallTalkSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            batches: 4,
            timeout_secs: 60,
            request_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DictionaryPaths {
    pub typos: Option<PathBuf>,
    pub abbreviations: Option<PathBuf>,
}

impl DictionaryPaths {
    /// Carrega os dicionários configurados; caminhos ausentes viram dicionários vazios.
    pub fn load_pipeline(&self) -> Result<Pipeline, DictionaryError> {
        let load = |path: &Option<PathBuf>| match path {
            Some(p) => Dictionary::from_path(p),
            None => Ok(Dictionary::empty()),
        };
        Ok(Pipeline::new(load(&self.typos)?, load(&self.abbreviations)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub content_column: String,
    pub id_column: Option<String>,
    pub delimiter: String,
    pub encoding: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            content_column: "Content".to_string(),
            id_column: None,
            delimiter: ";".to_string(),
            encoding: "utf-8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Carrega a configuração. `file` substitui o `chatclean.toml` do diretório atual.
pub fn load(file: Option<&Path>) -> Result<Settings, SettingsError> {
    let file_source = match file {
        Some(path) => File::from(path.to_path_buf()).required(true),
        None => File::with_name(CONFIG_FILE).required(false),
    };
    let settings = Config::builder()
        .add_source(file_source)
        .add_source(Environment::with_prefix("CHATCLEAN").separator("__"))
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_defaults() {
        let settings = Settings::default();
        assert!(settings.pipeline.tagging);
        assert!(!settings.pipeline.relevant);
        assert_eq!(settings.small_talk.batches, 4);
        assert_eq!(settings.table.delimiter, ";");
        assert_eq!(settings.table.content_column, "Content");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[pipeline]\ntagging = false\nemoji = false\n\n[small_talk]\nendpoint = \"http://localhost:9000/analysis\"\nbatches = 2\n"
        )
        .unwrap();

        let settings = load(Some(file.path())).unwrap();
        assert!(!settings.pipeline.tagging);
        assert!(!settings.pipeline.emoji);
        assert!(settings.pipeline.number);
        assert_eq!(
            settings.small_talk.endpoint.as_deref(),
            Some("http://localhost:9000/analysis")
        );
        assert_eq!(settings.small_talk.batches, 2);
        assert_eq!(settings.small_talk.timeout_secs, 60);
    }

    #[test]
    fn test_missing_dictionaries_load_empty() {
        let pipeline = DictionaryPaths::default().load_pipeline().unwrap();
        let options = PipelineOptions::none();
        assert_eq!(pipeline.clean("vc  aqui", &options), "vc aqui");
    }
}
