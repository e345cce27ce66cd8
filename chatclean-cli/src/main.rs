//! Linha de comando: limpa a coluna de texto de um CSV e grava o resultado.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatclean_core::config::{self, Settings};
use chatclean_core::table::{self, TableFormat};
use chatclean_core::{PipelineOptions, SmallTalkClient};

#[derive(Parser, Debug)]
#[command(name = "chatclean")]
#[command(about = "Limpeza de mensagens de chat em português")]
#[command(version)]
struct Cli {
    /// Arquivo CSV de entrada
    input: PathBuf,

    /// Arquivo CSV de saída
    output: PathBuf,

    /// Arquivo de configuração (padrão: chatclean.toml no diretório atual, se existir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Coluna com o texto das mensagens
    #[arg(long)]
    content_column: Option<String>,

    /// Coluna com o identificador de cada mensagem
    #[arg(long)]
    id_column: Option<String>,

    /// Delimitador do CSV (entrada e saída)
    #[arg(long)]
    delimiter: Option<String>,

    /// Dicionário de erros de digitação (`errado,certo` por linha)
    #[arg(long)]
    typos: Option<PathBuf>,

    /// Dicionário de abreviações (`abrev,expansao` por linha)
    #[arg(long)]
    abbreviations: Option<PathBuf>,

    /// URL do serviço de small talk
    #[arg(long)]
    small_talk_url: Option<String>,

    /// Número de lotes enviados ao serviço de small talk
    #[arg(long)]
    batches: Option<usize>,

    /// Timeout de cada requisição ao serviço, em segundos
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Prefixo dos ids de requisição (padrão: nome do arquivo de entrada)
    #[arg(long)]
    request_id: Option<String>,

    /// Substitui entidades por espaço em vez de tags
    #[arg(long)]
    no_tagging: bool,

    /// Sem tagging, mantém só o texto relevante devolvido pelo serviço
    #[arg(long)]
    relevant: bool,

    #[command(flatten)]
    skip: SkipSteps,
}

/// Desliga etapas individuais do pipeline.
#[derive(Args, Debug, Default)]
struct SkipSteps {
    #[arg(long)]
    no_emoji: bool,
    #[arg(long)]
    no_whatsapp_emoji: bool,
    #[arg(long)]
    no_lowercase: bool,
    #[arg(long)]
    no_typo: bool,
    #[arg(long)]
    no_abbreviation: bool,
    #[arg(long)]
    no_email: bool,
    #[arg(long)]
    no_cpf: bool,
    #[arg(long)]
    no_money: bool,
    #[arg(long)]
    no_date: bool,
    #[arg(long)]
    no_url: bool,
    #[arg(long)]
    no_time: bool,
    #[arg(long)]
    no_code: bool,
    #[arg(long)]
    no_number: bool,
    #[arg(long)]
    no_accentuation: bool,
    #[arg(long)]
    no_punctuation: bool,
    #[arg(long)]
    no_small_talk: bool,
}

impl SkipSteps {
    /// Só desliga: uma etapa desligada no arquivo de configuração continua desligada.
    fn apply(&self, options: &mut PipelineOptions) {
        let flags = [
            (self.no_emoji, &mut options.emoji),
            (self.no_whatsapp_emoji, &mut options.whatsapp_emoji),
            (self.no_lowercase, &mut options.lowercase),
            (self.no_typo, &mut options.typo),
            (self.no_abbreviation, &mut options.abbreviation),
            (self.no_email, &mut options.email),
            (self.no_cpf, &mut options.cpf),
            (self.no_money, &mut options.money),
            (self.no_date, &mut options.date),
            (self.no_url, &mut options.url),
            (self.no_time, &mut options.time),
            (self.no_code, &mut options.code),
            (self.no_number, &mut options.number),
            (self.no_accentuation, &mut options.accentuation),
            (self.no_punctuation, &mut options.punctuation),
            (self.no_small_talk, &mut options.small_talk),
        ];
        for (skip, enabled) in flags {
            if skip {
                *enabled = false;
            }
        }
    }
}

impl Cli {
    /// Sobrepõe as flags da linha de comando à configuração carregada.
    fn merge_into(&self, settings: &mut Settings) {
        if let Some(column) = &self.content_column {
            settings.table.content_column = column.clone();
        }
        if let Some(column) = &self.id_column {
            settings.table.id_column = Some(column.clone());
        }
        if let Some(delimiter) = &self.delimiter {
            settings.table.delimiter = delimiter.clone();
        }
        if let Some(path) = &self.typos {
            settings.dictionaries.typos = Some(path.clone());
        }
        if let Some(path) = &self.abbreviations {
            settings.dictionaries.abbreviations = Some(path.clone());
        }
        if let Some(url) = &self.small_talk_url {
            settings.small_talk.endpoint = Some(url.clone());
        }
        if let Some(batches) = self.batches {
            settings.small_talk.batches = batches;
        }
        if let Some(timeout) = self.timeout_secs {
            settings.small_talk.timeout_secs = timeout;
        }
        if let Some(id) = &self.request_id {
            settings.small_talk.request_id = Some(id.clone());
        }
        if self.no_tagging {
            settings.pipeline.tagging = false;
        }
        if self.relevant {
            settings.pipeline.relevant = true;
        }
        self.skip.apply(&mut settings.pipeline);
    }
}

/// Id do grupo de requisições: o configurado ou o nome do arquivo de entrada sem extensão.
fn group_id(settings: &Settings, input: &Path) -> String {
    settings.small_talk.request_id.clone().unwrap_or_else(|| {
        input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chatclean".to_string())
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut settings = config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.merge_into(&mut settings);
    info!(?settings, "configuration resolved");

    let format = TableFormat::try_from(&settings.table)?;
    let pipeline = settings.dictionaries.load_pipeline()?;
    let client = match &settings.small_talk.endpoint {
        Some(_) if settings.pipeline.small_talk => Some(SmallTalkClient::new(&settings.small_talk)?),
        _ => None,
    };
    if let Some(client) = &client {
        info!(
            endpoint = client.endpoint(),
            batches = client.batches(),
            "small talk removal enabled"
        );
    }

    let start = Instant::now();
    let records = table::read_path(&cli.input, &format)?;
    let records = pipeline
        .process_with_small_talk(
            records,
            &settings.pipeline,
            client.as_ref(),
            &group_id(&settings, &cli.input),
        )
        .await
        .context("processing failed; no output was written")?;
    table::write_path(&cli.output, &records, &format)?;

    info!(
        rows = records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        output = %cli.output.display(),
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["chatclean", "entrada.csv", "saida.csv"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = parse(&[
            "--delimiter",
            ",",
            "--content-column",
            "Mensagem",
            "--small-talk-url",
            "http://localhost:9000/analysis",
            "--batches",
            "8",
            "--no-tagging",
            "--relevant",
        ]);
        let mut settings = Settings::default();
        cli.merge_into(&mut settings);

        assert_eq!(settings.table.delimiter, ",");
        assert_eq!(settings.table.content_column, "Mensagem");
        assert_eq!(
            settings.small_talk.endpoint.as_deref(),
            Some("http://localhost:9000/analysis")
        );
        assert_eq!(settings.small_talk.batches, 8);
        assert!(!settings.pipeline.tagging);
        assert!(settings.pipeline.relevant);
    }

    #[test]
    fn test_skip_flags_only_disable() {
        let cli = parse(&["--no-emoji", "--no-small-talk"]);
        let mut settings = Settings::default();
        settings.pipeline.number = false;
        cli.merge_into(&mut settings);

        assert!(!settings.pipeline.emoji);
        assert!(!settings.pipeline.small_talk);
        assert!(!settings.pipeline.number);
        assert!(settings.pipeline.date);
    }

    #[test]
    fn test_group_id_defaults_to_file_stem() {
        let settings = Settings::default();
        assert_eq!(group_id(&settings, Path::new("dados/conversas.csv")), "conversas");

        let mut settings = Settings::default();
        settings.small_talk.request_id = Some("lote42".into());
        assert_eq!(group_id(&settings, Path::new("x.csv")), "lote42");
    }
}
