//! Leitura e escrita de tabelas delimitadas (CSV com `;` por padrão).
//!
//! Entrada: uma coluna de texto (`Content` por padrão) e, opcionalmente, uma
//! coluna de identificador. Saída: `[Id,] Content, Processed Content`, com o
//! mesmo delimitador da entrada. Bytes que não são UTF-8 válido são
//! decodificados com substituição (U+FFFD) em vez de abortar a leitura.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::TableSettings;
use crate::pipeline::Record;

pub const ID_HEADER: &str = "Id";
pub const CONTENT_HEADER: &str = "Content";
pub const PROCESSED_HEADER: &str = "Processed Content";

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("column `{0}` not found in input header")]
    MissingColumn(String),
    #[error("delimiter must be a single ASCII character, got `{0}`")]
    InvalidDelimiter(String),
    #[error("unsupported encoding `{0}` (only UTF-8 is supported)")]
    UnsupportedEncoding(String),
}

/// Parâmetros de leitura/escrita já validados.
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub delimiter: u8,
    pub content_column: String,
    pub id_column: Option<String>,
}

impl TryFrom<&TableSettings> for TableFormat {
    type Error = TableError;

    fn try_from(settings: &TableSettings) -> Result<Self, Self::Error> {
        let encoding = settings.encoding.to_ascii_lowercase().replace('_', "-");
        if !matches!(encoding.as_str(), "utf-8" | "utf8") {
            return Err(TableError::UnsupportedEncoding(settings.encoding.clone()));
        }
        let delimiter = match settings.delimiter.as_bytes() {
            [b] if b.is_ascii() => *b,
            _ => return Err(TableError::InvalidDelimiter(settings.delimiter.clone())),
        };
        Ok(Self {
            delimiter,
            content_column: settings.content_column.clone(),
            id_column: settings.id_column.clone(),
        })
    }
}

/// Lê os registros de uma fonte delimitada. Células de texto vazias viram [`Record::missing`].
pub fn read_records<R: Read>(reader: R, format: &TableFormat) -> Result<Vec<Record>, TableError> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.byte_headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| String::from_utf8_lossy(h).trim() == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    };
    let content_idx = position(format.content_column.as_str())?;
    let id_idx = format.id_column.as_deref().map(position).transpose()?;

    let mut records = Vec::new();
    for row in csv.byte_records() {
        let row = row?;
        let cell = |idx: usize| {
            row.get(idx)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .filter(|s| !s.is_empty())
        };
        let id = id_idx.and_then(cell);
        records.push(match cell(content_idx) {
            Some(text) => Record::new(id, text),
            None => Record::missing(id),
        });
    }
    Ok(records)
}

/// Escreve `[Id,] Content, Processed Content`. A coluna `Id` aparece quando há coluna de id configurada.
pub fn write_records<W: Write>(
    writer: W,
    records: &[Record],
    format: &TableFormat,
) -> Result<(), TableError> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(format.delimiter)
        .from_writer(writer);

    let with_id = format.id_column.is_some();
    if with_id {
        csv.write_record([ID_HEADER, CONTENT_HEADER, PROCESSED_HEADER])?;
    } else {
        csv.write_record([CONTENT_HEADER, PROCESSED_HEADER])?;
    }
    for record in records {
        let text = record.text.as_deref().unwrap_or_default();
        if with_id {
            let id = record.id.as_deref().unwrap_or_default();
            csv.write_record([id, text, record.processed.as_str()])?;
        } else {
            csv.write_record([text, record.processed.as_str()])?;
        }
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn read_path(path: &Path, format: &TableFormat) -> Result<Vec<Record>, TableError> {
    let file = File::open(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(file, format)?;
    info!(path = %path.display(), rows = records.len(), "table loaded");
    Ok(records)
}

pub fn write_path(path: &Path, records: &[Record], format: &TableFormat) -> Result<(), TableError> {
    let file = File::create(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_records(file, records, format)?;
    info!(path = %path.display(), rows = records.len(), "table written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(id: Option<&str>) -> TableFormat {
        TableFormat {
            delimiter: b';',
            content_column: "Content".into(),
            id_column: id.map(str::to_string),
        }
    }

    #[test]
    fn test_read_selects_columns() {
        let input = "Id;Autor;Content\n1;ana;Oi tudo bem\n2;bia;\n";
        let records = read_records(input.as_bytes(), &format(Some("Id"))).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("1"));
        assert_eq!(records[0].text.as_deref(), Some("Oi tudo bem"));
        assert_eq!(records[1].text, None);
        assert_eq!(records[1].processed, "");
    }

    #[test]
    fn test_read_missing_column() {
        let err = read_records("Texto\noi\n".as_bytes(), &format(None)).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(c) if c == "Content"));
    }

    #[test]
    fn test_read_invalid_utf8_is_lossy() {
        let input: &[u8] = b"Content\nol\xe1\n";
        let records = read_records(input, &format(None)).unwrap();
        assert_eq!(records[0].text.as_deref(), Some("ol\u{FFFD}"));
    }

    #[test]
    fn test_write_with_and_without_id() {
        let mut record = Record::new(Some("7".into()), "Oi; tudo?");
        record.processed = "oi tudo".into();
        let mut out = Vec::new();
        write_records(&mut out, &[record], &format(Some("Id"))).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Id;Content;Processed Content\n7;\"Oi; tudo?\";oi tudo\n"
        );

        let mut out = Vec::new();
        write_records(&mut out, &[Record::new(None, "a")], &format(None)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Content;Processed Content\na;a\n");
    }

    #[test]
    fn test_configured_id_column_is_kept_when_empty() {
        let records = read_records("Id;Content\n;oi\n;tchau\n".as_bytes(), &format(Some("Id"))).unwrap();
        assert!(records.iter().all(|r| r.id.is_none()));

        let mut out = Vec::new();
        write_records(&mut out, &records, &format(Some("Id"))).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Id;Content;Processed Content\n;oi;oi\n;tchau;tchau\n"
        );
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = TableSettings::default();
        assert_eq!(TableFormat::try_from(&settings).unwrap().delimiter, b';');

        settings.encoding = "latin-1".into();
        assert!(matches!(
            TableFormat::try_from(&settings),
            Err(TableError::UnsupportedEncoding(_))
        ));

        settings.encoding = "UTF_8".into();
        settings.delimiter = "::".into();
        assert!(matches!(
            TableFormat::try_from(&settings),
            Err(TableError::InvalidDelimiter(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saida.csv");
        let records = vec![Record::new(None, "bom dia")];
        write_path(&path, &records, &format(None)).unwrap();

        let mut fmt = format(None);
        fmt.content_column = PROCESSED_HEADER.into();
        let back = read_path(&path, &fmt).unwrap();
        assert_eq!(back[0].text.as_deref(), Some("bom dia"));
    }
}
