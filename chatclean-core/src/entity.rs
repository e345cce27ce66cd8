//! # Mascaramento de Entidades — Padrões Regex por Tipo
//!
//! Cada tipo de entidade estruturada (e-mail, CPF, dinheiro, data, URL,
//! horário, código, número) tem um padrão compilado **uma única vez** e um
//! literal de tag em maiúsculas. O mascaramento tem duas formas:
//!
//! - **Tagging** (`tagging = true`): cada ocorrência vira a tag (`"NUMBER"`, `"DATE"`...).
//! - **Remoção** (`tagging = false`): cada ocorrência vira um espaço simples,
//!   evitando que os tokens vizinhos colem.
//!
//! ## Ordem importa
//!
//! Vários padrões se sobrepõem: uma data consome dígitos que o padrão de número
//! também casaria, e um código alfanumérico (`abc123`) seria fragmentado se o
//! padrão de número rodasse antes. Por isso a ordem relativa é fixa:
//!
//! ```text
//! email → cpf → money → date → url → time → code → number
//! ```
//!
//! Os emojis rodam antes de tudo (antes até da conversão para minúsculas),
//! pois a detecção depende da identidade exata dos codepoints.
//!
//! ## Exemplo
//!
//! ```rust
//! use chatclean_core::entity::{apply, EntityKind};
//!
//! assert_eq!(apply("chego 10/05", EntityKind::Date, true), "chego DATE");
//! assert_eq!(apply("custa 30 reais", EntityKind::Number, false), "custa   reais");
//! ```

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Tipos de entidade reconhecidos pelo mascarador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Sequências de emojis dos blocos clássicos (emoticons, pictogramas, transporte, bandeiras).
    Emoji,
    /// Qualquer glifo pictográfico isolado, como os enviados pelo WhatsApp (inclui ZWJ e tons de pele).
    WhatsappEmoji,
    /// Qualquer sequência sem espaços contendo `@`.
    Email,
    /// CPF formatado: `123.456.789-09`.
    Cpf,
    /// Valores em reais: `R$1.500,00`.
    Money,
    /// Dia/mês com ano opcional: `10/05`, `10/05/2024`.
    Date,
    /// Endereços `http://` e `https://`.
    Url,
    /// Horários: `10:30`, `10h`, `10hrs`, `10h30min`.
    Time,
    /// Códigos alfanuméricos: protocolos, placas, cupons (`abc123`, `123abc`).
    Code,
    /// Inteiros e decimais com sinal opcional.
    Number,
}

impl EntityKind {
    /// Ordem relativa obrigatória dos mascaradores de entidades estruturadas.
    pub const MASKING_ORDER: [EntityKind; 8] = [
        EntityKind::Email,
        EntityKind::Cpf,
        EntityKind::Money,
        EntityKind::Date,
        EntityKind::Url,
        EntityKind::Time,
        EntityKind::Code,
        EntityKind::Number,
    ];

    /// Todos os tipos, na ordem em que o pipeline os aplica.
    pub fn all() -> [EntityKind; 10] {
        [
            EntityKind::Emoji,
            EntityKind::WhatsappEmoji,
            EntityKind::Email,
            EntityKind::Cpf,
            EntityKind::Money,
            EntityKind::Date,
            EntityKind::Url,
            EntityKind::Time,
            EntityKind::Code,
            EntityKind::Number,
        ]
    }

    /// Literal que substitui a entidade no modo tagging
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Emoji | EntityKind::WhatsappEmoji => "EMOJI",
            EntityKind::Email => "EMAIL",
            EntityKind::Cpf => "CPF",
            EntityKind::Money => "MONEY",
            EntityKind::Date => "DATE",
            EntityKind::Url => "URL",
            EntityKind::Time => "TIME",
            EntityKind::Code => "CODE",
            EntityKind::Number => "NUMBER",
        }
    }

    /// Nome em snake_case (usado em logs e na configuração)
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Emoji => "emoji",
            EntityKind::WhatsappEmoji => "whatsapp_emoji",
            EntityKind::Email => "email",
            EntityKind::Cpf => "cpf",
            EntityKind::Money => "money",
            EntityKind::Date => "date",
            EntityKind::Url => "url",
            EntityKind::Time => "time",
            EntityKind::Code => "code",
            EntityKind::Number => "number",
        }
    }

    /// Tenta parsear a partir do nome (ex: "cpf" → Some(Cpf))
    pub fn from_name(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.name() == s)
    }

    /// Padrão compilado do tipo. `WhatsappEmoji` é detectado por grafema, não por regex.
    fn pattern(&self) -> Option<&'static Regex> {
        match self {
            EntityKind::Emoji => Some(&EMOJI_RE),
            EntityKind::WhatsappEmoji => None,
            EntityKind::Email => Some(&EMAIL_RE),
            EntityKind::Cpf => Some(&CPF_RE),
            EntityKind::Money => Some(&MONEY_RE),
            EntityKind::Date => Some(&DATE_RE),
            EntityKind::Url => Some(&URL_RE),
            EntityKind::Time => Some(&TIME_RE),
            EntityKind::Code => Some(&CODE_RE),
            EntityKind::Number => Some(&NUMBER_RE),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}]+")
        .unwrap()
});
static PICTOGRAPHIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Extended_Pictographic}").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").unwrap());
static CPF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{3}\.\d{3}\.\d{3}-\d{2}").unwrap());
static MONEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:r[s$])\d+(\.\d{3})*(,\d{2})?").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}/\d{1,2})(/\d{2,4})?").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}(:|h(rs)?)(\d{1,2}(min)?)?").unwrap());
static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+\d+\w*|[\d@]+[A-Za-z]+[\w@]*").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-+]?\d*\.\d+|\d+").unwrap());

/// Uma ocorrência detectada. Offsets em bytes sobre a string analisada naquele instante.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub kind: EntityKind,
    /// Posição de byte inicial (inclusive)
    pub start: usize,
    /// Posição de byte final (exclusivo)
    pub end: usize,
    pub text: String,
}

impl EntitySpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Lista as ocorrências de um tipo, da esquerda para a direita, sem sobreposição.
pub fn find_spans(text: &str, kind: EntityKind) -> Vec<EntitySpan> {
    let span = |start: usize, matched: &str| EntitySpan {
        kind,
        start,
        end: start + matched.len(),
        text: matched.to_string(),
    };
    match kind.pattern() {
        Some(re) => re.find_iter(text).map(|m| span(m.start(), m.as_str())).collect(),
        None => text
            .grapheme_indices(true)
            .filter(|(_, g)| PICTOGRAPHIC_RE.is_match(g))
            .map(|(start, g)| span(start, g))
            .collect(),
    }
}

/// Quantas ocorrências do tipo existem no texto.
pub fn count(text: &str, kind: EntityKind) -> usize {
    match kind.pattern() {
        Some(re) => re.find_iter(text).count(),
        None => find_spans(text, kind).len(),
    }
}

/// Mascara todas as ocorrências de `kind`: tag em maiúsculas se `tagging`, senão um espaço.
pub fn apply(text: &str, kind: EntityKind, tagging: bool) -> String {
    let replacement = if tagging { kind.tag() } else { " " };
    match kind.pattern() {
        Some(re) => re.replace_all(text, NoExpand(replacement)).into_owned(),
        None => splice(text, &find_spans(text, kind), replacement),
    }
}

/// Substitui spans ordenados e disjuntos por `replacement`.
fn splice(text: &str, spans: &[EntitySpan], replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        out.push_str(replacement);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_uppercase_literals() {
        for kind in EntityKind::all() {
            assert_eq!(kind.tag(), kind.tag().to_uppercase());
            assert_eq!(EntityKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_email_tagging() {
        assert_eq!(
            apply("manda pra joao@empresa.com.br hoje", EntityKind::Email, true),
            "manda pra EMAIL hoje"
        );
    }

    #[test]
    fn test_cpf_removal() {
        assert_eq!(apply("cpf 123.456.789-09 ok", EntityKind::Cpf, false), "cpf   ok");
    }

    #[test]
    fn test_money_after_lowercase() {
        assert_eq!(apply("paguei r$1.500,00", EntityKind::Money, true), "paguei MONEY");
        assert_eq!(apply("paguei R$50", EntityKind::Money, true), "paguei MONEY");
    }

    #[test]
    fn test_date_with_and_without_year() {
        assert_eq!(
            apply("de 10/05 até 12/06/2024", EntityKind::Date, true),
            "de DATE até DATE"
        );
    }

    #[test]
    fn test_url() {
        assert_eq!(
            apply("veja https://exemplo.com.br/a?b=1 agora", EntityKind::Url, true),
            "veja URL agora"
        );
    }

    #[test]
    fn test_time_variants() {
        assert_eq!(apply("às 10:30", EntityKind::Time, true), "às TIME");
        assert_eq!(apply("às 10h", EntityKind::Time, true), "às TIME");
        assert_eq!(apply("às 9hrs", EntityKind::Time, true), "às TIME");
        assert_eq!(apply("às 10h30min", EntityKind::Time, true), "às TIME");
    }

    #[test]
    fn test_code_before_number() {
        let coded = apply("protocolo abc123 e 456", EntityKind::Code, true);
        assert_eq!(coded, "protocolo CODE e 456");
        assert_eq!(apply(&coded, EntityKind::Number, true), "protocolo CODE e NUMBER");
    }

    #[test]
    fn test_number_decimal_and_sign() {
        assert_eq!(apply("-3.5 e 42", EntityKind::Number, true), "NUMBER e NUMBER");
    }

    #[test]
    fn test_classic_emoji_run_is_one_span() {
        let spans = find_spans("oi 😀😃 tchau", EntityKind::Emoji);
        assert_eq!(spans.len(), 1);
        assert_eq!(apply("oi 😀😃 tchau", EntityKind::Emoji, true), "oi EMOJI tchau");
    }

    #[test]
    fn test_whatsapp_emoji_per_glyph() {
        // ❤️ (com seletor de variação) e 👍🏽 (com tom de pele) são um glifo cada
        let text = "valeu ❤️👍🏽";
        assert_eq!(count(text, EntityKind::WhatsappEmoji), 2);
        assert_eq!(apply(text, EntityKind::WhatsappEmoji, true), "valeu EMOJIEMOJI");
        assert_eq!(apply(text, EntityKind::WhatsappEmoji, false), "valeu   ");
    }

    #[test]
    fn test_whatsapp_emoji_keeps_digits() {
        assert_eq!(apply("sala 42", EntityKind::WhatsappEmoji, false), "sala 42");
    }

    #[test]
    fn test_removal_is_idempotent() {
        let text = "ligue 99 ou mande joao@x.com, cpf 123.456.789-09 em 10/05 às 10h cod ab12";
        for kind in EntityKind::all() {
            let once = apply(text, kind, false);
            assert_eq!(count(&once, kind), 0, "{kind} deixou ocorrências");
            assert_eq!(apply(&once, kind, false), once, "{kind} não é idempotente");
        }
    }

    #[test]
    fn test_tag_count_matches_span_count() {
        let text = "1 2 3 e 4.5";
        let spans = find_spans(text, EntityKind::Number);
        let tagged = apply(text, EntityKind::Number, true);
        assert_eq!(tagged.matches("NUMBER").count(), spans.len());
        assert_eq!(spans.len(), 4);
    }

    #[test]
    fn test_plain_text_passes_every_masker() {
        let text = "bom dia tudo bem com você";
        for kind in EntityKind::all() {
            assert_eq!(apply(text, kind, true), text);
            assert_eq!(apply(text, kind, false), text);
        }
    }

    #[test]
    fn test_span_offsets_are_bytes() {
        let spans = find_spans("ação 12", EntityKind::Number);
        assert_eq!(spans[0].start, "ação ".len());
        assert_eq!(spans[0].len(), 2);
        assert_eq!(spans[0].text, "12");
    }
}
