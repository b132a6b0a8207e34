//! Parsing of FASTA protein records and the naming of proteins based on their header.

use std::{fmt::Display, str::FromStr};

use context_error::{BoxedError, Context, CreateError};
use serde::{Deserialize, Serialize};

use crate::{QuantError, QuantResult};

/// A single protein record out of a FASTA file
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SequenceRecord {
    header: String,
    sequence: String,
}

impl SequenceRecord {
    /// Create a new record, the header is stored without the leading `>`.
    pub fn new(header: impl Into<String>, sequence: impl Into<String>) -> Self {
        let header = header.into();
        Self {
            header: header
                .strip_prefix('>')
                .map(ToString::to_string)
                .unwrap_or(header),
            sequence: sequence.into(),
        }
    }

    /// Parse the first record out of FASTA text.
    /// # Errors
    /// If the text is not valid FASTA or does not contain any record.
    pub fn from_fasta(text: &str) -> QuantResult<Self> {
        parse_fasta(text)?.into_iter().next().ok_or_else(|| {
            BoxedError::small(
                QuantError::InvalidFasta,
                "Empty FASTA",
                "The FASTA text does not contain any record",
            )
        })
    }

    /// The full header line without the leading `>`
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The residues
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// The name of the record, the header up to the first whitespace
    pub fn record_name(&self) -> &str {
        self.header.split_whitespace().next().unwrap_or_default()
    }

    /// The database identifier of the record
    pub fn identifier(&self) -> FastaIdentifier {
        self.record_name().parse().unwrap_or_default()
    }

    /// Write this record as FASTA, with lines of 60 residues.
    /// # Errors
    /// If the writer errored.
    pub fn write(&self, mut writer: impl std::io::Write) -> std::io::Result<()> {
        writeln!(writer, ">{}", self.header)?;
        for line in self.sequence.as_bytes().chunks(60) {
            writer.write_all(line)?;
            writeln!(writer)?;
        }
        Ok(())
    }
}

/// Parse all records in a FASTA text. Residues are uppercased, whitespace and a terminal `*` are
/// removed.
/// # Errors
/// If there are residues before the first header or if a residue line contains characters that
/// are not letters.
pub fn parse_fasta(text: &str) -> QuantResult<Vec<SequenceRecord>> {
    let mut records = Vec::new();
    let mut current: Option<(String, String)> = None;
    for (line_index, line) in text.lines().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.trim_start().is_empty() || trimmed.starts_with(';') {
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some((header, sequence)) = current.take() {
                records.push(SequenceRecord { header, sequence });
            }
            current = Some((header.trim().to_string(), String::new()));
        } else if let Some((_, sequence)) = current.as_mut() {
            let residues = trimmed.strip_suffix('*').unwrap_or(trimmed);
            for (offset, c) in residues.char_indices() {
                if c.is_ascii_alphabetic() {
                    sequence.push(c.to_ascii_uppercase());
                } else if !c.is_whitespace() {
                    return Err(BoxedError::new(
                        QuantError::InvalidFasta,
                        "Invalid residue",
                        format!("The character '{c}' is not a valid residue"),
                        Context::line(Some(line_index as u32), line, offset, c.len_utf8())
                            .to_owned(),
                    ));
                }
            }
        } else {
            return Err(BoxedError::new(
                QuantError::InvalidFasta,
                "Missing FASTA header",
                "Residues were found before the first header line (starting with '>')",
                Context::full_line(line_index as u32, line).to_owned(),
            ));
        }
    }
    if let Some((header, sequence)) = current {
        records.push(SequenceRecord { header, sequence });
    }
    Ok(records)
}

/// A FASTA identifier following the NCBI identifier definition, limited to the databases that
/// are commonly used for proteomics search databases. Any other identifier is kept as
/// [`Self::Undefined`]. The boolean indicates a decoy (`rev_` prefix).
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum FastaIdentifier {
    /// Not following a known format
    Undefined(bool, String),
    /// `lcl|name`
    Local(bool, String),
    /// `gb|accession|locus`
    GenBank(bool, String, String),
    /// `ref|accession|locus`
    RefSeq(bool, String, String),
    /// `sp|accession|entry name`
    SwissProt(bool, String, String),
    /// `tr|accession|entry name`
    TrEMBL(bool, String, String),
}

impl Default for FastaIdentifier {
    fn default() -> Self {
        Self::Undefined(false, String::new())
    }
}

impl FastaIdentifier {
    /// The accession, or for undefined and local identifiers the full identifier
    pub fn accession(&self) -> &str {
        match self {
            Self::Undefined(_, a)
            | Self::Local(_, a)
            | Self::GenBank(_, a, _)
            | Self::RefSeq(_, a, _)
            | Self::SwissProt(_, a, _)
            | Self::TrEMBL(_, a, _) => a,
        }
    }

    /// The entry name or locus if present
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Undefined(..) | Self::Local(..) => None,
            Self::GenBank(_, _, b)
            | Self::RefSeq(_, _, b)
            | Self::SwissProt(_, _, b)
            | Self::TrEMBL(_, _, b) => (!b.is_empty()).then_some(b.as_str()),
        }
    }

    /// Check if this is a decoy sequence
    pub const fn decoy(&self) -> bool {
        match self {
            Self::Undefined(d, _)
            | Self::Local(d, _)
            | Self::GenBank(d, ..)
            | Self::RefSeq(d, ..)
            | Self::SwissProt(d, ..)
            | Self::TrEMBL(d, ..) => *d,
        }
    }
}

impl FromStr for FastaIdentifier {
    type Err = std::convert::Infallible;
    /// Parse the record name, optionally starting with a `>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('>').unwrap_or(s);
        let decoy = s.len() > 4 && s.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("rev_"));
        let s = if decoy { &s[4..] } else { s };
        let mut fields = s.splitn(3, '|');
        let database = fields.next().unwrap_or_default();
        let (a, b) = (fields.next(), fields.next());
        let pair = || {
            (
                a.unwrap_or_default().to_string(),
                b.unwrap_or_default().to_string(),
            )
        };
        Ok(match (database.to_ascii_lowercase().as_str(), a) {
            ("lcl", Some(_)) => Self::Local(decoy, s[4..].to_string()),
            ("gb", Some(_)) => {
                let (a, b) = pair();
                Self::GenBank(decoy, a, b)
            }
            ("ref", Some(_)) => {
                let (a, b) = pair();
                Self::RefSeq(decoy, a, b)
            }
            ("sp", Some(_)) => {
                let (a, b) = pair();
                Self::SwissProt(decoy, a, b)
            }
            ("tr", Some(_)) => {
                let (a, b) = pair();
                Self::TrEMBL(decoy, a, b)
            }
            _ => Self::Undefined(decoy, s.to_string()),
        })
    }
}

impl Display for FastaIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = if self.decoy() { "rev_" } else { "" };
        match self {
            Self::Undefined(_, a) => write!(f, "{prefix}{a}"),
            Self::Local(_, a) => write!(f, "{prefix}lcl|{a}"),
            Self::GenBank(_, a, b) => write!(f, "{prefix}gb|{a}|{b}"),
            Self::RefSeq(_, a, b) => write!(f, "{prefix}ref|{a}|{b}"),
            Self::SwissProt(_, a, b) => write!(f, "{prefix}sp|{a}|{b}"),
            Self::TrEMBL(_, a, b) => write!(f, "{prefix}tr|{a}|{b}"),
        }
    }
}

/// How to derive the short display name of a protein out of its FASTA header.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum TrivialNameParser {
    /// The full header
    Header,
    /// The record name, the header up to the first whitespace
    RecordName,
    /// The nth (0 based) `|` separated field of the record name, falls back to the record name
    /// if there are not enough fields. For UniProt headers (`sp|P69905|HBA_HUMAN`) field 2 is the
    /// entry name.
    PipeField(usize),
}

impl Default for TrivialNameParser {
    fn default() -> Self {
        Self::PipeField(2)
    }
}

impl TrivialNameParser {
    /// Get the name for this record
    pub fn name<'a>(&self, record: &'a SequenceRecord) -> &'a str {
        match self {
            Self::Header => record.header(),
            Self::RecordName => record.record_name(),
            Self::PipeField(n) => record
                .record_name()
                .split('|')
                .nth(*n)
                .unwrap_or_else(|| record.record_name()),
        }
    }
}

impl FromStr for TrivialNameParser {
    type Err = BoxedError<'static, QuantError>;
    /// Parses `header`, `record-name`, or `pipe-field:N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "header" => Ok(Self::Header),
            "record-name" => Ok(Self::RecordName),
            _ => lower
                .strip_prefix("pipe-field:")
                .and_then(|n| n.trim().parse().ok())
                .map(Self::PipeField)
                .ok_or_else(|| {
                    BoxedError::new(
                        QuantError::InvalidConfig,
                        "Invalid trivial name parser",
                        "Use 'header', 'record-name', or 'pipe-field:N' with N a number",
                        Context::show(s.to_string()).to_owned(),
                    )
                }),
        }
    }
}

impl TryFrom<String> for TrivialNameParser {
    type Error = BoxedError<'static, QuantError>;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrivialNameParser> for String {
    fn from(value: TrivialNameParser) -> Self {
        value.to_string()
    }
}

impl Display for TrivialNameParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::RecordName => write!(f, "record-name"),
            Self::PipeField(n) => write!(f, "pipe-field:{n}"),
        }
    }
}

#[cfg(test)]
#[expect(clippy::missing_panics_doc)]
mod tests {
    use context_error::*;

    use super::*;

    const HBA: &str = ">sp|P69905|HBA_HUMAN Hemoglobin subunit alpha OS=Homo sapiens OX=9606 GN=HBA1 PE=1 SV=2
MVLSPADKTNVKAAWGKVGAHAGEYGAEALERMFLSFPTTKTYFPHFDLSHGSAQVKGHG
KKVADALTNAVAHVDDMPNALSALSDLHAHKLRVDPVNFKLLSHCLLVTLAAHLPAEFTP
AVHASLDKFLASVSTVLTSKYR
";

    #[test]
    fn parse_uniprot() {
        let records = parse_fasta(HBA).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.record_name(), "sp|P69905|HBA_HUMAN");
        assert_eq!(record.sequence().len(), 142);
        assert!(record.sequence().starts_with("MVLSPADKTNVKAAWGKVGAHAGEYGAEALER"));
        assert_eq!(
            record.identifier(),
            FastaIdentifier::SwissProt(false, "P69905".to_string(), "HBA_HUMAN".to_string())
        );
        assert_eq!(record.identifier().accession(), "P69905");
        assert_eq!(record.identifier().name(), Some("HBA_HUMAN"));
    }

    #[test]
    fn parse_multiple_records() {
        let records = parse_fasta(">a\nAC\nde*\n\n>b\n>c desc\nKR\n").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sequence(), "ACDE");
        assert_eq!(records[1].sequence(), "");
        assert_eq!(records[2].header(), "c desc");
        assert_eq!(records[2].identifier(), FastaIdentifier::Undefined(false, "c".to_string()));
    }

    #[test]
    fn invalid_fasta() {
        assert!(
            parse_fasta("MVLS\n>a\nAC\n")
                .is_err_and(|e| matches!(e.get_kind(), QuantError::InvalidFasta))
        );
        assert!(parse_fasta(">a\nAC1D\n").is_err());
        assert!(
            SequenceRecord::from_fasta("")
                .is_err_and(|e| matches!(e.get_kind(), QuantError::InvalidFasta))
        );
    }

    #[test]
    fn identifiers() {
        let decoy: FastaIdentifier = "rev_tr|A0A024R161|A0A024R161_HUMAN".parse().unwrap();
        assert!(decoy.decoy());
        assert_eq!(decoy.accession(), "A0A024R161");
        assert_eq!(decoy.to_string(), "rev_tr|A0A024R161|A0A024R161_HUMAN");
        let local: FastaIdentifier = "lcl|contaminant_1".parse().unwrap();
        assert_eq!(local, FastaIdentifier::Local(false, "contaminant_1".to_string()));
        assert_eq!(local.name(), None);
    }

    #[test]
    fn trivial_names() {
        let record = SequenceRecord::from_fasta(HBA).unwrap();
        assert_eq!(TrivialNameParser::default().name(&record), "HBA_HUMAN");
        assert_eq!(TrivialNameParser::RecordName.name(&record), "sp|P69905|HBA_HUMAN");
        assert!(TrivialNameParser::Header.name(&record).ends_with("PE=1 SV=2"));
        assert_eq!(TrivialNameParser::PipeField(1).name(&record), "P69905");
        let plain = SequenceRecord::new(">P12345 Some protein", "AAK");
        assert_eq!(TrivialNameParser::default().name(&plain), "P12345");
    }

    #[test]
    fn trivial_name_parser_from_str() {
        assert_eq!("header".parse::<TrivialNameParser>().unwrap(), TrivialNameParser::Header);
        assert_eq!(
            "Record-Name".parse::<TrivialNameParser>().unwrap(),
            TrivialNameParser::RecordName
        );
        assert_eq!(
            "pipe-field:1".parse::<TrivialNameParser>().unwrap(),
            TrivialNameParser::PipeField(1)
        );
        assert!(
            "pipe-field:x"
                .parse::<TrivialNameParser>()
                .is_err_and(|e| matches!(e.get_kind(), QuantError::InvalidConfig))
        );
        assert_eq!(TrivialNameParser::PipeField(3).to_string(), "pipe-field:3");
    }

    #[test]
    fn write_round_trip() {
        let record = SequenceRecord::from_fasta(HBA).unwrap();
        let mut out = Vec::new();
        record.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1).map(str::len), Some(60));
        assert_eq!(SequenceRecord::from_fasta(&text).unwrap(), record);
    }
}
