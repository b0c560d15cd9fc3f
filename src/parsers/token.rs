use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ParseErrorKind;

/// Number of space-delimited fields on an analyzer token line
pub const TOKEN_LINE_FIELDS: usize = 12;

/// Prefix marking an alternative-candidate token line
pub const ALTERNATIVE_MARKER: &str = "@ ";

/// One analyzed token. The field order matches the analyzer's token line;
/// `is_alternative` is synthesized from the line marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRecord {
    pub surface: String,
    pub reading: String,
    pub lemma: String,
    pub pos: String,
    pub pos_id: String,
    pub pos_subcategory: String,
    pub pos_subcategory_id: String,
    pub conjugation_type: String,
    pub conjugation_type_id: String,
    pub conjugation_form: String,
    pub conjugation_form_id: String,
    pub semantic_feature_string: String,
    pub is_alternative: bool,
}

impl TokenRecord {
    /// Field count including the synthetic alternative flag
    pub const FIELD_COUNT: usize = TOKEN_LINE_FIELDS + 1;

    /// Parse one token line (without its line terminator).
    pub fn parse_line(line: &str) -> Result<Self, ParseErrorKind> {
        let (body, is_alternative) = match line.strip_prefix(ALTERNATIVE_MARKER) {
            Some(rest) => (rest, true),
            None => (line, false),
        };

        let fields = split_fields(body)?;
        if fields.len() != TOKEN_LINE_FIELDS {
            return Err(ParseErrorKind::FieldCount {
                expected: TOKEN_LINE_FIELDS,
                actual: fields.len(),
            });
        }

        let mut fields = fields.into_iter();
        let mut next = || fields.next().unwrap_or_default();
        Ok(Self {
            surface: next(),
            reading: next(),
            lemma: next(),
            pos: next(),
            pos_id: next(),
            pos_subcategory: next(),
            pos_subcategory_id: next(),
            conjugation_type: next(),
            conjugation_type_id: next(),
            conjugation_form: next(),
            conjugation_form_id: next(),
            semantic_feature_string: next(),
            is_alternative,
        })
    }

    pub fn field(&self, field: TokenField) -> String {
        match field {
            TokenField::Surface => self.surface.clone(),
            TokenField::Reading => self.reading.clone(),
            TokenField::Lemma => self.lemma.clone(),
            TokenField::Pos => self.pos.clone(),
            TokenField::PosId => self.pos_id.clone(),
            TokenField::PosSubcategory => self.pos_subcategory.clone(),
            TokenField::PosSubcategoryId => self.pos_subcategory_id.clone(),
            TokenField::ConjugationType => self.conjugation_type.clone(),
            TokenField::ConjugationTypeId => self.conjugation_type_id.clone(),
            TokenField::ConjugationForm => self.conjugation_form.clone(),
            TokenField::ConjugationFormId => self.conjugation_form_id.clone(),
            TokenField::SemanticFeatures => self.semantic_feature_string.clone(),
            TokenField::IsAlternative => self.is_alternative.to_string(),
        }
    }
}

/// Split a token line with shell quoting rules.
///
/// `shell_words` treats a word starting with `#` as a comment; analyzer
/// output uses `#` as ordinary data, so such words are escaped first.
pub(crate) fn split_fields(line: &str) -> Result<Vec<String>, shell_words::ParseError> {
    if !line.contains('#') {
        return shell_words::split(line);
    }

    let mut escaped = String::with_capacity(line.len() + 8);
    let mut quote: Option<char> = None;
    let mut word_start = true;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            escaped.push(c);
            if c == q {
                quote = None;
            } else if q == '"' && c == '\\' {
                escaped.extend(chars.next());
            }
            continue;
        }
        match c {
            '\\' => {
                escaped.push(c);
                escaped.extend(chars.next());
                word_start = false;
                continue;
            }
            '\'' | '"' => quote = Some(c),
            '#' if word_start => escaped.push('\\'),
            _ => {}
        }
        escaped.push(c);
        word_start = matches!(c, ' ' | '\t' | '\n');
    }
    shell_words::split(&escaped)
}

/// Named token fields, used for CLI projections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenField {
    Surface,
    Reading,
    Lemma,
    Pos,
    PosId,
    PosSubcategory,
    PosSubcategoryId,
    ConjugationType,
    ConjugationTypeId,
    ConjugationForm,
    ConjugationFormId,
    SemanticFeatures,
    IsAlternative,
}

impl TokenField {
    pub const ALL: [TokenField; TokenRecord::FIELD_COUNT] = [
        TokenField::Surface,
        TokenField::Reading,
        TokenField::Lemma,
        TokenField::Pos,
        TokenField::PosId,
        TokenField::PosSubcategory,
        TokenField::PosSubcategoryId,
        TokenField::ConjugationType,
        TokenField::ConjugationTypeId,
        TokenField::ConjugationForm,
        TokenField::ConjugationFormId,
        TokenField::SemanticFeatures,
        TokenField::IsAlternative,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TokenField::Surface => "surface",
            TokenField::Reading => "reading",
            TokenField::Lemma => "lemma",
            TokenField::Pos => "pos",
            TokenField::PosId => "pos_id",
            TokenField::PosSubcategory => "pos_subcategory",
            TokenField::PosSubcategoryId => "pos_subcategory_id",
            TokenField::ConjugationType => "conjugation_type",
            TokenField::ConjugationTypeId => "conjugation_type_id",
            TokenField::ConjugationForm => "conjugation_form",
            TokenField::ConjugationFormId => "conjugation_form_id",
            TokenField::SemanticFeatures => "semantic_feature_string",
            TokenField::IsAlternative => "is_alternative",
        }
    }
}

impl fmt::Display for TokenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = TokenField::ALL.iter().map(|f| f.name()).collect();
                format!("unknown token field '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}
