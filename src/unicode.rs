//! Unicode general categories per encoding.
//!
//! A [`CategoryTable`] maps every general category to the code units of one encoding that
//! belong to it, as sorted inclusive ranges. Tables are built once per encoding by scanning
//! all `2^bit_width` units and cached for the rest of the process.
//!
//! Tables store ranges rather than BDDs: BDD nodes belong to one [`Bdd`][crate::bdd::Bdd]
//! arena, while tables are shared by every engine in the process.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use log::debug;
use regex_syntax::hir::{Class, HirKind};
use regex_syntax::ParserBuilder;

use crate::types::CharEncoding;

/// The thirty Unicode general categories, in .NET `UnicodeCategory` order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum GeneralCategory {
    UppercaseLetter,
    LowercaseLetter,
    TitlecaseLetter,
    ModifierLetter,
    OtherLetter,
    NonSpacingMark,
    SpacingCombiningMark,
    EnclosingMark,
    DecimalDigitNumber,
    LetterNumber,
    OtherNumber,
    SpaceSeparator,
    LineSeparator,
    ParagraphSeparator,
    Control,
    Format,
    Surrogate,
    PrivateUse,
    ConnectorPunctuation,
    DashPunctuation,
    OpenPunctuation,
    ClosePunctuation,
    InitialQuotePunctuation,
    FinalQuotePunctuation,
    OtherPunctuation,
    MathSymbol,
    CurrencySymbol,
    ModifierSymbol,
    OtherSymbol,
    OtherNotAssigned,
}

use GeneralCategory::*;

/// Categories whose members count as word characters for `\w`.
pub const WORD_CATEGORIES: [GeneralCategory; 7] = [
    UppercaseLetter,
    LowercaseLetter,
    TitlecaseLetter,
    ModifierLetter,
    OtherLetter,
    DecimalDigitNumber,
    ConnectorPunctuation,
];

const GROUPS: [(&str, &str, &[GeneralCategory]); 8] = [
    (
        "L",
        "Letter",
        &[UppercaseLetter, LowercaseLetter, TitlecaseLetter, ModifierLetter, OtherLetter],
    ),
    ("LC", "Cased_Letter", &[UppercaseLetter, LowercaseLetter, TitlecaseLetter]),
    ("M", "Mark", &[NonSpacingMark, SpacingCombiningMark, EnclosingMark]),
    ("N", "Number", &[DecimalDigitNumber, LetterNumber, OtherNumber]),
    ("Z", "Separator", &[SpaceSeparator, LineSeparator, ParagraphSeparator]),
    ("C", "Other", &[Control, Format, Surrogate, PrivateUse, OtherNotAssigned]),
    (
        "P",
        "Punctuation",
        &[
            ConnectorPunctuation,
            DashPunctuation,
            OpenPunctuation,
            ClosePunctuation,
            InitialQuotePunctuation,
            FinalQuotePunctuation,
            OtherPunctuation,
        ],
    ),
    ("S", "Symbol", &[MathSymbol, CurrencySymbol, ModifierSymbol, OtherSymbol]),
];

impl GeneralCategory {
    pub const ALL: [GeneralCategory; 30] = [
        UppercaseLetter,
        LowercaseLetter,
        TitlecaseLetter,
        ModifierLetter,
        OtherLetter,
        NonSpacingMark,
        SpacingCombiningMark,
        EnclosingMark,
        DecimalDigitNumber,
        LetterNumber,
        OtherNumber,
        SpaceSeparator,
        LineSeparator,
        ParagraphSeparator,
        Control,
        Format,
        Surrogate,
        PrivateUse,
        ConnectorPunctuation,
        DashPunctuation,
        OpenPunctuation,
        ClosePunctuation,
        InitialQuotePunctuation,
        FinalQuotePunctuation,
        OtherPunctuation,
        MathSymbol,
        CurrencySymbol,
        ModifierSymbol,
        OtherSymbol,
        OtherNotAssigned,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Two-letter abbreviation, e.g. `Lu`.
    pub const fn abbreviation(self) -> &'static str {
        match self {
            UppercaseLetter => "Lu",
            LowercaseLetter => "Ll",
            TitlecaseLetter => "Lt",
            ModifierLetter => "Lm",
            OtherLetter => "Lo",
            NonSpacingMark => "Mn",
            SpacingCombiningMark => "Mc",
            EnclosingMark => "Me",
            DecimalDigitNumber => "Nd",
            LetterNumber => "Nl",
            OtherNumber => "No",
            SpaceSeparator => "Zs",
            LineSeparator => "Zl",
            ParagraphSeparator => "Zp",
            Control => "Cc",
            Format => "Cf",
            Surrogate => "Cs",
            PrivateUse => "Co",
            ConnectorPunctuation => "Pc",
            DashPunctuation => "Pd",
            OpenPunctuation => "Ps",
            ClosePunctuation => "Pe",
            InitialQuotePunctuation => "Pi",
            FinalQuotePunctuation => "Pf",
            OtherPunctuation => "Po",
            MathSymbol => "Sm",
            CurrencySymbol => "Sc",
            ModifierSymbol => "Sk",
            OtherSymbol => "So",
            OtherNotAssigned => "Cn",
        }
    }

    /// Unicode long name, e.g. `Uppercase_Letter`.
    pub const fn long_name(self) -> &'static str {
        match self {
            UppercaseLetter => "Uppercase_Letter",
            LowercaseLetter => "Lowercase_Letter",
            TitlecaseLetter => "Titlecase_Letter",
            ModifierLetter => "Modifier_Letter",
            OtherLetter => "Other_Letter",
            NonSpacingMark => "Nonspacing_Mark",
            SpacingCombiningMark => "Spacing_Mark",
            EnclosingMark => "Enclosing_Mark",
            DecimalDigitNumber => "Decimal_Number",
            LetterNumber => "Letter_Number",
            OtherNumber => "Other_Number",
            SpaceSeparator => "Space_Separator",
            LineSeparator => "Line_Separator",
            ParagraphSeparator => "Paragraph_Separator",
            Control => "Control",
            Format => "Format",
            Surrogate => "Surrogate",
            PrivateUse => "Private_Use",
            ConnectorPunctuation => "Connector_Punctuation",
            DashPunctuation => "Dash_Punctuation",
            OpenPunctuation => "Open_Punctuation",
            ClosePunctuation => "Close_Punctuation",
            InitialQuotePunctuation => "Initial_Punctuation",
            FinalQuotePunctuation => "Final_Punctuation",
            OtherPunctuation => "Other_Punctuation",
            MathSymbol => "Math_Symbol",
            CurrencySymbol => "Currency_Symbol",
            ModifierSymbol => "Modifier_Symbol",
            OtherSymbol => "Other_Symbol",
            OtherNotAssigned => "Unassigned",
        }
    }

    /// Look up a single category by abbreviation or long name.
    ///
    /// Matching ignores case, spaces and underscores.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = normalize(name);
        Self::ALL
            .into_iter()
            .find(|c| normalize(c.abbreviation()) == key || normalize(c.long_name()) == key)
    }

    /// Resolve a category or category-group name (`Lu`, `L`, `Letter`) to its members.
    pub fn resolve(name: &str) -> Option<Vec<Self>> {
        if let Some(category) = Self::from_name(name) {
            return Some(vec![category]);
        }
        let key = normalize(name);
        GROUPS
            .iter()
            .find(|(short, long, _)| normalize(short) == key || normalize(long) == key)
            .map(|(_, _, members)| members.to_vec())
    }
}

impl fmt::Display for GeneralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Code-unit ranges of every category for one encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    encoding: CharEncoding,
    categories: BTreeMap<GeneralCategory, Vec<(u32, u32)>>,
    whitespace: Vec<(u32, u32)>,
    word: Vec<(u32, u32)>,
}

impl CategoryTable {
    /// Assemble a table from precomputed ranges. Categories missing from `categories` are empty.
    pub fn new(
        encoding: CharEncoding,
        categories: BTreeMap<GeneralCategory, Vec<(u32, u32)>>,
        whitespace: Vec<(u32, u32)>,
        word: Vec<(u32, u32)>,
    ) -> Self {
        Self {
            encoding,
            categories,
            whitespace,
            word,
        }
    }

    /// Scan every code unit of `encoding` and classify it.
    pub fn compute(encoding: CharEncoding) -> Self {
        debug!("computing category table for {}", encoding);

        let lookup = CodePointCategories::load();
        let mut categories: BTreeMap<GeneralCategory, Vec<(u32, u32)>> = BTreeMap::new();
        let mut whitespace = Vec::new();
        let mut word = Vec::new();

        for unit in 0..=encoding.max_code() {
            let category = if encoding.round_trips(unit) {
                char::from_u32(unit)
                    .map(|c| lookup.category(c))
                    .unwrap_or(OtherNotAssigned)
            } else if (0xD800..=0xDFFF).contains(&unit) {
                Surrogate
            } else {
                OtherNotAssigned
            };

            push_unit(categories.entry(category).or_default(), unit);
            if WORD_CATEGORIES.contains(&category) {
                push_unit(&mut word, unit);
            }
            if encoding.decode_unit(unit).is_some_and(char::is_whitespace) {
                push_unit(&mut whitespace, unit);
            }
        }

        Self::new(encoding, categories, whitespace, word)
    }

    pub fn encoding(&self) -> CharEncoding {
        self.encoding
    }

    pub fn ranges(&self, category: GeneralCategory) -> &[(u32, u32)] {
        self.categories.get(&category).map_or(&[], Vec::as_slice)
    }

    pub fn whitespace(&self) -> &[(u32, u32)] {
        &self.whitespace
    }

    /// Units in any of [`WORD_CATEGORIES`].
    pub fn word(&self) -> &[(u32, u32)] {
        &self.word
    }
}

/// Extend the last range with `unit` or open a new one.
fn push_unit(ranges: &mut Vec<(u32, u32)>, unit: u32) {
    match ranges.last_mut() {
        Some((_, hi)) if *hi + 1 == unit => *hi = unit,
        _ => ranges.push((unit, unit)),
    }
}

/// Per-code-point categories, taken from the Unicode tables of `regex-syntax`.
struct CodePointCategories {
    /// Sorted, disjoint `(start, end, category)` triples. Gaps are unassigned.
    ranges: Vec<(u32, u32, GeneralCategory)>,
}

impl CodePointCategories {
    fn load() -> Self {
        let mut ranges = Vec::new();
        for category in GeneralCategory::ALL {
            // Surrogates are not scalar values and unassigned is whatever is left.
            if matches!(category, Surrogate | OtherNotAssigned) {
                continue;
            }
            for (lo, hi) in class_ranges(category) {
                ranges.push((lo, hi, category));
            }
        }
        ranges.sort_unstable_by_key(|&(lo, _, _)| lo);
        Self { ranges }
    }

    fn category(&self, c: char) -> GeneralCategory {
        let code = c as u32;
        let i = self.ranges.partition_point(|&(lo, _, _)| lo <= code);
        match i.checked_sub(1).map(|i| self.ranges[i]) {
            Some((_, hi, category)) if code <= hi => category,
            _ => OtherNotAssigned,
        }
    }
}

/// Ranges of `\p{gc=..}` as `regex-syntax` resolves it.
fn class_ranges(category: GeneralCategory) -> Vec<(u32, u32)> {
    let pattern = format!("\\p{{gc={}}}", category.abbreviation());
    let hir = match ParserBuilder::new().build().parse(&pattern) {
        Ok(hir) => hir,
        Err(err) => {
            debug!("no Unicode data for {}: {}", category, err);
            return Vec::new();
        }
    };
    match hir.kind() {
        HirKind::Class(Class::Unicode(class)) => class
            .ranges()
            .iter()
            .map(|r| (r.start() as u32, r.end() as u32))
            .collect(),
        // Single-member classes (Zl, Zp) come back as literals.
        HirKind::Literal(lit) => std::str::from_utf8(&lit.0)
            .map(|s| s.chars().map(|c| (c as u32, c as u32)).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Source of category tables, one per encoding.
pub trait CategoryProvider: Send + Sync {
    fn table(&self, encoding: CharEncoding) -> Arc<CategoryTable>;
}

/// Computes each table on first request and shares it for the rest of the process.
#[derive(Debug, Default, Copy, Clone)]
pub struct StdCategoryProvider;

static ASCII_TABLE: OnceLock<Arc<CategoryTable>> = OnceLock::new();
static LATIN1_TABLE: OnceLock<Arc<CategoryTable>> = OnceLock::new();
static UTF16_TABLE: OnceLock<Arc<CategoryTable>> = OnceLock::new();

impl CategoryProvider for StdCategoryProvider {
    fn table(&self, encoding: CharEncoding) -> Arc<CategoryTable> {
        let cell = match encoding {
            CharEncoding::Ascii => &ASCII_TABLE,
            CharEncoding::Latin1 => &LATIN1_TABLE,
            CharEncoding::Utf16 => &UTF16_TABLE,
        };
        cell.get_or_init(|| Arc::new(CategoryTable::compute(encoding)))
            .clone()
    }
}
