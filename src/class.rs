//! Character classes and their translation into BDD conditions.
//!
//! A [`CharClass`] is the parser-independent description of a bracket class: ranges and
//! Unicode categories, optionally negated, optionally minus another class. The
//! [`ClassDecoder`] turns it into a single [`Ref`] over the code units of one encoding.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::debug;

use crate::bdd::Bdd;
use crate::error::{Result, RexError};
use crate::reference::Ref;
use crate::types::CharEncoding;
use crate::unicode::{CategoryProvider, CategoryTable, GeneralCategory, WORD_CATEGORIES};

/// A category reference inside a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassCategory {
    /// The `\s` alias.
    Whitespace,
    /// A general category or category group by name, resolved when decoding.
    Named(String),
    /// Several categories taken together, as `\w` is.
    Union(Vec<ClassCategory>),
}

impl ClassCategory {
    pub fn named(name: impl Into<String>) -> Self {
        ClassCategory::Named(name.into())
    }

    /// The word-letter categories.
    pub fn word() -> Self {
        ClassCategory::Union(
            WORD_CATEGORIES
                .iter()
                .map(|c| ClassCategory::named(c.abbreviation()))
                .collect(),
        )
    }
}

/// A category, or its complement when `include` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntry {
    pub category: ClassCategory,
    pub include: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharClass {
    pub negated: bool,
    /// Inclusive code-point ranges.
    pub ranges: Vec<(u32, u32)>,
    pub categories: Vec<CategoryEntry>,
    /// Removed from the class after everything else applies.
    pub subtraction: Option<Box<CharClass>>,
}

impl CharClass {
    pub fn from_ranges(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn from_category(category: ClassCategory, include: bool) -> Self {
        Self {
            categories: vec![CategoryEntry { category, include }],
            ..Default::default()
        }
    }

    /// The class of every code point.
    pub fn any() -> Self {
        Self::from_ranges([(0, char::MAX as u32)])
    }

    /// Everything except the members of `class`.
    pub fn complement_of(class: CharClass) -> Self {
        Self {
            subtraction: Some(Box::new(class)),
            ..Self::any()
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Plain classes have no negation and no subtraction, so they merge by concatenation.
    pub fn is_plain(&self) -> bool {
        !self.negated && self.subtraction.is_none()
    }

    /// Add the members of a plain class to this one.
    pub fn extend(&mut self, other: CharClass) {
        debug_assert!(other.is_plain());
        self.ranges.extend(other.ranges);
        self.categories.extend(other.categories);
    }
}

/// Turns [`CharClass`]es into conditions, memoizing category conditions per arena.
pub struct ClassDecoder {
    provider: Arc<dyn CategoryProvider>,
    encoding: CharEncoding,
    table: Option<Arc<CategoryTable>>,
    categories: HashMap<GeneralCategory, Ref>,
    whitespace: Option<Ref>,
    word: Option<Ref>,
}

impl ClassDecoder {
    pub fn new(provider: Arc<dyn CategoryProvider>, encoding: CharEncoding) -> Self {
        Self {
            provider,
            encoding,
            table: None,
            categories: HashMap::new(),
            whitespace: None,
            word: None,
        }
    }

    pub fn encoding(&self) -> CharEncoding {
        self.encoding
    }

    fn table(&mut self) -> Arc<CategoryTable> {
        let (provider, encoding) = (&self.provider, self.encoding);
        self.table
            .get_or_insert_with(|| provider.table(encoding))
            .clone()
    }

    /// Condition matching exactly the members of `class`.
    pub fn decode(&mut self, bdd: &Bdd, class: &CharClass, ignore_case: bool) -> Result<Ref> {
        debug!(
            "decode(negated = {}, ranges = {}, categories = {}, subtraction = {})",
            class.negated,
            class.ranges.len(),
            class.categories.len(),
            class.subtraction.is_some()
        );

        let mut parts = Vec::with_capacity(class.ranges.len() + class.categories.len());
        for &(lo, hi) in &class.ranges {
            parts.push(bdd.range_constraint(ignore_case, lo, hi));
        }
        for entry in &class.categories {
            let set = self.category(bdd, &entry.category)?;
            parts.push(if entry.include { set } else { bdd.apply_not(set) });
        }

        let mut res = if class.negated {
            bdd.apply_and_many(parts.into_iter().map(|p| bdd.apply_not(p)))
        } else {
            bdd.apply_or_many(parts)
        };

        if let Some(subtraction) = &class.subtraction {
            let sub = self.decode(bdd, subtraction, ignore_case)?;
            res = bdd.apply_and(res, bdd.apply_not(sub));
        }
        Ok(res)
    }

    fn category(&mut self, bdd: &Bdd, category: &ClassCategory) -> Result<Ref> {
        let mut general = BTreeSet::new();
        let mut whitespace = false;
        collect_categories(category, &mut general, &mut whitespace)?;

        let mut res = if whitespace {
            self.whitespace_condition(bdd)
        } else {
            Ref::FALSE
        };
        if WORD_CATEGORIES.iter().all(|c| general.contains(c)) {
            res = bdd.apply_or(res, self.word_condition(bdd));
            for c in WORD_CATEGORIES {
                general.remove(&c);
            }
        }
        for c in general {
            res = bdd.apply_or(res, self.general_condition(bdd, c));
        }
        Ok(res)
    }

    fn general_condition(&mut self, bdd: &Bdd, category: GeneralCategory) -> Ref {
        if let Some(&res) = self.categories.get(&category) {
            return res;
        }
        let res = bdd.from_int_ranges(self.table().ranges(category));
        self.categories.insert(category, res);
        res
    }

    fn whitespace_condition(&mut self, bdd: &Bdd) -> Ref {
        if let Some(res) = self.whitespace {
            return res;
        }
        let res = bdd.from_int_ranges(self.table().whitespace());
        self.whitespace = Some(res);
        res
    }

    fn word_condition(&mut self, bdd: &Bdd) -> Ref {
        if let Some(res) = self.word {
            return res;
        }
        let res = bdd.from_int_ranges(self.table().word());
        self.word = Some(res);
        res
    }
}

fn collect_categories(
    category: &ClassCategory,
    general: &mut BTreeSet<GeneralCategory>,
    whitespace: &mut bool,
) -> Result<()> {
    match category {
        ClassCategory::Whitespace => *whitespace = true,
        ClassCategory::Named(name) => {
            let members = GeneralCategory::resolve(name).ok_or_else(|| {
                RexError::InvalidArgument(format!("unrecognized Unicode category '{}'", name))
            })?;
            general.extend(members);
        }
        ClassCategory::Union(items) => {
            for item in items {
                collect_categories(item, general, whitespace)?;
            }
        }
    }
    Ok(())
}
