//! The public entry point: patterns in, automata and strings out.

use std::sync::Arc;

use log::debug;

use crate::bdd::Bdd;
use crate::chooser::RandomChooser;
use crate::class::ClassDecoder;
use crate::compile::Compiler;
use crate::error::{Result, RexError};
use crate::generate::{generate_members, Members};
use crate::options::{RegexOptions, RexSettings};
use crate::parse::parse;
use crate::product::mk_product;
use crate::sfa::Sfa;
use crate::unicode::{CategoryProvider, StdCategoryProvider};

/// One compiling and generating session.
///
/// The engine owns the BDD arena all of its automata refer to, so automata from one engine
/// must not be interpreted through another engine's [`Bdd`].
///
/// # Examples
///
/// ```
/// use rex_rs::engine::RexEngine;
/// use rex_rs::options::{RegexOptions, RexSettings};
///
/// let mut engine = RexEngine::new(RexSettings::default().with_seed(7));
/// let zips: Vec<String> = engine
///     .generate(r"^\d{5}$", RegexOptions::empty(), Some(3))
///     .unwrap()
///     .collect();
/// assert_eq!(zips.len(), 3);
/// assert!(zips.iter().all(|z| z.len() == 5));
/// ```
pub struct RexEngine {
    settings: RexSettings,
    bdd: Bdd,
    decoder: ClassDecoder,
    chooser: RandomChooser,
}

impl RexEngine {
    pub fn new(settings: RexSettings) -> Self {
        Self::with_provider(settings, Arc::new(StdCategoryProvider))
    }

    /// An engine reading Unicode categories from `provider`.
    pub fn with_provider(settings: RexSettings, provider: Arc<dyn CategoryProvider>) -> Self {
        let encoding = settings.encoding;
        Self {
            settings,
            bdd: Bdd::new(encoding.bit_width()),
            decoder: ClassDecoder::new(provider, encoding),
            chooser: RandomChooser::new(settings.seed),
        }
    }

    pub fn settings(&self) -> &RexSettings {
        &self.settings
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    /// Compile `pattern` into an automaton over this engine's arena.
    pub fn compile(&mut self, pattern: &str, options: RegexOptions) -> Result<Sfa> {
        debug!("compile(pattern = {:?}, options = {:?})", pattern, options);

        if pattern.trim().is_empty() {
            return Err(RexError::InvalidArgument("the pattern is blank".to_string()));
        }
        let node = parse(pattern, options.effective())?;
        Compiler::new(&self.bdd, &mut self.decoder).compile_root(&node)
    }

    /// Compile every pattern and intersect the results.
    pub fn compile_all(&mut self, patterns: &[&str], options: RegexOptions) -> Result<Sfa> {
        let Some((first, rest)) = patterns.split_first() else {
            return Err(RexError::InvalidArgument("no patterns given".to_string()));
        };

        let mut res = self.compile(first, options)?;
        for pattern in rest {
            let sfa = self.compile(pattern, options)?;
            let bdd = &self.bdd;
            res = mk_product(
                res,
                sfa,
                |a, b| bdd.apply_and(a, b),
                |a, b| bdd.apply_or(a, b),
                |f| !bdd.is_zero(f),
            );
        }
        Ok(res)
    }

    /// Distinct strings matching `pattern`: at most `count`, or as many as are pulled.
    pub fn generate(
        &mut self,
        pattern: &str,
        options: RegexOptions,
        count: Option<usize>,
    ) -> Result<Members<'_, RandomChooser>> {
        let sfa = self.compile(pattern, options)?;
        self.generate_from(sfa, count)
    }

    /// Distinct strings matching every one of `patterns`.
    pub fn generate_all(
        &mut self,
        patterns: &[&str],
        options: RegexOptions,
        count: Option<usize>,
    ) -> Result<Members<'_, RandomChooser>> {
        let sfa = self.compile_all(patterns, options)?;
        self.generate_from(sfa, count)
    }

    /// Distinct strings accepted by `sfa`, which must come from this engine.
    pub fn generate_from(&mut self, sfa: Sfa, count: Option<usize>) -> Result<Members<'_, RandomChooser>> {
        generate_members(sfa, &self.bdd, &mut self.chooser, count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use test_log::test;

    use super::*;
    use crate::types::CharEncoding;
    use crate::unicode::{CategoryTable, GeneralCategory};

    fn engine() -> RexEngine {
        RexEngine::new(RexSettings::default().with_seed(2024))
    }

    #[test]
    fn test_blank_pattern() {
        let mut engine = engine();
        for pattern in ["", "   ", "\t"] {
            assert!(matches!(
                engine.compile(pattern, RegexOptions::empty()),
                Err(RexError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_right_to_left_is_ignored() {
        let mut engine = engine();
        let plain = engine.compile("^a[bc]+$", RegexOptions::empty()).unwrap();
        let rtl = engine.compile("^a[bc]+$", RegexOptions::RIGHT_TO_LEFT).unwrap();
        assert_eq!(plain, rtl);
    }

    #[test]
    fn test_ignore_case_option() {
        let mut engine = engine();
        let sfa = engine.compile("^abc$", RegexOptions::IGNORE_CASE).unwrap();
        assert!(sfa.accepts(engine.bdd(), "AbC"));
    }

    #[test]
    fn test_generate_literal() {
        let mut engine = engine();
        let members: Vec<String> = engine.generate("^abc$", RegexOptions::empty(), None).unwrap().collect();
        assert_eq!(members, vec!["abc".to_string()]);
    }

    #[test]
    fn test_generate_nothing() {
        let mut engine = engine();
        assert!(matches!(
            engine.generate("^[^\\x00-\\x7F]$", RegexOptions::empty(), None),
            Err(RexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_compile_all() {
        let mut engine = engine();
        let sfa = engine.compile_all(&["^[a-f]+$", "^.{3}$"], RegexOptions::empty()).unwrap();
        assert!(sfa.accepts(engine.bdd(), "abc"));
        assert!(!sfa.accepts(engine.bdd(), "abcd"));
        assert!(!sfa.accepts(engine.bdd(), "xyz"));

        let members: Vec<String> = engine
            .generate_all(&["^[a-f]+$", "^.{3}$"], RegexOptions::empty(), Some(20))
            .unwrap()
            .collect();
        assert_eq!(members.len(), 20);
        assert!(members.iter().all(|s| s.len() == 3 && s.chars().all(|c| ('a'..='f').contains(&c))));

        assert!(matches!(
            engine.compile_all(&[], RegexOptions::empty()),
            Err(RexError::InvalidArgument(_))
        ));
    }

    struct DigitsOnly;

    impl CategoryProvider for DigitsOnly {
        fn table(&self, encoding: CharEncoding) -> Arc<CategoryTable> {
            let mut categories = BTreeMap::new();
            categories.insert(GeneralCategory::DecimalDigitNumber, vec![('7' as u32, '7' as u32)]);
            Arc::new(CategoryTable::new(encoding, categories, vec![], vec![]))
        }
    }

    #[test]
    fn test_injected_provider() {
        let mut engine = RexEngine::with_provider(RexSettings::default().with_seed(1), Arc::new(DigitsOnly));
        let members: Vec<String> = engine.generate("^\\d\\d$", RegexOptions::empty(), None).unwrap().collect();
        assert_eq!(members, vec!["77".to_string()]);
    }
}
