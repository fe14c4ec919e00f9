//! # rex-rs: random strings from regular expressions
//!
//! **`rex-rs`** compiles a regular expression into a *symbolic finite automaton* (SFA) whose
//! moves are labeled with Binary Decision Diagrams over the bits of a character code, and
//! walks that automaton at random to produce strings matching the expression.
//! It is a test-data generator, not a matcher.
//!
//! ## How it works
//!
//! - A [`Bdd`][crate::bdd::Bdd] manager owns a hash-consed arena of decision nodes over
//!   7, 8 or 16 bits, depending on the [`CharEncoding`][crate::types::CharEncoding].
//!   Each node set is a canonical set of character codes.
//! - The pattern is parsed by `regex-syntax` and lowered into a [`RegexNode`][crate::ast::RegexNode] tree.
//! - The [`Compiler`][crate::compile::Compiler] turns the tree into an [`Sfa`][crate::sfa::Sfa]
//!   with concatenation, alternation, Kleene closure and bounded repetition.
//! - Generation walks the automaton, flipping a coin at final states and sampling one
//!   character from each condition it crosses.
//!
//! ## Basic Usage
//!
//! ```rust
//! use rex_rs::engine::RexEngine;
//! use rex_rs::options::{RegexOptions, RexSettings};
//!
//! // 1. A seeded engine reproduces the same strings on every run.
//! let mut engine = RexEngine::new(RexSettings::default().with_seed(42));
//!
//! // 2. Ask for up to five distinct strings.
//! let strings: Vec<String> = engine
//!     .generate(r"^[0-9]{3}-[a-z]{2}$", RegexOptions::empty(), Some(5))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(strings.len(), 5);
//! for s in &strings {
//!     assert_eq!(s.len(), 6);
//!     assert_eq!(&s[3..4], "-");
//! }
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the BDD manager and constraint builders; [`sample`] draws members.
//! - **[`sfa`]**, **[`epsilon`]**, **[`product`]**: automata and their algebra.
//! - **[`compile`]**: regex trees to automata.
//! - **[`generate`]**: random walks and the deduplicated stream of members.
//! - **[`engine`]**: the [`RexEngine`][crate::engine::RexEngine] facade tying it all together.

pub mod ast;
pub mod bdd;
pub mod cache;
pub mod chooser;
pub mod class;
pub mod compile;
pub mod dot;
pub mod engine;
pub mod epsilon;
pub mod error;
pub mod generate;
pub mod node;
pub mod options;
pub mod parse;
pub mod product;
pub mod reference;
pub mod sample;
pub mod sfa;
pub mod table;
pub mod types;
pub mod unicode;
pub mod utils;
