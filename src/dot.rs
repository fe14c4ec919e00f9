//! SFA to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **States** are circles labeled with their id; final states are double circles
//! - **The initial state** is pointed at by an arrow from an invisible node
//! - **Guarded moves** are solid edges labeled with their condition, rendered by [`Bdd::pretty`]
//! - **Epsilon moves** are dashed edges labeled `ε`
//!
//! # Examples
//!
//! ```
//! use rex_rs::bdd::Bdd;
//! use rex_rs::sfa::{Move, Sfa};
//!
//! let bdd = Bdd::new(7);
//! let a = bdd.char_constraint(false, 'a');
//! let sfa = Sfa::new(0, [1], vec![Move::guarded(0, 1, a)]).unwrap();
//!
//! let dot = sfa.to_dot(&bdd).unwrap();
//! assert!(dot.contains("0 -> 1"));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::fmt::Write as _;

use crate::bdd::Bdd;
use crate::sfa::Sfa;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for ordinary states (default: "circle")
    pub state_shape: &'static str,
    /// Shape for final states (default: "doublecircle")
    pub final_shape: &'static str,
    /// Style for guarded moves (default: "solid")
    pub move_style: &'static str,
    /// Style for epsilon moves (default: "dashed")
    pub epsilon_style: &'static str,
    /// Graph direction (default: "LR")
    pub rankdir: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "circle",
            final_shape: "doublecircle",
            move_style: "solid",
            epsilon_style: "dashed",
            rankdir: "LR",
        }
    }
}

impl Sfa {
    /// Converts the automaton to DOT format, labeling moves through `bdd`.
    pub fn to_dot(&self, bdd: &Bdd) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(bdd, &DotConfig::default())
    }

    /// Converts the automaton to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, bdd: &Bdd, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "rankdir={};", config.rankdir)?;
        writeln!(dot, "node [shape={}];", config.state_shape)?;

        writeln!(dot, "init [shape=point, style=invis];")?;
        for s in self.states() {
            if self.is_final(s) {
                writeln!(dot, "{} [shape={}];", s, config.final_shape)?;
            } else {
                writeln!(dot, "{};", s)?;
            }
        }
        writeln!(dot, "init -> {};", self.initial_state())?;

        for m in self.moves() {
            match m.condition {
                Some(cond) => writeln!(
                    dot,
                    "{} -> {} [style={}, label=\"{}\"];",
                    m.source,
                    m.target,
                    config.move_style,
                    escape_label(&bdd.pretty(cond))
                )?,
                None => writeln!(
                    dot,
                    "{} -> {} [style={}, label=\"ε\"];",
                    m.source, m.target, config.epsilon_style
                )?,
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
