//! Human-readable structural dump of a forest.
//!
//! The output is tab-indented JSON: an object keyed by label whose values are
//! nested split objects. Internal nodes print as
//! `{"var":d,"bound":b, "low": …, "high": …}` and leaves print their mean, or
//! `"inf"` when the mean is not finite.

use std::fmt::{self, Display, Write};

use super::arena::NodeArena;
use super::forest::RefinementForest;
use super::node::Node;
use super::{Label, NodeId};

fn indent<W: Write>(out: &mut W, tabs: usize) -> fmt::Result {
    for _ in 0..tabs {
        out.write_char('\t')?;
    }
    Ok(())
}

fn write_node<W: Write>(out: &mut W, arena: &NodeArena, id: NodeId, tabs: usize) -> fmt::Result {
    indent(out, tabs)?;
    match arena.get(id) {
        Node::Internal { split, .. } => {
            writeln!(out, "{{\"var\":{},\"bound\":{},", split.dimension, split.boundary)?;
            indent(out, tabs + 1)?;
            out.write_str("\"low\":\n")?;
            write_node(out, arena, split.low, tabs + 2)?;
            out.write_str(",\n")?;
            indent(out, tabs + 1)?;
            out.write_str("\"high\":\n")?;
            write_node(out, arena, split.high, tabs + 2)?;
            out.write_char('\n')?;
            indent(out, tabs)?;
            out.write_char('}')
        }
        Node::Leaf(predictor) => {
            let mean = predictor.value().mean();
            if mean.is_finite() && !predictor.value().is_empty() {
                write!(out, "{mean}")
            } else {
                out.write_str("\"inf\"")
            }
        }
    }
}

impl<R, S> RefinementForest<R, S> {
    /// Write the structure of every tree, indented by `tabs`, naming each
    /// label through `name_of`.
    pub fn write_structure<W, F, N>(&self, out: &mut W, tabs: usize, name_of: F) -> fmt::Result
    where
        W: Write,
        F: Fn(Label) -> N,
        N: Display,
    {
        indent(out, tabs)?;
        out.write_char('{')?;
        for (i, (label, root)) in self.index().iter().enumerate() {
            if i > 0 {
                out.write_char(',')?;
            }
            out.write_char('\n')?;
            indent(out, tabs + 1)?;
            writeln!(out, "\"{}\":", name_of(label))?;
            write_node(out, self.arena(), root, tabs + 2)?;
        }
        out.write_char('\n')?;
        indent(out, tabs)?;
        out.write_char('}')
    }

    /// Structure of every tree, keyed by label.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl<R, S> Display for RefinementForest<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_structure(f, 0, |label| label)
    }
}
