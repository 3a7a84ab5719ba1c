use crate::document::{Document, NodeId};
use crate::element::Element;
use graft_core::{GraftError, GraftResult};
use std::fmt;
use std::str::FromStr;

/// The slice of CSS the host page layouts actually need: tag, class and id
/// simple selectors, compounds, and descendant / child combinators.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
struct Part {
    combinator: Combinator,
    compound: Compound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    pub fn parse(input: &str) -> GraftResult<Self> {
        let spaced = input.replace('>', " > ");
        let mut parts = Vec::new();
        let mut pending_child = false;
        for token in spaced.split_whitespace() {
            if token == ">" {
                if parts.is_empty() || pending_child {
                    return Err(GraftError::Selector(format!(
                        "misplaced combinator in {input:?}"
                    )));
                }
                pending_child = true;
                continue;
            }
            let combinator = if pending_child {
                Combinator::Child
            } else {
                Combinator::Descendant
            };
            parts.push(Part {
                combinator,
                compound: parse_compound(token, input)?,
            });
            pending_child = false;
        }
        if pending_child {
            return Err(GraftError::Selector(format!(
                "dangling combinator in {input:?}"
            )));
        }
        if parts.is_empty() {
            return Err(GraftError::Selector("empty selector".to_string()));
        }
        Ok(Self { parts })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, self.parts.len() - 1, node)
    }

    fn matches_at(&self, doc: &Document, index: usize, node: NodeId) -> bool {
        let part = &self.parts[index];
        if !part.compound.matches(doc.element(node)) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match part.combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.matches_at(doc, index - 1, p)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, index - 1, ancestor) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

impl FromStr for Selector {
    type Err = GraftError;

    fn from_str(s: &str) -> GraftResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(match part.combinator {
                    Combinator::Child => " > ",
                    Combinator::Descendant => " ",
                })?;
            }
            if let Some(tag) = &part.compound.tag {
                f.write_str(tag)?;
            }
            if let Some(id) = &part.compound.id {
                write!(f, "#{id}")?;
            }
            for class in &part.compound.classes {
                write!(f, ".{class}")?;
            }
        }
        Ok(())
    }
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| element.has_class(c))
    }
}

fn parse_compound(token: &str, input: &str) -> GraftResult<Compound> {
    enum Mode {
        Tag,
        Class,
        Id,
    }
    let mut compound = Compound::default();
    let mut mode = Mode::Tag;
    let mut current = String::new();
    let flush = |compound: &mut Compound, mode: &Mode, current: &mut String| -> GraftResult<()> {
        match mode {
            Mode::Tag => {
                if !current.is_empty() {
                    compound.tag = Some(std::mem::take(current));
                }
            }
            Mode::Class => {
                if current.is_empty() {
                    return Err(GraftError::Selector(format!("empty class in {input:?}")));
                }
                compound.classes.push(std::mem::take(current));
            }
            Mode::Id => {
                if current.is_empty() {
                    return Err(GraftError::Selector(format!("empty id in {input:?}")));
                }
                compound.id = Some(std::mem::take(current));
            }
        }
        Ok(())
    };
    for ch in token.chars() {
        match ch {
            '.' => {
                flush(&mut compound, &mode, &mut current)?;
                mode = Mode::Class;
            }
            '#' => {
                flush(&mut compound, &mode, &mut current)?;
                mode = Mode::Id;
            }
            _ => current.push(ch),
        }
    }
    flush(&mut compound, &mode, &mut current)?;
    if compound.tag.is_none() && compound.id.is_none() && compound.classes.is_empty() {
        return Err(GraftError::Selector(format!(
            "empty compound in {input:?}"
        )));
    }
    Ok(compound)
}
