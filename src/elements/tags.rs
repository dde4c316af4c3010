use super::{Element, ElementKind};
use crate::geometry::{is_horizontal, is_vertical, px, unit_or, Vec3};
use crate::state::{Sample, State};
use std::collections::BTreeSet;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

pub const ENTRY_LINE: &str = "entry_line";
pub const EXIT_LINE: &str = "exit_line";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ElementTag {
    Line,
    Loop,
    Snap,
    Spin,
    StallTurn,
    Roll,
    EntryLine,
    ExitLine,
    PreStallTurn,
    PostStallTurn,
    PreSpin,
    PostSpin,
    Horizontal,
    HorizontalEntry,
    HorizontalExit,
    Vertical,
    VerticalEntry,
    VerticalExit,
}

impl From<ElementKind> for ElementTag {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Line => ElementTag::Line,
            ElementKind::Loop => ElementTag::Loop,
            ElementKind::Snap => ElementTag::Snap,
            ElementKind::Spin => ElementTag::Spin,
            ElementKind::StallTurn => ElementTag::StallTurn,
        }
    }
}

fn direction(s: &Sample) -> Vec3 {
    // a pivoting aircraft has no velocity, use its heading
    unit_or(&s.world_vel(), s.att * px())
}

fn tag_element(
    el: &Element,
    prev: Option<&Element>,
    next: Option<&Element>,
    template: &State,
) -> BTreeSet<ElementTag> {
    let mut tags = BTreeSet::new();
    tags.insert(ElementTag::from(el.kind()));
    if el.roll().abs() > 1e-6 && !matches!(el, Element::Spin(_)) {
        tags.insert(ElementTag::Roll);
    }
    match el.uid() {
        ENTRY_LINE => {
            tags.insert(ElementTag::EntryLine);
        }
        EXIT_LINE => {
            tags.insert(ElementTag::ExitLine);
        }
        _ => {}
    }
    let neighbour = |e: Option<&Element>, kind: ElementKind| e.map(|e| e.kind()) == Some(kind);
    if neighbour(next, ElementKind::StallTurn) {
        tags.insert(ElementTag::PreStallTurn);
    }
    if neighbour(prev, ElementKind::StallTurn) {
        tags.insert(ElementTag::PostStallTurn);
    }
    if neighbour(next, ElementKind::Spin) {
        tags.insert(ElementTag::PreSpin);
    }
    if neighbour(prev, ElementKind::Spin) {
        tags.insert(ElementTag::PostSpin);
    }

    if let (Some(first), Some(last)) = (template.first(), template.last()) {
        let (din, dout) = (direction(first), direction(last));
        if is_horizontal(&din, 0.05) {
            tags.insert(ElementTag::HorizontalEntry);
        }
        if is_horizontal(&dout, 0.05) {
            tags.insert(ElementTag::HorizontalExit);
        }
        if is_vertical(&din, 0.05) {
            tags.insert(ElementTag::VerticalEntry);
        }
        if is_vertical(&dout, 0.05) {
            tags.insert(ElementTag::VerticalExit);
        }
        if tags.contains(&ElementTag::HorizontalEntry) && tags.contains(&ElementTag::HorizontalExit) {
            tags.insert(ElementTag::Horizontal);
        }
        if tags.contains(&ElementTag::VerticalEntry) && tags.contains(&ElementTag::VerticalExit) {
            tags.insert(ElementTag::Vertical);
        }
    }
    tags
}

/// Tags every element from its kind, its neighbours and its template.
pub fn tag_elements(elements: &[Element], templates: &[State]) -> Vec<BTreeSet<ElementTag>> {
    elements
        .iter()
        .zip(templates.iter())
        .enumerate()
        .map(|(i, (el, tp))| {
            let prev = i.checked_sub(1).and_then(|j| elements.get(j));
            tag_element(el, prev, elements.get(i + 1), tp)
        })
        .collect()
}

/// Evaluates a check string such as `line,!roll`: every comma separated
/// term must hold, `!` negates a term. Unknown tags never match.
pub fn check_tags(tags: &BTreeSet<ElementTag>, check: &str) -> bool {
    check.split(',').all(|term| {
        let term = term.trim();
        let (negate, name) = match term.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, term),
        };
        if name.is_empty() {
            return true;
        }
        match ElementTag::from_str(name) {
            Ok(tag) => tags.contains(&tag) != negate,
            Err(_) => negate,
        }
    })
}
