//! Heading outline built from a page's heading sequence.
//!
//! H2s nest under the latest H1, H3s and H4s under the latest H2. A heading
//! with no eligible parent attaches to the nearest open ancestor, or becomes
//! a root, so nothing is dropped and a pre-order walk reproduces document
//! order.

use crate::results::Heading;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    pub heading: Heading,
    pub children: Vec<OutlineNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub roots: Vec<OutlineNode>,
}

/// Where the latest H2 lives
#[derive(Clone, Copy)]
enum H2Slot {
    Root(usize),
    UnderH1(usize, usize),
}

impl Outline {
    pub fn from_headings(headings: &[Heading]) -> Self {
        let mut roots: Vec<OutlineNode> = Vec::new();
        let mut last_h1: Option<usize> = None;
        let mut last_h2: Option<H2Slot> = None;

        for heading in headings {
            let node = OutlineNode {
                heading: heading.clone(),
                children: Vec::new(),
            };

            match heading.level {
                1 => {
                    roots.push(node);
                    last_h1 = Some(roots.len() - 1);
                    last_h2 = None;
                }
                2 => match last_h1 {
                    Some(h1) => {
                        let siblings = &mut roots[h1].children;
                        siblings.push(node);
                        last_h2 = Some(H2Slot::UnderH1(h1, siblings.len() - 1));
                    }
                    None => {
                        roots.push(node);
                        last_h2 = Some(H2Slot::Root(roots.len() - 1));
                    }
                },
                _ => match (last_h2, last_h1) {
                    (Some(H2Slot::Root(i)), _) => roots[i].children.push(node),
                    (Some(H2Slot::UnderH1(i, j)), _) => roots[i].children[j].children.push(node),
                    (None, Some(h1)) => roots[h1].children.push(node),
                    (None, None) => roots.push(node),
                },
            }
        }

        Self { roots }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Headings in pre-order
    pub fn flatten(&self) -> Vec<&Heading> {
        fn walk<'a>(node: &'a OutlineNode, out: &mut Vec<&'a Heading>) {
            out.push(&node.heading);
            for child in &node.children {
                walk(child, out);
            }
        }

        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }

    /// Indented `H2: text` lines, two spaces per nesting level
    pub fn render(&self) -> String {
        fn walk(node: &OutlineNode, depth: usize, out: &mut Vec<String>) {
            out.push(format!(
                "{}H{}: {}",
                "  ".repeat(depth),
                node.heading.level,
                node.heading.text
            ));
            for child in &node.children {
                walk(child, depth + 1, out);
            }
        }

        let mut lines = Vec::new();
        for root in &self.roots {
            walk(root, 0, &mut lines);
        }
        lines.join("\n")
    }
}
