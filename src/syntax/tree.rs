//! Tree Builder: parses the parser oracle's tree string.
//!
//! The oracle prints a dfn as a single-line prefix tree such as
//! `Assign(f,Lam(App2(Times[2],2,Omega)))`. Before descending, two textual
//! rewrites are applied:
//!
//! - `Vec[…]` vector-literal markers become `Inline(…)`, so literal vectors
//!   survive as opaque leaves.
//! - Bracketed numeric annotations (`[2]`, `[1,3]`) are stripped. Valence is
//!   re-derived from the tree's structure during lowering.

use std::fmt;

use crate::error::{Error, Result};

/// A node of the oracle's tree: a name and its ordered children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    #[cfg(test)]
    pub(crate) fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Build a tree from the oracle's output.
pub fn build(tree_str: &str) -> Result<TreeNode> {
    let text = strip_annotations(&inline_vectors(tree_str));
    let mut reader = Reader {
        text: &text,
        pos: 0,
    };
    let node = reader.node()?;
    if reader.pos < text.len() {
        return Err(Error::malformed(
            format!("unexpected `{}` after the tree", &text[reader.pos..]),
            reader.pos,
        ));
    }
    Ok(node)
}

/// Rewrite `Vec[…]` into `Inline(…)`.
fn inline_vectors(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("Vec[") {
        let body = &rest[start + 4..];
        match body.find(']') {
            Some(end) => {
                out.push_str(&rest[..start]);
                out.push_str("Inline(");
                out.push_str(&body[..end]);
                out.push(')');
                rest = &body[end + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Remove `[n]` / `[n,m,…]` annotations, collapse whitespace, and drop any
/// brackets left over.
fn strip_annotations(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '[' {
            if let Some(len) = annotation_len(&chars[i..]) {
                i += len;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['[', ']'], "")
}

/// Length of a numeric annotation starting at `chars[0] == '['`.
fn annotation_len(chars: &[char]) -> Option<usize> {
    let mut i = 1;
    loop {
        let digits = chars[i..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        i += digits;
        match chars.get(i) {
            Some(']') => return Some(i + 1),
            Some(',') => i += 1,
            _ => return None,
        }
    }
}

struct Reader<'a> {
    text: &'a str,
    pos: usize,
}

impl Reader<'_> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn node(&mut self) -> Result<TreeNode> {
        let start = self.pos;
        let len = self.text[start..]
            .find(['(', ',', ')'])
            .unwrap_or(self.text.len() - start);
        self.pos += len;
        let name = self.text[start..self.pos].trim();
        if name.is_empty() {
            return Err(Error::malformed("expected a node name", start));
        }

        let mut children = Vec::new();
        if self.peek() == Some('(') {
            let open = self.pos;
            self.pos += 1;
            loop {
                if self.pos >= self.text.len() {
                    return Err(Error::malformed("unclosed `(`", open));
                }
                children.push(self.node()?);
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some(')') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(Error::malformed("unclosed `(`", open)),
                }
            }
        }
        Ok(TreeNode {
            name: name.to_string(),
            children,
        })
    }
}
