// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The compact case-list encoding understood by the dEQP executor.
//!
//! A set of dotted case paths is encoded as a prefix tree over their segments. A leaf is written
//! as its segment, and a node with children as `segment{child,child,...}`. Top-level nodes are
//! joined with `,`, without surrounding braces:
//!
//! ```text
//! dEQP-GLES3.info.vendor     ─┐
//! dEQP-GLES3.info.renderer    ├─>  dEQP-GLES3{info{vendor,renderer},state{enable}}
//! dEQP-GLES3.state.enable    ─┘
//! ```
//!
//! Siblings are written in the order they were first seen, so encoding is deterministic.
//!
//! A path that is a strict prefix of another path (`a.b` alongside `a.b.c`) cannot be
//! represented: it becomes an interior node, and only the longer path survives decoding.

use crate::errors::TrieParseError;
use indexmap::IndexMap;

#[derive(Debug, Default)]
struct TrieNode<'a> {
    children: IndexMap<&'a str, TrieNode<'a>>,
}

impl<'a> TrieNode<'a> {
    fn insert(&mut self, segments: impl Iterator<Item = &'a str>) {
        let mut node = self;
        for segment in segments {
            node = node.children.entry(segment).or_default();
        }
    }

    fn write_children(&self, out: &mut String) {
        for (i, (segment, child)) in self.children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(segment);
            if !child.children.is_empty() {
                out.push('{');
                child.write_children(out);
                out.push('}');
            }
        }
    }
}

/// Encodes a list of dotted case paths.
///
/// Duplicate paths are encoded once. An empty list encodes to the empty string.
pub fn encode_case_trie<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut root = TrieNode::default();
    for path in paths {
        root.insert(path.split('.'));
    }
    let mut out = String::new();
    root.write_children(&mut out);
    out
}

/// Decodes an encoded case list back into dotted case paths, in trie order.
///
/// The input must not be wrapped in the outer brace pair used for the case-list file.
pub fn decode_case_trie(trie: &str) -> Result<Vec<String>, TrieParseError> {
    let mut parser = TrieParser {
        input: trie.as_bytes(),
        position: 0,
        prefix: Vec::new(),
        paths: Vec::new(),
    };
    if trie.is_empty() {
        return Ok(parser.paths);
    }
    parser.parse_list(trie)?;
    if parser.position != parser.input.len() {
        return Err(TrieParseError::new(parser.position, "unmatched `}`"));
    }
    Ok(parser.paths)
}

struct TrieParser<'a> {
    input: &'a [u8],
    position: usize,
    prefix: Vec<&'a str>,
    paths: Vec<String>,
}

impl<'a> TrieParser<'a> {
    // list := item (',' item)*
    fn parse_list(&mut self, trie: &'a str) -> Result<(), TrieParseError> {
        loop {
            self.parse_item(trie)?;
            match self.input.get(self.position) {
                Some(b',') => self.position += 1,
                _ => return Ok(()),
            }
        }
    }

    // item := segment ('{' list '}')?
    fn parse_item(&mut self, trie: &'a str) -> Result<(), TrieParseError> {
        let start = self.position;
        while let Some(&b) = self.input.get(self.position) {
            if matches!(b, b'{' | b'}' | b',') {
                break;
            }
            self.position += 1;
        }
        if start == self.position {
            return Err(TrieParseError::new(start, "expected a segment"));
        }
        // Delimiters are ASCII, so these are always char boundaries.
        let segment = &trie[start..self.position];

        if self.input.get(self.position) == Some(&b'{') {
            self.position += 1;
            self.prefix.push(segment);
            self.parse_list(trie)?;
            self.prefix.pop();
            if self.input.get(self.position) != Some(&b'}') {
                return Err(TrieParseError::new(self.position, "expected `}`"));
            }
            self.position += 1;
        } else {
            let mut path = self.prefix.join(".");
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);
            self.paths.push(path);
        }
        Ok(())
    }
}
