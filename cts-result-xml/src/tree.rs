// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconstructs the package hierarchy implied by dotted class names.
//!
//! Results are recorded flat, keyed by [`TestIdentifier`]. For serialization they are regrouped:
//! every class name segment but the last becomes a nested suite, the last segment becomes a case,
//! and the method name becomes a test under that case.
//!
//! For example, `android.app.cts.ActivityTest#testLaunch` produces:
//!
//! ```text
//! android (suite)
//! └── app (suite)
//!     └── cts (suite)
//!         └── ActivityTest (case)
//!             └── testLaunch (test)
//! ```
//!
//! Suites and cases live in separate namespaces, so a suite and a case with the same name can be
//! siblings.

use crate::{DuplicateTestError, ExecutionOutcome};
use cts_metadata::TestIdentifier;
use indexmap::{IndexMap, map::Entry};

/// The hierarchical view of one package's results.
///
/// The tree borrows from the flat result mapping and only lives as long as serialization does.
#[derive(Clone, Debug, Default)]
pub struct ResultTree<'a> {
    root: SuiteNode<'a>,
    test_count: usize,
}

impl<'a> ResultTree<'a> {
    /// Creates a new, empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree out of a flat set of results.
    pub fn build(
        results: impl IntoIterator<Item = (&'a TestIdentifier, &'a ExecutionOutcome)>,
    ) -> Result<Self, DuplicateTestError> {
        let mut tree = Self::new();
        for (id, outcome) in results {
            tree.insert(id, outcome)?;
        }
        Ok(tree)
    }

    /// Inserts a single result, creating intermediate suites and the case as required.
    ///
    /// Returns an error if a test with the same identifier has already been inserted.
    pub fn insert(
        &mut self,
        id: &'a TestIdentifier,
        outcome: &'a ExecutionOutcome,
    ) -> Result<(), DuplicateTestError> {
        let mut segments: Vec<&'a str> = id.class_segments().collect();
        // split() always produces at least one segment.
        let case_name = segments.pop().unwrap_or_default();

        let mut suite = &mut self.root;
        for segment in segments {
            suite = suite.suites.entry(segment).or_default();
        }
        let case = suite
            .cases
            .entry(case_name)
            .or_insert_with(|| CaseNode::new(case_name));

        match case.tests.entry(id.method_name()) {
            Entry::Occupied(_) => return Err(DuplicateTestError::new(id.clone())),
            Entry::Vacant(entry) => {
                entry.insert(outcome);
            }
        }
        self.test_count += 1;
        Ok(())
    }

    /// Returns the number of tests in this tree.
    pub fn test_count(&self) -> usize {
        self.test_count
    }

    /// Returns the top level of the tree.
    pub fn root(&self) -> &SuiteNode<'a> {
        &self.root
    }

    /// Returns every test in the tree along with the names of its ancestors, in tree order.
    pub fn leaves(&self) -> Vec<TreeLeaf<'a>> {
        let mut leaves = Vec::with_capacity(self.test_count);
        let mut path = Vec::new();
        self.root.collect_leaves(&mut path, &mut leaves);
        leaves
    }
}

/// A grouping level of the tree: one segment of a class name.
#[derive(Clone, Debug, Default)]
pub struct SuiteNode<'a> {
    suites: IndexMap<&'a str, SuiteNode<'a>>,
    cases: IndexMap<&'a str, CaseNode<'a>>,
}

impl<'a> SuiteNode<'a> {
    /// Returns the nested suites, keyed by segment name.
    pub fn suites(&self) -> impl Iterator<Item = (&'a str, &SuiteNode<'a>)> + '_ {
        self.suites.iter().map(|(name, suite)| (*name, suite))
    }

    /// Returns the cases at this level.
    pub fn cases(&self) -> impl Iterator<Item = &CaseNode<'a>> + '_ {
        self.cases.values()
    }

    fn collect_leaves(&self, path: &mut Vec<&'a str>, out: &mut Vec<TreeLeaf<'a>>) {
        for (name, suite) in &self.suites {
            path.push(*name);
            suite.collect_leaves(path, out);
            path.pop();
        }
        for case in self.cases.values() {
            path.push(case.name);
            for (name, outcome) in &case.tests {
                out.push(TreeLeaf {
                    ancestors: path.clone(),
                    name: *name,
                    outcome: *outcome,
                });
            }
            path.pop();
        }
    }
}

/// The last segment of a class name, holding the tests for that class.
#[derive(Clone, Debug)]
pub struct CaseNode<'a> {
    name: &'a str,
    tests: IndexMap<&'a str, &'a ExecutionOutcome>,
}

impl<'a> CaseNode<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            tests: IndexMap::new(),
        }
    }

    /// Returns the name of this case.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns the tests in this case, keyed by method name.
    pub fn tests(&self) -> impl Iterator<Item = (&'a str, &'a ExecutionOutcome)> + '_ {
        self.tests.iter().map(|(name, outcome)| (*name, *outcome))
    }
}

/// A single test in a [`ResultTree`], as returned by [`ResultTree::leaves`].
#[derive(Clone, Debug)]
pub struct TreeLeaf<'a> {
    /// The names of the suites and the case above this test, outermost first.
    pub ancestors: Vec<&'a str>,

    /// The method name.
    pub name: &'a str,

    /// The recorded outcome.
    pub outcome: &'a ExecutionOutcome,
}

impl TreeLeaf<'_> {
    /// The depth of this leaf, counting the test itself.
    pub fn depth(&self) -> usize {
        self.ancestors.len() + 1
    }
}
