// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{PackageDefinition, SuiteDefinitionLoader};
use crate::errors::PackageRepoError;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Every loaded package definition, keyed by id (`"<abi> <name>"`).
#[derive(Clone, Debug, Default)]
pub struct PackageRepository {
    packages: BTreeMap<String, PackageDefinition>,
}

impl PackageRepository {
    /// Creates a new, empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.xml` suite definition directly inside `dir`, in file name order.
    ///
    /// Documents that fail to load are logged and skipped.
    pub fn load_dir(
        dir: &Utf8Path,
        loader: &SuiteDefinitionLoader,
    ) -> Result<Self, PackageRepoError> {
        let mut repo = Self::new();
        for path in suite_definition_paths(dir)? {
            match loader.load_file(&path) {
                Ok(loaded) => {
                    debug!(
                        "loaded {} package definitions from `{path}`",
                        loaded.packages.len()
                    );
                    for def in loaded.packages {
                        repo.add(def);
                    }
                }
                Err(error) => {
                    warn!("skipping suite definition `{path}`: {error}");
                }
            }
        }
        info!(
            "loaded {} package definitions from `{dir}`",
            repo.packages.len()
        );
        Ok(repo)
    }

    /// Adds a definition, replacing any existing definition with the same id.
    pub fn add(&mut self, def: PackageDefinition) {
        let id = def.id();
        if self.packages.insert(id.clone(), def).is_some() {
            warn!("package definition `{id}` was defined more than once; using the last one");
        }
    }

    /// Returns the definition with the given id.
    pub fn get(&self, id: &str) -> Option<&PackageDefinition> {
        self.packages.get(id)
    }

    /// Returns every definition of the named package, one per ABI.
    pub fn packages_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a PackageDefinition> + 'a {
        self.packages.values().filter(move |def| def.name() == name)
    }

    /// Returns the ids of the packages that could contain tests of `class_name`.
    ///
    /// That is every package with a test of that class, and every package whose java package
    /// filter is a prefix of it.
    pub fn find_package_ids_for_test(&self, class_name: &str) -> BTreeSet<&str> {
        self.packages
            .iter()
            .filter(|(_, def)| {
                def.has_class(class_name)
                    || def
                        .java_package_filter()
                        .is_some_and(|filter| class_name.starts_with(filter))
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Returns all package ids, sorted.
    pub fn package_ids(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.packages.keys().map(String::as_str)
    }

    /// Returns all distinct package names, sorted.
    pub fn package_names(&self) -> BTreeSet<&str> {
        self.packages.values().map(|def| def.name()).collect()
    }

    /// Returns the number of definitions.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns true if the repository has no definitions.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn suite_definition_paths(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PackageRepoError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|error| PackageRepoError::ReadDir {
            dir: dir.to_owned(),
            error,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(|path| {
            PackageRepoError::NonUtf8Path {
                dir: dir.to_owned(),
                path: path.display().to_string(),
            }
        })?;
        if path.extension() == Some("xml") {
            paths.push(path);
        }
    }
    Ok(paths)
}
