// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrency-safe registries attached to a step copy.
//!
//! Adds may race with iteration from another thread (an external monitor,
//! for example). Iteration always works on a snapshot taken under a read
//! lock, so it sees every add completed before the snapshot and is never
//! disturbed by later ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::channel::StepCopyId;
use crate::observability::messages::step::ResourceReleaseFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::{ExternalResource, RowListener, StepListener};

/// Append-mostly list with snapshot iteration.
pub struct Registry<T: ?Sized> {
    items: RwLock<Vec<Arc<T>>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, item: Arc<T>) {
        self.items.write().push(item);
    }

    /// Removes `item` (compared by identity). Returns whether it was present.
    pub fn remove(&self, item: &Arc<T>) -> bool {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|existing| !Arc::ptr_eq(existing, item));
        items.len() != before
    }

    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Takes every item out, leaving the registry empty.
    pub fn drain(&self) -> Vec<Arc<T>> {
        std::mem::take(&mut *self.items.write())
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A file (or other artifact) produced by a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultFile {
    pub name: String,
    pub origin_step: String,
    pub kind: String,
}

impl ResultFile {
    pub fn new(
        name: impl Into<String>,
        origin_step: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            origin_step: origin_step.into(),
            kind: kind.into(),
        }
    }
}

/// Result files keyed by name; a later add with the same name wins.
#[derive(Default)]
pub struct ResultFiles {
    files: RwLock<BTreeMap<String, ResultFile>>,
}

impl ResultFiles {
    pub fn add(&self, file: ResultFile) {
        self.files.write().insert(file.name.clone(), file);
    }

    pub fn get(&self, name: &str) -> Option<ResultFile> {
        self.files.read().get(name).cloned()
    }

    pub fn snapshot(&self) -> Vec<ResultFile> {
        self.files.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

/// Outcome of releasing a step's external resources.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub released: usize,
    pub failed: usize,
}

/// Every registry a step copy exposes.
#[derive(Default)]
pub struct StepRegistries {
    pub row_listeners: Registry<dyn RowListener>,
    pub step_listeners: Registry<dyn StepListener>,
    pub result_files: ResultFiles,
    pub resources: Registry<dyn ExternalResource>,
}

impl StepRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases every registered resource once. Failures are logged and the
    /// remaining resources are still released.
    pub fn release_resources(&self, step: &StepCopyId) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();
        for resource in self.resources.drain() {
            match resource.release() {
                Ok(()) => summary.released += 1,
                Err(error) => {
                    summary.failed += 1;
                    ResourceReleaseFailed {
                        step,
                        resource: resource.name(),
                        error: &error,
                    }
                    .log();
                }
            }
        }
        summary
    }
}
