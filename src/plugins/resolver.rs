//! Fixed-point load ordering with hard and soft dependencies.
//!
//! Each pass walks the remaining candidates in discovery order:
//!
//! 1. Hard dependencies already loaded are dropped. A hard dependency that is
//!    neither loaded nor still a candidate fails the dependent immediately.
//! 2. Soft dependencies already loaded are dropped.
//! 3. A candidate with nothing left to wait for is materialized on the spot,
//!    so later candidates in the same pass can already see it.
//!
//! When a pass materializes nothing, a relaxed pass materializes every
//! candidate without outstanding hard dependencies, ignoring its soft ones.
//! When that also materializes nothing, every remaining candidate is reported
//! as circular and the batch ends.

use std::collections::{HashMap, HashSet};

use super::PluginError;
use super::report::{LoadDiagnostic, LoadIssue};

struct Pending<T> {
    name: String,
    hard: Vec<String>,
    soft: Vec<String>,
    payload: T,
}

/// Orders one batch of candidates and hands each to a load callback.
pub struct DependencyResolver<T> {
    candidates: Vec<Pending<T>>,
    load_before: Vec<(String, String)>,
}

impl<T> Default for DependencyResolver<T> {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            load_before: Vec::new(),
        }
    }
}

impl<T> DependencyResolver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate in discovery order. Returns false if a candidate with
    /// the same name was already added.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        depend: impl IntoIterator<Item = String>,
        softdepend: impl IntoIterator<Item = String>,
        loadbefore: impl IntoIterator<Item = String>,
        payload: T,
    ) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }

        // `name` loads before `target`: target soft-depends on name.
        self.load_before
            .extend(loadbefore.into_iter().map(|target| (target, name.clone())));
        self.candidates.push(Pending {
            name,
            hard: depend.into_iter().collect(),
            soft: softdepend.into_iter().collect(),
            payload,
        });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.candidates.iter().any(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Runs the batch to completion.
    ///
    /// `loaded` holds names already available (from earlier batches) and gains
    /// every name `load` succeeds for. Returns the issues raised, in order.
    pub fn resolve<F>(self, loaded: &mut HashSet<String>, mut load: F) -> Vec<LoadDiagnostic>
    where
        F: FnMut(&str, T) -> Result<(), PluginError>,
    {
        let mut diagnostics = Vec::new();
        let mut candidates = self.normalized();
        let mut remaining: HashSet<String> = candidates.iter().map(|c| c.name.clone()).collect();

        while !candidates.is_empty() {
            let mut progressed = false;

            let mut idx = 0;
            while idx < candidates.len() {
                let candidate = &mut candidates[idx];
                candidate.hard.retain(|dep| !loaded.contains(dep));

                let missing = candidate
                    .hard
                    .iter()
                    .find(|dep| !remaining.contains(*dep))
                    .cloned();
                if let Some(dependency) = missing {
                    let failed = candidates.remove(idx);
                    remaining.remove(&failed.name);
                    push(
                        &mut diagnostics,
                        LoadDiagnostic::new(failed.name, LoadIssue::UnknownDependency { dependency }),
                    );
                    progressed = true;
                    continue;
                }

                candidate.soft.retain(|dep| !loaded.contains(dep));

                if candidate.hard.is_empty() && candidate.soft.is_empty() {
                    let ready = candidates.remove(idx);
                    remaining.remove(&ready.name);
                    materialize(ready, loaded, &mut load, &mut diagnostics);
                    progressed = true;
                    continue;
                }

                idx += 1;
            }

            if progressed {
                continue;
            }

            let mut idx = 0;
            while idx < candidates.len() {
                if candidates[idx].hard.is_empty() {
                    let ready = candidates.remove(idx);
                    remaining.remove(&ready.name);
                    tracing::debug!(
                        plugin = %ready.name,
                        skipped = ?ready.soft,
                        "Loading with unmet soft dependencies"
                    );
                    materialize(ready, loaded, &mut load, &mut diagnostics);
                    progressed = true;
                } else {
                    idx += 1;
                }
            }

            if !progressed {
                for stuck in candidates.drain(..) {
                    push(
                        &mut diagnostics,
                        LoadDiagnostic::new(stuck.name, LoadIssue::CircularDependency),
                    );
                }
            }
        }

        diagnostics
    }

    /// Folds load-before declarations into the targets' soft dependencies.
    fn normalized(self) -> Vec<Pending<T>> {
        let mut synthesized: HashMap<String, Vec<String>> = HashMap::new();
        for (target, before) in self.load_before {
            synthesized.entry(target).or_default().push(before);
        }

        self.candidates
            .into_iter()
            .map(|mut candidate| {
                if let Some(extra) = synthesized.remove(&candidate.name) {
                    for dep in extra {
                        if !candidate.soft.contains(&dep) {
                            candidate.soft.push(dep);
                        }
                    }
                }
                candidate
            })
            .collect()
    }
}

fn push(diagnostics: &mut Vec<LoadDiagnostic>, diagnostic: LoadDiagnostic) {
    diagnostic.log();
    diagnostics.push(diagnostic);
}

fn materialize<T, F>(
    candidate: Pending<T>,
    loaded: &mut HashSet<String>,
    load: &mut F,
    diagnostics: &mut Vec<LoadDiagnostic>,
) where
    F: FnMut(&str, T) -> Result<(), PluginError>,
{
    match load(&candidate.name, candidate.payload) {
        Ok(()) => {
            loaded.insert(candidate.name);
        }
        Err(e) => push(
            diagnostics,
            LoadDiagnostic::new(
                candidate.name,
                LoadIssue::LoadFailed {
                    reason: e.to_string(),
                },
            ),
        ),
    }
}
