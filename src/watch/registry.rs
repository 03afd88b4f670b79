use std::collections::HashMap;
use std::collections::HashSet;

use regex::Regex;
use tracing::trace;

use crate::Result;

/// A participant waiting for changes, plus the request its notifications answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watcher {
    pub address: String,
    /// `msg_id` of the watch request; notifications carry it as `reply_to`
    pub msg_id: u64,
}

#[derive(Debug)]
struct PatternWatch {
    source: String,
    pattern: Regex,
    watchers: Vec<Watcher>,
}

#[derive(Debug, Default)]
pub struct WatchRegistry {
    exact: HashMap<String, Vec<Watcher>>,
    patterns: Vec<PatternWatch>,
}

/// Adds or refreshes `watcher`; a repeated watch only updates the correlation id.
fn upsert(
    watchers: &mut Vec<Watcher>,
    watcher: Watcher,
) {
    match watchers.iter_mut().find(|w| w.address == watcher.address) {
        Some(existing) => existing.msg_id = watcher.msg_id,
        None => watchers.push(watcher),
    }
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(
        &mut self,
        resource: &str,
        watcher: Watcher,
    ) {
        trace!(%resource, address = %watcher.address, "watch");
        upsert(self.exact.entry(resource.to_string()).or_default(), watcher);
    }

    pub fn watch_pattern(
        &mut self,
        pattern: &str,
        watcher: Watcher,
    ) -> Result<()> {
        trace!(%pattern, address = %watcher.address, "watch pattern");
        if let Some(existing) = self.patterns.iter_mut().find(|p| p.source == pattern) {
            upsert(&mut existing.watchers, watcher);
            return Ok(());
        }
        self.patterns.push(PatternWatch {
            source: pattern.to_string(),
            pattern: Regex::new(pattern)?,
            watchers: vec![watcher],
        });
        Ok(())
    }

    pub fn unwatch(
        &mut self,
        resource: &str,
        address: &str,
    ) {
        if let Some(watchers) = self.exact.get_mut(resource) {
            watchers.retain(|w| w.address != address);
            if watchers.is_empty() {
                self.exact.remove(resource);
            }
        }
    }

    pub fn unwatch_pattern(
        &mut self,
        pattern: &str,
        address: &str,
    ) {
        for entry in self.patterns.iter_mut().filter(|p| p.source == pattern) {
            entry.watchers.retain(|w| w.address != address);
        }
        self.patterns.retain(|p| !p.watchers.is_empty());
    }

    /// Drops every registration held by `address`.
    pub fn remove_participant(
        &mut self,
        address: &str,
    ) {
        self.exact.retain(|_, watchers| {
            watchers.retain(|w| w.address != address);
            !watchers.is_empty()
        });
        for entry in self.patterns.iter_mut() {
            entry.watchers.retain(|w| w.address != address);
        }
        self.patterns.retain(|p| !p.watchers.is_empty());
    }

    /// Everyone watching `resource` exactly or through a pattern, once per address.
    ///
    /// An exact registration takes precedence over pattern ones for the correlation id.
    pub fn watchers_of(
        &self,
        resource: &str,
    ) -> Vec<Watcher> {
        let mut seen = HashSet::new();
        let exact = self.exact.get(resource).into_iter().flatten();
        let by_pattern = self
            .patterns
            .iter()
            .filter(|p| p.pattern.is_match(resource))
            .flat_map(|p| p.watchers.iter());

        exact
            .chain(by_pattern)
            .filter(|w| seen.insert(w.address.clone()))
            .cloned()
            .collect()
    }

    pub fn watcher_count(&self) -> usize {
        self.exact.values().map(Vec::len).sum::<usize>()
            + self.patterns.iter().map(|p| p.watchers.len()).sum::<usize>()
    }
}
