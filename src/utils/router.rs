use regex::Regex;

use crate::Result;

/// Ordered list of `(pattern, route)` pairs.
///
/// Patterns are tried in insertion order and the first match wins, so more
/// specific patterns must be added before broader ones.
#[derive(Debug, Clone)]
pub struct ResourceRouter<R> {
    routes: Vec<(Regex, R)>,
}

impl<R: Copy> Default for ResourceRouter<R> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<R: Copy> ResourceRouter<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        mut self,
        pattern: &str,
        route: R,
    ) -> Result<Self> {
        self.routes.push((Regex::new(pattern)?, route));
        Ok(self)
    }

    pub fn route(
        &self,
        resource: &str,
    ) -> Option<R> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(resource))
            .map(|(_, route)| *route)
    }

    pub fn matches(
        &self,
        resource: &str,
    ) -> bool {
        self.route(resource).is_some()
    }
}
