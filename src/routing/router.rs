use crate::routing::matcher::match_prefix;

/// A pattern and the handler it dispatches to.
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub pattern: String,
    pub handler: H,
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub route: &'a Route<H>,
    /// Number of URI bytes consumed by the pattern.
    pub matched_len: usize,
}

/// Ordered route table. Routes are tried in insertion order; the first
/// pattern matching a prefix of the URI wins.
#[derive(Debug, Clone)]
pub struct Router<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: impl Into<String>, handler: H) -> Self {
        self.add(pattern, handler);
        self
    }

    pub fn add(&mut self, pattern: impl Into<String>, handler: H) {
        self.routes.push(Route {
            pattern: pattern.into(),
            handler,
        });
    }

    pub fn find(&self, uri: &str) -> Option<RouteMatch<'_, H>> {
        self.routes.iter().find_map(|route| {
            match_prefix(route.pattern.as_bytes(), uri.as_bytes())
                .map(|matched_len| RouteMatch { route, matched_len })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
