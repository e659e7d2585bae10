use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    environment::{Endpoints, Environment, resolve_root},
    http::HttpClient,
    install::Engine,
    provider::HttpVersionSource,
    runtime::Runtime,
};

/// Global command-line settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: Option<PathBuf>,
    pub recipe_dirs: Vec<PathBuf>,
    pub github_api_url: Option<String>,
    pub timeout: Duration,
    pub jobs: Option<usize>,
    /// Colours and cursor control on stdout.
    pub ansi: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            recipe_dirs: Vec::new(),
            github_api_url: None,
            timeout: Duration::from_secs(300),
            jobs: None,
            ansi: false,
        }
    }
}

impl Config {
    /// Resolve the root and recipe directories into an [`Environment`].
    pub fn environment<R: Runtime>(&self, runtime: &R) -> Result<Environment> {
        let root = resolve_root(runtime, self.root.as_deref())?;
        debug!("Using root {:?}", root);

        let mut endpoints = Endpoints::default();
        if let Some(url) = &self.github_api_url {
            endpoints.github_api = url.trim_end_matches('/').to_string();
        }

        Ok(Environment::new(root)
            .with_recipe_dirs(self.recipe_dirs.clone())
            .discover_recipe_dirs(runtime)
            .with_endpoints(endpoints)
            .with_http_timeout(self.timeout))
    }

    /// Wire up an [`Engine`] backed by the network version source.
    pub fn engine<R: Runtime>(&self, runtime: R) -> Result<Engine<R>> {
        let env = self.environment(&runtime)?;
        let http = HttpClient::build(&runtime, env.http_timeout)?;
        let versions = Arc::new(HttpVersionSource::new(http.clone(), env.endpoints.clone()));
        Engine::new(runtime, env, http, versions)
    }
}
