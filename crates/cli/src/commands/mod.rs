//! CLI Commands

pub mod mentor;
pub mod progress;
pub mod run;
pub mod scenario;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use autolab_common::{ApiStyle, Catalog, LabConfig, Scenario};
use autolab_sandbox::{DegradingMentor, Mentor, OfflineMentor, ProgressStore};
use tracing::{debug, warn};

use crate::client::HttpMentor;
use crate::output::OutputFormat;

/// State shared by every command
pub struct Context {
    pub config: LabConfig,
    pub catalog: Catalog,
    pub format: OutputFormat,
}

impl Context {
    pub fn load(config_path: &Path, format: OutputFormat) -> Result<Self> {
        let config = LabConfig::load(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?;
        debug!("Loaded config from {}", config_path.display());
        let catalog = Catalog::builtin().context("built-in scenario catalog is invalid")?;
        Ok(Self { config, catalog, format })
    }

    pub fn scenario(&self, id: &str) -> Result<&Scenario> {
        Ok(self.catalog.get(id)?)
    }

    /// Requested style, else the last one used, else the scenario default
    pub fn style_for(&self, scenario: &Scenario, requested: Option<ApiStyle>, store: &ProgressStore) -> Result<ApiStyle> {
        match requested {
            Some(style) if scenario.supports(style) => Ok(style),
            Some(style) => anyhow::bail!("{} does not support {}", scenario.id, style),
            None => Ok(scenario.resolve_style(store.last_style().unwrap_or_default())),
        }
    }

    pub async fn store(&self) -> ProgressStore {
        ProgressStore::open(self.config.progress_path()).await
    }

    /// Configured mentor, degrading to fixed answers on failure
    pub fn mentor(&self) -> DegradingMentor<Box<dyn Mentor>> {
        let inner: Box<dyn Mentor> = match HttpMentor::new(&self.config.mentor) {
            Ok(client) => Box::new(client),
            Err(e) => {
                if self.config.mentor.endpoint.is_some() {
                    warn!("Mentor client unavailable: {}", e);
                }
                Box::new(OfflineMentor)
            }
        };
        DegradingMentor::new(inner)
    }
}

/// Where a command takes its script from
pub enum Source<'a> {
    File(&'a Path),
    Reference,
    Saved,
}

impl<'a> Source<'a> {
    pub fn new(file: Option<&'a PathBuf>, reference: bool) -> Self {
        match (file, reference) {
            (Some(path), _) => Source::File(path),
            (None, true) => Source::Reference,
            (None, false) => Source::Saved,
        }
    }

    /// Script text; saved code falls back to the starter code
    pub fn load(&self, scenario: &Scenario, style: ApiStyle, store: &ProgressStore) -> Result<String> {
        match self {
            Source::File(path) => read_code(path),
            Source::Reference => Ok(scenario.reference_code(style).to_string()),
            Source::Saved => Ok(store
                .code(&scenario.id, style)
                .map(str::to_string)
                .unwrap_or_else(|| scenario.starter_code(style))),
        }
    }
}

/// Read a script from `path`, or stdin for `-`
pub fn read_code(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("failed to read script from stdin")?;
        return Ok(code);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        let mut config = LabConfig::default();
        config.store_path = dir.path().to_path_buf();
        Context {
            config,
            catalog: Catalog::builtin().unwrap(),
            format: OutputFormat::Table,
        }
    }

    #[tokio::test]
    async fn test_source_prefers_saved_code_over_starter() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let scenario = ctx.scenario("basic-auth").unwrap();
        let mut store = ctx.store().await;

        let starter = Source::Saved.load(scenario, ApiStyle::Cypress, &store).unwrap();
        assert_eq!(starter, scenario.starter_code(ApiStyle::Cypress));

        store.set_code("basic-auth", ApiStyle::Cypress, "cy.visit('/');");
        let saved = Source::Saved.load(scenario, ApiStyle::Cypress, &store).unwrap();
        assert_eq!(saved, "cy.visit('/');");

        let reference = Source::Reference.load(scenario, ApiStyle::Cypress, &store).unwrap();
        assert_eq!(reference, scenario.reference_code(ApiStyle::Cypress));
    }

    #[tokio::test]
    async fn test_style_resolution() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let mut store = ctx.store().await;
        let cypress_only = ctx.scenario("cy-custom-commands").unwrap();

        assert!(ctx.style_for(cypress_only, Some(ApiStyle::Playwright), &store).is_err());
        assert_eq!(ctx.style_for(cypress_only, None, &store).unwrap(), ApiStyle::Cypress);

        store.set_last_style(ApiStyle::Cypress);
        let both = ctx.scenario("basic-auth").unwrap();
        assert_eq!(ctx.style_for(both, None, &store).unwrap(), ApiStyle::Cypress);
    }

    #[test]
    fn test_read_code_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spec.ts");
        std::fs::write(&path, "await page.goto('/');").unwrap();
        assert_eq!(read_code(&path).unwrap(), "await page.goto('/');");
        assert!(read_code(&dir.path().join("missing.ts")).is_err());
    }
}
