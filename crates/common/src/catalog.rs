//! Scenario catalog
//!
//! The exercises ship as an embedded YAML document. Entries are immutable once
//! parsed; everything else in the lab only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::types::{ApiStyle, EnvironmentKind};
use crate::{Error, Result};

const BUILTIN_CATALOG: &str = include_str!("../catalog/scenarios.yaml");

/// Topic grouping used by the sidebar filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    WebUi,
    AdvancedSelectors,
    Performance,
    Accessibility,
    ApiTesting,
    IframeTesting,
    Maintenance,
    CypressUtils,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::WebUi => "Web UI Fundamentals",
            Category::AdvancedSelectors => "Advanced Selectors",
            Category::Performance => "Performance Testing",
            Category::Accessibility => "Accessibility Auditing",
            Category::ApiTesting => "API Testing",
            Category::IframeTesting => "Iframe Testing",
            Category::Maintenance => "Test Maintenance & Debugging",
            Category::CypressUtils => "Cypress Utility Patterns",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Accepts the snake_case identifier, with dashes or underscores
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "web_ui" => Ok(Category::WebUi),
            "advanced_selectors" => Ok(Category::AdvancedSelectors),
            "performance" => Ok(Category::Performance),
            "accessibility" => Ok(Category::Accessibility),
            "api_testing" => Ok(Category::ApiTesting),
            "iframe_testing" => Ok(Category::IframeTesting),
            "maintenance" => Ok(Category::Maintenance),
            "cypress_utils" => Ok(Category::CypressUtils),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Basic => write!(f, "Basic"),
            Difficulty::Intermediate => write!(f, "Intermediate"),
            Difficulty::Advanced => write!(f, "Advanced"),
        }
    }
}

/// Per-style source text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleText {
    #[serde(default)]
    pub playwright: Option<String>,
    #[serde(default)]
    pub cypress: Option<String>,
}

impl StyleText {
    pub fn get(&self, style: ApiStyle) -> Option<&str> {
        match style {
            ApiStyle::Playwright => self.playwright.as_deref(),
            ApiStyle::Cypress => self.cypress.as_deref(),
        }
    }
}

/// Documentation of the endpoint an API scenario exercises
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiContract {
    pub method: String,
    pub endpoint: String,
    #[serde(default)]
    pub request_body: Option<String>,
    pub expected_response: String,
}

/// One exercise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub description: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    /// Code the editor opens with
    #[serde(default)]
    pub starter: StyleText,
    /// Reference solution revealed on unlock
    pub reference: StyleText,
    pub environment: EnvironmentKind,
    /// Empty means every style is supported
    #[serde(default)]
    pub supported_styles: Vec<ApiStyle>,
    #[serde(default)]
    pub api_contract: Option<ApiContract>,
}

impl Scenario {
    pub fn supports(&self, style: ApiStyle) -> bool {
        self.supported_styles.is_empty() || self.supported_styles.contains(&style)
    }

    /// First supported style, used when the active style is not available
    pub fn default_style(&self) -> ApiStyle {
        self.supported_styles
            .first()
            .copied()
            .unwrap_or_default()
    }

    /// Style to use when `preferred` is requested
    pub fn resolve_style(&self, preferred: ApiStyle) -> ApiStyle {
        if self.supports(preferred) {
            preferred
        } else {
            self.default_style()
        }
    }

    /// Starter code, or a generated skeleton when the scenario has none
    pub fn starter_code(&self, style: ApiStyle) -> String {
        if let Some(code) = self.starter.get(style) {
            return code.to_string();
        }
        match style {
            ApiStyle::Playwright => format!(
                "import {{ test, expect }} from '@playwright/test';\n\ntest('{}', async ({{ page }}) => {{\n  // Your Playwright code here...\n  \n}});",
                self.slug()
            ),
            ApiStyle::Cypress => format!(
                "describe('{}', () => {{\n  it('should complete the exercise', () => {{\n    // Your code here...\n    \n  }});\n}});",
                self.title
            ),
        }
    }

    pub fn reference_code(&self, style: ApiStyle) -> &str {
        self.reference.get(style).unwrap_or("")
    }

    /// Lowercase title with whitespace replaced by dashes
    pub fn slug(&self) -> String {
        self.title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    scenarios: Vec<Scenario>,
}

/// Ordered set of scenarios
#[derive(Debug, Clone)]
pub struct Catalog {
    scenarios: Vec<Scenario>,
}

impl Catalog {
    /// The exercises bundled with the lab
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.scenarios)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(Error::Catalog("catalog has no scenarios".to_string()));
        }
        for (i, scenario) in scenarios.iter().enumerate() {
            if scenarios[..i].iter().any(|s| s.id == scenario.id) {
                return Err(Error::Catalog(format!("duplicate scenario id: {}", scenario.id)));
            }
        }
        Ok(Self { scenarios })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn first(&self) -> &Scenario {
        &self.scenarios[0]
    }

    pub fn find(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn get(&self, id: &str) -> Result<&Scenario> {
        self.find(id)
            .ok_or_else(|| Error::ScenarioNotFound(id.to_string()))
    }

    /// Scenarios matching the optional category and style filters
    pub fn filter(&self, category: Option<Category>, style: Option<ApiStyle>) -> Vec<&Scenario> {
        self.scenarios
            .iter()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .filter(|s| style.map_or(true, |st| s.supports(st)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 19);
        assert_eq!(catalog.first().id, "maint-cy-util-intercept");

        let auth = catalog.get("api-key-auth").unwrap();
        assert_eq!(auth.environment, EnvironmentKind::ApiConsole);
        assert_eq!(auth.api_contract.as_ref().unwrap().endpoint, "/api/secure-data");
    }

    #[test]
    fn test_every_scenario_has_a_reference_for_supported_styles() {
        let catalog = Catalog::builtin().unwrap();
        for scenario in catalog.scenarios() {
            for style in ApiStyle::ALL {
                if scenario.supports(style) {
                    assert!(
                        !scenario.reference_code(style).is_empty(),
                        "{} lacks a {} reference",
                        scenario.id,
                        style
                    );
                }
            }
        }
    }

    #[test]
    fn test_category_parses_cli_spellings() {
        assert_eq!("api-testing".parse::<Category>(), Ok(Category::ApiTesting));
        assert_eq!("Web_UI".parse::<Category>(), Ok(Category::WebUi));
        assert!("networking".parse::<Category>().is_err());
    }

    #[test]
    fn test_resolve_style_falls_back_to_first_supported() {
        let catalog = Catalog::builtin().unwrap();
        let cypress_only = catalog.get("cy-util-custom-cmd").unwrap();
        assert!(!cypress_only.supports(ApiStyle::Playwright));
        assert_eq!(cypress_only.resolve_style(ApiStyle::Playwright), ApiStyle::Cypress);
    }

    #[test]
    fn test_generated_starter_code() {
        let catalog = Catalog::builtin().unwrap();
        let login = catalog.get("basic-auth").unwrap();
        let code = login.starter_code(ApiStyle::Playwright);
        assert!(code.contains("test('login-form-submission', async ({ page }) => {"));
        assert!(login.starter_code(ApiStyle::Cypress).starts_with("describe('Login Form Submission'"));
    }

    #[test]
    fn test_filter_by_category_and_style() {
        let catalog = Catalog::builtin().unwrap();
        let api = catalog.filter(Some(Category::ApiTesting), None);
        assert_eq!(api.len(), 4);
        let playwright_only = catalog.filter(None, Some(ApiStyle::Playwright));
        assert!(playwright_only.iter().all(|s| s.supports(ApiStyle::Playwright)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
scenarios:
  - id: a
    title: A
    category: web_ui
    difficulty: basic
    description: first
    reference: { playwright: "x" }
    environment: login
  - id: a
    title: B
    category: web_ui
    difficulty: basic
    description: second
    reference: { playwright: "y" }
    environment: login
"#;
        assert!(matches!(Catalog::from_yaml(yaml), Err(Error::Catalog(_))));
    }
}
