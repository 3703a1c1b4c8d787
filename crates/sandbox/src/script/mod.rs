//! Learner script interpreter
//!
//! Scripts go through three stages:
//!
//! 1. import declarations are blanked out textually (line numbers are kept)
//! 2. the remaining text is parsed into a small JavaScript subset
//! 3. the [`Interpreter`] walks the tree with the mock automation API bound
//!    as globals

pub mod ast;
mod builtins;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod value;

use std::fmt;
use std::sync::OnceLock;

use autolab_common::{Error, Result};
use regex::Regex;

pub use interp::Interpreter;
pub use value::{Thrown, Value};

/// Parse failure with the position it was detected at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.message, self.line, self.column)
    }
}

impl std::error::Error for SyntaxError {}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Error::Compile {
            line: err.line,
            column: err.column,
            message: err.message,
        }
    }
}

/// A parsed script, ready to run
#[derive(Debug)]
pub struct Program {
    pub(crate) body: Vec<ast::Stmt>,
}

impl Program {
    pub fn statement_count(&self) -> usize {
        self.body.len()
    }
}

fn import_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?m)^[ \t]*import\s+(?:[^;'"]*?\s+from\s+)?['"][^'"\n]*['"][ \t]*;?"#).ok())
        .as_ref()
}

/// Remove import declarations, replacing each with as many newlines as it
/// spanned so reported positions still match the original text
pub fn strip_imports(source: &str) -> String {
    match import_pattern() {
        Some(pattern) => pattern
            .replace_all(source, |caps: &regex::Captures<'_>| "\n".repeat(caps[0].matches('\n').count()))
            .into_owned(),
        None => source.to_string(),
    }
}

/// Turn learner source into a runnable [`Program`]
pub fn compile(source: &str) -> Result<Program> {
    let stripped = strip_imports(source);
    let body = parser::parse_program(&stripped)?;
    Ok(Program { body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_imports_keeps_line_numbers() {
        let source = "import { test, expect } from '@playwright/test';\nimport {\n  a,\n  b\n} from \"x\"\nimport 'side-effect';\nconst a = 1;";
        let stripped = strip_imports(source);
        assert_eq!(stripped.lines().count(), source.lines().count());
        assert!(!stripped.contains("import"));
        assert!(stripped.ends_with("const a = 1;"));
    }

    #[test]
    fn test_import_inside_string_survives() {
        let stripped = strip_imports("const s = 'import x from y';");
        assert_eq!(stripped, "const s = 'import x from y';");
    }

    #[test]
    fn test_compile_error_position_counts_stripped_lines() {
        let err = compile("import { test } from '@playwright/test';\n\nconst = 5;").unwrap_err();
        match err {
            Error::Compile { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_compile_reference_style_script() {
        let program = compile(
            "import { defineConfig } from '@playwright/test';\n\nexport default defineConfig({\n  use: { trace: 'on-first-retry' },\n});",
        )
        .unwrap();
        assert_eq!(program.statement_count(), 1);
    }
}
