//! Assertion library shared by both styles

use autolab_common::ActionKind;

use super::{text_arg, Handle, HostResult, Runtime};
use crate::script::Value;

/// Words that only make an assertion read naturally (`to.be.visible`,
/// `not.toBe`); reading one yields the same expectation
const CHAIN_WORDS: &[&str] = &[
    "not", "to", "be", "been", "is", "that", "which", "and", "has", "have", "with", "at", "of", "same", "but",
    "does", "deep", "nested", "own", "ordered", "any", "all", "itself", "exist", "ok", "true", "false", "null",
    "undefined", "NaN", "empty", "resolves", "rejects", "visible",
];

pub(super) fn is_chain_word(key: &str) -> bool {
    CHAIN_WORDS.contains(&key)
}

impl Runtime {
    /// Matchers on a locator publish an assertion event; every other matcher
    /// passes without one
    pub(super) fn expect_method(&self, subject: &Value, method: &str, args: Vec<Value>) -> HostResult {
        if let Value::Host(Handle::Locator(locator)) = subject {
            match method {
                "toBeVisible" => self.emit(locator.event(ActionKind::AssertVisible)),
                "toHaveValue" => self.emit(locator.event(ActionKind::AssertValue).with_value(text_arg(&args, 0))),
                "toContainText" | "toHaveText" => {
                    self.emit(locator.event(ActionKind::AssertText).with_value(text_arg(&args, 0)))
                }
                _ => {}
            }
        }
        Ok(Value::Host(Handle::Expectation(Box::new(subject.clone()))).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_words() {
        assert!(is_chain_word("not"));
        assert!(is_chain_word("to"));
        assert!(!is_chain_word("toBeVisible"));
        assert!(!is_chain_word("equal"));
    }
}
