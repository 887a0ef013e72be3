//! Script block collaborator.

use std::fmt;

/// Turns the raw text of a `script { }` block into the text embedded in
/// the output. The generator never looks inside either.
pub trait ScriptProcessor {
    fn process(&self, source: &str) -> String;
}

/// Embeds script text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ScriptProcessor for Passthrough {
    fn process(&self, source: &str) -> String {
        source.to_string()
    }
}

impl<F> ScriptProcessor for F
where
    F: Fn(&str) -> String,
{
    fn process(&self, source: &str) -> String {
        self(source)
    }
}

impl fmt::Debug for dyn ScriptProcessor + Send + Sync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScriptProcessor")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_processors() {
        let upper = |s: &str| s.to_uppercase();
        assert_eq!(upper.process("let a;"), "LET A;");
        assert_eq!(Passthrough.process("let a;"), "let a;");
    }
}
