//! Built-ins written in Python
//!
//! Functions that take a callback are defined here instead of natively so a
//! user function passed to them runs through the normal call path: the
//! prelude frames are untraced (origin `<prelude>`) while the callback's own
//! frames are traced like any other submitted code.

use crate::parser::ast::{CodeOrigin, Program};
use crate::parser::parse::{parse_source, ParseError};

pub const PRELUDE_SOURCE: &str = r#"
class _Missing:
    pass

_MISSING = _Missing()

def map(function, iterable, other=_MISSING):
    if other is _MISSING:
        return [function(item) for item in iterable]
    return [function(a, b) for a, b in zip(iterable, other)]

def filter(function, iterable):
    if function is None:
        return [item for item in iterable if item]
    return [item for item in iterable if function(item)]

def any(iterable):
    for item in iterable:
        if item:
            return True
    return False

def all(iterable):
    for item in iterable:
        if not item:
            return False
    return True

def reversed(sequence):
    items = list(sequence)
    return items[::-1]
"#;

/// Parse [`PRELUDE_SOURCE`] under the `<prelude>` origin
pub fn prelude_program() -> Result<Program, ParseError> {
    parse_source(PRELUDE_SOURCE, CodeOrigin::Prelude)
}

#[cfg(test)]
mod tests {
    use super::prelude_program;
    use crate::config::TracerLimits;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::hook::NoHook;
    use crate::parser::ast::CodeOrigin;
    use crate::parser::parse::parse_source;

    fn output(source: &str) -> String {
        let prelude = prelude_program().unwrap();
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();
        let mut hook = NoHook;
        let mut interpreter = Interpreter::new(&mut hook, TracerLimits::default());
        interpreter.load_prelude(&prelude).unwrap_or_else(|_| panic!("prelude failed"));
        if interpreter.run_program(&program).is_err() {
            panic!("program raised");
        }
        interpreter.take_console().into_streams().0
    }

    #[test]
    fn test_prelude_parses() {
        assert!(prelude_program().is_ok());
    }

    #[test]
    fn test_map_and_filter() {
        let source = "\
print(map(lambda x: x * 2, [1, 2, 3]))
print(map(lambda a, b: a + b, [1, 2], [10, 20, 30]))
print(filter(lambda x: x % 2, range(6)))
print(filter(None, [0, 1, '', 'a']))
";
        assert_eq!(output(source), "[2, 4, 6]\n[11, 22]\n[1, 3, 5]\n[1, 'a']\n");
    }

    #[test]
    fn test_any_all_reversed() {
        assert_eq!(
            output("print(any([0, 0, 3]), all([1, 0]), all([]), reversed('abc'))\n"),
            "True False True ['c', 'b', 'a']\n"
        );
    }

    #[test]
    fn test_private_names_are_not_exported() {
        let prelude = prelude_program().unwrap();
        let program = parse_source("_MISSING\n", CodeOrigin::Submitted).unwrap();
        let mut hook = NoHook;
        let mut interpreter = Interpreter::new(&mut hook, TracerLimits::default());
        interpreter.load_prelude(&prelude).unwrap_or_else(|_| panic!("prelude failed"));
        assert!(interpreter.run_program(&program).is_err());
    }
}
