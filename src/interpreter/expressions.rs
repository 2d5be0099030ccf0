//! Expression evaluation implementation
//!
//! This module evaluates every expression form of the supported subset:
//! literals and f-strings, names, container displays and comprehensions,
//! operators (with short-circuiting `and`/`or` and chained comparisons),
//! conditional expressions, lambdas, calls, attribute access and subscripts.
//!
//! # Comprehensions
//!
//! Comprehensions run inline in the current frame. Their loop variables live
//! in a scope pushed onto [`Frame::comprehension_scopes`] for the duration of
//! the comprehension, so they never leak into (or clobber) the frame's own
//! variables. Generator expressions are evaluated eagerly into a list.
//!
//! [`Frame::comprehension_scopes`]: crate::memory::stack::Frame::comprehension_scopes

use super::engine::Interpreter;
use super::errors::{type_error, ExecResult};
use super::ops::hash_key;
use crate::memory::value::{DictMap, SetMap, Value};
use crate::parser::ast::*;
use std::rc::Rc;

/// Accumulates the output of a comprehension
enum Collector {
    List(Vec<Value>),
    Set(SetMap),
    Dict(DictMap),
}

impl Collector {
    fn len(&self) -> usize {
        match self {
            Collector::List(items) => items.len(),
            Collector::Set(members) => members.len(),
            Collector::Dict(map) => map.len(),
        }
    }
}

impl Interpreter<'_> {
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr) -> ExecResult<Value> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Float(x) => Ok(Value::Float(*x)),
            ExprKind::Str(text) => Ok(Value::Str(Rc::from(&**text))),
            ExprKind::Bool(flag) => Ok(Value::Bool(*flag)),
            ExprKind::NoneLiteral => Ok(Value::None),
            ExprKind::FString(parts) => self.evaluate_fstring(parts).map(Value::str),
            ExprKind::Name(name) => self.lookup_name(name),
            ExprKind::List(items) => Ok(Value::list(self.evaluate_all(items)?)),
            ExprKind::Tuple(items) => Ok(Value::tuple(self.evaluate_all(items)?)),
            ExprKind::Set(items) => {
                let mut members = SetMap::default();
                for item in self.evaluate_all(items)? {
                    members.entry(hash_key(&item)?).or_insert(item);
                }
                Ok(Value::set(members))
            }
            ExprKind::Dict(entries) => {
                let mut map = DictMap::default();
                for (key, value) in entries {
                    let key = self.evaluate_expr(key)?;
                    let value = self.evaluate_expr(value)?;
                    insert_entry(&mut map, key, value)?;
                }
                Ok(Value::dict(map))
            }
            ExprKind::Comprehension {
                kind,
                element,
                value,
                clauses,
            } => self.evaluate_comprehension(*kind, element, value.as_deref(), clauses),
            ExprKind::BinaryOp { op, left, right } => {
                let left = self.evaluate_expr(left)?;
                let right = self.evaluate_expr(right)?;
                self.binary_op(*op, &left, &right)
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.evaluate_expr(operand)?;
                self.unary_op(*op, &operand)
            }
            ExprKind::BoolOp { op, left, right } => {
                let left = self.evaluate_expr(left)?;
                let left_true = self.truthy(&left)?;
                match (op, left_true) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.evaluate_expr(right),
                }
            }
            ExprKind::Compare { left, comparisons } => {
                let mut left = self.evaluate_expr(left)?;
                for (op, right) in comparisons {
                    let right = self.evaluate_expr(right)?;
                    if !self.compare_op(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::IfExp { test, body, orelse } => {
                let test = self.evaluate_expr(test)?;
                if self.truthy(&test)? {
                    self.evaluate_expr(body)
                } else {
                    self.evaluate_expr(orelse)
                }
            }
            ExprKind::Lambda(def) => self.make_function(def),
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                let callee = self.evaluate_expr(func)?;
                let args = self.evaluate_all(args)?;
                let mut kwargs = Vec::with_capacity(keywords.len());
                for (name, value) in keywords {
                    kwargs.push((name.clone(), self.evaluate_expr(value)?));
                }
                self.call_value(&callee, args, kwargs)
            }
            ExprKind::Attribute { value, name } => {
                let object = self.evaluate_expr(value)?;
                self.get_attribute(&object, name)
            }
            ExprKind::Subscript { value, index } => {
                let object = self.evaluate_expr(value)?;
                match &index.kind {
                    ExprKind::Slice { lower, upper, step } => {
                        let bounds = self.evaluate_slice(lower, upper, step)?;
                        self.get_slice(&object, bounds)
                    }
                    _ => {
                        let index = self.evaluate_expr(index)?;
                        self.get_item(&object, &index)
                    }
                }
            }
            ExprKind::Slice { .. } => Err(type_error("slice is only valid inside a subscript")),
        }
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> ExecResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.evaluate_expr(expr)?);
        }
        Ok(values)
    }

    fn evaluate_fstring(&mut self, parts: &[FStringPart]) -> ExecResult<String> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Field {
                    expr,
                    conversion,
                    format_spec,
                } => {
                    let value = self.evaluate_expr(expr)?;
                    let value = match conversion {
                        Some('r') | Some('a') => Value::str(self.repr_value(&value)?),
                        Some('s') => Value::str(self.str_value(&value)?),
                        _ => value,
                    };
                    let rendered = self.format_value(&value, format_spec.as_deref().unwrap_or(""))?;
                    out.push_str(&rendered);
                }
            }
        }
        self.check_sequence_len(out.len())?;
        Ok(out)
    }

    fn evaluate_comprehension(
        &mut self,
        kind: ComprehensionKind,
        element: &Expr,
        value: Option<&Expr>,
        clauses: &[ComprehensionClause],
    ) -> ExecResult<Value> {
        let mut collector = match kind {
            ComprehensionKind::List | ComprehensionKind::Generator => Collector::List(Vec::new()),
            ComprehensionKind::Set => Collector::Set(SetMap::default()),
            ComprehensionKind::Dict => Collector::Dict(DictMap::default()),
        };
        if let Some(frame) = self.stack.current_frame_mut() {
            frame.comprehension_scopes.push(Default::default());
        }
        let outcome = self.run_clauses(clauses, element, value, &mut collector);
        if let Some(frame) = self.stack.current_frame_mut() {
            frame.comprehension_scopes.pop();
        }
        outcome?;

        Ok(match collector {
            Collector::List(items) => Value::list(items),
            Collector::Set(members) => Value::set(members),
            Collector::Dict(map) => Value::dict(map),
        })
    }

    fn run_clauses(
        &mut self,
        clauses: &[ComprehensionClause],
        element: &Expr,
        value: Option<&Expr>,
        out: &mut Collector,
    ) -> ExecResult<()> {
        let Some((clause, rest)) = clauses.split_first() else {
            self.check_sequence_len(out.len() + 1)?;
            match out {
                Collector::List(items) => items.push(self.evaluate_expr(element)?),
                Collector::Set(members) => {
                    let item = self.evaluate_expr(element)?;
                    members.entry(hash_key(&item)?).or_insert(item);
                }
                Collector::Dict(map) => {
                    let key = self.evaluate_expr(element)?;
                    let item = match value {
                        Some(value) => self.evaluate_expr(value)?,
                        None => Value::None,
                    };
                    insert_entry(map, key, item)?;
                }
            }
            return Ok(());
        };

        let iterable = self.evaluate_expr(&clause.iter)?;
        let mut iterator = self.make_iter(&iterable)?;
        'items: while let Some(item) = iterator.next_item()? {
            self.bind_comprehension_target(&clause.target, item)?;
            for condition in &clause.conditions {
                let test = self.evaluate_expr(condition)?;
                if !self.truthy(&test)? {
                    continue 'items;
                }
            }
            self.run_clauses(rest, element, value, out)?;
        }
        Ok(())
    }

    fn bind_comprehension_target(&mut self, target: &Expr, value: Value) -> ExecResult<()> {
        match &target.kind {
            ExprKind::Name(name) => {
                if let Some(scope) = self
                    .stack
                    .current_frame_mut()
                    .and_then(|frame| frame.comprehension_scopes.last_mut())
                {
                    scope.insert(name.clone(), value);
                }
                Ok(())
            }
            ExprKind::Tuple(targets) | ExprKind::List(targets) => {
                let items = self.unpack(value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.bind_comprehension_target(target, item)?;
                }
                Ok(())
            }
            _ => self.assign_target(target, value),
        }
    }
}

/// Insert into a dict, keeping the first key object like Python does
fn insert_entry(map: &mut DictMap, key: Value, value: Value) -> ExecResult<()> {
    let hashed = hash_key(&key)?;
    match map.get_mut(&hashed) {
        Some(entry) => entry.1 = value,
        None => {
            map.insert(hashed, (key, value));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::TracerLimits;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::Flow;
    use crate::interpreter::hook::NoHook;
    use crate::parser::ast::CodeOrigin;
    use crate::parser::parse::parse_source;

    fn output(source: &str) -> String {
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();
        let mut hook = NoHook;
        let mut interpreter = Interpreter::new(&mut hook, TracerLimits::default());
        if let Err(Flow::Raise(exc)) = interpreter.run_program(&program) {
            panic!("Unexpected exception: {}", exc.summary());
        }
        interpreter.take_console().into_streams().0
    }

    #[test]
    fn test_comprehensions() {
        let source = "\
xs = [1, 2, 3, 4]
print([x * x for x in xs if x % 2 == 0])
print({x: x + 1 for x in range(3)})
print(sorted({c for c in 'abca'}))
print([(i, j) for i in range(2) for j in range(i)])
";
        assert_eq!(output(source), "[4, 16]\n{0: 1, 1: 2, 2: 3}\n['a', 'b', 'c']\n[(1, 0)]\n");
    }

    #[test]
    fn test_comprehension_variable_does_not_leak() {
        assert_eq!(output("x = 'outer'\nys = [x for x in range(3)]\nprint(x, ys)\n"), "outer [0, 1, 2]\n");
    }

    #[test]
    fn test_short_circuit_returns_operand() {
        assert_eq!(output("print(0 or 'x', [] and 1, 3 and 4)\n"), "x [] 4\n");
    }

    #[test]
    fn test_chained_comparison() {
        assert_eq!(output("x = 5\nprint(1 < x <= 5, 1 < x < 3)\n"), "True False\n");
    }

    #[test]
    fn test_fstrings() {
        let source = "name = 'Ada'\nscore = 91.456\nprint(f'{name!r} scored {score:.1f} ({score:>8.2f})')\n";
        assert_eq!(output(source), "'Ada' scored 91.5 (   91.46)\n");
    }

    #[test]
    fn test_slicing() {
        let source = "s = 'hello'\nxs = list(range(6))\nprint(s[::-1], s[1:3], xs[::2], xs[-2:], range(10)[2:8:3])\n";
        assert_eq!(output(source), "olleh el [0, 2, 4] [4, 5] range(2, 8, 3)\n");
    }

    #[test]
    fn test_lambda_and_sorting() {
        let source = "pairs = [(1, 'b'), (2, 'a')]\nprint(sorted(pairs, key=lambda p: p[1]))\n";
        assert_eq!(output(source), "[(2, 'a'), (1, 'b')]\n");
    }

    #[test]
    fn test_dict_keeps_first_key_object() {
        assert_eq!(output("d = {1: 'a', 1.0: 'b', True: 'c'}\nprint(d)\n"), "{1: 'c'}\n");
    }
}
