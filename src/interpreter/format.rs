//! Text conversion and string formatting
//!
//! - [`Interpreter::str_value`] / [`Interpreter::repr_value`]: `str()` and
//!   `repr()` honouring user `__str__` / `__repr__`
//! - [`Interpreter::format_value`]: the format-spec mini-language used by
//!   f-strings and `str.format`
//! - [`Interpreter::percent_format`]: printf-style `%` formatting
//! - [`Interpreter::truthy`]: truth testing with `__bool__` / `__len__`

use super::engine::Interpreter;
use super::errors::{index_error, key_error, type_error, value_error, ExecResult};
use super::ops::hash_key;
use crate::memory::value::{format_float, Value};

impl Interpreter<'_> {
    /// `str(value)`
    pub(crate) fn str_value(&mut self, value: &Value) -> ExecResult<String> {
        match value {
            Value::Str(text) => Ok(text.to_string()),
            Value::Instance(_) | Value::Exception(_) => {
                if let Some(result) = self.call_dunder(value, "__str__", Vec::new())? {
                    return expect_str("__str__", result);
                }
                match value {
                    Value::Exception(exc) => Ok(exc.message()),
                    _ => self.repr_value(value),
                }
            }
            _ => self.repr_value(value),
        }
    }

    /// `repr(value)`
    pub(crate) fn repr_value(&mut self, value: &Value) -> ExecResult<String> {
        if matches!(value, Value::Instance(_) | Value::Exception(_)) {
            if let Some(result) = self.call_dunder(value, "__repr__", Vec::new())? {
                return expect_str("__repr__", result);
            }
        }
        value.repr_with(&mut |element| self.repr_value(element))
    }

    /// Truth value, consulting `__bool__` then `__len__` on instances
    pub(crate) fn truthy(&mut self, value: &Value) -> ExecResult<bool> {
        if !matches!(value, Value::Instance(_)) {
            return Ok(value.is_truthy());
        }
        if let Some(result) = self.call_dunder(value, "__bool__", Vec::new())? {
            return match result {
                Value::Bool(flag) => Ok(flag),
                other => Err(type_error(format!(
                    "__bool__ should return bool, returned {}",
                    other.type_name()
                ))),
            };
        }
        if let Some(length) = self.call_dunder(value, "__len__", Vec::new())? {
            return match length.as_int() {
                Some(n) if n >= 0 => Ok(n != 0),
                Some(_) => Err(value_error("__len__() should return >= 0")),
                None => Err(type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    length.type_name()
                ))),
            };
        }
        Ok(true)
    }

    /// `format(value, spec)`
    pub(crate) fn format_value(&mut self, value: &Value, spec: &str) -> ExecResult<String> {
        if spec.is_empty() {
            return self.str_value(value);
        }
        let parsed = FormatSpec::parse(spec)?;
        match value {
            Value::Str(text) => format_text(text, &parsed),
            Value::Int(_) | Value::Bool(_) => format_int(value.as_int().unwrap_or(0), &parsed),
            Value::Float(x) => format_float_spec(*x, &parsed),
            other => Err(type_error(format!(
                "unsupported format string passed to {}.__format__",
                other.type_name()
            ))),
        }
    }

    /// `template % args`
    pub(crate) fn percent_format(&mut self, template: &str, args: &Value) -> ExecResult<String> {
        let mapping = matches!(args, Value::Dict(_));
        let positional: Vec<Value> = match args {
            Value::Tuple(items) => items.to_vec(),
            Value::Dict(_) => Vec::new(),
            other => vec![other.clone()],
        };
        let mut next = positional.into_iter();
        let mut out = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                out.push('%');
                continue;
            }

            let mut key = None;
            if chars.peek() == Some(&'(') {
                chars.next();
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == ')' {
                        break;
                    }
                    name.push(c);
                }
                key = Some(name);
            }
            let mut spec = FormatSpec::default();
            while let Some(&flag) = chars.peek() {
                match flag {
                    '-' => spec.align = Some('<'),
                    '+' | ' ' => spec.sign = flag,
                    '0' => spec.zero = true,
                    '#' => spec.alternate = true,
                    _ => break,
                }
                chars.next();
            }
            spec.width = take_number(&mut chars).unwrap_or(0);
            if chars.peek() == Some(&'.') {
                chars.next();
                spec.precision = Some(take_number(&mut chars).unwrap_or(0));
            }
            if spec.zero && spec.align.is_none() {
                spec.fill = '0';
                spec.align = Some('=');
            }
            let Some(conversion) = chars.next() else {
                return Err(value_error("incomplete format"));
            };

            let value = match (&key, args) {
                (Some(name), Value::Dict(map)) => {
                    let key_value = Value::str(name.as_str());
                    let found = map.borrow().get(&hash_key(&key_value)?).map(|(_, v)| v.clone());
                    found.ok_or_else(|| key_error(key_value))?
                }
                (Some(_), _) => return Err(type_error("format requires a mapping")),
                (None, _) if mapping => args.clone(),
                (None, _) => next
                    .next()
                    .ok_or_else(|| type_error("not enough arguments for format string"))?,
            };

            let rendered = match conversion {
                's' | 'r' => {
                    let text = if conversion == 's' {
                        self.str_value(&value)?
                    } else {
                        self.repr_value(&value)?
                    };
                    spec.fill = ' ';
                    if spec.align == Some('=') {
                        spec.align = None;
                    }
                    format_text(&text, &spec)?
                }
                'd' | 'i' | 'x' | 'X' | 'o' => {
                    let n = match &value {
                        Value::Float(x) => super::builtins::float_to_int(*x)?,
                        other => other.as_int().ok_or_else(|| {
                            type_error(format!(
                                "%{} format: a real number is required, not {}",
                                conversion,
                                other.type_name()
                            ))
                        })?,
                    };
                    spec.kind = match conversion {
                        'x' | 'X' | 'o' => Some(conversion),
                        _ => Some('d'),
                    };
                    spec.precision = None;
                    format_int(n, &spec)?
                }
                'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                    let x = value.as_float().ok_or_else(|| {
                        type_error(format!(
                            "must be real number, not {}",
                            value.type_name()
                        ))
                    })?;
                    spec.kind = Some(conversion);
                    format_float_spec(x, &spec)?
                }
                'c' => match &value {
                    Value::Str(s) if s.chars().count() == 1 => s.to_string(),
                    other => {
                        let code = other.as_int().ok_or_else(|| {
                            type_error("%c requires int or char")
                        })?;
                        u32::try_from(code)
                            .ok()
                            .and_then(char::from_u32)
                            .map(String::from)
                            .ok_or_else(|| value_error("%c arg not in range(0x110000)"))?
                    }
                },
                other => {
                    return Err(value_error(format!(
                        "unsupported format character '{}' (0x{:x})",
                        other, other as u32
                    )))
                }
            };
            out.push_str(&rendered);
        }

        if !mapping && next.next().is_some() {
            return Err(type_error(
                "not all arguments converted during string formatting",
            ));
        }
        self.check_sequence_len(out.len())?;
        Ok(out)
    }

    /// `template.format(*args, **kwargs)`
    pub(crate) fn str_format(
        &mut self,
        template: &str,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> ExecResult<String> {
        let mut auto_index = Some(0usize);
        let mut manual = false;
        let mut out = String::new();
        let chars: Vec<char> = template.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '}' {
                if chars.get(i + 1) == Some(&'}') {
                    out.push('}');
                    i += 2;
                    continue;
                }
                return Err(value_error("Single '}' encountered in format string"));
            }
            if c != '{' {
                out.push(c);
                i += 1;
                continue;
            }
            if chars.get(i + 1) == Some(&'{') {
                out.push('{');
                i += 2;
                continue;
            }

            let start = i + 1;
            let mut depth = 1;
            let mut end = start;
            while end < chars.len() {
                match chars[end] {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                end += 1;
            }
            if end >= chars.len() {
                return Err(value_error("Single '{' encountered in format string"));
            }
            let field: String = chars[start..end].iter().collect();
            i = end + 1;

            let (reference, spec) = match field.split_once(':') {
                Some((reference, spec)) => (reference, spec),
                None => (field.as_str(), ""),
            };
            let (reference, conversion) = match reference.split_once('!') {
                Some((reference, conversion)) => (reference, conversion.chars().next()),
                None => (reference, None),
            };

            let name_end = reference.find(['.', '[']).unwrap_or(reference.len());
            let (head, accessors) = reference.split_at(name_end);
            let mut value = if head.is_empty() {
                if manual {
                    return Err(value_error(
                        "cannot switch from manual field specification to automatic field numbering",
                    ));
                }
                let index = auto_index.unwrap_or(0);
                auto_index = Some(index + 1);
                positional(args, index)?
            } else if let Ok(index) = head.parse::<usize>() {
                if auto_index.is_some_and(|n| n > 0) {
                    return Err(value_error(
                        "cannot switch from automatic field numbering to manual field specification",
                    ));
                }
                manual = true;
                positional(args, index)?
            } else {
                kwargs
                    .iter()
                    .find(|(key, _)| key == head)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| key_error(Value::str(head)))?
            };
            value = self.apply_accessors(value, accessors)?;

            let value = match conversion {
                Some('r') => Value::str(self.repr_value(&value)?),
                Some('s') => Value::str(self.str_value(&value)?),
                Some(other) => {
                    return Err(value_error(format!(
                        "Unknown conversion specifier {}",
                        other
                    )))
                }
                None => value,
            };
            let spec = if spec.contains('{') {
                self.str_format(spec, args, kwargs)?
            } else {
                spec.to_string()
            };
            let rendered = self.format_value(&value, &spec)?;
            out.push_str(&rendered);
        }
        self.check_sequence_len(out.len())?;
        Ok(out)
    }

    /// `.attr` and `[key]` chains inside a `str.format` field
    fn apply_accessors(&mut self, mut value: Value, accessors: &str) -> ExecResult<Value> {
        let mut rest = accessors;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                value = self.get_attribute(&value, &after[..end])?;
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after
                    .find(']')
                    .ok_or_else(|| value_error("Missing ']' in format string"))?;
                let key = &after[..end];
                let index = match key.parse::<i64>() {
                    Ok(n) => Value::Int(n),
                    Err(_) => Value::str(key),
                };
                value = self.get_item(&value, &index)?;
                rest = &after[end + 1..];
            } else {
                return Err(value_error("Only '.' or '[' may follow ']' in format field specifier"));
            }
        }
        Ok(value)
    }
}

fn positional(args: &[Value], index: usize) -> ExecResult<Value> {
    args.get(index).cloned().ok_or_else(|| {
        index_error(format!(
            "Replacement index {} out of range for positional args tuple",
            index
        ))
    })
}

fn expect_str(method: &str, result: Value) -> ExecResult<String> {
    match result {
        Value::Str(text) => Ok(text.to_string()),
        other => Err(type_error(format!(
            "{} returned non-string (type {})",
            method,
            other.type_name()
        ))),
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

/// Parsed `[[fill]align][sign][#][0][width][grouping][.precision][type]`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormatSpec {
    pub fill: char,
    pub align: Option<char>,
    pub sign: char,
    pub alternate: bool,
    pub zero: bool,
    pub width: usize,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        FormatSpec {
            fill: ' ',
            align: None,
            sign: '-',
            alternate: false,
            zero: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

impl FormatSpec {
    pub(crate) fn parse(spec: &str) -> ExecResult<FormatSpec> {
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = FormatSpec::default();
        let mut i = 0;
        let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

        if chars.len() >= 2 && is_align(chars[1]) {
            parsed.fill = chars[0];
            parsed.align = Some(chars[1]);
            i = 2;
        } else if chars.first().copied().is_some_and(is_align) {
            parsed.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&sign @ ('+' | '-' | ' ')) = chars.get(i) {
            parsed.sign = sign;
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            parsed.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            parsed.zero = true;
            if parsed.align.is_none() {
                parsed.fill = '0';
                parsed.align = Some('=');
            }
            i += 1;
        }
        let digits_start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i > digits_start {
            let width: String = chars[digits_start..i].iter().collect();
            parsed.width = width.parse().map_err(|_| value_error("Too many decimal digits in format string"))?;
        }
        if let Some(&grouping @ (',' | '_')) = chars.get(i) {
            parsed.grouping = Some(grouping);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(char::is_ascii_digit) {
                i += 1;
            }
            if i == start {
                return Err(value_error("Format specifier missing precision"));
            }
            let precision: String = chars[start..i].iter().collect();
            parsed.precision = Some(
                precision
                    .parse()
                    .map_err(|_| value_error("Too many decimal digits in format string"))?,
            );
        }
        match &chars[i..] {
            [] => {}
            [kind] => parsed.kind = Some(*kind),
            _ => return Err(value_error("Invalid format specifier")),
        }
        Ok(parsed)
    }
}

fn format_text(text: &str, spec: &FormatSpec) -> ExecResult<String> {
    if let Some(kind) = spec.kind.filter(|k| *k != 's') {
        return Err(value_error(format!(
            "Unknown format code '{}' for object of type 'str'",
            kind
        )));
    }
    if spec.align == Some('=') {
        return Err(value_error(
            "'=' alignment not allowed in string format specifier",
        ));
    }
    if spec.sign != '-' {
        return Err(value_error("Sign not allowed in string format specifier"));
    }
    let text: String = match spec.precision {
        Some(precision) => text.chars().take(precision).collect(),
        None => text.to_string(),
    };
    Ok(pad(String::new(), text, spec, '<'))
}

fn format_int(n: i64, spec: &FormatSpec) -> ExecResult<String> {
    let kind = spec.kind.unwrap_or('d');
    if matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') {
        return format_float_spec(n as f64, spec);
    }
    if spec.precision.is_some() {
        return Err(value_error(
            "Precision not allowed in integer format specifier",
        ));
    }
    let magnitude = n.unsigned_abs();
    let digits = match kind {
        'd' | 'n' => magnitude.to_string(),
        'b' => format!("{:b}", magnitude),
        'o' => format!("{:o}", magnitude),
        'x' => format!("{:x}", magnitude),
        'X' => format!("{:X}", magnitude),
        'c' => {
            return u32::try_from(n)
                .ok()
                .and_then(char::from_u32)
                .map(|c| pad(String::new(), c.to_string(), spec, '<'))
                .ok_or_else(|| {
                    super::errors::overflow_error("%c arg not in range(0x110000)")
                })
        }
        other => {
            return Err(value_error(format!(
                "Unknown format code '{}' for object of type 'int'",
                other
            )))
        }
    };
    let digits = match spec.grouping {
        Some(separator) => {
            let group = if matches!(kind, 'd' | 'n') { 3 } else { 4 };
            group_digits(&digits, separator, group)
        }
        None => digits,
    };
    let prefix = if spec.alternate {
        match kind {
            'b' => "0b",
            'o' => "0o",
            'x' => "0x",
            'X' => "0X",
            _ => "",
        }
    } else {
        ""
    };
    let sign = sign_text(n < 0, spec.sign);
    Ok(pad(format!("{}{}", sign, prefix), digits, spec, '>'))
}

fn format_float_spec(x: f64, spec: &FormatSpec) -> ExecResult<String> {
    let kind = spec.kind;
    if let Some(kind) = kind {
        if !matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%' | 'n') {
            return Err(value_error(format!(
                "Unknown format code '{}' for object of type 'float'",
                kind
            )));
        }
    }
    let negative = x.is_sign_negative() && !x.is_nan();
    let magnitude = x.abs();
    let upper = kind.is_some_and(|k| k.is_ascii_uppercase());

    let body = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        let text = if upper { text.to_uppercase() } else { text.to_string() };
        if kind == Some('%') {
            format!("{}%", text)
        } else {
            text
        }
    } else {
        match kind {
            Some('f' | 'F') => format!("{:.*}", spec.precision.unwrap_or(6), magnitude),
            Some('%') => format!("{:.*}%", spec.precision.unwrap_or(6), magnitude * 100.0),
            Some('e' | 'E') => {
                let text = scientific(magnitude, spec.precision.unwrap_or(6));
                if upper {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            Some('g' | 'G' | 'n') => {
                let text = general(magnitude, spec.precision.unwrap_or(6), spec.alternate, false);
                if upper {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            _ => match spec.precision {
                Some(precision) => {
                    let text = general(magnitude, precision, false, true);
                    if text.contains(['.', 'e']) {
                        text
                    } else {
                        format!("{}.0", text)
                    }
                }
                None => format_float(magnitude),
            },
        }
    };

    let body = match spec.grouping {
        Some(separator) if magnitude.is_finite() => {
            let split = body.find(['.', 'e', '%']).unwrap_or(body.len());
            let (integer, rest) = body.split_at(split);
            format!("{}{}", group_digits(integer, separator, 3), rest)
        }
        _ => body,
    };
    let sign = sign_text(negative, spec.sign);
    Ok(pad(sign.to_string(), body, spec, '>'))
}

/// Python's `e` format: mantissa with `precision` decimals and a two-digit exponent
fn scientific(x: f64, precision: usize) -> String {
    let text = format!("{:.*e}", precision, x);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => text,
    }
}

/// Python's `g` format; the spec-less float format switches to exponent
/// notation one digit earlier
fn general(x: f64, precision: usize, keep_zeros: bool, plain: bool) -> String {
    let precision = precision.max(1);
    if x == 0.0 {
        return if keep_zeros {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    let rounded = format!("{:.*e}", precision - 1, x);
    let exponent: i64 = rounded
        .split_once('e')
        .and_then(|(_, exp)| exp.parse().ok())
        .unwrap_or(0);
    let threshold = if plain { precision as i64 - 1 } else { precision as i64 };
    let text = if exponent >= -4 && exponent < threshold {
        let decimals = (precision as i64 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, x)
    } else {
        scientific(x, precision - 1)
    };
    if keep_zeros {
        return text;
    }
    strip_fraction_zeros(&text)
}

fn strip_fraction_zeros(text: &str) -> String {
    let (mantissa, exponent) = match text.find('e') {
        Some(pos) => text.split_at(pos),
        None => (text, ""),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{}{}", mantissa, exponent)
}

fn group_digits(digits: &str, separator: char, group: usize) -> String {
    let count = digits.chars().count();
    let mut out = String::with_capacity(digits.len() + count / group);
    for (index, c) in digits.chars().enumerate() {
        if index > 0 && (count - index) % group == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

fn sign_text(negative: bool, sign: char) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, '+') => "+",
        (false, ' ') => " ",
        _ => "",
    }
}

/// Pad `prefix + body` to the spec's width; `=` pads between the two
fn pad(prefix: String, body: String, spec: &FormatSpec, default_align: char) -> String {
    let len = prefix.chars().count() + body.chars().count();
    if len >= spec.width {
        return format!("{}{}", prefix, body);
    }
    let fill_count = spec.width - len;
    let fill = |n: usize| spec.fill.to_string().repeat(n);
    match spec.align.unwrap_or(default_align) {
        '<' => format!("{}{}{}", prefix, body, fill(fill_count)),
        '^' => {
            let left = fill_count / 2;
            format!("{}{}{}{}", fill(left), prefix, body, fill(fill_count - left))
        }
        '=' => format!("{}{}{}", prefix, fill(fill_count), body),
        _ => format!("{}{}{}", fill(fill_count), prefix, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(text: &str) -> FormatSpec {
        FormatSpec::parse(text).unwrap()
    }

    #[test]
    fn test_spec_parsing() {
        let parsed = spec("*^10,.2f");
        assert_eq!(parsed.fill, '*');
        assert_eq!(parsed.align, Some('^'));
        assert_eq!(parsed.width, 10);
        assert_eq!(parsed.grouping, Some(','));
        assert_eq!(parsed.precision, Some(2));
        assert_eq!(parsed.kind, Some('f'));
        assert!(FormatSpec::parse("10xx").is_err());
    }

    #[test]
    fn test_integer_formats() {
        assert_eq!(format_int(42, &spec("5")).unwrap(), "   42");
        assert_eq!(format_int(-42, &spec("05")).unwrap(), "-0042");
        assert_eq!(format_int(255, &spec("#x")).unwrap(), "0xff");
        assert_eq!(format_int(1234567, &spec(",")).unwrap(), "1,234,567");
        assert_eq!(format_int(5, &spec("<3")).unwrap(), "5  ");
        assert_eq!(format_int(5, &spec("+")).unwrap(), "+5");
    }

    #[test]
    fn test_float_formats() {
        assert_eq!(format_float_spec(3.14159, &spec(".2f")).unwrap(), "3.14");
        assert_eq!(format_float_spec(0.5, &spec(".1%")).unwrap(), "50.0%");
        assert_eq!(format_float_spec(12345.678, &spec(".3e")).unwrap(), "1.235e+04");
        assert_eq!(format_float_spec(1234.5, &spec(",.1f")).unwrap(), "1,234.5");
        assert_eq!(format_float_spec(0.0001, &spec("g")).unwrap(), "0.0001");
        assert_eq!(format_float_spec(1e-5, &spec("g")).unwrap(), "1e-05");
        assert_eq!(format_float_spec(2.5, &spec("8.3f")).unwrap(), "   2.500");
        assert_eq!(format_float_spec(3.14159, &spec(".3")).unwrap(), "3.14");
        assert_eq!(format_float_spec(100.0, &spec(".3")).unwrap(), "1e+02");
    }

    #[test]
    fn test_text_formats() {
        assert_eq!(format_text("ab", &spec(">4")).unwrap(), "  ab");
        assert_eq!(format_text("abcdef", &spec(".3")).unwrap(), "abc");
        assert!(format_text("ab", &spec("d")).is_err());
    }
}
