use tracing::debug;

use crate::action::{Action, Valuable};
use crate::condition::{Condition, Logic, Operator};
use crate::error::ParseError;
use crate::path::KeyPath;
use crate::scan::{find_top_level, split_args, unquote, unwrap_group, Cursor};
use crate::tree::Node;

/// Parse a whole script. Blank lines and `#` comments are skipped; the
/// first bad line fails the script.
pub fn parse(input: &str) -> Result<Vec<Action>, ParseError> {
    let mut actions = Vec::new();
    for (i, raw) in input.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let action = parse_action(line).map_err(|err| err.at_line(i + 1, line))?;
        debug!(line = i + 1, action = %action, "parsed");
        actions.push(action);
    }
    Ok(actions)
}

// ── Actions ─────────────────────────────────────────────────────────

/// Parse one `[IF <condition> THEN] METHOD(args)` line.
pub fn parse_action(line: &str) -> Result<Action, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::syntax_error("empty action"));
    }

    let Some(rest) = line.strip_prefix("IF ") else {
        return parse_call_action(line);
    };
    let mut cursor = Cursor::new(rest);
    let condition = cursor.take_until_top_level(" THEN ").ok_or_else(|| {
        ParseError::new("rule-missing-then", "expected ` THEN ` after IF condition")
    })?;
    cursor.eat_str(" THEN ");
    let condition = parse_condition(condition)?;
    let action = parse_call_action(cursor.remaining().trim())?;
    Ok(Action::Conditional {
        condition,
        action: Box::new(action),
    })
}

fn parse_call_action(expression: &str) -> Result<Action, ParseError> {
    let (method, args) = split_call(expression)?;
    match method {
        "DELETE" => {
            expect_args(method, &args, 1)?;
            Ok(Action::Delete(parse_key(args[0])?))
        }
        "SET" => {
            expect_args(method, &args, 2)?;
            Ok(Action::Set {
                key: parse_key(args[0])?,
                value: parse_valuable(args[1])?,
            })
        }
        // Older spelling of SET(key, VALUE_OF(source)).
        "SET_WITH_VALUE_OF" => {
            expect_args(method, &args, 2)?;
            Ok(Action::Set {
                key: parse_key(args[0])?,
                value: Valuable::ValueOf(parse_key(args[1])?),
            })
        }
        "REPLACE_PART" => {
            expect_args(method, &args, 3)?;
            Ok(Action::ReplacePart {
                key: parse_key(args[0])?,
                old: unquote(args[1]).to_string(),
                new: unquote(args[2]).to_string(),
            })
        }
        "TRIM_PREFIX" => {
            expect_args(method, &args, 2)?;
            Ok(Action::TrimPrefix {
                key: parse_key(args[0])?,
                prefix: parse_valuable(args[1])?,
            })
        }
        "TRIM_SUFFIX" => {
            expect_args(method, &args, 2)?;
            Ok(Action::TrimSuffix {
                key: parse_key(args[0])?,
                suffix: parse_valuable(args[1])?,
            })
        }
        "PRINT" => {
            expect_args(method, &args, 1)?;
            Ok(Action::Print(parse_key(args[0])?))
        }
        "REMOVE" => {
            expect_args(method, &args, 0)?;
            Ok(Action::MarkRemoved)
        }
        _ => Err(ParseError::unknown_method(method)),
    }
}

/// Split `METHOD(a, b)` into the method name and trimmed arguments.
fn split_call(expression: &str) -> Result<(&str, Vec<&str>), ParseError> {
    let open = expression.find('(');
    match open {
        Some(open) if expression.ends_with(')') && open < expression.len() - 1 => Ok((
            &expression[..open],
            split_args(&expression[open + 1..expression.len() - 1]),
        )),
        _ => Err(ParseError::syntax_error(format!(
            "expected METHOD(args), found `{}`",
            expression
        ))),
    }
}

fn expect_args(method: &str, args: &[&str], count: usize) -> Result<(), ParseError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(ParseError::argument_count(method, count, args.len()))
    }
}

/// Keys may be written in double quotes.
fn parse_key(arg: &str) -> Result<KeyPath, ParseError> {
    let key = unquote(arg);
    KeyPath::parse(key).map_err(|err| ParseError::invalid_key(key, &err))
}

fn parse_valuable(arg: &str) -> Result<Valuable, ParseError> {
    let arg = arg.trim();
    let Some(inner) = arg.strip_prefix("VALUE_OF(") else {
        return Ok(Valuable::Literal(parse_literal(arg)));
    };
    let inner = inner.strip_suffix(')').ok_or_else(|| {
        ParseError::syntax_error(format!("unclosed VALUE_OF in `{}`", arg))
    })?;
    Ok(Valuable::ValueOf(parse_key(inner.trim())?))
}

/// Quoted text stays a string; otherwise integers and floats are
/// recognized and anything else is a bare string.
fn parse_literal(arg: &str) -> Node {
    if arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"') {
        return Node::from(&arg[1..arg.len() - 1]);
    }
    if let Ok(i) = arg.parse::<i64>() {
        return Node::Int(i);
    }
    if arg.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = arg.parse::<f64>() {
            return Node::Float(f);
        }
    }
    Node::from(arg)
}

// ── Conditions ──────────────────────────────────────────────────────

/// Parse a condition. `&&` and `||` bind equally and fold left to right;
/// parentheses group.
pub fn parse_condition(expression: &str) -> Result<Condition, ParseError> {
    let expression = unwrap_group(expression, '(', ')');
    if expression.is_empty() {
        return Err(ParseError::syntax_error("empty condition"));
    }
    if !expression.starts_with('(') && find_logic(expression).is_none() {
        return parse_simple_condition(expression);
    }

    let mut cursor = Cursor::new(expression);
    let mut condition = parse_condition(next_operand(&mut cursor)?)?;
    loop {
        cursor.skip_ws();
        if cursor.is_at_end() {
            return Ok(condition);
        }
        let logic = if cursor.eat_str("&&") {
            Logic::And
        } else if cursor.eat_str("||") {
            Logic::Or
        } else {
            return Err(ParseError::syntax_error(format!(
                "expected && or || before `{}`",
                cursor.remaining()
            )));
        };
        cursor.skip_ws();
        if cursor.is_at_end() {
            return Err(ParseError::syntax_error(format!(
                "missing condition after {}",
                logic.symbol()
            )));
        }
        let right = parse_condition(next_operand(&mut cursor)?)?;
        condition = Condition::combine(condition, logic, right);
    }
}

/// The next parenthesized group, or the text up to the next `&&`/`||`.
fn next_operand<'a>(cursor: &mut Cursor<'a>) -> Result<&'a str, ParseError> {
    cursor.skip_ws();
    if cursor.starts_with("&&") || cursor.starts_with("||") {
        return Err(ParseError::syntax_error(format!(
            "condition cannot start with an operator: `{}`",
            cursor.remaining()
        )));
    }
    if cursor.peek_char() == Some('(') {
        return cursor.take_group('(', ')').ok_or_else(|| {
            ParseError::new(
                "rule-unbalanced-parentheses",
                format!("unbalanced parentheses in `{}`", cursor.input()),
            )
        });
    }
    let rest = cursor.remaining();
    let end = find_logic(rest).map_or(rest.len(), |(offset, _)| offset);
    cursor.advance(end);
    Ok(rest[..end].trim())
}

/// The first `&&` or `||` outside quotes and parentheses.
fn find_logic(s: &str) -> Option<(usize, Logic)> {
    let and = find_top_level(s, "&&").map(|i| (i, Logic::And));
    let or = find_top_level(s, "||").map(|i| (i, Logic::Or));
    match (and, or) {
        (Some(a), Some(o)) => Some(if a.0 < o.0 { a } else { o }),
        (a, o) => a.or(o),
    }
}

fn parse_simple_condition(expression: &str) -> Result<Condition, ParseError> {
    let open = expression.find('(').ok_or_else(|| {
        ParseError::syntax_error(format!("expected a condition, found `{}`", expression))
    })?;
    let method = &expression[..open];
    match method {
        "VALUE_OF" | "LENGTH_OF" => parse_comparison(method, expression, open),
        "EXISTS" | "NOT_EXISTS" => {
            let (_, args) = split_call(expression)?;
            expect_args(method, &args, 1)?;
            let key = parse_key(args[0])?;
            Ok(if method == "EXISTS" {
                Condition::Exists(key)
            } else {
                Condition::not_exists(key)
            })
        }
        "HAS_PREFIX" | "HAS_SUFFIX" => {
            let (_, args) = split_call(expression)?;
            expect_args(method, &args, 2)?;
            let key = parse_key(args[0])?;
            let literal = unquote(args[1]).to_string();
            Ok(if method == "HAS_PREFIX" {
                Condition::HasPrefix {
                    key,
                    prefix: literal,
                }
            } else {
                Condition::HasSuffix {
                    key,
                    suffix: literal,
                }
            })
        }
        _ => Err(ParseError::unknown_method(method)),
    }
}

/// `VALUE_OF(key) <op> literal` or `LENGTH_OF(key) <op> n`.
fn parse_comparison(method: &str, expression: &str, open: usize) -> Result<Condition, ParseError> {
    let mut cursor = Cursor::new(expression);
    cursor.advance(open);
    let call = cursor.take_group('(', ')').ok_or_else(|| {
        ParseError::new(
            "rule-unbalanced-parentheses",
            format!("unbalanced parentheses in `{}`", expression),
        )
    })?;
    let args = split_args(&call[1..call.len() - 1]);
    expect_args(method, &args, 1)?;
    let key = parse_key(args[0])?;

    cursor.skip_ws();
    let operator = Operator::ALL
        .into_iter()
        .find(|op| cursor.eat_str(op.symbol()))
        .ok_or_else(|| {
            ParseError::new(
                "rule-invalid-operator",
                format!("expected a comparison operator in `{}`", expression),
            )
        })?;
    let literal = unquote(cursor.remaining());

    if method == "VALUE_OF" {
        return Ok(Condition::ValueOf {
            key,
            operator,
            value: literal.to_string(),
        });
    }
    let length = literal.parse::<i64>().map_err(|_| {
        ParseError::new(
            "rule-invalid-literal",
            format!("LENGTH_OF needs an integer, found `{}`", literal),
        )
    })?;
    Ok(Condition::LengthOf {
        key,
        operator,
        length,
    })
}
