//! Restricted plotting script
//!
//! Models like to answer "draw a chart" with a few lines of matplotlib. This
//! module reads that text as data, never as code: it recognizes a small,
//! fixed vocabulary and turns it into a [`ChartSpec`].
//!
//! # Accepted input
//!
//! ```text
//! import matplotlib.pyplot as plt        # ignored
//! years = [1812, 1813, 1814]             # list literal
//! army = np.array([600, 400, 100])       # np.array / list / range / np.arange / np.linspace
//! plt.plot(years, army, 'o-', label="Франция")
//! plt.bar(["A", "B"], [1, 2])
//! plt.scatter(x, y)
//! plt.title("..."); plt.xlabel("..."); plt.ylabel("...")
//! plt.figure(figsize=(10, 6)); plt.legend(); plt.grid(True); plt.show()   # no-ops
//! ```
//!
//! Anything else (arithmetic, comprehensions, attribute access on data,
//! unknown functions) is rejected with the offending line number.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use super::{format_number, ChartSpec, ChartType, Series, MAX_POINTS};
use crate::types::AppError;

/// Lines starting with one of these end the script: what follows is prose.
const NARRATIVE_MARKERS: &[&str] = &[
    "explanation",
    "this code",
    "this chart",
    "note:",
    "output:",
    "пояснение",
    "объяснение",
    "этот код",
    "этот график",
    "примечание",
    "вывод:",
];

/// Brackets, calls and unary minus all count as one level
const MAX_NESTING: usize = 32;

const PLOT_PREFIXES: &[&str] = &["plt", "pyplot", "matplotlib.pyplot"];
const NUMPY_PREFIXES: &[&str] = &["np", "numpy"];

const NO_OP_CALLS: &[&str] = &[
    "figure",
    "legend",
    "grid",
    "tight_layout",
    "xticks",
    "yticks",
    "show",
    "close",
    "savefig",
    "subplots_adjust",
];

#[derive(Debug, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl From<ScriptError> for AppError {
    fn from(e: ScriptError) -> Self {
        AppError::Chart(format!("invalid chart script, {}", e))
    }
}

/// A marker word ends the script only as prose, not as a variable name
fn is_narrative_marker(lowered: &str) -> bool {
    NARRATIVE_MARKERS.iter().any(|marker| {
        let Some(rest) = lowered.strip_prefix(marker) else {
            return false;
        };
        if marker.ends_with(':') {
            return true;
        }
        match rest.chars().next() {
            None | Some(':') => true,
            Some(c) if c.is_whitespace() => !rest.trim_start().starts_with('='),
            Some(_) => false,
        }
    })
}

/// Clean model output down to the script itself.
///
/// Strips code fences and stray quote characters, cuts trailing narrative at
/// the first marker line, and drops trailing `show()` calls. Applying it twice
/// gives the same result as applying it once.
pub fn sanitize_script(code: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for line in code.trim().lines() {
        let trimmed = line.trim();
        if trimmed.trim_start_matches(['"', '\'']).starts_with("```") {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if is_narrative_marker(&lowered) {
            break;
        }
        if !trimmed.is_empty() && trimmed.chars().all(is_quote) {
            continue;
        }
        lines.push(line);
    }

    // Quotes wrapping the whole script
    let mut script = lines.join("\n").trim().to_string();
    loop {
        let stripped = strip_wrapping_quotes(&script);
        if stripped.len() == script.len() {
            break;
        }
        script = stripped.trim().to_string();
    }

    let mut lines: Vec<String> = script.lines().map(|l| l.trim_end().to_string()).collect();
    loop {
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let Some(last) = lines.last_mut() else { break };
        match strip_trailing_show(last) {
            Some(rest) if rest.trim().is_empty() => {
                lines.pop();
            }
            Some(rest) => *last = rest,
            None => break,
        }
    }

    lines.join("\n")
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`')
}

fn strip_wrapping_quotes(s: &str) -> &str {
    let first = s.chars().next();
    let last = s.chars().last();
    match (first, last) {
        (Some(a), Some(b)) if is_quote(a) && a == b && s.len() >= 2 => &s[1..s.len() - 1],
        (Some(a), _) if is_quote(a) && !s[1..].contains(a) => &s[1..],
        (_, Some(b)) if is_quote(b) && !s[..s.len() - 1].contains(b) => &s[..s.len() - 1],
        _ => s,
    }
}

/// If the line ends with a `show()` call, return the line without it
fn strip_trailing_show(line: &str) -> Option<String> {
    let trimmed = line.trim_end().trim_end_matches(';').trim_end();
    let without_call = trimmed.strip_suffix("show()")?;
    let prefix = PLOT_PREFIXES
        .iter()
        .find_map(|p| without_call.strip_suffix(&format!("{}.", p)))?;
    let prefix = prefix.trim_end();
    if prefix.is_empty() {
        return Some(String::new());
    }
    // Only as a separate statement on the same line
    prefix.strip_suffix(';').map(|p| p.trim_end().to_string())
}

/// Sanitize then parse a script into a chart spec
pub fn parse_script(code: &str) -> Result<ChartSpec, ScriptError> {
    let cleaned = sanitize_script(code);
    let tokens = tokenize(&cleaned)?;
    let statements = split_statements(tokens);

    let mut interpreter = Interpreter::default();
    for statement in statements {
        interpreter.run(statement)?;
    }
    interpreter.finish()
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(f64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
    Dot,
    Minus,
    Colon,
    Newline,
    Semicolon,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(&ch) = chars.peek() {
        let simple = match ch {
            '(' => Some(Tok::LParen),
            ')' => Some(Tok::RParen),
            '[' => Some(Tok::LBracket),
            ']' => Some(Tok::RBracket),
            ',' => Some(Tok::Comma),
            '=' => Some(Tok::Equals),
            '.' if !chars.clone().nth(1).is_some_and(|c| c.is_ascii_digit()) => Some(Tok::Dot),
            '-' => Some(Tok::Minus),
            ':' => Some(Tok::Colon),
            ';' => Some(Tok::Semicolon),
            '\n' => Some(Tok::Newline),
            _ => None,
        };

        if let Some(tok) = simple {
            chars.next();
            tokens.push(Token { tok, line });
            if ch == '\n' {
                line += 1;
            }
            continue;
        }

        if ch.is_whitespace() || ch == '+' {
            chars.next();
        } else if ch == '#' {
            while chars.peek().is_some_and(|c| *c != '\n') {
                chars.next();
            }
        } else if ch == '"' || ch == '\'' {
            let value = read_string(&mut chars, line)?;
            tokens.push(Token { tok: Tok::Str(value), line });
        } else if ch.is_ascii_digit() || ch == '.' {
            let value = read_number(&mut chars, line)?;
            tokens.push(Token { tok: Tok::Num(value), line });
        } else if ch.is_alphabetic() || ch == '_' {
            let mut ident = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token { tok: Tok::Ident(ident), line });
        } else {
            return Err(ScriptError::new(line, format!("unexpected character '{}'", ch)));
        }
    }

    Ok(tokens)
}

fn read_string(chars: &mut Peekable<Chars<'_>>, line: usize) -> Result<String, ScriptError> {
    let quote = chars.next().unwrap_or('"');
    let mut value = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => return Ok(value),
            Some('\\') => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => break,
            },
            Some('\n') | None => break,
            Some(c) => value.push(c),
        }
    }
    Err(ScriptError::new(line, "unterminated string literal"))
}

fn read_number(chars: &mut Peekable<Chars<'_>>, line: usize) -> Result<f64, ScriptError> {
    let mut text = String::new();
    let mut prev = ' ';
    while let Some(&c) = chars.peek() {
        let exponent_sign = (c == '-' || c == '+') && (prev == 'e' || prev == 'E');
        if c.is_ascii_digit() || c == '.' || c == '_' || c == 'e' || c == 'E' || exponent_sign {
            if c != '_' {
                text.push(c);
            }
            prev = c;
            chars.next();
        } else {
            break;
        }
    }
    text.parse::<f64>()
        .map_err(|_| ScriptError::new(line, format!("invalid number '{}'", text)))
}

/// Split at newlines and semicolons outside brackets
fn split_statements(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    let mut depth: i32 = 0;

    for token in tokens {
        match token.tok {
            Tok::LParen | Tok::LBracket => depth += 1,
            Tok::RParen | Tok::RBracket => depth -= 1,
            Tok::Newline if depth > 0 => continue,
            Tok::Newline | Tok::Semicolon => {
                if !current.is_empty() {
                    statements.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(token);
    }
    if !current.is_empty() {
        statements.push(current);
    }
    statements
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(f64),
    Str(String),
    List(Vec<Expr>),
    Var(String),
    Neg(Box<Expr>),
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    name: String,
    args: Vec<Expr>,
    kwargs: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Skip,
    Assign(String, Expr),
    Call(Call),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let line = tokens.first().map(|t| t.line).unwrap_or(1);
        Self { tokens, pos: 0, line, depth: 0 }
    }

    fn err(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::new(self.line, message)
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|t| &t.tok)
    }

    fn next(&mut self) -> Option<Tok> {
        let token = self.tokens.get(self.pos)?;
        self.line = token.line;
        self.pos += 1;
        Some(token.tok.clone())
    }

    fn statement(&mut self) -> Result<Statement, ScriptError> {
        if let Some(Tok::Ident(word)) = self.peek() {
            if word == "import" || word == "from" {
                return Ok(Statement::Skip);
            }
        }

        if let (Some(Tok::Ident(name)), Some(Tok::Equals)) = (self.peek(), self.peek_at(1)) {
            let name = name.clone();
            self.pos += 2;
            let value = self.expr()?;
            self.end()?;
            return Ok(Statement::Assign(name, value));
        }

        match self.expr()? {
            Expr::Call(call) => {
                self.end()?;
                Ok(Statement::Call(call))
            }
            _ => Err(self.err("expected a plotting call or an assignment")),
        }
    }

    fn end(&mut self) -> Result<(), ScriptError> {
        match self.next() {
            None => Ok(()),
            Some(tok) => Err(self.err(format!("unexpected {:?} after statement", tok))),
        }
    }

    fn dotted_name(&mut self, first: String) -> Result<String, ScriptError> {
        let mut name = first;
        while self.peek() == Some(&Tok::Dot) {
            self.next();
            match self.next() {
                Some(Tok::Ident(part)) => {
                    name.push('.');
                    name.push_str(&part);
                }
                _ => return Err(self.err("expected a name after '.'")),
            }
        }
        Ok(name)
    }

    fn expr(&mut self) -> Result<Expr, ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(self.err(format!("expression nested deeper than {} levels", MAX_NESTING)));
        }
        self.depth += 1;
        let expr = self.primary();
        self.depth -= 1;
        expr
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(Expr::Num(n)),
            Some(Tok::Str(s)) => Ok(Expr::Str(s)),
            Some(Tok::Minus) => Ok(Expr::Neg(Box::new(self.expr()?))),
            Some(Tok::LBracket) => Ok(Expr::List(self.sequence(Tok::RBracket)?)),
            Some(Tok::LParen) => {
                let mut items = self.sequence(Tok::RParen)?;
                if items.len() == 1 {
                    Ok(items.remove(0))
                } else {
                    Ok(Expr::List(items))
                }
            }
            Some(Tok::Ident(first)) => {
                let name = self.dotted_name(first)?;
                if self.peek() == Some(&Tok::LParen) {
                    self.next();
                    Ok(Expr::Call(self.call_args(name)?))
                } else if self.peek() == Some(&Tok::LBracket) {
                    Err(self.err(format!("indexing '{}' is not supported", name)))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(tok) => Err(self.err(format!("unexpected {:?}", tok))),
            None => Err(self.err("unexpected end of statement")),
        }
    }

    fn sequence(&mut self, close: Tok) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&close) {
                self.next();
                return Ok(items);
            }
            items.push(self.expr()?);
            match self.next() {
                Some(Tok::Comma) => continue,
                Some(tok) if tok == close => return Ok(items),
                Some(Tok::Ident(word)) if word == "for" => {
                    return Err(self.err("comprehensions are not supported"))
                }
                Some(tok) => return Err(self.err(format!("unexpected {:?} in sequence", tok))),
                None => return Err(self.err("unclosed bracket")),
            }
        }
    }

    fn call_args(&mut self, name: String) -> Result<Call, ScriptError> {
        let mut call = Call { name, args: Vec::new(), kwargs: Vec::new() };
        loop {
            if self.peek() == Some(&Tok::RParen) {
                self.next();
                return Ok(call);
            }
            if let (Some(Tok::Ident(key)), Some(Tok::Equals)) = (self.peek(), self.peek_at(1)) {
                let key = key.clone();
                self.pos += 2;
                let value = self.expr()?;
                call.kwargs.push((key, value));
            } else {
                if !call.kwargs.is_empty() {
                    return Err(self.err("positional argument after keyword argument"));
                }
                let value = self.expr()?;
                call.args.push(value);
            }
            match self.next() {
                Some(Tok::Comma) => continue,
                Some(Tok::RParen) => return Ok(call),
                Some(tok) => return Err(self.err(format!("unexpected {:?} in arguments", tok))),
                None => return Err(self.err("unclosed call")),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Num(f64),
    Str(String),
    List(Vec<Value>),
}

#[derive(Default)]
struct Interpreter {
    vars: HashMap<String, Value>,
    spec: ChartSpec,
    chart_type: Option<ChartType>,
    line: usize,
}

impl Interpreter {
    fn err(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::new(self.line, message)
    }

    fn run(&mut self, tokens: Vec<Token>) -> Result<(), ScriptError> {
        let mut parser = Parser::new(tokens);
        self.line = parser.line;
        match parser.statement()? {
            Statement::Skip => Ok(()),
            Statement::Assign(name, expr) => {
                let value = self.eval(&expr)?;
                self.vars.insert(name, value);
                Ok(())
            }
            Statement::Call(call) => self.plot_call(&call),
        }
    }

    fn finish(mut self) -> Result<ChartSpec, ScriptError> {
        if self.spec.series.is_empty() {
            return Err(self.err("script does not plot any data"));
        }
        self.spec.chart_type = self.chart_type.unwrap_or_default();
        Ok(self.spec)
    }

    fn plot_call(&mut self, call: &Call) -> Result<(), ScriptError> {
        let Some((prefix, function)) = call.name.rsplit_once('.') else {
            return Err(self.err(format!("unsupported call '{}'", call.name)));
        };
        if !PLOT_PREFIXES.contains(&prefix) {
            return Err(self.err(format!("unsupported call '{}'", call.name)));
        }

        match function {
            "plot" => self.add_series(call, ChartType::Line),
            "scatter" => self.add_series(call, ChartType::Scatter),
            "bar" => self.add_series(call, ChartType::Bar),
            "title" | "suptitle" => {
                self.spec.title = Some(self.text_arg(call)?);
                Ok(())
            }
            "xlabel" => {
                self.spec.x_label = Some(self.text_arg(call)?);
                Ok(())
            }
            "ylabel" => {
                self.spec.y_label = Some(self.text_arg(call)?);
                Ok(())
            }
            f if NO_OP_CALLS.contains(&f) => Ok(()),
            other => Err(self.err(format!("unsupported plotting function '{}'", other))),
        }
    }

    fn text_arg(&self, call: &Call) -> Result<String, ScriptError> {
        match call.args.first().map(|e| self.eval(e)).transpose()? {
            Some(Value::Str(s)) => Ok(s),
            Some(Value::Num(n)) => Ok(format_number(n)),
            _ => Err(self.err(format!("{} expects a text argument", call.name))),
        }
    }

    fn add_series(&mut self, call: &Call, chart_type: ChartType) -> Result<(), ScriptError> {
        let chart_type = *self.chart_type.get_or_insert(chart_type);

        // A trailing format string ('o-', 'r--') carries only styling
        let data: Vec<Value> = call
            .args
            .iter()
            .map(|e| self.eval(e))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|v| !matches!(v, Value::Str(_)))
            .collect();

        let (x_value, y_value) = match data.as_slice() {
            [y] => (None, y.clone()),
            [x, y, ..] => (Some(x.clone()), y.clone()),
            [] => return Err(self.err(format!("{} needs data", call.name))),
        };

        let y = self.numbers(&y_value)?;
        let mut x = Vec::new();
        if let Some(x_value) = x_value {
            match self.labels_or_numbers(&x_value)? {
                Axis::Numbers(values) => x = values,
                Axis::Labels(labels) => {
                    if chart_type != ChartType::Bar {
                        return Err(self.err("text x values are only supported for bar charts"));
                    }
                    self.spec.categories = labels;
                }
            }
        }
        if chart_type == ChartType::Bar && self.spec.categories.is_empty() && !x.is_empty() {
            self.spec.categories = x.iter().map(|v| format_number(*v)).collect();
        }
        if chart_type == ChartType::Bar {
            x.clear();
        }

        let name = call
            .kwargs
            .iter()
            .find(|(k, _)| k == "label")
            .map(|(_, e)| self.eval(e))
            .transpose()?
            .and_then(|v| match v {
                Value::Str(s) => Some(s),
                _ => None,
            });

        self.spec.series.push(Series { name, x, y });
        Ok(())
    }

    fn numbers(&self, value: &Value) -> Result<Vec<f64>, ScriptError> {
        match value {
            Value::Num(n) => Ok(vec![*n]),
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::Num(n) => Ok(*n),
                    _ => Err(self.err("expected a list of numbers")),
                })
                .collect(),
            Value::Str(_) => Err(self.err("expected numbers, found text")),
        }
    }

    fn labels_or_numbers(&self, value: &Value) -> Result<Axis, ScriptError> {
        match value {
            Value::List(items) if items.iter().any(|v| matches!(v, Value::Str(_))) => Ok(Axis::Labels(
                items
                    .iter()
                    .map(|v| match v {
                        Value::Str(s) => s.clone(),
                        Value::Num(n) => format_number(*n),
                        Value::List(_) => String::new(),
                    })
                    .collect(),
            )),
            other => self.numbers(other).map(Axis::Numbers),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Num(n) => Ok(Value::Num(-n)),
                _ => Err(self.err("'-' applies only to numbers")),
            },
            Expr::List(items) => Ok(Value::List(
                items.iter().map(|e| self.eval(e)).collect::<Result<_, _>>()?,
            )),
            Expr::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| self.err(format!("unknown name '{}'", name))),
            Expr::Call(call) => self.eval_call(call),
        }
    }

    fn eval_call(&self, call: &Call) -> Result<Value, ScriptError> {
        let function = match call.name.rsplit_once('.') {
            Some((prefix, f)) if NUMPY_PREFIXES.contains(&prefix) => f,
            Some(_) => return Err(self.err(format!("unsupported call '{}'", call.name))),
            None => call.name.as_str(),
        };

        let args: Vec<Value> = call.args.iter().map(|e| self.eval(e)).collect::<Result<_, _>>()?;
        let num = |idx: usize| -> Result<f64, ScriptError> {
            match args.get(idx) {
                Some(Value::Num(n)) => Ok(*n),
                _ => Err(self.err(format!("{} expects numeric arguments", call.name))),
            }
        };

        match function {
            "array" | "list" | "asarray" => match args.first() {
                Some(v @ Value::List(_)) => Ok(v.clone()),
                _ => Err(self.err(format!("{} expects a list", call.name))),
            },
            "range" | "arange" => {
                let (start, stop, step) = match args.len() {
                    1 => (0.0, num(0)?, 1.0),
                    2 => (num(0)?, num(1)?, 1.0),
                    3 => (num(0)?, num(1)?, num(2)?),
                    _ => return Err(self.err(format!("{} takes 1 to 3 arguments", call.name))),
                };
                if step == 0.0 {
                    return Err(self.err("range step must not be zero"));
                }
                let count = ((stop - start) / step).ceil();
                if !count.is_finite() || count > MAX_POINTS as f64 {
                    return Err(self.err("range is too large"));
                }
                let count = count.max(0.0) as usize;
                Ok(Value::List((0..count).map(|i| Value::Num(start + step * i as f64)).collect()))
            }
            "linspace" => {
                let (start, stop) = (num(0)?, num(1)?);
                let count = if args.len() > 2 { num(2)? } else { 50.0 };
                if count < 0.0 || count > MAX_POINTS as f64 {
                    return Err(self.err("linspace count out of range"));
                }
                let count = count as usize;
                let step = if count > 1 { (stop - start) / (count - 1) as f64 } else { 0.0 };
                Ok(Value::List((0..count).map(|i| Value::Num(start + step * i as f64)).collect()))
            }
            _ => Err(self.err(format!("unsupported function '{}'", call.name))),
        }
    }
}

enum Axis {
    Numbers(Vec<f64>),
    Labels(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_plot() {
        let spec = parse_script("plt.plot([1,2,3])").unwrap();
        assert_eq!(spec.chart_type, ChartType::Line);
        assert_eq!(spec.series.len(), 1);
        assert_eq!(spec.series[0].y, vec![1.0, 2.0, 3.0]);
        assert!(spec.series[0].x.is_empty());
    }

    #[test]
    fn test_trailing_show_is_stripped() {
        assert_eq!(sanitize_script("plt.plot([1,2,3])\nplt.show()"), "plt.plot([1,2,3])");
        assert_eq!(sanitize_script("plt.plot([1,2,3]); plt.show();"), "plt.plot([1,2,3])");
        assert!(parse_script("plt.plot([1,2,3])\nplt.show()").is_ok());
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "```python\nimport matplotlib.pyplot as plt\nplt.plot([1, 2])\nplt.show()\n```\nExplanation: the chart shows growth.",
            "\"plt.bar(['a', 'b'], [3, 4])\"",
            "plt.plot([1]); plt.show()\nplt.show()\n\n",
            "'plt.title(\"x\")",
        ];
        for input in inputs {
            let once = sanitize_script(input);
            assert_eq!(sanitize_script(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_sanitize_cuts_narrative_and_quotes() {
        let raw = "\"```python\nplt.plot([1, 2, 3])\n```\nПояснение: график показывает рост армии.\"";
        assert_eq!(sanitize_script(raw), "plt.plot([1, 2, 3])");
    }

    #[test]
    fn test_full_script_with_variables() {
        let script = r#"
import matplotlib.pyplot as plt
import numpy as np

years = [1812, 1813,
         1814]
army = np.array([600, 400, 100])  # thousands
plt.figure(figsize=(10, 6))
plt.plot(years, army, 'o-', label="Grande Armée", color='blue')
plt.title("Численность армии")
plt.xlabel('Год'); plt.ylabel("Тыс. человек")
plt.grid(True)
plt.legend()
plt.show()
"#;
        let spec = parse_script(script).unwrap();
        assert_eq!(spec.title.as_deref(), Some("Численность армии"));
        assert_eq!(spec.x_label.as_deref(), Some("Год"));
        assert_eq!(spec.y_label.as_deref(), Some("Тыс. человек"));
        assert_eq!(spec.series[0].name.as_deref(), Some("Grande Armée"));
        assert_eq!(spec.series[0].x, vec![1812.0, 1813.0, 1814.0]);
        assert_eq!(spec.series[0].y, vec![600.0, 400.0, 100.0]);
    }

    #[test]
    fn test_bar_with_text_categories() {
        let spec = parse_script("plt.bar(['Россия', 'Франция'], [1.5, -2e3])").unwrap();
        assert_eq!(spec.chart_type, ChartType::Bar);
        assert_eq!(spec.categories, vec!["Россия".to_string(), "Франция".to_string()]);
        assert_eq!(spec.series[0].y, vec![1.5, -2000.0]);
        assert!(spec.series[0].x.is_empty());
    }

    #[test]
    fn test_ranges() {
        let spec = parse_script("x = range(1, 4)\nplt.scatter(x, np.linspace(0, 1, 3))").unwrap();
        assert_eq!(spec.chart_type, ChartType::Scatter);
        assert_eq!(spec.series[0].x, vec![1.0, 2.0, 3.0]);
        assert_eq!(spec.series[0].y, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_rejects_code_outside_vocabulary() {
        let err = parse_script("import os\nos.system('rm -rf /')").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unsupported call"));

        assert!(parse_script("plt.plot([x**2 for x in range(3)])").is_err());
        assert!(parse_script("plt.plot(data)").unwrap_err().message.contains("unknown name"));
        assert!(parse_script("plt.title('no data')").is_err());
    }

    #[test]
    fn test_marker_word_as_variable_is_kept() {
        let script = "explanation = [1, 2]\nplt.plot(explanation)\nExplanation: two points";
        assert_eq!(sanitize_script(script), "explanation = [1, 2]\nplt.plot(explanation)");
        let spec = parse_script(script).unwrap();
        assert_eq!(spec.series[0].y, vec![1.0, 2.0]);

        assert_eq!(sanitize_script("plt.plot([1])\nThis code draws a line"), "plt.plot([1])");
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("plt.plot({}1{})", "[".repeat(5_000), "]".repeat(5_000));
        let err = parse_script(&nested).unwrap_err();
        assert!(err.message.contains("nested deeper"));

        let negated = format!("plt.plot([{}1])", "-".repeat(5_000));
        assert!(parse_script(&negated).unwrap_err().message.contains("nested deeper"));

        let shallow = format!("plt.plot([{}1])", "-".repeat(4));
        assert_eq!(parse_script(&shallow).unwrap().series[0].y, vec![1.0]);
    }

    #[test]
    fn test_script_error_converts_to_chart_error() {
        let err: AppError = parse_script("exec('x')").unwrap_err().into();
        assert!(matches!(err, AppError::Chart(_)));
    }
}
