//! 安全的四则运算求值器
//!
//! 只接受数字字面量（整数 / 小数）与 `+ - * / ( )`，支持一元正负号。
//! 求值分两步：先完整分词，任何标识符、函数调用或其他符号都在这一步被拒绝（`CalcError::Unsafe`），
//! 因此不安全的表达式永远不会进入求值；分词通过后再用递归下降解析并直接计算。
//!
//! 整数字面量按 i128 精确计算（溢出报 `CalcError::Overflow`）；出现小数字面量或除法结果不为整数时才退回 f64。

use std::fmt;

use thiserror::Error;

/// 表达式最大长度（字符数）
pub const MAX_EXPRESSION_CHARS: usize = 1024;
/// 括号 / 一元运算符最大嵌套深度，防止恶意输入导致栈溢出
pub const MAX_DEPTH: usize = 64;

/// 求值错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// 含有标识符、函数调用或不支持的符号
    #[error("unsupported token {0:?}: only numbers and + - * / ( ) are allowed")]
    Unsafe(String),

    #[error("empty expression")]
    Empty,

    #[error("expression longer than {MAX_EXPRESSION_CHARS} characters")]
    TooLong,

    #[error("expression nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("syntax error at position {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow: result does not fit in 128 bits")]
    Overflow,

    #[error("result is not a finite number")]
    NonFinite,
}

impl CalcError {
    /// 是否属于「不安全表达式」（而非语法 / 运算错误）
    pub fn is_unsafe(&self) -> bool {
        matches!(self, CalcError::Unsafe(_))
    }
}

/// 求值结果：整数精确表示，其余为 f64
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn checked_add(self, rhs: Number) -> Result<Number, CalcError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int).ok_or(CalcError::Overflow),
            (a, b) => Ok(Number::Float(a.as_f64() + b.as_f64())),
        }
    }

    fn checked_sub(self, rhs: Number) -> Result<Number, CalcError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int).ok_or(CalcError::Overflow),
            (a, b) => Ok(Number::Float(a.as_f64() - b.as_f64())),
        }
    }

    fn checked_mul(self, rhs: Number) -> Result<Number, CalcError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int).ok_or(CalcError::Overflow),
            (a, b) => Ok(Number::Float(a.as_f64() * b.as_f64())),
        }
    }

    /// 整除时保持整数，否则退回 f64
    fn checked_div(self, rhs: Number) -> Result<Number, CalcError> {
        if rhs.as_f64() == 0.0 {
            return Err(CalcError::DivisionByZero);
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) if a.checked_rem(b) == Some(0) => {
                a.checked_div(b).map(Number::Int).ok_or(CalcError::Overflow)
            }
            (a, b) => Ok(Number::Float(a.as_f64() / b.as_f64())),
        }
    }

    fn checked_neg(self) -> Result<Number, CalcError> {
        match self {
            Number::Int(i) => i.checked_neg().map(Number::Int).ok_or(CalcError::Overflow),
            Number::Float(f) => Ok(Number::Float(-f)),
        }
    }
}

/// 整数不带小数部分（7 而非 7.0），其余使用最短往返表示
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{}", i),
            // -0 也输出为 0
            Number::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", v as i64),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(Number),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

/// 数字字面量：不含小数点的按 i128 解析（超出范围报 Overflow），否则按 f64
fn parse_literal(literal: &str, pos: usize) -> Result<Number, CalcError> {
    if literal == "." {
        return Err(CalcError::Syntax {
            pos,
            message: "lone '.' is not a number".to_string(),
        });
    }
    if !literal.contains('.') {
        return literal.parse::<i128>().map(Number::Int).map_err(|_| CalcError::Overflow);
    }
    literal
        .parse::<f64>()
        .map(Number::Float)
        .map_err(|e| CalcError::Syntax {
            pos,
            message: format!("invalid number {:?}: {}", literal, e),
        })
}

/// 分词：返回 (token, 起始字符位置)；遇到任何非白名单字符立即返回 Unsafe
fn tokenize(expr: &str) -> Result<Vec<(Token, usize)>, CalcError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            _ if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => tokens.push((Token::Plus, start)),
            '-' => tokens.push((Token::Minus, start)),
            '*' => tokens.push((Token::Star, start)),
            '/' => tokens.push((Token::Slash, start)),
            '(' => tokens.push((Token::LParen, start)),
            ')' => tokens.push((Token::RParen, start)),
            _ if c.is_ascii_digit() || c == '.' => {
                let mut seen_dot = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '.' && !seen_dot)) {
                    if chars[i] == '.' {
                        seen_dot = true;
                    }
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push((Token::Number(parse_literal(&literal, start)?), start));
                continue;
            }
            _ if c.is_alphabetic() || c == '_' => {
                // 标识符整体报告，便于模型理解（如 "sqrt"、"__import__"）
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                return Err(CalcError::Unsafe(chars[start..i].iter().collect()));
            }
            _ => return Err(CalcError::Unsafe(c.to_string())),
        }
        i += 1;
    }

    Ok(tokens)
}

/// 递归下降解析器，解析同时计算结果
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, p)| *p).unwrap_or(self.end)
    }

    fn syntax(&self, message: impl Into<String>) -> CalcError {
        CalcError::Syntax {
            pos: self.position(),
            message: message.into(),
        }
    }

    fn enter(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut acc = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == Token::Plus { acc.checked_add(rhs)? } else { acc.checked_sub(rhs)? };
        }
        Ok(acc)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<Number, CalcError> {
        let mut acc = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            acc = if op == Token::Star { acc.checked_mul(rhs)? } else { acc.checked_div(rhs)? };
        }
        Ok(acc)
    }

    // factor := ('+' | '-') factor | primary
    fn factor(&mut self) -> Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.enter()?;
                let v = self.factor()?;
                self.leave();
                Ok(v)
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.enter()?;
                let v = self.factor()?;
                self.leave();
                v.checked_neg()
            }
            _ => self.primary(),
        }
    }

    // primary := NUMBER | '(' expr ')'
    fn primary(&mut self) -> Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                self.enter()?;
                let v = self.expr()?;
                self.leave();
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(v)
                    }
                    Some(t) => Err(self.syntax(format!("expected ')', found {}", t.describe()))),
                    None => Err(self.syntax("missing closing ')'")),
                }
            }
            Some(t) => Err(self.syntax(format!("expected a number or '(', found {}", t.describe()))),
            None => Err(self.syntax("unexpected end of expression")),
        }
    }
}

/// 求值表达式
pub fn evaluate(expr: &str) -> Result<Number, CalcError> {
    if expr.chars().count() > MAX_EXPRESSION_CHARS {
        return Err(CalcError::TooLong);
    }
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }

    let end = expr.chars().count();
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end,
    };
    let value = parser.expr()?;
    if let Some(t) = parser.peek() {
        return Err(parser.syntax(format!("unexpected {}", t.describe())));
    }
    if let Number::Float(f) = value {
        if !f.is_finite() {
            return Err(CalcError::NonFinite);
        }
    }
    Ok(value)
}

/// 求值并格式化为文本
pub fn evaluate_to_string(expr: &str) -> Result<String, CalcError> {
    evaluate(expr).map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(evaluate_to_string("3+4").unwrap(), "7");
        assert_eq!(evaluate_to_string("1991 - 1989").unwrap(), "2");
        assert_eq!(evaluate_to_string("6 * 7").unwrap(), "42");
        assert_eq!(evaluate_to_string("7 / 2").unwrap(), "3.5");
        assert_eq!(evaluate_to_string("6 / 2").unwrap(), "3");
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(evaluate_to_string("2 + 3 * 4").unwrap(), "14");
        assert_eq!(evaluate_to_string("(2 + 3) * 4").unwrap(), "20");
        assert_eq!(evaluate_to_string("(3+4)*5").unwrap(), "35");
        assert_eq!(evaluate_to_string("100 / 10 / 5").unwrap(), "2");
        assert_eq!(evaluate_to_string("10 - 4 - 3").unwrap(), "3");
        assert_eq!(evaluate_to_string("((1))").unwrap(), "1");
    }

    #[test]
    fn test_unary_and_decimals() {
        assert_eq!(evaluate_to_string("-3 + 5").unwrap(), "2");
        assert_eq!(evaluate_to_string("-(2 * 3)").unwrap(), "-6");
        assert_eq!(evaluate_to_string("2 * -3").unwrap(), "-6");
        assert_eq!(evaluate_to_string("--4").unwrap(), "4");
        assert_eq!(evaluate_to_string("1.5 * 2").unwrap(), "3");
        assert_eq!(evaluate_to_string(".5 + .25").unwrap(), "0.75");
        assert_eq!(evaluate_to_string("-0").unwrap(), "0");
    }

    #[test]
    fn test_rejects_identifiers_without_evaluating() {
        assert_eq!(
            evaluate("__import__('os')").unwrap_err(),
            CalcError::Unsafe("__import__".to_string())
        );
        assert!(evaluate("sqrt(4)").unwrap_err().is_unsafe());
        assert!(evaluate("1e5").unwrap_err().is_unsafe());
        assert!(evaluate("x + 1").unwrap_err().is_unsafe());
        // 即使前半部分合法、后面才出现字母，也不会求值
        assert!(evaluate("1 / 0 + a").unwrap_err().is_unsafe());
    }

    #[test]
    fn test_rejects_unsupported_symbols() {
        for expr in ["2 ** 3", "7 % 2", "2 ^ 3", "1, 2", "a = 1", "[1]", "1 // 2"] {
            let err = evaluate(expr).unwrap_err();
            if expr == "2 ** 3" || expr == "1 // 2" {
                // 由白名单运算符组成，但语法非法
                assert!(matches!(err, CalcError::Syntax { .. }), "{expr}: {err:?}");
            } else {
                assert!(err.is_unsafe(), "{expr}: {err:?}");
            }
        }
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(evaluate("").unwrap_err(), CalcError::Empty);
        assert_eq!(evaluate("   ").unwrap_err(), CalcError::Empty);
        assert!(matches!(evaluate("3+").unwrap_err(), CalcError::Syntax { .. }));
        assert!(matches!(evaluate("()").unwrap_err(), CalcError::Syntax { .. }));
        assert!(matches!(evaluate("(1 + 2").unwrap_err(), CalcError::Syntax { .. }));
        assert!(matches!(evaluate("1 + 2)").unwrap_err(), CalcError::Syntax { .. }));
        assert!(matches!(evaluate("1 2").unwrap_err(), CalcError::Syntax { .. }));
        assert!(matches!(evaluate("1.2.3").unwrap_err(), CalcError::Syntax { .. }));
        assert!(matches!(evaluate(".").unwrap_err(), CalcError::Syntax { .. }));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1 / 0").unwrap_err(), CalcError::DivisionByZero);
        assert_eq!(evaluate("1 / (2 - 2)").unwrap_err(), CalcError::DivisionByZero);
    }

    #[test]
    fn test_limits() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(evaluate(&deep).unwrap_err(), CalcError::TooDeep);
        let long = "1+".repeat(MAX_EXPRESSION_CHARS) + "1";
        assert_eq!(evaluate(&long).unwrap_err(), CalcError::TooLong);
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Number::Float(7.0).to_string(), "7");
        assert_eq!(Number::Float(-2.0).to_string(), "-2");
        assert_eq!(Number::Float(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Number::Float(1e20).to_string(), "100000000000000000000");
        assert_eq!(Number::Int(-42).to_string(), "-42");
    }

    #[test]
    fn test_integers_stay_exact_beyond_f64_precision() {
        assert_eq!(evaluate_to_string("123456789 * 987654321").unwrap(), "121932631112635269");
        assert_eq!(evaluate_to_string("9007199254740993 - 9007199254740992").unwrap(), "1");
        assert_eq!(
            evaluate("99999999999999999999 / 3").unwrap(),
            Number::Int(33333333333333333333)
        );
        assert_eq!(evaluate("7 / 2").unwrap(), Number::Float(3.5));
        assert_eq!(evaluate("1.5 * 2").unwrap(), Number::Float(3.0));
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        let big = i128::MAX.to_string();
        assert_eq!(evaluate(&format!("{big} + 1")).unwrap_err(), CalcError::Overflow);
        assert_eq!(evaluate(&format!("{big} * 2")).unwrap_err(), CalcError::Overflow);
        assert_eq!(evaluate(&format!("{big}0")).unwrap_err(), CalcError::Overflow);
        assert_eq!(evaluate(&format!("-{big} - 2")).unwrap_err(), CalcError::Overflow);
    }
}
