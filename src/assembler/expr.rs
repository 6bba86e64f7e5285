//! A small Pratt evaluator for the arithmetic used by `@expr` and `@line`.
//!
//! Supports integer literals, `+ - * /` and parentheses. Values are
//! carried as `f64` so division behaves like true division; the final
//! result is truncated toward zero.
use super::error::ExprError;
use super::lexer::Token;

/// Evaluate an arithmetic expression to a single integer.
pub fn evaluate(text: &str) -> Result<i64, ExprError> {
    let tokens = tokenize(text)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let ast = parser.parse()?;
    let value = ast.eval();

    if !value.is_finite() {
        return Err(ExprError::NonFinite);
    }
    trace!("evaluated `{}` to {}", text.trim(), value);
    Ok(value.trunc() as i64)
}

#[derive(Clone, PartialEq, Debug)]
enum Node {
    Atom(i64),
    Binary(char, Box<Node>, Box<Node>),
}

impl Node {
    fn eval(&self) -> f64 {
        match self {
            Node::Atom(v) => *v as f64,
            Node::Binary(op, left, right) => {
                let (l, r) = (left.eval(), right.eval());
                match op {
                    '+' => l + r,
                    '-' => l - r,
                    '*' => l * r,
                    // The parser only builds nodes for operators with a binding power.
                    _ => l / r,
                }
            }
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut tokens = Vec::with_capacity(chars.len() + 1);
    let mut pos = 0;

    while pos < chars.len() {
        if chars[pos].is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let digits: String = chars[start..pos].iter().collect();
            match digits.parse::<i64>() {
                Ok(v) => tokens.push(Token::Int(v)),
                Err(_) => return Err(ExprError::LiteralOverflow(digits)),
            }
        } else {
            tokens.push(Token::Op(chars[pos]));
            pos += 1;
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn parse(&mut self) -> Result<Node, ExprError> {
        let node = self.expression(0)?;
        match self.peek() {
            Token::Eof => Ok(node),
            tok => Err(ExprError::TrailingInput(tok.to_string())),
        }
    }

    fn expression(&mut self, rbp: u8) -> Result<Node, ExprError> {
        let tok = self.next();
        let mut left = self.nud(tok)?;

        while rbp < binding_power(self.peek()) {
            let op = self.next();
            left = self.led(left, op)?;
        }

        Ok(left)
    }

    fn nud(&mut self, tok: Token) -> Result<Node, ExprError> {
        match tok {
            Token::Int(v) => Ok(Node::Atom(v)),
            Token::Op('(') => {
                let inner = self.expression(0)?;
                match self.next() {
                    Token::Op(')') => Ok(inner),
                    other => Err(ExprError::UnbalancedParen(other.to_string())),
                }
            }
            Token::Eof => Err(ExprError::UnexpectedEnd),
            other => Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }

    fn led(&mut self, left: Node, tok: Token) -> Result<Node, ExprError> {
        match tok {
            Token::Op(op) => {
                let right = self.expression(binding_power(&tok))?;
                Ok(Node::Binary(op, Box::new(left), Box::new(right)))
            }
            other => Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }
}

fn binding_power(tok: &Token) -> u8 {
    match tok {
        Token::Op('+') | Token::Op('-') => 10,
        Token::Op('*') | Token::Op('/') => 20,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize(" 12 +(3)").unwrap(),
            vec![
                Token::Int(12),
                Token::Op('+'),
                Token::Op('('),
                Token::Int(3),
                Token::Op(')'),
                Token::Eof,
            ]
        );
        assert_eq!(tokenize("").unwrap(), vec![Token::Eof]);
        assert!(tokenize("99999999999999999999").is_err());
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2 + 3 * 4"), Ok(14));
        assert_eq!(evaluate("2 * (2 + 5)"), Ok(14));
        assert_eq!(evaluate("1 + (2 * 4 + (5 - 1))"), Ok(13));
        assert_eq!(evaluate("2 + (2 * 4 + (5 - 1))"), Ok(14));
        assert_eq!(evaluate("10 - 4 - 3"), Ok(3));
        assert_eq!(evaluate("64 / 4 / 2"), Ok(8));
        assert_eq!(evaluate("42"), Ok(42));
    }

    #[test]
    fn test_division() {
        // Intermediate results keep their fractional part.
        assert_eq!(evaluate("7 / 2 * 2"), Ok(7));
        assert_eq!(evaluate("7 / 2"), Ok(3));
        assert_eq!(evaluate("1 - 7 / 2"), Ok(-2));
        assert_eq!(evaluate("1 / 0"), Err(ExprError::NonFinite));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(evaluate(""), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("2 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("-1"), Err(ExprError::UnexpectedToken("OP(-)".to_owned())));
        assert_eq!(evaluate("(2 + 3"), Err(ExprError::UnbalancedParen("EOF".to_owned())));
        assert_eq!(evaluate("2 3"), Err(ExprError::TrailingInput("INT(3)".to_owned())));
        assert_eq!(evaluate("2 % 3"), Err(ExprError::TrailingInput("OP(%)".to_owned())));
    }
}
