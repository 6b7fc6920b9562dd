//! Tokenizer for reference-expanded formula expressions.
//!
//! By the time an expression reaches the lexer every single-cell reference
//! has been replaced by a literal, so the only reference-shaped tokens left
//! are ranges (`A1:B3`) kept in place for function arguments.

use super::error::FormulaError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(FormulaError),
    Ident(String),
    Range(String),
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    /// Tokenize the whole input. Any unexpected character is `#ERROR!`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, FormulaError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn next_token(&mut self) -> Result<Option<Token>, FormulaError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let token = match ch {
            '0'..='9' | '.' => self.number()?,
            '"' => self.text()?,
            '#' => self.error_literal(),
            c if c.is_ascii_alphabetic() || c == '_' => self.word(),
            _ => {
                self.bump();
                match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '=' => {
                        // Tolerate `==` as equality.
                        if self.peek() == Some('=') {
                            self.bump();
                        }
                        Token::Eq
                    }
                    '!' if self.peek() == Some('=') => {
                        self.bump();
                        Token::Ne
                    }
                    '<' => match self.peek() {
                        Some('=') => {
                            self.bump();
                            Token::Le
                        }
                        Some('>') => {
                            self.bump();
                            Token::Ne
                        }
                        _ => Token::Lt,
                    },
                    '>' => {
                        if self.peek() == Some('=') {
                            self.bump();
                            Token::Ge
                        } else {
                            Token::Gt
                        }
                    }
                    _ => return Err(FormulaError::Generic),
                }
            }
        };
        Ok(Some(token))
    }

    fn number(&mut self) -> Result<Token, FormulaError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign_or_digit = self.peek_at(1);
            let digit_after_sign = self.peek_at(2);
            let has_exponent = match sign_or_digit {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => digit_after_sign.is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        self.src[start..self.pos]
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Generic)
    }

    fn text(&mut self) -> Result<Token, FormulaError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                    out.push('"');
                }
                Some('"') => return Ok(Token::Text(out)),
                Some(c) => out.push(c),
                None => return Err(FormulaError::Generic),
            }
        }
    }

    fn error_literal(&mut self) -> Token {
        let start = self.pos;
        self.bump();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '!' | '?'))
        {
            self.bump();
        }
        let tag = &self.src[start..self.pos];
        Token::Error(FormulaError::from_tag(tag).unwrap_or(FormulaError::Generic))
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        self.take_word_chars();
        // Dotted names such as STDEV.P
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
            self.take_word_chars();
        }
        // A1:B3 style range
        if self.peek() == Some(':') {
            let mark = self.pos;
            self.bump();
            let second = self.pos;
            self.take_word_chars();
            if self.pos > second {
                return Token::Range(self.src[start..self.pos].to_string());
            }
            self.pos = mark;
        }

        let word = &self.src[start..self.pos];
        match word.to_ascii_uppercase().as_str() {
            "TRUE" if self.peek() != Some('(') => Token::Bool(true),
            "FALSE" if self.peek() != Some('(') => Token::Bool(false),
            _ => Token::Ident(word.to_string()),
        }
    }

    fn take_word_chars(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap()
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            lex("10 + 2.5*(3-1)/4"),
            vec![
                Token::Number(10.0),
                Token::Plus,
                Token::Number(2.5),
                Token::Star,
                Token::LParen,
                Token::Number(3.0),
                Token::Minus,
                Token::Number(1.0),
                Token::RParen,
                Token::Slash,
                Token::Number(4.0),
            ]
        );
    }

    #[test]
    fn test_exponent_numbers() {
        assert_eq!(lex("1e3"), vec![Token::Number(1000.0)]);
        assert_eq!(lex("2E-1"), vec![Token::Number(0.2)]);
    }

    #[test]
    fn test_strings_with_doubled_quotes() {
        assert_eq!(lex(r#""a ""b"" c""#), vec![Token::Text("a \"b\" c".into())]);
        assert!(Lexer::new(r#""open"#).tokenize().is_err());
    }

    #[test]
    fn test_function_call_with_range() {
        assert_eq!(
            lex("SUM(A1:B3, 4)"),
            vec![
                Token::Ident("SUM".into()),
                Token::LParen,
                Token::Range("A1:B3".into()),
                Token::Comma,
                Token::Number(4.0),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_dotted_function_name() {
        assert_eq!(lex("STDEV.P(1)")[0], Token::Ident("STDEV.P".into()));
    }

    #[test]
    fn test_comparison_tokens() {
        assert_eq!(
            lex("1>=2 <> != <= < > ="),
            vec![
                Token::Number(1.0),
                Token::Ge,
                Token::Number(2.0),
                Token::Ne,
                Token::Ne,
                Token::Le,
                Token::Lt,
                Token::Gt,
                Token::Eq,
            ]
        );
    }

    #[test]
    fn test_booleans_and_errors() {
        assert_eq!(
            lex("TRUE FALSE #DIV/0! #N/A #WHAT"),
            vec![
                Token::Bool(true),
                Token::Bool(false),
                Token::Error(FormulaError::DivZero),
                Token::Error(FormulaError::NotAvailable),
                Token::Error(FormulaError::Generic),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(Lexer::new("1 $ 2").tokenize(), Err(FormulaError::Generic));
    }
}
