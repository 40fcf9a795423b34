//! Tokenizer and recursive-descent parser for nginx configuration text.
use super::{Block, Directive, Node, ParseError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Open,
    Close,
    Semicolon,
    Comment(String),
}

#[derive(Debug)]
struct Spanned {
    token: Token,
    line: usize,
}

fn tokenize(text: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                chars.next();
                let mut comment = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    comment.push(c);
                    chars.next();
                }
                tokens.push(Spanned {
                    token: Token::Comment(comment.trim().to_string()),
                    line,
                });
            }
            '{' | '}' | ';' => {
                chars.next();
                let token = match c {
                    '{' => Token::Open,
                    '}' => Token::Close,
                    _ => Token::Semicolon,
                };
                tokens.push(Spanned { token, line });
            }
            '"' | '\'' => {
                let start = line;
                let quote = c;
                let mut word = String::new();
                word.push(quote);
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    word.push(c);
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                word.push(escaped);
                            }
                        }
                        '\n' => line += 1,
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return Err(ParseError {
                        line: start,
                        message: "unterminated quoted string".to_string(),
                    });
                }
                tokens.push(Spanned {
                    token: Token::Word(word),
                    line: start,
                });
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, ';' | '{' | '}') {
                        // `${var}` is a variable, not a block.
                        if c == '{' && word.ends_with('$') {
                            for c in chars.by_ref() {
                                word.push(c);
                                if c == '}' {
                                    break;
                                }
                            }
                            continue;
                        }
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Spanned {
                    token: Token::Word(word),
                    line,
                });
            }
        }
    }

    Ok(tokens)
}

/// Parse configuration text into a list of top-level nodes.
pub(super) fn parse(text: &str) -> Result<Vec<Node>, ParseError> {
    let tokens = tokenize(text)?;
    let mut iter = tokens.into_iter();
    let (nodes, closed_at) = parse_nodes(&mut iter)?;
    if let Some(line) = closed_at {
        return Err(ParseError {
            line,
            message: "unexpected '}'".to_string(),
        });
    }
    Ok(nodes)
}

/// Parse nodes until a closing brace (returned as its line) or end of input.
fn parse_nodes(
    iter: &mut impl Iterator<Item = Spanned>,
) -> Result<(Vec<Node>, Option<usize>), ParseError> {
    let mut nodes = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut statement_line = 0;

    while let Some(Spanned { token, line }) = iter.next() {
        match token {
            Token::Word(word) => {
                if words.is_empty() {
                    statement_line = line;
                }
                words.push(word);
            }
            Token::Comment(text) => {
                // Comments inside a multi-line statement are dropped.
                if words.is_empty() {
                    nodes.push(Node::Comment(text));
                }
            }
            Token::Semicolon => {
                let mut parts = std::mem::take(&mut words).into_iter();
                let name = parts.next().ok_or_else(|| ParseError {
                    line,
                    message: "empty statement".to_string(),
                })?;
                nodes.push(Node::Directive(Directive {
                    name,
                    args: parts.collect(),
                }));
            }
            Token::Open => {
                let mut parts = std::mem::take(&mut words).into_iter();
                let name = parts.next().ok_or_else(|| ParseError {
                    line,
                    message: "block without a name".to_string(),
                })?;
                let (children, closed_at) = parse_nodes(iter)?;
                if closed_at.is_none() {
                    return Err(ParseError {
                        line: statement_line,
                        message: format!("block '{name}' is never closed"),
                    });
                }
                nodes.push(Node::Block(Block {
                    name,
                    args: parts.collect(),
                    children,
                }));
            }
            Token::Close => {
                if !words.is_empty() {
                    return Err(ParseError {
                        line: statement_line,
                        message: format!("missing ';' after '{}'", words.join(" ")),
                    });
                }
                return Ok((nodes, Some(line)));
            }
        }
    }

    if !words.is_empty() {
        return Err(ParseError {
            line: statement_line,
            message: format!("missing ';' after '{}'", words.join(" ")),
        });
    }
    Ok((nodes, None))
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<Token> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn tokenize_keeps_quotes_verbatim() {
        assert_eq!(
            words(r#"add_header X-XSS-Protection "1; mode=block";"#),
            vec![
                Token::Word("add_header".to_string()),
                Token::Word("X-XSS-Protection".to_string()),
                Token::Word("\"1; mode=block\"".to_string()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn tokenize_braced_variable_is_one_word() {
        assert_eq!(
            words("return 301 https://${host}$request_uri;"),
            vec![
                Token::Word("return".to_string()),
                Token::Word("301".to_string()),
                Token::Word("https://${host}$request_uri".to_string()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn parse_nested_blocks() {
        let nodes = parse("http {\n    server {\n        listen 80;\n    }\n}\n").unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::Block(http) = &nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(http.name, "http");
        let Node::Block(server) = &http.children[0] else {
            panic!("expected server block");
        };
        assert_eq!(
            server.children[0],
            Node::Directive(Directive {
                name: "listen".to_string(),
                args: vec!["80".to_string()],
            })
        );
    }

    #[test]
    fn parse_multiline_directive() {
        let nodes = parse("server_name\n\tone.example.com\n\ttwo.example.com\n\t;\n").unwrap();
        assert_eq!(
            nodes[0],
            Node::Directive(Directive {
                name: "server_name".to_string(),
                args: vec!["one.example.com".to_string(), "two.example.com".to_string()],
            })
        );
    }

    #[test]
    fn parse_reports_unclosed_block_line() {
        let err = parse("events {}\nserver {\n    listen 80;\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("never closed"));
    }

    #[test]
    fn parse_reports_stray_close() {
        let err = parse("listen 80;\n}\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn parse_reports_missing_semicolon() {
        let err = parse("server {\n    listen 80\n}\n").unwrap_err();
        assert!(err.message.contains("missing ';'"));
    }

    #[test]
    fn parse_reports_unterminated_quote() {
        assert!(parse("add_header X \"oops;\n").is_err());
    }
}
