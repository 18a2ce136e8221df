//! jpq_core - JSONPath engine: expression compiler and document matcher
//!
//! This library compiles JSONPath expressions such as
//! `$.store.book[?(@.price<10)].title` into an opcode tree and evaluates
//! that tree against in-memory JSON documents.

pub mod compiler;
pub mod lexer;
pub mod matcher;
pub mod opcode;

use opcode::Program;
use serde_json::Value;

/// Compile error codes
///
/// The lexer produces the first four; grammar violations surface as
/// [`ParseError`](ErrorKind::ParseError), and expressions over the length cap
/// as [`Overlong`](ErrorKind::Overlong).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnterminatedString,
    BadEscape,
    BadNumber,
    UnexpectedChar,
    ParseError,
    Overlong,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::UnterminatedString => "unterminated string",
            ErrorKind::BadEscape => "invalid escape sequence",
            ErrorKind::BadNumber => "invalid number",
            ErrorKind::UnexpectedChar => "unexpected character",
            ErrorKind::ParseError => "syntax error",
            ErrorKind::Overlong => "expression too long",
        };
        write!(f, "{text}")
    }
}

/// A compiled JSONPath expression, ready for repeated evaluation
///
/// Produced by [`compile`]; run it with [`query`](CompiledPath::query),
/// [`query_ref`](CompiledPath::query_ref), or
/// [`query_first`](CompiledPath::query_first). The compiled opcode tree is
/// immutable, so a `CompiledPath` can be shared freely across threads and
/// evaluated against any number of documents.
///
/// # Example
/// ```
/// use serde_json::json;
/// use jpq_core::compile;
///
/// let path = compile("$.foo").unwrap();
/// let json = json!({"foo": "bar"});
/// let results = path.query(&json);
/// assert_eq!(results, vec![json!("bar")]);
/// ```
#[derive(Debug)]
pub struct CompiledPath {
    program: Program,
}

impl CompiledPath {
    /// Execute the query and return owned values (cloned)
    pub fn query(&self, json: &Value) -> Vec<Value> {
        matcher::evaluate(&self.program, json)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Execute the query and return references (zero-copy)
    pub fn query_ref<'a>(&self, json: &'a Value) -> Vec<&'a Value> {
        matcher::evaluate(&self.program, json)
    }

    /// Execute the query and return the first match, if any
    pub fn query_first<'a>(&self, json: &'a Value) -> Option<&'a Value> {
        matcher::evaluate(&self.program, json).into_iter().next()
    }

    /// The compiled opcode tree
    pub fn program(&self) -> &Program {
        &self.program
    }
}

/// Compile a JSONPath expression for repeated use
///
/// Parses the expression once and returns the compiled form, or an [`Error`]
/// locating the first lexical or grammar violation by byte offset.
///
/// # Example
/// ```
/// use serde_json::json;
/// use jpq_core::compile;
///
/// let path = compile("$.store.book[*].price").unwrap();
///
/// let json1 = json!({"store": {"book": [{"price": 10}, {"price": 20}]}});
/// let json2 = json!({"store": {"book": [{"price": 30}]}});
///
/// assert_eq!(path.query(&json1), vec![json!(10), json!(20)]);
/// assert_eq!(path.query(&json2), vec![json!(30)]);
/// ```
pub fn compile(jsonpath: &str) -> Result<CompiledPath, Error> {
    let program = compiler::Compiler::compile(jsonpath)?;
    Ok(CompiledPath { program })
}

/// Execute a JSONPath expression against a JSON value
///
/// # Example
/// ```
/// use serde_json::json;
/// use jpq_core::query;
///
/// let json = json!({"foo": "bar"});
/// let results = query("$.foo", &json).unwrap();
/// assert_eq!(results, vec![json!("bar")]);
/// ```
pub fn query(jsonpath: &str, json: &Value) -> Result<Vec<Value>, Error> {
    let path = compile(jsonpath)?;
    Ok(path.query(json))
}

/// Error type for JSONPath compilation
///
/// Carries the structured error code and the byte offset into the expression
/// where compilation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    position: usize,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Byte offset into the expression
    pub fn position(&self) -> usize {
        self.position
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at byte {}: {}", self.position, self.kind)
    }
}

impl std::error::Error for Error {}

impl From<compiler::ParseError> for Error {
    fn from(e: compiler::ParseError) -> Self {
        Self {
            kind: e.kind,
            position: e.position,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_simple() {
        let json = json!({"foo": "bar"});
        let results = query("$.foo", &json).unwrap();
        assert_eq!(results, vec![json!("bar")]);
    }

    #[test]
    fn test_query_array() {
        let json = json!({"arr": [1, 2, 3]});
        let results = query("$.arr[0]", &json).unwrap();
        assert_eq!(results, vec![json!(1)]);
    }

    #[test]
    fn test_query_invalid() {
        let json = json!({"foo": "bar"});
        let result = query("invalid", &json);
        assert!(result.is_err());
    }

    #[test]
    fn test_compile_and_query_ref() {
        let path = compile("$.foo").unwrap();
        let json = json!({"foo": "bar"});
        let results = path.query_ref(&json);
        assert_eq!(results, vec![&json!("bar")]);
    }

    #[test]
    fn test_query_first() {
        let path = compile("$[*]").unwrap();
        let json = json!([1, 2, 3]);
        assert_eq!(path.query_first(&json), Some(&json!(1)));
        assert_eq!(path.query_first(&json!([])), None);
    }

    #[test]
    fn test_compile_reuse() {
        let path = compile("$.value").unwrap();
        let json1 = json!({"value": 1});
        let json2 = json!({"value": 2});
        assert_eq!(path.query(&json1), vec![json!(1)]);
        assert_eq!(path.query(&json2), vec![json!(2)]);
    }

    #[test]
    fn test_compiled_path_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledPath>();
    }

    #[test]
    fn test_error_carries_kind_and_offset() {
        let err = compile("$['abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnterminatedString);
        assert_eq!(err.position(), 2);
        assert_eq!(err.to_string(), "at byte 2: unterminated string");
    }

    #[test]
    fn test_error_parse_kind() {
        let err = compile("$.foo..").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }
}
