// ─── JSON Scanner ───
// Tokenizer + recursive descent over a borrowed byte buffer.
//
// Scalars are reported through `JsonVisitor::on_value` together with the key
// that owns them. Numbers are handed out as raw text; callers convert them.

use std::borrow::Cow;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Limits applied while scanning untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum nesting of objects/arrays. Deeper input fails the parse.
    pub max_depth: usize,
    /// Maximum bytes kept for a single string or key. Longer text is
    /// truncated and fails the parse.
    pub max_string_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_string_len: 1024,
        }
    }
}

/// A value as seen by `JsonVisitor::on_value`.
///
/// `Object` and `Array` are reported when a nested container closes, under
/// the key that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonValue<'v> {
    Text(Cow<'v, str>),
    Number(&'v str),
    True,
    False,
    Null,
    Object,
    Array,
}

impl JsonValue<'_> {
    /// Raw textual form. Empty for `null` and containers.
    pub fn as_str(&self) -> &str {
        match self {
            JsonValue::Text(s) => s,
            JsonValue::Number(n) => n,
            JsonValue::True => "true",
            JsonValue::False => "false",
            JsonValue::Null | JsonValue::Object | JsonValue::Array => "",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, JsonValue::Object | JsonValue::Array)
    }
}

/// Receives parse events. Every method defaults to a no-op.
pub trait JsonVisitor {
    /// Called for each object member and array element. `key` is the
    /// innermost object key in scope.
    fn on_value(&mut self, key: &str, value: &JsonValue<'_>) {
        let _ = (key, value);
    }

    /// Called when an object opens. `depth` is 1 for the outermost container.
    fn on_new_object(&mut self, depth: usize) {
        let _ = depth;
    }

    fn on_new_array(&mut self, depth: usize) {
        let _ = depth;
    }
}

/// Adapts a closure into a visitor that only cares about values.
pub struct OnValue<F>(pub F)
where
    F: FnMut(&str, &JsonValue<'_>);

impl<F> JsonVisitor for OnValue<F>
where
    F: FnMut(&str, &JsonValue<'_>),
{
    fn on_value(&mut self, key: &str, value: &JsonValue<'_>) {
        (self.0)(key, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    None,
    Number,
    True,
    False,
    Null,
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    Comma,
    Colon,
    Quote,
}

/// Where a consumed value lives until it is handed to the visitor.
#[derive(Debug, Clone)]
enum Scanned {
    Text,
    Number(Range<usize>),
    True,
    False,
    Null,
    Object,
    Array,
}

/// Cursor over one externally owned buffer.
///
/// `failed` is sticky: once a structural error is seen it stays set for the
/// rest of this context's life.
pub struct JsonContext<'a> {
    input: &'a [u8],
    pos: usize,
    failed: bool,
    cur_key: String,
    scratch: Vec<u8>,
    depth: usize,
    options: ParseOptions,
}

impl<'a> JsonContext<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_options(input, ParseOptions::default())
    }

    pub fn with_options(input: &'a [u8], options: ParseOptions) -> Self {
        Self {
            input,
            pos: 0,
            failed: false,
            cur_key: String::new(),
            scratch: Vec::new(),
            depth: 0,
            options,
        }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// Consume values until the buffer runs out, an unrecognised top-level
    /// token is met, or the parse fails.
    pub fn parse(&mut self, visitor: &mut dyn JsonVisitor) {
        loop {
            let token = self.consume_token();
            if token == Token::None {
                break;
            }
            self.consume_value(token, visitor);
            if self.failed {
                break;
            }
        }
    }

    // ── Tokenizer ───────────────────────────────────────

    fn consume_token(&mut self) -> Token {
        while let Some(&c) = self.input.get(self.pos) {
            if !is_whitespace(c) {
                break;
            }
            self.pos += 1;
        }

        let Some(&c) = self.input.get(self.pos) else {
            return Token::None;
        };

        let structural = match c {
            b'{' => Some(Token::ObjectStart),
            b'}' => Some(Token::ObjectEnd),
            b'[' => Some(Token::ArrayStart),
            b']' => Some(Token::ArrayEnd),
            b',' => Some(Token::Comma),
            b':' => Some(Token::Colon),
            b'"' => Some(Token::Quote),
            _ => None,
        };
        if let Some(token) = structural {
            self.pos += 1;
            return token;
        }

        // numbers are consumed as a whole run later
        if is_number(c) {
            return Token::Number;
        }

        if self.consume_constant(b"true") {
            return Token::True;
        }
        if self.consume_constant(b"false") {
            return Token::False;
        }
        if self.consume_constant(b"null") {
            return Token::Null;
        }

        // skip invalid character
        self.pos += 1;
        Token::None
    }

    fn consume_constant(&mut self, literal: &[u8]) -> bool {
        if !self.input[self.pos..].starts_with(literal) {
            return false;
        }
        self.pos += literal.len();
        true
    }

    fn consume_number(&mut self) -> Range<usize> {
        let start = self.pos;
        while self.input.get(self.pos).copied().is_some_and(is_number) {
            self.pos += 1;
        }
        start..self.pos
    }

    /// Reads a quoted string (opening quote already consumed) into `scratch`.
    fn consume_string(&mut self) {
        let input = self.input;
        self.scratch.clear();

        while let Some(&c) = input.get(self.pos) {
            self.pos += 1;
            if c == b'"' {
                return;
            }
            if c != b'\\' {
                self.append(&[c]);
                continue;
            }

            let Some(&escape) = input.get(self.pos) else {
                break;
            };
            self.pos += 1;

            match escape {
                b'/' | b'\\' | b'"' => self.append(&[escape]),
                b'u' => {
                    let Some(codepoint) = input.get(self.pos..self.pos + 4).and_then(unhex4)
                    else {
                        break;
                    };
                    self.pos += 4;
                    if codepoint < 32 {
                        continue;
                    }
                    let ch = char::from_u32(codepoint).unwrap_or(char::REPLACEMENT_CHARACTER);
                    let mut buf = [0u8; 4];
                    self.append(ch.encode_utf8(&mut buf).as_bytes());
                }
                _ => break,
            }
        }

        self.failed = true;
        self.scratch.clear();
    }

    fn append(&mut self, bytes: &[u8]) {
        if self.scratch.len() + bytes.len() > self.options.max_string_len {
            self.failed = true;
            return;
        }
        self.scratch.extend_from_slice(bytes);
    }

    // ── Values ──────────────────────────────────────────

    /// `None` when a container was refused for being nested too deeply; it
    /// was never opened, so no close is reported for it either.
    fn consume_value(&mut self, token: Token, visitor: &mut dyn JsonVisitor) -> Option<Scanned> {
        let scanned = match token {
            Token::ObjectStart => {
                if !self.consume_object(visitor) {
                    return None;
                }
                Scanned::Object
            }
            Token::ArrayStart => {
                if !self.consume_array(visitor) {
                    return None;
                }
                Scanned::Array
            }
            Token::Quote => {
                self.consume_string();
                Scanned::Text
            }
            Token::Number => Scanned::Number(self.consume_number()),
            Token::True => Scanned::True,
            Token::False => Scanned::False,
            _ => Scanned::Null,
        };
        Some(scanned)
    }

    /// Returns `false` if the object was not opened.
    fn consume_object(&mut self, visitor: &mut dyn JsonVisitor) -> bool {
        if self.depth >= self.options.max_depth {
            self.failed = true;
            return false;
        }
        self.depth += 1;
        visitor.on_new_object(self.depth);

        loop {
            match self.consume_token() {
                Token::Comma => continue,
                Token::ObjectEnd => break,
                Token::Quote => {}
                _ => {
                    self.failed = true;
                    break;
                }
            }

            self.consume_string();
            let key = String::from_utf8_lossy(&self.scratch).into_owned();
            let parent_key = std::mem::replace(&mut self.cur_key, key);

            if self.consume_token() != Token::Colon {
                self.failed = true;
                self.cur_key = parent_key;
                break;
            }

            let token = self.consume_token();
            if token == Token::None {
                self.failed = true;
                self.cur_key = parent_key;
                break;
            }

            if let Some(scanned) = self.consume_value(token, visitor) {
                visitor.on_value(&self.cur_key, &self.resolve(&scanned));
            }
            self.cur_key = parent_key;

            if self.failed {
                break;
            }
        }

        self.depth -= 1;
        true
    }

    fn consume_array(&mut self, visitor: &mut dyn JsonVisitor) -> bool {
        if self.depth >= self.options.max_depth {
            self.failed = true;
            return false;
        }
        self.depth += 1;
        visitor.on_new_array(self.depth);

        loop {
            let token = match self.consume_token() {
                Token::Comma => continue,
                Token::ArrayEnd => break,
                Token::None => {
                    self.failed = true;
                    break;
                }
                token => token,
            };

            if let Some(scanned) = self.consume_value(token, visitor) {
                visitor.on_value(&self.cur_key, &self.resolve(&scanned));
            }

            if self.failed {
                break;
            }
        }

        self.depth -= 1;
        true
    }

    fn resolve(&self, scanned: &Scanned) -> JsonValue<'_> {
        match scanned {
            Scanned::Text => JsonValue::Text(String::from_utf8_lossy(&self.scratch)),
            Scanned::Number(range) => {
                JsonValue::Number(std::str::from_utf8(&self.input[range.clone()]).unwrap_or(""))
            }
            Scanned::True => JsonValue::True,
            Scanned::False => JsonValue::False,
            Scanned::Null => JsonValue::Null,
            Scanned::Object => JsonValue::Object,
            Scanned::Array => JsonValue::Array,
        }
    }
}

/// Scan `data` with a fresh context. Returns `false` when the parse failed;
/// values reported before the failure were still delivered.
pub fn parse_json(data: &[u8], options: ParseOptions, visitor: &mut dyn JsonVisitor) -> bool {
    let mut ctx = JsonContext::with_options(data, options);
    ctx.parse(visitor);
    !ctx.failed()
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b'\r' | b'\n' | b'\t' | b' ')
}

fn is_number(c: u8) -> bool {
    c == b'-' || c == b'.' || c.is_ascii_digit()
}

fn unhex4(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &d| {
        let nibble = (d as char).to_digit(16)?;
        Some((acc << 4) | nibble)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    /// Records every callback as a flat, ordered log.
    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
    }

    impl JsonVisitor for EventLog {
        fn on_value(&mut self, key: &str, value: &JsonValue<'_>) {
            let shown = match value {
                JsonValue::Object => "{}".to_string(),
                JsonValue::Array => "[]".to_string(),
                JsonValue::Null => "null".to_string(),
                other => other.as_str().to_string(),
            };
            self.events.push(format!("{key}={shown}"));
        }

        fn on_new_object(&mut self, depth: usize) {
            self.events.push(format!("object@{depth}"));
        }

        fn on_new_array(&mut self, depth: usize) {
            self.events.push(format!("array@{depth}"));
        }
    }

    enum Frame {
        Object(Map<String, Value>),
        Array(Vec<Value>),
    }

    /// Rebuilds a document purely from parser callbacks.
    #[derive(Default)]
    struct TreeBuilder {
        stack: Vec<Frame>,
    }

    impl TreeBuilder {
        fn into_value(mut self) -> Option<Value> {
            self.stack.pop().map(frame_value)
        }
    }

    fn frame_value(frame: Frame) -> Value {
        match frame {
            Frame::Object(map) => Value::Object(map),
            Frame::Array(items) => Value::Array(items),
        }
    }

    impl JsonVisitor for TreeBuilder {
        fn on_value(&mut self, key: &str, value: &JsonValue<'_>) {
            let value = match value {
                JsonValue::Object | JsonValue::Array => {
                    frame_value(self.stack.pop().expect("container frame"))
                }
                JsonValue::Text(s) => Value::String(s.to_string()),
                JsonValue::Number(n) => serde_json::from_str(n).expect("numeric text"),
                JsonValue::True => Value::Bool(true),
                JsonValue::False => Value::Bool(false),
                JsonValue::Null => Value::Null,
            };
            match self.stack.last_mut().expect("parent frame") {
                Frame::Object(map) => {
                    map.insert(key.to_string(), value);
                }
                Frame::Array(items) => items.push(value),
            }
        }

        fn on_new_object(&mut self, _depth: usize) {
            self.stack.push(Frame::Object(Map::new()));
        }

        fn on_new_array(&mut self, _depth: usize) {
            self.stack.push(Frame::Array(Vec::new()));
        }
    }

    fn log(input: &str) -> (Vec<String>, bool) {
        let mut visitor = EventLog::default();
        let ok = parse_json(input.as_bytes(), ParseOptions::default(), &mut visitor);
        (visitor.events, ok)
    }

    fn text_of(input: &str, wanted: &str) -> (Option<String>, bool) {
        let mut found = None;
        let mut visitor = OnValue(|key: &str, value: &JsonValue<'_>| {
            if key == wanted {
                found = Some(value.as_str().to_string());
            }
        });
        let ok = parse_json(input.as_bytes(), ParseOptions::default(), &mut visitor);
        (found, ok)
    }

    #[test]
    fn callbacks_rebuild_the_source_document() {
        let input = r#"{
            "name": "Sky \"Island\"",
            "players": 12,
            "ratio": -0.5,
            "featured": true,
            "closed": false,
            "motd": null,
            "tags": ["pvp", "build", [1, 2]],
            "owner": {"id": 7, "roles": {"admin": true}}
        }"#;

        let mut builder = TreeBuilder::default();
        assert!(parse_json(input.as_bytes(), ParseOptions::default(), &mut builder));

        let expected: Value = serde_json::from_str(input).unwrap();
        assert_eq!(builder.into_value(), Some(expected));
    }

    #[test]
    fn events_preserve_member_and_element_order() {
        let (events, ok) = log(r#"{"b":1,"a":[3,"x"],"c":{"d":false}}"#);
        assert!(ok);
        assert_eq!(
            events,
            vec![
                "object@1", "b=1", "array@2", "a=3", "a=x", "a=[]", "object@2", "d=false",
                "c={}",
            ]
        );
    }

    #[test]
    fn nested_keys_do_not_leak_into_parent() {
        let (events, ok) = log(r#"{"outer":{"inner":1},"after":2}"#);
        assert!(ok);
        assert_eq!(
            events,
            vec!["object@1", "object@2", "inner=1", "outer={}", "after=2"]
        );
    }

    #[test]
    fn array_elements_are_attributed_to_owning_key() {
        let (events, _) = log(r#"{"errors":["username","password"]}"#);
        assert_eq!(
            events,
            vec![
                "object@1",
                "array@2",
                "errors=username",
                "errors=password",
                "errors=[]",
            ]
        );
    }

    #[test]
    fn unicode_escapes_decode() {
        let (value, ok) = text_of(r#"{"v":"\u0041\u0042"}"#, "v");
        assert!(ok);
        assert_eq!(value.as_deref(), Some("AB"));

        let (value, _) = text_of(r#"{"v":"caf\u00e9"}"#, "v");
        assert_eq!(value.as_deref(), Some("café"));
    }

    #[test]
    fn control_code_points_are_dropped() {
        let (value, ok) = text_of(r#"{"v":"\u0007hi"}"#, "v");
        assert!(ok);
        assert_eq!(value.as_deref(), Some("hi"));
    }

    #[test]
    fn letter_escapes_fail_the_string() {
        for input in [r#"{"v":"a\nb"}"#, r#"{"v":"a\tb"}"#, r#"{"v":"\r"}"#] {
            let (value, ok) = text_of(input, "v");
            assert!(!ok, "{input}");
            assert_eq!(value.as_deref(), Some(""), "{input}");
        }
    }

    #[test]
    fn simple_escapes_pass_through() {
        let (value, ok) = text_of(r#"{"v":"a\/b\\c\"d"}"#, "v");
        assert!(ok);
        assert_eq!(value.as_deref(), Some(r#"a/b\c"d"#));
    }

    #[test]
    fn unterminated_string_fails_with_empty_value() {
        let (value, ok) = text_of(r#"{"a":"b"#, "a");
        assert!(!ok);
        assert_eq!(value.as_deref(), Some(""));
    }

    #[test]
    fn bad_escapes_fail() {
        let (value, ok) = text_of(r#"{"a":"x\u00"}"#, "a");
        assert!(!ok);
        assert_eq!(value.as_deref(), Some(""));

        let (value, ok) = text_of(r#"{"a":"x\q"}"#, "a");
        assert!(!ok);
        assert_eq!(value.as_deref(), Some(""));
    }

    #[test]
    fn numbers_are_raw_substrings() {
        let (value, ok) = text_of(r#"{"ts":"1.5","n":-12.75}"#, "n");
        assert!(ok);
        assert_eq!(value.as_deref(), Some("-12.75"));
    }

    #[test]
    fn missing_colon_fails() {
        let (events, ok) = log(r#"{"a" 1}"#);
        assert!(!ok);
        assert_eq!(events, vec!["object@1"]);
    }

    #[test]
    fn garbage_inside_array_fails() {
        let (events, ok) = log("[1, @, 2]");
        assert!(!ok);
        assert_eq!(events, vec!["array@1", "=1"]);
    }

    #[test]
    fn trailing_top_level_garbage_is_tolerated() {
        let (events, ok) = log(r#"{"a":1} ~~~"#);
        assert!(ok);
        assert_eq!(events, vec!["object@1", "a=1"]);
    }

    #[test]
    fn bare_scalars_emit_no_values() {
        let (events, ok) = log(r#"null "text" 42 true"#);
        assert!(ok);
        assert!(events.is_empty());
    }

    #[test]
    fn nesting_beyond_limit_fails() {
        let options = ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        };
        let mut visitor = EventLog::default();
        assert!(!parse_json(b"[[[1]]]", options, &mut visitor));
        // the refused array is neither opened nor closed
        assert_eq!(visitor.events, vec!["array@1", "array@2", "=[]"]);

        let mut visitor = EventLog::default();
        assert!(parse_json(b"[[1]]", options, &mut visitor));
    }

    #[test]
    fn refused_containers_keep_events_balanced() {
        let options = ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        };
        let mut builder = TreeBuilder::default();
        assert!(!parse_json(br#"[[[1]], {"a": {"b": {}}}]"#, options, &mut builder));
        assert_eq!(builder.into_value(), Some(serde_json::json!([[]])));

        let mut builder = TreeBuilder::default();
        assert!(!parse_json(br#"{"a": {"b": [2]}, "c": 3}"#, options, &mut builder));
        assert_eq!(builder.into_value(), Some(serde_json::json!({"a": {}})));
    }

    #[test]
    fn overlong_strings_are_truncated_and_fail() {
        let options = ParseOptions {
            max_string_len: 4,
            ..ParseOptions::default()
        };
        let mut seen = Vec::new();
        let mut visitor = OnValue(|_: &str, value: &JsonValue<'_>| {
            seen.push(value.as_str().to_string());
        });
        assert!(!parse_json(br#"{"k":"abcdef"}"#, options, &mut visitor));
        assert_eq!(seen, vec!["abcd"]);
    }

    #[test]
    fn failed_flag_is_sticky() {
        let mut ctx = JsonContext::new(br#"{"a":"b"#);
        ctx.parse(&mut EventLog::default());
        assert!(ctx.failed());
        ctx.parse(&mut EventLog::default());
        assert!(ctx.failed());
        assert_eq!(ctx.remaining(), 0);
    }
}
