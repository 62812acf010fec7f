//! Reader for PHP `serialize()` output.
//!
//! FluxBB and PunBB store forum moderator lists as serialized PHP arrays
//! (`a:1:{s:3:"bob";i:5;}`). Only the scalar and array forms those
//! products write are supported; objects and references are rejected.

/// A deserialized PHP value.
#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Strings are byte strings in PHP; invalid UTF-8 is replaced.
    Str(String),
    /// Ordered key/value pairs.
    Array(Vec<(PhpValue, PhpValue)>),
}

impl PhpValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PhpValue::Int(v) => Some(*v),
            PhpValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            PhpValue::Null => String::new(),
            PhpValue::Bool(b) => if *b { "1" } else { "" }.to_string(),
            PhpValue::Int(v) => v.to_string(),
            PhpValue::Float(v) => v.to_string(),
            PhpValue::Str(s) => s.clone(),
            PhpValue::Array(_) => String::new(),
        }
    }
}

/// Deepest array nesting accepted. Moderator lists are one level deep.
const MAX_DEPTH: usize = 8;

/// Parse one serialized value. `None` on malformed input, trailing data or
/// arrays nested deeper than [`MAX_DEPTH`].
pub fn unserialize(input: &str) -> Option<PhpValue> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    (parser.pos == parser.bytes.len()).then_some(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn value(&mut self) -> Option<PhpValue> {
        let tag = *self.bytes.get(self.pos)?;
        self.pos += 1;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Some(PhpValue::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let v = self.until(b';')?;
                Some(PhpValue::Bool(v == "1"))
            }
            b'i' => {
                self.expect(b':')?;
                Some(PhpValue::Int(self.until(b';')?.parse().ok()?))
            }
            b'd' => {
                self.expect(b':')?;
                Some(PhpValue::Float(self.until(b';')?.parse().ok()?))
            }
            b's' => {
                self.expect(b':')?;
                let len: usize = self.until(b':')?.parse().ok()?;
                self.expect(b'"')?;
                let end = self.pos.checked_add(len)?;
                let raw = self.bytes.get(self.pos..end)?;
                self.pos = end;
                self.expect(b'"')?;
                self.expect(b';')?;
                Some(PhpValue::Str(String::from_utf8_lossy(raw).into_owned()))
            }
            b'a' => {
                if self.depth >= MAX_DEPTH {
                    return None;
                }
                self.expect(b':')?;
                let count: usize = self.until(b':')?.parse().ok()?;
                self.expect(b'{')?;
                let mut entries = Vec::with_capacity(count.min(1024));
                self.depth += 1;
                for _ in 0..count {
                    let key = self.value()?;
                    if !matches!(key, PhpValue::Int(_) | PhpValue::Str(_)) {
                        return None;
                    }
                    let value = self.value()?;
                    entries.push((key, value));
                }
                self.depth -= 1;
                self.expect(b'}')?;
                Some(PhpValue::Array(entries))
            }
            _ => None,
        }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn until(&mut self, byte: u8) -> Option<&str> {
        let start = self.pos;
        let len = self.bytes[start..].iter().position(|b| *b == byte)?;
        self.pos = start + len + 1;
        std::str::from_utf8(&self.bytes[start..start + len]).ok()
    }
}
