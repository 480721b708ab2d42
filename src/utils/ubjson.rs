//! Universal Binary JSON codec
//!
//! XGBoost's compact `.ubj` model format is UBJSON (draft 12): big-endian
//! numbers, length-prefixed strings and optimized containers
//! (`[$d#l<count>` typed float arrays for split conditions, etc.).
//! Documents are decoded into `serde_json::Value` so the JSON and UBJ
//! artifacts share one typed parser.

use serde_json::{Map, Number, Value};

use crate::models::errors::{AppError, AppResult, ErrorCode};

/// Nesting limit for arrays/objects
const MAX_DEPTH: usize = 128;

// ============================================
// MARKERS
// ============================================

const NULL: u8 = b'Z';
const NO_OP: u8 = b'N';
const TRUE: u8 = b'T';
const FALSE: u8 = b'F';
const INT8: u8 = b'i';
const UINT8: u8 = b'U';
const INT16: u8 = b'I';
const INT32: u8 = b'l';
const INT64: u8 = b'L';
const FLOAT32: u8 = b'd';
const FLOAT64: u8 = b'D';
const HIGH_PRECISION: u8 = b'H';
const CHAR: u8 = b'C';
const STRING: u8 = b'S';
const ARRAY_START: u8 = b'[';
const ARRAY_END: u8 = b']';
const OBJECT_START: u8 = b'{';
const OBJECT_END: u8 = b'}';
const CONTAINER_TYPE: u8 = b'$';
const CONTAINER_COUNT: u8 = b'#';

// ============================================
// DECODER
// ============================================

/// Decode a complete UBJSON document
pub fn decode(bytes: &[u8]) -> AppResult<Value> {
    let mut reader = Reader { buf: bytes, pos: 0 };
    let marker = reader.next_marker()?;
    let value = reader.read_value(marker, 0)?;

    if reader.pos != bytes.len() {
        return Err(AppError::malformed(format!(
            "UBJSON: {} trailing bytes after document",
            bytes.len() - reader.pos
        )));
    }
    Ok(value)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> AppResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(AppError::malformed(format!(
                "UBJSON: unexpected end of input at byte {}",
                self.pos
            ))),
        }
    }

    fn read_u8(&mut self) -> AppResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn peek(&self) -> AppResult<u8> {
        self.buf.get(self.pos).copied().ok_or_else(|| {
            AppError::malformed(format!("UBJSON: unexpected end of input at byte {}", self.pos))
        })
    }

    /// Next value marker, skipping no-op padding
    fn next_marker(&mut self) -> AppResult<u8> {
        loop {
            let marker = self.read_u8()?;
            if marker != NO_OP {
                return Ok(marker);
            }
        }
    }

    fn read_array_n<const N: usize>(&mut self) -> AppResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Integer payload for an integer marker
    fn read_int(&mut self, marker: u8) -> AppResult<i64> {
        Ok(match marker {
            INT8 => i8::from_be_bytes(self.read_array_n()?) as i64,
            UINT8 => self.read_u8()? as i64,
            INT16 => i16::from_be_bytes(self.read_array_n()?) as i64,
            INT32 => i32::from_be_bytes(self.read_array_n()?) as i64,
            INT64 => i64::from_be_bytes(self.read_array_n()?),
            other => {
                return Err(AppError::malformed(format!(
                    "UBJSON: expected integer marker, found {:?}",
                    other as char
                )))
            }
        })
    }

    /// Length prefix (strings, keys, counts)
    fn read_length(&mut self) -> AppResult<usize> {
        let marker = self.read_u8()?;
        let len = self.read_int(marker)?;
        usize::try_from(len)
            .map_err(|_| AppError::malformed(format!("UBJSON: negative length {}", len)))
    }

    fn read_str(&mut self) -> AppResult<String> {
        let len = self.read_length()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::with_source(ErrorCode::ArtifactMalformed, "UBJSON: invalid UTF-8 string", e))
    }

    fn read_value(&mut self, marker: u8, depth: usize) -> AppResult<Value> {
        match marker {
            NULL => Ok(Value::Null),
            TRUE => Ok(Value::Bool(true)),
            FALSE => Ok(Value::Bool(false)),
            INT8 | UINT8 | INT16 | INT32 | INT64 => Ok(Value::from(self.read_int(marker)?)),
            FLOAT32 => {
                let v = f32::from_be_bytes(self.read_array_n()?);
                Ok(float_value(v as f64))
            }
            FLOAT64 => {
                let v = f64::from_be_bytes(self.read_array_n()?);
                Ok(float_value(v))
            }
            HIGH_PRECISION => {
                let digits = self.read_str()?;
                Ok(match digits.parse::<Number>() {
                    Ok(n) => Value::Number(n),
                    Err(_) => Value::String(digits),
                })
            }
            CHAR => Ok(Value::String((self.read_u8()? as char).to_string())),
            STRING => Ok(Value::String(self.read_str()?)),
            ARRAY_START => self.read_array(depth + 1),
            OBJECT_START => self.read_object(depth + 1),
            other => Err(AppError::malformed(format!(
                "UBJSON: unknown marker {:?} at byte {}",
                other as char,
                self.pos - 1
            ))),
        }
    }

    /// Optional `$type` and `#count` after a container start.
    ///
    /// Every element must consume at least one byte, so a count larger
    /// than the remaining input is rejected before anything is allocated.
    fn read_container_header(&mut self) -> AppResult<(Option<u8>, Option<usize>)> {
        let mut elem_type = None;
        if self.peek()? == CONTAINER_TYPE {
            self.pos += 1;
            let t = self.read_u8()?;
            if matches!(t, NULL | NO_OP | TRUE | FALSE) {
                return Err(AppError::malformed(format!(
                    "UBJSON: typed container of payload-less {:?} at byte {}",
                    t as char,
                    self.pos - 1
                )));
            }
            elem_type = Some(t);
            if self.peek()? != CONTAINER_COUNT {
                return Err(AppError::malformed("UBJSON: typed container without count"));
            }
        }
        let mut count = None;
        if self.peek()? == CONTAINER_COUNT {
            self.pos += 1;
            let n = self.read_length()?;
            let remaining = self.buf.len() - self.pos;
            if n > remaining {
                return Err(AppError::malformed(format!(
                    "UBJSON: container count {} exceeds remaining {} bytes",
                    n, remaining
                )));
            }
            count = Some(n);
        }
        Ok((elem_type, count))
    }

    fn read_array(&mut self, depth: usize) -> AppResult<Value> {
        if depth > MAX_DEPTH {
            return Err(AppError::malformed("UBJSON: nesting too deep"));
        }

        let (elem_type, count) = self.read_container_header()?;
        match count {
            Some(count) => {
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    let marker = match elem_type {
                        Some(t) => t,
                        None => self.next_marker()?,
                    };
                    items.push(self.read_value(marker, depth)?);
                }
                Ok(Value::Array(items))
            }
            None => {
                let mut items = Vec::new();
                loop {
                    let marker = self.next_marker()?;
                    if marker == ARRAY_END {
                        return Ok(Value::Array(items));
                    }
                    items.push(self.read_value(marker, depth)?);
                }
            }
        }
    }

    fn read_object(&mut self, depth: usize) -> AppResult<Value> {
        if depth > MAX_DEPTH {
            return Err(AppError::malformed("UBJSON: nesting too deep"));
        }

        let (elem_type, count) = self.read_container_header()?;
        let mut map = Map::new();
        match count {
            Some(count) => {
                for _ in 0..count {
                    let key = self.read_str()?;
                    let marker = match elem_type {
                        Some(t) => t,
                        None => self.next_marker()?,
                    };
                    let value = self.read_value(marker, depth)?;
                    map.insert(key, value);
                }
            }
            None => loop {
                if self.peek()? == OBJECT_END {
                    self.pos += 1;
                    break;
                }
                let key = self.read_str()?;
                let marker = self.next_marker()?;
                let value = self.read_value(marker, depth)?;
                map.insert(key, value);
            },
        }
        Ok(Value::Object(map))
    }
}

/// JSON has no NaN/Inf, they decode to null
fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

// ============================================
// ENCODER
// ============================================

/// Encode a JSON value as UBJSON
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.push(NULL),
        Value::Bool(true) => out.push(TRUE),
        Value::Bool(false) => out.push(FALSE),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => {
            out.push(STRING);
            write_str(out, s);
        }
        Value::Array(items) => write_array(out, items),
        Value::Object(map) => {
            out.push(OBJECT_START);
            for (key, value) in map {
                write_str(out, key);
                write_value(out, value);
            }
            out.push(OBJECT_END);
        }
    }
}

fn write_number(out: &mut Vec<u8>, n: &Number) {
    if let Some(i) = n.as_i64() {
        write_int(out, i);
    } else if n.is_u64() {
        out.push(HIGH_PRECISION);
        write_str(out, &n.to_string());
    } else if let Some(f) = n.as_f64() {
        if is_exact_f32(f) {
            out.push(FLOAT32);
            out.extend_from_slice(&(f as f32).to_be_bytes());
        } else {
            out.push(FLOAT64);
            out.extend_from_slice(&f.to_be_bytes());
        }
    }
}

fn write_int(out: &mut Vec<u8>, i: i64) {
    if (0..=u8::MAX as i64).contains(&i) {
        out.push(UINT8);
        out.push(i as u8);
    } else if (i8::MIN as i64..=i8::MAX as i64).contains(&i) {
        out.push(INT8);
        out.extend_from_slice(&(i as i8).to_be_bytes());
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&i) {
        out.push(INT16);
        out.extend_from_slice(&(i as i16).to_be_bytes());
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&i) {
        out.push(INT32);
        out.extend_from_slice(&(i as i32).to_be_bytes());
    } else {
        out.push(INT64);
        out.extend_from_slice(&i.to_be_bytes());
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    write_int(out, s.len() as i64);
    out.extend_from_slice(s.as_bytes());
}

fn is_exact_f32(f: f64) -> bool {
    (f as f32) as f64 == f
}

fn write_array(out: &mut Vec<u8>, items: &[Value]) {
    out.push(ARRAY_START);

    // Homogeneous numeric arrays use the typed container form, like XGBoost
    let all_f32 = items.len() > 1
        && items.iter().all(|v| match v {
            Value::Number(n) => n.is_f64() && n.as_f64().is_some_and(is_exact_f32),
            _ => false,
        });
    let all_i32 = items.len() > 1
        && items.iter().all(|v| {
            v.as_i64()
                .is_some_and(|i| (i32::MIN as i64..=i32::MAX as i64).contains(&i))
        });

    if all_f32 {
        out.extend_from_slice(&[CONTAINER_TYPE, FLOAT32, CONTAINER_COUNT]);
        write_int(out, items.len() as i64);
        for v in items {
            let f = v.as_f64().unwrap_or_default() as f32;
            out.extend_from_slice(&f.to_be_bytes());
        }
    } else if all_i32 {
        out.extend_from_slice(&[CONTAINER_TYPE, INT32, CONTAINER_COUNT]);
        write_int(out, items.len() as i64);
        for v in items {
            let i = v.as_i64().unwrap_or_default() as i32;
            out.extend_from_slice(&i.to_be_bytes());
        }
    } else {
        for v in items {
            write_value(out, v);
        }
        out.push(ARRAY_END);
    }
}
