//! Deterministic JSON text for signing.
//!
//! The output matches Python's `json.dumps(value, sort_keys=True)` byte for
//! byte: `", "` / `": "` separators, ASCII-only strings and `repr`-style
//! floats. Packages sealed by earlier releases of the benchmark client were
//! signed over that form, so it must not drift.

use std::fmt::Write;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::SerializationError;

/// Serialize any value through its JSON tree into canonical bytes.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let tree = serde_json::to_value(value)?;
    Ok(canonicalize(&tree))
}

pub fn canonicalize(value: &Value) -> Vec<u8> {
    to_canonical_string(value).into_bytes()
}

pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map),
    }
}

fn write_object(out: &mut String, map: &Map<String, Value>) {
    // Map may be insertion-ordered if another crate enables preserve_order.
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_string(out, key);
        out.push_str(": ");
        write_value(out, value);
    }
    out.push('}');
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        let _ = write!(out, "{}", i);
    } else if let Some(u) = n.as_u64() {
        let _ = write!(out, "{}", u);
    } else {
        // Python ints are unbounded; the parsed text is kept as-is.
        let text = n.to_string();
        if is_integer_text(&text) {
            out.push_str(&text);
        } else if let Some(f) = n.as_f64() {
            write_float(out, f);
        } else {
            out.push_str(&text);
        }
    }
}

fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Shortest round-trip digits laid out the way Python's `repr(float)` does.
fn write_float(out: &mut String, f: f64) {
    // `{:e}` yields the shortest digits, e.g. "-8.55e1", "1e16", "0e0".
    let sci = format!("{:e}", f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        out.push_str(&sci);
        return;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    out.push_str(sign);

    if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                out.push_str(&digits);
                out.extend(std::iter::repeat_n('0', int_len - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat_n('0', (-exp - 1) as usize));
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let _ = write!(out, "e{}{:02}", exp_sign, exp.abs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn canon(v: &Value) -> String {
        to_canonical_string(v)
    }

    #[test]
    fn primitives() {
        assert_eq!(canon(&json!(null)), "null");
        assert_eq!(canon(&json!(true)), "true");
        assert_eq!(canon(&json!(false)), "false");
        assert_eq!(canon(&json!(-42)), "-42");
        assert_eq!(canon(&json!(u64::MAX)), "18446744073709551615");
        assert_eq!(canon(&json!("plain")), "\"plain\"");
    }

    #[test]
    fn keys_sorted_at_every_level() {
        let v = json!({ "z": [ { "y": 1, "b": 2 }, null ], "a": { "x": 10, "c": "k" } });
        assert_eq!(
            canon(&v),
            r#"{"a": {"c": "k", "x": 10}, "z": [{"b": 2, "y": 1}, null]}"#
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut first = Map::new();
        first.insert("fps".into(), json!({ "min": 60, "max": 144.5 }));
        first.insert("ai".into(), json!([3, 2, 1]));
        first.insert("cpu".into(), json!({ "multi": 9000, "single": 1800 }));

        let mut second = Map::new();
        second.insert("cpu".into(), json!({ "single": 1800, "multi": 9000 }));
        second.insert("ai".into(), json!([3, 2, 1]));
        second.insert("fps".into(), json!({ "max": 144.5, "min": 60 }));

        assert_eq!(
            canonicalize(&Value::Object(first)),
            canonicalize(&Value::Object(second))
        );
    }

    #[test]
    fn sequence_order_is_kept() {
        assert_ne!(canon(&json!([1, 2])), canon(&json!([2, 1])));
    }

    #[test]
    fn matches_python_json_dumps() {
        // json.dumps({...}, sort_keys=True) from CPython
        let v = json!({
            "b": [1, 2.0, 1e16, 1.5e-7, 0.0001, -0.0, true, null],
            "a": "caf\u{e9} \u{1F600}\n\u{7f}\"\\"
        });
        assert_eq!(
            canon(&v),
            r#"{"a": "caf\u00e9 \ud83d\ude00\n\u007f\"\\", "b": [1, 2.0, 1e+16, 1.5e-07, 0.0001, -0.0, true, null]}"#
        );
    }

    #[test]
    fn float_layout_follows_repr() {
        assert_eq!(canon(&json!(85.5)), "85.5");
        assert_eq!(canon(&json!(0.0)), "0.0");
        assert_eq!(canon(&json!(123456789012345.6)), "123456789012345.6");
        assert_eq!(canon(&json!(12345678901234567.0)), "1.2345678901234568e+16");
        assert_eq!(canon(&json!(0.1 + 0.2)), "0.30000000000000004");
        assert_eq!(canon(&json!(1e22)), "1e+22");
        assert_eq!(canon(&json!(0.00012)), "0.00012");
        assert_eq!(canon(&json!(0.000012)), "1.2e-05");
    }

    #[test]
    fn integers_wider_than_64_bits_keep_their_digits() {
        let v: Value = serde_json::from_str(
            r#"{"big": 100000000000000000000, "neg": -123456789012345678901234, "max": 18446744073709551615}"#,
        )
        .unwrap();
        assert_eq!(
            canon(&v),
            r#"{"big": 100000000000000000000, "max": 18446744073709551615, "neg": -123456789012345678901234}"#
        );
    }

    #[test]
    fn parsed_floats_are_reformatted_like_repr() {
        let v: Value = serde_json::from_str(r#"[1.50, 1E16, 0.9133333333333333, 2.0]"#).unwrap();
        assert_eq!(canon(&v), "[1.5, 1e+16, 0.9133333333333333, 2.0]");
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(canon(&json!("\u{01}\u{08}\u{0c}\r\t")), r#""\u0001\b\f\r\t""#);
    }

    #[test]
    fn non_string_keys_are_rejected() {
        let mut bad: BTreeMap<(u8, u8), u8> = BTreeMap::new();
        bad.insert((1, 2), 3);
        assert!(to_canonical_bytes(&bad).is_err());
    }

    #[test]
    fn serializable_structs_canonicalize_like_their_tree() {
        #[derive(Serialize)]
        struct Score {
            single: u32,
            multi: u32,
        }
        let bytes = to_canonical_bytes(&Score { single: 1800, multi: 9000 }).unwrap();
        assert_eq!(bytes, br#"{"multi": 9000, "single": 1800}"#.to_vec());
    }
}
