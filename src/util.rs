use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

pub mod value;

/// Identity hash of a flow. Everything that must agree across protocol
/// versions goes through here, so swapping the algorithm is a one-line change.
pub fn flow_hash(canonical: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical);
    hex::encode(hasher.finalize())
}

/// Canonical JSON encoding of `value`: sorted keys, `", "` and `": "`
/// separators, everything outside printable ASCII escaped as `\uXXXX`.
/// Key order comes from `serde_json::Map`, which is a `BTreeMap`.
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if (c as u32) < 0x7f {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json() {
        let value = json!({"b": [1, 2], "a": {"y": "x", "d": null}, "c": "é\u{7f}"});
        let text = String::from_utf8(canonical_json(&value).unwrap()).unwrap();
        assert_eq!(
            text,
            r#"{"a": {"d": null, "y": "x"}, "b": [1, 2], "c": "\u00e9\u007f"}"#
        );
    }

    #[test]
    fn test_canonical_json_astral() {
        let text = String::from_utf8(canonical_json(&json!("\u{1f600}")).unwrap()).unwrap();
        assert_eq!(text, r#""\ud83d\ude00""#);
    }

    #[test]
    fn test_flow_hash() {
        assert_eq!(flow_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(flow_hash(b"abc").len(), 32);
    }
}
