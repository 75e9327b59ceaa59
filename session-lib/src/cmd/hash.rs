use crate::cmd::{into_string, optional_string, Protocol};
use crate::frame::PushFrame;
use crate::Frame;
use bytes::Bytes;
use std::collections::HashMap;

/// Set `field` in the hash stored at `key` to `value`. Other fields of the
/// hash are left alone.
#[derive(Debug)]
pub struct HSet {
    key: String,
    field: String,
    value: String,
}

/// Get the value of `field` in the hash stored at `key`.
#[derive(Debug)]
pub struct HGet {
    key: String,
    field: String,
}

/// Get every field and value of the hash stored at `key`.
#[derive(Debug)]
pub struct HGetAll {
    key: String,
}

impl HSet {
    pub fn new(key: impl ToString, field: impl ToString, value: impl ToString) -> HSet {
        HSet {
            key: key.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

impl HGet {
    pub fn new(key: impl ToString, field: impl ToString) -> HGet {
        HGet {
            key: key.to_string(),
            field: field.to_string(),
        }
    }
}

impl HGetAll {
    pub fn new(key: impl ToString) -> HGetAll {
        HGetAll {
            key: key.to_string(),
        }
    }
}

impl Protocol for HSet {
    /// `true` when the field did not exist before.
    type Output = bool;

    /// ```text
    /// HSET key field value
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"hset"));
        frame.push_bulk(Bytes::from(self.key.clone()));
        frame.push_bulk(Bytes::from(self.field.clone()));
        frame.push_bulk(Bytes::from(self.value.clone()));

        frame.into()
    }

    fn read_response(self, frame: Frame) -> crate::Result<bool> {
        match frame {
            Frame::Integer(added) => Ok(added > 0),
            other => Err(other.to_error()),
        }
    }
}

impl Protocol for HGet {
    type Output = Option<String>;

    /// ```text
    /// HGET key field
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"hget"));
        frame.push_bulk(Bytes::from(self.key.clone()));
        frame.push_bulk(Bytes::from(self.field.clone()));

        frame.into()
    }

    fn read_response(self, frame: Frame) -> crate::Result<Option<String>> {
        optional_string(frame)
    }
}

impl Protocol for HGetAll {
    type Output = HashMap<String, String>;

    /// ```text
    /// HGETALL key
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"hgetall"));
        frame.push_bulk(Bytes::from(self.key.clone()));

        frame.into()
    }

    /// The reply is a flat array of alternating field names and values. A
    /// missing hash is an empty array.
    fn read_response(self, frame: Frame) -> crate::Result<HashMap<String, String>> {
        let entries = match frame {
            Frame::Array(entries) if entries.len() % 2 == 0 => entries,
            other => return Err(other.to_error()),
        };

        let mut fields = HashMap::with_capacity(entries.len() / 2);
        let mut entries = entries.into_iter();

        while let (Some(field), Some(value)) = (entries.next(), entries.next()) {
            fields.insert(string_entry(field)?, string_entry(value)?);
        }

        Ok(fields)
    }
}

fn string_entry(frame: Frame) -> crate::Result<String> {
    match frame {
        Frame::Simple(s) => Ok(s),
        Frame::Bulk(data) => into_string(data),
        other => Err(other.to_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &'static str) -> Frame {
        Frame::Bulk(Bytes::from_static(s.as_bytes()))
    }

    #[test]
    fn hset_reports_new_fields() {
        assert!(HSet::new("h", "f", "v").read_response(Frame::Integer(1)).unwrap());
        assert!(!HSet::new("h", "f", "v").read_response(Frame::Integer(0)).unwrap());
    }

    #[test]
    fn hgetall_pairs_fields_with_values() {
        let reply = Frame::Array(vec![bulk("Portland"), bulk("50"), bulk("Seattle"), bulk("80")]);
        let fields = HGetAll::new("HolbertonSchools").read_response(reply).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields["Portland"], "50");
        assert_eq!(fields["Seattle"], "80");
    }

    #[test]
    fn hgetall_rejects_odd_arrays() {
        let reply = Frame::Array(vec![bulk("Portland")]);
        assert!(HGetAll::new("h").read_response(reply).is_err());
    }

    #[test]
    fn hgetall_of_missing_hash_is_empty() {
        let fields = HGetAll::new("h").read_response(Frame::Array(vec![])).unwrap();
        assert!(fields.is_empty());
    }
}
