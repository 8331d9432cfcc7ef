//! Typed views over raw property payloads.
//!
//! Decoding is pure and repeatable: the same payload always decodes the
//! same way, and a failed decode leaves nothing behind.

use crate::error::{PropertyType, SchemaError};
use crate::tree::Property;

impl<'a> Property<'a> {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the payload is zero-length.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Heuristic check for a printable null-terminated string payload.
    pub fn is_str(&self) -> bool {
        match self.value.split_last() {
            Some((0, rest)) => !rest.contains(&0) && rest.iter().all(|&b| b >= 0x20 && b < 0x7f),
            _ => false,
        }
    }

    /// Decode as exactly one null-terminated string.
    pub fn as_str(&self) -> Result<&'a str, SchemaError> {
        let mismatch = || self.mismatch(PropertyType::Str);

        let (last, rest) = self.value.split_last().ok_or_else(mismatch)?;
        if *last != 0 || rest.contains(&0) {
            return Err(mismatch());
        }
        std::str::from_utf8(rest).map_err(|_| mismatch())
    }

    /// Decode as a single big-endian u32 cell.
    pub fn as_u32(&self) -> Result<u32, SchemaError> {
        let cell: [u8; 4] = self
            .value
            .try_into()
            .map_err(|_| self.mismatch(PropertyType::U32))?;
        Ok(u32::from_be_bytes(cell))
    }

    /// Decode as an array of big-endian u32 cells.
    pub fn as_u32_array(&self) -> Result<Vec<u32>, SchemaError> {
        if self.value.len() % 4 != 0 {
            return Err(self.mismatch(PropertyType::U32Array));
        }
        Ok(self
            .value
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
            .collect())
    }

    /// Decode as an empty (boolean presence) property.
    pub fn as_empty(&self) -> Result<(), SchemaError> {
        if self.value.is_empty() {
            Ok(())
        } else {
            Err(self.mismatch(PropertyType::Empty))
        }
    }

    /// Decode as a phandle token (one u32 cell).
    pub fn as_phandle(&self) -> Result<u32, SchemaError> {
        let cell: [u8; 4] = self
            .value
            .try_into()
            .map_err(|_| self.mismatch(PropertyType::Phandle))?;
        Ok(u32::from_be_bytes(cell))
    }

    fn mismatch(&self, expected: PropertyType) -> SchemaError {
        SchemaError::Mismatch {
            name: self.name.to_owned(),
            expected,
            len: self.value.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::Property;

    fn prop(value: &[u8]) -> Property<'_> {
        Property {
            name: "test-prop",
            value,
        }
    }

    #[test]
    fn decode_strings() {
        for (input, expected) in [
            (&b"dsi_video_mode\0"[..], Some("dsi_video_mode")),
            (b"\0", Some("")),
            (b"no terminator", None),
            (b"two\0runs\0", None),
            (b"", None),
        ] {
            assert_eq!(prop(input).as_str().ok(), expected);
        }
    }

    #[test]
    fn decode_u32_cells() {
        assert_eq!(prop(&[0, 0, 4, 0]).as_u32(), Ok(1024));
        assert!(prop(&[0, 0, 4]).as_u32().is_err());
        assert_eq!(
            prop(&[0, 0, 0, 1, 0, 0, 0, 20]).as_u32_array(),
            Ok(vec![1, 20])
        );
        assert!(prop(&[0, 0, 0, 1, 0]).as_u32_array().is_err());
        assert_eq!(prop(&[]).as_u32_array(), Ok(vec![]));
    }

    #[test]
    fn empty_property_decodes_without_error() {
        assert!(prop(&[]).as_empty().is_ok());
        assert!(prop(&[0]).as_empty().is_err());
    }

    #[test]
    fn phandle_is_a_single_cell() {
        assert_eq!(prop(&[0, 0, 0, 42]).as_phandle(), Ok(42));
        assert!(prop(&[0, 0, 0, 0, 1]).as_phandle().is_err());
    }

    #[test]
    fn string_heuristic() {
        for (input, expected) in [
            (&b"bl_ctrl_dcs\0"[..], true),
            (b"\x01\x00\x00\x04", false),
            (b"", false),
            (b"a\0b\0", false),
        ] {
            assert_eq!(prop(input).is_str(), expected);
        }
    }
}
