//! SI section framing and byte-offset field readers.
//!
//! Offsets are relative to the start of whatever slice is being read: the
//! whole section (table id at offset 0) or a descriptor payload.

use super::SiError;

/// Bounds-checked big-endian and BCD field readers.
pub trait FieldReader {
    fn word8(&self, offset: usize) -> Result<u8, SiError>;
    fn word16(&self, offset: usize) -> Result<u16, SiError>;
    fn word24(&self, offset: usize) -> Result<u32, SiError>;
    fn word32(&self, offset: usize) -> Result<u32, SiError>;
    fn field(&self, offset: usize, len: usize) -> Result<&[u8], SiError>;

    /// Low 12 bits of a 16-bit word (the usual length field layout).
    fn word12(&self, offset: usize) -> Result<u16, SiError> {
        Ok(self.word16(offset)? & 0x0fff)
    }

    fn bcd8(&self, offset: usize) -> Result<u32, SiError> {
        Ok(bcd_byte(self.word8(offset)?))
    }

    fn bcd16(&self, offset: usize) -> Result<u32, SiError> {
        Ok(self.bcd8(offset)? * 100 + self.bcd8(offset + 1)?)
    }

    fn bcd24(&self, offset: usize) -> Result<u32, SiError> {
        Ok(self.bcd8(offset)? * 10_000 + self.bcd16(offset + 1)?)
    }

    fn bcd32(&self, offset: usize) -> Result<u32, SiError> {
        Ok(self.bcd16(offset)? * 10_000 + self.bcd16(offset + 2)?)
    }
}

impl FieldReader for [u8] {
    fn word8(&self, offset: usize) -> Result<u8, SiError> {
        Ok(self.field(offset, 1)?[0])
    }

    fn word16(&self, offset: usize) -> Result<u16, SiError> {
        let b = self.field(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn word24(&self, offset: usize) -> Result<u32, SiError> {
        let b = self.field(offset, 3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    fn word32(&self, offset: usize) -> Result<u32, SiError> {
        let b = self.field(offset, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn field(&self, offset: usize, len: usize) -> Result<&[u8], SiError> {
        offset
            .checked_add(len)
            .and_then(|end| self.get(offset..end))
            .ok_or(SiError::Truncated {
                offset,
                needed: len,
                len: self.len(),
            })
    }
}

fn bcd_byte(b: u8) -> u32 {
    u32::from(b >> 4) * 10 + u32::from(b & 0x0f)
}

/// Long-form section header (common to NIT, BAT and SDT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Table ID.
    pub table_id: u8,
    /// Section length (12 bits), counting from after the length field.
    pub section_length: u16,
    /// Table-specific id: network, bouquet or transport stream id.
    pub section_id: u16,
    /// Version number (5 bits).
    pub version_number: u8,
    /// Current/next indicator.
    pub current_next_indicator: bool,
    /// Section number.
    pub section_number: u8,
    /// Last section number.
    pub last_section_number: u8,
}

/// Size of the long-form header.
pub const HEADER_LEN: usize = 8;
/// Size of the trailing CRC.
pub const CRC_LEN: usize = 4;

/// One section as delivered by a section filter.
///
/// The CRC has already been checked by the filter layer and is not
/// validated again here.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub header: SectionHeader,
    raw: &'a [u8],
}

impl<'a> Section<'a> {
    /// Parse a section from raw bytes starting at the table id.
    pub fn parse(data: &'a [u8]) -> Result<Self, SiError> {
        let section_length = data.word12(1)?;
        if (section_length as usize) < HEADER_LEN - 3 + CRC_LEN {
            return Err(SiError::SectionLengthTooSmall(section_length));
        }

        let total_length = 3 + section_length as usize;
        if data.len() < total_length {
            return Err(SiError::Incomplete {
                expected: total_length,
                actual: data.len(),
            });
        }
        let raw = &data[..total_length];

        let header = SectionHeader {
            table_id: raw[0],
            section_length,
            section_id: raw.word16(3)?,
            version_number: (raw[5] >> 1) & 0x1f,
            current_next_indicator: raw[5] & 0x01 != 0,
            section_number: raw[6],
            last_section_number: raw[7],
        };

        Ok(Section { header, raw })
    }

    /// The whole section including header and CRC.
    pub fn bytes(&self) -> &'a [u8] {
        self.raw
    }

    /// Offset of the first CRC byte; table loops must end here.
    pub fn payload_end(&self) -> usize {
        self.raw.len() - CRC_LEN
    }

    pub fn table_id(&self) -> u8 {
        self.header.table_id
    }

    pub fn section_id(&self) -> u16 {
        self.header.section_id
    }

    /// Descriptor loop whose 12-bit length field sits at `offset`.
    pub fn descriptors_at(&self, offset: usize) -> Result<DescriptorLoop<'a>, SiError> {
        let len = self.raw.word12(offset)? as usize;
        let start = offset + 2;
        if start + len > self.payload_end() {
            return Err(SiError::Truncated {
                offset: start,
                needed: len,
                len: self.payload_end(),
            });
        }
        Ok(DescriptorLoop {
            data: &self.raw[start..start + len],
        })
    }
}

/// A descriptor as found on the wire: tag byte and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDescriptor<'a> {
    pub tag: u8,
    pub data: &'a [u8],
}

/// A run of descriptors inside a section.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorLoop<'a> {
    data: &'a [u8],
}

impl<'a> DescriptorLoop<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Loop length in bytes, excluding the length field itself.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> DescriptorIter<'a> {
        DescriptorIter {
            data: self.data,
            offset: 0,
        }
    }
}

impl<'a> IntoIterator for DescriptorLoop<'a> {
    type Item = Result<RawDescriptor<'a>, SiError>;
    type IntoIter = DescriptorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a descriptor loop. Stops after the first malformed entry.
pub struct DescriptorIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = Result<RawDescriptor<'a>, SiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let data: &'a [u8] = self.data;
        let offset = self.offset;
        let item = data.field(offset, 2).and_then(|h| {
            let (tag, len) = (h[0], h[1] as usize);
            data.field(offset + 2, len)
                .map(|payload| RawDescriptor { tag, data: payload })
        });

        match item {
            Ok(descriptor) => {
                self.offset += 2 + descriptor.data.len();
                Some(Ok(descriptor))
            }
            Err(e) => {
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_readers() {
        let data = [0x12u8, 0x34, 0x56, 0x78, 0x9a];
        assert_eq!(data.word8(0).unwrap(), 0x12);
        assert_eq!(data.word12(0).unwrap(), 0x0234);
        assert_eq!(data.word16(1).unwrap(), 0x3456);
        assert_eq!(data.word24(1).unwrap(), 0x34_5678);
        assert_eq!(data.word32(1).unwrap(), 0x3456_789a);
        assert!(matches!(
            data.word32(2),
            Err(SiError::Truncated { offset: 2, needed: 4, len: 5 })
        ));
        assert!(data.word8(usize::MAX).is_err());
    }

    #[test]
    fn test_bcd_readers() {
        let data = [0x01u8, 0x10, 0x23, 0x25, 0x02, 0x82];
        assert_eq!(data.bcd8(0).unwrap(), 1);
        assert_eq!(data.bcd16(0).unwrap(), 110);
        assert_eq!(data.bcd24(0).unwrap(), 11_023);
        assert_eq!(data.bcd32(0).unwrap(), 1_102_325);
        assert_eq!(data.bcd16(4).unwrap(), 282);
    }

    fn build_section(table_id: u8, id: u16, version: u8, payload: &[u8]) -> Vec<u8> {
        let len = (5 + payload.len() + 4) as u16;
        let mut v = vec![
            table_id,
            0xf0 | (len >> 8) as u8,
            len as u8,
            (id >> 8) as u8,
            id as u8,
            0xc1 | (version << 1),
            0,
            0,
        ];
        v.extend_from_slice(payload);
        v.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        v
    }

    #[test]
    fn test_section_header() {
        let data = build_section(0x42, 0x1044, 7, &[0x00, 0x01]);
        let section = Section::parse(&data).unwrap();
        assert_eq!(section.table_id(), 0x42);
        assert_eq!(section.section_id(), 0x1044);
        assert_eq!(section.header.version_number, 7);
        assert!(section.header.current_next_indicator);
        assert_eq!(section.header.section_number, 0);
        assert_eq!(section.payload_end(), 10);
    }

    #[test]
    fn test_section_too_short() {
        assert!(matches!(
            Section::parse(&[0x40, 0xf0, 0x04]),
            Err(SiError::SectionLengthTooSmall(4))
        ));
        let mut data = build_section(0x40, 1, 0, &[]);
        data.truncate(data.len() - 1);
        assert!(matches!(Section::parse(&data), Err(SiError::Incomplete { .. })));
    }

    #[test]
    fn test_descriptor_loop() {
        // length 0x007, then tag 0x40 "ab", then tag 0x83 with 1 byte
        let payload = [0xf0, 0x07, 0x40, 0x02, b'a', b'b', 0x83, 0x01, 0x55];
        let data = build_section(0x40, 1, 0, &payload);
        let section = Section::parse(&data).unwrap();
        let descriptors: Vec<_> = section
            .descriptors_at(8)
            .unwrap()
            .iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].tag, 0x40);
        assert_eq!(descriptors[0].data, b"ab");
        assert_eq!(descriptors[1].tag, 0x83);
    }

    #[test]
    fn test_descriptor_loop_truncated_entry() {
        let data = [0x48u8, 0x09, 0x01];
        let items: Vec<_> = DescriptorLoop::new(&data).iter().collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn test_descriptor_loop_overruns_section() {
        let payload = [0xf0, 0x20, 0x40, 0x00];
        let data = build_section(0x40, 1, 0, &payload);
        let section = Section::parse(&data).unwrap();
        assert!(section.descriptors_at(8).is_err());
    }
}
