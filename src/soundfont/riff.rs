//! Minimal RIFF container reading for SoundFont files.
//!
//! A RIFF file is a tree of chunks: four-byte tag, u32 little-endian
//! size, payload, with odd-sized payloads padded to word boundaries.
//! `RIFF` and `LIST` chunks carry a four-byte form/list type followed by
//! sub-chunks. This module only walks the structure; record decoding is
//! the parser's job.

use crate::error::SynthError;

/// Byte cursor with little-endian primitive reads.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(what: &str) -> SynthError {
        SynthError::SoundFontParse(format!("truncated file reading {}", what))
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], SynthError> {
        if self.remaining() < n {
            return Err(Self::truncated("chunk payload"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, SynthError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, SynthError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, SynthError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, SynthError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, SynthError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Fixed-width ASCII field, trimmed at the first NUL.
    pub fn read_fixed_str(&mut self, width: usize) -> Result<String, SynthError> {
        let raw = self.take(width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    pub fn read_tag(&mut self) -> Result<[u8; 4], SynthError> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }
}

/// One chunk: tag plus raw payload.
pub struct Chunk<'a> {
    pub tag: [u8; 4],
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// For `RIFF`/`LIST` chunks: the form type and the sub-chunk bytes.
    pub fn as_list(&self) -> Result<([u8; 4], &'a [u8]), SynthError> {
        if self.data.len() < 4 {
            return Err(SynthError::SoundFontParse(format!(
                "list chunk {} too short for a form type",
                tag_str(&self.tag)
            )));
        }
        let form = [self.data[0], self.data[1], self.data[2], self.data[3]];
        Ok((form, &self.data[4..]))
    }
}

/// Iterate the chunks packed into `data`, honoring word padding.
pub fn chunks(data: &[u8]) -> ChunkIter<'_> {
    ChunkIter {
        reader: Reader::new(data),
    }
}

pub struct ChunkIter<'a> {
    reader: Reader<'a>,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<Chunk<'a>, SynthError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.remaining() < 8 {
            return None;
        }
        let result = (|| {
            let tag = self.reader.read_tag()?;
            let size = self.reader.read_u32()? as usize;
            let data = self.reader.take(size)?;
            if size % 2 == 1 && !self.reader.is_empty() {
                self.reader.take(1)?; // pad byte
            }
            Ok(Chunk { tag, data })
        })();
        Some(result)
    }
}

/// Open the outermost `RIFF` chunk and check its form type.
pub fn open_form<'a>(data: &'a [u8], form: &[u8; 4]) -> Result<&'a [u8], SynthError> {
    let chunk = chunks(data)
        .next()
        .ok_or_else(|| SynthError::SoundFontParse("empty file".into()))??;
    if &chunk.tag != b"RIFF" {
        return Err(SynthError::SoundFontParse(format!(
            "not a RIFF file (found tag {})",
            tag_str(&chunk.tag)
        )));
    }
    let (found, body) = chunk.as_list()?;
    if &found != form {
        return Err(SynthError::SoundFontParse(format!(
            "unexpected RIFF form {} (wanted {})",
            tag_str(&found),
            tag_str(form)
        )));
    }
    Ok(body)
}

/// Printable tag for error messages.
pub fn tag_str(tag: &[u8; 4]) -> String {
    tag.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}
