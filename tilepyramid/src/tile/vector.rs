//! Vector tile decoding.
//!
//! Parses the layer structure of a Mapbox Vector Tile (protobuf, optionally
//! gzip-compressed). Feature geometry is counted but not decoded.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;

use super::decoder::{TileDecoder, TileKind};
use super::error::DecodeError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// Protobuf wire types
const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// Decodes Mapbox Vector Tile payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorDecoder;

/// A decoded vector tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorTile {
    pub layers: Vec<VectorLayer>,
}

impl VectorTile {
    /// Look up a layer by name.
    pub fn layer(&self, name: &str) -> Option<&VectorLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.name.as_str())
    }

    pub fn feature_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.feature_count).sum()
    }
}

/// One layer of a vector tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorLayer {
    pub name: String,
    pub version: Option<u32>,
    pub extent: Option<u32>,
    pub feature_count: usize,
    pub keys: Vec<String>,
}

impl TileDecoder for VectorDecoder {
    type Content = VectorTile;

    fn kind(&self) -> TileKind {
        TileKind::Vector
    }

    fn decode(&self, data: &[u8]) -> Result<VectorTile, DecodeError> {
        let data = decompress(data)?;
        let mut reader = WireReader::new(&data);
        let mut tile = VectorTile::default();

        while !reader.is_empty() {
            match reader.key()? {
                (3, WIRE_LEN) => tile.layers.push(decode_layer(reader.bytes()?)?),
                (field, wire) if is_extension(field) => reader.skip(wire)?,
                (field, wire) => {
                    return Err(DecodeError::new(format!(
                        "unexpected tile field {} (wire type {})",
                        field, wire
                    )))
                }
            }
        }

        Ok(tile)
    }
}

fn decompress(data: &[u8]) -> Result<Cow<'_, [u8]>, DecodeError> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(data));
    }
    let mut inflated = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut inflated)
        .map_err(|e| DecodeError::new(format!("gzip: {}", e)))?;
    Ok(Cow::Owned(inflated))
}

fn decode_layer(data: &[u8]) -> Result<VectorLayer, DecodeError> {
    let mut reader = WireReader::new(data);
    let mut layer = VectorLayer::default();
    let mut name = None;

    while !reader.is_empty() {
        match reader.key()? {
            (1, WIRE_LEN) => name = Some(utf8(reader.bytes()?)?),
            (2, WIRE_LEN) => {
                reader.bytes()?;
                layer.feature_count += 1;
            }
            (3, WIRE_LEN) => layer.keys.push(utf8(reader.bytes()?)?),
            (4, WIRE_LEN) => {
                reader.bytes()?;
            }
            (5, WIRE_VARINT) => layer.extent = Some(reader.varint()? as u32),
            (15, WIRE_VARINT) => layer.version = Some(reader.varint()? as u32),
            (field, wire) if is_extension(field) => reader.skip(wire)?,
            (field, wire) => {
                return Err(DecodeError::new(format!(
                    "unexpected layer field {} (wire type {})",
                    field, wire
                )))
            }
        }
    }

    layer.name = name.ok_or_else(|| DecodeError::new("layer without a name"))?;
    Ok(layer)
}

/// Field numbers reserved for extensions by the vector tile schema.
fn is_extension(field: u32) -> bool {
    field >= 16
}

fn utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::new("invalid UTF-8 string"))
}

/// Minimal protobuf wire-format reader.
struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .data
                .get(self.pos)
                .ok_or_else(|| DecodeError::new("truncated varint"))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::new("varint too long"))
    }

    fn key(&mut self) -> Result<(u32, u8), DecodeError> {
        let key = self.varint()?;
        Ok(((key >> 3) as u32, (key & 0x7) as u8))
    }

    fn bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.varint()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| DecodeError::new("length-delimited field exceeds payload"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, wire: u8) -> Result<(), DecodeError> {
        let width = match wire {
            WIRE_VARINT => return self.varint().map(|_| ()),
            WIRE_LEN => return self.bytes().map(|_| ()),
            WIRE_FIXED64 => 8,
            WIRE_FIXED32 => 4,
            other => return Err(DecodeError::new(format!("unsupported wire type {}", other))),
        };
        if self.pos + width > self.data.len() {
            return Err(DecodeError::new("truncated fixed-width field"));
        }
        self.pos += width;
        Ok(())
    }
}
