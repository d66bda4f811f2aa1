//! STL decoding
//!
//! The encoding is decided from the bytes alone, never from the file name.
//! Binary files are recognised by their exact length; anything else that
//! reads like an ASCII solid is parsed as text.

use std::io::Cursor;

use log::debug;

use crate::{error::AssetError, gfx::geometry::MeshGeometry};

const HEADER_LEN: usize = 80;
const BINARY_PREAMBLE_LEN: usize = HEADER_LEN + 4;
const BINARY_TRIANGLE_LEN: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    Ascii,
    Binary,
}

/// Decide how to decode `bytes`
///
/// A buffer is binary when its length is exactly `84 + 50 * n` for the
/// triangle count `n` stored at offset 80. Many exporters write `solid` into
/// the binary header, so the length test runs first.
pub fn sniff_format(bytes: &[u8]) -> StlFormat {
    if let Some(count) = binary_triangle_count(bytes) {
        let expected = BINARY_PREAMBLE_LEN as u64 + BINARY_TRIANGLE_LEN * u64::from(count);
        if expected == bytes.len() as u64 {
            return StlFormat::Binary;
        }
    }

    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let body = &bytes[start..];
    if body.starts_with(b"solid") && contains(body, b"facet") {
        StlFormat::Ascii
    } else {
        StlFormat::Binary
    }
}

/// Decode an STL buffer into mesh geometry
///
/// `path` only labels errors.
pub fn parse_stl(path: &str, bytes: &[u8]) -> Result<MeshGeometry, AssetError> {
    let format = sniff_format(bytes);
    debug!("Decoding {} as {:?} STL ({} bytes)", path, format, bytes.len());

    let normalized = match format {
        StlFormat::Ascii => ascii_body(bytes),
        StlFormat::Binary => blank_header(bytes),
    };
    let mesh = stl_io::read_stl(&mut Cursor::new(normalized)).map_err(|err| AssetError::Malformed {
        path: path.to_string(),
        reason: err.to_string(),
    })?;

    if mesh.faces.is_empty() {
        return Err(AssetError::Empty {
            path: path.to_string(),
        });
    }

    let positions = mesh.vertices.iter().map(|v| [v[0], v[1], v[2]]).collect();
    let indices = mesh
        .faces
        .iter()
        .flat_map(|face| face.vertices.iter().map(|&i| i as u32))
        .collect();

    MeshGeometry::from_indexed(positions, indices).map_err(|err| AssetError::Malformed {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

/// Copy of a binary buffer whose header cannot be mistaken for text
fn blank_header(bytes: &[u8]) -> Vec<u8> {
    let mut copy = bytes.to_vec();
    let len = copy.len().min(HEADER_LEN);
    copy[..len].fill(0);
    copy
}

/// Text starting at the `solid` keyword, with the name line rewritten so the
/// decoder accepts it
fn ascii_body(bytes: &[u8]) -> Vec<u8> {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let body = &bytes[start..];
    let rest = body
        .iter()
        .position(|&b| b == b'\n')
        .map_or(&body[body.len()..], |end| &body[end..]);

    let mut text = b"solid mesh".to_vec();
    text.extend_from_slice(rest);
    text
}

fn binary_triangle_count(bytes: &[u8]) -> Option<u32> {
    let raw = bytes.get(HEADER_LEN..BINARY_PREAMBLE_LEN)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
