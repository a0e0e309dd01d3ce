//! Embedded text metadata
//!
//! Exif comes from the image decoder (JPEG, PNG `eXIf`, WebP) and is read
//! for IFD0 ASCII tags and the Exif UserComment. PNG text chunks (`tEXt`,
//! `zTXt`, `iTXt`, compressed or not) come from the `png` decoder. JPEG
//! `APP1` XMP packets and `COM` segments are located by a segment scan;
//! XMP is parsed as XML.
//!
//! Unreadable or malformed structures contribute nothing.

use crate::signals::contains_keyword;
use image::{ImageDecoder, ImageReader};
use shared_types::MetadataField;
use std::io::Cursor;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SOI: &[u8] = &[0xFF, 0xD8];
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
/// PNG text keyword that carries an XMP packet
const PNG_XMP_KEYWORD: &str = "XML:com.adobe.xmp";

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_ARTIST: u16 = 0x013B;
const TAG_COPYRIGHT: u16 = 0x8298;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;

/// Every text field found in the container: Exif first, then the
/// container's own text
pub fn read_fields(bytes: &[u8]) -> Vec<MetadataField> {
    let mut fields = exif_blob(bytes)
        .map(|blob| exif_fields(&blob))
        .unwrap_or_default();
    if bytes.starts_with(PNG_SIGNATURE) {
        fields.extend(png_text(bytes));
    } else if bytes.starts_with(JPEG_SOI) {
        fields.extend(jpeg_segments(bytes));
    }
    fields
}

/// Fields whose name or value mentions a vocabulary term
pub fn ai_fields(bytes: &[u8], vocabulary: &[String]) -> Vec<MetadataField> {
    read_fields(bytes)
        .into_iter()
        .filter(|f| {
            vocabulary
                .iter()
                .any(|term| contains_keyword(&f.value, term) || contains_keyword(&f.field, term))
        })
        .collect()
}

fn field(name: impl Into<String>, value: impl Into<String>) -> Option<MetadataField> {
    let value: String = value.into();
    let value = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if value.is_empty() {
        return None;
    }
    Some(MetadataField {
        field: name.into(),
        value: value.to_string(),
    })
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Raw TIFF structure of the Exif block, if the decoder found one
fn exif_blob(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_decoder()
        .ok()?;
    let blob = decoder.exif_metadata().ok()??;
    Some(match blob.strip_prefix(EXIF_HEADER) {
        Some(tiff) => tiff.to_vec(),
        None => blob,
    })
}

fn png_text(bytes: &[u8]) -> Vec<MetadataField> {
    let Ok(reader) = png::Decoder::new(Cursor::new(bytes)).read_info() else {
        return Vec::new();
    };
    let info = reader.info();

    let mut entries: Vec<(String, String)> = info
        .uncompressed_latin1_text
        .iter()
        .map(|chunk| (chunk.keyword.clone(), chunk.text.clone()))
        .collect();
    entries.extend(
        info.compressed_latin1_text
            .iter()
            .filter_map(|chunk| Some((chunk.keyword.clone(), chunk.get_text().ok()?))),
    );
    entries.extend(
        info.utf8_text
            .iter()
            .filter_map(|chunk| Some((chunk.keyword.clone(), chunk.get_text().ok()?))),
    );

    let mut fields = Vec::new();
    for (keyword, text) in entries {
        if keyword == PNG_XMP_KEYWORD {
            fields.extend(xmp_fields(&text));
        } else {
            fields.extend(field(keyword, text));
        }
    }
    fields
}

/// XMP and comment segments ahead of the first scan
fn jpeg_segments(bytes: &[u8]) -> Vec<MetadataField> {
    let mut fields = Vec::new();
    let mut pos = JPEG_SOI.len();

    loop {
        // Skip fill bytes before the marker code
        while bytes.get(pos) == Some(&0xFF) && bytes.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        let (Some(&0xFF), Some(&marker)) = (bytes.get(pos), bytes.get(pos + 1)) else {
            break;
        };
        pos += 2;

        match marker {
            0xD0..=0xD7 | 0x01 => continue,
            0xDA | 0xD9 => break,
            _ => {}
        }

        let Some(len_bytes) = bytes.get(pos..pos + 2) else {
            break;
        };
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        if len < 2 {
            break;
        }
        let Some(segment) = bytes.get(pos + 2..pos + len) else {
            break;
        };

        match marker {
            0xE1 if segment.starts_with(XMP_HEADER) => {
                fields.extend(xmp_fields(&String::from_utf8_lossy(
                    &segment[XMP_HEADER.len()..],
                )));
            }
            0xFE => fields.extend(field("Comment", String::from_utf8_lossy(segment))),
            _ => {}
        }
        pos += len;
    }
    fields
}

/// Property attributes and leaf values of an XMP packet. Values inside RDF
/// containers (`rdf:Alt`, `rdf:Seq`, ...) are named after the property
/// that holds the container.
fn xmp_fields(packet: &str) -> Vec<MetadataField> {
    let packet = packet.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let Ok(doc) = roxmltree::Document::parse(packet) else {
        return Vec::new();
    };

    let mut fields = Vec::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        for attr in node.attributes() {
            if matches!(attr.namespace(), Some(RDF_NS) | Some(XML_NS)) {
                continue;
            }
            fields.extend(field(
                qualified(node, attr.namespace(), attr.name()),
                attr.value(),
            ));
        }

        if node.children().any(|c| c.is_element()) {
            continue;
        }
        let Some(text) = node.text() else {
            continue;
        };
        let owner = node
            .ancestors()
            .find(|n| n.is_element() && n.tag_name().namespace() != Some(RDF_NS))
            .unwrap_or(node);
        let name = qualified(owner, owner.tag_name().namespace(), owner.tag_name().name());
        fields.extend(field(name, text));
    }
    fields
}

/// `prefix:name` as written in the packet, or the bare name
fn qualified(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, name: &str) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name),
        _ => name.to_string(),
    }
}

/// Bounds-checked reader over a TIFF structure
struct Tiff<'a> {
    data: &'a [u8],
    little_endian: bool,
}

impl<'a> Tiff<'a> {
    fn parse(data: &'a [u8]) -> Option<(Self, usize)> {
        let little_endian = match data.get(0..4)? {
            b"II*\0" => true,
            b"MM\0*" => false,
            _ => return None,
        };
        let tiff = Self { data, little_endian };
        let ifd0 = tiff.u32(4)? as usize;
        Some((tiff, ifd0))
    }

    fn u16(&self, at: usize) -> Option<u16> {
        let b = self.data.get(at..at + 2)?;
        Some(if self.little_endian {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            u16::from_be_bytes([b[0], b[1]])
        })
    }

    fn u32(&self, at: usize) -> Option<u32> {
        let b = self.data.get(at..at + 4)?;
        Some(if self.little_endian {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        })
    }

    /// (tag, count, entry offset) for each IFD entry
    fn entries(&self, ifd: usize) -> Vec<(u16, usize, usize)> {
        let Some(count) = self.u16(ifd) else {
            return Vec::new();
        };
        (0..count as usize)
            .map(|i| ifd + 2 + i * 12)
            .map_while(|entry| {
                let tag = self.u16(entry)?;
                let count = self.u32(entry + 4)? as usize;
                Some((tag, count, entry))
            })
            .collect()
    }

    /// Raw value bytes for a byte-sized type (ASCII / UNDEFINED)
    fn bytes(&self, count: usize, entry: usize) -> Option<&'a [u8]> {
        if count <= 4 {
            self.data.get(entry + 8..entry + 8 + count)
        } else {
            let offset = self.u32(entry + 8)? as usize;
            self.data.get(offset..offset.checked_add(count)?)
        }
    }

    fn user_comment(&self, raw: &[u8]) -> Option<String> {
        let (code, text) = (raw.get(..8)?, raw.get(8..)?);
        if code == b"UNICODE\0" {
            let units: Vec<u16> = text
                .chunks_exact(2)
                .map(|c| {
                    if self.little_endian {
                        u16::from_le_bytes([c[0], c[1]])
                    } else {
                        u16::from_be_bytes([c[0], c[1]])
                    }
                })
                .collect();
            Some(String::from_utf16_lossy(&units))
        } else {
            Some(String::from_utf8_lossy(text).into_owned())
        }
    }
}

fn exif_fields(data: &[u8]) -> Vec<MetadataField> {
    let Some((tiff, ifd0)) = Tiff::parse(data) else {
        return Vec::new();
    };
    let mut fields = Vec::new();
    let mut exif_ifd = None;

    for (tag, count, entry) in tiff.entries(ifd0) {
        let name = match tag {
            TAG_IMAGE_DESCRIPTION => "ImageDescription",
            TAG_SOFTWARE => "Software",
            TAG_ARTIST => "Artist",
            TAG_COPYRIGHT => "Copyright",
            TAG_EXIF_IFD => {
                exif_ifd = tiff.u32(entry + 8).map(|o| o as usize);
                continue;
            }
            _ => continue,
        };
        if let Some(raw) = tiff.bytes(count, entry) {
            fields.extend(field(name, latin1(raw)));
        }
    }

    if let Some(ifd) = exif_ifd {
        for (tag, count, entry) in tiff.entries(ifd) {
            if tag != TAG_USER_COMMENT {
                continue;
            }
            if let Some(text) = tiff.bytes(count, entry).and_then(|raw| tiff.user_comment(raw)) {
                fields.extend(field("UserComment", text));
            }
        }
    }
    fields
}
