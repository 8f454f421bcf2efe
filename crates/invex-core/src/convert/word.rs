//! Text from word-processing documents.
//!
//! `.docx` is read with docx-rs. Legacy `.doc` files are OLE compound files;
//! their text is reassembled from the piece table in the `WordDocument`
//! stream.

use std::io::{Cursor, Read};

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild, TableRowChild};
use tracing::debug;

use super::Result;
use crate::error::ConvertError;

/// Paragraph text of a `.docx`, in document order, one paragraph per line.
pub fn docx_to_text(data: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(data).map_err(|e| ConvertError::Document(format!("{:?}", e)))?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(para) => lines.push(paragraph_text(para)),
            DocumentChild::Table(table) => table_lines(table, &mut lines),
            _ => {}
        }
    }

    Ok(join_lines(lines))
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// One line per table row, cells separated by tabs.
fn table_lines(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let TableChild::TableRow(row) = row else {
            continue;
        };
        let mut cells = Vec::new();
        for cell in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let mut parts = Vec::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(para) => parts.push(paragraph_text(para)),
                    TableCellContent::Table(nested) => table_lines(nested, lines),
                    _ => {}
                }
            }
            cells.push(parts.join(" ").trim().to_string());
        }
        lines.push(cells.join("\t"));
    }
}

fn join_lines(lines: Vec<String>) -> String {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

const FIB_MAGIC: u16 = 0xA5EC;
const FIB_WHICH_TABLE: u16 = 0x0200;
const FC_COMPRESSED: u32 = 0x4000_0000;
/// Position of `fcClx` within FibRgFcLcb97, counted in u32 slots.
const FC_CLX_SLOT: usize = 66;

/// Main-document text of a Word 97-2003 `.doc`, one paragraph per line.
pub fn doc_to_text(data: &[u8]) -> Result<String> {
    let mut compound =
        cfb::CompoundFile::open(Cursor::new(data)).map_err(|e| ConvertError::Document(format!("not an OLE file: {}", e)))?;

    let word = read_stream(&mut compound, "/WordDocument")?;
    let fib = Fib::parse(&word)?;
    let table_name = if fib.table_one { "/1Table" } else { "/0Table" };
    let table = read_stream(&mut compound, table_name)?;

    let clx = table
        .get(fib.fc_clx..fib.fc_clx + fib.lcb_clx)
        .ok_or_else(|| malformed("Clx outside table stream"))?;

    let mut text = String::new();
    for piece in pieces(clx)? {
        piece.decode_into(&word, &mut text)?;
    }

    let main: String = text.chars().take(fib.ccp_text).collect();
    debug!("Decoded {} chars of .doc text", main.len());

    Ok(join_lines(clean_doc_text(&main).split('\n').map(str::to_string).collect()))
}

fn read_stream(compound: &mut cfb::CompoundFile<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>> {
    let mut stream = compound
        .open_stream(name)
        .map_err(|e| ConvertError::Document(format!("missing stream {}: {}", name, e)))?;
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .map_err(|e| ConvertError::Document(e.to_string()))?;
    Ok(buf)
}

fn malformed(what: &str) -> ConvertError {
    ConvertError::Document(format!("malformed .doc: {}", what))
}

fn u16_at(buf: &[u8], at: usize) -> Option<u16> {
    buf.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(buf: &[u8], at: usize) -> Option<u32> {
    buf.get(at..at + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// The few File Information Block fields needed to locate the text.
struct Fib {
    table_one: bool,
    ccp_text: usize,
    fc_clx: usize,
    lcb_clx: usize,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self> {
        if u16_at(word, 0) != Some(FIB_MAGIC) {
            return Err(malformed("bad FIB signature"));
        }
        let flags = u16_at(word, 0x0A).ok_or_else(|| malformed("short FIB"))?;

        let csw = u16_at(word, 32).ok_or_else(|| malformed("short FIB"))? as usize;
        let rg_lw = 32 + 2 + csw * 2 + 2;
        let cslw = u16_at(word, rg_lw - 2).ok_or_else(|| malformed("short FIB"))? as usize;
        let ccp_text = u32_at(word, rg_lw + 12).ok_or_else(|| malformed("short FIB"))? as usize;
        let rg_fc_lcb = rg_lw + cslw * 4 + 2;

        let fc_clx = u32_at(word, rg_fc_lcb + FC_CLX_SLOT * 4).ok_or_else(|| malformed("short FIB"))?;
        let lcb_clx = u32_at(word, rg_fc_lcb + (FC_CLX_SLOT + 1) * 4).ok_or_else(|| malformed("short FIB"))?;

        Ok(Self {
            table_one: flags & FIB_WHICH_TABLE != 0,
            ccp_text,
            fc_clx: fc_clx as usize,
            lcb_clx: lcb_clx as usize,
        })
    }
}

/// A run of characters stored contiguously in the WordDocument stream.
struct Piece {
    chars: usize,
    offset: usize,
    compressed: bool,
}

impl Piece {
    fn decode_into(&self, word: &[u8], out: &mut String) -> Result<()> {
        if self.compressed {
            let bytes = word
                .get(self.offset..self.offset + self.chars)
                .ok_or_else(|| malformed("piece outside WordDocument"))?;
            out.extend(bytes.iter().map(|&b| cp1252(b)));
        } else {
            let bytes = word
                .get(self.offset..self.offset + self.chars * 2)
                .ok_or_else(|| malformed("piece outside WordDocument"))?;
            let units: Vec<u16> = bytes.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])).collect();
            out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
        }
        Ok(())
    }
}

/// Walk the Clx: skip Prc entries, then read the PlcPcd.
fn pieces(clx: &[u8]) -> Result<Vec<Piece>> {
    let mut pos = 0;
    while let Some(&kind) = clx.get(pos) {
        match kind {
            0x01 => {
                let cb = u16_at(clx, pos + 1).ok_or_else(|| malformed("short Prc"))? as usize;
                pos += 3 + cb;
            }
            0x02 => {
                let lcb = u32_at(clx, pos + 1).ok_or_else(|| malformed("short Pcdt"))? as usize;
                let plc = clx.get(pos + 5..pos + 5 + lcb).ok_or_else(|| malformed("short PlcPcd"))?;
                return parse_plc_pcd(plc);
            }
            _ => return Err(malformed("unknown Clx entry")),
        }
    }
    Err(malformed("no piece table"))
}

fn parse_plc_pcd(plc: &[u8]) -> Result<Vec<Piece>> {
    if plc.len() < 4 {
        return Err(malformed("empty PlcPcd"));
    }
    let count = (plc.len() - 4) / 12;
    let pcd_base = (count + 1) * 4;

    (0..count)
        .map(|i| {
            let start = u32_at(plc, i * 4).ok_or_else(|| malformed("short CP array"))?;
            let end = u32_at(plc, (i + 1) * 4).ok_or_else(|| malformed("short CP array"))?;
            let fc = u32_at(plc, pcd_base + i * 8 + 2).ok_or_else(|| malformed("short Pcd"))?;
            let compressed = fc & FC_COMPRESSED != 0;
            let offset = if compressed { ((fc & !FC_COMPRESSED) / 2) as usize } else { fc as usize };
            Ok(Piece {
                chars: end.saturating_sub(start) as usize,
                offset,
                compressed,
            })
        })
        .collect()
}

/// Windows-1252 for the compressed 8-bit pieces.
fn cp1252(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8d}', 'Ž', '\u{8f}',
        '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9d}', 'ž', 'Ÿ',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// Map Word control characters to plain text.
///
/// Field instructions (between 0x13 and 0x14) are dropped, field results kept.
fn clean_doc_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut field_depth = 0usize;
    let mut in_instruction = false;

    for c in text.chars() {
        match c {
            '\u{13}' => {
                field_depth += 1;
                in_instruction = true;
            }
            '\u{14}' => in_instruction = false,
            '\u{15}' => {
                field_depth = field_depth.saturating_sub(1);
                in_instruction = false;
            }
            _ if in_instruction && field_depth > 0 => {}
            '\r' | '\u{0B}' | '\u{0C}' => out.push('\n'),
            '\u{07}' => out.push('\t'),
            '\t' => out.push('\t'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
