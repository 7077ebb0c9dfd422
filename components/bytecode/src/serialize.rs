//! Binary bcode codec.
//!
//! Layout: magic `PTRL`, a version byte, then the root record. Each record
//! is: strict flag, args count, name table, literal pool (with nested
//! function records inline), line table, and the opcode bytes. All integers
//! are little-endian u32 unless noted.

use crate::bcode::{Bcode, LineRec, Lit};
use std::rc::Rc;

const MAGIC: &[u8; 4] = b"PTRL";
const VERSION: u8 = 1;

// Literal kind tags.
const LIT_NUMBER: u8 = 0;
const LIT_STR: u8 = 1;
const LIT_REGEXP: u8 = 2;
const LIT_FUNC: u8 = 3;

/// Serializes a bcode tree.
pub fn serialize(bcode: &Bcode) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    write_record(bcode, &mut out);
    out
}

/// Deserializes a bcode tree produced by [`serialize`].
pub fn deserialize(bytes: &[u8]) -> Result<Bcode, String> {
    if bytes.len() < 5 {
        return Err("truncated bcode image".to_string());
    }
    if &bytes[0..4] != MAGIC {
        return Err("bad magic".to_string());
    }
    if bytes[4] != VERSION {
        return Err(format!("unsupported bcode version {}", bytes[4]));
    }
    let mut off = 5;
    read_record(bytes, &mut off)
}

fn write_record(bcode: &Bcode, out: &mut Vec<u8>) {
    out.push(bcode.strict as u8);
    out.push(bcode.args_cnt);

    write_u32(out, bcode.names.len() as u32);
    for name in &bcode.names {
        write_bytes(out, name.as_bytes());
    }

    write_u32(out, bcode.lits.len() as u32);
    for lit in &bcode.lits {
        match lit {
            Lit::Number(n) => {
                out.push(LIT_NUMBER);
                out.extend_from_slice(&n.to_le_bytes());
            }
            Lit::Str(s) => {
                out.push(LIT_STR);
                write_bytes(out, s.as_bytes());
            }
            Lit::Regexp { source, flags } => {
                out.push(LIT_REGEXP);
                write_bytes(out, source.as_bytes());
                write_bytes(out, flags.as_bytes());
            }
            Lit::Func(inner) => {
                out.push(LIT_FUNC);
                write_record(inner, out);
            }
        }
    }

    write_u32(out, bcode.lines.len() as u32);
    for rec in &bcode.lines {
        write_u32(out, rec.ops_off);
        write_u32(out, rec.line);
    }

    write_bytes(out, &bcode.ops);
}

fn read_record(bytes: &[u8], off: &mut usize) -> Result<Bcode, String> {
    let strict = read_u8(bytes, off)? != 0;
    let args_cnt = read_u8(bytes, off)?;

    let name_cnt = read_u32(bytes, off)? as usize;
    let mut names = Vec::with_capacity(name_cnt);
    for _ in 0..name_cnt {
        let raw = read_bytes(bytes, off)?;
        names.push(String::from_utf8(raw.to_vec()).map_err(|e| e.to_string())?);
    }

    let lit_cnt = read_u32(bytes, off)? as usize;
    let mut lits = Vec::with_capacity(lit_cnt);
    for _ in 0..lit_cnt {
        let tag = read_u8(bytes, off)?;
        lits.push(match tag {
            LIT_NUMBER => {
                if *off + 8 > bytes.len() {
                    return Err("truncated number literal".to_string());
                }
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[*off..*off + 8]);
                *off += 8;
                Lit::Number(f64::from_le_bytes(buf))
            }
            LIT_STR => {
                let raw = read_bytes(bytes, off)?;
                Lit::Str(String::from_utf8(raw.to_vec()).map_err(|e| e.to_string())?)
            }
            LIT_REGEXP => {
                let source = read_bytes(bytes, off)?.to_vec();
                let flags = read_bytes(bytes, off)?.to_vec();
                Lit::Regexp {
                    source: String::from_utf8(source).map_err(|e| e.to_string())?,
                    flags: String::from_utf8(flags).map_err(|e| e.to_string())?,
                }
            }
            LIT_FUNC => Lit::Func(Rc::new(read_record(bytes, off)?)),
            other => return Err(format!("unknown literal tag {}", other)),
        });
    }

    let line_cnt = read_u32(bytes, off)? as usize;
    let mut lines = Vec::with_capacity(line_cnt);
    for _ in 0..line_cnt {
        let ops_off = read_u32(bytes, off)?;
        let line = read_u32(bytes, off)?;
        lines.push(LineRec { ops_off, line });
    }

    let ops = read_bytes(bytes, off)?.to_vec();

    Ok(Bcode {
        ops,
        lits,
        names,
        args_cnt,
        strict,
        lines,
    })
}

fn write_u32(out: &mut Vec<u8>, n: u32) {
    out.extend_from_slice(&n.to_le_bytes());
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
}

fn read_u8(bytes: &[u8], off: &mut usize) -> Result<u8, String> {
    let b = *bytes.get(*off).ok_or("truncated bcode image")?;
    *off += 1;
    Ok(b)
}

fn read_u32(bytes: &[u8], off: &mut usize) -> Result<u32, String> {
    if *off + 4 > bytes.len() {
        return Err("truncated bcode image".to_string());
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[*off..*off + 4]);
    *off += 4;
    Ok(u32::from_le_bytes(buf))
}

fn read_bytes<'a>(bytes: &'a [u8], off: &mut usize) -> Result<&'a [u8], String> {
    let len = read_u32(bytes, off)? as usize;
    if *off + len > bytes.len() {
        return Err("truncated bcode image".to_string());
    }
    let out = &bytes[*off..*off + len];
    *off += len;
    Ok(out)
}
