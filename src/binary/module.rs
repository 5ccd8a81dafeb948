use std::{
    fmt,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use num_traits::FromPrimitive;
use tracing::{debug, trace, warn};

use super::{
    payload::{
        decode_code_section, decode_data_section, decode_element_section, decode_export_section,
        decode_function_section, decode_global_section, decode_import_section, decode_memory_section,
        decode_name_section, decode_start_section, decode_table_section, decode_type_section,
    },
    primitive::{bytes, fail, locate, var_u32, PResult},
    section::{Section, SectionCode},
};
use crate::error::{DecodeError, Error, FormatReason};

pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleHeader {
    pub magic: [u8; 4],
    pub version: u32,
}

impl Default for ModuleHeader {
    fn default() -> Self {
        Self { magic: WASM_MAGIC, version: 1 }
    }
}

impl fmt::Display for ModuleHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleHeader{{Magic=\"{}\" Version={:#x}}}", self.magic.escape_ascii(), self.version)
    }
}

/// A decoded module. Sections are kept in the order they appear in the binary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Module {
    pub header: ModuleHeader,
    pub sections: Vec<Section>,
}

impl Module {
    pub fn new(wasm: &[u8]) -> Result<Self, DecodeError> {
        Decoder::new().decode_bytes(wasm)
    }

    /// First section of the given kind.
    pub fn section(&self, code: SectionCode) -> Option<&Section> {
        self.sections.iter().find(|section| section.code() == code)
    }
}

/// Module decoder. The defaults accept input of any size and cannot be
/// cancelled.
#[derive(Debug, Default, Clone)]
pub struct Decoder {
    size_limit: Option<u64>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects modules larger than `limit` bytes without reading past it.
    pub fn with_size_limit(mut self, limit: u64) -> Self {
        self.size_limit = Some(limit);
        self
    }

    /// Stops decoding at the next section boundary once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<Module, DecodeError> {
        let file = File::open(path).map_err(Error::from)?;
        self.decode(BufReader::new(file))
    }

    pub fn decode(&self, reader: impl Read) -> Result<Module, DecodeError> {
        let wasm = self.read_all(reader)?;
        self.decode_bytes(&wasm)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = wasm.len()))]
    pub fn decode_bytes(&self, wasm: &[u8]) -> Result<Module, DecodeError> {
        if let Some(limit) = self.size_limit {
            if wasm.len() as u64 > limit {
                return Err(Error::TooLarge { limit }.into());
            }
        }

        let (input, header) = decode_header(wasm).map_err(|err| locate(err, wasm))?;
        trace!(version = header.version, "module header");

        let mut module = Module { header, sections: vec![] };
        let mut remaining = input;

        while !remaining.is_empty() {
            if self.is_cancelled() {
                return Err(DecodeError::partial(module, Error::Cancelled));
            }

            match decode_section(remaining) {
                Ok((rest, section)) => {
                    debug!(code = ?section.code(), entries = section.len(), "decoded section");
                    module.sections.push(section);
                    remaining = rest;
                }
                Err(err) => return Err(DecodeError::partial(module, locate(err, wasm))),
            }
        }

        Ok(module)
    }

    fn read_all(&self, mut reader: impl Read) -> Result<Vec<u8>, Error> {
        let mut wasm = vec![];

        match self.size_limit {
            Some(limit) => {
                reader.take(limit.saturating_add(1)).read_to_end(&mut wasm)?;
                if wasm.len() as u64 > limit {
                    return Err(Error::TooLarge { limit });
                }
            }
            None => {
                reader.read_to_end(&mut wasm)?;
            }
        }

        Ok(wasm)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

fn decode_header(input: &[u8]) -> PResult<ModuleHeader> {
    if !input.starts_with(&WASM_MAGIC) {
        let seen = input[..input.len().min(WASM_MAGIC.len())].to_vec();
        return fail(input, FormatReason::Magic(seen));
    }

    let (input, _) = bytes(WASM_MAGIC.len())(input)?;
    let (input, version) = bytes(4)(input)?;
    let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);

    Ok((input, ModuleHeader { magic: WASM_MAGIC, version }))
}

fn decode_section_header(input: &[u8]) -> PResult<(SectionCode, u32)> {
    let (rest, id) = var_u32(input)?;
    let Some(code) = SectionCode::from_u32(id) else {
        return fail(input, FormatReason::SectionId(id));
    };
    let (rest, size) = var_u32(rest)?;

    Ok((rest, (code, size)))
}

/// Decodes one section from a view bounded to its declared size. Bytes the
/// payload decoder leaves unread are dropped.
fn decode_section(input: &[u8]) -> PResult<Section> {
    let (input, (code, size)) = decode_section_header(input)?;
    let (rest, contents) = bytes(size as usize)(input)?;
    trace!(?code, size, "section header");

    let (unread, section) = match code {
        SectionCode::Custom => {
            let (unread, names) = decode_name_section(contents)?;
            (unread, Section::Name(names))
        }
        SectionCode::Type => {
            let (unread, types) = decode_type_section(contents)?;
            (unread, Section::Type(types))
        }
        SectionCode::Import => {
            let (unread, imports) = decode_import_section(contents)?;
            (unread, Section::Import(imports))
        }
        SectionCode::Function => {
            let (unread, fns) = decode_function_section(contents)?;
            (unread, Section::Function(fns))
        }
        SectionCode::Table => {
            let (unread, tables) = decode_table_section(contents)?;
            (unread, Section::Table(tables))
        }
        SectionCode::Memory => {
            let (unread, memories) = decode_memory_section(contents)?;
            (unread, Section::Memory(memories))
        }
        SectionCode::Global => {
            let (unread, globals) = decode_global_section(contents)?;
            (unread, Section::Global(globals))
        }
        SectionCode::Export => {
            let (unread, exports) = decode_export_section(contents)?;
            (unread, Section::Export(exports))
        }
        SectionCode::Start => {
            let (unread, index) = decode_start_section(contents)?;
            (unread, Section::Start(index))
        }
        SectionCode::Element => {
            let (unread, segments) = decode_element_section(contents)?;
            (unread, Section::Element(segments))
        }
        SectionCode::Code => {
            let (unread, bodies) = decode_code_section(contents)?;
            (unread, Section::Code(bodies))
        }
        SectionCode::Data => {
            let (unread, segments) = decode_data_section(contents)?;
            (unread, Section::Data(segments))
        }
    };

    if !unread.is_empty() {
        warn!(?code, unread = unread.len(), "discarding unread section bytes");
    }

    Ok((rest, section))
}
