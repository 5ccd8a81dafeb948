use std::{io::Read, path::Path};

use anyhow::Result;
use clap::Parser;

pub mod binary;
pub mod dump;
pub mod error;

pub use binary::{
    module::{Decoder, Module, ModuleHeader},
    primitive::{read_signed_varint, read_string, read_unsigned_varint},
};
pub use error::{DecodeError, Error, FormatReason};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct CmdConfig {
    #[arg(value_name="FILE", help="wasm or wat file path, - for stdin", default_value="-")]
    pub file: String,
    #[arg(long)]
    pub disable_ansi_color: bool,
    #[arg(short, long, help="list the entries of each section")]
    pub verbose: bool,
    #[arg(long, value_name="BYTES", help="reject modules larger than this")]
    pub max_size: Option<u64>,
}

pub fn get_args() -> Result<CmdConfig> {
    Ok(CmdConfig::parse())
}

/// Decodes a module from a byte stream.
pub fn decode_module(reader: impl Read) -> Result<Module, DecodeError> {
    Decoder::new().decode(reader)
}

/// Decodes the module stored at `path`.
pub fn open_module(path: impl AsRef<Path>) -> Result<Module, DecodeError> {
    Decoder::new().open(path)
}

#[cfg(test)]
mod api_tests {
    use std::io::Write;

    use anyhow::Result;
    use clap::Parser;

    use crate::{
        binary::section::{Section, SectionCode},
        decode_module, open_module, CmdConfig, Error, FormatReason,
    };

    #[test]
    fn decode_from_stream() -> Result<()> {
        let wasm = wat::parse_str(r#"(module (func (export "add") (param i32 i32) (result i32) (local.get 0) (local.get 1) i32.add))"#)?;
        let module = decode_module(&wasm[..])?;

        let Some(Section::Type(types)) = module.section(SectionCode::Type) else {
            panic!("type section missing");
        };
        assert_eq!(1, types.len());
        assert_eq!(2, types[0].params.len());

        let Some(Section::Export(exports)) = module.section(SectionCode::Export) else {
            panic!("export section missing");
        };
        assert_eq!("add", exports[0].field);
        Ok(())
    }

    #[test]
    fn open_by_path() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"\0asm\x01\x00\x00\x00\x03\x01\x00")?;

        let module = open_module(file.path())?;
        assert_eq!(vec![Section::Function(vec![])], module.sections);
        Ok(())
    }

    #[test]
    fn open_rejects_non_wasm() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"(module)")?;

        let err = open_module(file.path()).unwrap_err();
        assert!(matches!(err.error, Error::Format { offset: 0, reason: FormatReason::Magic(_) }));
        Ok(())
    }

    #[test]
    fn parse_args() {
        let config = CmdConfig::parse_from(["wasm-dump", "-v", "--max-size", "1024", "add.wasm"]);
        assert_eq!("add.wasm", config.file);
        assert!(config.verbose);
        assert!(!config.disable_ansi_color);
        assert_eq!(Some(1024), config.max_size);

        let config = CmdConfig::parse_from(["wasm-dump"]);
        assert_eq!("-", config.file);
    }
}
