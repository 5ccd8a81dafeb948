use std::io::{self, Write};

use crate::binary::{
    module::ModuleHeader,
    section::{ImportDesc, Section},
};

/// Writes the `wasm-dump` summary: the header, the section count and one
/// line per section. With `verbose`, the entries of each section follow.
pub fn write_summary(
    out: &mut impl Write,
    header: Option<&ModuleHeader>,
    sections: &[Section],
    verbose: bool,
) -> io::Result<()> {
    if let Some(header) = header {
        writeln!(out, "module header: {header}")?;
    }
    writeln!(out, "#sections: {}", sections.len())?;

    for section in sections {
        let code = section.code();
        writeln!(out, "section: {:2} ({}) entries={}", code as u8, code.name(), section.len())?;

        if verbose {
            write_entries(out, section)?;
        }
    }

    Ok(())
}

fn write_entries(out: &mut impl Write, section: &Section) -> io::Result<()> {
    match section {
        Section::Name(names) => {
            for (i, func) in names.funcs.iter().enumerate() {
                writeln!(out, "    [{i}] {:?} locals={:?}", func.name, func.locals)?;
            }
        }
        Section::Type(types) => {
            for (i, ty) in types.iter().enumerate() {
                writeln!(out, "    [{i}] {ty}")?;
            }
        }
        Section::Import(imports) => {
            for (i, import) in imports.iter().enumerate() {
                let desc = match &import.desc {
                    ImportDesc::Function(index) => format!("type {index}"),
                    ImportDesc::Table(table) => format!("{:?} {}", table.elem_type, table.limits),
                    ImportDesc::Memory(memory) => memory.limits.to_string(),
                    ImportDesc::Global(global) => {
                        format!("{}{}", if global.mutable { "mut " } else { "" }, global.content_type)
                    }
                };
                writeln!(out, "    [{i}] {:?}.{:?} {} {desc}", import.module, import.field, import.kind())?;
            }
        }
        Section::Function(fns) => {
            for (i, ty) in fns.iter().enumerate() {
                writeln!(out, "    [{i}] type {ty}")?;
            }
        }
        Section::Table(tables) => {
            for (i, table) in tables.iter().enumerate() {
                writeln!(out, "    [{i}] {:?} {}", table.elem_type, table.limits)?;
            }
        }
        Section::Memory(memories) => {
            for (i, memory) in memories.iter().enumerate() {
                writeln!(out, "    [{i}] {}", memory.limits)?;
            }
        }
        Section::Global(globals) => {
            for (i, global) in globals.iter().enumerate() {
                let mutability = if global.ty.mutable { "mut " } else { "" };
                writeln!(out, "    [{i}] {mutability}{} init={:?}", global.ty.content_type, global.init.opcode())?;
            }
        }
        Section::Export(exports) => {
            for (i, export) in exports.iter().enumerate() {
                writeln!(out, "    [{i}] {:?} {} {}", export.field, export.kind, export.index)?;
            }
        }
        Section::Start(index) => writeln!(out, "    function {index}")?,
        Section::Element(segments) => {
            for (i, segment) in segments.iter().enumerate() {
                writeln!(out, "    [{i}] table {} elems={:?}", segment.index, segment.elems)?;
            }
        }
        Section::Code(bodies) => {
            for (i, body) in bodies.iter().enumerate() {
                let locals: u32 = body.locals.iter().map(|local| local.count).sum();
                writeln!(out, "    [{i}] size={} locals={locals} code={}B", body.body_size, body.code.len())?;
            }
        }
        Section::Data(segments) => {
            for (i, segment) in segments.iter().enumerate() {
                writeln!(out, "    [{i}] memory {} {}B", segment.index, segment.data.len())?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod dump_tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::write_summary;
    use crate::binary::{
        module::{Module, ModuleHeader},
        section::Section,
    };

    #[test]
    fn summary_of_add_module() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module (func (export "add") (param i32 i32) (result i32) (local.get 0) (local.get 1) i32.add))"#,
        )?;
        let module = Module::new(&wasm)?;

        let mut out = vec![];
        write_summary(&mut out, Some(&module.header), &module.sections, false)?;

        let expected = r#"module header: ModuleHeader{Magic="\x00asm" Version=0x1}
#sections: 4
section:  1 (type) entries=1
section:  3 (function) entries=1
section:  7 (export) entries=1
section: 10 (code) entries=1
"#;
        assert_eq!(expected, String::from_utf8(out)?);
        Ok(())
    }

    #[test]
    fn verbose_summary() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module
                (import "env" "log" (func (param i32)))
                (memory 1 2)
                (global i32 (i32.const 7))
                (func (local i32 i64) nop)
                (export "mem" (memory 0)))"#,
        )?;
        let module = Module::new(&wasm)?;

        let mut out = vec![];
        write_summary(&mut out, None, &module.sections, true)?;

        let expected = r#"#sections: 7
section:  1 (type) entries=2
    [0] func (i32) -> ()
    [1] func () -> ()
section:  2 (import) entries=1
    [0] "env"."log" function type 0
section:  3 (function) entries=1
    [0] type 1
section:  5 (memory) entries=1
    [0] 1..2
section:  6 (global) entries=1
    [0] i32 init=Some(I32Const)
section:  7 (export) entries=1
    [0] "mem" memory 0
section: 10 (code) entries=1
    [0] size=7 locals=2 code=1B
"#;
        assert_eq!(expected, String::from_utf8(out)?);
        Ok(())
    }

    #[test]
    fn summary_of_partial_module() -> Result<()> {
        let mut out = vec![];
        write_summary(&mut out, Some(&ModuleHeader::default()), &[Section::Start(3)], true)?;

        let expected = r#"module header: ModuleHeader{Magic="\x00asm" Version=0x1}
#sections: 1
section:  8 (start) entries=1
    function 3
"#;
        assert_eq!(expected, String::from_utf8(out)?);
        Ok(())
    }
}
