use nom::{combinator::map, multi::length_count, sequence::tuple};
use num_traits::FromPrimitive;

use super::{
    opcode::Opcode,
    primitive::{blob, byte, bytes, fail, leb128_extent, string, truncated, var_u32, PResult},
    section::{
        DataSegment, ElemSegment, ExportEntry, FunctionBody, FunctionNames, GlobalVariable, ImportDesc,
        ImportEntry, LocalEntry, NameSection,
    },
    types::{ElemType, ExternalKind, FuncType, GlobalType, InitExpr, MemoryType, ResizableLimits, TableType, ValueType},
};
use crate::error::FormatReason;

const END: u8 = Opcode::End as u8;

fn decode_value_type(input: &[u8]) -> PResult<ValueType> {
    let (rest, code) = byte(input)?;
    match ValueType::from_u8(code) {
        Some(ty) => Ok((rest, ty)),
        None => fail(input, FormatReason::ValueType(code)),
    }
}

fn decode_elem_type(input: &[u8]) -> PResult<ElemType> {
    let (rest, code) = byte(input)?;
    match ElemType::from_u8(code) {
        Some(ty) => Ok((rest, ty)),
        None => fail(input, FormatReason::ElemType(code)),
    }
}

fn decode_external_kind(input: &[u8]) -> PResult<ExternalKind> {
    let (rest, kind) = byte(input)?;
    match ExternalKind::from_u8(kind) {
        Some(kind) => Ok((rest, kind)),
        None => fail(input, FormatReason::ExternalKind(kind)),
    }
}

fn decode_limits(input: &[u8]) -> PResult<ResizableLimits> {
    let (input, (flags, initial)) = tuple((var_u32, var_u32))(input)?;

    let (input, maximum) = if flags & ResizableLimits::HAS_MAXIMUM != 0 {
        map(var_u32, Some)(input)?
    } else {
        (input, None)
    };

    Ok((input, ResizableLimits { flags, initial, maximum }))
}

fn decode_table_type(input: &[u8]) -> PResult<TableType> {
    let (input, (elem_type, limits)) = tuple((decode_elem_type, decode_limits))(input)?;
    Ok((input, TableType { elem_type, limits }))
}

fn decode_memory_type(input: &[u8]) -> PResult<MemoryType> {
    map(decode_limits, |limits| MemoryType { limits })(input)
}

fn decode_global_type(input: &[u8]) -> PResult<GlobalType> {
    let (rest, content_type) = decode_value_type(input)?;
    let (after, flag) = var_u32(rest)?;

    let mutable = match flag {
        0 => false,
        1 => true,
        _ => return fail(rest, FormatReason::Mutability(flag)),
    };

    Ok((after, GlobalType { content_type, mutable }))
}

/// Collects raw opcodes up to the `end` marker. Immediates of the constant
/// opcodes are copied as-is so a literal 0x0b inside them is not taken as
/// the marker.
fn decode_init_expr(input: &[u8]) -> PResult<InitExpr> {
    let mut expr = vec![];
    let mut remaining = input;

    loop {
        let (rest, op) = byte(remaining)?;
        if op == END {
            return Ok((rest, InitExpr { expr }));
        }

        let (rest, immediate) = match Opcode::from_u8(op) {
            Some(Opcode::I32Const | Opcode::I64Const | Opcode::GetGlobal) => leb128_extent(rest)?,
            Some(Opcode::F32Const) => bytes(4)(rest)?,
            Some(Opcode::F64Const) => bytes(8)(rest)?,
            _ => (rest, &rest[..0]),
        };

        expr.push(op);
        expr.extend_from_slice(immediate);
        remaining = rest;
    }
}

fn decode_func_type(input: &[u8]) -> PResult<FuncType> {
    let (input, form) = byte(input)?;
    let (input, params) = length_count(var_u32, decode_value_type)(input)?;
    let (input, results) = length_count(var_u32, decode_value_type)(input)?;

    Ok((input, FuncType { form, params, results }))
}

pub(crate) fn decode_type_section(input: &[u8]) -> PResult<Vec<FuncType>> {
    length_count(var_u32, decode_func_type)(input)
}

fn decode_import_entry(input: &[u8]) -> PResult<ImportEntry> {
    let (input, module) = string(input)?;
    let (input, field) = string(input)?;
    let (input, kind) = decode_external_kind(input)?;

    let (input, desc) = match kind {
        ExternalKind::Function => map(var_u32, ImportDesc::Function)(input)?,
        ExternalKind::Table => map(decode_table_type, ImportDesc::Table)(input)?,
        ExternalKind::Memory => map(decode_memory_type, ImportDesc::Memory)(input)?,
        ExternalKind::Global => map(decode_global_type, ImportDesc::Global)(input)?,
    };

    Ok((input, ImportEntry { module, field, desc }))
}

pub(crate) fn decode_import_section(input: &[u8]) -> PResult<Vec<ImportEntry>> {
    length_count(var_u32, decode_import_entry)(input)
}

pub(crate) fn decode_function_section(input: &[u8]) -> PResult<Vec<u32>> {
    length_count(var_u32, var_u32)(input)
}

pub(crate) fn decode_table_section(input: &[u8]) -> PResult<Vec<TableType>> {
    length_count(var_u32, decode_table_type)(input)
}

pub(crate) fn decode_memory_section(input: &[u8]) -> PResult<Vec<MemoryType>> {
    length_count(var_u32, decode_memory_type)(input)
}

fn decode_global_variable(input: &[u8]) -> PResult<GlobalVariable> {
    let (input, (ty, init)) = tuple((decode_global_type, decode_init_expr))(input)?;
    Ok((input, GlobalVariable { ty, init }))
}

pub(crate) fn decode_global_section(input: &[u8]) -> PResult<Vec<GlobalVariable>> {
    length_count(var_u32, decode_global_variable)(input)
}

fn decode_export_entry(input: &[u8]) -> PResult<ExportEntry> {
    let (input, (field, kind, index)) = tuple((string, decode_external_kind, var_u32))(input)?;
    Ok((input, ExportEntry { field, kind, index }))
}

pub(crate) fn decode_export_section(input: &[u8]) -> PResult<Vec<ExportEntry>> {
    length_count(var_u32, decode_export_entry)(input)
}

pub(crate) fn decode_start_section(input: &[u8]) -> PResult<u32> {
    var_u32(input)
}

fn decode_elem_segment(input: &[u8]) -> PResult<ElemSegment> {
    let (input, index) = var_u32(input)?;
    let (input, offset) = decode_init_expr(input)?;
    let (input, elems) = length_count(var_u32, var_u32)(input)?;

    Ok((input, ElemSegment { index, offset, elems }))
}

pub(crate) fn decode_element_section(input: &[u8]) -> PResult<Vec<ElemSegment>> {
    length_count(var_u32, decode_elem_segment)(input)
}

fn decode_local_entry(input: &[u8]) -> PResult<LocalEntry> {
    let (input, (count, ty)) = tuple((var_u32, decode_value_type))(input)?;
    Ok((input, LocalEntry { count, ty }))
}

/// The body is length-framed, so its last byte must be the `end` marker.
fn decode_function_body(input: &[u8]) -> PResult<FunctionBody> {
    let (rest, body_size) = var_u32(input)?;
    let (rest, body) = bytes(body_size as usize)(rest)?;
    let (code, locals) = length_count(var_u32, decode_local_entry)(body)?;

    match code.split_last() {
        Some((&END, code)) => Ok((rest, FunctionBody { body_size, locals, code: code.to_vec() })),
        _ => truncated(body),
    }
}

pub(crate) fn decode_code_section(input: &[u8]) -> PResult<Vec<FunctionBody>> {
    length_count(var_u32, decode_function_body)(input)
}

fn decode_data_segment(input: &[u8]) -> PResult<DataSegment> {
    let (input, index) = var_u32(input)?;
    let (input, offset) = decode_init_expr(input)?;
    let (input, data) = blob(input)?;

    Ok((input, DataSegment { index, offset, data: data.to_vec() }))
}

pub(crate) fn decode_data_section(input: &[u8]) -> PResult<Vec<DataSegment>> {
    length_count(var_u32, decode_data_segment)(input)
}

fn decode_function_names(input: &[u8]) -> PResult<FunctionNames> {
    let (input, name) = string(input)?;
    let (input, locals) = length_count(var_u32, string)(input)?;

    Ok((input, FunctionNames { name, locals }))
}

pub(crate) fn decode_name_section(input: &[u8]) -> PResult<NameSection> {
    let (input, name) = string(input)?;
    let (input, funcs) = length_count(var_u32, decode_function_names)(input)?;

    Ok((input, NameSection { name, funcs }))
}
