use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::opcode::Opcode;

/// Type constructor for the `func` form of a type section entry.
pub const FUNC_FORM: u8 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ValueType {
    I32 = 0x7F,
    I64 = 0x7E,
    F32 = 0x7D,
    F64 = 0x7C,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ElemType {
    AnyFunc = 0x70,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    pub form: u8,
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl Default for FuncType {
    fn default() -> Self {
        Self { form: FUNC_FORM, params: vec![], results: vec![] }
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func ({}) -> ({})", join(&self.params), join(&self.results))
    }
}

fn join(tys: &[ValueType]) -> String {
    tys.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ExternalKind {
    Function = 0,
    Table = 1,
    Memory = 2,
    Global = 3,
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExternalKind::Function => "function",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
        };
        f.write_str(name)
    }
}

/// Limits of a table or memory. `flags` bit 0 is set iff `maximum` is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizableLimits {
    pub flags: u32,
    pub initial: u32,
    pub maximum: Option<u32>,
}

impl ResizableLimits {
    pub const HAS_MAXIMUM: u32 = 0x1;
}

impl fmt::Display for ResizableLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.maximum {
            Some(max) => write!(f, "{}..{}", self.initial, max),
            None => write!(f, "{}..", self.initial),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub elem_type: ElemType,
    pub limits: ResizableLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: ResizableLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub content_type: ValueType,
    pub mutable: bool,
}

/// Constant initializer, kept as raw opcodes without its `end` marker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InitExpr {
    pub expr: Vec<u8>,
}

impl InitExpr {
    pub fn opcode(&self) -> Option<Opcode> {
        self.expr.first().copied().and_then(Opcode::from_u8)
    }
}
