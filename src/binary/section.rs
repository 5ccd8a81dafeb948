use num_derive::FromPrimitive;

use super::types::{ExternalKind, FuncType, GlobalType, InitExpr, MemoryType, TableType, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SectionCode {
    Custom = 0x00,
    Type = 0x01,
    Import = 0x02,
    Function = 0x03,
    Table = 0x04,
    Memory = 0x05,
    Global = 0x06,
    Export = 0x07,
    Start = 0x08,
    Element = 0x09,
    Code = 0x0a,
    Data = 0x0b,
}

impl SectionCode {
    pub fn name(&self) -> &'static str {
        match self {
            SectionCode::Custom => "name",
            SectionCode::Type => "type",
            SectionCode::Import => "import",
            SectionCode::Function => "function",
            SectionCode::Table => "table",
            SectionCode::Memory => "memory",
            SectionCode::Global => "global",
            SectionCode::Export => "export",
            SectionCode::Start => "start",
            SectionCode::Element => "element",
            SectionCode::Code => "code",
            SectionCode::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Name(NameSection),
    Type(Vec<FuncType>),
    Import(Vec<ImportEntry>),
    /// Type indices of the module's own functions.
    Function(Vec<u32>),
    Table(Vec<TableType>),
    Memory(Vec<MemoryType>),
    Global(Vec<GlobalVariable>),
    Export(Vec<ExportEntry>),
    /// Index of the start function.
    Start(u32),
    Element(Vec<ElemSegment>),
    Code(Vec<FunctionBody>),
    Data(Vec<DataSegment>),
}

impl Section {
    pub fn code(&self) -> SectionCode {
        match self {
            Section::Name(_) => SectionCode::Custom,
            Section::Type(_) => SectionCode::Type,
            Section::Import(_) => SectionCode::Import,
            Section::Function(_) => SectionCode::Function,
            Section::Table(_) => SectionCode::Table,
            Section::Memory(_) => SectionCode::Memory,
            Section::Global(_) => SectionCode::Global,
            Section::Export(_) => SectionCode::Export,
            Section::Start(_) => SectionCode::Start,
            Section::Element(_) => SectionCode::Element,
            Section::Code(_) => SectionCode::Code,
            Section::Data(_) => SectionCode::Data,
        }
    }

    /// Number of entries the section carries.
    pub fn len(&self) -> usize {
        match self {
            Section::Name(names) => names.funcs.len(),
            Section::Type(types) => types.len(),
            Section::Import(imports) => imports.len(),
            Section::Function(fns) => fns.len(),
            Section::Table(tables) => tables.len(),
            Section::Memory(memories) => memories.len(),
            Section::Global(globals) => globals.len(),
            Section::Export(exports) => exports.len(),
            Section::Start(_) => 1,
            Section::Element(segments) => segments.len(),
            Section::Code(bodies) => bodies.len(),
            Section::Data(segments) => segments.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDesc {
    Function(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub module: String,
    pub field: String,
    pub desc: ImportDesc,
}

impl ImportEntry {
    pub fn kind(&self) -> ExternalKind {
        match self.desc {
            ImportDesc::Function(_) => ExternalKind::Function,
            ImportDesc::Table(_) => ExternalKind::Table,
            ImportDesc::Memory(_) => ExternalKind::Memory,
            ImportDesc::Global(_) => ExternalKind::Global,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub field: String,
    pub kind: ExternalKind,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable {
    pub ty: GlobalType,
    pub init: InitExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElemSegment {
    /// Table index.
    pub index: u32,
    pub offset: InitExpr,
    pub elems: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    /// Linear memory index.
    pub index: u32,
    pub offset: InitExpr,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub count: u32,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBody {
    pub body_size: u32,
    pub locals: Vec<LocalEntry>,
    /// Raw opcodes without the trailing `end`.
    pub code: Vec<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameSection {
    pub name: String,
    pub funcs: Vec<FunctionNames>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FunctionNames {
    pub name: String,
    pub locals: Vec<String>,
}
