//! Types, type spelling and record layout
//!
//! Layout follows the LP64 data model used by x86-64 and AArch64 Unix
//! targets. Bit-fields are packed into storage units of their declared type,
//! never straddling a unit boundary unless the record is `packed`.

use crate::cursor::Cursor;
use crate::parser::ast::*;
use crate::parser::sema::canonical_type;
use crate::source::SourceManager;
use crate::unit::TranslationUnit;
use std::fmt;
use std::ptr;
use thiserror::Error;

/// Why a size, alignment or offset query has no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("type has no layout")]
    Invalid,
    #[error("type is incomplete")]
    Incomplete,
    #[error("no field with that name")]
    InvalidFieldName,
}

/// Size and alignment in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

impl Layout {
    fn scalar(size: u64) -> Self {
        Layout { size, align: size }
    }
}

/// Layout of a complete record. Field offsets are in bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub size: u64,
    pub align: u64,
    pub fields: Vec<(NodeId, u64)>,
}

const MAX_ALIGN: u64 = 16;

/// Type kinds, numbered like libclang's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Invalid = 0,
    Void = 2,
    Bool = 3,
    UChar = 5,
    UShort = 8,
    UInt = 9,
    ULong = 10,
    ULongLong = 11,
    CharS = 13,
    SChar = 14,
    Short = 16,
    Int = 17,
    Long = 18,
    LongLong = 19,
    Float = 21,
    Double = 22,
    LongDouble = 23,
    Pointer = 101,
    Record = 105,
    Enum = 106,
    Typedef = 107,
    FunctionNoProto = 110,
    FunctionProto = 111,
    ConstantArray = 112,
    IncompleteArray = 114,
}

impl TypeKind {
    pub fn spelling(self) -> &'static str {
        match self {
            TypeKind::Invalid => "Invalid",
            TypeKind::Void => "Void",
            TypeKind::Bool => "Bool",
            TypeKind::UChar => "UChar",
            TypeKind::UShort => "UShort",
            TypeKind::UInt => "UInt",
            TypeKind::ULong => "ULong",
            TypeKind::ULongLong => "ULongLong",
            TypeKind::CharS => "Char_S",
            TypeKind::SChar => "SChar",
            TypeKind::Short => "Short",
            TypeKind::Int => "Int",
            TypeKind::Long => "Long",
            TypeKind::LongLong => "LongLong",
            TypeKind::Float => "Float",
            TypeKind::Double => "Double",
            TypeKind::LongDouble => "LongDouble",
            TypeKind::Pointer => "Pointer",
            TypeKind::Record => "Record",
            TypeKind::Enum => "Enum",
            TypeKind::Typedef => "Typedef",
            TypeKind::FunctionNoProto => "FunctionNoProto",
            TypeKind::FunctionProto => "FunctionProto",
            TypeKind::ConstantArray => "ConstantArray",
            TypeKind::IncompleteArray => "IncompleteArray",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

fn kind_of(ty: &Type) -> TypeKind {
    match &ty.repr {
        Repr::Invalid => TypeKind::Invalid,
        Repr::Void => TypeKind::Void,
        Repr::Bool => TypeKind::Bool,
        Repr::Char => TypeKind::CharS,
        Repr::SChar => TypeKind::SChar,
        Repr::UChar => TypeKind::UChar,
        Repr::Short => TypeKind::Short,
        Repr::UShort => TypeKind::UShort,
        Repr::Int => TypeKind::Int,
        Repr::UInt => TypeKind::UInt,
        Repr::Long => TypeKind::Long,
        Repr::ULong => TypeKind::ULong,
        Repr::LongLong => TypeKind::LongLong,
        Repr::ULongLong => TypeKind::ULongLong,
        Repr::Float => TypeKind::Float,
        Repr::Double => TypeKind::Double,
        Repr::LongDouble => TypeKind::LongDouble,
        Repr::Pointer(_) => TypeKind::Pointer,
        Repr::Array(_, Some(_)) => TypeKind::ConstantArray,
        Repr::Array(_, None) => TypeKind::IncompleteArray,
        Repr::Function(func) if func.prototyped => TypeKind::FunctionProto,
        Repr::Function(_) => TypeKind::FunctionNoProto,
        Repr::Record(_) => TypeKind::Record,
        Repr::Enum(_) => TypeKind::Enum,
        Repr::Typedef(_) => TypeKind::Typedef,
    }
}

/// A type as seen by clients, borrowed from its translation unit. Types
/// obtained from null cursors belong to no unit and are invalid.
#[derive(Clone)]
pub struct CType<'tu> {
    ty: Type,
    tu: Option<&'tu TranslationUnit>,
}

impl<'tu> CType<'tu> {
    pub(crate) fn new(tu: &'tu TranslationUnit, ty: Type) -> Self {
        CType { ty, tu: Some(tu) }
    }

    pub(crate) fn invalid() -> Self {
        CType {
            ty: Type::default(),
            tu: None,
        }
    }

    fn wrap(&self, ty: Type) -> CType<'tu> {
        CType { ty, tu: self.tu }
    }

    fn invalid_here(&self) -> CType<'tu> {
        self.wrap(Type::default())
    }

    fn ast(&self) -> Option<&'tu Ast> {
        self.tu.map(|tu| &tu.ast)
    }

    pub fn kind(&self) -> TypeKind {
        kind_of(&self.ty)
    }

    pub fn is_valid(&self) -> bool {
        self.ty.is_valid()
    }

    pub fn spelling(&self) -> String {
        match self.tu {
            Some(tu) => type_spelling(&tu.ast, &tu.sm, &self.ty),
            None => String::new(),
        }
    }

    /// The type with every typedef stripped.
    pub fn canonical(&self) -> CType<'tu> {
        match self.ast() {
            Some(ast) => self.wrap(canonical_type(ast, &self.ty)),
            None => self.clone(),
        }
    }

    pub fn pointee(&self) -> CType<'tu> {
        match &self.ty.repr {
            Repr::Pointer(inner) => self.wrap((**inner).clone()),
            _ => self.invalid_here(),
        }
    }

    pub fn element_type(&self) -> CType<'tu> {
        match &self.ty.repr {
            Repr::Array(elem, _) => self.wrap((**elem).clone()),
            _ => self.invalid_here(),
        }
    }

    /// Element count of a constant-size array.
    pub fn array_size(&self) -> Option<u64> {
        match self.ty.repr {
            Repr::Array(_, size) => size,
            _ => None,
        }
    }

    pub fn num_elements(&self) -> Option<u64> {
        self.array_size()
    }

    pub fn result_type(&self) -> CType<'tu> {
        match &self.ty.repr {
            Repr::Function(func) => self.wrap(func.result.clone()),
            _ => self.invalid_here(),
        }
    }

    /// Parameter count of a function type; unprototyped functions have none.
    pub fn num_arg_types(&self) -> Option<usize> {
        match &self.ty.repr {
            Repr::Function(func) => Some(func.params.len()),
            _ => None,
        }
    }

    pub fn arg_type(&self, index: usize) -> CType<'tu> {
        match &self.ty.repr {
            Repr::Function(func) => func
                .params
                .get(index)
                .map_or_else(|| self.invalid_here(), |p| self.wrap(p.clone())),
            _ => self.invalid_here(),
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(&self.ty.repr, Repr::Function(func) if func.variadic)
    }

    pub fn is_const_qualified(&self) -> bool {
        self.ty.quals.is_const
    }

    pub fn is_volatile_qualified(&self) -> bool {
        self.ty.quals.is_volatile
    }

    pub fn is_restrict_qualified(&self) -> bool {
        self.ty.quals.is_restrict
    }

    /// Name of a typedef type.
    pub fn typedef_name(&self) -> Option<&'tu str> {
        match self.ty.repr {
            Repr::Typedef(id) => Some(self.ast()?.name(id)),
            _ => None,
        }
    }

    /// Declaration of a record, enum or typedef type; records and enums
    /// resolve to their definition when there is one.
    pub fn declaration(&self) -> Cursor<'tu> {
        let Some(tu) = self.tu else {
            return Cursor::null();
        };
        match self.ty.repr {
            Repr::Record(id) | Repr::Enum(id) => Cursor::from_node(tu, tu.ast.definition(id).unwrap_or(id)),
            Repr::Typedef(id) => Cursor::from_node(tu, id),
            _ => Cursor::null(),
        }
    }

    /// Fields of a record type, in declaration order.
    pub fn fields(&self) -> Vec<Cursor<'tu>> {
        let Some(tu) = self.tu else {
            return Vec::new();
        };
        let ast = &tu.ast;
        let Repr::Record(id) = canonical_type(ast, &self.ty).repr else {
            return Vec::new();
        };
        let Some(def) = ast.definition(id) else {
            return Vec::new();
        };
        ast.children(def)
            .iter()
            .filter(|c| matches!(ast.node(**c).kind, NodeKind::Field { .. }))
            .map(|c| Cursor::from_node(tu, *c))
            .collect()
    }

    pub fn size_of(&self) -> Result<u64, LayoutError> {
        let ast = self.ast().ok_or(LayoutError::Invalid)?;
        layout_of(ast, &self.ty).map(|l| l.size)
    }

    pub fn align_of(&self) -> Result<u64, LayoutError> {
        let ast = self.ast().ok_or(LayoutError::Invalid)?;
        layout_of(ast, &self.ty).map(|l| l.align)
    }

    /// Offset in bits of the named field, looking through anonymous members.
    pub fn offset_of(&self, field: &str) -> Result<u64, LayoutError> {
        let ast = self.ast().ok_or(LayoutError::Invalid)?;
        let Repr::Record(id) = canonical_type(ast, &self.ty).repr else {
            return Err(LayoutError::Invalid);
        };
        field_offset_by_name(ast, id, field)
    }
}

impl PartialEq for CType<'_> {
    fn eq(&self, other: &Self) -> bool {
        let same_unit = match (self.tu, other.tu) {
            (Some(a), Some(b)) => ptr::eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_unit && self.ty == other.ty
    }
}

impl fmt::Debug for CType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CType({}: {})", self.kind(), self.spelling())
    }
}

// ===== Layout =====

pub(crate) fn layout_of(ast: &Ast, ty: &Type) -> Result<Layout, LayoutError> {
    match &ty.repr {
        Repr::Invalid | Repr::Function(_) => Err(LayoutError::Invalid),
        Repr::Void => Err(LayoutError::Incomplete),
        Repr::Bool | Repr::Char | Repr::SChar | Repr::UChar => Ok(Layout::scalar(1)),
        Repr::Short | Repr::UShort => Ok(Layout::scalar(2)),
        Repr::Int | Repr::UInt | Repr::Float => Ok(Layout::scalar(4)),
        Repr::Long
        | Repr::ULong
        | Repr::LongLong
        | Repr::ULongLong
        | Repr::Double
        | Repr::Pointer(_) => Ok(Layout::scalar(8)),
        Repr::LongDouble => Ok(Layout::scalar(16)),
        Repr::Array(elem, Some(count)) => {
            let elem = layout_of(ast, elem)?;
            Ok(Layout {
                size: elem.size.checked_mul(*count).ok_or(LayoutError::Invalid)?,
                align: elem.align,
            })
        }
        Repr::Array(_, None) => Err(LayoutError::Incomplete),
        Repr::Enum(id) => {
            let def = ast.definition(*id).ok_or(LayoutError::Incomplete)?;
            layout_of(ast, &enum_integer_type(ast, def))
        }
        Repr::Record(id) => record_layout(ast, *id).map(|r| Layout {
            size: r.size,
            align: r.align,
        }),
        Repr::Typedef(id) => {
            let mut layout = layout_of(ast, &ast.node(*id).ty)?;
            if let Some(align) = aligned_attr(ast, *id) {
                layout.align = layout.align.max(align);
            }
            Ok(layout)
        }
    }
}

/// Integer type backing an enum: `unsigned int` when no constant is
/// negative, widened to 64 bits when a value does not fit in 32.
pub(crate) fn enum_integer_type(ast: &Ast, id: NodeId) -> Type {
    let Some(def) = ast.definition(id) else {
        return Type::new(Repr::UInt);
    };
    let values: Vec<i64> = ast
        .children(def)
        .iter()
        .filter_map(|c| match ast.node(*c).kind {
            NodeKind::EnumConstant { value, .. } => Some(value),
            _ => None,
        })
        .collect();
    let negative = values.iter().any(|v| *v < 0);
    let wide = values.iter().any(|v| {
        if negative {
            i32::try_from(*v).is_err()
        } else {
            u32::try_from(*v).is_err()
        }
    });
    Type::new(match (negative, wide) {
        (false, false) => Repr::UInt,
        (true, false) => Repr::Int,
        (false, true) => Repr::ULong,
        (true, true) => Repr::Long,
    })
}

fn attrs(ast: &Ast, id: NodeId) -> impl Iterator<Item = &AttrKind> {
    ast.children(id).iter().filter_map(|c| match &ast.node(*c).kind {
        NodeKind::Attr(kind) => Some(kind),
        _ => None,
    })
}

fn aligned_attr(ast: &Ast, id: NodeId) -> Option<u64> {
    attrs(ast, id)
        .filter_map(|a| match a {
            AttrKind::Aligned(n) => Some(n.unwrap_or(MAX_ALIGN)),
            _ => None,
        })
        .max()
}

/// Whether an array type, or an array nested in it, has more bytes than
/// fit in a `u64`.
pub(crate) fn array_size_overflows(ast: &Ast, ty: &Type) -> bool {
    let Repr::Array(elem, Some(count)) = &ty.repr else {
        return false;
    };
    if array_size_overflows(ast, elem) {
        return true;
    }
    layout_of(ast, elem).is_ok_and(|l| l.size.checked_mul(*count).is_none())
}

fn round_up(value: u64, align: u64) -> Result<u64, LayoutError> {
    if align == 0 {
        return Ok(value);
    }
    value
        .div_ceil(align)
        .checked_mul(align)
        .ok_or(LayoutError::Invalid)
}

fn bits(bytes: u64) -> Result<u64, LayoutError> {
    bytes.checked_mul(8).ok_or(LayoutError::Invalid)
}

fn add(a: u64, b: u64) -> Result<u64, LayoutError> {
    a.checked_add(b).ok_or(LayoutError::Invalid)
}

/// Lay out the definition of `record`.
pub(crate) fn record_layout(ast: &Ast, record: NodeId) -> Result<RecordLayout, LayoutError> {
    let def = ast.definition(record).ok_or(LayoutError::Incomplete)?;
    let is_union = matches!(
        ast.node(def).kind,
        NodeKind::Record {
            tag: TagKind::Union,
            ..
        }
    );
    let packed = attrs(ast, def).any(|a| *a == AttrKind::Packed);
    let fields: Vec<NodeId> = ast
        .children(def)
        .iter()
        .copied()
        .filter(|c| matches!(ast.node(*c).kind, NodeKind::Field { .. }))
        .collect();

    let mut offset = 0u64;
    let mut size_bits = 0u64;
    let mut align = 1u64;
    let mut out = Vec::with_capacity(fields.len());

    for (index, field) in fields.iter().enumerate() {
        let node = ast.node(*field);
        let NodeKind::Field { bit_width, .. } = node.kind else {
            continue;
        };
        let is_last = index + 1 == fields.len();
        let layout = match (&canonical_type(ast, &node.ty).repr, is_last) {
            // flexible array member
            (Repr::Array(elem, None), true) if !is_union => Layout {
                size: 0,
                align: layout_of(ast, elem)?.align,
            },
            _ => layout_of(ast, &node.ty)?,
        };
        let mut field_align = if packed { 1 } else { layout.align };
        if let Some(forced) = aligned_attr(ast, *field) {
            field_align = field_align.max(forced);
        }

        let start = if is_union { 0 } else { offset };
        let placed = match bit_width {
            Some(0) => {
                offset = round_up(offset, bits(layout.align)?)?;
                continue;
            }
            Some(width) => {
                let unit = bits(layout.size)?;
                let mut at = start;
                if !packed && unit > 0 && (at % unit) + u64::from(width) > unit {
                    at = round_up(at, bits(layout.align)?)?;
                }
                let end = add(at, u64::from(width))?;
                if !is_union {
                    offset = end;
                }
                size_bits = size_bits.max(end);
                at
            }
            None => {
                let at = round_up(start, bits(field_align)?)?;
                let end = add(at, bits(layout.size)?)?;
                if !is_union {
                    offset = end;
                }
                size_bits = size_bits.max(end);
                at
            }
        };
        align = align.max(field_align);
        out.push((*field, placed));
    }

    if let Some(forced) = aligned_attr(ast, def) {
        align = align.max(forced);
    }
    let size = round_up(size_bits.div_ceil(8), align)?;
    Ok(RecordLayout {
        size,
        align,
        fields: out,
    })
}

/// Offset in bits of `field` inside the record that declares it.
pub(crate) fn field_offset(ast: &Ast, field: NodeId) -> Result<u64, LayoutError> {
    let record = ast.node(field).parent.ok_or(LayoutError::Invalid)?;
    let layout = record_layout(ast, record)?;
    layout
        .fields
        .iter()
        .find(|(id, _)| *id == field)
        .map(|(_, offset)| *offset)
        .ok_or(LayoutError::InvalidFieldName)
}

fn field_offset_by_name(ast: &Ast, record: NodeId, name: &str) -> Result<u64, LayoutError> {
    let layout = record_layout(ast, record)?;
    for (field, offset) in &layout.fields {
        let node = ast.node(*field);
        let field_name = ast.name(*field);
        if field_name == name {
            return Ok(*offset);
        }
        if field_name.is_empty() {
            if let Repr::Record(inner) = canonical_type(ast, &node.ty).repr {
                match field_offset_by_name(ast, inner, name) {
                    Ok(nested) => return add(*offset, nested),
                    Err(LayoutError::InvalidFieldName) => {}
                    Err(err) => return Err(err),
                }
            }
        }
    }
    Err(LayoutError::InvalidFieldName)
}

// ===== Spelling =====

/// Spell a type the way C declares it, e.g. `const char *` or `int (*)[3]`.
pub(crate) fn type_spelling(ast: &Ast, sm: &SourceManager, ty: &Type) -> String {
    spell(ast, sm, ty, String::new())
}

/// Spell a declaration of `name` with type `ty`, e.g. `const char *fmt`.
pub(crate) fn declarator_spelling(ast: &Ast, sm: &SourceManager, ty: &Type, name: &str) -> String {
    spell(ast, sm, ty, name.to_string())
}

fn spell(ast: &Ast, sm: &SourceManager, ty: &Type, inner: String) -> String {
    match &ty.repr {
        Repr::Pointer(pointee) => {
            let quals = qualifier_text(ty.quals);
            let mut next = format!("*{}", quals);
            if !inner.is_empty() {
                if !quals.is_empty() {
                    next.push(' ');
                }
                next.push_str(&inner);
            }
            if matches!(pointee.repr, Repr::Array(..) | Repr::Function(_)) {
                next = format!("({})", next);
            }
            spell(ast, sm, pointee, next)
        }
        Repr::Array(elem, size) => {
            let suffix = match size {
                Some(n) => format!("[{}]", n),
                None => "[]".to_string(),
            };
            spell(ast, sm, elem, format!("{}{}", inner, suffix))
        }
        Repr::Function(func) => {
            let mut params: Vec<String> = func
                .params
                .iter()
                .map(|p| type_spelling(ast, sm, p))
                .collect();
            if func.variadic {
                params.push("...".to_string());
            } else if params.is_empty() && func.prototyped {
                params.push("void".to_string());
            }
            spell(ast, sm, &func.result, format!("{}({})", inner, params.join(", ")))
        }
        repr => {
            let mut base = qualifier_text(ty.quals);
            if !base.is_empty() {
                base.push(' ');
            }
            base.push_str(&base_name(ast, sm, repr));
            if inner.is_empty() {
                base
            } else {
                format!("{} {}", base, inner)
            }
        }
    }
}

fn qualifier_text(quals: Qualifiers) -> String {
    let mut words = Vec::new();
    if quals.is_const {
        words.push("const");
    }
    if quals.is_volatile {
        words.push("volatile");
    }
    if quals.is_restrict {
        words.push("restrict");
    }
    words.join(" ")
}

fn base_name(ast: &Ast, sm: &SourceManager, repr: &Repr) -> String {
    let name = match repr {
        Repr::Invalid => "",
        Repr::Void => "void",
        Repr::Bool => "_Bool",
        Repr::Char => "char",
        Repr::SChar => "signed char",
        Repr::UChar => "unsigned char",
        Repr::Short => "short",
        Repr::UShort => "unsigned short",
        Repr::Int => "int",
        Repr::UInt => "unsigned int",
        Repr::Long => "long",
        Repr::ULong => "unsigned long",
        Repr::LongLong => "long long",
        Repr::ULongLong => "unsigned long long",
        Repr::Float => "float",
        Repr::Double => "double",
        Repr::LongDouble => "long double",
        Repr::Record(id) => {
            let keyword = match ast.node(*id).kind {
                NodeKind::Record {
                    tag: TagKind::Union,
                    ..
                } => "union",
                _ => "struct",
            };
            return tag_spelling(ast, sm, keyword, *id);
        }
        Repr::Enum(id) => return tag_spelling(ast, sm, "enum", *id),
        Repr::Typedef(id) => ast.name(*id),
        Repr::Pointer(_) | Repr::Array(..) | Repr::Function(_) => "",
    };
    name.to_string()
}

fn tag_spelling(ast: &Ast, sm: &SourceManager, keyword: &str, id: NodeId) -> String {
    let name = ast.name(id);
    if !name.is_empty() {
        return format!("{} {}", keyword, name);
    }
    match sm.presumed(ast.node(id).loc) {
        Some((file, line, column)) => {
            format!("{} (anonymous at {}:{}:{})", keyword, file, line, column)
        }
        None => format!("{} (anonymous)", keyword),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::tests::parse_source;

    fn decl_type(parsed: &crate::parser::parse::tests::Parsed, name: &str) -> Type {
        parsed
            .ast
            .ids()
            .find(|id| parsed.ast.name(*id) == name)
            .map(|id| parsed.ast.node(id).ty.clone())
            .unwrap()
    }

    fn record(parsed: &crate::parser::parse::tests::Parsed, name: &str) -> NodeId {
        parsed
            .ast
            .ids()
            .find(|id| matches!(&parsed.ast.node(*id).kind, NodeKind::Record { name: n, .. } if n == name))
            .unwrap()
    }

    #[test]
    fn test_type_spelling() {
        let parsed = parse_source(
            "const char *s;\nint a[3];\nint *b[2];\nchar *const p;\nint f(int, ...);\nint g(void);\nint h();\nstruct S { int x; } v;\ntypedef unsigned long size_t;\nsize_t n;\n",
        );
        assert!(parsed.diags.is_empty());
        let spell = |name: &str| type_spelling(&parsed.ast, &parsed.sm, &decl_type(&parsed, name));
        assert_eq!(spell("s"), "const char *");
        assert_eq!(spell("a"), "int [3]");
        assert_eq!(spell("b"), "int *[2]");
        assert_eq!(spell("p"), "char *const");
        assert_eq!(spell("f"), "int (int, ...)");
        assert_eq!(spell("g"), "int (void)");
        assert_eq!(spell("h"), "int ()");
        assert_eq!(spell("v"), "struct S");
        assert_eq!(spell("n"), "size_t");
    }

    #[test]
    fn test_pointer_to_array_spelling() {
        let parsed = parse_source("int x;");
        let ty = Type::int().with_array(Some(3)).with_pointer();
        assert_eq!(type_spelling(&parsed.ast, &parsed.sm, &ty), "int (*)[3]");
    }

    #[test]
    fn test_anonymous_record_spelling() {
        let parsed = parse_source("struct { int x; } anon;");
        assert_eq!(
            type_spelling(&parsed.ast, &parsed.sm, &decl_type(&parsed, "anon")),
            "struct (anonymous at t.c:1:1)"
        );
    }

    #[test]
    fn test_struct_layout() {
        let parsed = parse_source("struct S { char c; int i; double d; short s; };");
        let layout = record_layout(&parsed.ast, record(&parsed, "S")).unwrap();
        assert_eq!(layout.size, 24);
        assert_eq!(layout.align, 8);
        let offsets: Vec<u64> = layout.fields.iter().map(|(_, o)| *o).collect();
        assert_eq!(offsets, vec![0, 32, 64, 128]);
    }

    #[test]
    fn test_bit_fields_and_packed() {
        let parsed = parse_source(
            "struct B { unsigned a : 3; unsigned b : 30; char c; };\nstruct __attribute__((packed)) P { char c; int i; };\n",
        );
        let bits = record_layout(&parsed.ast, record(&parsed, "B")).unwrap();
        let offsets: Vec<u64> = bits.fields.iter().map(|(_, o)| *o).collect();
        assert_eq!(offsets, vec![0, 32, 64]);
        assert_eq!(bits.size, 12);

        let packed = record_layout(&parsed.ast, record(&parsed, "P")).unwrap();
        assert_eq!(packed.size, 5);
        assert_eq!(packed.align, 1);
    }

    #[test]
    fn test_union_and_aligned() {
        let parsed = parse_source(
            "union U { char c[5]; int i; };\nstruct A { char c; } __attribute__((aligned(16)));\n",
        );
        let union_layout = record_layout(&parsed.ast, record(&parsed, "U")).unwrap();
        assert_eq!(union_layout.size, 8);
        assert!(union_layout.fields.iter().all(|(_, o)| *o == 0));
        let aligned = record_layout(&parsed.ast, record(&parsed, "A")).unwrap();
        assert_eq!((aligned.size, aligned.align), (16, 16));
    }

    #[test]
    fn test_layout_errors() {
        let parsed = parse_source("struct Fwd;\nstruct Fwd *p;\nvoid f(void);\n");
        let ast = &parsed.ast;
        assert_eq!(layout_of(ast, &Type::new(Repr::Void)), Err(LayoutError::Incomplete));
        assert_eq!(layout_of(ast, &decl_type(&parsed, "f")), Err(LayoutError::Invalid));
        let fwd = record(&parsed, "Fwd");
        assert_eq!(
            layout_of(ast, &Type::new(Repr::Record(fwd))),
            Err(LayoutError::Incomplete)
        );
        assert_eq!(layout_of(ast, &decl_type(&parsed, "p")).unwrap().size, 8);
    }

    #[test]
    fn test_offset_through_anonymous_member() {
        let parsed = parse_source("struct O { int a; struct { char b; int c; }; };");
        let outer = record(&parsed, "O");
        assert_eq!(field_offset_by_name(&parsed.ast, outer, "c"), Ok(64));
        assert_eq!(
            field_offset_by_name(&parsed.ast, outer, "zz"),
            Err(LayoutError::InvalidFieldName)
        );
    }

    #[test]
    fn test_enum_integer_type() {
        let parsed = parse_source("enum E { A, B = 5 };\nenum N { M = -1 };\n");
        let e = parsed.ast.ids().find(|id| parsed.ast.name(*id) == "E").unwrap();
        let n = parsed.ast.ids().find(|id| parsed.ast.name(*id) == "N").unwrap();
        assert_eq!(enum_integer_type(&parsed.ast, e).repr, Repr::UInt);
        assert_eq!(enum_integer_type(&parsed.ast, n).repr, Repr::Int);
    }

    #[test]
    fn test_oversized_array_has_no_layout() {
        let parsed = parse_source(
            "enum { N = sizeof(char[0x4000000000000000][4]) };\nint a[0x7fffffffffffffff];\nstruct Big { char c[0x2000000000000000]; };\n",
        );
        let too_large = parsed
            .diags
            .iter()
            .filter(|d| d.message == "array is too large")
            .count();
        assert_eq!(too_large, 2);
        assert_eq!(layout_of(&parsed.ast, &decl_type(&parsed, "a")), Err(LayoutError::Invalid));
        assert_eq!(record_layout(&parsed.ast, record(&parsed, "Big")), Err(LayoutError::Invalid));
    }
}
