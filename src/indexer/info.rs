//! Records handed to indexer callbacks
//!
//! Every record borrows from the running index pass and is only valid for the
//! duration of the callback that receives it. Copy out what must outlive it.

use super::ClientTable;
use crate::cursor::Cursor;
use crate::parser::ast::NodeId;
use crate::source::{File, FileLocation, SourceLocation};
use std::cell::RefCell;
use std::fmt;
use std::ops::BitOr;

/// An opaque value a client attaches to files, entities and containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Unexposed,
    Typedef,
    Function,
    Variable,
    Field,
    EnumConstant,
    Enum,
    Struct,
    Union,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    None,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRefKind {
    /// Written in the source.
    Direct,
    /// Produced by the front end, e.g. by an implicit declaration.
    Implicit,
}

/// How a reference uses the entity it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolRoles(u32);

impl SymbolRoles {
    pub const NONE: SymbolRoles = SymbolRoles(0);
    pub const DECLARATION: SymbolRoles = SymbolRoles(1 << 0);
    pub const DEFINITION: SymbolRoles = SymbolRoles(1 << 1);
    pub const REFERENCE: SymbolRoles = SymbolRoles(1 << 2);
    pub const READ: SymbolRoles = SymbolRoles(1 << 3);
    pub const WRITE: SymbolRoles = SymbolRoles(1 << 4);
    pub const CALL: SymbolRoles = SymbolRoles(1 << 5);
    pub const ADDRESS_OF: SymbolRoles = SymbolRoles(1 << 7);
    pub const IMPLICIT: SymbolRoles = SymbolRoles(1 << 8);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: SymbolRoles) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SymbolRoles {
    type Output = SymbolRoles;

    fn bitor(self, rhs: SymbolRoles) -> SymbolRoles {
        SymbolRoles(self.0 | rhs.0)
    }
}

/// A location reported to the client.
#[derive(Clone, Copy)]
pub struct IndexLocation<'a> {
    pub(super) loc: SourceLocation<'a>,
    pub(super) clients: &'a RefCell<ClientTable>,
}

impl<'a> IndexLocation<'a> {
    pub fn source_location(&self) -> SourceLocation<'a> {
        self.loc
    }

    /// Resolve like [`SourceLocation::file_location`], also returning the
    /// handle the client gave the file when it was entered or included.
    pub fn file_location(&self) -> (Option<ClientHandle>, FileLocation<'a>) {
        let at = self.loc.file_location();
        let handle = at
            .file
            .and_then(|file| self.clients.borrow().files.get(&file.id()).copied());
        (handle, at)
    }
}

impl fmt::Debug for IndexLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.loc.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct AttrInfo<'a> {
    pub cursor: Cursor<'a>,
    pub loc: IndexLocation<'a>,
}

/// The entity a declaration or reference is about.
#[derive(Clone)]
pub struct EntityInfo<'a> {
    pub kind: EntityKind,
    pub language: Language,
    pub name: &'a str,
    pub usr: String,
    pub cursor: Cursor<'a>,
    pub attributes: Vec<AttrInfo<'a>>,
    pub(super) key: NodeId,
    pub(super) clients: &'a RefCell<ClientTable>,
}

impl EntityInfo<'_> {
    /// Handle attached to this entity by an earlier callback.
    pub fn client_entity(&self) -> Option<ClientHandle> {
        self.clients.borrow().entities.get(&self.key).copied()
    }

    pub fn set_client_entity(&self, handle: ClientHandle) {
        self.clients.borrow_mut().entities.insert(self.key, handle);
    }
}

impl fmt::Debug for EntityInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityInfo")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("usr", &self.usr)
            .finish()
    }
}

/// A declaration context: the unit, a function, a record or an enum.
#[derive(Clone, Copy)]
pub struct ContainerInfo<'a> {
    pub cursor: Cursor<'a>,
    pub(super) key: NodeId,
    pub(super) clients: &'a RefCell<ClientTable>,
}

impl ContainerInfo<'_> {
    pub fn client_container(&self) -> Option<ClientHandle> {
        self.clients.borrow().containers.get(&self.key).copied()
    }

    pub fn set_client_container(&self, handle: ClientHandle) {
        self.clients.borrow_mut().containers.insert(self.key, handle);
    }
}

impl fmt::Debug for ContainerInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerInfo({:?})", self.cursor)
    }
}

#[derive(Debug, Clone)]
pub struct DeclInfo<'a> {
    pub entity: EntityInfo<'a>,
    pub cursor: Cursor<'a>,
    pub loc: IndexLocation<'a>,
    pub semantic_container: ContainerInfo<'a>,
    /// Differs from the semantic container for declarations written inside
    /// another declaration's scope, e.g. a struct defined in a parameter list.
    pub lexical_container: ContainerInfo<'a>,
    pub is_redeclaration: bool,
    pub is_definition: bool,
    pub is_container: bool,
    /// Set for declarations that contain other declarations.
    pub decl_as_container: Option<ContainerInfo<'a>>,
    pub is_implicit: bool,
    pub attributes: Vec<AttrInfo<'a>>,
    /// The function's body was present but not parsed.
    pub skipped_body: bool,
}

#[derive(Debug, Clone)]
pub struct EntityRefInfo<'a> {
    pub kind: EntityRefKind,
    pub cursor: Cursor<'a>,
    pub loc: IndexLocation<'a>,
    pub referenced_entity: EntityInfo<'a>,
    /// The closest declaration the reference appears in, if any.
    pub parent_entity: Option<EntityInfo<'a>>,
    pub container: ContainerInfo<'a>,
    pub role: SymbolRoles,
}

#[derive(Debug, Clone)]
pub struct IncludedFileInfo<'a> {
    pub hash_loc: IndexLocation<'a>,
    pub filename: &'a str,
    /// `None` when the file could not be found.
    pub file: Option<File<'a>>,
    pub is_import: bool,
    pub is_angled: bool,
}

#[derive(Debug, Clone)]
pub struct ImportedAstFileInfo<'a> {
    /// Main file of the imported unit.
    pub file: File<'a>,
    /// Path of the AST file.
    pub path: &'a str,
    pub loc: IndexLocation<'a>,
    pub is_implicit: bool,
}
