//! The index pass over one unit

use super::info::*;
use super::{ClientTable, IndexOptions, IndexOutcome, IndexerCallbacks};
use crate::cursor::Cursor;
use crate::parser::ast::{Ast, BinOp, Body, NodeId, NodeKind, TagKind, UnOp};
use crate::source::{File, FileId, Loc, SourceLocation};
use crate::unit::TranslationUnit;
use rustc_hash::FxHashSet;
use std::cell::RefCell;

// revision that introduced each slot
const ABORT_QUERY: u32 = 1;
const DIAGNOSTIC: u32 = 2;
const ENTERED_MAIN_FILE: u32 = 3;
const PP_INCLUDED_FILE: u32 = 4;
const IMPORTED_AST_FILE: u32 = 5;
const STARTED_TRANSLATION_UNIT: u32 = 6;
const INDEX_DECLARATION: u32 = 7;
const INDEX_ENTITY_REFERENCE: u32 = 8;

/// The client asked to stop.
struct Aborted;

pub(super) fn run<C>(tu: &TranslationUnit, callbacks: &mut C, options: IndexOptions) -> IndexOutcome
where
    C: IndexerCallbacks + ?Sized,
{
    let clients = RefCell::new(ClientTable::default());
    let version = callbacks.version();
    let mut driver = Driver {
        tu,
        callbacks,
        options,
        clients: &clients,
        version,
        declared_in: FxHashSet::default(),
        referenced_in: FxHashSet::default(),
    };
    tracing::debug!(source = %tu.main_file_name(), version, "indexing");
    match driver.run() {
        Ok(()) => IndexOutcome::Completed,
        Err(Aborted) => {
            tracing::debug!("indexing aborted by client");
            IndexOutcome::Aborted
        }
    }
}

struct Driver<'a, 'c, C: ?Sized> {
    tu: &'a TranslationUnit,
    callbacks: &'c mut C,
    options: IndexOptions,
    clients: &'a RefCell<ClientTable>,
    version: u32,
    /// (file, canonical declaration) pairs with a declaration in that file.
    declared_in: FxHashSet<(FileId, NodeId)>,
    /// (file, canonical declaration) pairs already referenced.
    referenced_in: FxHashSet<(FileId, NodeId)>,
}

impl<'a, C> Driver<'a, '_, C>
where
    C: IndexerCallbacks + ?Sized,
{
    fn run(&mut self) -> Result<(), Aborted> {
        let tu = self.tu;
        if self.wants(STARTED_TRANSLATION_UNIT) {
            self.poll()?;
            if let Some(handle) = self.callbacks.started_translation_unit() {
                self.clients.borrow_mut().containers.insert(NodeId::ROOT, handle);
            }
        }
        if let (Some(main), true) = (tu.main_file(), self.wants(ENTERED_MAIN_FILE)) {
            self.poll()?;
            let handle = self.callbacks.entered_main_file(main);
            self.attach_file(main.id(), handle);
        }
        self.imports()?;
        self.inclusions()?;

        if self.options.suppress_redundant_refs {
            self.collect_declared_in();
        }
        self.walk(NodeId::ROOT)?;

        if self.wants(DIAGNOSTIC) {
            self.poll()?;
            self.callbacks.diagnostic(tu.diagnostics());
        }
        Ok(())
    }

    fn wants(&self, revision: u32) -> bool {
        self.version >= revision
    }

    fn poll(&mut self) -> Result<(), Aborted> {
        if self.wants(ABORT_QUERY) && self.callbacks.abort_query() {
            return Err(Aborted);
        }
        Ok(())
    }

    fn attach_file(&self, file: FileId, handle: Option<ClientHandle>) {
        if let Some(handle) = handle {
            self.clients.borrow_mut().files.insert(file, handle);
        }
    }

    fn location(&self, loc: Loc) -> IndexLocation<'a> {
        IndexLocation {
            loc: SourceLocation::new(&self.tu.sm, loc),
            clients: self.clients,
        }
    }

    fn imports(&mut self) -> Result<(), Aborted> {
        if !self.wants(IMPORTED_AST_FILE) {
            return Ok(());
        }
        let tu = self.tu;
        for import in &tu.imports {
            self.poll()?;
            let info = ImportedAstFileInfo {
                file: File::new(&tu.sm, import.main_file),
                path: &import.path,
                loc: self.location(Loc::INVALID),
                is_implicit: false,
            };
            let handle = self.callbacks.imported_ast_file(&info);
            self.attach_file(import.main_file, handle);
        }
        Ok(())
    }

    fn inclusions(&mut self) -> Result<(), Aborted> {
        if !self.wants(PP_INCLUDED_FILE) {
            return Ok(());
        }
        let tu = self.tu;
        for (_, inclusion) in tu.record.inclusions() {
            self.poll()?;
            let info = IncludedFileInfo {
                hash_loc: self.location(inclusion.hash_loc),
                filename: &inclusion.name,
                file: inclusion.file.map(|id| File::new(&tu.sm, id)),
                is_import: inclusion.is_import,
                is_angled: inclusion.angled,
            };
            let handle = self.callbacks.pp_included_file(&info);
            if let Some(file) = inclusion.file {
                self.attach_file(file, handle);
            }
        }
        Ok(())
    }

    fn walk(&mut self, parent: NodeId) -> Result<(), Aborted> {
        let tu = self.tu;
        let ast = &tu.ast;
        for &id in ast.children(parent) {
            let node = ast.node(id);
            if node.from_pch {
                continue;
            }
            if node.implicit && !matches!(node.kind, NodeKind::Function { .. }) {
                continue;
            }
            if node.kind.is_declaration() {
                if self.indexes(id) {
                    self.declaration(id)?;
                }
            } else if let Some(target) = reference_target(ast, &node.kind) {
                if self.indexes(target) {
                    self.reference(id, target)?;
                }
            }
            self.walk(id)?;
        }
        Ok(())
    }

    /// Whether declarations of `id` are reported at all.
    fn indexes(&self, id: NodeId) -> bool {
        self.options.index_function_local_symbols || !is_local(&self.tu.ast, id)
    }

    fn file_of(&self, loc: Loc) -> Option<FileId> {
        let sm = &self.tu.sm;
        sm.decompose(sm.file_loc(loc)).map(|(file, _)| file)
    }

    fn collect_declared_in(&mut self) {
        let tu = self.tu;
        let ast = &tu.ast;
        for id in ast.ids() {
            let node = ast.node(id);
            if !node.kind.is_declaration() || node.implicit {
                continue;
            }
            if let Some(file) = self.file_of(node.loc) {
                self.declared_in.insert((file, ast.canonical(id)));
            }
        }
    }

    fn entity(&self, id: NodeId) -> EntityInfo<'a> {
        let tu = self.tu;
        let node = tu.ast.node(id);
        EntityInfo {
            kind: entity_kind(&node.kind),
            language: Language::C,
            name: tu.ast.name(id),
            usr: crate::cursor::usr::declaration(tu, id),
            cursor: Cursor::from_node(tu, id),
            attributes: self.attributes(id),
            key: tu.ast.canonical(id),
            clients: self.clients,
        }
    }

    fn container(&self, id: NodeId) -> ContainerInfo<'a> {
        ContainerInfo {
            cursor: Cursor::from_node(self.tu, id),
            key: id,
            clients: self.clients,
        }
    }

    fn attributes(&self, id: NodeId) -> Vec<AttrInfo<'a>> {
        let ast = &self.tu.ast;
        ast.children(id)
            .iter()
            .filter(|c| matches!(ast.node(**c).kind, NodeKind::Attr(_)))
            .map(|c| AttrInfo {
                cursor: Cursor::from_node(self.tu, *c),
                loc: self.location(ast.node(*c).loc),
            })
            .collect()
    }

    fn declaration(&mut self, id: NodeId) -> Result<(), Aborted> {
        if !self.wants(INDEX_DECLARATION) {
            return Ok(());
        }
        self.poll()?;
        let tu = self.tu;
        let ast = &tu.ast;
        let node = ast.node(id);
        let cursor = Cursor::from_node(tu, id);

        let lexical = lexical_container(ast, id);
        let semantic = node
            .semantic_parent
            .filter(|p| is_container_kind(&ast.node(*p).kind))
            .unwrap_or(lexical);
        let decl_as_container = match &node.kind {
            NodeKind::Function { body, .. } if *body != Body::None => Some(self.container(id)),
            NodeKind::Record { complete: true, .. } | NodeKind::Enum { complete: true, .. } => {
                Some(self.container(id))
            }
            _ => None,
        };
        let info = DeclInfo {
            entity: self.entity(id),
            cursor,
            loc: self.location(node.loc),
            semantic_container: self.container(semantic),
            lexical_container: self.container(lexical),
            is_redeclaration: ast.canonical(id) != id,
            is_definition: cursor.is_definition(),
            is_container: decl_as_container.is_some(),
            decl_as_container,
            is_implicit: node.implicit,
            attributes: self.attributes(id),
            skipped_body: matches!(node.kind, NodeKind::Function { body: Body::Skipped, .. }),
        };
        tracing::trace!(name = info.entity.name, "declaration");
        self.callbacks.index_declaration(&info);
        Ok(())
    }

    fn reference(&mut self, id: NodeId, target: NodeId) -> Result<(), Aborted> {
        if !self.wants(INDEX_ENTITY_REFERENCE) {
            return Ok(());
        }
        let tu = self.tu;
        let ast = &tu.ast;
        let node = ast.node(id);
        if self.options.suppress_redundant_refs {
            let key = (self.file_of(node.loc), ast.canonical(target));
            if let (Some(file), canonical) = key {
                if self.declared_in.contains(&(file, canonical)) || !self.referenced_in.insert((file, canonical)) {
                    return Ok(());
                }
            }
        }
        self.poll()?;

        let from_macro_body = tu.sm.is_macro(node.loc) && !tu.sm.is_macro_arg(node.loc);
        let mut role = reference_role(ast, id);
        if from_macro_body {
            role = role | SymbolRoles::IMPLICIT;
        }
        let parent_entity = ast
            .ancestors(id)
            .find(|a| *a != NodeId::ROOT && ast.node(*a).kind.is_declaration() && self.indexes(*a))
            .map(|a| self.entity(a));
        let info = EntityRefInfo {
            kind: if from_macro_body {
                EntityRefKind::Implicit
            } else {
                EntityRefKind::Direct
            },
            cursor: Cursor::from_node(tu, id),
            loc: self.location(node.loc),
            referenced_entity: self.entity(target),
            parent_entity,
            container: self.container(lexical_container(ast, id)),
            role,
        };
        self.callbacks.index_entity_reference(&info);
        Ok(())
    }
}

fn entity_kind(kind: &NodeKind) -> EntityKind {
    match kind {
        NodeKind::Record { tag: TagKind::Struct, .. } => EntityKind::Struct,
        NodeKind::Record { tag: TagKind::Union, .. } => EntityKind::Union,
        NodeKind::Enum { .. } => EntityKind::Enum,
        NodeKind::Field { .. } => EntityKind::Field,
        NodeKind::EnumConstant { .. } => EntityKind::EnumConstant,
        NodeKind::Function { .. } => EntityKind::Function,
        NodeKind::Var { .. } | NodeKind::Param { .. } => EntityKind::Variable,
        NodeKind::Typedef { .. } => EntityKind::Typedef,
        _ => EntityKind::Unexposed,
    }
}

fn is_container_kind(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::TranslationUnit | NodeKind::Function { .. } | NodeKind::Record { .. } | NodeKind::Enum { .. }
    )
}

fn lexical_container(ast: &Ast, id: NodeId) -> NodeId {
    ast.ancestors(id)
        .find(|a| is_container_kind(&ast.node(*a).kind))
        .unwrap_or(NodeId::ROOT)
}

/// Declared inside a function: parameters, locals and local tags.
fn is_local(ast: &Ast, id: NodeId) -> bool {
    ast.ancestors(id)
        .any(|a| matches!(ast.node(a).kind, NodeKind::Function { .. }))
}

/// Declaration a reference node names. Labels are not entities.
fn reference_target(ast: &Ast, kind: &NodeKind) -> Option<NodeId> {
    let target = match kind {
        NodeKind::TypeRef { target } | NodeKind::MemberRef { target } => *target,
        NodeKind::DeclRef { target, .. } | NodeKind::Member { target, .. } => (*target)?,
        _ => return None,
    };
    ast.get(target)
        .filter(|node| node.kind.is_declaration())
        .map(|_| target)
}

/// How the expression at `id` uses what it names, from its nearest
/// non-parenthesis parent.
fn reference_role(ast: &Ast, id: NodeId) -> SymbolRoles {
    let node = ast.node(id);
    if matches!(node.kind, NodeKind::TypeRef { .. } | NodeKind::MemberRef { .. }) {
        return SymbolRoles::REFERENCE;
    }
    let mut child = id;
    for parent in ast.ancestors(id) {
        let parent_node = ast.node(parent);
        let first = parent_node.children.first() == Some(&child);
        let use_role = match &parent_node.kind {
            NodeKind::Paren => {
                child = parent;
                continue;
            }
            NodeKind::Call if first => SymbolRoles::CALL,
            NodeKind::Unary(UnOp::AddrOf) => SymbolRoles::ADDRESS_OF,
            NodeKind::Unary(UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec) => {
                SymbolRoles::READ | SymbolRoles::WRITE
            }
            NodeKind::Binary(BinOp::Assign) if first => SymbolRoles::WRITE,
            NodeKind::CompoundAssign(_) if first => SymbolRoles::READ | SymbolRoles::WRITE,
            _ => SymbolRoles::READ,
        };
        return SymbolRoles::REFERENCE | use_role;
    }
    SymbolRoles::REFERENCE | SymbolRoles::READ
}
