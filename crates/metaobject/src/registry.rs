//! Type registry
//!
//! One `TypeInfo` per registered type: layout, fields, overload sets, base
//! edges, attributes and container shape. Entries are created once, filled
//! in by registration calls and only ever removed in bulk by [`TypeRegistry::clear`].

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::debug;

use crate::attr::{Attr, AttrSet};
use crate::base::{BaseEdge, Locate};
use crate::capability::{Capabilities, ContainerKind};
use crate::container::SumTypeTable;
use crate::error::{MetaError, MetaResult};
use crate::field::FieldInfo;
use crate::method::MethodInfo;
use crate::ty::{Name, Type};

/// Layout parameters fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    /// Size in bytes
    pub size: usize,
    /// Alignment in bytes
    pub align: usize,
    /// Instances can report their dynamic type
    pub polymorphic: bool,
    /// Bitwise copyable with no drop glue
    pub trivial: bool,
}

impl TypeLayout {
    /// Layout of a native type
    pub fn of<T>() -> Self {
        Self {
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            polymorphic: false,
            trivial: !std::mem::needs_drop::<T>(),
        }
    }

    /// Same layout, marked polymorphic
    pub fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    /// `std::alloc::Layout` for one instance
    pub fn alloc_layout(&self) -> Option<std::alloc::Layout> {
        std::alloc::Layout::from_size_align(self.size, self.align).ok()
    }
}

/// Everything known about one type
#[derive(Debug)]
pub struct TypeInfo {
    ty: Type,
    layout: TypeLayout,
    pub(crate) fields: IndexMap<Name, FieldInfo, FxBuildHasher>,
    pub(crate) methods: IndexMap<Name, Vec<MethodInfo>, FxBuildHasher>,
    pub(crate) bases: IndexMap<Type, BaseEdge, FxBuildHasher>,
    pub(crate) attrs: AttrSet,
    pub(crate) capabilities: Capabilities,
    pub(crate) sum: Option<SumTypeTable>,
    pub(crate) locate: Option<LocateFn>,
    pub(crate) zeroable: bool,
}

/// Complete-object locator stored on a polymorphic type
#[derive(Clone)]
pub struct LocateFn(pub(crate) Locate);

impl std::fmt::Debug for LocateFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LocateFn")
    }
}

impl TypeInfo {
    fn new(ty: Type, layout: TypeLayout) -> Self {
        Self {
            ty,
            layout,
            fields: IndexMap::default(),
            methods: IndexMap::default(),
            bases: IndexMap::default(),
            attrs: AttrSet::new(),
            capabilities: Capabilities::empty(),
            sum: None,
            locate: None,
            zeroable: false,
        }
    }

    /// The type
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Layout
    pub fn layout(&self) -> TypeLayout {
        self.layout
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.layout.size
    }

    /// Alignment in bytes
    pub fn align(&self) -> usize {
        self.layout.align
    }

    /// Check if instances carry a dynamic type
    pub fn is_polymorphic(&self) -> bool {
        self.layout.polymorphic
    }

    /// Check if instances are trivially copyable
    pub fn is_trivial(&self) -> bool {
        self.layout.trivial
    }

    /// Check if the all-zero bit pattern is a valid instance
    pub fn is_zeroable(&self) -> bool {
        self.zeroable
    }

    /// Own fields in registration order
    pub fn fields(&self) -> impl Iterator<Item = (Name, &FieldInfo)> {
        self.fields.iter().map(|(n, f)| (*n, f))
    }

    /// Look up an own field
    pub fn field(&self, name: Name) -> Option<&FieldInfo> {
        self.fields.get(&name)
    }

    /// Own overload sets in registration order
    pub fn methods(&self) -> impl Iterator<Item = (Name, &[MethodInfo])> {
        self.methods.iter().map(|(n, m)| (*n, m.as_slice()))
    }

    /// Look up an own overload set
    pub fn overloads(&self, name: Name) -> &[MethodInfo] {
        self.methods.get(&name).map_or(&[], Vec::as_slice)
    }

    /// Direct bases in registration order
    pub fn bases(&self) -> impl Iterator<Item = (Type, &BaseEdge)> {
        self.bases.iter().map(|(t, e)| (*t, e))
    }

    /// Type attributes
    pub fn attrs(&self) -> &AttrSet {
        &self.attrs
    }

    /// Structural capabilities
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Container role derived from the capabilities
    pub fn container_kind(&self) -> ContainerKind {
        ContainerKind::classify(self.capabilities)
    }

    /// Sum-type table, if registered as one
    pub fn sum_type(&self) -> Option<&SumTypeTable> {
        self.sum.as_ref()
    }
}

/// The table of every registered type
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<Type, TypeInfo>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, or return the existing entry
    ///
    /// # Panics
    ///
    /// Panics if the type is already registered with a different layout.
    pub fn register_type(&mut self, ty: Type, layout: TypeLayout) -> &mut TypeInfo {
        let info = self.types.entry(ty).or_insert_with(|| {
            debug!(ty = ty.name(), size = layout.size, align = layout.align, "registered type");
            TypeInfo::new(ty, layout)
        });
        assert_eq!(
            info.layout, layout,
            "{ty} registered twice with different layouts"
        );
        info
    }

    /// Look up a type
    pub fn get(&self, ty: Type) -> Option<&TypeInfo> {
        self.types.get(&ty)
    }

    /// Look up a type mutably
    pub fn get_mut(&mut self, ty: Type) -> Option<&mut TypeInfo> {
        self.types.get_mut(&ty)
    }

    fn require(&mut self, ty: Type) -> MetaResult<&mut TypeInfo> {
        self.types
            .get_mut(&ty)
            .ok_or_else(|| MetaError::UnknownType(ty.name().to_string()))
    }

    /// Check if a type is registered
    pub fn contains(&self, ty: Type) -> bool {
        self.types.contains_key(&ty)
    }

    /// Get number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Every registered type
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.types.keys().copied()
    }

    /// Add a field
    pub fn add_field(&mut self, ty: Type, name: Name, field: FieldInfo) -> MetaResult<()> {
        let info = self.require(ty)?;
        if info.fields.contains_key(&name) {
            return Err(MetaError::DuplicateField {
                ty: ty.to_string(),
                field: name.to_string(),
            });
        }
        debug!(
            ty = ty.name(),
            field = name.as_str(),
            field_ty = field.descriptor.ty().name(),
            "added field"
        );
        info.fields.insert(name, field);
        Ok(())
    }

    /// Add a method overload; returns its index in the overload set
    pub fn add_method(&mut self, ty: Type, name: Name, method: MethodInfo) -> MetaResult<usize> {
        let info = self.require(ty)?;
        let overloads = info.methods.entry(name).or_default();
        if overloads
            .iter()
            .any(|m| !m.descriptor.is_distinguishable_with(&method.descriptor))
        {
            return Err(MetaError::IndistinguishableOverload {
                ty: ty.to_string(),
                method: name.to_string(),
            });
        }
        debug!(
            ty = ty.name(),
            method = name.as_str(),
            arity = method.descriptor.arity(),
            "added method"
        );
        overloads.push(method);
        Ok(overloads.len() - 1)
    }

    /// Add a base edge
    pub fn add_base(&mut self, derived: Type, base: Type, edge: BaseEdge) -> MetaResult<()> {
        if !self.contains(base) {
            return Err(MetaError::UnknownType(base.name().to_string()));
        }
        let info = self.require(derived)?;
        if info.bases.contains_key(&base) {
            return Err(MetaError::DuplicateBase {
                derived: derived.to_string(),
                base: base.to_string(),
            });
        }
        debug!(derived = derived.name(), base = base.name(), kind = ?edge.kind(), "added base");
        info.bases.insert(base, edge);
        Ok(())
    }

    /// Attach a type attribute
    pub fn add_type_attr(&mut self, ty: Type, attr: Attr) -> MetaResult<()> {
        let info = self.require(ty)?;
        insert_attr(&mut info.attrs, attr, || ty.to_string())
    }

    /// Attach a field attribute
    pub fn add_field_attr(&mut self, ty: Type, field: Name, attr: Attr) -> MetaResult<()> {
        let info = self.require(ty)?;
        let field_info = info.fields.get_mut(&field).ok_or_else(|| MetaError::UnknownMember {
            ty: ty.to_string(),
            member: field.to_string(),
        })?;
        insert_attr(&mut field_info.attrs, attr, || format!("{ty}::{field}"))
    }

    /// Attach an attribute to one overload of a method
    pub fn add_method_attr(
        &mut self,
        ty: Type,
        method: Name,
        overload: usize,
        attr: Attr,
    ) -> MetaResult<()> {
        let info = self.require(ty)?;
        let method_info = info
            .methods
            .get_mut(&method)
            .and_then(|set| set.get_mut(overload))
            .ok_or_else(|| MetaError::UnknownMember {
                ty: ty.to_string(),
                member: method.to_string(),
            })?;
        insert_attr(&mut method_info.attrs, attr, || format!("{ty}::{method}()"))
    }

    /// Release everything
    ///
    /// Order: field attributes, type attributes, owned dynamic fields, then
    /// the type table. Later tables may reference values an earlier one owns.
    pub fn clear(&mut self) {
        for info in self.types.values_mut() {
            for field in info.fields.values_mut() {
                field.attrs.clear();
            }
            for overloads in info.methods.values_mut() {
                for method in overloads {
                    method.attrs.clear();
                }
            }
        }
        for info in self.types.values_mut() {
            info.attrs.clear();
        }
        for info in self.types.values_mut() {
            info.fields.retain(|_, f| !f.descriptor.is_owned());
        }
        let count = self.types.len();
        self.types.clear();
        debug!(types = count, "cleared type registry");
    }
}

fn insert_attr(set: &mut AttrSet, attr: Attr, target: impl FnOnce() -> String) -> MetaResult<()> {
    let attr_ty = attr.ty();
    set.insert(attr).map_err(|_| MetaError::DuplicateAttribute {
        target: target(),
        attr: attr_ty.to_string(),
    })?;
    debug!(attr = attr_ty.name(), "attached attribute");
    Ok(())
}
