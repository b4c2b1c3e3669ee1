//! The dispatch facade
//!
//! `Engine` ties the identity registries, the type registry and the memory
//! resources together. Registration takes the registry's write lock; every
//! lookup takes the read lock and drops it before any native code runs, so a
//! reflected method may itself call back into the engine.
//!
//! Runtime misses never panic. An unknown member, a call with no viable
//! overload or a cast without a path comes back as a sentinel: a null
//! [`ObjectHandle`], an invalid [`OwningHandle`] or [`Type::INVALID`].

use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::attr::Attr;
use crate::base::{locator, BaseEdge, Polymorphic};
use crate::bound::BoundHandle;
use crate::builder::TypeBuilder;
use crate::builtins;
use crate::capability::{Capabilities, ContainerKind};
use crate::container::{self, Container, SumType};
use crate::dispatch::{self, Access, Resolved};
use crate::error::MetaResult;
use crate::field::{FieldDescriptor, FieldInfo, FieldMode};
use crate::handle::{Finalizer, ObjectHandle, OwningHandle, SharedBuffer};
use crate::ident::hash_name;
use crate::method::{MethodDescriptor, MethodFlag, MethodInfo, ResultKind};
use crate::names::{NameIdRegistry, TypeIdRegistry};
use crate::ops::{CTOR, DTOR};
use crate::options::{EngineOptions, ResultMemory};
use crate::param::{destructor, IntoArgs};
use crate::registry::{LocateFn, TypeInfo, TypeLayout, TypeRegistry};
use crate::resource::{ResourceRef, ScratchArena, SystemResource};
use crate::ty::{type_of, Name, Reflect, Type};

static GLOBAL: Lazy<Engine> = Lazy::new(Engine::new);

/// A field visible on a type, own or inherited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSummary {
    /// Field name
    pub name: Name,
    /// Value type
    pub ty: Type,
    /// Declaring type
    pub owner: Type,
    /// Storage mode
    pub mode: FieldMode,
}

/// A method overload visible on a type, own or inherited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSummary {
    /// Method name
    pub name: Name,
    /// Declaring type
    pub owner: Type,
    /// Invocation flag
    pub flag: MethodFlag,
    /// Parameter types
    pub params: Vec<Type>,
    /// Declared result type
    pub result: Type,
}

/// Releases an allocation unless disarmed; covers panicking constructors
struct AllocGuard<'a> {
    resource: &'a ResourceRef,
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AllocGuard<'_> {
    fn disarm(self) -> NonNull<u8> {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }
}

impl Drop for AllocGuard<'_> {
    fn drop(&mut self) {
        unsafe { self.resource.deallocate(self.ptr, self.layout) };
    }
}

/// The reflection engine
pub struct Engine {
    names: NameIdRegistry,
    type_names: TypeIdRegistry,
    registry: RwLock<TypeRegistry>,
    scratch: Arc<ScratchArena>,
    system: ResourceRef,
    options: EngineOptions,
}

impl Engine {
    /// The process-wide engine (default options)
    pub fn global() -> &'static Engine {
        &GLOBAL
    }

    /// Create an engine with default options
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create an engine with custom options
    pub fn with_options(options: EngineOptions) -> Self {
        let engine = Self {
            names: NameIdRegistry::new(),
            type_names: TypeIdRegistry::new(),
            registry: RwLock::new(TypeRegistry::new()),
            scratch: Arc::new(ScratchArena::with_capacity(options.scratch_chunk_size)),
            system: Arc::new(SystemResource),
            options,
        };
        engine.register_static_names();
        if engine.options.register_builtins {
            if let Err(err) = builtins::register(&engine) {
                warn!(%err, "builtin registration failed");
            }
        }
        engine
    }

    fn register_static_names(&self) {
        self.names.register_unmanaged(CTOR);
        self.names.register_unmanaged(DTOR);
        self.type_names.register_value(Type::VOID);
        self.type_names.register_value(Type::OBJECT_HANDLE);
    }

    /// Options this engine was built with
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Register a member name
    pub fn name(&self, text: &str) -> Name {
        self.names.register(text)
    }

    fn lookup_name(&self, text: &str) -> Option<Name> {
        self.names
            .get(hash_name(text))
            .filter(|name| name.as_str() == text)
    }

    /// Look up a type by its canonical name
    pub fn find_type(&self, name: &str) -> Option<Type> {
        self.type_names
            .get(hash_name(name))
            .filter(|ty| ty.name() == name && self.is_registered(*ty))
    }

    /// The scratch arena backing transient results
    pub fn scratch(&self) -> &ScratchArena {
        &self.scratch
    }

    /// The resource results go to unless a call names one
    pub fn result_resource(&self) -> ResourceRef {
        match self.options.result_memory {
            ResultMemory::Scratch => self.scratch.clone() as ResourceRef,
            ResultMemory::System => self.system.clone(),
        }
    }

    /// The resource constructed objects go to
    pub fn instance_resource(&self) -> ResourceRef {
        self.system.clone()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a native type
    ///
    /// Idempotent. A destructor is added for types with drop glue.
    pub fn register<T: Reflect>(&self) -> TypeBuilder<'_, T> {
        self.register_with::<T>(TypeLayout::of::<T>())
    }

    fn register_with<T: Reflect>(&self, layout: TypeLayout) -> TypeBuilder<'_, T> {
        let ty = type_of::<T>();
        self.register_type(ty, layout);
        if std::mem::needs_drop::<T>() {
            let dtor = self.name(DTOR);
            let mut registry = self.registry.write();
            let has_dtor = registry
                .get(ty)
                .is_some_and(|info| !info.overloads(dtor).is_empty());
            if !has_dtor {
                let info = MethodInfo::new(destructor::<T>());
                if let Err(err) = registry.add_method(ty, dtor, info) {
                    warn!(%err, ty = ty.name(), "could not add destructor");
                }
            }
        }
        TypeBuilder::new(self, ty)
    }

    /// Register a type whose instances report their dynamic type
    pub fn register_polymorphic<T: Polymorphic>(&self) -> TypeBuilder<'_, T> {
        let builder = self.register_with::<T>(TypeLayout::of::<T>().polymorphic());
        self.update(builder.ty(), |info| info.locate = Some(LocateFn(locator::<T>())));
        builder
    }

    /// Register a type from its raw layout
    ///
    /// # Panics
    ///
    /// Panics if the type is already registered with a different layout.
    pub fn register_type(&self, ty: Type, layout: TypeLayout) {
        self.type_names.register_value(ty);
        self.registry.write().register_type(ty, layout);
    }

    /// Register a container type and its operation set
    ///
    /// Returns the container kind. Registering the same container again is a
    /// no-op.
    pub fn register_container<C: Container>(&self) -> MetaResult<ContainerKind> {
        let ty = type_of::<C>();
        if let Some(kind) = self.type_attr::<ContainerKind>(ty) {
            return Ok(kind);
        }
        let mut builder = self.register::<C>();
        builder.capabilities(C::CAPABILITIES);
        C::register_operations(&mut builder)?;
        self.tag_container(ty)
    }

    /// Register a user sum type
    pub fn register_sum_type<S: SumType>(&self) -> MetaResult<ContainerKind> {
        let ty = type_of::<S>();
        if let Some(kind) = self.type_attr::<ContainerKind>(ty) {
            return Ok(kind);
        }
        container::register_sum_type(&mut self.register::<S>())?;
        self.tag_container(ty)
    }

    fn tag_container(&self, ty: Type) -> MetaResult<ContainerKind> {
        let kind = ContainerKind::classify(self.capabilities(ty));
        self.add_type_attr(ty, Attr::new(kind))?;
        debug!(ty = ty.name(), kind = ?kind, "registered container");
        Ok(kind)
    }

    /// Add a field
    pub fn add_field(&self, ty: Type, name: &str, field: FieldDescriptor) -> MetaResult<()> {
        let name = self.name(name);
        self.type_names.register_value(field.ty());
        self.registry.write().add_field(ty, name, FieldInfo::new(field))
    }

    /// Add a method overload; returns its index in the overload set
    pub fn add_method(&self, ty: Type, name: &str, method: MethodDescriptor) -> MetaResult<usize> {
        let name = self.name(name);
        self.registry.write().add_method(ty, name, MethodInfo::new(method))
    }

    /// Add a base edge
    ///
    /// A polymorphic edge also gives the base a way to find complete objects,
    /// which is what [`dynamic_cast`](Self::dynamic_cast) starts from.
    pub fn add_base(&self, derived: Type, base: Type, edge: BaseEdge) -> MetaResult<()> {
        let locate = edge.locator().cloned();
        let mut registry = self.registry.write();
        registry.add_base(derived, base, edge)?;
        if let (Some(locate), Some(info)) = (locate, registry.get_mut(base)) {
            info.locate.get_or_insert(LocateFn(locate));
        }
        Ok(())
    }

    /// Attach a type attribute
    pub fn add_type_attr(&self, ty: Type, attr: Attr) -> MetaResult<()> {
        self.registry.write().add_type_attr(ty, attr)
    }

    /// Attach a field attribute
    pub fn add_field_attr(&self, ty: Type, field: &str, attr: Attr) -> MetaResult<()> {
        let field = self.name(field);
        self.registry.write().add_field_attr(ty, field, attr)
    }

    /// Attach an attribute to one overload of a method
    pub fn add_method_attr(
        &self,
        ty: Type,
        method: &str,
        overload: usize,
        attr: Attr,
    ) -> MetaResult<()> {
        let method = self.name(method);
        self.registry.write().add_method_attr(ty, method, overload, attr)
    }

    pub(crate) fn update(&self, ty: Type, f: impl FnOnce(&mut TypeInfo)) {
        if let Some(info) = self.registry.write().get_mut(ty) {
            f(info);
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Check if a type is registered
    pub fn is_registered(&self, ty: Type) -> bool {
        self.registry.read().contains(ty.strip_cvref())
    }

    /// Every registered type
    pub fn types(&self) -> Vec<Type> {
        self.registry.read().types().collect()
    }

    /// Run `f` against a type's descriptor table
    pub fn inspect<R>(&self, ty: Type, f: impl FnOnce(&TypeInfo) -> R) -> Option<R> {
        self.registry.read().get(ty.strip_cvref()).map(f)
    }

    /// Fields of a type and its bases, most-derived first
    pub fn fields(&self, ty: Type) -> Vec<FieldSummary> {
        let registry = self.registry.read();
        let mut out = Vec::new();
        dispatch::walk(&registry, ty.strip_cvref(), ptr::null_mut(), &mut |info, _| {
            out.extend(info.fields().map(|(name, field)| FieldSummary {
                name,
                ty: field.descriptor().ty(),
                owner: info.ty(),
                mode: field.descriptor().mode(),
            }));
            true
        });
        out
    }

    /// Method overloads of a type and its bases, most-derived first
    pub fn methods(&self, ty: Type) -> Vec<MethodSummary> {
        let registry = self.registry.read();
        let mut out = Vec::new();
        dispatch::walk(&registry, ty.strip_cvref(), ptr::null_mut(), &mut |info, _| {
            for (name, overloads) in info.methods() {
                out.extend(overloads.iter().map(|m| MethodSummary {
                    name,
                    owner: info.ty(),
                    flag: m.descriptor().flag(),
                    params: m.descriptor().params().to_vec(),
                    result: m.descriptor().result_type(),
                }));
            }
            true
        });
        out
    }

    /// Direct bases in registration order
    pub fn bases(&self, ty: Type) -> Vec<Type> {
        self.inspect(ty, |info| info.bases().map(|(base, _)| base).collect())
            .unwrap_or_default()
    }

    /// Check if `derived` reaches `base` through registered edges
    pub fn is_derived_from(&self, derived: Type, base: Type) -> bool {
        dispatch::is_derived_from(&self.registry.read(), derived.strip_cvref(), base.strip_cvref())
    }

    /// A type attribute
    pub fn type_attr<A: Reflect + Clone>(&self, ty: Type) -> Option<A> {
        self.inspect(ty, |info| info.attrs().get::<A>().cloned()).flatten()
    }

    /// A field attribute, looked up through bases
    pub fn field_attr<A: Reflect + Clone>(&self, ty: Type, field: &str) -> Option<A> {
        let name = self.lookup_name(field)?;
        let registry = self.registry.read();
        let mut found = None;
        dispatch::walk(&registry, ty.strip_cvref(), ptr::null_mut(), &mut |info, _| {
            match info.field(name) {
                Some(field) => {
                    found = field.attrs().get::<A>().cloned();
                    false
                }
                None => true,
            }
        });
        found
    }

    /// An attribute of one own overload of a method
    pub fn method_attr<A: Reflect + Clone>(
        &self,
        ty: Type,
        method: &str,
        overload: usize,
    ) -> Option<A> {
        let name = self.lookup_name(method)?;
        self.inspect(ty, |info| {
            info.overloads(name)
                .get(overload)
                .and_then(|m| m.attrs().get::<A>().cloned())
        })
        .flatten()
    }

    /// Structural capabilities of a type
    pub fn capabilities(&self, ty: Type) -> Capabilities {
        self.inspect(ty, TypeInfo::capabilities).unwrap_or_default()
    }

    /// Container role of a type
    pub fn container_kind(&self, ty: Type) -> ContainerKind {
        self.inspect(ty, TypeInfo::container_kind).unwrap_or_default()
    }

    /// Check if a sum-type value currently holds `alternative`
    pub fn holds_alternative(&self, handle: ObjectHandle, alternative: Type) -> bool {
        if handle.is_null() {
            return false;
        }
        let table = self
            .inspect(handle.object_type(), |info| info.sum_type().cloned())
            .flatten();
        // SAFETY: the handle addresses a live value of its registered type.
        table.is_some_and(|t| unsafe { t.holds(handle.addr(), alternative) })
    }

    // ========================================================================
    // Field access
    // ========================================================================

    /// Handle to a field of an object, searched through bases
    ///
    /// The field handle is `&{F}`, or `&{const{F}}` when the object is
    /// read-only. Static and dynamically attached fields also resolve on a
    /// null object; instance fields of a null object give a null handle.
    pub fn var(&self, handle: ObjectHandle, field: &str) -> ObjectHandle {
        let Some(name) = self.lookup_name(field) else {
            trace!(field, "field name never registered");
            return ObjectHandle::null();
        };
        let registry = self.registry.read();
        let mut found = None;
        dispatch::walk(&registry, handle.object_type(), handle.addr(), &mut |info, addr| {
            match info.field(name) {
                Some(field) => {
                    let desc = field.descriptor();
                    found = Some((desc.ty(), desc.resolve(addr)));
                    false
                }
                None => true,
            }
        });
        match found {
            Some((_, addr)) if addr.is_null() => ObjectHandle::null(),
            Some((ty, addr)) => {
                let ty = if handle.is_const() { ty.add_const() } else { ty };
                ObjectHandle::new(ty.add_lvalue_reference(), addr)
            }
            None => {
                trace!(ty = handle.ty().name(), field, "no such field");
                ObjectHandle::null()
            }
        }
    }

    /// Handle to a static or attached field of a type
    pub fn static_var(&self, ty: Type, field: &str) -> ObjectHandle {
        self.var(ObjectHandle::new(ty, ptr::null_mut()), field)
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    fn resolve(
        &self,
        ty: Type,
        addr: *mut u8,
        method: &str,
        args: &[Type],
        access: Access,
    ) -> Option<Resolved> {
        let Some(name) = self.lookup_name(method) else {
            trace!(method, "method name never registered");
            return None;
        };
        dispatch::resolve(&self.registry.read(), ty, addr, name, args, access)
    }

    /// Result type the call would produce, or [`Type::INVALID`]
    ///
    /// `receiver` carries the receiver's category: `&{const{T}}` only sees
    /// read-only and static methods.
    pub fn is_invocable(&self, receiver: Type, method: &str, args: &[Type]) -> Type {
        let access = Access::of_type(receiver);
        self.resolve(receiver.strip_cvref(), ptr::null_mut(), method, args, access)
            .map_or(Type::INVALID, |r| r.method.result_type())
    }

    /// Like [`is_invocable`](Self::is_invocable), for static calls
    pub fn is_invocable_static(&self, ty: Type, method: &str, args: &[Type]) -> Type {
        self.resolve(ty.strip_cvref(), ptr::null_mut(), method, args, Access::Static)
            .map_or(Type::INVALID, |r| r.method.result_type())
    }

    /// Invoke a method; results go to the default result resource
    ///
    /// A null `handle` is a static call on its type.
    pub fn invoke(
        &self,
        handle: ObjectHandle,
        method: &str,
        args: &[ObjectHandle],
    ) -> OwningHandle {
        self.invoke_in(handle, method, args, self.result_resource())
    }

    /// Invoke a method with results allocated from `resource`
    pub fn invoke_in(
        &self,
        handle: ObjectHandle,
        method: &str,
        args: &[ObjectHandle],
        resource: ResourceRef,
    ) -> OwningHandle {
        let access = if handle.is_null() {
            Access::Static
        } else {
            Access::of(&handle)
        };
        self.dispatch(handle.object_type(), handle.addr(), method, args, access, resource)
    }

    /// Invoke a static method of a type
    pub fn invoke_static(&self, ty: Type, method: &str, args: &[ObjectHandle]) -> OwningHandle {
        let resource = self.result_resource();
        self.dispatch(ty.strip_cvref(), ptr::null_mut(), method, args, Access::Static, resource)
    }

    /// Invoke with native arguments, presented as temporaries
    pub fn call(&self, handle: ObjectHandle, method: &str, args: impl IntoArgs) -> OwningHandle {
        args.with_handles(|args| self.invoke(handle, method, args))
    }

    /// Invoke a static method with native arguments
    pub fn call_static(&self, ty: Type, method: &str, args: impl IntoArgs) -> OwningHandle {
        args.with_handles(|args| self.invoke_static(ty, method, args))
    }

    fn dispatch(
        &self,
        ty: Type,
        addr: *mut u8,
        method: &str,
        args: &[ObjectHandle],
        access: Access,
        resource: ResourceRef,
    ) -> OwningHandle {
        let arg_types: SmallVec<[Type; 4]> = args.iter().map(ObjectHandle::ty).collect();
        let Some(resolved) = self.resolve(ty, addr, method, &arg_types, access) else {
            return OwningHandle::invalid();
        };
        if resolved.method.flag() != MethodFlag::Static && resolved.receiver.is_null() {
            trace!(ty = ty.name(), method, "instance method on a null receiver");
            return OwningHandle::invalid();
        }
        let params = resolved.method.params();
        if params.iter().zip(args).any(|(p, a)| !p.is_object_handle() && a.is_null()) {
            trace!(ty = ty.name(), method, "null argument");
            return OwningHandle::invalid();
        }
        // SAFETY: receiver and arguments were type-checked by resolution.
        unsafe { run(&resolved.method, resolved.receiver, args, resource) }
    }

    // ========================================================================
    // Casting
    // ========================================================================

    /// Cast along registered edges; null when there is no path
    pub fn static_cast(&self, handle: ObjectHandle, target: Type) -> ObjectHandle {
        dispatch::static_cast(&self.registry.read(), handle, target)
    }

    /// Cast checked against the object's dynamic type; null on mismatch
    pub fn dynamic_cast(&self, handle: ObjectHandle, target: Type) -> ObjectHandle {
        dispatch::dynamic_cast(&self.registry.read(), handle, target)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    fn construct(
        &self,
        ty: Type,
        args: &[ObjectHandle],
        resource: &ResourceRef,
    ) -> Option<(NonNull<u8>, Layout, Option<MethodDescriptor>)> {
        let arg_types: SmallVec<[Type; 4]> = args.iter().map(ObjectHandle::ty).collect();
        let (ctor_name, dtor_name) = (self.name(CTOR), self.name(DTOR));
        let (layout, zeroable, ctor, dtor) = {
            let registry = self.registry.read();
            let Some(info) = registry.get(ty) else {
                trace!(ty = ty.name(), "construct of an unregistered type");
                return None;
            };
            let layout = info.layout().alloc_layout()?;
            let own = |name, args: &[Type]| {
                dispatch::resolve_own(info, ptr::null_mut(), name, args, Access::Mutable)
            };
            let ctor = own(ctor_name, &arg_types);
            let dtor = own(dtor_name, &[]);
            (layout, info.is_zeroable(), ctor, dtor.map(|d| d.method))
        };

        match ctor {
            Some(ctor) => {
                let params = ctor.method.params().iter();
                if params.zip(args).any(|(p, a)| !p.is_object_handle() && a.is_null()) {
                    return None;
                }
                let guard = AllocGuard {
                    resource,
                    ptr: resource.allocate(layout),
                    layout,
                };
                // SAFETY: fresh memory laid out for `ty`; arguments were
                // type-checked against the constructor.
                unsafe { ctor.method.call(guard.ptr.as_ptr(), NonNull::dangling().as_ptr(), args) };
                Some((guard.disarm(), layout, dtor))
            }
            None if args.is_empty() && zeroable => {
                let ptr = resource.allocate(layout);
                // SAFETY: the type was registered as valid when all-zero.
                unsafe { ptr::write_bytes(ptr.as_ptr(), 0, layout.size()) };
                Some((ptr, layout, dtor))
            }
            None => {
                trace!(ty = ty.name(), args = args.len(), "no viable constructor");
                None
            }
        }
    }

    /// Construct an object in instance memory
    ///
    /// Release it with [`delete`](Self::delete). Types marked
    /// [`zeroable`](crate::TypeBuilder::zeroable) without a zero-argument
    /// constructor are zero-initialized; other types without a viable
    /// constructor yield a null handle.
    pub fn new_object(&self, ty: Type, args: &[ObjectHandle]) -> ObjectHandle {
        let ty = ty.strip_cvref();
        let resource = self.instance_resource();
        match self.construct(ty, args, &resource) {
            Some((ptr, _, _)) => ObjectHandle::new(ty, ptr.as_ptr()),
            None => ObjectHandle::null(),
        }
    }

    /// Construct with native arguments
    pub fn new_with(&self, ty: Type, args: impl IntoArgs) -> ObjectHandle {
        args.with_handles(|args| self.new_object(ty, args))
    }

    /// Destroy and release an object made by [`new_object`](Self::new_object)
    ///
    /// # Safety
    ///
    /// `handle` must come from `new_object` on this engine and not have been
    /// deleted already.
    pub unsafe fn delete(&self, handle: ObjectHandle) {
        let Some(ptr) = NonNull::new(handle.addr()) else {
            return;
        };
        let ty = handle.object_type();
        let dtor_name = self.name(DTOR);
        let found = self.inspect(ty, |info| {
            let dtor = dispatch::resolve_own(info, ptr.as_ptr(), dtor_name, &[], Access::Mutable);
            (info.layout().alloc_layout(), dtor.map(|d| d.method))
        });
        let Some((Some(layout), dtor)) = found else {
            warn!(ty = ty.name(), "delete of an unregistered type leaks its memory");
            return;
        };
        if let Some(dtor) = dtor {
            dtor.call(ptr.as_ptr(), NonNull::dangling().as_ptr(), &[]);
        }
        self.system.deallocate(ptr, layout);
    }

    /// Construct an object owned by the returned handle
    pub fn make_shared(&self, ty: Type, args: &[ObjectHandle]) -> OwningHandle {
        let ty = ty.strip_cvref();
        let resource = self.instance_resource();
        let Some((ptr, layout, dtor)) = self.construct(ty, args, &resource) else {
            return OwningHandle::invalid();
        };
        let finalizer = dtor.map(|dtor| -> Finalizer {
            Box::new(move |p: *mut u8| unsafe {
                dtor.call(p, NonNull::dangling().as_ptr(), &[]);
            })
        });
        // SAFETY: `ptr` is initialized memory from `resource` with `layout`.
        let buffer = unsafe { SharedBuffer::from_raw(ptr, layout, resource, finalizer) };
        OwningHandle::from_buffer(ty, buffer)
    }

    /// Bind a handle to this engine
    pub fn bind(&self, handle: ObjectHandle) -> BoundHandle<'_> {
        BoundHandle::new(self, handle)
    }

    /// Release every registration
    ///
    /// Tables are released in order (attributes, owned fields, types), then
    /// the name registries and the scratch arena.
    pub fn clear(&self) {
        self.registry.write().clear();
        self.names.clear();
        self.type_names.clear();
        self.register_static_names();
        let rewound = self.scratch.trim();
        debug!(scratch_rewound = rewound, "cleared engine");
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.registry.read().len())
            .field("names", &self.names.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Run a resolved method and package its result
///
/// # Safety
///
/// `receiver` and `args` must satisfy the descriptor's contract.
unsafe fn run(
    method: &MethodDescriptor,
    receiver: *mut u8,
    args: &[ObjectHandle],
    resource: ResourceRef,
) -> OwningHandle {
    let out = method.result();
    match out.kind() {
        ResultKind::Void => {
            method.call(receiver, NonNull::<u8>::dangling().as_ptr(), args);
            OwningHandle::void()
        }
        ResultKind::Handle => {
            let mut slot = MaybeUninit::<ObjectHandle>::uninit();
            method.call(receiver, slot.as_mut_ptr().cast(), args);
            let handle = slot.assume_init();
            let ty = if handle.ty().is_valid() {
                handle.ty()
            } else {
                out.ty()
            };
            OwningHandle::borrowed(handle.with_type(ty))
        }
        ResultKind::Value => {
            let layout = out.layout();
            let guard = AllocGuard {
                resource: &resource,
                ptr: resource.allocate(layout),
                layout,
            };
            method.call(receiver, guard.ptr.as_ptr(), args);
            let ptr = guard.disarm();
            let finalizer = out.drop_fn().map(|drop| -> Finalizer {
                Box::new(move |p: *mut u8| unsafe { drop(p) })
            });
            let buffer = SharedBuffer::from_raw(ptr, layout, resource, finalizer);
            OwningHandle::from_buffer(out.ty(), buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field_of, Ref};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Account {
        owner: String,
        balance: i64,
    }
    crate::reflect_type!(Account);

    fn engine() -> Engine {
        let engine = Engine::with_options(EngineOptions::bare());
        engine
            .register::<Account>()
            .field("owner", field_of!(Account, owner))
            .unwrap()
            .field("balance", field_of!(Account, balance))
            .unwrap()
            .method("balance", |a: &Account| a.balance)
            .unwrap()
            .method_mut("deposit", |a: &mut Account, amount: i64| {
                a.balance += amount;
                a.balance
            })
            .unwrap()
            .method("owner_is", |a: &Account, name: Ref<String>| a.owner == *name)
            .unwrap()
            .function("bank", || String::from("first"))
            .unwrap()
            .default_constructor()
            .unwrap();
        engine
    }

    #[test]
    fn test_var_respects_constness() {
        let engine = engine();
        let mut acct = Account {
            owner: "ada".into(),
            balance: 10,
        };
        let h = engine.var(ObjectHandle::from_mut(&mut acct), "balance");
        assert_eq!(h.ty().name(), "&{i64}");
        unsafe { *h.get_mut::<i64>().unwrap() = 25 };
        assert_eq!(acct.balance, 25);

        let c = engine.var(ObjectHandle::from_ref(&acct), "owner");
        assert_eq!(c.ty().name(), "&{const{String}}");
        assert!(unsafe { c.get_mut::<String>() }.is_none());

        assert!(engine.var(ObjectHandle::from_ref(&acct), "missing").is_null());
        assert!(engine.static_var(type_of::<Account>(), "balance").is_null());
    }

    #[test]
    fn test_invoke_results() {
        let engine = engine();
        let mut acct = Account::default();
        let h = ObjectHandle::from_mut(&mut acct);

        let r = engine.call(h, "deposit", (5i64,));
        assert_eq!(r.read::<i64>(), Some(5));
        assert!(r.is_owning());
        drop(r);
        assert_eq!(engine.scratch().live(), 0);

        let bank = engine.call_static(type_of::<Account>(), "bank", ());
        assert_eq!(bank.read::<String>().as_deref(), Some("first"));

        let name = String::new();
        let r = engine.invoke(h, "owner_is", &[ObjectHandle::from_ref(&name)]);
        assert_eq!(r.read::<bool>(), Some(true));
    }

    #[test]
    fn test_const_receiver_sees_const_methods_only() {
        let engine = engine();
        let acct = Account::default();
        let h = ObjectHandle::from_ref(&acct);
        assert!(!engine.call(h, "deposit", (1i64,)).is_valid());
        assert!(engine.call(h, "balance", ()).is_valid());

        let view = type_of::<Account>().add_const_lvalue_reference();
        assert_eq!(engine.is_invocable(view, "deposit", &[type_of::<i64>()]), Type::INVALID);
        assert_eq!(engine.is_invocable(view, "balance", &[]), type_of::<i64>());
        assert_eq!(engine.is_invocable_static(type_of::<Account>(), "balance", &[]), Type::INVALID);
    }

    #[test]
    fn test_null_receiver_and_arguments() {
        let engine = engine();
        let null = ObjectHandle::new(type_of::<Account>(), ptr::null_mut());
        assert!(!engine.invoke(null, "balance", &[]).is_valid());
        assert!(engine.invoke(null, "bank", &[]).is_valid());

        let mut acct = Account::default();
        let bad = ObjectHandle::new(type_of::<i64>(), ptr::null_mut());
        assert!(!engine
            .invoke(ObjectHandle::from_mut(&mut acct), "deposit", &[bad])
            .is_valid());
    }

    #[test]
    fn test_new_and_delete() {
        let engine = engine();
        let obj = engine.new_object(type_of::<Account>(), &[]);
        assert!(!obj.is_null());
        assert_eq!(unsafe { obj.get::<Account>() }, Some(&Account::default()));
        unsafe { engine.delete(obj) };

        assert!(engine.new_object(Type::new("Nope"), &[]).is_null());
        assert!(engine.new_with(type_of::<Account>(), (1i32,)).is_null());
    }

    #[test]
    fn test_clear() {
        let engine = engine();
        assert!(engine.is_registered(type_of::<Account>()));
        engine.clear();
        assert!(!engine.is_registered(type_of::<Account>()));
        assert!(engine.types().is_empty());
        let mut acct = Account::default();
        assert!(engine.var(ObjectHandle::from_mut(&mut acct), "balance").is_null());
    }
}
