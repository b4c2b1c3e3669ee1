//! Typed registration
//!
//! `Engine::register::<T>()` hands out a `TypeBuilder` that erases native
//! closures into descriptors and records them for `T`. Every call returns
//! the builder again, so registrations chain with `?`:
//!
//! ```ignore
//! engine
//!     .register::<Point>()
//!     .field("x", field_of!(Point, x))?
//!     .attr(Tooltip("horizontal"))?
//!     .method("length", |p: &Point| p.length())?
//!     .method_mut("scale", |p: &mut Point, k: f64| p.scale(k))?
//!     .default_constructor()?;
//! ```
//!
//! [`attr`](TypeBuilder::attr) attaches to the member registered last, or
//! to the type when nothing has been registered yet.

use std::marker::PhantomData;

use crate::attr::Attr;
use crate::base::BaseEdge;
use crate::capability::Capabilities;
use crate::container::SumTypeTable;
use crate::engine::Engine;
use crate::error::MetaResult;
use crate::field::FieldDescriptor;
use crate::method::MethodDescriptor;
use crate::ops::{Operator, CTOR};
use crate::param::{ConstMethod, Constructor, MutMethod, StaticFunction};
use crate::ty::{type_of, Name, Reflect, Type};

#[derive(Debug, Clone, Copy)]
enum Member {
    Field(Name),
    Method(Name, usize),
}

/// Registration surface for one native type
pub struct TypeBuilder<'e, T> {
    engine: &'e Engine,
    ty: Type,
    last: Option<Member>,
    _marker: PhantomData<fn() -> T>,
}

impl<'e, T: Reflect> TypeBuilder<'e, T> {
    pub(crate) fn new(engine: &'e Engine, ty: Type) -> Self {
        Self {
            engine,
            ty,
            last: None,
            _marker: PhantomData,
        }
    }

    /// The type being registered
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// The engine registered into
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    /// Add a field
    pub fn field(&mut self, name: &str, field: FieldDescriptor) -> MetaResult<&mut Self> {
        self.engine.add_field(self.ty, name, field)?;
        self.last = Some(Member::Field(self.engine.name(name)));
        Ok(self)
    }

    /// Add a method from an erased descriptor
    pub fn descriptor(&mut self, name: &str, method: MethodDescriptor) -> MetaResult<&mut Self> {
        let index = self.engine.add_method(self.ty, name, method)?;
        self.last = Some(Member::Method(self.engine.name(name), index));
        Ok(self)
    }

    /// Add a method callable on a read-only receiver
    pub fn method<M>(&mut self, name: &str, f: impl ConstMethod<T, M>) -> MetaResult<&mut Self> {
        self.descriptor(name, f.into_descriptor())
    }

    /// Add a method that needs a mutable receiver
    pub fn method_mut<M>(&mut self, name: &str, f: impl MutMethod<T, M>) -> MetaResult<&mut Self> {
        self.descriptor(name, f.into_descriptor())
    }

    /// Add a function with no receiver
    pub fn function<M>(&mut self, name: &str, f: impl StaticFunction<M>) -> MetaResult<&mut Self> {
        self.descriptor(name, f.into_descriptor())
    }

    /// Add a read-only method with a declared result type
    ///
    /// Used for methods returning an [`ObjectHandle`](crate::ObjectHandle)
    /// into the receiver, so callers see `&{const{E}}` rather than a bare
    /// handle.
    pub fn method_as<M>(
        &mut self,
        name: &str,
        result: Type,
        f: impl ConstMethod<T, M>,
    ) -> MetaResult<&mut Self> {
        self.descriptor(name, f.into_descriptor().with_result_type(result))
    }

    /// Add a mutable method with a declared result type
    pub fn method_mut_as<M>(
        &mut self,
        name: &str,
        result: Type,
        f: impl MutMethod<T, M>,
    ) -> MetaResult<&mut Self> {
        self.descriptor(name, f.into_descriptor().with_result_type(result))
    }

    /// Add an operator; operators take the receiver by reference
    pub fn operator<M>(
        &mut self,
        op: Operator,
        f: impl ConstMethod<T, M>,
    ) -> MetaResult<&mut Self> {
        self.descriptor(op.method_name(), f.into_descriptor())
    }

    /// Add a constructor
    pub fn constructor<M>(&mut self, f: impl Constructor<T, M>) -> MetaResult<&mut Self> {
        self.descriptor(CTOR, f.into_descriptor())
    }

    /// Add `T::default` as the zero-argument constructor
    pub fn default_constructor(&mut self) -> MetaResult<&mut Self>
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    /// Allow construction without a constructor by zero-filling
    ///
    /// # Safety
    ///
    /// The all-zero bit pattern must be a valid `T`.
    pub unsafe fn zeroable(&mut self) -> &mut Self {
        self.engine.update(self.ty, |info| info.zeroable = true);
        self
    }

    /// Declare a base
    pub fn base<B: Reflect>(&mut self, edge: BaseEdge) -> MetaResult<&mut Self> {
        self.engine.add_base(self.ty, type_of::<B>(), edge)?;
        Ok(self)
    }

    /// Attach an attribute to the type
    pub fn type_attr<A: Reflect + Send + Sync>(&mut self, value: A) -> MetaResult<&mut Self> {
        self.engine.add_type_attr(self.ty, Attr::new(value))?;
        Ok(self)
    }

    /// Attach an attribute to the last member, or to the type
    pub fn attr<A: Reflect + Send + Sync>(&mut self, value: A) -> MetaResult<&mut Self> {
        let attr = Attr::new(value);
        match self.last {
            None => self.engine.add_type_attr(self.ty, attr)?,
            Some(Member::Field(name)) => self.engine.add_field_attr(self.ty, name.as_str(), attr)?,
            Some(Member::Method(name, index)) => {
                self.engine
                    .add_method_attr(self.ty, name.as_str(), index, attr)?
            }
        }
        Ok(self)
    }

    /// Add structural capability bits
    pub fn capabilities(&mut self, caps: Capabilities) -> &mut Self {
        self.engine.update(self.ty, |info| info.capabilities |= caps);
        self
    }

    /// Attach the sum-type accessor table
    pub fn sum_type(&mut self, table: SumTypeTable) -> &mut Self {
        self.engine.update(self.ty, |info| info.sum = Some(table));
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineOptions, MetaError, ObjectHandle};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Gauge {
        level: f32,
    }
    crate::reflect_type!(Gauge);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Label(&'static str);
    crate::reflect_type!(Label);

    #[test]
    fn test_attr_targets_last_member() {
        let engine = Engine::with_options(EngineOptions::bare());
        engine
            .register::<Gauge>()
            .attr(Label("type"))
            .unwrap()
            .field("level", crate::field_of!(Gauge, level))
            .unwrap()
            .attr(Label("field"))
            .unwrap()
            .method("read", |g: &Gauge| g.level)
            .unwrap()
            .attr(Label("method"))
            .unwrap();

        let ty = crate::type_of::<Gauge>();
        assert_eq!(engine.type_attr::<Label>(ty), Some(Label("type")));
        assert_eq!(engine.field_attr::<Label>(ty, "level"), Some(Label("field")));
        assert_eq!(engine.method_attr::<Label>(ty, "read", 0), Some(Label("method")));
    }

    #[test]
    fn test_duplicate_member_is_an_error() {
        let engine = Engine::with_options(EngineOptions::bare());
        let mut b = engine.register::<Gauge>();
        b.field("level", crate::field_of!(Gauge, level)).unwrap();
        let err = b.field("level", crate::field_of!(Gauge, level)).err();
        assert!(matches!(err, Some(MetaError::DuplicateField { .. })));

        b.method("read", |g: &Gauge| g.level).unwrap();
        assert!(b.method("read", |g: &Gauge| g.level * 2.0).is_err());
        assert!(b.method_mut("read", |g: &mut Gauge| g.level).is_ok());
    }

    #[test]
    fn test_default_constructor() {
        let engine = Engine::with_options(EngineOptions::bare());
        engine.register::<Gauge>().default_constructor().unwrap();
        let obj = engine.make_shared(crate::type_of::<Gauge>(), &[]);
        assert_eq!(obj.value::<Gauge>(), Some(&Gauge::default()));
        let _: ObjectHandle = obj.handle();
    }
}
