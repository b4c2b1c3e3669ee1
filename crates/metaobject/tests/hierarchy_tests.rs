use std::mem::offset_of;
use std::ptr;

use metaobject::{
    base_of, field_of, reflect_type, type_of, BaseEdge, EdgeKind, Engine, ObjectHandle,
    Polymorphic, TypeHeader,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Default)]
struct Entity {
    id: u32,
}
reflect_type!(Entity);

#[derive(Debug, Default)]
struct Player {
    name: String,
    entity: Entity,
    score: i64,
}
reflect_type!(Player);

fn entity_engine() -> Engine {
    let engine = Engine::new();
    engine
        .register::<Entity>()
        .field("id", field_of!(Entity, id))
        .unwrap()
        .method("id", |e: &Entity| e.id)
        .unwrap()
        .method("describe", |_: &Entity| String::from("entity"))
        .unwrap();
    engine
        .register::<Player>()
        .base::<Entity>(base_of!(Player, entity))
        .unwrap()
        .field("score", field_of!(Player, score))
        .unwrap()
        .method("describe", |p: &Player| format!("player {}", p.name))
        .unwrap();
    engine
}

/// Polymorphic bases carry a header naming the complete object.
#[derive(Debug)]
#[repr(C)]
struct Shape {
    header: TypeHeader,
    sides: u32,
}
reflect_type!(Shape);

impl Polymorphic for Shape {
    fn type_header(&self) -> &TypeHeader {
        &self.header
    }
}

#[derive(Debug)]
#[repr(C)]
struct Named {
    header: TypeHeader,
    name: &'static str,
}
reflect_type!(Named);

impl Polymorphic for Named {
    fn type_header(&self) -> &TypeHeader {
        &self.header
    }
}

#[derive(Debug)]
#[repr(C)]
struct Square {
    shape: Shape,
    named: Named,
    side: f64,
}
reflect_type!(Square);

impl Square {
    fn new(side: f64) -> Self {
        Self {
            shape: Shape {
                header: TypeHeader::new::<Square>(),
                sides: 4,
            },
            named: Named {
                header: TypeHeader::at::<Square>(offset_of!(Square, named)),
                name: "square",
            },
            side,
        }
    }
}

/// Reaches `Named` as a shared base: no fixed way back up.
#[derive(Debug)]
#[repr(C)]
struct Badge {
    rank: u8,
    named: Named,
}
reflect_type!(Badge);

impl Badge {
    fn new() -> Self {
        Self {
            rank: 1,
            named: Named {
                header: TypeHeader::at::<Badge>(offset_of!(Badge, named)),
                name: "badge",
            },
        }
    }
}

fn shape_engine() -> Engine {
    let engine = Engine::new();
    engine
        .register_polymorphic::<Shape>()
        .field("sides", field_of!(Shape, sides))
        .unwrap();
    engine.register_polymorphic::<Named>();
    engine
        .register::<Square>()
        .base::<Shape>(base_of!(polymorphic Square, shape))
        .unwrap()
        .base::<Named>(base_of!(polymorphic Square, named))
        .unwrap();
    engine
        .register::<Badge>()
        .base::<Named>(BaseEdge::shared_polymorphic(|b: &Badge| &b.named))
        .unwrap();
    engine
}

// ============================================================================
// Single Inheritance Tests
// ============================================================================

#[test]
fn test_inherited_field_and_method() {
    let engine = entity_engine();
    let mut p = Player {
        name: "ada".into(),
        entity: Entity { id: 7 },
        score: 10,
    };
    let h = ObjectHandle::from_mut(&mut p);

    let id = engine.var(h, "id");
    assert_eq!(id.addr(), ptr::addr_of_mut!(p.entity.id).cast());
    assert_eq!(engine.call(h, "id", ()).read::<u32>(), Some(7));
    assert!(!engine.var(h, "score").is_null());
}

#[test]
fn test_most_derived_overload_wins() {
    let engine = entity_engine();
    let p = Player {
        name: "ada".into(),
        ..Player::default()
    };
    let r = engine.call(ObjectHandle::from_ref(&p), "describe", ());
    assert_eq!(r.read::<String>().as_deref(), Some("player ada"));

    let entity = engine.static_cast(ObjectHandle::from_ref(&p), type_of::<Entity>());
    let r = engine.call(entity, "describe", ());
    assert_eq!(r.read::<String>().as_deref(), Some("entity"));
}

#[test]
fn test_static_cast_both_directions() {
    let engine = entity_engine();
    let mut p = Player::default();
    let player = ObjectHandle::from_mut(&mut p);

    let entity = engine.static_cast(player, type_of::<Entity>());
    assert_eq!(entity.ty().name(), "&{Entity}");
    assert_eq!(entity.addr(), ptr::addr_of_mut!(p.entity).cast());

    let back = engine.static_cast(entity, type_of::<Player>());
    assert_eq!(back.addr(), ptr::addr_of_mut!(p).cast());
    assert!(engine.static_cast(player, type_of::<String>()).is_null());
}

#[test]
fn test_cast_keeps_constness() {
    let engine = entity_engine();
    let p = Player::default();
    let entity = engine.static_cast(ObjectHandle::from_ref(&p), type_of::<Entity>());
    assert_eq!(entity.ty().name(), "&{const{Entity}}");
}

#[test]
fn test_hierarchy_queries() {
    let engine = entity_engine();
    assert!(engine.is_derived_from(type_of::<Player>(), type_of::<Entity>()));
    assert!(!engine.is_derived_from(type_of::<Entity>(), type_of::<Player>()));
    assert!(!engine.is_derived_from(type_of::<Player>(), type_of::<Player>()));
    assert_eq!(engine.bases(type_of::<Player>()), vec![type_of::<Entity>()]);

    let fields = engine.fields(type_of::<Player>());
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["score", "id"]);
    assert_eq!(fields[1].owner, type_of::<Entity>());
}

#[test]
fn test_duplicate_base_is_rejected() {
    let engine = entity_engine();
    let err = engine
        .register::<Player>()
        .base::<Entity>(base_of!(Player, entity))
        .err();
    assert!(err.is_some());
}

// ============================================================================
// Polymorphic Tests
// ============================================================================

#[test]
fn test_dynamic_cast_recovers_complete_object() {
    let engine = shape_engine();
    let mut sq = Square::new(2.0);
    let square = ObjectHandle::from_mut(&mut sq);

    let named = engine.static_cast(square, type_of::<Named>());
    assert_eq!(named.addr(), ptr::addr_of_mut!(sq.named).cast());

    let back = engine.dynamic_cast(named, type_of::<Square>());
    assert_eq!(back.addr(), ptr::addr_of_mut!(sq).cast());
    assert_eq!(back.ty().name(), "&{Square}");

    // Cross cast between sibling bases.
    let shape = engine.dynamic_cast(named, type_of::<Shape>());
    assert_eq!(shape.addr(), ptr::addr_of_mut!(sq.shape).cast());
    assert_eq!(unsafe { engine.var(shape, "sides").get::<u32>() }, Some(&4));
}

#[test]
fn test_dynamic_cast_rejects_wrong_dynamic_type() {
    let engine = shape_engine();
    let mut alone = Named {
        header: TypeHeader::new::<Named>(),
        name: "alone",
    };
    let h = ObjectHandle::from_mut(&mut alone);
    assert!(engine.dynamic_cast(h, type_of::<Square>()).is_null());
    assert_eq!(engine.dynamic_cast(h, type_of::<Named>()).addr(), h.addr());
}

#[test]
fn test_dynamic_cast_needs_polymorphic_type() {
    let engine = entity_engine();
    let mut p = Player::default();
    let entity = engine.static_cast(ObjectHandle::from_mut(&mut p), type_of::<Entity>());
    assert!(engine.dynamic_cast(entity, type_of::<Player>()).is_null());
}

#[test]
fn test_shared_base_only_goes_up_dynamically() {
    let engine = shape_engine();
    let mut badge = Badge::new();
    let h = ObjectHandle::from_mut(&mut badge);

    let edge_kind = engine
        .inspect(type_of::<Badge>(), |info| {
            info.bases().map(|(_, edge)| edge.kind()).next()
        })
        .flatten();
    assert_eq!(edge_kind, Some(EdgeKind::VirtualPolymorphic));

    let named = engine.static_cast(h, type_of::<Named>());
    assert_eq!(named.addr(), ptr::addr_of_mut!(badge.named).cast());
    assert!(engine.static_cast(named, type_of::<Badge>()).is_null());

    let back = engine.dynamic_cast(named, type_of::<Badge>());
    assert_eq!(back.addr(), h.addr());
}

#[derive(Debug)]
#[repr(C)]
struct Creature {
    header: TypeHeader,
    legs: u32,
}
reflect_type!(Creature);

impl Polymorphic for Creature {
    fn type_header(&self) -> &TypeHeader {
        &self.header
    }
}

#[derive(Debug)]
#[repr(C)]
struct Hound {
    creature: Creature,
    speed: f32,
}
reflect_type!(Hound);

#[derive(Debug)]
#[repr(C)]
struct Beagle {
    hound: Hound,
    ears: u8,
}
reflect_type!(Beagle);

#[test]
fn test_dynamic_cast_to_intermediate_base() {
    let engine = Engine::new();
    engine.register_polymorphic::<Creature>();
    engine
        .register::<Hound>()
        .base::<Creature>(base_of!(polymorphic Hound, creature))
        .unwrap();
    engine
        .register::<Beagle>()
        .base::<Hound>(base_of!(Beagle, hound))
        .unwrap();

    let offset = offset_of!(Beagle, hound) + offset_of!(Hound, creature);
    let mut beagle = Beagle {
        hound: Hound {
            creature: Creature {
                header: TypeHeader::at::<Beagle>(offset),
                legs: 4,
            },
            speed: 1.0,
        },
        ears: 2,
    };
    let creature = engine.static_cast(ObjectHandle::from_mut(&mut beagle), type_of::<Creature>());
    assert_eq!(creature.addr(), ptr::addr_of_mut!(beagle.hound.creature).cast());

    let hound = engine.dynamic_cast(creature, type_of::<Hound>());
    assert_eq!(hound.addr(), ptr::addr_of_mut!(beagle.hound).cast());
    assert_eq!(hound.ty().name(), "&{Hound}");
    let back = engine.dynamic_cast(creature, type_of::<Beagle>());
    assert_eq!(back.addr(), ptr::addr_of_mut!(beagle).cast());
}

// ============================================================================
// Diamond Tests
// ============================================================================

#[derive(Debug, Default)]
struct Root {
    value: i32,
}
reflect_type!(Root);

#[derive(Debug, Default)]
struct Left {
    root: Root,
}
reflect_type!(Left);

#[derive(Debug, Default)]
struct Right {
    root: Root,
}
reflect_type!(Right);

#[derive(Debug, Default)]
struct Bottom {
    left: Left,
    right: Right,
}
reflect_type!(Bottom);

fn diamond_engine() -> Engine {
    let engine = Engine::new();
    engine
        .register::<Root>()
        .field("value", field_of!(Root, value))
        .unwrap()
        .method("value", |r: &Root| r.value)
        .unwrap();
    engine
        .register::<Left>()
        .base::<Root>(base_of!(Left, root))
        .unwrap();
    engine
        .register::<Right>()
        .base::<Root>(base_of!(Right, root))
        .unwrap();
    engine
        .register::<Bottom>()
        .base::<Left>(base_of!(Bottom, left))
        .unwrap()
        .base::<Right>(base_of!(Bottom, right))
        .unwrap();
    engine
}

#[test]
fn test_diamond_resolves_through_first_path() {
    let engine = diamond_engine();
    let mut b = Bottom::default();
    b.left.root.value = 1;
    b.right.root.value = 2;
    let h = ObjectHandle::from_mut(&mut b);

    let value = engine.var(h, "value");
    assert_eq!(value.addr(), ptr::addr_of_mut!(b.left.root.value).cast());
    assert_eq!(engine.call(h, "value", ()).read::<i32>(), Some(1));

    let root_fields = engine
        .fields(type_of::<Bottom>())
        .into_iter()
        .filter(|f| f.owner == type_of::<Root>())
        .count();
    assert_eq!(root_fields, 1);
}

#[test]
fn test_diamond_casts() {
    let engine = diamond_engine();
    let mut b = Bottom::default();
    let h = ObjectHandle::from_mut(&mut b);

    let right = engine.static_cast(h, type_of::<Right>());
    let root = engine.static_cast(right, type_of::<Root>());
    assert_eq!(root.addr(), ptr::addr_of_mut!(b.right.root).cast());
    assert!(engine.is_derived_from(type_of::<Bottom>(), type_of::<Root>()));
}
