use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, LinkedList, VecDeque};

use metaobject::{
    reflect_type, type_of, Capabilities, ContainerKind, Engine, ObjectHandle, SumType, Type,
};

// ============================================================================
// Classification Tests
// ============================================================================

#[test]
fn test_container_kinds() {
    let engine = Engine::new();
    assert_eq!(engine.register_container::<Vec<i32>>(), Ok(ContainerKind::Vector));
    assert_eq!(engine.register_container::<[i32; 4]>(), Ok(ContainerKind::Array));
    assert_eq!(engine.register_container::<VecDeque<i32>>(), Ok(ContainerKind::Deque));
    assert_eq!(engine.register_container::<LinkedList<i32>>(), Ok(ContainerKind::List));
    assert_eq!(engine.register_container::<BTreeSet<i32>>(), Ok(ContainerKind::Set));
    assert_eq!(engine.register_container::<HashSet<i32>>(), Ok(ContainerKind::UnorderedSet));
    assert_eq!(engine.register_container::<BTreeMap<String, i32>>(), Ok(ContainerKind::Map));
    assert_eq!(
        engine.register_container::<HashMap<String, i32>>(),
        Ok(ContainerKind::UnorderedMap)
    );
    assert_eq!(
        engine.register_container::<BinaryHeap<i32>>(),
        Ok(ContainerKind::PriorityQueue)
    );
    assert_eq!(engine.register_container::<Option<i32>>(), Ok(ContainerKind::Optional));
    assert_eq!(engine.register_container::<(i32, f64)>(), Ok(ContainerKind::Pair));
    assert_eq!(engine.register_container::<(i32, f64, bool)>(), Ok(ContainerKind::Tuple));
    assert_eq!(
        engine.register_container::<Result<i32, String>>(),
        Ok(ContainerKind::SumType)
    );

    assert_eq!(engine.container_kind(type_of::<Vec<i32>>()), ContainerKind::Vector);
    assert_eq!(
        engine.type_attr::<ContainerKind>(type_of::<Vec<i32>>()),
        Some(ContainerKind::Vector)
    );
    assert_eq!(engine.container_kind(type_of::<i32>()), ContainerKind::None);
}

#[test]
fn test_register_container_twice() {
    let engine = Engine::new();
    assert_eq!(engine.register_container::<Vec<u8>>(), Ok(ContainerKind::Vector));
    assert_eq!(engine.register_container::<Vec<u8>>(), Ok(ContainerKind::Vector));
    let caps = engine.capabilities(type_of::<Vec<u8>>());
    assert!(caps.contains(Capabilities::PUSH_BACK | Capabilities::RANDOM_ACCESS));
    assert!(!caps.contains(Capabilities::FIXED_EXTENT));
}

// ============================================================================
// Sequence Tests
// ============================================================================

#[test]
fn test_vector_protocol() {
    let engine = Engine::new();
    engine.register_container::<Vec<i32>>().unwrap();
    let mut values = vec![10i32, 20];
    let v = engine.bind(ObjectHandle::from_mut(&mut values));

    assert_eq!(v.size(), Some(2));
    assert_eq!(v.is_empty(), Some(false));
    assert!(v.push_back(ObjectHandle::from_ref(&30i32)));
    assert_eq!(unsafe { v.at(2).get::<i32>() }, Some(&30));
    assert!(v.at(3).is_null());

    let front = v.call("front", ());
    assert_eq!(front.ty().name(), "&{i32}");
    unsafe { *front.handle().get_mut::<i32>().unwrap() = 11 };

    let seen: Vec<i32> = v
        .iter()
        .into_iter()
        .map(|h| unsafe { *h.get::<i32>().unwrap() })
        .collect();
    assert_eq!(seen, [11, 20, 30]);

    assert!(v.erase(ObjectHandle::from_ref(&0usize)));
    assert!(!v.erase(ObjectHandle::from_ref(&9usize)));
    assert_eq!(v.call("insert", (0usize, 5i32)).read::<bool>(), Some(true));
    assert_eq!(values, [5, 20, 30]);
}

#[test]
fn test_const_sequence_hands_out_const_elements() {
    let engine = Engine::new();
    engine.register_container::<Vec<i32>>().unwrap();
    let values = vec![1i32, 2, 3];
    let v = engine.bind(ObjectHandle::from_ref(&values));

    let back = v.call("back", ());
    assert_eq!(back.ty().name(), "&{const{i32}}");
    assert_eq!(unsafe { back.handle().get::<i32>() }, Some(&3));
    assert!(!v.push_back(ObjectHandle::from_ref(&4i32)));
    assert!(v.iter().iter().all(|h| h.is_const()));
}

#[test]
fn test_array_and_deque() {
    let engine = Engine::new();
    engine.register_container::<[u8; 3]>().unwrap();
    engine.register_container::<VecDeque<u8>>().unwrap();

    let mut arr = [1u8, 2, 3];
    let a = engine.bind(ObjectHandle::from_mut(&mut arr));
    assert_eq!(a.size(), Some(3));
    assert!(!a.push_back(ObjectHandle::from_ref(&4u8)));
    let idx = a.call("__index", (1usize,));
    assert_eq!(unsafe { idx.handle().get::<u8>() }, Some(&2));

    let mut dq: VecDeque<u8> = VecDeque::new();
    let d = engine.bind(ObjectHandle::from_mut(&mut dq));
    d.invoke("push_front", &[ObjectHandle::from_ref(&1u8)]);
    d.invoke("push_front", &[ObjectHandle::from_ref(&0u8)]);
    assert_eq!(d.size(), Some(2));
    assert_eq!(unsafe { d.at(0).get::<u8>() }, Some(&0));
}

// ============================================================================
// Associative Tests
// ============================================================================

#[test]
fn test_map_protocol() {
    let engine = Engine::new();
    engine.register_container::<BTreeMap<String, i32>>().unwrap();
    let mut scores: BTreeMap<String, i32> = BTreeMap::new();
    let m = engine.bind(ObjectHandle::from_mut(&mut scores));

    let ada = String::from("ada");
    let one = 1i32;
    let entry = [ObjectHandle::from_ref(&ada), ObjectHandle::from_ref(&one)];
    let inserted = m.invoke("insert", &entry);
    assert_eq!(inserted.read::<bool>(), Some(true));
    let two = 2i32;
    let again = m.invoke("insert", &[ObjectHandle::from_ref(&ada), ObjectHandle::from_ref(&two)]);
    assert_eq!(again.read::<bool>(), Some(false));

    assert!(m.contains(ObjectHandle::from_ref(&ada)));
    let found = m.find(ObjectHandle::from_ref(&ada));
    assert_eq!(unsafe { found.get::<i32>() }, Some(&1));
    assert!(m.find(ObjectHandle::from_ref(&String::from("bob"))).is_null());

    let values: Vec<i32> = m.iter().iter().map(|h| unsafe { *h.get::<i32>().unwrap() }).collect();
    assert_eq!(values, [1]);

    assert!(m.erase(ObjectHandle::from_ref(&ada)));
    assert_eq!(m.size(), Some(0));
}

#[test]
fn test_set_and_heap() {
    let engine = Engine::new();
    engine.register_container::<HashSet<u32>>().unwrap();
    engine.register_container::<BinaryHeap<u32>>().unwrap();

    let mut set: HashSet<u32> = HashSet::new();
    let s = engine.bind(ObjectHandle::from_mut(&mut set));
    assert_eq!(s.call("insert", (4u32,)).read::<bool>(), Some(true));
    assert_eq!(s.call("insert", (4u32,)).read::<bool>(), Some(false));
    assert_eq!(s.size(), Some(1));

    let mut heap = BinaryHeap::from([3u32, 9, 1]);
    let h = engine.bind(ObjectHandle::from_mut(&mut heap));
    let top = h.call("top", ());
    assert_eq!(unsafe { top.handle().get::<u32>() }, Some(&9));
    h.call("pop", ());
    assert_eq!(h.size(), Some(2));
}

// ============================================================================
// Sum Type Tests
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Word(String),
}
reflect_type!(enum Token);

impl SumType for Token {
    fn alternatives() -> Vec<Type> {
        vec![type_of::<f64>(), type_of::<String>()]
    }

    fn index(&self) -> usize {
        match self {
            Token::Number(_) => 0,
            Token::Word(_) => 1,
        }
    }

    fn alternative(&self) -> ObjectHandle {
        match self {
            Token::Number(n) => ObjectHandle::from_ref(n),
            Token::Word(w) => ObjectHandle::from_ref(w),
        }
    }

    fn alternative_mut(&mut self) -> ObjectHandle {
        match self {
            Token::Number(n) => ObjectHandle::from_mut(n),
            Token::Word(w) => ObjectHandle::from_mut(w),
        }
    }
}

#[test]
fn test_user_sum_type() {
    let engine = Engine::new();
    assert_eq!(engine.register_sum_type::<Token>(), Ok(ContainerKind::SumType));
    assert_eq!(type_of::<Token>().name(), "enum{Token}");

    let mut tok = Token::Word("hi".into());
    let h = ObjectHandle::from_mut(&mut tok);
    assert!(engine.holds_alternative(h, type_of::<String>()));
    assert!(!engine.holds_alternative(h, type_of::<f64>()));
    assert_eq!(engine.call(h, "index", ()).read::<usize>(), Some(1));
    assert_eq!(
        engine.call(h, "holds_alternative", (String::from("String"),)).read::<bool>(),
        Some(true)
    );

    let active = engine.call(h, "get", (1usize,));
    unsafe { active.handle().get_mut::<String>().unwrap().push('!') };
    assert!(engine.call(h, "get", (0usize,)).handle().is_null());
    assert_eq!(tok, Token::Word("hi!".into()));
}

#[test]
fn test_option_and_pair() {
    let engine = Engine::new();
    engine.register_container::<Option<i32>>().unwrap();
    engine.register_container::<(String, i32)>().unwrap();

    let mut opt: Option<i32> = None;
    let o = engine.bind(ObjectHandle::from_mut(&mut opt));
    assert_eq!(o.call("has_value", ()).read::<bool>(), Some(false));
    o.call("emplace", (5i32,));
    assert_eq!(unsafe { o.call("value", ()).handle().get::<i32>() }, Some(&5));
    o.call("reset", ());
    assert_eq!(opt, None);

    let pair = (String::from("k"), 3i32);
    let p = engine.bind(ObjectHandle::from_ref(&pair));
    let second = p.call("second", ());
    assert_eq!(second.ty().name(), "&{const{i32}}");
    assert_eq!(
        engine
            .call_static(type_of::<(String, i32)>(), "tuple_size", ())
            .read::<usize>(),
        Some(2)
    );
}
