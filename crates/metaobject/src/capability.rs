//! Structural capability detection
//!
//! A container's role is derived from the set of operations it supports,
//! not declared. The rule table is ordered most specific first, so a type
//! satisfying several shapes gets the narrowest role.

use bitflags::bitflags;

bitflags! {
    /// Operations a type structurally supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Can be iterated front to back
        const ITERABLE      = 1 << 0;
        /// Knows its element count
        const SIZED         = 1 << 1;
        /// Indexing by position
        const RANDOM_ACCESS = 1 << 2;
        /// Elements live in one contiguous block
        const CONTIGUOUS    = 1 << 3;
        /// Extent fixed by the type
        const FIXED_EXTENT  = 1 << 4;
        /// `push_back`
        const PUSH_BACK     = 1 << 5;
        /// `pop_back`
        const POP_BACK      = 1 << 6;
        /// `push_front`
        const PUSH_FRONT    = 1 << 7;
        /// `pop_front`
        const POP_FRONT     = 1 << 8;
        /// Iterable in both directions
        const BIDIRECTIONAL = 1 << 9;
        /// Has a key type and lookup by key
        const ASSOCIATIVE   = 1 << 10;
        /// Has a mapped (value) type
        const MAPPED        = 1 << 11;
        /// Keys kept in comparison order
        const ORDERED       = 1 << 12;
        /// Keys bucketed by hash
        const HASHED        = 1 << 13;
        /// Duplicate keys allowed
        const MULTI         = 1 << 14;
        /// Adapter `push`
        const PUSH          = 1 << 15;
        /// Adapter `pop`
        const POP           = 1 << 16;
        /// Adapter `top`
        const TOP           = 1 << 17;
        /// Adapter `front`
        const FRONT         = 1 << 18;
        /// Adapter `back`
        const BACK          = 1 << 19;
        /// `first` / `second`
        const PAIR          = 1 << 20;
        /// Positional `get`
        const TUPLE         = 1 << 21;
        /// Tagged alternatives (`index`, `holds_alternative`)
        const VARIANT       = 1 << 22;
        /// `has_value` / `value`
        const OPTIONAL      = 1 << 23;
        /// Dereference
        const DEREF         = 1 << 24;
        /// Advance
        const INCREMENT     = 1 << 25;
        /// Resizable capacity (`reserve`, `capacity`)
        const RESERVE       = 1 << 26;
    }
}

/// Generic-container role of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContainerKind {
    /// Not container-shaped
    #[default]
    None,
    /// Fixed-extent contiguous array
    Array,
    /// Growable contiguous array
    Vector,
    /// Double-ended queue with random access
    Deque,
    /// Singly linked list
    ForwardList,
    /// Doubly linked list
    List,
    /// Ordered unique keys
    Set,
    /// Ordered keys with duplicates
    MultiSet,
    /// Ordered key/value
    Map,
    /// Ordered key/value with duplicate keys
    MultiMap,
    /// Hashed unique keys
    UnorderedSet,
    /// Hashed keys with duplicates
    UnorderedMultiSet,
    /// Hashed key/value
    UnorderedMap,
    /// Hashed key/value with duplicate keys
    UnorderedMultiMap,
    /// LIFO adapter
    Stack,
    /// FIFO adapter
    Queue,
    /// Heap-ordered adapter
    PriorityQueue,
    /// Two named members
    Pair,
    /// Positional members
    Tuple,
    /// Non-owning contiguous view
    Span,
    /// Tagged union of alternatives
    SumType,
    /// Zero or one value
    Optional,
    /// Cursor over another container
    Iterator,
}

use Capabilities as C;

/// Classification rules, most specific first
const RULES: &[(ContainerKind, Capabilities)] = &[
    (ContainerKind::Optional, C::OPTIONAL),
    (ContainerKind::SumType, C::VARIANT),
    (ContainerKind::Pair, C::PAIR),
    (ContainerKind::Tuple, C::TUPLE),
    (
        ContainerKind::UnorderedMultiMap,
        C::ASSOCIATIVE.union(C::MAPPED).union(C::HASHED).union(C::MULTI),
    ),
    (
        ContainerKind::UnorderedMap,
        C::ASSOCIATIVE.union(C::MAPPED).union(C::HASHED),
    ),
    (
        ContainerKind::MultiMap,
        C::ASSOCIATIVE.union(C::MAPPED).union(C::MULTI),
    ),
    (ContainerKind::Map, C::ASSOCIATIVE.union(C::MAPPED)),
    (
        ContainerKind::UnorderedMultiSet,
        C::ASSOCIATIVE.union(C::HASHED).union(C::MULTI),
    ),
    (ContainerKind::UnorderedSet, C::ASSOCIATIVE.union(C::HASHED)),
    (ContainerKind::MultiSet, C::ASSOCIATIVE.union(C::MULTI)),
    (ContainerKind::Set, C::ASSOCIATIVE),
    (
        ContainerKind::Vector,
        C::ITERABLE
            .union(C::RANDOM_ACCESS)
            .union(C::CONTIGUOUS)
            .union(C::PUSH_BACK),
    ),
    (
        ContainerKind::Deque,
        C::ITERABLE
            .union(C::RANDOM_ACCESS)
            .union(C::PUSH_BACK)
            .union(C::PUSH_FRONT),
    ),
    (
        ContainerKind::Array,
        C::ITERABLE
            .union(C::RANDOM_ACCESS)
            .union(C::CONTIGUOUS)
            .union(C::FIXED_EXTENT),
    ),
    (
        ContainerKind::Span,
        C::ITERABLE.union(C::RANDOM_ACCESS).union(C::CONTIGUOUS),
    ),
    (
        ContainerKind::List,
        C::ITERABLE
            .union(C::BIDIRECTIONAL)
            .union(C::PUSH_BACK)
            .union(C::PUSH_FRONT),
    ),
    (ContainerKind::ForwardList, C::ITERABLE.union(C::PUSH_FRONT)),
    (
        ContainerKind::PriorityQueue,
        C::PUSH.union(C::POP).union(C::TOP).union(C::ORDERED),
    ),
    (ContainerKind::Stack, C::PUSH.union(C::POP).union(C::TOP)),
    (
        ContainerKind::Queue,
        C::PUSH.union(C::POP).union(C::FRONT).union(C::BACK),
    ),
    (ContainerKind::Iterator, C::DEREF.union(C::INCREMENT)),
];

impl ContainerKind {
    /// Classify a capability set; the first matching rule wins
    pub fn classify(caps: Capabilities) -> ContainerKind {
        RULES
            .iter()
            .find(|(_, required)| caps.contains(*required))
            .map(|(kind, _)| *kind)
            .unwrap_or(ContainerKind::None)
    }

    /// Check if this is a positional sequence
    pub fn is_sequence(self) -> bool {
        matches!(
            self,
            ContainerKind::Array
                | ContainerKind::Vector
                | ContainerKind::Deque
                | ContainerKind::ForwardList
                | ContainerKind::List
                | ContainerKind::Span
        )
    }

    /// Check if this is keyed
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            ContainerKind::Set
                | ContainerKind::MultiSet
                | ContainerKind::Map
                | ContainerKind::MultiMap
                | ContainerKind::UnorderedSet
                | ContainerKind::UnorderedMultiSet
                | ContainerKind::UnorderedMap
                | ContainerKind::UnorderedMultiMap
        )
    }

    /// Check if this is a container adapter
    pub fn is_adapter(self) -> bool {
        matches!(
            self,
            ContainerKind::Stack | ContainerKind::Queue | ContainerKind::PriorityQueue
        )
    }
}

crate::reflect_type!(enum ContainerKind);
crate::reflect_type!(Capabilities);
