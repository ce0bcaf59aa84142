//! The native type lattice (spec §3): a closed set of types plus `Unknown`
//! as the top element. `join` implements the lattice's least-upper-bound
//! operation used by the type inferrer (§4.5) whenever two branches of
//! control flow disagree on a value's type.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    Unknown,
    Int,
    Float,
    Bool,
    String,
    Bigint,
    List(Box<NativeType>),
    Tuple(Vec<NativeType>),
    Set(Box<NativeType>),
    Dict(Box<NativeType>, Box<NativeType>),
    Deque(Box<NativeType>),
    Counter(Box<NativeType>),
    StringIo,
    BytesIo,
    File,
    HashObject,
    SqliteConnection,
    SqliteCursor,
    ClassInstance(String),
    Function,
    None,
}

impl NativeType {
    /// Least upper bound of two types in the lattice. Any mismatch that
    /// isn't a direct equality or a structural widening falls back to
    /// `Unknown`, the lattice's top element.
    pub fn join(&self, other: &NativeType) -> NativeType {
        use NativeType::*;
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Unknown, _) | (_, Unknown) => Unknown,
            (Int, Float) | (Float, Int) => Float,
            (Int, Bigint) | (Bigint, Int) => Bigint,
            (Bool, Int) | (Int, Bool) => Int,
            (List(a), List(b)) => List(Box::new(a.join(b))),
            (Set(a), Set(b)) => Set(Box::new(a.join(b))),
            (Deque(a), Deque(b)) => Deque(Box::new(a.join(b))),
            (Counter(a), Counter(b)) => Counter(Box::new(a.join(b))),
            (Dict(k1, v1), Dict(k2, v2)) => Dict(Box::new(k1.join(k2)), Box::new(v1.join(v2))),
            (Tuple(a), Tuple(b)) if a.len() == b.len() => {
                Tuple(a.iter().zip(b).map(|(x, y)| x.join(y)).collect())
            }
            _ => Unknown,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            NativeType::Int | NativeType::Float | NativeType::Bool | NativeType::Bigint
        )
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, NativeType::Unknown)
    }

    /// Containers the mutation analyzer (§4.4) treats as reference types:
    /// mutating methods on these require `&mut` at the call site even
    /// though the binding itself may be immutable in its own scope.
    pub fn is_mutable_container(&self) -> bool {
        matches!(
            self,
            NativeType::List(_)
                | NativeType::Dict(_, _)
                | NativeType::Set(_)
                | NativeType::Deque(_)
                | NativeType::Counter(_)
                | NativeType::ClassInstance(_)
        )
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Unknown => write!(f, "unknown"),
            NativeType::Int => write!(f, "int"),
            NativeType::Float => write!(f, "float"),
            NativeType::Bool => write!(f, "bool"),
            NativeType::String => write!(f, "string"),
            NativeType::Bigint => write!(f, "bigint"),
            NativeType::List(t) => write!(f, "list[{t}]"),
            NativeType::Tuple(ts) => {
                write!(f, "tuple[")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "]")
            }
            NativeType::Set(t) => write!(f, "set[{t}]"),
            NativeType::Dict(k, v) => write!(f, "dict[{k}, {v}]"),
            NativeType::Deque(t) => write!(f, "deque[{t}]"),
            NativeType::Counter(t) => write!(f, "counter[{t}]"),
            NativeType::StringIo => write!(f, "stringio"),
            NativeType::BytesIo => write!(f, "bytesio"),
            NativeType::File => write!(f, "file"),
            NativeType::HashObject => write!(f, "hash_object"),
            NativeType::SqliteConnection => write!(f, "sqlite_connection"),
            NativeType::SqliteCursor => write!(f, "sqlite_cursor"),
            NativeType::ClassInstance(name) => write!(f, "class_instance({name})"),
            NativeType::Function => write!(f, "function"),
            NativeType::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_reflexive() {
        assert_eq!(NativeType::Int.join(&NativeType::Int), NativeType::Int);
    }

    #[test]
    fn join_widens_int_and_float_to_float() {
        assert_eq!(NativeType::Int.join(&NativeType::Float), NativeType::Float);
    }

    #[test]
    fn join_falls_back_to_unknown_on_incompatible_types() {
        assert_eq!(
            NativeType::String.join(&NativeType::Int),
            NativeType::Unknown
        );
    }

    #[test]
    fn join_is_structural_for_containers() {
        let a = NativeType::List(Box::new(NativeType::Int));
        let b = NativeType::List(Box::new(NativeType::Float));
        assert_eq!(a.join(&b), NativeType::List(Box::new(NativeType::Float)));
    }

    #[test]
    fn bool_widens_to_int() {
        assert_eq!(NativeType::Bool.join(&NativeType::Int), NativeType::Int);
    }
}
