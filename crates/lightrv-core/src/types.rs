//! The semantic type lattice.
//!
//! Source programs use `int`, `float` and `void`; `bool` is internal, produced
//! by comparisons and by casting a numeric value used as a truth value;
//! `label` types the jump targets of the intermediate representation. On top
//! of the base types sit one-dimensional arrays, function signatures and
//! pointers. Equality is structural throughout.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Base (scalar) types. All scalars occupy one 32-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Int,
    Float,
    Bool,
    Void,
    Label,
}

impl BaseType {
    /// Resolve a source-level type annotation. `bool` and `label` are
    /// internal and cannot be named in programs.
    pub fn from_name(name: &str) -> Option<BaseType> {
        match name {
            "int" => Some(BaseType::Int),
            "float" => Some(BaseType::Float),
            "void" => Some(BaseType::Void),
            _ => None,
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Int => write!(f, "int"),
            BaseType::Float => write!(f, "float"),
            BaseType::Bool => write!(f, "bool"),
            BaseType::Void => write!(f, "void"),
            BaseType::Label => write!(f, "label"),
        }
    }
}

/// A semantic type. Structural equality via `PartialEq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Base(BaseType),

    /// One-dimensional fixed-size array. A length of `-1` marks an array
    /// parameter whose size is unknown at the declaration site.
    Array { base: BaseType, len: i32 },

    /// Function signature: return base type plus parameter types.
    Func { ret: BaseType, params: Vec<Type> },

    /// Pointer to another type. Only the IR creates pointers; the source
    /// language has no pointer syntax.
    Pointer(Box<Type>),
}

pub const INT: Type = Type::Base(BaseType::Int);
pub const FLOAT: Type = Type::Base(BaseType::Float);
pub const BOOL: Type = Type::Base(BaseType::Bool);
pub const VOID: Type = Type::Base(BaseType::Void);
pub const LABEL: Type = Type::Base(BaseType::Label);

impl Type {
    pub fn pointer(inner: Type) -> Type {
        Type::Pointer(Box::new(inner))
    }

    /// Size in bytes: scalars and pointers are one word, arrays are
    /// `4 * len`, functions are never stored.
    pub fn size_in_bytes(&self) -> i32 {
        match self {
            Type::Base(_) => 4,
            Type::Array { len, .. } => 4 * len,
            Type::Func { .. } => 0,
            Type::Pointer(_) => 4,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self, Type::Base(_))
    }

    pub fn base(&self) -> Option<BaseType> {
        match self {
            Type::Base(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Base(BaseType::Float))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Base(BaseType::Int))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Base(BaseType::Void))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Type::Func { .. })
    }

    /// The pointed-to type, if this is a pointer.
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Base(b) => write!(f, "{}", b),
            Type::Array { base, len } => write!(f, "{}[{}]", base, len),
            Type::Func { ret, params } => {
                write!(f, "{}(", ret)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Type::Pointer(inner) => write!(f, "{}*", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scalar_and_pointer_sizes_are_one_word() {
        assert_eq!(INT.size_in_bytes(), 4);
        assert_eq!(FLOAT.size_in_bytes(), 4);
        assert_eq!(Type::pointer(INT).size_in_bytes(), 4);
        assert_eq!(Type::pointer(Type::Array { base: BaseType::Int, len: 3 }).size_in_bytes(), 4);
    }

    #[test]
    fn function_types_are_never_stored() {
        let f = Type::Func {
            ret: BaseType::Float,
            params: vec![INT, INT],
        };
        assert_eq!(f.size_in_bytes(), 0);
    }

    #[test]
    fn equality_is_structural() {
        let a = Type::Func {
            ret: BaseType::Int,
            params: vec![FLOAT],
        };
        let b = Type::Func {
            ret: BaseType::Int,
            params: vec![FLOAT],
        };
        assert_eq!(a, b);
        assert_ne!(a, Type::Func { ret: BaseType::Int, params: vec![INT] });
        assert_ne!(
            Type::Array { base: BaseType::Int, len: 2 },
            Type::Array { base: BaseType::Int, len: 3 }
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(format!("{}", INT), "int");
        assert_eq!(format!("{}", Type::Array { base: BaseType::Float, len: 8 }), "float[8]");
        assert_eq!(
            format!("{}", Type::Func { ret: BaseType::Void, params: vec![INT, FLOAT] }),
            "void(int, float)"
        );
        assert_eq!(format!("{}", Type::pointer(INT)), "int*");
    }

    #[test]
    fn source_type_names_resolve() {
        assert_eq!(BaseType::from_name("int"), Some(BaseType::Int));
        assert_eq!(BaseType::from_name("float"), Some(BaseType::Float));
        assert_eq!(BaseType::from_name("void"), Some(BaseType::Void));
        assert_eq!(BaseType::from_name("bool"), None);
        assert_eq!(BaseType::from_name("label"), None);
    }

    #[test]
    fn serde_roundtrip() {
        let ty = Type::Func {
            ret: BaseType::Float,
            params: vec![Type::Array { base: BaseType::Int, len: 4 }, Type::pointer(FLOAT)],
        };
        let json = serde_json::to_string(&ty).unwrap();
        let back: Type = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, back);
    }

    proptest! {
        #[test]
        fn array_size_is_four_times_length(len in 1i32..1024) {
            let arr = Type::Array { base: BaseType::Int, len };
            prop_assert_eq!(arr.size_in_bytes(), 4 * len);
        }

        #[test]
        fn clone_preserves_structural_equality(len in 1i32..64) {
            let ty = Type::Func {
                ret: BaseType::Int,
                params: vec![Type::Array { base: BaseType::Float, len }],
            };
            prop_assert_eq!(ty.clone(), ty);
        }
    }
}
