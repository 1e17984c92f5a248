//! # Field References
//!
//! Static fields are named the way bytecode names them: a declaring class
//! descriptor, a field name and a type descriptor (`LFoo;.bar:I`).

use std::fmt;
use std::sync::Arc;

/// A reference to a static field
///
/// Cloning is cheap: the strings are shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    class: Arc<str>,
    name: Arc<str>,
    ty: Arc<str>,
}

impl FieldRef {
    /// Creates a field reference from its class descriptor, name and type
    /// descriptor
    pub fn new(class: &str, name: &str, ty: &str) -> Self {
        Self {
            class: Arc::from(class),
            name: Arc::from(name),
            ty: Arc::from(ty),
        }
    }

    /// Descriptor of the declaring class, e.g. `LFoo;`
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type descriptor, e.g. `I` or `Ljava/lang/String;`
    pub fn type_descriptor(&self) -> &str {
        &self.ty
    }

    /// Returns true for primitive types (anything but classes and arrays)
    pub fn is_primitive(&self) -> bool {
        !matches!(self.ty.as_bytes().first(), Some(b'L' | b'['))
    }

    /// Returns true for `long` and `double` fields
    pub fn is_wide(&self) -> bool {
        matches!(&*self.ty, "J" | "D")
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.class, self.name, self.ty)
    }
}
