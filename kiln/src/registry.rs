use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::TypeExpr;

/// Handle of an interned [`QualifiedType`].
///
/// Keys are only meaningful for the registry that produced them. Their order is
/// the interning order, which keeps every map keyed by them deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u32);

impl TypeKey {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A type together with its optional qualifier and internal discriminator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedType {
    pub ty: TypeExpr,
    pub qualifier: Option<String>,
    /// Set only for multibinding contributions, so that each of them is a
    /// distinct node of the graph.
    pub discriminator: Option<u32>,
}

impl fmt::Display for QualifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "@{qualifier} ")?;
        }
        write!(f, "{}", self.ty)?;
        if let Some(discriminator) = self.discriminator {
            write!(f, "#{discriminator}")?;
        }
        Ok(())
    }
}

/// Session-owned interner of qualified types.
///
/// Interning structurally equal triples always yields the same key and the
/// same shared instance:
///
/// ```rust
/// use std::rc::Rc;
/// use kiln::{TypeExpr, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let a = registry.intern(&TypeExpr::named("Foo"), Some("Primary"), None);
/// let b = registry.intern(&TypeExpr::named("Foo"), Some("Primary"), None);
/// assert_eq!(a, b);
/// assert!(Rc::ptr_eq(&registry.get(a), &registry.get(b)));
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    inner: RefCell<Interner>,
}

#[derive(Default)]
struct Interner {
    keys: HashMap<Rc<QualifiedType>, TypeKey>,
    entries: Vec<Rc<QualifiedType>>,
    next_discriminator: u32,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(
        &self,
        ty: &TypeExpr,
        qualifier: Option<&str>,
        discriminator: Option<u32>,
    ) -> TypeKey {
        self.intern_qualified(QualifiedType {
            ty: ty.clone(),
            qualifier: qualifier.map(str::to_owned),
            discriminator,
        })
    }

    pub fn intern_qualified(&self, qualified: QualifiedType) -> TypeKey {
        let inner = &mut *self.inner.borrow_mut();
        if let Some(key) = inner.keys.get(&qualified) {
            return *key;
        }
        let key = TypeKey(inner.entries.len() as u32);
        let entry = Rc::new(qualified);
        inner.entries.push(entry.clone());
        inner.keys.insert(entry, key);
        key
    }

    /// Looks up an already interned triple without interning it.
    pub fn lookup(
        &self,
        ty: &TypeExpr,
        qualifier: Option<&str>,
        discriminator: Option<u32>,
    ) -> Option<TypeKey> {
        let qualified = QualifiedType {
            ty: ty.clone(),
            qualifier: qualifier.map(str::to_owned),
            discriminator,
        };
        self.inner.borrow().keys.get(&qualified).copied()
    }

    pub fn get(&self, key: TypeKey) -> Rc<QualifiedType> {
        self.inner.borrow().entries[key.index()].clone()
    }

    /// Interns `ty` under the qualifier of `key`, dropping its discriminator.
    pub fn requalify(&self, key: TypeKey, ty: &TypeExpr) -> TypeKey {
        let qualified = self.get(key);
        self.intern(ty, qualified.qualifier.as_deref(), None)
    }

    /// Allocates a fresh discriminator for a multibinding contribution.
    pub fn next_discriminator(&self) -> u32 {
        let mut inner = self.inner.borrow_mut();
        inner.next_discriminator += 1;
        inner.next_discriminator
    }

    pub fn display(&self, key: TypeKey) -> String {
        self.get(key).to_string()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
