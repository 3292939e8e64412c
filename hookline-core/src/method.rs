use std::collections::HashMap;
use std::fmt;
use crate::error::HookResult;
use crate::resolution_error;
use crate::types::ValueKind;

/// Identifies one interceptable method on one declaring type.
/// Equality and hashing are structural over type, name and parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodId {
    pub declaring_type: String,
    pub name: String,
    pub params: Vec<String>,
}

impl MethodId {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params: params.iter().map(|it| it.to_string()).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.declaring_type, self.name, self.params.join(", "))
    }
}

/// A method the running host actually exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMethod {
    pub id: MethodId,
    pub returns: ValueKind,
}

/// Binds a [`MethodId`] to the host's surface.
pub trait MethodResolver: Send + Sync {
    fn resolve(&self, id: &MethodId) -> HookResult<ResolvedMethod>;
}

/// Resolver backed by a declared table of host methods.
#[derive(Debug, Default, Clone)]
pub struct MethodTable {
    methods: HashMap<MethodId, ValueKind>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, id: MethodId, returns: ValueKind) -> &mut Self {
        self.methods.insert(id, returns);
        self
    }

    pub fn with(mut self, id: MethodId, returns: ValueKind) -> Self {
        self.declare(id, returns);
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl MethodResolver for MethodTable {
    fn resolve(&self, id: &MethodId) -> HookResult<ResolvedMethod> {
        if let Some(returns) = self.methods.get(id) {
            return Ok(ResolvedMethod { id: id.clone(), returns: *returns });
        }

        let mut same_type = self.methods.keys()
            .filter(|it| it.declaring_type == id.declaring_type)
            .peekable();
        if same_type.peek().is_none() {
            return resolution_error!(id, "type '{}' is not exposed by the host", id.declaring_type);
        }

        let overloads = same_type
            .filter(|it| it.name == id.name)
            .map(|it| format!("({})", it.params.join(", ")))
            .collect::<Vec<_>>();
        if overloads.is_empty() {
            resolution_error!(id, "'{}' declares no method named '{}'", id.declaring_type, id.name)
        } else {
            resolution_error!(id, "no overload matches; available: {}", overloads.join(" "))
        }
    }
}
