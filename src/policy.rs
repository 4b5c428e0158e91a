//! Access policies: per-operation predicates over the acting principal.
//!
//! The engine only resolves policies; the transport layer is expected to call
//! [`PolicyGate::authorize`] before delegating to the CRUD service.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// The acting principal, as established by an authentication collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [Operation::Create, Operation::Read, Operation::Update, Operation::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type PolicyFn = dyn Fn(Option<&Principal>) -> bool + Send + Sync;

/// Predicate gating one operation. Deserializes from `"public"`, `"authenticated"` or `{"role": "..."}`.
#[derive(Clone, Default, Deserialize)]
#[serde(try_from = "PolicySpec")]
pub enum Policy {
    /// No restriction.
    #[default]
    Public,
    /// A principal must be present.
    Authenticated,
    /// A principal with this role must be present.
    Role(String),
    Custom(Arc<PolicyFn>),
}

impl Policy {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Principal>) -> bool + Send + Sync + 'static,
    {
        Policy::Custom(Arc::new(f))
    }

    pub fn allows(&self, principal: Option<&Principal>) -> bool {
        match self {
            Policy::Public => true,
            Policy::Authenticated => principal.is_some(),
            Policy::Role(role) => principal
                .and_then(|p| p.role.as_deref())
                .map(|r| r == role)
                .unwrap_or(false),
            Policy::Custom(f) => f(principal),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Policy::Public => "public".into(),
            Policy::Authenticated => "authenticated".into(),
            Policy::Role(role) => format!("role:{}", role),
            Policy::Custom(_) => "custom".into(),
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Policy({})", self.label())
    }
}

impl Serialize for Policy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicySpec {
    Named(String),
    Role { role: String },
}

impl TryFrom<PolicySpec> for Policy {
    type Error = String;

    fn try_from(spec: PolicySpec) -> Result<Self, Self::Error> {
        match spec {
            PolicySpec::Named(name) => match name.to_lowercase().as_str() {
                "public" | "none" => Ok(Policy::Public),
                "authenticated" => Ok(Policy::Authenticated),
                other => match other.strip_prefix("role:") {
                    Some(role) if !role.is_empty() => Ok(Policy::Role(role.to_string())),
                    _ => Err(format!(
                        "unknown policy '{}' (expected public, authenticated or role:<name>)",
                        name
                    )),
                },
            },
            PolicySpec::Role { role } => Ok(Policy::Role(role)),
        }
    }
}

/// Resolved policies for the four operations of one entity.
#[derive(Clone, Debug, Default, Serialize)]
pub struct EntityPolicies {
    pub create: Policy,
    pub read: Policy,
    pub update: Policy,
    pub delete: Policy,
}

impl EntityPolicies {
    pub fn get(&self, operation: Operation) -> &Policy {
        match operation {
            Operation::Create => &self.create,
            Operation::Read => &self.read,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        }
    }

    pub fn set(&mut self, operation: Operation, policy: Policy) {
        match operation {
            Operation::Create => self.create = policy,
            Operation::Read => self.read = policy,
            Operation::Update => self.update = policy,
            Operation::Delete => self.delete = policy,
        }
    }
}

pub struct PolicyGate;

impl PolicyGate {
    pub fn can_perform(operation: Operation, entity: &ResolvedEntity, principal: Option<&Principal>) -> bool {
        entity.definition.policies.get(operation).allows(principal)
    }

    /// Like [`PolicyGate::can_perform`] but yields `PolicyDenied` for the caller to propagate.
    pub fn authorize(
        operation: Operation,
        entity: &ResolvedEntity,
        principal: Option<&Principal>,
    ) -> Result<(), AppError> {
        if Self::can_perform(operation, entity, principal) {
            return Ok(());
        }
        tracing::debug!(
            entity = %entity.definition.slug,
            operation = %operation,
            principal = ?principal.map(|p| p.id.as_str()),
            "policy denied"
        );
        Err(AppError::PolicyDenied {
            operation: operation.to_string(),
            entity: entity.definition.slug.clone(),
        })
    }
}
