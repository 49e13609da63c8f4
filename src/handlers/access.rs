//! Per-resource operation table
//!
//! Every routed operation maps to the capability it requires, how its
//! body is validated and how its result is rendered. Handlers look their
//! operation up here instead of branching on who the caller is.

use crate::services::auth::{Capability, Principal};
use crate::translation::representation::OutputShape;
use crate::translation::validator::WriteMode;
use crate::utils::errors::{MenuError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Products, categories, ingredients and company
    Catalog,
    Promotions,
    ActivePromotions,
    Orders,
    Clients,
    Employees,
    UsersList,
    Profile,
    PasswordChange,
    Tokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Retrieve,
    Replace,
    PartialUpdate,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub capability: Capability,
    /// How the body is validated; `None` for operations without a body
    pub input: Option<WriteMode>,
    pub output: OutputShape,
}

impl OperationSpec {
    /// Write mode for operations that take a body
    pub fn write_mode(&self) -> WriteMode {
        self.input.unwrap_or(WriteMode::Patch)
    }
}

fn input_for(operation: Operation) -> Option<WriteMode> {
    match operation {
        Operation::Create => Some(WriteMode::Create),
        Operation::Replace => Some(WriteMode::Replace),
        Operation::PartialUpdate => Some(WriteMode::Patch),
        Operation::List | Operation::Retrieve | Operation::Destroy => None,
    }
}

fn capability_for(resource: Resource, operation: Operation) -> Capability {
    use Capability::*;
    use Operation::*;

    match (resource, operation) {
        (Resource::Catalog, List | Retrieve) => Public,
        (Resource::Catalog, _) => Authenticated,

        (Resource::ActivePromotions, _) => Public,
        (Resource::Promotions, _) => Staff,

        (Resource::Orders, PartialUpdate | Replace) => Staff,
        (Resource::Orders, _) => Authenticated,

        (Resource::Clients, Create) => Public,
        (Resource::Clients, List | Retrieve) => StaffOrEmployee,
        (Resource::Clients, _) => Staff,

        (Resource::Employees, List) => StaffOrEmployee,
        (Resource::Employees, _) => Staff,

        (Resource::UsersList, _) => StaffOrEmployee,

        (Resource::Profile, _) | (Resource::PasswordChange, _) => Authenticated,

        (Resource::Tokens, _) => Public,
    }
}

pub fn operation_spec(resource: Resource, operation: Operation) -> OperationSpec {
    let output = match (resource, operation) {
        (Resource::Catalog, Operation::List | Operation::Retrieve) => OutputShape::Nested,
        _ => OutputShape::Flat,
    };

    OperationSpec {
        capability: capability_for(resource, operation),
        input: input_for(operation),
        output,
    }
}

/// Look up the operation and check the caller against it
pub fn authorize(resource: Resource, operation: Operation, principal: Option<&Principal>) -> Result<OperationSpec> {
    let spec = operation_spec(resource, operation);
    spec.capability.check(principal)?;
    Ok(spec)
}

/// Like [`authorize`], for operations that act on behalf of the caller
pub fn authorize_caller<'a>(
    resource: Resource,
    operation: Operation,
    principal: Option<&'a Principal>,
) -> Result<(OperationSpec, &'a Principal)> {
    let spec = authorize(resource, operation, principal)?;
    let principal = principal.ok_or_else(|| {
        MenuError::Unauthorized("Authentication credentials were not provided.".to_string())
    })?;
    Ok((spec, principal))
}
