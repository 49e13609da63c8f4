//! User service implementation
//!
//! This service handles client and employee registration, account visibility
//! per caller role, profile management, password changes and the optional
//! bootstrap superuser.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::BootstrapAdminConfig;
use crate::database::repositories::UserRepository;
use crate::models::pagination::{Page, PageRequest};
use crate::models::user::{
    AccountInput, ChangePasswordRequest, CreateUserRequest, Role, UpdateUserRequest, User, UserScope,
};
use crate::services::auth::{hash_password, verify_password, Principal};
use crate::translation::coerce::{NOT_BLANK, REQUIRED};
use crate::translation::WriteMode;
use crate::utils::errors::{FieldErrors, MenuError, Result};
use crate::utils::helpers::is_valid_email;
use crate::utils::logging::log_user_action;

const PASSWORD_MISMATCH: &str = "Las contraseñas no coinciden.";

/// Accounts the caller may see on the users listing
///
/// Staff see every account, employees see clients and themselves.
pub fn visibility_scope(principal: &Principal) -> Result<UserScope> {
    if principal.is_staff {
        Ok(UserScope::All)
    } else if principal.is_employee() {
        Ok(UserScope::RoleOrSelf(Role::Client, principal.user_id))
    } else {
        Err(MenuError::PermissionDenied("Not authorized.".to_string()))
    }
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"))
}

fn check_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    required: bool,
    max_len: usize,
) {
    match value {
        None if required => errors.add(field, REQUIRED),
        None => {}
        Some(value) if required && value.trim().is_empty() => errors.add(field, NOT_BLANK),
        Some(value) if value.chars().count() > max_len => errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        ),
        Some(_) => {}
    }
}

/// Field checks for account input; uniqueness is checked separately
pub fn validate_account(input: &AccountInput, mode: WriteMode) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let full = matches!(mode, WriteMode::Create | WriteMode::Replace);

    check_text(&mut errors, "username", input.username.as_deref(), full, 50);
    if let Some(username) = input.username.as_deref().filter(|value| !value.trim().is_empty()) {
        if !username_pattern().is_match(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
    }

    check_text(&mut errors, "name", input.name.as_deref(), full, 100);

    check_text(&mut errors, "email", input.email.as_deref(), full, 254);
    if let Some(email) = input.email.as_deref().filter(|value| !value.trim().is_empty()) {
        if !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }
    }

    check_text(
        &mut errors,
        "password",
        input.password.as_deref(),
        mode == WriteMode::Create,
        128,
    );

    check_text(&mut errors, "address", input.address.as_deref(), false, 250);
    check_text(&mut errors, "location", input.location.as_deref(), false, 250);
    check_text(&mut errors, "province", input.province.as_deref(), false, 100);
    check_text(&mut errors, "phone", input.phone.as_deref(), false, 20);

    errors
}

/// Confirmation must match before the old password is even checked
pub fn check_password_confirmation(request: &ChangePasswordRequest) -> Result<()> {
    if request.new_password != request.new_password_confirm {
        return Err(MenuError::field("non_field_errors", PASSWORD_MISMATCH));
    }
    if request.new_password.trim().is_empty() {
        return Err(MenuError::field("new_password", NOT_BLANK));
    }
    Ok(())
}

/// User service for managing accounts
#[derive(Clone, Debug)]
pub struct UserService {
    user_repository: UserRepository,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(user_repository: UserRepository) -> Self {
        Self { user_repository }
    }

    /// Register a new account with the given role
    pub async fn register(&self, input: AccountInput, role: Role) -> Result<User> {
        debug!(role = %role, "Registering account");

        let mut errors = validate_account(&input, WriteMode::Create);
        self.check_identity(&input, None, &mut errors).await?;
        errors.into_result()?;

        let password = input.password.unwrap_or_default();
        let request = CreateUserRequest {
            username: input.username.unwrap_or_default(),
            name: input.name.unwrap_or_default(),
            email: input.email.unwrap_or_default(),
            password_hash: hash_password(&password),
            role,
            is_staff: false,
            image: input.image,
            address: input.address,
            location: input.location,
            province: input.province,
            phone: input.phone,
        };

        let user = self.user_repository.create(request).await?;
        info!(user_id = user.id, username = %user.username, role = %role, "Account registered");
        Ok(user)
    }

    pub async fn list(&self, scope: UserScope, page: PageRequest) -> Result<Page<User>> {
        let count = self.user_repository.count(scope).await?;
        let users = self
            .user_repository
            .list(scope, page.limit(), page.offset())
            .await?;
        Ok(Page::new(count, users))
    }

    /// Account by id, if visible in `scope`
    pub async fn get(&self, scope: UserScope, id: i64) -> Result<User> {
        self.user_repository
            .find_in_scope(id, scope)
            .await?
            .ok_or(MenuError::NotFound { resource: "User", id })
    }

    /// Update an account visible in `scope`; a supplied password is re-hashed
    pub async fn update(&self, scope: UserScope, id: i64, input: AccountInput, mode: WriteMode) -> Result<User> {
        self.get(scope, id).await?;

        let mut errors = validate_account(&input, mode);
        self.check_identity(&input, Some(id), &mut errors).await?;
        errors.into_result()?;

        if let Some(password) = input.password.as_deref() {
            self.user_repository.set_password(id, &hash_password(password)).await?;
        }

        let user = self.user_repository.update(id, profile_changes(input)).await?;
        log_user_action(id, "account_updated", None);
        Ok(user)
    }

    pub async fn delete(&self, scope: UserScope, id: i64) -> Result<()> {
        self.get(scope, id).await?;
        if !self.user_repository.delete(id).await? {
            return Err(MenuError::NotFound { resource: "User", id });
        }
        info!(user_id = id, "Account deleted");
        Ok(())
    }

    /// The caller's own account
    pub async fn me(&self, principal: &Principal) -> Result<User> {
        self.get(UserScope::All, principal.user_id).await
    }

    /// Partial profile update of the caller's own account; passwords go through `change_password`
    pub async fn update_me(&self, principal: &Principal, mut input: AccountInput) -> Result<User> {
        input.password = None;
        self.update(UserScope::All, principal.user_id, input, WriteMode::Patch).await
    }

    pub async fn change_password(&self, principal: &Principal, request: ChangePasswordRequest) -> Result<()> {
        check_password_confirmation(&request)?;

        let user = self.me(principal).await?;
        if !verify_password(&request.old_password, &user.password_hash) {
            return Err(MenuError::field("old_password", "Current password is incorrect."));
        }

        self.user_repository
            .set_password(user.id, &hash_password(&request.new_password))
            .await?;
        log_user_action(user.id, "password_changed", None);
        Ok(())
    }

    /// Create the configured superuser unless the username exists; returns whether it was created
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdminConfig) -> Result<bool> {
        if self.user_repository.find_by_username(&admin.username).await?.is_some() {
            debug!(username = %admin.username, "Bootstrap admin already exists");
            return Ok(false);
        }

        let request = CreateUserRequest {
            username: admin.username.clone(),
            name: admin.name.clone(),
            email: admin.email.clone(),
            password_hash: hash_password(&admin.password),
            role: Role::Boss,
            is_staff: true,
            image: None,
            address: None,
            location: None,
            province: None,
            phone: None,
        };
        let user = self.user_repository.create(request).await?;
        info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
        Ok(true)
    }

    async fn check_identity(
        &self,
        input: &AccountInput,
        exclude_id: Option<i64>,
        errors: &mut FieldErrors,
    ) -> Result<()> {
        if input.username.is_none() && input.email.is_none() {
            return Ok(());
        }

        let (username_taken, email_taken) = self
            .user_repository
            .identity_taken(input.username.as_deref(), input.email.as_deref(), exclude_id)
            .await?;
        if username_taken {
            errors.add("username", "A user with that username already exists.");
        }
        if email_taken {
            errors.add("email", "user with this email already exists.");
        }
        Ok(())
    }
}

fn profile_changes(input: AccountInput) -> UpdateUserRequest {
    UpdateUserRequest {
        username: input.username,
        name: input.name,
        email: input.email,
        image: input.image,
        address: input.address,
        location: input.location,
        province: input.province,
        phone: input.phone,
    }
}
