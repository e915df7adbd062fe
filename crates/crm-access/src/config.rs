//! Access-core configuration.

/// Configuration for tenant resolution, scoping and the permission gate.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Super-admins pass every permission gate check (default: true).
    pub super_admin_bypasses_gate: bool,
    /// Super-admins may read and mutate records owned by other teams
    /// (default: false).
    pub super_admin_bypasses_scope: bool,
    /// Optional pepper prepended to passwords before Argon2id verification.
    /// Must match the pepper the user repository hashes with.
    pub pepper: Option<String>,
    /// Minimum password length enforced at registration.
    pub min_password_length: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            super_admin_bypasses_gate: true,
            super_admin_bypasses_scope: false,
            pepper: None,
            min_password_length: 12,
        }
    }
}
