use serde::{Deserialize, Serialize};

use crate::types::Permission;

/// Result of checking every required permission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatus {
    pub granted: bool,
    pub missing_permissions: Vec<Permission>,
    pub granted_permissions: Vec<Permission>,
    pub partially_granted: bool,
}

impl PermissionStatus {
    /// Everything in `required` counted as denied
    pub fn all_denied(required: &[Permission]) -> Self {
        Self {
            granted: required.is_empty(),
            missing_permissions: required.to_vec(),
            granted_permissions: Vec::new(),
            partially_granted: false,
        }
    }
}

/// Result of a permission request flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequestResult {
    pub success: bool,
    pub granted: Vec<Permission>,
    pub denied_permissions: Vec<Permission>,
    /// Permanently blocked; only a settings visit can grant these
    pub never_ask_again_permissions: Vec<Permission>,
    pub should_show_rationale: bool,
}

/// Explanatory dialog shown before the OS prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRationale {
    pub title: String,
    pub message: String,
    pub permissions: Vec<Permission>,
    pub accept_label: String,
    pub decline_label: String,
}
