use serde::Serialize;

use crate::observability::AuditFault;

/// An operation's value together with any failure to audit it.
///
/// The operation has taken effect either way; `audit_fault` only reports
/// that its audit entry was not recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Audited<T> {
    pub value: T,
    #[serde(skip)]
    pub audit_fault: Option<AuditFault>,
}

impl<T> Audited<T> {
    pub fn new(value: T, audit_fault: Option<AuditFault>) -> Self {
        Self { value, audit_fault }
    }

    pub fn is_clean(&self) -> bool {
        self.audit_fault.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
