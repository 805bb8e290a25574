use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Read-only view of the employee directory. This core never writes
/// employees; it only resolves "does this employee exist in this
/// organization and is it active".
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EmployeeRef {
    pub id: u64,
    pub organization_uuid: String,
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub department: Option<String>,
}

impl EmployeeRef {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}
