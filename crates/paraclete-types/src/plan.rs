//! Financial plan request types.

use serde::{Deserialize, Serialize};

/// Profile fields submitted to `/generate_plan`.
///
/// Purely pass-through input: the fields are templated into the plan
/// document and the narrative prompt. `session_id` only names the
/// generated download; plan generation itself is stateless and never
/// touches the session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub session_id: String,
    pub name: String,
    pub age: u32,
    pub marital_status: String,
    pub income: f64,
    pub investment_preference: String,
    pub retirement_age: u32,
}
