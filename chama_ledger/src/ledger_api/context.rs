use crate::db_types::{Member, Role};

/// Who is asking. Built once per request from the authenticated user id and the chama they are acting in, and then
/// passed explicitly to every ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    pub member_id: i64,
    pub chama_id: i64,
    pub role: Role,
}

impl RequestContext {
    pub fn for_member(member: &Member) -> Self {
        Self { user_id: member.user_id.clone(), member_id: member.id, chama_id: member.chama_id, role: member.role }
    }
}
