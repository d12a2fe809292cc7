use crate::{
    db_types::{Chama, Loan, Member, NewLoan, NewMember},
    traits::LedgerError,
};

/// Setting up chamas, their members and loan applications. Membership workflows (invitations, approvals) live
/// outside the ledger; these methods are what those workflows call once a decision has been made.
#[allow(async_fn_in_trait)]
pub trait ChamaManagement: Clone {
    /// Creates a chama together with its (empty) central wallet.
    async fn create_chama(&self, name: &str) -> Result<Chama, LedgerError>;

    async fn add_member(&self, member: NewMember) -> Result<Member, LedgerError>;

    /// Records a loan application in `pending` state.
    async fn create_loan(&self, loan: NewLoan) -> Result<Loan, LedgerError>;
}
