use std::{fmt::Display, str::FromStr};

use chama_common::{major_units, Cents};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

/// Implements `Display` and `FromStr` for the simple string-backed enums stored in the database.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $s),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("Invalid {}: {s}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Treasurer,
    Chairman,
    Admin,
}

string_enum!(Role { Member => "member", Treasurer => "treasurer", Chairman => "chairman", Admin => "admin" });

impl Role {
    /// Roles that may lock and unlock member withdrawals, and deactivate members.
    pub fn can_manage_locks(&self) -> bool {
        matches!(self, Role::Admin | Role::Chairman)
    }

    /// Roles that may approve loans and move money out of the central wallet.
    pub fn can_manage_loans(&self) -> bool {
        matches!(self, Role::Admin | Role::Chairman | Role::Treasurer)
    }
}

//--------------------------------------       Bucket        ---------------------------------------------------------
/// The balance buckets that the ledger moves money between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Savings,
    Mgr,
    Central,
    UserWallet,
}

string_enum!(Bucket {
    Savings => "savings",
    Mgr => "MGR wallet",
    Central => "central wallet",
    UserWallet => "user wallet",
});

//--------------------------------------       Chama         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Chama {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Member        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub chama_id: i64,
    pub user_id: String,
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(with = "major_units")]
    pub savings_balance: Cents,
    #[serde(with = "major_units")]
    pub mgr_balance: Cents,
    #[serde(with = "major_units")]
    pub total_contributed: Cents,
    pub withdrawal_locked: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("A chama member")
    }

    pub fn balances(&self) -> MemberBalances {
        MemberBalances {
            member_id: self.id,
            savings_balance: self.savings_balance,
            mgr_balance: self.mgr_balance,
            withdrawal_locked: self.withdrawal_locked,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub chama_id: i64,
    pub user_id: String,
    pub display_name: Option<String>,
    pub role: Role,
}

impl NewMember {
    pub fn new<S: Into<String>>(chama_id: i64, user_id: S, role: Role) -> Self {
        Self { chama_id, user_id: user_id.into(), display_name: None, role }
    }

    pub fn with_display_name<S: Into<String>>(mut self, name: S) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// A member's balances as reported back to callers after a wallet operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalances {
    pub member_id: i64,
    #[serde(with = "major_units")]
    pub savings_balance: Cents,
    #[serde(with = "major_units")]
    pub mgr_balance: Cents,
    pub withdrawal_locked: bool,
}

//--------------------------------------   Wallets    ---------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CentralWallet {
    pub id: i64,
    pub chama_id: i64,
    #[serde(with = "major_units")]
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserWallet {
    pub id: i64,
    pub user_id: String,
    #[serde(with = "major_units")]
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   PaymentPurpose    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    /// Credits the member's savings and their contribution total.
    Contribution,
    /// Credits the chama's central wallet.
    Registration,
    /// Credits the chama's central wallet and reduces the outstanding loan.
    LoanRepayment,
    /// Credits the member's MGR wallet.
    WalletTopup,
    /// Credits the payer's personal wallet.
    Other,
}

string_enum!(PaymentPurpose {
    Contribution => "contribution",
    Registration => "registration",
    LoanRepayment => "loan_repayment",
    WalletTopup => "wallet_topup",
    Other => "other",
});

impl PaymentPurpose {
    pub fn credited_bucket(&self) -> Bucket {
        match self {
            PaymentPurpose::Contribution => Bucket::Savings,
            PaymentPurpose::WalletTopup => Bucket::Mgr,
            PaymentPurpose::LoanRepayment | PaymentPurpose::Registration => Bucket::Central,
            PaymentPurpose::Other => Bucket::UserWallet,
        }
    }
}

//--------------------------------------   PaymentStatus    ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

string_enum!(PaymentStatus { Pending => "pending", Success => "success", Failed => "failed" });

impl PaymentStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

//--------------------------------------  PaymentTransaction  --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub reference: String,
    pub user_id: String,
    pub email: String,
    pub chama_id: Option<i64>,
    pub member_id: Option<i64>,
    pub loan_id: Option<i64>,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub purpose: PaymentPurpose,
    pub status: PaymentStatus,
    pub access_code: Option<String>,
    pub authorization_url: Option<String>,
    pub gateway_response: Option<String>,
    #[serde(with = "major_units::option")]
    pub fee: Option<Cents>,
    #[serde(with = "major_units::option")]
    pub net_amount: Option<Cents>,
    #[serde(skip_serializing)]
    pub callback_payload: Option<String>,
    pub metadata: Json<Value>,
    pub paid_at: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub reference: String,
    pub user_id: String,
    pub email: String,
    pub chama_id: Option<i64>,
    pub member_id: Option<i64>,
    pub loan_id: Option<i64>,
    pub amount: Cents,
    pub purpose: PaymentPurpose,
    pub metadata: Value,
}

//--------------------------------------      Payouts       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    Mpesa,
    Airtel,
    Bank,
    /// Credited straight to the member's personal wallet. Never leaves the system.
    Internal,
}

string_enum!(PayoutMethod { Mpesa => "mpesa", Airtel => "airtel", Bank => "bank", Internal => "internal" });

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

impl PayoutDetails {
    pub fn phone<S: Into<String>>(phone_number: S) -> Self {
        Self { phone_number: Some(phone_number.into()), ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Completed,
    Failed,
}

string_enum!(PayoutStatus { Pending => "pending", Completed => "completed", Failed => "failed" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payout {
    pub id: i64,
    pub reference: String,
    pub member_id: i64,
    pub chama_id: i64,
    pub user_id: String,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub method: PayoutMethod,
    pub details: Json<PayoutDetails>,
    pub status: PayoutStatus,
    pub transfer_code: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Loans        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Active,
    Completed,
    Rejected,
}

string_enum!(LoanStatus {
    Pending => "pending",
    Approved => "approved",
    Active => "active",
    Completed => "completed",
    Rejected => "rejected",
});

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub chama_id: i64,
    pub borrower_member_id: i64,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub status: LoanStatus,
    pub disbursement_status: bool,
    #[serde(with = "major_units")]
    pub amount_repaid: Cents,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub funds_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn outstanding(&self) -> Cents {
        self.amount - self.amount_repaid
    }
}

#[derive(Debug, Clone)]
pub struct NewLoan {
    pub chama_id: i64,
    pub borrower_member_id: i64,
    pub amount: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LoanDisbursement {
    pub id: i64,
    pub loan_id: i64,
    pub chama_id: i64,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub destination: String,
    pub disbursed_by: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   Contributions    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Contribution {
    pub id: i64,
    pub chama_id: i64,
    pub member_id: i64,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub payment_method: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   Platform fees    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PlatformFee {
    pub id: i64,
    pub payment_id: i64,
    pub chama_id: Option<i64>,
    #[serde(with = "major_units")]
    pub gross_amount: Cents,
    #[serde(with = "major_units")]
    pub fee_amount: Cents,
    pub fee_bps: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     Audit log      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub chama_id: Option<i64>,
    pub actor_member_id: Option<i64>,
    pub action: String,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub target_member_id: Option<i64>,
    pub details: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub chama_id: Option<i64>,
    pub actor_member_id: Option<i64>,
    pub action: String,
    pub amount: Cents,
    pub target_member_id: Option<i64>,
    pub details: Value,
}

impl NewAuditEntry {
    pub fn new<S: Into<String>>(action: S, amount: Cents) -> Self {
        Self {
            chama_id: None,
            actor_member_id: None,
            action: action.into(),
            amount,
            target_member_id: None,
            details: Value::Object(Default::default()),
        }
    }

    pub fn by(mut self, member: &Member) -> Self {
        self.chama_id = Some(member.chama_id);
        self.actor_member_id = Some(member.id);
        self
    }

    pub fn in_chama(mut self, chama_id: Option<i64>) -> Self {
        self.chama_id = chama_id;
        self
    }

    pub fn actor(mut self, member_id: Option<i64>) -> Self {
        self.actor_member_id = member_id;
        self
    }

    pub fn target(mut self, member_id: i64) -> Self {
        self.target_member_id = Some(member_id);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

//--------------------------------------   Notifications    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub chama_id: Option<i64>,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub metadata: Json<Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub chama_id: Option<i64>,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub metadata: Value,
}

impl NewNotification {
    pub fn for_member<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        member: &Member,
        notification_type: S1,
        title: S2,
        message: S3,
    ) -> Self {
        Self {
            user_id: member.user_id.clone(),
            chama_id: Some(member.chama_id),
            notification_type: notification_type.into(),
            title: title.into(),
            message: message.into(),
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
