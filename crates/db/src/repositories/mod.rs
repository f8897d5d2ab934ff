//! Repository abstractions for data access.
//!
//! Repositories own a `DatabaseConnection` clone and share one
//! [`LedgerLocks`](crate::locks::LedgerLocks) registry. The crate-private
//! helpers take any `ConnectionTrait` so a single database transaction can
//! span several of them.

pub mod check;
pub mod checkbook;
pub mod company;
pub mod history;
pub mod ledger;
pub mod reconciliation;
pub mod voucher;

pub use check::{CheckOutcome, CheckRepository, StatusExtra};
pub use checkbook::{CheckbookRepository, CreateCheckbookInput};
pub use company::{CompanyRepository, CreateCompanyInput};
pub use ledger::{
    BankAccountRepository, CreateBankAccountInput, NewTransaction, PostedTransaction,
    TransactionPatch,
};
pub use reconciliation::ReconciliationRepository;
pub use voucher::{
    AttachmentOutcome, CreateVoucherInput, CreatedVoucher, ForceDeleteReport, StatusChange,
    VoucherDetails, VoucherRepository, VoucherUpdate,
};
