//! Leaf value types shared by every layer.

pub mod date;
pub mod id;
pub mod money;
pub mod oauth;

pub use date::Date;
pub use id::{
    BankAccountId, BusinessId, CardId, ConsumerId, DocumentId, IdError, InvoiceId, NoteId,
    OwnerId, PaymentId, SubscriptionId,
};
pub use money::Money;
