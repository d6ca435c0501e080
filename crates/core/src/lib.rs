pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod render;

pub use catalog::CatalogEntry;
pub use domain::account::{Role, UserAccount, UserId};
pub use domain::batch::{BatchId, BatchToken, QuotationBatch};
pub use domain::request::{
    EquipmentItem, EquipmentList, MaintenanceRequest, RequestId, RequestStatus,
};
pub use domain::response::{QuotationItem, QuotationItemId, QuotationResponse, ResponseId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use notify::{
    Attachment, FailingNotifier, InMemoryNotifier, Notification, Notifier, NotifyError,
    SideEffectStatus,
};
pub use render::{
    FailingRenderer, LetterRenderer, PlainTextRenderer, RenderError, RenderedDocument,
};
