pub mod error;
pub mod model;
pub mod render;
pub mod signing;
pub mod store;

pub use error::{DomainError, DomainResult};
pub use model::{
    AuditRecord, Business, Client, Contract, ContractStatus, ContractTemplate, Invoice,
    InvoiceStatus, Payment, PaymentProvider, PaymentStatus,
};
pub use store::{
    AuditStore, BusinessStore, ClientStore, ContractStore, HealthStore, InvoiceStore, PaidEntities,
    PaymentStore, Store, TemplateStore, WebhookOutcome,
};
