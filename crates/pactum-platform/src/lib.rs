pub mod cache;
pub mod config;
pub mod db;
pub mod wire;

pub use cache::{Cache, MemCache, RedisCache};
pub use config::{DomainSettings, ServiceConfig};
pub use db::connect_database;
pub use wire::{
    ContractView, CreateContractRequest, CreateIntentRequest, CreateTemplateRequest,
    HealthResponse, InvoiceView, PaymentView, PublicContractView, RequestOtpRequest,
    RequestOtpResponse, SendLinkResponse, TemplateView, VerifyOtpRequest, WebhookAck,
    WebhookRequest,
};
