pub mod certificates;
pub mod domain;
pub mod ports;
pub mod progress;

pub use certificates::CertificateRegistry;
pub use domain::{
    AuthSession, Certificate, CompletionReceipt, ContractError, Course, CourseModule,
    CourseProgress, MintReceipt, ModuleCompletion, Network, Principal, SkillLevel, TotalStats,
    TxId, TxStatus, User, UserProgress,
};
pub use ports::{
    CertificateLedger, DatabaseService, MetadataStore, PortError, PortResult, SubmittedTx,
};
pub use progress::ProgressTracker;
