pub mod date;
pub mod exit_cause;
pub mod partner;
pub mod record;
pub mod sale;
pub mod summary;

pub use exit_cause::{CauseTotal, ExitCause, ExitCauseEntry, ExitCauseInput, ExitCauseRow};
pub use partner::{normalize_partner_name, NewPartner, Partner};
pub use record::{
    DerivedFields, LedgerRecord, LegacyRecord, NewLedgerRecord, Preview, RecordDraft,
    UpdateOutcome,
};
pub use sale::{NewSale, Sale, SaleRow};
pub use summary::{
    Dashboard, ImportReport, LedgerTotals, PartnerSummary, RecordSubmission, SubmittedRecord,
};
