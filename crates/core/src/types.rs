/// Opaque job token issued by a remote service when a unit of work is
/// submitted. No internal structure is assumed.
pub type CorrelationId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
