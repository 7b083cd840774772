use common::traits::SubmissionError;

/// Conversion of a decoded broker payload into our own types.
pub trait RemoteResponse<T> {
    fn to_domain(&self) -> Result<T, SubmissionError>;
}
