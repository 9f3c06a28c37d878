use crate::snapshot::SnapshotError;

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The bus transaction failed or the chip did not acknowledge.
    #[error("I2C transaction failed")]
    I2c(E),
    /// The cached time registers are unusable for the requested operation.
    #[error(transparent)]
    Snapshot(SnapshotError),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::I2c(e)
    }
}
