use thiserror::Error;

use crate::model::{PartSpecError, SessionIdError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Part(#[from] PartSpecError),
    #[error(transparent)]
    SessionId(#[from] SessionIdError),
}
