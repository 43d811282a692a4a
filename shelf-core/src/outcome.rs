use crate::entity::CanonicalEntity;
use crate::error::ReconcileError;

/// One item of a reconciliation result stream.
#[derive(Debug)]
pub enum Outcome {
    Entity(CanonicalEntity),
    Error(ReconcileError),
}

impl Outcome {
    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn entity(&self) -> Option<&CanonicalEntity> {
        match self {
            Self::Entity(e) => Some(e),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            Self::Entity(_) => None,
            Self::Error(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<CanonicalEntity, ReconcileError> {
        match self {
            Self::Entity(e) => Ok(e),
            Self::Error(e) => Err(e),
        }
    }
}

impl From<CanonicalEntity> for Outcome {
    fn from(entity: CanonicalEntity) -> Self {
        Self::Entity(entity)
    }
}

impl From<ReconcileError> for Outcome {
    fn from(error: ReconcileError) -> Self {
        Self::Error(error)
    }
}
