//! Tipo de erro da biblioteca, agregando os erros de cada módulo.

use thiserror::Error;

use crate::config::SettingsError;
use crate::dictionary::DictionaryError;
use crate::smalltalk::{ReconcileError, SmallTalkError};
use crate::table::TableError;

#[derive(Debug, Error)]
pub enum ChatCleanError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error(transparent)]
    SmallTalk(#[from] SmallTalkError),
    #[error(transparent)]
    Table(#[from] TableError),
}

impl From<ReconcileError> for ChatCleanError {
    fn from(err: ReconcileError) -> Self {
        ChatCleanError::SmallTalk(SmallTalkError::Reconcile(err))
    }
}

pub type Result<T> = std::result::Result<T, ChatCleanError>;
