//! User interface tools for dialog tasks.

use crate::errors::PromptflowError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;

/// A question put to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInterfaceDialogOptions {
    /// Title of the dialog.
    pub prompt_title: String,
    /// The question.
    pub prompt_message: String,
    /// Pre-filled answer.
    pub default_value: Option<String>,
    /// Placeholder shown in an empty answer field.
    pub placeholder: Option<String>,
    /// Ordering hint when several dialogs are pending; higher goes first.
    pub priority: usize,
}

/// Asks the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserInterfaceTools: Send + Sync {
    /// Shows a dialog and returns the answer.
    async fn prompt_dialog(&self, options: UserInterfaceDialogOptions) -> Result<String, PromptflowError>;
}

type DialogCallback =
    Box<dyn Fn(UserInterfaceDialogOptions) -> BoxFuture<'static, Result<String, PromptflowError>> + Send + Sync>;

/// Answers dialogs with a callback.
pub struct CallbackInterfaceTools {
    callback: DialogCallback,
}

impl std::fmt::Debug for CallbackInterfaceTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackInterfaceTools").finish_non_exhaustive()
    }
}

impl CallbackInterfaceTools {
    /// Creates the tools from an async callback.
    #[must_use]
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(UserInterfaceDialogOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, PromptflowError>> + Send + 'static,
    {
        Self {
            callback: Box::new(move |options| Box::pin(callback(options))),
        }
    }

    /// Creates tools that accept every default value.
    #[must_use]
    pub fn accepting_defaults() -> Self {
        Self::new(|options: UserInterfaceDialogOptions| async move {
            Ok(options.default_value.unwrap_or_default())
        })
    }
}

#[async_trait]
impl UserInterfaceTools for CallbackInterfaceTools {
    async fn prompt_dialog(&self, options: UserInterfaceDialogOptions) -> Result<String, PromptflowError> {
        (self.callback)(options).await
    }
}
