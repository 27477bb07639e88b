use pcommon::BoxFuture;

use crate::{ChatCompletion, ModelRequest, ProviderError};

/// A single `complete(request) -> completion` call against a chat model.
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> BoxFuture<'a, Result<ChatCompletion, ProviderError>>;
}
