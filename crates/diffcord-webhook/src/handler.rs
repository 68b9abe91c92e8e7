use std::future::Future;

use futures_util::future::BoxFuture;

use diffcord_types::Vote;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller logic run for every accepted vote.
///
/// Any `Fn(Vote) -> impl Future<Output = Result<(), E>>` closure is a handler.
/// Returning an error answers the delivery with 500.
pub trait VoteHandler: Send + Sync + 'static {
    fn handle(&self, vote: Vote) -> BoxFuture<'static, Result<(), BoxError>>;
}

impl<F, Fut, E> VoteHandler for F
where
    F: Fn(Vote) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn handle(&self, vote: Vote) -> BoxFuture<'static, Result<(), BoxError>> {
        let fut = self(vote);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}
