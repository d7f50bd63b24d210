//! Declarative combinators over [`Completable`](crate::task::Completable) and
//! [`Observable`](crate::task::Observable) work.
//!
//! | combinator      | ordering                          | error merge                          |
//! |-----------------|-----------------------------------|--------------------------------------|
//! | [`all_of`]      | both operands polled concurrently | both always finish; `merge` picks when both fail |
//! | [`then`]        | strictly sequential               | first error short-circuits           |
//! | [`absorb`]      | single operand                    | error logged, converted to `None`    |
//! | [`absorb_stream`] | items in stream order           | first error logged, stream ends      |
//! | [`to_list`]     | items in stream order             | first error fails the whole list     |

use std::fmt::Display;
use std::future::Future;

use futures::{Stream, StreamExt, TryStreamExt};

use crate::task::Completable;

/// Run two completables concurrently and wait for both.
///
/// Neither operand is cancelled when the other fails. If only one fails its
/// error is reported; if both fail, `merge(first_err, second_err)` decides.
pub async fn all_of<'a, E, M>(
    first: Completable<'a, E>,
    second: Completable<'a, E>,
    merge: M,
) -> Result<(), E>
where
    M: FnOnce(E, E) -> E,
{
    match futures::future::join(first, second).await {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(a), Err(b)) => Err(merge(a, b)),
    }
}

/// Run `first`, then feed its value into `next`.
pub async fn then<T, U, E, A, F, Fut>(first: A, next: F) -> Result<U, E>
where
    A: Future<Output = Result<T, E>>,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let value = first.await?;
    next(value).await
}

/// Await best-effort work, logging and discarding its failure.
pub async fn absorb<T, E, F>(label: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(operation = label, error = %e, "best-effort operation failed");
            None
        }
    }
}

/// Drain a best-effort stream, handing each value to `on_item`.
///
/// The first error ends the stream and is logged. Returns the number of values
/// delivered.
pub async fn absorb_stream<T, E, S, F>(label: &str, stream: S, mut on_item: F) -> usize
where
    S: Stream<Item = Result<T, E>>,
    E: Display,
    F: FnMut(T),
{
    futures::pin_mut!(stream);
    let mut delivered = 0;
    while let Some(item) = stream.next().await {
        match item {
            Ok(value) => {
                delivered += 1;
                on_item(value);
            }
            Err(e) => {
                tracing::warn!(operation = label, error = %e, "best-effort stream failed");
                break;
            }
        }
    }
    delivered
}

/// Collect every value of a stream, failing on the first error.
pub async fn to_list<T, E, S>(stream: S) -> Result<Vec<T>, E>
where
    S: Stream<Item = Result<T, E>>,
{
    stream.try_collect().await
}
