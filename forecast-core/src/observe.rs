use futures::{Stream, StreamExt, future};

/// Drop items equal to the one emitted just before them.
///
/// `[A, A, B, B, B, C]` becomes `[A, B, C]`; `[A, B, A]` is left as is.
pub fn distinct_until_changed<S>(stream: S) -> impl Stream<Item = S::Item>
where
    S: Stream,
    S::Item: PartialEq + Clone,
{
    let mut last: Option<S::Item> = None;

    stream.filter_map(move |item| {
        let changed = last.as_ref() != Some(&item);
        if changed {
            last = Some(item.clone());
        }
        future::ready(changed.then_some(item))
    })
}
